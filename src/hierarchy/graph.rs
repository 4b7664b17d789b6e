//! Edge table to validated parent-pointer adjacency.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::table::{NodeId, Table};

/// A validated rooted tree over the nodes of an edge table.
///
/// Nodes are stored in edge-table order, so a node's index is its row
/// position. The root is not stored as a node; `parents[i] == None` means the
/// parent of node `i` is the root.
#[derive(Debug, Clone)]
pub struct HierarchyGraph {
    root: NodeId,
    nodes: Vec<NodeId>,
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    top_level: Vec<usize>,
    index: HashMap<NodeId, usize>,
}

impl HierarchyGraph {
    /// The root sentinel.
    pub fn root(&self) -> &NodeId {
        &self.root
    }

    /// Node ids in edge-table order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Parent index of each node (`None` for children of the root).
    pub fn parents(&self) -> &[Option<usize>] {
        &self.parents
    }

    /// Child indices of each node, in edge-table order.
    pub fn children(&self) -> &[Vec<usize>] {
        &self.children
    }

    /// Direct children of the root, in edge-table order.
    pub fn top_level(&self) -> &[usize] {
        &self.top_level
    }

    /// Index of a node id.
    pub fn position(&self, node: &NodeId) -> Option<usize> {
        self.index.get(node).copied()
    }

    /// Number of nodes (root excluded).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn into_index(self) -> HashMap<NodeId, usize> {
        self.index
    }
}

/// Builds a [`HierarchyGraph`] from (node, parent) rows.
#[derive(Debug, Clone)]
pub struct GraphBuilder<'a> {
    node_col: &'a str,
    parent_col: &'a str,
    root: &'a NodeId,
}

impl<'a> GraphBuilder<'a> {
    /// Create a builder reading `node_col` and `parent_col`, rooted at `root`.
    pub fn new(node_col: &'a str, parent_col: &'a str, root: &'a NodeId) -> Self {
        Self {
            node_col,
            parent_col,
            root,
        }
    }

    /// Build and validate the adjacency.
    ///
    /// Fails on the first problem found, in this order: empty input, invalid
    /// or duplicate node cells, root redefinition, dangling parents, cycles.
    pub fn build(&self, edges: &Table) -> Result<HierarchyGraph> {
        if edges.is_empty() {
            return Err(Error::EmptyInput);
        }
        let node_col = edges.require_column(self.node_col)?;
        let parent_col = edges.require_column(self.parent_col)?;
        let n = edges.len();

        let mut nodes = Vec::with_capacity(n);
        let mut index: HashMap<NodeId, usize> = HashMap::with_capacity(n);
        for row in 0..n {
            let node = NodeId::from_cell(edges, row, node_col)?;
            if &node == self.root {
                return Err(Error::MultipleRoots {
                    root: node,
                    parent: NodeId::from_cell(edges, row, parent_col)?,
                });
            }
            if let Some(&first_row) = index.get(&node) {
                return Err(Error::DuplicateNode {
                    node,
                    first_row,
                    row,
                });
            }
            let _ = index.insert(node.clone(), row);
            nodes.push(node);
        }

        let mut parents = Vec::with_capacity(n);
        let mut children = vec![Vec::new(); n];
        let mut top_level = Vec::new();
        for row in 0..n {
            let parent = NodeId::from_cell(edges, row, parent_col)?;
            if &parent == self.root {
                parents.push(None);
                top_level.push(row);
            } else if let Some(&p) = index.get(&parent) {
                parents.push(Some(p));
                children[p].push(row);
            } else {
                return Err(Error::OrphanNode {
                    node: nodes[row].clone(),
                    parent,
                });
            }
        }

        if let Some(&on_cycle) = find_cycles(&parents).first() {
            return Err(Error::Cycle {
                node: nodes[on_cycle].clone(),
            });
        }

        tracing::debug!(
            nodes = n,
            top_level = top_level.len(),
            root = %self.root,
            "built hierarchy graph"
        );

        Ok(HierarchyGraph {
            root: self.root.clone(),
            nodes,
            parents,
            children,
            top_level,
            index,
        })
    }
}

/// Find nodes whose parent chain never terminates.
///
/// Returns one representative node per distinct cycle. A `None` parent ends a
/// chain. Each node is visited once, so this is O(V).
pub(crate) fn find_cycles(parents: &[Option<usize>]) -> Vec<usize> {
    const UNSEEN: u8 = 0;
    const ON_PATH: u8 = 1;
    const DONE: u8 = 2;

    let mut state = vec![UNSEEN; parents.len()];
    let mut path = Vec::new();
    let mut cycles = Vec::new();

    for start in 0..parents.len() {
        let mut cur = Some(start);
        while let Some(i) = cur {
            match state[i] {
                UNSEEN => {
                    state[i] = ON_PATH;
                    path.push(i);
                    cur = parents[i];
                }
                ON_PATH => {
                    cycles.push(i);
                    break;
                }
                _ => break,
            }
        }
        for i in path.drain(..) {
            state[i] = DONE;
        }
    }
    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table;

    fn org() -> Table {
        table! {
            ["dept", "parent_dept"];
            [1, 0], [12, 1], [120, 12], [121, 12], [122, 12],
            [13, 1], [130, 13], [1301, 130], [2, 0], [21, 2],
        }
    }

    fn build(edges: &Table, root: i64) -> Result<HierarchyGraph> {
        let root = NodeId::from(root);
        GraphBuilder::new("dept", "parent_dept", &root).build(edges)
    }

    #[test]
    fn test_adjacency_follows_row_order() {
        let g = build(&org(), 0).unwrap();
        assert_eq!(g.len(), 10);
        assert_eq!(g.top_level(), &[0, 8]);
        assert_eq!(g.children()[1], vec![2, 3, 4]);
        assert_eq!(g.parents()[7], Some(6));
        assert_eq!(g.position(&NodeId::from(1301)), Some(7));
    }

    #[test]
    fn test_duplicate_node() {
        let edges = table! { ["dept", "parent_dept"]; [1, 0], [2, 0], [1, 2] };
        assert_eq!(
            build(&edges, 0).unwrap_err(),
            Error::DuplicateNode {
                node: NodeId::from(1),
                first_row: 0,
                row: 2
            }
        );
    }

    #[test]
    fn test_orphan_parent() {
        let edges = table! { ["dept", "parent_dept"]; [1, 0], [5, 999] };
        assert_eq!(
            build(&edges, 0).unwrap_err(),
            Error::OrphanNode {
                node: NodeId::from(5),
                parent: NodeId::from(999)
            }
        );
    }

    #[test]
    fn test_two_cycle() {
        let edges = table! { ["dept", "parent_dept"]; [5, 6], [6, 5] };
        assert!(matches!(build(&edges, 0), Err(Error::Cycle { .. })));
    }

    #[test]
    fn test_self_parent_is_cycle() {
        let edges = table! { ["dept", "parent_dept"]; [1, 0], [5, 5] };
        assert_eq!(
            build(&edges, 0).unwrap_err(),
            Error::Cycle {
                node: NodeId::from(5)
            }
        );
    }

    #[test]
    fn test_root_defined_as_node() {
        let edges = table! { ["dept", "parent_dept"]; [1, 0], [0, 7] };
        assert_eq!(
            build(&edges, 0).unwrap_err(),
            Error::MultipleRoots {
                root: NodeId::from(0),
                parent: NodeId::from(7)
            }
        );
    }

    #[test]
    fn test_empty_and_missing_columns() {
        let empty = Table::new(["dept", "parent_dept"]);
        assert_eq!(build(&empty, 0).unwrap_err(), Error::EmptyInput);

        let edges = table! { ["dept", "up"]; [1, 0] };
        assert!(matches!(
            build(&edges, 0),
            Err(Error::MissingColumn { name }) if name == "parent_dept"
        ));
    }

    #[test]
    fn test_invalid_node_cell() {
        let edges = table! { ["dept", "parent_dept"]; [1, 0], [1.5, 1] };
        assert!(matches!(
            build(&edges, 0),
            Err(Error::InvalidNodeValue { row: 1, found: "Float64", .. })
        ));
    }

    #[test]
    fn test_find_cycles_reports_each_cycle_once() {
        // 0 -> root, 1 <-> 2, 3 -> 1 (tail into cycle), 4 -> 4
        let parents = [None, Some(2), Some(1), Some(1), Some(4)];
        let cycles = find_cycles(&parents);
        assert_eq!(cycles.len(), 2);
        assert!(cycles.contains(&4));
    }
}
