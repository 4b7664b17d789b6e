//! The immutable ancestry table produced from an edge table.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::ancestry::AncestryResolver;
use super::graph::GraphBuilder;
use crate::error::{Error, Result};
use crate::table::{NodeId, Table, Value};

/// Prefix for the default parent column name (`dept` -> `parent_dept`).
pub const PARENT_PREFIX: &str = "parent_";
/// Column holding the ordering index.
pub const ORDERING_COL: &str = "h_ix";
/// Column holding the level.
pub const LEVEL_COL: &str = "h_level";

/// Ancestry metadata for one node.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AncestryRecord {
    /// Node id.
    pub node: NodeId,
    /// Parent id (the root sentinel for top-level nodes).
    pub parent: NodeId,
    /// Declaration order: edge-table row position, or the explicit ordering column.
    pub ordering_index: i64,
    /// Edges from the root (top-level nodes have level 1).
    pub level: usize,
    /// Extra edge-table columns, in [`HierarchyDefinition::attribute_columns`] order.
    pub attrs: Vec<Value>,
}

/// One record per node with its ancestry, built once and read-only afterwards.
///
/// ```
/// use rollup::{table, HierarchyDefinition, NodeId};
///
/// let org = table! {
///     ["dept", "parent_dept"];
///     [1, 0], [12, 1], [121, 12],
/// };
/// let h = HierarchyDefinition::build(&org, "dept", "parent_dept", 0).unwrap();
/// assert_eq!(h.level(&NodeId::from(121)), Some(3));
/// ```
#[derive(Debug, Clone)]
pub struct HierarchyDefinition {
    node_col: String,
    parent_col: String,
    attr_cols: Vec<String>,
    root: NodeId,
    records: Vec<AncestryRecord>,
    chains: Vec<Vec<usize>>,
    children: Vec<Vec<usize>>,
    top_level: Vec<usize>,
    index: HashMap<NodeId, usize>,
}

impl HierarchyDefinition {
    /// Build from an edge table with explicit columns and root.
    pub fn build(
        edges: &Table,
        node_col: &str,
        parent_col: &str,
        root: impl Into<NodeId>,
    ) -> Result<Self> {
        HierarchyBuilder::new(node_col)
            .with_parent_column(parent_col)
            .with_root(root)
            .build(edges)
    }

    /// Start a builder for hierarchy column `node_col`.
    pub fn builder(node_col: impl Into<String>) -> HierarchyBuilder {
        HierarchyBuilder::new(node_col)
    }

    /// Node column name.
    pub fn node_column(&self) -> &str {
        &self.node_col
    }

    /// Parent column name.
    pub fn parent_column(&self) -> &str {
        &self.parent_col
    }

    /// Extra attribute columns carried through from the edge table.
    pub fn attribute_columns(&self) -> &[String] {
        &self.attr_cols
    }

    /// Root sentinel.
    pub fn root(&self) -> &NodeId {
        &self.root
    }

    /// Number of nodes (root excluded).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no nodes.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether `node` belongs to the hierarchy.
    pub fn contains(&self, node: &NodeId) -> bool {
        self.index.contains_key(node)
    }

    /// Record for `node`.
    pub fn get(&self, node: &NodeId) -> Option<&AncestryRecord> {
        self.position(node).map(|i| &self.records[i])
    }

    /// Level of `node`.
    pub fn level(&self, node: &NodeId) -> Option<usize> {
        self.get(node).map(|r| r.level)
    }

    /// Ordering index of `node`.
    pub fn ordering_index(&self, node: &NodeId) -> Option<i64> {
        self.get(node).map(|r| r.ordering_index)
    }

    /// Extra attribute `name` of `node`.
    pub fn attribute(&self, node: &NodeId, name: &str) -> Option<&Value> {
        let col = self.attr_cols.iter().position(|c| c == name)?;
        self.get(node).map(|r| &r.attrs[col])
    }

    /// Ancestor chain of `node`: highest non-root ancestor first, `node` last.
    pub fn ancestor_chain(&self, node: &NodeId) -> Option<Vec<&NodeId>> {
        let i = self.position(node)?;
        Some(self.chains[i].iter().map(|&j| &self.records[j].node).collect())
    }

    /// Direct children of `node`, in declaration order.
    pub fn children(&self, node: &NodeId) -> Option<impl Iterator<Item = &AncestryRecord> + '_> {
        let i = self.position(node)?;
        Some(self.children[i].iter().map(move |&j| &self.records[j]))
    }

    /// Direct children of the root, in declaration order.
    pub fn top_level(&self) -> impl Iterator<Item = &AncestryRecord> + '_ {
        self.top_level.iter().map(move |&j| &self.records[j])
    }

    /// All records in edge-table order.
    pub fn iter(&self) -> impl Iterator<Item = &AncestryRecord> + '_ {
        self.records.iter()
    }

    /// Deepest level in the hierarchy.
    pub fn max_depth(&self) -> usize {
        self.records.iter().map(|r| r.level).max().unwrap_or(0)
    }

    /// Materialize as `{node, parent, h_ix, h_level, ...attrs}` rows.
    pub fn to_table(&self) -> Table {
        let mut columns = vec![
            self.node_col.clone(),
            self.parent_col.clone(),
            ORDERING_COL.to_string(),
            LEVEL_COL.to_string(),
        ];
        columns.extend(self.attr_cols.iter().cloned());

        let rows = self
            .records
            .iter()
            .map(|r| {
                let mut row = Vec::with_capacity(columns.len());
                row.push(Value::from(&r.node));
                row.push(Value::from(&r.parent));
                row.push(Value::Int64(r.ordering_index));
                row.push(Value::from(r.level));
                row.extend(r.attrs.iter().cloned());
                row
            })
            .collect();
        Table::from_parts_unchecked(columns, rows)
    }

    pub(crate) fn position(&self, node: &NodeId) -> Option<usize> {
        self.index.get(node).copied()
    }

    pub(crate) fn record_at(&self, i: usize) -> &AncestryRecord {
        &self.records[i]
    }

    pub(crate) fn chain_at(&self, i: usize) -> &[usize] {
        &self.chains[i]
    }
}

/// Builder for [`HierarchyDefinition`].
///
/// Defaults: parent column `parent_<node_col>`, root inferred from the parent
/// value of the first edge row, ordering read from an `h_ix` column when the
/// edge table has one.
#[derive(Debug, Clone)]
pub struct HierarchyBuilder {
    node_col: String,
    parent_col: Option<String>,
    root: Option<NodeId>,
    ordering_col: Option<String>,
}

impl HierarchyBuilder {
    /// Create a new builder for hierarchy column `node_col`.
    pub fn new(node_col: impl Into<String>) -> Self {
        Self {
            node_col: node_col.into(),
            parent_col: None,
            root: None,
            ordering_col: Some(ORDERING_COL.to_string()),
        }
    }

    /// Set the parent column.
    pub fn with_parent_column(mut self, parent_col: impl Into<String>) -> Self {
        self.parent_col = Some(parent_col.into());
        self
    }

    /// Set the root sentinel.
    pub fn with_root(mut self, root: impl Into<NodeId>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Read ordering indices from `col` when present, instead of `h_ix`.
    pub fn with_ordering_column(mut self, col: impl Into<String>) -> Self {
        self.ordering_col = Some(col.into());
        self
    }

    /// Always use row positions as ordering indices.
    pub fn with_row_ordering(mut self) -> Self {
        self.ordering_col = None;
        self
    }

    /// Resolved parent column name.
    pub fn parent_column(&self) -> String {
        self.parent_col
            .clone()
            .unwrap_or_else(|| format!("{PARENT_PREFIX}{}", self.node_col))
    }

    /// Build the hierarchy. Nothing is returned on failure.
    pub fn build(&self, edges: &Table) -> Result<HierarchyDefinition> {
        let parent_col = self.parent_column();
        let root = match &self.root {
            Some(root) => root.clone(),
            None => infer_root(edges, &parent_col)?,
        };

        let graph = GraphBuilder::new(&self.node_col, &parent_col, &root).build(edges)?;
        let ancestry = AncestryResolver::resolve(&graph);

        let ordering_pos = self
            .ordering_col
            .as_deref()
            .and_then(|c| edges.column_index(c));

        let mut attr_pos = Vec::new();
        let mut attr_cols = Vec::new();
        for (i, name) in edges.columns().iter().enumerate() {
            if name == &self.node_col || name == &parent_col || Some(i) == ordering_pos {
                continue;
            }
            if name == LEVEL_COL || name == ORDERING_COL {
                return Err(Error::ColumnConflict { name: name.clone() });
            }
            attr_pos.push(i);
            attr_cols.push(name.clone());
        }

        let mut records = Vec::with_capacity(graph.len());
        for (row, cells) in edges.rows().iter().enumerate() {
            let ordering_index = match ordering_pos {
                Some(col) => cells[col].as_int64().ok_or_else(|| Error::InvalidNodeValue {
                    column: edges.columns()[col].clone(),
                    row,
                    found: cells[col].type_name(),
                })?,
                None => row as i64,
            };
            let parent = match graph.parents()[row] {
                Some(p) => graph.nodes()[p].clone(),
                None => root.clone(),
            };
            records.push(AncestryRecord {
                node: graph.nodes()[row].clone(),
                parent,
                ordering_index,
                level: ancestry.level(row),
                attrs: attr_pos.iter().map(|&c| cells[c].clone()).collect(),
            });
        }

        let children = graph.children().to_vec();
        let top_level = graph.top_level().to_vec();
        let index = graph.into_index();

        let definition = HierarchyDefinition {
            node_col: self.node_col.clone(),
            parent_col,
            attr_cols,
            root,
            records,
            chains: ancestry.into_chains(),
            children,
            top_level,
            index,
        };
        tracing::debug!(
            column = %definition.node_col,
            nodes = definition.len(),
            max_depth = definition.max_depth(),
            "built hierarchy definition"
        );
        Ok(definition)
    }
}

fn infer_root(edges: &Table, parent_col: &str) -> Result<NodeId> {
    if edges.is_empty() {
        return Err(Error::EmptyInput);
    }
    let col = edges.require_column(parent_col)?;
    NodeId::from_cell(edges, 0, col)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table;

    fn org() -> Table {
        table! {
            ["dept", "parent_dept", "manager"];
            [1, 0, "Mgr_1"], [12, 1, "Mgr_12"], [120, 12, "Mgr_120"],
            [121, 12, "Mgr_121"], [122, 12, "Mgr_122"], [13, 1, "Mgr_13"],
            [130, 13, "Mgr_130"], [1301, 130, "Mgr_1301"], [2, 0, "Mgr_2"],
            [21, 2, "Mgr_21"],
        }
    }

    fn id(i: i64) -> NodeId {
        NodeId::from(i)
    }

    #[test]
    fn test_levels_match_declared_tree() {
        let h = HierarchyDefinition::build(&org(), "dept", "parent_dept", 0).unwrap();
        assert_eq!(h.len(), 10);
        assert_eq!(h.level(&id(1)), Some(1));
        assert_eq!(h.level(&id(12)), Some(2));
        assert_eq!(h.level(&id(121)), Some(3));
        assert_eq!(h.level(&id(1301)), Some(4));
        assert_eq!(h.max_depth(), 4);
    }

    #[test]
    fn test_chain_and_level_agree() {
        let h = HierarchyDefinition::build(&org(), "dept", "parent_dept", 0).unwrap();
        for record in h.iter() {
            let chain = h.ancestor_chain(&record.node).unwrap();
            assert_eq!(chain.len(), record.level);
            assert_eq!(chain.last(), Some(&&record.node));
            let top = chain[0];
            assert_eq!(h.get(top).unwrap().parent, id(0));
        }
        let chain: Vec<NodeId> = h
            .ancestor_chain(&id(121))
            .unwrap()
            .into_iter()
            .cloned()
            .collect();
        assert_eq!(chain, vec![id(1), id(12), id(121)]);
    }

    #[test]
    fn test_ordering_index_is_row_position() {
        let h = HierarchyDefinition::build(&org(), "dept", "parent_dept", 0).unwrap();
        assert_eq!(h.ordering_index(&id(1)), Some(0));
        assert_eq!(h.ordering_index(&id(21)), Some(9));
        let order: Vec<i64> = h.iter().map(|r| r.ordering_index).collect();
        assert_eq!(order, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_explicit_ordering_column_passes_through() {
        let edges = table! {
            ["dept", "parent_dept", "h_ix"];
            [1, 0, 30], [12, 1, 10], [2, 0, 20],
        };
        let h = HierarchyDefinition::builder("dept").build(&edges).unwrap();
        assert_eq!(h.ordering_index(&id(12)), Some(10));
        assert!(h.attribute_columns().is_empty());

        let h = HierarchyDefinition::builder("dept")
            .with_row_ordering()
            .build(&edges);
        assert!(matches!(h, Err(Error::ColumnConflict { name }) if name == "h_ix"));
    }

    #[test]
    fn test_h_ix_beside_custom_ordering_column_conflicts() {
        let edges = table! {
            ["dept", "parent_dept", "sort", "h_ix"];
            [1, 0, 2, 7], [12, 1, 1, 8],
        };
        let h = HierarchyDefinition::builder("dept")
            .with_ordering_column("sort")
            .build(&edges);
        assert!(matches!(h, Err(Error::ColumnConflict { name }) if name == "h_ix"));

        let edges = table! {
            ["dept", "parent_dept", "sort"];
            [1, 0, 2], [12, 1, 1],
        };
        let h = HierarchyDefinition::builder("dept")
            .with_ordering_column("sort")
            .build(&edges)
            .unwrap();
        assert_eq!(h.ordering_index(&id(12)), Some(1));
        assert_eq!(
            h.to_table().columns(),
            &["dept", "parent_dept", "h_ix", "h_level"].map(String::from)
        );
    }

    #[test]
    fn test_builder_defaults_infer_root_and_parent_column() {
        let h = HierarchyDefinition::builder("dept").build(&org()).unwrap();
        assert_eq!(h.root(), &id(0));
        assert_eq!(h.parent_column(), "parent_dept");
    }

    #[test]
    fn test_attributes_carried_through() {
        let h = HierarchyDefinition::build(&org(), "dept", "parent_dept", 0).unwrap();
        assert_eq!(h.attribute_columns(), &["manager".to_string()]);
        assert_eq!(
            h.attribute(&id(130), "manager"),
            Some(&Value::from("Mgr_130"))
        );
        assert_eq!(h.attribute(&id(130), "nope"), None);
    }

    #[test]
    fn test_children_and_top_level() {
        let h = HierarchyDefinition::build(&org(), "dept", "parent_dept", 0).unwrap();
        let kids: Vec<&NodeId> = h.children(&id(12)).unwrap().map(|r| &r.node).collect();
        assert_eq!(kids, vec![&id(120), &id(121), &id(122)]);
        let top: Vec<&NodeId> = h.top_level().map(|r| &r.node).collect();
        assert_eq!(top, vec![&id(1), &id(2)]);
        assert!(h.children(&id(999)).is_none());
    }

    #[test]
    fn test_to_table_layout() {
        let h = HierarchyDefinition::build(&org(), "dept", "parent_dept", 0).unwrap();
        let t = h.to_table();
        assert_eq!(
            t.columns(),
            &["dept", "parent_dept", "h_ix", "h_level", "manager"].map(String::from)
        );
        assert_eq!(t.get(7, "dept"), Some(&Value::Int64(1301)));
        assert_eq!(t.get(7, "h_level"), Some(&Value::Int64(4)));
        assert_eq!(t.get(7, "parent_dept"), Some(&Value::Int64(130)));
    }

    #[test]
    fn test_level_column_in_edges_conflicts() {
        let edges = table! { ["dept", "parent_dept", "h_level"]; [1, 0, 1] };
        assert!(matches!(
            HierarchyDefinition::build(&edges, "dept", "parent_dept", 0),
            Err(Error::ColumnConflict { .. })
        ));
    }

    #[test]
    fn test_string_ids() {
        let edges = table! {
            ["oe", "parent_oe"];
            ["animal", "root"], ["mammal", "animal"], ["dog", "mammal"],
        };
        let h = HierarchyDefinition::build(&edges, "oe", "parent_oe", "root").unwrap();
        assert_eq!(h.level(&NodeId::from("dog")), Some(3));
        assert!(!h.contains(&NodeId::from("root")));
    }
}
