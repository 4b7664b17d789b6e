//! Ancestor chains and levels for every node of a validated graph.

use std::collections::VecDeque;

use super::graph::HierarchyGraph;

/// Resolved ancestry of every node.
///
/// `chains[i]` lists node indices from the highest non-root ancestor down to
/// `i` itself, so `chains[i].len()` is the level of node `i`.
#[derive(Debug, Clone, Default)]
pub struct Ancestry {
    chains: Vec<Vec<usize>>,
}

impl Ancestry {
    /// Chain of node `i`, root-most first, ending with `i`.
    pub fn chain(&self, i: usize) -> &[usize] {
        &self.chains[i]
    }

    /// Level of node `i` (children of the root have level 1).
    pub fn level(&self, i: usize) -> usize {
        self.chains[i].len()
    }

    /// Number of resolved nodes.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Whether nothing was resolved.
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub(crate) fn into_chains(self) -> Vec<Vec<usize>> {
        self.chains
    }
}

/// Walks a [`HierarchyGraph`] once from the root.
#[derive(Debug, Clone, Copy, Default)]
pub struct AncestryResolver;

impl AncestryResolver {
    /// Resolve every node's chain in one breadth-first pass.
    ///
    /// Each chain extends its parent's memoized chain by one entry, so the
    /// traversal is O(V + E); the output itself holds one entry per
    /// (node, ancestor) pair.
    pub fn resolve(graph: &HierarchyGraph) -> Ancestry {
        let n = graph.len();
        let mut chains: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut queue: VecDeque<usize> = graph.top_level().iter().copied().collect();

        for &top in graph.top_level() {
            chains[top].push(top);
        }

        while let Some(i) = queue.pop_front() {
            for &child in &graph.children()[i] {
                let mut chain = Vec::with_capacity(chains[i].len() + 1);
                chain.extend_from_slice(&chains[i]);
                chain.push(child);
                chains[child] = chain;
                queue.push_back(child);
            }
        }

        debug_assert!(chains.iter().all(|c| !c.is_empty()));
        Ancestry { chains }
    }
}
