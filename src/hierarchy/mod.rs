//! Parent-pointer hierarchies and their ancestry.
//!
//! # The Core Insight
//!
//! A rollup needs every fact counted once at its own node and once at every
//! ancestor. If each node knows its full ancestor chain, one pass over the
//! facts can produce all levels at once:
//!
//! ```text
//! Level 1:        [1]               [2]
//!                /    \              |
//! Level 2:   [12]      [13]         [21]
//!           /  |  \      |
//! Level 3: 120 121 122  [130]
//!                         |
//! Level 4:              1301
//! ```
//!
//! Chain of `121` is `[1, 12, 121]`; its level is the chain length.
//!
//! # Pipeline
//!
//! | Stage | Type | Output |
//! |-------|------|--------|
//! | Adjacency | [`GraphBuilder`] | validated [`HierarchyGraph`] |
//! | Ancestry | [`AncestryResolver`] | chain + level per node |
//! | Table | [`HierarchyDefinition`] | one [`AncestryRecord`] per node |
//!
//! [`HierarchyBuilder`] runs all three. The root is a sentinel that only
//! appears as a parent value; it never gets a record.
//!
//! # Validation
//!
//! Building fails fast on the first broken invariant. [`validate_edges`]
//! reports all of them without failing, and [`HealthCheck`] summarizes the
//! shape of a built hierarchy.

mod ancestry;
mod definition;
mod graph;
mod validate;

pub use ancestry::{Ancestry, AncestryResolver};
pub use definition::{
    AncestryRecord, HierarchyBuilder, HierarchyDefinition, LEVEL_COL, ORDERING_COL, PARENT_PREFIX,
};
pub use graph::{GraphBuilder, HierarchyGraph};
pub use validate::{
    validate_edges, HealthCheck, HealthReport, Severity, ValidationIssue, ValidationReport,
};
