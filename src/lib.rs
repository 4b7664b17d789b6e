//! # rollup
//!
//! Hierarchy rollups without recursive queries: resolve a parent-pointer tree
//! once, then expand any fact table so a single group-by yields totals at
//! every level.
//!
//! ```
//! use rollup::{table, HierarchyDefinition};
//!
//! let org = table! {
//!     ["dept", "parent_dept"];
//!     [1, 0], [12, 1], [121, 12], [2, 0],
//! };
//! let pers = table! {
//!     ["dept", "pnr"];
//!     [121, 574], [121, 578], [1, 456],
//! };
//!
//! let h = HierarchyDefinition::build(&org, "dept", "parent_dept", 0)?;
//! let expanded = h.expand(&pers, "dept", &["h_level"])?;
//! assert_eq!(expanded.len(), 7);
//! # Ok::<(), rollup::Error>(())
//! ```
//!
//! Aggregation itself is left to the caller.
//!
//! **Default build** is single-threaded. `parallel` adds row-parallel
//! expansion via rayon; `serde` derives serialization for the data types.

/// Error types used across `rollup`.
pub mod error;
pub mod expand;
pub mod hierarchy;
pub mod structure;
pub mod table;

#[cfg(test)]
mod rollup_tests;

pub use error::{Error, Result};
pub use expand::{AncestryColumn, ExpandConfig, ExpandedRow, Expander, UnknownNodePolicy};
pub use hierarchy::{
    validate_edges, AncestryRecord, HealthCheck, HierarchyBuilder, HierarchyDefinition,
};
pub use structure::{edges_from_level_columns, edges_from_paths, StructureConfig};
pub use table::{NodeId, Table, Value};
