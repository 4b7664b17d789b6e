use core::fmt;

use crate::table::NodeId;

/// Result alias for `rollup`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by hierarchy construction and fact expansion.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Input table had no rows.
    EmptyInput,

    /// Same node id defined more than once in the edge table.
    DuplicateNode {
        /// The repeated node id.
        node: NodeId,
        /// Row of the first definition.
        first_row: usize,
        /// Row of the repeated definition.
        row: usize,
    },

    /// A parent value that is neither the root nor a defined node.
    OrphanNode {
        /// Node whose parent is dangling.
        node: NodeId,
        /// The undefined parent value.
        parent: NodeId,
    },

    /// Following parent links revisits a node before reaching the root.
    Cycle {
        /// A node on the cycle.
        node: NodeId,
    },

    /// The root value is itself defined as a node, implying a second root above it.
    MultipleRoots {
        /// The declared root.
        root: NodeId,
        /// The parent the edge table gives the root.
        parent: NodeId,
    },

    /// A fact row references a node outside the hierarchy.
    UnknownNode {
        /// The unknown node id.
        node: NodeId,
        /// Position of the fact row.
        row: usize,
    },

    /// A required column is not present.
    MissingColumn {
        /// Column name.
        name: String,
    },

    /// A requested output column already exists in the input table.
    ColumnConflict {
        /// Column name.
        name: String,
    },

    /// A cell in a node or parent column cannot be used as a node id.
    InvalidNodeValue {
        /// Column holding the cell.
        column: String,
        /// Row of the cell.
        row: usize,
        /// Type name of the offending value.
        found: &'static str,
    },

    /// Row width does not match the table's column count.
    RowWidthMismatch {
        /// Expected width.
        expected: usize,
        /// Found width.
        found: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyInput => write!(f, "empty input provided"),
            Error::DuplicateNode {
                node,
                first_row,
                row,
            } => write!(
                f,
                "node {node} defined more than once (rows {first_row} and {row})"
            ),
            Error::OrphanNode { node, parent } => {
                write!(f, "node {node} references undefined parent {parent}")
            }
            Error::Cycle { node } => write!(f, "cycle detected through node {node}"),
            Error::MultipleRoots { root, parent } => {
                write!(f, "root {root} is defined as a node with parent {parent}")
            }
            Error::UnknownNode { node, row } => {
                write!(f, "fact row {row} references unknown node {node}")
            }
            Error::MissingColumn { name } => write!(f, "column '{name}' missing"),
            Error::ColumnConflict { name } => write!(f, "column '{name}' already exists"),
            Error::InvalidNodeValue { column, row, found } => {
                write!(f, "invalid node value of type {found} in '{column}' at row {row}")
            }
            Error::RowWidthMismatch { expected, found } => {
                write!(f, "row width mismatch: expected {expected}, found {found}")
            }
        }
    }
}

impl std::error::Error for Error {}
