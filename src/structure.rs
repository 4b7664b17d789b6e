//! Edge tables from structure strings.
//!
//! Some sources describe a hierarchy by path instead of by parent:
//!
//! ```text
//! labels                            dept
//! RvB                               10
//! RvB|Sales & Marketing             100
//! RvB|Sales & Marketing|Marketing   120
//! ```
//!
//! The parent of a row is the row whose path is this path minus its last
//! segment; single-segment paths hang under the root. The result is an edge
//! table ready for [`HierarchyDefinition::build`](crate::HierarchyDefinition::build).

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::hierarchy::PARENT_PREFIX;
use crate::table::{NodeId, Table, Value};

/// Default path delimiter.
pub const DEFAULT_DELIMITER: char = '|';

/// Options for deriving edges from paths.
#[derive(Debug, Clone)]
pub struct StructureConfig {
    node_col: String,
    parent_col: Option<String>,
    root: NodeId,
    delimiter: char,
    strict: bool,
}

impl StructureConfig {
    /// Derive parents for `node_col`, hanging top-level paths under `root`.
    pub fn new(node_col: impl Into<String>, root: impl Into<NodeId>) -> Self {
        Self {
            node_col: node_col.into(),
            parent_col: None,
            root: root.into(),
            delimiter: DEFAULT_DELIMITER,
            strict: false,
        }
    }

    /// Set the output parent column (default `parent_<node_col>`).
    pub fn with_parent_column(mut self, col: impl Into<String>) -> Self {
        self.parent_col = Some(col.into());
        self
    }

    /// Set the path delimiter.
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Fail on rows whose parent path is undefined instead of skipping them.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    fn parent_column(&self) -> String {
        self.parent_col
            .clone()
            .unwrap_or_else(|| format!("{PARENT_PREFIX}{}", self.node_col))
    }
}

/// Derive an edge table from a delimited path column.
///
/// The output keeps every input column and appends the parent column.
pub fn edges_from_paths(table: &Table, path_col: &str, config: &StructureConfig) -> Result<Table> {
    let path_pos = table.require_column(path_col)?;
    let paths = table
        .rows()
        .iter()
        .map(|row| match &row[path_pos] {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>();
    derive_edges(table, path_col, &paths, config)
}

/// Derive an edge table from ordered level columns.
///
/// Non-empty cells of `level_cols` are joined with the delimiter to form each
/// row's path. The level columns stay in the output; no path column is added.
pub fn edges_from_level_columns(
    table: &Table,
    level_cols: &[&str],
    config: &StructureConfig,
) -> Result<Table> {
    let positions = level_cols
        .iter()
        .map(|c| table.require_column(c))
        .collect::<Result<Vec<_>>>()?;
    let delim = config.delimiter.to_string();
    let paths = table
        .rows()
        .iter()
        .map(|row| {
            positions
                .iter()
                .filter_map(|&p| match &row[p] {
                    Value::Null => None,
                    Value::String(s) if s.is_empty() => None,
                    v => Some(v.to_string()),
                })
                .collect::<Vec<_>>()
                .join(&delim)
        })
        .collect::<Vec<_>>();
    let label = level_cols.join(",");
    derive_edges(table, &label, &paths, config)
}

fn derive_edges(
    table: &Table,
    path_label: &str,
    paths: &[String],
    config: &StructureConfig,
) -> Result<Table> {
    let node_pos = table.require_column(&config.node_col)?;
    let parent_col = config.parent_column();
    if table.has_column(&parent_col) {
        return Err(Error::ColumnConflict { name: parent_col });
    }

    let mut by_path: HashMap<&str, (usize, NodeId)> = HashMap::with_capacity(paths.len());
    for (row, path) in paths.iter().enumerate() {
        if path.is_empty() {
            continue;
        }
        let node = NodeId::from_cell(table, row, node_pos)?;
        if let Some((first_row, _)) = by_path.get(path.as_str()) {
            return Err(Error::DuplicateNode {
                node,
                first_row: *first_row,
                row,
            });
        }
        let _ = by_path.insert(path.as_str(), (row, node));
    }

    for (row, path) in paths.iter().enumerate() {
        if !path.is_empty() {
            continue;
        }
        if config.strict {
            return Err(Error::InvalidNodeValue {
                column: path_label.to_string(),
                row,
                found: "empty path",
            });
        }
        tracing::warn!(row, column = path_label, "skipping row with empty path");
    }

    // Shallowest first, so a parent is settled before any of its children.
    let mut order: Vec<usize> = (0..paths.len()).filter(|&r| !paths[r].is_empty()).collect();
    order.sort_by_key(|&r| paths[r].matches(config.delimiter).count());

    let mut parents: Vec<Option<NodeId>> = vec![None; paths.len()];
    for row in order {
        let path = paths[row].as_str();
        let parent = match path.rfind(config.delimiter) {
            None => Some(config.root.clone()),
            Some(cut) => match by_path.get(&path[..cut]) {
                Some((parent_row, parent)) if parents[*parent_row].is_some() => {
                    Some(parent.clone())
                }
                Some(_) => {
                    tracing::warn!(row, path, "parent row was skipped, skipping row");
                    None
                }
                None if config.strict => {
                    return Err(Error::OrphanNode {
                        node: NodeId::from_cell(table, row, node_pos)?,
                        parent: NodeId::Str(path[..cut].to_string()),
                    });
                }
                None => {
                    tracing::warn!(row, path, "no parent path found, skipping row");
                    None
                }
            },
        };
        parents[row] = parent;
    }

    let mut columns = table.columns().to_vec();
    columns.push(parent_col);
    let rows = parents
        .into_iter()
        .enumerate()
        .filter_map(|(row, parent)| {
            let parent = parent?;
            let mut out = Vec::with_capacity(columns.len());
            out.extend_from_slice(&table.rows()[row]);
            out.push(Value::from(parent));
            Some(out)
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        rows = table.len(),
        edges = rows.len(),
        column = path_label,
        "derived edges from structure"
    );
    Ok(Table::from_parts_unchecked(columns, rows))
}
