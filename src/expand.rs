//! Fact expansion for multi-level rollups.
//!
//! Each fact row is copied once per entry of its node's ancestor chain, with
//! the node column rewritten to the ancestor id. A single group-by on the node
//! column of the output then totals every hierarchy level at once.
//!
//! ```text
//! facts                 expanded
//! dept  pnr             dept  pnr
//! 121   574     ──►     1     574
//!                       12    574
//!                       121   574
//! ```
//!
//! Expansion only reads the [`HierarchyDefinition`], so any number of
//! expansions may run concurrently over one definition.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::hierarchy::{AncestryRecord, HierarchyDefinition, LEVEL_COL, ORDERING_COL};
use crate::table::{NodeId, Table, Value};

/// What to do with fact rows whose node is not in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownNodePolicy {
    /// Fail with [`Error::UnknownNode`].
    #[default]
    Fail,
    /// Skip the row and log a warning.
    Drop,
}

/// Ancestry column attached to every expanded row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AncestryColumn {
    /// The ancestor's ordering index (`h_ix`).
    OrderingIndex,
    /// The ancestor's level (`h_level`).
    Level,
    /// The ancestor's parent id.
    Parent,
    /// An extra attribute, by position in [`HierarchyDefinition::attribute_columns`].
    /// Positions past the record's attributes read as null.
    Attribute(usize),
}

impl AncestryColumn {
    /// Resolve a column name against a hierarchy.
    pub fn resolve(hierarchy: &HierarchyDefinition, name: &str) -> Result<Self> {
        if name == ORDERING_COL {
            Ok(Self::OrderingIndex)
        } else if name == LEVEL_COL {
            Ok(Self::Level)
        } else if name == hierarchy.parent_column() {
            Ok(Self::Parent)
        } else if let Some(i) = hierarchy.attribute_columns().iter().position(|c| c == name) {
            Ok(Self::Attribute(i))
        } else {
            Err(Error::MissingColumn {
                name: name.to_string(),
            })
        }
    }

    /// Value of this column for `record`.
    pub fn value(&self, record: &AncestryRecord) -> Value {
        match self {
            Self::OrderingIndex => Value::Int64(record.ordering_index),
            Self::Level => Value::from(record.level),
            Self::Parent => Value::from(&record.parent),
            Self::Attribute(i) => record.attrs.get(*i).cloned().unwrap_or(Value::Null),
        }
    }
}

/// Options for an expansion.
#[derive(Debug, Clone)]
pub struct ExpandConfig {
    /// Node-id column in the fact table.
    pub node_col: String,
    /// Ancestry columns to append, by name.
    pub add_cols: Vec<String>,
    /// Handling of unknown nodes.
    pub unknown: UnknownNodePolicy,
    /// Name of an appended column holding the source fact row position.
    pub source_row_col: Option<String>,
}

impl ExpandConfig {
    /// Expand facts keyed by `node_col`.
    pub fn new(node_col: impl Into<String>) -> Self {
        Self {
            node_col: node_col.into(),
            add_cols: Vec::new(),
            unknown: UnknownNodePolicy::Fail,
            source_row_col: None,
        }
    }

    /// Append these ancestry columns.
    pub fn with_columns<I, S>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_cols = cols.into_iter().map(Into::into).collect();
        self
    }

    /// Set the unknown-node policy.
    pub fn with_unknown_policy(mut self, policy: UnknownNodePolicy) -> Self {
        self.unknown = policy;
        self
    }

    /// Skip unknown-node rows instead of failing.
    pub fn drop_unknown(self) -> Self {
        self.with_unknown_policy(UnknownNodePolicy::Drop)
    }

    /// Append the originating fact row position as column `name`.
    pub fn with_source_row(mut self, name: impl Into<String>) -> Self {
        self.source_row_col = Some(name.into());
        self
    }
}

/// One output row before materialization: a fact row seen at one ancestor.
#[derive(Debug, Clone, Copy)]
pub struct ExpandedRow<'h, 'f> {
    /// Position of the fact row in the input.
    pub source_row: usize,
    /// The fact row's cells.
    pub fact: &'f [Value],
    /// The ancestor this copy is tagged with.
    pub ancestor: &'h AncestryRecord,
}

/// Output layout resolved against one fact table.
#[derive(Debug, Clone)]
struct Layout {
    node_pos: usize,
    add: Vec<AncestryColumn>,
    columns: Vec<String>,
    source_row: bool,
}

impl Layout {
    fn materialize(&self, row: &ExpandedRow<'_, '_>) -> Vec<Value> {
        let mut out = Vec::with_capacity(self.columns.len());
        out.extend_from_slice(row.fact);
        out[self.node_pos] = Value::from(&row.ancestor.node);
        out.extend(self.add.iter().map(|c| c.value(row.ancestor)));
        if self.source_row {
            out.push(Value::from(row.source_row));
        }
        out
    }
}

/// Expands fact tables against one hierarchy.
#[derive(Debug, Clone)]
pub struct Expander<'h> {
    hierarchy: &'h HierarchyDefinition,
    config: ExpandConfig,
}

impl<'h> Expander<'h> {
    /// Create an expander.
    pub fn new(hierarchy: &'h HierarchyDefinition, config: ExpandConfig) -> Self {
        Self { hierarchy, config }
    }

    /// The options in use.
    pub fn config(&self) -> &ExpandConfig {
        &self.config
    }

    /// Stream expanded rows without materializing them.
    ///
    /// Under [`UnknownNodePolicy::Fail`] the first unknown node yields one
    /// `Err` and ends the iteration.
    pub fn rows<'f>(&self, facts: &'f Table) -> Result<ExpandedRows<'h, 'f>> {
        let node_pos = facts.require_column(&self.config.node_col)?;
        Ok(ExpandedRows {
            hierarchy: self.hierarchy,
            facts,
            node_pos,
            unknown: self.config.unknown,
            next_fact: 0,
            current: None,
            failed: false,
        })
    }

    /// Expand `facts` into a new table.
    ///
    /// Columns: the fact columns (node column rewritten), then the requested
    /// ancestry columns, then the source-row column if configured. Rows come
    /// out in fact order, ancestors root-most first.
    pub fn expand(&self, facts: &Table) -> Result<Table> {
        let layout = self.layout(facts)?;
        let mut rows = Vec::new();
        for row in self.rows(facts)? {
            rows.push(layout.materialize(&row?));
        }
        tracing::debug!(
            facts = facts.len(),
            expanded = rows.len(),
            column = %self.config.node_col,
            "expanded fact table"
        );
        Ok(Table::from_parts_unchecked(layout.columns, rows))
    }

    /// Expand `facts` with rows processed in parallel.
    ///
    /// Output is identical to [`Expander::expand`]. When several rows hold
    /// unknown nodes under [`UnknownNodePolicy::Fail`], which one is reported
    /// is unspecified.
    #[cfg(feature = "parallel")]
    pub fn expand_par(&self, facts: &Table) -> Result<Table> {
        let layout = self.layout(facts)?;
        let chunks: Vec<Vec<Vec<Value>>> = facts
            .rows()
            .par_iter()
            .enumerate()
            .map(|(i, fact)| -> Result<Vec<Vec<Value>>> {
                let Some(pos) = self.lookup(facts, i, layout.node_pos)? else {
                    return Ok(Vec::new());
                };
                Ok(self
                    .hierarchy
                    .chain_at(pos)
                    .iter()
                    .map(|&a| {
                        layout.materialize(&ExpandedRow {
                            source_row: i,
                            fact,
                            ancestor: self.hierarchy.record_at(a),
                        })
                    })
                    .collect())
            })
            .collect::<Result<_>>()?;
        let rows: Vec<Vec<Value>> = chunks.into_iter().flatten().collect();
        tracing::debug!(
            facts = facts.len(),
            expanded = rows.len(),
            column = %self.config.node_col,
            "expanded fact table in parallel"
        );
        Ok(Table::from_parts_unchecked(layout.columns, rows))
    }

    fn layout(&self, facts: &Table) -> Result<Layout> {
        let node_pos = facts.require_column(&self.config.node_col)?;
        let mut columns = facts.columns().to_vec();
        let mut add = Vec::with_capacity(self.config.add_cols.len());
        for name in &self.config.add_cols {
            add.push(AncestryColumn::resolve(self.hierarchy, name)?);
            push_unique(&mut columns, name)?;
        }
        if let Some(name) = &self.config.source_row_col {
            push_unique(&mut columns, name)?;
        }
        Ok(Layout {
            node_pos,
            add,
            columns,
            source_row: self.config.source_row_col.is_some(),
        })
    }

    #[cfg(feature = "parallel")]
    fn lookup(&self, facts: &Table, row: usize, node_pos: usize) -> Result<Option<usize>> {
        resolve_fact(self.hierarchy, self.config.unknown, facts, row, node_pos)
    }
}

fn push_unique(columns: &mut Vec<String>, name: &str) -> Result<()> {
    if columns.iter().any(|c| c == name) {
        return Err(Error::ColumnConflict {
            name: name.to_string(),
        });
    }
    columns.push(name.to_string());
    Ok(())
}

/// Position of a fact's node in the hierarchy, `None` when the row is dropped.
fn resolve_fact(
    hierarchy: &HierarchyDefinition,
    policy: UnknownNodePolicy,
    facts: &Table,
    row: usize,
    node_pos: usize,
) -> Result<Option<usize>> {
    let cell = &facts.rows()[row][node_pos];
    let pos = NodeId::from_value(cell).and_then(|node| hierarchy.position(&node));
    match (pos, policy) {
        (Some(pos), _) => Ok(Some(pos)),
        (None, UnknownNodePolicy::Drop) => {
            tracing::warn!(row, node = %cell, "dropping fact row with unknown node");
            Ok(None)
        }
        (None, UnknownNodePolicy::Fail) => Err(match NodeId::from_value(cell) {
            Some(node) => Error::UnknownNode { node, row },
            None => Error::InvalidNodeValue {
                column: facts.columns()[node_pos].clone(),
                row,
                found: cell.type_name(),
            },
        }),
    }
}

/// Iterator over [`ExpandedRow`]s; see [`Expander::rows`].
#[derive(Debug)]
pub struct ExpandedRows<'h, 'f> {
    hierarchy: &'h HierarchyDefinition,
    facts: &'f Table,
    node_pos: usize,
    unknown: UnknownNodePolicy,
    next_fact: usize,
    current: Option<(usize, &'h [usize], usize)>,
    failed: bool,
}

impl<'h, 'f> Iterator for ExpandedRows<'h, 'f> {
    type Item = Result<ExpandedRow<'h, 'f>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some((row, chain, k)) = &mut self.current {
                if let Some(&a) = chain.get(*k) {
                    *k += 1;
                    return Some(Ok(ExpandedRow {
                        source_row: *row,
                        fact: &self.facts.rows()[*row],
                        ancestor: self.hierarchy.record_at(a),
                    }));
                }
                self.current = None;
            }

            let row = self.next_fact;
            if row >= self.facts.len() {
                return None;
            }
            self.next_fact += 1;
            match resolve_fact(self.hierarchy, self.unknown, self.facts, row, self.node_pos) {
                Ok(Some(pos)) => self.current = Some((row, self.hierarchy.chain_at(pos), 0)),
                Ok(None) => {}
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl HierarchyDefinition {
    /// Expand `facts` keyed by `node_col`, appending `add_cols` from each ancestor.
    ///
    /// Unknown nodes fail; use [`Expander`] with [`ExpandConfig::drop_unknown`]
    /// to skip them instead.
    pub fn expand(&self, facts: &Table, node_col: &str, add_cols: &[&str]) -> Result<Table> {
        Expander::new(self, ExpandConfig::new(node_col).with_columns(add_cols.iter().copied()))
            .expand(facts)
    }

    /// Create an [`Expander`] over this hierarchy.
    pub fn expander(&self, config: ExpandConfig) -> Expander<'_> {
        Expander::new(self, config)
    }
}
