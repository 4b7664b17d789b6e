//! Edge-table validation and hierarchy health checking.
//!
//! [`HierarchyDefinition::build`](super::HierarchyDefinition::build) stops at
//! the first problem. [`validate_edges`] instead collects every problem in an
//! edge table so bad source data can be fixed in one pass:
//! - Duplicate node definitions
//! - Dangling parent references (orphans)
//! - Cycles in the parent chain
//! - The root declared as a node
//!
//! # Example
//!
//! ```rust
//! use rollup::hierarchy::validate_edges;
//! use rollup::{table, NodeId};
//!
//! let edges = table! { ["dept", "parent_dept"]; [1, 0], [5, 999], [5, 1] };
//! let report = validate_edges(&edges, "dept", "parent_dept", &NodeId::from(0));
//! if !report.is_healthy() {
//!     for issue in &report.issues {
//!         eprintln!("{}", issue);
//!     }
//! }
//! assert_eq!(report.issues.len(), 2);
//! ```

use std::collections::HashMap;
use std::fmt;

use super::definition::HierarchyDefinition;
use super::graph::find_cycles;
use crate::table::{NodeId, Table};

/// How bad a finding is. `Error` and above block construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Worth knowing, e.g. a null attribute.
    Info,
    /// Builds, but probably not what the source meant.
    Warning,
    /// One bad edge; `build` would reject the table.
    Error,
    /// The table cannot be read as edges at all.
    Critical,
}

impl Severity {
    fn label(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One finding about an edge table or a built hierarchy.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// How bad it is.
    pub severity: Severity,
    /// What is wrong.
    pub message: String,
    /// Offending node.
    pub node: Option<NodeId>,
    /// Offending edge-table row.
    pub row: Option<usize>,
    /// Extra detail, e.g. the dangling parent.
    pub context: Option<String>,
}

impl ValidationIssue {
    /// A finding with no location attached.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            node: None,
            row: None,
            context: None,
        }
    }

    /// Attach the node involved.
    pub fn with_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    /// Attach the edge-table row involved.
    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    /// Attach extra detail.
    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context = Some(ctx.into());
        self
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;
        match (&self.node, self.row) {
            (Some(node), Some(row)) => write!(f, " at row {row} (node {node})")?,
            (Some(node), None) => write!(f, " (node {node})")?,
            (None, Some(row)) => write!(f, " at row {row}")?,
            (None, None) => {}
        }
        if let Some(ctx) = &self.context {
            write!(f, "; {ctx}")?;
        }
        Ok(())
    }
}

/// Every finding from one validation pass, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Findings in discovery order.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// An empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finding.
    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Record an unlocated warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.add(ValidationIssue::new(Severity::Warning, message));
    }

    /// Record an unlocated critical finding.
    pub fn critical(&mut self, message: impl Into<String>) {
        self.add(ValidationIssue::new(Severity::Critical, message));
    }

    /// Worst severity found, if any.
    pub fn worst(&self) -> Option<Severity> {
        self.issues.iter().map(|i| i.severity).max()
    }

    /// True when nothing would make `build` fail.
    pub fn is_healthy(&self) -> bool {
        self.worst().map_or(true, |s| s < Severity::Error)
    }

    /// True when there are no findings at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of findings with exactly this severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.worst() {
            None => return write!(f, "edges ok"),
            Some(worst) => writeln!(f, "{} issue(s), worst {worst}", self.issues.len())?,
        }
        for issue in &self.issues {
            writeln!(f, "  {issue}")?;
        }
        Ok(())
    }
}

/// Health report with hierarchy statistics.
#[derive(Debug, Clone)]
pub struct HealthReport {
    /// Validation issues.
    pub validation: ValidationReport,
    /// Total number of nodes (root excluded).
    pub node_count: usize,
    /// Number of nodes without children.
    pub leaf_count: usize,
    /// Deepest level.
    pub max_depth: usize,
    /// Average number of children over non-leaf nodes.
    pub avg_branching_factor: f64,
    /// Node count per level; index 0 is level 1.
    pub level_sizes: Vec<usize>,
}

impl HealthReport {
    /// Same as [`ValidationReport::is_healthy`].
    pub fn is_healthy(&self) -> bool {
        self.validation.is_healthy()
    }
}

impl fmt::Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} nodes, {} leaves, depth {}, branching {:.2}",
            self.node_count, self.leaf_count, self.max_depth, self.avg_branching_factor
        )?;
        writeln!(f, "per level: {:?}", self.level_sizes)?;
        write!(f, "{}", self.validation)
    }
}

/// Structural statistics plus soft findings for a built hierarchy.
pub trait HealthCheck {
    /// Compute the report.
    fn health_check(&self) -> HealthReport;

    /// Shorthand for `health_check().is_healthy()`.
    fn is_healthy(&self) -> bool {
        self.health_check().is_healthy()
    }
}

impl HealthCheck for HierarchyDefinition {
    fn health_check(&self) -> HealthReport {
        let mut validation = ValidationReport::new();
        let node_count = self.len();
        let max_depth = self.max_depth();

        let mut level_sizes = vec![0usize; max_depth];
        let mut leaf_count = 0;
        let mut internal = 0;
        let mut total_children = 0;
        for record in self.iter() {
            level_sizes[record.level - 1] += 1;
            let n_children = self.children(&record.node).map_or(0, |c| c.count());
            if n_children == 0 {
                leaf_count += 1;
            } else {
                internal += 1;
                total_children += n_children;
            }

            for (name, value) in self.attribute_columns().iter().zip(&record.attrs) {
                if value.is_null() {
                    validation.add(
                        ValidationIssue::new(Severity::Info, "attribute is null")
                            .with_node(record.node.clone())
                            .with_context(format!("column '{name}'")),
                    );
                }
            }
        }

        if node_count > 0 && leaf_count == node_count {
            validation.warn("hierarchy is flat: every node hangs directly under the root");
        }

        let avg_branching_factor = if internal == 0 {
            0.0
        } else {
            total_children as f64 / internal as f64
        };

        HealthReport {
            validation,
            node_count,
            leaf_count,
            max_depth,
            avg_branching_factor,
            level_sizes,
        }
    }
}

/// Validate that an edge table forms a tree under `root`, collecting every issue.
///
/// Unlike building a hierarchy this never fails; missing columns and empty
/// input are reported as critical issues.
pub fn validate_edges(
    edges: &Table,
    node_col: &str,
    parent_col: &str,
    root: &NodeId,
) -> ValidationReport {
    let mut report = ValidationReport::new();

    let (node_pos, parent_pos) = match (
        edges.column_index(node_col),
        edges.column_index(parent_col),
    ) {
        (Some(n), Some(p)) => (n, p),
        _ => {
            report.critical(format!(
                "edge table needs columns '{node_col}' and '{parent_col}'"
            ));
            return report;
        }
    };
    if edges.is_empty() {
        report.critical("edge table has no rows");
        return report;
    }

    // First definition wins; later duplicates are reported and ignored.
    let mut index: HashMap<NodeId, usize> = HashMap::new();
    let mut defined = vec![false; edges.len()];
    for row in 0..edges.len() {
        let node = match NodeId::from_cell(edges, row, node_pos) {
            Ok(node) => node,
            Err(e) => {
                report.add(ValidationIssue::new(Severity::Error, e.to_string()).with_row(row));
                continue;
            }
        };
        if &node == root {
            report.add(
                ValidationIssue::new(Severity::Error, "root is defined as a node")
                    .with_node(node)
                    .with_row(row),
            );
            continue;
        }
        if let Some(&first) = index.get(&node) {
            report.add(
                ValidationIssue::new(Severity::Error, "node defined more than once")
                    .with_node(node)
                    .with_row(row)
                    .with_context(format!("first defined at row {first}")),
            );
            continue;
        }
        let _ = index.insert(node, row);
        defined[row] = true;
    }

    let mut parents: Vec<Option<usize>> = vec![None; edges.len()];
    let mut top_level = 0;
    for row in (0..edges.len()).filter(|&r| defined[r]) {
        let parent = match NodeId::from_cell(edges, row, parent_pos) {
            Ok(parent) => parent,
            Err(e) => {
                report.add(ValidationIssue::new(Severity::Error, e.to_string()).with_row(row));
                continue;
            }
        };
        if &parent == root {
            top_level += 1;
        } else if let Some(&p) = index.get(&parent) {
            parents[row] = Some(p);
        } else {
            let node = NodeId::from_cell(edges, row, node_pos).ok();
            let mut issue = ValidationIssue::new(Severity::Error, "parent is not a defined node")
                .with_row(row)
                .with_context(format!("parent: {parent}"));
            if let Some(node) = node {
                issue = issue.with_node(node);
            }
            report.add(issue);
        }
    }

    if top_level == 0 {
        report.critical(format!("no node hangs directly under root {root}"));
    }

    for row in find_cycles(&parents) {
        let mut issue = ValidationIssue::new(Severity::Critical, "cycle in parent chain").with_row(row);
        if let Ok(node) = NodeId::from_cell(edges, row, node_pos) {
            issue = issue.with_node(node);
        }
        report.add(issue);
    }

    report
}
