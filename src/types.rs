use std::fmt;

use serde::{Serialize, Serializer};

/// Column label used for the compiled driver in every table.
pub const COMPILED_LABEL: &str = "rust-driver";

/// One of the compared driver variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Implementation {
    /// The compiled benchmark binary, run through `cargo run`.
    Compiled,
    /// A scripting-language client library, run through node.
    Scripted(String),
}

impl Implementation {
    pub fn label(&self) -> &str {
        match self {
            Implementation::Compiled => COMPILED_LABEL,
            Implementation::Scripted(lib) => lib,
        }
    }
}

impl fmt::Display for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Implementation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// A single observation from one process run. Either field is `None` when the
/// timing wrapper did not report it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Sample {
    pub elapsed_secs: Option<f64>,
    pub memory_mb: Option<f64>,
}

impl Sample {
    pub fn missing() -> Self {
        Self::default()
    }
}

/// Sample lists for one size step, one list per table column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub size: f64,
    pub cells: Vec<Vec<Option<f64>>>,
}

/// One row per size step, one column per implementation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultTable {
    pub columns: Vec<Implementation>,
    pub rows: Vec<ResultRow>,
}

impl ResultTable {
    pub fn new(columns: Vec<Implementation>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row. `cells` must line up with `columns`.
    pub fn push_row(&mut self, size: f64, cells: Vec<Vec<Option<f64>>>) {
        debug_assert_eq!(cells.len(), self.columns.len());
        self.rows.push(ResultRow { size, cells });
    }

    pub fn column_index(&self, implementation: &Implementation) -> Option<usize> {
        self.columns.iter().position(|c| c == implementation)
    }
}

/// Time and memory tables for one benchmark, as produced by the sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkResults {
    pub name: String,
    pub time: ResultTable,
    pub memory: ResultTable,
}

/// A command the sweep would execute, and how many times.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCommand {
    pub command: String,
    pub times: usize,
}

/// Quotes `s` for a POSIX shell if it contains anything outside a safe set.
/// Internal single quotes are escaped as `'\''`.
pub fn shell_quote(s: &str) -> String {
    let safe = !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | '+' | ','));
    if safe {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}
