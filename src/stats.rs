//! Summary statistics over the sweep's sample lists.
//!
//! Mean and standard deviation are computed from present samples only.
//! Trials the timing wrapper did not report are counted, never averaged in.

use serde::Serialize;

use crate::types::{BenchmarkResults, Implementation, ResultTable};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Summary {
    pub mean: f64,
    /// Population standard deviation (divides by `count`)
    pub std_dev: f64,
    pub count: usize,
    pub missing: usize,
}

impl Summary {
    /// True when no sample was present; `mean` and `std_dev` are 0 then.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

pub fn summarize(samples: &[Option<f64>]) -> Summary {
    let present: Vec<f64> = samples.iter().flatten().copied().collect();
    let missing = samples.len() - present.len();

    if present.is_empty() {
        return Summary {
            missing,
            ..Summary::default()
        };
    }

    let n = present.len() as f64;
    let mean = present.iter().sum::<f64>() / n;
    let variance = present.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

    Summary {
        mean,
        std_dev: variance.sqrt(),
        count: present.len(),
        missing,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub size: f64,
    pub cells: Vec<Summary>,
}

/// A `ResultTable` with each sample list reduced to its `Summary`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTable {
    pub columns: Vec<Implementation>,
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    /// `(size, summary)` points for one column, in row order.
    pub fn series(&self, column: usize) -> impl Iterator<Item = (f64, Summary)> + '_ {
        self.rows.iter().map(move |row| (row.size, row.cells[column]))
    }
}

pub fn summarize_table(table: &ResultTable) -> SummaryTable {
    SummaryTable {
        columns: table.columns.clone(),
        rows: table
            .rows
            .iter()
            .map(|row| SummaryRow {
                size: row.size,
                cells: row.cells.iter().map(|cell| summarize(cell)).collect(),
            })
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkSummary {
    pub name: String,
    pub time: SummaryTable,
    pub memory: SummaryTable,
}

pub fn summarize_results(results: &[BenchmarkResults]) -> Vec<BenchmarkSummary> {
    results
        .iter()
        .map(|r| BenchmarkSummary {
            name: r.name.clone(),
            time: summarize_table(&r.time),
            memory: summarize_table(&r.memory),
        })
        .collect()
}
