use chrono::{DateTime, Utc};
use owo_colors::{OwoColorize, Stream, Style};
use serde::Serialize;

use crate::stats::{BenchmarkSummary, Summary, SummaryTable};
use crate::sweep::size_arg;
use crate::types::{BenchmarkResults, PlannedCommand};

/// Format `mean ± std_dev` with a unit suffix, or a dash when nothing was measured.
pub fn format_cell(summary: &Summary, unit: &str) -> String {
    if summary.is_empty() {
        return "-".to_string();
    }
    let mut out = format!("{:.2} ± {:.2}{}", summary.mean, summary.std_dev, unit);
    if summary.missing > 0 {
        out.push_str(&format!(" ({} missing)", summary.missing));
    }
    out
}

/// Thousands-separated integer size, e.g. `62,500`.
pub fn format_size(size: f64) -> String {
    let digits = size_arg(size).to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn style_heading() -> Style {
    Style::new().cyan().bold()
}

fn style_missing() -> Style {
    Style::new().dimmed().italic()
}

fn format_table(out: &mut String, label: &str, unit: &str, table: &SummaryTable) {
    let cells: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row.cells.iter().map(|s| format_cell(s, unit)).collect())
        .collect();
    let sizes: Vec<String> = table.rows.iter().map(|row| format_size(row.size)).collect();

    let size_width = sizes.iter().map(|s| s.len()).max().unwrap_or(0).max(1);
    let widths: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .map(|(c, implementation)| {
            cells
                .iter()
                .map(|row| row[c].chars().count())
                .chain(std::iter::once(implementation.label().len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    out.push_str(&format!(
        "  {}\n",
        label.if_supports_color(Stream::Stdout, |s| s.dimmed())
    ));

    let mut header = format!("    {:>size_width$}", "n");
    for (implementation, &width) in table.columns.iter().zip(&widths) {
        header.push_str(&format!("  {:>width$}", implementation.label()));
    }
    out.push_str(&header.if_supports_color(Stream::Stdout, |s| s.bold()).to_string());
    out.push('\n');

    let missing = style_missing();
    for (size, row) in sizes.iter().zip(&cells) {
        out.push_str(&format!(
            "    {}",
            format!("{size:>size_width$}").if_supports_color(Stream::Stdout, |s| s.yellow())
        ));
        for (cell, &width) in row.iter().zip(&widths) {
            let padded = format!("{cell:>width$}");
            let colored = if cell == "-" {
                padded
                    .if_supports_color(Stream::Stdout, |s| s.style(missing))
                    .to_string()
            } else {
                padded
                    .if_supports_color(Stream::Stdout, |s| s.green())
                    .to_string()
            };
            out.push_str("  ");
            out.push_str(&colored);
        }
        out.push('\n');
    }
}

/// End-of-run summary: per benchmark, a time table and a memory table.
pub fn format_summary(summaries: &[BenchmarkSummary]) -> String {
    let mut out = String::new();
    let heading = style_heading();

    for summary in summaries {
        out.push_str(
            &format!("Benchmark - {}", summary.name)
                .if_supports_color(Stream::Stdout, |s| s.style(heading))
                .to_string(),
        );
        out.push('\n');
        format_table(&mut out, "Time [s]", "s", &summary.time);
        format_table(&mut out, "Memory [MB]", " MB", &summary.memory);
        out.push('\n');
    }

    out
}

/// Dry-run listing of every command the sweep would run.
pub fn format_plan(plan: &[PlannedCommand]) -> String {
    let mut out = String::new();
    let total: usize = plan.iter().map(|p| p.times).sum();

    for planned in plan {
        let times = format!("{:>3}x", planned.times);
        out.push_str(&format!(
            "{}  {}\n",
            times.if_supports_color(Stream::Stdout, |s| s.dimmed()),
            planned.command
        ));
    }

    out.push_str(
        &format!("{} process invocations", total)
            .if_supports_color(Stream::Stdout, |s| s.dimmed())
            .to_string(),
    );
    out.push('\n');
    out
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    benchmarks: Vec<JsonBenchmark<'a>>,
}

#[derive(Serialize)]
struct JsonBenchmark<'a> {
    name: &'a str,
    results: &'a BenchmarkResults,
    summary: &'a BenchmarkSummary,
}

/// Raw tables and their summaries as pretty-printed JSON.
pub fn format_json(
    results: &[BenchmarkResults],
    summaries: &[BenchmarkSummary],
    now: DateTime<Utc>,
) -> String {
    let report = JsonReport {
        generated_at: now.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        benchmarks: results
            .iter()
            .zip(summaries)
            .map(|(results, summary)| JsonBenchmark {
                name: &results.name,
                results,
                summary,
            })
            .collect(),
    };

    serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
}
