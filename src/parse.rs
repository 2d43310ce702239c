//! Parsing of `/usr/bin/time -v` reports and cargo's build summary line.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::SweepError;
use crate::types::Sample;

static ELAPSED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Elapsed .*?: ([0-9:]+\.?[0-9]*)").expect("valid elapsed regex"));

static MAX_RSS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Maximum resident set size \(kbytes\): (\d+)").expect("valid max rss regex")
});

static BUILD_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[optimized\] target\(s\) in ([\d.]+)s").expect("valid build time regex")
});

/// Extract elapsed wall-clock seconds and peak memory (MB) from a verbose
/// timing report.
///
/// A field that is absent or malformed comes back as `None`; it never stops the
/// other field from being read.
pub fn parse_time_report(log: &str) -> Sample {
    Sample {
        elapsed_secs: parse_elapsed(log),
        memory_mb: parse_max_rss_mb(log),
    }
}

/// Wall-clock time in seconds from an `Elapsed ...: H:MM:SS.ss`, `M:SS.ss` or
/// `SS.ss` line.
pub fn parse_elapsed(log: &str) -> Option<f64> {
    let captures = ELAPSED_RE.captures(log)?;
    let raw = captures.get(1)?.as_str();

    let parts = raw
        .split(':')
        .map(|p| p.parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .ok()?;

    match parts.as_slice() {
        [hours, minutes, seconds] => Some(hours * 3600.0 + minutes * 60.0 + seconds),
        [minutes, seconds] => Some(minutes * 60.0 + seconds),
        // Unexpected field count: fall back to the leading field.
        [first, ..] => Some(*first),
        [] => None,
    }
}

/// Peak resident set size converted from kilobytes to megabytes.
pub fn parse_max_rss_mb(log: &str) -> Option<f64> {
    let captures = MAX_RSS_RE.captures(log)?;
    let kbytes: u64 = captures.get(1)?.as_str().parse().ok()?;
    Some(kbytes as f64 / 1024.0)
}

/// Build duration reported by `cargo run` before it starts the binary.
///
/// Subtracted from each compiled-driver measurement. Absence is an error.
pub fn extract_build_time(output: &str) -> Result<f64, SweepError> {
    BUILD_TIME_RE
        .captures(output)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .ok_or_else(|| SweepError::BuildTimeNotFound {
            output: output.to_string(),
        })
}
