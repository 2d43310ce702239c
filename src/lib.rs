pub mod chart;
pub mod config;
pub mod display;
pub mod errors;
pub mod notify;
pub mod parse;
pub mod process;
pub mod stats;
pub mod sweep;
pub mod types;

#[cfg(test)]
mod pipeline_tests {
    // The same captured stderr feeds both the timing parser and the build
    // offset extractor. Check they agree on the real tool output fixtures and
    // that the corrected figure is what flows into the summary.

    use crate::parse::{extract_build_time, parse_time_report};
    use crate::stats::summarize;

    const COMPILED_RUN: &str = include_str!("../tests/fixtures/compiled_run.stderr");
    const SCRIPTED_RUN: &str = include_str!("../tests/fixtures/scripted_run.stderr");

    #[test]
    fn compiled_fixture_yields_corrected_elapsed() {
        let sample = parse_time_report(COMPILED_RUN);
        let offset = extract_build_time(COMPILED_RUN).unwrap();
        let corrected = sample.elapsed_secs.unwrap() - offset;
        assert!((corrected - 3.8).abs() < 1e-9, "got {corrected}");
    }

    #[test]
    fn scripted_fixture_has_no_build_line() {
        assert!(extract_build_time(SCRIPTED_RUN).is_err());
        assert!(parse_time_report(SCRIPTED_RUN).elapsed_secs.is_some());
    }

    #[test]
    fn parsed_samples_summarize() {
        let samples: Vec<Option<f64>> = [COMPILED_RUN, SCRIPTED_RUN]
            .iter()
            .map(|log| parse_time_report(log).memory_mb)
            .collect();
        let summary = summarize(&samples);
        // 50 MB and 2 MB
        assert!((summary.mean - 26.0).abs() < 1e-9);
        assert!((summary.std_dev - 24.0).abs() < 1e-9);
        assert_eq!(summary.count, 2);
    }
}
