//! Human-readable output for suite results.
//!
//! Tables go to stdout; failure details go through the logger to stderr.

use log::error;

use crate::runner::{RunSummary, SuiteOutcome};
use crate::suite::{SuiteReport, TrialResult};

const RULE_WIDTH: usize = 60;

/// Formats a suite report as a block of text.
pub fn format_suite(report: &SuiteReport) -> String {
    let mut output = String::new();
    output.push_str(&format!("Suite: {}\n", report.name));
    output.push_str(&"-".repeat(RULE_WIDTH));
    output.push('\n');

    let width = report
        .trials
        .iter()
        .map(|t| t.name.chars().count())
        .max()
        .unwrap_or(0);

    for trial in &report.trials {
        match &trial.result {
            TrialResult::Measured(stats) => output.push_str(&format!(
                "  {:<width$} x {} ops/sec ±{:.2}% ({} runs sampled)\n",
                trial.name,
                format_rate(stats.ops_per_sec),
                stats.rme,
                stats.samples,
            )),
            TrialResult::Failed { error } => output.push_str(&format!(
                "  {:<width$} x failed: {}\n",
                trial.name, error
            )),
        }
    }

    let fastest = report.fastest();
    if !fastest.is_empty() {
        output.push_str(&format!("Fastest is {}\n", fastest.join(", ")));
    }
    output
}

/// Formats either a completed suite or the reason it never started.
pub fn format_outcome(outcome: &SuiteOutcome) -> String {
    match outcome {
        SuiteOutcome::Completed(report) => format_suite(report),
        SuiteOutcome::Failed { name, error } => format!(
            "Suite: {}\n{}\n  not run: {}\n",
            name,
            "-".repeat(RULE_WIDTH),
            error
        ),
    }
}

/// Default completion handler.
pub fn print_outcome(outcome: &SuiteOutcome) {
    println!("{}", format_outcome(outcome));
}

/// Final pass over a run: every error, once, on stderr.
pub fn log_failures(summary: &RunSummary) {
    for outcome in summary.failed_suites() {
        if let SuiteOutcome::Failed { name, error } = outcome {
            error!("suite `{name}` did not run: {error}");
        }
    }
    for (suite, trial, message) in summary.trial_failures() {
        error!("{suite} / {trial}: {message}");
    }
}

/// Rounds a rate and groups its digits, e.g. `1234567.8` -> `1,234,568`.
/// Rates below 100 keep two decimals.
pub fn format_rate(rate: f64) -> String {
    if !rate.is_finite() {
        return rate.to_string();
    }
    if rate < 100.0 {
        return format!("{rate:.2}");
    }
    let digits = format!("{:.0}", rate);
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Stats;
    use crate::suite::TrialReport;

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(1234567.8), "1,234,568");
        assert_eq!(format_rate(999.4), "999");
        assert_eq!(format_rate(1000.0), "1,000");
        assert_eq!(format_rate(12.345), "12.35");
    }

    #[test]
    fn test_format_suite() {
        let report = SuiteReport {
            name: "insert row".to_string(),
            trials: vec![
                TrialReport {
                    name: "direct".to_string(),
                    min_samples: 5,
                    result: TrialResult::Measured(Stats::from_samples(&[0.5; 8])),
                },
                TrialReport {
                    name: "query builder".to_string(),
                    min_samples: 5,
                    result: TrialResult::Failed {
                        error: "no such table: people".to_string(),
                    },
                },
            ],
        };
        let text = format_suite(&report);
        assert!(text.starts_with("Suite: insert row\n"));
        assert!(text.contains("  direct        x 2.00 ops/sec ±0.00% (8 runs sampled)\n"));
        assert!(text.contains("  query builder x failed: no such table: people\n"));
        assert!(text.ends_with("Fastest is direct\n"));
    }

    #[test]
    fn test_format_not_started() {
        let outcome = SuiteOutcome::Failed {
            name: "count rows".to_string(),
            error: "pool closed".to_string(),
        };
        assert!(format_outcome(&outcome).contains("not run: pool closed"));
    }
}
