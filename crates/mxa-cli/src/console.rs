//! Timestamped console progress

use mxa_harness::report::{ComparisonRow, PLACEHOLDER};
use mxa_harness::{
    HarnessError, PassSummary, Progress, ReportOutcome, RunResult, SweepPoint, Testcase,
};

/// `%m-%d %H:%M:%S`, local time
pub fn stamp() -> String {
    chrono::Local::now().format("%m-%d %H:%M:%S").to_string()
}

/// Prints pass progress on stdout
#[derive(Debug, Default)]
pub struct Console;

impl Progress for Console {
    fn round(&mut self, round: u64) {
        println!("{}: Round {round}", stamp());
    }

    fn sweep_point(&mut self, point: &SweepPoint) {
        println!("{}: {point}", stamp());
    }

    fn skipped(&mut self, testcase: &Testcase) {
        println!("Skipping {} (already ran)...", testcase.name);
    }

    fn running(&mut self, testcase: &Testcase) {
        println!("{}: Running {}...", stamp(), testcase.name);
    }

    fn finished(&mut self, result: &RunResult) {
        if !result.is_pass() {
            println!("Failed: {}", result.outcome);
        } else if result.telemetry.is_some() {
            println!("{}", result.console_line());
        } else {
            println!("Passed!");
        }
    }

    fn errored(&mut self, testcase: &Testcase, error: &HarnessError) {
        println!("Error: {}: {error}", testcase.name);
    }

    fn report(&mut self, outcome: &ReportOutcome) {
        print_report(outcome);
    }

    fn pass_finished(&mut self, summary: &PassSummary) {
        println!("{}: Test Finished ({summary})", stamp());
    }
}

fn cell(v: Option<f64>) -> String {
    v.map_or_else(|| PLACEHOLDER.to_string(), |x| format!("{x:.3}"))
}

fn print_row(row: &ComparisonRow) {
    println!(
        "{:<48} {:<6} {:>12} {:>12} {:>10}",
        row.model,
        row.verdict.map_or(PLACEHOLDER, |v| v.label()),
        cell(row.baseline_fps),
        cell(row.current_fps),
        cell(row.percentage)
    );
}

/// Print a report outcome as a table
pub fn print_report(outcome: &ReportOutcome) {
    match outcome {
        ReportOutcome::BaselineCreated => println!("No baseline yet; results stored as baseline"),
        ReportOutcome::Compared(rows) => {
            println!(
                "{:<48} {:<6} {:>12} {:>12} {:>10}",
                "Model", "Result", "FPS", "Testing", "Percent"
            );
            for row in rows {
                print_row(row);
            }
        }
    }
}
