//! Performance report against a stored baseline
//!
//! The first finished performance ledger becomes the baseline. Later ledgers
//! are compared model by model and written to a fresh comparison table; the
//! baseline itself is never updated.

use crate::error::Result;
use crate::ledger::{Ledger, LedgerRow};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Placeholder cell for rows without a usable fps
pub const PLACEHOLDER: &str = "----";

/// Classification of a current/baseline ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Above 90 %
    Good,
    /// Above 70 %
    Check,
    /// 70 % or below
    Wrong,
    /// No usable baseline entry
    New,
}

impl Verdict {
    /// Label written to the comparison table
    pub const fn label(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Check => "Check",
            Self::Wrong => "Wrong",
            Self::New => "New",
        }
    }

    /// Classify a percentage of the baseline
    pub fn classify(percentage: f64) -> Self {
        if percentage > 90.0 {
            Self::Good
        } else if percentage > 70.0 {
            Self::Check
        } else {
            Self::Wrong
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the comparison table
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    /// Testcase identity
    pub model: String,
    /// `None` when the current run has no fps
    pub verdict: Option<Verdict>,
    /// Baseline fps
    pub baseline_fps: Option<f64>,
    /// Current fps
    pub current_fps: Option<f64>,
    /// `current / baseline * 100`
    pub percentage: Option<f64>,
}

impl ComparisonRow {
    fn placeholder(model: &str) -> Self {
        Self {
            model: model.to_string(),
            verdict: None,
            baseline_fps: None,
            current_fps: None,
            percentage: None,
        }
    }

    fn record(&self) -> CsvRow {
        let cell = |v: Option<f64>| v.map_or_else(|| PLACEHOLDER.to_string(), |x| x.to_string());
        CsvRow {
            model: self.model.clone(),
            result: self.verdict.map_or(PLACEHOLDER, Verdict::label).to_string(),
            fps: cell(self.baseline_fps),
            testing: cell(self.current_fps),
            percentage: cell(self.percentage),
        }
    }
}

#[derive(Serialize)]
struct CsvRow {
    #[serde(rename = "Model")]
    model: String,
    #[serde(rename = "Result")]
    result: String,
    #[serde(rename = "FPS")]
    fps: String,
    #[serde(rename = "Testing")]
    testing: String,
    #[serde(rename = "Percentage %")]
    percentage: String,
}

/// Collapse rows to one fps per model: last value wins, first position kept
fn by_model(rows: &[LedgerRow]) -> Vec<(String, Option<f64>)> {
    let mut out: Vec<(String, Option<f64>)> = Vec::new();
    for row in rows {
        match out.iter_mut().find(|(m, _)| *m == row.model) {
            Some(entry) => entry.1 = row.fps,
            None => out.push((row.model.clone(), row.fps)),
        }
    }
    out
}

/// Compare current ledger rows against baseline rows
pub fn compare(current: &[LedgerRow], baseline: &[LedgerRow]) -> Vec<ComparisonRow> {
    let baseline = by_model(baseline);
    by_model(current)
        .into_iter()
        .map(|(model, fps)| {
            let Some(current_fps) = fps.filter(|v| !v.is_nan()) else {
                return ComparisonRow::placeholder(&model);
            };
            let base = baseline
                .iter()
                .find(|(m, _)| *m == model)
                .and_then(|(_, v)| *v)
                .filter(|v| v.is_finite() && *v != 0.0);
            match base {
                Some(base) => {
                    let percentage = current_fps / base * 100.0;
                    ComparisonRow {
                        model,
                        verdict: Some(Verdict::classify(percentage)),
                        baseline_fps: Some(base),
                        current_fps: Some(current_fps),
                        percentage: Some(percentage),
                    }
                }
                None => ComparisonRow {
                    model,
                    verdict: Some(Verdict::New),
                    baseline_fps: Some(current_fps),
                    current_fps: Some(current_fps),
                    percentage: Some(100.0),
                },
            }
        })
        .collect()
}

/// What [`reduce`] did
#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    /// No baseline existed; the results became the baseline
    BaselineCreated,
    /// Comparison table written
    Compared(Vec<ComparisonRow>),
}

/// Reduce a finished performance ledger
///
/// # Errors
///
/// Returns error if a file cannot be read or written.
pub fn reduce(result_path: &Path, baseline_path: &Path, compare_path: &Path) -> Result<ReportOutcome> {
    if !baseline_path.is_file() {
        std::fs::copy(result_path, baseline_path)?;
        info!("baseline {} created from {}", baseline_path.display(), result_path.display());
        return Ok(ReportOutcome::BaselineCreated);
    }

    let rows = compare(&Ledger::read_rows(result_path)?, &Ledger::read_rows(baseline_path)?);
    let mut writer = csv::Writer::from_path(compare_path)?;
    for row in &rows {
        writer.serialize(row.record())?;
    }
    writer.flush()?;
    info!("comparison {} written, {} rows", compare_path.display(), rows.len());
    Ok(ReportOutcome::Compared(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(model: &str, fps: Option<f64>) -> LedgerRow {
        LedgerRow {
            model: model.to_string(),
            result: "PASS".to_string(),
            fps,
            ..LedgerRow::default()
        }
    }

    #[test]
    fn thresholds() {
        let baseline = [row("a", Some(100.0)), row("b", Some(100.0)), row("c", Some(100.0))];
        let current = [row("a", Some(95.0)), row("b", Some(75.0)), row("c", Some(50.0))];
        let verdicts: Vec<_> = compare(&current, &baseline).iter().map(|r| r.verdict).collect();
        assert_eq!(
            verdicts,
            vec![Some(Verdict::Good), Some(Verdict::Check), Some(Verdict::Wrong)]
        );
    }

    #[test]
    fn boundaries_are_exclusive() {
        assert_eq!(Verdict::classify(90.0), Verdict::Check);
        assert_eq!(Verdict::classify(70.0), Verdict::Wrong);
        assert_eq!(Verdict::classify(90.01), Verdict::Good);
    }

    #[test]
    fn missing_baseline_entry_is_new() {
        let rows = compare(&[row("k_new", Some(42.0))], &[row("k_old", Some(10.0))]);
        assert_eq!(rows[0].verdict, Some(Verdict::New));
        assert_eq!(rows[0].percentage, Some(100.0));
        assert_eq!(rows[0].baseline_fps, Some(42.0));
    }

    #[test]
    fn missing_fps_is_placeholder() {
        let rows = compare(&[row("k_a", None), row("k_b", Some(f64::NAN))], &[row("k_a", Some(1.0))]);
        assert!(rows.iter().all(|r| r.verdict.is_none() && r.percentage.is_none()));
    }

    #[test]
    fn duplicate_models_keep_last_value() {
        let rows = compare(
            &[row("a", Some(10.0)), row("b", Some(1.0)), row("a", Some(100.0))],
            &[row("a", Some(100.0))],
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].model, "a");
        assert_eq!(rows[0].verdict, Some(Verdict::Good));
    }

    #[test]
    fn first_report_creates_baseline_then_compares() {
        let dir = TempDir::new().unwrap();
        let result = dir.path().join("performance_result.csv");
        let baseline = dir.path().join("performance_gloden.csv");
        let report = dir.path().join("performance_compare.csv");

        std::fs::write(&result, "Model,Result,FPS,CPU,Power,Temperature\nk_a,PASS,100,1,2,3\n").unwrap();
        assert_eq!(reduce(&result, &baseline, &report).unwrap(), ReportOutcome::BaselineCreated);
        assert!(baseline.is_file());
        assert!(!report.exists());

        std::fs::write(&result, "Model,Result,FPS\nk_a,PASS,80\nk_b,DFP missing,\n").unwrap();
        let ReportOutcome::Compared(rows) = reduce(&result, &baseline, &report).unwrap() else {
            panic!("expected a comparison");
        };
        assert_eq!(rows.len(), 2);

        let text = std::fs::read_to_string(&report).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Model,Result,FPS,Testing,Percentage %");
        assert_eq!(lines[1], "k_a,Check,100,80,80");
        assert_eq!(lines[2], "k_b,----,----,----,----");

        // baseline untouched
        assert!(std::fs::read_to_string(&baseline).unwrap().contains("k_a,PASS,100"));
    }
}
