//! Testcase classifications and run results

use mxa_driver::OperatingPoint;
use std::fmt;

/// Terminal classification of one evaluated testcase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// All compared (frame, port) pairs matched, or the throughput run finished
    Pass,
    /// The device run failed
    OfmapTimeout,
    /// At least one pair differed numerically
    CompareFailed,
    /// Reserved
    IgrNotEmpty,
    /// Reserved
    MultiIoFlow,
    /// No `model.dfp`, or inspection gave no metadata
    DfpMissing,
    /// The device returned no output tensors
    NoSimOfmap,
    /// At least one pair had a different shape
    OfmapShapeMismatch,
}

impl Outcome {
    /// Human-readable label printed on the console and written to the ledger
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::OfmapTimeout => "Ofmap timeout",
            Self::CompareFailed => "Compare failed",
            Self::IgrNotEmpty => "IGR not empty",
            Self::MultiIoFlow => "Multi in/out flow",
            Self::DfpMissing => "DFP missing",
            Self::NoSimOfmap => "No sim ofmap",
            Self::OfmapShapeMismatch => "Ofmap shape mismatch",
        }
    }

    /// True only for [`Outcome::Pass`]
    pub const fn is_pass(self) -> bool {
        matches!(self, Self::Pass)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Telemetry reduced over one benchmark invocation
///
/// A field is `None` when no sample of that kind was collected.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TelemetryAverages {
    /// Worker CPU utilization, percent of one logical core
    pub cpu_percent: Option<f64>,
    /// Device power in mW
    pub power_mw: Option<f64>,
    /// Device temperature in °C
    pub temperature_c: Option<f64>,
}

impl TelemetryAverages {
    /// True when no sequence had any sample
    pub const fn is_empty(&self) -> bool {
        self.cpu_percent.is_none() && self.power_mw.is_none() && self.temperature_c.is_none()
    }
}

/// Immutable result of evaluating one testcase
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// Testcase directory name
    pub model: String,
    /// Classification
    pub outcome: Outcome,
    /// Frames per second, present on PASS
    pub fps: Option<f64>,
    /// Averaged telemetry, performance passes only
    pub telemetry: Option<TelemetryAverages>,
    /// Operating point at evaluation time
    pub operating_point: Option<OperatingPoint>,
}

impl RunResult {
    /// Non-passing result without metrics
    pub fn failed(model: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            model: model.into(),
            outcome,
            fps: None,
            telemetry: None,
            operating_point: None,
        }
    }

    /// Passing result; fps is clamped to a non-negative finite value
    pub fn passed(model: impl Into<String>, fps: f64) -> Self {
        let fps = if fps.is_finite() { fps.max(0.0) } else { 0.0 };
        Self {
            model: model.into(),
            outcome: Outcome::Pass,
            fps: Some(fps),
            telemetry: None,
            operating_point: None,
        }
    }

    /// Attach averaged telemetry
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: TelemetryAverages) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Attach the operating point
    #[must_use]
    pub fn with_operating_point(mut self, op: Option<OperatingPoint>) -> Self {
        self.operating_point = op;
        self
    }

    /// True for PASS
    pub const fn is_pass(&self) -> bool {
        self.outcome.is_pass()
    }

    /// One-line console summary
    ///
    /// `name, PASS, 123.456 FPS, CPU 1.000, 2.000mW, 3.000C, 600.000MHz, 700.000mV, Thermal 100.000C`
    pub fn console_line(&self) -> String {
        let mut line = format!("{:<64}, {:<4}", self.model, self.outcome.label());
        if let Some(fps) = self.fps {
            line.push_str(&format!(", {fps:6.3} FPS"));
        }
        if let Some(t) = &self.telemetry {
            let v = |x: Option<f64>| x.map_or_else(|| "n/a".to_string(), |x| format!("{x:.3}"));
            line.push_str(&format!(
                ", CPU {}, {}mW, {}C",
                v(t.cpu_percent),
                v(t.power_mw),
                v(t.temperature_c)
            ));
        }
        if let Some(op) = &self.operating_point {
            line.push_str(&format!(
                ", {:.3}MHz, {:.3}mV, Thermal {:.3}C",
                op.frequency_mhz, op.voltage_mv, op.thermal_threshold_c
            ));
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_clamps_fps() {
        assert_eq!(RunResult::passed("k_a", -3.0).fps, Some(0.0));
        assert_eq!(RunResult::passed("k_a", f64::NAN).fps, Some(0.0));
        assert_eq!(RunResult::passed("k_a", 12.5).fps, Some(12.5));
    }

    #[test]
    fn console_line_carries_operating_point() {
        let r = RunResult::passed("k_net", 100.0)
            .with_telemetry(TelemetryAverages {
                cpu_percent: Some(4.0),
                power_mw: Some(20.0),
                temperature_c: Some(45.0),
            })
            .with_operating_point(Some(OperatingPoint {
                frequency_mhz: 600.0,
                voltage_mv: 700.0,
                thermal_threshold_c: 100.0,
            }));
        let line = r.console_line();
        assert!(line.starts_with("k_net"));
        assert!(line.contains("PASS, 100.000 FPS, CPU 4.000, 20.000mW, 45.000C"));
        assert!(line.ends_with("600.000MHz, 700.000mV, Thermal 100.000C"));
    }

    #[test]
    fn failed_result_has_no_metrics() {
        let r = RunResult::failed("tf_x", Outcome::DfpMissing);
        assert!(!r.is_pass());
        assert!(r.fps.is_none());
        assert!(r.console_line().contains("DFP missing"));
    }
}
