//! Golden output comparison
//!
//! Loads the golden input and output tensors for every active port, runs the
//! package once over all frames, then checks each `(frame, output port)` pair.
//! A shape difference in any pair classifies the whole testcase as a shape
//! mismatch, whatever the other pairs say.

use crate::error::Result;
use crate::fmap;
use crate::locator::Testcase;
use crate::outcome::{Outcome, RunResult};
use mxa_dfp::{ElementType, PackageInspector, PortDescriptor};
use mxa_driver::{Accelerator, Tensor};
use tracing::{debug, warn};

/// Absolute tolerance
pub const ATOL: f64 = 1e-4;

/// Relative tolerance
pub const RTOL: f64 = 1e-5;

#[allow(clippy::float_cmp)]
fn close(a: f64, b: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return a.is_nan() && b.is_nan();
    }
    if a.is_infinite() || b.is_infinite() {
        return a == b;
    }
    (a - b).abs() <= ATOL + RTOL * b.abs()
}

/// Element-wise `|a - b| <= ATOL + RTOL·|b|`, with NaN equal to NaN
///
/// Slices of different length never match.
pub fn allclose(actual: &[f64], expected: &[f64]) -> bool {
    actual.len() == expected.len() && actual.iter().zip(expected).all(|(&a, &b)| close(a, b))
}

/// Verdict for one `(frame, port)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairVerdict {
    /// Values within tolerance
    Match,
    /// Same shape, values differ
    Mismatch,
    /// Shapes differ, or the device produced nothing for this pair
    ShapeMismatch,
}

/// Compare one actual tensor against its golden counterpart
pub fn compare_pair(actual: Option<&Tensor>, expected: &Tensor) -> PairVerdict {
    match actual {
        Some(a) if a.shape() == expected.shape() => {
            if allclose(&a.to_f64(), &expected.to_f64()) {
                PairVerdict::Match
            } else {
                PairVerdict::Mismatch
            }
        }
        _ => PairVerdict::ShapeMismatch,
    }
}

/// Reduce pair verdicts to a testcase outcome
///
/// Unanimous matches (or no pairs) pass; any shape mismatch wins over a
/// numeric mismatch.
pub fn classify(verdicts: &[PairVerdict]) -> Outcome {
    if verdicts.contains(&PairVerdict::ShapeMismatch) {
        Outcome::OfmapShapeMismatch
    } else if verdicts.contains(&PairVerdict::Mismatch) {
        Outcome::CompareFailed
    } else {
        Outcome::Pass
    }
}

/// Golden comparator bound to a package inspector
#[derive(Debug)]
pub struct GoldenComparator<'a> {
    inspector: &'a dyn PackageInspector,
    frames: usize,
}

impl<'a> GoldenComparator<'a> {
    /// Create a comparator checking `frames` golden frames per port
    pub fn new(inspector: &'a dyn PackageInspector, frames: usize) -> Self {
        Self { inspector, frames }
    }

    fn load_inputs(&self, tc: &Testcase, ports: &[&PortDescriptor]) -> Result<Vec<Tensor>> {
        let mut inputs = Vec::with_capacity(ports.len());
        for port in ports {
            let frames = (0..self.frames)
                .map(|f| {
                    let path = fmap::golden_input_path(&tc.dir, port.index, f);
                    fmap::load_tensor(&path, &port.shape, port.element_type())
                })
                .collect::<Result<Vec<_>>>()?;
            inputs.push(Tensor::stack(&frames)?);
        }
        Ok(inputs)
    }

    fn load_expected(&self, tc: &Testcase, ports: &[&PortDescriptor]) -> Result<Vec<Vec<Tensor>>> {
        ports
            .iter()
            .map(|port| {
                (0..self.frames)
                    .map(|f| {
                        let path = fmap::golden_output_path(&tc.dir, port.index, f);
                        fmap::load_tensor(&path, &port.shape, ElementType::F32)
                    })
                    .collect()
            })
            .collect()
    }

    /// Evaluate one testcase
    ///
    /// Classifications are returned as data. Errors are infrastructure
    /// failures (unreadable golden tensors, inspection I/O) and carry no
    /// classification.
    ///
    /// # Errors
    ///
    /// Returns error if golden tensors cannot be loaded or the package
    /// cannot be inspected.
    pub fn evaluate(&self, tc: &Testcase, accelerator: &mut dyn Accelerator) -> Result<RunResult> {
        let package = tc.package_path();
        if !package.is_file() {
            debug!("{}: {} is not a file", tc.name, package.display());
            return Ok(RunResult::failed(&tc.name, Outcome::DfpMissing));
        }
        let Some(info) = self.inspector.inspect(&package)? else {
            debug!("{}: inspection returned no metadata", tc.name);
            return Ok(RunResult::failed(&tc.name, Outcome::DfpMissing));
        };

        let in_ports: Vec<&PortDescriptor> = info.active_inputs().collect();
        let out_ports: Vec<&PortDescriptor> = info.active_outputs().collect();
        let inputs = self.load_inputs(tc, &in_ports)?;
        let expected = self.load_expected(tc, &out_ports)?;

        let run = match accelerator.run(&package, Some(&inputs), self.frames as u32, false) {
            Ok(run) => run,
            Err(e) => {
                warn!("{}: device run failed: {e}", tc.name);
                return Ok(RunResult::failed(&tc.name, Outcome::OfmapTimeout));
            }
        };
        let outputs = match run.outputs {
            Some(outputs) if !(outputs.is_empty() && !expected.is_empty()) => outputs,
            _ => return Ok(RunResult::failed(&tc.name, Outcome::NoSimOfmap)),
        };

        let mut verdicts = Vec::with_capacity(self.frames * expected.len());
        for f in 0..self.frames {
            for (j, golden) in expected.iter().enumerate() {
                let actual = outputs.get(j).and_then(|t| t.frame(f));
                let verdict = compare_pair(actual.as_ref(), &golden[f]);
                if verdict != PairVerdict::Match {
                    debug!("{}: frame {f} ofmap {} {verdict:?}", tc.name, out_ports[j].index);
                }
                verdicts.push(verdict);
            }
        }

        let outcome = classify(&verdicts);
        if outcome.is_pass() {
            return Ok(RunResult::passed(&tc.name, run.fps));
        }

        // Failure dumps: one file per actual (port, frame).
        for (p, tensor) in outputs.iter().enumerate() {
            let port = out_ports.get(p).map_or(p, |d| d.index);
            for f in 0..tensor.frames() {
                if let Some(frame) = tensor.frame(f) {
                    fmap::save_text(&fmap::dump_path(&tc.dir, port, f), &frame.to_f64())?;
                }
            }
        }
        Ok(RunResult::failed(&tc.name, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mxa_dfp::Shape;

    fn t(dims: &[usize], values: &[f64]) -> Tensor {
        Tensor::from_f64(Shape::new(dims.to_vec()), values, ElementType::F32).unwrap()
    }

    #[test]
    fn identical_within_tolerance_passes() {
        assert!(allclose(&[1.0, 2.0], &[1.00005, 2.0]));
        assert!(!allclose(&[1.0, 2.0], &[1.001, 2.0]));
        assert!(!allclose(&[1.0], &[1.0, 2.0]));
    }

    #[test]
    fn nan_equals_nan_only() {
        assert!(allclose(&[f64::NAN], &[f64::NAN]));
        assert!(!allclose(&[f64::NAN], &[0.0]));
        assert!(allclose(&[f64::INFINITY], &[f64::INFINITY]));
        assert!(!allclose(&[f64::INFINITY], &[f64::NEG_INFINITY]));
    }

    #[test]
    fn relative_term_scales_with_expected() {
        // 1e-4 + 1e-5 * 1000 = 0.0101
        assert!(allclose(&[1000.01], &[1000.0]));
        assert!(!allclose(&[1000.02], &[1000.0]));
    }

    #[test]
    fn shape_difference_overrides_content() {
        let expected = t(&[2, 2], &[1.0, 2.0, 3.0, 4.0]);
        let reshaped = t(&[4], &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(compare_pair(Some(&reshaped), &expected), PairVerdict::ShapeMismatch);
        assert_eq!(compare_pair(None, &expected), PairVerdict::ShapeMismatch);
        assert_eq!(compare_pair(Some(&expected), &expected), PairVerdict::Match);
    }

    #[test]
    fn classification_priority() {
        use PairVerdict::*;
        assert_eq!(classify(&[Match, Match]), Outcome::Pass);
        assert_eq!(classify(&[]), Outcome::Pass);
        assert_eq!(classify(&[Match, Mismatch]), Outcome::CompareFailed);
        assert_eq!(classify(&[Mismatch, ShapeMismatch, Match]), Outcome::OfmapShapeMismatch);
    }
}
