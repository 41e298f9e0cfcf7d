//! Golden feature-map text files
//!
//! Each `(direction, port, frame)` tensor lives in `{testcase}/fmaps/` as
//! whitespace-separated numbers, one or more per line. `#` starts a comment.

use crate::error::{HarnessError, Result};
use mxa_dfp::{ElementType, Shape};
use mxa_driver::Tensor;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Directory holding golden and dumped tensors
pub fn fmaps_dir(testcase_dir: &Path) -> PathBuf {
    testcase_dir.join("fmaps")
}

/// Golden input tensor for `(port, frame)`
pub fn golden_input_path(testcase_dir: &Path, port: usize, frame: usize) -> PathBuf {
    fmaps_dir(testcase_dir).join(format!("ifmap_truth_{port}_{frame}"))
}

/// Golden output tensor for `(port, frame)`
pub fn golden_output_path(testcase_dir: &Path, port: usize, frame: usize) -> PathBuf {
    fmaps_dir(testcase_dir).join(format!("ofmap_{port}_{frame}"))
}

/// Failure dump of the device output for `(port, frame)`
pub fn dump_path(testcase_dir: &Path, port: usize, frame: usize) -> PathBuf {
    fmaps_dir(testcase_dir).join(format!("ofmap_chip_{port}_{frame}"))
}

/// Parse numeric text into a flat vector
///
/// # Errors
///
/// Returns error naming `path` if a token is not a number.
pub fn parse_text(path: &Path, text: &str) -> Result<Vec<f64>> {
    let mut values = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or_default();
        for token in line.split_whitespace() {
            let v = token.parse::<f64>().map_err(|_| {
                HarnessError::golden_parse(path, format!("line {}: {token:?}", lineno + 1))
            })?;
            values.push(v);
        }
    }
    Ok(values)
}

/// Read a flat numeric text file
///
/// # Errors
///
/// Returns error if the file is missing or malformed.
pub fn load_text(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| HarnessError::golden_parse(path, e.to_string()))?;
    parse_text(path, &text)
}

/// Read a golden tensor and reshape it to `shape`
///
/// # Errors
///
/// Returns error if the file is missing, malformed, or has the wrong
/// number of elements.
pub fn load_tensor(path: &Path, shape: &Shape, element_type: ElementType) -> Result<Tensor> {
    let values = load_text(path)?;
    if values.len() != shape.total_elements() {
        return Err(HarnessError::GoldenShape {
            path: path.to_path_buf(),
            expected: shape.total_elements(),
            found: values.len(),
        });
    }
    Ok(Tensor::from_f64(shape.clone(), &values, element_type)?)
}

/// Write values one per line with six decimals
///
/// # Errors
///
/// Returns error if the file cannot be written.
pub fn save_text(path: &Path, values: &[f64]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = String::with_capacity(values.len() * 12);
    for v in values {
        let _ = writeln!(out, "{v:.6}");
    }
    std::fs::write(path, out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_rows_and_comments() {
        let v = parse_text(Path::new("x"), "1 2 3\n# header\n4.5\tnan  # trailing\n").unwrap();
        assert_eq!(v.len(), 5);
        assert_eq!(&v[..4], &[1.0, 2.0, 3.0, 4.5]);
        assert!(v[4].is_nan());
    }

    #[test]
    fn bad_token_names_the_line() {
        let err = parse_text(Path::new("ofmap_0_0"), "1\n2 x\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn load_tensor_checks_element_count() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ofmap_0_0");
        save_text(&path, &[1.0, 2.0, 3.0]).unwrap();

        let err = load_tensor(&path, &Shape::new(vec![2, 2]), ElementType::F32).unwrap_err();
        assert!(matches!(err, HarnessError::GoldenShape { expected: 4, found: 3, .. }));

        let t = load_tensor(&path, &Shape::new(vec![3, 1]), ElementType::F32).unwrap();
        assert_eq!(t.shape().dims, vec![3, 1]);
    }

    #[test]
    fn missing_file_is_a_golden_error() {
        let err = load_text(Path::new("/nonexistent/ifmap_truth_0_0")).unwrap_err();
        assert!(matches!(err, HarnessError::GoldenParse { .. }));
    }

    #[test]
    fn paths_follow_naming_scheme() {
        let tc = Path::new("dfp/k_net");
        assert_eq!(golden_input_path(tc, 1, 0), Path::new("dfp/k_net/fmaps/ifmap_truth_1_0"));
        assert_eq!(golden_output_path(tc, 0, 1), Path::new("dfp/k_net/fmaps/ofmap_0_1"));
        assert_eq!(dump_path(tc, 2, 1), Path::new("dfp/k_net/fmaps/ofmap_chip_2_1"));
    }
}
