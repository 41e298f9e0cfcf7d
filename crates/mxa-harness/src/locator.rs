//! Testcase discovery

use crate::config::PACKAGE_FILE;
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Ordering of discovered testcases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
    /// Sorted by directory name (regression passes)
    Sorted,
    /// Prefix order, then directory listing order (performance passes)
    Discovery,
}

/// One candidate model directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Testcase {
    /// Directory name, the testcase identity
    pub name: String,
    /// Directory path
    pub dir: PathBuf,
    /// Prefix that matched
    pub prefix: String,
}

impl Testcase {
    /// Path of the compiled package
    pub fn package_path(&self) -> PathBuf {
        self.dir.join(PACKAGE_FILE)
    }
}

/// Find immediate subdirectories of `root` whose names start with any prefix
///
/// A directory matching several prefixes is listed once per prefix. A
/// missing root yields an empty list.
///
/// # Errors
///
/// Returns error if `root` exists but cannot be listed.
pub fn locate(root: &Path, prefixes: &[&str], ordering: Ordering) -> Result<Vec<Testcase>> {
    if !root.is_dir() {
        debug!("dataflow dir {} missing, nothing to run", root.display());
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            entries.push((name.to_string(), entry.path()));
        }
    }

    let mut found = Vec::new();
    for prefix in prefixes {
        for (name, dir) in &entries {
            if name.starts_with(prefix) {
                found.push(Testcase {
                    name: name.clone(),
                    dir: dir.clone(),
                    prefix: (*prefix).to_string(),
                });
            }
        }
    }

    if ordering == Ordering::Sorted {
        found.sort_by(|a, b| a.name.cmp(&b.name));
    }
    debug!("located {} testcases under {}", found.len(), root.display());
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TESTCASE_PREFIXES;
    use tempfile::TempDir;

    fn names(found: &[Testcase]) -> Vec<&str> {
        found.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn sorted_order_by_name() {
        let dir = TempDir::new().unwrap();
        for d in ["tf_b", "k_a", "onnx_c", "skip_me"] {
            std::fs::create_dir(dir.path().join(d)).unwrap();
        }
        std::fs::write(dir.path().join("k_file"), "not a dir").unwrap();

        let found = locate(dir.path(), &TESTCASE_PREFIXES, Ordering::Sorted).unwrap();
        assert_eq!(names(&found), vec!["k_a", "onnx_c", "tf_b"]);
        assert_eq!(found[0].package_path(), dir.path().join("k_a/model.dfp"));
    }

    #[test]
    fn discovery_order_groups_by_prefix() {
        let dir = TempDir::new().unwrap();
        for d in ["tf_b", "k_a", "onnx_c"] {
            std::fs::create_dir(dir.path().join(d)).unwrap();
        }
        let found = locate(dir.path(), &TESTCASE_PREFIXES, Ordering::Discovery).unwrap();
        assert_eq!(names(&found), vec!["k_a", "onnx_c", "tf_b"]);
        assert_eq!(found[2].prefix, "tf_");
    }

    #[test]
    fn single_letter_prefix_is_a_plain_prefix_match() {
        let dir = TempDir::new().unwrap();
        for d in ["kws_speech", "keras_net", "yolo"] {
            std::fs::create_dir(dir.path().join(d)).unwrap();
        }
        let found = locate(dir.path(), &TESTCASE_PREFIXES, Ordering::Sorted).unwrap();
        assert_eq!(names(&found), vec!["keras_net", "kws_speech"]);
        assert!(found.iter().all(|t| t.prefix == "k"));
    }

    #[test]
    fn missing_root_is_empty() {
        let found = locate(Path::new("/nonexistent/dfp"), &TESTCASE_PREFIXES, Ordering::Sorted)
            .unwrap();
        assert!(found.is_empty());
    }
}
