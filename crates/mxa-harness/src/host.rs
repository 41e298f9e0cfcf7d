//! Host facts recorded alongside measurements

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Facts about the machine running the harness
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    /// Kernel name and release, e.g. `Linux 6.8.0`
    pub os_name: String,
    /// Kernel build string
    pub os_version: String,
    /// CPU model name
    pub cpu_name: String,
    /// Logical CPUs
    pub logical_cpus: usize,
    /// Total memory in bytes
    pub total_memory_bytes: u64,
}

impl HostInfo {
    /// Collect from `uname` and `/proc`; unreadable facts stay empty
    pub fn collect() -> Self {
        Self::collect_from(Path::new("/proc"))
    }

    /// Collect with an injectable procfs root
    pub fn collect_from(proc_root: &Path) -> Self {
        let uname = rustix::system::uname();
        let read = |name: &str| std::fs::read_to_string(proc_root.join(name)).unwrap_or_default();
        let cpuinfo = read("cpuinfo");
        let logical_cpus = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or_else(|_| count_processors(&cpuinfo));

        Self {
            os_name: format!(
                "{} {}",
                uname.sysname().to_string_lossy(),
                uname.release().to_string_lossy()
            ),
            os_version: uname.version().to_string_lossy().into_owned(),
            cpu_name: parse_cpu_name(&cpuinfo).unwrap_or_default(),
            logical_cpus,
            total_memory_bytes: parse_mem_total(&read("meminfo")).unwrap_or(0),
        }
    }
}

/// First `model name` in `/proc/cpuinfo`
pub fn parse_cpu_name(cpuinfo: &str) -> Option<String> {
    cpuinfo.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        (key.trim() == "model name").then(|| value.trim().to_string())
    })
}

fn count_processors(cpuinfo: &str) -> usize {
    cpuinfo
        .lines()
        .filter(|l| l.split(':').next().is_some_and(|k| k.trim() == "processor"))
        .count()
}

/// `MemTotal` from `/proc/meminfo`, in bytes
pub fn parse_mem_total(meminfo: &str) -> Option<u64> {
    let line = meminfo.lines().find(|l| l.starts_with("MemTotal:"))?;
    let mut parts = line["MemTotal:".len()..].split_whitespace();
    let value: u64 = parts.next()?.parse().ok()?;
    match parts.next() {
        Some("kB") | None => Some(value * 1024),
        Some(_) => Some(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_name_from_cpuinfo() {
        let text = "processor\t: 0\nvendor_id\t: GenuineIntel\nmodel name\t: Intel(R) Core(TM) i7\n\nprocessor\t: 1\nmodel name\t: Intel(R) Core(TM) i7\n";
        assert_eq!(parse_cpu_name(text).as_deref(), Some("Intel(R) Core(TM) i7"));
        assert_eq!(count_processors(text), 2);
        assert_eq!(parse_cpu_name("flags : fpu\n"), None);
    }

    #[test]
    fn mem_total_in_bytes() {
        let text = "MemTotal:       16318480 kB\nMemFree:         1000 kB\n";
        assert_eq!(parse_mem_total(text), Some(16_318_480 * 1024));
        assert_eq!(parse_mem_total("MemFree: 1 kB\n"), None);
    }

    #[test]
    fn collect_never_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let host = HostInfo::collect_from(dir.path());
        assert!(host.logical_cpus >= 1);
        assert_eq!(host.total_memory_bytes, 0);
        assert!(!host.os_name.is_empty());
    }
}
