//! Driver and firmware identifiers from `verinfo`

/// Version identifiers reported by the kernel driver
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Kernel driver version
    pub kdriver_version: Option<String>,
    /// Firmware commit id (hex string as printed)
    pub fw_commit_id: Option<String>,
    /// Firmware date code (hex string as printed)
    pub date_code: Option<String>,
    /// Manufacturer id (hex string as printed)
    pub manufacturer_id: Option<String>,
}

impl DeviceIdentity {
    /// True when no field could be parsed
    pub fn is_unknown(&self) -> bool {
        self.kdriver_version.is_none()
            && self.fw_commit_id.is_none()
            && self.date_code.is_none()
            && self.manufacturer_id.is_none()
    }
}

impl std::fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let na = |v: &Option<String>| v.clone().unwrap_or_else(|| "N/A".into());
        write!(
            f,
            "kdriver {} fw {} date {} manufacturer {}",
            na(&self.kdriver_version),
            na(&self.fw_commit_id),
            na(&self.date_code),
            na(&self.manufacturer_id)
        )
    }
}

/// Parse `verinfo` text
///
/// ```text
/// kdriver version: 1.2.3
/// FW_CommitID=0x1a2b3c4d DateCode=0x20240101
/// ManufacturerID=0x0000000100000002
/// ```
///
/// Unknown lines are ignored; missing fields stay `None`.
pub fn parse_verinfo(text: &str) -> DeviceIdentity {
    let mut id = DeviceIdentity::default();
    for line in text.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("kdriver version:") {
            id.kdriver_version = Some(rest.trim().to_string());
        } else if line.contains("FW_CommitID") {
            for token in line.split_whitespace() {
                match token.split_once('=') {
                    Some(("FW_CommitID", v)) => id.fw_commit_id = Some(v.to_string()),
                    Some(("DateCode", v)) => id.date_code = Some(v.to_string()),
                    _ => {}
                }
            }
        } else if let Some(rest) = line.strip_prefix("ManufacturerID=") {
            id.manufacturer_id = Some(rest.trim().to_string());
        }
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "pcie intf device:\n\
        SDK version: 1.1\n\
        kdriver version: 1.1.9\n\
        FW_CommitID=0x8e3fa1c2 DateCode=0x20240512\n\
        ManufacturerID=0x0000000000000001\n\
        Cold+Warm-RebootCnt=3  Warm-RebootCnt=1\n\
        BootMode=PCIe  Chip=A1\n";

    #[test]
    fn parses_all_fields() {
        let id = parse_verinfo(SAMPLE);
        assert_eq!(id.kdriver_version.as_deref(), Some("1.1.9"));
        assert_eq!(id.fw_commit_id.as_deref(), Some("0x8e3fa1c2"));
        assert_eq!(id.date_code.as_deref(), Some("0x20240512"));
        assert_eq!(id.manufacturer_id.as_deref(), Some("0x0000000000000001"));
    }

    #[test]
    fn garbage_yields_unknown() {
        assert!(parse_verinfo("nothing here\n").is_unknown());
    }
}
