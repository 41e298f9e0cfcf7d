//! Sysfs telemetry against a synthetic `/sys` tree

use mxa_driver::{
    DeviceGroup, MxaError, OperatingPointControl, SysfsTelemetry, Telemetry,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn build_tree(root: &Path) {
    let node = root.join("memx0");
    fs::create_dir_all(&node).unwrap();
    fs::write(
        node.join("temperature"),
        "CHIP(0) PVT0 Temperature: Temperature: 41 C (314 Kelvin) (ThermalThrottlingState: 0)\n\
         CHIP(1) PVT0 Temperature: Temperature: 43 C (316 Kelvin) (ThermalThrottlingState: 0)\n",
    )
    .unwrap();
    fs::write(node.join("mpu_frequency"), "600\n").unwrap();
    fs::write(node.join("mpu_voltage"), "700\n").unwrap();
    fs::write(node.join("thermal_threshold"), "100\n").unwrap();
    fs::write(
        node.join("verinfo"),
        "kdriver version: 1.1.9\nFW_CommitID=0xdeadbeef DateCode=0x20240101\nManufacturerID=0x0000000000000001\n",
    )
    .unwrap();

    let hwmon = root.join("class/hwmon/hwmon3");
    fs::create_dir_all(&hwmon).unwrap();
    fs::write(hwmon.join("name"), "memx0\n").unwrap();
    fs::write(hwmon.join("power1_average"), "1234000\n").unwrap();
}

#[test]
fn reads_all_telemetry() {
    let dir = TempDir::new().unwrap();
    build_tree(dir.path());
    let g = DeviceGroup(0);
    let tel = SysfsTelemetry::open(dir.path(), g).unwrap();

    assert_eq!(tel.temperature_c(g).unwrap(), 42.0);
    assert_eq!(tel.power_mw(g).unwrap(), 1234.0);
    let op = tel.operating_point(g).unwrap();
    assert_eq!(op.frequency_mhz, 600.0);
    assert_eq!(op.voltage_mv, 700.0);
    assert_eq!(op.thermal_threshold_c, 100.0);
    assert_eq!(tel.identity(g).unwrap().fw_commit_id.as_deref(), Some("0xdeadbeef"));
}

#[test]
fn setters_write_attributes() {
    let dir = TempDir::new().unwrap();
    build_tree(dir.path());
    let g = DeviceGroup(0);
    let tel = SysfsTelemetry::open(dir.path(), g).unwrap();

    tel.set_frequency_mhz(g, 500).unwrap();
    tel.set_voltage_mv(g, 650).unwrap();
    assert_eq!(tel.frequency_mhz(g).unwrap(), 500.0);
    assert_eq!(tel.voltage_mv(g).unwrap(), 650.0);
}

#[test]
fn missing_attribute_is_an_error() {
    let dir = TempDir::new().unwrap();
    build_tree(dir.path());
    fs::remove_file(dir.path().join("memx0/thermal_threshold")).unwrap();
    let g = DeviceGroup(0);
    let tel = SysfsTelemetry::open(dir.path(), g).unwrap();

    let err = tel.set_thermal_threshold_c(g, 90).unwrap_err();
    assert!(matches!(err, MxaError::AttributeUnavailable { .. }));
    assert!(tel.thermal_threshold_c(g).is_err());
}

#[test]
fn open_requires_group_node() {
    let dir = TempDir::new().unwrap();
    build_tree(dir.path());
    assert!(SysfsTelemetry::open(dir.path(), DeviceGroup(1)).is_err());
}

#[test]
#[ignore] // Requires hardware
fn live_sysfs_reports_power() {
    let tel = SysfsTelemetry::open("/sys", DeviceGroup(0)).unwrap();
    assert!(tel.power_mw(DeviceGroup(0)).unwrap() > 0.0);
}
