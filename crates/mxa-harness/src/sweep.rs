//! Operating-point sweeps and repeat rounds
//!
//! A sweep is the Cartesian product of an optional frequency axis (outer) and
//! an optional voltage axis (inner). Each axis includes its end point in
//! either direction. The repeat dimension (one round, a number of hours, or
//! indefinite burning) wraps the sweep as the outermost loop.

use crate::error::{HarnessError, Result};
use mxa_driver::{DeviceGroup, OperatingPointControl};
use std::time::{Duration, Instant};
use tracing::info;

/// One swept axis, end point inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepAxis {
    /// First value
    pub start: u32,
    /// Last value (inclusive)
    pub end: u32,
    /// Magnitude of the step; direction follows `start` vs `end`
    pub step: u32,
}

impl SweepAxis {
    /// Build an axis; it is active only when all three parts are present
    ///
    /// # Errors
    ///
    /// Returns error if all parts are present and `step` is zero.
    pub fn from_parts(start: Option<u32>, end: Option<u32>, step: Option<u32>) -> Result<Option<Self>> {
        match (start, end, step) {
            (Some(_), Some(_), Some(0)) => Err(HarnessError::invalid_sweep("step must be positive")),
            (Some(start), Some(end), Some(step)) => Ok(Some(Self { start, end, step })),
            _ => Ok(None),
        }
    }

    /// Values visited, in order
    pub fn points(&self) -> Vec<u32> {
        let step = self.step.max(1);
        let mut out = Vec::new();
        if self.start > self.end {
            let mut v = i64::from(self.start);
            while v >= i64::from(self.end) {
                out.push(v as u32);
                v -= i64::from(step);
            }
        } else {
            let mut v = u64::from(self.start);
            while v <= u64::from(self.end) {
                out.push(v as u32);
                v += u64::from(step);
            }
        }
        out
    }
}

/// One point of the sweep; `None` leaves that setting untouched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepPoint {
    /// MPU clock to apply
    pub frequency_mhz: Option<u32>,
    /// Core voltage to apply
    pub voltage_mv: Option<u32>,
}

impl SweepPoint {
    /// Apply this point, frequency first
    ///
    /// # Errors
    ///
    /// Returns error if the device rejects a setting.
    pub fn apply<D>(&self, device: &D, group: DeviceGroup) -> Result<()>
    where
        D: OperatingPointControl + ?Sized,
    {
        if let Some(mhz) = self.frequency_mhz {
            device.set_frequency_mhz(group, mhz)?;
        }
        if let Some(mv) = self.voltage_mv {
            device.set_voltage_mv(group, mv)?;
        }
        info!("{group} operating point {self}");
        Ok(())
    }
}

impl std::fmt::Display for SweepPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.frequency_mhz {
            Some(mhz) => write!(f, "Frequency {mhz} MHz")?,
            None => write!(f, "Frequency unchanged")?,
        }
        match self.voltage_mv {
            Some(mv) => write!(f, " Voltage {mv} mV"),
            None => write!(f, " Voltage unchanged"),
        }
    }
}

/// Fixed settings applied once before a campaign
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Setup {
    /// Core voltage
    pub voltage_mv: Option<u32>,
    /// Thermal throttling threshold
    pub thermal_threshold_c: Option<u32>,
}

impl Setup {
    /// True when nothing would be written
    pub const fn is_empty(&self) -> bool {
        self.voltage_mv.is_none() && self.thermal_threshold_c.is_none()
    }

    /// Write the present settings
    ///
    /// # Errors
    ///
    /// Returns error if the device rejects a setting.
    pub fn apply<D>(&self, device: &D, group: DeviceGroup) -> Result<()>
    where
        D: OperatingPointControl + ?Sized,
    {
        if let Some(mv) = self.voltage_mv {
            device.set_voltage_mv(group, mv)?;
            info!("{group} voltage set to {mv} mV");
        }
        if let Some(c) = self.thermal_threshold_c {
            device.set_thermal_threshold_c(group, c)?;
            info!("{group} thermal threshold set to {c} C");
        }
        Ok(())
    }
}

/// Frequency × voltage sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepPlan {
    /// Outer axis
    pub frequency: Option<SweepAxis>,
    /// Inner axis
    pub voltage: Option<SweepAxis>,
}

impl SweepPlan {
    /// True when at least one axis is active
    pub const fn is_active(&self) -> bool {
        self.frequency.is_some() || self.voltage.is_some()
    }

    /// All points, frequency outer and voltage inner
    ///
    /// Without an active axis this is a single point that changes nothing.
    pub fn points(&self) -> Vec<SweepPoint> {
        let freqs: Vec<Option<u32>> = self
            .frequency
            .map_or_else(|| vec![None], |a| a.points().into_iter().map(Some).collect());
        let volts: Vec<Option<u32>> = self
            .voltage
            .map_or_else(|| vec![None], |a| a.points().into_iter().map(Some).collect());

        let mut out = Vec::with_capacity(freqs.len() * volts.len());
        for &frequency_mhz in &freqs {
            for &voltage_mv in &volts {
                out.push(SweepPoint {
                    frequency_mhz,
                    voltage_mv,
                });
            }
        }
        out
    }
}

/// Repeat dimension around the sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    /// A single round
    Once,
    /// Burning until the duration elapses
    For(Duration),
    /// Burning without end
    Forever,
}

impl Repeat {
    /// Map CLI flags: burning with `hours == 0` runs forever
    pub const fn from_args(burning: bool, hours: u64) -> Self {
        match (burning, hours) {
            (false, _) => Self::Once,
            (true, 0) => Self::Forever,
            (true, h) => Self::For(Duration::from_secs(h.saturating_mul(3600))),
        }
    }

    /// True for burning modes
    pub const fn is_burning(&self) -> bool {
        !matches!(self, Self::Once)
    }

    /// Round numbers, starting at 1
    pub fn rounds(&self) -> Rounds {
        Rounds {
            repeat: *self,
            deadline: match self {
                Self::For(d) => Instant::now().checked_add(*d),
                _ => None,
            },
            next: 1,
        }
    }
}

/// Iterator over repeat rounds
#[derive(Debug)]
pub struct Rounds {
    repeat: Repeat,
    deadline: Option<Instant>,
    next: u64,
}

impl Iterator for Rounds {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let go = match self.repeat {
            Repeat::Once => self.next == 1,
            // deadline past the clock's range: never reached
            Repeat::For(_) => self.deadline.map_or(true, |d| Instant::now() < d),
            Repeat::Forever => true,
        };
        if !go {
            return None;
        }
        let round = self.next;
        self.next += 1;
        Some(round)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(start: u32, end: u32, step: u32) -> SweepAxis {
        SweepAxis::from_parts(Some(start), Some(end), Some(step)).unwrap().unwrap()
    }

    #[test]
    fn descending_includes_end() {
        assert_eq!(axis(700, 600, 50).points(), vec![700, 650, 600]);
    }

    #[test]
    fn ascending_includes_end() {
        assert_eq!(axis(600, 700, 50).points(), vec![600, 650, 700]);
    }

    #[test]
    fn uneven_step_stops_before_overshoot() {
        assert_eq!(axis(600, 700, 40).points(), vec![600, 640, 680]);
        assert_eq!(axis(100, 0, 60).points(), vec![100, 40]);
    }

    #[test]
    fn axis_needs_all_three_parts() {
        assert_eq!(SweepAxis::from_parts(Some(600), None, Some(50)).unwrap(), None);
        assert!(SweepAxis::from_parts(Some(600), Some(700), Some(0)).is_err());
    }

    #[test]
    fn inactive_plan_is_one_untouched_point() {
        let plan = SweepPlan::default();
        assert!(!plan.is_active());
        assert_eq!(plan.points(), vec![SweepPoint::default()]);
    }

    #[test]
    fn product_is_frequency_outer() {
        let plan = SweepPlan {
            frequency: Some(axis(500, 600, 100)),
            voltage: Some(axis(700, 650, 50)),
        };
        let pts: Vec<(Option<u32>, Option<u32>)> =
            plan.points().iter().map(|p| (p.frequency_mhz, p.voltage_mv)).collect();
        assert_eq!(
            pts,
            vec![
                (Some(500), Some(700)),
                (Some(500), Some(650)),
                (Some(600), Some(700)),
                (Some(600), Some(650)),
            ]
        );
    }

    #[test]
    fn setup_and_point_write_the_device() {
        use mxa_driver::{SoftwareTelemetry, Telemetry};
        let dev = SoftwareTelemetry::new();
        let g = DeviceGroup(0);

        Setup { voltage_mv: Some(650), thermal_threshold_c: Some(85) }.apply(&dev, g).unwrap();
        SweepPoint { frequency_mhz: Some(500), voltage_mv: None }.apply(&dev, g).unwrap();

        let op = dev.operating_point(g).unwrap();
        assert_eq!(op.frequency_mhz, 500.0);
        assert_eq!(op.voltage_mv, 650.0);
        assert_eq!(op.thermal_threshold_c, 85.0);
        assert!(Setup::default().is_empty());
    }

    #[test]
    fn repeat_modes() {
        assert_eq!(Repeat::from_args(false, 5), Repeat::Once);
        assert_eq!(Repeat::from_args(true, 0), Repeat::Forever);
        assert_eq!(Repeat::Once.rounds().collect::<Vec<_>>(), vec![1]);
        assert_eq!(Repeat::For(Duration::ZERO).rounds().count(), 0);
        assert_eq!(Repeat::Forever.rounds().take(3).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(Repeat::from_args(true, 2).is_burning());
    }

    #[test]
    fn huge_hour_count_saturates() {
        let Repeat::For(d) = Repeat::from_args(true, u64::MAX) else {
            panic!("expected a bounded burn");
        };
        assert_eq!(d, Duration::from_secs(u64::MAX));
        assert_eq!(Repeat::For(d).rounds().take(2).collect::<Vec<_>>(), vec![1, 2]);
    }
}
