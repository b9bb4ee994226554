//! Absolute pose from the room beacon.
//!
//! The beacon reports the robot's position and heading in room-local ticks.
//! [`BeaconEstimator`] smooths each axis with its own [`FirFilter`], maps the
//! result through the configured room's [`CalibrationEntry`] and overwrites
//! the beacon [`Pose`] with it.

use rovnav_hal::RobotInterface;
use rovnav_types::{NavError, Pose};
use tracing::{info, trace};

use crate::calibration::{CalibrationEntry, CalibrationTable};
use crate::filter::{CoefficientSource, FirFilter};

/// Coefficient-set names for the three beacon channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeaconFilterNames<'a> {
    pub x: &'a str,
    pub y: &'a str,
    pub theta: &'a str,
}

impl Default for BeaconFilterNames<'_> {
    fn default() -> Self {
        Self {
            x: "ns_x",
            y: "ns_y",
            theta: "ns_theta",
        }
    }
}

/// Beacon-based absolute pose estimator for one room.
#[derive(Debug, Clone)]
pub struct BeaconEstimator {
    x: FirFilter,
    y: FirFilter,
    theta: FirFilter,
    room: usize,
    calibration: CalibrationEntry,
}

impl BeaconEstimator {
    /// Build the estimator for `room`, resolving its calibration entry from
    /// `table` and loading one filter per beacon channel.
    ///
    /// # Errors
    ///
    /// Fails when a coefficient set cannot be loaded or `room` has no
    /// calibration entry.
    pub fn new(
        source: &dyn CoefficientSource,
        filters: BeaconFilterNames<'_>,
        table: &CalibrationTable,
        room: usize,
    ) -> Result<Self, NavError> {
        let calibration = *table.entry(room)?;
        Ok(Self {
            x: FirFilter::load(source, filters.x)?,
            y: FirFilter::load(source, filters.y)?,
            theta: FirFilter::load(source, filters.theta)?,
            room,
            calibration,
        })
    }

    /// Read the beacon fix from `robot`, filter and calibrate it, and
    /// overwrite `pose` with the result.
    ///
    /// `robot` must already have been polled this cycle.
    pub fn update<H: RobotInterface + ?Sized>(&mut self, robot: &H, pose: &mut Pose) -> Pose {
        let raw_x = self.x.filter(robot.beacon_x() as f32);
        let raw_y = self.y.filter(robot.beacon_y() as f32);
        let raw_theta = self.theta.filter(robot.beacon_theta());

        let (x, y, theta) = self.calibration.apply(raw_x, raw_y, raw_theta);
        pose.set(x, y, theta);
        trace!(room = self.room, raw_x, raw_y, raw_theta, x, y, theta = pose.theta(), "beacon fix");
        *pose
    }

    /// Switch to another room's calibration.  Filter history is kept.
    pub fn set_room(&mut self, table: &CalibrationTable, room: usize) -> Result<(), NavError> {
        self.calibration = *table.entry(room)?;
        self.room = room;
        info!(room, "beacon calibration switched");
        Ok(())
    }

    pub fn room(&self) -> usize {
        self.room
    }

    pub fn calibration(&self) -> &CalibrationEntry {
        &self.calibration
    }

    /// Clear all three filter windows.
    pub fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
        self.theta.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::StaticSource;
    use rovnav_hal::SimRobot;
    use rovnav_hal::sim::SimReading;

    fn passthrough_source() -> StaticSource {
        StaticSource::new()
            .with("ns_x", vec![1.0])
            .with("ns_y", vec![1.0])
            .with("ns_theta", vec![1.0])
    }

    fn polled(x: i32, y: i32, theta: f32) -> SimRobot {
        let mut robot = SimRobot::new().with_reading(SimReading::default().beacon(x, y, theta));
        robot.poll().unwrap();
        robot
    }

    fn identity_table() -> CalibrationTable {
        CalibrationTable::new(vec![CalibrationEntry::new(0.0, 0.0, 1.0, 0.0); 4]).unwrap()
    }

    #[test]
    fn overwrites_rather_than_accumulates() {
        let table = identity_table();
        let mut est =
            BeaconEstimator::new(&passthrough_source(), BeaconFilterNames::default(), &table, 0)
                .unwrap();
        let mut pose = Pose::new(500.0, 500.0, 3.0);

        est.update(&polled(10, 20, 0.5), &mut pose);
        assert!((pose.x() - 10.0).abs() < 1e-5);
        assert!((pose.y() - 20.0).abs() < 1e-5);
        assert!((pose.theta() - 0.5).abs() < 1e-5);

        est.update(&polled(10, 20, 0.5), &mut pose);
        assert!((pose.x() - 10.0).abs() < 1e-5);
    }

    #[test]
    fn applies_configured_room_calibration() {
        let table = CalibrationTable::default();
        let mut est =
            BeaconEstimator::new(&passthrough_source(), BeaconFilterNames::default(), &table, 2)
                .unwrap();
        let mut pose = Pose::default();
        let fix = est.update(&polled(229 + 450, 449, 0.0), &mut pose);

        let expected = table.entry(2).unwrap().apply(679.0, 449.0, 0.0);
        assert!((fix.x() - expected.0).abs() < 1e-4);
        assert!((fix.y() - expected.1).abs() < 1e-4);
        assert!((fix.theta() - rovnav_types::normalize_theta(expected.2)).abs() < 1e-4);
    }

    #[test]
    fn heading_is_normalized_after_calibration() {
        let mut entries = vec![CalibrationEntry::new(0.0, 0.0, 1.0, 90.0); 4];
        entries[0].flip_y = true;
        let table = CalibrationTable::new(entries).unwrap();
        let mut est =
            BeaconEstimator::new(&passthrough_source(), BeaconFilterNames::default(), &table, 0)
                .unwrap();
        let mut pose = Pose::default();
        est.update(&polled(0, 0, 3.0), &mut pose);
        assert!((0.0..std::f32::consts::TAU).contains(&pose.theta()));
    }

    #[test]
    fn beacon_channels_are_filtered() {
        let source = StaticSource::builtin();
        let table = identity_table();
        let mut est =
            BeaconEstimator::new(&source, BeaconFilterNames::default(), &table, 0).unwrap();
        let mut pose = Pose::default();
        // 4-tap moving average over a zeroed window.
        est.update(&polled(40, 80, 0.0), &mut pose);
        assert!((pose.x() - 10.0).abs() < 1e-5);
        assert!((pose.y() - 20.0).abs() < 1e-5);
    }

    #[test]
    fn unknown_room_is_fatal_at_construction() {
        let result = BeaconEstimator::new(
            &passthrough_source(),
            BeaconFilterNames::default(),
            &CalibrationTable::default(),
            7,
        );
        assert!(matches!(result, Err(NavError::Calibration(_))));
    }

    #[test]
    fn missing_filter_is_fatal_at_construction() {
        let source = StaticSource::new().with("ns_x", vec![1.0]);
        let result = BeaconEstimator::new(
            &source,
            BeaconFilterNames::default(),
            &CalibrationTable::default(),
            0,
        );
        assert!(matches!(result, Err(NavError::FilterCoefficients { .. })));
    }

    #[test]
    fn set_room_switches_calibration() {
        let table = CalibrationTable::default();
        let mut est =
            BeaconEstimator::new(&passthrough_source(), BeaconFilterNames::default(), &table, 0)
                .unwrap();
        est.set_room(&table, 3).unwrap();
        assert_eq!(est.room(), 3);
        assert_eq!(est.calibration().x_shift, 375.0);
        assert!(est.set_room(&table, 9).is_err());
        assert_eq!(est.room(), 3);
    }
}
