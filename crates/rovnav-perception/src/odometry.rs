//! Three-wheel dead reckoning.
//!
//! The robot carries three omni wheels with encoders: left at 150°, right at
//! 30° and rear at 0° relative to the robot's forward (+X) axis.  Each cycle
//! the filtered tick deltas are projected onto the robot frame, rotated into
//! the global frame using the heading held *before* the update, scaled to
//! centimetres and accumulated into the odometry [`Pose`].
//!
//! ```text
//! dX  = (L·cos150° + R·cos30° + Rear) / 3
//! dY  = (L·sin150° + R·sin30°) / 2          rear adds no lateral signal
//! dθ  = −(Rear / ticks_per_cm) / (π · diameter_cm)
//! gx  = (dX·cos θ − dY·sin θ) / ticks_per_cm
//! gy  = (dX·sin θ + dY·cos θ) / ticks_per_cm
//! ```
//!
//! Rotation is taken from the rear wheel alone: its slip is the turn signal,
//! independent of the left/right pair.

use std::f32::consts::PI;

use rovnav_hal::RobotInterface;
use rovnav_types::{NavError, Pose, Wheel};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::filter::{CoefficientSource, FirFilter};

/// Mounting angle of the left wheel (degrees from robot +X).
pub const LEFT_WHEEL_DEG: f32 = 150.0;
/// Mounting angle of the right wheel (degrees from robot +X).
pub const RIGHT_WHEEL_DEG: f32 = 30.0;

/// Physical constants of the chassis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotGeometry {
    /// Wheel-encoder ticks per centimetre travelled.
    #[serde(default = "default_ticks_per_cm")]
    pub ticks_per_cm: f32,
    /// Wheel-base diameter (centimetres).
    #[serde(default = "default_diameter_cm")]
    pub diameter_cm: f32,
}

fn default_ticks_per_cm() -> f32 {
    5.0
}
fn default_diameter_cm() -> f32 {
    29.0
}

impl Default for RobotGeometry {
    fn default() -> Self {
        Self {
            ticks_per_cm: default_ticks_per_cm(),
            diameter_cm: default_diameter_cm(),
        }
    }
}

impl RobotGeometry {
    /// Reject non-positive or non-finite constants.
    pub fn validate(&self) -> Result<(), NavError> {
        for (name, value) in [
            ("ticks_per_cm", self.ticks_per_cm),
            ("diameter_cm", self.diameter_cm),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(NavError::InvalidConfig(format!(
                    "robot {name} must be positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Motion applied to the odometry pose by one update.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OdometryDelta {
    /// Robot-frame forward motion (ticks).
    pub robot_dx: f32,
    /// Robot-frame lateral motion (ticks).
    pub robot_dy: f32,
    /// Global-frame X motion (cm).
    pub dx: f32,
    /// Global-frame Y motion (cm).
    pub dy: f32,
    /// Heading change (radians, un-normalized).
    pub dtheta: f32,
}

/// Wheel-encoder pose estimator.
///
/// Owns one [`FirFilter`] per wheel.  The pose itself belongs to the caller
/// and is passed into [`update`][Self::update].
#[derive(Debug, Clone)]
pub struct WheelOdometry {
    left: FirFilter,
    right: FirFilter,
    rear: FirFilter,
    geometry: RobotGeometry,
    total_rotation: f32,
}

impl WheelOdometry {
    /// Build the estimator, loading the coefficient set `filter` once for
    /// each of the three wheel channels.
    ///
    /// # Errors
    ///
    /// Fails when the coefficient set cannot be loaded or the geometry is
    /// invalid.
    pub fn new(
        source: &dyn CoefficientSource,
        filter: &str,
        geometry: RobotGeometry,
    ) -> Result<Self, NavError> {
        Self::from_filters(
            FirFilter::load(source, filter)?,
            FirFilter::load(source, filter)?,
            FirFilter::load(source, filter)?,
            geometry,
        )
    }

    /// Build the estimator from pre-built per-wheel filters.
    pub fn from_filters(
        left: FirFilter,
        right: FirFilter,
        rear: FirFilter,
        geometry: RobotGeometry,
    ) -> Result<Self, NavError> {
        geometry.validate()?;
        Ok(Self {
            left,
            right,
            rear,
            geometry,
            total_rotation: 0.0,
        })
    }

    /// Read the three wheel deltas from `robot`, filter them and accumulate
    /// the resulting motion into `pose`.
    ///
    /// `robot` must already have been polled this cycle.
    pub fn update<H: RobotInterface + ?Sized>(&mut self, robot: &H, pose: &mut Pose) -> OdometryDelta {
        let left = self.left.filter(robot.wheel_delta(Wheel::Left) as f32);
        let right = self.right.filter(robot.wheel_delta(Wheel::Right) as f32);
        let rear = self.rear.filter(robot.wheel_delta(Wheel::Rear) as f32);

        let delta = self.project(left, right, rear, pose.theta());
        pose.add(delta.dx, delta.dy, delta.dtheta);
        self.total_rotation += delta.dtheta;

        trace!(
            left, right, rear,
            dx = delta.dx, dy = delta.dy, dtheta = delta.dtheta,
            "odometry step"
        );
        delta
    }

    /// Convert already-filtered wheel deltas into a global-frame motion for
    /// a robot currently facing `heading`.
    pub fn project(&self, left: f32, right: f32, rear: f32, heading: f32) -> OdometryDelta {
        let (left_sin, left_cos) = LEFT_WHEEL_DEG.to_radians().sin_cos();
        let (right_sin, right_cos) = RIGHT_WHEEL_DEG.to_radians().sin_cos();

        let robot_dx = (left * left_cos + right * right_cos + rear) / 3.0;
        let robot_dy = (left * left_sin + right * right_sin) / 2.0;

        let tpc = self.geometry.ticks_per_cm;
        let dtheta = -(rear / tpc) / (PI * self.geometry.diameter_cm);

        let (sin, cos) = heading.sin_cos();
        OdometryDelta {
            robot_dx,
            robot_dy,
            dx: (robot_dx * cos - robot_dy * sin) / tpc,
            dy: (robot_dx * sin + robot_dy * cos) / tpc,
            dtheta,
        }
    }

    /// Unwrapped sum of every heading change applied so far.  Unlike the
    /// pose heading this is never wrapped, so full turns can be counted.
    pub fn total_rotation(&self) -> f32 {
        self.total_rotation
    }

    pub fn geometry(&self) -> RobotGeometry {
        self.geometry
    }

    /// Clear filter history and the rotation counter.
    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
        self.rear.reset();
        self.total_rotation = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::StaticSource;
    use rovnav_hal::SimRobot;
    use rovnav_hal::sim::SimReading;

    fn passthrough() -> WheelOdometry {
        let source = StaticSource::new().with("unit", vec![1.0]);
        WheelOdometry::new(&source, "unit", RobotGeometry::default()).unwrap()
    }

    fn polled(left: i32, right: i32, rear: i32) -> SimRobot {
        let mut robot = SimRobot::new().with_reading(SimReading::default().wheels(left, right, rear));
        robot.poll().unwrap();
        robot
    }

    #[test]
    fn zero_ticks_leave_pose_unchanged() {
        let mut odom = WheelOdometry::new(&StaticSource::builtin(), "we", RobotGeometry::default())
            .unwrap();
        let mut pose = Pose::new(12.0, -7.5, 1.25);
        let before = pose;

        let delta = odom.update(&polled(0, 0, 0), &mut pose);

        assert_eq!(delta.dx, 0.0);
        assert_eq!(delta.dy, 0.0);
        assert_eq!(delta.dtheta, 0.0);
        assert_eq!(pose, before);
    }

    #[test]
    fn equal_left_right_without_rear_does_not_rotate() {
        let odom = passthrough();
        let delta = odom.project(40.0, 40.0, 0.0, 0.3);
        assert_eq!(delta.dtheta, 0.0);
        assert!(delta.robot_dy > 0.0);
    }

    #[test]
    fn rotation_comes_only_from_rear_wheel() {
        let odom = passthrough();
        let geometry = RobotGeometry::default();
        let delta = odom.project(-25.0, 60.0, 10.0, 0.0);
        let expected = -(10.0 / geometry.ticks_per_cm) / (PI * geometry.diameter_cm);
        assert!((delta.dtheta - expected).abs() < 1e-7);
    }

    #[test]
    fn lateral_motion_ignores_rear_wheel() {
        let odom = passthrough();
        let with_rear = odom.project(10.0, 10.0, 50.0, 0.0);
        let without_rear = odom.project(10.0, 10.0, 0.0, 0.0);
        assert_eq!(with_rear.robot_dy, without_rear.robot_dy);
    }

    #[test]
    fn robot_frame_projection_matches_wheel_geometry() {
        let odom = passthrough();
        let delta = odom.project(2.0, 4.0, 6.0, 0.0);
        let c30 = 30f32.to_radians().cos();
        let expected_dx = (2.0 * -c30 + 4.0 * c30 + 6.0) / 3.0;
        let expected_dy = (2.0 * 0.5 + 4.0 * 0.5) / 2.0;
        assert!((delta.robot_dx - expected_dx).abs() < 1e-5);
        assert!((delta.robot_dy - expected_dy).abs() < 1e-5);
    }

    #[test]
    fn heading_rotates_motion_into_global_frame() {
        let odom = passthrough();
        let tpc = RobotGeometry::default().ticks_per_cm;
        // Pure forward motion from the rear wheel alone, heading +90°.
        let delta = odom.project(0.0, 0.0, 30.0, std::f32::consts::FRAC_PI_2);
        assert!(delta.dx.abs() < 1e-5, "dx = {}", delta.dx);
        assert!((delta.dy - 10.0 / tpc).abs() < 1e-5, "dy = {}", delta.dy);
    }

    #[test]
    fn update_uses_heading_before_the_step() {
        let mut odom = passthrough();
        let mut pose = Pose::new(0.0, 0.0, 0.0);
        let delta = odom.update(&polled(0, 0, 30), &mut pose);
        // Heading changed this step, but motion was projected at heading 0.
        assert!(delta.dy.abs() < 1e-6);
        assert!(delta.dx > 0.0);
        assert!((pose.x() - delta.dx).abs() < 1e-6);
    }

    #[test]
    fn total_rotation_is_not_wrapped() {
        let mut odom = passthrough();
        let mut pose = Pose::default();
        let robot = polled(0, 0, -2000);
        for _ in 0..5 {
            odom.update(&robot, &mut pose);
        }
        let step = (2000.0 / RobotGeometry::default().ticks_per_cm)
            / (PI * RobotGeometry::default().diameter_cm);
        assert!((odom.total_rotation() - 5.0 * step).abs() < 1e-3);
        assert!(odom.total_rotation() > std::f32::consts::TAU);
        assert!(pose.theta() < std::f32::consts::TAU);
    }

    #[test]
    fn wheel_channels_are_filtered_independently() {
        let source = StaticSource::new().with("avg", vec![0.5, 0.5]);
        let odom = WheelOdometry::new(&source, "avg", RobotGeometry::default()).unwrap();
        let mut odom_a = odom.clone();
        let mut pose = Pose::default();
        odom_a.update(&polled(10, 0, 0), &mut pose);
        // Right and rear windows are still zero, so only left history remains.
        let delta = odom_a.update(&polled(0, 0, 0), &mut pose);
        assert_eq!(delta.dtheta, 0.0);
        assert!(delta.robot_dy > 0.0);
    }

    #[test]
    fn invalid_geometry_is_rejected() {
        let geometry = RobotGeometry {
            ticks_per_cm: 0.0,
            diameter_cm: 29.0,
        };
        let result = WheelOdometry::new(&StaticSource::builtin(), "we", geometry);
        assert!(matches!(result, Err(NavError::InvalidConfig(_))));
    }

    #[test]
    fn missing_filter_is_fatal_at_construction() {
        let result = WheelOdometry::new(&StaticSource::new(), "we", RobotGeometry::default());
        assert!(matches!(result, Err(NavError::FilterCoefficients { .. })));
    }

    #[test]
    fn reset_clears_total_rotation() {
        let mut odom = passthrough();
        let mut pose = Pose::default();
        odom.update(&polled(0, 0, 100), &mut pose);
        odom.reset();
        assert_eq!(odom.total_rotation(), 0.0);
    }
}
