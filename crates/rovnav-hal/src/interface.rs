//! Generic `RobotInterface` trait for the robot's sensor transport.
//!
//! A cycle first calls [`RobotInterface::poll`] to refresh the cached sensor
//! report; the accessor methods then read from that cached report and never
//! block.

use rovnav_types::{NavError, Wheel};

/// Sensor-side view of a robot: one blocking refresh plus cheap reads.
pub trait RobotInterface {
    /// Refresh the cached sensor report.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::HardwareFault`] when the report could not be
    /// obtained.  Callers treat every failure as retryable.
    fn poll(&mut self) -> Result<(), NavError>;

    /// Encoder ticks travelled by `wheel` since the previous report.
    fn wheel_delta(&self, wheel: Wheel) -> i32;

    /// Raw beacon X reading, in beacon ticks.
    fn beacon_x(&self) -> i32;

    /// Raw beacon Y reading, in beacon ticks.
    fn beacon_y(&self) -> i32;

    /// Raw beacon heading, in radians.
    fn beacon_theta(&self) -> f32;
}

impl<T: RobotInterface + ?Sized> RobotInterface for Box<T> {
    fn poll(&mut self) -> Result<(), NavError> {
        (**self).poll()
    }

    fn wheel_delta(&self, wheel: Wheel) -> i32 {
        (**self).wheel_delta(wheel)
    }

    fn beacon_x(&self) -> i32 {
        (**self).beacon_x()
    }

    fn beacon_y(&self) -> i32 {
        (**self).beacon_y()
    }

    fn beacon_theta(&self) -> f32 {
        (**self).beacon_theta()
    }
}
