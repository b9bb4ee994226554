//! In-process simulated robot for testing without physical hardware.
//!
//! [`SimRobot`] replays a script of poll results and sensor readings so the
//! whole pose pipeline can run in headless tests and CI.
//!
//! # Example
//!
//! ```rust
//! use rovnav_hal::sim::SimReading;
//! use rovnav_hal::{RobotInterface, SimRobot};
//! use rovnav_types::Wheel;
//!
//! let mut robot = SimRobot::new()
//!     .with_failures(2)
//!     .with_reading(SimReading::default().wheels(4, 4, 0));
//!
//! assert!(robot.poll().is_err());
//! assert!(robot.poll().is_err());
//! assert!(robot.poll().is_ok());
//! assert_eq!(robot.wheel_delta(Wheel::Left), 4);
//! assert_eq!(robot.poll_count(), 3);
//! ```

use std::collections::VecDeque;

use rovnav_types::{NavError, Wheel};
use tracing::trace;

use crate::interface::RobotInterface;

// ────────────────────────────────────────────────────────────────────────────
// Sensor reading
// ────────────────────────────────────────────────────────────────────────────

/// One simulated sensor report.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimReading {
    pub left: i32,
    pub right: i32,
    pub rear: i32,
    pub beacon_x: i32,
    pub beacon_y: i32,
    pub beacon_theta: f32,
}

impl SimReading {
    /// Replace the wheel-encoder deltas.
    pub fn wheels(mut self, left: i32, right: i32, rear: i32) -> Self {
        self.left = left;
        self.right = right;
        self.rear = rear;
        self
    }

    /// Replace the raw beacon fix.
    pub fn beacon(mut self, x: i32, y: i32, theta: f32) -> Self {
        self.beacon_x = x;
        self.beacon_y = y;
        self.beacon_theta = theta;
        self
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimRobot
// ────────────────────────────────────────────────────────────────────────────

/// Scripted robot.
///
/// Each [`poll`][RobotInterface::poll] consumes the next entry of the poll
/// script (`true` = success); an exhausted script always succeeds.  A
/// successful poll also consumes the next queued [`SimReading`], if any,
/// otherwise the current reading stays in place.
#[derive(Debug, Default)]
pub struct SimRobot {
    poll_script: VecDeque<bool>,
    readings: VecDeque<SimReading>,
    current: SimReading,
    polls: u32,
}

impl SimRobot {
    /// A robot whose polls always succeed and whose sensors read zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `count` failing polls to the poll script.
    pub fn with_failures(mut self, count: usize) -> Self {
        self.poll_script.extend(std::iter::repeat_n(false, count));
        self
    }

    /// Append explicit poll results to the script.
    pub fn with_poll_script(mut self, script: impl IntoIterator<Item = bool>) -> Self {
        self.poll_script.extend(script);
        self
    }

    /// Queue a reading that becomes current on the next successful poll.
    pub fn with_reading(mut self, reading: SimReading) -> Self {
        self.readings.push_back(reading);
        self
    }

    /// Non-builder variant of [`with_failures`][Self::with_failures].
    pub fn push_failures(&mut self, count: usize) {
        self.poll_script.extend(std::iter::repeat_n(false, count));
    }

    /// Non-builder variant of [`with_reading`][Self::with_reading].
    pub fn push_reading(&mut self, reading: SimReading) {
        self.readings.push_back(reading);
    }

    /// Total number of `poll` calls observed, successful or not.
    pub fn poll_count(&self) -> u32 {
        self.polls
    }

    /// The reading the accessors currently report.
    pub fn current(&self) -> SimReading {
        self.current
    }
}

impl RobotInterface for SimRobot {
    fn poll(&mut self) -> Result<(), NavError> {
        self.polls += 1;
        let ok = self.poll_script.pop_front().unwrap_or(true);
        if !ok {
            trace!(poll = self.polls, "simulated poll failure");
            return Err(NavError::HardwareFault {
                component: "sim".to_string(),
                details: format!("scripted failure on poll {}", self.polls),
            });
        }
        if let Some(next) = self.readings.pop_front() {
            self.current = next;
        }
        Ok(())
    }

    fn wheel_delta(&self, wheel: Wheel) -> i32 {
        match wheel {
            Wheel::Left => self.current.left,
            Wheel::Right => self.current.right,
            Wheel::Rear => self.current.rear,
        }
    }

    fn beacon_x(&self) -> i32 {
        self.current.beacon_x
    }

    fn beacon_y(&self) -> i32 {
        self.current.beacon_y
    }

    fn beacon_theta(&self) -> f32 {
        self.current.beacon_theta
    }
}
