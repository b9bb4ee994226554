//! [`PoseController`] – the per-cycle pose pipeline.
//!
//! Each call to [`PoseController::tick`] runs one cycle:
//!
//! 1. **Poll** – the hardware is polled through the [`RetryPolicy`] until it
//!    succeeds or the fail limit is reached.
//! 2. **Odometry** – [`WheelOdometry`] advances the odometry pose.
//! 3. **Beacon** – [`BeaconEstimator`] overwrites the beacon pose.
//! 4. **Fuse** – [`FusionEngine`] combines both into the best estimate.
//!
//! Steps 2–4 run only after a successful poll, always in that order.  A
//! failed cycle touches none of the three poses, so [`PoseController::pose`]
//! keeps returning the last good estimate.
//!
//! # Example
//!
//! ```rust
//! use rovnav_hal::SimRobot;
//! use rovnav_perception::StaticSource;
//! use rovnav_runtime::controller::{ControllerConfig, PoseController};
//!
//! let config = ControllerConfig::default();
//! let mut controller =
//!     PoseController::new(SimRobot::new(), &config, &StaticSource::builtin()).unwrap();
//!
//! assert!(controller.tick().is_success());
//! assert_eq!(controller.cycles(), 1);
//! ```

use chrono::{DateTime, Utc};
use rovnav_hal::RobotInterface;
use rovnav_perception::beacon::BeaconFilterNames;
use rovnav_perception::{
    BeaconEstimator, CalibrationTable, CoefficientSource, DiagonalKalman, FusionEngine,
    KalmanUpdate, RobotGeometry, Uncertainty, WheelOdometry, ROOM_COUNT,
};
use rovnav_types::{NavError, Pose, PoseSnapshot};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::retry::{PollOutcome, RetryPolicy};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Coefficient-set names for every filtered channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterNames {
    /// Shared by all three wheel encoders (each still gets its own window).
    #[serde(default = "default_wheel_filter")]
    pub wheels: String,
    #[serde(default = "default_beacon_x_filter")]
    pub beacon_x: String,
    #[serde(default = "default_beacon_y_filter")]
    pub beacon_y: String,
    #[serde(default = "default_beacon_theta_filter")]
    pub beacon_theta: String,
}

fn default_wheel_filter() -> String {
    "we".to_string()
}
fn default_beacon_x_filter() -> String {
    "ns_x".to_string()
}
fn default_beacon_y_filter() -> String {
    "ns_y".to_string()
}
fn default_beacon_theta_filter() -> String {
    "ns_theta".to_string()
}

impl Default for FilterNames {
    fn default() -> Self {
        Self {
            wheels: default_wheel_filter(),
            beacon_x: default_beacon_x_filter(),
            beacon_y: default_beacon_y_filter(),
            beacon_theta: default_beacon_theta_filter(),
        }
    }
}

impl FilterNames {
    fn beacon(&self) -> BeaconFilterNames<'_> {
        BeaconFilterNames {
            x: &self.beacon_x,
            y: &self.beacon_y,
            theta: &self.beacon_theta,
        }
    }
}

/// Everything needed to build a [`PoseController`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Room whose beacon calibration is used (`0..ROOM_COUNT`).
    #[serde(default)]
    pub room: usize,
    /// Consecutive poll failures after which a cycle is abandoned.
    #[serde(default = "default_fail_limit")]
    pub fail_limit: u32,
    #[serde(default)]
    pub robot: RobotGeometry,
    #[serde(default)]
    pub uncertainty: Uncertainty,
    #[serde(default)]
    pub filters: FilterNames,
    #[serde(default)]
    pub calibration: CalibrationTable,
}

fn default_fail_limit() -> u32 {
    5
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            room: 0,
            fail_limit: default_fail_limit(),
            robot: RobotGeometry::default(),
            uncertainty: Uncertainty::default(),
            filters: FilterNames::default(),
            calibration: CalibrationTable::default(),
        }
    }
}

impl ControllerConfig {
    /// Check the values that do not depend on a coefficient source.
    pub fn validate(&self) -> Result<(), NavError> {
        if self.room >= ROOM_COUNT {
            return Err(NavError::Calibration(format!(
                "room {} is out of range (0..{ROOM_COUNT})",
                self.room
            )));
        }
        RetryPolicy::new(self.fail_limit)?;
        self.robot.validate()?;
        self.uncertainty.validate()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cycle outcome
// ─────────────────────────────────────────────────────────────────────────────

/// Result of one [`PoseController::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Poll succeeded on try `attempts`; all estimators and fusion ran.
    Success { attempts: u32 },
    /// `failures` consecutive polls failed; no pose was modified.
    Failed { failures: u32 },
}

impl CycleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CycleOutcome::Success { .. })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PoseController
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the hardware handle, the estimators and the three poses
/// (odometry, beacon, best estimate).
pub struct PoseController<H, K = DiagonalKalman> {
    hardware: H,
    retry: RetryPolicy,
    calibration: CalibrationTable,
    odometry: WheelOdometry,
    beacon: BeaconEstimator,
    fusion: FusionEngine<K>,
    odometry_pose: Pose,
    beacon_pose: Pose,
    best: Pose,
    cycles: u64,
    failed_cycles: u64,
    updated_at: Option<DateTime<Utc>>,
}

impl<H: RobotInterface> PoseController<H, DiagonalKalman> {
    /// Build a controller with the default [`DiagonalKalman`] backend.
    ///
    /// # Errors
    ///
    /// Any invalid configuration value, missing coefficient set or
    /// unknown room is fatal here.
    pub fn new(
        hardware: H,
        config: &ControllerConfig,
        source: &dyn CoefficientSource,
    ) -> Result<Self, NavError> {
        Self::with_backend(hardware, config, source, DiagonalKalman::new())
    }
}

impl<H: RobotInterface, K: KalmanUpdate> PoseController<H, K> {
    /// Build a controller with an explicit fusion backend.
    pub fn with_backend(
        hardware: H,
        config: &ControllerConfig,
        source: &dyn CoefficientSource,
        backend: K,
    ) -> Result<Self, NavError> {
        config.validate()?;
        let retry = RetryPolicy::new(config.fail_limit)?;
        let odometry = WheelOdometry::new(source, &config.filters.wheels, config.robot)?;
        let beacon = BeaconEstimator::new(
            source,
            config.filters.beacon(),
            &config.calibration,
            config.room,
        )?;
        let mut fusion = FusionEngine::new(backend);
        fusion.set_uncertainty(config.uncertainty)?;

        info!(
            room = config.room,
            fail_limit = config.fail_limit,
            "pose controller ready"
        );
        Ok(Self {
            hardware,
            retry,
            calibration: config.calibration.clone(),
            odometry,
            beacon,
            fusion,
            odometry_pose: Pose::default(),
            beacon_pose: Pose::default(),
            best: Pose::default(),
            cycles: 0,
            failed_cycles: 0,
            updated_at: None,
        })
    }

    /// Run one poll / estimate / fuse cycle.
    #[instrument(skip(self), fields(cycle = self.cycles + self.failed_cycles + 1))]
    pub fn tick(&mut self) -> CycleOutcome {
        match self.retry.poll(&mut self.hardware) {
            PollOutcome::Exhausted { failures } => {
                self.failed_cycles += 1;
                warn!(failures, "cycle failed, pose left unchanged");
                CycleOutcome::Failed { failures }
            }
            PollOutcome::Ready { attempts } => {
                self.odometry.update(&self.hardware, &mut self.odometry_pose);
                self.beacon.update(&self.hardware, &mut self.beacon_pose);
                self.fusion
                    .fuse(&self.beacon_pose, &self.odometry_pose, &mut self.best);

                self.cycles += 1;
                self.updated_at = Some(Utc::now());
                debug!(
                    attempts,
                    x = self.best.x(),
                    y = self.best.y(),
                    theta = self.best.theta(),
                    "cycle complete"
                );
                CycleOutcome::Success { attempts }
            }
        }
    }

    /// Latest best-estimate pose.  Unchanged by failed cycles.
    pub fn pose(&self) -> Pose {
        self.best
    }

    pub fn snapshot(&self) -> PoseSnapshot {
        PoseSnapshot {
            pose: self.best,
            cycle: self.cycles,
            updated_at: self.updated_at,
        }
    }

    pub fn odometry_pose(&self) -> Pose {
        self.odometry_pose
    }

    pub fn beacon_pose(&self) -> Pose {
        self.beacon_pose
    }

    /// Unwrapped heading change accumulated by odometry.
    pub fn total_rotation(&self) -> f32 {
        self.odometry.total_rotation()
    }

    pub fn fail_limit(&self) -> u32 {
        self.retry.fail_limit()
    }

    /// Takes effect from the next cycle.
    pub fn set_fail_limit(&mut self, fail_limit: u32) -> Result<(), NavError> {
        self.retry = RetryPolicy::new(fail_limit)?;
        Ok(())
    }

    pub fn room(&self) -> usize {
        self.beacon.room()
    }

    /// Switch the beacon calibration to another room.
    pub fn set_room(&mut self, room: usize) -> Result<(), NavError> {
        self.beacon.set_room(&self.calibration, room)
    }

    pub fn fusion(&self) -> &FusionEngine<K> {
        &self.fusion
    }

    /// Adjust uncertainty or velocity between cycles.
    pub fn fusion_mut(&mut self) -> &mut FusionEngine<K> {
        &mut self.fusion
    }

    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hardware
    }

    /// Number of successful cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn failed_cycles(&self) -> u64 {
        self.failed_cycles
    }
}
