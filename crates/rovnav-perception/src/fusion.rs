//! Pose Fusion Engine.
//!
//! Combines the beacon (absolute) pose and the wheel-odometry pose into a
//! single best estimate.  The numeric update itself is an injected
//! [`KalmanUpdate`] strategy; [`DiagonalKalman`] is the default.
//!
//! Heading is fused as `sin θ` rather than `θ`, so `0` and `2π` read as the
//! same value.  The fused heading is recovered with `asin`, which only
//! returns values in `[−π/2, π/2]`:
//!
//! ```text
//! θ ∈ [0, π/2] ∪ [3π/2, 2π)   recovered exactly
//! θ ∈ (π/2, 3π/2)             recovered as its mirror image π − θ
//! ```
//!
//! This is a property of the scheme and is kept as-is.
//!
//! # Example
//!
//! ```rust
//! use rovnav_perception::fusion::FusionEngine;
//! use rovnav_types::Pose;
//!
//! let mut engine = FusionEngine::default();
//! let mut best = Pose::default();
//!
//! let beacon = Pose::new(100.0, 50.0, 0.4);
//! let odometry = Pose::new(100.0, 50.0, 0.4);
//! let fused = engine.fuse(&beacon, &odometry, &mut best);
//!
//! assert!((fused.x() - 100.0).abs() < 1e-3);
//! assert!((fused.theta() - 0.4).abs() < 1e-3);
//! ```

use rovnav_types::{NavError, Pose};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Length of the fusion track buffer.
///
/// Layout: `[0..3]` fused `x, y, sin θ`; `[3..6]` velocity used for the
/// prediction; `[6..9]` posterior variance per axis.
pub const TRACK_LEN: usize = 9;

/// Default value for every uncertainty scalar.
pub const DEFAULT_UNCERTAINTY: f32 = 0.05;

// ────────────────────────────────────────────────────────────────────────────
// Uncertainty
// ────────────────────────────────────────────────────────────────────────────

/// The nine noise variances that weight the fusion, per axis `x, y, θ`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Uncertainty {
    /// Process noise added by each prediction step.
    pub process: [f32; 3],
    /// Beacon measurement noise.
    pub absolute: [f32; 3],
    /// Wheel-odometry measurement noise.
    pub odometry: [f32; 3],
}

impl Default for Uncertainty {
    fn default() -> Self {
        Self {
            process: [DEFAULT_UNCERTAINTY; 3],
            absolute: [DEFAULT_UNCERTAINTY; 3],
            odometry: [DEFAULT_UNCERTAINTY; 3],
        }
    }
}

impl Uncertainty {
    /// Flatten as `[process.., absolute.., odometry..]`.
    pub fn to_array(&self) -> [f32; 9] {
        let mut out = [0.0; 9];
        out[0..3].copy_from_slice(&self.process);
        out[3..6].copy_from_slice(&self.absolute);
        out[6..9].copy_from_slice(&self.odometry);
        out
    }

    /// Inverse of [`to_array`][Self::to_array].
    pub fn from_array(v: [f32; 9]) -> Self {
        Self {
            process: [v[0], v[1], v[2]],
            absolute: [v[3], v[4], v[5]],
            odometry: [v[6], v[7], v[8]],
        }
    }

    /// Every scalar must be finite and strictly positive.
    pub fn validate(&self) -> Result<(), NavError> {
        validate_group("process", &self.process)?;
        validate_group("absolute", &self.absolute)?;
        validate_group("odometry", &self.odometry)
    }
}

fn validate_group(group: &str, values: &[f32; 3]) -> Result<(), NavError> {
    match values.iter().find(|v| !v.is_finite() || **v <= 0.0) {
        Some(bad) => Err(NavError::InvalidConfig(format!(
            "{group} uncertainty must be positive, got {bad}"
        ))),
        None => Ok(()),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Strategy
// ────────────────────────────────────────────────────────────────────────────

/// Numeric fusion step.
///
/// Receives both measurement vectors (`x, y, sin θ`), the current velocity
/// estimate and the nine noise scalars, and writes its result into `track`
/// (see [`TRACK_LEN`] for the layout).  Implementations may keep internal
/// state between calls.
pub trait KalmanUpdate {
    fn update(
        &mut self,
        absolute: [f32; 3],
        odometry: [f32; 3],
        velocity: [f32; 3],
        uncertainty: &Uncertainty,
        track: &mut [f32; TRACK_LEN],
    );
}

/// Per-axis scalar Kalman filter with a constant-velocity prediction.
///
/// The first call seeds each axis with the inverse-variance weighted mean of
/// the two measurements.  Every later call predicts `s += v`, `p += q`, then
/// corrects with the beacon measurement followed by the odometry
/// measurement.
#[derive(Debug, Clone, Default)]
pub struct DiagonalKalman {
    state: Option<[f32; 3]>,
    variance: [f32; 3],
}

impl DiagonalKalman {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the filter explicitly instead of from the first measurements.
    pub fn seeded(state: [f32; 3], variance: [f32; 3]) -> Self {
        Self {
            state: Some(state),
            variance,
        }
    }

    pub fn state(&self) -> Option<[f32; 3]> {
        self.state
    }

    pub fn variance(&self) -> [f32; 3] {
        self.variance
    }
}

impl KalmanUpdate for DiagonalKalman {
    fn update(
        &mut self,
        absolute: [f32; 3],
        odometry: [f32; 3],
        velocity: [f32; 3],
        uncertainty: &Uncertainty,
        track: &mut [f32; TRACK_LEN],
    ) {
        let state = match self.state {
            None => {
                let mut seed = [0.0; 3];
                for i in 0..3 {
                    let wa = 1.0 / uncertainty.absolute[i];
                    let wo = 1.0 / uncertainty.odometry[i];
                    seed[i] = (absolute[i] * wa + odometry[i] * wo) / (wa + wo);
                    self.variance[i] = 1.0 / (wa + wo);
                }
                seed
            }
            Some(mut s) => {
                for i in 0..3 {
                    s[i] += velocity[i];
                    let mut p = self.variance[i] + uncertainty.process[i];

                    for (z, r) in [
                        (absolute[i], uncertainty.absolute[i]),
                        (odometry[i], uncertainty.odometry[i]),
                    ] {
                        let gain = p / (p + r);
                        s[i] += gain * (z - s[i]);
                        p *= 1.0 - gain;
                    }
                    self.variance[i] = p;
                }
                s
            }
        };
        self.state = Some(state);

        track[0..3].copy_from_slice(&state);
        track[3..6].copy_from_slice(&velocity);
        track[6..9].copy_from_slice(&self.variance);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// FusionEngine
// ────────────────────────────────────────────────────────────────────────────

/// Fuses the beacon and odometry poses into the best-estimate pose.
#[derive(Debug, Clone)]
pub struct FusionEngine<K = DiagonalKalman> {
    backend: K,
    velocity: [f32; 3],
    uncertainty: Uncertainty,
    track: [f32; TRACK_LEN],
}

impl Default for FusionEngine<DiagonalKalman> {
    fn default() -> Self {
        Self::new(DiagonalKalman::new())
    }
}

impl<K: KalmanUpdate> FusionEngine<K> {
    /// Engine with zero velocity and [`DEFAULT_UNCERTAINTY`] everywhere.
    pub fn new(backend: K) -> Self {
        Self {
            backend,
            velocity: [0.0; 3],
            uncertainty: Uncertainty::default(),
            track: [0.0; TRACK_LEN],
        }
    }

    /// Fuse `absolute` and `odometry`, write the result into `estimate` and
    /// return a copy of it.  Only `estimate` is modified.
    pub fn fuse(&mut self, absolute: &Pose, odometry: &Pose, estimate: &mut Pose) -> Pose {
        let mut abs = absolute.to_vector();
        let mut odo = odometry.to_vector();
        abs[2] = abs[2].sin();
        odo[2] = odo[2].sin();

        self.backend
            .update(abs, odo, self.velocity, &self.uncertainty, &mut self.track);

        // Rounding can push the fused sine a hair outside asin's domain.
        let theta = self.track[2].clamp(-1.0, 1.0).asin();
        estimate.set(self.track[0], self.track[1], theta);

        trace!(
            x = estimate.x(),
            y = estimate.y(),
            theta = estimate.theta(),
            "fused pose"
        );
        *estimate
    }

    /// Replace all nine uncertainty scalars.
    pub fn set_uncertainty(&mut self, uncertainty: Uncertainty) -> Result<(), NavError> {
        uncertainty.validate()?;
        self.uncertainty = uncertainty;
        Ok(())
    }

    /// Replace the process-noise group only.
    pub fn set_process_uncertainty(&mut self, x: f32, y: f32, theta: f32) -> Result<(), NavError> {
        let group = [x, y, theta];
        validate_group("process", &group)?;
        self.uncertainty.process = group;
        Ok(())
    }

    /// Replace the beacon-noise group only.
    pub fn set_absolute_uncertainty(&mut self, x: f32, y: f32, theta: f32) -> Result<(), NavError> {
        let group = [x, y, theta];
        validate_group("absolute", &group)?;
        self.uncertainty.absolute = group;
        Ok(())
    }

    /// Replace the odometry-noise group only.
    pub fn set_odometry_uncertainty(&mut self, x: f32, y: f32, theta: f32) -> Result<(), NavError> {
        let group = [x, y, theta];
        validate_group("odometry", &group)?;
        self.uncertainty.odometry = group;
        Ok(())
    }

    /// Velocity estimate used by the next [`fuse`][Self::fuse] call.
    pub fn set_velocity(&mut self, x: f32, y: f32, theta: f32) {
        self.velocity = [x, y, theta];
    }

    pub fn velocity(&self) -> [f32; 3] {
        self.velocity
    }

    pub fn uncertainty(&self) -> &Uncertainty {
        &self.uncertainty
    }

    /// Scratch/result buffer written by the most recent fusion.
    pub fn track(&self) -> &[f32; TRACK_LEN] {
        &self.track
    }

    pub fn backend(&self) -> &K {
        &self.backend
    }
}
