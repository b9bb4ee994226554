//! `rovnav-perception` – pose estimation.
//!
//! Turns noisy wheel-encoder ticks and raw beacon fixes into one stabilized
//! planar pose.
//!
//! # Modules
//!
//! - [`filter`] – [`FirFilter`][filter::FirFilter]: per-channel FIR smoothing
//!   with coefficients resolved through a
//!   [`CoefficientSource`][filter::CoefficientSource].
//! - [`calibration`] – [`CalibrationTable`][calibration::CalibrationTable]:
//!   per-room constants mapping beacon ticks into the global frame.
//! - [`odometry`] – [`WheelOdometry`][odometry::WheelOdometry]: three-wheel
//!   dead reckoning that accumulates into a [`Pose`][rovnav_types::Pose].
//! - [`beacon`] – [`BeaconEstimator`][beacon::BeaconEstimator]: absolute pose
//!   from the calibrated beacon fix.
//! - [`fusion`] – [`FusionEngine`][fusion::FusionEngine]: combines both
//!   estimates through an injected [`KalmanUpdate`][fusion::KalmanUpdate]
//!   strategy.

pub mod beacon;
pub mod calibration;
pub mod filter;
pub mod fusion;
pub mod odometry;

pub use beacon::BeaconEstimator;
pub use calibration::{CalibrationEntry, CalibrationTable, ROOM_COUNT};
pub use filter::{CoefficientSource, DirectorySource, FirFilter, StaticSource};
pub use fusion::{DiagonalKalman, FusionEngine, KalmanUpdate, Uncertainty};
pub use odometry::{OdometryDelta, RobotGeometry, WheelOdometry};
