//! `rovnav-runtime` – the pose estimation loop.
//!
//! # Modules
//!
//! - [`controller`] – [`PoseController`][controller::PoseController]: polls
//!   the hardware, drives odometry, beacon and fusion once per cycle, and
//!   exposes the best-estimate pose.  Configured by
//!   [`ControllerConfig`][controller::ControllerConfig].
//! - [`retry`] – [`RetryPolicy`][retry::RetryPolicy]: bounded per-cycle
//!   polling with an inclusive fail limit.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: console or
//!   JSON logging plus optional OTLP span export.

pub mod controller;
pub mod retry;
pub mod telemetry;

pub use controller::{ControllerConfig, CycleOutcome, FilterNames, PoseController};
pub use retry::{PollOutcome, RetryPolicy};
pub use telemetry::{TracerProviderGuard, init_tracing};
