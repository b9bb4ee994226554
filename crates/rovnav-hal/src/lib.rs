//! `rovnav-hal` – hardware boundary.
//!
//! The pose pipeline only ever talks to the [`RobotInterface`] trait, so the
//! transport can be swapped without touching estimation logic.
//!
//! # Modules
//!
//! - [`interface`] – [`RobotInterface`][interface::RobotInterface]: poll the
//!   robot, then read wheel-encoder deltas and the raw beacon fix.
//! - [`sim`] – [`SimRobot`][sim::SimRobot]: scripted in-process robot for
//!   tests and headless runs.
//! - [`http`] – [`HttpRobot`][http::HttpRobot]: blocking JSON-over-HTTP
//!   bridge to a robot report endpoint.

pub mod http;
pub mod interface;
pub mod sim;

pub use http::HttpRobot;
pub use interface::RobotInterface;
pub use sim::SimRobot;
