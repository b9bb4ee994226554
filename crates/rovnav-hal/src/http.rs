//! Blocking JSON-over-HTTP bridge to a robot report endpoint.
//!
//! Each [`poll`][RobotInterface::poll] issues one
//! `GET <address>/report?robot=<id>` and caches the decoded body:
//!
//! ```json
//! {
//!   "ok": true,
//!   "wheels": { "left": 12, "right": -3, "rear": 0 },
//!   "beacon": { "x": 4410, "y": 7120, "theta": 1.57 }
//! }
//! ```
//!
//! Transport errors, non-2xx statuses, undecodable bodies and `"ok": false`
//! all surface as retryable [`NavError::HardwareFault`]s.  Until the first
//! successful poll every accessor reads zero.

use std::time::Duration;

use rovnav_types::{NavError, Wheel};
use serde::Deserialize;
use tracing::debug;

use crate::interface::RobotInterface;

/// Per-request timeout; a poll blocks at most this long.
const REQUEST_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct WheelReport {
    pub left: i32,
    pub right: i32,
    pub rear: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct BeaconReport {
    pub x: i32,
    pub y: i32,
    pub theta: f32,
}

/// Decoded body of the report endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct RobotReport {
    pub ok: bool,
    #[serde(default)]
    pub wheels: WheelReport,
    #[serde(default)]
    pub beacon: BeaconReport,
}

/// Decode a report body, rejecting reports flagged as not ok.
pub fn decode_report(body: &str) -> Result<RobotReport, NavError> {
    let report: RobotReport = serde_json::from_str(body).map_err(|e| NavError::HardwareFault {
        component: "http".to_string(),
        details: format!("malformed report: {e}"),
    })?;
    if !report.ok {
        return Err(NavError::HardwareFault {
            component: "http".to_string(),
            details: "robot reported a failed sensor update".to_string(),
        });
    }
    Ok(report)
}

/// [`RobotInterface`] backed by a blocking `reqwest` client.
pub struct HttpRobot {
    client: reqwest::blocking::Client,
    url: String,
    report: RobotReport,
}

impl HttpRobot {
    /// Build a bridge for robot `robot_id` at `address` (`host[:port]` or a
    /// full `http://` URL).
    ///
    /// # Errors
    ///
    /// Returns [`NavError::InvalidConfig`] if the HTTP client cannot be
    /// constructed.
    pub fn new(address: &str, robot_id: u32) -> Result<Self, NavError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NavError::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self {
            client,
            url: report_url(address, robot_id),
            report: RobotReport::default(),
        })
    }

    /// The endpoint polled by this bridge.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn fetch(&self) -> Result<RobotReport, NavError> {
        let fault = |details: String| NavError::HardwareFault {
            component: "http".to_string(),
            details,
        };
        let response = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| fault(format!("robot unreachable at {}: {e}", self.url)))?;
        if !response.status().is_success() {
            return Err(fault(format!("robot returned HTTP {}", response.status())));
        }
        let body = response
            .text()
            .map_err(|e| fault(format!("failed to read report body: {e}")))?;
        decode_report(&body)
    }
}

impl RobotInterface for HttpRobot {
    fn poll(&mut self) -> Result<(), NavError> {
        let report = self.fetch()?;
        debug!(url = %self.url, ?report, "robot report received");
        self.report = report;
        Ok(())
    }

    fn wheel_delta(&self, wheel: Wheel) -> i32 {
        match wheel {
            Wheel::Left => self.report.wheels.left,
            Wheel::Right => self.report.wheels.right,
            Wheel::Rear => self.report.wheels.rear,
        }
    }

    fn beacon_x(&self) -> i32 {
        self.report.beacon.x
    }

    fn beacon_y(&self) -> i32 {
        self.report.beacon.y
    }

    fn beacon_theta(&self) -> f32 {
        self.report.beacon.theta
    }
}

fn report_url(address: &str, robot_id: u32) -> String {
    let base = address.trim_end_matches('/');
    if base.starts_with("http://") || base.starts_with("https://") {
        format!("{base}/report?robot={robot_id}")
    } else {
        format!("http://{base}/report?robot={robot_id}")
    }
}
