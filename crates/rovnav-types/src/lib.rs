use std::f32::consts::TAU;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wrap `theta` (radians) into `[0, 2π)`.
///
/// Negative inputs wrap to the top of the range rather than staying
/// negative.  `rem_euclid` can round a tiny negative angle up to exactly
/// `2π`, which is folded back to `0`.
pub fn normalize_theta(theta: f32) -> f32 {
    let wrapped = theta.rem_euclid(TAU);
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Planar robot pose in the global frame: position in centimetres and a
/// heading in radians that is always kept inside `[0, 2π)`.
///
/// Fields are private; every mutation re-normalizes the heading.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "PoseFields", into = "PoseFields")]
pub struct Pose {
    x: f32,
    y: f32,
    theta: f32,
}

impl Pose {
    /// Create a pose.  `theta` is normalized.
    pub fn new(x: f32, y: f32, theta: f32) -> Self {
        Self {
            x,
            y,
            theta: normalize_theta(theta),
        }
    }

    /// Build a pose from an `[x, y, theta]` vector.
    pub fn from_vector(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    /// Heading in radians, always within `[0, 2π)`.
    pub fn theta(&self) -> f32 {
        self.theta
    }

    pub fn set_x(&mut self, x: f32) {
        self.x = x;
    }

    pub fn set_y(&mut self, y: f32) {
        self.y = y;
    }

    pub fn set_theta(&mut self, theta: f32) {
        self.theta = normalize_theta(theta);
    }

    /// Overwrite all three components at once.
    pub fn set(&mut self, x: f32, y: f32, theta: f32) {
        self.set_x(x);
        self.set_y(y);
        self.set_theta(theta);
    }

    /// Accumulate a relative motion.
    pub fn add(&mut self, dx: f32, dy: f32, dtheta: f32) {
        self.x += dx;
        self.y += dy;
        self.set_theta(self.theta + dtheta);
    }

    /// `[x, y, theta]` vector used by the fusion step.
    pub fn to_vector(&self) -> [f32; 3] {
        [self.x, self.y, self.theta]
    }
}

/// Serialized form of [`Pose`]; deserializing routes through
/// [`Pose::new`] so a stored heading outside `[0, 2π)` is re-normalized.
#[derive(Serialize, Deserialize)]
struct PoseFields {
    x: f32,
    y: f32,
    theta: f32,
}

impl From<PoseFields> for Pose {
    fn from(f: PoseFields) -> Self {
        Pose::new(f.x, f.y, f.theta)
    }
}

impl From<Pose> for PoseFields {
    fn from(p: Pose) -> Self {
        PoseFields {
            x: p.x,
            y: p.y,
            theta: p.theta,
        }
    }
}

/// The three encoder-equipped wheels of the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Wheel {
    Left,
    Right,
    Rear,
}

impl Wheel {
    pub const ALL: [Wheel; 3] = [Wheel::Left, Wheel::Right, Wheel::Rear];
}

impl std::fmt::Display for Wheel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Wheel::Left => write!(f, "left"),
            Wheel::Right => write!(f, "right"),
            Wheel::Rear => write!(f, "rear"),
        }
    }
}

/// Read model for the externally visible best-estimate pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseSnapshot {
    pub pose: Pose,
    /// Number of successful cycles that have contributed to `pose`.
    pub cycle: u64,
    /// When `pose` was last advanced; `None` until the first successful cycle.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Workspace-wide error type spanning hardware polling, numeric
/// configuration and calibration problems.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NavError {
    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Filter coefficients '{resource}' unusable: {details}")]
    FilterCoefficients { resource: String, details: String },

    #[error("Calibration Error: {0}")]
    Calibration(String),

    #[error("Invalid Configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn in_range(theta: f32) -> bool {
        (0.0..TAU).contains(&theta)
    }

    #[test]
    fn normalize_keeps_in_range_values() {
        assert!((normalize_theta(1.0) - 1.0).abs() < 1e-6);
        assert_eq!(normalize_theta(0.0), 0.0);
    }

    #[test]
    fn normalize_wraps_negative_to_top_of_range() {
        let t = normalize_theta(-PI / 2.0);
        assert!((t - 3.0 * PI / 2.0).abs() < 1e-5);
    }

    #[test]
    fn normalize_full_turn_is_zero() {
        assert!(normalize_theta(TAU).abs() < 1e-5);
        assert!(normalize_theta(-TAU).abs() < 1e-5);
    }

    #[test]
    fn normalize_tiny_negative_never_returns_two_pi() {
        for t in [-1e-9_f32, -1e-7, -f32::EPSILON, -1e-30] {
            assert!(in_range(normalize_theta(t)), "{t} -> {}", normalize_theta(t));
        }
    }

    #[test]
    fn set_theta_and_add_stay_in_range_for_wide_inputs() {
        let mut pose = Pose::default();
        let mut theta = -1000.0_f32;
        while theta < 1000.0 {
            pose.set_theta(theta);
            assert!(in_range(pose.theta()), "set_theta({theta}) -> {}", pose.theta());
            pose.add(0.0, 0.0, theta * 0.37);
            assert!(in_range(pose.theta()), "add({theta}) -> {}", pose.theta());
            theta += 0.731;
        }
    }

    #[test]
    fn new_and_from_vector_normalize() {
        let p = Pose::new(1.0, 2.0, -0.5);
        assert!(in_range(p.theta()));
        let q = Pose::from_vector([1.0, 2.0, 7.0]);
        assert!((q.theta() - (7.0 - TAU)).abs() < 1e-5);
    }

    #[test]
    fn add_accumulates_position() {
        let mut p = Pose::new(1.0, 1.0, 0.0);
        p.add(2.0, -3.0, PI);
        assert!((p.x() - 3.0).abs() < 1e-6);
        assert!((p.y() + 2.0).abs() < 1e-6);
        assert!((p.theta() - PI).abs() < 1e-6);
    }

    #[test]
    fn to_vector_orders_components() {
        let p = Pose::new(4.0, 5.0, 1.5);
        assert_eq!(p.to_vector(), [4.0, 5.0, 1.5]);
    }

    #[test]
    fn deserialization_normalizes_heading() {
        let p: Pose = serde_json::from_str(r#"{"x":1.0,"y":2.0,"theta":-1.0}"#).unwrap();
        assert!(in_range(p.theta()));
        assert!((p.theta() - (TAU - 1.0)).abs() < 1e-5);
    }

    #[test]
    fn pose_serialization_roundtrip() {
        let p = Pose::new(10.5, -3.25, 2.0);
        let json = serde_json::to_string(&p).unwrap();
        let back: Pose = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn wheel_display_matches_serde_name() {
        for wheel in Wheel::ALL {
            let json = serde_json::to_string(&wheel).unwrap();
            assert_eq!(json, format!("\"{wheel}\""));
        }
    }

    #[test]
    fn nav_error_messages_name_the_component() {
        let err = NavError::HardwareFault {
            component: "poll".to_string(),
            details: "timeout".to_string(),
        };
        assert_eq!(err.to_string(), "Hardware Fault on poll: timeout");
    }
}
