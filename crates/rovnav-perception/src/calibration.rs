//! Per-room beacon calibration.
//!
//! Each room has its own beacon projector, so raw beacon ticks mean
//! something different in every room.  A [`CalibrationEntry`] maps a raw
//! fix into the shared global frame; the [`CalibrationTable`] holds one
//! entry per room and is immutable once built.
//!
//! # Composition order
//!
//! [`CalibrationEntry::apply`] always runs the same four steps:
//!
//! ```text
//! 1. shift    sx = rx − x_shift               sy = ry − y_shift
//! 2. scale    cx = sx / x_scale               cy = sy / y_scale
//! 3. rotate   by −φ (φ = rotation in radians)
//!             gx =  cx·cos φ + cy·sin φ
//!             gy = −cx·sin φ + cy·cos φ
//!             gθ = rθ − φ
//! 4. reflect  flip_x: gx = −gx, gθ = π − gθ
//!             flip_y: gy = −gy, gθ = −gθ
//! ```
//!
//! The heading is left un-normalized here; [`Pose`][rovnav_types::Pose]
//! normalizes it when the result is stored.

use std::f32::consts::PI;

use rovnav_types::NavError;
use serde::{Deserialize, Serialize};

/// Number of rooms covered by the beacon system.
pub const ROOM_COUNT: usize = 4;

/// Calibration constants for one room.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationEntry {
    /// Raw beacon X reading at the room origin (ticks).
    pub x_shift: f32,
    /// Raw beacon Y reading at the room origin (ticks).
    pub y_shift: f32,
    /// Beacon ticks per centimetre along X.
    pub x_scale: f32,
    /// Beacon ticks per centimetre along Y.
    pub y_scale: f32,
    /// Room rotation relative to the global frame (degrees).
    pub rotation: f32,
    #[serde(default)]
    pub flip_x: bool,
    #[serde(default)]
    pub flip_y: bool,
}

impl CalibrationEntry {
    /// Unflipped entry with equal X/Y scale.
    pub fn new(x_shift: f32, y_shift: f32, scale: f32, rotation: f32) -> Self {
        Self {
            x_shift,
            y_shift,
            x_scale: scale,
            y_scale: scale,
            rotation,
            flip_x: false,
            flip_y: false,
        }
    }

    /// Map a raw beacon fix `(x, y, theta)` into the global frame
    /// (centimetres, radians).  See the module docs for the step order.
    pub fn apply(&self, raw_x: f32, raw_y: f32, raw_theta: f32) -> (f32, f32, f32) {
        let cx = (raw_x - self.x_shift) / self.x_scale;
        let cy = (raw_y - self.y_shift) / self.y_scale;

        let phi = self.rotation.to_radians();
        let (sin, cos) = phi.sin_cos();
        let mut gx = cx * cos + cy * sin;
        let mut gy = -cx * sin + cy * cos;
        let mut gtheta = raw_theta - phi;

        if self.flip_x {
            gx = -gx;
            gtheta = PI - gtheta;
        }
        if self.flip_y {
            gy = -gy;
            gtheta = -gtheta;
        }
        (gx, gy, gtheta)
    }

    fn validate(&self, room: usize) -> Result<(), NavError> {
        let values = [
            self.x_shift,
            self.y_shift,
            self.x_scale,
            self.y_scale,
            self.rotation,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(NavError::Calibration(format!(
                "room {room} has a non-finite constant"
            )));
        }
        if self.x_scale == 0.0 || self.y_scale == 0.0 {
            return Err(NavError::Calibration(format!(
                "room {room} has a zero scale"
            )));
        }
        Ok(())
    }
}

/// Immutable per-room calibration, indexed by room id `0..ROOM_COUNT`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CalibrationEntry>", into = "Vec<CalibrationEntry>")]
pub struct CalibrationTable {
    rooms: [CalibrationEntry; ROOM_COUNT],
}

impl CalibrationTable {
    /// Build a table from exactly [`ROOM_COUNT`] entries.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::Calibration`] when the entry count is wrong or an
    /// entry has a zero or non-finite constant.
    pub fn new(entries: Vec<CalibrationEntry>) -> Result<Self, NavError> {
        let count = entries.len();
        let rooms: [CalibrationEntry; ROOM_COUNT] = entries.try_into().map_err(|_| {
            NavError::Calibration(format!(
                "expected {ROOM_COUNT} room entries, found {count}"
            ))
        })?;
        for (room, entry) in rooms.iter().enumerate() {
            entry.validate(room)?;
        }
        Ok(Self { rooms })
    }

    /// Entry for `room`.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::Calibration`] when `room` is out of range.
    pub fn entry(&self, room: usize) -> Result<&CalibrationEntry, NavError> {
        self.rooms.get(room).ok_or_else(|| {
            NavError::Calibration(format!(
                "room {room} is out of range (0..{ROOM_COUNT})"
            ))
        })
    }

    pub fn entries(&self) -> &[CalibrationEntry; ROOM_COUNT] {
        &self.rooms
    }
}

impl Default for CalibrationTable {
    /// Surveyed constants for the four-room arena.
    fn default() -> Self {
        Self {
            rooms: [
                CalibrationEntry::new(199.0, 154.0, 45.0, 350.7),
                CalibrationEntry::new(48.0, 281.0, 45.0, 263.1),
                CalibrationEntry::new(229.0, 449.0, 45.0, 5.7),
                CalibrationEntry::new(375.0, 303.0, 45.0, 273.4),
            ],
        }
    }
}

impl TryFrom<Vec<CalibrationEntry>> for CalibrationTable {
    type Error = NavError;

    fn try_from(entries: Vec<CalibrationEntry>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<CalibrationTable> for Vec<CalibrationEntry> {
    fn from(table: CalibrationTable) -> Self {
        table.rooms.to_vec()
    }
}
