pub mod linalg;

pub use linalg::*;

use serde::{Deserialize, Serialize};

// ===== Table Columns =====
/// Accelerometer table: `[time_ms, ax, ay, az]`
pub const ACCEL_COLUMNS: usize = 4;
/// GPS table: `[time_ms, lat, lng, speed_kmh, track_deg, satellites, altitude]`.
/// Only the first five columns are read.
pub const GPS_MIN_COLUMNS: usize = 5;

pub const COL_TIME: usize = 0;
pub const COL_GPS_SPEED_KMH: usize = 3;
pub const COL_GPS_TRACK_DEG: usize = 4;

/// Speed and course over ground at one GPS fix
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeedTrack {
    /// Table timestamp [ms], kept as read
    pub time_ms: f64,
    /// m/s
    pub speed: f64,
    /// radians, [0, 2π)
    pub track: f64,
}

/// Planar vehicle-frame acceleration derived from two consecutive fixes
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GpsAccel {
    /// Timestamp of the later fix [ms]
    pub time_ms: f64,
    /// Along-track acceleration [m/s²]
    pub longitudinal: f64,
    /// Across-track acceleration from heading change [m/s²]
    pub centripetal: f64,
}

impl GpsAccel {
    /// Vehicle-frame 3-vector with a fixed vertical component
    pub fn with_vertical(&self, vertical: f64) -> Vec3 {
        Vec3::new(self.longitudinal, self.centripetal, vertical)
    }

    pub fn is_finite(&self) -> bool {
        self.time_ms.is_finite() && self.longitudinal.is_finite() && self.centripetal.is_finite()
    }
}
