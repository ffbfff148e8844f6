//! JSON-loadable alignment settings

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::alignment::DEFAULT_DEGENERACY_TOLERANCE;
use crate::error::{AlignError, AlignResult};
use crate::filters::butter_lowpass;

/// Alignment tuning, loadable from JSON
///
/// Missing fields fall back to the defaults below, so a config file only
/// needs the values it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignConfig {
    /// Butterworth lowpass order for accelerometer smoothing
    pub filter_order: usize,
    /// Lowpass cutoff as a fraction of Nyquist
    pub filter_cutoff: f64,
    /// Vertical component appended to planar GPS accelerations [m/s²]
    pub gravity: f64,
    /// Pairs whose mean GPS speed is below this are skipped [km/h]
    pub min_speed_kmh: f64,
    /// Relative gap between the two largest eigenvalues below which an
    /// estimate is flagged as degenerate
    pub degeneracy_tolerance: f64,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            filter_order: 4,
            filter_cutoff: 1.0 / 17.0,
            gravity: 9.81,
            min_speed_kmh: 7.0,
            degeneracy_tolerance: DEFAULT_DEGENERACY_TOLERANCE,
        }
    }
}

impl AlignConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> AlignResult<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AlignResult<()> {
        if !self.gravity.is_finite() {
            return Err(AlignError::Config(format!(
                "gravity must be finite, got {}",
                self.gravity
            )));
        }
        if !(self.min_speed_kmh >= 0.0) {
            return Err(AlignError::Config(format!(
                "min_speed_kmh must be non-negative, got {}",
                self.min_speed_kmh
            )));
        }
        if !(self.degeneracy_tolerance >= 0.0) {
            return Err(AlignError::Config(format!(
                "degeneracy_tolerance must be non-negative, got {}",
                self.degeneracy_tolerance
            )));
        }
        // Surfaces bad order/cutoff here rather than at first use
        self.filter_coefficients().map(|_| ())
    }

    /// `(b, a)` for the configured accelerometer lowpass
    pub fn filter_coefficients(&self) -> AlignResult<(Vec<f64>, Vec<f64>)> {
        butter_lowpass(self.filter_order, self.filter_cutoff)
    }
}
