//! Optimal rotation between the accelerometer frame and the vehicle frame
//!
//! For paired observations `(a_k, g_k)` (device-frame accelerometer vector,
//! vehicle-frame GPS acceleration) we want the unit quaternion `q` with
//! `q * a_k * q̄ ≈ g_k`, i.e. `q * a_k ≈ g_k * q`. Writing both sides with
//! product matrices gives `R(a_k)·q ≈ L(g_k)·q`, and maximising
//!
//! ```text
//! Σ (R(a_k)·q)ᵀ (L(g_k)·q) = qᵀ M q,   M = Σ R(0, a_k)ᵀ · L(0, g_k)
//! ```
//!
//! over unit `q` picks the eigenvector of `M` with the largest eigenvalue.
//! Left and right products commute, so `M` is symmetric for pure-quaternion
//! inputs and a symmetric eigen-decomposition applies.

use nalgebra::SymmetricEigen;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::config::AlignConfig;
use crate::error::{AlignError, AlignResult};
use crate::filters::IirFilter3;
use crate::kinematics::accel_series;
use crate::quaternion::{left_product_matrix, right_product_matrix, Quat};
use crate::types::{Mat4, Vec3, ACCEL_COLUMNS, COL_GPS_SPEED_KMH, COL_TIME};

pub const DEFAULT_DEGENERACY_TOLERANCE: f64 = 1e-6;

/// Rank contribution `R(0, a)ᵀ · L(0, g)` of one observation pair
pub fn pair_contribution(accel: &Vec3, gps: &Vec3) -> Mat4 {
    let p = right_product_matrix(&Quat::pure(accel));
    let q = left_product_matrix(&Quat::pure(gps));
    p.transpose() * q
}

/// Best-fit rotation derived from a correlation matrix snapshot
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RotationEstimate {
    /// Unit quaternion, scalar part non-negative
    pub quaternion: Quat,
    /// Correlation matrix the estimate was taken from
    pub correlation: Mat4,
    /// Number of observation pairs accumulated into `correlation`
    pub observations: usize,
    /// Eigenvalues of the symmetrised correlation matrix, largest first
    pub eigenvalues: [f64; 4],
    /// Top eigenvalue not clearly separated from the next one, judged with
    /// the producing accumulator's tolerance; see [`Self::is_degenerate`]
    pub degenerate: bool,
}

impl RotationEstimate {
    /// Gap between the two largest eigenvalues relative to the largest magnitude
    pub fn eigen_gap(&self) -> f64 {
        relative_gap(&self.eigenvalues)
    }

    /// Re-check degeneracy against a caller-chosen tolerance
    pub fn is_degenerate(&self, tolerance: f64) -> bool {
        self.observations == 0 || self.eigen_gap() <= tolerance
    }

    /// Rotation angle of the estimate [degrees]
    pub fn angle_deg(&self) -> f64 {
        self.quaternion.rotation_angle().to_degrees()
    }
}

fn relative_gap(sorted_desc: &[f64; 4]) -> f64 {
    let scale = sorted_desc[0].abs().max(sorted_desc[1].abs());
    if scale > 0.0 {
        (sorted_desc[0] - sorted_desc[1]) / scale
    } else {
        0.0
    }
}

/// Running 4×4 correlation matrix `M`
#[derive(Clone, Debug)]
pub struct CorrelationAccumulator {
    m: Mat4,
    observations: usize,
    degeneracy_tolerance: f64,
}

impl Default for CorrelationAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrelationAccumulator {
    pub fn new() -> Self {
        Self::with_tolerance(DEFAULT_DEGENERACY_TOLERANCE)
    }

    pub fn with_tolerance(degeneracy_tolerance: f64) -> Self {
        Self {
            m: Mat4::zeros(),
            observations: 0,
            degeneracy_tolerance,
        }
    }

    /// Accumulate one `(accelerometer, gps)` pair
    pub fn add(&mut self, accel: &Vec3, gps: &Vec3) {
        self.m += pair_contribution(accel, gps);
        self.observations += 1;
    }

    pub fn correlation(&self) -> &Mat4 {
        &self.m
    }

    pub fn observations(&self) -> usize {
        self.observations
    }

    pub fn reset(&mut self) {
        self.m = Mat4::zeros();
        self.observations = 0;
    }

    /// Eigen-decompose the current `M`; recomputed on every call
    pub fn estimate(&self) -> RotationEstimate {
        // M is symmetric up to rounding; only the lower triangle is read otherwise
        let symmetric = (self.m + self.m.transpose()) * 0.5;
        let eigen = SymmetricEigen::new(symmetric);

        let best = eigen.eigenvalues.imax();
        let quaternion = Quat::from_vector(&eigen.eigenvectors.column(best).into_owned());
        let quaternion = quaternion.normalize().unwrap_or_default().canonical();

        let mut eigenvalues = [0.0; 4];
        eigenvalues.copy_from_slice(eigen.eigenvalues.as_slice());
        eigenvalues.sort_by(|a, b| b.total_cmp(a));

        let degenerate =
            self.observations == 0 || relative_gap(&eigenvalues) <= self.degeneracy_tolerance;

        log::debug!(
            "eigenvalues={:?}, argmax={}, observations={}, q={:?}",
            eigen.eigenvalues.as_slice(),
            best,
            self.observations,
            quaternion.to_scalar_first()
        );

        RotationEstimate {
            quaternion,
            correlation: self.m,
            observations: self.observations,
            eigenvalues,
            degenerate,
        }
    }
}

/// Batch estimator settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Mean GPS speed below which a pair is skipped [km/h]
    pub min_speed_kmh: f64,
    /// Vertical component appended to GPS accelerations [m/s²]
    pub gravity: f64,
    pub degeneracy_tolerance: f64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::from(&AlignConfig::default())
    }
}

impl From<&AlignConfig> for BatchConfig {
    fn from(config: &AlignConfig) -> Self {
        Self {
            min_speed_kmh: config.min_speed_kmh,
            gravity: config.gravity,
            degeneracy_tolerance: config.degeneracy_tolerance,
        }
    }
}

/// Observation pairs dropped before accumulation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipCounts {
    /// No accelerometer sample at or before the GPS timestamp
    pub no_accel_match: usize,
    /// Mean speed over the GPS interval below the threshold
    pub below_speed: usize,
    /// A NaN or infinite component in either vector
    pub non_finite: usize,
}

impl SkipCounts {
    pub fn total(&self) -> usize {
        self.no_accel_match + self.below_speed + self.non_finite
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchAlignment {
    pub estimate: RotationEstimate,
    pub skipped: SkipCounts,
    /// GPS acceleration samples considered
    pub gps_samples: usize,
}

fn all_finite(v: &Vec3) -> bool {
    v.iter().all(|c| c.is_finite())
}

/// Index of the last sample with `time <= t`, for non-decreasing `times`
pub fn last_at_or_before(times: &[f64], t: f64) -> Option<usize> {
    times.partition_point(|&ts| ts <= t).checked_sub(1)
}

/// One-shot estimate from a filtered accelerometer table and a raw GPS table
///
/// `faccel` is `[time_ms, ax, ay, az]`, `gps` is
/// `[time_ms, lat, lng, speed_kmh, track_deg, ...]`, both time-ordered.
pub fn estimate_batch(
    faccel: ArrayView2<f64>,
    gps: ArrayView2<f64>,
    config: &BatchConfig,
) -> AlignResult<BatchAlignment> {
    if faccel.ncols() < ACCEL_COLUMNS {
        return Err(AlignError::TableShape(format!(
            "accelerometer table needs at least {} columns, got {}",
            ACCEL_COLUMNS,
            faccel.ncols()
        )));
    }

    let gps_accel = accel_series(gps)?;
    let accel_times = faccel.column(COL_TIME).to_vec();

    let mut accumulator = CorrelationAccumulator::with_tolerance(config.degeneracy_tolerance);
    let mut skipped = SkipCounts::default();

    for (n, sample) in gps_accel.iter().enumerate() {
        // A NaN timestamp cannot be placed on the accelerometer timeline
        if !sample.time_ms.is_finite() {
            skipped.non_finite += 1;
            continue;
        }

        let idx = match last_at_or_before(&accel_times, sample.time_ms) {
            Some(idx) => idx,
            None => {
                skipped.no_accel_match += 1;
                continue;
            }
        };

        let row = faccel.row(idx);
        let a = Vec3::new(row[1], row[2], row[3]);
        let g = sample.with_vertical(config.gravity);

        // Sample n spans GPS rows n and n + 1
        let speed = (gps[[n, COL_GPS_SPEED_KMH]] + gps[[n + 1, COL_GPS_SPEED_KMH]]) / 2.0;
        if speed < config.min_speed_kmh {
            skipped.below_speed += 1;
            continue;
        }
        if !speed.is_finite() || !all_finite(&a) || !all_finite(&g) {
            skipped.non_finite += 1;
            continue;
        }

        accumulator.add(&a, &g);
    }

    let estimate = accumulator.estimate();
    log::info!(
        "batch alignment: {} of {} pairs used ({} unmatched, {} slow, {} non-finite), \
         angle {:.2} deg",
        estimate.observations,
        gps_accel.len(),
        skipped.no_accel_match,
        skipped.below_speed,
        skipped.non_finite,
        estimate.angle_deg()
    );
    if estimate.degenerate {
        log::warn!(
            "rotation estimate is degenerate (eigenvalues {:?}); quaternion is not unique",
            estimate.eigenvalues
        );
    }

    Ok(BatchAlignment {
        estimate,
        skipped,
        gps_samples: gps_accel.len(),
    })
}

/// Incremental estimator over pre-aligned sample pairs
///
/// Each update runs both vectors through their own 3-axis lowpass and adds
/// the filtered pair to `M`. The estimate can be read at any time.
#[derive(Clone, Debug)]
pub struct StreamingAligner {
    accel_filter: IirFilter3,
    gps_filter: IirFilter3,
    accumulator: CorrelationAccumulator,
    skipped_non_finite: usize,
}

impl StreamingAligner {
    /// Fails if the coefficient vectors are empty or of different lengths
    pub fn new(b: &[f64], a: &[f64]) -> AlignResult<Self> {
        Ok(Self {
            accel_filter: IirFilter3::new(b, a)?,
            gps_filter: IirFilter3::new(b, a)?,
            accumulator: CorrelationAccumulator::new(),
            skipped_non_finite: 0,
        })
    }

    pub fn from_config(config: &AlignConfig) -> AlignResult<Self> {
        let (b, a) = config.filter_coefficients()?;
        let mut aligner = Self::new(&b, &a)?;
        aligner.accumulator = CorrelationAccumulator::with_tolerance(config.degeneracy_tolerance);
        Ok(aligner)
    }

    /// Filter and accumulate one time-aligned pair
    ///
    /// Pairs with a non-finite component are dropped before they reach the
    /// filters, so filter state stays clean. Returns whether the pair was used.
    pub fn update(&mut self, accel: &Vec3, gps_accel: &Vec3) -> bool {
        if !all_finite(accel) || !all_finite(gps_accel) {
            self.skipped_non_finite += 1;
            return false;
        }

        let a = self.accel_filter.step(accel);
        let g = self.gps_filter.step(gps_accel);
        self.accumulator.add(&a, &g);
        true
    }

    /// Most recent filtered `(accelerometer, gps)` pair
    pub fn filtered(&self) -> (Vec3, Vec3) {
        (self.accel_filter.last_output(), self.gps_filter.last_output())
    }

    pub fn estimate(&self) -> RotationEstimate {
        self.accumulator.estimate()
    }

    pub fn observations(&self) -> usize {
        self.accumulator.observations()
    }

    pub fn skipped_non_finite(&self) -> usize {
        self.skipped_non_finite
    }

    /// Clear filter state and the accumulated correlation matrix
    pub fn reset(&mut self) {
        self.accel_filter.reset();
        self.gps_filter.reset();
        self.accumulator.reset();
        self.skipped_non_finite = 0;
    }
}
