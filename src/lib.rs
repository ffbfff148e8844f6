//! Accelerometer mount alignment
//!
//! Estimates the fixed rotation between a vehicle-mounted accelerometer and
//! the vehicle frame by correlating smoothed accelerometer readings with
//! longitudinal/centripetal accelerations derived from GPS speed and track.

pub mod alignment;
pub mod angles;
pub mod config;
pub mod error;
pub mod filters;
pub mod kinematics;
pub mod quaternion;
pub mod table;
pub mod types;

pub use alignment::{
    estimate_batch, BatchAlignment, BatchConfig, CorrelationAccumulator, RotationEstimate,
    SkipCounts, StreamingAligner,
};
pub use config::AlignConfig;
pub use error::{AlignError, AlignResult};
pub use quaternion::{rotate, rotate_series, Quat};
