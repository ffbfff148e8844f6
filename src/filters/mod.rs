//! Digital filters for accelerometer smoothing
//!
//! `iir` holds the streaming recursive filter and its batch reference,
//! `butterworth` designs the coefficient vectors they consume.

pub mod butterworth;
pub mod iir;

pub use butterworth::butter_lowpass;
pub use iir::{filter_table, filter_with_history, lfilter, lfiltic, IirFilter, IirFilter3};
