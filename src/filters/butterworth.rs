//! Butterworth lowpass design
//!
//! Analog prototype poles on the left half of the unit circle are scaled to
//! the prewarped cutoff and mapped through the bilinear transform. All
//! digital zeros sit at z = -1, so the numerator is a scaled binomial.
//! Cutoff is normalised to Nyquist (`wn = 1` is half the sample rate).

use std::f64::consts::PI;

use nalgebra::Complex;

use crate::error::{AlignError, AlignResult};

/// Highest order the polynomial expansion stays well conditioned for
pub const MAX_ORDER: usize = 12;

/// Digital Butterworth lowpass `(b, a)` with `a[0] == 1`
///
/// # Arguments
/// * `order` - Filter order, 1..=MAX_ORDER
/// * `wn` - Cutoff as a fraction of Nyquist, in (0, 1)
pub fn butter_lowpass(order: usize, wn: f64) -> AlignResult<(Vec<f64>, Vec<f64>)> {
    if order == 0 || order > MAX_ORDER {
        return Err(AlignError::InvalidFilterDesign(format!(
            "order must be 1-{}, got {}",
            MAX_ORDER, order
        )));
    }
    if !(wn > 0.0 && wn < 1.0) {
        return Err(AlignError::InvalidFilterDesign(format!(
            "cutoff must be in (0, 1) of Nyquist, got {}",
            wn
        )));
    }

    // Bilinear transform at fs = 2 so that wn maps straight onto Nyquist
    let fs = 2.0;
    let warped = 2.0 * fs * (PI * wn / fs).tan();
    let fs2 = Complex::new(2.0 * fs, 0.0);

    let analog_poles: Vec<Complex<f64>> = (0..order)
        .map(|k| {
            let theta = PI * (2 * k + order + 1) as f64 / (2 * order) as f64;
            Complex::new(theta.cos(), theta.sin()) * warped
        })
        .collect();

    let digital_poles: Vec<Complex<f64>> = analog_poles
        .iter()
        .map(|&p| (fs2 + p) / (fs2 - p))
        .collect();

    let denominator_gain = analog_poles
        .iter()
        .fold(Complex::new(1.0, 0.0), |acc, &p| acc * (fs2 - p));
    let gain = warped.powi(order as i32) / denominator_gain.re;

    let b = binomial_row(order).into_iter().map(|c| gain * c).collect();
    let a = poly_from_roots(&digital_poles)
        .into_iter()
        .map(|c| c.re)
        .collect();

    Ok((b, a))
}

/// Coefficients of the monic polynomial with the given roots, highest power first
fn poly_from_roots(roots: &[Complex<f64>]) -> Vec<Complex<f64>> {
    let mut coeffs = vec![Complex::new(1.0, 0.0)];
    for &root in roots {
        let mut next = coeffs.clone();
        next.push(Complex::new(0.0, 0.0));
        for i in 1..next.len() {
            next[i] -= root * coeffs[i - 1];
        }
        coeffs = next;
    }
    coeffs
}

/// Row `n` of Pascal's triangle
fn binomial_row(n: usize) -> Vec<f64> {
    let mut row = vec![1.0];
    for k in 0..n {
        let next = row[k] * (n - k) as f64 / (k + 1) as f64;
        row.push(next);
    }
    row
}
