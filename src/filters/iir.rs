//! IIR filter implementations
//!
//! [`IirFilter`] is the streaming engine: one sample in, one sample out, with
//! explicit input and output delay lines. [`lfilter`] is the offline
//! reference (transposed direct form II over a whole signal) and the two must
//! agree sample for sample when the batch filter starts from zero state.
//!
//! Coefficients follow the usual transfer-function layout
//!
//! ```text
//! H(z) = (b0 + b1 z^-1 + ... + bN z^-N) / (a0 + a1 z^-1 + ... + aN z^-N)
//! ```
//!
//! with `a0 == 1` assumed by the streaming engine.

use std::collections::VecDeque;

use ndarray::{Array2, ArrayView2};

use crate::error::{AlignError, AlignResult};
use crate::types::Vec3;

fn check_coefficients(b: &[f64], a: &[f64]) -> AlignResult<()> {
    if b.is_empty() || a.is_empty() {
        return Err(AlignError::EmptyCoefficients);
    }
    if b.len() != a.len() {
        return Err(AlignError::CoefficientLengthMismatch {
            b_len: b.len(),
            a_len: a.len(),
        });
    }
    Ok(())
}

/// Single-channel recursive filter
///
/// `y[n] = Σ b[i]·x[n-i] − Σ_{i>0} a[i]·y[n-i]`
#[derive(Debug, Clone)]
pub struct IirFilter {
    b: Vec<f64>,
    a: Vec<f64>,
    /// Most recent input first, length N
    input: VecDeque<f64>,
    /// Most recent output first, length N-1
    output: VecDeque<f64>,
    last_output: f64,
}

impl IirFilter {
    /// Create a filter with zeroed delay lines
    ///
    /// Fails if either coefficient vector is empty or their lengths differ.
    pub fn new(b: &[f64], a: &[f64]) -> AlignResult<Self> {
        check_coefficients(b, a)?;
        let n = b.len();
        Ok(Self {
            b: b.to_vec(),
            a: a.to_vec(),
            input: VecDeque::from(vec![0.0; n]),
            output: VecDeque::from(vec![0.0; n - 1]),
            last_output: 0.0,
        })
    }

    /// Filter one sample
    pub fn step(&mut self, sample: f64) -> f64 {
        self.input.push_front(sample);
        self.input.truncate(self.b.len());

        let feedforward: f64 = self.b.iter().zip(&self.input).map(|(b, x)| b * x).sum();
        let feedback: f64 = self.a[1..]
            .iter()
            .zip(&self.output)
            .map(|(a, y)| a * y)
            .sum();
        let output = feedforward - feedback;

        self.output.push_front(output);
        self.output.truncate(self.a.len() - 1);
        self.last_output = output;

        output
    }

    /// Filter a whole slice, continuing from the current state
    pub fn process(&mut self, samples: &[f64]) -> Vec<f64> {
        samples.iter().map(|&x| self.step(x)).collect()
    }

    /// Output of the most recent `step` (0.0 before the first sample)
    pub fn last_output(&self) -> f64 {
        self.last_output
    }

    /// Filter order (number of coefficients minus one)
    pub fn order(&self) -> usize {
        self.b.len() - 1
    }

    /// Zero both delay lines
    pub fn reset(&mut self) {
        self.input.iter_mut().for_each(|x| *x = 0.0);
        self.output.iter_mut().for_each(|y| *y = 0.0);
        self.last_output = 0.0;
    }
}

/// Three independent filters sharing one coefficient set, one per axis
#[derive(Debug, Clone)]
pub struct IirFilter3 {
    axes: [IirFilter; 3],
}

impl IirFilter3 {
    pub fn new(b: &[f64], a: &[f64]) -> AlignResult<Self> {
        let x = IirFilter::new(b, a)?;
        Ok(Self {
            axes: [x.clone(), x.clone(), x],
        })
    }

    /// Filter one 3-vector, axis by axis
    pub fn step(&mut self, v: &Vec3) -> Vec3 {
        Vec3::new(
            self.axes[0].step(v.x),
            self.axes[1].step(v.y),
            self.axes[2].step(v.z),
        )
    }

    pub fn last_output(&self) -> Vec3 {
        Vec3::new(
            self.axes[0].last_output(),
            self.axes[1].last_output(),
            self.axes[2].last_output(),
        )
    }

    pub fn reset(&mut self) {
        self.axes.iter_mut().for_each(IirFilter::reset);
    }
}

/// Offline linear filter (transposed direct form II)
///
/// Coefficients may differ in length and are normalised by `a[0]`. `zi` is
/// the initial state of length `max(len(a), len(b)) - 1`; `None` means zero
/// state. Returns the filtered signal and the final state.
pub fn lfilter(
    b: &[f64],
    a: &[f64],
    x: &[f64],
    zi: Option<&[f64]>,
) -> AlignResult<(Vec<f64>, Vec<f64>)> {
    if b.is_empty() || a.is_empty() {
        return Err(AlignError::EmptyCoefficients);
    }
    if a[0] == 0.0 {
        return Err(AlignError::InvalidFilterDesign(
            "leading denominator coefficient must be non-zero".to_string(),
        ));
    }

    let n = b.len().max(a.len());
    let a0 = a[0];
    let norm = |c: &[f64]| -> Vec<f64> {
        let mut v: Vec<f64> = c.iter().map(|v| v / a0).collect();
        v.resize(n, 0.0);
        v
    };
    let b = norm(b);
    let a = norm(a);

    let mut z = match zi {
        Some(zi) if zi.len() != n - 1 => {
            return Err(AlignError::InvalidFilterDesign(format!(
                "initial state must have length {}, got {}",
                n - 1,
                zi.len()
            )))
        }
        Some(zi) => zi.to_vec(),
        None => vec![0.0; n - 1],
    };

    let mut y = Vec::with_capacity(x.len());
    for &xn in x {
        let yn = b[0] * xn + z.first().copied().unwrap_or(0.0);
        for i in 0..z.len() {
            let carry = z.get(i + 1).copied().unwrap_or(0.0);
            z[i] = b[i + 1] * xn - a[i + 1] * yn + carry;
        }
        y.push(yn);
    }

    Ok((y, z))
}

/// Initial state for [`lfilter`] from past outputs and inputs
///
/// `y_hist` and `x_hist` are ordered most recent first (`y[-1], y[-2], ...`)
/// and zero-padded when short.
pub fn lfiltic(b: &[f64], a: &[f64], y_hist: &[f64], x_hist: &[f64]) -> AlignResult<Vec<f64>> {
    if b.is_empty() || a.is_empty() {
        return Err(AlignError::EmptyCoefficients);
    }
    let n = a.len() - 1;
    let m = b.len() - 1;
    let k = n.max(m);
    let past = |hist: &[f64], i: usize| hist.get(i).copied().unwrap_or(0.0);

    let mut zi = vec![0.0; k];
    for (j, z) in zi.iter_mut().enumerate().take(m) {
        *z = (j + 1..=m).map(|i| b[i] * past(x_hist, i - j - 1)).sum();
    }
    for (j, z) in zi.iter_mut().enumerate().take(n) {
        *z -= (j + 1..=n)
            .map(|i| a[i] * past(y_hist, i - j - 1))
            .sum::<f64>();
    }
    if a[0] != 1.0 {
        zi.iter_mut().for_each(|z| *z /= a[0]);
    }
    Ok(zi)
}

/// Offline filter starting from constant input and output history
///
/// `x_level == y_level` starts a unity-DC-gain filter in steady state at that
/// level; both zero is plain zero-state filtering.
pub fn filter_with_history(
    b: &[f64],
    a: &[f64],
    x: &[f64],
    x_level: f64,
    y_level: f64,
) -> AlignResult<Vec<f64>> {
    let x_hist = vec![x_level; a.len()];
    let y_hist = vec![y_level; b.len().saturating_sub(1)];
    let zi = lfiltic(b, a, &y_hist, &x_hist)?;
    let (y, _) = lfilter(b, a, x, Some(&zi))?;
    Ok(y)
}

/// Filter every data column of a `[time, c1, c2, ...]` table from zero state
///
/// The time column is copied through unchanged.
pub fn filter_table(b: &[f64], a: &[f64], table: ArrayView2<f64>) -> AlignResult<Array2<f64>> {
    check_coefficients(b, a)?;
    if table.ncols() < 2 {
        return Err(AlignError::TableShape(format!(
            "filter_table needs a time column and at least one data column, got {} columns",
            table.ncols()
        )));
    }

    let mut out = table.to_owned();
    for col in 1..table.ncols() {
        let signal: Vec<f64> = table.column(col).to_vec();
        let (filtered, _) = lfilter(b, a, &signal, None)?;
        for (slot, value) in out.column_mut(col).iter_mut().zip(filtered) {
            *slot = value;
        }
    }
    Ok(out)
}
