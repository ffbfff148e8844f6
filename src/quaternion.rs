//! Quaternion algebra for mount alignment
//!
//! Internal convention is scalar-first `(w, x, y, z)` with Hamilton
//! multiplication. Scalar-last `(x, y, z, w)` appears only at the boundary
//! with nalgebra, whose `Quaternion::coords` storage is scalar-last; use the
//! named conversions below rather than reordering arrays by hand.
//!
//! Multiplication is expressed through 4×4 product matrices so that the
//! rotation estimator can build its correlation matrix from the same
//! building blocks:
//!
//! ```text
//! L(p) · q = p * q
//! R(q) · p = p * q
//! ```

use std::ops::{Mul, Neg};

use nalgebra::{Quaternion, UnitQuaternion, Vector4};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{AlignError, AlignResult};
use crate::types::{Mat4, Vec3, Vec4, ACCEL_COLUMNS};

/// Quaternion with scalar part `w` and vector part `(x, y, z)`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quat {
    pub const fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// Identity quaternion (no rotation)
    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Pure quaternion `[0, v]` embedding a 3-vector
    pub fn pure(v: &Vec3) -> Self {
        Self::new(0.0, v.x, v.y, v.z)
    }

    /// Build from `[w, x, y, z]`
    pub fn from_scalar_first(c: [f64; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }

    /// Build from `[x, y, z, w]`
    pub fn from_scalar_last(c: [f64; 4]) -> Self {
        Self::new(c[3], c[0], c[1], c[2])
    }

    pub fn to_scalar_first(&self) -> [f64; 4] {
        [self.w, self.x, self.y, self.z]
    }

    pub fn to_scalar_last(&self) -> [f64; 4] {
        [self.x, self.y, self.z, self.w]
    }

    /// Build from a scalar-first column vector
    pub fn from_vector(v: &Vec4) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }

    /// Scalar-first column vector
    pub fn as_vector(&self) -> Vec4 {
        Vec4::new(self.w, self.x, self.y, self.z)
    }

    pub fn conjugate(&self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.w * other.w + self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn norm_squared(&self) -> f64 {
        self.dot(self)
    }

    pub fn norm(&self) -> f64 {
        self.norm_squared().sqrt()
    }

    /// Unit-length copy, or `None` for a zero (or non-finite) quaternion
    pub fn normalize(&self) -> Option<Self> {
        let n = self.norm();
        if n > 0.0 && n.is_finite() {
            Some(Self::new(self.w / n, self.x / n, self.y / n, self.z / n))
        } else {
            None
        }
    }

    /// Left-multiply product matrix `L(self)`
    pub fn left_matrix(&self) -> Mat4 {
        left_product_matrix(self)
    }

    /// Right-multiply product matrix `R(self)`
    pub fn right_matrix(&self) -> Mat4 {
        right_product_matrix(self)
    }

    /// Full rotation angle of the normalised quaternion [radians]
    pub fn rotation_angle(&self) -> f64 {
        match self.normalize() {
            Some(u) => 2.0 * u.w.abs().min(1.0).acos(),
            None => 0.0,
        }
    }

    /// Same rotation with a non-negative scalar part
    pub fn canonical(&self) -> Self {
        if self.w < 0.0 {
            -*self
        } else {
            *self
        }
    }

    /// nalgebra rotation for this quaternion (normalised), `None` if zero
    pub fn to_unit_quaternion(&self) -> Option<UnitQuaternion<f64>> {
        let q = Quaternion::from(Vector4::from(self.to_scalar_last()));
        UnitQuaternion::try_new(q, f64::EPSILON)
    }

    pub fn from_unit_quaternion(q: &UnitQuaternion<f64>) -> Self {
        let c = q.quaternion().coords;
        Self::from_scalar_last([c[0], c[1], c[2], c[3]])
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul for Quat {
    type Output = Quat;

    /// Hamilton product
    fn mul(self, rhs: Quat) -> Quat {
        Quat::from_vector(&(left_product_matrix(&self) * rhs.as_vector()))
    }
}

impl Neg for Quat {
    type Output = Quat;

    fn neg(self) -> Quat {
        Quat::new(-self.w, -self.x, -self.y, -self.z)
    }
}

/// Matrix `L(p)` with `L(p) · q⃗ = (p * q)⃗`
pub fn left_product_matrix(p: &Quat) -> Mat4 {
    let (p0, p1, p2, p3) = (p.w, p.x, p.y, p.z);
    Mat4::new(
        p0, -p1, -p2, -p3, //
        p1, p0, -p3, p2, //
        p2, p3, p0, -p1, //
        p3, -p2, p1, p0,
    )
}

/// Matrix `R(q)` with `R(q) · p⃗ = (p * q)⃗`
pub fn right_product_matrix(q: &Quat) -> Mat4 {
    let (q0, q1, q2, q3) = (q.w, q.x, q.y, q.z);
    Mat4::new(
        q0, -q1, -q2, -q3, //
        q1, q0, q3, -q2, //
        q2, -q3, q0, q1, //
        q3, q2, -q1, q0,
    )
}

/// Rotate `v` by `q` using the sandwich product `q * [0, v] * q̄`
///
/// `q` must be unit length for a pure rotation; otherwise the result is
/// scaled by `|q|²`.
pub fn rotate(q: &Quat, v: &Vec3) -> Vec3 {
    let sandwich = right_product_matrix(&q.conjugate()) * left_product_matrix(q);
    let out = sandwich * Quat::pure(v).as_vector();
    Vec3::new(out[1], out[2], out[3])
}

/// Rotate columns 1..=3 of every row of a `[time, x, y, z, ...]` table
///
/// Timestamps, trailing columns and row order are preserved.
pub fn rotate_series(q: &Quat, series: ArrayView2<f64>) -> AlignResult<Array2<f64>> {
    if series.ncols() < ACCEL_COLUMNS {
        return Err(AlignError::TableShape(format!(
            "rotate_series needs at least {} columns, got {}",
            ACCEL_COLUMNS,
            series.ncols()
        )));
    }

    let mut out = series.to_owned();
    for mut row in out.rows_mut() {
        let rotated = rotate(q, &Vec3::new(row[1], row[2], row[3]));
        row[1] = rotated.x;
        row[2] = rotated.y;
        row[3] = rotated.z;
    }
    Ok(out)
}

/// Angle between two quaternions viewed as 4-vectors [degrees]
pub fn angle_between_deg(q1: &Quat, q2: &Quat) -> f64 {
    q1.dot(q2).clamp(-1.0, 1.0).acos().to_degrees()
}
