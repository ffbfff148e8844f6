//! Linear algebra type aliases for the alignment core
//!
//! Quaternions travel as 4-vectors in scalar-first order `(w, x, y, z)`;
//! product matrices and the correlation accumulator are 4×4.

use nalgebra::{SMatrix, SVector};

// ===== Dimensions =====
pub const QUAT_DIM: usize = 4;
pub const VEC_DIM: usize = 3;

pub type Vec3 = SVector<f64, VEC_DIM>;
pub type Vec4 = SVector<f64, QUAT_DIM>;
pub type Mat4 = SMatrix<f64, QUAT_DIM, QUAT_DIM>;
