//! # Sparse Normal Equations
//!
//! The measurement Jacobian H has two to six nonzeros per row regardless of
//! network size, so it is assembled in triplet form and kept in CSR. The gain
//! matrix G = HᵀWH inherits that sparsity (one block per node pair that share
//! a measurement).
//!
//! ## Module Organization
//!
//! - [`gain`]: gain-matrix assembly, observability check and solve

pub mod gain;

pub use gain::{GainError, GainSystem, MAX_STEP};
