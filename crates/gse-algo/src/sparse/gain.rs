//! Gain matrix G = HᵀWH and right-hand side HᵀWr of the WLS normal equations.
//!
//! With W diagonal, G is formed as (√W·H)ᵀ(√W·H) by a sparse product, which
//! keeps G symmetric to the last bit. The solve applies symmetric diagonal
//! (Jacobi) scaling to tame the spread of weights, hands the scaled matrix to
//! faer in compressed-column form and factorizes it with sparse LU, so memory
//! and work grow with the nonzeros of G rather than with n².

use faer::prelude::SpSolver;
use faer::sparse::solvers::{Lu, SymbolicLu};
use faer::sparse::SparseColMat;
use faer::Mat;
use sprs::{CsMat, TriMat};
use thiserror::Error;

/// Largest Newton step component (per-unit or radian) accepted as sane.
pub const MAX_STEP: f64 = 1e4;

/// Failures of the linear solve
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GainError {
    #[error("gain matrix factorization produced a non-finite step")]
    NonFinite,

    #[error("Newton step of {magnitude:.3e} exceeds {MAX_STEP:e}")]
    StepTooLarge { magnitude: f64 },

    #[error("sparse factorization of the gain matrix failed: {0}")]
    Factorization(String),
}

/// Normal equations of one Gauss-Newton iteration
#[derive(Debug, Clone)]
pub struct GainSystem {
    matrix: CsMat<f64>,
    rhs: Vec<f64>,
}

impl GainSystem {
    /// Assemble G and HᵀWr from the Jacobian (CSR, one row per observation),
    /// the observation weights and the residuals.
    pub fn assemble(jacobian: &CsMat<f64>, weights: &[f64], residuals: &[f64]) -> Self {
        let (rows, cols) = jacobian.shape();
        debug_assert_eq!(rows, weights.len());
        debug_assert_eq!(rows, residuals.len());

        let mut scaled = TriMat::with_capacity((rows, cols), jacobian.nnz());
        let mut rhs = vec![0.0; cols];
        for (row, entries) in jacobian.outer_iterator().enumerate() {
            let w = weights[row];
            let sqrt_w = w.sqrt();
            for (col, &h) in entries.iter() {
                scaled.add_triplet(row, col, h * sqrt_w);
                rhs[col] += h * w * residuals[row];
            }
        }
        let hw: CsMat<f64> = scaled.to_csr();
        let hw_t: CsMat<f64> = hw.transpose_view().to_csr();
        let matrix = &hw_t * &hw;

        Self { matrix, rhs }
    }

    pub fn dim(&self) -> usize {
        self.rhs.len()
    }

    pub fn matrix(&self) -> &CsMat<f64> {
        &self.matrix
    }

    pub fn rhs(&self) -> &[f64] {
        &self.rhs
    }

    pub fn diagonal(&self, i: usize) -> f64 {
        self.matrix.get(i, i).copied().unwrap_or(0.0)
    }

    /// First state column no measurement depends on (zero diagonal).
    pub fn first_unobserved(&self) -> Option<usize> {
        (0..self.dim()).find(|&i| self.diagonal(i) <= 0.0 || !self.diagonal(i).is_finite())
    }

    /// Solve GΔx = HᵀWr.
    ///
    /// Callers check [`Self::first_unobserved`] first; the diagonal scaling
    /// divides by it.
    pub fn solve(&self) -> Result<Vec<f64>, GainError> {
        let n = self.dim();
        if n == 0 {
            return Ok(vec![]);
        }

        let scale: Vec<f64> = (0..n).map(|i| self.diagonal(i).sqrt().recip()).collect();

        let triplets: Vec<(usize, usize, f64)> = self
            .matrix
            .iter()
            .map(|(&value, (row, col))| (row, col, value * scale[row] * scale[col]))
            .collect();
        let scaled = SparseColMat::<usize, f64>::try_new_from_triplets(n, n, &triplets)
            .map_err(|err| GainError::Factorization(format!("{err:?}")))?;

        let symbolic = SymbolicLu::try_new(scaled.as_ref().symbolic())
            .map_err(|err| GainError::Factorization(format!("{err:?}")))?;
        let lu = Lu::try_new_with_symbolic(symbolic, scaled.as_ref())
            .map_err(|err| GainError::Factorization(format!("{err:?}")))?;

        let mut rhs = Mat::<f64>::zeros(n, 1);
        for (i, &b) in self.rhs.iter().enumerate() {
            rhs.write(i, 0, b * scale[i]);
        }
        let solution = lu.solve(rhs.as_ref());
        let step: Vec<f64> = (0..n).map(|i| solution.read(i, 0) * scale[i]).collect();

        if step.iter().any(|v| !v.is_finite()) {
            return Err(GainError::NonFinite);
        }
        let magnitude = step.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        if magnitude > MAX_STEP {
            return Err(GainError::StepTooLarge { magnitude });
        }
        Ok(step)
    }
}
