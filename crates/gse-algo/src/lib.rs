//! # gse-algo: Weighted-Least-Squares State Estimation
//!
//! Given a [`gse_core::NetworkModel`] and a redundant, noisy
//! [`gse_core::MeasurementSet`], finds the node voltage phasors that best
//! explain the measurements in the weighted-least-squares sense, then derives
//! branch flows, load and source powers from them.
//!
//! ## Modules
//!
//! - [`state_estimation`] - configuration, measurement functions, the
//!   Newton-Raphson WLS solver and result assembly
//! - [`sparse`] - gain-matrix assembly (HᵀWH) and its factorization
//!
//! ## Quick Start
//!
//! ```ignore
//! use gse_algo::{estimate, EstimationConfig};
//!
//! let output = estimate(&network_input, &measurement_input, &EstimationConfig::default())?;
//! for node in &output.nodes {
//!     println!("node {}: {:.1} V", node.id.value(), node.u.value());
//! }
//! ```

pub mod sparse;
pub mod state_estimation;

pub use state_estimation::{
    estimate, estimate_batch, estimate_with_model, BranchResult, Estimate, EstimationConfig,
    EstimationError, EstimationOutput, IterationRecord, LoadResult, MeasuredQuantity,
    MeasurementResidual, NodeResult, NodeSeed, NumericalError, ResidualJacobianBuilder,
    ResultAssembler, SingularReason, SourceResult, StateComponent, StateLayout, StateVector,
    WlsSolver,
};
