//! # Power System State Estimation
//!
//! Pipeline for one snapshot:
//!
//! ```text
//! NetworkInput ──► NetworkModel ─┐
//!                                ├─► ResidualJacobianBuilder ─► WlsSolver ─► ResultAssembler
//! MeasurementInput ► MeasurementSet ┘
//! ```
//!
//! - [`config`]: [`EstimationConfig`] and warm-start seeds
//! - [`state`]: state vector and Jacobian column layout
//! - [`flows`]: measurement functions and their derivatives
//! - [`jacobian`]: h(x), residuals and sparse H for a measurement set
//! - [`wls`]: the Newton-Raphson WLS iteration
//! - [`results`]: node, line, load, source and residual reports
//! - [`batch`]: one-call and multi-snapshot entry points
//!
//! Every measurement is an independent weighted observation; a node
//! injection and the load measurements at the same node are both fitted, with
//! no precedence between them.

pub mod batch;
pub mod config;
pub mod error;
pub mod flows;
pub mod jacobian;
pub mod results;
pub mod state;
pub mod wls;

pub use batch::{estimate, estimate_batch, estimate_with_model};
pub use config::{EstimationConfig, NodeSeed};
pub use error::{EstimationError, NumericalError, SingularReason};
pub use jacobian::{Linearization, ResidualJacobianBuilder};
pub use results::{
    BranchResult, EstimationOutput, LoadResult, MeasuredQuantity, MeasurementResidual,
    NodeResult, ResultAssembler, SourceResult,
};
pub use state::{StateComponent, StateLayout, StateVector};
pub use wls::{Estimate, IterationRecord, WlsSolver};
