use crate::sparse::GainError;
use crate::state_estimation::state::{StateComponent, StateVector};
use gse_core::{NodeId, StructuralError};
use thiserror::Error;

/// Why the gain matrix could not be used
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SingularReason {
    #[error("{rows} measurement rows for {states} state variables")]
    Underdetermined { rows: usize, states: usize },

    #[error("no measurement depends on the {0}")]
    Unobserved(StateComponent),

    #[error(transparent)]
    IllConditioned(#[from] GainError),
}

fn at_node(node: &Option<NodeId>) -> String {
    match node {
        Some(id) => format!(" (node {})", id.value()),
        None => String::new(),
    }
}

/// Failures of the Newton-Raphson iteration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NumericalError {
    #[error("gain matrix is singular at iteration {iteration}: {reason}{}", at_node(.node))]
    Singular {
        iteration: usize,
        reason: SingularReason,
        node: Option<NodeId>,
    },

    #[error(
        "no convergence after {iterations} iterations \
         (max |Δx| {max_delta:.3e}, max |r| {max_residual:.3e} pu)"
    )]
    MaxIterationsExceeded {
        iterations: usize,
        max_delta: f64,
        max_residual: f64,
        last_state: Box<StateVector>,
    },
}

/// Any failure of [`crate::estimate`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimationError {
    #[error("invalid network or measurements: {0}")]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Numerical(#[from] NumericalError),

    #[error("invalid configuration: {field} = {value}")]
    InvalidConfig { field: &'static str, value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_node() {
        let err = NumericalError::Singular {
            iteration: 1,
            reason: SingularReason::Unobserved(StateComponent::Angle),
            node: Some(NodeId::new(6)),
        };
        assert_eq!(
            err.to_string(),
            "gain matrix is singular at iteration 1: no measurement depends on the voltage angle (node 6)"
        );

        let err: EstimationError = NumericalError::Singular {
            iteration: 0,
            reason: SingularReason::Underdetermined { rows: 2, states: 5 },
            node: None,
        }
        .into();
        assert!(err.to_string().ends_with("2 measurement rows for 5 state variables"));
    }

    #[test]
    fn test_structural_converts() {
        let err: EstimationError = StructuralError::EmptyNetwork.into();
        assert!(matches!(err, EstimationError::Structural(StructuralError::EmptyNetwork)));
    }
}
