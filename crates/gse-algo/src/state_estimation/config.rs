use crate::state_estimation::error::EstimationError;
use gse_core::NodeId;
use serde::{Deserialize, Serialize};

/// Starting voltage of one node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeSeed {
    pub id: NodeId,
    /// Magnitude (per-unit)
    pub u_pu: f64,
    /// Angle (rad)
    #[serde(default)]
    pub u_angle: f64,
}

impl NodeSeed {
    pub fn new(id: NodeId, u_pu: f64, u_angle: f64) -> Self {
        Self { id, u_pu, u_angle }
    }
}

/// Estimator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EstimationConfig {
    /// Hz; converts line capacitance to susceptance
    pub system_frequency: f64,
    pub max_iterations: usize,
    /// Converged when max|Δx| drops below this
    pub convergence_tolerance: f64,
    /// Warm start; nodes not listed start flat
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_state: Option<Vec<NodeSeed>>,
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            system_frequency: 50.0,
            max_iterations: 20,
            convergence_tolerance: 1e-8,
            initial_state: None,
        }
    }
}

impl EstimationConfig {
    pub fn with_system_frequency(mut self, hz: f64) -> Self {
        self.system_frequency = hz;
        self
    }

    pub fn with_max_iterations(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.convergence_tolerance = tol;
        self
    }

    pub fn with_initial_state(mut self, seeds: Vec<NodeSeed>) -> Self {
        self.initial_state = Some(seeds);
        self
    }

    /// Reject settings the solver cannot run with.
    pub fn validate(&self) -> Result<(), EstimationError> {
        if !(self.system_frequency.is_finite() && self.system_frequency > 0.0) {
            return Err(EstimationError::InvalidConfig {
                field: "system_frequency",
                value: self.system_frequency,
            });
        }
        if !(self.convergence_tolerance.is_finite() && self.convergence_tolerance > 0.0) {
            return Err(EstimationError::InvalidConfig {
                field: "convergence_tolerance",
                value: self.convergence_tolerance,
            });
        }
        for seed in self.initial_state.iter().flatten() {
            if !(seed.u_pu.is_finite() && seed.u_pu > 0.0) {
                return Err(EstimationError::InvalidConfig {
                    field: "initial_state.u_pu",
                    value: seed.u_pu,
                });
            }
            if !seed.u_angle.is_finite() {
                return Err(EstimationError::InvalidConfig {
                    field: "initial_state.u_angle",
                    value: seed.u_angle,
                });
            }
        }
        Ok(())
    }
}
