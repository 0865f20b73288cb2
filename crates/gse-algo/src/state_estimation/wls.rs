//! # Newton-Raphson Weighted-Least-Squares Solver
//!
//! State estimation fits the node voltages x to a redundant set of noisy
//! measurements z = h(x) + e, with e ~ N(0, σ²). The maximum-likelihood
//! estimate minimizes the weighted sum of squared residuals
//!
//! ```text
//! J(x) = Σᵢ wᵢ·(zᵢ − hᵢ(x))²        wᵢ = 1/σᵢ²
//! ```
//!
//! ## Gauss-Newton Iteration
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Initializing                                                           │
//! │     x⁰ = flat start (V = 1, θ = 0; reference V = u_ref) or the seed     │
//! │     reject if rows < states                                             │
//! │                                                                         │
//! │  Iterating (k = 1, 2, ...)                                              │
//! │     r = z − h(xᵏ)           H = ∂h/∂x |xᵏ                               │
//! │     G = HᵀWH                b = HᵀWr                                    │
//! │     G·Δx = b                (sparse LU)                                 │
//! │     xᵏ⁺¹ = xᵏ + Δx, reference angles re-pinned to zero                  │
//! │                                                                         │
//! │  Converged      max|Δx| < ε                                             │
//! │  Diverged       k > max_iterations, or G singular                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Near the solution J decreases monotonically; with exact measurements the
//! minimum is J = 0 and convergence is quadratic.
//!
//! ## Observability
//!
//! G is nonsingular only if the measurements determine every state variable.
//! Three symptoms are reported as [`NumericalError::Singular`]: fewer scalar
//! measurements than state variables, a state column no measurement touches
//! (zero gain diagonal, reported with its node), and a factorization that
//! yields a non-finite or absurdly large step.
//!
//! ## References
//!
//! - **Schweppe & Wildes (1970)**: "Power System Static-State Estimation,
//!   Part I: Exact Model", IEEE Trans. PAS, 89(1), 120-125.
//!   DOI: [10.1109/TPAS.1970.292678](https://doi.org/10.1109/TPAS.1970.292678)
//!
//! - **Abur & Expósito (2004)**: "Power System State Estimation: Theory and
//!   Implementation", Marcel Dekker.

use crate::sparse::GainSystem;
use crate::state_estimation::config::EstimationConfig;
use crate::state_estimation::error::{EstimationError, NumericalError, SingularReason};
use crate::state_estimation::jacobian::ResidualJacobianBuilder;
use crate::state_estimation::state::StateVector;
use gse_core::{MeasurementSet, NetworkModel};
use serde::Serialize;
use tracing::{debug, info};

/// Progress of one Gauss-Newton iteration
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IterationRecord {
    pub iteration: usize,
    /// J(x) before the update
    pub objective: f64,
    /// max|Δx| of the update
    pub max_delta: f64,
}

/// A converged estimate
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub state: StateVector,
    pub iterations: usize,
    /// J at the converged state
    pub objective: f64,
    pub history: Vec<IterationRecord>,
}

/// WLS state estimator
#[derive(Debug, Clone, Default)]
pub struct WlsSolver {
    config: EstimationConfig,
}

impl WlsSolver {
    pub fn new(config: EstimationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EstimationConfig {
        &self.config
    }

    /// Starting state: the configured seed, else a flat start.
    pub fn initial_state(&self, model: &NetworkModel) -> Result<StateVector, EstimationError> {
        match &self.config.initial_state {
            Some(seeds) => Ok(StateVector::seeded(model, seeds)?),
            None => Ok(StateVector::flat(model)),
        }
    }

    /// Run the iteration to convergence.
    pub fn solve(
        &self,
        model: &NetworkModel,
        measurements: &MeasurementSet,
    ) -> Result<Estimate, EstimationError> {
        self.config.validate()?;
        let builder = ResidualJacobianBuilder::new(model, measurements);
        let layout = builder.layout();
        let mut state = self.initial_state(model)?;

        if builder.row_count() < layout.len() {
            return Err(NumericalError::Singular {
                iteration: 0,
                reason: SingularReason::Underdetermined {
                    rows: builder.row_count(),
                    states: layout.len(),
                },
                node: None,
            }
            .into());
        }
        debug!(
            rows = builder.row_count(),
            states = layout.len(),
            islands = model.islands().len(),
            "starting WLS state estimation"
        );

        let mut history = Vec::with_capacity(self.config.max_iterations);
        let mut max_delta = f64::INFINITY;
        for iteration in 1..=self.config.max_iterations {
            let lin = builder.linearize(&state);
            let objective = lin.objective(builder.weights());
            let gain = GainSystem::assemble(&lin.jacobian, builder.weights(), &lin.residuals);

            if let Some(col) = gain.first_unobserved() {
                let (node, component) = layout.owner(col);
                return Err(NumericalError::Singular {
                    iteration,
                    reason: SingularReason::Unobserved(component),
                    node: Some(model.nodes()[node].id),
                }
                .into());
            }
            let step = gain.solve().map_err(|err| NumericalError::Singular {
                iteration,
                reason: err.into(),
                node: None,
            })?;

            state.apply_step(layout, &step);
            state.pin_references(model);
            max_delta = step.iter().fold(0.0_f64, |m, d| m.max(d.abs()));
            history.push(IterationRecord {
                iteration,
                objective,
                max_delta,
            });
            debug!(iteration, objective, max_delta, "WLS iteration");

            if max_delta < self.config.convergence_tolerance {
                let objective = builder.objective(&state);
                info!(iterations = iteration, objective, "state estimation converged");
                return Ok(Estimate {
                    state,
                    iterations: iteration,
                    objective,
                    history,
                });
            }
        }

        let max_residual = builder.linearize(&state).max_abs_residual();
        Err(NumericalError::MaxIterationsExceeded {
            iterations: self.config.max_iterations,
            max_delta,
            max_residual,
            last_state: Box::new(state),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gse_core::*;

    // Two nodes joined by one line, fully metered at the receiving end
    fn case(p_measured: f64) -> (NetworkModel, MeasurementInput) {
        let node = |id| NodeInput {
            id: NodeId::new(id),
            u_rated: 10e3,
        };
        let network = NetworkInput {
            nodes: vec![node(1), node(2)],
            lines: vec![LineInput::new(
                LineId::new(3),
                NodeId::new(1),
                NodeId::new(2),
                0.5,
                1.0,
            )],
            loads: vec![LoadInput::new(LoadId::new(4), NodeId::new(2), 2e6, 0.5e6)],
            sources: vec![SourceInput::new(SourceId::new(5), NodeId::new(1), 1.0)],
        };
        let sensors = MeasurementInput {
            voltage_sensors: vec![
                VoltageSensorInput::new(SensorId::new(10), 1, 10.0, 10e3),
                VoltageSensorInput::new(SensorId::new(11), 2, 10.0, 9.9e3),
            ],
            power_sensors: vec![PowerSensorInput::new(
                SensorId::new(12),
                4,
                MeasuredTerminalType::Load,
                1e3,
                p_measured,
                0.5e6,
            )],
        };
        (NetworkModel::new(&network, 50.0).unwrap(), sensors)
    }

    #[test]
    fn test_converges_and_records_history() {
        let (model, sensors) = case(2e6);
        let set = MeasurementSet::new(&model, &sensors).unwrap();
        let estimate = WlsSolver::default().solve(&model, &set).unwrap();
        assert!(estimate.iterations < 10);
        assert_eq!(estimate.history.len(), estimate.iterations);
        let last = estimate.history.last().unwrap();
        assert!(last.max_delta < 1e-8);
        assert!(estimate.state.u_angle[1] < 0.0);
        assert_eq!(estimate.state.u_angle[0], 0.0);
    }

    #[test]
    fn test_underdetermined_rejected_before_iterating() {
        let (model, mut sensors) = case(2e6);
        sensors.power_sensors.clear();
        let set = MeasurementSet::new(&model, &sensors).unwrap();
        let err = WlsSolver::default().solve(&model, &set).unwrap_err();
        assert_eq!(
            err,
            EstimationError::Numerical(NumericalError::Singular {
                iteration: 0,
                reason: SingularReason::Underdetermined { rows: 2, states: 3 },
                node: None,
            })
        );
    }

    #[test]
    fn test_iteration_cap() {
        let (model, sensors) = case(2e6);
        let set = MeasurementSet::new(&model, &sensors).unwrap();
        let solver = WlsSolver::new(EstimationConfig::default().with_max_iterations(1));
        match solver.solve(&model, &set).unwrap_err() {
            EstimationError::Numerical(NumericalError::MaxIterationsExceeded {
                iterations,
                max_delta,
                last_state,
                ..
            }) => {
                assert_eq!(iterations, 1);
                assert!(max_delta > 1e-8);
                assert_eq!(last_state.node_count(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let (model, sensors) = case(2e6);
        let set = MeasurementSet::new(&model, &sensors).unwrap();
        let solver = WlsSolver::new(EstimationConfig::default().with_tolerance(-1.0));
        assert!(matches!(
            solver.solve(&model, &set),
            Err(EstimationError::InvalidConfig { .. })
        ));
    }
}
