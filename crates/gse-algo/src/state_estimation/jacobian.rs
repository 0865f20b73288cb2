use crate::state_estimation::flows::{load_power, node_injection, terminal_power, PowerRow};
use crate::state_estimation::state::{StateLayout, StateVector};
use gse_core::{BranchSide, Measurement, MeasurementSet, NetworkModel, PowerTerminal};
use sprs::{CsMat, TriMat};

/// Measurement model linearized at one state
#[derive(Debug, Clone)]
pub struct Linearization {
    /// h(x), one entry per scalar observation
    pub estimates: Vec<f64>,
    /// r = z − h(x)
    pub residuals: Vec<f64>,
    /// H = ∂h/∂x (CSR)
    pub jacobian: CsMat<f64>,
}

impl Linearization {
    /// J(x) = Σ wᵢ rᵢ²
    pub fn objective(&self, weights: &[f64]) -> f64 {
        self.residuals
            .iter()
            .zip(weights)
            .map(|(r, w)| w * r * r)
            .sum()
    }

    pub fn max_abs_residual(&self) -> f64 {
        self.residuals.iter().fold(0.0_f64, |m, r| m.max(r.abs()))
    }
}

/// Evaluates h(x), the residuals and the sparse Jacobian of a measurement set.
///
/// Row order follows the measurement set: one row per voltage measurement,
/// two (P then Q) per power measurement.
#[derive(Debug, Clone)]
pub struct ResidualJacobianBuilder<'a> {
    model: &'a NetworkModel,
    measurements: &'a MeasurementSet,
    layout: StateLayout,
    observed: Vec<f64>,
    weights: Vec<f64>,
}

impl<'a> ResidualJacobianBuilder<'a> {
    pub fn new(model: &'a NetworkModel, measurements: &'a MeasurementSet) -> Self {
        let mut observed = Vec::with_capacity(measurements.row_count());
        let mut weights = Vec::with_capacity(measurements.row_count());
        for measurement in measurements.iter() {
            match measurement {
                Measurement::Voltage { magnitude, .. } => {
                    observed.push(magnitude.value);
                    weights.push(magnitude.weight);
                }
                Measurement::Power { p, q, .. } => {
                    observed.extend([p.value, q.value]);
                    weights.extend([p.weight, q.weight]);
                }
            }
        }
        Self {
            model,
            measurements,
            layout: StateLayout::new(model),
            observed,
            weights,
        }
    }

    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }

    pub fn row_count(&self) -> usize {
        self.observed.len()
    }

    /// z
    pub fn observed(&self) -> &[f64] {
        &self.observed
    }

    /// Diagonal of W
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    fn power_row(
        &self,
        layout: Option<&StateLayout>,
        state: &StateVector,
        terminal: PowerTerminal,
    ) -> PowerRow {
        match terminal {
            PowerTerminal::BranchFrom(b) => {
                terminal_power(self.model, layout, state, b, BranchSide::From)
            }
            PowerTerminal::BranchTo(b) => {
                terminal_power(self.model, layout, state, b, BranchSide::To)
            }
            PowerTerminal::Load(l) => load_power(self.model, layout, state, l),
            PowerTerminal::Node(n) => node_injection(self.model, layout, state, n),
        }
    }

    /// h(x) only.
    pub fn evaluate(&self, state: &StateVector) -> Vec<f64> {
        let mut estimates = Vec::with_capacity(self.row_count());
        for measurement in self.measurements.iter() {
            match *measurement {
                Measurement::Voltage { node, .. } => estimates.push(state.u_pu[node]),
                Measurement::Power { terminal, .. } => {
                    let row = self.power_row(None, state, terminal);
                    estimates.extend([row.p, row.q]);
                }
            }
        }
        estimates
    }

    /// J(x) without building the Jacobian.
    pub fn objective(&self, state: &StateVector) -> f64 {
        self.evaluate(state)
            .iter()
            .zip(&self.observed)
            .zip(&self.weights)
            .map(|((h, z), w)| w * (z - h) * (z - h))
            .sum()
    }

    /// h(x), r and H at `state`.
    pub fn linearize(&self, state: &StateVector) -> Linearization {
        let rows = self.row_count();
        let mut estimates = Vec::with_capacity(rows);
        let mut triplets = TriMat::new((rows, self.layout.len()));

        for measurement in self.measurements.iter() {
            let row = estimates.len();
            match *measurement {
                Measurement::Voltage { node, .. } => {
                    estimates.push(state.u_pu[node]);
                    triplets.add_triplet(row, self.layout.magnitude_col(node), 1.0);
                }
                Measurement::Power { terminal, .. } => {
                    let power = self.power_row(Some(&self.layout), state, terminal);
                    estimates.extend([power.p, power.q]);
                    for (col, d) in power.dp {
                        triplets.add_triplet(row, col, d);
                    }
                    for (col, d) in power.dq {
                        triplets.add_triplet(row + 1, col, d);
                    }
                }
            }
        }

        let residuals = self
            .observed
            .iter()
            .zip(&estimates)
            .map(|(z, h)| z - h)
            .collect();
        Linearization {
            estimates,
            residuals,
            jacobian: triplets.to_csr(),
        }
    }
}
