//! Physical quantities derived from an estimated state.
//!
//! Everything here is read-only over the model and the state. Powers are
//! reported in W / var / VA, voltages in V, currents in A; the residual report
//! keeps the measured quantity's own unit (V for voltages, W or var for
//! powers).

use crate::state_estimation::flows::{load_power, node_injection, terminal_power};
use crate::state_estimation::jacobian::ResidualJacobianBuilder;
use crate::state_estimation::state::{StateLayout, StateVector};
use crate::state_estimation::wls::{Estimate, IterationRecord};
use gse_core::units::{current_base, BASE_POWER_VA};
use gse_core::{
    Amperes, BranchSide, Diagnostics, LineId, LoadId, Measurement, MeasurementSet, NetworkModel,
    NodeId, PerUnit, Radians, SensorId, SourceId, VoltAmperes, Vars, Volts, Watts,
};
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeResult {
    pub id: NodeId,
    pub u: Volts,
    pub u_pu: PerUnit,
    pub u_angle: Radians,
    /// Net injection into the network
    pub p: Watts,
    pub q: Vars,
}

/// Terminal quantities of a line; powers flow from the terminal's node into
/// the line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchResult {
    pub id: LineId,
    pub p_from: Watts,
    pub q_from: Vars,
    pub i_from: Amperes,
    pub s_from: VoltAmperes,
    pub p_to: Watts,
    pub q_to: Vars,
    pub i_to: Amperes,
    pub s_to: VoltAmperes,
    /// max(i_from, i_to) / i_n; zero for unrated lines
    pub loading: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadResult {
    pub id: LoadId,
    pub p: Watts,
    pub q: Vars,
    pub i: Amperes,
    pub s: VoltAmperes,
    pub pf: f64,
}

/// Power delivered by a source into its node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceResult {
    pub id: SourceId,
    pub p: Watts,
    pub q: Vars,
    pub i: Amperes,
    pub s: VoltAmperes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasuredQuantity {
    VoltageMagnitude,
    ActivePower,
    ReactivePower,
}

/// One scalar observation against its estimate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementResidual {
    pub sensor: SensorId,
    pub quantity: MeasuredQuantity,
    pub measured: f64,
    pub estimated: f64,
    pub residual: f64,
    /// r·√w; roughly standard normal for a consistent measurement
    pub normalized_residual: f64,
}

/// Everything an estimation run reports
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimationOutput {
    pub nodes: Vec<NodeResult>,
    pub branches: Vec<BranchResult>,
    pub loads: Vec<LoadResult>,
    pub sources: Vec<SourceResult>,
    pub residuals: Vec<MeasurementResidual>,
    pub iterations: usize,
    /// χ² statistic J at the estimate
    pub objective: f64,
    /// Scalar measurements minus state variables
    pub degrees_of_freedom: usize,
    pub history: Vec<IterationRecord>,
    pub diagnostics: Diagnostics,
}

/// Maps a state back onto the network's components
#[derive(Debug, Clone, Copy)]
pub struct ResultAssembler<'a> {
    model: &'a NetworkModel,
}

fn current(s_pu: f64, u_pu: f64, u_rated: f64) -> Amperes {
    if u_pu <= 0.0 {
        Amperes(0.0)
    } else {
        Amperes(s_pu / u_pu * current_base(u_rated))
    }
}

impl<'a> ResultAssembler<'a> {
    pub fn new(model: &'a NetworkModel) -> Self {
        Self { model }
    }

    pub fn nodes(&self, state: &StateVector) -> Vec<NodeResult> {
        self.model
            .nodes()
            .iter()
            .enumerate()
            .map(|(idx, node)| {
                let injection = node_injection(self.model, None, state, idx);
                let u_pu = PerUnit(state.u_pu[idx]);
                NodeResult {
                    id: node.id,
                    u: u_pu.to_volts(node.u_rated),
                    u_pu,
                    u_angle: Radians(state.u_angle[idx]),
                    p: Watts(injection.p * BASE_POWER_VA),
                    q: Vars(injection.q * BASE_POWER_VA),
                }
            })
            .collect()
    }

    /// Lines with at least one closed end.
    pub fn branches(&self, state: &StateVector) -> Vec<BranchResult> {
        let mut results = Vec::new();
        for (idx, branch) in self.model.branches().iter().enumerate() {
            if !branch.is_active() {
                continue;
            }
            let u_rated = self.model.nodes()[branch.from].u_rated;
            let from = terminal_power(self.model, None, state, idx, BranchSide::From);
            let to = terminal_power(self.model, None, state, idx, BranchSide::To);
            let s_from = from.p.hypot(from.q);
            let s_to = to.p.hypot(to.q);
            let i_from = current(s_from, state.u_pu[branch.from], u_rated);
            let i_to = current(s_to, state.u_pu[branch.to], u_rated);

            let loading = if branch.i_n.is_finite() && branch.i_n > 0.0 {
                i_from.value().max(i_to.value()) / branch.i_n
            } else {
                0.0
            };
            if loading > 1.0 {
                warn!(
                    line = branch.id.value(),
                    loading_pct = loading * 100.0,
                    "line loaded above its rating"
                );
            }

            results.push(BranchResult {
                id: branch.id,
                p_from: Watts(from.p * BASE_POWER_VA),
                q_from: Vars(from.q * BASE_POWER_VA),
                i_from,
                s_from: VoltAmperes(s_from * BASE_POWER_VA),
                p_to: Watts(to.p * BASE_POWER_VA),
                q_to: Vars(to.q * BASE_POWER_VA),
                i_to,
                s_to: VoltAmperes(s_to * BASE_POWER_VA),
                loading,
            });
        }
        results
    }

    pub fn loads(&self, state: &StateVector) -> Vec<LoadResult> {
        self.model
            .loads()
            .iter()
            .enumerate()
            .map(|(idx, load)| {
                let power = load_power(self.model, None, state, idx);
                let p = Watts(power.p * BASE_POWER_VA);
                let q = Vars(power.q * BASE_POWER_VA);
                let s = p.apparent_power(q);
                let u_rated = self.model.nodes()[load.node].u_rated;
                LoadResult {
                    id: load.id,
                    p,
                    q,
                    i: current(power.p.hypot(power.q), state.u_pu[load.node], u_rated),
                    s,
                    pf: p.power_factor(s),
                }
            })
            .collect()
    }

    /// Source output = network injection at its node plus the node's loads.
    /// Inactive sources report zero.
    pub fn sources(&self, state: &StateVector) -> Vec<SourceResult> {
        self.model
            .sources()
            .iter()
            .enumerate()
            .map(|(idx, source)| {
                let (mut p, mut q) = (0.0, 0.0);
                if self.model.source_at(source.node) == Some(idx) {
                    let injection = node_injection(self.model, None, state, source.node);
                    p = injection.p;
                    q = injection.q;
                    for load in self.model.active_loads_at(source.node) {
                        p += self.model.loads()[load].p_specified;
                        q += self.model.loads()[load].q_specified;
                    }
                }
                let u_rated = self.model.nodes()[source.node].u_rated;
                SourceResult {
                    id: source.id,
                    p: Watts(p * BASE_POWER_VA),
                    q: Vars(q * BASE_POWER_VA),
                    i: current(p.hypot(q), state.u_pu[source.node], u_rated),
                    s: VoltAmperes(p.hypot(q) * BASE_POWER_VA),
                }
            })
            .collect()
    }

    /// Per-row comparison of the measurements with h(x).
    pub fn residuals(
        &self,
        measurements: &MeasurementSet,
        state: &StateVector,
    ) -> Vec<MeasurementResidual> {
        let builder = ResidualJacobianBuilder::new(self.model, measurements);
        let estimates = builder.evaluate(state);
        let observed = builder.observed();
        let weights = builder.weights();

        let mut rows = Vec::with_capacity(estimates.len());
        let mut row = 0;
        for measurement in measurements.iter() {
            let quantities = match measurement {
                Measurement::Voltage { node, .. } => vec![(
                    MeasuredQuantity::VoltageMagnitude,
                    self.model.nodes()[*node].u_rated,
                )],
                Measurement::Power { .. } => vec![
                    (MeasuredQuantity::ActivePower, BASE_POWER_VA),
                    (MeasuredQuantity::ReactivePower, BASE_POWER_VA),
                ],
            };
            for (quantity, base) in quantities {
                let residual = observed[row] - estimates[row];
                rows.push(MeasurementResidual {
                    sensor: measurement.sensor(),
                    quantity,
                    measured: observed[row] * base,
                    estimated: estimates[row] * base,
                    residual: residual * base,
                    normalized_residual: residual * weights[row].sqrt(),
                });
                row += 1;
            }
        }
        rows
    }

    /// Full report for a converged estimate.
    pub fn assemble(
        &self,
        measurements: &MeasurementSet,
        estimate: &Estimate,
    ) -> EstimationOutput {
        let state = &estimate.state;
        let mut diagnostics = self.model.diagnostics().clone();
        diagnostics.merge(measurements.diagnostics().clone());
        for issue in &diagnostics.issues {
            warn!("{issue}");
        }

        EstimationOutput {
            nodes: self.nodes(state),
            branches: self.branches(state),
            loads: self.loads(state),
            sources: self.sources(state),
            residuals: self.residuals(measurements, state),
            iterations: estimate.iterations,
            objective: estimate.objective,
            degrees_of_freedom: measurements
                .row_count()
                .saturating_sub(StateLayout::new(self.model).len()),
            history: estimate.history.clone(),
            diagnostics,
        }
    }
}
