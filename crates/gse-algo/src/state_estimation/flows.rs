//! Measurement functions h(x) in polar form and their partial derivatives.
//!
//! For a branch terminal at node i with far node k, self admittance
//! Yₛ = Gₛ + jBₛ and transfer admittance Yₘ = Gₘ + jBₘ, the power flowing
//! from node i into the branch is S = Vᵢ·conj(Yₛ·Vᵢ + Yₘ·Vₖ):
//!
//! ```text
//! P = Vᵢ²·Gₛ + Vᵢ·Vₖ·( Gₘ·cos θᵢₖ + Bₘ·sin θᵢₖ)
//! Q = −Vᵢ²·Bₛ + Vᵢ·Vₖ·( Gₘ·sin θᵢₖ − Bₘ·cos θᵢₖ)
//! ```
//!
//! Node injections sum the closed terminals at the node; load powers follow
//! from the injection by the uniform-mismatch rule (see [`load_power`]).

use crate::state_estimation::state::{StateLayout, StateVector};
use gse_core::{BranchSide, NetworkModel};

/// P and Q with their sparse gradients over state columns.
///
/// Gradients may repeat a column; the triplet assembly sums duplicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PowerRow {
    pub p: f64,
    pub q: f64,
    pub dp: Vec<(usize, f64)>,
    pub dq: Vec<(usize, f64)>,
}

impl PowerRow {
    fn push(&mut self, col: Option<usize>, dp: f64, dq: f64) {
        let Some(col) = col else { return };
        if dp != 0.0 {
            self.dp.push((col, dp));
        }
        if dq != 0.0 {
            self.dq.push((col, dq));
        }
    }

    fn add(&mut self, other: PowerRow) {
        self.p += other.p;
        self.q += other.q;
        self.dp.extend(other.dp);
        self.dq.extend(other.dq);
    }
}

/// Power flowing from `side`'s node into a branch.
///
/// An open terminal carries nothing and has no gradient.
pub fn terminal_power(
    model: &NetworkModel,
    layout: Option<&StateLayout>,
    state: &StateVector,
    branch: usize,
    side: BranchSide,
) -> PowerRow {
    let data = &model.branches()[branch];
    let mut row = PowerRow::default();
    if !data.status(side) {
        return row;
    }
    let (i, k) = (data.node(side), data.far_node(side));
    let ys = data.admittance.self_admittance(side);
    let ym = data.admittance.mutual_admittance(side);
    let (gs, bs, gm, bm) = (ys.re, ys.im, ym.re, ym.im);
    let (vi, vk) = (state.u_pu[i], state.u_pu[k]);
    let (sin, cos) = (state.u_angle[i] - state.u_angle[k]).sin_cos();

    // In-phase and quadrature parts of the transfer term
    let a = gm * cos + bm * sin;
    let b = gm * sin - bm * cos;

    row.p = vi * vi * gs + vi * vk * a;
    row.q = -vi * vi * bs + vi * vk * b;

    if let Some(layout) = layout {
        let dp_dtheta = vi * vk * -b;
        let dq_dtheta = vi * vk * a;
        row.push(layout.angle_col(i), dp_dtheta, dq_dtheta);
        row.push(
            Some(layout.magnitude_col(i)),
            2.0 * vi * gs + vk * a,
            -2.0 * vi * bs + vk * b,
        );
        if data.is_connected() {
            row.push(layout.angle_col(k), -dp_dtheta, -dq_dtheta);
            row.push(Some(layout.magnitude_col(k)), vi * a, vi * b);
        }
    }
    row
}

/// Net power injected by `node` into the network: the sum over its closed
/// branch terminals.
pub fn node_injection(
    model: &NetworkModel,
    layout: Option<&StateLayout>,
    state: &StateVector,
    node: usize,
) -> PowerRow {
    let mut row = PowerRow::default();
    for &(branch, side) in model.terminals_at(node) {
        row.add(terminal_power(model, layout, state, branch, side));
    }
    row
}

/// Estimated consumption of a load.
///
/// The host node's consumption C = −S_inj is shared among its k active loads
/// so that each keeps its specified value plus an equal share of the
/// mismatch: `S = S_spec + (C − ΣS_spec)/k`. Inactive loads consume nothing;
/// loads at a reference node keep their specified value since the source
/// absorbs the mismatch there.
pub fn load_power(
    model: &NetworkModel,
    layout: Option<&StateLayout>,
    state: &StateVector,
    load: usize,
) -> PowerRow {
    let data = &model.loads()[load];
    if !data.status {
        return PowerRow::default();
    }
    if model.is_reference(data.node) {
        return PowerRow {
            p: data.p_specified,
            q: data.q_specified,
            ..PowerRow::default()
        };
    }

    let (mut count, mut p_sum, mut q_sum) = (0usize, 0.0, 0.0);
    for l in model.active_loads_at(data.node) {
        count += 1;
        p_sum += model.loads()[l].p_specified;
        q_sum += model.loads()[l].q_specified;
    }
    let share = 1.0 / count as f64;

    let injection = node_injection(model, layout, state, data.node);
    PowerRow {
        p: data.p_specified + (-injection.p - p_sum) * share,
        q: data.q_specified + (-injection.q - q_sum) * share,
        dp: injection.dp.into_iter().map(|(c, d)| (c, -d * share)).collect(),
        dq: injection.dq.into_iter().map(|(c, d)| (c, -d * share)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gse_core::*;

    fn model(from_status: bool, to_status: bool) -> NetworkModel {
        let node = |id| NodeInput {
            id: NodeId::new(id),
            u_rated: 10e3,
        };
        let input = NetworkInput {
            nodes: vec![node(1), node(2)],
            lines: vec![
                LineInput::new(LineId::new(3), NodeId::new(1), NodeId::new(2), 1.0, 2.0)
                    .with_shunt(5e-6, 0.01),
                LineInput::new(LineId::new(4), NodeId::new(1), NodeId::new(2), 2.0, 3.0)
                    .with_status(from_status, to_status),
            ],
            loads: vec![
                LoadInput::new(LoadId::new(5), NodeId::new(2), 1e6, 0.5e6),
                LoadInput::new(LoadId::new(6), NodeId::new(2), 3e6, 0.5e6),
            ],
            sources: vec![SourceInput::new(SourceId::new(7), NodeId::new(1), 1.0)],
        };
        NetworkModel::new(&input, 50.0).unwrap()
    }

    fn state() -> StateVector {
        StateVector {
            u_pu: vec![1.01, 0.97],
            u_angle: vec![0.0, -0.05],
        }
    }

    fn gradient(entries: &[(usize, f64)], n: usize) -> Vec<f64> {
        let mut g = vec![0.0; n];
        for &(c, d) in entries {
            g[c] += d;
        }
        g
    }

    // Central differences over the state columns
    fn check_gradient(
        model: &NetworkModel,
        f: impl Fn(Option<&StateLayout>, &StateVector) -> PowerRow,
    ) {
        let layout = StateLayout::new(model);
        let x = state();
        let row = f(Some(&layout), &x);
        let (dp, dq) = (gradient(&row.dp, layout.len()), gradient(&row.dq, layout.len()));
        let h = 1e-6;
        for col in 0..layout.len() {
            let mut step = vec![0.0; layout.len()];
            step[col] = h;
            let mut plus = x.clone();
            plus.apply_step(&layout, &step);
            step[col] = -h;
            let mut minus = x.clone();
            minus.apply_step(&layout, &step);
            let (fp, fm) = (f(None, &plus), f(None, &minus));
            let num_p = (fp.p - fm.p) / (2.0 * h);
            let num_q = (fp.q - fm.q) / (2.0 * h);
            assert!((num_p - dp[col]).abs() < 1e-4 * (1.0 + num_p.abs()), "dP col {col}");
            assert!((num_q - dq[col]).abs() < 1e-4 * (1.0 + num_q.abs()), "dQ col {col}");
        }
    }

    #[test]
    fn test_terminal_power_matches_phasor_product() {
        let model = model(true, true);
        let x = state();
        let y = model.branches()[0].admittance;
        let (vf, vt) = (x.phasor(0), x.phasor(1));
        let expected_from = vf * (y.yff * vf + y.yft * vt).conj();
        let expected_to = vt * (y.ytf * vf + y.ytt * vt).conj();

        let from = terminal_power(&model, None, &x, 0, BranchSide::From);
        let to = terminal_power(&model, None, &x, 0, BranchSide::To);
        assert!((from.p - expected_from.re).abs() < 1e-9);
        assert!((from.q - expected_from.im).abs() < 1e-9);
        assert!((to.p - expected_to.re).abs() < 1e-9);
        assert!((to.q - expected_to.im).abs() < 1e-9);
        // Series losses are positive
        assert!(from.p + to.p > 0.0);
    }

    #[test]
    fn test_terminal_gradients() {
        for (fs, ts) in [(true, true), (true, false), (false, true)] {
            let model = model(fs, ts);
            for side in [BranchSide::From, BranchSide::To] {
                check_gradient(&model, |layout, x| terminal_power(&model, layout, x, 1, side));
            }
        }
    }

    #[test]
    fn test_injection_and_load_gradients() {
        let model = model(true, false);
        check_gradient(&model, |layout, x| node_injection(&model, layout, x, 1));
        check_gradient(&model, |layout, x| load_power(&model, layout, x, 0));
    }

    #[test]
    fn test_load_shares_sum_to_consumption() {
        let model = model(true, true);
        let x = state();
        let injection = node_injection(&model, None, &x, 1);
        let a = load_power(&model, None, &x, 0);
        let b = load_power(&model, None, &x, 1);
        assert!((a.p + b.p + injection.p).abs() < 1e-12);
        assert!((a.q + b.q + injection.q).abs() < 1e-12);
        // Specified split is preserved: 1 MW vs 3 MW differ by 2 MW
        assert!((b.p - a.p - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_open_terminal_is_zero() {
        let model = model(true, false);
        let layout = StateLayout::new(&model);
        let row = terminal_power(&model, Some(&layout), &state(), 1, BranchSide::To);
        assert_eq!(row, PowerRow::default());
    }
}
