//! State vector and its column layout.
//!
//! Every node owns a magnitude column; every node except an island's
//! reference node also owns an angle column. Columns are laid out node by
//! node in arena order, angle before magnitude:
//!
//! ```text
//! node:     0 (ref)   1          2
//! columns:  [V0]      [θ1, V1]   [θ2, V2]
//! ```

use crate::state_estimation::config::NodeSeed;
use gse_core::{NetworkModel, StructuralError};
use num_complex::Complex64;
use serde::Serialize;
use std::fmt;

/// Kind of a state column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateComponent {
    Angle,
    Magnitude,
}

impl fmt::Display for StateComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateComponent::Angle => write!(f, "voltage angle"),
            StateComponent::Magnitude => write!(f, "voltage magnitude"),
        }
    }
}

/// Mapping between node state variables and Jacobian columns
#[derive(Debug, Clone, PartialEq)]
pub struct StateLayout {
    angle_col: Vec<Option<usize>>,
    magnitude_col: Vec<usize>,
    owners: Vec<(usize, StateComponent)>,
}

impl StateLayout {
    pub fn new(model: &NetworkModel) -> Self {
        let n = model.node_count();
        let mut angle_col = Vec::with_capacity(n);
        let mut magnitude_col = Vec::with_capacity(n);
        let mut owners = Vec::with_capacity(2 * n);
        for node in 0..n {
            if model.is_reference(node) {
                angle_col.push(None);
            } else {
                angle_col.push(Some(owners.len()));
                owners.push((node, StateComponent::Angle));
            }
            magnitude_col.push(owners.len());
            owners.push((node, StateComponent::Magnitude));
        }
        Self {
            angle_col,
            magnitude_col,
            owners,
        }
    }

    /// Number of state variables.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Angle column of a node; `None` for reference nodes.
    #[inline]
    pub fn angle_col(&self, node: usize) -> Option<usize> {
        self.angle_col[node]
    }

    #[inline]
    pub fn magnitude_col(&self, node: usize) -> usize {
        self.magnitude_col[node]
    }

    /// Node and component behind a column.
    pub fn owner(&self, col: usize) -> (usize, StateComponent) {
        self.owners[col]
    }
}

/// Per-unit voltage phasors of all nodes, indexed by arena position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateVector {
    pub u_pu: Vec<f64>,
    /// rad
    pub u_angle: Vec<f64>,
}

impl StateVector {
    /// Flat start: 1 pu and 0 rad everywhere, reference nodes at their
    /// source's `u_ref`.
    pub fn flat(model: &NetworkModel) -> Self {
        let u_pu = (0..model.node_count())
            .map(|node| match model.source_at(node) {
                Some(source) => model.sources()[source].u_ref,
                None => 1.0,
            })
            .collect();
        Self {
            u_pu,
            u_angle: vec![0.0; model.node_count()],
        }
    }

    /// Flat start overridden by `seeds`, re-referenced so every island's
    /// reference angle is zero.
    pub fn seeded(model: &NetworkModel, seeds: &[NodeSeed]) -> Result<Self, StructuralError> {
        let mut state = Self::flat(model);
        for seed in seeds {
            let node = model
                .node_index(seed.id)
                .ok_or(StructuralError::UnknownSeedNode {
                    node: seed.id.value(),
                })?;
            state.u_pu[node] = seed.u_pu;
            state.u_angle[node] = seed.u_angle;
        }
        state.pin_references(model);
        Ok(state)
    }

    pub fn node_count(&self) -> usize {
        self.u_pu.len()
    }

    #[inline]
    pub fn phasor(&self, node: usize) -> Complex64 {
        Complex64::from_polar(self.u_pu[node], self.u_angle[node])
    }

    /// x ← x + Δx
    pub fn apply_step(&mut self, layout: &StateLayout, step: &[f64]) {
        for (col, &delta) in step.iter().enumerate() {
            match layout.owner(col) {
                (node, StateComponent::Angle) => self.u_angle[node] += delta,
                (node, StateComponent::Magnitude) => self.u_pu[node] += delta,
            }
        }
    }

    /// Shift each island's angles so its reference node sits at zero.
    pub fn pin_references(&mut self, model: &NetworkModel) {
        for island in model.islands() {
            let offset = self.u_angle[island.reference];
            if offset == 0.0 {
                continue;
            }
            for &node in &island.nodes {
                self.u_angle[node] -= offset;
            }
        }
    }
}
