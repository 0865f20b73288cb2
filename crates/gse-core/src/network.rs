//! Arena-backed network model with per-unit branch admittances.
//!
//! [`NetworkModel::new`] validates the four topology tables and freezes them
//! into dense arenas. Everything downstream addresses components by arena
//! position (`usize`), never by id; ids only appear again in results and
//! error messages.
//!
//! ## Per-unit line model
//!
//! ```text
//!            from ──┬──[ r1 + j·x1 ]──┬── to
//!                   │                 │
//!                 y_sh/2            y_sh/2       y_sh = 2πf·c1·(tan1 + j)
//!                   │                 │
//!                  ───               ───
//! ```
//!
//! Impedances are divided by `Z_base = u_rated² / 1 MVA` of the from-node
//! (lines only join nodes of equal rating). The resulting two-port is kept as
//! the 2×2 block
//!
//! ```text
//! [ I_f ]   [ Y_ff  Y_ft ] [ V_f ]
//! [ I_t ] = [ Y_tf  Y_tt ] [ V_t ]
//! ```
//!
//! A line open at one end degenerates to a shunt at the connected end: that
//! end's half shunt in parallel with the series impedance feeding the far
//! end's half shunt.

use crate::diagnostics::{Diagnostics, TOPOLOGY};
use crate::error::{ComponentKind, StructuralError};
use crate::graph_utils::find_islands;
use crate::units::{impedance_base, BASE_POWER_VA};
use crate::{LineId, LoadId, LoadType, NetworkInput, NodeId, SourceId};
use num_complex::Complex64;
use std::collections::HashMap;
use std::f64::consts::PI;

/// Which end of a branch a terminal is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchSide {
    From,
    To,
}

/// 2×2 complex admittance block of a branch (per-unit)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchAdmittance {
    pub yff: Complex64,
    pub yft: Complex64,
    pub ytf: Complex64,
    pub ytt: Complex64,
}

impl BranchAdmittance {
    /// Build the block of a π-model line with total shunt `y_shunt`.
    pub fn from_line(
        y_series: Complex64,
        y_shunt: Complex64,
        from_status: bool,
        to_status: bool,
    ) -> Self {
        let half = y_shunt / 2.0;
        let zero = Complex64::new(0.0, 0.0);
        match (from_status, to_status) {
            (true, true) => Self {
                yff: y_series + half,
                yft: -y_series,
                ytf: -y_series,
                ytt: y_series + half,
            },
            (true, false) => Self {
                yff: half + open_end(y_series, half),
                yft: zero,
                ytf: zero,
                ytt: zero,
            },
            (false, true) => Self {
                yff: zero,
                yft: zero,
                ytf: zero,
                ytt: half + open_end(y_series, half),
            },
            (false, false) => Self {
                yff: zero,
                yft: zero,
                ytf: zero,
                ytt: zero,
            },
        }
    }

    /// Self admittance seen from `side`.
    #[inline]
    pub fn self_admittance(&self, side: BranchSide) -> Complex64 {
        match side {
            BranchSide::From => self.yff,
            BranchSide::To => self.ytt,
        }
    }

    /// Transfer admittance from the far end into `side`.
    #[inline]
    pub fn mutual_admittance(&self, side: BranchSide) -> Complex64 {
        match side {
            BranchSide::From => self.yft,
            BranchSide::To => self.ytf,
        }
    }
}

// Series impedance in series with the floating end's half shunt.
fn open_end(y_series: Complex64, half: Complex64) -> Complex64 {
    let sum = y_series + half;
    if sum.norm() < f64::MIN_POSITIVE {
        Complex64::new(0.0, 0.0)
    } else {
        y_series * half / sum
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub id: NodeId,
    /// Voltage base (V)
    pub u_rated: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BranchData {
    pub id: LineId,
    /// Arena position of the from-node
    pub from: usize,
    /// Arena position of the to-node
    pub to: usize,
    pub from_status: bool,
    pub to_status: bool,
    /// Thermal rating (A)
    pub i_n: f64,
    pub admittance: BranchAdmittance,
}

impl BranchData {
    /// Both ends closed: the branch joins two nodes of one island.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.from_status && self.to_status
    }

    /// At least one end closed.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.from_status || self.to_status
    }

    #[inline]
    pub fn node(&self, side: BranchSide) -> usize {
        match side {
            BranchSide::From => self.from,
            BranchSide::To => self.to,
        }
    }

    #[inline]
    pub fn far_node(&self, side: BranchSide) -> usize {
        match side {
            BranchSide::From => self.to,
            BranchSide::To => self.from,
        }
    }

    #[inline]
    pub fn status(&self, side: BranchSide) -> bool {
        match side {
            BranchSide::From => self.from_status,
            BranchSide::To => self.to_status,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadData {
    pub id: LoadId,
    pub node: usize,
    pub status: bool,
    /// Specified active power (per-unit)
    pub p_specified: f64,
    /// Specified reactive power (per-unit)
    pub q_specified: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceData {
    pub id: SourceId,
    pub node: usize,
    pub status: bool,
    /// Reference voltage magnitude (per-unit)
    pub u_ref: f64,
}

/// A maximal set of nodes joined by connected branches
#[derive(Debug, Clone, PartialEq)]
pub struct Island {
    /// Member nodes (arena positions, ascending)
    pub nodes: Vec<usize>,
    /// The island's single active source
    pub source: usize,
    /// Node whose angle is pinned to zero
    pub reference: usize,
}

/// Immutable topology and per-unit parameters of one network snapshot.
#[derive(Debug, Clone)]
pub struct NetworkModel {
    system_frequency: f64,
    nodes: Vec<NodeData>,
    branches: Vec<BranchData>,
    loads: Vec<LoadData>,
    sources: Vec<SourceData>,
    ids: HashMap<i64, (ComponentKind, usize)>,
    node_terminals: Vec<Vec<(usize, BranchSide)>>,
    node_loads: Vec<Vec<usize>>,
    node_source: Vec<Option<usize>>,
    islands: Vec<Island>,
    node_island: Vec<usize>,
    diagnostics: Diagnostics,
}

fn register(
    ids: &mut HashMap<i64, (ComponentKind, usize)>,
    id: i64,
    kind: ComponentKind,
    index: usize,
) -> Result<(), StructuralError> {
    if let Some((first, _)) = ids.insert(id, (kind, index)) {
        return Err(StructuralError::DuplicateId {
            id,
            first,
            second: kind,
        });
    }
    Ok(())
}

fn require(
    ok: bool,
    kind: ComponentKind,
    id: i64,
    field: &'static str,
    value: f64,
) -> Result<(), StructuralError> {
    if ok {
        Ok(())
    } else {
        Err(StructuralError::InvalidParameter {
            kind,
            id,
            field,
            value,
        })
    }
}

impl NetworkModel {
    /// Validate the topology tables and build the model.
    ///
    /// `system_frequency` (Hz) converts line capacitance into susceptance.
    pub fn new(input: &NetworkInput, system_frequency: f64) -> Result<Self, StructuralError> {
        if input.nodes.is_empty() {
            return Err(StructuralError::EmptyNetwork);
        }
        let mut ids = HashMap::new();
        let mut diagnostics = Diagnostics::new();

        let mut nodes = Vec::with_capacity(input.nodes.len());
        for (idx, node) in input.nodes.iter().enumerate() {
            let id = node.id.value();
            register(&mut ids, id, ComponentKind::Node, idx)?;
            require(
                node.u_rated.is_finite() && node.u_rated > 0.0,
                ComponentKind::Node,
                id,
                "u_rated",
                node.u_rated,
            )?;
            nodes.push(NodeData {
                id: node.id,
                u_rated: node.u_rated,
            });
        }

        let resolve = |ids: &HashMap<i64, (ComponentKind, usize)>,
                       kind: ComponentKind,
                       id: i64,
                       node: NodeId|
         -> Result<usize, StructuralError> {
            match ids.get(&node.value()) {
                Some((ComponentKind::Node, idx)) => Ok(*idx),
                _ => Err(StructuralError::UnknownNode {
                    kind,
                    id,
                    node: node.value(),
                }),
            }
        };

        let omega = 2.0 * PI * system_frequency;
        let mut branches = Vec::with_capacity(input.lines.len());
        for line in &input.lines {
            let id = line.id.value();
            let kind = ComponentKind::Line;
            let from = resolve(&ids, kind, id, line.from_node)?;
            let to = resolve(&ids, kind, id, line.to_node)?;
            register(&mut ids, id, kind, branches.len())?;
            if from == to {
                return Err(StructuralError::SelfLoop {
                    id,
                    node: line.from_node.value(),
                });
            }
            require(line.r1.is_finite() && line.r1 >= 0.0, kind, id, "r1", line.r1)?;
            require(line.x1.is_finite() && line.x1 >= 0.0, kind, id, "x1", line.x1)?;
            require(line.c1.is_finite() && line.c1 >= 0.0, kind, id, "c1", line.c1)?;
            require(line.tan1.is_finite(), kind, id, "tan1", line.tan1)?;
            require(!line.i_n.is_nan(), kind, id, "i_n", line.i_n)?;
            if line.r1 == 0.0 && line.x1 == 0.0 {
                return Err(StructuralError::ZeroImpedance { id });
            }
            let (from_u, to_u) = (nodes[from].u_rated, nodes[to].u_rated);
            if (from_u - to_u).abs() > 1e-9 * from_u.max(to_u) {
                return Err(StructuralError::VoltageLevelMismatch {
                    id,
                    from_u_rated: from_u,
                    to_u_rated: to_u,
                });
            }

            let z_base = impedance_base(from_u);
            let y_series = Complex64::new(line.r1 / z_base, line.x1 / z_base).inv();
            let y_shunt = Complex64::new(line.tan1, 1.0) * (omega * line.c1 * z_base);

            match (line.from_status, line.to_status) {
                (false, false) => diagnostics.add_warning_with_entity(
                    TOPOLOGY,
                    "line is open at both ends and excluded from the topology",
                    &format!("line {id}"),
                ),
                (true, false) | (false, true) => diagnostics.add_warning_with_entity(
                    TOPOLOGY,
                    "line is open at one end and modelled as a shunt",
                    &format!("line {id}"),
                ),
                (true, true) => {}
            }

            branches.push(BranchData {
                id: line.id,
                from,
                to,
                from_status: line.from_status,
                to_status: line.to_status,
                i_n: line.i_n,
                admittance: BranchAdmittance::from_line(
                    y_series,
                    y_shunt,
                    line.from_status,
                    line.to_status,
                ),
            });
        }

        let mut loads = Vec::with_capacity(input.loads.len());
        for load in &input.loads {
            let id = load.id.value();
            let kind = ComponentKind::Load;
            let node = resolve(&ids, kind, id, load.node)?;
            register(&mut ids, id, kind, loads.len())?;
            if load.load_type != LoadType::ConstPower {
                return Err(StructuralError::UnsupportedLoadType { id });
            }
            require(load.p_specified.is_finite(), kind, id, "p_specified", load.p_specified)?;
            require(load.q_specified.is_finite(), kind, id, "q_specified", load.q_specified)?;
            loads.push(LoadData {
                id: load.id,
                node,
                status: load.status,
                p_specified: load.p_specified / BASE_POWER_VA,
                q_specified: load.q_specified / BASE_POWER_VA,
            });
        }

        let mut sources = Vec::with_capacity(input.sources.len());
        for source in &input.sources {
            let id = source.id.value();
            let kind = ComponentKind::Source;
            let node = resolve(&ids, kind, id, source.node)?;
            register(&mut ids, id, kind, sources.len())?;
            require(
                source.u_ref.is_finite() && source.u_ref > 0.0,
                kind,
                id,
                "u_ref",
                source.u_ref,
            )?;
            sources.push(SourceData {
                id: source.id,
                node,
                status: source.status,
                u_ref: source.u_ref,
            });
        }

        let n = nodes.len();
        let mut node_terminals = vec![Vec::new(); n];
        for (idx, branch) in branches.iter().enumerate() {
            for side in [BranchSide::From, BranchSide::To] {
                if branch.status(side) {
                    node_terminals[branch.node(side)].push((idx, side));
                }
            }
        }
        let mut node_loads = vec![Vec::new(); n];
        for (idx, load) in loads.iter().enumerate() {
            node_loads[load.node].push(idx);
        }

        let components = find_islands(
            n,
            branches
                .iter()
                .filter(|b| b.is_connected())
                .map(|b| (b.from, b.to)),
        );

        let mut node_source = vec![None; n];
        let mut node_island = vec![0; n];
        let mut islands = Vec::with_capacity(components.len());
        for (island_idx, members) in components.into_iter().enumerate() {
            let active: Vec<usize> = sources
                .iter()
                .enumerate()
                .filter(|(_, s)| s.status && members.binary_search(&s.node).is_ok())
                .map(|(idx, _)| idx)
                .collect();
            let anchor = nodes[members[0]].id.value();
            let source = match active.as_slice() {
                [] => return Err(StructuralError::NoSource { node: anchor }),
                [single] => *single,
                many => {
                    return Err(StructuralError::MultipleSources {
                        node: anchor,
                        sources: many.iter().map(|&s| sources[s].id.value()).collect(),
                    })
                }
            };
            let reference = sources[source].node;
            node_source[reference] = Some(source);
            for &member in &members {
                node_island[member] = island_idx;
            }
            islands.push(Island {
                nodes: members,
                source,
                reference,
            });
        }

        Ok(Self {
            system_frequency,
            nodes,
            branches,
            loads,
            sources,
            ids,
            node_terminals,
            node_loads,
            node_source,
            islands,
            node_island,
            diagnostics,
        })
    }

    pub fn system_frequency(&self) -> f64 {
        self.system_frequency
    }

    pub fn nodes(&self) -> &[NodeData] {
        &self.nodes
    }

    pub fn branches(&self) -> &[BranchData] {
        &self.branches
    }

    pub fn loads(&self) -> &[LoadData] {
        &self.loads
    }

    pub fn sources(&self) -> &[SourceData] {
        &self.sources
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Resolve any component id to its kind and arena position.
    pub fn lookup(&self, id: i64) -> Option<(ComponentKind, usize)> {
        self.ids.get(&id).copied()
    }

    pub fn node_index(&self, id: NodeId) -> Option<usize> {
        match self.lookup(id.value()) {
            Some((ComponentKind::Node, idx)) => Some(idx),
            _ => None,
        }
    }

    /// Closed branch terminals at a node.
    pub fn terminals_at(&self, node: usize) -> &[(usize, BranchSide)] {
        &self.node_terminals[node]
    }

    /// Nodes electrically adjacent to `node` through connected branches.
    ///
    /// May repeat a neighbour joined by parallel lines.
    pub fn neighbors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.node_terminals[node].iter().filter_map(move |&(b, side)| {
            let branch = &self.branches[b];
            branch.is_connected().then(|| branch.far_node(side))
        })
    }

    /// All loads hosted by a node, active or not.
    pub fn loads_at(&self, node: usize) -> &[usize] {
        &self.node_loads[node]
    }

    /// Active loads hosted by a node.
    pub fn active_loads_at(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.node_loads[node]
            .iter()
            .copied()
            .filter(|&l| self.loads[l].status)
    }

    /// The island's source when `node` is a reference node.
    pub fn source_at(&self, node: usize) -> Option<usize> {
        self.node_source[node]
    }

    pub fn is_reference(&self, node: usize) -> bool {
        self.node_source[node].is_some()
    }

    pub fn islands(&self) -> &[Island] {
        &self.islands
    }

    pub fn island_of(&self, node: usize) -> &Island {
        &self.islands[self.node_island[node]]
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}
