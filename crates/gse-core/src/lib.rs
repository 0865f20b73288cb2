//! # gse-core: Network and Measurement Model for State Estimation
//!
//! Provides the typed input records, the immutable [`NetworkModel`] and the
//! normalized [`MeasurementSet`] consumed by the WLS estimator in `gse-algo`.
//!
//! ## Design Philosophy
//!
//! Input arrives as six flat tables (nodes, lines, loads, sources, voltage
//! sensors, power sensors), each row keyed by an integer id. Building the
//! model turns those rows into:
//!
//! - **Arenas**: dense `Vec`s of nodes, branches, loads and sources, indexed by
//!   position, with a single id → position map built once
//! - **Per-unit parameters**: every branch carries its 2×2 complex admittance
//!   block on a 1 MVA base
//! - **Islands**: connected components over the fully connected branches, each
//!   anchored by exactly one active source
//!
//! Both the model and the measurement set are plain values. They are built
//! once, never mutated, and hold no process-wide state, so independent
//! snapshots can be estimated on different threads.
//!
//! ## Quick Start
//!
//! ```rust
//! use gse_core::*;
//!
//! let input = NetworkInput {
//!     nodes: vec![
//!         NodeInput { id: NodeId::new(1), u_rated: 10.5e3 },
//!         NodeInput { id: NodeId::new(2), u_rated: 10.5e3 },
//!     ],
//!     lines: vec![LineInput::new(LineId::new(3), NodeId::new(1), NodeId::new(2), 0.25, 0.2)],
//!     loads: vec![LoadInput::new(LoadId::new(4), NodeId::new(2), 1e6, 0.2e6)],
//!     sources: vec![SourceInput::new(SourceId::new(5), NodeId::new(1), 1.0)],
//! };
//! let model = NetworkModel::new(&input, 50.0).unwrap();
//! assert_eq!(model.islands().len(), 1);
//!
//! let sensors = MeasurementInput {
//!     voltage_sensors: vec![VoltageSensorInput::new(SensorId::new(6), 1, 1.0, 10.5e3)],
//!     power_sensors: vec![],
//! };
//! let measurements = MeasurementSet::new(&model, &sensors).unwrap();
//! assert_eq!(measurements.row_count(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`network`] - arena-backed topology with per-unit admittances
//! - [`measurement`] - normalized measurement descriptors
//! - [`graph_utils`] - island detection
//! - [`units`] - unit newtypes and per-unit bases
//! - [`diagnostics`] - non-fatal warnings
//! - [`error`] - [`StructuralError`]

use serde::{Deserialize, Serialize};

pub mod diagnostics;
pub mod error;
pub mod graph_utils;
pub mod measurement;
pub mod network;
pub mod units;

pub use diagnostics::{DiagnosticIssue, Diagnostics};
pub use error::{ComponentKind, StructuralError};
pub use measurement::{Measurement, MeasurementSet, Observation, PowerTerminal};
pub use network::{
    BranchAdmittance, BranchData, BranchSide, Island, LoadData, NetworkModel, NodeData,
    SourceData,
};
pub use units::{Amperes, PerUnit, Radians, VoltAmperes, Vars, Volts, Watts};

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(i64);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(i64);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadId(i64);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(i64);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorId(i64);

impl NodeId {
    #[inline]
    pub fn new(value: i64) -> Self {
        NodeId(value)
    }
    #[inline]
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl LineId {
    #[inline]
    pub fn new(value: i64) -> Self {
        LineId(value)
    }
    #[inline]
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl LoadId {
    #[inline]
    pub fn new(value: i64) -> Self {
        LoadId(value)
    }
    #[inline]
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl SourceId {
    #[inline]
    pub fn new(value: i64) -> Self {
        SourceId(value)
    }
    #[inline]
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl SensorId {
    #[inline]
    pub fn new(value: i64) -> Self {
        SensorId(value)
    }
    #[inline]
    pub fn value(&self) -> i64 {
        self.0
    }
}

fn default_status() -> bool {
    true
}

// Input records, one struct per table

/// A bus of the network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInput {
    pub id: NodeId,
    /// Rated line-to-line voltage in volts; also the per-unit voltage base
    pub u_rated: f64,
}

/// A symmetric line between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineInput {
    pub id: LineId,
    pub from_node: NodeId,
    pub to_node: NodeId,
    #[serde(default = "default_status")]
    pub from_status: bool,
    #[serde(default = "default_status")]
    pub to_status: bool,
    /// Series resistance (Ω)
    pub r1: f64,
    /// Series reactance (Ω)
    pub x1: f64,
    /// Shunt capacitance (F)
    #[serde(default)]
    pub c1: f64,
    /// Loss angle of the shunt capacitance
    #[serde(default)]
    pub tan1: f64,
    /// Thermal rating (A); non-positive or infinite means unrated
    #[serde(default = "default_rating")]
    pub i_n: f64,
}

fn default_rating() -> f64 {
    f64::INFINITY
}

impl LineInput {
    /// A closed line with series impedance only.
    pub fn new(id: LineId, from_node: NodeId, to_node: NodeId, r1: f64, x1: f64) -> Self {
        Self {
            id,
            from_node,
            to_node,
            from_status: true,
            to_status: true,
            r1,
            x1,
            c1: 0.0,
            tan1: 0.0,
            i_n: f64::INFINITY,
        }
    }

    pub fn with_shunt(mut self, c1: f64, tan1: f64) -> Self {
        self.c1 = c1;
        self.tan1 = tan1;
        self
    }

    pub fn with_rating(mut self, i_n: f64) -> Self {
        self.i_n = i_n;
        self
    }

    pub fn with_status(mut self, from_status: bool, to_status: bool) -> Self {
        self.from_status = from_status;
        self.to_status = to_status;
        self
    }
}

/// Load model; only constant power is supported by the estimator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadType {
    #[default]
    ConstPower,
    ConstImpedance,
    ConstCurrent,
}

/// A symmetric load (positive power = consumption)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadInput {
    pub id: LoadId,
    pub node: NodeId,
    #[serde(default = "default_status")]
    pub status: bool,
    #[serde(rename = "type", default)]
    pub load_type: LoadType,
    /// Specified active power (W)
    pub p_specified: f64,
    /// Specified reactive power (var)
    pub q_specified: f64,
}

impl LoadInput {
    pub fn new(id: LoadId, node: NodeId, p_specified: f64, q_specified: f64) -> Self {
        Self {
            id,
            node,
            status: true,
            load_type: LoadType::ConstPower,
            p_specified,
            q_specified,
        }
    }
}

/// A voltage source; its node is the angle reference of its island
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInput {
    pub id: SourceId,
    pub node: NodeId,
    #[serde(default = "default_status")]
    pub status: bool,
    /// Reference voltage magnitude (per-unit)
    pub u_ref: f64,
}

impl SourceInput {
    pub fn new(id: SourceId, node: NodeId, u_ref: f64) -> Self {
        Self {
            id,
            node,
            status: true,
            u_ref,
        }
    }
}

/// Voltage magnitude sensor on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoltageSensorInput {
    pub id: SensorId,
    /// Id of the measured node
    pub measured_object: i64,
    /// Standard deviation (V)
    pub u_sigma: f64,
    /// Measured line-to-line magnitude (V)
    pub u_measured: f64,
}

impl VoltageSensorInput {
    pub fn new(id: SensorId, measured_object: i64, u_sigma: f64, u_measured: f64) -> Self {
        Self {
            id,
            measured_object,
            u_sigma,
            u_measured,
        }
    }
}

/// Terminal a power sensor is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasuredTerminalType {
    /// Power flowing from the from-node into the line
    BranchFrom,
    /// Power flowing from the to-node into the line
    BranchTo,
    /// Power consumed by a load
    Load,
    /// Net power injected into the network at a node
    Node,
}

/// Active/reactive power sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerSensorInput {
    pub id: SensorId,
    pub measured_object: i64,
    pub measured_terminal_type: MeasuredTerminalType,
    /// Standard deviation of the apparent power (VA)
    pub power_sigma: f64,
    /// Measured active power (W)
    pub p_measured: f64,
    /// Measured reactive power (var)
    pub q_measured: f64,
    /// Overrides `power_sigma` for the active power
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_sigma: Option<f64>,
    /// Overrides `power_sigma` for the reactive power
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q_sigma: Option<f64>,
}

impl PowerSensorInput {
    pub fn new(
        id: SensorId,
        measured_object: i64,
        measured_terminal_type: MeasuredTerminalType,
        power_sigma: f64,
        p_measured: f64,
        q_measured: f64,
    ) -> Self {
        Self {
            id,
            measured_object,
            measured_terminal_type,
            power_sigma,
            p_measured,
            q_measured,
            p_sigma: None,
            q_sigma: None,
        }
    }
}

/// The four topology tables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkInput {
    #[serde(default)]
    pub nodes: Vec<NodeInput>,
    #[serde(default)]
    pub lines: Vec<LineInput>,
    #[serde(default)]
    pub loads: Vec<LoadInput>,
    #[serde(default)]
    pub sources: Vec<SourceInput>,
}

/// The two sensor tables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementInput {
    #[serde(default)]
    pub voltage_sensors: Vec<VoltageSensorInput>,
    #[serde(default)]
    pub power_sensors: Vec<PowerSensorInput>,
}
