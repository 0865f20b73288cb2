//! Structural errors raised while building the network and measurement model.
//!
//! Everything in here is detected before the first Newton-Raphson iteration:
//! a model that fails these checks never reaches the solver. Every variant
//! carries the id of the offending record so the caller can fix the input
//! without re-running anything.

use crate::MeasuredTerminalType;
use thiserror::Error;

/// Kind of component an id resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Node,
    Line,
    Load,
    Source,
    Sensor,
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ComponentKind::Node => "node",
            ComponentKind::Line => "line",
            ComponentKind::Load => "load",
            ComponentKind::Source => "source",
            ComponentKind::Sensor => "sensor",
        };
        f.write_str(name)
    }
}

/// Malformed topology or measurement references.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructuralError {
    #[error("network has no nodes")]
    EmptyNetwork,

    /// Ids share one namespace across all component kinds.
    #[error("id {id} is used by more than one component ({first} and {second})")]
    DuplicateId {
        id: i64,
        first: ComponentKind,
        second: ComponentKind,
    },

    #[error("{kind} {id} references node {node}, which does not exist")]
    UnknownNode {
        kind: ComponentKind,
        id: i64,
        node: i64,
    },

    #[error("{kind} {id} has invalid {field} = {value}")]
    InvalidParameter {
        kind: ComponentKind,
        id: i64,
        field: &'static str,
        value: f64,
    },

    #[error("line {id} connects node {node} to itself")]
    SelfLoop { id: i64, node: i64 },

    #[error("line {id} has zero series impedance")]
    ZeroImpedance { id: i64 },

    #[error("line {id} joins nodes of different rated voltage ({from_u_rated} V and {to_u_rated} V)")]
    VoltageLevelMismatch {
        id: i64,
        from_u_rated: f64,
        to_u_rated: f64,
    },

    #[error("load {id} is not a constant-power load")]
    UnsupportedLoadType { id: i64 },

    #[error("island containing node {node} has no active source")]
    NoSource { node: i64 },

    #[error("island containing node {node} has {} active sources {sources:?}", .sources.len())]
    MultipleSources { node: i64, sources: Vec<i64> },

    #[error("sensor {sensor} measures object {object}, which does not exist")]
    UnknownMeasuredObject { sensor: i64, object: i64 },

    #[error("sensor {sensor} uses terminal {terminal:?} on {found} {object}")]
    TerminalMismatch {
        sensor: i64,
        object: i64,
        terminal: MeasuredTerminalType,
        found: ComponentKind,
    },

    #[error("voltage sensor {sensor} measures {found} {object}, which is not a node")]
    NotANode {
        sensor: i64,
        object: i64,
        found: ComponentKind,
    },

    #[error("sensor {sensor} has non-positive standard deviation {sigma}")]
    InvalidSigma { sensor: i64, sigma: f64 },

    #[error("sensor {sensor} has non-finite measured value")]
    NonFiniteMeasurement { sensor: i64 },

    #[error("sensor {sensor} measures load {load} at node {node}, which hosts an active source")]
    LoadAtSourceNode { sensor: i64, load: i64, node: i64 },

    #[error("initial state references node {node}, which does not exist")]
    UnknownSeedNode { node: i64 },
}
