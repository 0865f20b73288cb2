//! Normalized measurement descriptors.
//!
//! Raw sensor rows are bound to arena positions of the [`NetworkModel`] and
//! converted to per-unit: voltages by the measured node's `u_rated`, powers
//! by the 1 MVA base. Each scalar observation carries its weight `1/σ²`
//! (σ in per-unit as well), so the solver never touches SI units.
//!
//! Order is stable: voltage sensors in input order, then power sensors in
//! input order. A voltage measurement contributes one row to the Jacobian, a
//! power measurement two (P then Q).

use crate::diagnostics::{Diagnostics, MEASUREMENT};
use crate::error::{ComponentKind, StructuralError};
use crate::network::NetworkModel;
use crate::units::BASE_POWER_VA;
use crate::{MeasuredTerminalType, MeasurementInput, SensorId};
use std::collections::HashSet;

/// One scalar observation in per-unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub value: f64,
    /// 1/σ²
    pub weight: f64,
}

impl Observation {
    fn from_sigma(value: f64, sigma: f64) -> Self {
        Self {
            value,
            weight: 1.0 / (sigma * sigma),
        }
    }

    /// Standard deviation (per-unit)
    pub fn sigma(&self) -> f64 {
        self.weight.sqrt().recip()
    }
}

/// Where a power measurement is taken, by arena position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerTerminal {
    BranchFrom(usize),
    BranchTo(usize),
    Load(usize),
    Node(usize),
}

/// A normalized measurement
#[derive(Debug, Clone, PartialEq)]
pub enum Measurement {
    Voltage {
        sensor: SensorId,
        node: usize,
        magnitude: Observation,
    },
    Power {
        sensor: SensorId,
        terminal: PowerTerminal,
        p: Observation,
        q: Observation,
    },
}

impl Measurement {
    pub fn sensor(&self) -> SensorId {
        match self {
            Measurement::Voltage { sensor, .. } | Measurement::Power { sensor, .. } => *sensor,
        }
    }

    /// Number of Jacobian rows this measurement contributes.
    pub fn row_count(&self) -> usize {
        match self {
            Measurement::Voltage { .. } => 1,
            Measurement::Power { .. } => 2,
        }
    }
}

/// Ordered, validated measurements of one snapshot.
#[derive(Debug, Clone)]
pub struct MeasurementSet {
    measurements: Vec<Measurement>,
    row_count: usize,
    diagnostics: Diagnostics,
}

fn check_sigma(sensor: i64, sigma: f64) -> Result<f64, StructuralError> {
    if sigma.is_finite() && sigma > 0.0 {
        Ok(sigma)
    } else {
        Err(StructuralError::InvalidSigma { sensor, sigma })
    }
}

impl MeasurementSet {
    /// Bind the sensor tables to `model`.
    pub fn new(model: &NetworkModel, input: &MeasurementInput) -> Result<Self, StructuralError> {
        let mut seen = HashSet::new();
        let mut register = |id: i64| -> Result<(), StructuralError> {
            if let Some((kind, _)) = model.lookup(id) {
                return Err(StructuralError::DuplicateId {
                    id,
                    first: kind,
                    second: ComponentKind::Sensor,
                });
            }
            if !seen.insert(id) {
                return Err(StructuralError::DuplicateId {
                    id,
                    first: ComponentKind::Sensor,
                    second: ComponentKind::Sensor,
                });
            }
            Ok(())
        };

        let mut diagnostics = Diagnostics::new();
        let mut measurements =
            Vec::with_capacity(input.voltage_sensors.len() + input.power_sensors.len());

        for sensor in &input.voltage_sensors {
            let id = sensor.id.value();
            register(id)?;
            let node = match model.lookup(sensor.measured_object) {
                Some((ComponentKind::Node, idx)) => idx,
                Some((found, _)) => {
                    return Err(StructuralError::NotANode {
                        sensor: id,
                        object: sensor.measured_object,
                        found,
                    })
                }
                None => {
                    return Err(StructuralError::UnknownMeasuredObject {
                        sensor: id,
                        object: sensor.measured_object,
                    })
                }
            };
            let sigma = check_sigma(id, sensor.u_sigma)?;
            if !sensor.u_measured.is_finite() {
                return Err(StructuralError::NonFiniteMeasurement { sensor: id });
            }
            let u_rated = model.nodes()[node].u_rated;
            measurements.push(Measurement::Voltage {
                sensor: sensor.id,
                node,
                magnitude: Observation::from_sigma(sensor.u_measured / u_rated, sigma / u_rated),
            });
        }

        for sensor in &input.power_sensors {
            let id = sensor.id.value();
            register(id)?;
            let (found, idx) = model.lookup(sensor.measured_object).ok_or(
                StructuralError::UnknownMeasuredObject {
                    sensor: id,
                    object: sensor.measured_object,
                },
            )?;
            let terminal = match (sensor.measured_terminal_type, found) {
                (MeasuredTerminalType::BranchFrom, ComponentKind::Line) => {
                    PowerTerminal::BranchFrom(idx)
                }
                (MeasuredTerminalType::BranchTo, ComponentKind::Line) => PowerTerminal::BranchTo(idx),
                (MeasuredTerminalType::Load, ComponentKind::Load) => PowerTerminal::Load(idx),
                (MeasuredTerminalType::Node, ComponentKind::Node) => PowerTerminal::Node(idx),
                (terminal, found) => {
                    return Err(StructuralError::TerminalMismatch {
                        sensor: id,
                        object: sensor.measured_object,
                        terminal,
                        found,
                    })
                }
            };

            let entity = format!("sensor {id}");
            match terminal {
                PowerTerminal::BranchFrom(b) | PowerTerminal::BranchTo(b) => {
                    let branch = &model.branches()[b];
                    let closed = match terminal {
                        PowerTerminal::BranchFrom(_) => branch.from_status,
                        _ => branch.to_status,
                    };
                    if !closed {
                        diagnostics.add_warning_with_entity(
                            MEASUREMENT,
                            "sensor is on an open line terminal",
                            &entity,
                        );
                    }
                }
                PowerTerminal::Load(l) => {
                    let load = &model.loads()[l];
                    if model.is_reference(load.node) {
                        return Err(StructuralError::LoadAtSourceNode {
                            sensor: id,
                            load: load.id.value(),
                            node: model.nodes()[load.node].id.value(),
                        });
                    }
                    if !load.status {
                        diagnostics.add_warning_with_entity(
                            MEASUREMENT,
                            "sensor is on a switched-off load",
                            &entity,
                        );
                    }
                }
                PowerTerminal::Node(_) => {}
            }

            let power_sigma = check_sigma(id, sensor.power_sigma)?;
            let p_sigma = check_sigma(id, sensor.p_sigma.unwrap_or(power_sigma))?;
            let q_sigma = check_sigma(id, sensor.q_sigma.unwrap_or(power_sigma))?;
            if !(sensor.p_measured.is_finite() && sensor.q_measured.is_finite()) {
                return Err(StructuralError::NonFiniteMeasurement { sensor: id });
            }
            measurements.push(Measurement::Power {
                sensor: sensor.id,
                terminal,
                p: Observation::from_sigma(
                    sensor.p_measured / BASE_POWER_VA,
                    p_sigma / BASE_POWER_VA,
                ),
                q: Observation::from_sigma(
                    sensor.q_measured / BASE_POWER_VA,
                    q_sigma / BASE_POWER_VA,
                ),
            });
        }

        let row_count = measurements.iter().map(Measurement::row_count).sum();
        Ok(Self {
            measurements,
            row_count,
            diagnostics,
        })
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Measurement> {
        self.measurements.iter()
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// Total number of scalar observations (Jacobian rows).
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}
