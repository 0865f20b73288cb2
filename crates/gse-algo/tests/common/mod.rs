//! Shared fixtures for the estimator integration tests
#![allow(dead_code)]

use gse_core::*;

pub const U_RATED: f64 = 10.5e3;

fn node(id: i64) -> NodeInput {
    NodeInput {
        id: NodeId::new(id),
        u_rated: U_RATED,
    }
}

fn line(id: i64, from: i64, to: i64) -> LineInput {
    LineInput::new(LineId::new(id), NodeId::new(from), NodeId::new(to), 0.25, 0.2)
        .with_shunt(10e-6, 0.0)
        .with_rating(1000.0)
}

/// Meshed 10.5 kV triangle: source at node 1, loads at nodes 2 and 6.
pub fn three_node_network() -> NetworkInput {
    NetworkInput {
        nodes: vec![node(1), node(2), node(6)],
        lines: vec![line(3, 1, 2), line(5, 2, 6), line(8, 1, 6)],
        loads: vec![
            LoadInput::new(LoadId::new(4), NodeId::new(2), 20e6, 5e6),
            LoadInput::new(LoadId::new(7), NodeId::new(6), 10e6, 2e6),
        ],
        sources: vec![SourceInput::new(SourceId::new(10), NodeId::new(1), 1.0)],
    }
}

fn power(
    id: i64,
    object: i64,
    terminal: MeasuredTerminalType,
    p: f64,
    q: f64,
) -> PowerSensorInput {
    PowerSensorInput::new(SensorId::new(id), object, terminal, 1e3, p, q)
}

/// Field measurements of the triangle: all node voltages, both ends of
/// every line, load 4 and the injection at node 6.
pub fn three_node_measurements() -> MeasurementInput {
    use MeasuredTerminalType::*;
    MeasurementInput {
        voltage_sensors: vec![
            VoltageSensorInput::new(SensorId::new(11), 1, 1.0, 10489.37),
            VoltageSensorInput::new(SensorId::new(12), 2, 1.0, 9997.32),
            VoltageSensorInput::new(SensorId::new(13), 6, 1.0, 10102.01),
        ],
        power_sensors: vec![
            power(14, 3, BranchFrom, 1.73e7, 4.07e6),
            power(15, 3, BranchTo, -1.66e7, -3.82e6),
            power(16, 5, BranchFrom, -3.36e6, -1.17e6),
            power(17, 5, BranchTo, 3.39e6, 8.86e5),
            power(18, 8, BranchFrom, 1.38e7, 2.91e6),
            power(19, 8, BranchTo, -1.33e7, -2.88e6),
            power(20, 4, Load, 20e6, 5e6),
            power(21, 6, Node, -10e6, -2e6),
        ],
    }
}

/// Measurements that a network in `state` would produce exactly, with the
/// same sensor placement as [`three_node_measurements`].
pub fn exact_measurements(model: &NetworkModel, state: &gse_algo::StateVector) -> MeasurementInput {
    use MeasuredTerminalType::*;
    let assembler = gse_algo::ResultAssembler::new(model);
    let nodes = assembler.nodes(state);
    let branches = assembler.branches(state);
    let loads = assembler.loads(state);

    let voltage_sensors = nodes
        .iter()
        .zip(11..)
        .map(|(n, id)| VoltageSensorInput::new(SensorId::new(id), n.id.value(), 1.0, n.u.value()))
        .collect();

    let mut power_sensors = Vec::new();
    let mut id = 14;
    for b in &branches {
        power_sensors.push(power(id, b.id.value(), BranchFrom, b.p_from.value(), b.q_from.value()));
        power_sensors.push(power(id + 1, b.id.value(), BranchTo, b.p_to.value(), b.q_to.value()));
        id += 2;
    }
    power_sensors.push(power(id, 4, Load, loads[0].p.value(), loads[0].q.value()));
    let node6 = &nodes[2];
    power_sensors.push(power(id + 1, 6, Node, node6.p.value(), node6.q.value()));

    MeasurementInput {
        voltage_sensors,
        power_sensors,
    }
}
