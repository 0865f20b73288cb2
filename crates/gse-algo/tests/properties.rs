//! Behavioural properties of the WLS estimator

mod common;

use common::{exact_measurements, three_node_measurements, three_node_network};
use gse_algo::{
    estimate, EstimationConfig, EstimationError, NodeSeed, NumericalError, SingularReason,
    StateComponent, StateVector, WlsSolver,
};
use gse_core::*;

fn model() -> NetworkModel {
    NetworkModel::new(&three_node_network(), 50.0).unwrap()
}

fn solve(
    model: &NetworkModel,
    sensors: &MeasurementInput,
    config: EstimationConfig,
) -> StateVector {
    let set = MeasurementSet::new(model, sensors).unwrap();
    WlsSolver::new(config).solve(model, &set).unwrap().state
}

fn max_state_difference(a: &StateVector, b: &StateVector) -> f64 {
    a.u_pu
        .iter()
        .zip(&b.u_pu)
        .chain(a.u_angle.iter().zip(&b.u_angle))
        .fold(0.0_f64, |m, (x, y)| m.max((x - y).abs()))
}

#[test]
fn exact_measurements_recover_the_state() {
    let model = model();
    let truth = StateVector {
        u_pu: vec![1.01, 0.955, 0.968],
        u_angle: vec![0.0, -0.024, -0.019],
    };
    let sensors = exact_measurements(&model, &truth);

    let set = MeasurementSet::new(&model, &sensors).unwrap();
    let estimate = WlsSolver::default().solve(&model, &set).unwrap();
    assert!(max_state_difference(&estimate.state, &truth) < 1e-7);
    assert!(estimate.objective < 1e-6, "objective {}", estimate.objective);
}

#[test]
fn shifting_initial_angles_does_not_change_the_result() {
    let model = model();
    let sensors = three_node_measurements();
    let seeds = |offset: f64| {
        vec![
            NodeSeed::new(NodeId::new(1), 1.0, offset),
            NodeSeed::new(NodeId::new(2), 0.98, offset - 0.01),
            NodeSeed::new(NodeId::new(6), 0.98, offset - 0.01),
        ]
    };

    let base = solve(
        &model,
        &sensors,
        EstimationConfig::default().with_initial_state(seeds(0.0)),
    );
    let shifted = solve(
        &model,
        &sensors,
        EstimationConfig::default().with_initial_state(seeds(0.7)),
    );
    let flat = solve(&model, &sensors, EstimationConfig::default());

    assert!(max_state_difference(&base, &shifted) < 1e-8);
    assert!(max_state_difference(&base, &flat) < 1e-8);
    assert_eq!(shifted.u_angle[0], 0.0);
}

#[test]
fn consistent_extra_measurement_is_neutral() {
    let model = model();
    let sensors = three_node_measurements();
    let output = estimate(&three_node_network(), &sensors, &EstimationConfig::default()).unwrap();
    let before = solve(&model, &sensors, EstimationConfig::default());

    // Injection at node 2 exactly as estimated
    let node2 = &output.nodes[1];
    let mut extended = sensors.clone();
    extended.power_sensors.push(PowerSensorInput::new(
        SensorId::new(30),
        2,
        MeasuredTerminalType::Node,
        1e3,
        node2.p.value(),
        node2.q.value(),
    ));
    let after = solve(&model, &extended, EstimationConfig::default());

    assert!(max_state_difference(&before, &after) < 1e-7);
}

#[test]
fn objective_decreases_monotonically() {
    let output = estimate(
        &three_node_network(),
        &three_node_measurements(),
        &EstimationConfig::default(),
    )
    .unwrap();

    let objectives: Vec<f64> = output.history.iter().map(|r| r.objective).collect();
    for pair in objectives.windows(2) {
        assert!(
            pair[1] <= pair[0] * (1.0 + 1e-9),
            "objective rose: {objectives:?}"
        );
    }
    assert!(output.objective <= objectives[objectives.len() - 1] * (1.0 + 1e-9));
    let steps: Vec<f64> = output.history.iter().map(|r| r.max_delta).collect();
    assert!(steps[steps.len() - 1] < 1e-8);
}

#[test]
fn voltage_only_measurements_are_underdetermined() {
    let mut sensors = three_node_measurements();
    sensors.power_sensors.clear();
    let err = estimate(&three_node_network(), &sensors, &EstimationConfig::default()).unwrap_err();
    assert_eq!(
        err,
        EstimationError::Numerical(NumericalError::Singular {
            iteration: 0,
            reason: SingularReason::Underdetermined { rows: 3, states: 5 },
            node: None,
        })
    );
}

#[test]
fn unmetered_node_is_reported() {
    // Chain 1 - 2 - 3 with sensors only around the first line
    let node = |id| NodeInput {
        id: NodeId::new(id),
        u_rated: 10e3,
    };
    let network = NetworkInput {
        nodes: vec![node(1), node(2), node(3)],
        lines: vec![
            LineInput::new(LineId::new(4), NodeId::new(1), NodeId::new(2), 0.2, 0.4),
            LineInput::new(LineId::new(5), NodeId::new(2), NodeId::new(3), 0.2, 0.4),
        ],
        loads: vec![],
        sources: vec![SourceInput::new(SourceId::new(6), NodeId::new(1), 1.0)],
    };
    let sensors = MeasurementInput {
        voltage_sensors: vec![
            VoltageSensorInput::new(SensorId::new(10), 1, 1.0, 10e3),
            VoltageSensorInput::new(SensorId::new(11), 2, 1.0, 9.9e3),
        ],
        power_sensors: vec![
            PowerSensorInput::new(
                SensorId::new(12),
                4,
                MeasuredTerminalType::BranchFrom,
                1e3,
                1e6,
                0.0,
            ),
            PowerSensorInput::new(
                SensorId::new(13),
                4,
                MeasuredTerminalType::BranchTo,
                1e3,
                -1e6,
                0.0,
            ),
        ],
    };

    let err = estimate(&network, &sensors, &EstimationConfig::default()).unwrap_err();
    assert_eq!(
        err,
        EstimationError::Numerical(NumericalError::Singular {
            iteration: 1,
            reason: SingularReason::Unobserved(StateComponent::Angle),
            node: Some(NodeId::new(3)),
        })
    );
}

#[test]
fn iteration_cap_reports_last_state() {
    let config = EstimationConfig::default().with_max_iterations(1);
    let err = estimate(&three_node_network(), &three_node_measurements(), &config).unwrap_err();
    match err {
        EstimationError::Numerical(NumericalError::MaxIterationsExceeded {
            iterations,
            max_delta,
            max_residual,
            last_state,
        }) => {
            assert_eq!(iterations, 1);
            assert!(max_delta > 1e-8);
            assert!(max_residual > 0.0);
            assert_eq!(last_state.u_angle[0], 0.0);
            assert!(last_state.u_angle[1] < 0.0);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn unknown_seed_node_is_structural() {
    let config = EstimationConfig::default()
        .with_initial_state(vec![NodeSeed::new(NodeId::new(42), 1.0, 0.0)]);
    let err = estimate(&three_node_network(), &three_node_measurements(), &config).unwrap_err();
    assert_eq!(
        err,
        EstimationError::Structural(StructuralError::UnknownSeedNode { node: 42 })
    );
}
