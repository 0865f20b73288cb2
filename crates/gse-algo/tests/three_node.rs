//! End-to-end estimation of the 10.5 kV three-node triangle

mod common;

use common::{three_node_measurements, three_node_network};
use gse_algo::{estimate, estimate_batch, EstimationConfig, EstimationError, MeasuredQuantity};
use gse_core::{MeasuredTerminalType, PowerSensorInput, SensorId, StructuralError};

fn assert_close(actual: f64, expected: f64, tol: f64, what: &str) {
    assert!(
        (actual - expected).abs() <= tol,
        "{what}: got {actual}, expected {expected} ± {tol}"
    );
}

#[test]
fn three_node_converges_quickly() {
    let output = estimate(
        &three_node_network(),
        &three_node_measurements(),
        &EstimationConfig::default(),
    )
    .expect("three-node case should converge");

    assert!(output.iterations < 10, "took {} iterations", output.iterations);
    assert_eq!(output.history.len(), output.iterations);
    assert_eq!(output.degrees_of_freedom, 19 - 5);
    assert!(output.diagnostics.issues.is_empty());
}

#[test]
fn three_node_voltages_match_measurements() {
    let output = estimate(
        &three_node_network(),
        &three_node_measurements(),
        &EstimationConfig::default(),
    )
    .unwrap();

    let measured = [(1, 10489.37), (2, 9997.32), (6, 10102.01)];
    for (node, (id, u)) in output.nodes.iter().zip(measured) {
        assert_eq!(node.id.value(), id);
        assert_close(node.u.value(), u, 0.005 * u, "node voltage");
    }
    assert_eq!(output.nodes[0].u_angle.value(), 0.0);
    // Power flows from the source towards both loads
    assert!(output.nodes[1].u_angle.value() < 0.0);
    assert!(output.nodes[2].u_angle.value() < 0.0);
}

#[test]
fn three_node_flows_match_measurements() {
    let output = estimate(
        &three_node_network(),
        &three_node_measurements(),
        &EstimationConfig::default(),
    )
    .unwrap();

    // (line, p_from, q_from, p_to, q_to)
    let measured = [
        (3, 1.73e7, 4.07e6, -1.66e7, -3.82e6),
        (5, -3.36e6, -1.17e6, 3.39e6, 8.86e5),
        (8, 1.38e7, 2.91e6, -1.33e7, -2.88e6),
    ];
    for (branch, (id, pf, qf, pt, qt)) in output.branches.iter().zip(measured) {
        assert_eq!(branch.id.value(), id);
        assert_close(branch.p_from.value(), pf, 0.5e6, "p_from");
        assert_close(branch.q_from.value(), qf, 0.5e6, "q_from");
        assert_close(branch.p_to.value(), pt, 0.5e6, "p_to");
        assert_close(branch.q_to.value(), qt, 0.5e6, "q_to");
        assert!(branch.loading > 0.0 && branch.loading < 1.0);
    }

    assert_close(output.loads[0].p.value(), 20e6, 0.5e6, "load 4 p");
    assert_close(output.loads[1].p.value(), 10e6, 0.5e6, "load 7 p");
    assert_close(output.nodes[2].p.value(), -10e6, 0.5e6, "node 6 p");

    // The source covers both loads plus the line losses
    let source = &output.sources[0];
    let demand: f64 = output.loads.iter().map(|l| l.p.value()).sum();
    assert!(source.p.value() > demand);
    assert_close(source.p.value(), output.nodes[0].p.value(), 1e-6, "source p");
}

#[test]
fn three_node_residual_report() {
    let output = estimate(
        &three_node_network(),
        &three_node_measurements(),
        &EstimationConfig::default(),
    )
    .unwrap();

    assert_eq!(output.residuals.len(), 19);
    let first = &output.residuals[0];
    assert_eq!(first.sensor, SensorId::new(11));
    assert_eq!(first.quantity, MeasuredQuantity::VoltageMagnitude);
    assert_close(first.measured, 10489.37, 1e-6, "measured");
    assert_close(first.residual, first.measured - first.estimated, 1e-6, "residual");

    let reactive = &output.residuals[4];
    assert_eq!(reactive.sensor, SensorId::new(14));
    assert_eq!(reactive.quantity, MeasuredQuantity::ReactivePower);

    // χ² equals the sum of squared normalized residuals
    let chi2: f64 = output
        .residuals
        .iter()
        .map(|r| r.normalized_residual.powi(2))
        .sum();
    assert_close(chi2, output.objective, 1e-6 * output.objective, "chi2");
    assert_close(output.objective, 6994.3, 10.0, "objective");
}

#[test]
fn missing_source_is_structural() {
    let mut network = three_node_network();
    network.sources.clear();
    let err = estimate(&network, &three_node_measurements(), &EstimationConfig::default())
        .unwrap_err();
    assert_eq!(
        err,
        EstimationError::Structural(StructuralError::NoSource { node: 1 })
    );
}

#[test]
fn sensor_on_unknown_object_is_structural() {
    let mut sensors = three_node_measurements();
    sensors.power_sensors.push(PowerSensorInput::new(
        SensorId::new(30),
        99,
        MeasuredTerminalType::Node,
        1e3,
        0.0,
        0.0,
    ));
    let err = estimate(&three_node_network(), &sensors, &EstimationConfig::default())
        .unwrap_err();
    assert!(matches!(
        err,
        EstimationError::Structural(StructuralError::UnknownMeasuredObject { sensor: 30, object: 99 })
    ));
}

#[test]
fn open_line_end_is_estimated_as_shunt() {
    let mut network = three_node_network();
    network.lines[1] = network.lines[1].clone().with_status(true, false);
    let output = estimate(
        &network,
        &three_node_measurements(),
        &EstimationConfig::default(),
    )
    .expect("still observable with line 5 open at node 6");

    let line5 = &output.branches[1];
    assert_eq!(line5.p_to.value(), 0.0);
    assert_eq!(line5.i_to.value(), 0.0);
    // Charging current only: practically no active power
    assert!(line5.p_from.value().abs() < 1e3);
    assert!(line5.q_from.value() < 0.0);
    // Sensor 17 now sits on an open terminal
    assert_eq!(output.diagnostics.warning_count(), 2);
}

#[test]
fn batch_keeps_failures_separate() {
    let good = three_node_measurements();
    let mut bad = three_node_measurements();
    bad.voltage_sensors[0].u_sigma = 0.0;

    let results = estimate_batch(
        &three_node_network(),
        &[good.clone(), bad, good],
        &EstimationConfig::default(),
    )
    .unwrap();

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(matches!(
        results[1],
        Err(EstimationError::Structural(StructuralError::InvalidSigma { sensor: 11, .. }))
    ));
    assert_eq!(results[0].as_ref().unwrap(), results[2].as_ref().unwrap());
}
