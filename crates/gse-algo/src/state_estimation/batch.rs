use crate::state_estimation::config::EstimationConfig;
use crate::state_estimation::error::EstimationError;
use crate::state_estimation::results::{EstimationOutput, ResultAssembler};
use crate::state_estimation::wls::WlsSolver;
use gse_core::{MeasurementInput, MeasurementSet, NetworkInput, NetworkModel};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::info;

/// Estimate one snapshot on an already built model.
pub fn estimate_with_model(
    model: &NetworkModel,
    measurements: &MeasurementInput,
    solver: &WlsSolver,
) -> Result<EstimationOutput, EstimationError> {
    let set = MeasurementSet::new(model, measurements)?;
    let estimate = solver.solve(model, &set)?;
    Ok(ResultAssembler::new(model).assemble(&set, &estimate))
}

/// Build the model, estimate the state and assemble the results.
pub fn estimate(
    network: &NetworkInput,
    measurements: &MeasurementInput,
    config: &EstimationConfig,
) -> Result<EstimationOutput, EstimationError> {
    config.validate()?;
    let model = NetworkModel::new(network, config.system_frequency)?;
    estimate_with_model(&model, measurements, &WlsSolver::new(config.clone()))
}

/// Estimate a series of measurement snapshots of one network.
///
/// The model is built once and shared read-only. Snapshots are independent:
/// one failing does not affect the others, and results come back in input
/// order. With the `parallel` feature they run on the rayon pool.
pub fn estimate_batch(
    network: &NetworkInput,
    snapshots: &[MeasurementInput],
    config: &EstimationConfig,
) -> Result<Vec<Result<EstimationOutput, EstimationError>>, EstimationError> {
    config.validate()?;
    let model = NetworkModel::new(network, config.system_frequency)?;
    let solver = WlsSolver::new(config.clone());

    #[cfg(feature = "parallel")]
    let results: Vec<_> = snapshots
        .par_iter()
        .map(|snapshot| estimate_with_model(&model, snapshot, &solver))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let results: Vec<_> = snapshots
        .iter()
        .map(|snapshot| estimate_with_model(&model, snapshot, &solver))
        .collect();

    let failed = results.iter().filter(|r| r.is_err()).count();
    info!(snapshots = snapshots.len(), failed, "batch estimation finished");
    Ok(results)
}
