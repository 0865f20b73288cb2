//! Case files: one document holding the six input tables and an optional
//! `[config]` section.
//!
//! TOML and JSON share the same layout; the format is chosen by file
//! extension (`.json` is JSON, anything else is TOML).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use gse_algo::EstimationConfig;
use gse_core::{
    LineInput, LoadInput, MeasurementInput, NetworkInput, NodeInput, PowerSensorInput,
    SourceInput, VoltageSensorInput,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaseFile {
    pub config: EstimationConfig,
    pub nodes: Vec<NodeInput>,
    pub lines: Vec<LineInput>,
    pub loads: Vec<LoadInput>,
    pub sources: Vec<SourceInput>,
    pub voltage_sensors: Vec<VoltageSensorInput>,
    pub power_sensors: Vec<PowerSensorInput>,
}

impl CaseFile {
    pub fn network(&self) -> NetworkInput {
        NetworkInput {
            nodes: self.nodes.clone(),
            lines: self.lines.clone(),
            loads: self.loads.clone(),
            sources: self.sources.clone(),
        }
    }

    pub fn measurements(&self) -> MeasurementInput {
        MeasurementInput {
            voltage_sensors: self.voltage_sensors.clone(),
            power_sensors: self.power_sensors.clone(),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Read and parse a case file.
pub fn load_case(path: &Path) -> Result<CaseFile> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading case file {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let case = if is_json {
        CaseFile::from_json_str(&text)
    } else {
        CaseFile::from_toml_str(&text)
    };
    case.with_context(|| format!("parsing case file {}", path.display()))
}
