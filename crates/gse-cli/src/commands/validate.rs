use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Result};
use gse_algo::StateLayout;
use gse_cli::case::load_case;
use gse_core::diagnostics::CATEGORIES;
use gse_core::{MeasurementSet, NetworkModel};
use tabwriter::TabWriter;

/// Build the model and measurement set without estimating, and report
/// whether the case has enough measurement rows to be solved.
pub fn handle(case_path: &Path) -> Result<()> {
    let case = load_case(case_path)?;
    case.config.validate()?;
    let model = NetworkModel::new(&case.network(), case.config.system_frequency)?;
    let measurements = MeasurementSet::new(&model, &case.measurements())?;

    let states = StateLayout::new(&model).len();
    let rows = measurements.row_count();

    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "Nodes\t{}", model.node_count())?;
    writeln!(writer, "Lines\t{}", model.branches().len())?;
    writeln!(writer, "Loads\t{}", model.loads().len())?;
    writeln!(writer, "Sources\t{}", model.sources().len())?;
    writeln!(writer, "Islands\t{}", model.islands().len())?;
    writeln!(writer, "Sensors\t{}", measurements.len())?;
    writeln!(writer, "Measurement rows\t{rows}")?;
    writeln!(writer, "State variables\t{states}")?;
    if states > 0 {
        writeln!(writer, "Redundancy\t{:.2}", rows as f64 / states as f64)?;
    }
    writeln!(writer)?;
    writeln!(writer, "Island\tNodes\tReference node\tSource")?;
    for (idx, island) in model.islands().iter().enumerate() {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}",
            idx + 1,
            island.nodes.len(),
            model.nodes()[island.reference].id.value(),
            model.sources()[island.source].id.value(),
        )?;
    }
    writer.flush()?;

    let mut diagnostics = model.diagnostics().clone();
    diagnostics.merge(measurements.diagnostics().clone());
    println!("Diagnostics: {}", diagnostics.summary());
    for category in CATEGORIES {
        let issues: Vec<_> = diagnostics.issues_by_category(category).collect();
        if issues.is_empty() {
            continue;
        }
        println!("  {category} ({})", issues.len());
        for issue in issues {
            match &issue.entity {
                Some(entity) => println!("    {entity}: {}", issue.message),
                None => println!("    {}", issue.message),
            }
        }
    }

    if rows < states {
        bail!("underdetermined: {rows} measurement rows for {states} state variables");
    }
    println!("Case is valid");
    Ok(())
}
