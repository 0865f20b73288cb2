use std::io::Write;
use std::time::Instant;

use anyhow::Result;
use gse_algo::{estimate, EstimationOutput};
use gse_cli::case::load_case;
use gse_cli::cli::{EstimateArgs, OutputFormat};
use tabwriter::TabWriter;
use tracing::info;

use crate::commands::open_output;

pub fn handle(args: &EstimateArgs) -> Result<()> {
    let start = Instant::now();
    let case = load_case(&args.case)?;

    let mut config = case.config.clone();
    if let Some(max_iterations) = args.max_iterations {
        config = config.with_max_iterations(max_iterations);
    }
    if let Some(tolerance) = args.tolerance {
        config = config.with_tolerance(tolerance);
    }
    if let Some(frequency) = args.frequency {
        config = config.with_system_frequency(frequency);
    }

    info!(case = %args.case.display(), "estimating state");
    let output = estimate(&case.network(), &case.measurements(), &config)?;

    let mut writer = open_output(args.out.as_deref())?;
    match args.format {
        OutputFormat::Table => write_tables(&mut writer, &output)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, &output)?;
            writeln!(writer)?;
        }
    }
    writer.flush()?;

    if let Some(out) = &args.out {
        info!("wrote results to {}", out.display());
    }
    info!(
        elapsed_ms = start.elapsed().as_secs_f64() * 1e3,
        "estimation finished"
    );
    Ok(())
}

fn write_tables(out: &mut dyn Write, output: &EstimationOutput) -> Result<()> {
    let mut writer = TabWriter::new(out);

    writeln!(writer, "Node\tU (kV)\tU (pu)\tAngle (deg)\tP (MW)\tQ (Mvar)")?;
    for node in &output.nodes {
        writeln!(
            writer,
            "{}\t{:.4}\t{:.5}\t{:.4}\t{:.4}\t{:.4}",
            node.id.value(),
            node.u.value() / 1e3,
            node.u_pu.value(),
            node.u_angle.to_degrees(),
            node.p.value() / 1e6,
            node.q.value() / 1e6,
        )?;
    }

    writeln!(writer)?;
    writeln!(
        writer,
        "Line\tP from (MW)\tQ from (Mvar)\tI from (A)\tP to (MW)\tQ to (Mvar)\tI to (A)\tLoading (%)"
    )?;
    for branch in &output.branches {
        writeln!(
            writer,
            "{}\t{:.4}\t{:.4}\t{:.1}\t{:.4}\t{:.4}\t{:.1}\t{:.1}",
            branch.id.value(),
            branch.p_from.value() / 1e6,
            branch.q_from.value() / 1e6,
            branch.i_from.value(),
            branch.p_to.value() / 1e6,
            branch.q_to.value() / 1e6,
            branch.i_to.value(),
            branch.loading * 100.0,
        )?;
    }

    if !output.loads.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "Load\tP (MW)\tQ (Mvar)\tI (A)\tPF")?;
        for load in &output.loads {
            writeln!(
                writer,
                "{}\t{:.4}\t{:.4}\t{:.1}\t{:.3}",
                load.id.value(),
                load.p.value() / 1e6,
                load.q.value() / 1e6,
                load.i.value(),
                load.pf,
            )?;
        }
    }

    writeln!(writer)?;
    writeln!(writer, "Source\tP (MW)\tQ (Mvar)\tI (A)\tS (MVA)")?;
    for source in &output.sources {
        writeln!(
            writer,
            "{}\t{:.4}\t{:.4}\t{:.1}\t{:.4}",
            source.id.value(),
            source.p.value() / 1e6,
            source.q.value() / 1e6,
            source.i.value(),
            source.s.value() / 1e6,
        )?;
    }

    let worst = output
        .residuals
        .iter()
        .max_by(|a, b| {
            a.normalized_residual
                .abs()
                .total_cmp(&b.normalized_residual.abs())
        });
    writeln!(writer)?;
    writeln!(
        writer,
        "Converged in {} iterations\tobjective {:.4}\t{} degrees of freedom",
        output.iterations, output.objective, output.degrees_of_freedom
    )?;
    if let Some(worst) = worst {
        writeln!(
            writer,
            "Largest normalized residual\t{:.3}\tsensor {}",
            worst.normalized_residual,
            worst.sensor.value()
        )?;
    }
    writer.flush()?;
    Ok(())
}
