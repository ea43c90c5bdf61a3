//! Result output formatting and writing.

use crate::orchestrator::{ConvolutionResult, MethodDeviation};
use crate::OutputFormat;
use anyhow::{Context, Result};
use std::io::Write;

/// Write one result in `format`.
///
/// JSON has no NaN or infinity; such samples are written as `null`.
pub fn write_result<W: Write>(w: &mut W, result: &ConvolutionResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for v in &result.values {
                writeln!(w, "{}", v)?;
            }
        }
        OutputFormat::Json => {
            writeln!(w, "{}", serde_json::to_string(result)?)?;
        }
        OutputFormat::Csv => {
            writeln!(w, "index,value")?;
            for (i, v) in result.values.iter().enumerate() {
                writeln!(w, "{},{}", i, v)?;
            }
        }
    }
    Ok(())
}

/// Write each result to its own output file, or to `out` when it has none.
pub fn write_results<W: Write>(out: &mut W, results: &[ConvolutionResult], format: OutputFormat) -> Result<()> {
    for result in results {
        match &result.output {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create output directory {:?}", parent))?;
                }
                let mut f = std::fs::File::create(path)
                    .with_context(|| format!("Failed to create output file {:?}", path))?;
                write_result(&mut f, result, format)?;
                tracing::info!("Wrote '{}' ({} samples) to {:?}", result.name, result.len, path);
            }
            None => {
                if results.len() > 1 && matches!(format, OutputFormat::Text | OutputFormat::Csv) {
                    writeln!(out, "# {}", result.name)?;
                }
                write_result(out, result, format)?;
            }
        }
    }

    Ok(())
}

/// Write a method comparison report.
pub fn write_check<W: Write>(w: &mut W, report: &[MethodDeviation], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(w, "Method Agreement (vs direct)")?;
            writeln!(w, "============================")?;
            for entry in report {
                writeln!(w, "{:<14} max |Δ| = {:.3e}", entry.method.as_str(), entry.max_abs_deviation)?;
            }
        }
        OutputFormat::Json => {
            writeln!(w, "{}", serde_json::to_string_pretty(report)?)?;
        }
        OutputFormat::Csv => {
            writeln!(w, "method,max_abs_deviation")?;
            for entry in report {
                writeln!(w, "{},{}", entry.method, entry.max_abs_deviation)?;
            }
        }
    }
    Ok(())
}
