//! Job orchestration.

use crate::config::{JobConfig, JobFile};
use anyhow::{Context, Result};
use lib_conv::convolution::direct_convolve;
use lib_conv::{convolve_with, Method, Shape};
use serde::Serialize;
use std::path::PathBuf;

/// Result of one convolution.
#[derive(Clone, Debug, Serialize)]
pub struct ConvolutionResult {
    /// Job name, or `"run"` for a one-off command-line convolution.
    pub name: String,
    pub shape: Shape,
    /// Method as requested.
    pub method: Method,
    /// Method actually used after resolving `auto`.
    pub resolved: Method,
    pub len: usize,
    pub values: Vec<f64>,
    /// Destination file, stdout if absent.
    #[serde(skip)]
    pub output: Option<PathBuf>,
}

impl ConvolutionResult {
    /// Convolve `a` with `b`, recording how it was done.
    pub fn compute(name: &str, a: &[f64], b: &[f64], shape: Shape, method: Method) -> Result<Self> {
        let values = convolve_with(a, b, shape, method)
            .with_context(|| format!("Convolution '{}' failed", name))?;
        Ok(Self {
            name: name.to_string(),
            shape,
            method,
            resolved: method.resolve(a, b),
            len: values.len(),
            values,
            output: None,
        })
    }
}

/// Job file orchestrator.
pub struct Orchestrator {
    config: JobFile,
}

impl Orchestrator {
    /// Create a new orchestrator.
    pub fn new(config: JobFile) -> Self {
        Self { config }
    }

    /// Run every job in file order, stopping at the first failure.
    pub fn run(&self) -> Result<Vec<ConvolutionResult>> {
        tracing::info!("Running {} job(s)", self.config.jobs.len());

        let results = self
            .config
            .jobs
            .iter()
            .map(run_job)
            .collect::<Result<Vec<_>>>()?;

        tracing::info!("All jobs complete");
        Ok(results)
    }
}

fn run_job(job: &JobConfig) -> Result<ConvolutionResult> {
    let a = job
        .a
        .load()
        .with_context(|| format!("Job '{}': failed to load operand a", job.name))?;
    let b = job
        .b
        .load()
        .with_context(|| format!("Job '{}': failed to load operand b", job.name))?;

    tracing::info!(
        "Job '{}': n={}, m={}, shape={}, method={}",
        job.name,
        a.len(),
        b.len(),
        job.shape,
        job.method
    );

    let mut result = ConvolutionResult::compute(&job.name, &a, &b, job.shape, job.method)?;
    result.output = job.output.clone();
    Ok(result)
}

/// Deviation of one method from the direct sum.
#[derive(Clone, Debug, Serialize)]
pub struct MethodDeviation {
    pub method: Method,
    pub max_abs_deviation: f64,
}

/// Compare every concrete method against the direct sum on `a` and `b`.
///
/// NaN outputs count as a NaN deviation, so any method that smears a
/// non-finite input shows up in the report.
pub fn check_methods(a: &[f64], b: &[f64]) -> Result<Vec<MethodDeviation>> {
    let reference = direct_convolve(a, b);

    [Method::Fft, Method::OverlapSave, Method::Auto]
        .into_iter()
        .map(|method| -> Result<MethodDeviation> {
            let values = convolve_with(a, b, Shape::Full, method)?;
            Ok(MethodDeviation {
                method,
                max_abs_deviation: max_deviation(&values, &reference),
            })
        })
        .collect()
}

/// Largest absolute difference; NaN if any pair disagrees on being NaN.
fn max_deviation(values: &[f64], reference: &[f64]) -> f64 {
    let mut worst = 0.0f64;
    for (&v, &r) in values.iter().zip(reference.iter()) {
        if v == r || (v.is_nan() && r.is_nan()) {
            continue;
        }
        let d = (v - r).abs();
        if d.is_nan() {
            return f64::NAN;
        }
        worst = worst.max(d);
    }
    worst
}
