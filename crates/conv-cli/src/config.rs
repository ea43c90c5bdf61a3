//! Job file loading and validation.
//!
//! A job file lists one or more convolutions:
//!
//! ```toml
//! [[job]]
//! name = "smooth"
//! a = "data/signal.csv"
//! b = [0.25, 0.5, 0.25]
//! shape = "same"
//! method = "auto"
//! output = "out/smooth.csv"
//! ```
//!
//! Relative paths are resolved against the directory holding the job file.

use crate::input::read_sequence_file;
use anyhow::{Context, Result};
use lib_conv::{Method, Shape};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Top-level job file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobFile {
    /// Jobs, run in file order.
    #[serde(rename = "job", default)]
    pub jobs: Vec<JobConfig>,
}

/// A single convolution job.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobConfig {
    /// Job name, unique within the file.
    pub name: String,

    /// First operand.
    pub a: SequenceSource,

    /// Second operand.
    pub b: SequenceSource,

    /// Output window.
    #[serde(default)]
    pub shape: Shape,

    /// Convolution algorithm.
    #[serde(default)]
    pub method: Method,

    /// Where to write the result; stdout if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

/// Where an operand's samples come from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SequenceSource {
    /// Samples given directly in the job file.
    Inline(Vec<f64>),
    /// Path to a sequence file.
    File(PathBuf),
}

impl SequenceSource {
    /// Materialize the samples.
    pub fn load(&self) -> Result<Vec<f64>> {
        match self {
            SequenceSource::Inline(values) => Ok(values.clone()),
            SequenceSource::File(path) => read_sequence_file(path),
        }
    }

    fn resolve_against(&mut self, base: &Path) {
        if let SequenceSource::File(path) = self {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// Load a job file (TOML, or JSON by `.json` extension).
pub fn load_config(path: &Path) -> Result<JobFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read job file: {:?}", path))?;

    let mut config: JobFile = if path.extension().map_or(false, |e| e == "json") {
        serde_json::from_str(&content).with_context(|| "Failed to parse job file as JSON")?
    } else {
        // Assume TOML
        toml::from_str(&content).with_context(|| "Failed to parse job file as TOML")?
    };

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    for job in &mut config.jobs {
        job.a.resolve_against(base);
        job.b.resolve_against(base);
        if let Some(output) = job.output.as_mut() {
            if output.is_relative() {
                *output = base.join(&*output);
            }
        }
    }

    validate_config(&config)?;

    Ok(config)
}

/// Validate a loaded job file.
fn validate_config(config: &JobFile) -> Result<()> {
    if config.jobs.is_empty() {
        anyhow::bail!("Job file contains no [[job]] entries");
    }

    let mut names = HashSet::new();
    for job in &config.jobs {
        if job.name.trim().is_empty() {
            anyhow::bail!("Job names must not be empty");
        }
        if !names.insert(job.name.as_str()) {
            anyhow::bail!("Duplicate job name: {}", job.name);
        }
        validate_source(&job.a, &job.name, "a")?;
        validate_source(&job.b, &job.name, "b")?;
    }

    Ok(())
}

fn validate_source(source: &SequenceSource, job: &str, operand: &str) -> Result<()> {
    if let SequenceSource::File(path) = source {
        if !path.is_file() {
            anyhow::bail!("Job '{}': operand {} file not found: {:?}", job, operand, path);
        }
    }
    Ok(())
}
