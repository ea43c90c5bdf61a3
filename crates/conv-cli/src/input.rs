//! Sequence loading from files and inline lists.
//!
//! Accepted text layout: numbers separated by commas, whitespace or
//! newlines. Lines starting with `#` are comments. A first non-comment line
//! that does not parse as numbers is taken as a CSV header and skipped.
//! `nan`, `inf` and `-inf` are accepted in any case.

use anyhow::{Context, Result};
use std::path::Path;

/// Load a sequence from `source`: a path to an existing file, or an inline list.
///
/// Inline lists get no header skipping; every token must be a number.
pub fn load_sequence(source: &str) -> Result<Vec<f64>> {
    let path = Path::new(source);
    if path.is_file() {
        tracing::debug!("Reading sequence from {:?}", path);
        return read_sequence_file(path);
    }
    parse_line(source).with_context(|| format!("'{}' is neither a file nor a number list", source))
}

/// Read and parse a sequence file.
pub fn read_sequence_file(path: &Path) -> Result<Vec<f64>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read sequence file: {:?}", path))?;
    parse_sequence(&content).with_context(|| format!("Failed to parse sequence file: {:?}", path))
}

/// Parse numbers out of `text`.
pub fn parse_sequence(text: &str) -> Result<Vec<f64>> {
    let mut values = Vec::new();
    let mut seen_data = false;

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_line(line) {
            Ok(parsed) => {
                values.extend(parsed);
                seen_data = true;
            }
            Err(_) if !seen_data => {
                tracing::debug!("Skipping header line {}: {:?}", line_no + 1, line);
                seen_data = true;
            }
            Err(e) => return Err(e).with_context(|| format!("line {}", line_no + 1)),
        }
    }

    Ok(values)
}

fn parse_line(line: &str) -> Result<Vec<f64>> {
    line.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|tok| !tok.is_empty())
        .map(|tok| {
            tok.parse::<f64>()
                .with_context(|| format!("invalid number '{}'", tok))
        })
        .collect()
}
