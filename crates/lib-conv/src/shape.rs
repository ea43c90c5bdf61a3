//! Output shape selection for linear convolution.
//!
//! The full linear convolution of sequences of length `n` and `m` has
//! `n + m - 1` samples. A [`Shape`] selects a contiguous window of it:
//!
//! ```text
//! full : c[0 .. n+m-1]
//! same : c[(min-1)/2 .. (min-1)/2 + max]
//! valid: c[min-1 .. max]
//! ```
//!
//! with `min = min(n, m)` and `max = max(n, m)`. The `same` window starts
//! `floor((min - 1) / 2)` samples in, so for an even-length shorter operand
//! the extra sample is kept on the right.

use crate::error::{ConvError, ConvResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Which part of the full convolution to return.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Shape {
    /// The complete convolution, `n + m - 1` samples.
    #[default]
    Full,
    /// The central part, as long as the longer operand.
    Same,
    /// Only samples computed without zero-padding.
    Valid,
}

impl Shape {
    /// All shapes, in declaration order.
    pub const ALL: [Shape; 3] = [Shape::Full, Shape::Same, Shape::Valid];

    /// The literal this shape is parsed from.
    pub fn as_str(&self) -> &'static str {
        match self {
            Shape::Full => "full",
            Shape::Same => "same",
            Shape::Valid => "valid",
        }
    }

    /// Number of output samples for operands of length `n` and `m`.
    ///
    /// Zero whenever either operand is empty.
    pub fn output_len(&self, n: usize, m: usize) -> usize {
        self.window(n, m).len()
    }

    /// Index range into the full convolution selected by this shape.
    pub fn window(&self, n: usize, m: usize) -> Range<usize> {
        if n == 0 || m == 0 {
            return 0..0;
        }

        let (short, long) = if n <= m { (n, m) } else { (m, n) };
        let full_len = n + m - 1;

        match self {
            Shape::Full => 0..full_len,
            Shape::Same => {
                let start = (short - 1) / 2;
                start..start + long
            }
            Shape::Valid => (short - 1)..long,
        }
    }

    /// Copy this shape's window out of a full convolution result.
    pub fn slice(&self, full: &[f64], n: usize, m: usize) -> ConvResult<Vec<f64>> {
        let expected = if n == 0 || m == 0 { 0 } else { n + m - 1 };
        if full.len() != expected {
            return Err(ConvError::LengthMismatch {
                expected,
                actual: full.len(),
            });
        }
        Ok(full[self.window(n, m)].to_vec())
    }

    /// Trim an owned full result in place, avoiding a copy for `Full`.
    pub(crate) fn trim(&self, mut full: Vec<f64>, n: usize, m: usize) -> Vec<f64> {
        let window = self.window(n, m);
        full.truncate(window.end);
        full.drain(..window.start);
        full
    }
}

impl FromStr for Shape {
    type Err = ConvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Shape::Full),
            "same" => Ok(Shape::Same),
            "valid" => Ok(Shape::Valid),
            other => Err(ConvError::invalid_shape(other)),
        }
    }
}

impl TryFrom<String> for Shape {
    type Error = ConvError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
