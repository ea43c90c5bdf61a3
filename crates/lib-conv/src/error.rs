//! Error types for convolution operations.

use thiserror::Error;

/// Errors that can occur during convolution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConvError {
    /// A string argument did not name one of the accepted values.
    ///
    /// `name` identifies the argument (`"shape"`, `"method"`), `value` is
    /// the rejected input verbatim.
    #[error("{} must be {}, got '{}'", capitalize(.name), expected_values(.name), .value)]
    InvalidArgument { name: &'static str, value: String },

    /// FFT size is not a power of 2.
    #[error("FFT size must be power of 2, got {0}")]
    InvalidFftSize(usize),

    /// Input length mismatch.
    #[error("Input length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Insufficient data for operation.
    #[error("Insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Engine configuration is inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The transform backend rejected its buffers.
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),
}

impl ConvError {
    /// Build the error for an unrecognized shape string.
    pub fn invalid_shape(value: impl Into<String>) -> Self {
        ConvError::InvalidArgument {
            name: "shape",
            value: value.into(),
        }
    }

    /// Build the error for an unrecognized method string.
    pub fn invalid_method(value: impl Into<String>) -> Self {
        ConvError::InvalidArgument {
            name: "method",
            value: value.into(),
        }
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn expected_values(name: &str) -> &'static str {
    match name {
        "shape" => "'full', 'same', or 'valid'",
        "method" => "'auto', 'direct', 'fft', or 'overlap-save'",
        _ => "a recognized value",
    }
}

/// Result type for convolution operations.
pub type ConvResult<T> = Result<T, ConvError>;
