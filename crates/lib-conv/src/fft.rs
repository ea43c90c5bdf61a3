//! FFT/IFFT operations using rustfft.
//!
//! This module provides a thin wrapper around rustfft and realfft with:
//! - Planner caching for repeated transforms of the same size
//! - Real-to-complex and complex-to-real transforms with zero-padding
//! - Normalized inverse real transforms
//! - Shared complex plans for callers that run their own transforms

use crate::error::{ConvError, ConvResult};
use num_complex::Complex64;
use realfft::RealFftPlanner;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// FFT engine with cached planners.
pub struct FftEngine {
    /// Complex FFT planner.
    complex_planner: FftPlanner<f64>,

    /// Real FFT planner.
    real_planner: RealFftPlanner<f64>,
}

impl FftEngine {
    /// Create a new FFT engine.
    pub fn new() -> Self {
        Self {
            complex_planner: FftPlanner::new(),
            real_planner: RealFftPlanner::new(),
        }
    }

    /// Perform forward real-to-complex FFT of `data` zero-padded to `len`.
    ///
    /// Input: up to `len` real samples
    /// Output: `len / 2 + 1` complex samples (Hermitian symmetry exploited)
    pub fn rfft(&mut self, data: &[f64], len: usize) -> ConvResult<Vec<Complex64>> {
        let len = check_size(len)?;
        if data.len() > len {
            return Err(ConvError::InvalidConfig(format!(
                "cannot zero-pad {} samples down to transform size {}",
                data.len(),
                len
            )));
        }

        let r2c = self.real_planner.plan_fft_forward(len);
        let mut input = zero_pad(data, len);
        let mut output = r2c.make_output_vec();

        r2c.process(&mut input, &mut output)
            .map_err(|e| ConvError::NumericalInstability(e.to_string()))?;

        Ok(output)
    }

    /// Perform inverse complex-to-real FFT.
    ///
    /// Input: `output_len / 2 + 1` complex samples
    /// Output: `output_len` real samples, normalized by `1 / output_len`
    pub fn irfft(&mut self, data: &[Complex64], output_len: usize) -> ConvResult<Vec<f64>> {
        let output_len = check_size(output_len)?;

        let expected_input_len = output_len / 2 + 1;
        if data.len() != expected_input_len {
            return Err(ConvError::LengthMismatch {
                expected: expected_input_len,
                actual: data.len(),
            });
        }

        let c2r = self.real_planner.plan_fft_inverse(output_len);
        let mut input = data.to_vec();
        // The DC and Nyquist bins of a real signal are purely real; rounding
        // in the pointwise product can leave a tiny imaginary residue that
        // realfft rejects.
        input[0].im = 0.0;
        if let Some(last) = input.last_mut() {
            last.im = 0.0;
        }
        let mut output = c2r.make_output_vec();

        c2r.process(&mut input, &mut output)
            .map_err(|e| ConvError::NumericalInstability(e.to_string()))?;

        // Normalize
        let scale = 1.0 / output_len as f64;
        for x in output.iter_mut() {
            *x *= scale;
        }

        Ok(output)
    }

    /// Get a cached forward FFT plan.
    pub fn get_fft_forward(&mut self, len: usize) -> Arc<dyn Fft<f64>> {
        self.complex_planner.plan_fft_forward(len)
    }

    /// Get a cached inverse FFT plan.
    pub fn get_fft_inverse(&mut self, len: usize) -> Arc<dyn Fft<f64>> {
        self.complex_planner.plan_fft_inverse(len)
    }
}

impl Default for FftEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn check_size(len: usize) -> ConvResult<usize> {
    if len == 0 || !len.is_power_of_two() {
        return Err(ConvError::InvalidFftSize(len));
    }
    Ok(len)
}

/// Zero-pad a signal to a specific length.
pub fn zero_pad(signal: &[f64], new_len: usize) -> Vec<f64> {
    let mut result = signal.to_vec();
    if new_len > signal.len() {
        result.resize(new_len, 0.0);
    }
    result
}
