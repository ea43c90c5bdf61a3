//! Overlap-save convolution with a pre-transformed kernel.
//!
//! A [`ConvolutionEngine`] transforms its kernel once and then convolves any
//! number of inputs against it. Long inputs are cut into FFT-sized chunks
//! that overlap by `kernel_len - 1` samples; each chunk is processed
//! independently (in parallel with Rayon when there are enough of them) and
//! the circularly-aliased head of every chunk is discarded.

use crate::error::{ConvError, ConvResult};
use crate::fft::FftEngine;
use crate::shape::Shape;
use num_complex::Complex64;
use rayon::prelude::*;
use rustfft::Fft;
use std::sync::Arc;

/// Smallest FFT size chosen by [`FftSizeStrategy::Auto`].
pub const MIN_AUTO_FFT_SIZE: usize = 1024;

/// FFT sizing strategy for the overlap-save engine.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FftSizeStrategy {
    /// Automatic sizing: 4x kernel length, minimum 1024.
    ///
    /// Keeps the discarded overlap at or below a quarter of each chunk.
    #[default]
    Auto,

    /// User-specified fixed size.
    ///
    /// Must be a power of 2 and at least the kernel length.
    Fixed { size: usize },
}

/// Convolution engine holding a pre-computed kernel spectrum.
pub struct ConvolutionEngine {
    /// Pre-computed FFT of the kernel.
    kernel_fft: Vec<Complex64>,

    /// FFT size (power of 2).
    fft_size: usize,

    /// Overlap size (kernel length - 1).
    overlap: usize,

    /// Valid output size per chunk.
    valid_size: usize,

    /// Original kernel length.
    kernel_len: usize,

    /// Cached FFT plans.
    fft_forward: Arc<dyn Fft<f64>>,
    fft_inverse: Arc<dyn Fft<f64>>,
}

impl ConvolutionEngine {
    /// Create an engine for `kernel` with automatic FFT sizing.
    pub fn new(kernel: &[f64]) -> ConvResult<Self> {
        Self::with_strategy(kernel, FftSizeStrategy::Auto)
    }

    /// Create an engine for `kernel` with an explicit FFT sizing strategy.
    pub fn with_strategy(kernel: &[f64], strategy: FftSizeStrategy) -> ConvResult<Self> {
        let kernel_len = kernel.len();
        if kernel_len == 0 {
            return Err(ConvError::InsufficientData { needed: 1, got: 0 });
        }

        let fft_size = match strategy {
            FftSizeStrategy::Auto => (kernel_len * 4).next_power_of_two().max(MIN_AUTO_FFT_SIZE),
            FftSizeStrategy::Fixed { size } => {
                if !size.is_power_of_two() {
                    return Err(ConvError::InvalidFftSize(size));
                }
                if size < kernel_len {
                    return Err(ConvError::InvalidConfig(format!(
                        "FFT size {} is smaller than kernel length {}",
                        size, kernel_len
                    )));
                }
                size
            }
        };
        let overlap = kernel_len - 1;
        let valid_size = fft_size - overlap;

        tracing::debug!(
            fft_size,
            kernel_len,
            valid_size,
            "prepared overlap-save engine"
        );

        let mut planner = FftEngine::new();
        let fft_forward = planner.get_fft_forward(fft_size);
        let fft_inverse = planner.get_fft_inverse(fft_size);

        let mut kernel_fft: Vec<Complex64> = kernel
            .iter()
            .map(|&v| Complex64::new(v, 0.0))
            .collect();
        kernel_fft.resize(fft_size, Complex64::new(0.0, 0.0));

        fft_forward.process(&mut kernel_fft);

        Ok(Self {
            kernel_fft,
            fft_size,
            overlap,
            valid_size,
            kernel_len,
            fft_forward,
            fft_inverse,
        })
    }

    /// Full linear convolution of `input` with the kernel.
    ///
    /// Returns `input.len() + kernel_len - 1` samples, or nothing for an
    /// empty input.
    pub fn convolve(&self, input: &[f64]) -> Vec<f64> {
        if input.is_empty() {
            return Vec::new();
        }

        let output_len = input.len() + self.overlap;
        let num_chunks = output_len.div_ceil(self.valid_size);

        if num_chunks <= 2 {
            self.convolve_sequential(input, output_len, num_chunks)
        } else {
            self.convolve_parallel(input, output_len, num_chunks)
        }
    }

    /// Convolve `input` and keep the window selected by `shape`.
    pub fn convolve_shaped(&self, input: &[f64], shape: Shape) -> Vec<f64> {
        let full = self.convolve(input);
        shape.trim(full, input.len(), self.kernel_len)
    }

    fn convolve_sequential(&self, input: &[f64], output_len: usize, num_chunks: usize) -> Vec<f64> {
        let mut output = vec![0.0; output_len];
        for chunk_idx in 0..num_chunks {
            let chunk_result = self.convolve_chunk(input, chunk_idx);
            self.scatter_valid(&mut output, chunk_idx, &chunk_result);
        }
        output
    }

    fn convolve_parallel(&self, input: &[f64], output_len: usize, num_chunks: usize) -> Vec<f64> {
        tracing::trace!(num_chunks, "overlap-save running in parallel");

        let chunk_results: Vec<(usize, Vec<f64>)> = (0..num_chunks)
            .into_par_iter()
            .map(|chunk_idx| (chunk_idx, self.convolve_chunk(input, chunk_idx)))
            .collect();

        let mut output = vec![0.0; output_len];
        for (chunk_idx, chunk_result) in chunk_results {
            self.scatter_valid(&mut output, chunk_idx, &chunk_result);
        }
        output
    }

    /// Circular convolution of the `chunk_idx`-th input window with the kernel.
    ///
    /// The window starts `overlap` samples before the chunk's first output
    /// sample; positions outside the input read as zero.
    fn convolve_chunk(&self, input: &[f64], chunk_idx: usize) -> Vec<f64> {
        let input_pos = (chunk_idx * self.valid_size) as isize - self.overlap as isize;

        let mut chunk_fft: Vec<Complex64> = (0..self.fft_size)
            .map(|i| {
                let src_idx = input_pos + i as isize;
                let v = if src_idx >= 0 {
                    input.get(src_idx as usize).copied().unwrap_or(0.0)
                } else {
                    0.0
                };
                Complex64::new(v, 0.0)
            })
            .collect();

        self.fft_forward.process(&mut chunk_fft);

        for (c, h) in chunk_fft.iter_mut().zip(self.kernel_fft.iter()) {
            *c *= *h;
        }

        self.fft_inverse.process(&mut chunk_fft);

        let scale = 1.0 / self.fft_size as f64;
        chunk_fft.iter().map(|c| c.re * scale).collect()
    }

    /// Copy the non-aliased tail of a chunk result into `output`.
    fn scatter_valid(&self, output: &mut [f64], chunk_idx: usize, chunk_result: &[f64]) {
        let output_start = chunk_idx * self.valid_size;
        let take = self.valid_size.min(output.len().saturating_sub(output_start));
        output[output_start..output_start + take]
            .copy_from_slice(&chunk_result[self.overlap..self.overlap + take]);
    }

    /// Get the kernel length.
    pub fn kernel_length(&self) -> usize {
        self.kernel_len
    }

    /// Get the FFT size being used.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }
}
