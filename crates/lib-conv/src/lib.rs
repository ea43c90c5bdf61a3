//! # lib-conv
//!
//! One-dimensional linear convolution of real sequences.
//!
//! This crate provides:
//!
//! - **Shapes**: `full`, `same` and `valid` windows of the full convolution
//! - **Convolution**: direct and FFT-based kernels behind one entry point
//! - **Overlap-save**: a reusable engine with a pre-transformed kernel,
//!   parallelised with Rayon for long inputs
//! - **FFT/IFFT**: planner-caching wrappers over rustfft and realfft

pub mod error;
pub mod shape;
pub mod fft;
pub mod convolution;
pub mod engine;

pub use error::{ConvError, ConvResult};
pub use shape::Shape;
pub use fft::FftEngine;
pub use convolution::{convolve, convolve_named, convolve_with, Method};
pub use engine::{ConvolutionEngine, FftSizeStrategy};
