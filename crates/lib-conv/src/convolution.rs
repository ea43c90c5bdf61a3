//! Linear convolution of two real sequences.
//!
//! Three kernels compute the same full convolution:
//!
//! - [`direct_convolve`]: O(n*m) double sum
//! - [`fft_convolve`]: single zero-padded real FFT, O((n+m) log(n+m))
//! - [`ConvolutionEngine`]: overlap-save over the longer operand
//!
//! [`convolve_with`] picks one according to a [`Method`] and trims the
//! result to the requested [`Shape`].

use crate::engine::ConvolutionEngine;
use crate::error::{ConvError, ConvResult};
use crate::fft::FftEngine;
use crate::shape::Shape;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Below this shorter-operand length the direct sum beats an FFT.
pub const DIRECT_THRESHOLD: usize = 64;

/// Longer-operand length from which overlap-save is preferred.
pub const OVERLAP_SAVE_MIN_LEN: usize = 1 << 16;

/// Length ratio (longer / shorter) from which overlap-save is preferred.
const OVERLAP_SAVE_RATIO: usize = 8;

/// Convolution algorithm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", try_from = "String")]
pub enum Method {
    /// Choose from the operand lengths and contents.
    #[default]
    Auto,
    /// Direct double sum.
    Direct,
    /// Single zero-padded FFT.
    Fft,
    /// Chunked FFT with the shorter operand as kernel.
    OverlapSave,
}

impl Method {
    /// All methods, in declaration order.
    pub const ALL: [Method; 4] = [
        Method::Auto,
        Method::Direct,
        Method::Fft,
        Method::OverlapSave,
    ];

    /// The literal this method is parsed from.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Auto => "auto",
            Method::Direct => "direct",
            Method::Fft => "fft",
            Method::OverlapSave => "overlap-save",
        }
    }

    /// Resolve `Auto` to a concrete method for these operands.
    ///
    /// Non-finite values force the direct sum so that NaN and infinity reach
    /// only the output samples whose sums include them; a transform would
    /// smear them over the whole result.
    pub fn resolve(self, a: &[f64], b: &[f64]) -> Method {
        if self != Method::Auto {
            return self;
        }

        let (short, long) = if a.len() <= b.len() {
            (a.len(), b.len())
        } else {
            (b.len(), a.len())
        };

        if short < DIRECT_THRESHOLD || !all_finite(a) || !all_finite(b) {
            Method::Direct
        } else if long >= OVERLAP_SAVE_MIN_LEN && long >= OVERLAP_SAVE_RATIO * short {
            Method::OverlapSave
        } else {
            Method::Fft
        }
    }
}

impl FromStr for Method {
    type Err = ConvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Method::Auto),
            "direct" => Ok(Method::Direct),
            "fft" => Ok(Method::Fft),
            "overlap-save" => Ok(Method::OverlapSave),
            other => Err(ConvError::invalid_method(other)),
        }
    }
}

impl TryFrom<String> for Method {
    type Error = ConvError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

/// Convolve `a` with `b` and return the window selected by `shape`.
///
/// Uses [`Method::Auto`]. Either operand being empty yields an empty result.
///
/// ```
/// use lib_conv::{convolve, Shape};
///
/// let a = [1.0, 2.0, 3.0];
/// let b = [0.0, 1.0, 0.5];
/// assert_eq!(convolve(&a, &b, Shape::Full).unwrap(), vec![0.0, 1.0, 2.5, 4.0, 1.5]);
/// assert_eq!(convolve(&a, &b, Shape::Same).unwrap(), vec![1.0, 2.5, 4.0]);
/// assert_eq!(convolve(&a, &b, Shape::Valid).unwrap(), vec![2.5]);
/// ```
pub fn convolve(a: &[f64], b: &[f64], shape: Shape) -> ConvResult<Vec<f64>> {
    convolve_with(a, b, shape, Method::Auto)
}

/// Convolve `a` with `b` using an explicit algorithm.
pub fn convolve_with(a: &[f64], b: &[f64], shape: Shape, method: Method) -> ConvResult<Vec<f64>> {
    if a.is_empty() || b.is_empty() {
        return Ok(Vec::new());
    }

    let resolved = method.resolve(a, b);
    tracing::debug!(
        n = a.len(),
        m = b.len(),
        %shape,
        requested = %method,
        method = %resolved,
        "convolving"
    );

    let full = match resolved {
        Method::Direct | Method::Auto => direct_convolve(a, b),
        Method::Fft | Method::OverlapSave => transform_convolve(a, b, resolved)?,
    };

    Ok(shape.trim(full, a.len(), b.len()))
}

/// FFT-based convolution on operands rescaled by powers of two.
///
/// Each operand is divided by a power of two near its largest magnitude so
/// the spectra stay far from overflow; the product of the two factors is
/// applied to the result afterwards. Power-of-two scaling is exact, so the
/// result differs from the unscaled transform only where that one overflows.
fn transform_convolve(a: &[f64], b: &[f64], method: Method) -> ConvResult<Vec<f64>> {
    let (a_scaled, a_exp) = normalize(a);
    let (b_scaled, b_exp) = normalize(b);

    let mut full = match method {
        Method::OverlapSave => {
            let (signal, kernel) = if a_scaled.len() >= b_scaled.len() {
                (&a_scaled, &b_scaled)
            } else {
                (&b_scaled, &a_scaled)
            };
            ConvolutionEngine::new(kernel)?.convolve(signal)
        }
        _ => fft_convolve(&a_scaled, &b_scaled)?,
    };

    let exp = a_exp + b_exp;
    if exp != 0 {
        tracing::trace!(a_exp, b_exp, "rescaling transform output");
        for v in full.iter_mut() {
            *v = mul_pow2(*v, exp);
        }
    }
    Ok(full)
}

/// Scale `values` so the largest magnitude is at most 1.
///
/// Returns the scaled copy and the exponent `e` with `values = scaled * 2^e`.
/// Operands that are all zero or hold NaN/infinity are left as they are.
fn normalize(values: &[f64]) -> (Vec<f64>, i32) {
    let max = values.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    if max == 0.0 || !all_finite(values) {
        return (values.to_vec(), 0);
    }

    let exp = max.log2().ceil() as i32;
    let scaled = values.iter().map(|&v| mul_pow2(v, -exp)).collect();
    (scaled, exp)
}

/// `x * 2^exp`, stepping so that no intermediate power of two overflows.
fn mul_pow2(mut x: f64, mut exp: i32) -> f64 {
    const STEP: i32 = 1000;
    while exp > STEP {
        x *= 2f64.powi(STEP);
        exp -= STEP;
    }
    while exp < -STEP {
        x *= 2f64.powi(-STEP);
        exp += STEP;
    }
    x * 2f64.powi(exp)
}

/// Convolve with the shape given as a string.
///
/// The shape must be exactly `"full"`, `"same"` or `"valid"`; anything else
/// fails with [`ConvError::InvalidArgument`] before any computation.
pub fn convolve_named(a: &[f64], b: &[f64], shape: &str) -> ConvResult<Vec<f64>> {
    let shape: Shape = shape.parse()?;
    convolve(a, b, shape)
}

/// Direct convolution.
///
/// This is O(n*m); exact up to the rounding of each multiply-add.
///
/// Each output sample sums its products pairwise from both ends of the
/// overlap inwards. Swapping the operands reverses the product order, which
/// leaves every pair unchanged, so `direct_convolve(a, b)` and
/// `direct_convolve(b, a)` agree bit for bit.
pub fn direct_convolve(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    if signal.is_empty() || kernel.is_empty() {
        return Vec::new();
    }

    let output_len = signal.len() + kernel.len() - 1;
    let mut output = vec![0.0; output_len];

    for (k, out) in output.iter_mut().enumerate() {
        let (mut i, mut j) = (k.saturating_sub(kernel.len() - 1), k.min(signal.len() - 1));
        let mut acc = 0.0;
        while i < j {
            acc += signal[i] * kernel[k - i] + signal[j] * kernel[k - j];
            i += 1;
            j -= 1;
        }
        if i == j {
            acc += signal[i] * kernel[k - i];
        }
        *out = acc;
    }

    output
}

/// Simple FFT-based convolution (single chunk).
///
/// Both operands are zero-padded to the next power of two at or above
/// `n + m - 1`, multiplied in the frequency domain and transformed back.
pub fn fft_convolve(signal: &[f64], kernel: &[f64]) -> ConvResult<Vec<f64>> {
    if signal.is_empty() || kernel.is_empty() {
        return Ok(Vec::new());
    }

    let output_len = signal.len() + kernel.len() - 1;
    let fft_size = output_len.next_power_of_two();

    let mut engine = FftEngine::new();

    let mut signal_fft = engine.rfft(signal, fft_size)?;
    let kernel_fft = engine.rfft(kernel, fft_size)?;

    for (s, k) in signal_fft.iter_mut().zip(kernel_fft.iter()) {
        *s *= *k;
    }

    let mut output = engine.irfft(&signal_fft, fft_size)?;
    output.truncate(output_len);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f64], expected: &[f64], tol: f64) {
        assert_eq!(actual.len(), expected.len(), "length mismatch");
        for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
            assert!((a - e).abs() < tol, "Mismatch at index {}: {} vs {}", i, a, e);
        }
    }

    #[test]
    fn test_direct_convolve_impulse() {
        // Convolving with a delta function should return the input
        let signal = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let kernel = vec![1.0];

        let result = direct_convolve(&signal, &kernel);
        assert_eq!(result, signal);
    }

    #[test]
    fn test_direct_convolve_shift() {
        // Convolving with [0, 1] should shift by one sample
        let signal = vec![1.0, 2.0, 3.0, 4.0];
        let kernel = vec![0.0, 1.0];

        let result = direct_convolve(&signal, &kernel);
        assert_eq!(result, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_fft_convolve_matches_direct() {
        let signal = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let kernel = vec![1.0, 0.5, 0.25];

        let direct = direct_convolve(&signal, &kernel);
        let fft = fft_convolve(&signal, &kernel).unwrap();

        assert_close(&fft, &direct, 1e-10);
    }

    #[test]
    fn test_fft_convolve_single_samples() {
        // Transform size 1 is a valid power of two.
        let result = fft_convolve(&[3.0], &[-2.0]).unwrap();
        assert_close(&result, &[-6.0], 1e-12);
    }

    #[test]
    fn test_reference_vectors_every_method() {
        let a = [1.0, 2.0, 3.0];
        let b = [0.0, 1.0, 0.5];

        for method in Method::ALL {
            let full = convolve_with(&a, &b, Shape::Full, method).unwrap();
            let same = convolve_with(&a, &b, Shape::Same, method).unwrap();
            let valid = convolve_with(&a, &b, Shape::Valid, method).unwrap();

            assert_close(&full, &[0.0, 1.0, 2.5, 4.0, 1.5], 1e-12);
            assert_close(&same, &[1.0, 2.5, 4.0], 1e-12);
            assert_close(&valid, &[2.5], 1e-12);
        }
    }

    #[test]
    fn test_even_length_kernel_offsets() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [1.0, 1.0, 1.0, 1.0];

        assert_eq!(
            convolve(&a, &b, Shape::Full).unwrap(),
            vec![1.0, 3.0, 6.0, 10.0, 9.0, 7.0, 4.0]
        );
        assert_eq!(convolve(&a, &b, Shape::Same).unwrap(), vec![3.0, 6.0, 10.0, 9.0]);
        assert_eq!(convolve(&a, &b, Shape::Valid).unwrap(), vec![10.0]);
    }

    #[test]
    fn test_shorter_first_operand() {
        let a = [1.0, -1.0];
        let b = [1.0, 2.0, 3.0, 4.0, 5.0];

        // full = [1, 1, 1, 1, 1, -5]
        assert_eq!(
            convolve(&a, &b, Shape::Full).unwrap(),
            vec![1.0, 1.0, 1.0, 1.0, 1.0, -5.0]
        );
        assert_eq!(
            convolve(&a, &b, Shape::Same).unwrap(),
            vec![1.0, 1.0, 1.0, 1.0, 1.0]
        );
        assert_eq!(convolve(&a, &b, Shape::Valid).unwrap(), vec![1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_empty_operands() {
        for method in Method::ALL {
            for shape in Shape::ALL {
                assert!(convolve_with(&[], &[1.0, 2.0], shape, method).unwrap().is_empty());
                assert!(convolve_with(&[1.0, 2.0], &[], shape, method).unwrap().is_empty());
                assert!(convolve_with(&[], &[], shape, method).unwrap().is_empty());
            }
        }
        assert!(direct_convolve(&[], &[1.0]).is_empty());
        assert!(fft_convolve(&[1.0], &[]).unwrap().is_empty());
    }

    #[test]
    fn test_convolve_named() {
        let a = [1.0, 2.0, 3.0];
        let b = [0.0, 1.0, 0.5];

        assert_eq!(convolve_named(&a, &b, "valid").unwrap(), vec![2.5]);

        let err = convolve_named(&a, &b, "bogus").unwrap_err();
        assert_eq!(err, ConvError::invalid_shape("bogus"));
        assert!(err.to_string().contains("'bogus'"));
    }

    #[test]
    fn test_convolve_named_rejects_before_computing_empty_inputs() {
        let err = convolve_named(&[], &[], "middle").unwrap_err();
        assert!(matches!(err, ConvError::InvalidArgument { name: "shape", .. }));
    }

    #[test]
    fn test_auto_resolution() {
        let short = vec![1.0; 8];
        let medium = vec![1.0; 256];
        let long = vec![1.0; OVERLAP_SAVE_MIN_LEN];

        assert_eq!(Method::Auto.resolve(&short, &medium), Method::Direct);
        assert_eq!(Method::Auto.resolve(&medium, &medium), Method::Fft);
        assert_eq!(Method::Auto.resolve(&medium, &long), Method::OverlapSave);
        assert_eq!(Method::Auto.resolve(&long, &medium), Method::OverlapSave);
        assert_eq!(Method::Fft.resolve(&short, &short), Method::Fft);
    }

    #[test]
    fn test_auto_uses_direct_for_non_finite() {
        let mut a = vec![1.0; 256];
        a[10] = f64::NAN;
        let b = vec![1.0; 256];

        assert_eq!(Method::Auto.resolve(&a, &b), Method::Direct);
    }

    #[test]
    fn test_auto_fft_survives_large_finite_inputs() {
        let a = vec![1e307; 64];
        let b = vec![1e-10; 64];
        assert_eq!(Method::Auto.resolve(&a, &b), Method::Fft);

        let direct = direct_convolve(&a, &b);
        for method in [Method::Auto, Method::Fft, Method::OverlapSave] {
            let out = convolve_with(&a, &b, Shape::Full, method).unwrap();
            assert_eq!(out.len(), 127);
            for (i, (o, d)) in out.iter().zip(direct.iter()).enumerate() {
                assert!(o.is_finite(), "{} produced {} at index {}", method, o, i);
                assert!((o - d).abs() <= 1e-12 * d.abs(), "{}: {} vs {} at {}", method, o, d, i);
            }
        }
    }

    #[test]
    fn test_transform_handles_tiny_inputs() {
        let a = vec![3e-290; 70];
        let b = vec![2e-10; 70];

        let direct = direct_convolve(&a, &b);
        let fft = convolve_with(&a, &b, Shape::Same, Method::Fft).unwrap();
        let expected = Shape::Same.slice(&direct, 70, 70).unwrap();
        for (f, d) in fft.iter().zip(expected.iter()) {
            assert!(*d > 0.0);
            assert!((f - d).abs() <= 1e-12 * d.abs(), "{} vs {}", f, d);
        }
    }

    #[test]
    fn test_mul_pow2_steps_past_exponent_range() {
        assert_eq!(mul_pow2(1.5, 0), 1.5);
        assert_eq!(mul_pow2(1.0, 1023), 2f64.powi(1023));
        assert_eq!(mul_pow2(mul_pow2(3.0, -1070), 1070), 3.0);
        assert_eq!(mul_pow2(f64::MIN_POSITIVE, 1500), mul_pow2(1.0, 478));
    }

    #[test]
    fn test_normalize_bounds_magnitude() {
        let (scaled, exp) = normalize(&[-6.0, 3.0, 0.5]);
        assert_eq!(exp, 3);
        assert_eq!(scaled, vec![-0.75, 0.375, 0.0625]);

        let (scaled, exp) = normalize(&[0.0, 0.0]);
        assert_eq!((scaled, exp), (vec![0.0, 0.0], 0));

        let (_, exp) = normalize(&[1.0, f64::INFINITY]);
        assert_eq!(exp, 0);
    }

    #[test]
    fn test_direct_is_bitwise_commutative() {
        let a: Vec<f64> = (0..10).map(|i| (i as f64 * 0.37).sin() * 1e3 + 0.1).collect();
        let b: Vec<f64> = (0..7).map(|i| 1.0 / (3.0 + i as f64)).collect();
        let c: Vec<f64> = (0..10).map(|i| (i as f64 * 1.9).cos() / 7.0).collect();

        assert_eq!(direct_convolve(&a, &b), direct_convolve(&b, &a));
        assert_eq!(direct_convolve(&a, &c), direct_convolve(&c, &a));
        assert_eq!(
            convolve(&a, &b, Shape::Full).unwrap(),
            convolve(&b, &a, Shape::Full).unwrap()
        );
    }

    #[test]
    fn test_nan_propagates_locally() {
        let a = [1.0, f64::NAN, 1.0, 1.0, 1.0];
        let b = [1.0, 1.0];

        let full = convolve(&a, &b, Shape::Full).unwrap();
        assert_eq!(full.len(), 6);
        assert_eq!(full[0], 1.0);
        assert!(full[1].is_nan());
        assert!(full[2].is_nan());
        assert_eq!(&full[3..], &[2.0, 2.0, 1.0]);
    }

    #[test]
    fn test_infinity_passes_through() {
        let full = convolve(&[f64::INFINITY, 1.0], &[2.0], Shape::Full).unwrap();
        assert_eq!(full, vec![f64::INFINITY, 2.0]);
    }

    #[test]
    fn test_inputs_not_mutated() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![4.0, 5.0];
        let (a_before, b_before) = (a.clone(), b.clone());

        for method in Method::ALL {
            convolve_with(&a, &b, Shape::Same, method).unwrap();
        }

        assert_eq!(a, a_before);
        assert_eq!(b, b_before);
    }

    #[test]
    fn test_method_parse_and_display() {
        for method in Method::ALL {
            assert_eq!(method.to_string().parse::<Method>().unwrap(), method);
        }
        assert_eq!(
            "overlap_save".parse::<Method>().unwrap_err(),
            ConvError::invalid_method("overlap_save")
        );
    }

    #[test]
    fn test_method_serde_kebab_case() {
        let json = serde_json::to_string(&Method::OverlapSave).unwrap();
        assert_eq!(json, "\"overlap-save\"");
        let parsed: Method = serde_json::from_str("\"fft\"").unwrap();
        assert_eq!(parsed, Method::Fft);
    }
}
