use std::f64::consts::PI;
use rustfft::num_complex::Complex64;
use crate::dsp::ComputeError;
/// Highest Butterworth order accepted by [`BandpassFilter::design`].
pub const MAX_ORDER: usize = 16;
/// Pole imaginary parts below this are treated as real.
const REAL_POLE_TOLERANCE: f64 = 1e-10;
/// Passband and order of the Butterworth bandpass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandpassSpec {
    pub low_hz: f64,
    pub high_hz: f64,
    pub order: usize,
}
impl Default for BandpassSpec {
    fn default() -> Self {
        Self {
            low_hz: 1.0,
            high_hz: 50.0,
            order: 5,
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}
#[derive(Clone, Copy, Debug, Default)]
struct BiquadState {
    z1: f64,
    z2: f64,
}
impl BiquadState {
    fn process(&mut self, c: &BiquadCoeffs, input: f64) -> f64 {
        // Transposed direct form II
        let y = c.b0 * input + self.z1;
        self.z1 = c.b1 * input - c.a1 * y + self.z2;
        self.z2 = c.b2 * input - c.a2 * y;
        y
    }
}
/// Digital Butterworth bandpass stored as cascaded second-order sections.
///
/// The design follows the classic route: analog lowpass prototype poles,
/// lowpass-to-bandpass transform on pre-warped edges, then the bilinear
/// transform. Every section carries one zero at DC and one at Nyquist, the
/// overall gain is folded into the first section.
#[derive(Clone, Debug)]
pub struct BandpassFilter {
    sections: Vec<BiquadCoeffs>,
}
impl BandpassFilter {
    pub fn design(sample_rate_hz: f64, spec: BandpassSpec) -> Result<Self, ComputeError> {
        if !sample_rate_hz.is_finite() || sample_rate_hz <= 0.0 {
            return Err(ComputeError::InvalidSampleRate);
        }
        if spec.order == 0 || spec.order > MAX_ORDER {
            return Err(ComputeError::InvalidOrder {
                order: spec.order,
                max: MAX_ORDER,
            });
        }
        let nyquist_hz = sample_rate_hz * 0.5;
        let edges_ok = spec.low_hz > 0.0 && spec.low_hz < spec.high_hz && spec.high_hz < nyquist_hz;
        if !edges_ok {
            return Err(ComputeError::InvalidPassband {
                low_hz: spec.low_hz,
                high_hz: spec.high_hz,
                nyquist_hz,
            });
        }
        let fs2 = 2.0 * sample_rate_hz;
        let warp = |freq_hz: f64| fs2 * (PI * freq_hz / sample_rate_hz).tan();
        let (w_low, w_high) = (warp(spec.low_hz), warp(spec.high_hz));
        let bandwidth = w_high - w_low;
        let center_sq = w_low * w_high;
        let n = spec.order;
        let mut digital_poles = Vec::with_capacity(2 * n);
        let mut denominator = Complex64::new(1.0, 0.0);
        for k in 0..n {
            let theta = PI * (2 * k + n + 1) as f64 / (2 * n) as f64;
            let scaled = Complex64::from_polar(1.0, theta) * (bandwidth * 0.5);
            let disc = (scaled * scaled - center_sq).sqrt();
            for analog in [scaled + disc, scaled - disc] {
                denominator *= fs2 - analog;
                digital_poles.push((fs2 + analog) / (fs2 - analog));
            }
        }
        // n analog zeros at s = 0 map to z = 1; the remaining n land on z = -1.
        let gain = (Complex64::new((bandwidth * fs2).powi(n as i32), 0.0) / denominator).re;
        let mut sections = Vec::with_capacity(n);
        let mut real_poles = Vec::new();
        for pole in &digital_poles {
            if pole.im > REAL_POLE_TOLERANCE {
                sections.push(BiquadCoeffs {
                    b0: 1.0,
                    b1: 0.0,
                    b2: -1.0,
                    a1: -2.0 * pole.re,
                    a2: pole.norm_sqr(),
                });
            } else if pole.im.abs() <= REAL_POLE_TOLERANCE {
                real_poles.push(pole.re);
            }
        }
        for pair in real_poles.chunks(2) {
            let (p1, p2) = match pair {
                [p1, p2] => (*p1, *p2),
                [p1] => (*p1, 0.0),
                _ => continue,
            };
            sections.push(BiquadCoeffs {
                b0: 1.0,
                b1: 0.0,
                b2: -1.0,
                a1: -(p1 + p2),
                a2: p1 * p2,
            });
        }
        debug_assert_eq!(sections.len(), n);
        if let Some(first) = sections.first_mut() {
            first.b0 *= gain;
            first.b1 *= gain;
            first.b2 *= gain;
        }
        Ok(Self { sections })
    }
    /// Causal filtering from zero initial state. No state survives the call.
    pub fn apply(&self, samples: &[f64]) -> Vec<f64> {
        let mut states = vec![BiquadState::default(); self.sections.len()];
        samples
            .iter()
            .map(|&x| {
                self.sections
                    .iter()
                    .zip(states.iter_mut())
                    .fold(x, |value, (coeffs, state)| state.process(coeffs, value))
            })
            .collect()
    }
}
/// Designs the filter for `sample_rate_hz` and runs it over `samples`.
pub fn bandpass_filter(
    samples: &[f64],
    sample_rate_hz: f64,
    spec: &BandpassSpec,
) -> Result<Vec<f64>, ComputeError> {
    let filter = BandpassFilter::design(sample_rate_hz, *spec)?;
    Ok(filter.apply(samples))
}
#[cfg(test)]
mod tests {
    use super::*;
    fn magnitude_at(filter: &BandpassFilter, freq_hz: f64) -> f64 {
        let w = 2.0 * PI * freq_hz / 250.0;
        let z1 = Complex64::from_polar(1.0, -w);
        let z2 = z1 * z1;
        filter
            .sections
            .iter()
            .map(|c| (c.b0 + c.b1 * z1 + c.b2 * z2) / (1.0 + c.a1 * z1 + c.a2 * z2))
            .fold(Complex64::new(1.0, 0.0), |acc, h| acc * h)
            .norm()
    }
    fn sine(freq_hz: f64, amplitude: f64, sample_rate_hz: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| amplitude * (2.0 * PI * freq_hz * i as f64 / sample_rate_hz).sin())
            .collect()
    }
    #[test]
    fn default_design_has_one_section_per_order() {
        let filter = BandpassFilter::design(250.0, BandpassSpec::default()).unwrap();
        assert_eq!(filter.sections.len(), 5);
        for c in &filter.sections {
            // Stable second-order section: |a2| < 1 and |a1| < 1 + a2.
            assert!(c.a2.abs() < 1.0);
            assert!(c.a1.abs() < 1.0 + c.a2);
        }
    }
    #[test]
    fn passes_alpha_and_rejects_out_of_band() {
        let filter = BandpassFilter::design(250.0, BandpassSpec::default()).unwrap();
        assert!((magnitude_at(&filter, 10.0) - 1.0).abs() < 0.01);
        assert!(magnitude_at(&filter, 0.2) < 0.01);
        assert!(magnitude_at(&filter, 100.0) < 0.01);
        // -3 dB at the band edges.
        let edge = std::f64::consts::FRAC_1_SQRT_2;
        assert!((magnitude_at(&filter, 1.0) - edge).abs() < 0.01);
        assert!((magnitude_at(&filter, 50.0) - edge).abs() < 0.01);
    }
    #[test]
    fn same_input_gives_bit_identical_output() {
        let filter = BandpassFilter::design(250.0, BandpassSpec::default()).unwrap();
        let input = sine(10.0, 50.0, 250.0, 1250);
        let first = filter.apply(&input);
        let second = filter.apply(&input);
        assert_eq!(first, second);
        let third = bandpass_filter(&input, 250.0, &BandpassSpec::default()).unwrap();
        assert_eq!(first, third);
    }
    #[test]
    fn output_has_input_length() {
        let out = bandpass_filter(&[1.0; 37], 250.0, &BandpassSpec::default()).unwrap();
        assert_eq!(out.len(), 37);
        assert!(bandpass_filter(&[], 250.0, &BandpassSpec::default())
            .unwrap()
            .is_empty());
    }
    #[test]
    fn removes_dc_offset() {
        let input = vec![100.0; 2500];
        let out = bandpass_filter(&input, 250.0, &BandpassSpec::default()).unwrap();
        let tail = &out[2000..];
        assert!(tail.iter().all(|v| v.abs() < 1.0));
    }
    #[test]
    fn rejects_edges_outside_nyquist() {
        let err = BandpassFilter::design(4.0, BandpassSpec::default()).unwrap_err();
        assert!(matches!(err, ComputeError::InvalidPassband { .. }));
        let inverted = BandpassSpec {
            low_hz: 20.0,
            high_hz: 10.0,
            order: 5,
        };
        assert!(BandpassFilter::design(250.0, inverted).is_err());
        assert_eq!(
            BandpassFilter::design(0.0, BandpassSpec::default()).unwrap_err(),
            ComputeError::InvalidSampleRate
        );
        let zero_order = BandpassSpec {
            order: 0,
            ..BandpassSpec::default()
        };
        assert!(matches!(
            BandpassFilter::design(250.0, zero_order),
            Err(ComputeError::InvalidOrder { .. })
        ));
    }
}
