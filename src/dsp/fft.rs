use ndarray::Array2;
use rustfft::{num_complex::Complex64, FftPlanner};
use crate::dsp::ComputeError;
/// Magnitude spectrum for each channel.
///
/// Bins are kept in full FFT order, so `frequencies_hz` runs from zero up to
/// just below Nyquist and then through the negative frequencies.
#[derive(Clone, Debug)]
pub struct FrequencySpectrum {
    pub sample_rate_hz: f64,
    pub frequencies_hz: Vec<f64>,
    pub magnitudes: Vec<Vec<f64>>, // channel -> bins
}
impl FrequencySpectrum {
    pub fn num_channels(&self) -> usize {
        self.magnitudes.len()
    }
    /// `[freq, magnitude]` pairs for the non-negative half, ready for plotting.
    pub fn positive_bins(&self, channel: usize) -> Vec<[f64; 2]> {
        let Some(mags) = self.magnitudes.get(channel) else {
            return Vec::new();
        };
        self.frequencies_hz
            .iter()
            .zip(mags)
            .filter(|(f, _)| **f >= 0.0)
            .map(|(f, m)| [*f, *m])
            .collect()
    }
}
/// Sample frequencies of an `n`-point DFT at spacing `1 / sample_rate_hz`.
pub fn fft_frequencies(n: usize, sample_rate_hz: f64) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let step = sample_rate_hz / n as f64;
    let non_negative = (n - 1) / 2 + 1;
    (0..n)
        .map(|k| {
            if k < non_negative {
                k as f64 * step
            } else {
                (k as f64 - n as f64) * step
            }
        })
        .collect()
}
/// Helper that computes full-length FFT magnitudes for a window.
pub struct SpectrumBuilder {
    planner: FftPlanner<f64>,
}
impl Default for SpectrumBuilder {
    fn default() -> Self {
        Self::new()
    }
}
impl SpectrumBuilder {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }
    /// `window` is channels x samples.
    pub fn compute(
        &mut self,
        window: &Array2<f64>,
        sample_rate_hz: f64,
    ) -> Result<FrequencySpectrum, ComputeError> {
        if sample_rate_hz <= 0.0 {
            return Err(ComputeError::InvalidSampleRate);
        }
        let n = window.ncols();
        if n == 0 || window.nrows() == 0 {
            return Err(ComputeError::EmptyWindow);
        }
        let fft = self.planner.plan_fft_forward(n);
        let magnitudes = window
            .rows()
            .into_iter()
            .map(|channel| {
                let mut buffer: Vec<Complex64> =
                    channel.iter().map(|&v| Complex64::new(v, 0.0)).collect();
                fft.process(&mut buffer);
                buffer.iter().map(|c| c.norm()).collect()
            })
            .collect();
        Ok(FrequencySpectrum {
            sample_rate_hz,
            frequencies_hz: fft_frequencies(n, sample_rate_hz),
            magnitudes,
        })
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use std::f64::consts::PI;
    #[test]
    fn frequencies_follow_fft_order() {
        assert_eq!(fft_frequencies(4, 4.0), vec![0.0, 1.0, -2.0, -1.0]);
        assert_eq!(fft_frequencies(5, 5.0), vec![0.0, 1.0, 2.0, -2.0, -1.0]);
        assert!(fft_frequencies(0, 250.0).is_empty());
        let freqs = fft_frequencies(1250, 250.0);
        assert_eq!(freqs.len(), 1250);
        assert!((freqs[50] - 10.0).abs() < 1e-12);
    }
    #[test]
    fn sine_peaks_at_its_bin() {
        let n = 1250;
        let window = Array2::from_shape_fn((2, n), |(ch, i)| {
            let freq = if ch == 0 { 10.0 } else { 20.0 };
            50.0 * (2.0 * PI * freq * i as f64 / 250.0).sin()
        });
        let spectrum = SpectrumBuilder::new().compute(&window, 250.0).unwrap();
        assert_eq!(spectrum.num_channels(), 2);
        assert_eq!(spectrum.magnitudes[0].len(), n);
        let peak = |mags: &[f64]| {
            mags[..n / 2]
                .iter()
                .enumerate()
                .fold((0, 0.0), |best, (i, &m)| if m > best.1 { (i, m) } else { best })
        };
        let (bin0, mag0) = peak(&spectrum.magnitudes[0]);
        assert_eq!(bin0, 50);
        // Unnormalised: amplitude * n / 2.
        assert!((mag0 - 50.0 * n as f64 / 2.0).abs() < 1e-6 * mag0);
        assert_eq!(peak(&spectrum.magnitudes[1]).0, 100);
    }
    #[test]
    fn positive_bins_drop_negative_frequencies() {
        let window = Array2::from_elem((1, 8), 1.0);
        let spectrum = SpectrumBuilder::new().compute(&window, 8.0).unwrap();
        let bins = spectrum.positive_bins(0);
        assert_eq!(bins.len(), 4);
        assert_eq!(bins[0], [0.0, 8.0]);
        assert!(spectrum.positive_bins(3).is_empty());
    }
    #[test]
    fn empty_window_is_an_error() {
        let window = Array2::<f64>::zeros((3, 0));
        let err = SpectrumBuilder::new().compute(&window, 250.0).unwrap_err();
        assert_eq!(err, ComputeError::EmptyWindow);
    }
}
