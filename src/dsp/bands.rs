use crate::dsp::{ComputeError, FrequencySpectrum};
/// The five canonical EEG bands, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Band {
    Delta,
    Theta,
    Alpha,
    Beta,
    Gamma,
}
impl Band {
    pub const ALL: [Band; 5] = [Band::Delta, Band::Theta, Band::Alpha, Band::Beta, Band::Gamma];
    pub fn name(self) -> &'static str {
        match self {
            Band::Delta => "Delta",
            Band::Theta => "Theta",
            Band::Alpha => "Alpha",
            Band::Beta => "Beta",
            Band::Gamma => "Gamma",
        }
    }
    /// Inclusive frequency range in Hz. Adjacent bands share their edge.
    pub fn range_hz(self) -> (f64, f64) {
        match self {
            Band::Delta => (1.0, 4.0),
            Band::Theta => (4.0, 8.0),
            Band::Alpha => (8.0, 12.0),
            Band::Beta => (12.0, 30.0),
            Band::Gamma => (30.0, 45.0),
        }
    }
    pub fn contains(self, freq_hz: f64) -> bool {
        let (low, high) = self.range_hz();
        freq_hz >= low && freq_hz <= high
    }
    fn index(self) -> usize {
        self as usize
    }
}
/// Mean spectral magnitude per band.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BandPowers([f64; 5]);
impl BandPowers {
    pub fn get(&self, band: Band) -> f64 {
        self.0[band.index()]
    }
    pub fn iter(&self) -> impl Iterator<Item = (Band, f64)> + '_ {
        Band::ALL
            .into_iter()
            .map(move |band| (band, self.get(band)))
    }
    /// Band with the largest power; ties resolve to the lower band.
    pub fn strongest(&self) -> Band {
        self.iter()
            .fold((Band::Delta, f64::NEG_INFINITY), |best, (band, power)| {
                if power > best.1 {
                    (band, power)
                } else {
                    best
                }
            })
            .0
    }
}
/// Averages one channel's magnitudes over each band's bins.
///
/// A band that contains no bin (coarse resolution) reports `0.0`.
pub fn band_powers(
    spectrum: &FrequencySpectrum,
    reference_channel: usize,
) -> Result<BandPowers, ComputeError> {
    let mags = spectrum
        .magnitudes
        .get(reference_channel)
        .ok_or(ComputeError::MissingChannel {
            channel: reference_channel,
            available: spectrum.magnitudes.len(),
        })?;
    let mut powers = [0.0; 5];
    for band in Band::ALL {
        let (sum, count) = spectrum
            .frequencies_hz
            .iter()
            .zip(mags)
            .filter(|(freq, _)| band.contains(**freq))
            .fold((0.0_f64, 0usize), |(sum, count), (_, mag)| (sum + *mag, count + 1));
        powers[band.index()] = if count == 0 { 0.0 } else { sum / count as f64 };
    }
    Ok(BandPowers(powers))
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::SpectrumBuilder;
    use ndarray::Array2;
    use std::f64::consts::PI;
    fn sine_window(freq_hz: f64, sample_rate_hz: f64, seconds: usize) -> Array2<f64> {
        let n = sample_rate_hz as usize * seconds;
        Array2::from_shape_fn((1, n), |(_, i)| {
            50.0 * (2.0 * PI * freq_hz * i as f64 / sample_rate_hz).sin()
        })
    }
    #[test]
    fn each_band_wins_for_its_own_sine() {
        let cases = [
            (Band::Delta, 2.4),
            (Band::Theta, 6.0),
            (Band::Alpha, 10.0),
            (Band::Beta, 20.0),
            (Band::Gamma, 38.0),
        ];
        let mut builder = SpectrumBuilder::new();
        for (band, freq) in cases {
            let spectrum = builder.compute(&sine_window(freq, 250.0, 5), 250.0).unwrap();
            let powers = band_powers(&spectrum, 0).unwrap();
            assert_eq!(powers.strongest(), band, "{freq} Hz -> {powers:?}");
            for (other, power) in powers.iter() {
                if other != band {
                    assert!(powers.get(band) > power, "{freq} Hz: {other:?} >= {band:?}");
                }
            }
        }
    }
    #[test]
    fn empty_band_falls_back_to_zero() {
        // 4 Hz for 1 s: bins at 0, 1, -2, -1 Hz only.
        let window = Array2::from_shape_vec((1, 4), vec![1.0, -2.0, 3.0, 0.5]).unwrap();
        let spectrum = SpectrumBuilder::new().compute(&window, 4.0).unwrap();
        let powers = band_powers(&spectrum, 0).unwrap();
        assert!(powers.get(Band::Delta) > 0.0);
        for band in [Band::Theta, Band::Alpha, Band::Beta, Band::Gamma] {
            assert_eq!(powers.get(band), 0.0);
        }
    }
    #[test]
    fn only_the_reference_channel_is_used() {
        let n = 1250;
        let window = Array2::from_shape_fn((2, n), |(ch, i)| {
            let freq = if ch == 0 { 10.0 } else { 20.0 };
            (2.0 * PI * freq * i as f64 / 250.0).sin()
        });
        let spectrum = SpectrumBuilder::new().compute(&window, 250.0).unwrap();
        assert_eq!(band_powers(&spectrum, 0).unwrap().strongest(), Band::Alpha);
        assert_eq!(band_powers(&spectrum, 1).unwrap().strongest(), Band::Beta);
        assert!(matches!(
            band_powers(&spectrum, 2),
            Err(ComputeError::MissingChannel { channel: 2, available: 2 })
        ));
    }
    #[test]
    fn band_table_matches_display_order() {
        let names: Vec<_> = Band::ALL.iter().map(|b| b.name()).collect();
        assert_eq!(names, ["Delta", "Theta", "Alpha", "Beta", "Gamma"]);
        assert!(Band::Delta.contains(4.0) && Band::Theta.contains(4.0));
        assert!(!Band::Gamma.contains(45.2));
    }
}
