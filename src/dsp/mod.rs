// Filter and spectral stages run by the render loop.
pub mod bands;
pub mod error;
pub mod fft;
pub mod filter;
pub use bands::{band_powers, Band, BandPowers};
pub use error::ComputeError;
pub use fft::{FrequencySpectrum, SpectrumBuilder};
pub use filter::{bandpass_filter, BandpassSpec};
