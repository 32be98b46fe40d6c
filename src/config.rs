use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use crate::board::brainflow::DEFAULT_LIBRARY;
use crate::dsp::filter::MAX_ORDER;
use crate::dsp::BandpassSpec;
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
/// Process-wide plotter settings. Missing fields take the defaults below.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlotterConfig {
    pub port: String,
    pub synthetic: bool,
    pub synthetic_channels: usize,
    pub brainflow_library: String,
    pub sampling_rate: u32,
    /// Seconds of data shown and analysed per tick.
    pub window_size: u32,
    pub tick_interval_ms: u64,
    pub low_cut_hz: f64,
    pub high_cut_hz: f64,
    pub filter_order: usize,
    /// `{channel}` is replaced by the 1-based channel number.
    pub gain_command: String,
    pub gain_channels: usize,
    pub connect_attempts: u32,
    pub retry_delay_ms: u64,
}
impl Default for PlotterConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_owned(),
            synthetic: false,
            synthetic_channels: 8,
            brainflow_library: DEFAULT_LIBRARY.to_owned(),
            sampling_rate: 250,
            window_size: 5,
            tick_interval_ms: 50,
            low_cut_hz: 1.0,
            high_cut_hz: 50.0,
            filter_order: 5,
            gain_command: "x{channel}040010X".to_owned(),
            gain_channels: 8,
            connect_attempts: 3,
            retry_delay_ms: 500,
        }
    }
}
impl PlotterConfig {
    /// Reads a JSON config file; `None` yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
    /// Samples per analysis window; fixed for the lifetime of the process.
    pub fn num_samples(&self) -> usize {
        self.sampling_rate as usize * self.window_size as usize
    }
    pub fn bandpass(&self) -> BandpassSpec {
        BandpassSpec {
            low_hz: self.low_cut_hz,
            high_hz: self.high_cut_hz,
            order: self.filter_order,
        }
    }
    pub fn gain_command_for(&self, channel: usize) -> String {
        self.gain_command.replace("{channel}", &channel.to_string())
    }
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason: String| Err(ConfigError::Invalid { field, reason });
        if self.sampling_rate == 0 {
            return invalid("sampling_rate", "must be greater than zero".into());
        }
        if self.window_size == 0 {
            return invalid("window_size", "must be at least one second".into());
        }
        if self.tick_interval_ms == 0 {
            return invalid("tick_interval_ms", "must be greater than zero".into());
        }
        if self.filter_order == 0 || self.filter_order > MAX_ORDER {
            return invalid("filter_order", format!("must be within 1..={MAX_ORDER}"));
        }
        let nyquist = f64::from(self.sampling_rate) / 2.0;
        if !(self.low_cut_hz > 0.0 && self.low_cut_hz < self.high_cut_hz && self.high_cut_hz < nyquist) {
            return invalid(
                "low_cut_hz/high_cut_hz",
                format!(
                    "passband {}..{} Hz must lie strictly inside 0..{nyquist} Hz",
                    self.low_cut_hz, self.high_cut_hz
                ),
            );
        }
        if !self.gain_command.contains("{channel}") {
            return invalid("gain_command", "missing `{channel}` placeholder".into());
        }
        if self.connect_attempts == 0 {
            return invalid("connect_attempts", "must be at least one".into());
        }
        if self.synthetic && self.synthetic_channels == 0 {
            return invalid("synthetic_channels", "must be at least one".into());
        }
        Ok(())
    }
}
