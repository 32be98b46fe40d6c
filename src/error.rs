use thiserror::Error;
use crate::dsp::ComputeError;
#[derive(Debug, Error)]
pub enum PlotterError {
    /// Device unreachable or session setup failed. Fatal at startup.
    #[error("acquisition failed on {device}: {reason}")]
    Acquisition { device: String, reason: String },
    /// A per-channel gain command was rejected. Logged, not fatal.
    #[error("channel {channel} rejected `{command}`: {reason}")]
    Configuration {
        channel: usize,
        command: String,
        reason: String,
    },
    /// Filter or spectral computation failed for one tick.
    #[error("tick computation failed: {0}")]
    Compute(#[from] ComputeError),
}
impl PlotterError {
    pub fn acquisition(device: impl Into<String>, err: &anyhow::Error) -> Self {
        PlotterError::Acquisition {
            device: device.into(),
            reason: format!("{err:#}"),
        }
    }
}
