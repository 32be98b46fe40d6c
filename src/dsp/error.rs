use thiserror::Error;
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ComputeError {
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("filter order must be between 1 and {max}, got {order}")]
    InvalidOrder { order: usize, max: usize },
    #[error("passband {low_hz}..{high_hz} Hz must lie strictly inside 0..{nyquist_hz} Hz")]
    InvalidPassband {
        low_hz: f64,
        high_hz: f64,
        nyquist_hz: f64,
    },
    #[error("sample window is empty")]
    EmptyWindow,
    #[error("reference channel {channel} not present (window has {available} channels)")]
    MissingChannel { channel: usize, available: usize },
    #[error("filter produced non-finite output on channel {channel}")]
    NonFinite { channel: usize },
}
