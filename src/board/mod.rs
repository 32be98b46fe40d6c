// Board sources: the BrainFlow-backed Cyton and an in-process synthetic board.
pub mod brainflow;
pub mod synthetic;
use anyhow::Result;
use ndarray::Array2;
pub use brainflow::BrainFlowBoard;
pub use synthetic::SyntheticBoard;
/// Lifecycle of an amplifier session as exposed by BrainFlow.
///
/// `current_board_data` returns the board's full row layout (rows x samples)
/// and never blocks: it yields whatever is buffered, up to `max_samples`.
pub trait BoardSource {
    fn describe(&self) -> String;
    fn prepare_session(&mut self) -> Result<()>;
    /// Sends a raw configuration string; returns the board's response text.
    fn config_board(&mut self, command: &str) -> Result<String>;
    fn start_stream(&mut self) -> Result<()>;
    fn sampling_rate(&self) -> Result<u32>;
    /// Row indices of the EEG channels within the board data.
    fn eeg_channels(&self) -> Result<Vec<usize>>;
    fn current_board_data(&mut self, max_samples: usize) -> Result<Array2<f64>>;
    fn stop_stream(&mut self) -> Result<()>;
    fn release_session(&mut self) -> Result<()>;
}
