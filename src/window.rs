use anyhow::{bail, Result};
use ndarray::{Array2, ArrayView1, Axis};
/// Read-only snapshot of the most recent samples, channels x samples.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleWindow {
    data: Array2<f64>,
}
impl SampleWindow {
    /// Picks the EEG rows out of the board's full row layout, in the order
    /// the board reports them.
    pub fn from_board_rows(rows: &Array2<f64>, eeg_channels: &[usize]) -> Result<Self> {
        if let Some(bad) = eeg_channels.iter().find(|&&ch| ch >= rows.nrows()) {
            bail!("EEG channel row {bad} out of range ({} rows)", rows.nrows());
        }
        Ok(Self {
            data: rows.select(Axis(0), eeg_channels),
        })
    }
    pub fn num_channels(&self) -> usize {
        self.data.nrows()
    }
    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.data.ncols()
    }
    pub fn is_full(&self, required: usize) -> bool {
        self.len() >= required
    }
    pub fn channel(&self, index: usize) -> ArrayView1<'_, f64> {
        self.data.row(index)
    }
}
