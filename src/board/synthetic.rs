use anyhow::{bail, Result};
use log::info;
use ndarray::Array2;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::VecDeque;
use std::f64::consts::PI;
use std::time::Instant;
use crate::board::BoardSource;
/// Seconds of history kept in the synthetic ring buffer.
const HISTORY_SECONDS: usize = 60;
/// Shape of the generated signal.
#[derive(Clone, Copy, Debug)]
pub struct SyntheticSignal {
    pub frequency_hz: f64,
    pub amplitude_uv: f64,
    pub noise_uv: f64,
}
impl Default for SyntheticSignal {
    fn default() -> Self {
        Self {
            frequency_hz: 10.0,
            amplitude_uv: 50.0,
            noise_uv: 5.0,
        }
    }
}
enum Clock {
    /// Samples appear in real time once the stream starts.
    Live { started: Option<Instant> },
    /// Samples appear only through [`SyntheticBoard::advance`].
    Manual,
}
/// In-process stand-in for a Cyton. Row 0 is the package counter, rows
/// `1..=channels` carry EEG in microvolts, the last row is a timestamp.
pub struct SyntheticBoard {
    sampling_rate: u32,
    channels: usize,
    signal: SyntheticSignal,
    rng: StdRng,
    clock: Clock,
    rows: Vec<VecDeque<f64>>,
    capacity: usize,
    emitted: u64,
    prepared: bool,
    is_streaming: bool,
}
impl SyntheticBoard {
    /// Wall-clock driven board for running without hardware.
    pub fn live(sampling_rate: u32, channels: usize, signal: SyntheticSignal) -> Self {
        Self::build(sampling_rate, channels, signal, StdRng::from_entropy(), Clock::Live { started: None })
    }
    /// Deterministic board; samples are produced only by [`Self::advance`].
    pub fn manual(sampling_rate: u32, channels: usize, signal: SyntheticSignal, seed: u64) -> Self {
        Self::build(sampling_rate, channels, signal, StdRng::seed_from_u64(seed), Clock::Manual)
    }
    fn build(
        sampling_rate: u32,
        channels: usize,
        signal: SyntheticSignal,
        rng: StdRng,
        clock: Clock,
    ) -> Self {
        let capacity = (sampling_rate as usize * HISTORY_SECONDS).max(1);
        Self {
            sampling_rate,
            channels,
            signal,
            rng,
            clock,
            rows: (0..channels + 2).map(|_| VecDeque::with_capacity(capacity)).collect(),
            capacity,
            emitted: 0,
            prepared: false,
            is_streaming: false,
        }
    }
    /// Appends `samples` new samples to every row. Samples that would fall
    /// out of the ring buffer straight away are skipped, not generated.
    pub fn advance(&mut self, samples: usize) {
        let rate = f64::from(self.sampling_rate.max(1));
        let skipped = samples.saturating_sub(self.capacity);
        if skipped > 0 {
            self.rows.iter_mut().for_each(VecDeque::clear);
            self.emitted += skipped as u64;
        }
        for _ in skipped..samples {
            let t = self.emitted as f64 / rate;
            let mut frame = Vec::with_capacity(self.rows.len());
            frame.push((self.emitted % 256) as f64);
            for ch in 0..self.channels {
                let phase = ch as f64 * PI / 8.0;
                let clean =
                    self.signal.amplitude_uv * (2.0 * PI * self.signal.frequency_hz * t + phase).sin();
                let noise = if self.signal.noise_uv > 0.0 {
                    self.rng.gen_range(-self.signal.noise_uv..=self.signal.noise_uv)
                } else {
                    0.0
                };
                frame.push(clean + noise);
            }
            frame.push(t);
            for (row, value) in self.rows.iter_mut().zip(frame) {
                if row.len() == self.capacity {
                    row.pop_front();
                }
                row.push_back(value);
            }
            self.emitted += 1;
        }
    }
    pub fn buffered(&self) -> usize {
        self.rows.first().map(VecDeque::len).unwrap_or(0)
    }
    fn catch_up(&mut self) {
        let due = match self.clock {
            Clock::Live { started: Some(started) } => {
                let expected = (started.elapsed().as_secs_f64() * f64::from(self.sampling_rate)) as u64;
                expected.saturating_sub(self.emitted) as usize
            }
            _ => 0,
        };
        if due > 0 {
            self.advance(due);
        }
    }
    fn accepts(&self, command: &str) -> bool {
        // x<channel><power><gain><input><bias><srb2><srb1>X
        let bytes = command.as_bytes();
        if bytes.len() != 9 || bytes[0] != b'x' || bytes[8] != b'X' {
            return false;
        }
        let channel = (bytes[1] as char).to_digit(10).unwrap_or(0) as usize;
        (1..=self.channels).contains(&channel) && bytes[2..8].iter().all(u8::is_ascii_digit)
    }
}
impl BoardSource for SyntheticBoard {
    fn describe(&self) -> String {
        format!("synthetic board ({} ch @ {} Hz)", self.channels, self.sampling_rate)
    }
    fn prepare_session(&mut self) -> Result<()> {
        self.prepared = true;
        Ok(())
    }
    fn config_board(&mut self, command: &str) -> Result<String> {
        if !self.prepared {
            bail!("config_board called before prepare_session");
        }
        if !self.accepts(command) {
            bail!("unrecognised command `{command}`");
        }
        Ok(String::new())
    }
    fn start_stream(&mut self) -> Result<()> {
        if !self.prepared {
            bail!("start_stream called before prepare_session");
        }
        if let Clock::Live { started } = &mut self.clock {
            started.get_or_insert_with(Instant::now);
        }
        self.is_streaming = true;
        info!("{} streaming", self.describe());
        Ok(())
    }
    fn sampling_rate(&self) -> Result<u32> {
        Ok(self.sampling_rate)
    }
    fn eeg_channels(&self) -> Result<Vec<usize>> {
        Ok((1..=self.channels).collect())
    }
    fn current_board_data(&mut self, max_samples: usize) -> Result<Array2<f64>> {
        if !self.is_streaming {
            bail!("stream is not running");
        }
        self.catch_up();
        let take = self.buffered().min(max_samples);
        let skip = self.buffered() - take;
        let num_rows = self.rows.len();
        let data = Array2::from_shape_fn((num_rows, take), |(row, i)| self.rows[row][skip + i]);
        Ok(data)
    }
    fn stop_stream(&mut self) -> Result<()> {
        self.is_streaming = false;
        Ok(())
    }
    fn release_session(&mut self) -> Result<()> {
        self.prepared = false;
        Ok(())
    }
}
