use anyhow::Context;
use log::{error, info, warn};
use std::thread;
use std::time::Duration;
use crate::board::BoardSource;
use crate::config::PlotterConfig;
use crate::error::PlotterError;
use crate::window::SampleWindow;
/// Owns the board session for the life of the process.
///
/// Opened once at startup and borrowed by the render loop each tick. The
/// session is stopped and released exactly once, either through
/// [`AcquisitionContext::shutdown`] or, on any other exit path, on drop.
pub struct AcquisitionContext {
    board: Box<dyn BoardSource>,
    device: String,
    eeg_channels: Vec<usize>,
    gain_faults: Vec<PlotterError>,
    released: bool,
}
impl AcquisitionContext {
    /// Prepares the board (with bounded retries), sends the per-channel gain
    /// commands and starts streaming.
    pub fn open(mut board: Box<dyn BoardSource>, config: &PlotterConfig) -> Result<Self, PlotterError> {
        let device = board.describe();
        prepare_with_retry(
            board.as_mut(),
            config.connect_attempts,
            Duration::from_millis(config.retry_delay_ms),
        )
        .map_err(|e| PlotterError::acquisition(&device, &e))?;
        // From here on a failure still releases the session through Drop.
        let mut ctx = Self {
            board,
            device,
            eeg_channels: Vec::new(),
            gain_faults: Vec::new(),
            released: false,
        };
        ctx.configure_gain(config);
        ctx.board
            .start_stream()
            .map_err(|e| PlotterError::acquisition(&ctx.device, &e))?;
        let eeg_channels = ctx
            .board
            .eeg_channels()
            .and_then(|channels| {
                anyhow::ensure!(!channels.is_empty(), "board reports no EEG channels");
                Ok(channels)
            })
            .map_err(|e| PlotterError::acquisition(&ctx.device, &e))?;
        ctx.eeg_channels = eeg_channels;
        match ctx.board.sampling_rate() {
            Ok(rate) if rate != config.sampling_rate => warn!(
                "{} reports {rate} Hz but the plotter is configured for {} Hz",
                ctx.device, config.sampling_rate
            ),
            Ok(_) => {}
            Err(e) => warn!("could not query sampling rate of {}: {e:#}", ctx.device),
        }
        info!(
            "{} streaming {} EEG channels",
            ctx.device,
            ctx.eeg_channels.len()
        );
        Ok(ctx)
    }
    fn configure_gain(&mut self, config: &PlotterConfig) {
        for channel in 1..=config.gain_channels {
            let command = config.gain_command_for(channel);
            if let Err(e) = self.board.config_board(&command) {
                let fault = PlotterError::Configuration {
                    channel,
                    command,
                    reason: format!("{e:#}"),
                };
                warn!("{fault}");
                self.gain_faults.push(fault);
            }
        }
    }
    pub fn device(&self) -> &str {
        &self.device
    }
    pub fn num_channels(&self) -> usize {
        self.eeg_channels.len()
    }
    /// Gain commands the board refused during startup.
    pub fn gain_faults(&self) -> &[PlotterError] {
        &self.gain_faults
    }
    /// Pulls up to `num_samples` of the most recent data. Never blocks.
    pub fn latest_window(&mut self, num_samples: usize) -> anyhow::Result<SampleWindow> {
        let rows = self
            .board
            .current_board_data(num_samples)
            .with_context(|| format!("reading from {}", self.device))?;
        SampleWindow::from_board_rows(&rows, &self.eeg_channels)
    }
    /// Stops the stream and releases the session. Later calls are no-ops.
    pub fn shutdown(&mut self) -> Result<(), PlotterError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        let stopped = self.board.stop_stream();
        let released = self.board.release_session();
        info!("{} released", self.device);
        stopped
            .and(released)
            .map_err(|e| PlotterError::acquisition(&self.device, &e))
    }
}
impl Drop for AcquisitionContext {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!("{e}");
        }
    }
}
fn prepare_with_retry(
    board: &mut dyn BoardSource,
    attempts: u32,
    delay: Duration,
) -> anyhow::Result<()> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match board.prepare_session() {
            Ok(()) => return Ok(()),
            Err(e) if attempt < attempts => {
                warn!(
                    "prepare_session on {} failed (attempt {attempt}/{attempts}): {e:#}",
                    board.describe()
                );
                thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e.context(format!("gave up after {attempts} attempts"))),
        }
    }
}
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::board::synthetic::{SyntheticBoard, SyntheticSignal};
    use anyhow::{bail, Result};
    use ndarray::Array2;
    use std::cell::Cell;
    use std::rc::Rc;
    /// Counts lifecycle calls and can refuse the first few prepares. Each
    /// pull first generates however many samples were queued in `feed`, and
    /// fails while `failing_reads` is non-zero.
    pub(crate) struct Probe {
        pub inner: SyntheticBoard,
        pub failing_prepares: u32,
        pub feed: Rc<Cell<usize>>,
        pub failing_reads: Rc<Cell<u32>>,
        pub prepares: Rc<Cell<u32>>,
        pub releases: Rc<Cell<u32>>,
    }
    impl Probe {
        pub fn new(channels: usize) -> Self {
            Self::with_signal(channels, SyntheticSignal::default())
        }
        pub fn with_signal(channels: usize, signal: SyntheticSignal) -> Self {
            Self {
                inner: SyntheticBoard::manual(250, channels, signal, 3),
                failing_prepares: 0,
                feed: Rc::new(Cell::new(0)),
                failing_reads: Rc::new(Cell::new(0)),
                prepares: Rc::new(Cell::new(0)),
                releases: Rc::new(Cell::new(0)),
            }
        }
    }
    impl BoardSource for Probe {
        fn describe(&self) -> String {
            "probe".into()
        }
        fn prepare_session(&mut self) -> Result<()> {
            self.prepares.set(self.prepares.get() + 1);
            if self.prepares.get() <= self.failing_prepares {
                bail!("device busy");
            }
            self.inner.prepare_session()
        }
        fn config_board(&mut self, command: &str) -> Result<String> {
            self.inner.config_board(command)
        }
        fn start_stream(&mut self) -> Result<()> {
            self.inner.start_stream()
        }
        fn sampling_rate(&self) -> Result<u32> {
            self.inner.sampling_rate()
        }
        fn eeg_channels(&self) -> Result<Vec<usize>> {
            self.inner.eeg_channels()
        }
        fn current_board_data(&mut self, max_samples: usize) -> Result<Array2<f64>> {
            self.inner.advance(self.feed.replace(0));
            if self.failing_reads.get() > 0 {
                self.failing_reads.set(self.failing_reads.get() - 1);
                bail!("read timed out");
            }
            self.inner.current_board_data(max_samples)
        }
        fn stop_stream(&mut self) -> Result<()> {
            self.inner.stop_stream()
        }
        fn release_session(&mut self) -> Result<()> {
            self.releases.set(self.releases.get() + 1);
            self.inner.release_session()
        }
    }
    pub(crate) fn fast_config() -> PlotterConfig {
        PlotterConfig {
            retry_delay_ms: 0,
            ..PlotterConfig::default()
        }
    }
    #[test]
    fn rejected_gain_commands_do_not_abort_startup() {
        // Four channels: commands for channels 5..=8 are refused.
        let ctx = AcquisitionContext::open(Box::new(Probe::new(4)), &fast_config()).unwrap();
        assert_eq!(ctx.num_channels(), 4);
        let refused: Vec<usize> = ctx
            .gain_faults()
            .iter()
            .filter_map(|f| match f {
                PlotterError::Configuration { channel, .. } => Some(*channel),
                _ => None,
            })
            .collect();
        assert_eq!(refused, vec![5, 6, 7, 8]);
    }
    #[test]
    fn prepare_is_retried_a_bounded_number_of_times() {
        let mut probe = Probe::new(2);
        probe.failing_prepares = 2;
        let prepares = probe.prepares.clone();
        assert!(AcquisitionContext::open(Box::new(probe), &fast_config()).is_ok());
        assert_eq!(prepares.get(), 3);
        let mut probe = Probe::new(2);
        probe.failing_prepares = 10;
        let prepares = probe.prepares.clone();
        let err = AcquisitionContext::open(Box::new(probe), &fast_config())
            .err()
            .map(|e| e.to_string())
            .unwrap_or_default();
        assert_eq!(prepares.get(), 3);
        assert!(err.contains("acquisition failed on probe"));
    }
    #[test]
    fn session_is_released_exactly_once() {
        let probe = Probe::new(2);
        let releases = probe.releases.clone();
        let mut ctx = AcquisitionContext::open(Box::new(probe), &fast_config()).unwrap();
        ctx.shutdown().unwrap();
        ctx.shutdown().unwrap();
        drop(ctx);
        assert_eq!(releases.get(), 1);
    }
    #[test]
    fn dropping_an_open_context_releases_it() {
        let probe = Probe::new(2);
        let releases = probe.releases.clone();
        {
            let _ctx = AcquisitionContext::open(Box::new(probe), &fast_config()).unwrap();
        }
        assert_eq!(releases.get(), 1);
    }
    #[test]
    fn latest_window_holds_eeg_rows_only() {
        let probe = Probe::new(3);
        probe.feed.set(150);
        let mut ctx = AcquisitionContext::open(Box::new(probe), &fast_config()).unwrap();
        let window = ctx.latest_window(100).unwrap();
        assert_eq!(window.num_channels(), 3);
        assert_eq!(window.len(), 100);
    }
}
