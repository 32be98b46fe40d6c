use log::{debug, trace, warn};
use ndarray::Array2;
use std::time::{Duration, Instant};
use crate::dsp::{band_powers, bandpass_filter, BandPowers, BandpassSpec, ComputeError, FrequencySpectrum, SpectrumBuilder};
use crate::error::PlotterError;
use crate::session::AcquisitionContext;
use crate::window::SampleWindow;
/// Band powers are taken from this row of the filtered window only.
pub const REFERENCE_CHANNEL: usize = 0;
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for the board to buffer a full window.
    Idle,
    /// A full window was available on the last tick and a frame was produced.
    Rendering,
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Rendered,
    /// Fewer than the required samples were buffered.
    Skipped { available: usize },
    /// The board read or a stage failed; the previous frame is kept.
    Faulted,
}
/// Everything the display needs for one redraw.
#[derive(Clone, Debug)]
pub struct Frame {
    pub tick: u64,
    pub filtered: Array2<f64>, // channels x samples
    pub spectrum: FrequencySpectrum,
    pub band_powers: BandPowers,
}
/// Fixed wall-clock cadence, independent of how much data arrived.
#[derive(Clone, Debug)]
pub struct Ticker {
    interval: Duration,
    last: Option<Instant>,
}
impl Ticker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }
    /// True at most once per interval. The first call is always due.
    pub fn due(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
    /// Time until the next tick falls due.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.last
            .map(|last| self.interval.saturating_sub(now.duration_since(last)))
            .unwrap_or(Duration::ZERO)
    }
}
/// Pulls the latest window, filters it, computes spectra and band powers.
///
/// Ticks are not re-entrant: `tick` takes `&mut self` and is only ever
/// driven from the GUI thread's update callback, one call at a time. Every
/// rendering tick recomputes the whole window from scratch; nothing from the
/// previous frame is reused.
pub struct RenderLoop {
    sampling_rate: f64,
    num_samples: usize,
    bandpass: BandpassSpec,
    spectra: SpectrumBuilder,
    state: LoopState,
    ticks: u64,
    frame: Option<Frame>,
    last_fault: Option<String>,
}
impl RenderLoop {
    pub fn new(sampling_rate: u32, window_size: u32, bandpass: BandpassSpec) -> Self {
        Self {
            sampling_rate: f64::from(sampling_rate),
            num_samples: sampling_rate as usize * window_size as usize,
            bandpass,
            spectra: SpectrumBuilder::new(),
            state: LoopState::Idle,
            ticks: 0,
            frame: None,
            last_fault: None,
        }
    }
    /// Window length in samples; never changes after construction.
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }
    pub fn state(&self) -> LoopState {
        self.state
    }
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
    /// Last successfully rendered frame.
    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }
    pub fn last_fault(&self) -> Option<&str> {
        self.last_fault.as_deref()
    }
    pub fn tick(&mut self, ctx: &mut AcquisitionContext) -> TickOutcome {
        self.ticks += 1;
        let window = match ctx.latest_window(self.num_samples) {
            Ok(window) => window,
            Err(e) => {
                warn!("tick {}: {e:#}", self.ticks);
                self.last_fault = Some(format!("{e:#}"));
                return TickOutcome::Faulted;
            }
        };
        if !window.is_full(self.num_samples) {
            trace!("tick {}: {}/{} samples buffered", self.ticks, window.len(), self.num_samples);
            self.state = LoopState::Idle;
            return TickOutcome::Skipped {
                available: window.len(),
            };
        }
        match self.render(&window) {
            Ok(frame) => {
                self.frame = Some(frame);
                self.last_fault = None;
                self.state = LoopState::Rendering;
                TickOutcome::Rendered
            }
            Err(e) => {
                let fault = PlotterError::from(e);
                warn!("tick {}: {fault}", self.ticks);
                self.last_fault = Some(fault.to_string());
                TickOutcome::Faulted
            }
        }
    }
    fn render(&mut self, window: &SampleWindow) -> Result<Frame, ComputeError> {
        let channels = window.num_channels();
        if channels == 0 {
            return Err(ComputeError::EmptyWindow);
        }
        // Only the newest `num_samples` are analysed.
        let offset = window.len() - self.num_samples;
        let mut filtered = Array2::<f64>::zeros((channels, self.num_samples));
        for ch in 0..channels {
            let raw: Vec<f64> = window.channel(ch).iter().skip(offset).copied().collect();
            let out = bandpass_filter(&raw, self.sampling_rate, &self.bandpass)?;
            if out.iter().any(|v| !v.is_finite()) {
                return Err(ComputeError::NonFinite { channel: ch });
            }
            filtered
                .row_mut(ch)
                .iter_mut()
                .zip(out)
                .for_each(|(dst, v)| *dst = v);
        }
        let spectrum = self.spectra.compute(&filtered, self.sampling_rate)?;
        let band_powers = band_powers(&spectrum, REFERENCE_CHANNEL)?;
        debug!(
            "tick {}: strongest band {}",
            self.ticks,
            band_powers.strongest().name()
        );
        Ok(Frame {
            tick: self.ticks,
            filtered,
            spectrum,
            band_powers,
        })
    }
}
