// src/main.rs
mod board;
mod config;
mod dsp;
mod error;
mod gui;
mod render_loop;
mod session;
mod window;
use anyhow::{anyhow, Result};
use clap::Parser;
use eframe::egui;
use log::info;
use std::path::PathBuf;
use std::time::Duration;
use crate::board::synthetic::SyntheticSignal;
use crate::board::{BoardSource, BrainFlowBoard, SyntheticBoard};
use crate::config::PlotterConfig;
use crate::render_loop::RenderLoop;
use crate::session::AcquisitionContext;
#[derive(Parser, Debug)]
#[command(name = "cyton-scope", version, about = "Live bandpass-filtered EEG viewer for OpenBCI Cyton")]
struct Cli {
    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,
    /// Serial port of the Cyton dongle
    #[arg(long)]
    port: Option<String>,
    /// Run against the in-process synthetic board instead of hardware
    #[arg(long)]
    synthetic: bool,
    /// Analysis window in seconds
    #[arg(long)]
    window_size: Option<u32>,
    #[arg(long)]
    sampling_rate: Option<u32>,
    /// Path to the BrainFlow board controller library
    #[arg(long)]
    brainflow_library: Option<PathBuf>,
}
impl Cli {
    fn into_config(self) -> Result<PlotterConfig> {
        let mut config = PlotterConfig::load(self.config.as_deref())?;
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.synthetic {
            config.synthetic = true;
        }
        if let Some(window_size) = self.window_size {
            config.window_size = window_size;
        }
        if let Some(rate) = self.sampling_rate {
            config.sampling_rate = rate;
        }
        if let Some(lib) = self.brainflow_library {
            config.brainflow_library = lib.to_string_lossy().into_owned();
        }
        config.validate()?;
        Ok(config)
    }
}
fn open_board(config: &PlotterConfig) -> Result<Box<dyn BoardSource>> {
    if config.synthetic {
        return Ok(Box::new(SyntheticBoard::live(
            config.sampling_rate,
            config.synthetic_channels,
            SyntheticSignal::default(),
        )));
    }
    board::brainflow::warn_if_port_missing(&config.port);
    Ok(Box::new(BrainFlowBoard::new(&config.port, &config.brainflow_library)?))
}
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = Cli::parse().into_config()?;
    info!(
        "window {} s at {} Hz ({} samples), passband {}..{} Hz order {}",
        config.window_size,
        config.sampling_rate,
        config.num_samples(),
        config.low_cut_hz,
        config.high_cut_hz,
        config.filter_order
    );
    let board = open_board(&config)?;
    let context = AcquisitionContext::open(board, &config)?;
    let render_loop = RenderLoop::new(config.sampling_rate, config.window_size, config.bandpass());
    let app = gui::ScopeApp::new(
        context,
        render_loop,
        Duration::from_millis(config.tick_interval_ms),
    );
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1463.0, 915.0])
        .with_min_inner_size([900.0, 600.0])
        .with_title("BrainFlow EEG GUI");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native("BrainFlow EEG GUI", options, Box::new(move |_cc| Box::new(app)))
        .map_err(|e| anyhow!("GUI event loop failed: {e}"))?;
    info!("window closed");
    Ok(())
}
