// src/gui.rs
use eframe::egui;
use egui::{Color32, RichText};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints};
use std::time::{Duration, Instant};
use crate::dsp::Band;
use crate::render_loop::{Frame, LoopState, RenderLoop, TickOutcome, Ticker};
use crate::session::AcquisitionContext;
const PALETTE: [Color32; 8] = [
    Color32::from_rgb(0, 255, 255),
    Color32::YELLOW,
    Color32::from_rgb(255, 0, 255),
    Color32::from_rgb(255, 80, 80),
    Color32::from_rgb(80, 255, 80),
    Color32::from_rgb(80, 160, 255),
    Color32::from_rgb(255, 165, 0),
    Color32::WHITE,
];
/// Owns the acquisition context and the render loop for the lifetime of the
/// window. Dropping the app releases the board.
pub struct ScopeApp {
    context: AcquisitionContext,
    render_loop: RenderLoop,
    ticker: Ticker,
    last_outcome: Option<TickOutcome>,
}
impl ScopeApp {
    pub fn new(context: AcquisitionContext, render_loop: RenderLoop, tick_interval: Duration) -> Self {
        Self {
            context,
            render_loop,
            ticker: Ticker::new(tick_interval),
            last_outcome: None,
        }
    }
    fn status_line(&self) -> String {
        let state = match (self.render_loop.state(), self.last_outcome) {
            (_, Some(TickOutcome::Skipped { available })) => {
                format!("Idle: {available}/{} samples", self.render_loop.num_samples())
            }
            (LoopState::Idle, _) => "Idle".to_owned(),
            (LoopState::Rendering, _) => "Rendering".to_owned(),
        };
        let shown = self
            .render_loop
            .frame()
            .map(|f| format!("frame of tick {}", f.tick))
            .unwrap_or_else(|| "no frame yet".to_owned());
        format!(
            "{} | {} ch | tick {} | {state} | {shown}",
            self.context.device(),
            self.context.num_channels(),
            self.render_loop.ticks()
        )
    }
}
fn draw_time_series(ui: &mut egui::Ui, frame: &Frame) {
    let channels = frame.filtered.nrows();
    let rate = frame.spectrum.sample_rate_hz;
    let plot_height = (ui.available_height() / channels.max(1) as f32 - 22.0).max(40.0);
    egui::ScrollArea::vertical().show(ui, |ui| {
        for (ch, row) in frame.filtered.rows().into_iter().enumerate() {
            let points: Vec<[f64; 2]> = row
                .iter()
                .enumerate()
                .map(|(i, v)| [i as f64 / rate, *v])
                .collect();
            ui.label(RichText::new(format!("Channel {} (uV)", ch + 1)).small());
            Plot::new(("channel", ch))
                .height(plot_height)
                .allow_drag(false)
                .allow_zoom(false)
                .include_y(-100.0)
                .include_y(100.0)
                .show(ui, |plot_ui| {
                    plot_ui.line(
                        Line::new(PlotPoints::new(points))
                            .color(Color32::from_rgb(255, 80, 80)),
                    );
                });
        }
    });
}
fn draw_spectrum(ui: &mut egui::Ui, frame: &Frame, height: f32) {
    ui.label("FFT Plot (uV vs Hz)");
    let nyquist = frame.spectrum.sample_rate_hz / 2.0;
    Plot::new("fft_plot")
        .height(height)
        .legend(Legend::default())
        .include_x(1.0)
        .include_x(nyquist)
        .include_y(0.0)
        .show(ui, |plot_ui| {
            for ch in 0..frame.spectrum.num_channels() {
                let bins: Vec<[f64; 2]> = frame
                    .spectrum
                    .positive_bins(ch)
                    .into_iter()
                    .filter(|[f, _]| *f >= 1.0)
                    .collect();
                plot_ui.line(
                    Line::new(PlotPoints::new(bins))
                        .color(PALETTE[ch % PALETTE.len()])
                        .name(format!("Ch{}", ch + 1)),
                );
            }
        });
}
fn draw_bands(ui: &mut egui::Ui, frame: &Frame, height: f32) {
    ui.label("EEG Bands (uV)");
    let bars: Vec<Bar> = frame
        .band_powers
        .iter()
        .enumerate()
        .map(|(i, (band, power))| Bar::new((i + 1) as f64, power).width(0.6).name(band.name()))
        .collect();
    Plot::new("band_plot")
        .height(height)
        .allow_drag(false)
        .allow_zoom(false)
        .include_x(0.5)
        .include_x(5.5)
        .include_y(0.0)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).color(Color32::from_rgb(255, 80, 80)));
        });
    ui.columns(Band::ALL.len(), |cols| {
        for (col, band) in cols.iter_mut().zip(Band::ALL) {
            col.vertical_centered(|ui| ui.label(band.name()));
        }
    });
}
impl eframe::App for ScopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.ticker.due(Instant::now()) {
            self.last_outcome = Some(self.render_loop.tick(&mut self.context));
        }
        ctx.request_repaint_after(self.ticker.remaining(Instant::now()));
        let mut visuals = egui::Visuals::dark();
        visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(10, 10, 15);
        ctx.set_visuals(visuals);
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.monospace(self.status_line());
                if let Some(fault) = self.render_loop.last_fault() {
                    ui.label(RichText::new(format!("last fault: {fault}")).color(Color32::YELLOW));
                }
                let refused = self.context.gain_faults().len();
                if refused > 0 {
                    ui.label(
                        RichText::new(format!("{refused} gain command(s) rejected"))
                            .color(Color32::YELLOW),
                    );
                }
            });
        });
        let Some(frame) = self.render_loop.frame() else {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.centered_and_justified(|ui| {
                    ui.heading("Waiting for a full window of samples...");
                });
            });
            return;
        };
        egui::SidePanel::right("spectrum")
            .min_width(420.0)
            .show(ctx, |ui| {
                let half = (ui.available_height() / 2.0 - 40.0).max(80.0);
                draw_spectrum(ui, frame, half);
                ui.separator();
                draw_bands(ui, frame, half);
            });
        egui::CentralPanel::default().show(ctx, |ui| {
            draw_time_series(ui, frame);
        });
    }
}
