use eframe::egui;
use egui_plot::{Bar, BarChart, BoxElem, BoxPlot, BoxSpread, Line, Plot, PlotPoints};
use crate::app::{App, AppState, RangeMode};
use crate::catalog::INSTRUMENTS;
use crate::chart::{ChartKind, PriceFigure, PriceTrace, Rgb, VolumeFigure};
use crate::config::APP_TITLE;
use crate::error::PassError;
use crate::metrics::{format_delta, format_usd, format_volume, PeriodMetrics};
use crate::pipeline::{self, PassOutput};
use crate::range::PresetPeriod;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use tokio::sync::mpsc;
use tracing::debug;

// ──────────────────────────────────────────────────────────────────────────────
// Color Palette: dark financial terminal
// ──────────────────────────────────────────────────────────────────────────────

const ACCENT_BLUE: egui::Color32 = egui::Color32::from_rgb(59, 130, 246);
const ACCENT_GREEN: egui::Color32 = egui::Color32::from_rgb(34, 197, 94);
const ACCENT_RED: egui::Color32 = egui::Color32::from_rgb(239, 68, 68);

const BG_DARK: egui::Color32 = egui::Color32::from_rgb(15, 15, 20);
const BG_CARD: egui::Color32 = egui::Color32::from_rgb(24, 24, 32);
const BG_ELEVATED: egui::Color32 = egui::Color32::from_rgb(32, 32, 44);
const TEXT_PRIMARY: egui::Color32 = egui::Color32::from_rgb(226, 232, 240);
const TEXT_SECONDARY: egui::Color32 = egui::Color32::from_rgb(148, 163, 184);
const BORDER_SUBTLE: egui::Color32 = egui::Color32::from_rgb(51, 51, 68);

const SECONDS_PER_DAY: f64 = 86_400.0;
const DATE_FORMAT: &str = "%Y-%m-%d";

type PassResult = Result<PassOutput, PassError>;

pub struct GuiApp {
    app: App,
    start_input: String,
    end_input: String,
    date_input_error: Option<String>,
    pass_rx: Option<mpsc::Receiver<PassResult>>,
    passes_started: u64,
}

impl GuiApp {
    pub fn new(app: App) -> Self {
        let start_input = app.controls.custom_start.format(DATE_FORMAT).to_string();
        let end_input = app.controls.custom_end.format(DATE_FORMAT).to_string();
        Self {
            app,
            start_input,
            end_input,
            date_input_error: None,
            pass_rx: None,
            passes_started: 0,
        }
    }

    fn apply_theme(ctx: &egui::Context) {
        let mut style = (*ctx.style()).clone();

        style.visuals.window_rounding = egui::Rounding::same(8.0);
        style.visuals.widgets.noninteractive.rounding = egui::Rounding::same(6.0);
        style.visuals.widgets.inactive.rounding = egui::Rounding::same(6.0);
        style.visuals.widgets.active.rounding = egui::Rounding::same(6.0);
        style.visuals.widgets.hovered.rounding = egui::Rounding::same(6.0);

        style.visuals.dark_mode = true;
        style.visuals.panel_fill = BG_DARK;
        style.visuals.window_fill = BG_CARD;
        style.visuals.faint_bg_color = BG_ELEVATED;

        style.visuals.widgets.noninteractive.bg_fill = BG_CARD;
        style.visuals.widgets.noninteractive.fg_stroke = egui::Stroke::new(1.0, TEXT_SECONDARY);
        style.visuals.widgets.inactive.bg_fill = BG_ELEVATED;
        style.visuals.widgets.inactive.fg_stroke = egui::Stroke::new(1.0, TEXT_PRIMARY);
        style.visuals.widgets.hovered.bg_fill = egui::Color32::from_rgb(45, 45, 60);
        style.visuals.widgets.hovered.fg_stroke = egui::Stroke::new(1.0, egui::Color32::WHITE);
        style.visuals.widgets.active.bg_fill = ACCENT_BLUE;
        style.visuals.widgets.active.fg_stroke = egui::Stroke::new(1.0, egui::Color32::WHITE);

        style.visuals.selection.bg_fill = ACCENT_BLUE.linear_multiply(0.4);
        style.visuals.selection.stroke = egui::Stroke::new(1.0, ACCENT_BLUE);

        style.spacing.item_spacing = egui::vec2(8.0, 6.0);

        ctx.set_style(style);
    }

    /// Starts the next pass only when none is in flight; later changes wait for it.
    fn poll_pass(&mut self) {
        if let Some(rx) = &mut self.pass_rx {
            match rx.try_recv() {
                Ok(result) => {
                    self.app.apply_result(result);
                    self.pass_rx = None;
                }
                Err(mpsc::error::TryRecvError::Empty) => return,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.app.state = AppState::Dashboard;
                    self.app.error_msg = Some("Dashboard update was interrupted.".to_string());
                    self.pass_rx = None;
                }
            }
        }

        if self.app.take_dirty() {
            self.start_pass();
        }
    }

    fn start_pass(&mut self) {
        let selection = self.app.controls.selection();
        let source = self.app.source().clone();
        let (tx, rx) = mpsc::channel(1);
        self.passes_started += 1;
        debug!("Starting pass {} for {:?}", self.passes_started, selection);

        self.app.state = AppState::Loading;
        tokio::spawn(async move {
            let result = pipeline::run_pass(&source, &selection, Utc::now()).await;
            let _ = tx.send(result).await;
        });
        self.pass_rx = Some(rx);
    }
}

impl eframe::App for GuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        Self::apply_theme(ctx);
        self.poll_pass();

        // ── Sidebar ──
        egui::SidePanel::left("settings")
            .resizable(false)
            .default_width(240.0)
            .show(ctx, |ui| self.render_settings(ui));

        // ── Main Content ──
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| self.render_main(ui));
        });

        if self.app.state == AppState::Loading {
            ctx.request_repaint();
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Settings
// ──────────────────────────────────────────────────────────────────────────────

impl GuiApp {
    fn render_settings(&mut self, ui: &mut egui::Ui) {
        let before = self.app.controls.clone();
        let controls = &mut self.app.controls;

        ui.add_space(8.0);
        ui.label(egui::RichText::new("Settings").size(18.0).strong().color(ACCENT_BLUE));
        ui.add_space(8.0);

        section_header(ui, "Select Crypto Currency");
        egui::ComboBox::from_id_salt("instrument")
            .selected_text(controls.instrument.display_name)
            .width(200.0)
            .show_ui(ui, |ui| {
                for instrument in INSTRUMENTS {
                    ui.selectable_value(&mut controls.instrument, instrument, instrument.display_name);
                }
            });

        section_header(ui, "Select Chart Type");
        egui::ComboBox::from_id_salt("chart_kind")
            .selected_text(controls.chart_kind.label())
            .width(200.0)
            .show_ui(ui, |ui| {
                for kind in ChartKind::ALL {
                    ui.selectable_value(&mut controls.chart_kind, kind, kind.label());
                }
            });

        section_header(ui, "Select Time Range Type");
        egui::ComboBox::from_id_salt("range_mode")
            .selected_text(controls.range_mode.label())
            .width(200.0)
            .show_ui(ui, |ui| {
                for mode in RangeMode::ALL {
                    ui.selectable_value(&mut controls.range_mode, mode, mode.label());
                }
            });

        match controls.range_mode {
            RangeMode::Predefined => {
                section_header(ui, "Time Period");
                egui::ComboBox::from_id_salt("period")
                    .selected_text(controls.period.label())
                    .width(200.0)
                    .show_ui(ui, |ui| {
                        for period in PresetPeriod::ALL {
                            ui.selectable_value(&mut controls.period, period, period.label());
                        }
                    });
            }
            RangeMode::Custom => {
                let mut edited = false;
                ui.horizontal(|ui| {
                    ui.vertical(|ui| {
                        ui.set_width(108.0);
                        section_header(ui, "Start Date");
                        edited |= ui.text_edit_singleline(&mut self.start_input).changed();
                    });
                    ui.vertical(|ui| {
                        ui.set_width(108.0);
                        section_header(ui, "End Date");
                        edited |= ui.text_edit_singleline(&mut self.end_input).changed();
                    });
                });
                if edited {
                    self.apply_date_inputs();
                }
            }
        }

        if self.app.controls != before {
            self.app.mark_dirty();
        }

        let input_error = self.date_input_error.as_ref().filter(|_| self.custom_mode());
        for err in [input_error, self.app.range_error.as_ref()].into_iter().flatten() {
            ui.add_space(12.0);
            egui::Frame::none()
                .fill(egui::Color32::from_rgba_premultiplied(239, 68, 68, 25))
                .rounding(egui::Rounding::same(6.0))
                .inner_margin(egui::Margin::same(8.0))
                .show(ui, |ui| {
                    ui.label(egui::RichText::new(err.as_str()).color(ACCENT_RED).size(12.0));
                });
        }
    }
}

impl GuiApp {
    fn custom_mode(&self) -> bool {
        self.app.controls.range_mode == RangeMode::Custom
    }

    /// Both text inputs must parse before either date reaches the controls.
    /// Until then the figures on screen belong to an older range, so they are dropped.
    fn apply_date_inputs(&mut self) {
        match (parse_date(&self.start_input), parse_date(&self.end_input)) {
            (Some(start), Some(end)) => {
                self.date_input_error = None;
                self.app.controls.custom_start = start;
                self.app.controls.custom_end = end;
            }
            _ => {
                self.date_input_error = Some("Dates must be YYYY-MM-DD".to_string());
                self.app.output = None;
            }
        }
    }

    fn figures_visible(&self) -> bool {
        !(self.custom_mode() && self.date_input_error.is_some())
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

// ──────────────────────────────────────────────────────────────────────────────
// Dashboard
// ──────────────────────────────────────────────────────────────────────────────

impl GuiApp {
    fn render_main(&self, ui: &mut egui::Ui) {
        ui.add_space(4.0);
        ui.label(egui::RichText::new(APP_TITLE).size(26.0).strong().color(TEXT_PRIMARY));
        ui.add_space(8.0);

        if self.app.state == AppState::Loading {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(egui::RichText::new("Fetching market data...").color(TEXT_SECONDARY));
            });
            return;
        }

        if let Some(err) = &self.app.error_msg {
            egui::Frame::none()
                .fill(egui::Color32::from_rgba_premultiplied(239, 68, 68, 25))
                .rounding(egui::Rounding::same(6.0))
                .inner_margin(egui::Margin::same(8.0))
                .show(ui, |ui| {
                    ui.label(egui::RichText::new(format!("Error: {}", err)).color(ACCENT_RED).size(13.0));
                });
            return;
        }

        if !self.figures_visible() {
            ui.label(egui::RichText::new("Correct the date inputs in the sidebar to continue.")
                .color(TEXT_SECONDARY));
            return;
        }

        let Some(output) = &self.app.output else {
            if self.app.range_error.is_some() {
                ui.label(egui::RichText::new("Correct the date range in the sidebar to continue.")
                    .color(TEXT_SECONDARY));
            }
            return;
        };

        render_metric_cards(ui, &output.metrics);
        ui.add_space(12.0);
        render_price_figure(ui, &output.price);
        ui.add_space(12.0);
        render_volume_figure(ui, &output.volume);
    }
}

fn plot_color(rgb: Rgb) -> egui::Color32 {
    egui::Color32::from_rgb(rgb.0, rgb.1, rgb.2)
}

fn date_x(date: NaiveDate) -> f64 {
    date.and_time(NaiveTime::default()).and_utc().timestamp() as f64
}

fn format_x(x: f64, fmt: &str) -> String {
    Utc.timestamp_opt(x as i64, 0)
        .map(|dt| dt.format(fmt).to_string())
        .single()
        .unwrap_or_default()
}

fn render_metric_cards(ui: &mut egui::Ui, metrics: &PeriodMetrics) {
    ui.columns(4, |cols| {
        summary_card(&mut cols[0], "Current Price", &format_usd(metrics.current_price), None);
        summary_card(&mut cols[1], "Starting Price", &format_usd(metrics.start_price), None);
        summary_card(&mut cols[2], "Period High", &format_usd(metrics.period_high), Some(metrics.high_delta_pct()));
        summary_card(&mut cols[3], "Period Low", &format_usd(metrics.period_low), Some(metrics.low_delta_pct()));
    });
}

fn figure_frame(ui: &mut egui::Ui, title: &str, add_contents: impl FnOnce(&mut egui::Ui)) {
    egui::Frame::none()
        .fill(BG_CARD)
        .rounding(egui::Rounding::same(8.0))
        .stroke(egui::Stroke::new(1.0, BORDER_SUBTLE))
        .inner_margin(egui::Margin::same(8.0))
        .show(ui, |ui| {
            section_header(ui, title);
            add_contents(ui);
        });
}

fn render_price_figure(ui: &mut egui::Ui, fig: &PriceFigure) {
    figure_frame(ui, &fig.title, |ui| {
        let plot = Plot::new("price_chart")
            .x_axis_label(fig.x_title)
            .y_axis_label(fig.y_title)
            .x_axis_formatter(|x, _range| format_x(x.value, "%b %d"))
            .label_formatter(|_name, value| {
                format!("Date: {}\nPrice: {}", format_x(value.x, DATE_FORMAT), format_usd(value.y))
            })
            .view_aspect(2.5)
            .allow_drag(true)
            .allow_zoom(true);

        plot.show(ui, |plot_ui| match &fig.trace {
            PriceTrace::Candlestick { candles, increasing, decreasing } => {
                let boxes: Vec<BoxElem> = candles
                    .iter()
                    .map(|c| {
                        let color = plot_color(if c.is_increasing() { *increasing } else { *decreasing });
                        let body_lo = c.open.min(c.close);
                        let body_hi = c.open.max(c.close);
                        BoxElem::new(
                            date_x(c.date),
                            BoxSpread::new(c.low, body_lo, c.close, body_hi, c.high),
                        )
                        .name(format!(
                            "{}\nO {}  H {}\nL {}  C {}",
                            c.date.format(DATE_FORMAT),
                            format_usd(c.open),
                            format_usd(c.high),
                            format_usd(c.low),
                            format_usd(c.close)
                        ))
                        .box_width(SECONDS_PER_DAY * 0.7)
                        .whisker_width(0.0)
                        .fill(color)
                        .stroke(egui::Stroke::new(1.0, color))
                    })
                    .collect();
                plot_ui.box_plot(BoxPlot::new(boxes).name("OHLC"));
            }
            PriceTrace::Line { points, color, width } => {
                let points: PlotPoints = points.iter().map(|(d, close)| [date_x(*d), *close]).collect();
                plot_ui.line(Line::new(points).name("Close").color(plot_color(*color)).width(*width));
            }
        });
    });
}

fn render_volume_figure(ui: &mut egui::Ui, fig: &VolumeFigure) {
    figure_frame(ui, &fig.title, |ui| {
        let color = plot_color(fig.color);
        let bars: Vec<Bar> = fig
            .bars
            .iter()
            .map(|(d, v)| {
                Bar::new(date_x(*d), *v as f64)
                    .width(SECONDS_PER_DAY * 0.8)
                    .fill(color)
                    .name(format!("{}: {}", d.format(DATE_FORMAT), format_volume(*v as f64)))
            })
            .collect();

        Plot::new("volume_chart")
            .height(fig.height)
            .x_axis_label(fig.x_title)
            .y_axis_label(fig.y_title)
            .x_axis_formatter(|x, _range| format_x(x.value, "%b %d"))
            .allow_drag(true)
            .allow_zoom(true)
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).name(fig.name).color(color));
            });
    });
}

// ──────────────────────────────────────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────────────────────────────────────

fn section_header(ui: &mut egui::Ui, text: &str) {
    ui.label(egui::RichText::new(text)
        .size(13.0)
        .strong()
        .color(TEXT_PRIMARY));
    ui.add_space(4.0);
}

fn summary_card(ui: &mut egui::Ui, label: &str, value: &str, delta: Option<Option<f64>>) {
    egui::Frame::none()
        .fill(BG_CARD)
        .rounding(egui::Rounding::same(8.0))
        .stroke(egui::Stroke::new(1.0, BORDER_SUBTLE))
        .inner_margin(egui::Margin::same(12.0))
        .show(ui, |ui| {
            ui.set_min_width(100.0);
            ui.vertical_centered(|ui| {
                ui.label(egui::RichText::new(label)
                    .size(10.0)
                    .color(TEXT_SECONDARY));
                ui.label(egui::RichText::new(value)
                    .size(20.0)
                    .strong()
                    .color(TEXT_PRIMARY));
                if let Some(pct) = delta {
                    let color = match pct {
                        Some(p) if p >= 0.0 => ACCENT_GREEN,
                        Some(_) => ACCENT_RED,
                        None => TEXT_SECONDARY,
                    };
                    ui.label(egui::RichText::new(format_delta(pct)).size(12.0).color(color));
                }
            });
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataSource, MockSource};

    fn gui_app() -> GuiApp {
        GuiApp::new(App::new(
            DataSource::Mock(MockSource),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        ))
    }

    /// Polls until the in-flight pass has been received, like successive frames would.
    async fn drain_pass(gui: &mut GuiApp) {
        let started = gui.passes_started;
        for _ in 0..1000 {
            tokio::task::yield_now().await;
            gui.poll_pass();
            if gui.pass_rx.is_none() || gui.passes_started != started {
                return;
            }
        }
        panic!("pass never completed");
    }

    #[tokio::test]
    async fn test_changes_during_pass_wait_for_it() {
        let mut gui = gui_app();
        gui.poll_pass();
        assert_eq!(gui.passes_started, 1);
        assert!(gui.pass_rx.is_some());
        assert_eq!(gui.app.state, AppState::Loading);

        // A widget change mid-pass only queues the next one.
        gui.app.controls.chart_kind = ChartKind::Line;
        gui.app.mark_dirty();
        gui.poll_pass();
        assert_eq!(gui.passes_started, 1);

        // The first result lands and exactly one follow-up starts in the same frame.
        drain_pass(&mut gui).await;
        assert_eq!(gui.passes_started, 2);
        assert!(gui.pass_rx.is_some());
        let first = gui.app.output.as_ref().unwrap();
        assert!(first.price.title.ends_with("Candlestick Chart"));

        drain_pass(&mut gui).await;
        assert_eq!(gui.passes_started, 2);
        assert!(gui.pass_rx.is_none());
        assert_eq!(gui.app.state, AppState::Dashboard);
        let second = gui.app.output.as_ref().unwrap();
        assert!(second.price.title.ends_with("Line Chart"));

        gui.poll_pass();
        assert_eq!(gui.passes_started, 2);
    }

    #[test]
    fn test_dropped_pass_reports_interruption() {
        let mut gui = gui_app();
        assert!(gui.app.take_dirty());
        let (tx, rx) = mpsc::channel(1);
        drop(tx);
        gui.pass_rx = Some(rx);

        gui.poll_pass();

        assert!(gui.pass_rx.is_none());
        assert_eq!(gui.app.state, AppState::Dashboard);
        assert_eq!(gui.app.error_msg.as_deref(), Some("Dashboard update was interrupted."));
        assert_eq!(gui.passes_started, 0);
    }

    #[tokio::test]
    async fn test_unparsable_date_hides_stale_figures() {
        let mut gui = gui_app();
        gui.poll_pass();
        drain_pass(&mut gui).await;
        assert!(gui.app.output.is_some());

        gui.app.controls.range_mode = RangeMode::Custom;
        gui.start_input = "2024-13-01".to_string();
        gui.apply_date_inputs();
        assert!(gui.app.output.is_none());
        assert!(!gui.figures_visible());
        assert_eq!(gui.date_input_error.as_deref(), Some("Dates must be YYYY-MM-DD"));

        gui.start_input = "2024-06-01".to_string();
        gui.end_input = "2024-06-10".to_string();
        gui.apply_date_inputs();
        assert!(gui.figures_visible());
        assert_eq!(gui.app.controls.custom_start, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(gui.app.controls.custom_end, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
    }

    #[test]
    fn test_parse_date_input() {
        assert_eq!(parse_date(" 2024-06-01 "), NaiveDate::from_ymd_opt(2024, 6, 1));
        assert_eq!(parse_date("2024-13-01"), None);
        assert_eq!(parse_date("06/01/2024"), None);
    }

    #[test]
    fn test_date_axis_round_trip() {
        let d = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(date_x(d), 1_717_200_000.0);
        assert_eq!(format_x(date_x(d), DATE_FORMAT), "2024-06-01");
    }
}
