use crate::catalog::{self, Instrument, INSTRUMENTS};
use crate::chart::ChartKind;
use crate::data::DataSource;
use crate::error::PassError;
use crate::pipeline::{self, PassOutput, UiSelection};
use crate::range::{DateRangeSelection, PresetPeriod};
use chrono::{Duration, NaiveDate, Utc};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::io;
use tracing::{debug, info};

pub const RANGE_ERROR_MSG: &str = "Error: Invalid Date Range!!";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RangeMode {
    #[default]
    Predefined,
    Custom,
}

impl RangeMode {
    pub const ALL: [RangeMode; 2] = [RangeMode::Predefined, RangeMode::Custom];

    pub fn label(self) -> &'static str {
        match self {
            Self::Predefined => "Predefined Period",
            Self::Custom => "Custom Range",
        }
    }
}

/// Current widget values, shared by the terminal and desktop shells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Controls {
    pub instrument: &'static Instrument,
    pub chart_kind: ChartKind,
    pub range_mode: RangeMode,
    pub period: PresetPeriod,
    pub custom_start: NaiveDate,
    pub custom_end: NaiveDate,
}

impl Controls {
    pub fn new(today: NaiveDate) -> Self {
        let (custom_start, custom_end) = match DateRangeSelection::default_custom(today) {
            DateRangeSelection::Custom { start, end } => (start, end),
            DateRangeSelection::Predefined(_) => (today, today),
        };
        Self {
            instrument: catalog::default_instrument(),
            chart_kind: ChartKind::default(),
            range_mode: RangeMode::default(),
            period: PresetPeriod::default(),
            custom_start,
            custom_end,
        }
    }

    pub fn selection(&self) -> UiSelection {
        let range = match self.range_mode {
            RangeMode::Predefined => DateRangeSelection::Predefined(self.period),
            RangeMode::Custom => DateRangeSelection::Custom {
                start: self.custom_start,
                end: self.custom_end,
            },
        };
        UiSelection {
            instrument: self.instrument,
            chart_kind: self.chart_kind,
            range,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    Instrument,
    ChartKind,
    RangeMode,
    Period,
    StartDate,
    EndDate,
}

impl Focus {
    /// Sidebar fields in display order for the given range mode.
    pub fn visible(mode: RangeMode) -> &'static [Focus] {
        match mode {
            RangeMode::Predefined => &[Focus::Instrument, Focus::ChartKind, Focus::RangeMode, Focus::Period],
            RangeMode::Custom => &[
                Focus::Instrument,
                Focus::ChartKind,
                Focus::RangeMode,
                Focus::StartDate,
                Focus::EndDate,
            ],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppState {
    Loading,
    Dashboard,
}

pub struct App {
    pub should_quit: bool,
    pub state: AppState,
    pub controls: Controls,
    pub focus: Focus,
    pub output: Option<PassOutput>,
    pub range_error: Option<String>,
    pub error_msg: Option<String>,
    source: DataSource,
    dirty: bool,
}

impl App {
    pub fn new(source: DataSource, today: NaiveDate) -> Self {
        Self {
            should_quit: false,
            state: AppState::Loading,
            controls: Controls::new(today),
            focus: Focus::Instrument,
            output: None,
            range_error: None,
            error_msg: None,
            source,
            dirty: true,
        }
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    /// True once after any widget change; the caller then runs a pass.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Runs one pass against the current widget values and stores the outcome.
    pub async fn refresh(&mut self) {
        let selection = self.controls.selection();
        self.state = AppState::Loading;
        let result = pipeline::run_pass(&self.source, &selection, Utc::now()).await;
        self.apply_result(result);
    }

    pub fn apply_result(&mut self, result: Result<PassOutput, PassError>) {
        self.state = AppState::Dashboard;
        match result {
            Ok(output) => {
                self.output = Some(output);
                self.range_error = None;
                self.error_msg = None;
            }
            Err(e) if e.is_range_error() => {
                debug!("Pass halted: {}", e);
                self.output = None;
                self.range_error = Some(RANGE_ERROR_MSG.to_string());
                self.error_msg = None;
            }
            Err(e) => {
                self.output = None;
                self.range_error = None;
                self.error_msg = Some(match e {
                    PassError::EmptySeries(_) => format!(
                        "No price data for {} in the selected range.",
                        self.controls.instrument.symbol
                    ),
                    other => format!("Failed to load {}: {}", self.controls.instrument.display_name, other),
                });
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('r') => self.mark_dirty(),
            KeyCode::Up | KeyCode::BackTab => self.move_focus(-1),
            KeyCode::Down | KeyCode::Tab => self.move_focus(1),
            KeyCode::Left => self.adjust(-1, key.modifiers),
            KeyCode::Right => self.adjust(1, key.modifiers),
            _ => {}
        }
    }

    fn move_focus(&mut self, step: isize) {
        let fields = Focus::visible(self.controls.range_mode);
        let idx = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[cycle(idx, step, fields.len())];
    }

    fn adjust(&mut self, step: isize, modifiers: KeyModifiers) {
        let c = &mut self.controls;
        match self.focus {
            Focus::Instrument => {
                let idx = INSTRUMENTS.iter().position(|i| i == c.instrument).unwrap_or(0);
                c.instrument = &INSTRUMENTS[cycle(idx, step, INSTRUMENTS.len())];
            }
            Focus::ChartKind => {
                let idx = ChartKind::ALL.iter().position(|k| *k == c.chart_kind).unwrap_or(0);
                c.chart_kind = ChartKind::ALL[cycle(idx, step, ChartKind::ALL.len())];
            }
            Focus::RangeMode => {
                let idx = RangeMode::ALL.iter().position(|m| *m == c.range_mode).unwrap_or(0);
                c.range_mode = RangeMode::ALL[cycle(idx, step, RangeMode::ALL.len())];
            }
            Focus::Period => {
                let idx = PresetPeriod::ALL.iter().position(|p| *p == c.period).unwrap_or(0);
                c.period = PresetPeriod::ALL[cycle(idx, step, PresetPeriod::ALL.len())];
            }
            Focus::StartDate => c.custom_start = shift_date(c.custom_start, step, modifiers),
            Focus::EndDate => c.custom_end = shift_date(c.custom_end, step, modifiers),
        }
        self.mark_dirty();
    }

    pub async fn run(&mut self, terminal: &mut crate::tui::Tui) -> io::Result<()> {
        info!("Terminal dashboard started");
        while !self.should_quit {
            if self.take_dirty() {
                // Paint the loading state before blocking on the pass.
                self.state = AppState::Loading;
                terminal.draw(|f| crate::ui::render(f, self))?;
                self.refresh().await;
            }

            terminal.draw(|f| crate::ui::render(f, self))?;

            if event::poll(std::time::Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }
        }
        Ok(())
    }
}

fn cycle(idx: usize, step: isize, len: usize) -> usize {
    (idx as isize + step).rem_euclid(len as isize) as usize
}

fn shift_date(date: NaiveDate, step: isize, modifiers: KeyModifiers) -> NaiveDate {
    let days = if modifiers.contains(KeyModifiers::SHIFT) { 30 } else { 1 };
    let delta = Duration::days(days * step as i64);
    date.checked_add_signed(delta).unwrap_or(if step < 0 {
        NaiveDate::MIN
    } else {
        NaiveDate::MAX
    })
}
