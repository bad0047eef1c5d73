//! Renderer-agnostic figure descriptions.
//!
//! The terminal and desktop shells each draw these; nothing here knows about
//! ratatui or egui.

use crate::data::PricePoint;
use chrono::NaiveDate;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChartKind {
    #[default]
    Candlestick,
    Line,
}

impl ChartKind {
    pub const ALL: [ChartKind; 2] = [ChartKind::Candlestick, ChartKind::Line];

    pub fn label(self) -> &'static str {
        match self {
            Self::Candlestick => "Candlestick",
            Self::Line => "Line",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const GREEN: Rgb = Rgb(0, 128, 0);
    pub const RED: Rgb = Rgb(255, 0, 0);
    pub const BLUE: Rgb = Rgb(0, 0, 255);
    pub const LIGHT_BLUE: Rgb = Rgb(173, 216, 230);
}

pub const LINE_WIDTH: f32 = 3.0;
pub const VOLUME_FIGURE_HEIGHT: f32 = 300.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Candle {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn is_increasing(&self) -> bool {
        self.close >= self.open
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PriceTrace {
    Candlestick {
        candles: Vec<Candle>,
        increasing: Rgb,
        decreasing: Rgb,
    },
    Line {
        points: Vec<(NaiveDate, f64)>,
        color: Rgb,
        width: f32,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct PriceFigure {
    pub title: String,
    pub x_title: &'static str,
    pub y_title: &'static str,
    pub range_slider: bool,
    pub trace: PriceTrace,
}

impl PriceFigure {
    pub fn len(&self) -> usize {
        match &self.trace {
            PriceTrace::Candlestick { candles, .. } => candles.len(),
            PriceTrace::Line { points, .. } => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lowest and highest value the trace draws, for axis scaling.
    pub fn y_bounds(&self) -> Option<(f64, f64)> {
        let (lo, hi) = match &self.trace {
            PriceTrace::Candlestick { candles, .. } => candles.iter().fold(
                (f64::INFINITY, f64::NEG_INFINITY),
                |(lo, hi), c| (lo.min(c.low), hi.max(c.high)),
            ),
            PriceTrace::Line { points, .. } => points.iter().fold(
                (f64::INFINITY, f64::NEG_INFINITY),
                |(lo, hi), &(_, y)| (lo.min(y), hi.max(y)),
            ),
        };
        (lo <= hi).then_some((lo, hi))
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        match &self.trace {
            PriceTrace::Candlestick { candles, .. } => candles.iter().map(|c| c.date).collect(),
            PriceTrace::Line { points, .. } => points.iter().map(|(d, _)| *d).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct VolumeFigure {
    pub title: String,
    pub x_title: &'static str,
    pub y_title: &'static str,
    pub height: f32,
    pub name: &'static str,
    pub color: Rgb,
    pub bars: Vec<(NaiveDate, u64)>,
}

impl VolumeFigure {
    pub fn max_volume(&self) -> u64 {
        self.bars.iter().map(|(_, v)| *v).max().unwrap_or(0)
    }
}

pub fn build_price_figure(
    name: &str,
    series: &[PricePoint],
    kind: ChartKind,
    range_label: &str,
) -> PriceFigure {
    let trace = match kind {
        ChartKind::Candlestick => PriceTrace::Candlestick {
            candles: series
                .iter()
                .map(|p| Candle {
                    date: p.date,
                    open: p.open,
                    high: p.high,
                    low: p.low,
                    close: p.close,
                })
                .collect(),
            increasing: Rgb::GREEN,
            decreasing: Rgb::RED,
        },
        ChartKind::Line => PriceTrace::Line {
            points: series.iter().map(|p| (p.date, p.close)).collect(),
            color: Rgb::BLUE,
            width: LINE_WIDTH,
        },
    };

    PriceFigure {
        title: format!("{} Price ({}) - {} Chart", name, range_label, kind.label()),
        x_title: "Date",
        y_title: "Price (USD)",
        range_slider: false,
        trace,
    }
}

pub fn build_volume_figure(name: &str, series: &[PricePoint], range_label: &str) -> VolumeFigure {
    VolumeFigure {
        title: format!("{} Trading Volume ({})", name, range_label),
        x_title: "Date",
        y_title: "Volume",
        height: VOLUME_FIGURE_HEIGHT,
        name: "Volume",
        color: Rgb::LIGHT_BLUE,
        bars: series.iter().map(|p| (p.date, p.volume)).collect(),
    }
}
