use crate::data::PricePoint;
use crate::error::EmptySeriesError;

/// Summary figures for the metric cards.
///
/// Prices are rounded to cents (half away from zero) when computed; the
/// percentage deltas are derived from those rounded values.
#[derive(Clone, Debug, PartialEq)]
pub struct PeriodMetrics {
    pub current_price: f64,
    pub start_price: f64,
    pub period_high: f64,
    pub period_low: f64,
    pub mean_volume: f64,
}

impl PeriodMetrics {
    pub fn compute(series: &[PricePoint]) -> Result<Self, EmptySeriesError> {
        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            return Err(EmptySeriesError);
        };

        let high = series.iter().map(|p| p.high).fold(f64::NEG_INFINITY, f64::max);
        let low = series.iter().map(|p| p.low).fold(f64::INFINITY, f64::min);
        let mean_volume = series.iter().map(|p| p.volume as f64).sum::<f64>() / series.len() as f64;

        Ok(Self {
            current_price: round2(last.close),
            start_price: round2(first.close),
            period_high: round2(high),
            period_low: round2(low),
            mean_volume,
        })
    }

    /// `None` when the starting price is zero.
    pub fn high_delta_pct(&self) -> Option<f64> {
        pct_change(self.start_price, self.period_high)
    }

    pub fn low_delta_pct(&self) -> Option<f64> {
        pct_change(self.start_price, self.period_low)
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn pct_change(base: f64, value: f64) -> Option<f64> {
    if base == 0.0 {
        return None;
    }
    Some((value - base) / base * 100.0)
}

/// `$1,234.56`
pub fn format_usd(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u128;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, group_thousands(cents / 100), cents % 100)
}

/// `+15.00%`, or `N/A` when the delta is undefined.
pub fn format_delta(pct: Option<f64>) -> String {
    match pct {
        Some(p) => format!("{:+.2}%", p),
        None => "N/A".to_string(),
    }
}

pub fn format_volume(value: f64) -> String {
    group_thousands(value.max(0.0).round() as u128)
}

fn group_thousands(n: u128) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
