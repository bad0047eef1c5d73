use crate::catalog::Instrument;
use crate::chart::{self, ChartKind, PriceFigure, VolumeFigure};
use crate::data::MarketDataSource;
use crate::error::{EmptySeriesError, PassError};
use crate::metrics::PeriodMetrics;
use crate::range::{self, DateRangeSelection, ResolvedRange};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// Everything a shell collected from its widgets for one pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UiSelection {
    pub instrument: &'static Instrument,
    pub chart_kind: ChartKind,
    pub range: DateRangeSelection,
}

/// What a successful pass hands back for display.
#[derive(Clone, Debug)]
pub struct PassOutput {
    pub instrument: &'static Instrument,
    pub range: ResolvedRange,
    pub metrics: PeriodMetrics,
    pub price: PriceFigure,
    pub volume: VolumeFigure,
}

/// One full dashboard pass: resolve the range, fetch, compute, build figures.
///
/// An invalid custom range stops the pass before the data source is touched.
pub async fn run_pass<S>(
    source: &S,
    selection: &UiSelection,
    now: DateTime<Utc>,
) -> Result<PassOutput, PassError>
where
    S: MarketDataSource + Sync,
{
    let range = range::resolve(&selection.range, now)?;
    let instrument = selection.instrument;
    let (start, end) = range.query_bounds();

    let series = source
        .fetch_daily(instrument.symbol, start, end)
        .await
        .inspect_err(|e| warn!("Fetch failed for {}: {}", instrument.symbol, e))?;

    if series.is_empty() {
        warn!("No bars for {} ({})", instrument.symbol, range.label);
        return Err(EmptySeriesError.into());
    }
    info!(
        "Loaded {} bars for {} ({})",
        series.len(),
        instrument.symbol,
        range.label
    );

    let metrics = PeriodMetrics::compute(&series)?;
    let price = chart::build_price_figure(instrument.display_name, &series, selection.chart_kind, &range.label);
    let volume = chart::build_volume_figure(instrument.display_name, &series, &range.label);

    Ok(PassOutput {
        instrument,
        range,
        metrics,
        price,
        volume,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::data::{MockSource, PricePoint};
    use crate::error::FetchError;
    use crate::range::PresetPeriod;
    use chrono::{NaiveDate, TimeZone};
    use std::sync::Mutex;

    /// Records every request and serves a fixed series.
    #[derive(Default)]
    struct RecordingSource {
        bars: Vec<PricePoint>,
        fail: bool,
        calls: Mutex<Vec<(String, NaiveDate, NaiveDate)>>,
    }

    impl MarketDataSource for RecordingSource {
        async fn fetch_daily(
            &self,
            symbol: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<Vec<PricePoint>, FetchError> {
            self.calls.lock().unwrap().push((symbol.to_string(), start, end));
            if self.fail {
                return Err(FetchError::Status { symbol: symbol.to_string(), status: 500 });
            }
            Ok(self.bars.clone())
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 15, 0, 0).unwrap()
    }

    fn selection(range: DateRangeSelection, chart_kind: ChartKind) -> UiSelection {
        UiSelection {
            instrument: catalog::default_instrument(),
            chart_kind,
            range,
        }
    }

    #[tokio::test]
    async fn test_pass_queries_with_exclusive_end() {
        let source = RecordingSource {
            bars: vec![
                PricePoint { date: date(2024, 6, 9), open: 100.0, high: 105.0, low: 95.0, close: 100.0, volume: 1000 },
                PricePoint { date: date(2024, 6, 10), open: 100.0, high: 115.0, low: 108.0, close: 110.0, volume: 2000 },
            ],
            ..Default::default()
        };
        let sel = selection(DateRangeSelection::Predefined(PresetPeriod::Days7), ChartKind::Candlestick);

        let out = run_pass(&source, &sel, now()).await.unwrap();

        let calls = source.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[("BTC-USD".to_string(), date(2024, 6, 3), date(2024, 6, 11))]);
        assert_eq!(out.range.label, "Last 7 days");
        assert_eq!(out.metrics.current_price, 110.0);
        assert_eq!(out.metrics.period_high, 115.0);
        assert_eq!(out.price.title, "Bitcoin Price (Last 7 days) - Candlestick Chart");
        assert_eq!(out.volume.title, "Bitcoin Trading Volume (Last 7 days)");
    }

    #[tokio::test]
    async fn test_invalid_range_never_fetches() {
        let source = RecordingSource::default();
        let sel = selection(
            DateRangeSelection::Custom { start: date(2024, 6, 10), end: date(2024, 6, 1) },
            ChartKind::Line,
        );

        let err = run_pass(&source, &sel, now()).await.unwrap_err();
        assert!(err.is_range_error());
        assert!(source.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_range_ending_on_last_calendar_day_never_fetches() {
        let source = RecordingSource::default();
        let sel = selection(
            DateRangeSelection::Custom { start: NaiveDate::MAX, end: NaiveDate::MAX },
            ChartKind::Candlestick,
        );

        let err = run_pass(&source, &sel, now()).await.unwrap_err();
        assert!(err.is_range_error());
        assert!(source.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_series_is_an_error() {
        let source = RecordingSource::default();
        let sel = selection(DateRangeSelection::default(), ChartKind::Line);
        let err = run_pass(&source, &sel, now()).await.unwrap_err();
        assert!(matches!(err, PassError::EmptySeries(_)));
    }

    #[tokio::test]
    async fn test_fetch_failure_halts_pass() {
        let source = RecordingSource { fail: true, ..Default::default() };
        let sel = selection(DateRangeSelection::default(), ChartKind::Candlestick);
        let err = run_pass(&source, &sel, now()).await.unwrap_err();
        assert!(matches!(err, PassError::Fetch(FetchError::Status { status: 500, .. })));
        assert_eq!(source.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_source_figures_match_series_length() {
        let sel = UiSelection {
            instrument: catalog::find("Ethereum").unwrap(),
            chart_kind: ChartKind::Line,
            range: DateRangeSelection::Custom { start: date(2024, 6, 1), end: date(2024, 6, 10) },
        };
        let out = run_pass(&MockSource, &sel, now()).await.unwrap();
        // Both ends inclusive.
        assert_eq!(out.price.len(), 10);
        assert_eq!(out.volume.bars.len(), 10);
        assert_eq!(out.range.label, "2024-06-01 to 2024-06-10");
        assert_eq!(out.price.title, "Ethereum Price (2024-06-01 to 2024-06-10) - Line Chart");
    }
}
