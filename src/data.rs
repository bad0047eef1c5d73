use crate::config::{DataProvider, Settings, USER_AGENT};
use crate::error::FetchError;
use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::Deserialize;
use std::future::Future;
use tracing::{debug, info, warn};

/// One day's aggregated OHLCV bar.
#[derive(Clone, Debug, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Anything that can serve daily bars for a symbol.
///
/// `end` is exclusive: bars dated `end` are not returned.
pub trait MarketDataSource {
    fn fetch_daily(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<Vec<PricePoint>, FetchError>> + Send;
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Deserialize, Debug)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

#[derive(Deserialize, Debug)]
struct YahooError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize, Debug)]
struct YahooResult {
    timestamp: Option<Vec<i64>>,
    indicators: YahooIndicators,
}

#[derive(Deserialize, Debug)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
}

#[derive(Deserialize, Debug, Default)]
struct YahooQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Daily bars from the Yahoo Finance v8 chart endpoint.
#[derive(Clone, Debug)]
pub struct YahooSource {
    client: reqwest::Client,
    base_url: String,
}

impl YahooSource {
    pub fn new(base_url: &str, timeout: std::time::Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn chart_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d",
            self.base_url,
            symbol,
            unix_midnight(start),
            unix_midnight(end)
        )
    }
}

impl MarketDataSource for YahooSource {
    async fn fetch_daily(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, FetchError> {
        let url = self.chart_url(symbol, start, end);
        debug!("GET {}", url);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Http { symbol: symbol.to_string(), source })?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|source| FetchError::Http { symbol: symbol.to_string(), source })?;

        // Yahoo reports unknown symbols as a 404 with a chart.error payload.
        match serde_json::from_str::<YahooChartResponse>(&body) {
            Ok(parsed) => parse_chart(symbol, parsed, start, end),
            Err(_) if !status.is_success() => Err(FetchError::Status {
                symbol: symbol.to_string(),
                status: status.as_u16(),
            }),
            Err(e) => Err(FetchError::Decode {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

fn unix_midnight(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::default()).and_utc().timestamp()
}

fn parse_chart(
    symbol: &str,
    response: YahooChartResponse,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<PricePoint>, FetchError> {
    if let Some(err) = response.chart.error {
        return Err(FetchError::NoData {
            symbol: symbol.to_string(),
            reason: err
                .description
                .or(err.code)
                .unwrap_or_else(|| "unknown error".to_string()),
        });
    }

    let result = response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| FetchError::NoData {
            symbol: symbol.to_string(),
            reason: "empty chart result".to_string(),
        })?;

    // No timestamps means the range had no trading data.
    let Some(timestamps) = result.timestamp else {
        return Ok(Vec::new());
    };
    let quotes = result.indicators.quote.into_iter().next().unwrap_or_default();

    let mut history = Vec::with_capacity(timestamps.len());
    let mut skipped = 0usize;
    for (i, &timestamp) in timestamps.iter().enumerate() {
        let field = |v: &Vec<Option<f64>>| v.get(i).copied().flatten();
        let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = (
            field(&quotes.open),
            field(&quotes.high),
            field(&quotes.low),
            field(&quotes.close),
            field(&quotes.volume),
        ) else {
            skipped += 1;
            continue;
        };
        let Some(date) = DateTime::from_timestamp(timestamp, 0).map(|dt| dt.date_naive()) else {
            skipped += 1;
            continue;
        };
        if date < start || date >= end {
            continue;
        }
        history.push(PricePoint {
            date,
            open,
            high,
            low,
            close,
            volume: volume.max(0.0).round() as u64,
        });
    }

    if skipped > 0 {
        warn!("Dropped {} incomplete bars for {}", skipped, symbol);
    }
    history.sort_by_key(|p| p.date);
    history.dedup_by_key(|p| p.date);
    Ok(history)
}

/// Offline source: a deterministic random walk per symbol, one bar per calendar day.
#[derive(Clone, Debug, Default)]
pub struct MockSource;

impl MockSource {
    /// First day the synthetic walk produces a bar for.
    pub fn epoch() -> NaiveDate {
        NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default()
    }

    pub fn generate(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<PricePoint> {
        let seed = symbol
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325u64, |h, b| (h ^ b as u64).wrapping_mul(0x0100_0000_01b3));
        let mut rng = StdRng::seed_from_u64(seed);
        let mut current_price: f64 = rng.gen_range(1.0..1000.0);
        let mut current_date = Self::epoch();
        let mut history = Vec::new();

        while current_date < end {
            let volatility = 0.03;
            let change_pct: f64 = rng.gen_range(-volatility..volatility);
            let open = current_price;
            let close = open * (1.0 + change_pct);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            let volume = rng.gen_range(1_000_000u64..50_000_000);

            if current_date >= start {
                history.push(PricePoint { date: current_date, open, high, low, close, volume });
            }

            current_price = close;
            current_date += Duration::days(1);
        }

        history
    }
}

impl MarketDataSource for MockSource {
    async fn fetch_daily(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, FetchError> {
        Ok(Self::generate(symbol, start, end))
    }
}

/// The source a shell runs its passes against, picked from settings at startup.
#[derive(Clone, Debug)]
pub enum DataSource {
    Yahoo(YahooSource),
    Mock(MockSource),
}

impl DataSource {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let source = match settings.provider {
            DataProvider::Yahoo => {
                Self::Yahoo(YahooSource::new(&settings.yahoo_base_url, settings.http_timeout)?)
            }
            DataProvider::Mock => Self::Mock(MockSource),
        };
        info!("Using data provider: {}", settings.provider.as_str());
        Ok(source)
    }
}

impl MarketDataSource for DataSource {
    async fn fetch_daily(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, FetchError> {
        match self {
            Self::Yahoo(source) => source.fetch_daily(symbol, start, end).await,
            Self::Mock(source) => source.fetch_daily(symbol, start, end).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn parse(json: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PricePoint>, FetchError> {
        let response: YahooChartResponse = serde_json::from_str(json).unwrap();
        parse_chart("BTC-USD", response, start, end)
    }

    #[test]
    fn test_parse_chart_keeps_complete_bars_in_range() {
        // 2024-06-01, 06-02, 06-03, 06-04 at 00:00 UTC
        let json = r#"{"chart":{"result":[{
            "timestamp":[1717200000,1717286400,1717372800,1717459200],
            "indicators":{"quote":[{
                "open":[100.0,101.0,null,103.0],
                "high":[105.0,106.0,107.0,108.0],
                "low":[95.0,96.0,97.0,98.0],
                "close":[101.0,102.0,103.0,104.0],
                "volume":[1000.0,2000.0,3000.0,4000.0]
            }]}
        }],"error":null}}"#;

        let bars = parse(json, date(2024, 6, 1), date(2024, 6, 4)).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, date(2024, 6, 1));
        assert_eq!(bars[1].date, date(2024, 6, 2));
        assert_eq!(bars[1].volume, 2000);
    }

    #[test]
    fn test_parse_chart_error_payload() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse(json, date(2024, 6, 1), date(2024, 6, 4)).unwrap_err();
        match err {
            FetchError::NoData { symbol, reason } => {
                assert_eq!(symbol, "BTC-USD");
                assert!(reason.contains("delisted"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_chart_without_timestamps_is_empty() {
        let json = r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#;
        let bars = parse(json, date(2024, 6, 1), date(2024, 6, 4)).unwrap();
        assert!(bars.is_empty());
    }

    #[test]
    fn test_chart_url_uses_unix_bounds() {
        let source = YahooSource::new("https://example.test/", std::time::Duration::from_secs(5)).unwrap();
        let url = source.chart_url("ETH-USD", date(2024, 6, 1), date(2024, 6, 2));
        assert_eq!(
            url,
            "https://example.test/v8/finance/chart/ETH-USD?period1=1717200000&period2=1717286400&interval=1d"
        );
    }

    #[test]
    fn test_mock_is_deterministic_and_half_open() {
        let a = MockSource::generate("BTC-USD", date(2024, 6, 1), date(2024, 6, 11));
        let b = MockSource::generate("BTC-USD", date(2024, 6, 1), date(2024, 6, 11));
        assert_eq!(a, b);
        assert_eq!(a.len(), 10);
        assert_eq!(a.first().unwrap().date, date(2024, 6, 1));
        assert_eq!(a.last().unwrap().date, date(2024, 6, 10));

        for bar in &a {
            assert!(bar.low <= bar.open.min(bar.close));
            assert!(bar.high >= bar.open.max(bar.close));
        }

        // Overlapping windows see the same bars.
        let wider = MockSource::generate("BTC-USD", date(2024, 5, 1), date(2024, 6, 11));
        assert_eq!(&wider[wider.len() - 10..], &a[..]);
    }

    #[test]
    fn test_mock_empty_when_range_collapses() {
        assert!(MockSource::generate("BTC-USD", date(2024, 6, 1), date(2024, 6, 1)).is_empty());
    }
}
