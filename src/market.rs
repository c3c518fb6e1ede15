//! Market data lookup
//!
//! `MarketDataProvider` is the seam; `YahooFinanceClient` is the live
//! implementation against Yahoo's public quote-summary and chart endpoints.
//! The stock lookup never raises: provider failures become an error result.

use crate::config::AdvisorConfig;
use crate::error::AdvisorError;
use crate::models::{CalculatorResult, StockParameters};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

pub const OPERATION: &str = "retrieve stock data";

const QUOTE_MODULES: &str = "price,summaryDetail,assetProfile,financialData";
const USER_AGENT: &str = concat!("financial-advisor-bot/", env!("CARGO_PKG_VERSION"));

/// Source of quotes and price history.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn quote(&self, ticker: &str) -> Result<Quote>;

    /// Daily bars covering `period` (e.g. "1d", "5d", "1mo").
    async fn history(&self, ticker: &str, period: &str) -> Result<Vec<PriceBar>>;
}

/// Raw quote fields as reported by the provider; any of them may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Quote {
    pub name: Option<String>,
    pub sector: Option<String>,
    pub current_price: Option<f64>,
    pub regular_market_price: Option<f64>,
    pub previous_close: Option<f64>,
    pub open: Option<f64>,
    pub day_low: Option<f64>,
    pub day_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub volume: Option<u64>,
    pub avg_volume: Option<u64>,
    pub market_cap: Option<u64>,
    pub pe_ratio: Option<f64>,
    /// Fraction, e.g. 0.0052 for 0.52%.
    pub dividend_yield: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBar {
    pub date: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Stock lookup payload. Missing fields serialize as `"N/A"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockSnapshot {
    #[serde(serialize_with = "or_not_available")]
    pub name: Option<String>,
    #[serde(serialize_with = "or_not_available")]
    pub sector: Option<String>,
    #[serde(serialize_with = "or_not_available")]
    pub current_price: Option<f64>,
    #[serde(serialize_with = "or_not_available")]
    pub previous_close: Option<f64>,
    #[serde(serialize_with = "or_not_available")]
    pub open: Option<f64>,
    #[serde(serialize_with = "or_not_available")]
    pub day_low: Option<f64>,
    #[serde(serialize_with = "or_not_available")]
    pub day_high: Option<f64>,
    #[serde(rename = "52_week_low", serialize_with = "or_not_available")]
    pub fifty_two_week_low: Option<f64>,
    #[serde(rename = "52_week_high", serialize_with = "or_not_available")]
    pub fifty_two_week_high: Option<f64>,
    #[serde(serialize_with = "or_not_available")]
    pub volume: Option<u64>,
    #[serde(serialize_with = "or_not_available")]
    pub avg_volume: Option<u64>,
    #[serde(serialize_with = "or_not_available")]
    pub market_cap: Option<u64>,
    #[serde(serialize_with = "or_not_available")]
    pub pe_ratio: Option<f64>,
    /// Percent.
    #[serde(serialize_with = "or_not_available")]
    pub dividend_yield: Option<f64>,
    pub historical_data: Vec<PriceBar>,
}

impl StockSnapshot {
    pub fn new(quote: Quote, historical_data: Vec<PriceBar>) -> Self {
        Self {
            name: quote.name,
            sector: quote.sector,
            current_price: quote.current_price.or(quote.regular_market_price),
            previous_close: quote.previous_close,
            open: quote.open,
            day_low: quote.day_low,
            day_high: quote.day_high,
            fifty_two_week_low: quote.fifty_two_week_low,
            fifty_two_week_high: quote.fifty_two_week_high,
            volume: quote.volume,
            avg_volume: quote.avg_volume,
            market_cap: quote.market_cap,
            pe_ratio: quote.pe_ratio,
            dividend_yield: quote.dividend_yield.map(|fraction| fraction * 100.0),
            historical_data,
        }
    }
}

fn or_not_available<T, S>(value: &Option<T>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    match value {
        Some(value) => value.serialize(serializer),
        None => serializer.serialize_str("N/A"),
    }
}

/// Quote plus history for one ticker.
pub async fn fetch_snapshot(
    provider: &dyn MarketDataProvider,
    ticker: &str,
    period: &str,
) -> Result<StockSnapshot> {
    let quote = provider.quote(ticker).await?;
    let history = provider.history(ticker, period).await?;
    Ok(StockSnapshot::new(quote, history))
}

pub async fn get_stock_data(
    provider: &dyn MarketDataProvider,
    params: &StockParameters,
) -> CalculatorResult {
    let outcome = fetch_snapshot(provider, &params.ticker, &params.period).await;
    if let Err(e) = &outcome {
        error!(ticker = %params.ticker, error = %e, "Stock lookup failed");
    }
    CalculatorResult::from_outcome(OPERATION, outcome)
}

//
// ================= Yahoo Finance =================
//

#[derive(Clone)]
pub struct YahooFinanceClient {
    client: Client,
    base_url: String,
}

impl YahooFinanceClient {
    pub fn new(config: &AdvisorConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(4)
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.market_data_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| AdvisorError::MarketData(format!("request failed for {}: {}", path, e)))?;

        let status = response.status();
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| AdvisorError::MarketData(format!("invalid JSON response: {}", e)))?;

        if !status.is_success() {
            return Err(AdvisorError::MarketData(format!(
                "provider returned {} for {}: {}",
                status,
                path,
                provider_error(&body).unwrap_or_else(|| body.to_string())
            )));
        }

        Ok(body)
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceClient {
    async fn quote(&self, ticker: &str) -> Result<Quote> {
        info!(ticker, "Fetching quote");

        let body = self
            .get_json(
                &format!("/v10/finance/quoteSummary/{}", ticker),
                &[("modules", QUOTE_MODULES)],
            )
            .await?;

        let summary = first_result(&body, "quoteSummary")?;
        Ok(parse_quote(summary))
    }

    async fn history(&self, ticker: &str, period: &str) -> Result<Vec<PriceBar>> {
        info!(ticker, period, "Fetching price history");

        let body = self
            .get_json(
                &format!("/v8/finance/chart/{}", ticker),
                &[("range", period), ("interval", "1d")],
            )
            .await?;

        let chart = first_result(&body, "chart")?;
        let bars = parse_bars(chart);
        debug!(ticker, bars = bars.len(), "Price history received");

        Ok(bars)
    }
}

/// `body[envelope].result[0]`, or the provider's own error description.
fn first_result<'a>(body: &'a Value, envelope: &str) -> Result<&'a Value> {
    body.get(envelope)
        .and_then(|e| e.get("result"))
        .and_then(|r| r.get(0))
        .ok_or_else(|| {
            AdvisorError::MarketData(
                provider_error(body).unwrap_or_else(|| format!("no {} result", envelope)),
            )
        })
}

fn provider_error(body: &Value) -> Option<String> {
    ["quoteSummary", "chart"].iter().find_map(|envelope| {
        let error = body.get(envelope)?.get("error")?;
        error
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string)
    })
}

fn parse_quote(summary: &Value) -> Quote {
    let price = &summary["price"];
    let detail = &summary["summaryDetail"];
    let financial = &summary["financialData"];

    Quote {
        name: text_field(price, "shortName"),
        sector: text_field(&summary["assetProfile"], "sector"),
        current_price: raw_f64(financial, "currentPrice"),
        regular_market_price: raw_f64(price, "regularMarketPrice"),
        previous_close: raw_f64(detail, "previousClose"),
        open: raw_f64(detail, "open"),
        day_low: raw_f64(detail, "dayLow"),
        day_high: raw_f64(detail, "dayHigh"),
        fifty_two_week_low: raw_f64(detail, "fiftyTwoWeekLow"),
        fifty_two_week_high: raw_f64(detail, "fiftyTwoWeekHigh"),
        volume: raw_u64(detail, "volume"),
        avg_volume: raw_u64(detail, "averageVolume"),
        market_cap: raw_u64(detail, "marketCap"),
        pe_ratio: raw_f64(detail, "trailingPE"),
        dividend_yield: raw_f64(detail, "dividendYield"),
    }
}

fn parse_bars(chart: &Value) -> Vec<PriceBar> {
    let timestamps = chart["timestamp"].as_array().cloned().unwrap_or_default();
    let quote = &chart["indicators"]["quote"][0];

    let series = |name: &str, i: usize| quote[name].get(i).and_then(Value::as_f64);

    timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            // Halted sessions come back as nulls; skip them.
            Some(PriceBar {
                date: Utc.timestamp_opt(ts.as_i64()?, 0).single()?,
                open: series("open", i)?,
                high: series("high", i)?,
                low: series("low", i)?,
                close: series("close", i)?,
                volume: quote["volume"].get(i).and_then(Value::as_u64).unwrap_or(0),
            })
        })
        .collect()
}

/// Yahoo wraps numbers as `{"raw": 1.23, "fmt": "1.23"}`; bare numbers are accepted too.
fn raw_value<'a>(module: &'a Value, key: &str) -> Option<&'a Value> {
    let field = module.get(key)?;
    match field.get("raw") {
        Some(raw) => Some(raw),
        None if field.is_number() => Some(field),
        None => None,
    }
}

fn raw_f64(module: &Value, key: &str) -> Option<f64> {
    raw_value(module, key)?.as_f64()
}

fn raw_u64(module: &Value, key: &str) -> Option<u64> {
    let raw = raw_value(module, key)?;
    raw.as_u64()
        .or_else(|| raw.as_f64().filter(|n| *n >= 0.0).map(|n| n as u64))
}

fn text_field(module: &Value, key: &str) -> Option<String> {
    module
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
