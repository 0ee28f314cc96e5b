//! Stock and crypto quote lookups with portfolio math.
//!
//! Stock lookups fall back to a mocked quote when Yahoo is unreachable
//! so the portfolio screen always renders; crypto lookups propagate
//! their errors.

use chrono::{DateTime, TimeZone, Utc};
use fiscus_core::error::FiscusError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";
const COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// A point-in-time stock quote.
#[derive(Debug, Clone, Serialize)]
pub struct StockQuote {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub high: f64,
    pub low: f64,
    pub volume: u64,
    pub timestamp: DateTime<Utc>,
}

/// A point-in-time crypto quote (USD).
#[derive(Debug, Clone, Serialize)]
pub struct CryptoQuote {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change_24h: f64,
    pub change_percent_24h: f64,
    pub market_cap: f64,
    pub volume_24h: f64,
}

/// A position held by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub shares: f64,
    pub avg_cost: f64,
}

/// A holding valued at current prices.
#[derive(Debug, Clone, Serialize)]
pub struct ValuedHolding {
    pub symbol: String,
    pub name: String,
    pub shares: f64,
    pub avg_cost: f64,
    pub current_price: f64,
    pub total_value: f64,
    pub gain_loss: f64,
    pub gain_loss_percent: f64,
}

/// Portfolio totals over a set of valued holdings.
#[derive(Debug, Clone, Serialize)]
pub struct Portfolio {
    pub holdings: Vec<ValuedHolding>,
    pub total_value: f64,
    pub total_gain_loss: f64,
    pub total_gain_loss_percent: f64,
}

impl Portfolio {
    /// Value holdings against quotes. Symbols without a quote are
    /// valued at cost. Percentages are zero when the cost basis is zero.
    pub fn from_holdings(holdings: &[Holding], quotes: &[StockQuote]) -> Self {
        let quote_map: HashMap<&str, &StockQuote> =
            quotes.iter().map(|q| (q.symbol.as_str(), q)).collect();

        let valued: Vec<ValuedHolding> = holdings
            .iter()
            .map(|h| {
                let symbol = h.symbol.to_uppercase();
                let quote = quote_map.get(symbol.as_str());
                let current_price = quote.map(|q| q.price).unwrap_or(h.avg_cost);
                let total_value = h.shares * current_price;
                let cost_basis = h.shares * h.avg_cost;
                let gain_loss = total_value - cost_basis;
                let gain_loss_percent = if cost_basis > 0.0 {
                    gain_loss / cost_basis * 100.0
                } else {
                    0.0
                };
                ValuedHolding {
                    name: quote.map(|q| q.name.clone()).unwrap_or_else(|| symbol.clone()),
                    symbol,
                    shares: h.shares,
                    avg_cost: h.avg_cost,
                    current_price,
                    total_value,
                    gain_loss,
                    gain_loss_percent,
                }
            })
            .collect();

        let total_value: f64 = valued.iter().map(|h| h.total_value).sum();
        let total_cost: f64 = valued.iter().map(|h| h.shares * h.avg_cost).sum();
        let total_gain_loss = total_value - total_cost;
        let total_gain_loss_percent = if total_cost > 0.0 {
            total_gain_loss / total_cost * 100.0
        } else {
            0.0
        };

        Self {
            holdings: valued,
            total_value,
            total_gain_loss,
            total_gain_loss_percent,
        }
    }
}

// --- Yahoo chart response shapes (tolerant parsing) ---

#[derive(Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
}

#[derive(Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    indicators: ChartIndicators,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: String,
    regular_market_price: f64,
    chart_previous_close: f64,
    #[serde(default)]
    regular_market_time: i64,
}

#[derive(Deserialize)]
struct ChartIndicators {
    quote: Vec<ChartQuote>,
}

#[derive(Deserialize)]
struct ChartQuote {
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    quotes: Vec<SearchQuote>,
}

#[derive(Deserialize)]
struct SearchQuote {
    symbol: String,
    shortname: Option<String>,
    longname: Option<String>,
}

/// Stock quote client over the Yahoo Finance chart API.
pub struct StockClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for StockClient {
    fn default() -> Self {
        Self::new()
    }
}

impl StockClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: YAHOO_BASE_URL.to_string(),
        }
    }

    /// Fetch a quote, falling back to a mocked one on any failure.
    pub async fn quote(&self, symbol: &str) -> StockQuote {
        match self.fetch_quote(symbol).await {
            Ok(quote) => quote,
            Err(e) => {
                warn!("stock quote failed for {symbol}, using mock: {e}");
                mock_quote(symbol)
            }
        }
    }

    /// Fetch quotes for several symbols.
    pub async fn quotes(&self, symbols: &[&str]) -> Vec<StockQuote> {
        let mut out = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            out.push(self.quote(symbol).await);
        }
        out
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<StockQuote, FiscusError> {
        let symbol = symbol.to_uppercase();
        let url = format!(
            "{}/v8/finance/chart/{symbol}?interval=1d&range=1d",
            self.base_url
        );
        debug!("quotes: GET /v8/finance/chart/{symbol}");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FiscusError::Rate(format!("stock request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(FiscusError::Rate(format!(
                "stock API returned {}",
                resp.status()
            )));
        }

        let envelope: ChartEnvelope = resp
            .json()
            .await
            .map_err(|e| FiscusError::Rate(format!("failed to parse chart: {e}")))?;

        parse_chart(&symbol, envelope)
    }

    /// Search for ticker symbols by free text. Failures return an
    /// empty list rather than an error.
    pub async fn search(&self, query: &str) -> Vec<(String, String)> {
        let url = format!(
            "{}/v1/finance/search?q={}&quotesCount=10&newsCount=0",
            self.base_url,
            urlencode(query)
        );

        let result: Result<SearchEnvelope, FiscusError> = async {
            let resp = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| FiscusError::Rate(format!("search request failed: {e}")))?;
            resp.json()
                .await
                .map_err(|e| FiscusError::Rate(format!("failed to parse search: {e}")))
        }
        .await;

        match result {
            Ok(envelope) => envelope
                .quotes
                .into_iter()
                .map(|q| {
                    let name = q
                        .shortname
                        .or(q.longname)
                        .unwrap_or_else(|| q.symbol.clone());
                    (q.symbol, name)
                })
                .collect(),
            Err(e) => {
                warn!("symbol search failed: {e}");
                Vec::new()
            }
        }
    }
}

fn parse_chart(symbol: &str, envelope: ChartEnvelope) -> Result<StockQuote, FiscusError> {
    let result = envelope
        .chart
        .result
        .and_then(|mut r| (!r.is_empty()).then(|| r.remove(0)))
        .ok_or_else(|| FiscusError::Rate("chart result empty".to_string()))?;

    let meta = result.meta;
    let price = meta.regular_market_price;
    let change = price - meta.chart_previous_close;
    let change_percent = if meta.chart_previous_close != 0.0 {
        change / meta.chart_previous_close * 100.0
    } else {
        0.0
    };

    let quote = result.indicators.quote.first();
    let last = |series: Option<&Vec<Option<f64>>>, default: f64| {
        series
            .and_then(|s| s.iter().rev().find_map(|v| *v))
            .unwrap_or(default)
    };

    Ok(StockQuote {
        symbol: symbol.to_string(),
        name: meta.symbol,
        price,
        change,
        change_percent,
        high: last(quote.map(|q| &q.high), price),
        low: last(quote.map(|q| &q.low), price),
        volume: quote
            .and_then(|q| q.volume.iter().rev().find_map(|v| *v))
            .unwrap_or(0),
        timestamp: Utc
            .timestamp_opt(meta.regular_market_time, 0)
            .single()
            .unwrap_or_else(Utc::now),
    })
}

/// Generate a plausible mocked quote so the UI always has something
/// to render.
fn mock_quote(symbol: &str) -> StockQuote {
    let mut rng = rand::thread_rng();
    let price = 100.0 + rng.gen::<f64>() * 400.0;
    let change = (rng.gen::<f64>() - 0.5) * 10.0;
    StockQuote {
        symbol: symbol.to_uppercase(),
        name: symbol.to_uppercase(),
        price,
        change,
        change_percent: change / price * 100.0,
        high: price + change.abs(),
        low: price - change.abs(),
        volume: rng.gen_range(0..10_000_000),
        timestamp: Utc::now(),
    }
}

/// Minimal percent-encoding for query strings.
fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// Per-coin fields in the coingecko simple/price response.
#[derive(Deserialize)]
struct GeckoCoin {
    usd: f64,
    #[serde(default)]
    usd_24h_change: f64,
    #[serde(default)]
    usd_market_cap: f64,
    #[serde(default)]
    usd_24h_vol: f64,
}

/// Crypto quote client over the coingecko simple-price API.
/// Unlike stocks, failures propagate to the caller.
pub struct CryptoClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for CryptoClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: COINGECKO_BASE_URL.to_string(),
        }
    }

    /// Fetch a USD quote by coingecko coin id (e.g. "bitcoin").
    pub async fn quote(&self, coin_id: &str) -> Result<CryptoQuote, FiscusError> {
        let coin_id = coin_id.to_lowercase();
        let url = format!(
            "{}/simple/price?ids={coin_id}&vs_currencies=usd&include_24hr_change=true&include_24hr_vol=true&include_market_cap=true",
            self.base_url
        );
        debug!("quotes: GET /simple/price ids={coin_id}");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FiscusError::Rate(format!("crypto request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(FiscusError::Rate(format!(
                "crypto API returned {}",
                resp.status()
            )));
        }

        let data: HashMap<String, GeckoCoin> = resp
            .json()
            .await
            .map_err(|e| FiscusError::Rate(format!("failed to parse crypto quote: {e}")))?;

        let coin = data
            .get(&coin_id)
            .ok_or_else(|| FiscusError::Rate(format!("crypto not found: {coin_id}")))?;

        Ok(CryptoQuote {
            symbol: coin_id.to_uppercase(),
            name: coin_id.to_uppercase(),
            price: coin.usd,
            change_24h: coin.usd * coin.usd_24h_change / 100.0,
            change_percent_24h: coin.usd_24h_change,
            market_cap: coin.usd_market_cap,
            volume_24h: coin.usd_24h_vol,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chart_response() {
        let json = r#"{"chart":{"result":[{"meta":{"symbol":"AAPL","regularMarketPrice":230.5,"chartPreviousClose":228.0,"regularMarketTime":1756000000},"indicators":{"quote":[{"high":[231.2,null,232.1],"low":[227.5],"volume":[null,51234567]}]}}],"error":null}}"#;
        let envelope: ChartEnvelope = serde_json::from_str(json).unwrap();
        let quote = parse_chart("AAPL", envelope).unwrap();
        assert_eq!(quote.symbol, "AAPL");
        assert!((quote.price - 230.5).abs() < 1e-9);
        assert!((quote.change - 2.5).abs() < 1e-9);
        assert!((quote.high - 232.1).abs() < 1e-9);
        assert_eq!(quote.volume, 51234567);
    }

    #[test]
    fn test_parse_chart_empty_result_is_error() {
        let json = r#"{"chart":{"result":[],"error":null}}"#;
        let envelope: ChartEnvelope = serde_json::from_str(json).unwrap();
        assert!(parse_chart("AAPL", envelope).is_err());
    }

    #[test]
    fn test_gecko_coin_parsing() {
        let json = r#"{"bitcoin":{"usd":64123.5,"usd_24h_change":-2.1,"usd_market_cap":1.26e12,"usd_24h_vol":3.2e10}}"#;
        let data: HashMap<String, GeckoCoin> = serde_json::from_str(json).unwrap();
        let coin = &data["bitcoin"];
        assert!((coin.usd - 64123.5).abs() < 1e-9);
        assert!((coin.usd_24h_change + 2.1).abs() < 1e-9);
    }

    #[test]
    fn test_mock_quote_is_plausible() {
        let quote = mock_quote("tsla");
        assert_eq!(quote.symbol, "TSLA");
        assert!(quote.price >= 100.0 && quote.price <= 500.0);
        assert!(quote.high >= quote.low);
    }

    #[test]
    fn test_portfolio_math() {
        let holdings = vec![
            Holding {
                symbol: "aapl".into(),
                shares: 10.0,
                avg_cost: 200.0,
            },
            Holding {
                symbol: "MSFT".into(),
                shares: 5.0,
                avg_cost: 400.0,
            },
        ];
        let quotes = vec![StockQuote {
            symbol: "AAPL".into(),
            name: "Apple Inc.".into(),
            price: 230.0,
            change: 2.0,
            change_percent: 0.9,
            high: 231.0,
            low: 228.0,
            volume: 1,
            timestamp: Utc::now(),
        }];

        let portfolio = Portfolio::from_holdings(&holdings, &quotes);
        // AAPL valued at quote, MSFT at cost (no quote available).
        assert!((portfolio.holdings[0].total_value - 2300.0).abs() < 1e-9);
        assert!((portfolio.holdings[1].total_value - 2000.0).abs() < 1e-9);
        assert!((portfolio.total_value - 4300.0).abs() < 1e-9);
        assert!((portfolio.total_gain_loss - 300.0).abs() < 1e-9);
        assert_eq!(portfolio.holdings[0].name, "Apple Inc.");
    }

    #[test]
    fn test_portfolio_zero_cost_basis_guarded() {
        let holdings = vec![Holding {
            symbol: "FREE".into(),
            shares: 10.0,
            avg_cost: 0.0,
        }];
        let portfolio = Portfolio::from_holdings(&holdings, &[]);
        assert!((portfolio.holdings[0].gain_loss_percent).abs() < 1e-9);
        assert!((portfolio.total_gain_loss_percent).abs() < 1e-9);
    }

    #[test]
    fn test_urlencode() {
        assert_eq!(urlencode("apple inc"), "apple+inc");
        assert_eq!(urlencode("a&b"), "a%26b");
    }
}
