//! Currency conversion via exchangerate-api.com.

use chrono::{DateTime, Utc};
use fiscus_core::config::RatesConfig;
use fiscus_core::error::FiscusError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// A currency shown in the converter picker.
#[derive(Debug, Clone, Serialize)]
pub struct Currency {
    pub code: &'static str,
    pub name: &'static str,
    pub symbol: &'static str,
}

/// Currencies offered by default in the converter.
pub const POPULAR_CURRENCIES: &[Currency] = &[
    Currency { code: "USD", name: "US Dollar", symbol: "$" },
    Currency { code: "EUR", name: "Euro", symbol: "€" },
    Currency { code: "GBP", name: "British Pound", symbol: "£" },
    Currency { code: "JPY", name: "Japanese Yen", symbol: "¥" },
    Currency { code: "AUD", name: "Australian Dollar", symbol: "A$" },
    Currency { code: "CAD", name: "Canadian Dollar", symbol: "C$" },
    Currency { code: "CHF", name: "Swiss Franc", symbol: "Fr" },
    Currency { code: "CNY", name: "Chinese Yuan", symbol: "¥" },
    Currency { code: "INR", name: "Indian Rupee", symbol: "₹" },
];

/// Latest exchange rates for one base currency.
#[derive(Debug, Clone, Deserialize)]
pub struct RateTable {
    pub base: String,
    pub rates: HashMap<String, f64>,
    #[serde(default = "Utc::now")]
    pub fetched_at: DateTime<Utc>,
}

/// Result of one currency conversion.
#[derive(Debug, Clone, Serialize)]
pub struct Conversion {
    pub amount: f64,
    pub from: String,
    pub to: String,
    pub rate: f64,
    pub converted_amount: f64,
    pub timestamp: DateTime<Utc>,
}

impl RateTable {
    /// Convert `amount` from the table's base currency to `to`.
    pub fn convert(&self, amount: f64, to: &str) -> Result<Conversion, FiscusError> {
        let to = to.to_uppercase();
        let rate = *self
            .rates
            .get(&to)
            .ok_or_else(|| FiscusError::Rate(format!("exchange rate not found for {to}")))?;
        Ok(Conversion {
            amount,
            from: self.base.clone(),
            to,
            rate,
            converted_amount: amount * rate,
            timestamp: Utc::now(),
        })
    }
}

/// Response shape from exchangerate-api.com.
#[derive(Deserialize)]
struct RatesResponse {
    base: String,
    rates: HashMap<String, f64>,
}

/// Exchange-rate API client.
pub struct RateClient {
    client: reqwest::Client,
    base_url: String,
}

impl RateClient {
    pub fn from_config(config: &RatesConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
        }
    }

    /// Fetch the latest rates for `base` (case-insensitive code).
    pub async fn latest(&self, base: &str) -> Result<RateTable, FiscusError> {
        let base = base.to_uppercase();
        let url = format!("{}/latest/{base}", self.base_url.trim_end_matches('/'));
        debug!("rates: GET /latest/{base}");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FiscusError::Rate(format!("rate request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(FiscusError::Rate(format!(
                "rate API returned {}",
                resp.status()
            )));
        }

        let parsed: RatesResponse = resp
            .json()
            .await
            .map_err(|e| FiscusError::Rate(format!("failed to parse rates: {e}")))?;

        Ok(RateTable {
            base: parsed.base,
            rates: parsed.rates,
            fetched_at: Utc::now(),
        })
    }

    /// Convert `amount` from one currency to another using live rates.
    pub async fn convert(
        &self,
        amount: f64,
        from: &str,
        to: &str,
    ) -> Result<Conversion, FiscusError> {
        let table = self.latest(from).await?;
        table.convert(amount, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> RateTable {
        let mut rates = HashMap::new();
        rates.insert("EUR".to_string(), 0.92);
        rates.insert("GBP".to_string(), 0.79);
        RateTable {
            base: "USD".to_string(),
            rates,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_convert_known_currency() {
        let conversion = sample_table().convert(100.0, "eur").unwrap();
        assert_eq!(conversion.from, "USD");
        assert_eq!(conversion.to, "EUR");
        assert!((conversion.rate - 0.92).abs() < 1e-9);
        assert!((conversion.converted_amount - 92.0).abs() < 1e-9);
    }

    #[test]
    fn test_convert_unknown_currency_is_rate_error() {
        let err = sample_table().convert(100.0, "XYZ").unwrap_err();
        assert!(matches!(err, FiscusError::Rate(_)));
        assert!(err.to_string().contains("XYZ"));
    }

    #[test]
    fn test_rates_response_parsing() {
        let json = r#"{"base":"USD","date":"2026-08-24","rates":{"EUR":0.92,"JPY":148.3}}"#;
        let parsed: RatesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.base, "USD");
        assert_eq!(parsed.rates.len(), 2);
    }

    #[test]
    fn test_popular_currencies_have_unique_codes() {
        let mut codes: Vec<_> = POPULAR_CURRENCIES.iter().map(|c| c.code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), POPULAR_CURRENCIES.len());
    }
}
