use super::{checked, ServiceError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

pub const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const UNKNOWN_CURRENCY: &str = "Currency information not available";

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    /// Rounded to two decimals.
    pub price: f64,
    pub currency: String,
}

#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn latest(&self, symbol: &str) -> Result<Quote, ServiceError>;
}

pub struct YahooQuotes {
    client: Client,
    base_url: String,
}

impl YahooQuotes {
    pub fn new() -> Self {
        Self::with_base_url(YAHOO_BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }
}

impl Default for YahooQuotes {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteSource for YahooQuotes {
    async fn latest(&self, symbol: &str) -> Result<Quote, ServiceError> {
        let url = format!(
            "{}/v8/finance/chart/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(symbol)
        );
        debug!("Fetching quote from {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("range", "1d"), ("interval", "1d")])
            .header(reqwest::header::USER_AGENT, "Mozilla/5.0")
            .send()
            .await?;
        let body: Value = checked(response).await?.json().await?;
        parse_chart(symbol, &body)
    }
}

/// Last non-null close of the day, falling back to `regularMarketPrice`.
pub fn parse_chart(symbol: &str, body: &Value) -> Result<Quote, ServiceError> {
    let chart = &body["chart"];
    if let Some(description) = chart["error"]["description"].as_str() {
        return Err(ServiceError::Api(description.to_string()));
    }

    let result = chart["result"]
        .get(0)
        .ok_or_else(|| ServiceError::Parse(format!("no chart data for {}", symbol)))?;

    let close = result["indicators"]["quote"][0]["close"]
        .as_array()
        .and_then(|closes| closes.iter().rev().find_map(Value::as_f64));
    let price = close
        .or_else(|| result["meta"]["regularMarketPrice"].as_f64())
        .ok_or_else(|| ServiceError::Parse(format!("no price data for {}", symbol)))?;

    let currency = result["meta"]["currency"]
        .as_str()
        .unwrap_or(UNKNOWN_CURRENCY)
        .to_string();

    Ok(Quote {
        symbol: symbol.to_string(),
        price: (price * 100.0).round() / 100.0,
        currency,
    })
}
