//! Fiat exchange-rate lookup
//!
//! One call, one decimal rate, or an error. No caching.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use crate::error::RateError;

pub const DEFAULT_RATE_URL: &str = "https://api.kraken.com/0/public/Ticker?pair=SOLEUR";

/// Source of the SOL → EUR rate.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn sol_eur_rate(&self) -> Result<Decimal, RateError>;
}

#[derive(Debug, Deserialize)]
struct TickerResponse {
    #[serde(default)]
    error: Vec<String>,
    #[serde(default)]
    result: HashMap<String, TickerInfo>,
}

#[derive(Debug, Deserialize)]
struct TickerInfo {
    /// Volume weighted average price: [today, last 24 hours]
    #[serde(default)]
    p: Vec<String>,
}

/// Kraken public ticker for the SOLEUR pair.
#[derive(Clone)]
pub struct KrakenRateSource {
    url: String,
    http_client: reqwest::Client,
}

impl KrakenRateSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RateError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            http_client,
        })
    }
}

#[async_trait]
impl RateSource for KrakenRateSource {
    async fn sol_eur_rate(&self) -> Result<Decimal, RateError> {
        log::debug!("Fetching SOL/EUR rate from {}", self.url);

        let response: TickerResponse = self
            .http_client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_ticker(response)
    }
}

fn parse_ticker(response: TickerResponse) -> Result<Decimal, RateError> {
    if !response.error.is_empty() {
        return Err(RateError::Api(response.error.join("; ")));
    }

    // Kraken keys the pair as either "SOLEUR" or its internal name
    let info = response
        .result
        .get("SOLEUR")
        .or_else(|| response.result.values().next())
        .ok_or(RateError::UnexpectedShape)?;

    let rate_str = info.p.get(1).ok_or(RateError::UnexpectedShape)?;
    let rate = Decimal::from_str(rate_str).map_err(|_| RateError::InvalidRate(rate_str.clone()))?;

    if rate <= Decimal::ZERO {
        return Err(RateError::InvalidRate(rate_str.clone()));
    }
    Ok(rate)
}

/// Fixed rate, for paper runs and tests.
#[derive(Clone, Copy, Debug)]
pub struct FixedRate(pub Decimal);

#[async_trait]
impl RateSource for FixedRate {
    async fn sol_eur_rate(&self) -> Result<Decimal, RateError> {
        Ok(self.0)
    }
}
