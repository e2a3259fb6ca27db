use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};

/// Number of fetch attempts before giving up on a cycle
const MAX_ATTEMPTS: u32 = 5;

/// Gateway statuses worth retrying
const RETRY_STATUSES: [u16; 3] = [502, 503, 504];

/// One observed price, held in memory only
#[derive(Clone, Copy, Debug)]
pub struct PriceSample {
    pub price: f64,
    pub observed_at: DateTime<Utc>,
}

/// Decoded price API payload
#[derive(serde::Deserialize)]
struct PriceQuote {
    price: f64,
}

/// Price API client data
pub struct PriceClient {
    http_client: Client,
    base_url: Url,
    ticker: String,
    api_key: SecretString,
    api_host: String,
}

impl PriceClient {
    pub fn new(
        base_url: Url,
        ticker: String,
        api_key: SecretString,
        api_host: String,
        timeout: Duration,
    ) -> Self {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");
        Self {
            http_client,
            base_url,
            ticker,
            api_key,
            api_host,
        }
    }

    /// Fetch the current price of the configured ticker
    ///
    /// Transport errors and gateway statuses (502/503/504) are retried up to
    /// `MAX_ATTEMPTS` times with exponential backoff (factor 1). Any other
    /// non-success status fails the call.
    #[tracing::instrument(name = "Fetching current price", skip(self), fields(ticker = %self.ticker))]
    pub async fn current_price(&self) -> anyhow::Result<PriceSample> {
        let url = self
            .base_url
            .join(&self.ticker)
            .context("Cannot build ticker endpoint URL")?;

        let mut attempt = 0;
        let response = loop {
            attempt += 1;
            let outcome = self
                .http_client
                .get(url.clone())
                .header("x-rapidapi-key", self.api_key.expose_secret())
                .header("x-rapidapi-host", &self.api_host)
                .send()
                .await;

            match outcome {
                Ok(response) if !RETRY_STATUSES.contains(&response.status().as_u16()) => {
                    break response.error_for_status()?;
                }
                Ok(response) => {
                    if attempt >= MAX_ATTEMPTS {
                        break response.error_for_status()?;
                    }
                    tracing::warn!(
                        status = %response.status(),
                        attempt,
                        "Price API returned a gateway error, retrying"
                    );
                }
                Err(e) => {
                    if attempt >= MAX_ATTEMPTS {
                        return Err(e).context("Failed to reach the price API");
                    }
                    tracing::warn!(
                        error.message = %e,
                        attempt,
                        "Failed to reach the price API, retrying"
                    );
                }
            }
            tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt - 1))).await;
        };

        // The upstream API double-encodes its payload: the response body is a
        // JSON string whose contents are the actual JSON object.
        let body: String = response
            .json()
            .await
            .context("Failed to read the price API response body")?;
        let quote: PriceQuote =
            serde_json::from_str(&body).context("Failed to decode the price API payload")?;

        Ok(PriceSample {
            price: quote.price,
            observed_at: Utc::now(),
        })
    }
}
