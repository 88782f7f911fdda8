//! The remote forecaster seam.
//!
//! The actual irradiance modeling is the remote service's job; this client
//! only ships the prepared parameter bundle and parses the resulting
//! estimate. Retry and backoff are left to the transport and the host
//! scheduler.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::debug;

use crate::domain::Estimate;
use crate::forecast::request::ForecastRequest;

/// Asynchronous estimate operation of the external forecasting service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SolarForecaster: Send + Sync {
    async fn estimate(&self) -> Result<Estimate>;
}

/// HTTP client for the solar forecast API
pub struct OpenMeteoForecaster {
    request: ForecastRequest,
    client: reqwest::Client,
}

impl OpenMeteoForecaster {
    pub fn new(request: ForecastRequest) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static("solar-forecast-coordinator/0.2"),
        );
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()?;
        Ok(Self { request, client })
    }

    fn estimate_url(&self) -> String {
        format!(
            "{}/v1/solar/estimate",
            self.request.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl SolarForecaster for OpenMeteoForecaster {
    async fn estimate(&self) -> Result<Estimate> {
        let url = self.estimate_url();
        debug!(%url, arrays = self.request.array_count(), "requesting solar forecast");

        let resp = self
            .client
            .post(&url)
            .json(&self.request)
            .send()
            .await
            .context("forecast POST failed")?;

        let status = resp.status();
        let body = resp.text().await.context("forecast read failed")?;
        if !status.is_success() {
            anyhow::bail!("forecast API error: HTTP {status}: {body}");
        }

        let raw: RawEstimate =
            serde_json::from_str(&body).context("forecast JSON parse failed")?;
        Ok(raw.into())
    }
}

#[derive(Debug, Deserialize)]
struct RawEstimate {
    #[serde(default)]
    watts: BTreeMap<DateTime<Utc>, f64>,
    #[serde(default)]
    wh_days: BTreeMap<NaiveDate, f64>,
    #[serde(default)]
    wh_period: BTreeMap<DateTime<Utc>, f64>,
}

impl From<RawEstimate> for Estimate {
    fn from(raw: RawEstimate) -> Self {
        Estimate::new(raw.watts, raw.wh_days, raw.wh_period)
    }
}
