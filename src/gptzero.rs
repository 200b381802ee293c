use std::time::Duration;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{Result, ScoreError};

pub const PREDICT_PATH: &str = "/v2/predict/text";

/// One serialized payload in, one decoded response out.
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn predict(&self, payload: &str) -> Result<Value>;
}

pub struct GptzeroClient {
    http: Client,
    key: String,
    base_url: String,
    limiter: DefaultDirectRateLimiter,
}

impl GptzeroClient {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()?;
        let limiter = RateLimiter::direct(Quota::per_second(cfg.qps));
        Ok(Self {
            http,
            key: cfg.api_key.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            limiter,
        })
    }
}

#[async_trait]
impl Scorer for GptzeroClient {
    async fn predict(&self, payload: &str) -> Result<Value> {
        self.limiter.until_ready().await;
        let url = format!("{}{}", self.base_url, PREDICT_PATH);
        debug!(%url, bytes = payload.len(), "posting document");
        let resp = self
            .http
            .post(&url)
            .header("x-api-key", &self.key)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(payload.to_owned())
            .send()
            .await?;
        let status = resp.status();
        // Keep the raw body on non-2xx: rate-limit and validation errors
        // come back as JSON the caller may want to inspect.
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ScoreError::Service { status, body });
        }
        Ok(serde_json::from_str(&body)?)
    }
}
