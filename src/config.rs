use std::num::NonZeroU32;

use crate::error::{Result, ScoreError};

pub const API_KEY_VAR: &str = "GPTZERO_API_KEY";
pub const BASE_URL_VAR: &str = "GPTZERO_BASE_URL";
pub const DEFAULT_BASE_URL: &str = "https://api.gptzero.me";

/// Everything the scoring client needs, resolved up front. A missing or
/// empty API key fails here, before the first network call, instead of
/// surfacing as a 401 from the service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_ms: u64,
    pub qps: NonZeroU32,
}

impl ClientConfig {
    pub fn new(
        api_key: Option<String>,
        base_url: Option<String>,
        timeout_ms: u64,
        qps: u32,
    ) -> Result<Self> {
        let api_key = match api_key {
            Some(k) if !k.trim().is_empty() => k,
            _ => return Err(ScoreError::Config(format!("{API_KEY_VAR} is not set"))),
        };
        let qps = NonZeroU32::new(qps)
            .ok_or_else(|| ScoreError::Config("qps must be at least 1".into()))?;
        Ok(Self {
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            timeout_ms,
            qps,
        })
    }

    pub fn from_env(timeout_ms: u64, qps: u32) -> Result<Self> {
        Self::new(
            std::env::var(API_KEY_VAR).ok(),
            std::env::var(BASE_URL_VAR).ok(),
            timeout_ms,
            qps,
        )
    }
}
