use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::gptzero::Scorer;

/// Scripted stand-in for the scoring service: a closure maps each payload
/// to a response, with an optional per-call delay.
pub struct FakeScorer {
    pub handler: Box<dyn Fn(&str) -> Result<Value> + Send + Sync>,
    pub delay_ms: u64,
}

#[async_trait]
impl Scorer for FakeScorer {
    async fn predict(&self, payload: &str) -> Result<Value> {
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        (self.handler)(payload)
    }
}
