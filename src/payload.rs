use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Request body for one document. The service scores exactly what it is
/// given; no length or encoding validation happens on this side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentPayload {
    pub document: String,
    pub multilingual: bool,
}

impl DocumentPayload {
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            multilingual: false,
        }
    }

    pub fn multilingual(mut self, on: bool) -> Self {
        self.multilingual = on;
        self
    }

    /// Serialized, request-ready body.
    pub fn to_body(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Batch form: one request body per text, same order as the input.
pub fn request_bodies<S: AsRef<str>>(texts: &[S], multilingual: bool) -> Result<Vec<String>> {
    texts
        .iter()
        .map(|t| DocumentPayload::new(t.as_ref()).multilingual(multilingual).to_body())
        .collect()
}
