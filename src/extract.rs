use serde_json::Value;

use crate::error::{Result, ScoreError};

/// Pull the generated-probability scalar out of a decoded response.
///
/// Reads `documents[0].average_generated_prob`. Element 0 is correct only
/// because every request carries exactly one document; if multi-document
/// batching is ever introduced this must take the batch position instead.
pub fn average_generated_prob(response: &Value) -> Result<f64> {
    let documents = response
        .get("documents")
        .and_then(Value::as_array)
        .ok_or_else(|| ScoreError::Schema("response has no `documents` sequence".into()))?;
    let first = documents.first().ok_or_else(|| {
        ScoreError::Schema("service returned zero results for a one-document request".into())
    })?;
    first
        .get("average_generated_prob")
        .and_then(Value::as_f64)
        .ok_or_else(|| {
            ScoreError::Schema("document result has no numeric `average_generated_prob`".into())
        })
}
