use std::path::{Path, PathBuf};

use futures::{stream, StreamExt};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{Result, ScoreError};
use crate::extract;
use crate::gptzero::Scorer;
use crate::payload;
use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// First row failure aborts the run; no column is attached.
    FailFast,
    /// Failed rows get an empty cell; the run completes with a summary.
    KeepGoing,
}

#[derive(Debug, Clone)]
pub struct ScoreOptions {
    pub column: String,
    pub output_column: String,
    pub multilingual: bool,
    pub concurrency: usize,
    pub failure_mode: FailureMode,
    /// Dump each raw service response as `row_<i>.json` under this dir.
    pub raw_dir: Option<PathBuf>,
}

impl Default for ScoreOptions {
    fn default() -> Self {
        Self {
            column: "explanation".into(),
            output_column: "average_generated_prob".into(),
            multilingual: false,
            concurrency: 1,
            failure_mode: FailureMode::FailFast,
            raw_dir: None,
        }
    }
}

#[derive(Debug)]
pub struct RowFailure {
    pub row: usize,
    pub error: ScoreError,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub total: usize,
    pub scored: usize,
    pub failures: Vec<RowFailure>,
}

async fn score_one(
    scorer: &dyn Scorer,
    row: usize,
    body: &str,
    raw_dir: Option<&Path>,
) -> Result<f64> {
    let response: Value = scorer.predict(body).await?;
    if let Some(dir) = raw_dir {
        std::fs::write(
            dir.join(format!("row_{row}.json")),
            serde_json::to_string_pretty(&response)?,
        )?;
    }
    extract::average_generated_prob(&response)
}

/// Score every cell of `opts.column` and attach the probabilities as
/// `opts.output_column`, row for row.
///
/// Requests are issued with at most `opts.concurrency` in flight (1 =
/// strictly sequential); completions are reassembled by row index, never in
/// completion order, so `output[i]` always belongs to `rows[i]`.
pub async fn score_column(
    scorer: &dyn Scorer,
    table: &mut Table,
    opts: &ScoreOptions,
) -> Result<RunSummary> {
    let texts = table.column(&opts.column)?;
    let bodies = payload::request_bodies(&texts, opts.multilingual)?;
    let total = bodies.len();

    let raw_dir = opts.raw_dir.as_deref();
    if let Some(dir) = raw_dir {
        std::fs::create_dir_all(dir)?;
    }

    let tasks = bodies.into_iter().enumerate().map(|(idx, body)| async move {
        let res = score_one(scorer, idx, &body, raw_dir).await;
        (idx, res)
    });

    let mut completed: Vec<(usize, Result<f64>)> = Vec::with_capacity(total);
    let mut results = stream::iter(tasks).buffer_unordered(opts.concurrency.max(1));
    while let Some((idx, res)) = results.next().await {
        match &res {
            Ok(prob) => info!(row = idx, done = completed.len() + 1, total, prob = *prob, "scored"),
            Err(error) => warn!(row = idx, done = completed.len() + 1, total, %error, "row failed"),
        }
        completed.push((idx, res));
    }
    completed.sort_by_key(|(idx, _)| *idx);

    let mut scores: Vec<Option<f64>> = Vec::with_capacity(total);
    let mut failures = Vec::new();
    for (row, res) in completed {
        match res {
            Ok(prob) => scores.push(Some(prob)),
            Err(error) => {
                if opts.failure_mode == FailureMode::FailFast {
                    return Err(error);
                }
                scores.push(None);
                failures.push(RowFailure { row, error });
            }
        }
    }

    let cells = scores
        .into_iter()
        .map(|s| s.map(|p| p.to_string()).unwrap_or_default())
        .collect();
    table.add_column(&opts.output_column, cells)?;

    let scored = total - failures.len();
    info!(total, scored, failed = failures.len(), "batch complete");
    Ok(RunSummary {
        total,
        scored,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::DocumentPayload;
    use async_trait::async_trait;
    use serde_json::json;

    /// Scores `doc-<n>` as `n / 10`, so results are input-derived.
    struct IndexScorer;

    fn doc_index(payload: &str) -> u64 {
        let p: DocumentPayload = serde_json::from_str(payload).unwrap();
        p.document.trim_start_matches("doc-").parse().unwrap()
    }

    #[async_trait]
    impl Scorer for IndexScorer {
        async fn predict(&self, payload: &str) -> Result<Value> {
            let n = doc_index(payload);
            Ok(json!({"documents": [{"average_generated_prob": n as f64 / 10.0}]}))
        }
    }

    /// Same scores as `IndexScorer`, but earlier rows finish last.
    struct ReverseDelayScorer {
        rows: u64,
    }

    #[async_trait]
    impl Scorer for ReverseDelayScorer {
        async fn predict(&self, payload: &str) -> Result<Value> {
            let n = doc_index(payload);
            tokio::time::sleep(std::time::Duration::from_millis((self.rows - n) * 20)).await;
            Ok(json!({"documents": [{"average_generated_prob": n as f64 / 10.0}]}))
        }
    }

    struct ConstScorer(f64);

    #[async_trait]
    impl Scorer for ConstScorer {
        async fn predict(&self, _payload: &str) -> Result<Value> {
            Ok(json!({"documents": [{"average_generated_prob": self.0}]}))
        }
    }

    /// Fails every `doc-<n>` whose index is odd with a 429.
    struct OddRowsThrottled;

    #[async_trait]
    impl Scorer for OddRowsThrottled {
        async fn predict(&self, payload: &str) -> Result<Value> {
            let n = doc_index(payload);
            if n % 2 == 1 {
                return Err(ScoreError::Service {
                    status: reqwest::StatusCode::TOO_MANY_REQUESTS,
                    body: r#"{"error":"rate limited"}"#.into(),
                });
            }
            Ok(json!({"documents": [{"average_generated_prob": n as f64 / 10.0}]}))
        }
    }

    fn sentinel_table(rows: u64) -> Table {
        let body: Vec<Vec<String>> = (0..rows)
            .map(|n| vec![n.to_string(), format!("doc-{n}")])
            .collect();
        Table::new(vec!["id".into(), "explanation".into()], body).unwrap()
    }

    #[tokio::test]
    async fn sequential_run_preserves_row_order() {
        let mut table = sentinel_table(5);
        let summary = score_column(&IndexScorer, &mut table, &ScoreOptions::default())
            .await
            .unwrap();
        assert_eq!(summary.total, 5);
        assert_eq!(summary.scored, 5);
        let col = table.column("average_generated_prob").unwrap();
        assert_eq!(col, vec!["0", "0.1", "0.2", "0.3", "0.4"]);
    }

    #[tokio::test]
    async fn concurrent_run_reassembles_by_index_not_completion() {
        let mut table = sentinel_table(5);
        let opts = ScoreOptions {
            concurrency: 5,
            ..ScoreOptions::default()
        };
        score_column(&ReverseDelayScorer { rows: 5 }, &mut table, &opts)
            .await
            .unwrap();
        let col = table.column("average_generated_prob").unwrap();
        assert_eq!(col, vec!["0", "0.1", "0.2", "0.3", "0.4"]);
    }

    #[tokio::test]
    async fn constant_scorer_leaves_other_columns_untouched() {
        let mut table = Table::new(
            vec!["explanation".into()],
            vec![vec!["hello".into()], vec!["world".into()]],
        )
        .unwrap();
        let before = table.column("explanation").unwrap();
        score_column(&ConstScorer(0.42), &mut table, &ScoreOptions::default())
            .await
            .unwrap();
        assert_eq!(table.column("explanation").unwrap(), before);
        assert_eq!(
            table.column("average_generated_prob").unwrap(),
            vec!["0.42", "0.42"]
        );
    }

    #[tokio::test]
    async fn fail_fast_aborts_without_attaching_a_column() {
        let mut table = sentinel_table(2);
        let err = score_column(&OddRowsThrottled, &mut table, &ScoreOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScoreError::Service { status, .. } if status == reqwest::StatusCode::TOO_MANY_REQUESTS
        ));
        assert_eq!(table.headers(), ["id", "explanation"]);
    }

    #[tokio::test]
    async fn keep_going_records_failed_rows_and_continues() {
        let mut table = sentinel_table(4);
        let opts = ScoreOptions {
            failure_mode: FailureMode::KeepGoing,
            ..ScoreOptions::default()
        };
        let summary = score_column(&OddRowsThrottled, &mut table, &opts).await.unwrap();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.scored, 2);
        assert_eq!(summary.scored + summary.failures.len(), 4);
        let failed: Vec<usize> = summary.failures.iter().map(|f| f.row).collect();
        assert_eq!(failed, vec![1, 3]);
        let col = table.column("average_generated_prob").unwrap();
        assert_eq!(col, vec!["0", "", "0.2", ""]);
    }

    #[tokio::test]
    async fn scoring_is_idempotent_across_runs() {
        let base = sentinel_table(3);
        let mut first = base.clone();
        let mut second = base.clone();
        score_column(&IndexScorer, &mut first, &ScoreOptions::default())
            .await
            .unwrap();
        score_column(&IndexScorer, &mut second, &ScoreOptions::default())
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn unknown_source_column_fails_before_any_call() {
        let mut table = sentinel_table(2);
        let opts = ScoreOptions {
            column: "essay".into(),
            ..ScoreOptions::default()
        };
        let err = score_column(&IndexScorer, &mut table, &opts).await.unwrap_err();
        assert!(matches!(err, ScoreError::Table(_)));
    }
}
