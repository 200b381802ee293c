use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use genprob::{
    extract, score_column, ClientConfig, DocumentPayload, FailureMode, GptzeroClient,
    ScoreOptions, Scorer, Table,
};

#[derive(Parser)]
#[command(name = "genprob", version, about = "Score CSV text columns for AI-generated probability via GPTZero")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Score every row of a CSV column and write the table back out with the scores attached
    Run {
        #[arg(long)] input: PathBuf,
        #[arg(long)] output: PathBuf,
        /// Text column to score
        #[arg(long, default_value = "explanation")] column: String,
        #[arg(long, default_value = "average_generated_prob")] output_column: String,
        #[arg(long)] multilingual: bool,
        /// Requests in flight at once; 1 = strictly sequential
        #[arg(long, default_value_t = 1)] concurrency: usize,
        /// Record failed rows as empty cells instead of aborting the run
        #[arg(long)] keep_going: bool,
        /// Only score the first N rows
        #[arg(long)] limit: Option<usize>,
        /// Dump each raw service response as JSON under this directory
        #[arg(long)] raw_dir: Option<PathBuf>,
        #[arg(long, default_value_t = 30_000)] timeout_ms: u64,
        #[arg(long, default_value_t = 2)] qps: u32,
    },
    /// Score a single document and print the probability
    Predict {
        text: String,
        #[arg(long)] multilingual: bool,
        #[arg(long, default_value_t = 30_000)] timeout_ms: u64,
        #[arg(long, default_value_t = 2)] qps: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().cmd {
        Cmd::Run {
            input,
            output,
            column,
            output_column,
            multilingual,
            concurrency,
            keep_going,
            limit,
            raw_dir,
            timeout_ms,
            qps,
        } => {
            let cfg = ClientConfig::from_env(timeout_ms, qps)?;
            let client = GptzeroClient::new(&cfg)?;

            let mut table = Table::from_csv_path(&input)?;
            if let Some(n) = limit {
                table.truncate(n);
            }

            let opts = ScoreOptions {
                column,
                output_column,
                multilingual,
                concurrency,
                failure_mode: if keep_going {
                    FailureMode::KeepGoing
                } else {
                    FailureMode::FailFast
                },
                raw_dir,
            };
            let summary = score_column(&client, &mut table, &opts).await?;
            table.write_csv_path(&output)?;

            for failure in &summary.failures {
                warn!(row = failure.row, error = %failure.error, "row left unscored");
            }
        }
        Cmd::Predict {
            text,
            multilingual,
            timeout_ms,
            qps,
        } => {
            let cfg = ClientConfig::from_env(timeout_ms, qps)?;
            let client = GptzeroClient::new(&cfg)?;
            let body = DocumentPayload::new(text).multilingual(multilingual).to_body()?;
            let response = client.predict(&body).await?;
            println!("{}", extract::average_generated_prob(&response)?);
        }
    }
    Ok(())
}
