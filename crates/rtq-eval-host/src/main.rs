use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rtq_abstract::{AggregatedResults, EvalSettings, RunResult};
use rtq_evaluator::{Ffmpeg, RunEvaluator, aggregate_dir, load_settings, write_json_atomic};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless evaluator for RTP over QUIC experiment runs")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate the artifacts of one run into a result file.
    Eval {
        /// Working directory the run left its logs in.
        #[arg(long, default_value = ".")]
        run_dir: PathBuf,

        #[arg(long, default_value = "result.json")]
        output: PathBuf,

        /// TOML file overriding file names, column layouts and the bucket width.
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Do not run the video-quality tool; read existing quality logs only.
        #[arg(long)]
        skip_quality: bool,
    },

    /// Merge every result file below a directory into one export.
    Aggregate {
        #[arg(long, default_value = "results")]
        input: PathBuf,

        #[arg(long, default_value = "results.json")]
        output: PathBuf,

        /// Aggregation date as Unix seconds. Defaults to now.
        #[arg(long)]
        date: Option<i64>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    info!("rtq-eval starting...");

    match args.command {
        Command::Eval {
            run_dir,
            output,
            settings,
            skip_quality,
        } => {
            let settings = match &settings {
                Some(path) => load_settings(path)
                    .with_context(|| format!("loading settings {}", path.display()))?,
                None => EvalSettings::default(),
            };
            let result = evaluate(run_dir, settings, skip_quality)?;
            write_json_atomic(&output, &result)
                .with_context(|| format!("writing {}", output.display()))?;
            log_run_summary(&result);
        }
        Command::Aggregate {
            input,
            output,
            date,
        } => {
            let date = aggregation_date(date)?;
            let mut results = aggregate_dir(&input, date)
                .with_context(|| format!("aggregating {}", input.display()))?;
            if results.is_empty() {
                warn!("no result files found below {}", input.display());
            }
            results.attach_details_links();
            write_json_atomic(&output, &results)
                .with_context(|| format!("writing {}", output.display()))?;
            log_aggregate_summary(&results);
        }
    }
    Ok(())
}

fn evaluate(run_dir: PathBuf, settings: EvalSettings, skip_quality: bool) -> Result<RunResult> {
    let quality_enabled = settings.quality.enabled && !skip_quality;
    let ffmpeg = Ffmpeg::from_settings(&settings.quality);
    let mut evaluator = RunEvaluator::new(run_dir.clone(), settings);
    if quality_enabled {
        evaluator = evaluator.with_quality_tool(Box::new(ffmpeg));
    }
    evaluator
        .evaluate()
        .with_context(|| format!("evaluating run in {}", run_dir.display()))
}

fn aggregation_date(seconds: Option<i64>) -> Result<DateTime<Utc>> {
    match seconds {
        Some(s) => DateTime::from_timestamp(s, 0)
            .with_context(|| format!("{s} is not a representable Unix timestamp")),
        None => Ok(Utc::now()),
    }
}

fn log_run_summary(result: &RunResult) {
    let metrics = &result.metrics;
    info!(
        "{} / {} | ssim: {} | psnr: {} | target bitrate: {} | rtp seconds sent: {}",
        result.implementation_name(),
        result.test_case_name(),
        metrics.average_ssim,
        metrics.average_psnr,
        metrics.average_target_bitrate,
        metrics.sent_rtp.len()
    );
}

fn log_aggregate_summary(results: &AggregatedResults) {
    let table = results.table();
    info!(
        "Aggregated {} results | implementations: {} | test cases: {}",
        results.len(),
        table.rows.len(),
        table.columns.len()
    );
}
