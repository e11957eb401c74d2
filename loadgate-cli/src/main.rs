use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use loadgate_core::{check_groups, read_results, AggregatedGroup, AnalyzerConfig};

mod config;

/// Loadgate: aggregate load-test results and gate on tolerance checks
///
/// Reads a JMeter-style XML result file, aggregates every sample into
/// per-group statistics and validates throughput and error rate against
/// the tolerance rules of the given profile. Exits non-zero when any
/// check fails, so a pipeline step can gate on the result.
///
/// Example usage:
///   loadgate results.xml
///   loadgate results.xml -P profiles/nightly-gate.toml
#[derive(Parser)]
#[command(name = "loadgate")]
#[command(version, about = "Load-test result aggregation and tolerance gate", long_about = None)]
struct Cli {
    /// XML result file to analyze
    results: PathBuf,

    /// Path to a TOML profile with grouping and tolerance configuration
    #[arg(short = 'P', long)]
    profile: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match &cli.profile {
        Some(path) => {
            tracing::info!("loading profile: {}", path.display());
            config::load_profile(path)?
        }
        None => AnalyzerConfig::default(),
    };

    tracing::info!("analyzing {}", cli.results.display());
    let file = File::open(&cli.results)
        .map_err(|e| anyhow::anyhow!("failed to open {}: {e}", cli.results.display()))?;
    let groups = read_results(BufReader::new(file), &config)?;

    for (key, group) in &groups {
        log_summary(key, group)?;
    }

    let report = check_groups(&groups, &config)?;
    if !report.passed() {
        let failed = report.failures().count();
        tracing::error!("check failed: {failed} violated metric(s)");
        std::process::exit(1);
    }

    Ok(())
}

fn log_summary(key: &str, group: &AggregatedGroup) -> anyhow::Result<()> {
    let duration = group.duration();
    let successes = duration.success_count()?;
    let errors = duration.error_count()?;

    if duration.has_samples() {
        tracing::info!(
            "{key}: {} requests, {errors} errors, duration avg/min/max {}/{}/{} ms, {} req/s",
            successes + errors,
            duration.average()?,
            duration.min()?,
            duration.max()?,
            duration.success_per_second()?,
        );
    } else {
        tracing::info!("{key}: {} requests, {errors} errors", successes + errors);
    }
    Ok(())
}
