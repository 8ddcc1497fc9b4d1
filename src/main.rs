mod base_primes;
mod bits;
mod chunks;
mod config;
mod engine;
mod error;
mod reduce;
mod report;
mod segment;
mod storage;
#[cfg(test)]
mod testutil;
mod worker;

use anyhow::Context;
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use config::{DEFAULT_SECONDS, FIRST_VALUE, Geometry, SieveConfig};

#[derive(Parser)]
#[command(name = "nt-sieve")]
#[command(
    about = "Count primes with a time-bounded, multi-threaded segmented sieve",
    long_about = None
)]
struct Cli {
    #[arg(help = "Wall-clock budget in seconds (default 10 unless --limit is given)")]
    seconds: Option<f64>,
    #[arg(help = "Number of worker threads (default: hardware concurrency)")]
    threads: Option<usize>,
    #[arg(short, long, help = "Sieve [start, LIMIT) to completion")]
    limit: Option<u64>,
    #[arg(long, default_value = "16", help = "Segment flag buffer size in KiB")]
    segment_kib: u64,
    #[arg(long, default_value = "32", help = "Segments per work chunk")]
    chunk_segments: u32,
    #[arg(long, default_value_t = FIRST_VALUE, help = "First value to sieve")]
    start: u64,
    #[arg(long, help = "Log progress every SECS seconds")]
    progress: Option<f64>,
    #[arg(long, help = "Do not append this run to the execution log")]
    no_log: bool,
}

impl Cli {
    fn sieve_config(&self) -> anyhow::Result<SieveConfig> {
        let threads = self.threads.unwrap_or_else(config::default_threads);
        let progress = self
            .progress
            .map(config::duration_from_secs)
            .transpose()
            .context("invalid --progress interval")?;

        let config = match (self.seconds, self.limit) {
            (None, Some(limit)) => SieveConfig::bounded(limit, threads),
            (seconds, limit) => {
                SieveConfig::timed(seconds.unwrap_or(DEFAULT_SECONDS), threads)?.with_limit(limit)
            }
        };

        Ok(config
            .with_start(self.start)
            .with_geometry(Geometry::from_segment_kib(
                self.segment_kib,
                self.chunk_segments,
            ))
            .with_progress(progress))
    }

    /// Argument summary recorded in the execution log.
    fn log_args(&self, config: &SieveConfig) -> String {
        let mut args = Vec::new();
        if let Some(duration) = config.duration {
            args.push(format!("seconds={}", duration.as_secs_f64()));
        }
        if let Some(limit) = config.limit {
            args.push(format!("limit={}", limit));
        }
        if config.start != FIRST_VALUE {
            args.push(format!("start={}", config.start));
        }
        args.push(format!("segment_kib={}", self.segment_kib));
        args.join(" ")
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.sieve_config()?;

    let report = engine::run(&config).context("sieve run failed")?;
    println!("{}", report::render(&report));

    if !cli.no_log {
        if let Err(e) = storage::log_execution(&cli.log_args(&config), &report) {
            warn!(error = %e, "failed to log execution");
        }
    }

    Ok(())
}
