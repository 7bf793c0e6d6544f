//! protobook-stress — hammer a shared protocol book from many threads.
//!
//! Usage: protobook-stress [threads] [seed]
//!
//! Limits come from the protobook config file (see protobook_core::config),
//! which is created with defaults on first run.
//! Exits non-zero if any worker's peers diverge from its serial replay or if
//! the two indices disagree once all workers have finished.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

use protobook_core::config::BookConfig;
use protobook_store::MemoryProtoBook;

mod workload;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = BookConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = BookConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        BookConfig::default()
    });

    let mut args = std::env::args().skip(1);
    let threads = match args.next() {
        Some(arg) => arg.parse().context("threads must be a number")?,
        None if config.stress.threads > 0 => config.stress.threads,
        None => std::thread::available_parallelism().map_or(4, |n| n.get()),
    };
    let seed: u64 = match args.next() {
        Some(arg) => arg.parse().context("seed must be a number")?,
        None => 0x5eed,
    };

    let book = Arc::new(
        MemoryProtoBook::with_config(&config.protobook).context("invalid protobook config")?,
    );
    tracing::info!(
        threads,
        seed,
        peers_per_thread = config.stress.peers_per_thread,
        ops_per_thread = config.stress.ops_per_thread,
        "stress run starting"
    );

    let started = Instant::now();
    let report = workload::run(Arc::clone(&book), threads, seed, &config.stress)?;
    let elapsed = started.elapsed();

    let stats = book.stats();
    tracing::info!(
        ops = report.ops,
        rejected = report.rejected,
        elapsed_ms = elapsed.as_millis() as u64,
        ops_per_sec = (report.ops as f64 / elapsed.as_secs_f64().max(f64::EPSILON)) as u64,
        peers = stats.peers,
        protocols_interned = stats.protocols_interned,
        protocols_indexed = stats.protocols_indexed,
        "stress run consistent"
    );
    Ok(())
}
