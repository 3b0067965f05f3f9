//! Metrics collection and exposition.
//!
//! # Metrics
//! - `config_updates_total` (counter): set requests by outcome, dry_run
//! - `config_reloads_total` (counter): reloads by outcome
//! - `config_store_writes_total` (counter): backing store writes by outcome
//! - `config_reads_total` (counter): reads by source (live, backing_store)
//! - `config_commit_duration_seconds` (histogram): time spent holding slot locks
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Outcome labels are error kinds, never free-form messages

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ConfigError;

/// Install the Prometheus exporter with an HTTP scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
    {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, address = %addr, "Failed to install metrics exporter"),
    }
}

/// Label for a result: `ok` or the error kind.
pub fn outcome<T>(result: &Result<T, ConfigError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(e) => e.kind().as_str(),
    }
}

pub fn record_update(outcome: &'static str, dry_run: bool) {
    metrics::counter!("config_updates_total", "outcome" => outcome, "dry_run" => dry_run.to_string())
        .increment(1);
}

pub fn record_reload(outcome: &'static str) {
    metrics::counter!("config_reloads_total", "outcome" => outcome).increment(1);
}

pub fn record_store_write(outcome: &'static str) {
    metrics::counter!("config_store_writes_total", "outcome" => outcome).increment(1);
}

pub fn record_read(source: &'static str) {
    metrics::counter!("config_reads_total", "source" => source).increment(1);
}

pub fn record_commit_duration(elapsed: Duration) {
    metrics::histogram!("config_commit_duration_seconds").record(elapsed.as_secs_f64());
}
