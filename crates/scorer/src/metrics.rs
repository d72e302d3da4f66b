use std::path::Path;

use anyhow::Result;
use metrics::{describe_counter, describe_histogram};
use common::error::PipelineError;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::cli::UsageError;

pub fn describe() {
    describe_counter!(
        "scorer_records_loaded_total",
        "Number of transaction records loaded from the input file."
    );
    describe_counter!(
        "scorer_records_skipped_total",
        "Number of records skipped because they carry no wallet id."
    );
    describe_counter!(
        "scorer_wallets_scored_total",
        "Number of wallets assigned a credit score."
    );
    describe_histogram!("scorer_wallet_score", "Distribution of wallet credit scores.");
    describe_counter!(
        "scorer_runs_failed_total",
        "Number of runs aborted by a usage or pipeline error."
    );
}

/// Install a process-wide recorder without an HTTP listener; the batch job
/// dumps the rendered metrics to a file instead of serving them.
pub fn install_recorder() -> Result<PrometheusHandle> {
    Ok(PrometheusBuilder::new().install_recorder()?)
}

/// Label for a failed run: the pipeline error kind, `usage`, or `other`.
pub fn failure_kind(err: &anyhow::Error) -> &'static str {
    if let Some(e) = err.downcast_ref::<PipelineError>() {
        e.kind()
    } else if err.downcast_ref::<UsageError>().is_some() {
        "usage"
    } else {
        "other"
    }
}

pub fn record_failure(err: &anyhow::Error) {
    let kind = failure_kind(err);
    metrics::counter!("scorer_runs_failed_total", "kind" => kind).increment(1);
    tracing::error!(kind, error = %err, "run failed");
}

pub fn write_snapshot(handle: &PrometheusHandle, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, handle.render())?;
    tracing::info!(path = %path.display(), "metrics snapshot written");
    Ok(())
}
