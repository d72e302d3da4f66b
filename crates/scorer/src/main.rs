use anyhow::Result;

mod cli;
mod loader;
mod metrics;
mod pipeline;
mod report;
mod wallet_features;
mod wallet_scoring;

fn main() -> Result<()> {
    let config = common::config::Config::load_or_default()?;

    let dispatch = common::observability::build_dispatch(&config.general.log_level);
    tracing::dispatcher::set_global_default(dispatch).map_err(anyhow::Error::msg)?;

    let metrics_handle = if config.observability.metrics_path.is_some() {
        Some(metrics::install_recorder()?)
    } else {
        None
    };
    metrics::describe();

    let result = cli::execute(&config, std::env::args());
    if let Err(e) = &result {
        metrics::record_failure(e);
    }

    if let (Some(handle), Some(path)) = (&metrics_handle, &config.observability.metrics_path) {
        metrics::write_snapshot(handle, std::path::Path::new(path))?;
    }

    result
}
