use std::path::Path;

use common::error::Result;

use crate::loader;
use crate::report::{self, ScoreSummary};
use crate::wallet_features::{self, FeatureTable};
use crate::wallet_scoring::{self, ScoredTable};

/// Loader and Aggregator.
pub fn build_features(input: &Path) -> Result<FeatureTable> {
    tracing::info!(input = %input.display(), "loading transactions");
    let table = loader::load_transactions(input)?;
    tracing::info!("aggregating wallet features");
    let features = wallet_features::compute_wallet_features(&table)?;
    if features.is_empty() {
        tracing::warn!(
            records = table.len(),
            "no record carries a usable wallet id; output will have no rows"
        );
    }
    Ok(features)
}

/// Loader, Aggregator and Scorer.
pub fn score_wallets(input: &Path) -> Result<ScoredTable> {
    let features = build_features(input)?;
    tracing::info!("scoring wallets");
    Ok(wallet_scoring::score_table(features))
}

/// Full batch run. Output is written only if every stage succeeds.
pub fn run(input: &Path, output: &Path) -> Result<ScoredTable> {
    let scored = score_wallets(input)?;
    report::write_scores_csv(output, &scored)?;
    if let Some(summary) = report::score_summary(&scored) {
        log_summary(&summary);
    }
    Ok(scored)
}

fn log_summary(s: &ScoreSummary) {
    tracing::info!(
        wallets = s.wallets,
        min = s.min,
        max = s.max,
        mean = s.mean,
        bands = ?s.bands,
        "score summary"
    );
}
