use common::types::ActionKind;

use crate::wallet_features::{FeatureTable, OtherAction, WalletFeatures};

pub const BASE_SCORE: f64 = 500.0;
pub const MIN_SCORE: i64 = 0;
pub const MAX_SCORE: i64 = 1000;

const DEPOSIT_WEIGHT: f64 = 2.0;
const REPAY_WEIGHT: f64 = 3.0;
const BORROW_PENALTY: f64 = 1.5;
const LIQUIDATION_PENALTY: f64 = 5.0;
const TRANSFER_WEIGHT: f64 = 0.5;

/// Wallets with more than this many transactions get [`ACTIVITY_BONUS`].
const ACTIVITY_THRESHOLD: u64 = 10;
const ACTIVITY_BONUS: f64 = 50.0;
/// Wallets whose average amount exceeds this get [`AMOUNT_BONUS`].
const AMOUNT_THRESHOLD: f64 = 1000.0;
const AMOUNT_BONUS: f64 = 100.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredWallet {
    pub features: WalletFeatures,
    pub score: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoredTable {
    pub other_actions: Vec<OtherAction>,
    pub rows: Vec<ScoredWallet>,
}

/// Unclamped heuristic score before truncation.
pub fn raw_score(f: &WalletFeatures) -> f64 {
    let count = |kind| f.action_count(kind) as f64;

    let mut score = BASE_SCORE;
    score += count(ActionKind::Deposit) * DEPOSIT_WEIGHT;
    score += count(ActionKind::Repay) * REPAY_WEIGHT;
    score -= count(ActionKind::Borrow) * BORROW_PENALTY;
    score -= count(ActionKind::LiquidationCall) * LIQUIDATION_PENALTY;
    score += count(ActionKind::Transfer) * TRANSFER_WEIGHT;

    if f.txn_count > ACTIVITY_THRESHOLD {
        score += ACTIVITY_BONUS;
    }
    if f.avg_amount > AMOUNT_THRESHOLD {
        score += AMOUNT_BONUS;
    }
    score
}

/// Credit score in `[0, 1000]`: truncated toward zero, then clamped.
pub fn compute_score(f: &WalletFeatures) -> u32 {
    // `as` truncates toward zero and saturates at the i64 bounds.
    let truncated = raw_score(f) as i64;
    // Clamped into [0, 1000], so the narrowing cannot lose information.
    truncated.clamp(MIN_SCORE, MAX_SCORE) as u32
}

pub fn score_table(table: FeatureTable) -> ScoredTable {
    let rows: Vec<ScoredWallet> = table
        .rows
        .into_iter()
        .map(|features| {
            let score = compute_score(&features);
            metrics::histogram!("scorer_wallet_score").record(f64::from(score));
            ScoredWallet { features, score }
        })
        .collect();

    metrics::counter!("scorer_wallets_scored_total").increment(rows.len() as u64);
    tracing::info!(wallets = rows.len(), "wallets scored");

    ScoredTable {
        other_actions: table.other_actions,
        rows,
    }
}

impl ScoredTable {
    pub fn find(&self, wallet: &str) -> Option<&ScoredWallet> {
        self.rows
            .binary_search_by(|r| r.features.wallet.as_str().cmp(wallet))
            .ok()
            .map(|i| &self.rows[i])
    }
}
