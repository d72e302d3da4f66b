use std::collections::{BTreeMap, BTreeSet};

use common::error::{PipelineError, Result};
use common::types::{ActionKind, TransactionTable, AMOUNT_FIELD, WALLET_FIELD};

/// Prefix for discovered action columns. No canonical, summary or score
/// header starts with it, so raw action strings can never shadow them.
pub const OTHER_ACTION_PREFIX: &str = "action_";
/// Column for records that carry no string `action`, so counts still sum to `txn_count`.
pub const UNSPECIFIED_COLUMN: &str = "unspecified";

/// A non-canonical action column.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum OtherAction {
    /// An action string outside the canonical seven, kept verbatim.
    Named(String),
    /// Records whose `action` is absent or not a string.
    Unspecified,
}

impl OtherAction {
    pub fn column_name(&self) -> String {
        match self {
            Self::Named(action) => format!("{OTHER_ACTION_PREFIX}{action}"),
            Self::Unspecified => UNSPECIFIED_COLUMN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WalletFeatures {
    pub wallet: String,
    pub txn_count: u64,
    pub total_amount: f64,
    pub avg_amount: f64,
    /// Indexed by [`ActionKind::index`]; always fully populated.
    pub canonical_counts: [u64; ActionKind::COUNT],
    /// Aligned with [`FeatureTable::other_actions`].
    pub other_counts: Vec<u64>,
}

impl WalletFeatures {
    pub fn action_count(&self, kind: ActionKind) -> u64 {
        self.canonical_counts[kind.index()]
    }

    /// Sum over every action column, canonical and discovered.
    pub fn action_total(&self) -> u64 {
        self.canonical_counts.iter().sum::<u64>() + self.other_counts.iter().sum::<u64>()
    }
}

/// One row per wallet, sorted by wallet id, plus the discovered action columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    pub other_actions: Vec<OtherAction>,
    pub rows: Vec<WalletFeatures>,
}

impl FeatureTable {
    pub fn action_columns(&self) -> Vec<String> {
        action_columns(&self.other_actions)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Action column names in output order: canonical first, then discovered.
pub fn action_columns(other_actions: &[OtherAction]) -> Vec<String> {
    let mut cols: Vec<String> = ActionKind::ALL
        .iter()
        .map(|kind| kind.as_str().to_string())
        .collect();
    cols.extend(other_actions.iter().map(OtherAction::column_name));
    cols
}

#[derive(Debug, Default)]
struct WalletAccumulator {
    txn_count: u64,
    total_amount: f64,
    canonical_counts: [u64; ActionKind::COUNT],
    other: BTreeMap<OtherAction, u64>,
}

/// Group transactions by wallet and build one fixed-width feature row per wallet.
///
/// Pass one partitions records and collects every action kind seen; pass two
/// lays the per-wallet distributions out over that shared column set.
pub fn compute_wallet_features(table: &TransactionTable) -> Result<FeatureTable> {
    if !table.has_column(WALLET_FIELD) {
        return Err(PipelineError::missing_field(WALLET_FIELD));
    }
    let has_amount = table.has_column(AMOUNT_FIELD);

    let mut wallets: BTreeMap<&str, WalletAccumulator> = BTreeMap::new();
    let mut seen_other: BTreeSet<OtherAction> = BTreeSet::new();
    let mut skipped = 0_u64;

    for record in table.records() {
        let Some(wallet) = record.wallet() else {
            skipped += 1;
            continue;
        };
        let acc = wallets.entry(wallet).or_default();
        acc.txn_count += 1;
        if has_amount {
            acc.total_amount += record.amount().unwrap_or(0.0);
        }

        let other = match record.action() {
            Some(action) => match ActionKind::parse(action) {
                Some(kind) => {
                    acc.canonical_counts[kind.index()] += 1;
                    continue;
                }
                None => OtherAction::Named(action.to_string()),
            },
            None => OtherAction::Unspecified,
        };
        if !seen_other.contains(&other) {
            seen_other.insert(other.clone());
        }
        *acc.other.entry(other).or_insert(0) += 1;
    }

    if skipped > 0 {
        tracing::warn!(
            skipped,
            field = WALLET_FIELD,
            "records without a wallet id skipped"
        );
        metrics::counter!("scorer_records_skipped_total").increment(skipped);
    }

    let other_actions: Vec<OtherAction> = seen_other.into_iter().collect();
    let rows: Vec<WalletFeatures> = wallets
        .into_iter()
        .map(|(wallet, acc)| build_row(wallet, acc, &other_actions))
        .collect();

    let extra_actions: Vec<String> = other_actions.iter().map(OtherAction::column_name).collect();
    tracing::info!(
        wallets = rows.len(),
        extra_actions = ?extra_actions,
        has_amount,
        "wallet features computed"
    );

    Ok(FeatureTable {
        other_actions,
        rows,
    })
}

fn build_row(wallet: &str, acc: WalletAccumulator, other_actions: &[OtherAction]) -> WalletFeatures {
    let other_counts = other_actions
        .iter()
        .map(|a| acc.other.get(a).copied().unwrap_or(0))
        .collect();

    let avg_amount = if acc.txn_count > 0 {
        acc.total_amount / acc.txn_count as f64
    } else {
        0.0
    };

    let row = WalletFeatures {
        wallet: wallet.to_string(),
        txn_count: acc.txn_count,
        total_amount: acc.total_amount,
        avg_amount,
        canonical_counts: acc.canonical_counts,
        other_counts,
    };
    debug_assert_eq!(row.action_total(), row.txn_count, "wallet {wallet}");
    row
}
