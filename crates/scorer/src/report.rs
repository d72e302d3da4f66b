use std::path::{Path, PathBuf};

use common::error::{PipelineError, Result};
use common::types::WALLET_FIELD;

use crate::wallet_features::{action_columns, FeatureTable, WalletFeatures};
use crate::wallet_scoring::ScoredTable;

const SUMMARY_FIELDS: [&str; 3] = ["txn_count", "total_amount", "avg_amount"];

/// Score bands reported by [`score_summary`], inclusive on both ends.
pub const SCORE_BANDS: [(u32, u32); 4] = [(0, 249), (250, 499), (500, 749), (750, 1000)];

fn header(actions: Vec<String>, with_score: bool) -> Vec<String> {
    let mut cols = vec![WALLET_FIELD.to_string()];
    cols.extend(SUMMARY_FIELDS.iter().map(|s| (*s).to_string()));
    cols.extend(actions);
    if with_score {
        cols.push("score".to_string());
    }
    cols
}

fn feature_cells(f: &WalletFeatures) -> Vec<String> {
    let mut cells = vec![
        f.wallet.clone(),
        f.txn_count.to_string(),
        f.total_amount.to_string(),
        f.avg_amount.to_string(),
    ];
    cells.extend(f.canonical_counts.iter().map(u64::to_string));
    cells.extend(f.other_counts.iter().map(u64::to_string));
    cells
}

pub fn write_scores_csv(path: &Path, table: &ScoredTable) -> Result<()> {
    let header = header(action_columns(&table.other_actions), true);
    let rows = table.rows.iter().map(|r| {
        let mut cells = feature_cells(&r.features);
        cells.push(r.score.to_string());
        cells
    });
    write_atomically(path, &header, rows)?;
    tracing::info!(path = %path.display(), wallets = table.rows.len(), "wallet scores saved");
    Ok(())
}

pub fn write_features_csv(path: &Path, table: &FeatureTable) -> Result<()> {
    let header = header(table.action_columns(), false);
    write_atomically(path, &header, table.rows.iter().map(feature_cells))?;
    tracing::info!(path = %path.display(), wallets = table.len(), "wallet features saved");
    Ok(())
}

/// Write to `<path>.tmp` and rename over `path` once everything is flushed,
/// so a failed run never leaves a partial table behind.
fn write_atomically<I>(path: &Path, header: &[String], rows: I) -> Result<()>
where
    I: Iterator<Item = Vec<String>>,
{
    let tmp = tmp_path(path);
    let result = write_csv(&tmp, header, rows)
        .and_then(|()| std::fs::rename(&tmp, path).map_err(|e| PipelineError::io(path, e)));
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

fn write_csv<I>(path: &Path, header: &[String], rows: I) -> Result<()>
where
    I: Iterator<Item = Vec<String>>,
{
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    writer.flush().map_err(|e| PipelineError::io(path, e))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedWallet {
    pub rank: usize,
    pub wallet: String,
    pub score: u32,
    pub txn_count: u64,
}

/// Highest scores first; ties go to the lexicographically smaller wallet.
pub fn top_wallets(table: &ScoredTable, n: usize) -> Vec<RankedWallet> {
    let mut order: Vec<_> = table.rows.iter().collect();
    order.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.features.wallet.cmp(&b.features.wallet))
    });
    order
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(i, r)| RankedWallet {
            rank: i + 1,
            wallet: r.features.wallet.clone(),
            score: r.score,
            txn_count: r.features.txn_count,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSummary {
    pub wallets: usize,
    pub min: u32,
    pub max: u32,
    pub mean: f64,
    /// Wallet count per entry of [`SCORE_BANDS`].
    pub bands: [usize; SCORE_BANDS.len()],
}

pub fn score_summary(table: &ScoredTable) -> Option<ScoreSummary> {
    let scores: Vec<u32> = table.rows.iter().map(|r| r.score).collect();
    let min = *scores.iter().min()?;
    let max = *scores.iter().max()?;
    let mean = scores.iter().map(|&s| f64::from(s)).sum::<f64>() / scores.len() as f64;

    let mut bands = [0_usize; SCORE_BANDS.len()];
    for &s in &scores {
        if let Some(i) = SCORE_BANDS.iter().position(|&(lo, hi)| (lo..=hi).contains(&s)) {
            bands[i] += 1;
        }
    }

    Some(ScoreSummary {
        wallets: scores.len(),
        min,
        max,
        mean,
        bands,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_transactions;
    use crate::wallet_features::compute_wallet_features;
    use crate::wallet_scoring::score_table;

    fn scored(raw: &str) -> ScoredTable {
        score_table(compute_wallet_features(&parse_transactions(raw.as_bytes()).unwrap()).unwrap())
    }

    const SAMPLE: &str = r#"[
        {"userWallet": "0xb", "action": "deposit", "amount": 1500},
        {"userWallet": "0xb", "action": "repay", "amount": 700},
        {"userWallet": "0xa", "action": "borrow"},
        {"userWallet": "0xc", "action": "flashloan"}
    ]"#;

    #[test]
    fn test_scores_csv_layout() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("wallet_scores.csv");
        write_scores_csv(&out, &scored(SAMPLE)).unwrap();

        let content = std::fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "userWallet,txn_count,total_amount,avg_amount,deposit,withdraw,transfer,borrow,repay,redeemunderlying,liquidationcall,action_flashloan,score"
        );
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "0xa,1,0,0,0,0,0,1,0,0,0,0,498");
        // 500 + 2 + 3 (avg 1100 > 1000 adds 100)
        assert_eq!(lines[2], "0xb,2,2200,1100,1,0,0,0,1,0,0,0,605");
        assert_eq!(lines[3], "0xc,1,0,0,0,0,0,0,0,0,0,1,500");
        assert!(!dir.path().join("wallet_scores.csv.tmp").exists());
    }

    #[test]
    fn test_features_csv_has_no_score_column() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("features.csv");
        let features =
            compute_wallet_features(&parse_transactions(SAMPLE.as_bytes()).unwrap()).unwrap();
        write_features_csv(&out, &features).unwrap();

        let mut reader = csv::Reader::from_path(&out).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert!(!headers.iter().any(|h| h == "score"));
        assert_eq!(reader.records().count(), 3);
    }

    #[test]
    fn test_action_names_matching_fixed_headers_stay_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("scores.csv");
        let table = scored(
            r#"[
                {"userWallet": "0xa", "action": "score"},
                {"userWallet": "0xa", "action": "txn_count"},
                {"userWallet": "0xa", "action": "userWallet"},
                {"userWallet": "0xa", "action": "unspecified"},
                {"userWallet": "0xa"}
            ]"#,
        );
        write_scores_csv(&out, &table).unwrap();

        let mut reader = csv::Reader::from_path(&out).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        let mut unique = headers.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), headers.len(), "{headers:?}");
        assert_eq!(
            &headers[11..],
            [
                "action_score",
                "action_txn_count",
                "action_unspecified",
                "action_userWallet",
                "unspecified",
                "score"
            ]
        );

        let record = reader.records().next().unwrap().unwrap();
        let cell = |name: &str| {
            let i = headers.iter().position(|h| h == name).unwrap();
            record[i].to_string()
        };
        assert_eq!(cell("txn_count"), "5");
        assert_eq!(cell("action_txn_count"), "1");
        assert_eq!(cell("unspecified"), "1");
        assert_eq!(cell("score"), "500");
    }

    #[test]
    fn test_failed_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("missing-dir").join("scores.csv");
        let err = write_scores_csv(&out, &scored(SAMPLE)).unwrap_err();
        assert!(matches!(err, PipelineError::Csv(_) | PipelineError::Io { .. }));
        assert!(!out.exists());
    }

    #[test]
    fn test_overwrites_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("scores.csv");
        std::fs::write(&out, "stale").unwrap();
        write_scores_csv(&out, &scored(SAMPLE)).unwrap();
        let content = std::fs::read_to_string(&out).unwrap();
        assert!(content.starts_with("userWallet,"));
    }

    #[test]
    fn test_top_wallets_orders_by_score_then_wallet() {
        let table = scored(
            r#"[
                {"userWallet": "0xd", "action": "deposit"},
                {"userWallet": "0xc", "action": "deposit"},
                {"userWallet": "0xb", "action": "repay"},
                {"userWallet": "0xa", "action": "liquidationcall"}
            ]"#,
        );
        let top = top_wallets(&table, 3);
        let got: Vec<(usize, &str, u32)> = top
            .iter()
            .map(|r| (r.rank, r.wallet.as_str(), r.score))
            .collect();
        assert_eq!(got, vec![(1, "0xb", 503), (2, "0xc", 502), (3, "0xd", 502)]);
    }

    #[test]
    fn test_score_summary_bands() {
        let table = scored(
            r#"[
                {"userWallet": "0xa", "action": "deposit"},
                {"userWallet": "0xb", "action": "borrow"}
            ]"#,
        );
        let s = score_summary(&table).unwrap();
        assert_eq!(s.wallets, 2);
        assert_eq!(s.min, 498);
        assert_eq!(s.max, 502);
        assert!((s.mean - 500.0).abs() < 1e-9);
        assert_eq!(s.bands, [0, 1, 1, 0]);
    }

    #[test]
    fn test_score_summary_empty_table() {
        assert!(score_summary(&ScoredTable::default()).is_none());
    }
}
