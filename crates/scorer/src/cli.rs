use std::path::{Path, PathBuf};

use anyhow::Result;
use common::config::Config;
use common::error::PipelineError;
use common::types::ActionKind;

use crate::pipeline;
use crate::report;

const USAGE: &str = "usage: scorer [score] [<input.json>] [<output.csv>]
       scorer features <input.json> [<output.csv>]
       scorer wallet <input.json> <address>
       scorer rankings <input.json> [<n>]";

/// Bad command line, or no input to score. Counted as a failed run like
/// any pipeline error.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct UsageError(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Score {
        input: Option<PathBuf>,
        output: Option<PathBuf>,
    },
    Features {
        input: PathBuf,
        output: Option<PathBuf>,
    },
    Wallet {
        input: PathBuf,
        address: String,
    },
    Rankings {
        input: PathBuf,
        top_n: Option<usize>,
    },
}

pub fn parse_args<I>(mut args: I) -> std::result::Result<Command, String>
where
    I: Iterator<Item = String>,
{
    // Drop argv[0].
    let _ = args.next();

    let Some(first) = args.next() else {
        return Ok(Command::Score {
            input: None,
            output: None,
        });
    };

    let cmd = match first.as_str() {
        "score" => Command::Score {
            input: args.next().map(PathBuf::from),
            output: args.next().map(PathBuf::from),
        },
        "features" => Command::Features {
            input: required(&mut args)?,
            output: args.next().map(PathBuf::from),
        },
        "wallet" => Command::Wallet {
            input: required(&mut args)?,
            address: args.next().ok_or_else(|| USAGE.to_string())?,
        },
        "rankings" => {
            let input = required(&mut args)?;
            let top_n = match args.next() {
                Some(n) => Some(
                    n.parse::<usize>()
                        .map_err(|e| format!("invalid rankings count {n}: {e}"))?,
                ),
                None => None,
            };
            Command::Rankings { input, top_n }
        }
        "-h" | "--help" | "help" => return Err(USAGE.to_string()),
        other if other.starts_with('-') => return Err(format!("unknown option: {other}\n{USAGE}")),
        // Bare path: `scorer data.json [out.csv]`.
        _ => Command::Score {
            input: Some(PathBuf::from(&first)),
            output: args.next().map(PathBuf::from),
        },
    };

    if let Some(extra) = args.next() {
        return Err(format!("unexpected argument: {extra}\n{USAGE}"));
    }
    Ok(cmd)
}

fn required<I>(args: &mut I) -> std::result::Result<PathBuf, String>
where
    I: Iterator<Item = String>,
{
    args.next().map(PathBuf::from).ok_or_else(|| USAGE.to_string())
}

/// Parse `args` and run the resulting command.
pub fn execute<I>(config: &Config, args: I) -> Result<()>
where
    I: Iterator<Item = String>,
{
    let cmd = parse_args(args).map_err(UsageError)?;
    tracing::info!(command = ?cmd, "wallet scorer starting");
    run_command(config, cmd)
}

pub fn run_command(config: &Config, cmd: Command) -> Result<()> {
    match cmd {
        Command::Score { input, output } => {
            let input = input
                .or_else(|| config.input.path.as_ref().map(PathBuf::from))
                .ok_or_else(|| UsageError(format!("no input file given\n{USAGE}")))?;
            let output = output.unwrap_or_else(|| PathBuf::from(&config.output.path));
            pipeline::run(&input, &output)?;
            Ok(())
        }
        Command::Features { input, output } => {
            let output = output.unwrap_or_else(|| PathBuf::from(&config.output.features_path));
            let features = pipeline::build_features(&input)?;
            report::write_features_csv(&output, &features)?;
            Ok(())
        }
        Command::Wallet { input, address } => show_wallet(&input, &address),
        Command::Rankings { input, top_n } => {
            show_rankings(&input, top_n.unwrap_or(config.rankings.top_n))
        }
    }
}

fn show_wallet(input: &Path, address: &str) -> Result<()> {
    let scored = pipeline::score_wallets(input)?;
    let row = scored
        .find(address)
        .ok_or_else(|| PipelineError::WalletNotFound(address.to_string()))?;
    let f = &row.features;

    println!("Wallet: {}", f.wallet);
    println!("  score         {}", row.score);
    println!("  txn_count     {}", f.txn_count);
    println!("  total_amount  {}", f.total_amount);
    println!("  avg_amount    {}", f.avg_amount);
    println!("Actions:");
    for kind in ActionKind::ALL {
        println!("  {:<16}{}", kind.as_str(), f.action_count(kind));
    }
    for (action, count) in scored.other_actions.iter().zip(&f.other_counts) {
        if *count > 0 {
            println!("  {:<16}{count}", action.column_name());
        }
    }
    Ok(())
}

fn show_rankings(input: &Path, top_n: usize) -> Result<()> {
    let scored = pipeline::score_wallets(input)?;
    println!("Top {top_n} wallets by credit score:");
    for r in report::top_wallets(&scored, top_n) {
        println!(
            "{rank:>4}  {score:>4}  txns={txns:<6}  {wallet}",
            rank = r.rank,
            score = r.score,
            txns = r.txn_count,
            wallet = r.wallet
        );
    }
    Ok(())
}
