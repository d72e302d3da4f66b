use std::collections::BTreeSet;

use serde_json::{Map, Value};

/// Wallet-identity key. The only field the pipeline refuses to run without.
pub const WALLET_FIELD: &str = "userWallet";
pub const ACTION_FIELD: &str = "action";
pub const AMOUNT_FIELD: &str = "amount";

/// Canonical DeFi actions. Always present as feature columns, in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionKind {
    Deposit,
    Withdraw,
    Transfer,
    Borrow,
    Repay,
    RedeemUnderlying,
    LiquidationCall,
}

impl ActionKind {
    pub const COUNT: usize = 7;

    pub const ALL: [ActionKind; Self::COUNT] = [
        Self::Deposit,
        Self::Withdraw,
        Self::Transfer,
        Self::Borrow,
        Self::Repay,
        Self::RedeemUnderlying,
        Self::LiquidationCall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
            Self::Transfer => "transfer",
            Self::Borrow => "borrow",
            Self::Repay => "repay",
            Self::RedeemUnderlying => "redeemunderlying",
            Self::LiquidationCall => "liquidationcall",
        }
    }

    /// Exact, case-sensitive match against the canonical column names.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    /// Position of this action in the canonical column order.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// One raw input object. Every field of the source object is kept; the
/// accessors below interpret the few the pipeline cares about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionRecord {
    fields: Map<String, Value>,
}

impl TransactionRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn wallet(&self) -> Option<&str> {
        self.fields.get(WALLET_FIELD).and_then(Value::as_str)
    }

    pub fn action(&self) -> Option<&str> {
        self.fields.get(ACTION_FIELD).and_then(Value::as_str)
    }

    /// Non-negative finite amount. Numeric strings are accepted; null, absent,
    /// non-numeric, negative, NaN and infinite values are treated as no amount.
    pub fn amount(&self) -> Option<f64> {
        let value = match self.fields.get(AMOUNT_FIELD)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }?;
        (value.is_finite() && value >= 0.0).then_some(value)
    }
}

/// Records in load order plus the union of field names seen across them.
#[derive(Debug, Clone, Default)]
pub struct TransactionTable {
    records: Vec<TransactionRecord>,
    columns: BTreeSet<String>,
}

impl TransactionTable {
    pub fn new(records: Vec<TransactionRecord>) -> Self {
        let columns = records
            .iter()
            .flat_map(|r| r.fields().keys().cloned())
            .collect();
        Self { records, columns }
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether `name` appears as a field on any record.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains(name)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }
}

impl FromIterator<TransactionRecord> for TransactionTable {
    fn from_iter<I: IntoIterator<Item = TransactionRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
