use anyhow::Result;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: General,
    pub input: Input,
    pub output: Output,
    pub rankings: Rankings,
    pub observability: Observability,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct General {
    pub log_level: String,
}

impl Default for General {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Input {
    /// Transactions file used when the command line does not name one.
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Output {
    pub path: String,
    pub features_path: String,
}

impl Default for Output {
    fn default() -> Self {
        Self {
            path: "wallet_scores.csv".to_string(),
            features_path: "wallet_features.csv".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Rankings {
    pub top_n: usize,
}

impl Default for Rankings {
    fn default() -> Self {
        Self { top_n: 20 }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Observability {
    /// When set, Prometheus text-format metrics are written here after each run.
    pub metrics_path: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let content = std::fs::read_to_string(DEFAULT_CONFIG_PATH)?;
        Self::from_toml_str(&content)
    }

    /// Like [`Config::load`], but a missing config file yields the built-in defaults.
    pub fn load_or_default() -> Result<Self> {
        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::load()
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_toml_str(s)
    }
}
