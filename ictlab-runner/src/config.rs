//! Serializable backtest configuration.
//!
//! ```toml
//! output_dir = "results"
//!
//! [[pairs]]
//! data = { "1h" = "data/btc_1h.csv", "5m" = "data/btc_5m.csv" }
//!
//! [pairs.engine]
//! pair = "BTCUSDT"
//! timeframes = { bias = "1h", entry = "5m" }
//! ```

use ictlab_core::domain::Timeframe;
use ictlab_core::engine::{ConfigError as EngineConfigError, EngineConfig};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("engine config for {pair}: {source}")]
    Engine {
        pair: String,
        #[source]
        source: EngineConfigError,
    },

    #[error("no pairs configured")]
    NoPairs,

    #[error("pair {0} configured twice")]
    DuplicatePair(String),

    #[error("{pair}: unknown timeframe label '{label}' in data paths")]
    UnknownTimeframe { pair: String, label: String },

    #[error("{pair}: no candle file for timeframe {timeframe}")]
    MissingData { pair: String, timeframe: Timeframe },
}

/// One engine and the candle files that feed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairRun {
    #[serde(default)]
    pub engine: EngineConfig,
    /// Timeframe label (`"5m"`, `"1h"`, ...) to candle CSV path.
    #[serde(default)]
    pub data: BTreeMap<String, PathBuf>,
}

impl PairRun {
    pub fn new(engine: EngineConfig) -> Self {
        Self {
            engine,
            data: BTreeMap::new(),
        }
    }

    pub fn pair(&self) -> &str {
        &self.engine.pair
    }

    /// Data paths keyed by parsed timeframe.
    pub fn data_paths(&self) -> Result<Vec<(Timeframe, &Path)>, ConfigError> {
        self.data
            .iter()
            .map(|(label, path)| {
                let tf = label
                    .parse::<Timeframe>()
                    .map_err(|_| ConfigError::UnknownTimeframe {
                        pair: self.engine.pair.clone(),
                        label: label.clone(),
                    })?;
                Ok((tf, path.as_path()))
            })
            .collect()
    }

    fn validate(&self, require_data: bool) -> Result<(), ConfigError> {
        self.engine
            .validate()
            .map_err(|source| ConfigError::Engine {
                pair: self.engine.pair.clone(),
                source,
            })?;

        let paths = self.data_paths()?;
        if require_data {
            for tf in self.engine.timeframes() {
                if !paths.iter().any(|(t, _)| *t == tf) {
                    return Err(ConfigError::MissingData {
                        pair: self.engine.pair.clone(),
                        timeframe: tf,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Full backtest configuration: one or more pairs and where to write results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    pub pairs: Vec<PairRun>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

impl BacktestConfig {
    pub fn new(pairs: Vec<PairRun>) -> Self {
        Self {
            output_dir: default_output_dir(),
            pairs,
        }
    }

    /// Parse without checking that candle files are configured.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate(false)?;
        Ok(config)
    }

    /// Read and fully validate a config file, including data paths.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text)?;
        config.validate(true)?;
        Ok(config)
    }

    /// Check every engine config and pair uniqueness. With `require_data`,
    /// every timeframe an engine consumes must have a candle file.
    pub fn validate(&self, require_data: bool) -> Result<(), ConfigError> {
        if self.pairs.is_empty() {
            return Err(ConfigError::NoPairs);
        }
        let mut seen = HashSet::new();
        for pair in &self.pairs {
            if !seen.insert(pair.pair()) {
                return Err(ConfigError::DuplicatePair(pair.pair().to_string()));
            }
            pair.validate(require_data)?;
        }
        Ok(())
    }

    /// Deterministic hash of the full configuration.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> RunId {
        let bytes = serde_json::to_vec(self).unwrap_or_else(|_| format!("{self:?}").into_bytes());
        blake3::hash(&bytes).to_hex().to_string()
    }
}
