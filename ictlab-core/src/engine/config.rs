//! Engine configuration: TOML-loadable, validated once at construction.

use super::session::{SessionConfig, SessionFilter};
use crate::domain::{Pair, Timeframe};
use crate::liquidity::{FvgConfig, SweepConfig};
use crate::position_management::PositionConfig;
use crate::signals::EntryConfig;
use crate::structure::StructureConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to parse engine config: {0}")]
    Parse(#[from] toml::de::Error),
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Which timeframe drives which role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeframeConfig {
    /// Higher timeframe whose structure gates entries.
    pub bias: Timeframe,
    /// Lower timeframe for sweeps, gaps, entries and position management.
    pub entry: Timeframe,
    /// Optional second higher timeframe that must agree with `bias`.
    pub confirm: Option<Timeframe>,
}

impl Default for TimeframeConfig {
    fn default() -> Self {
        Self {
            bias: Timeframe::H1,
            entry: Timeframe::M5,
            confirm: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Candles retained per timeframe.
    pub max_bars: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_bars: 500 }
    }
}

/// Complete configuration of one engine instance (one pair).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pair: Pair,
    pub timeframes: TimeframeConfig,
    pub structure: StructureConfig,
    pub sweep: SweepConfig,
    pub fvg: FvgConfig,
    pub entry: EntryConfig,
    pub position: PositionConfig,
    pub history: HistoryConfig,
    /// Kill-zone filter for new entries; absent means always allowed.
    pub session: Option<SessionConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pair: "BTCUSDT".to_string(),
            timeframes: TimeframeConfig::default(),
            structure: StructureConfig::default(),
            sweep: SweepConfig::default(),
            fvg: FvgConfig::default(),
            entry: EntryConfig::default(),
            position: PositionConfig::default(),
            history: HistoryConfig::default(),
            session: None,
        }
    }
}

impl EngineConfig {
    /// Default configuration for `pair`.
    pub fn for_pair(pair: impl Into<Pair>) -> Self {
        Self {
            pair: pair.into(),
            ..Self::default()
        }
    }

    /// Parse and validate.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Timeframes the engine consumes, highest first.
    pub fn timeframes(&self) -> Vec<Timeframe> {
        let mut tfs = vec![self.timeframes.bias, self.timeframes.entry];
        tfs.extend(self.timeframes.confirm);
        tfs.sort_by(|a, b| b.cmp(a));
        tfs
    }

    /// Check every range constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pair.trim().is_empty() {
            return Err(invalid("pair", "must not be empty"));
        }

        let tf = &self.timeframes;
        if tf.entry >= tf.bias {
            return Err(invalid(
                "timeframes.entry",
                format!("{} must be shorter than bias timeframe {}", tf.entry, tf.bias),
            ));
        }
        if let Some(confirm) = tf.confirm {
            if confirm <= tf.entry || confirm == tf.bias {
                return Err(invalid(
                    "timeframes.confirm",
                    format!(
                        "{confirm} must be longer than {} and differ from {}",
                        tf.entry, tf.bias
                    ),
                ));
            }
        }

        let s = &self.structure;
        positive_count("structure.swing_window", s.swing_window)?;
        positive_count("structure.lookback_bars", s.lookback_bars)?;
        positive_count("structure.fast_ma", s.fast_ma)?;
        positive_count("structure.slow_ma", s.slow_ma)?;
        if s.fast_ma >= s.slow_ma {
            return Err(invalid(
                "structure.fast_ma",
                format!("{} must be below slow_ma {}", s.fast_ma, s.slow_ma),
            ));
        }

        let sw = &self.sweep;
        positive_count("sweep.recent_window", sw.recent_window)?;
        if sw.lookback <= sw.recent_window {
            return Err(invalid(
                "sweep.lookback",
                format!("{} must exceed recent_window {}", sw.lookback, sw.recent_window),
            ));
        }
        open_unit("sweep.tolerance", sw.tolerance)?;

        let f = &self.fvg;
        positive("fvg.min_size", f.min_size)?;
        positive_count("fvg.max_age", f.max_age)?;
        positive("fvg.displacement_body", f.displacement_body)?;

        let e = &self.entry;
        if !e.rr_ratio.is_finite() || e.rr_ratio < 1.0 {
            return Err(invalid("entry.rr_ratio", format!("{} must be >= 1", e.rr_ratio)));
        }
        open_unit("entry.stop_margin", e.stop_margin)?;
        if !(0.0..=1.0).contains(&e.confirm_fraction) {
            return Err(invalid(
                "entry.confirm_fraction",
                format!("{} must lie in [0, 1]", e.confirm_fraction),
            ));
        }

        let p = &self.position;
        if !(p.trail_ratio > 0.0 && p.trail_ratio <= 1.0) {
            return Err(invalid(
                "position.trail_ratio",
                format!("{} must lie in (0, 1]", p.trail_ratio),
            ));
        }

        let min_bars = (2 * s.swing_window + 1).max(sw.lookback);
        if self.history.max_bars < min_bars {
            return Err(invalid(
                "history.max_bars",
                format!("{} must be at least {min_bars}", self.history.max_bars),
            ));
        }

        if let Some(session) = &self.session {
            SessionFilter::from_config(session)?;
        }

        Ok(())
    }
}

fn positive_count(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(invalid(field, "must be at least 1"));
    }
    Ok(())
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid(field, format!("{value} must be > 0")));
    }
    Ok(())
}

fn open_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(value > 0.0 && value < 1.0) {
        return Err(invalid(field, format!("{value} must lie in (0, 1)")));
    }
    Ok(())
}
