//! Execution collaborator: turns trade intents into confirmed fills.
//!
//! The engine never assumes a fill. An `Err` from the handler leaves the
//! position state untouched and the attempt is not retried within the bar.

use crate::position_management::TradeIntent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fill confirmation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    #[error("intent rejected: {0}")]
    Rejected(String),

    #[error("execution venue unavailable: {0}")]
    Unavailable(String),
}

/// Capability that executes trade intents (paper, exchange adapter, ...).
pub trait ExecutionHandler: Send {
    fn execute(
        &mut self,
        intent: &TradeIntent,
        at: DateTime<Utc>,
    ) -> Result<Fill, ExecutionError>;

    /// Name for logging
    fn name(&self) -> &str;
}

/// Fills every intent at its requested price.
#[derive(Debug, Clone, Default)]
pub struct PaperExecution {
    fills: usize,
}

impl PaperExecution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of intents filled so far.
    pub fn fill_count(&self) -> usize {
        self.fills
    }
}

impl ExecutionHandler for PaperExecution {
    fn execute(
        &mut self,
        intent: &TradeIntent,
        at: DateTime<Utc>,
    ) -> Result<Fill, ExecutionError> {
        let price = intent.price();
        if !price.is_finite() || price <= 0.0 {
            return Err(ExecutionError::Rejected(format!("invalid price {price}")));
        }
        self.fills += 1;
        Ok(Fill {
            price,
            timestamp: at,
        })
    }

    fn name(&self) -> &str {
        "paper"
    }
}

/// Handler that rejects every intent; useful to exercise failure paths.
#[derive(Debug, Clone, Default)]
pub struct RejectAll;

impl ExecutionHandler for RejectAll {
    fn execute(
        &mut self,
        _intent: &TradeIntent,
        _at: DateTime<Utc>,
    ) -> Result<Fill, ExecutionError> {
        Err(ExecutionError::Unavailable("all intents rejected".into()))
    }

    fn name(&self) -> &str {
        "reject_all"
    }
}
