//! Per-timeframe candle history and structure state.

use crate::domain::{Candle, Timeframe};
use crate::structure::{classify_structure, MarketBias, StructureAnalysis, StructureConfig};
use chrono::{DateTime, Utc};

/// Bounded history of one timeframe.
///
/// Absolute indices count every candle ever pushed, so they stay valid
/// after old candles are trimmed.
#[derive(Debug, Clone)]
pub struct TimeframeContext {
    timeframe: Timeframe,
    candles: Vec<Candle>,
    /// Absolute index of `candles[0]`.
    base_index: usize,
    max_bars: usize,
    last_timestamp: Option<DateTime<Utc>>,
    analysis: StructureAnalysis,
}

impl TimeframeContext {
    pub fn new(timeframe: Timeframe, max_bars: usize) -> Self {
        Self {
            timeframe,
            candles: Vec::with_capacity(max_bars.min(4096)),
            base_index: 0,
            max_bars: max_bars.max(1),
            last_timestamp: None,
            analysis: StructureAnalysis::neutral(),
        }
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// A candle not newer than the last accepted one.
    pub fn is_stale(&self, candle: &Candle) -> bool {
        self.last_timestamp
            .is_some_and(|last| candle.timestamp <= last)
    }

    /// Append a closed candle and return its absolute index.
    pub fn push(&mut self, candle: Candle) -> usize {
        let index = self.next_index();
        self.last_timestamp = Some(candle.timestamp);
        self.candles.push(candle);
        if self.candles.len() > self.max_bars {
            let excess = self.candles.len() - self.max_bars;
            self.candles.drain(..excess);
            self.base_index += excess;
        }
        index
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn base_index(&self) -> usize {
        self.base_index
    }

    /// Absolute index the next pushed candle will receive.
    pub fn next_index(&self) -> usize {
        self.base_index + self.candles.len()
    }

    /// Candle at an absolute index, if still retained.
    pub fn get(&self, index: usize) -> Option<&Candle> {
        index
            .checked_sub(self.base_index)
            .and_then(|i| self.candles.get(i))
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.last_timestamp
    }

    /// Recompute structure from scratch. Returns the previous analysis.
    pub fn reclassify(&mut self, config: &StructureConfig) -> StructureAnalysis {
        let analysis = classify_structure(&self.candles, config);
        std::mem::replace(&mut self.analysis, analysis)
    }

    pub fn bias(&self) -> MarketBias {
        self.analysis.bias
    }

    pub fn analysis(&self) -> &StructureAnalysis {
        &self.analysis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_candles;

    #[test]
    fn trimming_keeps_absolute_indices() {
        let candles = make_candles(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let mut ctx = TimeframeContext::new(Timeframe::M5, 3);
        for (i, c) in candles.iter().enumerate() {
            assert_eq!(ctx.push(*c), i);
        }
        assert_eq!(ctx.candles().len(), 3);
        assert_eq!(ctx.base_index(), 2);
        assert_eq!(ctx.next_index(), 5);
        assert_eq!(ctx.get(4).map(|c| c.close), Some(5.0));
        assert_eq!(ctx.get(2).map(|c| c.close), Some(3.0));
        assert!(ctx.get(1).is_none());
        assert!(ctx.get(5).is_none());
    }

    #[test]
    fn stale_detection() {
        let candles = make_candles(&[1.0, 2.0]);
        let mut ctx = TimeframeContext::new(Timeframe::H1, 10);
        assert!(!ctx.is_stale(&candles[0]));
        ctx.push(candles[1]);
        assert!(ctx.is_stale(&candles[1]));
        assert!(ctx.is_stale(&candles[0]));
    }

    #[test]
    fn reclassify_returns_previous() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let mut ctx = TimeframeContext::new(Timeframe::H1, 100);
        for c in make_candles(&closes) {
            ctx.push(c);
        }
        let previous = ctx.reclassify(&StructureConfig::default());
        assert_eq!(previous.bias, MarketBias::Neutral);
        assert_eq!(ctx.bias(), MarketBias::Bullish);
    }
}
