//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Single position: never more than one open position, no overlapping opens
//! 2. Ratchet monotonicity: stops may only tighten, never loosen
//! 3. FVG invariants: active gaps are well-formed, unfilled and within max age
//! 4. Idempotent replay: re-feeding processed candles changes nothing

use chrono::{DateTime, Duration, TimeZone, Utc};
use ictlab_core::domain::{Candle, PositionSide, Timeframe};
use ictlab_core::engine::{EngineConfig, EngineEvent, StrategyEngine};
use ictlab_core::execution::PaperExecution;
use ictlab_core::position_management::StopRatchet;
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

/// One bar step: close-to-close return and the two wick sizes.
fn arb_step() -> impl Strategy<Value = (f64, f64, f64)> {
    (-0.02..0.02_f64, 0.0..0.01_f64, 0.0..0.01_f64)
}

fn arb_path(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<(f64, f64, f64)>> {
    prop::collection::vec(arb_step(), len)
}

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap()
}

/// Valid OHLC candles from a random walk starting at 100.
fn walk(start: DateTime<Utc>, step: Duration, path: &[(f64, f64, f64)]) -> Vec<Candle> {
    let mut prev = 100.0_f64;
    path.iter()
        .enumerate()
        .map(|(i, &(ret, up, down))| {
            let open = prev;
            let close = (open * (1.0 + ret)).max(1.0);
            let high = open.max(close) * (1.0 + up);
            let low = open.min(close) * (1.0 - down);
            prev = close;
            Candle::new(start + step * i as i32, open, high, low, close, 1000.0)
        })
        .collect()
}

fn small_config() -> EngineConfig {
    let mut config = EngineConfig::for_pair("PROP");
    config.structure.swing_window = 2;
    config.structure.lookback_bars = 10;
    config.structure.fast_ma = 3;
    config.structure.slow_ma = 5;
    config.sweep.lookback = 8;
    config.sweep.recent_window = 3;
    config.fvg.max_age = 6;
    config.history.max_bars = 60;
    config
}

/// Hourly bias series followed by the five-minute entry series.
fn feed(engine: &mut StrategyEngine, hourly: &[Candle], entry: &[Candle]) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    for c in hourly {
        if let Ok(outcome) = engine.on_candle(Timeframe::H1, *c) {
            events.extend(outcome.into_events());
        }
    }
    for c in entry {
        if let Ok(outcome) = engine.on_candle(Timeframe::M5, *c) {
            events.extend(outcome.into_events());
        }
    }
    events
}

fn engine() -> StrategyEngine {
    StrategyEngine::new(small_config(), Box::new(PaperExecution::new())).unwrap()
}

// ── 1. Single Position ───────────────────────────────────────────────

proptest! {
    #[test]
    fn at_most_one_open_position(
        hourly in arb_path(6..20),
        entry in arb_path(20..200),
    ) {
        let mut engine = engine();
        let hourly = walk(epoch(), Duration::hours(1), &hourly);
        let entry = walk(epoch() + Duration::days(1), Duration::minutes(5), &entry);
        let events = feed(&mut engine, &hourly, &entry);

        let mut open = 0i32;
        for event in &events {
            match event {
                EngineEvent::PositionOpened(_) => {
                    prop_assert_eq!(open, 0, "opened while a position was live");
                    open += 1;
                }
                EngineEvent::PositionClosed(_) => {
                    prop_assert_eq!(open, 1, "closed without a live position");
                    open -= 1;
                }
                _ => {}
            }
        }
        prop_assert_eq!(open == 1, engine.position().is_some());
    }
}

// ── 2. Ratchet Monotonicity ──────────────────────────────────────────

proptest! {
    /// Every trailing move tightens the stop in the position's favour.
    #[test]
    fn trailed_stops_only_tighten(
        hourly in arb_path(6..20),
        entry in arb_path(20..200),
    ) {
        let mut engine = engine();
        let hourly = walk(epoch(), Duration::hours(1), &hourly);
        let entry = walk(epoch() + Duration::days(1), Duration::minutes(5), &entry);
        let events = feed(&mut engine, &hourly, &entry);

        let mut side = None;
        for event in &events {
            match event {
                EngineEvent::PositionOpened(p) => side = Some(p.side),
                EngineEvent::StopTrailed { from, to } => match side {
                    Some(PositionSide::Long) => prop_assert!(to > from),
                    Some(PositionSide::Short) => prop_assert!(to < from),
                    None => prop_assert!(false, "trail without a position"),
                },
                EngineEvent::PositionClosed(_) => side = None,
                _ => {}
            }
        }
    }

    #[test]
    fn ratchet_never_loosens(
        is_long in any::<bool>(),
        initial in 50.0..150.0_f64,
        proposals in prop::collection::vec(50.0..150.0_f64, 1..50),
    ) {
        let side = if is_long { PositionSide::Long } else { PositionSide::Short };
        let mut ratchet = StopRatchet::new(side, initial);
        let mut prev = initial;
        for p in proposals {
            ratchet.tighten(p);
            let level = ratchet.level();
            match side {
                PositionSide::Long => prop_assert!(level >= prev),
                PositionSide::Short => prop_assert!(level <= prev),
            }
            prev = level;
        }
    }
}

// ── 3. FVG Invariants ────────────────────────────────────────────────

proptest! {
    #[test]
    fn active_gaps_stay_well_formed(
        hourly in arb_path(6..20),
        entry in arb_path(20..200),
    ) {
        let mut engine = engine();
        let max_age = engine.config().fvg.max_age;
        let hourly = walk(epoch(), Duration::hours(1), &hourly);
        let entry = walk(epoch() + Duration::days(1), Duration::minutes(5), &entry);
        feed(&mut engine, &hourly, &[]);

        for c in &entry {
            engine.on_candle(Timeframe::M5, *c).unwrap();
            for gap in engine.active_fvgs() {
                prop_assert!(gap.top > gap.bottom);
                prop_assert!(gap.mid > gap.bottom && gap.mid < gap.top);
                prop_assert!(!gap.filled);
                prop_assert!(gap.age_in_bars <= max_age);
                prop_assert!(gap.created_at <= c.timestamp);
            }
        }
    }
}

// ── 4. Idempotent Replay ─────────────────────────────────────────────

proptest! {
    #[test]
    fn replay_is_a_no_op(
        hourly in arb_path(6..20),
        entry in arb_path(20..120),
    ) {
        let mut engine = engine();
        let hourly = walk(epoch(), Duration::hours(1), &hourly);
        let entry = walk(epoch() + Duration::days(1), Duration::minutes(5), &entry);
        feed(&mut engine, &hourly, &entry);
        let before = engine.snapshot();

        let replayed = feed(&mut engine, &hourly, &entry);
        prop_assert!(replayed.is_empty());
        prop_assert_eq!(engine.snapshot(), before);
    }
}
