use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use ictlab_core::domain::{ExitReason, PositionSide, TradeOutcome, TradeRecord};
use ictlab_runner::metrics::{equity_curve, PROFIT_FACTOR_CAP};
use ictlab_runner::PerformanceSummary;

// ── Strategies (proptest) ──

fn trade_from_pnl(i: usize, pnl_pct: f64) -> TradeRecord {
    let entry_time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(i as i64);
    TradeRecord {
        side: PositionSide::Long,
        entry_time,
        entry_price: 100.0,
        initial_stop: 99.0,
        take_profit: 102.0,
        exit_time: entry_time + Duration::minutes(30),
        exit_price: 100.0 * (1.0 + pnl_pct / 100.0),
        exit_reason: if pnl_pct > 0.0 {
            ExitReason::TakeProfit
        } else {
            ExitReason::StopLoss
        },
        pnl_percent: pnl_pct,
        outcome: TradeOutcome::from_pnl_pct(pnl_pct),
        bars_held: 6,
    }
}

fn arb_trades() -> impl Strategy<Value = Vec<TradeRecord>> {
    prop::collection::vec(-20.0..20.0f64, 0..60).prop_map(|pnls| {
        pnls.into_iter()
            .enumerate()
            .map(|(i, p)| trade_from_pnl(i, p))
            .collect()
    })
}

// ── 1. Summary bounds ──

proptest! {
    #[test]
    fn summary_stays_in_bounds(trades in arb_trades()) {
        let s = PerformanceSummary::compute(&trades);

        prop_assert_eq!(s.trade_count, trades.len());
        prop_assert_eq!(s.wins + s.losses + s.flats, trades.len());
        prop_assert!((0.0..=1.0).contains(&s.win_rate));
        prop_assert!((0.0..=PROFIT_FACTOR_CAP).contains(&s.profit_factor));
        prop_assert!((0.0..100.0).contains(&s.max_drawdown_pct));
        prop_assert!(s.compounded_return_pct > -100.0);
        prop_assert!(s.max_consecutive_wins <= s.wins);
        prop_assert!(s.max_consecutive_losses <= s.losses);
    }
}

// ── 2. Equity curve ──

proptest! {
    #[test]
    fn equity_curve_starts_at_one_and_stays_positive(trades in arb_trades()) {
        let curve = equity_curve(&trades);
        prop_assert_eq!(curve.len(), trades.len() + 1);
        prop_assert_eq!(curve[0], 1.0);
        prop_assert!(curve.iter().all(|e| *e > 0.0));
    }

    #[test]
    fn losing_only_runs_have_zero_profit_factor(
        losses in prop::collection::vec(-20.0..-0.01f64, 1..30)
    ) {
        let trades: Vec<TradeRecord> = losses
            .into_iter()
            .enumerate()
            .map(|(i, p)| trade_from_pnl(i, p))
            .collect();
        let s = PerformanceSummary::compute(&trades);
        prop_assert_eq!(s.profit_factor, 0.0);
        prop_assert_eq!(s.wins, 0);
        prop_assert!(s.max_drawdown_pct > 0.0);
    }
}
