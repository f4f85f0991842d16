//! Artifact export: trade tape CSV, trade and result JSON, run manifest.
//!
//! Persisted results carry a `schema_version`; newer versions are rejected
//! on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use ictlab_core::domain::TradeRecord;
use serde::Serialize;

use crate::metrics::PerformanceSummary;
use crate::multi::MultiRunReport;
use crate::runner::{PairResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_result_json(result: &PairResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize PairResult to JSON")
}

/// Deserialize a `PairResult`, rejecting unknown schema versions.
pub fn import_result_json(json: &str) -> Result<PairResult> {
    let result: PairResult =
        serde_json::from_str(json).context("failed to deserialize PairResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

pub fn export_trades_json(trades: &[TradeRecord]) -> Result<String> {
    serde_json::to_string_pretty(trades).context("failed to serialize trades to JSON")
}

pub fn export_summary_json(summary: &PerformanceSummary) -> Result<String> {
    serde_json::to_string_pretty(summary).context("failed to serialize summary to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Columns: side, entry_time, entry_price, initial_stop, take_profit,
/// exit_time, exit_price, exit_reason, pnl_percent, outcome, bars_held,
/// r_multiple. Times are RFC 3339 UTC.
pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "side",
        "entry_time",
        "entry_price",
        "initial_stop",
        "take_profit",
        "exit_time",
        "exit_price",
        "exit_reason",
        "pnl_percent",
        "outcome",
        "bars_held",
        "r_multiple",
    ])?;

    for t in trades {
        wtr.write_record([
            &format!("{:?}", t.side),
            &t.entry_time.to_rfc3339(),
            &format!("{:.6}", t.entry_price),
            &format!("{:.6}", t.initial_stop),
            &format!("{:.6}", t.take_profit),
            &t.exit_time.to_rfc3339(),
            &format!("{:.6}", t.exit_price),
            &format!("{:?}", t.exit_reason),
            &format!("{:.4}", t.pnl_percent),
            &format!("{:?}", t.outcome),
            &t.bars_held.to_string(),
            &format!("{:.3}", t.r_multiple()),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save one pair's artifacts under `run_dir/<pair>/`:
/// - `result.json`: the full `PairResult`
/// - `summary.json`: performance summary only
/// - `trades.csv` / `trades.json`: the trade tape
///
/// Returns the pair directory.
pub fn save_artifacts(result: &PairResult, run_dir: &Path) -> Result<PathBuf> {
    let pair_dir = run_dir.join(&result.pair);
    std::fs::create_dir_all(&pair_dir)
        .with_context(|| format!("failed to create artifact dir: {}", pair_dir.display()))?;

    write(&pair_dir.join("result.json"), &export_result_json(result)?)?;
    write(&pair_dir.join("summary.json"), &export_summary_json(&result.summary)?)?;
    write(&pair_dir.join("trades.csv"), &export_trades_csv(&result.trades)?)?;
    write(&pair_dir.join("trades.json"), &export_trades_json(&result.trades)?)?;

    Ok(pair_dir)
}

pub fn load_artifacts(pair_dir: &Path) -> Result<PairResult> {
    let path = pair_dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_result_json(&json)
}

#[derive(Debug, Serialize)]
struct ManifestEntry<'a> {
    pair: &'a str,
    summary: Option<&'a PerformanceSummary>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct RunManifest<'a> {
    schema_version: u32,
    run_id: &'a str,
    pairs: Vec<ManifestEntry<'a>>,
}

/// Save every pair of a multi-pair run under `output_dir/<run id prefix>/`
/// plus a `run.json` manifest listing each pair's summary or error.
pub fn save_run(report: &MultiRunReport, output_dir: &Path) -> Result<PathBuf> {
    let short_id = report.run_id.get(..12).unwrap_or(&report.run_id);
    let run_dir = output_dir.join(short_id);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create run dir: {}", run_dir.display()))?;

    let mut entries = Vec::with_capacity(report.results.len());
    for outcome in &report.results {
        match &outcome.result {
            Ok(result) => {
                save_artifacts(result, &run_dir)?;
                entries.push(ManifestEntry {
                    pair: &outcome.pair,
                    summary: Some(&result.summary),
                    error: None,
                });
            }
            Err(e) => entries.push(ManifestEntry {
                pair: &outcome.pair,
                summary: None,
                error: Some(e.to_string()),
            }),
        }
    }

    let manifest = RunManifest {
        schema_version: SCHEMA_VERSION,
        run_id: &report.run_id,
        pairs: entries,
    };
    let json =
        serde_json::to_string_pretty(&manifest).context("failed to serialize run manifest")?;
    write(&run_dir.join("run.json"), &json)?;

    Ok(run_dir)
}

fn write(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
