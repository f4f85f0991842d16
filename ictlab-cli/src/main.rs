//! ictlab CLI: multi-pair backtests, synthetic candle files, config checks.
//!
//! Commands:
//! - `backtest`: replay a TOML-configured set of pairs and save artifacts
//! - `synth`: write deterministic synthetic candle CSVs for one pair
//! - `check-config`: parse and validate a backtest config

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ictlab_core::domain::Timeframe;
use ictlab_core::engine::EngineConfig;
use ictlab_runner::export::save_run;
use ictlab_runner::{
    generate_series, run_from_files, run_synthetic, write_candles_csv, BacktestConfig,
    MultiRunReport, PairState,
};

#[derive(Parser)]
#[command(name = "ictlab", about = "ictlab: multi-timeframe ICT strategy backtester")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a backtest from a TOML config file.
    Backtest {
        /// Path to the backtest TOML config.
        #[arg(long)]
        config: PathBuf,

        /// Ignore configured candle files and replay this many synthetic
        /// entry-timeframe bars per pair instead.
        #[arg(long)]
        synthetic: Option<usize>,

        /// First synthetic candle date (YYYY-MM-DD).
        #[arg(long, default_value = "2024-01-01")]
        start: String,

        /// Override the config's output directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Print per-pair summaries as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Write synthetic candle CSVs for one pair.
    Synth {
        #[arg(long, default_value = "BTCUSDT")]
        pair: String,

        /// Bias timeframe (1m, 5m, 15m, 30m, 1h, 4h, 1d).
        #[arg(long, default_value = "1h")]
        bias: Timeframe,

        /// Entry timeframe.
        #[arg(long, default_value = "5m")]
        entry: Timeframe,

        /// Number of entry-timeframe bars.
        #[arg(long, default_value_t = 5000)]
        bars: usize,

        /// First candle date (YYYY-MM-DD).
        #[arg(long, default_value = "2024-01-01")]
        start: String,

        /// Directory for the CSV files.
        #[arg(long, default_value = "data")]
        out: PathBuf,
    },
    /// Parse and validate a backtest config without running it.
    CheckConfig {
        path: PathBuf,

        /// Skip the check that every timeframe has a candle file.
        #[arg(long, default_value_t = false)]
        no_data: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ictlab=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Backtest {
            config,
            synthetic,
            start,
            output_dir,
            json,
        } => run_backtest_cmd(&config, synthetic, &start, output_dir, json),
        Commands::Synth {
            pair,
            bias,
            entry,
            bars,
            start,
            out,
        } => run_synth(pair, bias, entry, bars, &start, &out),
        Commands::CheckConfig { path, no_data } => run_check_config(&path, !no_data),
    }
}

fn parse_start(s: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid start date '{s}', expected YYYY-MM-DD"))?;
    match date.and_hms_opt(0, 0, 0) {
        Some(dt) => Ok(dt.and_utc()),
        None => bail!("invalid start date '{s}'"),
    }
}

fn read_config(path: &Path, require_data: bool) -> Result<BacktestConfig> {
    let config = if require_data {
        BacktestConfig::load(path)?
    } else {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        BacktestConfig::from_toml_str(&text)?
    };
    Ok(config)
}

fn run_backtest_cmd(
    config_path: &Path,
    synthetic: Option<usize>,
    start: &str,
    output_dir: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let mut config = read_config(config_path, synthetic.is_none())
        .with_context(|| format!("invalid config {}", config_path.display()))?;
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }

    let report = match synthetic {
        Some(bars) => {
            if bars == 0 {
                bail!("--synthetic needs at least one bar");
            }
            run_synthetic(&config, parse_start(start)?, bars)?
        }
        None => run_from_files(&config)?,
    };

    if json {
        print_json(&report)?;
    } else {
        print_summary(&report);
    }

    let run_dir = save_run(&report, &config.output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());

    let failed = report.failed().count();
    if failed > 0 {
        bail!("{failed} of {} pairs failed", report.results.len());
    }
    Ok(())
}

fn print_summary(report: &MultiRunReport) {
    println!("Run {}", report.run_id);
    println!();
    println!(
        "{:<12} {:>7} {:>8} {:>9} {:>8} {:>10} {:>8} {:>8}",
        "Pair", "Trades", "Win %", "PnL %", "PF", "Compound %", "MaxDD %", "Rejected"
    );
    println!("{}", "-".repeat(80));
    for result in report.succeeded() {
        let s = &result.summary;
        println!(
            "{:<12} {:>7} {:>8.1} {:>9.2} {:>8.2} {:>10.2} {:>8.2} {:>8}",
            result.pair,
            s.trade_count,
            s.win_rate * 100.0,
            s.total_pnl_pct,
            s.profit_factor,
            s.compounded_return_pct,
            s.max_drawdown_pct,
            result.rejected,
        );
    }
    for (pair, err) in report.failed() {
        println!("{pair:<12} FAILED: {err}");
    }
    println!();

    for (pair, status) in report.board.pairs() {
        if let PairState::Failed(_) = status.state {
            continue;
        }
        let position = status
            .latest
            .as_ref()
            .and_then(|s| s.position.as_ref())
            .map(|p| format!("{:?} @ {:.5}", p.side, p.entry_price))
            .unwrap_or_else(|| "flat".into());
        println!(
            "{pair:<12} events={} errors={} final position: {position}",
            status.events, status.errors
        );
    }
}

fn print_json(report: &MultiRunReport) -> Result<()> {
    let summaries: Vec<_> = report
        .succeeded()
        .map(|r| serde_json::json!({ "pair": r.pair, "summary": r.summary }))
        .collect();
    let out = serde_json::json!({ "run_id": report.run_id, "pairs": summaries });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn run_synth(
    pair: String,
    bias: Timeframe,
    entry: Timeframe,
    bars: usize,
    start: &str,
    out: &Path,
) -> Result<()> {
    let mut engine = EngineConfig::for_pair(pair);
    engine.timeframes.bias = bias;
    engine.timeframes.entry = entry;
    engine
        .validate()
        .context("invalid timeframe combination")?;

    std::fs::create_dir_all(out)
        .with_context(|| format!("failed to create {}", out.display()))?;

    let mut lines = Vec::new();
    for (tf, candles) in generate_series(&engine, parse_start(start)?, bars) {
        let path = out.join(format!("{}_{}.csv", engine.pair.to_lowercase(), tf.label()));
        write_candles_csv(&path, &candles)?;
        info!(path = %path.display(), count = candles.len(), "wrote candles");
        lines.push(format!("\"{}\" = \"{}\"", tf.label(), path.display()));
    }

    println!("[[pairs]]");
    println!("data = {{ {} }}", lines.join(", "));
    println!();
    println!("[pairs.engine]");
    println!("pair = \"{}\"", engine.pair);
    println!(
        "timeframes = {{ bias = \"{}\", entry = \"{}\" }}",
        bias.label(),
        entry.label()
    );
    Ok(())
}

fn run_check_config(path: &Path, require_data: bool) -> Result<()> {
    let config = read_config(path, require_data)
        .with_context(|| format!("invalid config {}", path.display()))?;

    println!("OK: {}", path.display());
    println!("Run id: {}", config.run_id());
    println!("Output: {}", config.output_dir.display());
    for pair in &config.pairs {
        let tfs: Vec<&str> = pair
            .engine
            .timeframes()
            .into_iter()
            .map(Timeframe::label)
            .collect();
        println!("  {:<12} timeframes: {}", pair.pair(), tfs.join(", "));
    }
    Ok(())
}
