//! seatcast CLI
//!
//! Command-line front end for analyzing local datasets and reading history.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::forecast::{AnalysisConfig, ForecastEngine, ForecastResult};
use crate::history::{record_analysis, HistoryStore, JsonLinesStore};
use crate::utils::DatasetLoader;

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "seatcast")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Schema-agnostic seat demand forecasting for tabular datasets")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Forecast demand from a dataset
    Analyze {
        /// Input data file (CSV, TSV, JSON, JSON lines or Parquet)
        #[arg(short, long)]
        data: PathBuf,

        /// Dataset name stored with the history record (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,

        /// Source label stored with the history record
        #[arg(long, default_value = "cli")]
        source: String,

        /// Random seed (overrides the config file)
        #[arg(long)]
        seed: Option<u64>,

        /// JSON analysis config
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// JSON-lines history file to append to
        #[arg(long)]
        history: Option<PathBuf>,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Show the inferred schema and feature layout without training
    Inspect {
        #[arg(short, long)]
        data: PathBuf,
    },

    /// List recent analyses
    History {
        #[arg(long)]
        history: PathBuf,

        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub struct AnalyzeArgs<'a> {
    pub data: &'a Path,
    pub name: Option<&'a str>,
    pub source: &'a str,
    pub seed: Option<u64>,
    pub config: Option<&'a Path>,
    pub history: Option<&'a Path>,
    pub json: bool,
}

pub fn cmd_analyze(args: AnalyzeArgs<'_>) -> anyhow::Result<()> {
    let mut config = match args.config {
        Some(path) => AnalysisConfig::from_json_file(path)?,
        None => AnalysisConfig::default(),
    };
    if args.seed.is_some() {
        config = config.with_random_seed(args.seed);
    }
    let engine = ForecastEngine::new(config)?;

    let name = args
        .name
        .map(str::to_string)
        .or_else(|| args.data.file_name().map(|n| n.to_string_lossy().into_owned()));

    if args.json {
        let outcome = engine.analyze_path(args.data);
        if let (Ok(result), Some(path)) = (&outcome, args.history) {
            record_analysis(&JsonLinesStore::new(path), args.source, name.as_deref(), result);
        }
        let response = engine.respond(outcome);
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    section("Analyze");
    step_run("Forecasting");
    let start = Instant::now();
    let result = engine.analyze_path(args.data)?;
    step_done(&format!("{} rows in {:?}", result.analysis.rows, start.elapsed()));

    if let Some(path) = args.history {
        if let Some(id) = record_analysis(&JsonLinesStore::new(path), args.source, name.as_deref(), &result) {
            println!("  {} {}", ok("✓"), dim(&format!("recorded {} → {}", id, path.display())));
        }
    }

    print_result(&result);
    Ok(())
}

fn print_result(result: &ForecastResult) {
    println!();
    line_box_top();
    line_box(&kv("Predicted demand", &format!("{:.2}", result.predicted_demand)));
    line_box(&kv("Variation (std)", &format!("{:.2}", result.variation_std)));
    line_box(&kv(
        "Range",
        &format!("{:.2} – {:.2}", result.range.min, result.range.max),
    ));
    line_box(&kv("Festive average", &format!("{:.2}", result.festive_avg)));
    line_box_bottom();
    println!("  {}", muted(&result.message));

    section("Dataset");
    let a = &result.analysis;
    println!("  {:<16} {}", muted("Rows"), a.rows);
    println!("  {:<16} {}", muted("Target"), a.target_column.cyan());
    println!("  {:<16} {}", muted("Date"), a.date_column);
    let routes = if a.route_columns.is_empty() { "none".to_string() } else { a.route_columns.join(", ") };
    println!("  {:<16} {}", muted("Routes"), routes);
    println!("  {:<16} {}", muted("Features"), a.feature_count);
    println!("  {:<16} {:.2}", muted("Avg target"), a.average_target);

    if !result.monthly_trends.is_empty() {
        section("Monthly trend");
        let peak = result.monthly_trends.values().cloned().fold(f64::MIN, f64::max).max(1e-9);
        for point in &result.chart_data {
            let bar = "█".repeat(((point.value / peak) * 30.0).round().max(0.0) as usize);
            println!("  {:>4}  {:>10.2}  {}", point.month, point.value, accent(&bar));
        }
    }

    if !result.per_route_forecast.is_empty() {
        section("Per-route forecast");
        for (route, value) in result.per_route_forecast.iter() {
            println!("  {:<24} {:>10.2}", route, value);
        }
    }

    if !result.top_drivers.is_empty() {
        section("Top demand drivers");
        for driver in &result.top_drivers {
            println!("  {:<24} {:>9.1}%", driver.feature, driver.importance);
        }
    }
    println!();
}

pub fn cmd_inspect(data: &Path) -> anyhow::Result<()> {
    section("Inspect");

    step_run("Loading data");
    let start = Instant::now();
    let table = DatasetLoader::new().load_path(data)?;
    step_done(&format!("{} rows × {} cols in {:?}", table.n_rows(), table.n_cols(), start.elapsed()));

    let report = ForecastEngine::default().inspect(table)?;
    println!();
    println!("  {:<16} {}", muted("Target"), report.schema.target_column.cyan());
    let date = if report.synthesized_dates { "synthesized" } else { report.schema.date_axis.label() };
    println!("  {:<16} {}", muted("Date"), date);
    println!("  {:<16} {:?}", muted("Routes"), report.schema.route_columns);
    println!("  {:<16} {}", muted("Rows used"), report.rows);

    section("Features");
    for name in &report.feature_names {
        println!("  {}", name);
    }
    println!();
    Ok(())
}

pub fn cmd_history(path: &Path, limit: usize) -> anyhow::Result<()> {
    section("History");
    let records = JsonLinesStore::new(path).recent(limit)?;
    if records.is_empty() {
        println!("  {}", dim("no analyses recorded"));
        println!();
        return Ok(());
    }

    println!(
        "  {:<20} {:<20} {:>10} {:>10}",
        muted("When"), muted("Dataset"), muted("Demand"), muted("Festive")
    );
    println!("  {}", dim(&"─".repeat(64)));
    for record in records {
        println!(
            "  {:<20} {:<20} {:>10.2} {:>10.2}",
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            record.dataset_name.as_deref().unwrap_or("-"),
            record.predicted_demand(),
            record.festive_avg(),
        );
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi() {
        let colored = format!("{}", "demand".red());
        assert_eq!(strip_ansi(&colored), "demand");
    }

    #[test]
    fn test_parse_analyze() {
        let cli = Cli::parse_from([
            "seatcast", "analyze", "--data", "bookings.csv", "--seed", "7", "--json",
        ]);
        match cli.command {
            Commands::Analyze { data, seed, json, source, .. } => {
                assert_eq!(data, PathBuf::from("bookings.csv"));
                assert_eq!(seed, Some(7));
                assert!(json);
                assert_eq!(source, "cli");
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_parse_history_default_limit() {
        let cli = Cli::parse_from(["seatcast", "history", "--history", "h.jsonl"]);
        assert!(matches!(cli.command, Commands::History { limit: 10, .. }));
    }
}
