use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use meter_core::replay::{replay, ReplayOutcome, RideTrace};
use meter_core::tariff::{FareMode, TariffMatrix};
use tracing_subscriber::EnvFilter;

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "meter_replay",
    about = "Replay a recorded ride trace through the fare meter",
    long_about = "Feeds a JSON ride trace (start/stop commands, GPS fixes, source errors)\n\
                  through the position tracker and fare meter on a simulated clock,\n\
                  then prints the resulting fare breakdown."
)]
struct Cli {
    /// Ride trace JSON file
    trace: PathBuf,
    /// Tariff matrix JSON file (defaults to the built-in tariffs)
    #[arg(long, env = "METER_TARIFFS")]
    tariffs: Option<PathBuf>,
    /// Override the trace's service mode
    #[arg(long)]
    mode: Option<FareMode>,
    /// Output format
    #[arg(value_enum, long, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable receipt
    Text,
    /// Full replay outcome as JSON
    Json,
}

// ── helpers ────────────────────────────────────────────────────────

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_text(outcome: &ReplayOutcome) {
    let snapshot = &outcome.snapshot;
    println!(
        "--- {} ride, {:.1} min replayed, clock {} ---",
        snapshot.mode,
        outcome.elapsed_ms as f64 / 60_000.0,
        outcome.clock_at_end
    );
    println!(
        "Fixes: {} accepted, {} noise, {} low accuracy, {} ignored",
        outcome.fixes.baseline + outcome.fixes.accumulated,
        outcome.fixes.noise_jump_discarded,
        outcome.fixes.low_accuracy_discarded,
        outcome.fixes.ignored
    );
    for error in &outcome.errors {
        println!("Source error: {error}");
    }
    println!();
    println!("{}", snapshot.fare);
}

// ── main ───────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let mut trace = RideTrace::load(&cli.trace)
        .with_context(|| format!("loading trace {}", cli.trace.display()))?;
    if let Some(mode) = cli.mode {
        trace.mode = mode;
    }

    let matrix = match &cli.tariffs {
        Some(path) => TariffMatrix::load(path)
            .with_context(|| format!("loading tariffs {}", path.display()))?,
        None => TariffMatrix::builtin(),
    };

    let outcome = replay(&trace, matrix).context("replaying trace")?;
    match cli.format {
        OutputFormat::Text => print_text(&outcome),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
    }
    Ok(())
}
