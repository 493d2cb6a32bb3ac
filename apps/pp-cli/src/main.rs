use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::time::Duration;

use pp_app::{
    AppError, AppResult, Edit, Engine, EngineConfig, FieldId, PlaybackScheduler, Settled,
};
use pp_core::Phase;
use pp_phasor::{PowerSolver, Snapshot};
use serde::Serialize;
use tracing::info;

#[derive(Parser)]
#[command(name = "pp-cli")]
#[command(about = "PowerPlots CLI - AC phasor and instantaneous power explorer", long_about = None)]
struct Cli {
    /// Engine configuration YAML (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct EditArgs {
    /// Field edit in dial units, applied in order (e.g. u0=100, iangle=45, q=50)
    #[arg(long = "set", value_parser = parse_assignment)]
    edits: Vec<(FieldId, f64)>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply edits and print the resulting state
    Show {
        #[command(flatten)]
        edits: EditArgs,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Apply edits, then back-solve the current for a power target
    Solve {
        #[command(flatten)]
        edits: EditArgs,
        /// Power target in dial units: s=RAW, p=RAW or q=RAW
        #[arg(long, value_parser = parse_assignment)]
        target: (FieldId, f64),
    },
    /// Apply edits and print plot traces as JSON
    Traces {
        #[command(flatten)]
        edits: EditArgs,
    },
    /// Apply edits, then run playback for a number of steps
    Play {
        #[command(flatten)]
        edits: EditArgs,
        /// Number of phase steps to run
        #[arg(long, default_value_t = 360)]
        steps: usize,
        /// Override the step period in milliseconds
        #[arg(long)]
        period_ms: Option<u64>,
    },
}

fn main() -> AppResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load_yaml(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Show { edits, json } => cmd_show(&config, &edits, json),
        Commands::Solve { edits, target } => cmd_solve(&config, &edits, target),
        Commands::Traces { edits } => cmd_traces(&config, &edits),
        Commands::Play {
            edits,
            steps,
            period_ms,
        } => cmd_play(config, &edits, steps, period_ms),
    }
}

fn parse_assignment(s: &str) -> Result<(FieldId, f64), String> {
    let (field, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{s}'"))?;
    let field: FieldId = field.parse().map_err(|e: AppError| e.to_string())?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid value '{value}': {e}"))?;
    Ok((field, value))
}

fn build_engine(config: &EngineConfig, edits: &EditArgs) -> AppResult<Engine> {
    let engine = Engine::with_config(config)?;
    for &(field, raw) in &edits.edits {
        engine.apply(field, raw)?;
    }
    Ok(engine)
}

fn cmd_show(config: &EngineConfig, edits: &EditArgs, json: bool) -> AppResult<()> {
    let engine = build_engine(config, edits)?;
    let snapshot = engine.snapshot();
    if json {
        print_json(&snapshot)?;
    } else {
        print_snapshot(&engine, &snapshot);
    }
    Ok(())
}

fn cmd_solve(config: &EngineConfig, edits: &EditArgs, target: (FieldId, f64)) -> AppResult<()> {
    let (field, raw) = target;
    if !field.is_power() {
        return Err(AppError::InvalidInput(format!(
            "target must be a power field, got {field}"
        )));
    }
    let engine = build_engine(config, edits)?;
    let prior = engine.snapshot();

    let Edit::Power(power) = engine.contract().decode(field, raw)? else {
        return Err(AppError::InvalidInput(format!("{field} is not a power field")));
    };
    let solution = PowerSolver::solve_for(&prior.model(), power)?;
    let settled = engine.apply(field, raw)?;

    println!("Target: {field} = {raw}");
    print_snapshot(&engine, &settled.snapshot);
    match solution.alternate_i_angle {
        Some(alt) => println!(
            "Alternate current angle: {:.3} deg (dial {:.3}), not applied",
            alt.degrees(),
            alt.to_dial().get()
        ),
        None => println!("Alternate current angle: none"),
    }
    Ok(())
}

fn cmd_traces(config: &EngineConfig, edits: &EditArgs) -> AppResult<()> {
    let engine = build_engine(config, edits)?;
    print_json(&engine.traces(&config.traces))
}

fn cmd_play(
    mut config: EngineConfig,
    edits: &EditArgs,
    steps: usize,
    period_ms: Option<u64>,
) -> AppResult<()> {
    if let Some(period_ms) = period_ms {
        config.playback.period_ms = period_ms;
        config.validate()?;
    }
    let engine = Arc::new(build_engine(&config, edits)?);

    let (tx, rx) = channel::<Settled>();
    let tx = std::sync::Mutex::new(tx);
    engine.on_settled(move |settled| {
        if let Ok(tx) = tx.lock() {
            let _ = tx.send(settled.clone());
        }
    });

    let mut scheduler = PlaybackScheduler::new(&engine, config.playback);
    scheduler.start()?;
    info!(steps, "running playback");

    let timeout = config.playback.period() * 10 + Duration::from_secs(1);
    let mut received = 0;
    while received < steps {
        match rx.recv_timeout(timeout) {
            Ok(settled) => {
                received += 1;
                println!(
                    "step {:>4}: phi = {:>8.3} deg  S = {:.4}{:+.4}j",
                    received,
                    settled.inst_phase_degrees(),
                    settled.snapshot.s.re,
                    settled.snapshot.s.im
                );
            }
            Err(_) => break,
        }
    }
    scheduler.stop()?;

    if received < steps {
        let reason = std::iter::from_fn(|| scheduler.try_event())
            .last()
            .map(|e| format!("{e:?}"))
            .unwrap_or_else(|| "timed out".to_string());
        return Err(AppError::Playback(format!(
            "playback ended after {received} of {steps} steps: {reason}"
        )));
    }
    print_snapshot(&engine, &engine.snapshot());
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::InvalidInput(format!("JSON encoding failed: {e}")))?;
    println!("{text}");
    Ok(())
}

fn print_snapshot(engine: &Engine, snapshot: &Snapshot) {
    let contract = engine.contract();
    let deg = |rad: f64| Phase::from_radians(rad).degrees();

    println!("Voltage:  U0 = {:.4} pu  angle = {:>8.3} deg", snapshot.u0, deg(snapshot.u_angle));
    println!("Current:  I0 = {:.4} pu  angle = {:>8.3} deg", snapshot.i0, deg(snapshot.i_angle));
    println!("Phase:    phi = {:>8.3} deg", deg(snapshot.inst_phi));
    println!(
        "Power:    P = {:.4}  Q = {:.4}  |S| = {:.4}",
        snapshot.active_power, snapshot.reactive_power, snapshot.apparent_power
    );
    println!(
        "Now:      S0 = {:.4}{:+.4}j  S1 = {:.4}{:+.4}j  S = {:.4}{:+.4}j",
        snapshot.s0.re, snapshot.s0.im, snapshot.s1.re, snapshot.s1.im, snapshot.s.re, snapshot.s.im
    );
    println!("Dials:");
    for field in FieldId::ALL {
        println!("  {:<20} {:>10.3}", field.name(), contract.encode(field, snapshot));
    }
}
