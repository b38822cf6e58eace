#![deny(warnings)]

//! Headless CLI: runs a seeded shift at 15 Hz and prints a summary.

use anyhow::{Context, Result};
use sim_content::{ContentTables, Location};
use sim_core::{validate_state, GameState};
use sim_runtime::{Engine, EngineConfig, Instruction, TickInput};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

const FRAME_MS: f64 = 1000.0 / 15.0;

#[derive(Debug, Default)]
struct Args {
    seed: Option<u64>,
    seconds: Option<u32>,
    location: Option<String>,
    content: Option<PathBuf>,
    config: Option<PathBuf>,
    import: Option<PathBuf>,
    export: Option<PathBuf>,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--seed" => args.seed = it.next().and_then(|s| s.parse().ok()),
            "--seconds" => args.seconds = it.next().and_then(|s| s.parse().ok()),
            "--location" => args.location = it.next(),
            "--content" => args.content = it.next().map(PathBuf::from),
            "--config" => args.config = it.next().map(PathBuf::from),
            "--import" => args.import = it.next().map(PathBuf::from),
            "--export" => args.export = it.next().map(PathBuf::from),
            _ => {}
        }
    }
    args
}

fn load_content(path: Option<&Path>) -> Result<ContentTables> {
    let tables = match path {
        Some(p) if p.is_dir() => ContentTables::load_dir(p)?,
        Some(p) => ContentTables::load(p)?,
        None => ContentTables::builtin()?,
    };
    Ok(tables)
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    info!(?args, build = env!("GIT_SHA"), "starting CLI");

    let location: Location = match &args.location {
        Some(name) => name.parse().map_err(anyhow::Error::msg)?,
        None => Location::default(),
    };
    let content = Arc::new(load_content(args.content.as_deref())?);
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let mut engine = Engine::seeded(content, config, args.seed.unwrap_or(42))?;

    let mut state = engine.new_game();
    if let Some(path) = &args.import {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let imported: GameState = serde_json::from_str(&text)?;
        state = engine
            .dispatch(&state, Instruction::Import(Box::new(imported)))?
            .state;
    }

    let frames = u64::from(args.seconds.unwrap_or(60)) * 15;
    let mut triggered = 0usize;
    let mut expired = 0usize;
    for frame in 0..frames {
        let input = TickInput {
            delta_ms: FRAME_MS,
            location,
            wall_clock_ms: Some((frame as f64 * FRAME_MS) as u64),
        };
        let update = engine.dispatch(&state, Instruction::Tick(input))?;
        if let sim_runtime::Outcome::Ticked(report) = &update.outcome {
            triggered += report.triggered.len();
            expired += usize::from(report.event_expired.is_some());
        }
        state = update.state;
    }
    validate_state(&state)?;

    let r = &state.resources;
    println!(
        "Shift OK | {:.0}s | level: {} | xp: {:.0} | credits: {:.0} | \
         sanity: {:.1} | suspicion: {:.1} | focus: {:.1}",
        state.clock_ms / 1000.0,
        r.level,
        r.experience,
        r.credits,
        r.sanity,
        r.suspicion,
        r.focus
    );
    println!(
        "Events | triggered: {} | expired: {} | active: {} | rotables: {} | unread mail: {}",
        triggered,
        expired,
        state
            .runtime
            .active_event
            .as_ref()
            .map_or("none", |e| e.id.as_str()),
        state.rotables.len(),
        state.unread_mail()
    );
    if let Some(entry) = state.log.latest() {
        println!("Last log | {}", entry.text);
    }

    if let Some(path) = &args.export {
        std::fs::write(path, serde_json::to_string_pretty(&*state)?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "snapshot exported");
    }

    Ok(())
}
