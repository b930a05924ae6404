#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that walks an explorer through the Crystals demo rooms.

mod demo;
mod presentation;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use crystals_core::{Direction, TileTransform};
use crystals_system_traversal::{StepOutcome, Traversal};
use crystals_world::query;
use tracing::info;
use tracing_subscriber::EnvFilter;

use presentation::PresentationConfig;

/// Walk an explorer through two rooms joined by a doorway.
#[derive(Debug, Parser)]
#[command(name = "crystals", version)]
struct Cli {
    /// Comma separated steps: north, south, east, west or n, s, e, w.
    #[arg(
        long,
        value_delimiter = ',',
        value_parser = parse_direction,
        default_values = ["e", "e", "e", "e", "e", "w"]
    )]
    steps: Vec<Direction>,
    /// TOML file with a `[transform]` table.
    #[arg(long)]
    presentation: Option<PathBuf>,
    /// Room that is focused when the walk begins.
    #[arg(long, default_value = demo::RED_ROOM)]
    start_room: String,
    /// Log filter, overriding `RUST_LOG`.
    #[arg(long)]
    log_level: Option<String>,
}

/// Entry point for the Crystals command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let transform = match &cli.presentation {
        Some(path) => PresentationConfig::load(path)?.transform,
        None => TileTransform::default(),
    };
    let mut world = demo::build(transform, &cli.start_room).context("failed to build demo world")?;
    info!(room = %query::focus_name(&world), steps = cli.steps.len(), "walk_started");

    let mut traversal = Traversal::default();
    for (index, direction) in cli.steps.iter().enumerate() {
        let outcome = traversal
            .step_toward(&mut world, demo::EXPLORER, *direction)
            .with_context(|| format!("step {} failed", index + 1))?;
        println!("{:>3} {:<5} {}", index + 1, label(*direction), describe(&outcome));
    }

    let tally = traversal.tally();
    println!(
        "moved {}, blocked {}, portaled {}",
        tally.moved, tally.blocked, tally.portaled
    );
    println!("in {}:", query::focus_name(&world));
    print!("{}", demo::render(query::focused_room(&world)));
    Ok(())
}

fn init_tracing(level: Option<&str>) {
    let filter = level
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn parse_direction(value: &str) -> Result<Direction, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "n" | "north" => Ok(Direction::North),
        "e" | "east" => Ok(Direction::East),
        "s" | "south" => Ok(Direction::South),
        "w" | "west" => Ok(Direction::West),
        other => Err(format!(
            "unknown direction '{other}' (expected north, south, east or west)"
        )),
    }
}

fn label(direction: Direction) -> &'static str {
    match direction {
        Direction::North => "north",
        Direction::East => "east",
        Direction::South => "south",
        Direction::West => "west",
    }
}

fn describe(outcome: &StepOutcome) -> String {
    match outcome {
        StepOutcome::Blocked => "blocked".to_owned(),
        StepOutcome::Moved { to } => format!("moved to {to}"),
        StepOutcome::Portaled { room, arrival } => format!("portaled into {room} at {arrival}"),
    }
}
