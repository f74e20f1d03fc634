use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use autosweep_core::{Fallback, FieldConfig, Session, SessionConfig, SessionStats, Tick};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use serde::Serialize;
use web_time::{Instant, SystemTime, UNIX_EPOCH};

mod render;

/// Minesweeper played by an agent that only makes moves it can prove safe.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Grid rows
    #[arg(long, default_value_t = 40)]
    rows: u16,

    /// Grid columns
    #[arg(long, default_value_t = 80)]
    cols: u16,

    /// Mines percentage
    #[arg(long, default_value_t = 15.0)]
    mines: f32,

    /// Seed for layouts and agent tie-breaking, taken from the clock when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Ticks an ended episode stays on screen before the next one starts
    #[arg(long, default_value_t = SessionConfig::DEFAULT_COOLDOWN_TICKS)]
    cooldown: u32,

    /// Open a random hidden cell instead of stalling when no move is certain
    #[arg(long)]
    guess: bool,

    /// Stop after this many finished episodes
    #[arg(long, default_value_t = 10)]
    episodes: u64,

    /// Max actions per second, 0 for unlimited
    #[arg(long, default_value_t = 0.0)]
    aps: f64,

    /// Draw the grid to the terminal
    #[arg(long)]
    render: bool,

    /// Print the final statistics as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,
}

#[derive(Debug, Serialize)]
struct Summary {
    seed: u64,
    elapsed_secs: f64,
    ticks_per_second: f64,
    frames_drawn: u64,
    #[serde(flatten)]
    stats: SessionStats,
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default()
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.verbosity.log_level_filter())
        .init();

    let seed = args.seed.unwrap_or_else(clock_seed);
    let field = FieldConfig::new((args.rows, args.cols), args.mines / 100.0)
        .context("invalid field configuration")?;
    let config = SessionConfig {
        field,
        seed,
        cooldown_ticks: args.cooldown,
        fallback: if args.guess {
            Fallback::Guess
        } else {
            Fallback::Stall
        },
    };
    log::info!("Running {:?} grid with {} mines, seed {}", field.size, field.mine_count(), seed);

    let mut session = Session::new(config)?;
    let renderer = if args.render {
        Some(render::Renderer::spawn().context("failed to start renderer")?)
    } else {
        None
    };
    let tick_budget = (args.aps > 0.0).then(|| Duration::from_secs_f64(1.0 / args.aps));

    let start = Instant::now();
    while session.stats().finished() < args.episodes {
        let tick_start = Instant::now();
        let tick = session.tick().context("session tick failed")?;

        if let Some(renderer) = &renderer {
            if matches!(tick, Tick::Reset { .. } | Tick::Moved { .. }) {
                renderer.publish(session.grid().clone());
            }
        }

        if let Some(budget) = tick_budget {
            thread::sleep(budget.saturating_sub(tick_start.elapsed()));
        }
    }
    let elapsed = start.elapsed().as_secs_f64();

    let frames_drawn = renderer.map(render::Renderer::finish).unwrap_or_default();
    let stats = session.stats().clone();
    let summary = Summary {
        seed,
        elapsed_secs: elapsed,
        ticks_per_second: stats.ticks as f64 / elapsed.max(f64::EPSILON),
        frames_drawn,
        stats,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        let stats = &summary.stats;
        println!(
            "Ran {} ticks in {:.3} seconds: {:.0} ticks/second",
            stats.ticks, summary.elapsed_secs, summary.ticks_per_second
        );
        println!("Rendered {} frames", summary.frames_drawn);
        println!(
            "Episodes: {} cleared, {} stalled, {} detonated",
            stats.cleared, stats.stalled, stats.detonated
        );
        println!(
            "Moves: {} opens, {} marks, {} guesses, {} cells revealed",
            stats.opens, stats.marks, stats.guesses, stats.cells_revealed
        );
    }

    Ok(())
}
