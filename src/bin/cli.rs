//! topograph CLI: run the sequencer headless and print what it fires.
//!
//! Usage:
//!   tg-cli --bars 2 --bpm 128
//!   tg-cli --settings topograph.toml --poly --recipe primes -v

use std::path::PathBuf;
use std::process;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use tg_core::{DensityMap, PPQN};
use tg_engine::{PatternRecipe, Trigger, TriggerSource};
use tg_master::{base_interval_ns, ring_dispatcher, Controller, OutputReceiver, Settings};
use tracing::{error, info, Level};

const PART_NAMES: [&str; 3] = ["kick", "snare", "hat"];

#[derive(Parser, Debug)]
#[command(name = "tg-cli", about = "Headless topographic step sequencer")]
struct Args {
    /// Settings file (TOML)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Raw density map resource (2400 bytes)
    #[arg(short, long)]
    map: Option<PathBuf>,

    /// Tempo override
    #[arg(short, long)]
    bpm: Option<f32>,

    /// Bars to play before exiting
    #[arg(long, default_value_t = 1)]
    bars: u32,

    /// Enable the polyrhythm channels
    #[arg(long)]
    poly: bool,

    /// Polyrhythm recipe: phase-drift, primes, fibonacci, interlock
    #[arg(long)]
    recipe: Option<String>,

    /// Random seed for perturbation and macros
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let args = Args::parse();
    let level = match args.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    if let Err(e) = run(args) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let map = match &args.map {
        Some(path) => {
            let data = std::fs::read(path)?;
            info!(path = %path.display(), "loaded density map");
            tg_formats::load_density_map(&data)?
        }
        None => DensityMap::builtin(),
    };

    let settings = match &args.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    let (tx, mut rx) = ring_dispatcher(4096);
    let mut ctl = Controller::new(map, tx, args.seed);
    ctl.apply_settings(&settings);
    // No MIDI input here, always run on the internal clock.
    ctl.set_external_sync(false);
    if let Some(bpm) = args.bpm {
        ctl.controls().set_bpm(bpm);
    }
    if let Some(name) = &args.recipe {
        let recipe = PatternRecipe::from_name(name).ok_or_else(|| format!("unknown recipe '{}'", name))?;
        ctl.apply_recipe(recipe);
    }
    ctl.controls().set_poly_active(args.poly || args.recipe.is_some());

    let pulses = args.bars as u64 * PPQN as u64 * 4;
    let bar_time = Duration::from_nanos(base_interval_ns(ctl.controls().bpm()) * PPQN as u64 * 4);
    let deadline = Instant::now() + bar_time * args.bars + Duration::from_millis(250);

    ctl.start()?;
    while ctl.transport().ticks() < pulses && Instant::now() < deadline {
        print_pending(&mut rx, ctl.transport().ticks());
        thread::sleep(Duration::from_millis(1));
    }
    ctl.stop();
    print_pending(&mut rx, ctl.transport().ticks());

    let dropped = rx.report_drops();
    info!(ticks = ctl.transport().ticks(), dropped_triggers = dropped.triggers, "done");
    Ok(())
}

fn print_pending(rx: &mut OutputReceiver, tick: u64) {
    while let Some(trigger) = rx.pop_trigger() {
        println!("{:>6}  {}", tick, describe(&trigger));
    }
    while let Some(cc) = rx.pop_cc() {
        println!("{:>6}  cc ch{} #{} = {}", tick, cc.channel + 1, cc.controller, cc.value);
    }
}

fn describe(trigger: &Trigger) -> String {
    let accent = if trigger.accented { " !" } else { "" };
    match trigger.source {
        TriggerSource::Part(slot) => {
            let engine = if slot < 3 { 'A' } else { 'B' };
            format!("{} {}{}", engine, PART_NAMES[slot as usize % 3], accent)
        }
        TriggerSource::Poly(channel) => format!("poly {}{}", channel + 1, accent),
    }
}
