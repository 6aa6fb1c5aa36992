//! NES CLI - Command line runner for the NES emulation core

use clap::Parser;
use log::{error, info};
use nes_core::context::version;
use nes_core::harness::{self, Outcome, Tally};
use nes_core::system::{NesSystem, RunMode};
use std::path::{Path, PathBuf};

/// Exit status for any uncaught error
const EXIT_FAILURE: i32 = -1;

/// NES emulation core runner
#[derive(Parser, Debug)]
#[command(name = "nes-cli")]
#[command(about = "Runs iNES programs on the NES emulation core", long_about = None)]
struct Args {
    /// Path to the iNES ROM file
    #[arg(short, long)]
    rom: Option<PathBuf>,

    /// Run the built-in self-test checks
    #[arg(short, long)]
    test: bool,

    /// Maximum number of instructions to run
    #[arg(short, long, default_value = "10000")]
    steps: u64,

    /// Log a disassembly trace line per instruction
    #[arg(short, long)]
    debug: bool,

    /// Dump machine state after running
    #[arg(long)]
    dump: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose || args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    println!("nes-core {}", version());

    if args.test && !run_tests() {
        std::process::exit(EXIT_FAILURE);
    }

    if let Some(rom) = &args.rom {
        if let Err(e) = run_rom(rom, &args) {
            error!("{}", e);
            std::process::exit(EXIT_FAILURE);
        }
    }
}

/// Print every check and the tally; false if anything failed
fn run_tests() -> bool {
    let results = harness::run_all();
    for result in &results {
        let label = match result.outcome {
            Outcome::Pass => "PASS",
            Outcome::Fail => "FAIL",
            Outcome::Inconclusive => "????",
        };
        match &result.detail {
            Some(detail) => println!("[{}] {} ({})", label, result.name, detail),
            None => println!("[{}] {}", label, result.name),
        }
    }

    let tally = Tally::from_results(&results);
    println!("\n{}", tally);
    tally.ok()
}

fn run_rom(path: &Path, args: &Args) -> nes_core::Result<()> {
    let mut system = NesSystem::new();
    system.initialize()?;
    system.load_rom_file(path)?;

    let mode = if args.debug { RunMode::Debug } else { RunMode::Normal };
    let summary = system.run(mode, args.steps)?;
    println!(
        "Ran {} instructions ({} cycles){}",
        summary.steps,
        summary.cycles,
        if summary.halted { ", halted" } else { "" }
    );

    if args.dump {
        println!("\n{}", system);
    }

    system.uninitialize()?;
    info!("done");
    Ok(())
}
