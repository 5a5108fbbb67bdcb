//! Reference Bridge Simulation CLI
//!
//! Entry point for `bridge-sim`. Parses CLI arguments, fixes the process
//! reference mode and runs the simulation.

use clap::Parser as ClapParser;
use bridge_cli::{Cli, CliError, Simulation};
use reference_bridge::{process_mode, select_process_mode};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let mode = match cli.mode {
        Some(mode) => select_process_mode(mode)?,
        None => process_mode()?,
    };

    match Simulation::new(cli.options(mode)).and_then(Simulation::run) {
        Ok(report) if cli.json => println!("{}", serde_json::to_string_pretty(&report)?),
        Ok(report) => print!("{}", report),
        Err(CliError::InvalidOption(msg)) => {
            eprintln!("Error: {}", msg);
            eprintln!("Run 'bridge-sim --help' for usage.");
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
