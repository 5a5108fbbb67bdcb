//! Command line arguments

use crate::simulation::SimulationOptions;
use clap::Parser;
use core_types::ReferenceMode;

/// Churns proxies and managed objects through both collectors.
#[derive(Debug, Parser)]
#[command(name = "bridge-sim", version, about)]
pub struct Cli {
    /// Reference mode: `direct` or `table` (default: BRIDGE_REFERENCE_MODE, else direct)
    #[arg(short, long)]
    pub mode: Option<ReferenceMode>,

    /// Number of proxies to create
    #[arg(short, long, default_value_t = 1000)]
    pub proxies: usize,

    /// Number of collection cycles to run
    #[arg(short, long, default_value_t = 3)]
    pub cycles: usize,

    /// Keep every Nth proxy rooted (0 keeps none)
    #[arg(short, long, default_value_t = 10)]
    pub retain_every: usize,

    /// Limit on live global handles in the managed heap
    #[arg(short, long)]
    pub global_capacity: Option<usize>,

    /// Run the managed collector before unrooted proxies are touched again
    #[arg(long)]
    pub managed_first: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Simulation options for the resolved reference mode.
    pub fn options(&self, mode: ReferenceMode) -> SimulationOptions {
        SimulationOptions {
            mode,
            proxies: self.proxies,
            cycles: self.cycles,
            retain_every: self.retain_every,
            global_capacity: self.global_capacity,
            managed_first: self.managed_first,
        }
    }
}
