//! Reference Bridge Simulation CLI Library
//!
//! Provides the argument parser and the churn simulation behind the
//! `bridge-sim` binary.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod error;
pub mod simulation;

pub use cli::Cli;
pub use error::{CliError, CliResult};
pub use simulation::{Simulation, SimulationOptions, SimulationReport};
