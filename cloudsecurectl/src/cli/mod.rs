//! Command-line surface of `cloudsecurectl`
//!
//! - [`commands`] - clap definitions for the global flags and subcommands
//! - [`handlers`] - dispatch from a parsed command line to the gateways

mod commands;
mod handlers;

pub use commands::*;
pub use handlers::*;
