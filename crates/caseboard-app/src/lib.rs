//! Caseboard Application
//!
//! Command-line shell over the board store: editing, summaries and PNG
//! export.

mod cli;
mod config;

pub use cli::{Cli, Commands, ExportArgs, PinArgs, export, run, summary};
pub use config::{AppConfig, parse_color};
