//! CLI module for simforge - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for candidate
//! generation, parameter sweeps, dataset questions, and report listing.

pub mod commands;

pub use commands::{Cli, Commands};
