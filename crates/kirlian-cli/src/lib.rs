//! Command-line adapter for the kirlian desktop shell.
//!
//! `main.rs` is the composition root; everything it wires together lives
//! here so the parsing and settings layering can be tested without a
//! terminal.

#![deny(unsafe_code)]

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod events;
pub mod handlers;
pub mod parser;

pub use bootstrap::{app_name, init_tracing, launch_profile, layer_settings, load_settings};
pub use commands::{Commands, LaunchArgs};
pub use error::CliError;
pub use parser::Cli;
