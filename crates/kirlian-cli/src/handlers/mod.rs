//! Subcommand handlers.

pub mod check;
pub mod launch;
pub mod port;
