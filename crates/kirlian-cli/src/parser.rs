//! Root parser and global options.

use clap::Parser;

use crate::commands::Commands;

/// Desktop launcher for a locally served dashboard.
///
/// Without a subcommand, `launch` runs with its defaults.
#[derive(Debug, Parser)]
#[command(name = "kirlian")]
#[command(about = "Run the dashboard backend and show it in a window")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Subcommand to run, with `launch` filled in when none was given.
    pub fn command_or_default(self) -> Commands {
        self.command
            .unwrap_or_else(|| Commands::Launch(crate::LaunchArgs::default()))
    }
}
