//! Subcommands and their arguments.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use kirlian_core::{ReadinessStrategy, ShellSettings};

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the backend and show it (the default)
    Launch(LaunchArgs),

    /// Check the interpreter, working directory and entry script, then exit
    Check(LaunchArgs),

    /// Print the port the next launch would use
    Port {
        /// First port to try
        #[arg(long)]
        from: Option<u16>,

        /// How many consecutive ports to try
        #[arg(long)]
        scan_limit: Option<u16>,
    },
}

/// Options shared by `launch` and `check`.
///
/// Every option is optional: unset ones fall back to `KIRLIAN_*`
/// environment values, then to built-in defaults.
#[derive(Debug, Clone, Default, Args)]
pub struct LaunchArgs {
    /// Streamlit entry script (default: main.py)
    #[arg(long, value_name = "SCRIPT")]
    pub app: Option<PathBuf>,

    /// Python interpreter running Streamlit
    #[arg(long, value_name = "EXE")]
    pub python: Option<String>,

    /// Run an arbitrary backend instead of Streamlit; arguments follow `--`
    #[arg(long, value_name = "PROGRAM", conflicts_with_all = ["app", "python"])]
    pub command: Option<String>,

    /// Arguments for `--command`; `{port}` and `{address}` are substituted
    #[arg(last = true, requires = "command")]
    pub command_args: Vec<String>,

    /// Working directory for the backend
    #[arg(long, value_name = "DIR")]
    pub workdir: Option<PathBuf>,

    /// Preferred port; 0 lets the backend pick and announce its own
    #[arg(long)]
    pub port: Option<u16>,

    /// How many consecutive ports to try
    #[arg(long)]
    pub scan_limit: Option<u16>,

    /// Seconds to wait for the backend to become ready
    #[arg(long, value_name = "SECS")]
    pub startup_timeout: Option<u64>,

    /// Seconds between the stop request and the forced kill
    #[arg(long, value_name = "SECS")]
    pub grace: Option<u64>,

    /// Readiness detection: output, tcp or http
    #[arg(long)]
    pub readiness: Option<ReadinessStrategy>,

    /// Report in the terminal instead of opening a browser
    #[arg(long)]
    pub no_browser: bool,
}

impl LaunchArgs {
    /// The settings layer these flags describe.
    pub fn to_settings(&self) -> ShellSettings {
        ShellSettings {
            preferred_port: self.port,
            scan_limit: self.scan_limit,
            startup_timeout_ms: self.startup_timeout.map(|s| s.saturating_mul(1000)),
            grace_ms: self.grace.map(|s| s.saturating_mul(1000)),
            readiness: self.readiness,
            python: self.python.clone(),
            app: self.app.clone(),
            working_dir: self.workdir.clone(),
            open_browser: self.no_browser.then_some(false),
        }
    }
}
