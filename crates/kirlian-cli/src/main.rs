//! Launcher entry point - the composition root.

use std::process::ExitCode;

use clap::Parser;
use kirlian_cli::{Cli, CliError, Commands, handlers, init_tracing, launch_profile, load_settings};
use kirlian_runtime::PortAllocator;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.verbose);

    match run(cli.command_or_default()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(code)
        }
    }
}

async fn run(command: Commands) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Launch(args) => {
            let settings = load_settings(&args.to_settings())?;
            let profile = launch_profile(&args, &settings);
            let summary = handlers::launch::execute(&settings, profile).await?;
            Ok(if summary.last_start_failed() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Commands::Check(args) => {
            let settings = load_settings(&args.to_settings())?;
            let profile = launch_profile(&args, &settings);
            let passed = handlers::check::execute(&profile, &mut std::io::stdout()).await?;
            Ok(if passed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Port { from, scan_limit } => {
            let flags = kirlian_core::ShellSettings {
                scan_limit,
                ..kirlian_core::ShellSettings::default()
            };
            let settings = load_settings(&flags)?;
            let allocator = PortAllocator::new(settings.effective_scan_limit());
            handlers::port::execute(&allocator, &settings, from, &mut std::io::stdout())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
