//! Composition helpers: tracing, settings layering and the launch profile.

use std::path::PathBuf;

use kirlian_core::{LaunchProfile, SettingsError, ShellSettings, validate_settings};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::commands::LaunchArgs;
use crate::error::CliError;

/// Install the stdout and daily-rolling file subscribers.
///
/// `RUST_LOG` wins over the default level (`info`, or `debug` with
/// `verbose`). The returned guard flushes the file writer when dropped, so
/// keep it alive for the whole run.
pub fn init_tracing(verbose: bool) -> Option<WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .compact();

    let log_dir = match kirlian_core::logs_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Logging to the terminal only: {e}");
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .try_init()
                .ok();
            return None;
        }
    };

    let file_appender = tracing_appender::rolling::daily(&log_dir, "kirlian");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .compact(),
        )
        .try_init()
        .ok();

    Some(guard)
}

/// Stack defaults, then `env`, then `flags`, and validate the result.
pub fn layer_settings(
    env: &ShellSettings,
    flags: &ShellSettings,
) -> Result<ShellSettings, SettingsError> {
    let mut settings = ShellSettings::with_defaults();
    settings.merge(env);
    settings.merge(flags);
    validate_settings(&settings)?;
    Ok(settings)
}

/// Effective settings for this process: `.env`, the environment, `flags`.
pub fn load_settings(flags: &ShellSettings) -> Result<ShellSettings, CliError> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }
    let env = ShellSettings::from_env(|key| std::env::var(key).ok())?;
    Ok(layer_settings(&env, flags)?)
}

/// The backend to run: the custom `--command` if given, Streamlit otherwise.
pub fn launch_profile(args: &LaunchArgs, settings: &ShellSettings) -> LaunchProfile {
    let profile = match &args.command {
        Some(program) => LaunchProfile::custom(program.clone(), args.command_args.iter().cloned()),
        None => LaunchProfile::streamlit(settings.effective_python(), settings.effective_app()),
    };
    match &settings.working_dir {
        Some(dir) => profile.with_working_dir(dir.clone()),
        None => profile,
    }
}

/// Name shown in page titles and terminal messages.
pub fn app_name(profile: &LaunchProfile) -> String {
    let source = profile
        .entry_point
        .clone()
        .unwrap_or_else(|| PathBuf::from(&profile.program));
    source.file_stem().map_or_else(
        || profile.program.clone(),
        |stem| stem.to_string_lossy().into_owned(),
    )
}
