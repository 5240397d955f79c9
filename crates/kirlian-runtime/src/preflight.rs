//! Checks run before spawning, so the common setup mistakes fail fast with
//! a precise reason instead of a timeout.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use kirlian_core::{FailureReason, LaunchProfile, SpawnFailureKind};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Upper bound on one `import` check; a slow interpreter is not a failure.
const IMPORT_CHECK_TIMEOUT: Duration = Duration::from_secs(20);

/// What preflight resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightReport {
    /// Absolute path of the backend executable.
    pub program: PathBuf,
    pub working_dir: Option<PathBuf>,
    pub entry_point: Option<PathBuf>,
}

/// Verify the working directory, the executable, the entry script and the
/// modules the interpreter has to import, in that order.
pub async fn preflight(profile: &LaunchProfile) -> Result<PreflightReport, FailureReason> {
    if let Some(dir) = &profile.working_dir {
        if !dir.is_dir() {
            return Err(FailureReason::EntryPointMissing { path: dir.clone() });
        }
    }

    let cwd = match &profile.working_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    let program = which::which_in(&profile.program, std::env::var_os("PATH"), &cwd).map_err(
        |e| FailureReason::SpawnFailed {
            program: profile.program.clone(),
            kind: SpawnFailureKind::NotFound,
            message: format!("not found on PATH ({e})"),
        },
    )?;
    debug!(program = %program.display(), "Resolved backend executable");

    let entry_point = profile.resolved_entry_point();
    if let Some(path) = &entry_point {
        if !path.is_file() {
            return Err(FailureReason::EntryPointMissing { path: path.clone() });
        }
    }

    for module in &profile.required_modules {
        check_import(&program, &profile.program, module, &cwd).await?;
    }

    Ok(PreflightReport {
        program,
        working_dir: profile.working_dir.clone(),
        entry_point,
    })
}

/// Run `<program> -c "import <module>"` and map a non-zero exit to
/// [`FailureReason::ModuleMissing`].
async fn check_import(
    program: &Path,
    name: &str,
    module: &str,
    cwd: &Path,
) -> Result<(), FailureReason> {
    if !is_module_path(module) {
        warn!(module, "Skipping import check for an invalid module name");
        return Ok(());
    }

    let mut cmd = Command::new(program);
    cmd.arg("-c")
        .arg(format!("import {module}"))
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    match timeout(IMPORT_CHECK_TIMEOUT, cmd.output()).await {
        Err(_) => {
            warn!(module, "Import check timed out, continuing with the launch");
            Ok(())
        }
        Ok(Err(e)) => Err(FailureReason::SpawnFailed {
            program: name.to_string(),
            kind: SpawnFailureKind::from_io(e.kind()),
            message: e.to_string(),
        }),
        Ok(Ok(output)) if output.status.success() => {
            debug!(module, "Module is importable");
            Ok(())
        }
        Ok(Ok(output)) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(module, code = ?output.status.code(), stderr = %stderr.trim(), "Import check failed");
            Err(FailureReason::ModuleMissing {
                program: name.to_string(),
                module: module.to_string(),
            })
        }
    }
}

/// Dotted Python module path such as `streamlit` or `google.protobuf`.
fn is_module_path(module: &str) -> bool {
    module
        .split('.')
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_alphanumeric() || c == '_'))
}


#[cfg(all(test, unix))]
mod unix_tests {
    use super::*;

    #[tokio::test]
    async fn missing_program_is_missing_runtime() {
        let profile = LaunchProfile::custom("definitely-not-a-real-binary-kirlian", ["x"]);
        let err = preflight(&profile).await.unwrap_err();
        assert!(matches!(
            err,
            FailureReason::SpawnFailed {
                kind: SpawnFailureKind::NotFound,
                ..
            }
        ));
        assert_eq!(err.category(), kirlian_core::FailureCategory::MissingRuntime);
    }

    #[tokio::test]
    async fn missing_entry_point_is_reported_before_imports() {
        let dir = tempfile::tempdir().unwrap();
        // `sh` cannot import anything, so reaching the import check would
        // report a missing module instead.
        let profile = LaunchProfile::streamlit("sh", "main.py").with_working_dir(dir.path());

        let err = preflight(&profile).await.unwrap_err();
        assert_eq!(
            err,
            FailureReason::EntryPointMissing {
                path: dir.path().join("main.py")
            }
        );
    }

    #[tokio::test]
    async fn passing_import_check_yields_a_report() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.py"), "print('hi')\n").unwrap();
        // `true -c "import streamlit"` exits 0 like an interpreter that has it.
        let profile = LaunchProfile::streamlit("true", "main.py").with_working_dir(dir.path());

        let report = preflight(&profile).await.unwrap();
        assert!(report.program.is_absolute());
        assert_eq!(report.entry_point, Some(dir.path().join("main.py")));
    }

    #[tokio::test]
    async fn failing_import_is_missing_dependency() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.py"), "").unwrap();
        let profile = LaunchProfile::streamlit("sh", "main.py").with_working_dir(dir.path());

        let err = preflight(&profile).await.unwrap_err();
        assert_eq!(
            err,
            FailureReason::ModuleMissing {
                program: "sh".to_string(),
                module: "streamlit".to_string(),
            }
        );
        assert_eq!(
            err.category(),
            kirlian_core::FailureCategory::MissingDependency
        );
    }

    #[tokio::test]
    async fn custom_profiles_skip_import_checks() {
        let profile = LaunchProfile::custom("sh", ["-c", "true"]);
        assert!(profile.required_modules.is_empty());
        assert!(preflight(&profile).await.is_ok());

        let checked = profile.with_required_modules(["json"]);
        assert!(matches!(
            preflight(&checked).await,
            Err(FailureReason::ModuleMissing { .. })
        ));
    }

    #[tokio::test]
    async fn missing_working_dir_is_reported() {
        let profile = LaunchProfile::custom("sh", ["-c", "true"])
            .with_working_dir("/nonexistent/kirlian/workdir");
        assert!(matches!(
            preflight(&profile).await,
            Err(FailureReason::EntryPointMissing { .. })
        ));
    }
}
