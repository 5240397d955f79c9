//! Remediation hints for the error page.

use kirlian_core::{ErrorPage, ErrorView, FailureCategory, FailureReason};

/// Remediation steps for a failure category, most useful first.
pub fn hints_for(category: FailureCategory) -> Vec<String> {
    let hints: &[&str] = match category {
        FailureCategory::MissingRuntime => &[
            "Install Python 3.9 or newer from python.org and make sure it is on PATH.",
            "If Python is installed elsewhere, point KIRLIAN_PYTHON (or --python) at it.",
            "On Windows, re-run the Python installer and tick \"Add python.exe to PATH\".",
        ],
        FailureCategory::MissingDependency => &[
            "Install the application requirements: pip install -r requirements.txt",
            "Make sure the packages went into the interpreter kirlian uses (see --python).",
            "If you use a virtual environment, activate it before launching.",
        ],
        FailureCategory::MissingFiles => &[
            "Check that the application folder is complete and main.py is present.",
            "Run the launcher from the application folder, or pass --workdir.",
            "Re-extract or re-download the release if files were removed.",
        ],
        FailureCategory::PortExhaustion => &[
            "Close other dashboard windows or servers that may still be running.",
            "Pick a different starting port with --port or KIRLIAN_PORT.",
            "A previous backend may still be shutting down; wait a moment and retry.",
        ],
        FailureCategory::Timeout => &[
            "The first start can be slow while caches are built; retry once.",
            "Increase the startup window with --startup-timeout.",
            "Check the output below for a backend that is waiting on input or a lock.",
        ],
        FailureCategory::BackendError => &[
            "Read the backend output below for the underlying error.",
            "Reinstall the application requirements if a package looks broken.",
            "Report the problem with the output below if it keeps happening.",
        ],
    };
    hints.iter().map(|h| (*h).to_string()).collect()
}

/// Assemble the error page for a failed start.
///
/// The category is refined by the captured output, since an early exit
/// says little by itself while the lines before it usually do.
pub fn error_page(view: &ErrorView, diagnostics: Vec<String>) -> ErrorPage {
    let category = view.reason.category_with_output(&diagnostics);
    ErrorPage {
        title: category.title().to_string(),
        cause: cause_text(&view.reason, &view.message),
        category,
        hints: hints_for(category),
        diagnostics,
    }
}

fn cause_text(reason: &FailureReason, message: &str) -> String {
    match reason {
        FailureReason::SpawnFailed { program, .. } => {
            format!("{message}. Is `{program}` installed?")
        }
        FailureReason::ModuleMissing { module, .. } => {
            format!("{message}. Install it with: pip install {module}")
        }
        _ => message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(reason: FailureReason) -> ErrorView {
        ErrorView {
            message: reason.to_string(),
            category: reason.category(),
            reason,
        }
    }

    #[test]
    fn every_category_has_hints() {
        for category in [
            FailureCategory::MissingRuntime,
            FailureCategory::MissingDependency,
            FailureCategory::MissingFiles,
            FailureCategory::PortExhaustion,
            FailureCategory::Timeout,
            FailureCategory::BackendError,
        ] {
            assert!(!hints_for(category).is_empty(), "{category:?}");
        }
    }

    #[test]
    fn exit_with_import_error_is_missing_dependency() {
        let page = error_page(
            &view(FailureReason::PrematureExit { code: Some(1) }),
            vec![
                "Traceback (most recent call last):".to_string(),
                "ModuleNotFoundError: No module named 'plotly'".to_string(),
            ],
        );
        assert_eq!(page.category, FailureCategory::MissingDependency);
        assert_eq!(page.title, FailureCategory::MissingDependency.title());
        assert!(page.cause.contains("exit code 1"));
        assert_eq!(page.diagnostics.len(), 2);
    }

    #[test]
    fn timeout_keeps_timeout_category() {
        let page = error_page(
            &view(FailureReason::StartupTimeout { timeout_ms: 30_000 }),
            vec!["ModuleNotFoundError: noise".to_string()],
        );
        assert_eq!(page.category, FailureCategory::Timeout);
        assert!(page.hints[1].contains("--startup-timeout"));
    }

    #[test]
    fn missing_module_names_the_install_command() {
        let page = error_page(
            &view(FailureReason::ModuleMissing {
                program: "python3".to_string(),
                module: "streamlit".to_string(),
            }),
            Vec::new(),
        );
        assert_eq!(page.category, FailureCategory::MissingDependency);
        assert!(page.cause.ends_with("pip install streamlit"));
    }
}
