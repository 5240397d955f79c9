//! Backend launch profiles and the commands they render.
//!
//! A [`LaunchProfile`] is what the user configures: a program plus argument
//! and environment templates. Once a port is known it renders into a
//! concrete [`BackendCommand`], the only thing the supervisor ever spawns.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Address the backend is told to bind.
pub const SERVING_ADDRESS: &str = "localhost";

const PORT_PLACEHOLDER: &str = "{port}";
const ADDRESS_PLACEHOLDER: &str = "{address}";

/// A fully rendered command line for the backend process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendCommand {
    /// Executable name or path.
    pub program: String,
    /// Arguments, in order.
    pub args: Vec<String>,
    /// Working directory for the child (inherits ours when `None`).
    pub working_dir: Option<PathBuf>,
    /// Environment overrides layered on top of the inherited environment.
    pub env: Vec<(String, String)>,
}

impl BackendCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Look up an environment override by key (last one wins).
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for BackendCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Templated launch configuration for the backend.
///
/// Arguments and environment values may contain `{port}` and `{address}`,
/// substituted at render time. Every rendered command also receives the
/// serving overrides (`KIRLIAN_SERVER_ADDRESS`, `KIRLIAN_SERVER_PORT`,
/// `KIRLIAN_HEADLESS`, `KIRLIAN_TELEMETRY`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchProfile {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    /// Script the backend loads; checked by preflight when set.
    pub entry_point: Option<PathBuf>,
    /// Python modules `program` must be able to import; checked by preflight.
    #[serde(default)]
    pub required_modules: Vec<String>,
}

impl LaunchProfile {
    /// Arbitrary backend executable.
    pub fn custom<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            working_dir: None,
            env: Vec::new(),
            entry_point: None,
            required_modules: Vec::new(),
        }
    }

    /// `python -m streamlit run <script>` in headless mode on the given port.
    pub fn streamlit(python: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        let script = script.into();
        let args = vec![
            "-m".to_string(),
            "streamlit".to_string(),
            "run".to_string(),
            script.to_string_lossy().into_owned(),
            "--server.headless=true".to_string(),
            format!("--server.port={PORT_PLACEHOLDER}"),
            format!("--server.address={ADDRESS_PLACEHOLDER}"),
            "--browser.gatherUsageStats=false".to_string(),
            "--theme.base=dark".to_string(),
        ];
        let env = vec![
            ("STREAMLIT_SERVER_PORT".to_string(), PORT_PLACEHOLDER.to_string()),
            (
                "STREAMLIT_SERVER_ADDRESS".to_string(),
                ADDRESS_PLACEHOLDER.to_string(),
            ),
            ("STREAMLIT_SERVER_HEADLESS".to_string(), "true".to_string()),
            (
                "STREAMLIT_BROWSER_GATHER_USAGE_STATS".to_string(),
                "false".to_string(),
            ),
        ];
        Self {
            program: python.into(),
            args,
            working_dir: None,
            env,
            entry_point: Some(script),
            required_modules: vec!["streamlit".to_string()],
        }
    }

    /// Replace the modules preflight asks the interpreter to import.
    #[must_use]
    pub fn with_required_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_modules = modules.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Entry point resolved against the working directory.
    pub fn resolved_entry_point(&self) -> Option<PathBuf> {
        let entry = self.entry_point.as_deref()?;
        Some(resolve_against(self.working_dir.as_deref(), entry))
    }

    /// Render the concrete command for `port`.
    pub fn render(&self, port: u16) -> BackendCommand {
        let port_text = port.to_string();
        let substitute = |value: &str| {
            value
                .replace(PORT_PLACEHOLDER, &port_text)
                .replace(ADDRESS_PLACEHOLDER, SERVING_ADDRESS)
        };

        let mut env = vec![
            (
                "KIRLIAN_SERVER_ADDRESS".to_string(),
                SERVING_ADDRESS.to_string(),
            ),
            ("KIRLIAN_SERVER_PORT".to_string(), port_text.clone()),
            ("KIRLIAN_HEADLESS".to_string(), "true".to_string()),
            ("KIRLIAN_TELEMETRY".to_string(), "off".to_string()),
        ];
        env.extend(self.env.iter().map(|(k, v)| (k.clone(), substitute(v))));

        BackendCommand {
            program: self.program.clone(),
            args: self.args.iter().map(|a| substitute(a)).collect(),
            working_dir: self.working_dir.clone(),
            env,
        }
    }
}

fn resolve_against(base: Option<&Path>, path: &Path) -> PathBuf {
    match base {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_path_buf(),
    }
}
