//! Classification of backend output lines.
//!
//! Readiness detection from output is a textual heuristic: a line counts as
//! "server is up" when it carries both a known success phrase and a network
//! locator (`host:port`, optionally with a scheme). Stderr lines are fatal
//! unless they carry a benign marker as a whole word.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// `host:port` with optional scheme, e.g. `http://localhost:8501`.
static LOCATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:https?://)?(?:localhost|\[[0-9a-f:]+\]|[0-9]{1,3}(?:\.[0-9]{1,3}){3}|[a-z0-9][a-z0-9.-]*):([0-9]{1,5})\b")
        .unwrap_or_else(|e| panic!("locator pattern is invalid: {e}"))
});

/// Which stdio stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

/// What a single output line means to the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessSignal {
    /// Backend announced it is reachable.
    Ready {
        /// The locator token as printed, e.g. `http://localhost:8501`.
        locator: String,
        /// Port parsed from the locator, when it had one.
        port: Option<u16>,
    },
    /// Nothing of interest.
    Noise,
    /// Non-benign error output.
    Fatal(String),
}

/// Substring-based classifier for backend output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputClassifier {
    /// Phrases that, together with a locator, announce readiness.
    pub success_phrases: Vec<String>,
    /// Case-insensitive markers that make a stderr line harmless. A marker
    /// only counts as a whole word: `info` matches `INFO:` but not `get_info`.
    pub benign_markers: Vec<String>,
}

impl Default for OutputClassifier {
    fn default() -> Self {
        Self {
            success_phrases: [
                "Local URL",
                "You can now view",
                "Uvicorn running on",
                "Running on",
                "Listening on",
                "Serving on",
                "Server started",
            ]
            .map(String::from)
            .to_vec(),
            benign_markers: [
                "warning",
                "warnings",
                "futurewarning",
                "deprecationwarning",
                "pendingdeprecationwarning",
                "userwarning",
                "runtimewarning",
                "deprecated",
                "deprecation",
                "info",
                "debug",
                "notice",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

impl OutputClassifier {
    /// Classify a line from either stream.
    pub fn classify(&self, stream: StreamKind, line: &str) -> ReadinessSignal {
        match stream {
            StreamKind::Stdout => self.classify_stdout(line),
            StreamKind::Stderr => self.classify_stderr(line),
        }
    }

    /// Stdout lines are either a readiness announcement or noise.
    pub fn classify_stdout(&self, line: &str) -> ReadinessSignal {
        let Some(at) = self
            .success_phrases
            .iter()
            .filter_map(|p| line.find(p.as_str()))
            .min()
        else {
            return ReadinessSignal::Noise;
        };
        // Prefer a locator after the phrase so timestamps like `12:30:45` don't win.
        match find_locator(&line[at..]).or_else(|| find_locator(line)) {
            Some((locator, port)) => ReadinessSignal::Ready { locator, port },
            None => ReadinessSignal::Noise,
        }
    }

    /// Stderr lines are noise when blank or benign, fatal otherwise.
    pub fn classify_stderr(&self, line: &str) -> ReadinessSignal {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return ReadinessSignal::Noise;
        }
        let lowered = trimmed.to_lowercase();
        if self
            .benign_markers
            .iter()
            .any(|m| contains_word(&lowered, &m.to_lowercase()))
        {
            return ReadinessSignal::Noise;
        }
        ReadinessSignal::Fatal(trimmed.to_string())
    }
}

/// `needle` occurs in `haystack` with no word character on either side.
fn contains_word(haystack: &str, needle: &str) -> bool {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    !needle.is_empty()
        && haystack.match_indices(needle).any(|(at, _)| {
            let before = haystack[..at].chars().next_back();
            let after = haystack[at + needle.len()..].chars().next();
            !before.is_some_and(is_word) && !after.is_some_and(is_word)
        })
}

fn find_locator(line: &str) -> Option<(String, Option<u16>)> {
    let captures = LOCATOR.captures(line)?;
    let locator = captures.get(0)?.as_str().to_string();
    let port = captures.get(1).and_then(|m| m.as_str().parse::<u16>().ok());
    Some((locator, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streamlit_local_url_is_ready() {
        let classifier = OutputClassifier::default();
        let signal = classifier.classify_stdout("  Local URL: http://localhost:8502");
        assert_eq!(
            signal,
            ReadinessSignal::Ready {
                locator: "http://localhost:8502".to_string(),
                port: Some(8502),
            }
        );
    }

    #[test]
    fn test_success_phrase_without_locator_is_noise() {
        let classifier = OutputClassifier::default();
        let signal =
            classifier.classify_stdout("  You can now view your Streamlit app in your browser.");
        assert_eq!(signal, ReadinessSignal::Noise);
    }

    #[test]
    fn test_locator_without_phrase_is_noise() {
        let classifier = OutputClassifier::default();
        assert_eq!(
            classifier.classify_stdout("GET http://localhost:8501/health 200"),
            ReadinessSignal::Noise
        );
    }

    #[test]
    fn test_uvicorn_banner_with_ipv4() {
        let classifier = OutputClassifier::default();
        let signal = classifier
            .classify_stdout("INFO:     Uvicorn running on http://127.0.0.1:9000 (Press CTRL+C)");
        assert!(matches!(
            signal,
            ReadinessSignal::Ready {
                port: Some(9000),
                ..
            }
        ));
    }

    #[test]
    fn test_timestamp_before_phrase_is_ignored() {
        let classifier = OutputClassifier::default();
        let signal = classifier.classify_stdout("12:30:45 Listening on localhost:8000");
        assert_eq!(
            signal,
            ReadinessSignal::Ready {
                locator: "localhost:8000".to_string(),
                port: Some(8000),
            }
        );
    }

    #[test]
    fn test_out_of_range_port_is_dropped() {
        let classifier = OutputClassifier::default();
        let signal = classifier.classify_stdout("Listening on localhost:99999");
        assert!(matches!(signal, ReadinessSignal::Ready { port: None, .. }));
    }

    #[test]
    fn test_stderr_warning_is_benign() {
        let classifier = OutputClassifier::default();
        assert_eq!(
            classifier.classify_stderr("FutureWarning: pandas will change behaviour"),
            ReadinessSignal::Noise
        );
        assert_eq!(
            classifier.classify_stderr("DeprecationWarning: use st.cache_data"),
            ReadinessSignal::Noise
        );
        assert_eq!(classifier.classify_stderr("   "), ReadinessSignal::Noise);
    }

    #[test]
    fn test_stderr_log_levels_are_benign() {
        let classifier = OutputClassifier::default();
        for line in [
            "INFO:     Waiting for application startup.",
            "2024-05-01 10:00:00.123 DEBUG streamlit.runtime: loaded",
            "[notice] A new release of pip is available",
            "app.py:3: UserWarning: widget key reused",
        ] {
            assert_eq!(classifier.classify_stderr(line), ReadinessSignal::Noise, "{line}");
        }
    }

    #[test]
    fn test_marker_inside_identifier_is_fatal() {
        let classifier = OutputClassifier::default();
        for line in [
            "ModuleNotFoundError: No module named 'sysinfo'",
            "ImportError: cannot import name 'get_info' from 'utils'",
            "RuntimeError: pydebugger failed",
            "KeyError: 'noticeboard'",
        ] {
            assert_eq!(
                classifier.classify_stderr(line),
                ReadinessSignal::Fatal(line.to_string()),
                "{line}"
            );
        }
    }

    #[test]
    fn test_stderr_error_is_fatal_and_trimmed() {
        let classifier = OutputClassifier::default();
        assert_eq!(
            classifier.classify(StreamKind::Stderr, "Error: invalid config\r"),
            ReadinessSignal::Fatal("Error: invalid config".to_string())
        );
    }

    #[test]
    fn test_custom_markers() {
        let classifier = OutputClassifier {
            success_phrases: vec!["up at".to_string()],
            benign_markers: vec!["[trace]".to_string()],
        };
        assert!(matches!(
            classifier.classify_stdout("service up at 127.0.0.1:4000"),
            ReadinessSignal::Ready {
                port: Some(4000),
                ..
            }
        ));
        assert_eq!(
            classifier.classify_stderr("[TRACE] loaded"),
            ReadinessSignal::Noise
        );
    }
}
