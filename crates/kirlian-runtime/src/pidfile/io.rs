//! Atomic PID file I/O.
//!
//! Format: three-line text file
//! ```text
//! <pid>
//! <port>
//! <absolute path of the executable>
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use kirlian_core::{PathError, pids_dir};

/// Name of the pidfile for the single supervised backend.
pub const BACKEND_PIDFILE: &str = "backend";

const EXTENSION: &str = "pid";

/// PID file content parsed from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PidFileData {
    pub pid: u32,
    pub port: u16,
    pub program: PathBuf,
}

/// A directory of PID files.
#[derive(Debug, Clone)]
pub struct PidFiles {
    dir: PathBuf,
}

impl PidFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// PID files under the application data root.
    pub fn from_data_root() -> Result<Self, PathError> {
        pids_dir().map(Self::new)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{EXTENSION}"))
    }

    /// Write `<name>.pid` via `<name>.pid.tmp` and a rename.
    pub fn write(&self, name: &str, data: &PidFileData) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let final_path = self.path_for(name);
        let temp_path = self.dir.join(format!("{name}.{EXTENSION}.tmp"));

        let content = format!("{}\n{}\n{}\n", data.pid, data.port, data.program.display());
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &final_path)?;

        Ok(final_path)
    }

    pub fn read(&self, name: &str) -> io::Result<PidFileData> {
        let content = fs::read_to_string(self.path_for(name))?;
        parse_pidfile_content(&content)
    }

    /// Delete `<name>.pid`; a missing file is not an error.
    pub fn delete(&self, name: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// All parseable PID files as `(name, data)`. Malformed files and
    /// other extensions are skipped.
    pub fn list(&self) -> io::Result<Vec<(String, PidFileData)>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Ok(content) = fs::read_to_string(&path)
                && let Ok(data) = parse_pidfile_content(&content)
            {
                results.push((name.to_string(), data));
            }
        }
        results.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(results)
    }
}

fn parse_pidfile_content(content: &str) -> io::Result<PidFileData> {
    let invalid = |what: &str| io::Error::new(io::ErrorKind::InvalidData, format!("missing or invalid {what}"));
    let mut lines = content.lines();

    let pid = lines
        .next()
        .and_then(|s| s.trim().parse::<u32>().ok())
        .ok_or_else(|| invalid("PID"))?;
    let port = lines
        .next()
        .and_then(|s| s.trim().parse::<u16>().ok())
        .ok_or_else(|| invalid("port"))?;
    let program = lines
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| invalid("program"))?;

    Ok(PidFileData { pid, port, program })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PidFileData {
        PidFileData {
            pid: 98765,
            port: 8501,
            program: PathBuf::from("/usr/bin/python3"),
        }
    }

    #[test]
    fn write_read_delete() {
        let dir = tempfile::tempdir().unwrap();
        let files = PidFiles::new(dir.path().join("pids"));

        let path = files.write(BACKEND_PIDFILE, &sample()).unwrap();
        assert!(path.ends_with("backend.pid"));
        assert!(!dir.path().join("pids/backend.pid.tmp").exists());
        assert_eq!(files.read(BACKEND_PIDFILE).unwrap(), sample());

        files.delete(BACKEND_PIDFILE).unwrap();
        assert!(!path.exists());
        files.delete(BACKEND_PIDFILE).unwrap();
    }

    #[test]
    fn list_skips_foreign_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let files = PidFiles::new(dir.path());

        files.write("backend", &sample()).unwrap();
        fs::write(dir.path().join("notes.txt"), "garbage").unwrap();
        fs::write(dir.path().join("broken.pid"), "12\nnot-a-port\n").unwrap();

        let listed = files.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0, "backend");
    }

    #[test]
    fn list_of_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let files = PidFiles::new(dir.path().join("absent"));
        assert!(files.list().unwrap().is_empty());
    }
}
