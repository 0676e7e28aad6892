//! Test doubles for the build drivers and recipes.
//!
//! [`RecordingRunner`] stands in for native tool execution and records every
//! invocation; [`FixtureFetcher`] stands in for network retrieval and
//! materializes small fake source trees on disk.
//!
//! # Example
//!
//! ```rust,ignore
//! use depforge::test_support::{RecordingRunner, FixtureFetcher};
//!
//! #[test]
//! fn test_example() {
//!     let runner = RecordingRunner::new().fail_program("cmake", 1);
//!     let fetcher = FixtureFetcher::new()
//!         .with_repository("https://example.com/zlib.git", "zlib", &[("CMakeLists.txt", "")]);
//!     // Drive a BuildRequest with them...
//! }
//! ```

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{bail, Context, Result};

use crate::builder::progress::Progress;
use crate::sources::SourceFetcher;
use crate::util::process::{CommandOutcome, CommandRunner, ProcessBuilder};

#[derive(Debug, Default)]
struct RunnerState {
    calls: Vec<ProcessBuilder>,
    /// Exit codes keyed by program (full path or file name)
    exit_codes: HashMap<String, i32>,
    /// Exit codes keyed by a substring of the command line
    failing_lines: Vec<(String, i32)>,
    /// Programs that fail to spawn
    missing: Vec<String>,
    /// Results of `find_program`
    programs: HashMap<String, PathBuf>,
}

/// Command runner that records invocations instead of spawning processes.
///
/// Clones share state, so a test can keep one handle and give another to
/// the code under test.
#[derive(Debug, Clone, Default)]
pub struct RecordingRunner {
    state: Arc<Mutex<RunnerState>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        RecordingRunner::default()
    }

    fn state(&self) -> MutexGuard<'_, RunnerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every invocation of `program` exit with `code`.
    pub fn fail_program(self, program: impl Into<String>, code: i32) -> Self {
        self.state().exit_codes.insert(program.into(), code);
        self
    }

    /// Make invocations whose command line contains `needle` exit with `code`.
    pub fn fail_matching(self, needle: impl Into<String>, code: i32) -> Self {
        self.state().failing_lines.push((needle.into(), code));
        self
    }

    /// Make `program` fail to spawn.
    pub fn missing_program(self, program: impl Into<String>) -> Self {
        self.state().missing.push(program.into());
        self
    }

    /// Report `program` as installed at `path`.
    pub fn with_program(self, program: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.state().programs.insert(program.into(), path.into());
        self
    }

    /// All recorded invocations, in order.
    pub fn calls(&self) -> Vec<ProcessBuilder> {
        self.state().calls.clone()
    }

    /// Recorded invocations rendered as command lines.
    pub fn command_lines(&self) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .map(ProcessBuilder::display_command)
            .collect()
    }

    fn program_keys(cmd: &ProcessBuilder) -> Vec<String> {
        let program = cmd.get_program();
        let mut keys = vec![program.display().to_string()];
        if let Some(name) = program.file_name() {
            keys.push(name.to_string_lossy().into_owned());
        }
        keys
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, cmd: &ProcessBuilder, _progress: &mut Progress) -> io::Result<CommandOutcome> {
        let keys = Self::program_keys(cmd);
        let line = cmd.display_command();
        let mut state = self.state();

        if keys.iter().any(|k| state.missing.contains(k)) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "program not found"));
        }

        state.calls.push(cmd.clone());

        let code = keys
            .iter()
            .find_map(|k| state.exit_codes.get(k).copied())
            .or_else(|| {
                state
                    .failing_lines
                    .iter()
                    .find(|(needle, _)| line.contains(needle.as_str()))
                    .map(|(_, code)| *code)
            })
            .unwrap_or(0);

        Ok(CommandOutcome { code: Some(code) })
    }

    fn find_program(&self, name: &str) -> Option<PathBuf> {
        self.state().programs.get(name).cloned()
    }
}

#[derive(Debug, Clone)]
struct Fixture {
    dir_name: String,
    files: Vec<(String, String)>,
}

impl Fixture {
    fn materialize(&self, root: &Path) -> Result<PathBuf> {
        let dir = root.join(&self.dir_name);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        for (name, contents) in &self.files {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, contents)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        Ok(dir)
    }
}

/// Source fetcher backed by in-memory fixtures.
#[derive(Debug, Clone, Default)]
pub struct FixtureFetcher {
    repositories: HashMap<String, Fixture>,
    archives: HashMap<String, Fixture>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        FixtureFetcher::default()
    }

    /// Serve `url` as a repository checked out into `dir_name`.
    pub fn with_repository(mut self, url: &str, dir_name: &str, files: &[(&str, &str)]) -> Self {
        self.repositories.insert(url.to_string(), fixture(dir_name, files));
        self
    }

    /// Serve `url` as an archive whose top-level directory is `dir_name`.
    pub fn with_archive(mut self, url: &str, dir_name: &str, files: &[(&str, &str)]) -> Self {
        self.archives.insert(url.to_string(), fixture(dir_name, files));
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn record(&self, url: &str) {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());
    }
}

fn fixture(dir_name: &str, files: &[(&str, &str)]) -> Fixture {
    Fixture {
        dir_name: dir_name.to_string(),
        files: files
            .iter()
            .map(|(name, contents)| (name.to_string(), contents.to_string()))
            .collect(),
    }
}

impl SourceFetcher for FixtureFetcher {
    fn clone_repository(
        &self,
        url: &str,
        _branch: Option<&str>,
        _strip_vcs: bool,
        dest_root: &Path,
    ) -> Result<PathBuf> {
        self.record(url);
        match self.repositories.get(url) {
            Some(fixture) => fixture.materialize(dest_root),
            None => bail!("no fixture repository for {}", url),
        }
    }

    fn download_file(&self, url: &str, dest_root: &Path) -> Result<PathBuf> {
        self.record(url);
        if !self.archives.contains_key(url) {
            bail!("no fixture archive for {}", url);
        }
        let name = url.rsplit('/').next().unwrap_or("archive.tar.gz");
        let path = dest_root.join(name);
        std::fs::write(&path, url)?;
        Ok(path)
    }

    fn extract_archive(&self, archive: &Path) -> Result<PathBuf> {
        let url = std::fs::read_to_string(archive)
            .with_context(|| format!("failed to read {}", archive.display()))?;
        let fixture = self
            .archives
            .get(&url)
            .with_context(|| format!("no fixture archive for {}", url))?;
        let root = archive.parent().unwrap_or_else(|| Path::new("."));
        fixture.materialize(root)
    }
}
