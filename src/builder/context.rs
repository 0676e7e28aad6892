//! Build context - install prefix, environment overlay and command runner.
//!
//! Drivers never touch process-wide state. Everything a native tool needs
//! (environment, working directory) is attached to each invocation from
//! the context.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::builder::error::BuildResult;
use crate::builder::progress::{PolicyKind, Progress};
use crate::util::process::{CommandRunner, ProcessBuilder};

/// Environment variable searched by `pkg-config`.
pub const PKG_CONFIG_PATH: &str = "PKG_CONFIG_PATH";

const PATH_LIST_SEPARATOR: &str = if cfg!(windows) { ";" } else { ":" };

/// Immutable state shared by every driver call of a build session.
#[derive(Clone)]
pub struct BuildContext {
    /// Absolute install prefix
    prefix: PathBuf,

    /// Root directory fetched sources live under
    working_root: PathBuf,

    /// Environment overlay applied to every native invocation
    env: BTreeMap<String, String>,

    runner: Arc<dyn CommandRunner>,
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("prefix", &self.prefix)
            .field("working_root", &self.working_root)
            .field("env", &self.env)
            .finish()
    }
}

impl BuildContext {
    /// Create a context with an empty environment overlay.
    pub fn new(prefix: PathBuf, working_root: PathBuf, runner: Arc<dyn CommandRunner>) -> Self {
        BuildContext {
            prefix,
            working_root,
            env: BTreeMap::new(),
            runner,
        }
    }

    /// Add an environment entry to the overlay.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Add several environment entries to the overlay.
    pub fn with_envs(mut self, vars: BTreeMap<String, String>) -> Self {
        self.env.extend(vars);
        self
    }

    /// Prepend `<prefix>/lib/pkgconfig` to the inherited `PKG_CONFIG_PATH`.
    pub fn with_pkg_config_path(self, inherited: Option<&str>) -> Self {
        let dir = self.pkg_config_dir();
        let value = match inherited {
            Some(existing) if !existing.is_empty() => {
                format!("{}{}{}", dir.display(), PATH_LIST_SEPARATOR, existing)
            }
            _ => dir.display().to_string(),
        };
        self.with_env(PKG_CONFIG_PATH, value)
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn working_root(&self) -> &Path {
        &self.working_root
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    pub fn pkg_config_dir(&self) -> PathBuf {
        self.prefix.join("lib").join("pkgconfig")
    }

    /// Attach the environment overlay and a working directory to `cmd`.
    pub fn prepare(&self, cmd: ProcessBuilder, cwd: &Path) -> ProcessBuilder {
        cmd.envs(&self.env).cwd(cwd)
    }

    /// Run `cmd` in `cwd` and require success.
    pub fn run(&self, cmd: ProcessBuilder, cwd: &Path, policy: PolicyKind) -> BuildResult<()> {
        let cmd = self.prepare(cmd, cwd);
        cmd.run_checked(self.runner(), &mut Progress::new(policy))
    }

    /// Refresh the dynamic linker cache where `ldconfig` exists.
    ///
    /// Best effort: a missing tool or a failing run only logs a warning.
    pub fn refresh_linker_cache(&self) {
        let Some(ldconfig) = self.runner.find_program("ldconfig") else {
            tracing::debug!("ldconfig not available, skipping linker cache refresh");
            return;
        };

        let cmd = self.prepare(ProcessBuilder::new(ldconfig), &self.working_root);
        if let Err(e) = cmd.run_checked(self.runner(), &mut Progress::hidden(PolicyKind::Common)) {
            tracing::warn!("linker cache refresh failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingRunner;

    fn context(runner: RecordingRunner) -> BuildContext {
        BuildContext::new(
            PathBuf::from("/opt/prefix"),
            PathBuf::from("/tmp/build"),
            Arc::new(runner),
        )
    }

    #[test]
    fn test_pkg_config_path_is_extended() {
        let ctx = context(RecordingRunner::new()).with_pkg_config_path(Some("/usr/lib/pkgconfig"));
        let expected = format!(
            "{}{}/usr/lib/pkgconfig",
            Path::new("/opt/prefix/lib/pkgconfig").display(),
            PATH_LIST_SEPARATOR
        );
        assert_eq!(ctx.env().get(PKG_CONFIG_PATH), Some(&expected));
    }

    #[test]
    fn test_pkg_config_path_without_inherited_value() {
        let ctx = context(RecordingRunner::new()).with_pkg_config_path(None);
        assert_eq!(
            ctx.env().get(PKG_CONFIG_PATH).map(PathBuf::from),
            Some(PathBuf::from("/opt/prefix/lib/pkgconfig"))
        );
    }

    #[test]
    fn test_prepare_attaches_env_and_cwd() {
        let ctx = context(RecordingRunner::new()).with_env("CC", "clang");
        let cmd = ctx.prepare(ProcessBuilder::new("make"), Path::new("/src/libev"));

        assert_eq!(cmd.get_cwd(), Some(Path::new("/src/libev")));
        assert_eq!(cmd.get_env().get("CC").map(String::as_str), Some("clang"));
    }

    #[test]
    fn test_linker_cache_refresh_is_best_effort() {
        let runner = RecordingRunner::new()
            .with_program("ldconfig", "/sbin/ldconfig")
            .fail_program("/sbin/ldconfig", 1);
        let ctx = context(runner.clone());

        ctx.refresh_linker_cache();

        assert_eq!(runner.command_lines(), vec!["/sbin/ldconfig"]);
    }

    #[test]
    fn test_linker_cache_refresh_skipped_without_tool() {
        let runner = RecordingRunner::new();
        context(runner.clone()).refresh_linker_cache();
        assert!(runner.command_lines().is_empty());
    }
}
