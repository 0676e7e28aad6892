//! Progress tracking for native build tools.
//!
//! Each native tool reports progress differently: CMake prints one line per
//! configure step, Make prefixes lines with `[ NN%]`, and Ninja prefixes them
//! with `[cur/total]`. A [`ProgressPolicy`] turns those lines into a
//! percentage; [`Progress`] pairs a policy with a terminal progress bar.

use std::io::{self, IsTerminal};
use std::sync::LazyLock;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;

static MAKE_PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\s*(\d+)%\]").expect("valid make progress regex"));

static NINJA_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[(\d+)/(\d+)\]").expect("valid ninja progress regex"));

/// How tool output is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// Only start/finish status.
    Common,
    /// One step per output line.
    CMake,
    /// `[ NN%]` prefixes.
    Make,
    /// `[cur/total]` prefixes.
    Ninja,
}

/// Stateful parser of tool output into a progress percentage.
#[derive(Debug, Clone)]
pub struct ProgressPolicy {
    kind: PolicyKind,
    progress: f64,
}

impl ProgressPolicy {
    pub fn new(kind: PolicyKind) -> Self {
        ProgressPolicy {
            kind,
            progress: 0.0,
        }
    }

    pub fn kind(&self) -> PolicyKind {
        self.kind
    }

    /// Current progress value.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Set progress explicitly (used for started/finished status).
    pub fn update(&mut self, progress: f64) {
        self.progress = progress;
    }

    /// Feed one output line. Returns the new progress if the line moved it.
    pub fn process_line(&mut self, line: &str) -> Option<f64> {
        let line = line.trim();
        match self.kind {
            PolicyKind::Common => None,
            PolicyKind::CMake => {
                self.progress += 1.0;
                Some(self.progress)
            }
            PolicyKind::Make => {
                let percent = parse_make_percent(line)?;
                self.progress = percent;
                Some(percent)
            }
            PolicyKind::Ninja => {
                let (cur, total) = parse_ninja_range(line)?;
                if total == 0.0 {
                    return None;
                }
                self.progress = cur / total * 100.0;
                Some(self.progress)
            }
        }
    }
}

/// Parse a make-style `[ 42%]` prefix.
pub fn parse_make_percent(line: &str) -> Option<f64> {
    let caps = MAKE_PERCENT.captures(line)?;
    caps[1].parse().ok()
}

/// Parse a ninja-style `[3/10]` prefix.
pub fn parse_ninja_range(line: &str) -> Option<(f64, f64)> {
    let caps = NINJA_RANGE.captures(line)?;
    let cur = caps[1].parse().ok()?;
    let total = caps[2].parse().ok()?;
    Some((cur, total))
}

/// A progress policy bound to a terminal progress bar.
///
/// The bar is hidden when stderr is not a terminal; every line is still
/// logged at debug level.
pub struct Progress {
    policy: ProgressPolicy,
    bar: ProgressBar,
}

impl Progress {
    pub fn new(kind: PolicyKind) -> Self {
        let bar = if io::stderr().is_terminal() {
            let bar = ProgressBar::new(100);
            bar.set_style(
                ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            );
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        } else {
            ProgressBar::hidden()
        };

        Progress {
            policy: ProgressPolicy::new(kind),
            bar,
        }
    }

    /// A progress tracker that never draws.
    pub fn hidden(kind: PolicyKind) -> Self {
        Progress {
            policy: ProgressPolicy::new(kind),
            bar: ProgressBar::hidden(),
        }
    }

    pub fn policy(&self) -> &ProgressPolicy {
        &self.policy
    }

    pub fn started(&mut self, command: &str) {
        self.policy.update(0.0);
        self.bar.set_position(0);
        self.bar.set_message(format!("{} started", command));
        tracing::debug!("Command {} started", command);
    }

    pub fn line(&mut self, line: &str) {
        tracing::debug!("{}", line);
        if let Some(progress) = self.policy.process_line(line) {
            self.bar.set_position(progress.clamp(0.0, 100.0) as u64);
        }
    }

    pub fn finished(&mut self, command: &str, success: bool) {
        self.policy.update(100.0);
        if success {
            tracing::debug!("Command {} finished successfully", command);
        } else {
            tracing::debug!("Command {} finished with failure", command);
        }
        self.bar.finish_and_clear();
    }
}
