//! Catalog of native build tools.

use std::fmt;
use std::str::FromStr;

use crate::builder::error::BuildError;
use crate::builder::progress::PolicyKind;
use crate::util::process::ProcessBuilder;

/// Parallel jobs used by make-style tools unless configured otherwise.
pub const DEFAULT_JOBS: usize = 2;

/// A native build tool that CMake can generate for and drivers can invoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSystemSpec {
    name: &'static str,
    program: &'static str,
    jobs: Option<usize>,
    generator: &'static str,
}

impl BuildSystemSpec {
    pub fn ninja() -> Self {
        BuildSystemSpec {
            name: "ninja",
            program: "ninja",
            jobs: None,
            generator: "Ninja",
        }
    }

    pub fn make() -> Self {
        BuildSystemSpec {
            name: "make",
            program: "make",
            jobs: Some(DEFAULT_JOBS),
            generator: "Unix Makefiles",
        }
    }

    pub fn gmake() -> Self {
        BuildSystemSpec {
            name: "gmake",
            program: "gmake",
            jobs: Some(DEFAULT_JOBS),
            generator: "Unix Makefiles",
        }
    }

    /// Override the parallel job count. Tools without a job flag ignore it.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        if self.jobs.is_some() {
            self.jobs = Some(jobs.max(1));
        }
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Generator name passed to `cmake -G`.
    pub fn generator(&self) -> &'static str {
        self.generator
    }

    /// Base command line: binary plus parallelism flags.
    pub fn invocation(&self) -> Vec<String> {
        let mut argv = vec![self.program.to_string()];
        if let Some(jobs) = self.jobs {
            argv.push(format!("-j{}", jobs));
        }
        argv
    }

    /// Freshly built command for the default target.
    pub fn build_command(&self) -> ProcessBuilder {
        let argv = self.invocation();
        ProcessBuilder::new(&argv[0]).args(&argv[1..])
    }

    /// Freshly built command for the `install` target.
    pub fn install_command(&self) -> ProcessBuilder {
        self.build_command().arg("install")
    }

    /// How this tool's output is turned into progress.
    pub fn progress_policy(&self) -> PolicyKind {
        if self.name == "ninja" {
            PolicyKind::Ninja
        } else {
            PolicyKind::Make
        }
    }
}

impl fmt::Display for BuildSystemSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl FromStr for BuildSystemSpec {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        resolve_build_system(s).ok_or_else(|| BuildError::UnknownBuildSystem(s.to_string()))
    }
}

/// All supported build systems.
pub fn supported_build_systems() -> [BuildSystemSpec; 3] {
    [
        BuildSystemSpec::ninja(),
        BuildSystemSpec::make(),
        BuildSystemSpec::gmake(),
    ]
}

/// Look up a build system by name.
pub fn resolve_build_system(name: &str) -> Option<BuildSystemSpec> {
    supported_build_systems().into_iter().find(|b| b.name == name)
}
