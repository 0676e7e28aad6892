//! CMake driver for CMake-based library sources.

use std::path::{Path, PathBuf};

use crate::builder::build_system::BuildSystemSpec;
use crate::builder::context::BuildContext;
use crate::builder::error::{BuildError, BuildResult};
use crate::builder::progress::PolicyKind;
use crate::util::fs::recreate_dir;
use crate::util::process::ProcessBuilder;

/// Build type used when a recipe does not ask for another one.
pub const DEFAULT_BUILD_TYPE: &str = "RELEASE";

/// CMake generate/build/install cycle for one source tree.
pub struct CMakeBuilder<'a> {
    ctx: &'a BuildContext,
    source_dir: PathBuf,
    build_system: BuildSystemSpec,
    build_type: String,
    platform_flags: Vec<String>,
    cmake_args: Vec<String>,
}

impl<'a> CMakeBuilder<'a> {
    /// Create a builder with ninja and a release build type.
    pub fn new(ctx: &'a BuildContext, source_dir: impl Into<PathBuf>) -> Self {
        CMakeBuilder {
            ctx,
            source_dir: source_dir.into(),
            build_system: BuildSystemSpec::ninja(),
            build_type: DEFAULT_BUILD_TYPE.to_string(),
            platform_flags: Vec::new(),
            cmake_args: Vec::new(),
        }
    }

    pub fn build_system(mut self, build_system: BuildSystemSpec) -> Self {
        self.build_system = build_system;
        self
    }

    pub fn build_type(mut self, build_type: impl Into<String>) -> Self {
        self.build_type = build_type.into();
        self
    }

    /// Flags contributed by the resolved platform.
    pub fn platform_flags(mut self, flags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.platform_flags.extend(flags.into_iter().map(|s| s.into()));
        self
    }

    /// Add caller CMake arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.cmake_args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// `<source>/build_cmake_<build type>`.
    pub fn build_dir(&self) -> PathBuf {
        self.source_dir
            .join(format!("build_cmake_{}", self.build_type.to_lowercase()))
    }

    /// Configure arguments: required flags, then platform flags, then caller
    /// flags, then the install prefix. Nothing is deduplicated.
    pub fn configure_args(&self) -> Vec<String> {
        let mut args = vec![
            "-G".to_string(),
            self.build_system.generator().to_string(),
            format!("-DCMAKE_BUILD_TYPE={}", self.build_type),
        ];
        args.extend(self.platform_flags.iter().cloned());
        args.extend(self.cmake_args.iter().cloned());
        args.push(format!(
            "-DCMAKE_INSTALL_PREFIX={}",
            self.ctx.prefix().display()
        ));
        args
    }

    /// Configure, build and install. Returns the build directory.
    pub fn build(&self) -> BuildResult<PathBuf> {
        if !is_cmake_project(&self.source_dir) {
            return Err(BuildError::MissingCMakeProject(self.source_dir.clone()));
        }

        let build_dir = self.build_dir();
        let result = self
            .configure(&build_dir)
            .and_then(|_| self.compile(&build_dir));

        if let Err(ref e) = result {
            tracing::error!("CMake build of {} failed: {}", self.source_dir.display(), e);
        }
        result?;

        self.ctx.refresh_linker_cache();
        Ok(build_dir)
    }

    fn configure(&self, build_dir: &Path) -> BuildResult<()> {
        // a stale directory of the same build type is replaced
        recreate_dir(build_dir)?;

        tracing::info!("Configuring CMake project {}", self.source_dir.display());
        let cmd = ProcessBuilder::new("cmake")
            .arg(&self.source_dir)
            .args(self.configure_args());
        self.ctx.run(cmd, build_dir, PolicyKind::CMake)
    }

    fn compile(&self, build_dir: &Path) -> BuildResult<()> {
        tracing::info!("Building with {}", self.build_system);
        let policy = self.build_system.progress_policy();
        self.ctx
            .run(self.build_system.build_command(), build_dir, policy)?;
        self.ctx
            .run(self.build_system.install_command(), build_dir, policy)
    }
}

/// Run a CMake build of `source_dir` into the context's prefix.
pub fn build_via_cmake(
    ctx: &BuildContext,
    source_dir: &Path,
    cmake_flags: &[String],
    platform_flags: &[String],
    build_system: BuildSystemSpec,
    build_type: &str,
) -> BuildResult<PathBuf> {
    CMakeBuilder::new(ctx, source_dir)
        .build_system(build_system)
        .build_type(build_type)
        .platform_flags(platform_flags.iter().cloned())
        .args(cmake_flags.iter().cloned())
        .build()
}

/// Check if a directory contains a CMake project.
pub fn is_cmake_project(dir: &Path) -> bool {
    dir.join("CMakeLists.txt").is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;

    use tempfile::TempDir;

    use crate::test_support::RecordingRunner;

    fn setup() -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("snappy");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("CMakeLists.txt"), "project(snappy)").unwrap();
        (tmp, source)
    }

    fn ctx(runner: &RecordingRunner, root: &Path) -> BuildContext {
        BuildContext::new(
            PathBuf::from("/opt/prefix"),
            root.to_path_buf(),
            Arc::new(runner.clone()),
        )
    }

    #[test]
    fn test_is_cmake_project() {
        let tmp = TempDir::new().unwrap();

        assert!(!is_cmake_project(tmp.path()));

        fs::write(tmp.path().join("CMakeLists.txt"), "cmake_minimum_required(VERSION 3.10)").unwrap();

        assert!(is_cmake_project(tmp.path()));
    }

    #[test]
    fn test_flag_order() {
        let (tmp, source) = setup();
        let runner = RecordingRunner::new();
        let ctx = ctx(&runner, tmp.path());

        let args = CMakeBuilder::new(&ctx, &source)
            .build_system(BuildSystemSpec::make())
            .platform_flags(["-DP=1", "-DDUP=ON"])
            .args(["-DC=1", "-DDUP=ON"])
            .configure_args();

        assert_eq!(
            args,
            vec![
                "-G",
                "Unix Makefiles",
                "-DCMAKE_BUILD_TYPE=RELEASE",
                "-DP=1",
                "-DDUP=ON",
                "-DC=1",
                "-DDUP=ON",
                "-DCMAKE_INSTALL_PREFIX=/opt/prefix",
            ]
        );
    }

    #[test]
    fn test_build_runs_configure_build_install() {
        let (tmp, source) = setup();
        let runner = RecordingRunner::new();
        let ctx = ctx(&runner, tmp.path());

        let build_dir = build_via_cmake(
            &ctx,
            &source,
            &["-DBUILD_SHARED_LIBS=OFF".to_string()],
            &[],
            BuildSystemSpec::ninja(),
            "RELEASE",
        )
        .unwrap();

        assert_eq!(build_dir, source.join("build_cmake_release"));
        assert!(build_dir.is_dir());

        let lines = runner.command_lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            format!(
                "cmake {} -G Ninja -DCMAKE_BUILD_TYPE=RELEASE -DBUILD_SHARED_LIBS=OFF -DCMAKE_INSTALL_PREFIX=/opt/prefix",
                source.display()
            )
        );
        assert_eq!(lines[1], "ninja");
        assert_eq!(lines[2], "ninja install");
        for call in runner.calls() {
            assert_eq!(call.get_cwd(), Some(build_dir.as_path()));
        }
    }

    #[test]
    fn test_missing_project_fails_before_side_effects() {
        let tmp = TempDir::new().unwrap();
        let runner = RecordingRunner::new();
        let ctx = ctx(&runner, tmp.path());

        let err = CMakeBuilder::new(&ctx, tmp.path()).build().unwrap_err();

        assert!(matches!(err, BuildError::MissingCMakeProject(_)));
        assert!(!tmp.path().join("build_cmake_release").exists());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_repeated_build_replaces_stale_dir() {
        let (tmp, source) = setup();
        let runner = RecordingRunner::new();
        let ctx = ctx(&runner, tmp.path());
        let stale = source.join("build_cmake_debug");
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("CMakeCache.txt"), "stale").unwrap();

        let builder = CMakeBuilder::new(&ctx, &source).build_type("Debug");
        builder.build().unwrap();
        builder.build().unwrap();

        assert!(!stale.join("CMakeCache.txt").exists());
        assert_eq!(runner.calls().len(), 6);
    }

    #[test]
    fn test_configure_failure_stops_build() {
        let (tmp, source) = setup();
        let runner = RecordingRunner::new().fail_program("cmake", 1);
        let ctx = ctx(&runner, tmp.path());
        let cwd = std::env::current_dir().unwrap();

        let err = CMakeBuilder::new(&ctx, &source).build().unwrap_err();

        assert!(matches!(err, BuildError::Command { code: Some(1), .. }));
        assert_eq!(runner.calls().len(), 1);
        assert_eq!(std::env::current_dir().unwrap(), cwd);
    }

    #[test]
    fn test_linker_cache_refreshed_after_install() {
        let (tmp, source) = setup();
        let runner = RecordingRunner::new().with_program("ldconfig", "/sbin/ldconfig");
        let ctx = ctx(&runner, tmp.path());

        CMakeBuilder::new(&ctx, &source).build().unwrap();

        assert_eq!(runner.command_lines().last().unwrap(), "/sbin/ldconfig");
    }
}
