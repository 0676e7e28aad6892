//! Configure-script driver for autotools-style library sources.

use std::path::{Path, PathBuf};

use crate::builder::build_system::BuildSystemSpec;
use crate::builder::context::BuildContext;
use crate::builder::error::{BuildError, BuildResult};
use crate::builder::patch::apply_patches;
use crate::builder::progress::PolicyKind;
use crate::builder::recipe::CompileRecipeFlags;
use crate::util::fs::ensure_executable;
use crate::util::process::ProcessBuilder;

/// Script run when a recipe does not name another one.
pub const DEFAULT_CONFIGURE_SCRIPT: &str = "./configure";

/// Configure/build/install cycle for one source tree.
pub struct ConfigureBuilder<'a> {
    ctx: &'a BuildContext,
    source_dir: PathBuf,
    executable: String,
    build_system: BuildSystemSpec,
    recipe: CompileRecipeFlags,
    platform_flags: Vec<String>,
    patch_root: Option<PathBuf>,
}

impl<'a> ConfigureBuilder<'a> {
    /// Create a builder running `./configure` and make.
    pub fn new(ctx: &'a BuildContext, source_dir: impl Into<PathBuf>, recipe: CompileRecipeFlags) -> Self {
        ConfigureBuilder {
            ctx,
            source_dir: source_dir.into(),
            executable: DEFAULT_CONFIGURE_SCRIPT.to_string(),
            build_system: BuildSystemSpec::make(),
            recipe,
            platform_flags: Vec::new(),
            patch_root: None,
        }
    }

    /// Script to run instead of `./configure`, relative to the source tree.
    pub fn executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = executable.into();
        self
    }

    pub fn build_system(mut self, build_system: BuildSystemSpec) -> Self {
        self.build_system = build_system;
        self
    }

    /// Flags contributed by the resolved platform.
    pub fn platform_flags(mut self, flags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.platform_flags.extend(flags.into_iter().map(|s| s.into()));
        self
    }

    /// Directory holding the recipe's patch sets.
    pub fn patch_root(mut self, patch_root: Option<PathBuf>) -> Self {
        self.patch_root = patch_root;
        self
    }

    pub fn script_path(&self) -> PathBuf {
        let relative = self.executable.trim_start_matches("./");
        self.source_dir.join(relative)
    }

    /// Arguments after the script: prefix, then platform flags, then recipe
    /// flags.
    pub fn configure_args(&self) -> Vec<String> {
        let mut args = vec![format!("--prefix={}", self.ctx.prefix().display())];
        args.extend(self.platform_flags.iter().cloned());
        args.extend(self.recipe.flags().iter().cloned());
        args
    }

    /// Patch, configure, build and install.
    pub fn build(&self) -> BuildResult<()> {
        let script = self.script_path();
        if !script.is_file() {
            return Err(BuildError::MissingConfigureScript(script));
        }
        ensure_executable(&script)?;

        if let Some(ref patch_root) = self.patch_root {
            let applied = apply_patches(self.ctx, &self.source_dir, patch_root, self.recipe.patches())?;
            if applied > 0 {
                tracing::info!("Applied {} patches to {}", applied, self.source_dir.display());
            }
        }

        tracing::info!("Configuring {}", self.source_dir.display());
        let cmd = ProcessBuilder::new(&script).args(self.configure_args());
        self.ctx.run(cmd, &self.source_dir, PolicyKind::Common)?;

        tracing::info!("Building with {}", self.build_system);
        let policy = self.build_system.progress_policy();
        self.ctx
            .run(self.build_system.build_command(), &self.source_dir, policy)?;
        self.ctx
            .run(self.build_system.install_command(), &self.source_dir, policy)?;

        self.ctx.refresh_linker_cache();
        Ok(())
    }
}

/// Run a configure-style build of `source_dir` into the context's prefix.
pub fn build_via_configure(
    ctx: &BuildContext,
    source_dir: &Path,
    recipe: CompileRecipeFlags,
    platform_flags: &[String],
    patch_root: Option<&Path>,
    executable: &str,
    build_system: BuildSystemSpec,
) -> BuildResult<()> {
    ConfigureBuilder::new(ctx, source_dir, recipe)
        .executable(executable)
        .build_system(build_system)
        .platform_flags(platform_flags.iter().cloned())
        .patch_root(patch_root.map(Path::to_path_buf))
        .build()
}

/// Run `sh autogen.sh` to generate the configure script, then build.
pub fn build_via_autogen(
    ctx: &BuildContext,
    source_dir: &Path,
    recipe: CompileRecipeFlags,
    platform_flags: &[String],
    patch_root: Option<&Path>,
    executable: &str,
    build_system: BuildSystemSpec,
) -> BuildResult<()> {
    tracing::info!("Bootstrapping {} with autogen.sh", source_dir.display());
    ctx.run(
        ProcessBuilder::new("sh").arg("autogen.sh"),
        source_dir,
        PolicyKind::Common,
    )?;

    build_via_configure(
        ctx,
        source_dir,
        recipe,
        platform_flags,
        patch_root,
        executable,
        build_system,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;

    use tempfile::TempDir;

    use crate::test_support::RecordingRunner;

    fn setup(script: &str) -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("libev");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join(script), "#!/bin/sh\n").unwrap();
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
    fn test_configure_build_install_sequence() {
        let (tmp, source) = setup("configure");
        let runner = RecordingRunner::new();
        let ctx = ctx(&runner, tmp.path());

        build_via_configure(
            &ctx,
            &source,
            CompileRecipeFlags::with_flags(["--disable-shared"]),
            &["--host=arm-linux-androideabi".to_string()],
            None,
            DEFAULT_CONFIGURE_SCRIPT,
            BuildSystemSpec::make(),
        )
        .unwrap();

        assert_eq!(
            runner.command_lines(),
            vec![
                format!(
                    "{} --prefix=/opt/prefix --host=arm-linux-androideabi --disable-shared",
                    source.join("configure").display()
                ),
                "make -j2".to_string(),
                "make -j2 install".to_string(),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_script_made_executable() {
        use std::os::unix::fs::PermissionsExt;

        let (tmp, source) = setup("config");
        let script = source.join("config");
        fs::set_permissions(&script, fs::Permissions::from_mode(0o644)).unwrap();
        let runner = RecordingRunner::new();
        let ctx = ctx(&runner, tmp.path());

        ConfigureBuilder::new(&ctx, &source, CompileRecipeFlags::default())
            .executable("./config")
            .build()
            .unwrap();

        let mode = fs::metadata(&script).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn test_missing_script() {
        let tmp = TempDir::new().unwrap();
        let runner = RecordingRunner::new();
        let ctx = ctx(&runner, tmp.path());

        let err = ConfigureBuilder::new(&ctx, tmp.path(), CompileRecipeFlags::default())
            .build()
            .unwrap_err();

        assert!(matches!(err, BuildError::MissingConfigureScript(_)));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_patches_run_before_configure() {
        let (tmp, source) = setup("configure");
        let patches = tmp.path().join("patches/libev-4.33");
        fs::create_dir_all(&patches).unwrap();
        fs::write(patches.join("a.patch"), "a").unwrap();
        fs::write(patches.join("b.patch"), "b").unwrap();
        let runner = RecordingRunner::new();
        let ctx = ctx(&runner, tmp.path());

        ConfigureBuilder::new(
            &ctx,
            &source,
            CompileRecipeFlags::new(["libev-4.33"], Vec::<String>::new()),
        )
        .patch_root(Some(tmp.path().join("patches")))
        .build()
        .unwrap();

        let lines = runner.command_lines();
        assert_eq!(&lines[..2], ["patch -p0", "patch -p0"]);
        assert!(lines[2].ends_with("configure --prefix=/opt/prefix"));
    }

    #[test]
    fn test_failed_patch_stops_before_configure() {
        let (tmp, source) = setup("configure");
        let patches = tmp.path().join("patches/libcpuid");
        fs::create_dir_all(&patches).unwrap();
        fs::write(patches.join("broken.patch"), "garbage").unwrap();
        let runner = RecordingRunner::new().fail_program("patch", 1);
        let ctx = ctx(&runner, tmp.path());

        let err = ConfigureBuilder::new(
            &ctx,
            &source,
            CompileRecipeFlags::new(["libcpuid"], Vec::<String>::new()),
        )
        .patch_root(Some(tmp.path().join("patches")))
        .build()
        .unwrap_err();

        assert!(err.is_patch_failure());
        assert_eq!(runner.command_lines(), ["patch -p0"]);
    }

    #[test]
    fn test_configure_failure_is_build_error() {
        let (tmp, source) = setup("configure");
        let runner = RecordingRunner::new().fail_program("configure", 77);
        let ctx = ctx(&runner, tmp.path());

        let err = ConfigureBuilder::new(&ctx, &source, CompileRecipeFlags::default())
            .build()
            .unwrap_err();

        assert!(matches!(err, BuildError::Command { code: Some(77), .. }));
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_install_failure_is_build_error() {
        let (tmp, source) = setup("configure");
        let runner = RecordingRunner::new().fail_matching("install", 2);
        let ctx = ctx(&runner, tmp.path());

        let err = ConfigureBuilder::new(&ctx, &source, CompileRecipeFlags::default())
            .build()
            .unwrap_err();

        assert!(matches!(err, BuildError::Command { code: Some(2), .. }));
    }

    #[test]
    fn test_autogen_runs_first() {
        let (tmp, source) = setup("configure");
        let runner = RecordingRunner::new();
        let ctx = ctx(&runner, tmp.path());

        build_via_autogen(
            &ctx,
            &source,
            CompileRecipeFlags::default(),
            &[],
            None,
            DEFAULT_CONFIGURE_SCRIPT,
            BuildSystemSpec::gmake(),
        )
        .unwrap();

        let lines = runner.command_lines();
        assert_eq!(lines[0], "sh autogen.sh");
        assert_eq!(lines.last().unwrap(), "gmake -j2 install");
    }

    #[test]
    fn test_autogen_failure_stops() {
        let (tmp, source) = setup("configure");
        let runner = RecordingRunner::new().fail_program("sh", 1);
        let ctx = ctx(&runner, tmp.path());

        let err = build_via_autogen(
            &ctx,
            &source,
            CompileRecipeFlags::default(),
            &[],
            None,
            DEFAULT_CONFIGURE_SCRIPT,
            BuildSystemSpec::make(),
        )
        .unwrap_err();

        assert!(matches!(err, BuildError::Command { .. }));
        assert_eq!(runner.calls().len(), 1);
    }
}
