//! Build sessions and per-library recipes.
//!
//! A [`BuildRequest`] validates the target platform, owns a freshly created
//! build directory and drives one recipe per third-party library. Sources
//! are fetched into the build directory; every native tool runs with the
//! session's [`BuildContext`], so the process working directory and
//! environment are never touched.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, LazyLock, Mutex};

use crate::builder::build_system::BuildSystemSpec;
use crate::builder::cmake::{build_via_cmake, DEFAULT_BUILD_TYPE};
use crate::builder::configure::{build_via_autogen, build_via_configure, DEFAULT_CONFIGURE_SCRIPT};
use crate::builder::context::{BuildContext, PKG_CONFIG_PATH};
use crate::builder::error::{BuildError, BuildResult};
use crate::builder::progress::PolicyKind;
use crate::builder::recipe::CompileRecipeFlags;
use crate::core::platform::{require_platform, Distribution, ResolvedPlatform};
use crate::sources::SourceFetcher;
use crate::util::config::{DEFAULT_GIT_URL_TEMPLATE, DEFAULT_OPENSSL_URL_ROOT};
use crate::util::fs::{absolute_path, recreate_dir};
use crate::util::process::{CommandRunner, ProcessBuilder};

/// Archive format of OpenSSL release tarballs.
const OPENSSL_ARCHIVE_EXT: &str = "tar.gz";

/// Build directories owned by live requests in this process.
static CLAIMED_DIRS: LazyLock<Mutex<HashSet<PathBuf>>> =
    LazyLock::new(|| Mutex::new(HashSet::new()));

/// Exclusive ownership of a build directory, released on drop.
#[derive(Debug)]
struct DirectoryClaim {
    path: PathBuf,
}

impl DirectoryClaim {
    fn acquire(path: &Path) -> BuildResult<Self> {
        let mut claimed = CLAIMED_DIRS.lock().unwrap_or_else(|e| e.into_inner());
        if !claimed.insert(path.to_path_buf()) {
            return Err(BuildError::DirectoryInUse(path.to_path_buf()));
        }
        Ok(DirectoryClaim {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for DirectoryClaim {
    fn drop(&mut self) {
        let mut claimed = CLAIMED_DIRS.lock().unwrap_or_else(|e| e.into_inner());
        claimed.remove(&self.path);
    }
}

/// The libraries depforge knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recipe {
    /// Compression library
    Snappy,
    /// JSON library
    Jsonc,
    /// Event loop library
    Libev,
    /// CPU feature detection library
    Cpuid,
    /// Shared utility library
    Common,
    /// TLS library
    Openssl,
}

impl Recipe {
    pub const ALL: [Recipe; 6] = [
        Recipe::Snappy,
        Recipe::Jsonc,
        Recipe::Libev,
        Recipe::Cpuid,
        Recipe::Common,
        Recipe::Openssl,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Recipe::Snappy => "snappy",
            Recipe::Jsonc => "jsonc",
            Recipe::Libev => "libev",
            Recipe::Cpuid => "cpuid",
            Recipe::Common => "common",
            Recipe::Openssl => "openssl",
        }
    }

    /// Repository name substituted into the git URL template, for git-hosted
    /// recipes.
    pub fn repository(&self) -> Option<&'static str> {
        match self {
            Recipe::Snappy => Some("snappy"),
            Recipe::Jsonc => Some("json-c"),
            Recipe::Libev => Some("libev"),
            Recipe::Cpuid => Some("libcpuid"),
            Recipe::Common => Some("common"),
            Recipe::Openssl => None,
        }
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Recipe {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Recipe::ALL
            .into_iter()
            .find(|r| r.name() == lower || r.repository() == Some(lower.as_str()))
            .ok_or_else(|| BuildError::UnknownRecipe(s.to_string()))
    }
}

/// Options for constructing a [`BuildRequest`].
#[derive(Debug, Clone)]
pub struct BuildRequestOptions {
    /// Platform family name (`linux`, `windows`, ...)
    pub platform: String,

    /// Architecture name within the family
    pub arch: String,

    /// Build directory; destroyed and recreated
    pub build_dir: PathBuf,

    /// Install prefix (None = architecture default)
    pub prefix: Option<PathBuf>,

    /// Root of recipe patch sets (None = no patching)
    pub patch_dir: Option<PathBuf>,

    /// Linux distribution to assume instead of sniffing the host
    pub distribution: Option<Distribution>,

    /// Build system for CMake recipes
    pub cmake_build_system: BuildSystemSpec,

    /// Build system for configure recipes
    pub configure_build_system: BuildSystemSpec,

    /// CMake build type
    pub build_type: String,

    /// Clone URL with a `{name}` placeholder
    pub git_url_template: String,

    /// URL prefix of OpenSSL release tarballs
    pub openssl_url_root: String,

    /// Remove `.git` from cloned sources
    pub strip_vcs: bool,
}

impl BuildRequestOptions {
    pub fn new(platform: impl Into<String>, arch: impl Into<String>, build_dir: impl Into<PathBuf>) -> Self {
        BuildRequestOptions {
            platform: platform.into(),
            arch: arch.into(),
            build_dir: build_dir.into(),
            prefix: None,
            patch_dir: None,
            distribution: None,
            cmake_build_system: BuildSystemSpec::ninja(),
            configure_build_system: BuildSystemSpec::make(),
            build_type: DEFAULT_BUILD_TYPE.to_string(),
            git_url_template: DEFAULT_GIT_URL_TEMPLATE.to_string(),
            openssl_url_root: DEFAULT_OPENSSL_URL_ROOT.to_string(),
            strip_vcs: true,
        }
    }
}

/// A build session for one platform and architecture.
pub struct BuildRequest {
    platform: ResolvedPlatform,
    ctx: BuildContext,
    build_dir: PathBuf,
    patch_dir: Option<PathBuf>,
    cmake_build_system: BuildSystemSpec,
    configure_build_system: BuildSystemSpec,
    build_type: String,
    git_url_template: String,
    openssl_url_root: String,
    strip_vcs: bool,
    fetcher: Arc<dyn SourceFetcher>,
    _claim: DirectoryClaim,
}

impl fmt::Debug for BuildRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildRequest")
            .field("platform", &self.platform)
            .field("build_dir", &self.build_dir)
            .field("prefix", &self.ctx.prefix())
            .finish_non_exhaustive()
    }
}

impl BuildRequest {
    /// Validate the target and take ownership of a fresh build directory.
    ///
    /// Platform, architecture and distribution are checked before anything
    /// on disk is touched.
    pub fn new(
        options: BuildRequestOptions,
        runner: Arc<dyn CommandRunner>,
        fetcher: Arc<dyn SourceFetcher>,
    ) -> BuildResult<Self> {
        let family = require_platform(&options.platform)?;
        let arch = family.require_architecture(&options.arch)?;
        let platform = family.instantiate_with(arch, family.package_types(), options.distribution)?;

        let cwd = std::env::current_dir()
            .map_err(|e| BuildError::io("failed to read current directory", e))?;
        let prefix = match options.prefix {
            Some(ref prefix) => absolute_path(prefix, &cwd),
            None => absolute_path(arch.default_install_prefix(), &cwd),
        };
        let build_dir = absolute_path(&options.build_dir, &cwd);
        let patch_dir = options.patch_dir.as_deref().map(|p| absolute_path(p, &cwd));

        let claim = DirectoryClaim::acquire(&build_dir)?;
        recreate_dir(&build_dir)?;

        let inherited = std::env::var(PKG_CONFIG_PATH).ok();
        let ctx = BuildContext::new(prefix, build_dir.clone(), runner)
            .with_pkg_config_path(inherited.as_deref())
            .with_envs(platform.environment());

        tracing::info!(
            "Build request for platform {} ({}) created in {}",
            platform.name(),
            platform.arch().name(),
            build_dir.display()
        );

        Ok(BuildRequest {
            platform,
            ctx,
            build_dir,
            patch_dir,
            cmake_build_system: options.cmake_build_system,
            configure_build_system: options.configure_build_system,
            build_type: options.build_type,
            git_url_template: options.git_url_template,
            openssl_url_root: options.openssl_url_root,
            strip_vcs: options.strip_vcs,
            fetcher,
            _claim: claim,
        })
    }

    pub fn platform(&self) -> &ResolvedPlatform {
        &self.platform
    }

    pub fn platform_name(&self) -> &'static str {
        self.platform.name()
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn prefix(&self) -> &Path {
        self.ctx.prefix()
    }

    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    /// Clone URL for a repository name.
    pub fn git_url(&self, repository: &str) -> String {
        self.git_url_template.replace("{name}", repository)
    }

    /// Download URL of an OpenSSL release.
    pub fn openssl_url(&self, version: &str) -> String {
        let root = self.openssl_url_root.trim_end_matches('/');
        format!("{}/openssl-{}.{}", root, version, OPENSSL_ARCHIVE_EXT)
    }

    /// Install a system package through the platform's package manager.
    pub fn install_package(&self, package: &str) -> BuildResult<()> {
        self.platform.install_package(package, self.ctx.runner())
    }

    pub fn build_snappy(&self) -> BuildResult<()> {
        let source = self.clone_source(Recipe::Snappy)?;
        self.cmake(&source, &["-DBUILD_SHARED_LIBS=OFF", "-DSNAPPY_BUILD_TESTS=OFF"])
    }

    pub fn build_jsonc(&self) -> BuildResult<()> {
        let source = self.clone_source(Recipe::Jsonc)?;
        self.cmake(&source, &["-DBUILD_SHARED_LIBS=OFF"])
    }

    pub fn build_libev(&self) -> BuildResult<()> {
        let source = self.clone_source(Recipe::Libev)?;
        let flags = CompileRecipeFlags::new(
            ["libev"],
            ["--with-pic", "--disable-shared", "--enable-static"],
        );
        build_via_autogen(
            &self.ctx,
            &source,
            flags,
            &self.platform.configure_flags(),
            self.patch_dir.as_deref(),
            DEFAULT_CONFIGURE_SCRIPT,
            self.configure_build_system.clone(),
        )
    }

    /// Regenerate libcpuid's configure script, then build it.
    pub fn build_cpuid(&self) -> BuildResult<()> {
        let source = self.clone_source(Recipe::Cpuid)?;

        self.ctx.run(
            ProcessBuilder::new(self.libtoolize_program()),
            &source,
            PolicyKind::Common,
        )?;
        self.ctx.run(
            ProcessBuilder::new("autoreconf").arg("--install"),
            &source,
            PolicyKind::Common,
        )?;

        let flags = CompileRecipeFlags::new(["libcpuid"], ["--disable-shared", "--enable-static"]);
        build_via_configure(
            &self.ctx,
            &source,
            flags,
            &self.platform.configure_flags(),
            self.patch_dir.as_deref(),
            DEFAULT_CONFIGURE_SCRIPT,
            self.configure_build_system.clone(),
        )
    }

    pub fn build_common(&self, with_qt: bool) -> BuildResult<()> {
        let source = self.clone_source(Recipe::Common)?;
        let mut flags = Vec::new();
        if with_qt {
            flags.push("-DQT_ENABLED=ON");
        }
        self.cmake(&source, &flags)
    }

    /// Build OpenSSL from a release tarball.
    ///
    /// `./config` does not take autoconf options, so platform configure
    /// flags are not passed.
    pub fn build_openssl(&self, version: &str) -> BuildResult<()> {
        let url = self.openssl_url(version);
        let source = self.download_source(&url)?;

        let flags = CompileRecipeFlags::new(
            ["openssl".to_string(), format!("openssl-{}", version)],
            ["no-shared", "no-unit-test"],
        );
        build_via_configure(
            &self.ctx,
            &source,
            flags,
            &[],
            self.patch_dir.as_deref(),
            "./config",
            self.configure_build_system.clone(),
        )
    }

    /// Build one recipe. `with_qt` only affects [`Recipe::Common`]; OpenSSL
    /// needs `openssl_version`.
    pub fn build_recipe(
        &self,
        recipe: Recipe,
        with_qt: bool,
        openssl_version: Option<&str>,
    ) -> BuildResult<()> {
        tracing::info!("Building {}", recipe);
        match recipe {
            Recipe::Snappy => self.build_snappy(),
            Recipe::Jsonc => self.build_jsonc(),
            Recipe::Libev => self.build_libev(),
            Recipe::Cpuid => self.build_cpuid(),
            Recipe::Common => self.build_common(with_qt),
            Recipe::Openssl => match openssl_version {
                Some(version) => self.build_openssl(version),
                None => Err(BuildError::MissingVersion(Recipe::Openssl.name())),
            },
        }
    }

    /// Bootstrap tool used to prepare libcpuid's autotools files.
    pub fn libtoolize_program(&self) -> &'static str {
        if self.platform_name() == "macosx" {
            "glibtoolize"
        } else {
            "libtoolize"
        }
    }

    fn clone_source(&self, recipe: Recipe) -> BuildResult<PathBuf> {
        let repository = recipe
            .repository()
            .ok_or_else(|| BuildError::UnknownRecipe(recipe.name().to_string()))?;
        let url = self.git_url(repository);

        tracing::info!("Cloning {}", url);
        self.fetcher
            .clone_repository(&url, None, self.strip_vcs, &self.build_dir)
            .map_err(|source| BuildError::Fetch { url, source })
    }

    fn download_source(&self, url: &str) -> BuildResult<PathBuf> {
        tracing::info!("Downloading {}", url);
        let fetch_error = |source| BuildError::Fetch {
            url: url.to_string(),
            source,
        };
        let archive = self
            .fetcher
            .download_file(url, &self.build_dir)
            .map_err(fetch_error)?;
        self.fetcher.extract_archive(&archive).map_err(fetch_error)
    }

    fn cmake(&self, source: &Path, flags: &[&str]) -> BuildResult<()> {
        let flags: Vec<String> = flags.iter().map(|f| f.to_string()).collect();
        build_via_cmake(
            &self.ctx,
            source,
            &flags,
            &self.platform.cmake_flags(),
            self.cmake_build_system.clone(),
            &self.build_type,
        )
        .map(|_| ())
    }
}
