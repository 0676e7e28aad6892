//! Configuration file support for depforge.
//!
//! Two configuration file locations are read:
//! - Global: `~/.depforge/config.toml` - User-wide defaults
//! - Project: `.depforge/config.toml` - Directory-specific overrides
//!
//! Project config takes precedence over global config. Command-line flags
//! take precedence over both.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::build_system::BuildSystemSpec;
use crate::core::platform::Distribution;

/// Directory name used for both config locations.
pub const CONFIG_DIR_NAME: &str = ".depforge";

/// Clone URL template for git-hosted recipes.
pub const DEFAULT_GIT_URL_TEMPLATE: &str = "https://github.com/fastogt/{name}.git";

/// Where OpenSSL release tarballs are downloaded from.
pub const DEFAULT_OPENSSL_URL_ROOT: &str = "https://www.openssl.org/source/";

/// depforge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build settings
    pub build: BuildConfig,

    /// Source retrieval settings
    pub sources: SourcesConfig,

    /// Platform settings
    pub platform: PlatformConfig,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Build system for CMake recipes (ninja, make, gmake)
    pub cmake_build_system: Option<String>,

    /// Build system for configure recipes (make, gmake)
    pub configure_build_system: Option<String>,

    /// Parallel jobs for make-style tools
    pub jobs: Option<usize>,

    /// Root directory of recipe patch sets
    pub patch_dir: Option<PathBuf>,

    /// CMake build type (RELEASE, DEBUG, ...)
    pub build_type: Option<String>,
}

/// Source-retrieval configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Clone URL with a `{name}` placeholder
    pub git_url_template: Option<String>,

    /// URL prefix OpenSSL tarballs are fetched from
    pub openssl_url_root: Option<String>,

    /// Expected SHA-256 of downloads, keyed by URL
    pub checksums: BTreeMap<String, String>,
}

/// Platform-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Linux distribution to assume instead of reading `/etc/os-release`
    pub distribution: Option<String>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.build.cmake_build_system.is_some() {
            self.build.cmake_build_system = other.build.cmake_build_system;
        }
        if other.build.configure_build_system.is_some() {
            self.build.configure_build_system = other.build.configure_build_system;
        }
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if other.build.patch_dir.is_some() {
            self.build.patch_dir = other.build.patch_dir;
        }
        if other.build.build_type.is_some() {
            self.build.build_type = other.build.build_type;
        }

        if other.sources.git_url_template.is_some() {
            self.sources.git_url_template = other.sources.git_url_template;
        }
        if other.sources.openssl_url_root.is_some() {
            self.sources.openssl_url_root = other.sources.openssl_url_root;
        }
        // checksums are additive, per URL
        self.sources.checksums.extend(other.sources.checksums);

        if other.platform.distribution.is_some() {
            self.platform.distribution = other.platform.distribution;
        }
    }

    /// Parse the CMake build system from config string.
    pub fn cmake_build_system(&self) -> Result<Option<BuildSystemSpec>> {
        self.build_system(self.build.cmake_build_system.as_deref())
    }

    /// Parse the configure build system from config string.
    pub fn configure_build_system(&self) -> Result<Option<BuildSystemSpec>> {
        self.build_system(self.build.configure_build_system.as_deref())
    }

    fn build_system(&self, name: Option<&str>) -> Result<Option<BuildSystemSpec>> {
        let Some(name) = name else {
            return Ok(None);
        };
        let mut spec: BuildSystemSpec = name.parse().context("invalid build system in config")?;
        if let Some(jobs) = self.build.jobs {
            spec = spec.with_jobs(jobs);
        }
        Ok(Some(spec))
    }

    /// Parse the distribution override from config string.
    pub fn distribution(&self) -> Result<Option<Distribution>> {
        self.platform
            .distribution
            .as_deref()
            .map(|d| d.parse::<Distribution>().context("invalid distribution in config"))
            .transpose()
    }

    /// Git clone URL template, or the built-in default.
    pub fn git_url_template(&self) -> &str {
        self.sources
            .git_url_template
            .as_deref()
            .unwrap_or(DEFAULT_GIT_URL_TEMPLATE)
    }

    /// OpenSSL download root, or the built-in default.
    pub fn openssl_url_root(&self) -> &str {
        self.sources
            .openssl_url_root
            .as_deref()
            .unwrap_or(DEFAULT_OPENSSL_URL_ROOT)
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.depforge/config.toml)
/// 2. Global config (~/.depforge/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }

    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global depforge config directory (~/.depforge).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(CONFIG_DIR_NAME))
}

/// Get the global config path (~/.depforge/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.depforge/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_DIR_NAME).join("config.toml")
}
