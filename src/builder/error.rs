//! Build error taxonomy.

use std::path::PathBuf;

use thiserror::Error;

/// Error raised by the platform registry, the build drivers and the
/// orchestrating [`BuildRequest`](crate::ops::BuildRequest).
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid platform `{name}` (supported: {supported})")]
    InvalidPlatform { name: String, supported: String },

    #[error("invalid arch `{arch}` for platform `{platform}` (supported: {supported})")]
    InvalidArch {
        platform: String,
        arch: String,
        supported: String,
    },

    /// The running host could not be mapped onto a known platform variant.
    #[error("unsupported environment: {0}")]
    UnsupportedEnvironment(String),

    #[error("invalid cmake project root: {} (no CMakeLists.txt)", .0.display())]
    MissingCMakeProject(PathBuf),

    #[error("configure script not found: {}", .0.display())]
    MissingConfigureScript(PathBuf),

    #[error("failed to apply patch {}: {message}", patch.display())]
    Patch { patch: PathBuf, message: String },

    #[error("`{command}` failed with exit code {code:?}")]
    Command { command: String, code: Option<i32> },

    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch `{url}`: {source:#}")]
    Fetch {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("build directory {} is already owned by another build request", .0.display())]
    DirectoryInUse(PathBuf),

    #[error("installing packages is not supported on platform `{0}`")]
    PackageInstallUnsupported(String),

    #[error("unknown build system `{0}` (expected ninja, make or gmake)")]
    UnknownBuildSystem(String),

    #[error("unknown recipe `{0}`")]
    UnknownRecipe(String),

    #[error("recipe `{0}` needs a version")]
    MissingVersion(&'static str),
}

impl BuildError {
    /// Wrap an I/O error with a description of what was being attempted.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BuildError::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether this error came from applying a source patch.
    pub fn is_patch_failure(&self) -> bool {
        matches!(self, BuildError::Patch { .. })
    }
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;
