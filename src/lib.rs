//! depforge - builds third-party C/C++ dependencies for a target platform
//!
//! This crate provides the platform registry, the CMake and configure build
//! drivers, the patch applier and the [`BuildRequest`] session that fetches
//! and builds each library.

pub mod builder;
pub mod core;
pub mod ops;
pub mod sources;
pub mod util;

/// Test doubles for native tool execution and source fetching.
///
/// This module is only available when compiling with `--cfg test`.
#[cfg(test)]
pub mod test_support;

pub use builder::{BuildContext, BuildError, BuildResult, BuildSystemSpec};
pub use core::platform::{resolve_platform, Distribution, ResolvedPlatform};
pub use ops::{BuildRequest, BuildRequestOptions, Recipe};
pub use sources::{NetworkFetcher, SourceFetcher};
