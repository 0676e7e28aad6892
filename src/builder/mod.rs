//! Build drivers.
//!
//! Drivers run one build-system family (CMake or configure scripts) against
//! a fetched source tree and install the result under the context's prefix.

pub mod build_system;
pub mod cmake;
pub mod configure;
pub mod context;
pub mod error;
pub mod patch;
pub mod progress;
pub mod recipe;

pub use build_system::{resolve_build_system, supported_build_systems, BuildSystemSpec};
pub use cmake::{build_via_cmake, CMakeBuilder};
pub use configure::{build_via_autogen, build_via_configure, ConfigureBuilder};
pub use context::BuildContext;
pub use error::{BuildError, BuildResult};
pub use patch::apply_patches;
pub use progress::{PolicyKind, Progress};
pub use recipe::CompileRecipeFlags;
