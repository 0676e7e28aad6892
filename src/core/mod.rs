//! Core data structures for depforge.
//!
//! The platform registry: families, architectures, package formats and the
//! concrete platforms resolved from them.

pub mod platform;

pub use platform::{
    require_platform, resolve_platform, supported_platforms, Architecture, PlatformFamily,
    ResolvedPlatform,
};
