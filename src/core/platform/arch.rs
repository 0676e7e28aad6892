//! CPU architectures known to a platform family.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Pointer width of an architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BitWidth {
    #[serde(rename = "32")]
    Bits32,
    #[serde(rename = "64")]
    Bits64,
}

impl BitWidth {
    pub fn bits(&self) -> u32 {
        match self {
            BitWidth::Bits32 => 32,
            BitWidth::Bits64 => 64,
        }
    }
}

/// An architecture within a platform family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Architecture {
    name: String,
    bit_width: BitWidth,
    default_install_prefix: PathBuf,
}

impl Architecture {
    pub fn new(name: impl Into<String>, bit_width: BitWidth, prefix: impl Into<PathBuf>) -> Self {
        Architecture {
            name: name.into(),
            bit_width,
            default_install_prefix: prefix.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bit_width(&self) -> BitWidth {
        self.bit_width
    }

    /// Install prefix used when the caller does not give one.
    pub fn default_install_prefix(&self) -> &Path {
        &self.default_install_prefix
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}-bit)", self.name, self.bit_width.bits())
    }
}
