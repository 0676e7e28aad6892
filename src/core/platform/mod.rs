//! Platform registry.
//!
//! The registry is a static catalog of platform families (linux, windows,
//! macosx, freebsd, android). Each family owns its architectures and the
//! package formats it can produce, and instantiates a [`ResolvedPlatform`]
//! for one architecture. The linux family additionally sniffs the running
//! distribution to choose between the Debian, RedHat and Arch variants.

mod arch;
mod distro;
mod package;
mod resolved;

use std::fmt;
use std::sync::LazyLock;

use serde::Serialize;

pub use arch::{Architecture, BitWidth};
pub use distro::Distribution;
pub use package::PackageType;
pub use resolved::{PlatformVariant, ResolvedPlatform};

use crate::builder::error::{BuildError, BuildResult};

/// Root of the Android NDK installation.
pub const ANDROID_NDK_ROOT: &str = "/opt/android-ndk";

/// Android API level targeted by NDK builds.
pub const ANDROID_PLATFORM: &str = "android-16";

/// Supported platform families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FamilyKind {
    Linux,
    Windows,
    #[serde(rename = "macosx")]
    MacOsx,
    #[serde(rename = "freebsd")]
    FreeBsd,
    Android,
}

impl FamilyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FamilyKind::Linux => "linux",
            FamilyKind::Windows => "windows",
            FamilyKind::MacOsx => "macosx",
            FamilyKind::FreeBsd => "freebsd",
            FamilyKind::Android => "android",
        }
    }
}

/// A platform family with its architectures and package formats.
#[derive(Debug, Clone, Serialize)]
pub struct PlatformFamily {
    #[serde(rename = "name")]
    kind: FamilyKind,
    architectures: Vec<Architecture>,
    package_types: Vec<PackageType>,
}

impl PlatformFamily {
    fn new(kind: FamilyKind, architectures: Vec<Architecture>, package_types: Vec<PackageType>) -> Self {
        PlatformFamily {
            kind,
            architectures,
            package_types,
        }
    }

    pub fn kind(&self) -> FamilyKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    pub fn architectures(&self) -> &[Architecture] {
        &self.architectures
    }

    pub fn package_types(&self) -> &[PackageType] {
        &self.package_types
    }

    /// Look up an architecture by exact name.
    pub fn architecture_by_name(&self, name: &str) -> Option<&Architecture> {
        self.architectures.iter().find(|a| a.name() == name)
    }

    /// Look up an architecture, failing with [`BuildError::InvalidArch`].
    pub fn require_architecture(&self, name: &str) -> BuildResult<&Architecture> {
        self.architecture_by_name(name)
            .ok_or_else(|| BuildError::InvalidArch {
                platform: self.name().to_string(),
                arch: name.to_string(),
                supported: self
                    .architectures
                    .iter()
                    .map(|a| a.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// Instantiate a concrete platform, sniffing the host distribution for linux.
    pub fn instantiate(
        &self,
        arch: &Architecture,
        package_types: &[PackageType],
    ) -> BuildResult<ResolvedPlatform> {
        self.instantiate_with(arch, package_types, None)
    }

    /// Instantiate a concrete platform.
    ///
    /// For linux, `distribution` replaces host sniffing when given. Sniffing
    /// failure is fatal; there is no fallback variant.
    pub fn instantiate_with(
        &self,
        arch: &Architecture,
        package_types: &[PackageType],
        distribution: Option<Distribution>,
    ) -> BuildResult<ResolvedPlatform> {
        let arch = self.require_architecture(arch.name())?.clone();

        let variant = match self.kind {
            FamilyKind::Linux => {
                let distribution = match distribution {
                    Some(distribution) => distribution,
                    None => Distribution::detect()?,
                };
                PlatformVariant::for_distribution(distribution)
            }
            FamilyKind::Windows => PlatformVariant::WindowsMingw,
            FamilyKind::MacOsx => PlatformVariant::MacOsxCommon,
            FamilyKind::FreeBsd => PlatformVariant::FreeBsd,
            FamilyKind::Android => PlatformVariant::Android,
        };

        Ok(ResolvedPlatform::new(variant, arch, package_types.to_vec()))
    }
}

impl fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn arch(name: &str, bit_width: BitWidth, prefix: &str) -> Architecture {
    Architecture::new(name, bit_width, prefix)
}

static SUPPORTED_PLATFORMS: LazyLock<Vec<PlatformFamily>> = LazyLock::new(|| {
    use BitWidth::{Bits32, Bits64};

    let android_prefix =
        |abi: &str| format!("{}/platforms/{}/arch-{}/usr/", ANDROID_NDK_ROOT, ANDROID_PLATFORM, abi);

    vec![
        PlatformFamily::new(
            FamilyKind::Linux,
            vec![
                arch("x86_64", Bits64, "/usr/local"),
                arch("i386", Bits32, "/usr/local"),
                arch("i686", Bits32, "/usr/local"),
                arch("aarch64", Bits64, "/usr/local"),
                arch("armv7l", Bits32, "/usr/local"),
                arch("armv6l", Bits32, "/usr/local"),
            ],
            vec![PackageType::Deb, PackageType::Rpm, PackageType::Tgz],
        ),
        PlatformFamily::new(
            FamilyKind::Windows,
            vec![
                arch("x86_64", Bits64, "/mingw64"),
                arch("AMD64", Bits64, "/mingw64"),
                arch("i386", Bits32, "/mingw32"),
                arch("i686", Bits32, "/mingw32"),
            ],
            vec![PackageType::Nsis, PackageType::Zip],
        ),
        PlatformFamily::new(
            FamilyKind::MacOsx,
            vec![arch("x86_64", Bits64, "/usr/local")],
            vec![PackageType::DragNDrop, PackageType::Zip],
        ),
        PlatformFamily::new(
            FamilyKind::FreeBsd,
            vec![
                arch("x86_64", Bits64, "/usr/local"),
                arch("amd64", Bits64, "/usr/local"),
            ],
            vec![PackageType::Tgz],
        ),
        PlatformFamily::new(
            FamilyKind::Android,
            vec![
                arch("arm", Bits32, &android_prefix("arm")),
                arch("i386", Bits32, &android_prefix("x86")),
            ],
            vec![PackageType::Apk],
        ),
    ]
});

/// All supported platform families.
pub fn supported_platforms() -> &'static [PlatformFamily] {
    &SUPPORTED_PLATFORMS
}

/// Find a platform family by name.
pub fn resolve_platform(name: &str) -> Option<&'static PlatformFamily> {
    SUPPORTED_PLATFORMS.iter().find(|p| p.name() == name)
}

/// Find a platform family by name, failing with [`BuildError::InvalidPlatform`].
pub fn require_platform(name: &str) -> BuildResult<&'static PlatformFamily> {
    resolve_platform(name).ok_or_else(|| BuildError::InvalidPlatform {
        name: name.to_string(),
        supported: SUPPORTED_PLATFORMS
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Family name of the running host, or `unknown`.
pub fn host_os() -> &'static str {
    match std::env::consts::OS {
        "linux" => "linux",
        "windows" => "windows",
        "macos" => "macosx",
        "freebsd" => "freebsd",
        "android" => "android",
        _ => "unknown",
    }
}

/// Machine architecture name of the running host, spelled like `uname -m`.
pub fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86" => "i686",
        "arm" => "armv7l",
        other => other,
    }
}
