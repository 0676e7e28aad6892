//! Concrete platforms: a family variant bound to one architecture.

use std::collections::BTreeMap;
use std::fmt;

use crate::builder::error::{BuildError, BuildResult};
use crate::builder::progress::{PolicyKind, Progress};
use crate::core::platform::distro::Distribution;
use crate::core::platform::{Architecture, PackageType, ANDROID_NDK_ROOT, ANDROID_PLATFORM};
use crate::util::process::{CommandRunner, ProcessBuilder};

const MACOSX_DEPLOYMENT_TARGET: &str = "10.9";

/// The closed set of platform variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformVariant {
    Debian,
    RedHat,
    Arch,
    WindowsMingw,
    MacOsxCommon,
    FreeBsd,
    Android,
}

impl PlatformVariant {
    /// Linux variant for a sniffed distribution.
    pub fn for_distribution(distribution: Distribution) -> Self {
        match distribution {
            Distribution::Debian => PlatformVariant::Debian,
            Distribution::RedHat => PlatformVariant::RedHat,
            Distribution::Arch => PlatformVariant::Arch,
        }
    }

    /// Name of the family this variant belongs to.
    pub fn family_name(&self) -> &'static str {
        match self {
            PlatformVariant::Debian | PlatformVariant::RedHat | PlatformVariant::Arch => "linux",
            PlatformVariant::WindowsMingw => "windows",
            PlatformVariant::MacOsxCommon => "macosx",
            PlatformVariant::FreeBsd => "freebsd",
            PlatformVariant::Android => "android",
        }
    }

    /// Non-interactive package installer invocation, if the variant has one.
    fn installer(&self) -> Option<&'static [&'static str]> {
        match self {
            PlatformVariant::Debian => Some(&["apt-get", "-y", "--no-install-recommends", "install"]),
            PlatformVariant::RedHat => Some(&["yum", "-y", "install"]),
            PlatformVariant::Arch | PlatformVariant::WindowsMingw => {
                Some(&["pacman", "-S", "--noconfirm"])
            }
            PlatformVariant::MacOsxCommon => Some(&["port", "install"]),
            PlatformVariant::FreeBsd | PlatformVariant::Android => None,
        }
    }
}

/// A platform variant resolved for one architecture and set of package types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPlatform {
    variant: PlatformVariant,
    arch: Architecture,
    package_types: Vec<PackageType>,
}

impl ResolvedPlatform {
    pub fn new(variant: PlatformVariant, arch: Architecture, package_types: Vec<PackageType>) -> Self {
        ResolvedPlatform {
            variant,
            arch,
            package_types,
        }
    }

    /// Family name (`linux`, `windows`, ...).
    pub fn name(&self) -> &'static str {
        self.variant.family_name()
    }

    pub fn variant(&self) -> PlatformVariant {
        self.variant
    }

    pub fn arch(&self) -> &Architecture {
        &self.arch
    }

    pub fn package_types(&self) -> &[PackageType] {
        &self.package_types
    }

    /// The installer command for `package`.
    pub fn install_package_command(&self, package: &str) -> BuildResult<ProcessBuilder> {
        let installer = self
            .variant
            .installer()
            .ok_or_else(|| BuildError::PackageInstallUnsupported(self.name().to_string()))?;
        let cmd = ProcessBuilder::from_argv(installer)
            .ok_or_else(|| BuildError::PackageInstallUnsupported(self.name().to_string()))?;
        Ok(cmd.arg(package))
    }

    /// Install a system package with the platform's native package manager.
    pub fn install_package(&self, package: &str, runner: &dyn CommandRunner) -> BuildResult<()> {
        let cmd = self.install_package_command(package)?;
        tracing::info!("Installing system package `{}`", package);
        cmd.run_checked(runner, &mut Progress::new(PolicyKind::Common))
    }

    /// Flags every CMake build on this platform receives.
    pub fn cmake_flags(&self) -> Vec<String> {
        match self.variant {
            PlatformVariant::Debian
            | PlatformVariant::RedHat
            | PlatformVariant::Arch
            | PlatformVariant::FreeBsd => vec!["-DCMAKE_POSITION_INDEPENDENT_CODE=ON".to_string()],
            PlatformVariant::MacOsxCommon => vec![
                "-DCMAKE_POSITION_INDEPENDENT_CODE=ON".to_string(),
                format!("-DCMAKE_OSX_DEPLOYMENT_TARGET={}", MACOSX_DEPLOYMENT_TARGET),
            ],
            PlatformVariant::WindowsMingw => Vec::new(),
            PlatformVariant::Android => vec![
                format!(
                    "-DCMAKE_TOOLCHAIN_FILE={}/build/cmake/android.toolchain.cmake",
                    ANDROID_NDK_ROOT
                ),
                format!("-DANDROID_ABI={}", self.android_abi()),
                format!("-DANDROID_PLATFORM={}", ANDROID_PLATFORM),
            ],
        }
    }

    /// Flags every configure-style build on this platform receives.
    pub fn configure_flags(&self) -> Vec<String> {
        match self.variant {
            PlatformVariant::Android => vec![format!("--host={}", self.android_triplet())],
            _ => Vec::new(),
        }
    }

    /// Extra environment for native tools on this platform.
    pub fn environment(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        match self.variant {
            PlatformVariant::MacOsxCommon => {
                env.insert(
                    "MACOSX_DEPLOYMENT_TARGET".to_string(),
                    MACOSX_DEPLOYMENT_TARGET.to_string(),
                );
            }
            PlatformVariant::Android => {
                env.insert("ANDROID_NDK_ROOT".to_string(), ANDROID_NDK_ROOT.to_string());
            }
            _ => {}
        }
        env
    }

    fn android_abi(&self) -> &'static str {
        match self.arch.name() {
            "i386" => "x86",
            _ => "armeabi-v7a",
        }
    }

    fn android_triplet(&self) -> &'static str {
        match self.arch.name() {
            "i386" => "i686-linux-android",
            _ => "arm-linux-androideabi",
        }
    }
}

impl fmt::Display for ResolvedPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.arch.name())
    }
}
