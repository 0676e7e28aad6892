//! Distributable package formats.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Package format a platform family can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PackageType {
    #[serde(rename = "DEB")]
    Deb,
    #[serde(rename = "RPM")]
    Rpm,
    #[serde(rename = "TGZ")]
    Tgz,
    #[serde(rename = "NSIS")]
    Nsis,
    #[serde(rename = "ZIP")]
    Zip,
    #[serde(rename = "DragNDrop")]
    DragNDrop,
    #[serde(rename = "APK")]
    Apk,
}

impl PackageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageType::Deb => "DEB",
            PackageType::Rpm => "RPM",
            PackageType::Tgz => "TGZ",
            PackageType::Nsis => "NSIS",
            PackageType::Zip => "ZIP",
            PackageType::DragNDrop => "DragNDrop",
            PackageType::Apk => "APK",
        }
    }

    /// File extension of a package of this type.
    pub fn extension(&self) -> &'static str {
        match self {
            PackageType::Deb => "deb",
            PackageType::Rpm => "rpm",
            PackageType::Tgz => "tar.gz",
            PackageType::Nsis => "exe",
            PackageType::Zip => "zip",
            PackageType::DragNDrop => "dmg",
            PackageType::Apk => "apk",
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEB" => Ok(PackageType::Deb),
            "RPM" => Ok(PackageType::Rpm),
            "TGZ" => Ok(PackageType::Tgz),
            "NSIS" => Ok(PackageType::Nsis),
            "ZIP" => Ok(PackageType::Zip),
            "DragNDrop" => Ok(PackageType::DragNDrop),
            "APK" => Ok(PackageType::Apk),
            _ => Err(format!("unknown package type '{}'", s)),
        }
    }
}
