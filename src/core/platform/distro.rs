//! Linux distribution sniffing.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::builder::error::{BuildError, BuildResult};

const OS_RELEASE_PATHS: &[&str] = &["/etc/os-release", "/usr/lib/os-release"];

/// Linux distribution group, which decides the package manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Distribution {
    /// Debian, Ubuntu, Linux Mint.
    Debian,
    /// RHEL, CentOS, Fedora.
    RedHat,
    /// Arch Linux.
    Arch,
}

impl Distribution {
    /// Map a distribution identifier onto its group.
    pub fn from_id(id: &str) -> Option<Self> {
        match id.trim().to_uppercase().as_str() {
            "DEBIAN" | "UBUNTU" | "LINUXMINT" => Some(Distribution::Debian),
            "RHEL" | "CENTOS" | "CENTOS LINUX" | "FEDORA" => Some(Distribution::RedHat),
            "ARCH" => Some(Distribution::Arch),
            _ => None,
        }
    }

    /// Identify the distribution from the contents of an `os-release` file.
    ///
    /// `ID` is tried first, then every entry of `ID_LIKE` in order.
    pub fn from_os_release(contents: &str) -> BuildResult<Self> {
        let mut id = None;
        let mut id_like = None;

        for line in contents.lines() {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').trim_matches('\'');
            match key.trim() {
                "ID" => id = Some(value.to_string()),
                "ID_LIKE" => id_like = Some(value.to_string()),
                _ => {}
            }
        }

        let candidates = id
            .iter()
            .map(String::as_str)
            .chain(id_like.iter().flat_map(|like| like.split_whitespace()));

        for candidate in candidates {
            if let Some(distribution) = Distribution::from_id(candidate) {
                return Ok(distribution);
            }
        }

        Err(BuildError::UnsupportedEnvironment(format!(
            "unknown linux distribution '{}'",
            id.as_deref().unwrap_or("<missing ID>")
        )))
    }

    /// Detect the running host's distribution.
    pub fn detect() -> BuildResult<Self> {
        for path in OS_RELEASE_PATHS {
            let path = Path::new(path);
            if !path.exists() {
                continue;
            }
            let contents = std::fs::read_to_string(path)
                .map_err(|e| BuildError::io(format!("failed to read {}", path.display()), e))?;
            let distribution = Distribution::from_os_release(&contents)?;
            tracing::debug!("Detected {} distribution from {}", distribution, path.display());
            return Ok(distribution);
        }

        Err(BuildError::UnsupportedEnvironment(
            "cannot identify linux distribution: no os-release file".to_string(),
        ))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Distribution::Debian => "debian",
            Distribution::RedHat => "redhat",
            Distribution::Arch => "arch",
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Distribution {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debian" => Ok(Distribution::Debian),
            "redhat" | "rhel" => Ok(Distribution::RedHat),
            "arch" => Ok(Distribution::Arch),
            _ => Err(BuildError::UnsupportedEnvironment(format!(
                "invalid distribution '{}'; expected 'debian', 'redhat' or 'arch'",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ubuntu_is_debian() {
        let contents = r#"
NAME="Ubuntu"
VERSION="22.04.3 LTS (Jammy Jellyfish)"
ID=ubuntu
ID_LIKE=debian
"#;
        assert_eq!(Distribution::from_os_release(contents).unwrap(), Distribution::Debian);
    }

    #[test]
    fn test_centos_is_redhat() {
        let contents = "NAME=\"CentOS Linux\"\nID=\"centos\"\nID_LIKE=\"rhel fedora\"\n";
        assert_eq!(Distribution::from_os_release(contents).unwrap(), Distribution::RedHat);
    }

    #[test]
    fn test_falls_back_to_id_like() {
        let contents = "ID=rocky\nID_LIKE=\"rhel centos fedora\"\n";
        assert_eq!(Distribution::from_os_release(contents).unwrap(), Distribution::RedHat);
    }

    #[test]
    fn test_arch() {
        assert_eq!(Distribution::from_os_release("ID=arch\n").unwrap(), Distribution::Arch);
    }

    #[test]
    fn test_unknown_distribution_fails_loudly() {
        let err = Distribution::from_os_release("ID=alpine\n").unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedEnvironment(_)));
        assert!(err.to_string().contains("alpine"));

        let err = Distribution::from_os_release("").unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedEnvironment(_)));
    }

    #[test]
    fn test_parse_override() {
        assert_eq!("Debian".parse::<Distribution>().unwrap(), Distribution::Debian);
        assert!("gentoo".parse::<Distribution>().is_err());
    }
}
