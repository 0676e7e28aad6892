//! Filesystem utilities.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::builder::error::{BuildError, BuildResult};

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> BuildResult<()> {
    if path.exists() {
        fs::remove_dir_all(path).map_err(|e| {
            BuildError::io(format!("failed to remove directory {}", path.display()), e)
        })?;
    }
    Ok(())
}

/// Destroy `path` if present and create it again, empty.
pub fn recreate_dir(path: &Path) -> BuildResult<()> {
    remove_dir_all_if_exists(path)?;
    fs::create_dir_all(path)
        .map_err(|e| BuildError::io(format!("failed to create directory {}", path.display()), e))
}

/// Add the executable bits to `path`, leaving other mode bits untouched.
#[cfg(unix)]
pub fn ensure_executable(path: &Path) -> BuildResult<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path)
        .map_err(|e| BuildError::io(format!("failed to stat {}", path.display()), e))?;
    let mut permissions = metadata.permissions();
    let mode = permissions.mode();
    if mode & 0o111 != 0o111 {
        permissions.set_mode(mode | 0o111);
        fs::set_permissions(path, permissions).map_err(|e| {
            BuildError::io(format!("failed to make {} executable", path.display()), e)
        })?;
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn ensure_executable(path: &Path) -> BuildResult<()> {
    fs::metadata(path)
        .map(|_| ())
        .map_err(|e| BuildError::io(format!("failed to stat {}", path.display()), e))
}

/// Normalize path separators to `/`.
pub fn stable_path(path: &Path) -> PathBuf {
    PathBuf::from(path.to_string_lossy().replace('\\', "/"))
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    let home = || directories::BaseDirs::new().map(|b| b.home_dir().to_path_buf());

    if path_str == "~" {
        home().unwrap_or_else(|| path.to_path_buf())
    } else if let Some(rest) = path_str.strip_prefix("~/").or_else(|| path_str.strip_prefix("~\\")) {
        match home() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        }
    } else {
        path.to_path_buf()
    }
}

/// Resolve `.` and `..` components lexically, without touching the filesystem.
///
/// `..` directly below the root stays at the root.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Expand `~`, make the path absolute against `base`, drop `.`/`..` and
/// normalize separators.
///
/// The path does not need to exist.
pub fn absolute_path(path: &Path, base: &Path) -> PathBuf {
    let expanded = expand_home(path);
    let absolute = if expanded.is_absolute() || expanded.to_string_lossy().starts_with('/') {
        expanded
    } else {
        base.join(expanded)
    };
    stable_path(&normalize_path(&absolute))
}
