//! Git sources - library sources cloned from repositories.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use git2::build::RepoBuilder;
use url::Url;

/// Clone `url` into `dest_root/<repository name>`.
///
/// A stale checkout with the same name is removed first. With `strip_vcs`
/// the `.git` directory is deleted so the tree is a plain source snapshot.
pub fn clone_repository(
    url: &str,
    branch: Option<&str>,
    strip_vcs: bool,
    dest_root: &Path,
) -> Result<PathBuf> {
    let checkout_path = dest_root.join(repository_dir_name(url)?);

    if checkout_path.exists() {
        std::fs::remove_dir_all(&checkout_path).with_context(|| {
            format!("failed to remove stale checkout {}", checkout_path.display())
        })?;
    }

    match branch {
        Some(branch) => tracing::info!("Cloning {} ({})", url, branch),
        None => tracing::info!("Cloning {}", url),
    }

    let mut builder = RepoBuilder::new();
    if let Some(branch) = branch {
        builder.branch(branch);
    }
    builder
        .clone(url, &checkout_path)
        .with_context(|| format!("failed to clone {}", url))?;

    if strip_vcs {
        let git_dir = checkout_path.join(".git");
        std::fs::remove_dir_all(&git_dir)
            .with_context(|| format!("failed to remove {}", git_dir.display()))?;
    }

    Ok(checkout_path)
}

/// Directory name a repository URL is cloned into.
///
/// Handles both URLs (`https://host/org/name.git`) and scp-style remotes
/// (`git@host:org/name.git`).
pub fn repository_dir_name(url: &str) -> Result<String> {
    let path = match Url::parse(url) {
        Ok(parsed) if parsed.has_host() => parsed.path().to_string(),
        _ => url
            .rsplit_once(':')
            .map(|(_, path)| path.to_string())
            .unwrap_or_else(|| url.to_string()),
    };

    let last = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    let name = last.strip_suffix(".git").unwrap_or(last);

    if name.is_empty() {
        bail!("cannot derive a directory name from repository url `{}`", url);
    }
    Ok(name.to_string())
}
