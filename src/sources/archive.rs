//! Archive sources - tarballs downloaded over HTTP and extracted in place.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use tar::Archive;
use url::Url;

use crate::util::hash::verify_sha256;

/// Download `url` into `dest_root`, keeping the URL's file name.
///
/// When `sha256` is given the body must match it before anything is written
/// under the final name.
pub fn download_file(url: &str, dest_root: &Path, sha256: Option<&str>) -> Result<PathBuf> {
    let file_name = archive_file_name(url)?;
    let dest = dest_root.join(&file_name);

    tracing::info!("Downloading {}", url);

    let response = reqwest::blocking::get(url)
        .with_context(|| format!("failed to download {}", url))?;

    if !response.status().is_success() {
        bail!("failed to download {}: HTTP {}", url, response.status());
    }

    let bytes = response
        .bytes()
        .with_context(|| format!("failed to read response body of {}", url))?;

    if let Some(expected) = sha256 {
        verify_sha256(&bytes, expected).with_context(|| format!("checksum mismatch for {}", url))?;
        tracing::debug!("Checksum verified for {}", file_name);
    }

    let mut tmp = tempfile::NamedTempFile::new_in(dest_root)
        .with_context(|| format!("failed to create temporary file in {}", dest_root.display()))?;
    tmp.write_all(&bytes)
        .with_context(|| format!("failed to write {}", dest.display()))?;
    tmp.persist(&dest)
        .with_context(|| format!("failed to persist {}", dest.display()))?;

    Ok(dest)
}

/// Extract a `.tar.gz`/`.tgz` archive into its own directory.
///
/// Returns the archive's single top-level directory.
pub fn extract_archive(archive: &Path) -> Result<PathBuf> {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !(name.ends_with(".tar.gz") || name.ends_with(".tgz")) {
        bail!("unsupported archive format: {}", archive.display());
    }

    let dest = archive
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let file = File::open(archive)
        .with_context(|| format!("failed to open archive {}", archive.display()))?;
    let mut tarball = Archive::new(GzDecoder::new(file));

    let mut roots = BTreeSet::new();
    for entry in tarball
        .entries()
        .with_context(|| format!("failed to read entries of {}", archive.display()))?
    {
        let mut entry = entry.context("failed to read archive entry")?;

        // `git archive` writes a pax_global_header entry ahead of the tree
        let entry_type = entry.header().entry_type();
        if entry_type.is_pax_global_extensions() || entry_type.is_pax_local_extensions() {
            continue;
        }

        let path = entry.path().context("failed to read entry path")?.into_owned();

        if let Some(Component::Normal(root)) = path
            .components()
            .find(|c| !matches!(c, Component::CurDir))
        {
            roots.insert(root.to_os_string());
        }

        // unpack_in refuses entries that would escape `dest`
        let unpacked = entry
            .unpack_in(&dest)
            .with_context(|| format!("failed to extract {}", path.display()))?;
        if !unpacked {
            tracing::warn!("Skipped archive entry outside destination: {}", path.display());
        }
    }

    let mut roots = roots.into_iter();
    match (roots.next(), roots.next()) {
        (Some(root), None) if dest.join(&root).is_dir() => {
            let root = dest.join(root);
            tracing::info!("Extracted {} to {}", archive.display(), root.display());
            Ok(root)
        }
        _ => bail!(
            "archive {} does not contain a single top-level directory",
            archive.display()
        ),
    }
}

fn archive_file_name(url: &str) -> Result<String> {
    let parsed = Url::parse(url).with_context(|| format!("invalid url `{}`", url))?;
    let name = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    if name.is_empty() {
        bail!("url `{}` does not name a file", url);
    }
    Ok(name.to_string())
}
