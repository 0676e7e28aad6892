//! Source retrieval.
//!
//! Recipes obtain their source trees through a [`SourceFetcher`]: either a
//! git clone or an archive download followed by extraction. The build core
//! only relies on the returned directory existing and holding the expected
//! build layout.

pub mod archive;
pub mod git;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

/// Retrieves library sources into a local directory.
pub trait SourceFetcher: Send + Sync {
    /// Clone `url` under `dest_root`, returning the checkout directory.
    ///
    /// With `strip_vcs` the `.git` directory is removed after checkout.
    fn clone_repository(
        &self,
        url: &str,
        branch: Option<&str>,
        strip_vcs: bool,
        dest_root: &Path,
    ) -> Result<PathBuf>;

    /// Download `url` into `dest_root`, returning the local file path.
    fn download_file(&self, url: &str, dest_root: &Path) -> Result<PathBuf>;

    /// Extract an archive next to itself, returning its top-level directory.
    fn extract_archive(&self, archive: &Path) -> Result<PathBuf>;
}

/// Fetches over the network with git2 and reqwest.
#[derive(Debug, Clone, Default)]
pub struct NetworkFetcher {
    /// Expected SHA-256 of downloads, keyed by URL
    checksums: HashMap<String, String>,
}

impl NetworkFetcher {
    pub fn new() -> Self {
        NetworkFetcher::default()
    }

    /// Verify downloads against the given url -> sha256 table.
    pub fn with_checksums(mut self, checksums: HashMap<String, String>) -> Self {
        self.checksums = checksums;
        self
    }
}

impl SourceFetcher for NetworkFetcher {
    fn clone_repository(
        &self,
        url: &str,
        branch: Option<&str>,
        strip_vcs: bool,
        dest_root: &Path,
    ) -> Result<PathBuf> {
        git::clone_repository(url, branch, strip_vcs, dest_root)
    }

    fn download_file(&self, url: &str, dest_root: &Path) -> Result<PathBuf> {
        archive::download_file(url, dest_root, self.checksums.get(url).map(String::as_str))
    }

    fn extract_archive(&self, archive: &Path) -> Result<PathBuf> {
        archive::extract_archive(archive)
    }
}
