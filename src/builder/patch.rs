//! Source patch application.
//!
//! Patches live under `<patch root>/<patch set>/`, one file per patch whose
//! name contains `.patch` after a non-empty stem (`fix.patch`,
//! `fix.patch.v2`). A recipe names the
//! patch sets it wants; sets that do not exist are skipped, since patches
//! are optional per library and version.

use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::builder::context::BuildContext;
use crate::builder::error::{BuildError, BuildResult};
use crate::builder::progress::{PolicyKind, Progress};
use crate::util::process::ProcessBuilder;

/// File name pattern of a patch file.
pub const PATCH_FILE_PATTERN: &str = "?*.patch*";

/// Collect the patch files of `patch_sets` in application order.
///
/// Sets are taken in the given order; files within a set are sorted by name.
pub fn collect_patches(patch_root: &Path, patch_sets: &[String]) -> BuildResult<Vec<PathBuf>> {
    let pattern = Pattern::new(PATCH_FILE_PATTERN).map_err(|e| BuildError::Patch {
        patch: patch_root.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut patches = Vec::new();
    for set in patch_sets {
        let dir = patch_root.join(set);
        if !dir.is_dir() {
            tracing::debug!("No patches for `{}` in {}", set, patch_root.display());
            continue;
        }

        let entries = std::fs::read_dir(&dir)
            .map_err(|e| BuildError::io(format!("failed to read {}", dir.display()), e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| BuildError::io(format!("failed to read {}", dir.display()), e))?;
            let path = entry.path();
            let matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| pattern.matches(n));
            if matches && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        patches.extend(files);
    }

    Ok(patches)
}

/// Apply every patch of `patch_sets` to `source_dir` with `patch -p0`.
///
/// Returns the number of patches applied. A failing patch aborts with
/// [`BuildError::Patch`].
pub fn apply_patches(
    ctx: &BuildContext,
    source_dir: &Path,
    patch_root: &Path,
    patch_sets: &[String],
) -> BuildResult<usize> {
    let patches = collect_patches(patch_root, patch_sets)?;

    for patch in &patches {
        tracing::info!("Applying patch {}", patch.display());

        let contents = std::fs::read(patch)
            .map_err(|e| BuildError::io(format!("failed to read patch {}", patch.display()), e))?;

        let cmd = ctx.prepare(ProcessBuilder::new("patch").arg("-p0").stdin(contents), source_dir);
        cmd.run_checked(ctx.runner(), &mut Progress::hidden(PolicyKind::Common))
            .map_err(|e| BuildError::Patch {
                patch: patch.clone(),
                message: e.to_string(),
            })?;
    }

    Ok(patches.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;

    use tempfile::TempDir;

    use crate::test_support::RecordingRunner;

    fn ctx(runner: &RecordingRunner, root: &Path) -> BuildContext {
        BuildContext::new(root.join("prefix"), root.to_path_buf(), Arc::new(runner.clone()))
    }

    #[test]
    fn test_missing_patch_set_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let runner = RecordingRunner::new();

        let applied = apply_patches(
            &ctx(&runner, tmp.path()),
            tmp.path(),
            &tmp.path().join("patches"),
            &["openssl".to_string()],
        )
        .unwrap();

        assert_eq!(applied, 0);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_patches_applied_in_sorted_order() {
        let tmp = TempDir::new().unwrap();
        let set = tmp.path().join("patches/libev");
        fs::create_dir_all(&set).unwrap();
        fs::write(set.join("02-second.patch"), "second").unwrap();
        fs::write(set.join("01-first.patch"), "first").unwrap();
        fs::write(set.join("README"), "not a patch").unwrap();
        fs::write(set.join(".patch"), "no stem").unwrap();

        let source = tmp.path().join("libev");
        fs::create_dir_all(&source).unwrap();
        let runner = RecordingRunner::new();

        let applied = apply_patches(
            &ctx(&runner, tmp.path()),
            &source,
            &tmp.path().join("patches"),
            &["libev".to_string()],
        )
        .unwrap();

        assert_eq!(applied, 2);
        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].get_stdin(), Some(&b"first"[..]));
        assert_eq!(calls[1].get_stdin(), Some(&b"second"[..]));
        for call in &calls {
            assert_eq!(call.display_command(), "patch -p0");
            assert_eq!(call.get_cwd(), Some(source.as_path()));
        }
    }

    #[test]
    fn test_suffixed_patch_names_are_collected() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("patches");
        fs::create_dir_all(root.join("openssl")).unwrap();
        fs::write(root.join("openssl/fix.patch.v2"), "v2").unwrap();
        fs::write(root.join("openssl/fix.patch"), "v1").unwrap();
        fs::write(root.join("openssl/fix.diff"), "diff").unwrap();

        let patches = collect_patches(&root, &["openssl".to_string()]).unwrap();

        assert_eq!(
            patches,
            vec![root.join("openssl/fix.patch"), root.join("openssl/fix.patch.v2")]
        );
    }

    #[test]
    fn test_patch_sets_keep_recipe_order() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("patches");
        fs::create_dir_all(root.join("b")).unwrap();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::write(root.join("b/x.patch"), "b").unwrap();
        fs::write(root.join("a/y.patch"), "a").unwrap();

        let patches = collect_patches(&root, &["b".to_string(), "a".to_string()]).unwrap();

        assert_eq!(patches, vec![root.join("b/x.patch"), root.join("a/y.patch")]);
    }

    #[test]
    fn test_failed_patch_is_patch_error() {
        let tmp = TempDir::new().unwrap();
        let set = tmp.path().join("patches/jsonc");
        fs::create_dir_all(&set).unwrap();
        fs::write(set.join("fix.patch"), "broken").unwrap();
        let runner = RecordingRunner::new().fail_program("patch", 1);

        let err = apply_patches(
            &ctx(&runner, tmp.path()),
            tmp.path(),
            &tmp.path().join("patches"),
            &["jsonc".to_string()],
        )
        .unwrap_err();

        assert!(err.is_patch_failure());
    }
}
