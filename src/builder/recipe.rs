//! Per-library compile flags.

/// Patch sets and extra configure flags for one recipe invocation.
///
/// Always constructed fresh per call; appending never leaks into other
/// builds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileRecipeFlags {
    patches: Vec<String>,
    flags: Vec<String>,
}

impl CompileRecipeFlags {
    pub fn new<P, F>(patches: P, flags: F) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        CompileRecipeFlags {
            patches: patches.into_iter().map(Into::into).collect(),
            flags: flags.into_iter().map(Into::into).collect(),
        }
    }

    /// Only configure flags, no patch sets.
    pub fn with_flags<F>(flags: F) -> Self
    where
        F: IntoIterator,
        F::Item: Into<String>,
    {
        CompileRecipeFlags::new(Vec::<String>::new(), flags)
    }

    /// Patch-set identifiers (subdirectories of the patch root).
    pub fn patches(&self) -> &[String] {
        &self.patches
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    pub fn extend_patches(&mut self, patches: impl IntoIterator<Item = impl Into<String>>) {
        self.patches.extend(patches.into_iter().map(Into::into));
    }

    pub fn extend_flags(&mut self, flags: impl IntoIterator<Item = impl Into<String>>) {
        self.flags.extend(flags.into_iter().map(Into::into));
    }
}
