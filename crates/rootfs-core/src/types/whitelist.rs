//! Selective-extraction path whitelist.

use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use crate::security::path::clean_path;

/// A set of cleaned, root-relative paths to extract.
///
/// Members are cleaned on insertion with the same lexical rules applied to
/// entry paths, so `./etc//hosts`, `/etc/hosts` and `etc/hosts` all name
/// the same member.
///
/// # Examples
///
/// ```
/// use rootfs_core::types::PathWhitelist;
///
/// let whitelist: PathWhitelist = ["manifest", "./rootfs/etc/hosts"].into_iter().collect();
/// assert!(whitelist.contains("rootfs/etc/hosts"));
/// assert!(!whitelist.contains("rootfs/etc"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathWhitelist {
    paths: HashSet<PathBuf>,
}

impl PathWhitelist {
    /// Creates an empty whitelist. An empty whitelist admits nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a path.
    pub fn insert(&mut self, path: impl AsRef<Path>) -> bool {
        self.paths.insert(clean_path(path.as_ref()))
    }

    /// Returns `true` if the cleaned form of `path` is a member.
    #[must_use]
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.paths.contains(&clean_path(path.as_ref()))
    }

    /// Returns `true` if the already-cleaned path is a member.
    pub(crate) fn contains_clean(&self, clean: &Path) -> bool {
        self.paths.contains(clean)
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns `true` if the whitelist has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Iterates over the cleaned members.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }
}

impl<P: AsRef<Path>> FromIterator<P> for PathWhitelist {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        let mut whitelist = Self::new();
        for path in iter {
            whitelist.insert(path);
        }
        whitelist
    }
}

impl<P: AsRef<Path>> Extend<P> for PathWhitelist {
    fn extend<I: IntoIterator<Item = P>>(&mut self, iter: I) {
        for path in iter {
            self.insert(path);
        }
    }
}
