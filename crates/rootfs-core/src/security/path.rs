//! Path confinement: lexical cleaning, whitelist filtering and scoped
//! symlink resolution.
//!
//! Entry paths never escape the root. Lexically, `..` is clamped at the root
//! the way `/..` is `/`. On disk, symlinks met among the parent components
//! of a destination are followed as if the root were `/`, so a link such as
//! `etc -> /` or `lib -> ../../..` created earlier in the same archive keeps
//! pointing inside the root.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::fs;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use crate::ExtractionError;
use crate::Result;
use crate::types::PathWhitelist;
use crate::types::RootDir;

/// Symlinks followed while resolving a single path before giving up
/// (`MAXSYMLINKS` on Linux).
pub const MAX_SYMLINK_HOPS: usize = 40;

/// Lexically cleans an archive path into a root-relative path.
///
/// `.` and empty components are dropped, `..` removes the previous
/// component and is ignored at the root, and a leading `/` is discarded.
/// The empty path denotes the root itself.
///
/// # Examples
///
/// ```
/// use rootfs_core::security::path::clean_path;
/// use std::path::Path;
///
/// assert_eq!(clean_path(Path::new("./etc//hosts")), Path::new("etc/hosts"));
/// assert_eq!(clean_path(Path::new("../../etc/passwd")), Path::new("etc/passwd"));
/// assert_eq!(clean_path(Path::new("/")), Path::new(""));
/// ```
#[must_use]
pub fn clean_path(raw: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in raw.components() {
        match component {
            Component::Normal(name) => cleaned.push(name),
            Component::ParentDir => {
                cleaned.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    cleaned
}

enum Step {
    Up,
    Down(OsString),
}

fn steps(path: &Path) -> VecDeque<Step> {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(Step::Down(name.to_os_string())),
            Component::ParentDir => Some(Step::Up),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => None,
        })
        .collect()
}

/// Resolves `relative` against `root`, following every symlink on the way
/// as if `root` were the filesystem root.
///
/// Absolute link targets restart at the root, relative ones continue from
/// the link's directory, and `..` never climbs above the root. Components
/// that do not exist yet are taken literally. The result is relative to
/// `root`.
///
/// # Errors
///
/// Returns [`ExtractionError::SymlinkLoop`] after [`MAX_SYMLINK_HOPS`]
/// links, or an I/O error if a link cannot be read.
pub fn resolve_in_root(root: &Path, relative: &Path) -> Result<PathBuf> {
    let mut resolved = PathBuf::new();
    let mut pending = steps(relative);
    let mut hops = 0;

    while let Some(step) = pending.pop_front() {
        let name = match step {
            Step::Up => {
                resolved.pop();
                continue;
            }
            Step::Down(name) => name,
        };

        let candidate = resolved.join(&name);
        let on_disk = root.join(&candidate);
        let is_symlink =
            fs::symlink_metadata(&on_disk).is_ok_and(|meta| meta.file_type().is_symlink());
        if !is_symlink {
            resolved = candidate;
            continue;
        }

        hops += 1;
        if hops > MAX_SYMLINK_HOPS {
            return Err(ExtractionError::SymlinkLoop {
                path: relative.to_path_buf(),
            });
        }

        let target = fs::read_link(&on_disk)?;
        if target.has_root() {
            resolved.clear();
        }
        let mut expanded = steps(&target);
        expanded.extend(pending);
        pending = expanded;
    }

    Ok(resolved)
}

/// An entry path after confinement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Lexically cleaned, root-relative path (whitelist key).
    pub relative: PathBuf,
    /// Absolute on-disk destination. Parent symlinks are resolved inside
    /// the root; the final component is kept as is.
    pub absolute: PathBuf,
}

impl ResolvedPath {
    /// Returns `true` if the entry names the root itself.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.relative.as_os_str().is_empty()
    }
}

/// Maps raw entry paths to confined destinations under a root.
#[derive(Debug, Clone, Copy)]
pub struct PathResolver<'a> {
    root: &'a RootDir,
    whitelist: Option<&'a PathWhitelist>,
}

impl<'a> PathResolver<'a> {
    /// Creates a resolver. Without a whitelist every entry is admitted.
    #[must_use]
    pub fn new(root: &'a RootDir, whitelist: Option<&'a PathWhitelist>) -> Self {
        Self { root, whitelist }
    }

    /// Resolves an entry path, or returns `None` if the whitelist excludes
    /// it. Filtering happens before any filesystem access.
    pub fn resolve_entry(&self, raw: &Path) -> Result<Option<ResolvedPath>> {
        let relative = clean_path(raw);
        if let Some(whitelist) = self.whitelist
            && !whitelist.contains_clean(&relative)
        {
            return Ok(None);
        }
        let absolute = self.destination(&relative)?;
        Ok(Some(ResolvedPath { relative, absolute }))
    }

    /// Resolves a hard link target the same way as an entry path, without
    /// whitelist filtering.
    pub fn resolve_link_target(&self, raw: &Path) -> Result<PathBuf> {
        self.destination(&clean_path(raw))
    }

    fn destination(&self, relative: &Path) -> Result<PathBuf> {
        let Some(name) = relative.file_name() else {
            return Ok(self.root.as_path().to_path_buf());
        };
        let parent = relative.parent().unwrap_or_else(|| Path::new(""));
        let parent = resolve_in_root(self.root.as_path(), parent)?;
        Ok(self.root.join(&parent).join(name))
    }
}
