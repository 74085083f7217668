//! Validated extraction root.

use crate::ExtractionError;
use crate::Result;
use std::path::Path;
use std::path::PathBuf;

/// A validated root directory for rootfs materialization.
///
/// This type represents a directory that has been validated to:
/// - Exist on the filesystem
/// - Be a directory (not a file)
/// - Be writable by the current process
/// - Be represented as an absolute canonical path
///
/// # Examples
///
/// ```no_run
/// use rootfs_core::types::RootDir;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let root = RootDir::new("/var/lib/pods/1234/rootfs")?;
/// println!("Extracting to: {}", root.as_path().display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDir(PathBuf);

impl RootDir {
    /// Creates a new `RootDir` after validating the path.
    ///
    /// The path is canonicalized, so a root given through a symlink is
    /// pinned to the real directory. Later swaps of the directory itself
    /// are not defended against; the root is expected to be owned by the
    /// caller for the duration of the extraction.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The path does not exist
    /// - The path exists but is not a directory
    /// - The path cannot be canonicalized
    /// - The directory is not writable
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(ExtractionError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("root directory does not exist: {}", path.display()),
            )));
        }

        if !path.is_dir() {
            return Err(ExtractionError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("path is not a directory: {}", path.display()),
            )));
        }

        let canonical = path.canonicalize().map_err(|e| {
            ExtractionError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to canonicalize path {}: {}", path.display(), e),
            ))
        })?;

        rustix::fs::access(&canonical, rustix::fs::Access::WRITE_OK).map_err(|_| {
            ExtractionError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("directory is not writable: {}", canonical.display()),
            ))
        })?;

        Ok(Self(canonical))
    }

    /// Returns the path as a `&Path`.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Joins an already-cleaned relative path onto the root.
    #[inline]
    #[must_use]
    pub fn join(&self, relative: &Path) -> PathBuf {
        self.0.join(relative)
    }

    /// Converts into the inner `PathBuf`.
    #[inline]
    #[must_use]
    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

/// Where and how an extraction writes: the root plus the overwrite flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionTarget {
    root: RootDir,
    overwrite: bool,
}

impl ExtractionTarget {
    /// Creates a target that does not overwrite existing objects.
    #[must_use]
    pub fn new(root: RootDir) -> Self {
        Self {
            root,
            overwrite: false,
        }
    }

    /// Validates `path` as a root and wraps it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        RootDir::new(path).map(Self::new)
    }

    /// Sets the overwrite flag.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// The extraction root.
    #[must_use]
    pub fn root(&self) -> &RootDir {
        &self.root
    }

    /// Whether existing objects are replaced.
    #[must_use]
    pub fn overwrite(&self) -> bool {
        self.overwrite
    }
}
