//! Error types for rootfs materialization.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `ExtractionError`.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Errors that can occur while materializing or reading an image rootfs.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Filesystem or syscall failure (permission denied, missing privilege,
    /// disk full, ...).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The entry stream could not produce the next entry.
    #[error("error decoding archive: {0}")]
    Decode(#[source] std::io::Error),

    /// The entry carries a type code the materializer cannot create.
    #[error("unsupported entry type {code:#04x} for {path}")]
    UnsupportedEntryType {
        /// Raw entry path.
        path: PathBuf,
        /// Type code reported by the decoder.
        code: u8,
    },

    /// A uid or gid could not be shifted into the configured range.
    #[error("uid {uid} or gid {gid} out of range (shift={shift}, count={count})")]
    UidRange {
        /// Unshifted uid.
        uid: u32,
        /// Unshifted gid.
        gid: u32,
        /// Configured shift.
        shift: u32,
        /// Configured window size (0 = unbounded).
        count: u32,
    },

    /// A uid range could not be parsed from its text form.
    #[error("invalid uid range: {0}")]
    InvalidUidRange(String),

    /// A hard link references a target that does not exist on disk.
    #[error("hardlink target not found: {link} -> {target}")]
    MissingHardlinkTarget {
        /// Destination of the hard link.
        link: PathBuf,
        /// Destination of the link target.
        target: PathBuf,
    },

    /// Too many symlinks were followed while resolving a path inside the
    /// root.
    #[error("too many levels of symbolic links resolving {path}")]
    SymlinkLoop {
        /// Root-relative path being resolved.
        path: PathBuf,
    },

    /// The entry is structurally unusable.
    #[error("invalid entry {path}: {reason}")]
    InvalidEntry {
        /// Raw entry path.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// The extraction was cancelled between two entries.
    #[error("extraction cancelled")]
    Cancelled,

    /// The requested file is not present in the archive.
    #[error("file not found in archive: {name}")]
    NotFound {
        /// Requested name.
        name: PathBuf,
    },

    /// The requested file exists but is not a regular file.
    #[error("requested file is not a regular file: {name}")]
    NotRegularFile {
        /// Requested name.
        name: PathBuf,
    },
}

impl ExtractionError {
    /// Returns `true` if this error aborts an extraction in progress.
    ///
    /// Lookup outcomes of [`read_file`](crate::read_file) and uid range
    /// parse failures are reported to the caller but never occur mid-stream.
    ///
    /// # Examples
    ///
    /// ```
    /// use rootfs_core::ExtractionError;
    /// use std::path::PathBuf;
    ///
    /// let err = ExtractionError::NotFound {
    ///     name: PathBuf::from("manifest"),
    /// };
    /// assert!(!err.is_fatal());
    ///
    /// let err = ExtractionError::Cancelled;
    /// assert!(err.is_fatal());
    /// ```
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::NotFound { .. } | Self::NotRegularFile { .. } | Self::InvalidUidRange(_)
        )
    }

    /// Returns `true` if the error originates from the archive contents
    /// rather than from the host.
    ///
    /// # Examples
    ///
    /// ```
    /// use rootfs_core::ExtractionError;
    /// use std::path::PathBuf;
    ///
    /// let err = ExtractionError::UnsupportedEntryType {
    ///     path: PathBuf::from("dev/odd"),
    ///     code: b'S',
    /// };
    /// assert!(err.is_archive_error());
    ///
    /// let err = ExtractionError::Io(std::io::Error::other("disk full"));
    /// assert!(!err.is_archive_error());
    /// ```
    #[must_use]
    pub const fn is_archive_error(&self) -> bool {
        matches!(
            self,
            Self::Decode(_)
                | Self::UnsupportedEntryType { .. }
                | Self::UidRange { .. }
                | Self::MissingHardlinkTarget { .. }
                | Self::SymlinkLoop { .. }
                | Self::InvalidEntry { .. }
        )
    }

    /// Returns the underlying OS error, if any.
    #[must_use]
    pub fn io_error(&self) -> Option<&std::io::Error> {
        match self {
            Self::Io(err) | Self::Decode(err) => Some(err),
            _ => None,
        }
    }
}
