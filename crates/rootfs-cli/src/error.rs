//! Error conversion utilities for CLI.
//!
//! Converts rootfs-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use rootfs_core::ExtractionError;
use std::io::ErrorKind;
use std::path::Path;

/// Converts `ExtractionError` to user-friendly anyhow error with context
pub fn convert_extraction_error(err: ExtractionError, archive: &Path) -> anyhow::Error {
    match err {
        ExtractionError::NotFound { name } => {
            anyhow!(
                "File '{}' not found in '{}'\n\
                 HINT: Paths are matched after cleaning, e.g. 'rootfs/etc/hosts'.",
                name.display(),
                archive.display()
            )
        }
        ExtractionError::NotRegularFile { name } => {
            anyhow!(
                "'{}' in '{}' is not a regular file",
                name.display(),
                archive.display()
            )
        }
        ExtractionError::UidRange {
            uid,
            gid,
            shift,
            count,
        } => {
            anyhow!(
                "Owner {uid}:{gid} in '{}' does not fit uid range {shift}:{count}\n\
                 HINT: Use a larger COUNT in --uid-range.",
                archive.display()
            )
        }
        ExtractionError::MissingHardlinkTarget { link, target } => {
            anyhow!(
                "Hard link '{}' in '{}' points to '{}', which is not extracted yet\n\
                 HINT: Use --defer-hardlinks for archives that list links before their target.",
                link.display(),
                archive.display(),
                target.display()
            )
        }
        ExtractionError::SymlinkLoop { path } => {
            anyhow!(
                "Too many levels of symbolic links resolving '{}' from '{}'\n\
                 HINT: The root directory may already contain a symlink cycle.",
                path.display(),
                archive.display()
            )
        }
        ExtractionError::UnsupportedEntryType { code, path } => {
            anyhow!(
                "Archive '{}' contains unsupported entry type {code:#04x} at '{}'",
                archive.display(),
                path.display()
            )
        }
        ExtractionError::Decode(io_err) => {
            anyhow!(
                "Invalid archive '{}': {}\n\
                 HINT: The archive may be corrupted or truncated.",
                archive.display(),
                io_err
            )
        }
        ExtractionError::Io(io_err) if io_err.kind() == ErrorKind::PermissionDenied => {
            anyhow!(
                "Permission denied while processing '{}': {}\n\
                 HINT: Restoring ownership and device nodes requires root.",
                archive.display(),
                io_err
            )
        }
        ExtractionError::Io(io_err) => {
            anyhow!(
                "I/O error while processing '{}': {}",
                archive.display(),
                io_err
            )
        }
        _ => anyhow::Error::from(err)
            .context(format!("Error processing archive '{}'", archive.display())),
    }
}

/// Adds context to a generic error about archive operations
pub fn add_archive_context<T>(
    result: Result<T, ExtractionError>,
    archive: &Path,
) -> anyhow::Result<T> {
    result.map_err(|e| convert_extraction_error(e, archive))
}
