//! High-level public API for rootfs materialization.

use std::io::Read;
use std::path::Path;

use crate::ExtractOptions;
use crate::ExtractionReport;
use crate::NoopProgress;
use crate::ProgressCallback;
use crate::Result;
use crate::extraction::Extractor;
use crate::formats::TarEntries;
use crate::types::EntryStream;
use crate::types::ExtractionTarget;

/// Materializes every admitted entry of `entries` under the target root.
///
/// Entries are processed strictly in stream order: each path is cleaned and
/// confined to the root, filtered by the whitelist, created according to
/// its kind, chowned to the shifted ids, and stamped with its mode and
/// times. Directory timestamps are applied after the last entry.
///
/// # Errors
///
/// Returns the first fatal error. Objects created before it stay on disk;
/// extract into a scratch directory and rename it if atomic publication is
/// needed.
///
/// # Examples
///
/// ```no_run
/// use rootfs_core::types::{EntryHeader, EntryKind, ExtractionTarget, VecEntries};
/// use rootfs_core::{ExtractOptions, UidRange, extract_all};
///
/// # fn main() -> Result<(), rootfs_core::ExtractionError> {
/// let mut entries = VecEntries::new()
///     .with(EntryHeader::new("rootfs/etc", EntryKind::Directory), "")
///     .with(EntryHeader::new("rootfs/etc/hostname", EntryKind::Regular), "box\n");
/// let target = ExtractionTarget::open("/var/lib/pods/1/rootfs")?.with_overwrite(true);
/// let options = ExtractOptions::default().with_uid_range(UidRange::new(100_000, 65536));
///
/// let report = extract_all(&mut entries, &target, &options)?;
/// println!("{} objects", report.total_items());
/// # Ok(())
/// # }
/// ```
pub fn extract_all<S: EntryStream + ?Sized>(
    entries: &mut S,
    target: &ExtractionTarget,
    options: &ExtractOptions,
) -> Result<ExtractionReport> {
    extract_all_with_progress(entries, target, options, &mut NoopProgress)
}

/// Like [`extract_all`], reporting progress through `progress`.
///
/// # Errors
///
/// Same as [`extract_all`].
pub fn extract_all_with_progress<S: EntryStream + ?Sized>(
    entries: &mut S,
    target: &ExtractionTarget,
    options: &ExtractOptions,
    progress: &mut dyn ProgressCallback,
) -> Result<ExtractionReport> {
    Extractor::new(target, options).run(entries, progress)
}

/// Materializes a tar stream.
///
/// `reader` yields raw tar bytes; use [`open_archive`](crate::open_archive)
/// for files that may be gzip-compressed.
///
/// # Errors
///
/// Same as [`extract_all`].
pub fn extract_tar<R: Read>(
    reader: R,
    target: &ExtractionTarget,
    options: &ExtractOptions,
) -> Result<ExtractionReport> {
    extract_tar_with_progress(reader, target, options, &mut NoopProgress)
}

/// Like [`extract_tar`], reporting progress through `progress`.
///
/// # Errors
///
/// Same as [`extract_all`].
pub fn extract_tar_with_progress<R: Read>(
    reader: R,
    target: &ExtractionTarget,
    options: &ExtractOptions,
    progress: &mut dyn ProgressCallback,
) -> Result<ExtractionReport> {
    let mut archive = tar::Archive::new(reader);
    let mut entries = TarEntries::new(&mut archive)?;
    extract_all_with_progress(&mut entries, target, options, progress)
}

/// Reads one regular file out of a tar stream.
///
/// # Errors
///
/// See [`read_file`](crate::read_file).
pub fn read_tar_file<R: Read>(reader: R, name: impl AsRef<Path>) -> Result<Vec<u8>> {
    let mut archive = tar::Archive::new(reader);
    let mut entries = TarEntries::new(&mut archive)?;
    crate::inspection::read_file(&mut entries, name)
}
