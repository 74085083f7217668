//! Extraction reporting and progress callbacks.

use std::path::Path;
use std::time::Duration;

use crate::types::EntryKind;

/// Counters describing a finished extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Regular files written.
    pub files_extracted: usize,

    /// Directories created or merged into.
    pub directories_created: usize,

    /// Symlinks created.
    pub symlinks_created: usize,

    /// Hard links created, including deferred ones.
    pub hardlinks_created: usize,

    /// Character and block device nodes created.
    pub devices_created: usize,

    /// Fifos created.
    pub fifos_created: usize,

    /// Entries excluded by the whitelist.
    pub entries_skipped: usize,

    /// Hard links that had to wait for their target.
    pub hardlinks_deferred: usize,

    /// Regular file content bytes written.
    pub bytes_written: u64,

    /// Wall time of the extraction.
    pub duration: Duration,
}

impl ExtractionReport {
    /// Creates a new empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one materialized entry of the given kind.
    pub fn record(&mut self, kind: &EntryKind) {
        match kind {
            EntryKind::Regular => self.files_extracted += 1,
            EntryKind::Directory => self.directories_created += 1,
            EntryKind::Symlink { .. } => self.symlinks_created += 1,
            EntryKind::Hardlink { .. } => self.hardlinks_created += 1,
            EntryKind::CharDevice { .. } | EntryKind::BlockDevice { .. } => {
                self.devices_created += 1;
            }
            EntryKind::Fifo => self.fifos_created += 1,
            EntryKind::Unsupported { .. } => {}
        }
    }

    /// Returns the number of filesystem objects created.
    #[must_use]
    pub fn total_items(&self) -> usize {
        self.files_extracted
            + self.directories_created
            + self.symlinks_created
            + self.hardlinks_created
            + self.devices_created
            + self.fifos_created
    }
}

/// Callback trait for progress reporting during extraction.
///
/// Entry streams are sequential, so the total entry count is unknown
/// upfront; `index` counts entries seen so far, starting at 1.
///
/// # Examples
///
/// ```
/// use rootfs_core::ProgressCallback;
/// use std::path::Path;
///
/// struct Printer;
///
/// impl ProgressCallback for Printer {
///     fn on_entry_start(&mut self, path: &Path, index: usize) {
///         println!("{index}: {}", path.display());
///     }
///
///     fn on_bytes_written(&mut self, _bytes: u64) {}
///
///     fn on_entry_complete(&mut self, _path: &Path) {}
///
///     fn on_complete(&mut self) {
///         println!("done");
///     }
/// }
/// ```
pub trait ProgressCallback: Send {
    /// Called before an admitted entry is materialized.
    fn on_entry_start(&mut self, path: &Path, index: usize);

    /// Called for every chunk of regular file content written.
    fn on_bytes_written(&mut self, bytes: u64);

    /// Called after an entry and its metadata are on disk.
    fn on_entry_complete(&mut self, path: &Path);

    /// Called once the directory timestamp pass has finished.
    fn on_complete(&mut self);
}

/// No-op implementation of `ProgressCallback`.
#[derive(Debug, Default)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_entry_start(&mut self, _path: &Path, _index: usize) {}

    fn on_bytes_written(&mut self, _bytes: u64) {}

    fn on_entry_complete(&mut self, _path: &Path) {}

    fn on_complete(&mut self) {}
}
