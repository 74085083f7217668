//! Core extraction engine.

use std::path::Path;
use std::time::Instant;

use tracing::debug;
use tracing::trace;

use super::hardlink::PendingHardlink;
use super::hardlink::PendingHardlinks;
use super::materialize;
use super::metadata;
use super::metadata::DeferredDirTimestamp;
use crate::ExtractOptions;
use crate::ExtractionError;
use crate::ExtractionReport;
use crate::ProgressCallback;
use crate::Result;
use crate::config::HardlinkPolicy;
use crate::copy::CopyBuffer;
use crate::security::PathResolver;
use crate::security::ResolvedPath;
use crate::security::UmaskGuard;
use crate::types::ArchiveEntry;
use crate::types::EntryHeader;
use crate::types::EntryKind;
use crate::types::EntryStream;
use crate::types::ExtractionTarget;

/// Lifecycle of one extraction run.
///
/// `Idle -> Streaming -> Finalizing -> Done`, or `Aborted` from any phase on
/// the first fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing has been read yet.
    Idle,
    /// Entries are being materialized in archive order.
    Streaming,
    /// Deferred hard links and directory timestamps are being applied.
    Finalizing,
    /// The rootfs is complete.
    Done,
    /// A fatal error stopped the run. Partial output is left on disk.
    Aborted,
}

/// Materializes an entry stream under an extraction target.
///
/// The process umask is cleared for the duration of [`run`](Self::run), so
/// concurrent extractions in one process run one after another.
///
/// # Examples
///
/// ```no_run
/// use rootfs_core::ExtractOptions;
/// use rootfs_core::NoopProgress;
/// use rootfs_core::extraction::Extractor;
/// use rootfs_core::types::{EntryHeader, EntryKind, ExtractionTarget, VecEntries};
///
/// # fn main() -> Result<(), rootfs_core::ExtractionError> {
/// let target = ExtractionTarget::open("/var/lib/images/rootfs")?;
/// let options = ExtractOptions::default();
/// let mut entries =
///     VecEntries::new().with(EntryHeader::new("etc/hostname", EntryKind::Regular), "box\n");
///
/// let mut extractor = Extractor::new(&target, &options);
/// let report = extractor.run(&mut entries, &mut NoopProgress)?;
/// assert_eq!(report.files_extracted, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Extractor<'a> {
    target: &'a ExtractionTarget,
    options: &'a ExtractOptions,
    phase: Phase,
    report: ExtractionReport,
    deferred_dirs: Vec<DeferredDirTimestamp>,
    pending_links: PendingHardlinks,
    buffer: Box<CopyBuffer>,
}

impl<'a> Extractor<'a> {
    /// Creates an idle extractor.
    #[must_use]
    pub fn new(target: &'a ExtractionTarget, options: &'a ExtractOptions) -> Self {
        Self {
            target,
            options,
            phase: Phase::Idle,
            report: ExtractionReport::new(),
            deferred_dirs: Vec::new(),
            pending_links: PendingHardlinks::new(),
            buffer: Box::default(),
        }
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Consumes `entries` and materializes them.
    ///
    /// # Errors
    ///
    /// Stops at the first fatal error; everything written so far stays on
    /// disk.
    pub fn run<S: EntryStream + ?Sized>(
        &mut self,
        entries: &mut S,
        progress: &mut dyn ProgressCallback,
    ) -> Result<ExtractionReport> {
        let started = Instant::now();
        self.report = ExtractionReport::new();
        self.deferred_dirs.clear();
        self.pending_links = PendingHardlinks::new();

        let umask = UmaskGuard::unrestricted();
        debug!(
            root = %self.target.root().as_path().display(),
            previous_umask = format_args!("{:#o}", umask.previous()),
            "starting extraction"
        );

        let result = self
            .stream(entries, progress)
            .and_then(|()| self.finalize(progress));
        drop(umask);

        match result {
            Ok(()) => {
                self.transition(Phase::Done);
                self.report.duration = started.elapsed();
                Ok(std::mem::take(&mut self.report))
            }
            Err(err) => {
                self.transition(Phase::Aborted);
                debug!(error = %err, "extraction aborted");
                Err(err)
            }
        }
    }

    fn transition(&mut self, next: Phase) {
        debug!(from = ?self.phase, to = ?next, "extraction phase");
        self.phase = next;
    }

    fn stream<S: EntryStream + ?Sized>(
        &mut self,
        entries: &mut S,
        progress: &mut dyn ProgressCallback,
    ) -> Result<()> {
        self.transition(Phase::Streaming);
        let target = self.target;
        let options = self.options;
        let resolver = PathResolver::new(target.root(), options.whitelist.as_ref());
        let mut index = 0usize;

        loop {
            if options.is_cancelled() {
                return Err(ExtractionError::Cancelled);
            }
            let Some(mut entry) = entries.next_entry()? else {
                break;
            };
            index += 1;

            let Some(dest) = resolver.resolve_entry(entry.header.path())? else {
                trace!(path = %entry.header.path.display(), "not whitelisted, skipping");
                self.report.entries_skipped += 1;
                continue;
            };

            progress.on_entry_start(&dest.relative, index);
            self.materialize(&resolver, &mut entry, &dest, progress)?;
            progress.on_entry_complete(&dest.relative);
        }

        Ok(())
    }

    fn materialize(
        &mut self,
        resolver: &PathResolver<'_>,
        entry: &mut ArchiveEntry<'_>,
        dest: &ResolvedPath,
        progress: &mut dyn ProgressCallback,
    ) -> Result<()> {
        let header = entry.header.clone();
        let path = dest.absolute.as_path();

        if let EntryKind::Unsupported { code } = header.kind {
            return Err(ExtractionError::UnsupportedEntryType {
                path: header.path,
                code,
            });
        }
        if dest.is_root() && !header.kind.is_directory() {
            return Err(ExtractionError::InvalidEntry {
                path: header.path,
                reason: "only a directory may replace the root".into(),
            });
        }
        let (uid, gid) = self.options.uid_range.shift(header.uid, header.gid)?;

        if self.target.overwrite() {
            materialize::remove_existing(path, &header.kind)?;
        }
        materialize::create_parent(path)?;

        debug!(path = %dest.relative.display(), kind = ?header.kind, "materializing entry");
        match &header.kind {
            EntryKind::Regular => {
                let written = materialize::write_regular_file(
                    path,
                    header.mode,
                    entry,
                    &mut self.buffer,
                    &mut |n| progress.on_bytes_written(n),
                )?;
                self.report.bytes_written = self.report.bytes_written.saturating_add(written);
            }
            EntryKind::Directory => materialize::create_directory(path, header.mode)?,
            EntryKind::Symlink { target } => materialize::create_symlink(target, path)?,
            EntryKind::Hardlink { target } => {
                let target = resolver.resolve_link_target(target)?;
                if !materialize::link_target_exists(&target)
                    && self.options.hardlinks == HardlinkPolicy::Deferred
                {
                    trace!(
                        link = %path.display(),
                        target = %target.display(),
                        "hardlink target missing, deferring"
                    );
                    self.pending_links.push(PendingHardlink {
                        link: path.to_path_buf(),
                        target,
                        header,
                        uid,
                        gid,
                    });
                    self.report.hardlinks_deferred += 1;
                    return Ok(());
                }
                materialize::create_hardlink(&target, path)?;
            }
            EntryKind::CharDevice { .. } | EntryKind::BlockDevice { .. } | EntryKind::Fifo => {
                materialize::create_node(path, &header.kind, header.mode)?;
            }
            EntryKind::Unsupported { code } => {
                return Err(ExtractionError::UnsupportedEntryType {
                    path: header.path.clone(),
                    code: *code,
                });
            }
        }

        self.restore_metadata(path, &header, uid, gid)
    }

    fn restore_metadata(
        &mut self,
        path: &Path,
        header: &EntryHeader,
        uid: u32,
        gid: u32,
    ) -> Result<()> {
        metadata::restore_ownership(path, uid, gid)?;
        metadata::restore_mode(path, header.mode)?;
        if header.kind.is_directory() {
            self.deferred_dirs
                .push(DeferredDirTimestamp::new(path.to_path_buf(), header));
        } else {
            metadata::restore_timestamps(path, header)?;
        }
        self.report.record(&header.kind);
        Ok(())
    }

    fn finalize(&mut self, progress: &mut dyn ProgressCallback) -> Result<()> {
        self.transition(Phase::Finalizing);
        self.resolve_pending_links()?;

        debug!(count = self.deferred_dirs.len(), "restoring directory timestamps");
        for dir in &self.deferred_dirs {
            dir.apply()?;
        }

        progress.on_complete();
        Ok(())
    }

    /// Creates deferred links until none is left, retrying while each pass
    /// makes progress so links whose target is itself a deferred link
    /// resolve regardless of order.
    fn resolve_pending_links(&mut self) -> Result<()> {
        while !self.pending_links.is_empty() {
            let ready = self
                .pending_links
                .take_ready(|link| materialize::link_target_exists(&link.target));
            if ready.is_empty() {
                break;
            }
            for link in ready {
                debug!(link = %link.link.display(), "creating deferred hardlink");
                materialize::create_hardlink(&link.target, &link.link)?;
                self.restore_metadata(&link.link, &link.header, link.uid, link.gid)?;
            }
        }

        match self.pending_links.drain().next() {
            Some(link) => Err(ExtractionError::MissingHardlinkTarget {
                link: link.link,
                target: link.target,
            }),
            None => Ok(()),
        }
    }
}
