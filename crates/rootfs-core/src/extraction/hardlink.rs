//! Hard links waiting for their target.
//!
//! Only metadata is buffered: the link path, its confined target and the
//! header needed to restore ownership, mode and times once it exists.

use std::path::PathBuf;

use crate::types::EntryHeader;

/// A hard link whose target had not been materialized yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingHardlink {
    /// Absolute path of the link to create.
    pub link: PathBuf,
    /// Absolute, confined target path.
    pub target: PathBuf,
    /// Original entry header.
    pub header: EntryHeader,
    /// Shifted owner.
    pub uid: u32,
    /// Shifted group.
    pub gid: u32,
}

/// Deferred hard links, in archive order.
#[derive(Debug, Default)]
pub struct PendingHardlinks {
    links: Vec<PendingHardlink>,
}

impl PendingHardlinks {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remembers a link for later.
    pub fn push(&mut self, link: PendingHardlink) {
        self.links.push(link);
    }

    /// Returns the number of buffered links.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns `true` if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Takes the links whose target now exists according to `exists`,
    /// keeping the rest buffered. Archive order is preserved in both.
    pub fn take_ready(
        &mut self,
        mut exists: impl FnMut(&PendingHardlink) -> bool,
    ) -> Vec<PendingHardlink> {
        let (ready, waiting) = std::mem::take(&mut self.links)
            .into_iter()
            .partition(|link| exists(link));
        self.links = waiting;
        ready
    }

    /// Drains whatever is still buffered.
    pub fn drain(&mut self) -> impl Iterator<Item = PendingHardlink> + '_ {
        self.links.drain(..)
    }
}
