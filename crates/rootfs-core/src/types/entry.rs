//! Decoded archive entries and the stream boundary they arrive through.

use std::collections::VecDeque;
use std::io::Cursor;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use crate::Result;

/// Kind of filesystem object an entry describes.
///
/// The set is closed: anything a decoder produces that the materializer
/// cannot create ends up in [`EntryKind::Unsupported`] with its raw type
/// code, and extraction of such an entry fails.
///
/// # Examples
///
/// ```
/// use rootfs_core::types::EntryKind;
/// use std::path::PathBuf;
///
/// let link = EntryKind::Symlink {
///     target: PathBuf::from("../lib/libc.so.6"),
/// };
/// assert!(link.is_symlink());
/// assert_eq!(EntryKind::Fifo.code(), b'6');
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file with content.
    Regular,

    /// Directory.
    Directory,

    /// Symbolic link. The target is stored verbatim and never rebased.
    Symlink {
        /// Raw link target.
        target: PathBuf,
    },

    /// Hard link to an earlier entry, named by its archive path.
    Hardlink {
        /// Archive path of the link target.
        target: PathBuf,
    },

    /// Character device node.
    CharDevice {
        /// Device major number.
        major: u32,
        /// Device minor number.
        minor: u32,
    },

    /// Block device node.
    BlockDevice {
        /// Device major number.
        major: u32,
        /// Device minor number.
        minor: u32,
    },

    /// Named pipe.
    Fifo,

    /// Any type the decoder produced that has no variant above.
    Unsupported {
        /// Raw type code (tar typeflag).
        code: u8,
    },
}

impl EntryKind {
    /// Returns the tar typeflag byte conventionally used for this kind.
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Self::Regular => b'0',
            Self::Hardlink { .. } => b'1',
            Self::Symlink { .. } => b'2',
            Self::CharDevice { .. } => b'3',
            Self::BlockDevice { .. } => b'4',
            Self::Directory => b'5',
            Self::Fifo => b'6',
            Self::Unsupported { code } => *code,
        }
    }

    /// Returns `true` if this is a regular file.
    #[must_use]
    pub const fn is_regular(&self) -> bool {
        matches!(self, Self::Regular)
    }

    /// Returns `true` if this is a directory.
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        matches!(self, Self::Directory)
    }

    /// Returns `true` if this is a symlink.
    #[must_use]
    pub const fn is_symlink(&self) -> bool {
        matches!(self, Self::Symlink { .. })
    }

    /// Returns `true` if this is a hard link.
    #[must_use]
    pub const fn is_hardlink(&self) -> bool {
        matches!(self, Self::Hardlink { .. })
    }
}

/// A point in time as recorded in an archive header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EntryTime {
    /// Seconds since the Unix epoch (may be negative).
    pub secs: i64,
    /// Sub-second nanoseconds, `0..1_000_000_000`.
    pub nanos: u32,
}

impl EntryTime {
    /// Creates a time from seconds and nanoseconds.
    ///
    /// Nanoseconds beyond one second are clamped.
    #[must_use]
    pub const fn new(secs: i64, nanos: u32) -> Self {
        let nanos = if nanos > 999_999_999 {
            999_999_999
        } else {
            nanos
        };
        Self { secs, nanos }
    }

    /// Creates a time with whole-second precision.
    #[must_use]
    pub const fn from_secs(secs: i64) -> Self {
        Self { secs, nanos: 0 }
    }
}

/// Metadata of one decoded entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    /// Path as encoded in the archive (not cleaned).
    pub path: PathBuf,
    /// Kind of object, including link targets and device numbers.
    pub kind: EntryKind,
    /// Permission bits, including setuid/setgid/sticky.
    pub mode: u32,
    /// Owner uid as recorded in the image.
    pub uid: u32,
    /// Owner gid as recorded in the image.
    pub gid: u32,
    /// Content length in bytes.
    pub size: u64,
    /// Modification time.
    pub mtime: EntryTime,
    /// Access time, when the archive recorded one.
    pub atime: Option<EntryTime>,
}

impl EntryHeader {
    /// Creates a header with root ownership, epoch timestamps, and the
    /// conventional default mode for the kind (`0o755` for directories,
    /// `0o777` for symlinks, `0o644` otherwise).
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, kind: EntryKind) -> Self {
        let mode = match kind {
            EntryKind::Directory => 0o755,
            EntryKind::Symlink { .. } => 0o777,
            _ => 0o644,
        };
        Self {
            path: path.into(),
            kind,
            mode,
            uid: 0,
            gid: 0,
            size: 0,
            mtime: EntryTime::default(),
            atime: None,
        }
    }

    /// Sets the permission bits.
    #[must_use]
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the owner.
    #[must_use]
    pub fn with_owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    /// Sets the content length.
    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Sets the modification time.
    #[must_use]
    pub fn with_mtime(mut self, mtime: EntryTime) -> Self {
        self.mtime = mtime;
        self
    }

    /// Sets the access time.
    #[must_use]
    pub fn with_atime(mut self, atime: EntryTime) -> Self {
        self.atime = Some(atime);
        self
    }

    /// Returns the raw archive path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// One entry of a sequential archive.
///
/// The content reader borrows the stream: it is only readable until the
/// stream is advanced again.
pub struct ArchiveEntry<'a> {
    /// Entry metadata.
    pub header: EntryHeader,
    content: Box<dyn Read + 'a>,
}

impl<'a> ArchiveEntry<'a> {
    /// Pairs a header with its content reader.
    #[must_use]
    pub fn new(header: EntryHeader, content: impl Read + 'a) -> Self {
        Self {
            header,
            content: Box::new(content),
        }
    }
}

impl Read for ArchiveEntry<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.content.read(buf)
    }
}

impl std::fmt::Debug for ArchiveEntry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveEntry")
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

/// A source of decoded entries, in archive order.
///
/// Implementors report decoder failures as
/// [`ExtractionError::Decode`](crate::ExtractionError::Decode) and signal
/// the end of the archive with `Ok(None)`.
pub trait EntryStream {
    /// Advances to the next entry.
    fn next_entry(&mut self) -> Result<Option<ArchiveEntry<'_>>>;
}

impl<S: EntryStream + ?Sized> EntryStream for &mut S {
    fn next_entry(&mut self) -> Result<Option<ArchiveEntry<'_>>> {
        (**self).next_entry()
    }
}

/// An in-memory entry stream.
///
/// Useful when entries were decoded by some other means, and in tests.
///
/// # Examples
///
/// ```
/// use rootfs_core::types::{EntryHeader, EntryKind, VecEntries};
///
/// let mut entries = VecEntries::new();
/// entries.push(EntryHeader::new("etc", EntryKind::Directory), Vec::new());
/// entries.push(
///     EntryHeader::new("etc/hostname", EntryKind::Regular),
///     b"box\n".to_vec(),
/// );
/// assert_eq!(entries.len(), 2);
/// ```
#[derive(Debug, Default, Clone)]
pub struct VecEntries {
    entries: VecDeque<(EntryHeader, Vec<u8>)>,
}

impl VecEntries {
    /// Creates an empty stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry. The header size is set from the content length.
    pub fn push(&mut self, mut header: EntryHeader, content: Vec<u8>) {
        header.size = content.len() as u64;
        self.entries.push_back((header, content));
    }

    /// Appends an entry, builder style.
    #[must_use]
    pub fn with(mut self, header: EntryHeader, content: impl Into<Vec<u8>>) -> Self {
        self.push(header, content.into());
        self
    }

    /// Returns the number of entries not yet consumed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` once every entry has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl EntryStream for VecEntries {
    fn next_entry(&mut self) -> Result<Option<ArchiveEntry<'_>>> {
        Ok(self
            .entries
            .pop_front()
            .map(|(header, content)| ArchiveEntry::new(header, Cursor::new(content))))
    }
}

impl FromIterator<(EntryHeader, Vec<u8>)> for VecEntries {
    fn from_iter<I: IntoIterator<Item = (EntryHeader, Vec<u8>)>>(iter: I) -> Self {
        let mut entries = Self::new();
        for (header, content) in iter {
            entries.push(header, content);
        }
        entries
    }
}
