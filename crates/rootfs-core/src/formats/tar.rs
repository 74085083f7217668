//! Tar decoder adapter.
//!
//! Turns a [`tar::Archive`] into an [`EntryStream`]. GNU long names and pax
//! `path`/`linkpath` records are handled by the `tar` crate; this module
//! adds pax `mtime`/`atime` with nanosecond precision and the GNU atime
//! field.

use std::io;
use std::io::Read;
use std::path::PathBuf;

use crate::ExtractionError;
use crate::Result;
use crate::types::ArchiveEntry;
use crate::types::EntryHeader;
use crate::types::EntryKind;
use crate::types::EntryStream;
use crate::types::EntryTime;

/// Entry stream over a tar archive.
///
/// # Examples
///
/// ```no_run
/// use rootfs_core::formats::tar::TarEntries;
/// use rootfs_core::types::EntryStream;
/// use std::fs::File;
///
/// # fn main() -> Result<(), rootfs_core::ExtractionError> {
/// let mut archive = tar::Archive::new(File::open("image.aci")?);
/// let mut entries = TarEntries::new(&mut archive)?;
/// while let Some(entry) = entries.next_entry()? {
///     println!("{}", entry.header.path.display());
/// }
/// # Ok(())
/// # }
/// ```
pub struct TarEntries<'a, R: 'a + Read> {
    entries: tar::Entries<'a, R>,
}

impl<'a, R: 'a + Read> TarEntries<'a, R> {
    /// Starts iterating `archive` from its first entry.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::Decode`] if the archive was already
    /// partially consumed.
    pub fn new(archive: &'a mut tar::Archive<R>) -> Result<Self> {
        let entries = archive.entries().map_err(ExtractionError::Decode)?;
        Ok(Self { entries })
    }
}

impl<R: Read> std::fmt::Debug for TarEntries<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TarEntries").finish_non_exhaustive()
    }
}

impl<'a, R: 'a + Read> EntryStream for TarEntries<'a, R> {
    fn next_entry(&mut self) -> Result<Option<ArchiveEntry<'_>>> {
        let Some(entry) = self.entries.next() else {
            return Ok(None);
        };
        let mut entry = entry.map_err(ExtractionError::Decode)?;
        let header = convert_header(&mut entry)?;
        Ok(Some(ArchiveEntry::new(header, entry)))
    }
}

fn invalid_data(message: String) -> ExtractionError {
    ExtractionError::Decode(io::Error::new(io::ErrorKind::InvalidData, message))
}

fn convert_header<R: Read>(entry: &mut tar::Entry<'_, R>) -> Result<EntryHeader> {
    let path = entry
        .path()
        .map_err(ExtractionError::Decode)?
        .into_owned();
    let kind = convert_kind(entry, &path)?;

    let raw = entry.header();
    let mode = raw.mode().map_err(ExtractionError::Decode)?;
    let uid = raw.uid().map_err(ExtractionError::Decode)?;
    let gid = raw.gid().map_err(ExtractionError::Decode)?;
    let uid = u32::try_from(uid).map_err(|_| invalid_data(format!("uid {uid} out of range")))?;
    let gid = u32::try_from(gid).map_err(|_| invalid_data(format!("gid {gid} out of range")))?;
    let mtime = raw.mtime().map_err(ExtractionError::Decode)?;
    let mut mtime = EntryTime::from_secs(i64::try_from(mtime).unwrap_or(i64::MAX));
    let mut atime = raw
        .as_gnu()
        .and_then(|gnu| gnu.atime().ok())
        .filter(|&secs| secs != 0)
        .map(|secs| EntryTime::from_secs(i64::try_from(secs).unwrap_or(i64::MAX)));
    let size = entry.size();

    if let Some(extensions) = entry.pax_extensions().map_err(ExtractionError::Decode)? {
        for extension in extensions {
            let extension = extension.map_err(ExtractionError::Decode)?;
            let (Ok(key), Ok(value)) = (extension.key(), extension.value()) else {
                continue;
            };
            match key {
                "mtime" => mtime = parse_pax_time(value).unwrap_or(mtime),
                "atime" => atime = parse_pax_time(value).or(atime),
                _ => {}
            }
        }
    }

    let mut header = EntryHeader::new(path, kind)
        .with_mode(mode)
        .with_owner(uid, gid)
        .with_size(size)
        .with_mtime(mtime);
    if let Some(atime) = atime {
        header = header.with_atime(atime);
    }
    Ok(header)
}

fn convert_kind<R: Read>(entry: &tar::Entry<'_, R>, path: &std::path::Path) -> Result<EntryKind> {
    let raw = entry.header();
    let link_target = || -> Result<PathBuf> {
        entry
            .link_name()
            .map_err(ExtractionError::Decode)?
            .map(std::borrow::Cow::into_owned)
            .ok_or_else(|| ExtractionError::InvalidEntry {
                path: path.to_path_buf(),
                reason: "link entry without target".into(),
            })
    };
    let device = || -> Result<(u32, u32)> {
        let major = raw.device_major().map_err(ExtractionError::Decode)?;
        let minor = raw.device_minor().map_err(ExtractionError::Decode)?;
        Ok((major.unwrap_or(0), minor.unwrap_or(0)))
    };

    let kind = match raw.entry_type() {
        tar::EntryType::Regular | tar::EntryType::Continuous => EntryKind::Regular,
        tar::EntryType::Directory => EntryKind::Directory,
        tar::EntryType::Symlink => EntryKind::Symlink {
            target: link_target()?,
        },
        tar::EntryType::Link => EntryKind::Hardlink {
            target: link_target()?,
        },
        tar::EntryType::Char => {
            let (major, minor) = device()?;
            EntryKind::CharDevice { major, minor }
        }
        tar::EntryType::Block => {
            let (major, minor) = device()?;
            EntryKind::BlockDevice { major, minor }
        }
        tar::EntryType::Fifo => EntryKind::Fifo,
        other => EntryKind::Unsupported {
            code: other.as_byte(),
        },
    };
    Ok(kind)
}

/// Parses a pax time record (`"1350244992.023960108"`, `"-1.5"`).
///
/// Fractions beyond nanoseconds are truncated.
///
/// # Examples
///
/// ```
/// use rootfs_core::formats::tar::parse_pax_time;
/// use rootfs_core::types::EntryTime;
///
/// assert_eq!(parse_pax_time("12.5"), Some(EntryTime::new(12, 500_000_000)));
/// assert_eq!(parse_pax_time("-1.25"), Some(EntryTime::new(-2, 750_000_000)));
/// assert_eq!(parse_pax_time("soon"), None);
/// ```
#[must_use]
pub fn parse_pax_time(value: &str) -> Option<EntryTime> {
    let (secs, fraction) = value.split_once('.').unwrap_or((value, ""));
    let negative = secs.starts_with('-');
    let secs: i64 = secs.parse().ok()?;

    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits = &fraction[..fraction.len().min(9)];
    let mut nanos: u32 = if digits.is_empty() { 0 } else { digits.parse().ok()? };
    for _ in digits.len()..9 {
        nanos *= 10;
    }

    if negative && nanos > 0 {
        return Some(EntryTime::new(secs.checked_sub(1)?, 1_000_000_000 - nanos));
    }
    Some(EntryTime::new(secs, nanos))
}
