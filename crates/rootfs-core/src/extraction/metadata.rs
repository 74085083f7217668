//! Ownership, mode and timestamp restoration.
//!
//! Order matters: ownership first, then mode (`lchown` may clear
//! setuid/setgid), then timestamps. Directory timestamps are recorded as
//! [`DeferredDirTimestamp`] and applied only after the whole stream, since
//! creating children bumps a directory's mtime.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::path::PathBuf;

use rustix::fs::AtFlags;
use rustix::fs::CWD;
use rustix::fs::Timespec;
use rustix::fs::Timestamps;
use rustix::io::Errno;

use crate::Result;
use crate::types::EntryHeader;
use crate::types::EntryTime;

/// Permission bits kept from an entry mode (rwx plus setuid/setgid/sticky).
pub const PERMISSION_BITS: u32 = 0o7777;

fn timespec(time: EntryTime) -> Timespec {
    Timespec {
        tv_sec: time.secs,
        tv_nsec: time.nanos.into(),
    }
}

/// Converts an entry's access/modify times into the pair used by
/// `utimensat`.
///
/// Entries without an access time use the modify time for both.
///
/// # Examples
///
/// ```
/// use rootfs_core::entry_timestamps;
/// use rootfs_core::types::{EntryHeader, EntryKind, EntryTime};
///
/// let header = EntryHeader::new("etc/hosts", EntryKind::Regular)
///     .with_mtime(EntryTime::new(1_600_000_000, 500));
/// let times = entry_timestamps(&header);
/// assert_eq!(times.last_modification.tv_sec, 1_600_000_000);
/// assert_eq!(times.last_access.tv_sec, 1_600_000_000);
/// ```
#[must_use]
pub fn entry_timestamps(header: &EntryHeader) -> Timestamps {
    times_of(header.atime.unwrap_or(header.mtime), header.mtime)
}

fn times_of(atime: EntryTime, mtime: EntryTime) -> Timestamps {
    Timestamps {
        last_access: timespec(atime),
        last_modification: timespec(mtime),
    }
}

/// A directory whose timestamps are applied after the entry stream ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredDirTimestamp {
    /// Absolute on-disk path.
    pub path: PathBuf,
    /// Access time to restore.
    pub atime: EntryTime,
    /// Modification time to restore.
    pub mtime: EntryTime,
}

impl DeferredDirTimestamp {
    /// Records the times of a directory entry materialized at `path`.
    #[must_use]
    pub fn new(path: PathBuf, header: &EntryHeader) -> Self {
        Self {
            path,
            atime: header.atime.unwrap_or(header.mtime),
            mtime: header.mtime,
        }
    }

    /// Applies the recorded times.
    ///
    /// Skipped when a later entry replaced the directory with something
    /// else, so a symlink left at the path is never followed.
    pub fn apply(&self) -> Result<()> {
        match fs::symlink_metadata(&self.path) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                tracing::trace!(path = %self.path.display(), "replaced, skipping times");
                return Ok(());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        }
        rustix::fs::utimensat(
            CWD,
            &self.path,
            &times_of(self.atime, self.mtime),
            AtFlags::SYMLINK_NOFOLLOW,
        )
        .map_err(std::io::Error::from)?;
        Ok(())
    }
}

/// Sets ownership without following a final symlink.
pub fn restore_ownership(path: &Path, uid: u32, gid: u32) -> Result<()> {
    std::os::unix::fs::lchown(path, Some(uid), Some(gid))?;
    Ok(())
}

/// Returns `true` if `path` itself is a symlink.
///
/// Decided from disk, not from the entry kind: a hard link to a symlink is
/// a symlink too.
fn is_symlink(path: &Path) -> Result<bool> {
    Ok(fs::symlink_metadata(path)?.file_type().is_symlink())
}

/// Re-applies the entry mode after ownership changed. Symlinks are left
/// alone: their mode is meaningless and `chmod` would follow them.
pub fn restore_mode(path: &Path, mode: u32) -> Result<()> {
    if is_symlink(path)? {
        return Ok(());
    }
    fs::set_permissions(path, fs::Permissions::from_mode(mode & PERMISSION_BITS))?;
    Ok(())
}

/// Applies the entry's access/modify times immediately.
///
/// The final component is never followed. A platform that cannot stamp a
/// symlink itself is tolerated; every other failure is returned.
pub fn restore_timestamps(path: &Path, header: &EntryHeader) -> Result<()> {
    let times = entry_timestamps(header);
    let Err(errno) = rustix::fs::utimensat(CWD, path, &times, AtFlags::SYMLINK_NOFOLLOW) else {
        return Ok(());
    };
    if (errno == Errno::NOSYS || errno == Errno::OPNOTSUPP) && is_symlink(path)? {
        tracing::warn!(
            path = %path.display(),
            %errno,
            "symlink timestamps not supported, leaving them unchanged"
        );
        return Ok(());
    }
    Err(std::io::Error::from(errno).into())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::EntryKind;
    use std::os::unix::fs::MetadataExt;
    use tempfile::TempDir;

    #[test]
    fn test_entry_timestamps_with_atime() {
        let header = EntryHeader::new("f", EntryKind::Regular)
            .with_mtime(EntryTime::new(2000, 7))
            .with_atime(EntryTime::new(1000, 3));
        let times = entry_timestamps(&header);
        assert_eq!(times.last_access.tv_sec, 1000);
        assert_eq!(times.last_access.tv_nsec, 3);
        assert_eq!(times.last_modification.tv_sec, 2000);
        assert_eq!(times.last_modification.tv_nsec, 7);
    }

    #[test]
    fn test_restore_timestamps_regular_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("file");
        fs::write(&path, b"x").unwrap();

        let header = EntryHeader::new("file", EntryKind::Regular)
            .with_mtime(EntryTime::new(1_234_567_890, 250_000_000))
            .with_atime(EntryTime::from_secs(1_000_000_000));
        restore_timestamps(&path, &header).unwrap();

        let meta = fs::metadata(&path).unwrap();
        assert_eq!(meta.mtime(), 1_234_567_890);
        assert_eq!(meta.mtime_nsec(), 250_000_000);
        assert_eq!(meta.atime(), 1_000_000_000);
    }

    #[test]
    fn test_restore_timestamps_symlink_not_followed() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        fs::write(&target, b"x").unwrap();
        let target_mtime = fs::metadata(&target).unwrap().mtime();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink("target", &link).unwrap();

        let header = EntryHeader::new(
            "link",
            EntryKind::Symlink {
                target: PathBuf::from("target"),
            },
        )
        .with_mtime(EntryTime::from_secs(86_400));
        restore_timestamps(&link, &header).unwrap();

        assert_eq!(fs::symlink_metadata(&link).unwrap().mtime(), 86_400);
        assert_eq!(fs::metadata(&target).unwrap().mtime(), target_mtime);
    }

    #[test]
    fn test_restore_mode_skips_symlink() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        fs::write(&target, b"x").unwrap();
        fs::set_permissions(&target, fs::Permissions::from_mode(0o600)).unwrap();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink("target", &link).unwrap();

        restore_mode(&link, 0o777).unwrap();
        assert_eq!(fs::metadata(&target).unwrap().mode() & 0o777, 0o600);

        restore_mode(&target, 0o4755).unwrap();
        assert_eq!(fs::metadata(&target).unwrap().mode() & PERMISSION_BITS, 0o4755);
    }

    #[test]
    fn test_deferred_dir_timestamp_apply() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("dir");
        fs::create_dir(&dir).unwrap();

        let header = EntryHeader::new("dir", EntryKind::Directory)
            .with_mtime(EntryTime::from_secs(500_000));
        let deferred = DeferredDirTimestamp::new(dir.clone(), &header);
        fs::write(dir.join("child"), b"bump").unwrap();
        deferred.apply().unwrap();

        let meta = fs::metadata(&dir).unwrap();
        assert_eq!(meta.mtime(), 500_000);
        assert_eq!(meta.atime(), 500_000);
    }

    #[test]
    fn test_restore_timestamps_hardlinked_symlink_not_followed() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        fs::write(&target, b"x").unwrap();
        fs::set_permissions(&target, fs::Permissions::from_mode(0o600)).unwrap();
        let target_mtime = fs::metadata(&target).unwrap().mtime();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink("target", &link).unwrap();
        let second = temp.path().join("second");
        fs::hard_link(&link, &second).unwrap();

        // The entry says regular file, the disk says symlink
        let header = EntryHeader::new("second", EntryKind::Regular)
            .with_mtime(EntryTime::from_secs(1234));
        restore_timestamps(&second, &header).unwrap();
        restore_mode(&second, 0o4777).unwrap();

        let meta = fs::metadata(&target).unwrap();
        assert_eq!(meta.mtime(), target_mtime);
        assert_eq!(meta.mode() & PERMISSION_BITS, 0o600);
    }

    #[test]
    fn test_deferred_dir_timestamp_skips_replaced_directory() {
        let temp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let outside_mtime = fs::metadata(outside.path()).unwrap().mtime();
        let dir = temp.path().join("dir");
        fs::create_dir(&dir).unwrap();

        let header = EntryHeader::new("dir", EntryKind::Directory)
            .with_mtime(EntryTime::from_secs(1234));
        let deferred = DeferredDirTimestamp::new(dir.clone(), &header);
        fs::remove_dir(&dir).unwrap();
        std::os::unix::fs::symlink(outside.path(), &dir).unwrap();
        deferred.apply().unwrap();

        assert_eq!(fs::metadata(outside.path()).unwrap().mtime(), outside_mtime);
        assert_ne!(fs::symlink_metadata(&dir).unwrap().mtime(), 1234);
    }

    #[test]
    fn test_restore_ownership_to_self() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("file");
        fs::write(&path, b"x").unwrap();

        let uid = rustix::process::geteuid().as_raw();
        let gid = rustix::process::getegid().as_raw();
        restore_ownership(&path, uid, gid).unwrap();

        let meta = fs::metadata(&path).unwrap();
        assert_eq!((meta.uid(), meta.gid()), (uid, gid));
    }
}
