//! Filesystem object creation for each entry kind.
//!
//! Every function here takes an already confined absolute path. Ownership,
//! mode re-application and timestamps are handled by
//! [`metadata`](super::metadata) afterwards.

use std::fs;
use std::fs::DirBuilder;
use std::fs::OpenOptions;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::os::unix::fs::DirBuilderExt;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use rustix::fs::CWD;
use rustix::fs::FileType;
use rustix::fs::Mode;

use super::metadata::PERMISSION_BITS;
use crate::ExtractionError;
use crate::Result;
use crate::copy::CopyBuffer;
use crate::copy::copy_entry_content;
use crate::types::EntryKind;

/// Mode used for parent directories that have no entry of their own.
pub const IMPLICIT_DIR_MODE: u32 = 0o755;

/// Clears whatever occupies `path` before an entry is written there.
///
/// A directory entry landing on an existing directory merges into it;
/// every other combination removes the existing object (recursively for
/// directories). A missing path is not an error.
pub fn remove_existing(path: &Path, kind: &EntryKind) -> Result<()> {
    let existing = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    if existing.is_dir() {
        if kind.is_directory() {
            return Ok(());
        }
        tracing::trace!(path = %path.display(), "removing existing directory");
        fs::remove_dir_all(path)?;
    } else {
        tracing::trace!(path = %path.display(), "removing existing entry");
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Creates the missing parent directories of `path` with mode 0755.
pub fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        DirBuilder::new()
            .recursive(true)
            .mode(IMPLICIT_DIR_MODE)
            .create(parent)?;
    }
    Ok(())
}

/// Writes a regular file from the entry content and returns the number of
/// bytes written.
///
/// An existing file is truncated. The final component is opened with
/// `O_NOFOLLOW`, so a symlink left at `path` fails the entry instead of
/// redirecting the write.
pub fn write_regular_file<R: Read + ?Sized>(
    path: &Path,
    mode: u32,
    content: &mut R,
    buffer: &mut CopyBuffer,
    on_chunk: &mut dyn FnMut(u64),
) -> Result<u64> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode & PERMISSION_BITS)
        .custom_flags(libc::O_NOFOLLOW)
        .open(path)?;

    let mut writer = BufWriter::with_capacity(buffer.size(), file);
    let written = copy_entry_content(content, &mut writer, buffer, on_chunk)?;
    writer.flush()?;
    Ok(written)
}

/// Creates a directory (and any missing parents) and applies `mode`.
///
/// Existing directories are kept; only their mode changes. A symlink at
/// `path` is refused with `ELOOP`, like the `O_NOFOLLOW` open of a regular
/// file, since it would redirect the mode and times.
pub fn create_directory(path: &Path, mode: u32) -> Result<()> {
    if fs::symlink_metadata(path).is_ok_and(|meta| meta.file_type().is_symlink()) {
        return Err(std::io::Error::from(rustix::io::Errno::LOOP).into());
    }
    DirBuilder::new()
        .recursive(true)
        .mode(mode & PERMISSION_BITS)
        .create(path)?;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & PERMISSION_BITS))?;
    Ok(())
}

/// Creates a symlink holding `target` verbatim.
pub fn create_symlink(target: &Path, path: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, path)?;
    Ok(())
}

/// Returns `true` if something (even a dangling symlink) exists at `path`.
pub fn link_target_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Creates a hard link at `path` to the already confined `target`.
pub fn create_hardlink(target: &Path, path: &Path) -> Result<()> {
    if !link_target_exists(target) {
        return Err(ExtractionError::MissingHardlinkTarget {
            link: path.to_path_buf(),
            target: target.to_path_buf(),
        });
    }
    fs::hard_link(target, path)?;
    Ok(())
}

/// Combines a major/minor pair into a device number.
///
/// # Examples
///
/// ```
/// use rootfs_core::extraction::materialize::device_number;
///
/// assert_eq!(device_number(1, 3), 0x103);
/// assert_ne!(device_number(8, 1), device_number(8, 0));
/// ```
#[must_use]
pub fn device_number(major: u32, minor: u32) -> u64 {
    rustix::fs::makedev(major, minor)
}

/// Creates a device node or fifo at `path`.
pub fn create_node(path: &Path, kind: &EntryKind, mode: u32) -> Result<()> {
    let (file_type, dev) = match *kind {
        EntryKind::CharDevice { major, minor } => {
            (FileType::CharacterDevice, device_number(major, minor))
        }
        EntryKind::BlockDevice { major, minor } => {
            (FileType::BlockDevice, device_number(major, minor))
        }
        EntryKind::Fifo => (FileType::Fifo, 0),
        _ => {
            return Err(ExtractionError::InvalidEntry {
                path: path.to_path_buf(),
                reason: "not a device or fifo".into(),
            });
        }
    };

    rustix::fs::mknodat(
        CWD,
        path,
        file_type,
        Mode::from_raw_mode(mode & PERMISSION_BITS),
        dev,
    )
    .map_err(std::io::Error::from)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::os::unix::fs::FileTypeExt;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_write_regular_file_truncates() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("file");
        fs::write(&path, b"a much longer previous content").unwrap();

        let mut buffer = CopyBuffer::new();
        let written = write_regular_file(
            &path,
            0o644,
            &mut Cursor::new(b"short"),
            &mut buffer,
            &mut |_| {},
        )
        .unwrap();

        assert_eq!(written, 5);
        assert_eq!(fs::read(&path).unwrap(), b"short");
    }

    #[test]
    fn test_write_regular_file_refuses_symlink() {
        let temp = TempDir::new().unwrap();
        let outside = temp.path().join("outside");
        fs::write(&outside, b"keep").unwrap();
        let path = temp.path().join("file");
        std::os::unix::fs::symlink(&outside, &path).unwrap();

        let result = write_regular_file(
            &path,
            0o644,
            &mut Cursor::new(b"evil"),
            &mut CopyBuffer::new(),
            &mut |_| {},
        );

        assert!(matches!(result, Err(ExtractionError::Io(_))));
        assert_eq!(fs::read(&outside).unwrap(), b"keep");
    }

    #[test]
    fn test_remove_existing_merges_directories() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("dir");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("keep"), b"x").unwrap();

        remove_existing(&dir, &EntryKind::Directory).unwrap();
        assert!(dir.join("keep").exists());

        remove_existing(&dir, &EntryKind::Regular).unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn test_remove_existing_symlink_not_followed() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), b"x").unwrap();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        remove_existing(&link, &EntryKind::Directory).unwrap();
        assert!(fs::symlink_metadata(&link).is_err());
        assert!(target.join("keep").exists());
    }

    #[test]
    fn test_remove_existing_missing_path() {
        let temp = TempDir::new().unwrap();
        remove_existing(&temp.path().join("nothing"), &EntryKind::Regular).unwrap();
    }

    #[test]
    fn test_create_parent_nested() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a/b/c/file");
        create_parent(&path).unwrap();
        assert!(temp.path().join("a/b/c").is_dir());
    }

    #[test]
    fn test_create_directory_existing_kept() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("dir");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("child"), b"x").unwrap();

        create_directory(&dir, 0o700).unwrap();
        assert!(dir.join("child").exists());
        assert_eq!(fs::metadata(&dir).unwrap().permissions().mode() & 0o777, 0o700);
    }

    #[test]
    fn test_create_directory_refuses_symlink() {
        let temp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        fs::set_permissions(outside.path(), fs::Permissions::from_mode(0o700)).unwrap();
        let link = temp.path().join("dir");
        std::os::unix::fs::symlink(outside.path(), &link).unwrap();

        let err = create_directory(&link, 0o777).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::Io(ref e) if e.raw_os_error() == Some(libc::ELOOP)
        ));
        let mode = fs::metadata(outside.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn test_create_hardlink_missing_target() {
        let temp = TempDir::new().unwrap();
        let result = create_hardlink(&temp.path().join("missing"), &temp.path().join("link"));
        assert!(matches!(
            result,
            Err(ExtractionError::MissingHardlinkTarget { .. })
        ));
    }

    #[test]
    fn test_create_hardlink_shares_inode() {
        use std::os::unix::fs::MetadataExt;

        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target");
        fs::write(&target, b"shared").unwrap();
        let link = temp.path().join("link");
        create_hardlink(&target, &link).unwrap();

        assert_eq!(
            fs::metadata(&target).unwrap().ino(),
            fs::metadata(&link).unwrap().ino()
        );
    }

    #[test]
    fn test_create_symlink_verbatim_target() {
        let temp = TempDir::new().unwrap();
        let link = temp.path().join("link");
        create_symlink(Path::new("/etc/passwd"), &link).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("/etc/passwd"));
    }

    #[test]
    fn test_create_fifo() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("pipe");
        create_node(&path, &EntryKind::Fifo, 0o600).unwrap();
        assert!(fs::symlink_metadata(&path).unwrap().file_type().is_fifo());
    }

    #[test]
    fn test_create_node_rejects_regular() {
        let temp = TempDir::new().unwrap();
        let result = create_node(&temp.path().join("x"), &EntryKind::Regular, 0o644);
        assert!(matches!(result, Err(ExtractionError::InvalidEntry { .. })));
    }

    #[test]
    fn test_create_char_device_as_root() {
        use std::os::unix::fs::MetadataExt;

        if !rustix::process::geteuid().is_root() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("null");
        create_node(&path, &EntryKind::CharDevice { major: 1, minor: 3 }, 0o666).unwrap();

        let meta = fs::symlink_metadata(&path).unwrap();
        assert!(meta.file_type().is_char_device());
        assert_eq!(meta.rdev(), device_number(1, 3));
    }
}
