//! Single-file lookup without touching the filesystem.

use std::io::Read;
use std::path::Path;

use crate::ExtractionError;
use crate::Result;
use crate::security::clean_path;
use crate::types::EntryStream;

/// Returns the content of the first regular file named `name`.
///
/// Entry paths and `name` are compared after lexical cleaning, so
/// `./manifest` finds `manifest`. The stream is consumed up to the match.
///
/// # Errors
///
/// - [`ExtractionError::NotRegularFile`] if the first matching entry is not
///   a regular file
/// - [`ExtractionError::NotFound`] if the stream ends without a match
/// - [`ExtractionError::Decode`] if the stream fails first
///
/// # Examples
///
/// ```
/// use rootfs_core::read_file;
/// use rootfs_core::types::{EntryHeader, EntryKind, VecEntries};
///
/// # fn main() -> Result<(), rootfs_core::ExtractionError> {
/// let mut entries = VecEntries::new()
///     .with(EntryHeader::new("rootfs", EntryKind::Directory), "")
///     .with(EntryHeader::new("manifest", EntryKind::Regular), "{}");
/// assert_eq!(read_file(&mut entries, "manifest")?, b"{}");
/// # Ok(())
/// # }
/// ```
pub fn read_file<S: EntryStream + ?Sized>(
    entries: &mut S,
    name: impl AsRef<Path>,
) -> Result<Vec<u8>> {
    let name = name.as_ref();
    let wanted = clean_path(name);

    while let Some(mut entry) = entries.next_entry()? {
        if clean_path(entry.header.path()) != wanted {
            continue;
        }
        if !entry.header.kind.is_regular() {
            return Err(ExtractionError::NotRegularFile {
                name: name.to_path_buf(),
            });
        }

        let capacity = usize::try_from(entry.header.size).unwrap_or(0);
        let mut content = Vec::with_capacity(capacity.min(1 << 20));
        entry
            .read_to_end(&mut content)
            .map_err(ExtractionError::Decode)?;
        return Ok(content);
    }

    Err(ExtractionError::NotFound {
        name: name.to_path_buf(),
    })
}
