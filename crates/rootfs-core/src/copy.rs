//! Entry content copying with a reusable buffer.
//!
//! Reads from an entry are reads from the archive decoder, so read failures
//! surface as [`ExtractionError::Decode`] while write failures are plain
//! [`ExtractionError::Io`].

use std::io::Read;
use std::io::Write;
use std::io::{self};

use crate::ExtractionError;

/// Buffer size for content copies (64KB).
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Fixed-size buffer reused for every regular file of one extraction.
#[derive(Debug)]
pub struct CopyBuffer {
    #[allow(clippy::large_stack_arrays)]
    buf: [u8; COPY_BUFFER_SIZE],
}

impl CopyBuffer {
    /// Creates a zeroed copy buffer.
    #[inline]
    #[must_use]
    #[allow(clippy::large_stack_arrays)]
    pub fn new() -> Self {
        Self {
            buf: [0u8; COPY_BUFFER_SIZE],
        }
    }

    /// Returns the buffer size in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        COPY_BUFFER_SIZE
    }
}

impl Default for CopyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies an entry's content into `writer`, reporting each chunk.
///
/// `on_chunk` receives the size of every chunk written; the return value is
/// the total.
///
/// # Examples
///
/// ```
/// use rootfs_core::copy::{CopyBuffer, copy_entry_content};
///
/// let mut buffer = CopyBuffer::new();
/// let mut out = Vec::new();
/// let mut seen = 0;
/// let total = copy_entry_content(&mut &b"hello"[..], &mut out, &mut buffer, &mut |n| seen += n)?;
/// assert_eq!((total, seen), (5, 5));
/// # Ok::<(), rootfs_core::ExtractionError>(())
/// ```
pub fn copy_entry_content<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    buffer: &mut CopyBuffer,
    on_chunk: &mut dyn FnMut(u64),
) -> Result<u64, ExtractionError> {
    let mut total: u64 = 0;

    loop {
        let bytes_read = match reader.read(&mut buffer.buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ExtractionError::Decode(e)),
        };

        writer.write_all(&buffer.buf[..bytes_read])?;
        total = total.saturating_add(bytes_read as u64);
        on_chunk(bytes_read as u64);
    }

    Ok(total)
}
