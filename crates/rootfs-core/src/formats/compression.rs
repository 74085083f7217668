//! Transparent decompression of image archives.
//!
//! Image files are plain tar or gzip-compressed tar. The codec is chosen
//! from the leading magic bytes, never from the file name.

use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;

use crate::Result;

/// Gzip member header magic.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Compression wrapping an archive stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Plain tar.
    None,
    /// Gzip (deflate) compressed tar.
    Gzip,
}

impl Compression {
    /// Detects the compression from the first bytes of a stream.
    ///
    /// # Examples
    ///
    /// ```
    /// use rootfs_core::formats::compression::Compression;
    ///
    /// assert_eq!(Compression::detect(&[0x1f, 0x8b, 0x08]), Compression::Gzip);
    /// assert_eq!(Compression::detect(b"etc/"), Compression::None);
    /// assert_eq!(Compression::detect(&[]), Compression::None);
    /// ```
    #[must_use]
    pub fn detect(prefix: &[u8]) -> Self {
        if prefix.starts_with(&GZIP_MAGIC) {
            Self::Gzip
        } else {
            Self::None
        }
    }

    /// Returns a human-readable name for this codec.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
        }
    }
}

/// Wraps `reader` in a decoder matching its leading bytes.
///
/// Only the buffered prefix is inspected; nothing is consumed.
pub fn decompress<'a, R: BufRead + 'a>(mut reader: R) -> Result<(Compression, Box<dyn Read + 'a>)> {
    let compression = Compression::detect(reader.fill_buf()?);
    let stream: Box<dyn Read + 'a> = match compression {
        Compression::Gzip => Box::new(GzDecoder::new(reader)),
        Compression::None => Box::new(reader),
    };
    Ok((compression, stream))
}

/// Opens an image file, decompressing it if it is gzip.
///
/// # Errors
///
/// Returns [`ExtractionError::Io`](crate::ExtractionError::Io) if the file
/// cannot be opened or read.
///
/// # Examples
///
/// ```no_run
/// use rootfs_core::open_archive;
///
/// # fn main() -> Result<(), rootfs_core::ExtractionError> {
/// let manifest = rootfs_core::read_tar_file(open_archive("image.aci")?, "manifest")?;
/// println!("{}", String::from_utf8_lossy(&manifest));
/// # Ok(())
/// # }
/// ```
pub fn open_archive(path: impl AsRef<Path>) -> Result<Box<dyn Read>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let (compression, stream) = decompress(BufReader::new(file))?;
    tracing::debug!(path = %path.display(), compression = compression.name(), "opened archive");
    Ok(stream)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use std::io::Cursor;
    use std::io::Write;

    #[test]
    fn test_detect_short_prefix() {
        assert_eq!(Compression::detect(&[0x1f]), Compression::None);
    }

    #[test]
    fn test_decompress_gzip() {
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"rootfs").unwrap();
        let compressed = encoder.finish().unwrap();

        let (compression, mut stream) = decompress(Cursor::new(compressed)).unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        assert_eq!(compression, Compression::Gzip);
        assert_eq!(out, b"rootfs");
    }

    #[test]
    fn test_decompress_plain_passthrough() {
        let (compression, mut stream) = decompress(Cursor::new(b"plain".to_vec())).unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        assert_eq!(compression, Compression::None);
        assert_eq!(out, b"plain");
    }

    #[test]
    fn test_open_archive_missing_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let result = open_archive(temp.path().join("missing.aci"));
        assert!(matches!(result, Err(crate::ExtractionError::Io(_))));
    }
}
