//! Archive decoding.

pub mod compression;
pub mod tar;

pub use compression::Compression;
pub use compression::open_archive;
pub use self::tar::TarEntries;
