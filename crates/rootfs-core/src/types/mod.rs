//! Data types crossing the library boundary.
//!
//! - [`EntryHeader`], [`EntryKind`], [`ArchiveEntry`]: one decoded entry
//! - [`EntryStream`]: the decoder boundary, with [`VecEntries`] as an
//!   in-memory implementation
//! - [`RootDir`], [`ExtractionTarget`]: where an extraction writes
//! - [`PathWhitelist`]: selective extraction

pub mod entry;
pub mod root_dir;
pub mod whitelist;

pub use entry::ArchiveEntry;
pub use entry::EntryHeader;
pub use entry::EntryKind;
pub use entry::EntryStream;
pub use entry::EntryTime;
pub use entry::VecEntries;
pub use root_dir::ExtractionTarget;
pub use root_dir::RootDir;
pub use whitelist::PathWhitelist;
