//! Rootfs materialization.
//!
//! [`Extractor`] drives an [`EntryStream`](crate::types::EntryStream)
//! through path confinement, object creation and metadata restoration.

mod engine;
pub mod hardlink;
pub mod materialize;
pub mod metadata;

pub use engine::Extractor;
pub use engine::Phase;
pub use metadata::DeferredDirTimestamp;
pub use metadata::entry_timestamps;
