//! Container image rootfs materialization.
//!
//! `rootfs-core` turns a decoded archive entry stream into an on-disk root
//! filesystem. Every entry path is confined to the root (including through
//! symlinks already on disk), ownership can be shifted into a user
//! namespace range, and modes and timestamps are restored exactly, with
//! directory times applied after the last entry.
//!
//! # Examples
//!
//! ```no_run
//! use rootfs_core::types::ExtractionTarget;
//! use rootfs_core::{ExtractOptions, extract_tar, open_archive};
//!
//! # fn main() -> Result<(), rootfs_core::ExtractionError> {
//! let target = ExtractionTarget::open("/var/lib/images/busybox")?;
//! let report = extract_tar(open_archive("busybox.aci")?, &target, &ExtractOptions::default())?;
//! println!("Extracted {} files", report.files_extracted);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod copy;
pub mod error;
pub mod extraction;
pub mod formats;
pub mod inspection;
pub mod report;
pub mod security;
pub mod types;

pub use api::extract_all;
pub use api::extract_all_with_progress;
pub use api::extract_tar;
pub use api::extract_tar_with_progress;
pub use api::read_tar_file;
pub use config::ExtractOptions;
pub use error::ExtractionError;
pub use error::Result;
pub use extraction::entry_timestamps;
pub use formats::open_archive;
pub use inspection::read_file;
pub use report::ExtractionReport;
pub use report::NoopProgress;
pub use report::ProgressCallback;
pub use security::UidRange;
pub use types::PathWhitelist;
