//! Confinement and isolation primitives.
//!
//! - [`path`]: lexical cleaning, whitelist filtering, scoped symlink
//!   resolution
//! - [`uid_range`]: user-namespace id shifting
//! - [`umask`]: serialized process umask override

pub mod path;
pub mod uid_range;
pub mod umask;

pub use path::PathResolver;
pub use path::ResolvedPath;
pub use path::clean_path;
pub use uid_range::UidRange;
pub use umask::UmaskGuard;
