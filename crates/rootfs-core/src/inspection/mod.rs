//! Archive inspection without extraction.

pub mod read;

pub use read::read_file;
