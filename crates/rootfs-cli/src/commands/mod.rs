//! Subcommand implementations.

pub mod cat;
pub mod completion;
pub mod extract;
