//! Subcommand implementations

pub mod bench;
pub mod maintain;
pub mod pack;
pub mod read;
pub mod write;
