//! Filesystem, configuration and process helpers.

pub mod config;
pub mod copy;
pub mod process;
