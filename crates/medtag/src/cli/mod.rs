//! CLI command implementations.

pub mod config;
pub mod tag;
pub mod taxonomy;
