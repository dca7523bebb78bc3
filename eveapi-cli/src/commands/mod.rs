//! CLI command implementations.

pub mod assets;
pub mod config;
pub mod get;
pub mod killmails;
pub mod location;
