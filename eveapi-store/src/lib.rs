// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! # eveapi Store
//!
//! Cache backends, configuration and file persistence for `eveapi`.
//!
//! This crate provides:
//!
//! - **MemoryCache**: In-process [`CacheRepository`](eveapi_core::CacheRepository) with expiry and an optional capacity
//! - **DiskCache**: File-backed cache that survives restarts
//! - **Config**: JSON configuration with defaults for every field
//! - **Persistence**: Owner-only JSON files and killmail exports
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use eveapi_store::{Config, DiskCache};
//!
//! let config = Config::load()?;
//! let cache = Arc::new(DiskCache::open(config.cache.resolved_dir())?);
//! ```

pub mod config;
pub mod disk;
pub mod error;
pub mod memory;
pub mod persistence;

pub use config::{CacheConfig, Config, EsiConfig, GeneralConfig, ZkillConfig};
pub use disk::DiskCache;
pub use error::StoreError;
pub use memory::MemoryCache;
pub use persistence::{
    default_cache_dir, default_config_dir, default_config_path, default_http_cache_dir,
    ensure_dir, load_json, load_records, save_json, save_records,
};
