//! Disk-backed key/value caches.
//!
//! Every cache is one flat JSON object mapping a string key (the decimal app
//! id) to a value. Files are read once and rewritten wholesale; absence or
//! corruption reads as an empty map.

pub mod cache;
pub mod error;

pub use cache::{CacheEntry, CacheKind, JsonCache, cache_dir, clear, list};
pub use error::CacheError;
