//! Cache module for memoizing site pages and API responses on disk
//!
//! Each `CacheStore` owns one JSON file holding a flat object of string keys to
//! arbitrary JSON payloads. The whole file is rewritten on every insert, and a
//! missing or corrupt file degrades to an empty store with a logged warning.

mod store;

pub use store::{CacheError, CacheStatus, CacheStore, CachedData};
