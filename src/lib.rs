//! npsites library
//!
//! Scrapes nps.gov for national sites, looks up places nearby through the
//! MapQuest radius search, and memoizes both in JSON files on disk. The modules
//! are exposed for the binary and for integration tests.

pub mod cache;
pub mod cli;
pub mod console;
pub mod data;
