//! Command-line interface parsing for npsites
//!
//! This module handles parsing of CLI arguments using clap, and resolves them
//! into the cache file locations and API settings the app starts with.

use std::path::PathBuf;

use clap::Parser;
use directories::ProjectDirs;
use thiserror::Error;

use crate::data::sites::NPS_BASE_URL;

/// Default file name for the site page cache
pub const DEFAULT_SITE_CACHE_FILE: &str = "cache.json";

/// Default file name for the nearby places cache
pub const DEFAULT_PLACES_CACHE_FILE: &str = "cache_near.json";

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// Both an explicit cache directory and the user cache directory were requested
    #[error("--cache-dir and --user-cache cannot be used together")]
    ConflictingCacheDirs,

    /// The platform cache directory could not be determined
    #[error("Could not determine the user cache directory (no home directory?)")]
    NoUserCacheDir,
}

/// npsites - Browse national sites by state and find places nearby
#[derive(Parser, Debug)]
#[command(name = "npsites")]
#[command(about = "Browse U.S. national sites by state and look up places nearby")]
#[command(version)]
pub struct Cli {
    /// Directory holding the cache files (defaults to the working directory)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Keep the cache files in the platform cache directory (e.g. ~/.cache/npsites)
    #[arg(long)]
    pub user_cache: bool,

    /// File name of the site page cache
    #[arg(long, value_name = "NAME", default_value = DEFAULT_SITE_CACHE_FILE)]
    pub site_cache_file: String,

    /// File name of the nearby places cache
    #[arg(long, value_name = "NAME", default_value = DEFAULT_PLACES_CACHE_FILE)]
    pub places_cache_file: String,

    /// MapQuest API key used for nearby place lookups
    #[arg(long, env = "MAPQUEST_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the national parks site
    #[arg(long, value_name = "URL", default_value = NPS_BASE_URL)]
    pub base_url: String,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct StartupConfig {
    /// Backing file of the site page cache
    pub site_cache_path: PathBuf,
    /// Backing file of the nearby places cache
    pub places_cache_path: PathBuf,
    /// MapQuest API key, if one was given
    pub api_key: Option<String>,
    /// Base URL of the national parks site
    pub base_url: String,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            site_cache_path: PathBuf::from(DEFAULT_SITE_CACHE_FILE),
            places_cache_path: PathBuf::from(DEFAULT_PLACES_CACHE_FILE),
            api_key: None,
            base_url: NPS_BASE_URL.to_string(),
        }
    }
}

/// Returns the platform cache directory for npsites, if there is one
pub fn user_cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "npsites").map(|dirs| dirs.cache_dir().to_path_buf())
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with both cache paths resolved
    /// * `Err(CliError)` if the cache directory options conflict or can't be resolved
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let cache_dir = match (&cli.cache_dir, cli.user_cache) {
            (Some(_), true) => return Err(CliError::ConflictingCacheDirs),
            (Some(dir), false) => dir.clone(),
            (None, true) => user_cache_dir().ok_or(CliError::NoUserCacheDir)?,
            // Relative paths land in the working directory
            (None, false) => PathBuf::new(),
        };

        let api_key = cli
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string);

        Ok(StartupConfig {
            site_cache_path: cache_dir.join(&cli.site_cache_file),
            places_cache_path: cache_dir.join(&cli.places_cache_file),
            api_key,
            base_url: cli.base_url.clone(),
        })
    }
}
