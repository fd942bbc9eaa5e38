//! npsites - Browse U.S. national sites by state
//!
//! An interactive console that lists the national sites in a state and shows
//! places near a chosen site. Site pages and place lookups are cached on disk.

use std::io;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use npsites::cache::CacheStore;
use npsites::cli::{Cli, StartupConfig};
use npsites::console::Console;
use npsites::data::{PlacesClient, SiteClient};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // RUST_LOG controls the level (e.g. RUST_LOG=npsites=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present so MAPQUEST_API_KEY can live there
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing();

    let config = match StartupConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };
    info!(
        site_cache = %config.site_cache_path.display(),
        places_cache = %config.places_cache_path.display(),
        "Starting npsites"
    );
    if config.api_key.is_none() {
        warn!("No MapQuest API key configured; only cached place lookups will work");
    }

    let site_cache = CacheStore::load(&config.site_cache_path);
    let places_cache = CacheStore::load(&config.places_cache_path);

    let sites = SiteClient::new(site_cache).with_base_url(config.base_url.as_str());
    let places = PlacesClient::new(places_cache, config.api_key.clone());

    let stdin = io::stdin();
    let mut console = Console::new(stdin.lock(), io::stdout(), sites, places);
    if let Err(e) = console.run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
