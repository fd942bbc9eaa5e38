//! MapQuest radius search client
//!
//! Looks up points of interest near a site's zip code. Raw API responses are
//! cached by zip code, and `parse_places` turns a response into display records.

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::{NationalSite, NearbyPlace};
use crate::cache::{CacheError, CacheStore, CachedData};

/// Base URL for the MapQuest radius search API
pub const MAPQUEST_RADIUS_URL: &str = "http://www.mapquestapi.com/search/v2/radius";

/// Maximum number of places returned per lookup
const MAX_MATCHES: u32 = 10;

/// Search radius around the origin, in miles
const RADIUS_MILES: u32 = 10;

/// Errors that can occur when looking up nearby places
#[derive(Debug, Error)]
pub enum PlacesError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading or writing the places cache failed
    #[error("Places cache error: {0}")]
    Cache(#[from] CacheError),

    /// No API key was configured
    #[error("No MapQuest API key configured (set MAPQUEST_API_KEY or pass --api-key)")]
    MissingApiKey,

    /// The response didn't have the expected shape
    #[error("Failed to decode places response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Radius search response; only the parts we display
#[derive(Debug, Deserialize)]
struct RadiusResponse {
    #[serde(rename = "searchResults", default)]
    search_results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    fields: PlaceFields,
}

#[derive(Debug, Default, Deserialize)]
struct PlaceFields {
    name: Option<String>,
    category: Option<String>,
    address: Option<String>,
    city: Option<String>,
}

/// Client for the MapQuest radius search, with a cache keyed by zip code
#[derive(Debug)]
pub struct PlacesClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Places cache, keyed by zip code
    cache: CacheStore,
    /// MapQuest API key
    api_key: Option<String>,
    /// Endpoint URL (allows override for testing)
    base_url: String,
}

impl PlacesClient {
    /// Creates a new PlacesClient that caches responses in `cache`
    pub fn new(cache: CacheStore, api_key: Option<String>) -> Self {
        Self {
            http_client: Client::new(),
            cache,
            api_key,
            base_url: MAPQUEST_RADIUS_URL.to_string(),
        }
    }

    /// Replaces the endpoint URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The places cache
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Queries the API for places near `site`, bypassing the cache
    pub async fn get_nearby_places(&self, site: &NationalSite) -> Result<Value, PlacesError> {
        let api_key = self.api_key.as_deref().ok_or(PlacesError::MissingApiKey)?;
        fetch_radius(&self.http_client, &self.base_url, api_key, &site.zipcode).await
    }

    /// Returns the raw API response for places near `site`
    ///
    /// Responses are cached by the site's zip code alone.
    pub async fn get_nearby_places_with_cache(
        &mut self,
        site: &NationalSite,
    ) -> Result<CachedData<Value>, PlacesError> {
        let zipcode = site.zipcode.as_str();
        let http_client = &self.http_client;
        let base_url = self.base_url.as_str();
        let api_key = self.api_key.as_deref();

        self.cache
            .fetch_with_cache(zipcode, || async move {
                let api_key = api_key.ok_or(PlacesError::MissingApiKey)?;
                fetch_radius(http_client, base_url, api_key, zipcode).await
            })
            .await
    }
}

async fn fetch_radius(
    client: &Client,
    base_url: &str,
    api_key: &str,
    zipcode: &str,
) -> Result<Value, PlacesError> {
    debug!(zipcode, "Querying radius search");
    let max_matches = MAX_MATCHES.to_string();
    let radius = RADIUS_MILES.to_string();
    let params = [
        ("key", api_key),
        ("origin", zipcode),
        ("maxMatches", max_matches.as_str()),
        ("radius", radius.as_str()),
        ("ambiguities", "ignore"),
        ("outFormat", "json"),
    ];

    let response = client
        .get(base_url)
        .query(&params)
        .send()
        .await?
        .error_for_status()?
        .json::<Value>()
        .await?;
    Ok(response)
}

fn field_or(value: Option<String>, placeholder: &str) -> String {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => placeholder.to_string(),
    }
}

/// Turns a radius search response into display records
///
/// Missing or empty fields get placeholders such as "no name". A response
/// without `searchResults` (e.g. an error payload) yields no places.
pub fn parse_places(response: &Value) -> Result<Vec<NearbyPlace>, PlacesError> {
    let response = RadiusResponse::deserialize(response)?;

    Ok(response
        .search_results
        .into_iter()
        .map(|result| {
            let fields = result.fields;
            NearbyPlace {
                name: field_or(fields.name, "no name"),
                category: field_or(fields.category, "no category"),
                address: field_or(fields.address, "no address"),
                city: field_or(fields.city, "no city"),
            }
        })
        .collect())
}
