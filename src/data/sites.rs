//! nps.gov scraper
//!
//! Builds the state directory from the nps.gov index page, lists the parks on a
//! state page, and extracts a `NationalSite` from each park page. Park pages go
//! through the site cache, keyed by their full URL.

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::debug;

use super::{NationalSite, StateDirectory};
use crate::cache::{CacheError, CacheStore, CachedData};

/// Base URL for the nps.gov site
pub const NPS_BASE_URL: &str = "https://www.nps.gov";

/// State links in the index page's search dropdown
const STATE_MENU_SELECTOR: &str = "ul.dropdown-menu.SearchBar-keywordSearch";

/// One park entry in a state page's listing
const PARK_LIST_ITEM_SELECTOR: &str = "div.col-md-9.col-sm-9.col-xs-12.table-cell.list_left";

const NAME_SELECTOR: &str = "div.Hero-titleContainer a";
const CATEGORY_SELECTOR: &str = "div.Hero-designationContainer span.Hero-designation";
const LOCALITY_SELECTOR: &str = "span[itemprop=\"addressLocality\"]";
const REGION_SELECTOR: &str = "span[itemprop=\"addressRegion\"]";
const POSTAL_CODE_SELECTOR: &str = "span[itemprop=\"postalCode\"]";
const TELEPHONE_SELECTOR: &str = "span[itemprop=\"telephone\"]";

/// Errors that can occur when scraping nps.gov
#[derive(Debug, Error)]
pub enum SiteError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading or writing the site cache failed
    #[error("Site cache error: {0}")]
    Cache(#[from] CacheError),

    /// An element the page is expected to have is missing
    #[error("Missing expected field in page: {0}")]
    MissingField(String),
}

/// Client for scraping nps.gov, with a cache for park pages
#[derive(Debug)]
pub struct SiteClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Site page cache, keyed by URL
    cache: CacheStore,
    /// Base URL prepended to relative links (allows override for testing)
    base_url: String,
}

impl SiteClient {
    /// Creates a new SiteClient that caches park pages in `cache`
    pub fn new(cache: CacheStore) -> Self {
        Self {
            http_client: Client::new(),
            cache,
            base_url: NPS_BASE_URL.to_string(),
        }
    }

    /// Replaces the base URL, e.g. to point at a mirror
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The base URL in use
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The site page cache
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Fetches the index page and maps each lowercase state name to its page URL
    pub async fn build_state_url_dict(&self) -> Result<StateDirectory, SiteError> {
        let url = format!("{}/index.htm", self.base_url);
        let html = fetch_html(&self.http_client, &url).await?;
        let directory = parse_state_directory(&html, &self.base_url);
        debug!(states = directory.len(), "State directory built");
        Ok(directory)
    }

    /// Lists every national site on a state page
    ///
    /// The state page itself isn't cached; each park page is.
    pub async fn get_sites_for_state(
        &mut self,
        state_url: &str,
    ) -> Result<Vec<CachedData<NationalSite>>, SiteError> {
        let park_urls = self.get_park_urls(state_url).await?;

        let mut sites = Vec::with_capacity(park_urls.len());
        for park_url in &park_urls {
            sites.push(self.get_site_instance_with_cache(park_url).await?);
        }
        Ok(sites)
    }

    /// Fetches a state page and returns its park page URLs, in listing order
    pub async fn get_park_urls(&self, state_url: &str) -> Result<Vec<String>, SiteError> {
        let html = fetch_html(&self.http_client, state_url).await?;
        let park_urls = parse_park_urls(&html, &self.base_url);
        debug!(state_url, parks = park_urls.len(), "Park links found");
        Ok(park_urls)
    }

    /// Fetches and parses a park page, bypassing the cache
    pub async fn get_site_instance(&self, site_url: &str) -> Result<NationalSite, SiteError> {
        let html = fetch_html(&self.http_client, site_url).await?;
        parse_site_page(&html)
    }

    /// Returns the park at `site_url`, from the cache if it has been seen before
    pub async fn get_site_instance_with_cache(
        &mut self,
        site_url: &str,
    ) -> Result<CachedData<NationalSite>, SiteError> {
        let http_client = &self.http_client;
        self.cache
            .fetch_with_cache(site_url, || async move {
                let html = fetch_html(http_client, site_url).await?;
                parse_site_page(&html)
            })
            .await
    }
}

async fn fetch_html(client: &Client, url: &str) -> Result<String, SiteError> {
    debug!(url, "Fetching page");
    let html = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(html)
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("invalid selector")
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn select_text(document: &Html, css: &str) -> Option<String> {
    document.select(&selector(css)).next().map(element_text)
}

fn require_text(document: &Html, css: &str, field: &str) -> Result<String, SiteError> {
    select_text(document, css).ok_or_else(|| SiteError::MissingField(field.to_string()))
}

/// Extracts the state menu from the index page
///
/// Keys are the lowercased link text; values are `base_url` + href.
pub fn parse_state_directory(html: &str, base_url: &str) -> StateDirectory {
    let document = Html::parse_document(html);
    let link_selector = selector("a[href]");

    let mut directory = StateDirectory::new();
    if let Some(menu) = document.select(&selector(STATE_MENU_SELECTOR)).next() {
        for link in menu.select(&link_selector) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let name = element_text(link).to_lowercase();
            if name.is_empty() {
                continue;
            }
            directory.insert(name, format!("{}{}", base_url, href));
        }
    }
    directory
}

/// Extracts the park page URLs from a state page, in listing order
pub fn parse_park_urls(html: &str, base_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let link_selector = selector("h3 a[href]");

    document
        .select(&selector(PARK_LIST_ITEM_SELECTOR))
        .filter_map(|item| item.select(&link_selector).next())
        .filter_map(|link| link.value().attr("href"))
        .map(|href| format!("{}{}index.htm", base_url, href))
        .collect()
}

/// Extracts a `NationalSite` from a park page
///
/// A missing designation yields an empty category; any other missing element
/// is an error.
pub fn parse_site_page(html: &str) -> Result<NationalSite, SiteError> {
    let document = Html::parse_document(html);

    let name = require_text(&document, NAME_SELECTOR, "name")?;
    let category = select_text(&document, CATEGORY_SELECTOR).unwrap_or_default();
    let locality = require_text(&document, LOCALITY_SELECTOR, "addressLocality")?;
    let region = require_text(&document, REGION_SELECTOR, "addressRegion")?;
    let zipcode = require_text(&document, POSTAL_CODE_SELECTOR, "postalCode")?;
    let phone = require_text(&document, TELEPHONE_SELECTOR, "telephone")?;

    Ok(NationalSite {
        category,
        name,
        address: format!("{}, {}", locality, region),
        zipcode,
        phone,
    })
}
