//! Core data models for the national sites browser
//!
//! This module contains the records scraped from nps.gov and the places
//! returned by the MapQuest radius search, plus the clients that fetch them.

pub mod places;
pub mod sites;

pub use places::{parse_places, PlacesClient, PlacesError};
pub use sites::{parse_site_page, SiteClient, SiteError};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Mapping from lowercase state name to the state's page URL
pub type StateDirectory = BTreeMap<String, String>;

/// A national site scraped from its nps.gov page
///
/// This is also the payload stored in the site cache. The address field is
/// stored under `addr` so existing cache files keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NationalSite {
    /// Designation, e.g. "National Park". Some sites have none.
    #[serde(default)]
    pub category: String,
    /// Site name, e.g. "Isle Royale"
    pub name: String,
    /// City and state, e.g. "Houghton, MI"
    #[serde(rename = "addr", alias = "address")]
    pub address: String,
    /// Postal code, e.g. "49931" or "82190-0168"
    pub zipcode: String,
    /// Phone number, e.g. "(906) 482-0984"
    pub phone: String,
}

impl NationalSite {
    /// One-line summary used in the site listing
    pub fn info(&self) -> String {
        format!(
            "{} ({}): {} {}",
            self.name, self.category, self.address, self.zipcode
        )
    }
}

impl fmt::Display for NationalSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.info())
    }
}

/// A point of interest near a site, with placeholders for missing fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NearbyPlace {
    /// Place name, or "no name"
    pub name: String,
    /// Category, e.g. "Hotels & Motels", or "no category"
    pub category: String,
    /// Street address, or "no address"
    pub address: String,
    /// City, or "no city"
    pub city: String,
}

impl fmt::Display for NearbyPlace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "- {} ({}): {}, {}",
            self.name, self.category, self.address, self.city
        )
    }
}
