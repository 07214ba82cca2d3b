//! Client for the external deck-building service
//!
//! Fetches a deck by slug and exposes the card list in the fixed shape the
//! reconciler needs: a type tag, a total quantity, and a printing SKU
//! referencing a set code and number.

use crate::error::{CollectionError, Result};
use serde::{Deserialize, Deserializer};

/// Production API of the deck-building service
pub const DEFAULT_BASE_URL: &str = "https://api.fabdb.net";

#[derive(Debug, Deserialize)]
pub struct ImportedDeck {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cards: Vec<ImportedCard>,
}

#[derive(Debug, Deserialize)]
pub struct ImportedCard {
    #[serde(rename = "type")]
    pub card_type: String,
    pub name: String,
    #[serde(default = "default_total")]
    pub total: i64,
    #[serde(default)]
    pub descriptor: Option<String>,
    #[serde(default)]
    pub printings: Vec<ImportedPrinting>,
}

fn default_total() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct ImportedPrinting {
    pub sku: Sku,
}

#[derive(Debug, Deserialize)]
pub struct Sku {
    pub set: SetRef,
    #[serde(deserialize_with = "string_or_number")]
    pub number: String,
}

#[derive(Debug, Deserialize)]
pub struct SetRef {
    pub id: String,
}

/// The service sends card numbers as either strings or bare integers
fn string_or_number<'de, D>(de: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(de)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "unexpected sku number: {}",
            other
        ))),
    }
}

impl ImportedCard {
    /// Catalog set identifier built from the first printing's SKU,
    /// e.g. set "wtr" number "132" becomes "WTR132"
    pub fn set_code(&self) -> Option<String> {
        self.printings
            .first()
            .map(|p| format!("{}{}", p.sku.set.id.to_uppercase(), p.sku.number))
    }
}

/// Fetch a deck from the import service by slug
pub async fn fetch_deck(
    client: &reqwest::Client,
    base_url: &str,
    slug: &str,
) -> Result<ImportedDeck> {
    let url = format!(
        "{}/decks/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(slug)
    );

    log::debug!("Fetching deck from import service: {}", url);

    let response = client
        .get(&url)
        .header("User-Agent", "fab_collection/1.0")
        .send()
        .await?;

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(CollectionError::DeckNotFound(slug.to_string()));
    }
    if !response.status().is_success() {
        return Err(CollectionError::HttpStatus(response.status()));
    }

    Ok(response.json().await?)
}
