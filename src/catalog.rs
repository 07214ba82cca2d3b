//! Catalog snapshot loading
//!
//! Cards and their printings ship as one JSON snapshot. The snapshot is
//! identified by the SHA-256 of its raw bytes so the database load can be
//! skipped when nothing changed.

use crate::deck::Pitch;
use crate::error::Result;
use serde::{Deserialize, Deserializer};
use sha2::{Digest, Sha256};
use std::path::Path;

/// One physical print version of a card in the snapshot
#[derive(Debug, Clone, Deserialize)]
pub struct PrintingRecord {
    pub set_printing_unique_id: String,
    /// Set identifier, e.g. "WTR132"
    #[serde(rename = "id")]
    pub set_id: String,
    pub edition: String,
    pub foiling: String,
    pub rarity: String,
    #[serde(default)]
    pub art_variation: Option<String>,
}

/// One logical card identity in the snapshot
#[derive(Debug, Clone, Deserialize)]
pub struct CardRecord {
    pub unique_id: String,
    pub name: String,
    #[serde(default, deserialize_with = "pitch_field")]
    pub pitch: Option<Pitch>,
    #[serde(default)]
    pub printings: Vec<PrintingRecord>,
}

impl CardRecord {
    /// Descriptor part of a `"Name, Descriptor"` card name
    ///
    /// Equipment and weapon forms of a hero are listed this way in the
    /// snapshot; the descriptor doubles as an alias for the full name.
    pub fn descriptor(&self) -> Option<&str> {
        self.name.split(", ").nth(1)
    }
}

/// Pitch appears as either a number or a numeric string in snapshots
fn pitch_field<'de, D>(de: D) -> std::result::Result<Option<Pitch>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(de)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64().and_then(Pitch::from_code),
        Some(serde_json::Value::String(s)) => {
            s.trim().parse::<i64>().ok().and_then(Pitch::from_code)
        }
        _ => None,
    })
}

/// A parsed catalog snapshot plus its content fingerprint
pub struct CatalogSnapshot {
    cards: Vec<CardRecord>,
    fingerprint: String,
}

impl CatalogSnapshot {
    /// Read and parse a snapshot file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let fingerprint = hex::encode(Sha256::digest(&bytes));
        let cards: Vec<CardRecord> = serde_json::from_slice(&bytes)?;
        log::info!(
            "Loaded catalog snapshot: {} cards (fingerprint {})",
            cards.len(),
            &fingerprint[..12]
        );
        Ok(Self { cards, fingerprint })
    }

    pub fn cards(&self) -> &[CardRecord] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// SHA-256 hex digest of the snapshot file contents
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Create a snapshot from records (for testing)
    #[cfg(test)]
    pub fn from_cards(cards: Vec<CardRecord>, fingerprint: &str) -> Self {
        Self {
            cards,
            fingerprint: fingerprint.to_string(),
        }
    }
}

#[cfg(test)]
pub use tests::{make_test_card, make_test_printing};
