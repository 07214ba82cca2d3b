//! Per-session cache of computed deck breakdowns and display filters
//!
//! A reconciled deck is stored server-side under an opaque session id handed
//! back to the client; follow-up table requests merge new filter values into
//! the stored state and re-filter the cached breakdown without touching the
//! database. Entries expire after a fixed TTL and are purged on access.

use crate::deck::Pitch;
use crate::reconcile::DeckBreakdown;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Display filter state carried across table requests
///
/// `None` means "not supplied"; the literal value "all" clears a constraint
/// while remaining stored, so a later request without parameters keeps it.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct FilterState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foiling: Option<String>,
    #[serde(
        default,
        rename = "artVariation",
        skip_serializing_if = "Option::is_none"
    )]
    pub art_variation: Option<String>,
}

impl FilterState {
    /// Merge newly supplied values over the stored state
    ///
    /// Absent parameters keep their previous value.
    pub fn merge(&mut self, incoming: &FilterState) {
        if let Some(v) = &incoming.edition {
            self.edition = Some(v.clone());
        }
        if let Some(v) = &incoming.rarity {
            self.rarity = Some(v.clone());
        }
        if let Some(v) = &incoming.foiling {
            self.foiling = Some(v.clone());
        }
        if let Some(v) = &incoming.art_variation {
            self.art_variation = Some(v.clone());
        }
    }

    fn constraint(value: &Option<String>) -> Option<&str> {
        match value.as_deref() {
            None | Some("all") => None,
            Some(v) => Some(v),
        }
    }

    /// Whether a printing with these attributes passes the filter
    ///
    /// A printing without an art variation fails any specific art-variation
    /// constraint.
    pub fn matches(
        &self,
        edition: &str,
        rarity: &str,
        foiling: &str,
        art_variation: Option<&str>,
    ) -> bool {
        if let Some(want) = Self::constraint(&self.edition) {
            if edition != want {
                return false;
            }
        }
        if let Some(want) = Self::constraint(&self.rarity) {
            if rarity != want {
                return false;
            }
        }
        if let Some(want) = Self::constraint(&self.foiling) {
            if foiling != want {
                return false;
            }
        }
        if let Some(want) = Self::constraint(&self.art_variation) {
            if art_variation != Some(want) {
                return false;
            }
        }
        true
    }
}

/// One flattened display row of a filtered deck table
#[derive(Debug, Clone, Serialize)]
pub struct DeckRow {
    pub card_name: String,
    pub set_id: String,
    pub pitch: Option<Pitch>,
    pub edition: String,
    pub foiling: String,
    pub art_variation: Option<String>,
    pub rarity: String,
    pub number_in_deck: i64,
    pub owned_quantity: i64,
    pub needed: i64,
}

/// Flatten a breakdown to display rows, applying the filter state
pub fn apply_filters(breakdown: &DeckBreakdown, filters: &FilterState) -> Vec<DeckRow> {
    let groups = [
        &breakdown.weapon_cards,
        &breakdown.equipment_cards,
        &breakdown.other_cards,
    ];

    let mut rows = Vec::new();
    for group in groups {
        for card in group {
            for printing in &card.printings {
                if !filters.matches(
                    &printing.edition,
                    &printing.rarity,
                    &printing.foiling,
                    printing.art_variation.as_deref(),
                ) {
                    continue;
                }
                rows.push(DeckRow {
                    card_name: card.name.clone(),
                    set_id: printing.set_id.clone(),
                    pitch: printing.pitch,
                    edition: printing.edition.clone(),
                    foiling: printing.foiling.clone(),
                    art_variation: printing.art_variation.clone(),
                    rarity: printing.rarity.clone(),
                    number_in_deck: printing.number_in_deck,
                    owned_quantity: printing.owned_quantity,
                    needed: printing.needed_quantity,
                });
            }
        }
    }
    rows
}

struct SessionEntry {
    breakdown: DeckBreakdown,
    filters: FilterState,
    touched: Instant,
}

/// Server-side store of reconciled decks, keyed by session id
pub struct SessionStore {
    ttl: Duration,
    entries: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Store a breakdown and return its session id
    pub fn insert(&self, breakdown: DeckBreakdown) -> String {
        let id = Uuid::new_v4().to_string();
        let mut entries = self.entries.lock().unwrap();
        Self::purge(&mut entries, self.ttl);
        entries.insert(
            id.clone(),
            SessionEntry {
                breakdown,
                filters: FilterState::default(),
                touched: Instant::now(),
            },
        );
        id
    }

    /// Merge incoming filters into the stored state and return filtered rows
    ///
    /// Returns `None` when the session is unknown or expired. Access renews
    /// the entry's TTL.
    pub fn filtered_rows(&self, id: &str, incoming: &FilterState) -> Option<Vec<DeckRow>> {
        let mut entries = self.entries.lock().unwrap();
        Self::purge(&mut entries, self.ttl);
        let entry = entries.get_mut(id)?;
        entry.filters.merge(incoming);
        entry.touched = Instant::now();
        Some(apply_filters(&entry.breakdown, &entry.filters))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn purge(entries: &mut HashMap<String, SessionEntry>, ttl: Duration) {
        let now = Instant::now();
        entries.retain(|_, entry| now.duration_since(entry.touched) < ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{CardBreakdown, PrintingStatus};

    fn printing(edition: &str, foiling: &str, art: Option<&str>) -> PrintingStatus {
        PrintingStatus {
            set_id: "WTR132".to_string(),
            edition: edition.to_string(),
            foiling: foiling.to_string(),
            art_variation: art.map(str::to_string),
            rarity: "C".to_string(),
            pitch: Some(Pitch::Red),
            number_in_deck: 2,
            owned_quantity: 3,
            needed_quantity: -1,
        }
    }

    fn breakdown() -> DeckBreakdown {
        DeckBreakdown {
            hero: "Dorinthea Ironsong".to_string(),
            other_cards: vec![CardBreakdown {
                name: "Snatch".to_string(),
                pitch: Some(Pitch::Red),
                descriptor: None,
                amount: 2,
                printings: vec![
                    printing("U", "S", None),
                    printing("F", "R", Some("AA")),
                ],
            }],
            ..Default::default()
        }
    }

    fn filters(edition: Option<&str>, art: Option<&str>) -> FilterState {
        FilterState {
            edition: edition.map(str::to_string),
            art_variation: art.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn apply_filters_preserves_negative_needed() {
        let rows = apply_filters(&breakdown(), &FilterState::default());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].needed, -1);
    }

    #[test]
    fn edition_filter_restricts_rows() {
        let rows = apply_filters(&breakdown(), &filters(Some("F"), None));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].edition, "F");
    }

    #[test]
    fn all_value_clears_constraint() {
        let rows = apply_filters(&breakdown(), &filters(Some("all"), None));
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn missing_art_variation_fails_specific_filter() {
        let rows = apply_filters(&breakdown(), &filters(None, Some("AA")));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].art_variation.as_deref(), Some("AA"));
    }

    #[test]
    fn merge_keeps_unsupplied_values() {
        let mut state = filters(Some("U"), None);
        state.merge(&filters(None, Some("AA")));
        assert_eq!(state.edition.as_deref(), Some("U"));
        assert_eq!(state.art_variation.as_deref(), Some("AA"));

        state.merge(&filters(Some("all"), None));
        assert_eq!(state.edition.as_deref(), Some("all"));
        assert_eq!(state.art_variation.as_deref(), Some("AA"));
    }

    #[test]
    fn store_round_trips_breakdown() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = store.insert(breakdown());
        let rows = store.filtered_rows(&id, &FilterState::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn store_filters_persist_across_requests() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = store.insert(breakdown());

        let rows = store.filtered_rows(&id, &filters(Some("F"), None)).unwrap();
        assert_eq!(rows.len(), 1);

        // No parameters supplied: the stored edition filter still applies
        let rows = store.filtered_rows(&id, &FilterState::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].edition, "F");
    }

    #[test]
    fn unknown_session_returns_none() {
        let store = SessionStore::new(Duration::from_secs(60));
        assert!(store
            .filtered_rows("no-such-id", &FilterState::default())
            .is_none());
    }

    #[test]
    fn expired_session_is_purged() {
        let store = SessionStore::new(Duration::ZERO);
        let id = store.insert(breakdown());
        assert!(store.filtered_rows(&id, &FilterState::default()).is_none());
        assert!(store.is_empty());
    }
}
