//! Fab Collection - Card Collection & Decklist Tracker
//!
//! Tracks which card printings a user owns in a SQLite database, parses
//! pasted decklists or imports them from the deck-building service, and
//! reconciles decks against the collection to show what is still needed.

pub mod catalog;
pub mod database;
pub mod deck;
pub mod error;
pub mod export;
pub mod import;
pub mod reconcile;
pub mod session;
pub mod web;

pub use catalog::{CardRecord, CatalogSnapshot, PrintingRecord};
pub use database::{
    apply_ownership_updates, collection_rows, init_schema, load_catalog_if_changed, CatalogLoad,
    CollectionRow, OwnershipUpdate, OwnershipUpdateResult, PrintingKey,
};
pub use deck::{parse_deck, ParsedDeck, Pitch};
pub use error::{CollectionError, Result};
pub use reconcile::{reconcile_deck, reconcile_import, CardBreakdown, DeckBreakdown};
pub use session::{FilterState, SessionStore};
