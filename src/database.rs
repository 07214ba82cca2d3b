//! Database operations for the collection tracker
//!
//! Uses parameterized queries exclusively. All multi-row writes run inside a
//! transaction so a failed batch leaves no partial state behind.

use crate::catalog::CatalogSnapshot;
use crate::deck::Pitch;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Result type for database operations
pub type DbResult<T> = rusqlite::Result<T>;

const CATALOG_CHECKSUM_KEY: &str = "catalog_checksum";

/// Initialize the database schema
///
/// Creates tables if they don't exist:
/// - `cards`: logical card identities, bulk-loaded from the catalog snapshot
/// - `printings`: physical print versions, one-to-many per card
/// - `user_card_status`: per-user ownership ledger, one row per (user, printing)
/// - `meta`: key/value store holding the catalog fingerprint
pub fn init_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS cards (
            id INTEGER PRIMARY KEY,
            unique_id TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            pitch INTEGER,
            descriptor TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_cards_name ON cards(name);
        CREATE INDEX IF NOT EXISTS idx_cards_descriptor ON cards(descriptor);

        CREATE TABLE IF NOT EXISTS printings (
            id INTEGER PRIMARY KEY,
            card_id INTEGER NOT NULL,
            set_printing_unique_id TEXT NOT NULL UNIQUE,
            set_id TEXT NOT NULL,
            edition TEXT NOT NULL,
            foiling TEXT NOT NULL,
            rarity TEXT NOT NULL,
            art_variation TEXT,
            FOREIGN KEY (card_id) REFERENCES cards(id)
        );

        CREATE INDEX IF NOT EXISTS idx_printings_card ON printings(card_id);
        CREATE INDEX IF NOT EXISTS idx_printings_set ON printings(set_id);

        -- One ownership record per (user, printing); quantities are never negative
        CREATE TABLE IF NOT EXISTS user_card_status (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            printing_id INTEGER NOT NULL,
            amount INTEGER NOT NULL DEFAULT 0 CHECK (amount >= 0),
            status TEXT NOT NULL DEFAULT 'owned',
            UNIQUE (user_id, printing_id),
            FOREIGN KEY (printing_id) REFERENCES printings(id)
        );

        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        ",
    )?;

    log::info!("Database schema initialized");
    Ok(())
}

/// Result of a catalog load operation
#[derive(Debug)]
pub struct CatalogLoad {
    /// Number of card rows now present
    pub cards: usize,
    /// Number of printing rows now present
    pub printings: usize,
    /// Whether the snapshot was actually written to the database
    pub reloaded: bool,
}

/// Load the catalog snapshot into the database if its fingerprint changed
///
/// Idempotent: when the stored fingerprint matches the snapshot and cards are
/// already present, nothing is written. Otherwise cards and printings are
/// upserted by their natural keys inside one transaction, so existing
/// ownership records keep pointing at the same printing rows, and the new
/// fingerprint is stored.
pub fn load_catalog_if_changed(
    conn: &mut Connection,
    snapshot: &CatalogSnapshot,
) -> DbResult<CatalogLoad> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = ?1",
            params![CATALOG_CHECKSUM_KEY],
            |row| row.get(0),
        )
        .optional()?;
    let card_count: i64 = conn.query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))?;

    if stored.as_deref() == Some(snapshot.fingerprint()) && card_count > 0 {
        let printing_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM printings", [], |row| row.get(0))?;
        log::info!(
            "Catalog fingerprint unchanged ({} cards), skipping reload",
            card_count
        );
        return Ok(CatalogLoad {
            cards: card_count as usize,
            printings: printing_count as usize,
            reloaded: false,
        });
    }

    let tx = conn.transaction()?;
    let (cards, printings) = upsert_catalog_tx(&tx, snapshot)?;
    tx.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
        params![CATALOG_CHECKSUM_KEY, snapshot.fingerprint()],
    )?;
    tx.commit()?;

    log::info!(
        "Loaded catalog into database: {} cards, {} printings",
        cards,
        printings
    );
    Ok(CatalogLoad {
        cards,
        printings,
        reloaded: true,
    })
}

fn upsert_catalog_tx(tx: &Transaction<'_>, snapshot: &CatalogSnapshot) -> DbResult<(usize, usize)> {
    let mut card_stmt = tx.prepare_cached(
        "INSERT INTO cards (unique_id, name, pitch, descriptor) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(unique_id) DO UPDATE SET
             name = excluded.name,
             pitch = excluded.pitch,
             descriptor = excluded.descriptor",
    )?;
    let mut id_stmt = tx.prepare_cached("SELECT id FROM cards WHERE unique_id = ?1")?;
    let mut printing_stmt = tx.prepare_cached(
        "INSERT INTO printings
             (card_id, set_printing_unique_id, set_id, edition, foiling, rarity, art_variation)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(set_printing_unique_id) DO UPDATE SET
             card_id = excluded.card_id,
             set_id = excluded.set_id,
             edition = excluded.edition,
             foiling = excluded.foiling,
             rarity = excluded.rarity,
             art_variation = excluded.art_variation",
    )?;

    let mut cards = 0;
    let mut printings = 0;
    for record in snapshot.cards() {
        card_stmt.execute(params![
            &record.unique_id,
            &record.name,
            record.pitch,
            record.descriptor(),
        ])?;
        let card_id: i64 = id_stmt.query_row(params![&record.unique_id], |row| row.get(0))?;
        cards += 1;

        for printing in &record.printings {
            printing_stmt.execute(params![
                card_id,
                &printing.set_printing_unique_id,
                &printing.set_id,
                &printing.edition,
                &printing.foiling,
                &printing.rarity,
                &printing.art_variation,
            ])?;
            printings += 1;
        }
    }

    Ok((cards, printings))
}

// ── Catalog queries ────────────────────────────────────────────────────────

/// A card row (for lookups and API responses)
#[derive(Debug, Clone, Serialize)]
pub struct CardRow {
    pub id: i64,
    pub name: String,
    pub pitch: Option<Pitch>,
    pub descriptor: Option<String>,
}

fn card_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CardRow> {
    Ok(CardRow {
        id: row.get(0)?,
        name: row.get(1)?,
        pitch: row.get(2)?,
        descriptor: row.get(3)?,
    })
}

const CARD_COLUMNS: &str = "id, name, pitch, descriptor";

/// Map of descriptor alias to full card name
pub fn descriptor_aliases(conn: &Connection) -> DbResult<HashMap<String, String>> {
    let mut stmt =
        conn.prepare("SELECT descriptor, name FROM cards WHERE descriptor IS NOT NULL")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    rows.collect()
}

/// Find a card by exact name and exact pitch (including no pitch)
pub fn find_card(conn: &Connection, name: &str, pitch: Option<Pitch>) -> DbResult<Option<CardRow>> {
    conn.query_row(
        &format!("SELECT {CARD_COLUMNS} FROM cards WHERE name = ?1 AND pitch IS ?2"),
        params![name, pitch],
        card_row,
    )
    .optional()
}

pub fn card_by_id(conn: &Connection, id: i64) -> DbResult<Option<CardRow>> {
    conn.query_row(
        &format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = ?1"),
        params![id],
        card_row,
    )
    .optional()
}

/// Find all cards whose name appears in `names` (pitch ignored)
///
/// Duplicate names are looked up once.
pub fn find_cards_by_names(conn: &Connection, names: &[String]) -> DbResult<Vec<CardRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {CARD_COLUMNS} FROM cards WHERE name = ?1"))?;
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            continue;
        }
        let rows = stmt.query_map(params![name], card_row)?;
        for row in rows {
            out.push(row?);
        }
    }
    Ok(out)
}

/// A printing row (for lookups and API responses)
#[derive(Debug, Clone, Serialize)]
pub struct PrintingRow {
    pub id: i64,
    pub card_id: i64,
    pub set_id: String,
    pub edition: String,
    pub foiling: String,
    pub rarity: String,
    pub art_variation: Option<String>,
}

fn printing_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PrintingRow> {
    Ok(PrintingRow {
        id: row.get(0)?,
        card_id: row.get(1)?,
        set_id: row.get(2)?,
        edition: row.get(3)?,
        foiling: row.get(4)?,
        rarity: row.get(5)?,
        art_variation: row.get(6)?,
    })
}

const PRINTING_COLUMNS: &str = "id, card_id, set_id, edition, foiling, rarity, art_variation";

/// All printings of a card
pub fn printings_for_card(conn: &Connection, card_id: i64) -> DbResult<Vec<PrintingRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PRINTING_COLUMNS} FROM printings WHERE card_id = ?1 ORDER BY set_id"
    ))?;
    let rows: DbResult<Vec<PrintingRow>> = stmt.query_map(params![card_id], printing_row)?.collect();
    rows
}

/// Compound key identifying one printing from the presentation layer
///
/// The presentation layer does not always carry surrogate printing ids, so
/// updates address printings by their descriptive attributes instead.
#[derive(Debug, Clone, Deserialize)]
pub struct PrintingKey {
    pub set_id: String,
    pub edition: String,
    pub foiling: String,
    #[serde(default)]
    pub art_variation: Option<String>,
}

/// Resolve a printing by its compound key
pub fn find_printing_by_key(conn: &Connection, key: &PrintingKey) -> DbResult<Option<PrintingRow>> {
    conn.query_row(
        &format!(
            "SELECT {PRINTING_COLUMNS} FROM printings
             WHERE set_id = ?1 AND edition = ?2 AND foiling = ?3 AND art_variation IS ?4"
        ),
        params![key.set_id, key.edition, key.foiling, key.art_variation],
        printing_row,
    )
    .optional()
}

/// Resolve a printing by set identifier alone (used by the deck import path)
pub fn find_printing_by_set_id(conn: &Connection, set_id: &str) -> DbResult<Option<PrintingRow>> {
    conn.query_row(
        &format!("SELECT {PRINTING_COLUMNS} FROM printings WHERE set_id = ?1"),
        params![set_id],
        printing_row,
    )
    .optional()
}

// ── Ownership ledger ───────────────────────────────────────────────────────

/// Quantity of a printing owned by a user (zero when no record exists)
pub fn owned_quantity(conn: &Connection, user_id: i64, printing_id: i64) -> DbResult<i64> {
    let amount: Option<i64> = conn
        .query_row(
            "SELECT amount FROM user_card_status WHERE user_id = ?1 AND printing_id = ?2",
            params![user_id, printing_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(amount.unwrap_or(0))
}

/// One requested ownership change
#[derive(Debug, Clone, Deserialize)]
pub struct OwnershipUpdate {
    #[serde(flatten)]
    pub key: PrintingKey,
    pub amount: i64,
}

/// Result of an ownership update batch
#[derive(Debug, Default, Serialize)]
pub struct OwnershipUpdateResult {
    /// Records inserted or updated
    pub written: usize,
    /// Records whose amount already matched the target (no write)
    pub unchanged: usize,
    /// Updates whose key matched no printing
    pub skipped: usize,
    /// "Card name: amount" per written record
    pub updated_cards: Vec<String>,
}

/// Apply a batch of ownership updates atomically
///
/// The whole batch runs inside one transaction; the read-check-write per key
/// is therefore not subject to lost updates from a concurrent batch for the
/// same user, and any persistence error rolls every entry back.
pub fn apply_ownership_updates(
    conn: &mut Connection,
    user_id: i64,
    updates: &[OwnershipUpdate],
) -> DbResult<OwnershipUpdateResult> {
    let tx = conn.transaction()?;
    let result = apply_ownership_updates_tx(&tx, user_id, updates)?;
    tx.commit()?;

    if result.skipped > 0 {
        log::warn!(
            "Skipped {} ownership update(s) with no matching printing",
            result.skipped
        );
    }
    Ok(result)
}

fn apply_ownership_updates_tx(
    tx: &Transaction<'_>,
    user_id: i64,
    updates: &[OwnershipUpdate],
) -> DbResult<OwnershipUpdateResult> {
    let mut result = OwnershipUpdateResult::default();

    for update in updates {
        let printing = match find_printing_by_key(tx, &update.key)? {
            Some(printing) => printing,
            None => {
                log::debug!("No printing for key {:?}", update.key);
                result.skipped += 1;
                continue;
            }
        };

        let existing: Option<i64> = tx
            .query_row(
                "SELECT amount FROM user_card_status WHERE user_id = ?1 AND printing_id = ?2",
                params![user_id, printing.id],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(amount) if amount == update.amount => result.unchanged += 1,
            Some(_) => {
                tx.execute(
                    "UPDATE user_card_status SET amount = ?3
                     WHERE user_id = ?1 AND printing_id = ?2",
                    params![user_id, printing.id, update.amount],
                )?;
                result.written += 1;
                result
                    .updated_cards
                    .push(written_label(tx, printing.card_id, update.amount)?);
            }
            None => {
                tx.execute(
                    "INSERT INTO user_card_status (user_id, printing_id, amount, status)
                     VALUES (?1, ?2, ?3, 'owned')",
                    params![user_id, printing.id, update.amount],
                )?;
                result.written += 1;
                result
                    .updated_cards
                    .push(written_label(tx, printing.card_id, update.amount)?);
            }
        }
    }

    Ok(result)
}

fn written_label(tx: &Transaction<'_>, card_id: i64, amount: i64) -> DbResult<String> {
    let name: String = tx.query_row(
        "SELECT name FROM cards WHERE id = ?1",
        params![card_id],
        |row| row.get(0),
    )?;
    Ok(format!("{}: {}", name, amount))
}

// ── Collection queries ─────────────────────────────────────────────────────

/// One owned printing with its card attributes (for listing and export)
#[derive(Debug, Clone, Serialize)]
pub struct CollectionRow {
    pub card_name: String,
    pub pitch: Option<Pitch>,
    pub printing_id: i64,
    pub set_id: String,
    pub edition: String,
    pub foiling: String,
    pub art_variation: Option<String>,
    pub rarity: String,
    pub amount: i64,
}

/// All printings a user owns at least one copy of
pub fn collection_rows(conn: &Connection, user_id: i64) -> DbResult<Vec<CollectionRow>> {
    let mut stmt = conn.prepare(
        "SELECT c.name, c.pitch, p.id, p.set_id, p.edition, p.foiling, p.art_variation,
                p.rarity, s.amount
         FROM user_card_status s
         JOIN printings p ON p.id = s.printing_id
         JOIN cards c ON c.id = p.card_id
         WHERE s.user_id = ?1 AND s.amount > 0
         ORDER BY c.name, p.set_id",
    )?;

    let rows: DbResult<Vec<CollectionRow>> = stmt
        .query_map(params![user_id], |row| {
            Ok(CollectionRow {
                card_name: row.get(0)?,
                pitch: row.get(1)?,
                printing_id: row.get(2)?,
                set_id: row.get(3)?,
                edition: row.get(4)?,
                foiling: row.get(5)?,
                art_variation: row.get(6)?,
                rarity: row.get(7)?,
                amount: row.get(8)?,
            })
        })?
        .collect();
    rows
}
