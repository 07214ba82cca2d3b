//! Printing reconciliation
//!
//! Takes a parsed or imported deck and, for every matched card, reports each
//! known printing together with the user's owned quantity and the quantity
//! still needed. `needed_quantity` is deliberately signed: a negative value
//! means the user owns more copies than the deck calls for, and display code
//! needs to tell that apart from "short by N".

use crate::database::{self, CardRow, DbResult};
use crate::deck::{ParsedDeck, Pitch};
use crate::import::ImportedDeck;
use rusqlite::Connection;
use serde::Serialize;

/// One printing of a matched card, enriched with ownership data
#[derive(Debug, Clone, Serialize)]
pub struct PrintingStatus {
    pub set_id: String,
    pub edition: String,
    pub foiling: String,
    pub art_variation: Option<String>,
    pub rarity: String,
    pub pitch: Option<Pitch>,
    pub number_in_deck: i64,
    pub owned_quantity: i64,
    pub needed_quantity: i64,
}

/// A matched card with all of its printings
#[derive(Debug, Clone, Serialize)]
pub struct CardBreakdown {
    pub name: String,
    pub pitch: Option<Pitch>,
    pub descriptor: Option<String>,
    /// Copies of this card in the deck
    pub amount: i64,
    pub printings: Vec<PrintingStatus>,
}

/// Full per-printing breakdown of a deck against one user's collection
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeckBreakdown {
    pub hero: String,
    pub hero_cards: Vec<CardBreakdown>,
    pub weapon_cards: Vec<CardBreakdown>,
    pub equipment_cards: Vec<CardBreakdown>,
    pub other_cards: Vec<CardBreakdown>,
    /// Deck entries that matched no catalog card and were dropped
    pub skipped_entries: usize,
}

fn printing_statuses(
    conn: &Connection,
    user_id: i64,
    card_id: i64,
    pitch: Option<Pitch>,
    number_in_deck: i64,
) -> DbResult<Vec<PrintingStatus>> {
    database::printings_for_card(conn, card_id)?
        .into_iter()
        .map(|printing| {
            let owned = database::owned_quantity(conn, user_id, printing.id)?;
            Ok(PrintingStatus {
                set_id: printing.set_id,
                edition: printing.edition,
                foiling: printing.foiling,
                art_variation: printing.art_variation,
                rarity: printing.rarity,
                pitch,
                number_in_deck,
                owned_quantity: owned,
                needed_quantity: number_in_deck - owned,
            })
        })
        .collect()
}

fn card_breakdown(
    conn: &Connection,
    user_id: i64,
    card: &CardRow,
    amount: i64,
) -> DbResult<CardBreakdown> {
    Ok(CardBreakdown {
        name: card.name.clone(),
        pitch: card.pitch,
        descriptor: card.descriptor.clone(),
        amount,
        printings: printing_statuses(conn, user_id, card.id, card.pitch, amount)?,
    })
}

/// Reconcile a parsed decklist against a user's collection
///
/// Weapon and equipment names are matched by name only, after translating
/// descriptor aliases to full card names. Main-deck entries are matched by
/// exact (name, pitch); entries that match nothing are dropped and counted,
/// not surfaced as errors.
pub fn reconcile_deck(
    conn: &Connection,
    user_id: i64,
    deck: &ParsedDeck,
) -> DbResult<DeckBreakdown> {
    let aliases = database::descriptor_aliases(conn)?;
    let weapons: Vec<String> = deck
        .weapons
        .iter()
        .map(|name| aliases.get(name).cloned().unwrap_or_else(|| name.clone()))
        .collect();
    let equipment: Vec<String> = deck
        .equipment
        .iter()
        .map(|name| aliases.get(name).cloned().unwrap_or_else(|| name.clone()))
        .collect();

    let mut breakdown = DeckBreakdown {
        hero: deck.hero.clone(),
        ..Default::default()
    };

    for card in database::find_cards_by_names(conn, &weapons)? {
        let amount = weapons.iter().filter(|name| **name == card.name).count() as i64;
        breakdown
            .weapon_cards
            .push(card_breakdown(conn, user_id, &card, amount)?);
    }

    for card in database::find_cards_by_names(conn, &equipment)? {
        let amount = equipment.iter().filter(|name| **name == card.name).count() as i64;
        breakdown
            .equipment_cards
            .push(card_breakdown(conn, user_id, &card, amount)?);
    }

    for ((name, pitch), count) in &deck.cards {
        match database::find_card(conn, name, *pitch)? {
            Some(card) => breakdown
                .other_cards
                .push(card_breakdown(conn, user_id, &card, *count as i64)?),
            None => {
                log::warn!("No catalog match for deck entry {:?} (pitch {:?})", name, pitch);
                breakdown.skipped_entries += 1;
            }
        }
    }

    if breakdown.skipped_entries > 0 {
        log::info!(
            "Dropped {} unmatched deck entry(ies)",
            breakdown.skipped_entries
        );
    }
    Ok(breakdown)
}

/// Reconcile an imported deck against a user's collection
///
/// Each imported card is resolved through its first printing's set code and
/// number, then expanded to every printing of the resolved card. Cards whose
/// printing is unknown to the catalog are kept with an empty printing list.
pub fn reconcile_import(
    conn: &Connection,
    user_id: i64,
    deck: &ImportedDeck,
) -> DbResult<DeckBreakdown> {
    let mut breakdown = DeckBreakdown::default();

    for card in &deck.cards {
        let resolved = match card.set_code() {
            Some(code) => database::find_printing_by_set_id(conn, &code)?,
            None => None,
        };

        let (pitch, printings) = match resolved {
            Some(printing) => {
                let row = database::card_by_id(conn, printing.card_id)?;
                let pitch = row.and_then(|c| c.pitch);
                (
                    pitch,
                    printing_statuses(conn, user_id, printing.card_id, pitch, card.total)?,
                )
            }
            None => {
                log::warn!("No catalog printing for imported card {:?}", card.name);
                (None, Vec::new())
            }
        };

        let entry = CardBreakdown {
            name: card.name.clone(),
            pitch,
            descriptor: card.descriptor.clone(),
            amount: card.total,
            printings,
        };

        match card.card_type.as_str() {
            "hero" => {
                if breakdown.hero.is_empty() {
                    breakdown.hero = card.name.clone();
                }
                breakdown.hero_cards.push(entry);
            }
            "weapon" => breakdown.weapon_cards.push(entry),
            "equipment" => breakdown.equipment_cards.push(entry),
            _ => breakdown.other_cards.push(entry),
        }
    }

    Ok(breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{make_test_card, make_test_printing, CatalogSnapshot};
    use crate::database::{
        apply_ownership_updates, init_schema, load_catalog_if_changed, OwnershipUpdate,
        PrintingKey,
    };

    fn loaded_db() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let snapshot = CatalogSnapshot::from_cards(
            vec![
                make_test_card(
                    "card-snatch-red",
                    "Snatch",
                    Some(Pitch::Red),
                    vec![make_test_printing("WTR132", "U", "S", None)],
                ),
                make_test_card(
                    "card-dawnblade",
                    "Dawnblade, Retainer of the Blade",
                    None,
                    vec![make_test_printing("WTR151", "U", "S", None)],
                ),
                make_test_card(
                    "card-dori",
                    "Dorinthea Ironsong",
                    None,
                    vec![make_test_printing("WTR001", "U", "S", None)],
                ),
            ],
            "fp-1",
        );
        load_catalog_if_changed(&mut conn, &snapshot).unwrap();
        conn
    }

    fn own(conn: &mut Connection, user_id: i64, set_id: &str, amount: i64) {
        apply_ownership_updates(
            conn,
            user_id,
            &[OwnershipUpdate {
                key: PrintingKey {
                    set_id: set_id.to_string(),
                    edition: "U".to_string(),
                    foiling: "S".to_string(),
                    art_variation: None,
                },
                amount,
            }],
        )
        .unwrap();
    }

    fn deck_with(cards: Vec<((&str, Option<Pitch>), u32)>) -> ParsedDeck {
        let mut deck = ParsedDeck::default();
        for ((name, pitch), count) in cards {
            deck.cards.insert((name.to_string(), pitch), count);
        }
        deck
    }

    #[test]
    fn needed_quantity_preserves_negative_values() {
        let mut conn = loaded_db();
        own(&mut conn, 7, "WTR132", 3);

        let deck = deck_with(vec![(("Snatch", Some(Pitch::Red)), 2)]);
        let breakdown = reconcile_deck(&conn, 7, &deck).unwrap();

        assert_eq!(breakdown.other_cards.len(), 1);
        let printing = &breakdown.other_cards[0].printings[0];
        assert_eq!(printing.number_in_deck, 2);
        assert_eq!(printing.owned_quantity, 3);
        assert_eq!(printing.needed_quantity, -1);
    }

    #[test]
    fn owned_quantity_defaults_to_zero_without_record() {
        let conn = loaded_db();
        let deck = deck_with(vec![(("Snatch", Some(Pitch::Red)), 2)]);
        let breakdown = reconcile_deck(&conn, 7, &deck).unwrap();

        let printing = &breakdown.other_cards[0].printings[0];
        assert_eq!(printing.owned_quantity, 0);
        assert_eq!(printing.needed_quantity, 2);
    }

    #[test]
    fn unmatched_entry_is_dropped_silently() {
        let conn = loaded_db();
        let deck = deck_with(vec![
            (("Snatch", Some(Pitch::Red)), 2),
            (("Snatch", Some(Pitch::Blue)), 2),
            (("Totally Unknown Card", None), 1),
        ]);
        let breakdown = reconcile_deck(&conn, 7, &deck).unwrap();

        assert_eq!(breakdown.other_cards.len(), 1);
        assert_eq!(breakdown.other_cards[0].name, "Snatch");
        assert_eq!(breakdown.skipped_entries, 2);
    }

    #[test]
    fn weapons_match_by_descriptor_alias() {
        let conn = loaded_db();
        let mut deck = ParsedDeck::default();
        deck.hero = "Dorinthea Ironsong".to_string();
        deck.weapons = vec!["Retainer of the Blade".to_string()];

        let breakdown = reconcile_deck(&conn, 7, &deck).unwrap();
        assert_eq!(breakdown.hero, "Dorinthea Ironsong");
        assert_eq!(breakdown.weapon_cards.len(), 1);
        assert_eq!(
            breakdown.weapon_cards[0].name,
            "Dawnblade, Retainer of the Blade"
        );
        assert_eq!(breakdown.weapon_cards[0].amount, 1);
    }

    #[test]
    fn equipment_matches_by_name_without_pitch() {
        let conn = loaded_db();
        let mut deck = ParsedDeck::default();
        deck.equipment = vec!["Dawnblade, Retainer of the Blade".to_string()];

        let breakdown = reconcile_deck(&conn, 7, &deck).unwrap();
        assert_eq!(breakdown.equipment_cards.len(), 1);
        assert_eq!(breakdown.equipment_cards[0].printings.len(), 1);
    }

    #[test]
    fn import_reconciliation_buckets_by_type() {
        let mut conn = loaded_db();
        own(&mut conn, 7, "WTR132", 1);

        let deck: ImportedDeck = serde_json::from_value(serde_json::json!({
            "name": "Test Deck",
            "cards": [
                {"type": "hero", "name": "Dorinthea Ironsong", "total": 1,
                 "printings": [{"sku": {"set": {"id": "wtr"}, "number": "001"}}]},
                {"type": "weapon", "name": "Dawnblade", "total": 1,
                 "printings": [{"sku": {"set": {"id": "wtr"}, "number": "151"}}]},
                {"type": "action", "name": "Snatch", "total": 2,
                 "printings": [{"sku": {"set": {"id": "wtr"}, "number": "132"}}]}
            ]
        }))
        .unwrap();

        let breakdown = reconcile_import(&conn, 7, &deck).unwrap();
        assert_eq!(breakdown.hero, "Dorinthea Ironsong");
        assert_eq!(breakdown.hero_cards.len(), 1);
        assert_eq!(breakdown.weapon_cards.len(), 1);
        assert_eq!(breakdown.other_cards.len(), 1);

        let snatch = &breakdown.other_cards[0];
        assert_eq!(snatch.pitch, Some(Pitch::Red));
        assert_eq!(snatch.printings[0].number_in_deck, 2);
        assert_eq!(snatch.printings[0].owned_quantity, 1);
        assert_eq!(snatch.printings[0].needed_quantity, 1);
    }

    #[test]
    fn import_keeps_unresolved_card_with_empty_printings() {
        let conn = loaded_db();
        let deck: ImportedDeck = serde_json::from_value(serde_json::json!({
            "cards": [
                {"type": "action", "name": "Mystery Card", "total": 3,
                 "printings": [{"sku": {"set": {"id": "zzz"}, "number": "999"}}]}
            ]
        }))
        .unwrap();

        let breakdown = reconcile_import(&conn, 7, &deck).unwrap();
        assert_eq!(breakdown.other_cards.len(), 1);
        assert!(breakdown.other_cards[0].printings.is_empty());
        assert_eq!(breakdown.other_cards[0].amount, 3);
    }
}
