//! Decklist text parsing
//!
//! Accepts the line-oriented export format used by deck builders: `Hero:`,
//! `Weapons:` and `Equipment:` label lines followed by card lines of the
//! form `(<count>) <name> [(<pitch color>)]`. Parsing is best-effort: lines
//! that match no known shape are skipped, never rejected.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// Pitch color classification of a card
///
/// Stored and serialized as the numeric code 1/2/3. Colorless cards such as
/// equipment carry no pitch at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pitch {
    Red,
    Yellow,
    Blue,
}

impl Pitch {
    /// Parse a lowercase color word as it appears in decklist text
    pub fn from_color_word(word: &str) -> Option<Self> {
        match word {
            "red" => Some(Pitch::Red),
            "yellow" => Some(Pitch::Yellow),
            "blue" => Some(Pitch::Blue),
            _ => None,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Pitch::Red),
            2 => Some(Pitch::Yellow),
            3 => Some(Pitch::Blue),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Pitch::Red => 1,
            Pitch::Yellow => 2,
            Pitch::Blue => 3,
        }
    }

    /// Display name used in exports
    pub fn color_name(self) -> &'static str {
        match self {
            Pitch::Red => "Red",
            Pitch::Yellow => "Yellow",
            Pitch::Blue => "Blue",
        }
    }
}

impl Serialize for Pitch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.code())
    }
}

impl ToSql for Pitch {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for Pitch {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = i64::column_result(value)?;
        Pitch::from_code(code).ok_or(FromSqlError::OutOfRange(code))
    }
}

/// Structured result of parsing a decklist
///
/// Counts for duplicate (name, pitch) keys accumulate across lines. A `None`
/// pitch means the line carried no color and no earlier card line had
/// established one.
#[derive(Debug, Default, Clone)]
pub struct ParsedDeck {
    pub hero: String,
    pub weapons: Vec<String>,
    pub equipment: Vec<String>,
    pub cards: HashMap<(String, Option<Pitch>), u32>,
}

/// Parse the full text of a decklist
///
/// Card lines without an explicit pitch inherit the last pitch seen on an
/// earlier card line. A trailing parenthesized token that is not a
/// recognized color word is kept as part of the card name; this mirrors the
/// deck builder export format, where no card name contains a non-color
/// trailing token in practice.
pub fn parse_deck(text: &str) -> ParsedDeck {
    let mut deck = ParsedDeck::default();
    let mut last_pitch: Option<Pitch> = None;
    let mut skipped = 0usize;

    for line in text.trim().lines() {
        if line.contains("Class:") {
            continue;
        } else if let Some(rest) = split_label(line, "Hero:") {
            deck.hero = rest.to_string();
        } else if let Some(rest) = split_label(line, "Weapons:") {
            deck.weapons = split_list(rest);
        } else if let Some(rest) = split_label(line, "Equipment:") {
            deck.equipment = split_list(rest);
        } else if let Some(body) = line.strip_prefix('(') {
            let Some((count_str, card_info)) = body.split_once(')') else {
                skipped += 1;
                continue;
            };
            let Ok(count) = count_str.trim().parse::<u32>() else {
                skipped += 1;
                continue;
            };

            let rest = card_info.trim();
            let mut name = rest;
            let mut pitch = None;

            if let Some((head, tail)) = rest.rsplit_once(' ') {
                if let Some(p) = inner_token(tail).and_then(Pitch::from_color_word) {
                    pitch = Some(p);
                    name = head.trim();
                }
            }

            let pitch = pitch.or(last_pitch);
            last_pitch = pitch;

            *deck.cards.entry((name.to_string(), pitch)).or_insert(0) += count;
        } else if !line.trim().is_empty() {
            skipped += 1;
        }
    }

    if skipped > 0 {
        log::info!("Skipped {} unrecognized decklist line(s)", skipped);
    }
    deck
}

fn split_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    line.split_once(label).map(|(_, rest)| rest.trim())
}

fn split_list(rest: &str) -> Vec<String> {
    rest.split(", ").map(str::to_string).collect()
}

/// Token minus its first and last character
fn inner_token(token: &str) -> Option<&str> {
    let mut chars = token.chars();
    chars.next()?;
    chars.next_back()?;
    Some(chars.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(deck: &ParsedDeck, name: &str, pitch: Option<Pitch>) -> Option<u32> {
        deck.cards.get(&(name.to_string(), pitch)).copied()
    }

    #[test]
    fn parses_header_lines() {
        let text = "Class: Warrior\n\
                    Hero: Dorinthea Ironsong\n\
                    Weapons: Dawnblade, Dawnblade\n\
                    Equipment: Braveforge Bracers, Refraction Bolters\n\
                    (3) Sharpen Steel (blue)";
        let deck = parse_deck(text);
        assert_eq!(deck.hero, "Dorinthea Ironsong");
        assert_eq!(deck.weapons, vec!["Dawnblade", "Dawnblade"]);
        assert_eq!(
            deck.equipment,
            vec!["Braveforge Bracers", "Refraction Bolters"]
        );
        assert_eq!(entry(&deck, "Sharpen Steel", Some(Pitch::Blue)), Some(3));
    }

    #[test]
    fn explicit_pitch_round_trip() {
        let deck = parse_deck("(3) Command and Conquer (blue)");
        assert_eq!(deck.cards.len(), 1);
        assert_eq!(
            entry(&deck, "Command and Conquer", Some(Pitch::Blue)),
            Some(3)
        );
    }

    #[test]
    fn accumulates_duplicate_entries() {
        let deck = parse_deck("(2) Snatch (red)\n(1) Snatch (red)");
        assert_eq!(deck.cards.len(), 1);
        assert_eq!(entry(&deck, "Snatch", Some(Pitch::Red)), Some(3));
    }

    #[test]
    fn inherits_last_seen_pitch() {
        let deck = parse_deck("(2) Snatch (red)\n(1) Sink Below");
        assert_eq!(entry(&deck, "Snatch", Some(Pitch::Red)), Some(2));
        assert_eq!(entry(&deck, "Sink Below", Some(Pitch::Red)), Some(1));
    }

    #[test]
    fn inherited_pitch_becomes_last_seen() {
        let deck = parse_deck("(2) Snatch (red)\n(1) Sink Below\n(1) Fate Foreseen");
        assert_eq!(entry(&deck, "Sink Below", Some(Pitch::Red)), Some(1));
        assert_eq!(entry(&deck, "Fate Foreseen", Some(Pitch::Red)), Some(1));
    }

    #[test]
    fn pitch_absent_without_prior_line() {
        let deck = parse_deck("(2) Snatch");
        assert_eq!(entry(&deck, "Snatch", None), Some(2));
    }

    #[test]
    fn non_color_trailing_token_folds_into_name() {
        let deck = parse_deck("(1) Art of War (promo)");
        assert_eq!(entry(&deck, "Art of War (promo)", None), Some(1));
    }

    #[test]
    fn class_lines_ignored() {
        let deck = parse_deck("Class: Ranger");
        assert!(deck.cards.is_empty());
        assert!(deck.hero.is_empty());
    }

    #[test]
    fn unrecognized_lines_skipped() {
        let deck = parse_deck("some random note\n\n(2) Snatch (red)\nanother note");
        assert_eq!(deck.cards.len(), 1);
        assert_eq!(entry(&deck, "Snatch", Some(Pitch::Red)), Some(2));
    }

    #[test]
    fn malformed_count_skipped() {
        let deck = parse_deck("(x) Snatch (red)\n(two Sink Below");
        assert!(deck.cards.is_empty());
    }

    #[test]
    fn pitch_code_mapping() {
        assert_eq!(Pitch::from_color_word("red"), Some(Pitch::Red));
        assert_eq!(Pitch::from_color_word("yellow"), Some(Pitch::Yellow));
        assert_eq!(Pitch::from_color_word("blue"), Some(Pitch::Blue));
        assert_eq!(Pitch::from_color_word("green"), None);
        assert_eq!(Pitch::Red.code(), 1);
        assert_eq!(Pitch::from_code(3), Some(Pitch::Blue));
        assert_eq!(Pitch::from_code(4), None);
    }
}
