//! CSV export of a user's owned printings
//!
//! Short codes from the catalog are resolved to display names through static
//! lookup tables; codes missing from a table render as "Unknown".

use crate::database::CollectionRow;
use crate::deck::Pitch;
use crate::error::Result;
use std::io::Write;

fn set_name(prefix: &str) -> &'static str {
    match prefix {
        "1HP" => "History Pack 1",
        "ARA" => "Arakni Blitz Deck",
        "ARC" => "Arcane Rising",
        "AZL" => "Azalea Blitz Deck",
        "BEN" => "Benji Blitz Deck",
        "BOL" => "Boltyn Blitz Deck",
        "BRI" => "Briar Blitz Deck",
        "BVO" => "Bravo Hero Deck",
        "CHN" => "Chane Blitz Deck",
        "CRU" => "Crucible of War",
        "DRO" => "Dromai Blitz Deck",
        "DTD" => "Dusk till Dawn",
        "DVR" => "Classic Battles: Rhinar vs Dorinthea – Dorinthea",
        "DYN" => "Dynasty",
        "ELE" => "Tales of Aria",
        "EVO" => "Bright Lights",
        "EVR" => "Everfest",
        "FAB" => "Promos",
        "FAI" => "Fai Blitz Deck",
        "HER" => "Hero Card Promos",
        "IRA" => "Ira Welcome Deck",
        "JDG" => "Judge Unique Promos",
        "KAT" => "Katsu Blitz Deck",
        "KSU" => "Katsu Hero Deck",
        "LEV" => "Levia Blitz Deck",
        "LGS" => "Local Game Store Promos",
        "LSS" => "LSS Promos",
        "LXI" => "Lexi Blitz Deck",
        "MON" => "Monarch",
        "OLD" => "Oldhim Blitz Deck",
        "OUT" => "Outsiders",
        "OXO" => "Slingshot Underground Promos",
        "PSM" => "Prism Blitz Deck",
        "RIP" => "Riptide Blitz Deck",
        "RNR" => "Rhinar Hero Deck",
        "RVD" => "Classic Battles: Rhinar vs Dorinthea – Rhinar",
        "TCC" => "Round the Table: TCC X LSS",
        "TEA" => "Dorinthea Hero Deck",
        "UPR" => "Uprising",
        "UZU" => "Uzuri Blitz Deck",
        "WIN" => "Worlds / Pro Tour Prize Cards",
        "WTR" => "Welcome to Rathe",
        "XXX" => "OP Event Tokens",
        _ => "Unknown",
    }
}

fn rarity_name(code: &str) -> &'static str {
    match code {
        "C" => "Common",
        "R" => "Rare",
        "S" => "Super Rare",
        "M" => "Majestic",
        "L" => "Legendary",
        "F" => "Fabled",
        "T" => "Token",
        "V" => "Marvel",
        "P" => "Promo",
        _ => "Unknown",
    }
}

fn foiling_name(code: &str) -> &'static str {
    match code {
        "S" => "Standard",
        "R" => "Rainbow Foil",
        "C" => "Cold Foil",
        "G" => "Gold Cold Foil",
        _ => "Unknown",
    }
}

fn edition_name(code: &str) -> &'static str {
    match code {
        "A" => "Alpha",
        "F" => "First",
        "U" => "Unlimited",
        "N" => "N/A",
        _ => "Unknown",
    }
}

fn art_variation_name(code: Option<&str>) -> &'static str {
    match code {
        Some("AB") => "Alternate Border",
        Some("AA") => "Alternate Art",
        Some("AT") => "Alternate Text",
        Some("EA") => "Extended Art",
        Some("FA") => "Full Art",
        _ => "Unknown",
    }
}

fn pitch_name(pitch: Option<Pitch>) -> &'static str {
    match pitch {
        Some(p) => p.color_name(),
        None => "None",
    }
}

/// Lowercased card name with spaces and commas replaced by dashes
fn identifier(name: &str) -> String {
    name.replace(' ', "-").replace(',', "-").to_lowercase()
}

/// First three characters of a set identifier
fn set_prefix(set_id: &str) -> String {
    set_id.chars().take(3).collect()
}

/// Last three characters of a set identifier
fn set_number(set_id: &str) -> String {
    let chars: Vec<char> = set_id.chars().collect();
    let start = chars.len().saturating_sub(3);
    chars[start..].iter().collect()
}

/// Write the owned-printings CSV, one row per owned printing
pub fn write_collection_csv<W: Write>(rows: &[CollectionRow], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record([
        "Identifier",
        "Name",
        "Pitch",
        "Set",
        "Set number",
        "Edition",
        "Foiling",
        "Art Variation",
        "Rarity",
    ])?;

    for row in rows {
        let ident = identifier(&row.card_name);
        let number = set_number(&row.set_id);
        csv_writer.write_record([
            ident.as_str(),
            row.card_name.as_str(),
            pitch_name(row.pitch),
            set_name(&set_prefix(&row.set_id)),
            number.as_str(),
            edition_name(&row.edition),
            foiling_name(&row.foiling),
            art_variation_name(row.art_variation.as_deref()),
            rarity_name(&row.rarity),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Render the collection CSV into a byte buffer (for HTTP responses)
pub fn collection_csv_bytes(rows: &[CollectionRow]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_collection_csv(rows, &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(card_name: &str, pitch: Option<Pitch>, set_id: &str) -> CollectionRow {
        CollectionRow {
            card_name: card_name.to_string(),
            pitch,
            printing_id: 1,
            set_id: set_id.to_string(),
            edition: "U".to_string(),
            foiling: "S".to_string(),
            art_variation: None,
            rarity: "C".to_string(),
            amount: 2,
        }
    }

    fn csv_text(rows: &[CollectionRow]) -> String {
        String::from_utf8(collection_csv_bytes(rows).unwrap()).unwrap()
    }

    #[test]
    fn writes_header_and_resolved_row() {
        let text = csv_text(&[row("Snatch", Some(Pitch::Red), "WTR132")]);
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Identifier,Name,Pitch,Set,Set number,Edition,Foiling,Art Variation,Rarity"
        );
        assert_eq!(
            lines.next().unwrap(),
            "snatch,Snatch,Red,Welcome to Rathe,132,Unlimited,Standard,Unknown,Common"
        );
    }

    #[test]
    fn unknown_set_prefix_renders_unknown() {
        let text = csv_text(&[row("Mystery", None, "ZZZ101")]);
        assert!(text.contains("Unknown,101"), "csv was: {}", text);
    }

    #[test]
    fn identifier_replaces_spaces_and_commas() {
        assert_eq!(
            identifier("Braveforge, Bracers of Belief"),
            "braveforge--bracers-of-belief"
        );
        assert_eq!(identifier("Snatch"), "snatch");
    }

    #[test]
    fn pitch_none_renders_none() {
        let text = csv_text(&[row("Fyendal's Spring Tunic", None, "WTR150")]);
        assert!(text.contains(",None,Welcome to Rathe,"), "csv was: {}", text);
    }

    #[test]
    fn art_variation_codes_resolve() {
        assert_eq!(art_variation_name(Some("AA")), "Alternate Art");
        assert_eq!(art_variation_name(Some("XY")), "Unknown");
        assert_eq!(art_variation_name(None), "Unknown");
    }

    #[test]
    fn short_set_id_does_not_panic() {
        assert_eq!(set_prefix("AB"), "AB");
        assert_eq!(set_number("AB"), "AB");
    }
}
