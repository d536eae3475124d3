//! Deck-list text parsing and validation.
//!
//! Turns free-form pasted deck lists ("4 Lightning Bolt", "2x Negate", bare
//! card names, category headers, a "Sideboard" divider) into structured
//! entries. Parsing never fails on a malformed line; the line simply yields
//! no entry. Structural problems are reported by [`validate_deck`].

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    /// "Sideboard", "Sideboard (15)", "sideboard:" all switch sections
    static ref SIDEBOARD_RE: Regex = Regex::new(r"(?i)^sideboard").unwrap();
    /// Category headers like "Creatures (12)" or "Lands(24)"
    static ref CATEGORY_RE: Regex = Regex::new(r"(?i)^[a-z]+\s*\(\d+\)$").unwrap();
    /// "4 Lightning Bolt" or "4x Lightning Bolt"
    static ref CARD_LINE_RE: Regex = Regex::new(r"^(\d+)x?\s+(.+)$").unwrap();
    /// Set code annotations like "(NEO)" or "[NEO]"
    static ref SET_CODE_RE: Regex = Regex::new(r"[(\[]\w+[)\]]").unwrap();
}

/// One parsed deck-list line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedDeckCard {
    pub quantity: u32,
    pub name: String,
    #[serde(rename = "isSideboard")]
    pub is_sideboard: bool,
}

/// A fully parsed deck list
#[derive(Debug, Clone, Serialize)]
pub struct ParsedDeck {
    pub mainboard: Vec<ParsedDeckCard>,
    pub sideboard: Vec<ParsedDeckCard>,
    #[serde(rename = "totalCards")]
    pub total_cards: u32,
}

/// Outcome of [`validate_deck`]
#[derive(Debug, Clone, Serialize)]
pub struct DeckValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Parse a pasted deck list, line by line.
///
/// Entries keep their input order and duplicate names are NOT merged; two
/// lines "2 Island" and "3 Island" stay two entries. Merging, where wanted,
/// happens downstream.
pub fn parse_deck_list(text: &str) -> ParsedDeck {
    let mut mainboard = Vec::new();
    let mut sideboard = Vec::new();
    let mut in_sideboard = false;

    for line in text.lines() {
        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        // One-way switch: everything after the divider is sideboard
        if SIDEBOARD_RE.is_match(line) {
            in_sideboard = true;
            continue;
        }

        if CATEGORY_RE.is_match(line) {
            continue;
        }

        if line.eq_ignore_ascii_case("deck") {
            continue;
        }

        if let Some((quantity, name)) = parse_card_line(line) {
            let entry = ParsedDeckCard {
                quantity,
                name,
                is_sideboard: in_sideboard,
            };
            if in_sideboard {
                sideboard.push(entry);
            } else {
                mainboard.push(entry);
            }
        }
    }

    let total_cards = mainboard.iter().map(|c| c.quantity).sum::<u32>()
        + sideboard.iter().map(|c| c.quantity).sum::<u32>();

    ParsedDeck {
        mainboard,
        sideboard,
        total_cards,
    }
}

/// Parse a single card line into (quantity, cleaned name).
///
/// A line starting with a digit that does not match the quantity pattern
/// (or carries a zero quantity) produces no entry.
fn parse_card_line(line: &str) -> Option<(u32, String)> {
    if let Some(caps) = CARD_LINE_RE.captures(line) {
        let quantity: u32 = caps[1].parse().ok()?;
        if quantity == 0 {
            return None;
        }
        return Some((quantity, clean_card_name(&caps[2])));
    }

    // No leading quantity means a single copy ("Island", "Lightning Bolt")
    if !line.starts_with(|c: char| c.is_ascii_digit()) && !line.is_empty() {
        return Some((1, clean_card_name(line)));
    }

    None
}

/// Strip double-faced back halves and set-code annotations.
///
/// Only the front face name is used for Scryfall lookup, so
/// "Brazen Borrower // Petty Theft" becomes "Brazen Borrower", and
/// "Island (NEO)" becomes "Island".
fn clean_card_name(raw: &str) -> String {
    let mut name = raw.trim();
    if let Some(idx) = name.find("//") {
        name = name[..idx].trim();
    }
    SET_CODE_RE.replace_all(name, "").trim().to_string()
}

/// Check that a parsed deck looks reasonable.
///
/// All violations are reported, not just the first. The size bounds are
/// deliberately loose to admit limited and commander lists.
pub fn validate_deck(deck: &ParsedDeck) -> DeckValidation {
    let mut errors = Vec::new();

    if deck.mainboard.is_empty() {
        errors.push("Deck must have at least one card".to_string());
    }

    let mainboard_size: u32 = deck.mainboard.iter().map(|c| c.quantity).sum();

    if mainboard_size < 30 {
        errors.push(format!(
            "Mainboard has only {} cards (seems too small)",
            mainboard_size
        ));
    }

    if mainboard_size > 250 {
        errors.push(format!(
            "Mainboard has {} cards (seems too large)",
            mainboard_size
        ));
    }

    let sideboard_size: u32 = deck.sideboard.iter().map(|c| c.quantity).sum();

    if sideboard_size > 15 {
        errors.push(format!(
            "Sideboard has {} cards (maximum is usually 15)",
            sideboard_size
        ));
    }

    DeckValidation {
        valid: errors.is_empty(),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(quantity: u32, name: &str, is_sideboard: bool) -> ParsedDeckCard {
        ParsedDeckCard {
            quantity,
            name: name.to_string(),
            is_sideboard,
        }
    }

    #[test]
    fn parses_basic_deck_with_sideboard() {
        let deck = parse_deck_list("4 Lightning Bolt\n1 Island (NEO)\nSideboard\n2 Negate");

        assert_eq!(
            deck.mainboard,
            vec![
                entry(4, "Lightning Bolt", false),
                entry(1, "Island", false),
            ]
        );
        assert_eq!(deck.sideboard, vec![entry(2, "Negate", true)]);
        assert_eq!(deck.total_cards, 7);
    }

    #[test]
    fn accepts_x_quantity_notation() {
        let deck = parse_deck_list("4x Lightning Bolt\n2X Shock");
        assert_eq!(deck.mainboard, vec![entry(4, "Lightning Bolt", false)]);
        // Uppercase X is not part of the quantity grammar, so "2X Shock"
        // starts with a digit without matching the pattern: no entry
        assert_eq!(deck.total_cards, 4);
    }

    #[test]
    fn bare_name_means_one_copy() {
        let deck = parse_deck_list("Island\nLightning Bolt");
        assert_eq!(
            deck.mainboard,
            vec![entry(1, "Island", false), entry(1, "Lightning Bolt", false)]
        );
        assert_eq!(deck.total_cards, 2);
    }

    #[test]
    fn skips_blank_lines_and_headers() {
        let deck = parse_deck_list("Deck\n\nCreatures (12)\n4 Llanowar Elves\n\nLands (24)\n20 Forest");
        assert_eq!(
            deck.mainboard,
            vec![
                entry(4, "Llanowar Elves", false),
                entry(20, "Forest", false),
            ]
        );
    }

    #[test]
    fn sideboard_switch_is_one_way() {
        let deck = parse_deck_list("4 Shock\nSideboard (15)\n2 Negate\nDeck\n3 Duress");
        assert_eq!(deck.mainboard.len(), 1);
        // "Deck" is skipped but does not switch back to mainboard
        assert_eq!(
            deck.sideboard,
            vec![entry(2, "Negate", true), entry(3, "Duress", true)]
        );
    }

    #[test]
    fn strips_double_faced_back_name() {
        let deck = parse_deck_list("3 Brazen Borrower // Petty Theft");
        assert_eq!(deck.mainboard, vec![entry(3, "Brazen Borrower", false)]);
    }

    #[test]
    fn strips_set_code_annotations() {
        let deck = parse_deck_list("2 Island (NEO)\n1 Mountain [MID]\nDelver of Secrets (ISD)");
        assert_eq!(
            deck.mainboard,
            vec![
                entry(2, "Island", false),
                entry(1, "Mountain", false),
                entry(1, "Delver of Secrets", false),
            ]
        );
    }

    #[test]
    fn digit_lines_without_name_produce_no_entry() {
        let deck = parse_deck_list("4\n4x\n123");
        assert!(deck.mainboard.is_empty());
        assert_eq!(deck.total_cards, 0);
    }

    #[test]
    fn zero_quantity_produces_no_entry() {
        let deck = parse_deck_list("0 Island\n4 Shock");
        assert_eq!(deck.mainboard, vec![entry(4, "Shock", false)]);
    }

    #[test]
    fn duplicate_names_stay_separate() {
        let deck = parse_deck_list("2 Island\n3 Island");
        assert_eq!(
            deck.mainboard,
            vec![entry(2, "Island", false), entry(3, "Island", false)]
        );
        assert_eq!(deck.total_cards, 5);
    }

    // Re-joining parsed entries as "qty name" lines and re-parsing must
    // reproduce the same entries (the stripping passes are already applied,
    // so a second pass is a no-op).
    #[test]
    fn reparse_of_regenerated_text_is_stable() {
        let input = "4 Lightning Bolt\n2 Island (NEO)\n1 Brazen Borrower // Petty Theft\nSideboard\n2 Negate";
        let first = parse_deck_list(input);

        let regenerated: String = first
            .mainboard
            .iter()
            .map(|c| format!("{} {}", c.quantity, c.name))
            .chain(std::iter::once("Sideboard".to_string()))
            .chain(
                first
                    .sideboard
                    .iter()
                    .map(|c| format!("{} {}", c.quantity, c.name)),
            )
            .collect::<Vec<_>>()
            .join("\n");

        let second = parse_deck_list(&regenerated);
        assert_eq!(second.mainboard, first.mainboard);
        assert_eq!(second.sideboard, first.sideboard);
        assert_eq!(second.total_cards, first.total_cards);
    }

    fn deck_of(mainboard_total: u32, sideboard_total: u32) -> ParsedDeck {
        let mut deck = ParsedDeck {
            mainboard: Vec::new(),
            sideboard: Vec::new(),
            total_cards: mainboard_total + sideboard_total,
        };
        if mainboard_total > 0 {
            deck.mainboard.push(entry(mainboard_total, "Forest", false));
        }
        if sideboard_total > 0 {
            deck.sideboard.push(entry(sideboard_total, "Negate", true));
        }
        deck
    }

    #[test]
    fn validates_reasonable_deck() {
        let result = validate_deck(&deck_of(60, 15));
        assert!(result.valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn empty_mainboard_is_always_invalid() {
        let result = validate_deck(&deck_of(0, 0));
        assert!(!result.valid);
        assert!(result
            .errors
            .iter()
            .any(|e| e.contains("at least one card")));
    }

    #[test]
    fn validates_size_bounds() {
        assert!(!validate_deck(&deck_of(29, 0)).valid);
        assert!(validate_deck(&deck_of(30, 0)).valid);
        assert!(validate_deck(&deck_of(250, 0)).valid);
        assert!(!validate_deck(&deck_of(251, 0)).valid);
    }

    #[test]
    fn validates_sideboard_limit() {
        assert!(validate_deck(&deck_of(60, 15)).valid);
        let result = validate_deck(&deck_of(60, 16));
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("Sideboard")));
    }

    #[test]
    fn reports_all_violations_at_once() {
        let result = validate_deck(&deck_of(0, 16));
        assert_eq!(result.errors.len(), 3); // empty, too small, sideboard
    }
}
