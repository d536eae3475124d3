//! Deck-vs-collection comparison and shopping-list generation.
//!
//! Works over enriched deck entries (a card plus the quantity the deck
//! needs) and a map of owned quantities; the store supplies both.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{parse_price, Card};

/// One deck entry compared against the owned collection
#[derive(Debug, Clone, Serialize)]
pub struct DeckCardComparison {
    #[serde(flatten)]
    pub card: Card,
    #[serde(rename = "deckQuantity")]
    pub deck_quantity: i64,
    #[serde(rename = "ownedQuantity")]
    pub owned_quantity: i64,
    #[serde(rename = "missingQuantity")]
    pub missing_quantity: i64,
    #[serde(rename = "hasEnough")]
    pub has_enough: bool,
    #[serde(rename = "completionPercentage")]
    pub completion_percentage: f64,
}

/// Full comparison of a deck against the owned collection
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckComparison {
    pub cards: Vec<DeckCardComparison>,
    pub total_cards: i64,
    pub owned_cards: i64,
    pub missing_cards: i64,
    pub completion_percentage: f64,
    pub estimated_cost: f64,
    pub missing_cards_list: Vec<DeckCardComparison>,
}

/// Compare a deck's required entries against owned quantities.
///
/// Each entry carries its needed quantity in `card.quantity` (default 1);
/// `owned` maps card id to owned copies, with missing ids meaning 0.
/// Mainboard and sideboard entries for the same card arrive as separate
/// entries and are compared independently.
pub fn compare_deck_with_collection(
    deck_cards: &[Card],
    owned: &HashMap<String, i64>,
) -> DeckComparison {
    let mut cards = Vec::with_capacity(deck_cards.len());

    for card in deck_cards {
        let needed = match card.quantity {
            Some(q) if q > 0 => q,
            _ => 1,
        };
        let owned_qty = owned.get(&card.id).copied().unwrap_or(0);
        let missing = (needed - owned_qty).max(0);

        cards.push(DeckCardComparison {
            card: card.clone(),
            deck_quantity: needed,
            owned_quantity: owned_qty,
            missing_quantity: missing,
            has_enough: owned_qty >= needed,
            completion_percentage: (owned_qty as f64 / needed as f64 * 100.0).min(100.0),
        });
    }

    let total_cards: i64 = cards.iter().map(|c| c.deck_quantity).sum();
    // Excess copies of one card do not cover another card's shortfall
    let owned_cards: i64 = cards
        .iter()
        .map(|c| c.owned_quantity.min(c.deck_quantity))
        .sum();
    let missing_cards = total_cards - owned_cards;

    let estimated_cost: f64 = cards
        .iter()
        .filter(|c| c.missing_quantity > 0)
        .map(|c| parse_price(c.card.prices.usd.as_deref()) * c.missing_quantity as f64)
        .sum();

    let missing_cards_list: Vec<DeckCardComparison> =
        cards.iter().filter(|c| !c.has_enough).cloned().collect();

    DeckComparison {
        completion_percentage: if total_cards > 0 {
            owned_cards as f64 / total_cards as f64 * 100.0
        } else {
            0.0
        },
        cards,
        total_cards,
        owned_cards,
        missing_cards,
        estimated_cost,
        missing_cards_list,
    }
}

/// Render the missing cards of a comparison as a plain-text shopping list
pub fn generate_shopping_list(comparison: &DeckComparison) -> String {
    if comparison.missing_cards_list.is_empty() {
        return "You own all cards in this deck!".to_string();
    }

    let mut output = String::from("SHOPPING LIST\n");
    output.push_str(&"═".repeat(50));
    output.push_str("\n\n");

    let mut total_cost = 0.0;

    for card in &comparison.missing_cards_list {
        let price = parse_price(card.card.prices.usd.as_deref());
        let line_cost = price * card.missing_quantity as f64;
        total_cost += line_cost;

        output.push_str(&format!("{}x {}", card.missing_quantity, card.card.name));
        if price > 0.0 {
            output.push_str(&format!(" - ${:.2}", line_cost));
        }
        output.push('\n');
    }

    output.push('\n');
    output.push_str(&"─".repeat(50));
    output.push('\n');
    output.push_str(&format!("Total: ${:.2}\n", total_cost));
    output.push_str(&format!(
        "Missing {} of {} cards\n",
        comparison.missing_cards, comparison.total_cards
    ));

    output
}

/// Comparison entries grouped by card type for display
#[derive(Debug, Clone, Default, Serialize)]
pub struct CardGroups {
    pub creatures: Vec<DeckCardComparison>,
    pub spells: Vec<DeckCardComparison>,
    pub lands: Vec<DeckCardComparison>,
    pub other: Vec<DeckCardComparison>,
}

const SPELL_KEYWORDS: [&str; 5] = [
    "instant",
    "sorcery",
    "enchantment",
    "artifact",
    "planeswalker",
];

/// Bucket entries by type-line keyword.
///
/// Priority order: creature, spell, land, other — an "Artifact Creature"
/// counts as a creature, a "Dryad Arbor"-style land creature too.
pub fn group_cards_by_type(cards: &[DeckCardComparison]) -> CardGroups {
    let mut groups = CardGroups::default();

    for card in cards {
        let type_line = card.card.type_line.to_lowercase();

        if type_line.contains("creature") {
            groups.creatures.push(card.clone());
        } else if SPELL_KEYWORDS.iter().any(|kw| type_line.contains(kw)) {
            groups.spells.push(card.clone());
        } else if type_line.contains("land") {
            groups.lands.push(card.clone());
        } else {
            groups.other.push(card.clone());
        }
    }

    groups
}
