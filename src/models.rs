//! Domain types shared across the tracker.
//!
//! `Card` mirrors the Scryfall wire format so API responses deserialize
//! straight into it; the collection-only fields (quantity, favorite flag,
//! price history) are absent in Scryfall payloads and default accordingly.

use serde::{Deserialize, Serialize};

/// Current price snapshot, as returned by Scryfall (string-encoded decimals)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Prices {
    #[serde(default)]
    pub usd: Option<String>,
    #[serde(default)]
    pub usd_foil: Option<String>,
    #[serde(default)]
    pub eur: Option<String>,
    #[serde(default)]
    pub tix: Option<String>,
}

/// Image URLs for one printing (or one face of a double-faced card)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageUris {
    #[serde(default)]
    pub small: Option<String>,
    #[serde(default)]
    pub normal: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
}

/// One face of a double-faced card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardFace {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mana_cost: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_line: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oracle_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_uris: Option<ImageUris>,
}

/// Rolling historical USD prices for a card, maintained by the rotation
/// policy in [`crate::analytics`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceHistory {
    #[serde(rename = "usd6moAgo", default, skip_serializing_if = "Option::is_none")]
    pub usd_6mo_ago: Option<String>,
    #[serde(rename = "usd12moAgo", default, skip_serializing_if = "Option::is_none")]
    pub usd_12mo_ago: Option<String>,
    #[serde(rename = "lastUpdated", default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

/// A card, either fresh from Scryfall or loaded from the local collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mana_cost: Option<String>,
    #[serde(default)]
    pub type_line: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oracle_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_identity: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_uris: Option<ImageUris>,
    /// For double-faced cards, images and text live in the faces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_faces: Option<Vec<CardFace>>,
    #[serde(default)]
    pub prices: Prices,
    /// Owned copies; `None` on cards straight from Scryfall
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(
        rename = "priceHistory",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub price_history: Option<PriceHistory>,
    #[serde(rename = "isFavorite", default)]
    pub is_favorite: bool,
    /// Set when the card was resolved through fuzzy name lookup
    #[serde(rename = "fuzzyMatch", default)]
    pub fuzzy_match: bool,
}

impl Card {
    /// Current USD price as f64, 0.0 when absent or malformed
    pub fn price_usd_f64(&self) -> f64 {
        parse_price(self.prices.usd.as_deref())
    }

    /// Owned copies, defaulting to 1 when unset
    pub fn effective_quantity(&self) -> i64 {
        self.quantity.unwrap_or(1)
    }

    /// Primary (normal-size) image URL; falls back to the front face of a
    /// double-faced card
    pub fn image_url(&self) -> Option<&str> {
        if let Some(ref uris) = self.image_uris {
            if uris.normal.is_some() {
                return uris.normal.as_deref();
            }
        }
        if let Some(ref faces) = self.card_faces {
            if let Some(face) = faces.first() {
                if let Some(ref uris) = face.image_uris {
                    return uris.normal.as_deref();
                }
            }
        }
        None
    }
}

/// Parse a string-encoded price, treating absent/empty/non-numeric as 0.0
pub fn parse_price(price: Option<&str>) -> f64 {
    price
        .and_then(|p| p.trim().parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// A named deck
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deck {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Deck list entry with aggregate card counts
#[derive(Debug, Clone, Serialize)]
pub struct DeckSummary {
    #[serde(flatten)]
    pub deck: Deck,
    #[serde(rename = "cardCount")]
    pub card_count: i64,
    #[serde(rename = "uniqueCards")]
    pub unique_cards: i64,
}

/// A card row joined with its deck membership
#[derive(Debug, Clone, Serialize)]
pub struct DeckCard {
    #[serde(flatten)]
    pub card: Card,
    #[serde(rename = "deckQuantity")]
    pub deck_quantity: i64,
    pub sideboard: bool,
}

/// A deck with its full card list
#[derive(Debug, Clone, Serialize)]
pub struct DeckDetails {
    #[serde(flatten)]
    pub deck: Deck,
    pub cards: Vec<DeckCard>,
    #[serde(rename = "cardCount")]
    pub card_count: i64,
    #[serde(rename = "uniqueCards")]
    pub unique_cards: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_price_handles_malformed_input() {
        assert_eq!(parse_price(Some("1.50")), 1.5);
        assert_eq!(parse_price(Some("  2.25 ")), 2.25);
        assert_eq!(parse_price(Some("")), 0.0);
        assert_eq!(parse_price(Some("n/a")), 0.0);
        assert_eq!(parse_price(None), 0.0);
    }

    #[test]
    fn card_deserializes_from_scryfall_payload() {
        let json = r#"{
            "id": "abc-123",
            "name": "Lightning Bolt",
            "mana_cost": "{R}",
            "type_line": "Instant",
            "oracle_text": "Lightning Bolt deals 3 damage to any target.",
            "colors": ["R"],
            "color_identity": ["R"],
            "image_uris": {"normal": "https://example.com/bolt.jpg"},
            "prices": {"usd": "1.50", "usd_foil": null, "eur": "1.20", "tix": "0.03"}
        }"#;

        let card: Card = serde_json::from_str(json).unwrap();
        assert_eq!(card.name, "Lightning Bolt");
        assert_eq!(card.prices.usd.as_deref(), Some("1.50"));
        assert_eq!(card.quantity, None);
        assert!(!card.is_favorite);
        assert_eq!(card.price_usd_f64(), 1.5);
        assert_eq!(card.effective_quantity(), 1);
    }

    #[test]
    fn image_url_prefers_root_uris() {
        let card: Card = serde_json::from_str(
            r#"{
                "id": "1",
                "name": "Test",
                "image_uris": {"normal": "https://example.com/root.jpg"},
                "card_faces": [
                    {"name": "Front", "image_uris": {"normal": "https://example.com/front.jpg"}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(card.image_url(), Some("https://example.com/root.jpg"));
    }

    #[test]
    fn image_url_falls_back_to_front_face() {
        let card: Card = serde_json::from_str(
            r#"{
                "id": "1",
                "name": "Delver of Secrets // Insectile Aberration",
                "card_faces": [
                    {"name": "Delver of Secrets", "image_uris": {"normal": "https://example.com/front.jpg"}},
                    {"name": "Insectile Aberration", "image_uris": {"normal": "https://example.com/back.jpg"}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(card.image_url(), Some("https://example.com/front.jpg"));
    }

    #[test]
    fn image_url_none_when_no_images() {
        let card: Card = serde_json::from_str(r#"{"id": "1", "name": "Test"}"#).unwrap();
        assert_eq!(card.image_url(), None);
    }
}
