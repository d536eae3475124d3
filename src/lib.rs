//! Collection Tracker - personal MTG collection database
//!
//! Tracks owned cards and decks in a local SQLite database, enriches them
//! with card data and prices from Scryfall, and computes collection value,
//! price-history analytics and deck-vs-collection comparisons.

pub mod analytics;
pub mod database;
pub mod deck_comparison;
pub mod deck_parser;
pub mod error;
pub mod models;
pub mod scryfall;
pub mod web;

pub use analytics::{
    analyze_collection, calculate_collection_value, format_currency, rotate_price_history,
    AnalyticsReport, PriceSnapshot,
};
pub use database::Store;
pub use deck_comparison::{
    compare_deck_with_collection, generate_shopping_list, group_cards_by_type, DeckComparison,
};
pub use deck_parser::{parse_deck_list, validate_deck, ParsedDeck, ParsedDeckCard};
pub use error::{Result, TrackerError};
pub use models::{Card, Deck, PriceHistory, Prices};
pub use scryfall::{CollectionLookup, ScryfallClient};
