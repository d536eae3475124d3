//! Local SQLite store for the collection, decks and deck membership.
//!
//! Uses parameterized queries exclusively (no SQL string concatenation);
//! multi-statement operations run inside transactions. The schema is built
//! by a versioned list of additive migration steps tracked through
//! `PRAGMA user_version`, so old databases upgrade in place at open time.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::analytics::PriceSnapshot;
use crate::error::{Result, TrackerError};
use crate::models::{
    Card, Deck, DeckCard, DeckDetails, DeckSummary, ImageUris, PriceHistory, Prices,
};

/// Ordered, additive migration steps. Each entry runs at most once; the
/// index of the last applied step is persisted in `user_version`.
const MIGRATIONS: &[&str] = &[
    // v1: owned cards
    "CREATE TABLE IF NOT EXISTS cards (
        id              TEXT PRIMARY KEY,
        name            TEXT NOT NULL,
        mana_cost       TEXT,
        type_line       TEXT NOT NULL DEFAULT '',
        oracle_text     TEXT,
        image_normal    TEXT,
        image_small     TEXT,
        image_large     TEXT,
        price_usd       TEXT,
        price_usd_foil  TEXT,
        price_eur       TEXT,
        price_tix       TEXT,
        fuzzy_match     INTEGER NOT NULL DEFAULT 0,
        created_at      TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE INDEX IF NOT EXISTS idx_cards_name ON cards(name);
    CREATE INDEX IF NOT EXISTS idx_cards_type_line ON cards(type_line);
    CREATE INDEX IF NOT EXISTS idx_cards_created_at ON cards(created_at);",
    // v2: owned quantity and favorites
    "ALTER TABLE cards ADD COLUMN quantity INTEGER NOT NULL DEFAULT 1;
     ALTER TABLE cards ADD COLUMN is_favorite INTEGER NOT NULL DEFAULT 0;",
    // v3: rolling price history
    "ALTER TABLE cards ADD COLUMN price_usd_6mo_ago TEXT;
     ALTER TABLE cards ADD COLUMN price_usd_12mo_ago TEXT;
     ALTER TABLE cards ADD COLUMN price_last_updated TEXT;",
    // v4: color and face data (JSON-encoded)
    "ALTER TABLE cards ADD COLUMN colors TEXT;
     ALTER TABLE cards ADD COLUMN color_identity TEXT;
     ALTER TABLE cards ADD COLUMN card_faces TEXT;",
    // v5: decks and deck membership. Mainboard and sideboard copies of the
    // same card are distinct rows, distinguished by the sideboard flag.
    "CREATE TABLE IF NOT EXISTS decks (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL UNIQUE,
        description TEXT,
        format      TEXT,
        created_at  TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE TABLE IF NOT EXISTS deck_cards (
        deck_id   TEXT NOT NULL,
        card_id   TEXT NOT NULL,
        quantity  INTEGER NOT NULL,
        sideboard INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (deck_id, card_id, sideboard),
        FOREIGN KEY (deck_id) REFERENCES decks(id) ON DELETE CASCADE,
        FOREIGN KEY (card_id) REFERENCES cards(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_deck_cards_deck ON deck_cards(deck_id);
    CREATE INDEX IF NOT EXISTS idx_deck_cards_card ON deck_cards(card_id);",
];

const CARD_COLUMNS: &str = "id, name, mana_cost, type_line, oracle_text,
    image_normal, image_small, image_large,
    price_usd, price_usd_foil, price_eur, price_tix,
    price_usd_6mo_ago, price_usd_12mo_ago, price_last_updated,
    quantity, is_favorite, fuzzy_match, colors, color_identity, card_faces";

/// Handle to the collection store with an explicit open/close lifecycle.
///
/// Constructed once and passed to each operation; tests use an in-memory
/// instance per test.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the store at the given path and apply migrations
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        Self::from_connection(conn)
    }

    /// Open a fresh in-memory store (used in tests)
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Close the store, flushing SQLite state
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| TrackerError::from(e))
    }

    /// Apply any migration steps newer than the stored schema version
    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        for (i, step) in MIGRATIONS.iter().enumerate().skip(version as usize) {
            self.conn.execute_batch(step)?;
            self.conn
                .pragma_update(None, "user_version", (i + 1) as i64)?;
            log::info!("Applied schema migration {}", i + 1);
        }

        Ok(())
    }

    /// Current schema version (number of applied migration steps)
    pub fn schema_version(&self) -> Result<i64> {
        Ok(self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?)
    }

    // ── Cards ──────────────────────────────────────────────────────────

    /// All cards in the collection, newest first
    pub fn list_cards(&self) -> Result<Vec<Card>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {} FROM cards ORDER BY created_at DESC, id",
            CARD_COLUMNS
        ))?;
        let cards = stmt
            .query_map([], row_to_card)?
            .collect::<rusqlite::Result<Vec<Card>>>()?;
        Ok(cards)
    }

    /// Look up a single card by id
    pub fn get_card(&self, id: &str) -> Result<Option<Card>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("SELECT {} FROM cards WHERE id = ?1", CARD_COLUMNS))?;
        Ok(stmt.query_row(params![id], row_to_card).optional()?)
    }

    /// Cards added today that are actually owned (quantity > 0)
    pub fn cards_added_today(&self) -> Result<Vec<Card>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {} FROM cards
             WHERE DATE(created_at) = DATE('now') AND quantity > 0
             ORDER BY created_at DESC",
            CARD_COLUMNS
        ))?;
        let cards = stmt
            .query_map([], row_to_card)?
            .collect::<rusqlite::Result<Vec<Card>>>()?;
        Ok(cards)
    }

    /// Add a card to the collection.
    ///
    /// A new card is inserted with the given quantity; an already-owned card
    /// has its quantity incremented instead. Returns the resulting quantity.
    pub fn add_card(&mut self, card: &Card, quantity: i64) -> Result<i64> {
        if card.id.trim().is_empty() || card.name.trim().is_empty() {
            return Err(TrackerError::Validation("Invalid card data".to_string()));
        }
        if quantity < 1 {
            return Err(TrackerError::Validation(
                "Quantity must be a positive integer".to_string(),
            ));
        }

        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT quantity FROM cards WHERE id = ?1",
                params![&card.id],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(current) => {
                let new_quantity = current + quantity;
                self.conn.execute(
                    "UPDATE cards SET quantity = ?1, updated_at = datetime('now') WHERE id = ?2",
                    params![new_quantity, &card.id],
                )?;
                log::debug!("Incremented {} to {} copies", card.name, new_quantity);
                Ok(new_quantity)
            }
            None => {
                self.insert_card(card, quantity)?;
                log::debug!("Added {} ({} copies)", card.name, quantity);
                Ok(quantity)
            }
        }
    }

    fn insert_card(&self, card: &Card, quantity: i64) -> Result<()> {
        insert_card_stmt(&self.conn, card, quantity)
    }

    /// Set a card's quantity; zero removes the card from the collection
    pub fn update_card_quantity(&mut self, id: &str, quantity: i64) -> Result<i64> {
        if quantity < 0 {
            return Err(TrackerError::Validation(
                "Quantity must be a non-negative integer".to_string(),
            ));
        }

        let changes = if quantity == 0 {
            self.conn
                .execute("DELETE FROM cards WHERE id = ?1", params![id])?
        } else {
            self.conn.execute(
                "UPDATE cards SET quantity = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![quantity, id],
            )?
        };

        if changes == 0 {
            return Err(TrackerError::NotFound("Card".to_string()));
        }
        Ok(quantity)
    }

    /// Remove one copy (or all copies) of a card.
    ///
    /// Returns the remaining quantity; removing the last copy deletes the
    /// row, cascading to any deck entries referencing it.
    pub fn remove_card(&mut self, id: &str, all: bool) -> Result<i64> {
        if all {
            let changes = self
                .conn
                .execute("DELETE FROM cards WHERE id = ?1", params![id])?;
            if changes == 0 {
                return Err(TrackerError::NotFound("Card".to_string()));
            }
            return Ok(0);
        }

        let current: Option<i64> = self
            .conn
            .query_row(
                "SELECT quantity FROM cards WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        match current {
            None => Err(TrackerError::NotFound("Card".to_string())),
            Some(quantity) if quantity <= 1 => {
                self.conn
                    .execute("DELETE FROM cards WHERE id = ?1", params![id])?;
                Ok(0)
            }
            Some(quantity) => {
                self.conn.execute(
                    "UPDATE cards SET quantity = ?1, updated_at = datetime('now') WHERE id = ?2",
                    params![quantity - 1, id],
                )?;
                Ok(quantity - 1)
            }
        }
    }

    /// Toggle the favorite flag
    pub fn set_favorite(&mut self, id: &str, is_favorite: bool) -> Result<()> {
        let changes = self.conn.execute(
            "UPDATE cards SET is_favorite = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![is_favorite as i64, id],
        )?;
        if changes == 0 {
            return Err(TrackerError::NotFound("Card".to_string()));
        }
        Ok(())
    }

    /// Stored price state for one card, as input to the rotation policy
    pub fn price_snapshot(&self, id: &str) -> Result<PriceSnapshot> {
        let snapshot = self
            .conn
            .query_row(
                "SELECT price_usd, price_usd_6mo_ago, price_usd_12mo_ago, price_last_updated
                 FROM cards WHERE id = ?1",
                params![id],
                |row| {
                    Ok(PriceSnapshot {
                        usd: row.get(0)?,
                        usd_6mo_ago: row.get(1)?,
                        usd_12mo_ago: row.get(2)?,
                        last_updated: row.get(3)?,
                    })
                },
            )
            .optional()?;
        snapshot.ok_or_else(|| TrackerError::NotFound("Card".to_string()))
    }

    /// Write back a refreshed card: fresh prices, rotated history and any
    /// enrichment data (images, text, colors) fetched along the way.
    pub fn apply_card_refresh(
        &mut self,
        id: &str,
        fetched: &Card,
        rotated: &PriceSnapshot,
    ) -> Result<()> {
        let changes = self.conn.execute(
            "UPDATE cards SET
                name = ?1,
                mana_cost = ?2,
                type_line = ?3,
                oracle_text = ?4,
                image_normal = ?5,
                image_small = ?6,
                image_large = ?7,
                colors = ?8,
                color_identity = ?9,
                card_faces = ?10,
                price_usd = ?11,
                price_usd_foil = ?12,
                price_eur = ?13,
                price_tix = ?14,
                price_usd_6mo_ago = ?15,
                price_usd_12mo_ago = ?16,
                price_last_updated = ?17,
                updated_at = datetime('now')
             WHERE id = ?18",
            params![
                &fetched.name,
                &fetched.mana_cost,
                &fetched.type_line,
                &fetched.oracle_text,
                fetched.image_uris.as_ref().and_then(|u| u.normal.as_deref()),
                fetched.image_uris.as_ref().and_then(|u| u.small.as_deref()),
                fetched.image_uris.as_ref().and_then(|u| u.large.as_deref()),
                to_json_opt(&fetched.colors)?,
                to_json_opt(&fetched.color_identity)?,
                to_json_opt(&fetched.card_faces)?,
                rotated.usd,
                &fetched.prices.usd_foil,
                &fetched.prices.eur,
                &fetched.prices.tix,
                rotated.usd_6mo_ago,
                rotated.usd_12mo_ago,
                rotated.last_updated,
                id,
            ],
        )?;
        if changes == 0 {
            return Err(TrackerError::NotFound("Card".to_string()));
        }
        Ok(())
    }

    /// Replace the whole collection (bulk import) as one all-or-nothing unit.
    ///
    /// A failure inside the transaction leaves the previous collection
    /// intact.
    pub fn replace_collection(&mut self, cards: &[Card]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM cards", [])?;
        for card in cards {
            if card.id.trim().is_empty() || card.name.trim().is_empty() {
                return Err(TrackerError::Validation("Invalid card data".to_string()));
            }
            insert_card_stmt(&tx, card, card.effective_quantity())?;
        }
        tx.commit()?;
        log::info!("Imported {} cards into the collection", cards.len());
        Ok(cards.len())
    }

    /// Owned quantity per card id, 0 for ids not in the collection
    pub fn owned_quantities(&self, ids: &[String]) -> Result<HashMap<String, i64>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT quantity FROM cards WHERE id = ?1")?;
        let mut owned = HashMap::with_capacity(ids.len());
        for id in ids {
            let quantity: Option<i64> = stmt
                .query_row(params![id], |row| row.get(0))
                .optional()?;
            owned.insert(id.clone(), quantity.unwrap_or(0));
        }
        Ok(owned)
    }

    // ── Decks ──────────────────────────────────────────────────────────

    /// All decks with their card counts, newest first
    pub fn list_decks(&self) -> Result<Vec<DeckSummary>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT d.id, d.name, d.description, d.format, d.created_at, d.updated_at,
                    COALESCE(SUM(dc.quantity), 0), COUNT(dc.card_id)
             FROM decks d
             LEFT JOIN deck_cards dc ON dc.deck_id = d.id
             GROUP BY d.id
             ORDER BY d.created_at DESC, d.id",
        )?;
        let decks = stmt
            .query_map([], |row| {
                Ok(DeckSummary {
                    deck: row_to_deck(row)?,
                    card_count: row.get(6)?,
                    unique_cards: row.get(7)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<DeckSummary>>>()?;
        Ok(decks)
    }

    /// Create a deck with a unique, trimmed, non-empty name
    pub fn create_deck(
        &mut self,
        name: &str,
        description: Option<&str>,
        format: Option<&str>,
    ) -> Result<Deck> {
        let tx = self.conn.transaction()?;
        let deck = create_deck_tx(&tx, name, description, format)?;
        tx.commit()?;
        log::info!("Created deck '{}'", deck.name);
        Ok(deck)
    }

    /// Look up a deck by id (without its cards)
    pub fn get_deck(&self, id: &str) -> Result<Option<Deck>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, name, description, format, created_at, updated_at
             FROM decks WHERE id = ?1",
        )?;
        Ok(stmt.query_row(params![id], row_to_deck).optional()?)
    }

    /// A deck with its entries joined to the card rows, ordered by name
    pub fn deck_details(&self, id: &str) -> Result<DeckDetails> {
        let deck = self
            .get_deck(id)?
            .ok_or_else(|| TrackerError::NotFound("Deck".to_string()))?;

        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {}, dc.quantity, dc.sideboard
             FROM deck_cards dc
             JOIN cards c ON dc.card_id = c.id
             WHERE dc.deck_id = ?1
             ORDER BY dc.sideboard, c.name",
            card_columns_qualified("c")
        ))?;

        let cards = stmt
            .query_map(params![id], |row| {
                Ok(DeckCard {
                    card: row_to_card(row)?,
                    deck_quantity: row.get(21)?,
                    sideboard: row.get::<_, i64>(22)? != 0,
                })
            })?
            .collect::<rusqlite::Result<Vec<DeckCard>>>()?;

        let card_count = cards.iter().map(|c| c.deck_quantity).sum();
        let unique_cards = cards.len() as i64;

        Ok(DeckDetails {
            deck,
            cards,
            card_count,
            unique_cards,
        })
    }

    /// Rename a deck and update its description/format
    pub fn update_deck(
        &mut self,
        id: &str,
        name: &str,
        description: Option<&str>,
        format: Option<&str>,
    ) -> Result<Deck> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TrackerError::Validation(
                "Deck name is required".to_string(),
            ));
        }

        if self.get_deck(id)?.is_none() {
            return Err(TrackerError::NotFound("Deck".to_string()));
        }

        let conflict: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM decks WHERE name = ?1 AND id != ?2",
                params![name, id],
                |row| row.get(0),
            )
            .optional()?;
        if conflict.is_some() {
            return Err(TrackerError::Validation(
                "A deck with this name already exists".to_string(),
            ));
        }

        self.conn.execute(
            "UPDATE decks SET name = ?1, description = ?2, format = ?3,
                              updated_at = datetime('now')
             WHERE id = ?4",
            params![name, description, format, id],
        )?;

        self.get_deck(id)?
            .ok_or_else(|| TrackerError::NotFound("Deck".to_string()))
    }

    /// Delete a deck; its entries cascade away
    pub fn delete_deck(&mut self, id: &str) -> Result<()> {
        let changes = self
            .conn
            .execute("DELETE FROM decks WHERE id = ?1", params![id])?;
        if changes == 0 {
            return Err(TrackerError::NotFound("Deck".to_string()));
        }
        Ok(())
    }

    // ── Deck entries ───────────────────────────────────────────────────

    /// Add copies of a collection card to a deck section.
    ///
    /// The (deck, card, sideboard) entry is created or its quantity
    /// incremented. Returns the new quantity.
    pub fn add_card_to_deck(
        &mut self,
        deck_id: &str,
        card_id: &str,
        quantity: i64,
        sideboard: bool,
    ) -> Result<i64> {
        if quantity < 1 {
            return Err(TrackerError::Validation(
                "Quantity must be a positive integer".to_string(),
            ));
        }
        if self.get_deck(deck_id)?.is_none() {
            return Err(TrackerError::NotFound("Deck".to_string()));
        }
        if self.get_card(card_id)?.is_none() {
            return Err(TrackerError::NotFound("Card".to_string()));
        }

        self.conn.execute(
            "INSERT INTO deck_cards (deck_id, card_id, quantity, sideboard)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(deck_id, card_id, sideboard)
             DO UPDATE SET quantity = quantity + excluded.quantity",
            params![deck_id, card_id, quantity, sideboard as i64],
        )?;

        let new_quantity = self.conn.query_row(
            "SELECT quantity FROM deck_cards
             WHERE deck_id = ?1 AND card_id = ?2 AND sideboard = ?3",
            params![deck_id, card_id, sideboard as i64],
            |row| row.get(0),
        )?;
        Ok(new_quantity)
    }

    /// Set a deck entry's quantity; zero removes the entry
    pub fn set_deck_card_quantity(
        &mut self,
        deck_id: &str,
        card_id: &str,
        quantity: i64,
        sideboard: bool,
    ) -> Result<i64> {
        if quantity < 0 {
            return Err(TrackerError::Validation(
                "Quantity must be a non-negative integer".to_string(),
            ));
        }

        let changes = if quantity == 0 {
            self.conn.execute(
                "DELETE FROM deck_cards
                 WHERE deck_id = ?1 AND card_id = ?2 AND sideboard = ?3",
                params![deck_id, card_id, sideboard as i64],
            )?
        } else {
            self.conn.execute(
                "UPDATE deck_cards SET quantity = ?1
                 WHERE deck_id = ?2 AND card_id = ?3 AND sideboard = ?4",
                params![quantity, deck_id, card_id, sideboard as i64],
            )?
        };

        if changes == 0 {
            return Err(TrackerError::NotFound("Card in deck".to_string()));
        }
        Ok(quantity)
    }

    /// Remove an entry from a deck
    pub fn remove_card_from_deck(
        &mut self,
        deck_id: &str,
        card_id: &str,
        sideboard: bool,
    ) -> Result<()> {
        let changes = self.conn.execute(
            "DELETE FROM deck_cards
             WHERE deck_id = ?1 AND card_id = ?2 AND sideboard = ?3",
            params![deck_id, card_id, sideboard as i64],
        )?;
        if changes == 0 {
            return Err(TrackerError::NotFound("Card in deck".to_string()));
        }
        Ok(())
    }

    /// Persist an imported deck in one transaction.
    ///
    /// Creates the deck, inserts any cards not yet in the collection with
    /// quantity 0 (referenced but unowned), and accumulates the entries.
    /// Duplicate-name lines from the parser collapse into one entry here.
    pub fn save_imported_deck(
        &mut self,
        name: &str,
        description: Option<&str>,
        format: Option<&str>,
        entries: &[(Card, i64, bool)],
    ) -> Result<Deck> {
        let tx = self.conn.transaction()?;
        let deck = create_deck_tx(&tx, name, description, format)?;

        {
            let mut entry_stmt = tx.prepare_cached(
                "INSERT INTO deck_cards (deck_id, card_id, quantity, sideboard)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(deck_id, card_id, sideboard)
                 DO UPDATE SET quantity = quantity + excluded.quantity",
            )?;

            for (card, quantity, sideboard) in entries {
                let exists: Option<String> = tx
                    .query_row(
                        "SELECT id FROM cards WHERE id = ?1",
                        params![&card.id],
                        |row| row.get(0),
                    )
                    .optional()?;
                if exists.is_none() {
                    insert_card_stmt(&tx, card, 0)?;
                }
                entry_stmt.execute(params![&deck.id, &card.id, quantity, *sideboard as i64])?;
            }
        }

        tx.commit()?;
        log::info!(
            "Imported deck '{}' with {} entries",
            deck.name,
            entries.len()
        );
        Ok(deck)
    }
}

// ── Row mapping helpers ────────────────────────────────────────────────

fn card_columns_qualified(alias: &str) -> String {
    CARD_COLUMNS
        .split(',')
        .map(|col| format!("{}.{}", alias, col.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn row_to_card(row: &Row<'_>) -> rusqlite::Result<Card> {
    let image_normal: Option<String> = row.get(5)?;
    let image_uris = image_normal.map(|normal| ImageUris {
        small: row.get(6).ok().flatten(),
        large: row.get(7).ok().flatten(),
        normal: Some(normal),
    });

    let six: Option<String> = row.get(12)?;
    let twelve: Option<String> = row.get(13)?;
    let last_updated: Option<String> = row.get(14)?;
    let price_history = if six.is_some() || twelve.is_some() || last_updated.is_some() {
        Some(PriceHistory {
            usd_6mo_ago: six,
            usd_12mo_ago: twelve,
            last_updated,
        })
    } else {
        None
    };

    Ok(Card {
        id: row.get(0)?,
        name: row.get(1)?,
        mana_cost: row.get(2)?,
        type_line: row.get(3)?,
        oracle_text: row.get(4)?,
        colors: from_json_opt(row.get(18)?),
        color_identity: from_json_opt(row.get(19)?),
        image_uris,
        card_faces: from_json_opt(row.get(20)?),
        prices: Prices {
            usd: row.get(8)?,
            usd_foil: row.get(9)?,
            eur: row.get(10)?,
            tix: row.get(11)?,
        },
        quantity: Some(row.get(15)?),
        price_history,
        is_favorite: row.get::<_, i64>(16)? != 0,
        fuzzy_match: row.get::<_, i64>(17)? != 0,
    })
}

fn row_to_deck(row: &Row<'_>) -> rusqlite::Result<Deck> {
    Ok(Deck {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        format: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn insert_card_stmt(conn: &Connection, card: &Card, quantity: i64) -> Result<()> {
    let history = card.price_history.as_ref();
    conn.execute(
        "INSERT OR REPLACE INTO cards (
            id, name, mana_cost, type_line, oracle_text,
            image_normal, image_small, image_large,
            price_usd, price_usd_foil, price_eur, price_tix,
            price_usd_6mo_ago, price_usd_12mo_ago, price_last_updated,
            quantity, is_favorite, fuzzy_match, colors, color_identity, card_faces
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                   ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
        params![
            &card.id,
            &card.name,
            &card.mana_cost,
            &card.type_line,
            &card.oracle_text,
            card.image_uris.as_ref().and_then(|u| u.normal.as_deref()),
            card.image_uris.as_ref().and_then(|u| u.small.as_deref()),
            card.image_uris.as_ref().and_then(|u| u.large.as_deref()),
            &card.prices.usd,
            &card.prices.usd_foil,
            &card.prices.eur,
            &card.prices.tix,
            history.and_then(|h| h.usd_6mo_ago.as_deref()),
            history.and_then(|h| h.usd_12mo_ago.as_deref()),
            history.and_then(|h| h.last_updated.as_deref()),
            quantity,
            card.is_favorite as i64,
            card.fuzzy_match as i64,
            to_json_opt(&card.colors)?,
            to_json_opt(&card.color_identity)?,
            to_json_opt(&card.card_faces)?,
        ],
    )?;
    Ok(())
}

fn create_deck_tx(
    conn: &Connection,
    name: &str,
    description: Option<&str>,
    format: Option<&str>,
) -> Result<Deck> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TrackerError::Validation(
            "Deck name is required".to_string(),
        ));
    }

    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM decks WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    if existing.is_some() {
        return Err(TrackerError::Validation(
            "A deck with this name already exists".to_string(),
        ));
    }

    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO decks (id, name, description, format) VALUES (?1, ?2, ?3, ?4)",
        params![&id, name, description, format],
    )?;

    conn.query_row(
        "SELECT id, name, description, format, created_at, updated_at
         FROM decks WHERE id = ?1",
        params![&id],
        row_to_deck,
    )
    .map_err(TrackerError::from)
}

fn to_json_opt<T: serde::Serialize>(value: &Option<T>) -> Result<Option<String>> {
    match value {
        Some(v) => Ok(Some(serde_json::to_string(v)?)),
        None => Ok(None),
    }
}

fn from_json_opt<T: serde::de::DeserializeOwned>(value: Option<String>) -> Option<T> {
    value.and_then(|s| serde_json::from_str(&s).ok())
}
