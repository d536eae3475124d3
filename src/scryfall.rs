//! Scryfall API client.
//!
//! Single-card lookups by id or fuzzy name, and batched lookups through the
//! /cards/collection endpoint. Batches are chunked to Scryfall's 75-identifier
//! limit with a short pause between requests.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::models::Card;

const SCRYFALL_API_BASE: &str = "https://api.scryfall.com";
/// The /cards/collection endpoint accepts at most this many identifiers
const COLLECTION_CHUNK_SIZE: usize = 75;
/// Pause between consecutive requests (Scryfall asks for 50-100ms)
const REQUEST_PAUSE_MS: u64 = 100;
const USER_AGENT: &str = "collection_tracker/0.1";

/// Result of a batched by-name lookup
#[derive(Debug, Default)]
pub struct CollectionLookup {
    /// Found cards keyed by lowercased name
    pub found: HashMap<String, Card>,
    /// Requested names that resolved to nothing
    pub not_found: Vec<String>,
}

impl CollectionLookup {
    /// Case-insensitive lookup by the name that was requested
    pub fn get(&self, name: &str) -> Option<&Card> {
        self.found.get(&name.to_lowercase())
    }
}

#[derive(Serialize)]
struct NameIdentifier<'a> {
    name: &'a str,
}

#[derive(Deserialize)]
struct CollectionResponse {
    #[serde(default)]
    data: Vec<Card>,
    #[serde(default)]
    not_found: Vec<serde_json::Value>,
}

/// Scryfall HTTP client with an overridable base URL for tests
#[derive(Clone)]
pub struct ScryfallClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for ScryfallClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ScryfallClient {
    pub fn new() -> Self {
        Self::with_base_url(SCRYFALL_API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Fetch a card by its Scryfall id
    pub async fn fetch_card_by_id(&self, id: &str) -> Result<Card> {
        let url = format!("{}/cards/{}", self.base_url, urlencoding::encode(id));
        log::debug!("Fetching card by id: {}", id);

        let response = self
            .http
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.json::<Card>().await?),
            reqwest::StatusCode::NOT_FOUND => Err(TrackerError::CardNotFound(id.to_string())),
            status => Err(TrackerError::HttpStatus(status)),
        }
    }

    /// Fetch a card by name (fuzzy search).
    ///
    /// When Scryfall resolves the query to a differently-named card, the
    /// result is flagged as a fuzzy match.
    pub async fn fetch_card_by_name(&self, name: &str) -> Result<Card> {
        let url = format!(
            "{}/cards/named?fuzzy={}",
            self.base_url,
            urlencoding::encode(name)
        );
        log::debug!("Fetching card by name: {}", name);

        let response = self
            .http
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let mut card = response.json::<Card>().await?;
                card.fuzzy_match = !card.name.eq_ignore_ascii_case(name.trim());
                Ok(card)
            }
            reqwest::StatusCode::NOT_FOUND => Err(TrackerError::CardNotFound(name.to_string())),
            status => Err(TrackerError::HttpStatus(status)),
        }
    }

    /// Fetch many cards by name through /cards/collection.
    ///
    /// Names are deduplicated, chunked, and looked up sequentially with a
    /// pause between chunks. A failed chunk is logged and skipped; its names
    /// end up in the not-found list and the batch continues.
    pub async fn fetch_collection(&self, names: &[String]) -> Result<CollectionLookup> {
        let unique_names = dedupe_names(names);
        let mut found: HashMap<String, Card> = HashMap::new();

        let chunks: Vec<&[String]> = unique_names.chunks(COLLECTION_CHUNK_SIZE).collect();
        let chunk_count = chunks.len();

        for (i, chunk) in chunks.into_iter().enumerate() {
            match self.fetch_collection_chunk(chunk).await {
                Ok(response) => {
                    if !response.not_found.is_empty() {
                        log::warn!(
                            "Scryfall could not resolve {} identifier(s) in chunk {}",
                            response.not_found.len(),
                            i + 1
                        );
                    }
                    for card in response.data {
                        found.insert(card.name.to_lowercase(), card);
                    }
                }
                Err(e) => {
                    log::error!("Collection lookup chunk {} failed: {}", i + 1, e);
                }
            }

            if i + 1 < chunk_count {
                tokio::time::sleep(Duration::from_millis(REQUEST_PAUSE_MS)).await;
            }
        }

        let not_found: Vec<String> = unique_names
            .iter()
            .filter(|name| !found.contains_key(&name.to_lowercase()))
            .cloned()
            .collect();

        log::info!(
            "Collection lookup: {} found, {} not found",
            found.len(),
            not_found.len()
        );

        Ok(CollectionLookup { found, not_found })
    }

    async fn fetch_collection_chunk(&self, names: &[String]) -> Result<CollectionResponse> {
        let identifiers: Vec<NameIdentifier<'_>> = names
            .iter()
            .map(|name| NameIdentifier { name })
            .collect();
        let body = serde_json::json!({ "identifiers": identifiers });

        let response = self
            .http
            .post(format!("{}/cards/collection", self.base_url))
            .header("User-Agent", USER_AGENT)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TrackerError::HttpStatus(response.status()));
        }

        Ok(response.json::<CollectionResponse>().await?)
    }
}

/// Deduplicate names case-insensitively, keeping first-seen order and casing
fn dedupe_names(names: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .iter()
        .filter(|name| seen.insert(name.to_lowercase()))
        .cloned()
        .collect()
}

#[cfg(test)]
#[path = "scryfall_tests.rs"]
mod tests;
