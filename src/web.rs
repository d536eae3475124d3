//! HTTP API for the collection tracker UI.
//!
//! All endpoints answer with an `ApiResponse` JSON envelope. The store sits
//! behind a mutex; handlers take the lock only around store calls so it is
//! never held across a Scryfall round trip.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::analytics::{analyze_collection, rotate_price_history, AnalyticsReport};
use crate::database::Store;
use crate::deck_comparison::{compare_deck_with_collection, generate_shopping_list, DeckComparison};
use crate::deck_parser::{parse_deck_list, validate_deck};
use crate::error::TrackerError;
use crate::models::{Card, Deck, DeckDetails, DeckSummary};
use crate::scryfall::ScryfallClient;

/// Pause between Scryfall requests during bulk refresh
const REFRESH_PAUSE_MS: u64 = 100;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<Store>>,
    scryfall: ScryfallClient,
}

/// API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

type ApiError = (StatusCode, Json<ApiResponse<()>>);

/// Map a tracker error to its HTTP status and response body
fn reject(err: TrackerError) -> ApiError {
    let status = match &err {
        TrackerError::Validation(_) => StatusCode::BAD_REQUEST,
        TrackerError::NotFound(_) | TrackerError::CardNotFound(_) => StatusCode::NOT_FOUND,
        TrackerError::Network(_) | TrackerError::HttpStatus(_) => StatusCode::BAD_GATEWAY,
        TrackerError::Parse(_) | TrackerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        log::error!("Request failed: {}", err);
    } else {
        log::debug!("Request rejected: {}", err);
    }
    (
        status,
        Json(ApiResponse {
            success: false,
            data: None,
            error: Some(err.to_string()),
        }),
    )
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

/// GET / - single-page web UI
async fn index_handler() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

// ── Collection ─────────────────────────────────────────────────────────

/// GET /api/collection
async fn list_collection(State(state): State<AppState>) -> ApiResult<Vec<Card>> {
    let store = state.store.lock().unwrap();
    store.list_cards().map(ApiResponse::ok).map_err(reject)
}

#[derive(Serialize)]
struct QuantityChange {
    quantity: i64,
    message: String,
}

/// POST /api/collection - add a card (increments quantity when already owned)
async fn add_card(
    State(state): State<AppState>,
    Json(card): Json<Card>,
) -> ApiResult<QuantityChange> {
    let quantity = card.effective_quantity();
    let mut store = state.store.lock().unwrap();
    let new_quantity = store.add_card(&card, quantity).map_err(reject)?;

    let message = if new_quantity == quantity {
        "Card added to collection".to_string()
    } else {
        format!("Card quantity updated to {}", new_quantity)
    };
    Ok(ApiResponse::ok(QuantityChange {
        quantity: new_quantity,
        message,
    }))
}

#[derive(Deserialize)]
struct RemoveParams {
    #[serde(default)]
    all: bool,
}

/// DELETE /api/collection/{id}?all=true
async fn remove_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<RemoveParams>,
) -> ApiResult<QuantityChange> {
    let mut store = state.store.lock().unwrap();
    let quantity = store.remove_card(&id, params.all).map_err(reject)?;

    let message = if quantity == 0 {
        "Card removed from collection".to_string()
    } else {
        format!("Card quantity updated to {}", quantity)
    };
    Ok(ApiResponse::ok(QuantityChange { quantity, message }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuantityUpdate {
    card_id: String,
    quantity: i64,
}

/// PUT /api/collection/quantity
async fn update_quantity(
    State(state): State<AppState>,
    Json(update): Json<QuantityUpdate>,
) -> ApiResult<QuantityChange> {
    let mut store = state.store.lock().unwrap();
    let quantity = store
        .update_card_quantity(&update.card_id, update.quantity)
        .map_err(reject)?;

    let message = if quantity == 0 {
        "Card removed from collection".to_string()
    } else {
        "Card quantity updated".to_string()
    };
    Ok(ApiResponse::ok(QuantityChange { quantity, message }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FavoriteUpdate {
    is_favorite: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FavoriteChange {
    is_favorite: bool,
    message: String,
}

/// PUT /api/collection/{id}/favorite
async fn set_favorite(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<FavoriteUpdate>,
) -> ApiResult<FavoriteChange> {
    let mut store = state.store.lock().unwrap();
    store
        .set_favorite(&id, update.is_favorite)
        .map_err(reject)?;

    let message = if update.is_favorite {
        "Card added to favorites".to_string()
    } else {
        "Card removed from favorites".to_string()
    };
    Ok(ApiResponse::ok(FavoriteChange {
        is_favorite: update.is_favorite,
        message,
    }))
}

/// GET /api/collection/today
async fn todays_additions(State(state): State<AppState>) -> ApiResult<Vec<Card>> {
    let store = state.store.lock().unwrap();
    store
        .cards_added_today()
        .map(ApiResponse::ok)
        .map_err(reject)
}

#[derive(Deserialize)]
struct SearchParams {
    q: String,
}

/// GET /api/search?q={name} - fuzzy single-card lookup on Scryfall
async fn search_card(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Card> {
    if params.q.trim().is_empty() {
        return Err(reject(TrackerError::Validation(
            "Search query is required".to_string(),
        )));
    }
    state
        .scryfall
        .fetch_card_by_name(&params.q)
        .await
        .map(ApiResponse::ok)
        .map_err(reject)
}

// ── Prices & analytics ─────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PriceRow {
    id: String,
    name: String,
    current_price: f64,
    price_6mo_ago: Option<f64>,
    price_12mo_ago: Option<f64>,
    last_updated: Option<String>,
}

/// GET /api/prices - current and historical prices for all cards
async fn list_prices(State(state): State<AppState>) -> ApiResult<Vec<PriceRow>> {
    let store = state.store.lock().unwrap();
    let cards = store.list_cards().map_err(reject)?;

    let rows = cards
        .into_iter()
        .map(|card| {
            let history = card.price_history.as_ref();
            PriceRow {
                current_price: card.price_usd_f64(),
                price_6mo_ago: history
                    .and_then(|h| h.usd_6mo_ago.as_deref())
                    .and_then(|p| p.parse().ok()),
                price_12mo_ago: history
                    .and_then(|h| h.usd_12mo_ago.as_deref())
                    .and_then(|p| p.parse().ok()),
                last_updated: history.and_then(|h| h.last_updated.clone()),
                id: card.id,
                name: card.name,
            }
        })
        .collect();
    Ok(ApiResponse::ok(rows))
}

#[derive(Serialize)]
struct RefreshReport {
    updated: usize,
    total: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

/// PUT /api/prices - refresh every card's prices, applying the rotation
/// policy. Cards are fetched sequentially with a pause between requests; a
/// per-card failure is recorded and the batch continues.
async fn refresh_all_prices(State(state): State<AppState>) -> ApiResult<RefreshReport> {
    let cards = {
        let store = state.store.lock().unwrap();
        store.list_cards().map_err(reject)?
    };

    let total = cards.len();
    let mut updated = 0;
    let mut errors = Vec::new();

    for (i, card) in cards.iter().enumerate() {
        match refresh_one_card(&state, &card.id).await {
            Ok(_) => updated += 1,
            Err(e) => {
                log::warn!("Failed to refresh {}: {}", card.name, e);
                errors.push(format!("{}: {}", card.name, e));
            }
        }

        if i + 1 < total {
            tokio::time::sleep(Duration::from_millis(REFRESH_PAUSE_MS)).await;
        }
    }

    log::info!("Refreshed prices for {} of {} cards", updated, total);
    Ok(ApiResponse::ok(RefreshReport {
        updated,
        total,
        errors,
    }))
}

/// Fetch one card from Scryfall and persist the rotated price state
async fn refresh_one_card(state: &AppState, id: &str) -> crate::error::Result<Card> {
    let fetched = state.scryfall.fetch_card_by_id(id).await?;

    let mut store = state.store.lock().unwrap();
    let snapshot = store.price_snapshot(id)?;
    let rotated = rotate_price_history(&snapshot, fetched.prices.usd.as_deref(), Utc::now());
    store.apply_card_refresh(id, &fetched, &rotated)?;
    store
        .get_card(id)?
        .ok_or_else(|| TrackerError::NotFound("Card".to_string()))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PriceRefresh {
    id: String,
    name: String,
    price: Option<String>,
    last_updated: Option<String>,
}

/// PUT /api/collection/{id}/price - refresh a single card's price
async fn refresh_card_price(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<PriceRefresh> {
    {
        // Reject unknown cards before hitting Scryfall
        let store = state.store.lock().unwrap();
        if store.get_card(&id).map_err(reject)?.is_none() {
            return Err(reject(TrackerError::NotFound("Card".to_string())));
        }
    }

    let card = refresh_one_card(&state, &id).await.map_err(reject)?;
    Ok(ApiResponse::ok(PriceRefresh {
        last_updated: card
            .price_history
            .as_ref()
            .and_then(|h| h.last_updated.clone()),
        price: card.prices.usd.clone(),
        id: card.id,
        name: card.name,
    }))
}

/// GET /api/analytics
async fn collection_analytics(State(state): State<AppState>) -> ApiResult<AnalyticsReport> {
    let store = state.store.lock().unwrap();
    let cards = store.list_cards().map_err(reject)?;
    Ok(ApiResponse::ok(analyze_collection(&cards)))
}

#[derive(Deserialize)]
struct MigrationRequest {
    cards: Vec<Card>,
}

#[derive(Serialize)]
struct MigrationReport {
    imported: usize,
    message: String,
}

/// POST /api/migration - replace the whole collection atomically
async fn migrate_collection(
    State(state): State<AppState>,
    Json(request): Json<MigrationRequest>,
) -> ApiResult<MigrationReport> {
    let mut store = state.store.lock().unwrap();
    let imported = store.replace_collection(&request.cards).map_err(reject)?;
    Ok(ApiResponse::ok(MigrationReport {
        imported,
        message: format!("Successfully migrated {} cards to database", imported),
    }))
}

// ── Decks ──────────────────────────────────────────────────────────────

/// GET /api/decks
async fn list_decks(State(state): State<AppState>) -> ApiResult<Vec<DeckSummary>> {
    let store = state.store.lock().unwrap();
    store.list_decks().map(ApiResponse::ok).map_err(reject)
}

#[derive(Deserialize)]
struct DeckRequest {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    format: Option<String>,
}

/// POST /api/decks
async fn create_deck(
    State(state): State<AppState>,
    Json(request): Json<DeckRequest>,
) -> ApiResult<Deck> {
    let mut store = state.store.lock().unwrap();
    store
        .create_deck(
            &request.name,
            request.description.as_deref(),
            request.format.as_deref(),
        )
        .map(ApiResponse::ok)
        .map_err(reject)
}

/// GET /api/decks/{id}
async fn get_deck(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<DeckDetails> {
    let store = state.store.lock().unwrap();
    store.deck_details(&id).map(ApiResponse::ok).map_err(reject)
}

/// PUT /api/decks/{id}
async fn update_deck(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<DeckRequest>,
) -> ApiResult<Deck> {
    let mut store = state.store.lock().unwrap();
    store
        .update_deck(
            &id,
            &request.name,
            request.description.as_deref(),
            request.format.as_deref(),
        )
        .map(ApiResponse::ok)
        .map_err(reject)
}

/// DELETE /api/decks/{id}
async fn delete_deck(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<String> {
    let mut store = state.store.lock().unwrap();
    store.delete_deck(&id).map_err(reject)?;
    Ok(ApiResponse::ok("Deck deleted".to_string()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeckCardRequest {
    card_id: String,
    #[serde(default = "default_quantity")]
    quantity: i64,
    #[serde(default)]
    sideboard: bool,
}

fn default_quantity() -> i64 {
    1
}

/// POST /api/decks/{id}/cards - add copies of a card to a deck section
async fn add_deck_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<DeckCardRequest>,
) -> ApiResult<QuantityChange> {
    let mut store = state.store.lock().unwrap();
    let quantity = store
        .add_card_to_deck(&id, &request.card_id, request.quantity, request.sideboard)
        .map_err(reject)?;
    Ok(ApiResponse::ok(QuantityChange {
        quantity,
        message: format!("Added {} copies to deck", request.quantity),
    }))
}

/// PUT /api/decks/{id}/cards - set a deck entry's quantity (0 removes it)
async fn update_deck_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<DeckCardRequest>,
) -> ApiResult<QuantityChange> {
    let mut store = state.store.lock().unwrap();
    let quantity = store
        .set_deck_card_quantity(&id, &request.card_id, request.quantity, request.sideboard)
        .map_err(reject)?;

    let message = if quantity == 0 {
        "Card removed from deck".to_string()
    } else {
        format!("Updated quantity to {}", quantity)
    };
    Ok(ApiResponse::ok(QuantityChange { quantity, message }))
}

/// DELETE /api/decks/{id}/cards - remove a deck entry
async fn remove_deck_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<DeckCardRequest>,
) -> ApiResult<String> {
    let mut store = state.store.lock().unwrap();
    store
        .remove_card_from_deck(&id, &request.card_id, request.sideboard)
        .map_err(reject)?;
    Ok(ApiResponse::ok("Card removed from deck".to_string()))
}

// ── Deck import & comparison ───────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportRequest {
    deck_text: String,
    #[serde(default)]
    deck_name: Option<String>,
    #[serde(default)]
    format: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportedDeck {
    deck: Deck,
    mainboard: Vec<Card>,
    sideboard: Vec<Card>,
    total_cards: u32,
    not_found: Vec<String>,
}

/// POST /api/decks/import - parse, validate, enrich and persist a pasted
/// deck list. Names Scryfall cannot resolve are reported, not fatal.
async fn import_deck(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<ImportedDeck> {
    let parsed = parse_deck_list(&request.deck_text);

    let validation = validate_deck(&parsed);
    if !validation.valid {
        return Err(reject(TrackerError::Validation(
            validation.errors.join("; "),
        )));
    }

    let all_entries: Vec<_> = parsed
        .mainboard
        .iter()
        .chain(parsed.sideboard.iter())
        .collect();
    let names: Vec<String> = all_entries.iter().map(|c| c.name.clone()).collect();

    let lookup = state.scryfall.fetch_collection(&names).await.map_err(reject)?;

    // Entries whose names did not resolve are dropped; they show up in
    // the not-found list instead.
    let mut mainboard = Vec::new();
    let mut sideboard = Vec::new();
    let mut entries: Vec<(Card, i64, bool)> = Vec::new();
    for parsed_card in all_entries {
        if let Some(card) = lookup.get(&parsed_card.name) {
            let mut enriched = card.clone();
            enriched.quantity = Some(parsed_card.quantity as i64);
            entries.push((
                card.clone(),
                parsed_card.quantity as i64,
                parsed_card.is_sideboard,
            ));
            if parsed_card.is_sideboard {
                sideboard.push(enriched);
            } else {
                mainboard.push(enriched);
            }
        }
    }

    let deck_name = request
        .deck_name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or("Imported Deck");

    let deck = {
        let mut store = state.store.lock().unwrap();
        store
            .save_imported_deck(deck_name, None, request.format.as_deref(), &entries)
            .map_err(reject)?
    };

    Ok(ApiResponse::ok(ImportedDeck {
        deck,
        mainboard,
        sideboard,
        total_cards: parsed.total_cards,
        not_found: lookup.not_found,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompareResponse {
    #[serde(flatten)]
    comparison: DeckComparison,
    shopping_list: String,
}

/// GET /api/decks/{id}/compare - deck-vs-collection comparison and
/// shopping list
async fn compare_deck(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<CompareResponse> {
    let store = state.store.lock().unwrap();
    let details = store.deck_details(&id).map_err(reject)?;

    // Mainboard and sideboard entries stay independent comparisons
    let deck_cards: Vec<Card> = details
        .cards
        .iter()
        .map(|entry| {
            let mut card = entry.card.clone();
            card.quantity = Some(entry.deck_quantity);
            card
        })
        .collect();

    let ids: Vec<String> = deck_cards.iter().map(|c| c.id.clone()).collect();
    let owned: HashMap<String, i64> = store.owned_quantities(&ids).map_err(reject)?;

    let comparison = compare_deck_with_collection(&deck_cards, &owned);
    let shopping_list = generate_shopping_list(&comparison);

    Ok(ApiResponse::ok(CompareResponse {
        comparison,
        shopping_list,
    }))
}

// ── Router ─────────────────────────────────────────────────────────────

/// Build the application router
pub fn create_router(store: Arc<Mutex<Store>>, scryfall: ScryfallClient) -> Router {
    let state = AppState { store, scryfall };

    Router::new()
        .route("/", get(index_handler))
        .route("/api/collection", get(list_collection).post(add_card))
        .route("/api/collection/today", get(todays_additions))
        .route("/api/collection/quantity", put(update_quantity))
        .route(
            "/api/collection/{id}",
            axum::routing::delete(remove_card),
        )
        .route("/api/collection/{id}/favorite", put(set_favorite))
        .route("/api/collection/{id}/price", put(refresh_card_price))
        .route("/api/search", get(search_card))
        .route("/api/prices", get(list_prices).put(refresh_all_prices))
        .route("/api/analytics", get(collection_analytics))
        .route("/api/migration", post(migrate_collection))
        .route("/api/decks", get(list_decks).post(create_deck))
        .route("/api/decks/import", post(import_deck))
        .route(
            "/api/decks/{id}",
            get(get_deck).put(update_deck).delete(delete_deck),
        )
        .route(
            "/api/decks/{id}/cards",
            post(add_deck_card)
                .put(update_deck_card)
                .delete(remove_deck_card),
        )
        .route("/api/decks/{id}/compare", get(compare_deck))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the web server
pub async fn serve(
    store: Arc<Mutex<Store>>,
    scryfall: ScryfallClient,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let app = create_router(store, scryfall);
    let addr = format!("0.0.0.0:{}", port);

    log::info!("Collection tracker listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
