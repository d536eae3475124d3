//! Tests for the Scryfall API client
//!
//! Network-backed behavior is exercised against a local wiremock server;
//! tests hitting the real API are marked with #[ignore].

use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::error::TrackerError;

fn card_json(id: &str, name: &str, usd: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "type_line": "Instant",
        "prices": { "usd": usd, "usd_foil": null, "eur": null, "tix": null }
    })
}

#[test]
fn dedupe_names_is_case_insensitive_and_order_preserving() {
    let names = vec![
        "Lightning Bolt".to_string(),
        "Island".to_string(),
        "lightning bolt".to_string(),
        "Island".to_string(),
    ];
    assert_eq!(dedupe_names(&names), vec!["Lightning Bolt", "Island"]);
}

#[tokio::test]
async fn fetch_card_by_id_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cards/abc-123"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(card_json("abc-123", "Lightning Bolt", "1.50")),
        )
        .mount(&server)
        .await;

    let client = ScryfallClient::with_base_url(server.uri());
    let card = client.fetch_card_by_id("abc-123").await.unwrap();

    assert_eq!(card.name, "Lightning Bolt");
    assert_eq!(card.prices.usd.as_deref(), Some("1.50"));
}

#[tokio::test]
async fn fetch_card_by_id_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = ScryfallClient::with_base_url(server.uri());
    match client.fetch_card_by_id("missing").await {
        Err(TrackerError::CardNotFound(id)) => assert_eq!(id, "missing"),
        other => panic!("Expected CardNotFound, got: {:?}", other.map(|c| c.name)),
    }
}

#[tokio::test]
async fn fetch_card_by_id_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = ScryfallClient::with_base_url(server.uri());
    match client.fetch_card_by_id("abc").await {
        Err(TrackerError::HttpStatus(status)) => {
            assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR)
        }
        other => panic!("Expected HttpStatus, got: {:?}", other.map(|c| c.name)),
    }
}

#[tokio::test]
async fn fetch_card_by_name_marks_fuzzy_resolution() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cards/named"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(card_json("abc", "Lightning Bolt", "1.50")),
        )
        .mount(&server)
        .await;

    let client = ScryfallClient::with_base_url(server.uri());

    let exact = client.fetch_card_by_name("lightning bolt").await.unwrap();
    assert!(!exact.fuzzy_match);

    let fuzzy = client.fetch_card_by_name("lighting bolt").await.unwrap();
    assert!(fuzzy.fuzzy_match);
}

#[tokio::test]
async fn fetch_collection_maps_found_and_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cards/collection"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [card_json("1", "Lightning Bolt", "1.50")],
            "not_found": [{ "name": "Fake Card" }]
        })))
        .mount(&server)
        .await;

    let client = ScryfallClient::with_base_url(server.uri());
    let names = vec!["Lightning Bolt".to_string(), "Fake Card".to_string()];
    let lookup = client.fetch_collection(&names).await.unwrap();

    assert_eq!(lookup.found.len(), 1);
    assert!(lookup.get("lightning BOLT").is_some());
    assert_eq!(lookup.not_found, vec!["Fake Card"]);
}

#[tokio::test]
async fn fetch_collection_sends_name_identifiers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cards/collection"))
        .and(body_partial_json(serde_json::json!({
            "identifiers": [{ "name": "Lightning Bolt" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [card_json("1", "Lightning Bolt", "1.50")],
            "not_found": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ScryfallClient::with_base_url(server.uri());
    let lookup = client
        .fetch_collection(&["Lightning Bolt".to_string()])
        .await
        .unwrap();
    assert!(lookup.not_found.is_empty());
}

#[tokio::test]
async fn fetch_collection_continues_past_failed_chunk() {
    // Every request fails; the batch must still complete with everything
    // reported as not found rather than erroring out.
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = ScryfallClient::with_base_url(server.uri());
    let names = vec!["Lightning Bolt".to_string(), "Island".to_string()];
    let lookup = client.fetch_collection(&names).await.unwrap();

    assert!(lookup.found.is_empty());
    assert_eq!(lookup.not_found.len(), 2);
}

// Integration tests (require network access)
#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn fetch_card_by_name_integration() {
    let client = ScryfallClient::new();
    let card = client.fetch_card_by_name("Lightning Bolt").await.unwrap();
    assert!(card.name.to_lowercase().contains("lightning"));
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn fetch_collection_integration() {
    let client = ScryfallClient::new();
    let lookup = client
        .fetch_collection(&["Lightning Bolt".to_string(), "Island".to_string()])
        .await
        .unwrap();
    assert_eq!(lookup.found.len(), 2);
}
