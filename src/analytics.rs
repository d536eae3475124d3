//! Collection value, price-history rotation and portfolio analytics.
//!
//! All functions here are pure arithmetic over in-memory card records; the
//! store and the Scryfall client feed them and persist their results.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{parse_price, Card};

/// Days after which the current price rotates into the 6-months-ago slot
const ROTATE_6MO_DAYS: i64 = 30;
/// Days after which the 6-months-ago price also rotates into the 12-months slot
const ROTATE_12MO_DAYS: i64 = 180;
/// Performer lists are capped at this many entries
const PERFORMER_LIMIT: usize = 5;

/// Total collection value: Σ price × quantity.
///
/// Absent or malformed prices count as 0.0 and an unset quantity counts as
/// one copy, so this never fails on partially-enriched cards.
pub fn calculate_collection_value(cards: &[Card]) -> f64 {
    cards
        .iter()
        .map(|card| card.price_usd_f64() * card.effective_quantity() as f64)
        .sum()
}

/// Format a dollar amount the en-US way: `1234.5` → `"$1,234.50"`
pub fn format_currency(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!(
        "{}${}.{:02}",
        if negative { "-" } else { "" },
        grouped,
        fraction
    )
}

/// Stored price state for one card, before or after a refresh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSnapshot {
    pub usd: Option<String>,
    pub usd_6mo_ago: Option<String>,
    pub usd_12mo_ago: Option<String>,
    pub last_updated: Option<String>,
}

/// Apply the rotation policy for one refresh.
///
/// - First refresh (no last-updated yet): the new price seeds the
///   6-months-ago slot as a baseline.
/// - 180+ days since the last refresh: 12mo ← previous 6mo (or the previous
///   current price if the 6mo slot was empty), 6mo ← previous current.
/// - 30..180 days: 6mo ← previous current, 12mo untouched.
/// - Under 30 days: both historical slots untouched.
///
/// The current price and last-updated timestamp are always overwritten with
/// the fresh values.
pub fn rotate_price_history(
    previous: &PriceSnapshot,
    new_price: Option<&str>,
    now: DateTime<Utc>,
) -> PriceSnapshot {
    let last_updated = previous
        .last_updated
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc));

    let (usd_6mo_ago, usd_12mo_ago) = match last_updated {
        None => (
            new_price.map(str::to_string),
            previous.usd_12mo_ago.clone(),
        ),
        Some(last) => {
            let elapsed_days = (now - last).num_days();
            if elapsed_days >= ROTATE_12MO_DAYS {
                let twelve = previous
                    .usd_6mo_ago
                    .clone()
                    .or_else(|| previous.usd.clone());
                (previous.usd.clone(), twelve)
            } else if elapsed_days >= ROTATE_6MO_DAYS {
                (previous.usd.clone(), previous.usd_12mo_ago.clone())
            } else {
                (
                    previous.usd_6mo_ago.clone(),
                    previous.usd_12mo_ago.clone(),
                )
            }
        }
    };

    PriceSnapshot {
        usd: new_price.map(str::to_string),
        usd_6mo_ago,
        usd_12mo_ago,
        last_updated: Some(now.to_rfc3339()),
    }
}

/// Price performance of a single card over the rolling horizons
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPerformance {
    pub id: String,
    pub name: String,
    pub current_price: f64,
    pub quantity: i64,
    pub current_value: f64,
    pub six_month_change: Option<f64>,
    pub six_month_gain: Option<f64>,
    pub twelve_month_change: Option<f64>,
    pub twelve_month_gain: Option<f64>,
}

/// Portfolio-wide totals and changes
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub total_value: f64,
    pub total_cards: i64,
    pub unique_cards: usize,
    pub six_month_change: Option<f64>,
    pub six_month_gain: Option<f64>,
    pub twelve_month_change: Option<f64>,
    pub twelve_month_gain: Option<f64>,
}

/// Top or bottom performers per horizon, capped at five entries
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformerLists {
    pub six_month: Vec<CardPerformance>,
    pub twelve_month: Vec<CardPerformance>,
}

/// Full analytics report for the collection
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub portfolio_summary: PortfolioSummary,
    pub top_performers: PerformerLists,
    pub bottom_performers: PerformerLists,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage change and absolute gain for one horizon.
///
/// Only defined when the historical value is present and positive; otherwise
/// the horizon is unavailable, which is distinct from a zero change.
fn horizon_performance(
    current: f64,
    historical: Option<&str>,
    quantity: i64,
) -> (Option<f64>, Option<f64>) {
    match historical.and_then(|p| p.trim().parse::<f64>().ok()) {
        Some(hist) if hist > 0.0 => {
            let change = (current - hist) / hist * 100.0;
            let gain = (current - hist) * quantity as f64;
            (Some(change), Some(gain))
        }
        _ => (None, None),
    }
}

fn card_performance(card: &Card) -> CardPerformance {
    let current_price = card.price_usd_f64();
    let quantity = card.effective_quantity();
    let history = card.price_history.as_ref();

    let (six_month_change, six_month_gain) = horizon_performance(
        current_price,
        history.and_then(|h| h.usd_6mo_ago.as_deref()),
        quantity,
    );
    let (twelve_month_change, twelve_month_gain) = horizon_performance(
        current_price,
        history.and_then(|h| h.usd_12mo_ago.as_deref()),
        quantity,
    );

    CardPerformance {
        id: card.id.clone(),
        name: card.name.clone(),
        current_price,
        quantity,
        current_value: current_price * quantity as f64,
        six_month_change,
        six_month_gain,
        twelve_month_change,
        twelve_month_gain,
    }
}

/// Portfolio change for a horizon: gains relative to the value the
/// participating cards had at the start of the horizon.
fn portfolio_change(total_value: f64, gain: Option<f64>) -> Option<f64> {
    gain.map(|g| round2(g / (total_value - g) * 100.0))
}

fn sum_gains(performances: &[CardPerformance], gain: fn(&CardPerformance) -> Option<f64>) -> Option<f64> {
    let gains: Vec<f64> = performances.iter().filter_map(gain).collect();
    if gains.is_empty() {
        None
    } else {
        Some(gains.iter().sum())
    }
}

/// Cards with an available change for the horizon, sorted by that change.
/// The sort is stable, so ties keep their original order.
fn performers(
    performances: &[CardPerformance],
    change: fn(&CardPerformance) -> Option<f64>,
    descending: bool,
) -> Vec<CardPerformance> {
    let mut with_data: Vec<CardPerformance> = performances
        .iter()
        .filter(|p| change(p).is_some())
        .cloned()
        .collect();

    with_data.sort_by(|a, b| {
        let (a, b) = (change(a).unwrap_or(0.0), change(b).unwrap_or(0.0));
        if descending {
            b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
        } else {
            a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
        }
    });

    with_data.truncate(PERFORMER_LIMIT);
    with_data
}

/// Compute the full analytics report over the collection
pub fn analyze_collection(cards: &[Card]) -> AnalyticsReport {
    let performances: Vec<CardPerformance> = cards.iter().map(card_performance).collect();

    let total_value: f64 = performances.iter().map(|p| p.current_value).sum();
    let total_cards: i64 = performances.iter().map(|p| p.quantity).sum();

    let six_month_gain = sum_gains(&performances, |p| p.six_month_gain);
    let twelve_month_gain = sum_gains(&performances, |p| p.twelve_month_gain);

    AnalyticsReport {
        portfolio_summary: PortfolioSummary {
            total_value: round2(total_value),
            total_cards,
            unique_cards: performances.len(),
            six_month_change: portfolio_change(total_value, six_month_gain),
            six_month_gain: six_month_gain.map(round2),
            twelve_month_change: portfolio_change(total_value, twelve_month_gain),
            twelve_month_gain: twelve_month_gain.map(round2),
        },
        top_performers: PerformerLists {
            six_month: performers(&performances, |p| p.six_month_change, true),
            twelve_month: performers(&performances, |p| p.twelve_month_change, true),
        },
        bottom_performers: PerformerLists {
            six_month: performers(&performances, |p| p.six_month_change, false),
            twelve_month: performers(&performances, |p| p.twelve_month_change, false),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PriceHistory, Prices};
    use chrono::Duration;

    fn card(id: &str, usd: Option<&str>, quantity: Option<i64>) -> Card {
        Card {
            id: id.to_string(),
            name: format!("Card {}", id),
            mana_cost: None,
            type_line: "Instant".to_string(),
            oracle_text: None,
            colors: None,
            color_identity: None,
            image_uris: None,
            card_faces: None,
            prices: Prices {
                usd: usd.map(str::to_string),
                ..Prices::default()
            },
            quantity,
            price_history: None,
            is_favorite: false,
            fuzzy_match: false,
        }
    }

    fn card_with_history(
        id: &str,
        usd: &str,
        quantity: i64,
        six: Option<&str>,
        twelve: Option<&str>,
    ) -> Card {
        let mut c = card(id, Some(usd), Some(quantity));
        c.price_history = Some(PriceHistory {
            usd_6mo_ago: six.map(str::to_string),
            usd_12mo_ago: twelve.map(str::to_string),
            last_updated: Some("2026-01-01T00:00:00+00:00".to_string()),
        });
        c
    }

    #[test]
    fn collection_value_is_price_times_quantity() {
        let cards = vec![
            card("1", Some("1.50"), Some(2)),
            card("2", Some("2.25"), Some(1)),
            card("3", Some("0.75"), Some(3)),
        ];
        assert!((calculate_collection_value(&cards) - 7.5).abs() < 1e-9);
    }

    #[test]
    fn collection_value_treats_missing_prices_as_zero() {
        let cards = vec![
            card("1", Some("1.50"), Some(2)),
            card("2", None, Some(3)),
            card("3", Some("garbage"), Some(4)),
        ];
        assert!((calculate_collection_value(&cards) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn collection_value_defaults_quantity_to_one() {
        let cards = vec![card("1", Some("2.00"), None)];
        assert!((calculate_collection_value(&cards) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn collection_value_of_empty_collection_is_zero() {
        assert_eq!(calculate_collection_value(&[]), 0.0);
    }

    #[test]
    fn formats_currency() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(1.5), "$1.50");
        assert_eq!(format_currency(123.45), "$123.45");
        assert_eq!(format_currency(1234.5), "$1,234.50");
        assert_eq!(format_currency(12345.67), "$12,345.67");
        assert_eq!(format_currency(1234567.89), "$1,234,567.89");
    }

    #[test]
    fn formats_negative_currency() {
        assert_eq!(format_currency(-1234.5), "-$1,234.50");
    }

    fn snapshot(
        usd: Option<&str>,
        six: Option<&str>,
        twelve: Option<&str>,
        last_updated: Option<String>,
    ) -> PriceSnapshot {
        PriceSnapshot {
            usd: usd.map(str::to_string),
            usd_6mo_ago: six.map(str::to_string),
            usd_12mo_ago: twelve.map(str::to_string),
            last_updated,
        }
    }

    #[test]
    fn first_refresh_seeds_six_month_baseline() {
        let now = Utc::now();
        let rotated = rotate_price_history(&snapshot(None, None, None, None), Some("3.00"), now);

        assert_eq!(rotated.usd.as_deref(), Some("3.00"));
        assert_eq!(rotated.usd_6mo_ago.as_deref(), Some("3.00"));
        assert_eq!(rotated.usd_12mo_ago, None);
        assert_eq!(rotated.last_updated, Some(now.to_rfc3339()));
    }

    #[test]
    fn refresh_within_thirty_days_keeps_history() {
        let now = Utc::now();
        let last = (now - Duration::days(10)).to_rfc3339();
        let previous = snapshot(Some("2.00"), Some("1.00"), Some("0.50"), Some(last));

        let rotated = rotate_price_history(&previous, Some("2.50"), now);

        assert_eq!(rotated.usd.as_deref(), Some("2.50"));
        assert_eq!(rotated.usd_6mo_ago.as_deref(), Some("1.00"));
        assert_eq!(rotated.usd_12mo_ago.as_deref(), Some("0.50"));
    }

    #[test]
    fn refresh_after_forty_five_days_rotates_six_month_only() {
        let now = Utc::now();
        let last = (now - Duration::days(45)).to_rfc3339();
        let previous = snapshot(Some("2.00"), Some("1.00"), Some("0.50"), Some(last));

        let rotated = rotate_price_history(&previous, Some("2.50"), now);

        assert_eq!(rotated.usd_6mo_ago.as_deref(), Some("2.00"));
        assert_eq!(rotated.usd_12mo_ago.as_deref(), Some("0.50"));
    }

    #[test]
    fn refresh_after_two_hundred_days_rotates_both_slots() {
        let now = Utc::now();
        let last = (now - Duration::days(200)).to_rfc3339();
        let previous = snapshot(Some("2.00"), Some("1.00"), Some("0.50"), Some(last));

        let rotated = rotate_price_history(&previous, Some("2.50"), now);

        assert_eq!(rotated.usd.as_deref(), Some("2.50"));
        assert_eq!(rotated.usd_6mo_ago.as_deref(), Some("2.00"));
        assert_eq!(rotated.usd_12mo_ago.as_deref(), Some("1.00"));
    }

    #[test]
    fn full_rotation_falls_back_to_current_when_six_month_empty() {
        let now = Utc::now();
        let last = (now - Duration::days(200)).to_rfc3339();
        let previous = snapshot(Some("2.00"), None, None, Some(last));

        let rotated = rotate_price_history(&previous, Some("2.50"), now);

        assert_eq!(rotated.usd_6mo_ago.as_deref(), Some("2.00"));
        assert_eq!(rotated.usd_12mo_ago.as_deref(), Some("2.00"));
    }

    #[test]
    fn performance_unavailable_without_history() {
        let report = analyze_collection(&[card("1", Some("5.00"), Some(2))]);
        let summary = &report.portfolio_summary;

        assert_eq!(summary.total_value, 10.0);
        assert_eq!(summary.total_cards, 2);
        assert_eq!(summary.unique_cards, 1);
        assert_eq!(summary.six_month_change, None);
        assert_eq!(summary.twelve_month_gain, None);
        assert!(report.top_performers.six_month.is_empty());
    }

    #[test]
    fn performance_unavailable_when_history_is_zero() {
        // A historical price of "0" is no baseline, not a 0% change
        let report =
            analyze_collection(&[card_with_history("1", "5.00", 1, Some("0"), None)]);
        assert_eq!(report.portfolio_summary.six_month_change, None);
    }

    #[test]
    fn computes_card_and_portfolio_changes() {
        // 6mo: 1.00 -> 2.00 per copy, 2 copies: +100%, gain 2.00
        let report =
            analyze_collection(&[card_with_history("1", "2.00", 2, Some("1.00"), None)]);
        let summary = &report.portfolio_summary;

        assert_eq!(summary.total_value, 4.0);
        assert_eq!(summary.six_month_gain, Some(2.0));
        // gain / (total - gain) = 2 / 2 = 100%
        assert_eq!(summary.six_month_change, Some(100.0));
        assert_eq!(summary.twelve_month_change, None);

        let top = &report.top_performers.six_month;
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].six_month_change, Some(100.0));
        assert_eq!(top[0].six_month_gain, Some(2.0));
    }

    #[test]
    fn performer_lists_sort_and_cap_at_five() {
        let cards: Vec<Card> = (0..7)
            .map(|i| {
                // Current 2.00 against baselines 0.50..3.50: mixed gains/losses
                let baseline = format!("{:.2}", 0.5 * (i + 1) as f64);
                card_with_history(&i.to_string(), "2.00", 1, Some(&baseline), None)
            })
            .collect();

        let report = analyze_collection(&cards);
        let top = &report.top_performers.six_month;
        let bottom = &report.bottom_performers.six_month;

        assert_eq!(top.len(), 5);
        assert_eq!(bottom.len(), 5);
        // Best performer: baseline 0.50 -> +300%
        assert_eq!(top[0].id, "0");
        // Worst performer: baseline 3.50 -> about -43%
        assert_eq!(bottom[0].id, "6");
        // Descending on top, ascending on bottom
        assert!(top[0].six_month_change.unwrap() > top[4].six_month_change.unwrap());
        assert!(bottom[0].six_month_change.unwrap() < bottom[4].six_month_change.unwrap());
    }

    #[test]
    fn performer_ties_keep_original_order() {
        let cards = vec![
            card_with_history("first", "2.00", 1, Some("1.00"), None),
            card_with_history("second", "4.00", 1, Some("2.00"), None),
        ];
        let top = analyze_collection(&cards).top_performers.six_month;
        assert_eq!(top[0].id, "first");
        assert_eq!(top[1].id, "second");
    }
}
