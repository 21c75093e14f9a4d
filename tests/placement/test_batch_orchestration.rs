// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Batch runs: pairing, ordering, fault isolation and the concurrency bound

use super::fakes::{ok, sponsored_page, KeywordFetcher};
use bytes::Bytes;
use sponsored_rank::placement::{
    FetchStatus, JobError, Placement, PlacementConfig, PlacementError, PlacementOrchestrator,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn orchestrator(fetcher: Arc<KeywordFetcher>) -> PlacementOrchestrator {
    PlacementOrchestrator::new(&PlacementConfig::default(), fetcher).unwrap()
}

#[tokio::test]
async fn test_rank_of_second_sponsored_result() {
    let page = sponsored_page(&["A", "B", "C"]);
    let fetcher = KeywordFetcher::new().respond("usb cable", ok(&page)).shared();

    let batch = orchestrator(fetcher)
        .run_batch(strings(&["usb cable"]), strings(&["B"]))
        .await
        .unwrap();

    assert_eq!(batch.len(), 1);
    assert_eq!(batch.outcomes[0].keyword, "usb cable");
    assert_eq!(batch.outcomes[0].identifier, "B");
    assert_eq!(batch.outcomes[0].placement, Placement::Rank(2));
}

#[tokio::test]
async fn test_absent_identifier_is_not_found() {
    let page = sponsored_page(&["A", "B", "C"]);
    let fetcher = KeywordFetcher::new().respond("usb cable", ok(&page)).shared();

    let batch = orchestrator(fetcher)
        .run_batch(strings(&["usb cable"]), strings(&["Z"]))
        .await
        .unwrap();

    assert_eq!(batch.outcomes[0].placement, Placement::NotFound);
}

#[tokio::test]
async fn test_page_without_sponsored_results_is_not_found() {
    let fetcher = KeywordFetcher::new()
        .respond("kettle", ok(&sponsored_page(&[])))
        .shared();

    let batch = orchestrator(fetcher)
        .run_batch(strings(&["kettle"]), strings(&["B0KETTLE01"]))
        .await
        .unwrap();

    assert_eq!(batch.outcomes[0].placement, Placement::NotFound);
}

#[tokio::test]
async fn test_mismatched_lengths_fail_before_any_fetch() {
    let fetcher = KeywordFetcher::new().shared();

    let result = orchestrator(fetcher.clone())
        .run_batch(strings(&["a", "b", "c"]), strings(&["x", "y"]))
        .await;

    assert!(matches!(
        result,
        Err(PlacementError::InvalidInput {
            keywords: 3,
            identifiers: 2
        })
    ));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_outcomes_follow_input_order_not_completion_order() {
    let fetcher = KeywordFetcher::new()
        .respond("slow", ok(&sponsored_page(&["S1"])))
        .respond("medium", ok(&sponsored_page(&["X", "M1"])))
        .respond("fast", ok(&sponsored_page(&["X", "Y", "F1"])))
        .delay("slow", Duration::from_millis(120))
        .delay("medium", Duration::from_millis(60))
        .shared();

    let batch = orchestrator(fetcher)
        .run_batch(
            strings(&["slow", "medium", "fast"]),
            strings(&["S1", "M1", "F1"]),
        )
        .await
        .unwrap();

    let keywords: Vec<&str> = batch.outcomes.iter().map(|o| o.keyword.as_str()).collect();
    assert_eq!(keywords, vec!["slow", "medium", "fast"]);

    let ranks: Vec<Option<usize>> = batch.outcomes.iter().map(|o| o.placement.rank()).collect();
    assert_eq!(ranks, vec![Some(1), Some(2), Some(3)]);
}

#[tokio::test]
async fn test_duplicate_pairs_are_processed_independently() {
    let fetcher = KeywordFetcher::new()
        .respond("mouse", ok(&sponsored_page(&["M1", "M2"])))
        .shared();

    let batch = orchestrator(fetcher.clone())
        .run_batch(strings(&["mouse", "mouse"]), strings(&["M2", "M2"]))
        .await
        .unwrap();

    assert_eq!(batch.len(), 2);
    assert_eq!(batch.outcomes[0].placement, Placement::Rank(2));
    assert_eq!(batch.outcomes[1].placement, Placement::Rank(2));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_network_failure_is_isolated_to_its_job() {
    let fetcher = KeywordFetcher::new()
        .respond("first", ok(&sponsored_page(&["A1"])))
        .respond("second", FetchStatus::NetworkError("connection reset".to_string()))
        .respond("third", ok(&sponsored_page(&["X", "C3"])))
        .shared();

    let batch = orchestrator(fetcher)
        .run_batch(
            strings(&["first", "second", "third"]),
            strings(&["A1", "B2", "C3"]),
        )
        .await
        .unwrap();

    assert_eq!(batch.outcomes[0].placement, Placement::Rank(1));
    assert_eq!(
        batch.outcomes[1].placement,
        Placement::Error(JobError::Network("connection reset".to_string()))
    );
    assert_eq!(batch.outcomes[2].placement, Placement::Rank(2));
    assert_eq!(batch.error_count(), 1);
    assert_eq!(batch.found_count(), 2);
}

#[tokio::test]
async fn test_fetch_timeout_is_an_error_outcome() {
    let fetcher = KeywordFetcher::new()
        .respond("hung", FetchStatus::Timeout)
        .shared();

    let batch = orchestrator(fetcher)
        .run_batch(strings(&["hung"]), strings(&["B0HUNG0001"]))
        .await
        .unwrap();

    assert_eq!(batch.outcomes[0].placement, Placement::Error(JobError::Timeout));
}

#[tokio::test]
async fn test_panicking_fetch_is_contained() {
    let fetcher = KeywordFetcher::new()
        .respond("good", ok(&sponsored_page(&["G1"])))
        .panic_on("bad")
        .shared();

    let batch = orchestrator(fetcher)
        .run_batch(strings(&["good", "bad", "good"]), strings(&["G1", "B1", "G1"]))
        .await
        .unwrap();

    assert_eq!(batch.len(), 3);
    assert_eq!(batch.outcomes[0].placement, Placement::Rank(1));
    assert!(matches!(
        batch.outcomes[1].placement,
        Placement::Error(JobError::UnexpectedFault(_))
    ));
    assert_eq!(batch.outcomes[2].placement, Placement::Rank(1));
}

#[tokio::test]
async fn test_block_page_is_parsed_unless_configured_as_error() {
    let blocked = FetchStatus::HttpError {
        code: 503,
        body: Bytes::from("<html><body>Robot check</body></html>"),
    };

    let fetcher = KeywordFetcher::new().respond("desk", blocked.clone()).shared();
    let batch = orchestrator(fetcher)
        .run_batch(strings(&["desk"]), strings(&["B0DESK0001"]))
        .await
        .unwrap();
    assert_eq!(batch.outcomes[0].placement, Placement::NotFound);

    let config = PlacementConfig {
        block_status_as_error: true,
        ..PlacementConfig::default()
    };
    let fetcher = KeywordFetcher::new().respond("desk", blocked).shared();
    let batch = PlacementOrchestrator::new(&config, fetcher)
        .unwrap()
        .run_batch(strings(&["desk"]), strings(&["B0DESK0001"]))
        .await
        .unwrap();
    assert_eq!(
        batch.outcomes[0].placement,
        Placement::Error(JobError::Blocked { status: 503 })
    );
}

#[tokio::test]
async fn test_fetches_in_flight_never_exceed_bound() {
    let keywords: Vec<String> = (0..8).map(|i| format!("kw{}", i)).collect();
    let identifiers: Vec<String> = (0..8).map(|i| format!("ID{}", i)).collect();

    let mut fetcher = KeywordFetcher::new();
    for (keyword, identifier) in keywords.iter().zip(&identifiers) {
        fetcher = fetcher
            .respond(keyword, ok(&sponsored_page(&[identifier.as_str()])))
            .delay(keyword, Duration::from_millis(30));
    }
    let fetcher = fetcher.shared();

    let batch = orchestrator(fetcher.clone())
        .with_max_concurrency(2)
        .run_batch(keywords, identifiers)
        .await
        .unwrap();

    assert_eq!(batch.len(), 8);
    assert_eq!(batch.found_count(), 8);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 8);
    let peak = fetcher.max_in_flight.load(Ordering::SeqCst);
    assert!(peak >= 1 && peak <= 2, "peak in-flight was {}", peak);
}

#[tokio::test]
async fn test_batch_serializes_as_placement_records() {
    let fetcher = KeywordFetcher::new()
        .respond("lamp", ok(&sponsored_page(&["L0", "L1"])))
        .respond("rug", ok(&sponsored_page(&[])))
        .respond("fan", FetchStatus::NetworkError("dns".to_string()))
        .shared();

    let batch = orchestrator(fetcher)
        .run_batch(strings(&["lamp", "rug", "fan"]), strings(&["L1", "R1", "F1"]))
        .await
        .unwrap();

    let json = serde_json::to_value(&batch).unwrap();
    assert_eq!(
        json,
        serde_json::json!([
            {"Keyword": "lamp", "ASIN": "L1", "Sponsored Placement": 2},
            {"Keyword": "rug", "ASIN": "R1", "Sponsored Placement": "Not Found"},
            {"Keyword": "fan", "ASIN": "F1", "Sponsored Placement": "Error"}
        ])
    );
}
