// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /process tests
//!
//! These tests verify that:
//! - A valid batch returns one placement record per pair, in input order
//! - Mismatched keyword/identifier lengths are rejected with 400
//! - An exhausted quota is rejected with 429 before any fetch
//! - Exactly one quota unit is recorded per accepted batch

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use chrono::Duration;
use serde_json::{json, Value};
use sponsored_rank::{
    api::http_server::{create_app, AppState},
    placement::{
        FetchStatus, InMemoryQuotaGate, PageFetcher, PlacementConfig, PlacementOrchestrator,
        QuotaGate,
    },
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`

const PAGE: &str = r#"<html><body>
    <div data-component-type="sp-sponsored-result" data-asin="B0FIRST001"><span>Sponsored</span></div>
    <div data-component-type="sp-sponsored-result" data-asin="B0SECOND01"><span>Sponsored</span></div>
</body></html>"#;

/// Serves the same page for every keyword except "offline"
#[derive(Default)]
struct FixedPageFetcher {
    calls: AtomicUsize,
}

#[async_trait]
impl PageFetcher for FixedPageFetcher {
    async fn fetch(&self, search_url: &str) -> FetchStatus {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if search_url.contains("k=offline") {
            return FetchStatus::NetworkError("proxy unreachable".to_string());
        }
        FetchStatus::Success {
            body: Bytes::from_static(PAGE.as_bytes()),
        }
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

fn setup(max_requests: u32) -> (Router, Arc<FixedPageFetcher>, Arc<InMemoryQuotaGate>) {
    let fetcher = Arc::new(FixedPageFetcher::default());
    let quota = Arc::new(InMemoryQuotaGate::new(max_requests, Duration::days(30)));
    let orchestrator =
        PlacementOrchestrator::new(&PlacementConfig::default(), fetcher.clone()).unwrap();

    let app = create_app(AppState::new(orchestrator, quota.clone()));
    (app, fetcher, quota)
}

fn process_request(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/process")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_process_returns_records_in_input_order() {
    let (app, _, _) = setup(10);

    let response = app
        .oneshot(process_request(json!({
            "keywords": ["usb cable", "offline", "usb hub"],
            "asins": ["B0SECOND01", "B0FIRST001", "B0MISSING1"]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!([
            {"Keyword": "usb cable", "ASIN": "B0SECOND01", "Sponsored Placement": 2},
            {"Keyword": "offline", "ASIN": "B0FIRST001", "Sponsored Placement": "Error"},
            {"Keyword": "usb hub", "ASIN": "B0MISSING1", "Sponsored Placement": "Not Found"}
        ])
    );
}

#[tokio::test]
async fn test_identifiers_alias_is_accepted() {
    let (app, _, _) = setup(10);

    let response = app
        .oneshot(process_request(json!({
            "keywords": ["usb cable"],
            "identifiers": ["B0FIRST001"]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await[0]["Sponsored Placement"], 1);
}

#[tokio::test]
async fn test_mismatched_lengths_rejected() {
    let (app, fetcher, quota) = setup(10);

    let response = app
        .oneshot(process_request(json!({
            "keywords": ["usb cable", "usb hub"],
            "asins": ["B0FIRST001"]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({"message": "Keywords and ASINs must be of equal length"})
    );
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    assert_eq!(quota.status().await.requests_used, 0);
}

#[tokio::test]
async fn test_exhausted_quota_rejected_before_fetching() {
    let (app, fetcher, _) = setup(0);

    let response = app
        .oneshot(process_request(json!({
            "keywords": ["usb cable"],
            "asins": ["B0FIRST001"]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        json_body(response).await,
        json!({"message": "Quota exceeded. Please wait for reset."})
    );
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_one_quota_unit_per_batch() {
    let (app, _, quota) = setup(2);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(process_request(json!({
                "keywords": ["a", "b", "c"],
                "asins": ["B0FIRST001", "B0SECOND01", "B0OTHER001"]
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(quota.status().await.requests_used, 2);

    let response = app
        .oneshot(process_request(json!({"keywords": ["a"], "asins": ["B0FIRST001"]})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_process_rejects_get() {
    let (app, _, _) = setup(10);

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/process")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_concurrent_batches_cannot_overrun_quota() {
    let (app, _, quota) = setup(1);

    let requests = (0..4).map(|_| {
        app.clone().oneshot(process_request(json!({
            "keywords": ["usb cable"],
            "asins": ["B0FIRST001"]
        })))
    });
    let responses = futures::future::join_all(requests).await;

    let statuses: Vec<StatusCode> = responses
        .into_iter()
        .map(|r| r.unwrap().status())
        .collect();
    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::OK).count(),
        1
    );
    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == StatusCode::TOO_MANY_REQUESTS)
            .count(),
        3
    );
    assert_eq!(quota.status().await.requests_used, 1);
}
