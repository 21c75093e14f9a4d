// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Placement API endpoint handlers

use axum::{extract::State, http::StatusCode, Json};
use tracing::{debug, info, warn};

use super::request::ProcessRequest;
use super::response::MessageResponse;
use crate::api::http_server::AppState;
use crate::placement::{BatchResult, PlacementError, QuotaStatus};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<MessageResponse>)>;

fn reject(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<MessageResponse>) {
    (status, Json(MessageResponse::new(message)))
}

/// POST /process - Look up sponsored placements for a batch
///
/// # Request
/// - `keywords`: search keywords
/// - `asins` (or `identifiers`): product identifiers, same length as `keywords`
///
/// # Response
/// Array of `{"Keyword", "ASIN", "Sponsored Placement"}` records in input order.
///
/// One quota unit is reserved up front and handed back if the batch is
/// rejected, so concurrent requests cannot overrun the gate.
///
/// # Errors
/// - 429 Too Many Requests: quota exhausted for the current period
/// - 400 Bad Request: keywords and identifiers differ in length
pub async fn process_handler(
    State(state): State<AppState>,
    Json(request): Json<ProcessRequest>,
) -> ApiResult<BatchResult> {
    if !state.quota.try_reserve().await {
        warn!("Batch rejected: quota exceeded");
        return Err(reject(
            StatusCode::TOO_MANY_REQUESTS,
            "Quota exceeded. Please wait for reset.",
        ));
    }

    if let Err(e) = request.validate() {
        warn!("Batch validation failed: {}", e);
        state.quota.release().await;
        return Err(reject(StatusCode::BAD_REQUEST, e));
    }

    debug!("Processing batch of {} pairs", request.keywords.len());

    let batch = match state
        .orchestrator
        .run_batch(request.keywords, request.asins)
        .await
    {
        Ok(batch) => batch,
        Err(e) => {
            state.quota.release().await;
            return Err(match e {
                PlacementError::InvalidInput { .. } => reject(
                    StatusCode::BAD_REQUEST,
                    "Keywords and ASINs must be of equal length",
                ),
                PlacementError::QuotaExceeded => {
                    reject(StatusCode::TOO_MANY_REQUESTS, e.to_string())
                }
                _ => reject(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            });
        }
    };

    info!(
        "Batch served: {} outcomes ({} ranked)",
        batch.len(),
        batch.found_count()
    );

    Ok(Json(batch))
}

/// GET /quota - Current quota counters
pub async fn quota_handler(State(state): State<AppState>) -> Json<QuotaStatus> {
    Json(state.quota.status().await)
}
