//! Public HTTP surface.
//!
//! One content route and one health probe. Hour/minute validation happens
//! here; the cache layer only ever sees well-formed bucket keys.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::error;

use crate::application::{error::AppError, quotes::QuoteService, store::QuoteStore};
use crate::domain::time_bucket::TimeBucket;

#[derive(Clone)]
pub struct HttpState {
    pub quotes: Arc<QuoteService>,
    pub store: Arc<dyn QuoteStore>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/literature/random", get(random_quote))
        .route("/_health/store", get(store_health))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RandomQuoteQuery {
    hour: Option<String>,
    minute: Option<String>,
}

/// Missing and non-numeric values both collapse to an out-of-range value,
/// so the caller sees the same range message either way.
fn parse_time_param(raw: Option<&String>) -> i64 {
    raw.and_then(|value| value.trim().parse().ok()).unwrap_or(-1)
}

async fn random_quote(
    State(state): State<HttpState>,
    Query(query): Query<RandomQuoteQuery>,
) -> Result<Response, AppError> {
    let hour = parse_time_param(query.hour.as_ref());
    let minute = parse_time_param(query.minute.as_ref());
    let bucket = TimeBucket::from_parts(hour, minute)?;

    match state.quotes.random_quote(&bucket).await? {
        Some(quote) => Ok(Json(quote).into_response()),
        None => Err(AppError::NotFound),
    }
}

async fn store_health(State(state): State<HttpState>) -> Response {
    match state.store.ping().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!(error = %err, "Store health probe failed");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}
