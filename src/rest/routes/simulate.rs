// rest/routes/simulate.rs — Dev/test entry point that fabricates one
// inbound message for an address, creating the address lazily if needed.

use axum::{extract::State, http::StatusCode, Json};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::email::storage_failure;
use crate::generator::AddressKind;
use crate::AppContext;

/// Syntactic email check only — the address does not need to exist yet.
static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap());

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimulateRequest {
    email_address: String,
    /// `normal` (default) or `sso`.
    #[serde(default, rename = "type")]
    kind: Option<AddressKind>,
}

pub async fn receive(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let request: SimulateRequest = match serde_json::from_value(body) {
        Ok(r) => r,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "success": false,
                    "message": "Invalid request body: expected emailAddress and optional type (normal | sso)"
                })),
            )
        }
    };

    if !EMAIL_SHAPE.is_match(&request.email_address) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "message": "Invalid email address"
            })),
        );
    }

    let kind = request.kind.unwrap_or(AddressKind::Standard);
    match ctx.inbox.simulate_reception(&request.email_address, kind).await {
        Ok(message) => (
            StatusCode::CREATED,
            Json(json!({ "success": true, "message": message })),
        ),
        Err(e) => storage_failure(e, "failed to simulate email reception"),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
