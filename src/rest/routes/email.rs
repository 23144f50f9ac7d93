// rest/routes/email.rs — Address generation and inbox polling.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

use crate::generator::AddressKind;
use crate::AppContext;

pub async fn generate(State(ctx): State<Arc<AppContext>>) -> (StatusCode, Json<Value>) {
    generate_of_kind(&ctx, AddressKind::Standard).await
}

pub async fn generate_sso(State(ctx): State<Arc<AppContext>>) -> (StatusCode, Json<Value>) {
    generate_of_kind(&ctx, AddressKind::Federated).await
}

async fn generate_of_kind(ctx: &AppContext, kind: AddressKind) -> (StatusCode, Json<Value>) {
    match ctx.inbox.generate_address(kind).await {
        Ok(email) => (
            StatusCode::CREATED,
            Json(json!({ "success": true, "email": email })),
        ),
        Err(e) => {
            error!(err = %e, ?kind, "address generation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "message": "Failed to generate email address"
                })),
            )
        }
    }
}

pub async fn list_messages(
    State(ctx): State<Arc<AppContext>>,
    Path(address): Path<String>,
) -> (StatusCode, Json<Value>) {
    let record = match ctx.storage.get_address_by_value(&address).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "success": false,
                    "message": "Email address not found"
                })),
            )
        }
        Err(e) => return storage_failure(e, "failed to look up address"),
    };

    match ctx.storage.list_messages(record.id).await {
        Ok(messages) => (
            StatusCode::OK,
            Json(json!({ "success": true, "messages": messages })),
        ),
        Err(e) => storage_failure(e, "failed to fetch messages"),
    }
}

pub(super) fn storage_failure(
    e: crate::storage::StoreError,
    context: &str,
) -> (StatusCode, Json<Value>) {
    error!(err = %e, "{context}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "message": context })),
    )
}
