// rest/routes/messages.rs — Read acknowledgement.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use super::email::storage_failure;
use crate::AppContext;

/// Flip a message's read flag. Idempotent — re-marking succeeds and returns
/// the record unchanged.
pub async fn mark_read(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    let Ok(message_id) = id.parse::<i64>() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "message": "Invalid message ID"
            })),
        );
    };

    match ctx.storage.mark_read(message_id).await {
        Ok(Some(message)) => (
            StatusCode::OK,
            Json(json!({ "success": true, "message": message })),
        ),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "success": false,
                "message": "Message not found"
            })),
        ),
        Err(e) => storage_failure(e, "failed to mark message as read"),
    }
}
