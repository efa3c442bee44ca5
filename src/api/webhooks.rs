use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::ApiError;
use crate::state::AppState;
use crate::webhook::{Webhook, DEFAULT_INTERVAL_MINUTES};

fn default_interval() -> u64 {
    DEFAULT_INTERVAL_MINUTES
}

#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    pub keyword: String,
    pub webhook_url: String,
    #[serde(default = "default_interval")]
    pub check_interval_minutes: u64,
}

impl WebhookRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let url = url::Url::parse(&self.webhook_url)
            .map_err(|e| ApiError::BadRequest(format!("Invalid webhook_url: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ApiError::BadRequest("webhook_url must use http or https".to_string()));
        }
        if self.check_interval_minutes < 1 {
            return Err(ApiError::BadRequest("check_interval_minutes must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// POST /webhooks/register - 注册 Webhook
pub async fn register_webhook(
    State(state): State<Arc<AppState>>,
    req: Result<Json<WebhookRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = req?;
    req.validate()?;

    let entry = state
        .webhooks
        .register(&req.keyword, &req.webhook_url, req.check_interval_minutes);
    let id = entry.id();
    state.monitor.spawn(entry);

    Ok(Json(json!({
        "success": true,
        "webhook_id": id,
        "message": format!("Webhook registered for keyword '{}'", req.keyword)
    })))
}

#[derive(Debug, Serialize)]
pub struct WebhookList {
    pub success: bool,
    pub active_webhooks: Vec<Webhook>,
    pub total_count: usize,
}

/// GET /webhooks
pub async fn list_webhooks(State(state): State<Arc<AppState>>) -> Json<WebhookList> {
    let active_webhooks = state.webhooks.list();
    Json(WebhookList {
        success: true,
        total_count: active_webhooks.len(),
        active_webhooks,
    })
}

/// DELETE /webhooks/:id
pub async fn delete_webhook(
    State(state): State<Arc<AppState>>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id?;
    state
        .webhooks
        .remove(id)
        .ok_or_else(|| ApiError::NotFound("Webhook not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Webhook {} deleted", id)
    })))
}
