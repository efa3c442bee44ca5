use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};

use super::card::AgentCard;
use super::processor::JobsAgent;
use super::task::{A2AMessage, TaskRequest, TaskStatus};
use super::{AGENT_NAME, AGENT_VERSION};
use crate::api::ApiError;

/// A2A routes; layers are added by the caller
pub fn create_router(agent: Arc<JobsAgent>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/agent-card", get(agent_card))
        .route("/task", post(create_task))
        .route("/task/:task_id/status", get(task_status))
        .route("/message", post(receive_message))
        .with_state(agent)
}

async fn root() -> Json<Value> {
    Json(json!({
        "agent": AGENT_NAME,
        "protocol": "A2A",
        "version": AGENT_VERSION,
        "agent_card_url": "/agent-card",
        "endpoints": {
            "agent_card": "/agent-card",
            "create_task": "/task",
            "task_status": "/task/{task_id}/status",
            "send_message": "/message",
            "health": "/health"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "agent": AGENT_NAME,
        "version": AGENT_VERSION,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn agent_card(State(agent): State<Arc<JobsAgent>>) -> Json<AgentCard> {
    Json(agent.card().clone())
}

/// POST /task - 创建并执行任务
async fn create_task(
    State(agent): State<Arc<JobsAgent>>,
    req: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<Json<TaskStatus>, ApiError> {
    let Json(req) = req?;
    Ok(Json(agent.process_task(req).await))
}

async fn task_status(
    State(agent): State<Arc<JobsAgent>>,
    task_id: Result<Path<String>, PathRejection>,
) -> Result<Json<TaskStatus>, ApiError> {
    let Path(task_id) = task_id?;
    agent
        .tasks()
        .get(&task_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}

async fn receive_message(req: Result<Json<A2AMessage>, JsonRejection>) -> Result<Json<Value>, ApiError> {
    let Json(message) = req?;
    tracing::info!(
        "Message {} from {} to {} (task {})",
        message.message_id,
        message.sender,
        message.recipient,
        message.task_id
    );
    Ok(Json(json!({
        "status": "received",
        "message_id": message.message_id,
        "timestamp": Utc::now().to_rfc3339(),
    })))
}
