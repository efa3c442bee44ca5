use std::sync::Arc;

use axum::{extract::State, response::Html, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::AppState;

pub const BUILD_TIME: &str = env!("BUILD_TIME");

const INDEX_HTML: &str = r#"<html>
    <head>
        <title>Xiaomi Jobs API</title>
        <style>
            body { font-family: Arial, sans-serif; margin: 40px; }
            .endpoint { background: #f5f5f5; padding: 10px; margin: 10px 0; border-radius: 5px; }
            .method { color: #fff; padding: 2px 8px; border-radius: 3px; font-weight: bold; }
            .get { background: #61affe; }
            .post { background: #49cc90; }
            .delete { background: #f93e3e; }
        </style>
    </head>
    <body>
        <h1>Xiaomi Jobs API</h1>
        <p>REST API for the Xiaomi careers job search</p>
        <h2>Available Endpoints:</h2>
        <div class="endpoint">
            <span class="method get">GET</span> <strong>/jobs/search</strong>
            <p>Search for jobs with query parameters</p>
            <p>Example: <code>/jobs/search?keyword=python&amp;limit=5</code></p>
        </div>
        <div class="endpoint">
            <span class="method post">POST</span> <strong>/jobs/search</strong>
            <p>Search for jobs with JSON payload</p>
        </div>
        <div class="endpoint">
            <span class="method get">GET</span> <strong>/jobs/trending</strong>
            <p>Get trending job categories</p>
        </div>
        <div class="endpoint">
            <span class="method post">POST</span> <strong>/webhooks/register</strong>
            <p>Register a webhook for job alerts</p>
        </div>
        <div class="endpoint">
            <span class="method get">GET</span> <strong>/webhooks</strong>
            <p>List active webhooks</p>
        </div>
        <div class="endpoint">
            <span class="method delete">DELETE</span> <strong>/webhooks/{id}</strong>
            <p>Stop and remove a webhook</p>
        </div>
        <div class="endpoint">
            <span class="method get">GET</span> <strong>/health</strong>
            <p>Service health</p>
        </div>
    </body>
</html>
"#;

/// GET / - 接口说明
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /health - 健康检查
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "active_webhooks": state.webhooks.len(),
        "build_time": BUILD_TIME,
    }))
}
