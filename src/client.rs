//! 小米招聘搜索 HTTP 客户端
//!
//! Issues the single upstream POST. Failures are folded into the response
//! envelope's `error` field so every caller goes through the normalizer.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::Value;

use crate::config::UpstreamConfig;
use crate::models::{ApiOutcome, RawResponse, SearchPayload, SearchQuery};
use crate::normalize::normalize;

/// Anything that can answer a job search / 职位数据源
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Raw envelope; transport failures are reported through `error`
    async fn search_raw(&self, query: &SearchQuery) -> RawResponse;

    /// Search and normalize / 搜索并规范化
    async fn search(&self, query: &SearchQuery) -> ApiOutcome {
        normalize(&self.search_raw(query).await)
    }
}

/// 小米招聘客户端
#[derive(Clone)]
pub struct JobsClient {
    client: Client,
    endpoint: String,
    headers: HeaderMap,
}

impl JobsClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            headers: build_headers(config)?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Browser-like header set the careers portal expects / 请求头
fn build_headers(config: &UpstreamConfig) -> Result<HeaderMap> {
    let referer = config.referer();
    let cookie = config.cookie_header();
    let pairs: [(&'static str, &str); 10] = [
        ("accept", "application/json, text/plain, */*"),
        ("accept-language", &config.accept_language),
        ("content-type", "application/json"),
        ("origin", &config.site_origin),
        ("referer", &referer),
        ("user-agent", &config.user_agent),
        ("website-path", "index"),
        ("portal-channel", "saas-career"),
        ("portal-platform", "pc"),
        ("cookie", &cookie),
    ];

    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        if value.is_empty() {
            continue;
        }
        let value = HeaderValue::from_str(value)
            .with_context(|| format!("Invalid value for header {}", name))?;
        headers.insert(HeaderName::from_static(name), value);
    }
    Ok(headers)
}

#[async_trait]
impl JobSource for JobsClient {
    async fn search_raw(&self, query: &SearchQuery) -> RawResponse {
        let payload = SearchPayload::from(query);
        tracing::debug!(
            "POST {} keyword={:?} limit={} offset={}",
            self.endpoint,
            query.keyword,
            query.limit,
            query.offset
        );

        let resp = match self
            .client
            .post(&self.endpoint)
            .headers(self.headers.clone())
            .json(&payload)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!("Job search request failed: {}", e);
                return RawResponse::transport_error(format!("Request Error: {}", e));
            }
        };

        let status = resp.status();
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => return RawResponse::transport_error(format!("Request Error: {}", e)),
        };

        if !status.is_success() {
            tracing::warn!("Job search returned HTTP {}", status.as_u16());
            return RawResponse::transport_error(format!("HTTP Error {}: {}", status.as_u16(), body));
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(value) => RawResponse::from_value(&value),
            Err(e) => RawResponse::transport_error(format!("JSON Decode Error: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;
    use axum::{http::HeaderMap as AxumHeaders, http::StatusCode, routing::post, Json, Router};
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    async fn spawn_upstream(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/api/v1/search/job/posts", addr)
    }

    fn client_for(endpoint: String) -> JobsClient {
        let config = UpstreamConfig {
            endpoint,
            timeout_secs: 5,
            ..UpstreamConfig::default()
        };
        JobsClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_posts_payload_and_headers() {
        let seen: Arc<Mutex<Option<(Value, String, String)>>> = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();
        let app = Router::new().route(
            "/api/v1/search/job/posts",
            post(move |headers: AxumHeaders, Json(body): Json<Value>| {
                let seen = seen_clone.clone();
                async move {
                    let cookie = headers.get("cookie").and_then(|v| v.to_str().ok()).unwrap_or("").to_string();
                    let channel = headers
                        .get("portal-channel")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    *seen.lock().await = Some((body, cookie, channel));
                    Json(json!({
                        "code": 0,
                        "data": {"count": 1, "job_post_list": [{"id": "7", "title": "Rust Engineer"}]}
                    }))
                }
            }),
        );
        let client = client_for(spawn_upstream(app).await);

        let query = SearchQuery::new("rust").with_limit(3).with_locations(["CN_110000"]);
        let set = client.search(&query).await.unwrap();
        assert_eq!(set.total_count, 1);
        assert_eq!(set.records[0].title, "Rust Engineer");

        let (body, cookie, channel) = seen.lock().await.clone().unwrap();
        assert_eq!(body["keyword"], "rust");
        assert_eq!(body["limit"], 3);
        assert_eq!(body["location_code_list"], json!(["CN_110000"]));
        assert_eq!(body["portal_type"], 6);
        assert_eq!(body["portal_entrance"], 1);
        assert!(cookie.contains("platform=pc"));
        assert_eq!(channel, "saas-career");
    }

    #[tokio::test]
    async fn test_http_error_becomes_transport_failure() {
        let app = Router::new().route(
            "/api/v1/search/job/posts",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        );
        let client = client_for(spawn_upstream(app).await);

        let err = client.search(&SearchQuery::default()).await.unwrap_err();
        assert_eq!(err, SearchError::Transport("HTTP Error 503: maintenance".to_string()));
    }

    #[tokio::test]
    async fn test_non_json_body_becomes_decode_error() {
        let app = Router::new().route("/api/v1/search/job/posts", post(|| async { "<html>login</html>" }));
        let client = client_for(spawn_upstream(app).await);

        let raw = client.search_raw(&SearchQuery::default()).await;
        assert!(raw.error.unwrap().starts_with("JSON Decode Error:"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_request_error() {
        // Bind then drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(format!("http://{}/api", addr));
        let err = client.search(&SearchQuery::default()).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().starts_with("Request Error:"));
    }

    #[test]
    fn test_invalid_header_value_is_rejected() {
        let config = UpstreamConfig {
            user_agent: "bad\nagent".to_string(),
            ..UpstreamConfig::default()
        };
        assert!(JobsClient::new(&config).is_err());
    }
}
