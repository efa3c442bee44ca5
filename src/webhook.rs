//! Keyword alert webhooks / 关键词提醒 Webhook
//!
//! Each registered webhook gets its own monitor task that searches its
//! keyword periodically and POSTs a short alert when postings exist.
//! Removing a webhook cancels its monitor.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::JobSource;
use crate::config::WebhookConfig;
use crate::error::SearchError;
use crate::models::{NormalizedJobRecord, SearchQuery};

pub const ALERT_SEARCH_LIMIT: u32 = 5;
pub const ALERT_SAMPLE_SIZE: usize = 3;
pub const DEFAULT_INTERVAL_MINUTES: u64 = 60;

/// Public view of a webhook / Webhook 信息
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Webhook {
    pub id: u64,
    pub keyword: String,
    pub webhook_url: String,
    pub check_interval_minutes: u64,
    pub created_at: DateTime<Utc>,
    pub last_check: Option<DateTime<Utc>>,
    pub total_notifications: u64,
}

pub struct WebhookEntry {
    info: RwLock<Webhook>,
    cancel: CancellationToken,
}

impl WebhookEntry {
    pub fn id(&self) -> u64 {
        self.info.read().id
    }

    pub fn snapshot(&self) -> Webhook {
        self.info.read().clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn record_check(&self, delivered: bool) {
        let mut info = self.info.write();
        info.last_check = Some(Utc::now());
        if delivered {
            info.total_notifications += 1;
        }
    }
}

/// Concurrency-safe webhook table / Webhook 注册表
#[derive(Default)]
pub struct WebhookRegistry {
    next_id: AtomicU64,
    entries: RwLock<HashMap<u64, Arc<WebhookEntry>>>,
}

impl WebhookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, keyword: &str, webhook_url: &str, check_interval_minutes: u64) -> Arc<WebhookEntry> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let entry = Arc::new(WebhookEntry {
            info: RwLock::new(Webhook {
                id,
                keyword: keyword.to_string(),
                webhook_url: webhook_url.to_string(),
                check_interval_minutes,
                created_at: Utc::now(),
                last_check: None,
                total_notifications: 0,
            }),
            cancel: CancellationToken::new(),
        });
        self.entries.write().insert(id, entry.clone());
        tracing::info!("Registered webhook {} for keyword {:?}", id, keyword);
        entry
    }

    /// Remove and stop monitoring; `None` if unknown
    pub fn remove(&self, id: u64) -> Option<Webhook> {
        let entry = self.entries.write().remove(&id)?;
        entry.cancel.cancel();
        tracing::info!("Removed webhook {}", id);
        Some(entry.snapshot())
    }

    /// All webhooks ordered by id
    pub fn list(&self) -> Vec<Webhook> {
        let mut hooks: Vec<Webhook> = self.entries.read().values().map(|e| e.snapshot()).collect();
        hooks.sort_by_key(|h| h.id);
        hooks
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancel every monitor, used on shutdown
    pub fn cancel_all(&self) {
        for entry in self.entries.read().values() {
            entry.cancel.cancel();
        }
    }
}

/// Alert body sent to the webhook URL
pub fn build_alert_payload(
    webhook_id: u64,
    keyword: &str,
    records: &[NormalizedJobRecord],
    now: DateTime<Utc>,
) -> Value {
    let jobs: Vec<Value> = records
        .iter()
        .take(ALERT_SAMPLE_SIZE)
        .map(|job| json!({"title": job.title, "code": job.code, "url": job.detail_url}))
        .collect();

    json!({
        "webhook_id": webhook_id,
        "keyword": keyword,
        "new_jobs_count": records.len(),
        "jobs": jobs,
        "timestamp": now.to_rfc3339(),
    })
}

/// Runs the per-webhook check loops / Webhook 监控
pub struct WebhookMonitor {
    source: Arc<dyn JobSource>,
    http: reqwest::Client,
    delivery_timeout: Duration,
    retry_delay: Duration,
    /// Length of one "minute" of check interval
    interval_unit: Duration,
}

impl WebhookMonitor {
    pub fn new(source: Arc<dyn JobSource>, config: &WebhookConfig) -> Self {
        Self {
            source,
            http: reqwest::Client::new(),
            delivery_timeout: config.delivery_timeout(),
            retry_delay: config.retry_delay(),
            interval_unit: Duration::from_secs(60),
        }
    }

    pub fn with_interval_unit(mut self, unit: Duration) -> Self {
        self.interval_unit = unit;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Start the monitor loop for one webhook
    pub fn spawn(self: &Arc<Self>, entry: Arc<WebhookEntry>) -> JoinHandle<()> {
        let monitor = self.clone();
        tokio::spawn(async move { monitor.run(entry).await })
    }

    async fn run(&self, entry: Arc<WebhookEntry>) {
        let id = entry.id();
        tracing::debug!("Webhook {} monitor started", id);
        loop {
            if entry.is_cancelled() {
                break;
            }

            let minutes = entry.snapshot().check_interval_minutes;
            let interval = self.interval_unit.saturating_mul(minutes.min(u32::MAX as u64) as u32);
            let wait = match self.check_once(&entry).await {
                Ok(_) => interval,
                Err(e) if e.is_retryable() => {
                    tracing::warn!("Webhook {} search failed, retrying: {}", id, e);
                    self.retry_delay
                }
                Err(e) => {
                    tracing::warn!("Webhook {} check failed: {}", id, e);
                    interval
                }
            };

            tokio::select! {
                _ = entry.cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }
        tracing::debug!("Webhook {} monitor stopped", id);
    }

    /// One check cycle; `Ok(true)` when an alert was delivered with HTTP 200
    pub async fn check_once(&self, entry: &WebhookEntry) -> Result<bool, SearchError> {
        let hook = entry.snapshot();
        let query = SearchQuery::new(hook.keyword.as_str()).with_limit(ALERT_SEARCH_LIMIT);

        let records = match self.source.search(&query).await {
            Ok(set) => set.records,
            Err(e) if e.is_retryable() => return Err(e),
            Err(e) => {
                entry.record_check(false);
                return Err(e);
            }
        };

        let mut delivered = false;
        if !records.is_empty() {
            let payload = build_alert_payload(hook.id, &hook.keyword, &records, Utc::now());
            delivered = self.deliver(&hook, &payload).await;
        }
        entry.record_check(delivered);
        Ok(delivered)
    }

    async fn deliver(&self, hook: &Webhook, payload: &Value) -> bool {
        let result = self
            .http
            .post(&hook.webhook_url)
            .timeout(self.delivery_timeout)
            .json(payload)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status() == reqwest::StatusCode::OK => {
                tracing::info!("Webhook {} notified {}", hook.id, hook.webhook_url);
                true
            }
            Ok(resp) => {
                tracing::warn!("Webhook {} got HTTP {}", hook.id, resp.status().as_u16());
                false
            }
            Err(e) => {
                tracing::warn!("Webhook {} notification failed: {}", hook.id, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_value;
    use crate::testing::{page, StubSource};
    use axum::{http::StatusCode, routing::post, Json, Router};
    use tokio::sync::mpsc;

    fn monitor(source: StubSource) -> Arc<WebhookMonitor> {
        Arc::new(
            WebhookMonitor::new(Arc::new(source), &WebhookConfig::default())
                .with_interval_unit(Duration::from_millis(20))
                .with_retry_delay(Duration::from_millis(20)),
        )
    }

    async fn spawn_receiver(status: StatusCode) -> (String, mpsc::UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = Router::new().route(
            "/hook",
            post(move |Json(body): Json<Value>| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(body);
                    status
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/hook", addr), rx)
    }

    #[test]
    fn test_alert_payload_caps_samples() {
        let set = normalize_value(&page(9, &["A", "B", "C", "D"])).unwrap();
        let now = Utc::now();
        let payload = build_alert_payload(7, "AI", &set.records, now);
        assert_eq!(payload["webhook_id"], 7);
        assert_eq!(payload["keyword"], "AI");
        assert_eq!(payload["new_jobs_count"], 4);
        assert_eq!(payload["jobs"].as_array().unwrap().len(), 3);
        assert_eq!(payload["jobs"][0], json!({
            "title": "A",
            "code": "C1",
            "url": "https://xiaomi.jobs.f.mioffice.cn/index/position/1/detail"
        }));
        assert_eq!(payload["timestamp"], now.to_rfc3339());
    }

    #[test]
    fn test_registry_ids_and_removal() {
        let registry = WebhookRegistry::new();
        let a = registry.register("AI", "http://a", 60);
        let b = registry.register("rust", "http://b", 5);
        assert_eq!((a.id(), b.id()), (1, 2));
        assert_eq!(registry.len(), 2);

        let removed = registry.remove(1).unwrap();
        assert_eq!(removed.keyword, "AI");
        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());
        assert!(registry.remove(1).is_none());

        // Ids are never reused
        let c = registry.register("go", "http://c", 1);
        assert_eq!(c.id(), 3);
        let ids: Vec<u64> = registry.list().iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_check_delivers_alert() {
        let (url, mut rx) = spawn_receiver(StatusCode::OK).await;
        let registry = WebhookRegistry::new();
        let entry = registry.register("AI", &url, 60);
        let monitor = monitor(StubSource::default().with("AI", page(2, &["LLM Engineer", "CV Engineer"])));

        assert!(monitor.check_once(&entry).await.unwrap());
        let body = rx.recv().await.unwrap();
        assert_eq!(body["new_jobs_count"], 2);
        assert_eq!(body["jobs"][1]["title"], "CV Engineer");

        let hook = entry.snapshot();
        assert_eq!(hook.total_notifications, 1);
        assert!(hook.last_check.is_some());
    }

    #[tokio::test]
    async fn test_non_200_is_not_counted() {
        let (url, mut rx) = spawn_receiver(StatusCode::ACCEPTED).await;
        let registry = WebhookRegistry::new();
        let entry = registry.register("AI", &url, 60);
        let monitor = monitor(StubSource::default().with("AI", page(1, &["LLM Engineer"])));

        assert!(!monitor.check_once(&entry).await.unwrap());
        assert!(rx.recv().await.is_some());
        assert_eq!(entry.snapshot().total_notifications, 0);
        assert!(entry.snapshot().last_check.is_some());
    }

    #[tokio::test]
    async fn test_no_postings_sends_nothing() {
        let (url, mut rx) = spawn_receiver(StatusCode::OK).await;
        let registry = WebhookRegistry::new();
        let entry = registry.register("nothing", &url, 60);
        let monitor = monitor(StubSource::default());

        assert!(!monitor.check_once(&entry).await.unwrap());
        assert!(rx.try_recv().is_err());
        assert!(entry.snapshot().last_check.is_some());
    }

    #[tokio::test]
    async fn test_transport_failure_waits_retry_delay() {
        let source = Arc::new(StubSource::default().with("AI", json!({"error": "Request Error: timed out"})));
        let monitor = Arc::new(
            WebhookMonitor::new(source.clone(), &WebhookConfig::default())
                .with_interval_unit(Duration::from_secs(3600))
                .with_retry_delay(Duration::from_millis(20)),
        );
        let registry = WebhookRegistry::new();
        let entry = registry.register("AI", "http://127.0.0.1:9/hook", 1);

        let handle = monitor.spawn(entry.clone());
        tokio::time::timeout(Duration::from_secs(2), async {
            while source.call_count() < 3 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("search was not retried");
        assert!(entry.snapshot().last_check.is_none());

        registry.remove(entry.id());
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_api_failure_waits_full_interval() {
        let source = Arc::new(StubSource::default().with("AI", json!({"code": 5, "message": "quota"})));
        let monitor = Arc::new(
            WebhookMonitor::new(source.clone(), &WebhookConfig::default())
                .with_interval_unit(Duration::from_secs(3600))
                .with_retry_delay(Duration::from_millis(10)),
        );
        let registry = WebhookRegistry::new();
        let entry = registry.register("AI", "http://127.0.0.1:9/hook", 1);

        let handle = monitor.spawn(entry.clone());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(source.call_count(), 1);
        assert!(entry.snapshot().last_check.is_some());

        registry.remove(entry.id());
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_monitor_stops_on_removal() {
        let (url, mut rx) = spawn_receiver(StatusCode::OK).await;
        let registry = WebhookRegistry::new();
        let entry = registry.register("AI", &url, 1);
        let monitor = monitor(StubSource::default().with("AI", page(1, &["LLM Engineer"])));

        let handle = monitor.spawn(entry.clone());
        assert!(rx.recv().await.is_some());
        registry.remove(entry.id());

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("monitor did not stop")
            .unwrap();
    }
}
