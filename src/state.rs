use std::sync::Arc;

use crate::client::JobSource;
use crate::config::WebhookConfig;
use crate::webhook::{WebhookMonitor, WebhookRegistry};

/// Shared state of the REST facade / REST 服务共享状态
pub struct AppState {
    pub source: Arc<dyn JobSource>,
    pub webhooks: Arc<WebhookRegistry>,
    pub monitor: Arc<WebhookMonitor>,
}

impl AppState {
    pub fn new(source: Arc<dyn JobSource>, webhook_config: &WebhookConfig) -> Self {
        let monitor = WebhookMonitor::new(source.clone(), webhook_config);
        Self::with_monitor(source, monitor)
    }

    pub fn with_monitor(source: Arc<dyn JobSource>, monitor: WebhookMonitor) -> Self {
        Self {
            source,
            webhooks: Arc::new(WebhookRegistry::new()),
            monitor: Arc::new(monitor),
        }
    }
}
