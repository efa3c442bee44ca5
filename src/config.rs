//! Application configuration module / 应用配置模块
//!
//! Manages application configuration loaded from config.json
//! Creates default config file on first run / 首次运行时创建默认配置文件

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::agent::task::DEFAULT_TASK_RETENTION;

/// Global configuration instance / 全局配置实例
static CONFIG: OnceCell<Arc<RwLock<AppConfig>>> = OnceCell::new();

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Application configuration / 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// REST facade / REST服务
    pub server: ServerConfig,
    /// Agent facade / Agent服务
    pub agent: AgentConfig,
    /// Upstream job search API / 上游职位搜索接口
    pub upstream: UpstreamConfig,
    /// Webhook delivery / Webhook推送
    pub webhook: WebhookConfig,
}

/// Server configuration / 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address / 服务器监听地址
    pub host: String,
    /// Server port / 服务器端口
    pub port: u16,
}

/// Agent server configuration / Agent服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub host: String,
    pub port: u16,
    /// Endpoint advertised in the agent card; empty means `http://localhost:{port}`
    pub public_endpoint: String,
    /// Tasks kept for status polling / 保留的任务数
    pub task_retention: usize,
}

/// Upstream API configuration / 上游接口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Search endpoint / 搜索接口地址
    pub endpoint: String,
    /// Sent as `origin`, with `/index/` appended as `referer`
    pub site_origin: String,
    pub accept_language: String,
    pub user_agent: String,
    /// Request timeout in seconds / 请求超时（秒）
    pub timeout_secs: u64,
    /// Static cookies sent with every request / 固定Cookie
    pub cookies: BTreeMap<String, String>,
}

/// Webhook configuration / Webhook配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Delivery POST timeout in seconds / 推送超时（秒）
    pub delivery_timeout_secs: u64,
    /// Wait before the next check after a transport failure / 传输失败后的重试等待（秒）
    pub retry_delay_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
            public_endpoint: String::new(),
            task_retention: DEFAULT_TASK_RETENTION,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        let cookies = [
            ("device-id", ""),
            ("locale", "en-US"),
            ("channel", "saas-career"),
            ("platform", "pc"),
            ("s_v_web_id", "verify_mcoh7ij8_hZMeHe7e_cEvs_4P0L_AJjj_cxmXxMDYZB4F"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            endpoint: "https://xiaomi.jobs.f.mioffice.cn/api/v1/search/job/posts".to_string(),
            site_origin: "https://xiaomi.jobs.f.mioffice.cn".to_string(),
            accept_language: "zh-CN".to_string(),
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36".to_string(),
            timeout_secs: 30,
            cookies,
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            delivery_timeout_secs: 10,
            retry_delay_secs: 60,
        }
    }
}

impl ServerConfig {
    /// Get the server bind address / 获取服务器绑定地址
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AgentConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Endpoint advertised to other agents / 对外公布的地址
    pub fn endpoint(&self) -> String {
        if self.public_endpoint.is_empty() {
            format!("http://localhost:{}", self.port)
        } else {
            self.public_endpoint.trim_end_matches('/').to_string()
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn referer(&self) -> String {
        format!("{}/index/", self.site_origin.trim_end_matches('/'))
    }

    /// `k1=v1; k2=v2` form of the cookie map / Cookie请求头
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl WebhookConfig {
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs.max(1))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

/// Get the default config file path / 获取配置文件路径
pub fn default_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(CONFIG_FILE_NAME)
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config(config_path: &Path) -> Result<AppConfig> {
    if config_path.exists() {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file {:?}", config_path))?;

        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", config_path))?;

        tracing::info!("Loaded configuration from {:?}", config_path);
        Ok(config)
    } else {
        let config = AppConfig::default();
        save_config(&config, config_path)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        Ok(config)
    }
}

/// Save configuration to file / 保存配置到文件
pub fn save_config(config: &AppConfig, config_path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(config).context("Failed to serialize config")?;

    std::fs::write(config_path, content)
        .with_context(|| format!("Failed to write config file {:?}", config_path))?;

    Ok(())
}

/// Initialize global configuration / 初始化全局配置
pub fn init_config(config_path: &Path) -> Result<Arc<RwLock<AppConfig>>> {
    let config = load_config(config_path)?;

    let config_arc = Arc::new(RwLock::new(config));

    CONFIG
        .set(config_arc.clone())
        .map_err(|_| anyhow::anyhow!("Config already initialized"))?;

    Ok(config_arc)
}

/// Get a read-only snapshot of current config / 获取当前配置的只读快照
pub fn config() -> AppConfig {
    CONFIG
        .get()
        .map(|c| c.read().clone())
        .unwrap_or_default()
}
