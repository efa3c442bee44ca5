use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_priority() -> Option<String> {
    Some("normal".to_string())
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// 任务状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    InProgress,
    Completed,
    Failed,
}

/// Incoming task / 任务请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    #[serde(default = "new_id")]
    pub task_id: String,
    pub instruction: String,
    #[serde(default)]
    pub context: Option<Map<String, Value>>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: Option<String>,
    #[serde(default)]
    pub expected_completion_time: Option<String>,
}

impl TaskRequest {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            task_id: new_id(),
            instruction: instruction.into(),
            context: None,
            user_id: None,
            priority: default_priority(),
            expected_completion_time: None,
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        if let Value::Object(map) = context {
            self.context = Some(map);
        }
        self
    }
}

/// Typed result attached to a finished task / 任务产出
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artifact {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: Value,
    pub format: String,
}

impl Artifact {
    pub fn json(kind: &str, content: Value) -> Self {
        Self {
            kind: kind.to_string(),
            content,
            format: "application/json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatus {
    pub task_id: String,
    pub status: TaskState,
    /// 0.0 to 1.0
    pub progress: Option<f64>,
    pub message: Option<String>,
    pub artifacts: Option<Vec<Artifact>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Agent-to-agent message / 智能体间消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct A2AMessage {
    #[serde(default = "new_id")]
    pub message_id: String,
    pub task_id: String,
    pub sender: String,
    pub recipient: String,
    pub content: Map<String, Value>,
    #[serde(default = "now_rfc3339")]
    pub timestamp: String,
}

/// Finished tasks kept for polling by default / 默认保留的任务数
pub const DEFAULT_TASK_RETENTION: usize = 1000;

/// In-memory task table / 任务管理器
///
/// Holds at most `capacity` tasks. Starting a task on a full table evicts
/// the least recently updated finished tasks; running tasks are never evicted.
#[derive(Clone)]
pub struct TaskManager {
    tasks: Arc<RwLock<HashMap<String, TaskStatus>>>,
    capacity: usize,
}

impl TaskManager {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TASK_RETENTION)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Register a task as in progress
    pub async fn start(&self, task_id: &str, message: &str) -> TaskStatus {
        let now = Utc::now();
        let status = TaskStatus {
            task_id: task_id.to_string(),
            status: TaskState::InProgress,
            progress: Some(0.0),
            message: Some(message.to_string()),
            artifacts: None,
            created_at: now,
            updated_at: now,
        };
        let mut tasks = self.tasks.write().await;
        if !tasks.contains_key(task_id) {
            evict_finished(&mut tasks, self.capacity - 1);
        }
        tasks.insert(task_id.to_string(), status.clone());
        status
    }

    pub async fn complete(&self, task_id: &str, artifact: Artifact) -> Option<TaskStatus> {
        self.update(task_id, |t| {
            t.status = TaskState::Completed;
            t.progress = Some(1.0);
            t.message = Some("Task completed successfully".to_string());
            t.artifacts = Some(vec![artifact]);
        })
        .await
    }

    pub async fn fail(&self, task_id: &str, error: &str) -> Option<TaskStatus> {
        self.update(task_id, |t| {
            t.status = TaskState::Failed;
            t.message = Some(format!("Task failed: {}", error));
        })
        .await
    }

    async fn update<F>(&self, task_id: &str, f: F) -> Option<TaskStatus>
    where
        F: FnOnce(&mut TaskStatus),
    {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(task_id)?;
        f(task);
        task.updated_at = Utc::now();
        Some(task.clone())
    }

    pub async fn get(&self, task_id: &str) -> Option<TaskStatus> {
        self.tasks.read().await.get(task_id).cloned()
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop oldest finished tasks until at most `keep` remain
fn evict_finished(tasks: &mut HashMap<String, TaskStatus>, keep: usize) {
    if tasks.len() <= keep {
        return;
    }
    let mut finished: Vec<(DateTime<Utc>, String)> = tasks
        .values()
        .filter(|t| t.status != TaskState::InProgress)
        .map(|t| (t.updated_at, t.task_id.clone()))
        .collect();
    finished.sort();

    let excess = tasks.len() - keep;
    let mut removed = 0;
    for (_, id) in finished.into_iter().take(excess) {
        tasks.remove(&id);
        removed += 1;
    }
    tracing::debug!("Evicted {} finished tasks, {} remain", removed, tasks.len());
}
