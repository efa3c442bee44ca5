//! Agent-to-agent (A2A) facade / A2A 智能体接口
//!
//! Publishes an agent card, accepts natural-language tasks and answers
//! them with job search, market analysis or recommendation artifacts.

pub mod card;
pub mod intent;
pub mod processor;
pub mod routes;
pub mod task;

pub use card::AgentCard;
pub use processor::JobsAgent;
pub use routes::create_router;
pub use task::{TaskManager, TaskRequest, TaskState, TaskStatus};

pub const AGENT_NAME: &str = "xiaomi-jobs-agent";
pub const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");
