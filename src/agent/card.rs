use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::AGENT_VERSION;
use crate::mcp::server::MAX_TOOL_LIMIT;
use crate::models::DEFAULT_LIMIT;

/// Self-description served at `/agent-card` / 智能体名片
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub version: String,
    pub capabilities: Vec<String>,
    pub skills: Vec<Value>,
    pub contact_info: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<Value>,
}

impl AgentCard {
    pub fn new(endpoint: &str) -> Self {
        Self {
            name: "Xiaomi Jobs Search Agent".to_string(),
            description: "An agent specialized in searching and analyzing Xiaomi job postings. \
                          Finds jobs by keyword and location and reports requirements, descriptions \
                          and market trends."
                .to_string(),
            version: AGENT_VERSION.to_string(),
            capabilities: ["job_search", "job_analysis", "career_guidance", "market_insights"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            skills: skills(),
            contact_info: json!({
                "endpoint": endpoint,
                "protocol": "A2A",
                "supported_methods": ["task_request", "task_status", "message"]
            }),
            authentication: None,
        }
    }

    pub fn skill_names(&self) -> Vec<&str> {
        self.skills
            .iter()
            .filter_map(|s| s.get("name").and_then(Value::as_str))
            .collect()
    }
}

fn skills() -> Vec<Value> {
    vec![
        json!({
            "name": "search_jobs",
            "description": "Search for job postings at Xiaomi based on keywords, location, and other criteria",
            "parameters": {
                "type": "object",
                "properties": {
                    "keyword": {"type": "string", "description": "Search keyword for job titles or descriptions"},
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results to return",
                        "default": DEFAULT_LIMIT,
                        "minimum": 1,
                        "maximum": MAX_TOOL_LIMIT
                    },
                    "location_codes": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "List of location codes to filter by"
                    }
                }
            }
        }),
        json!({
            "name": "analyze_job_market",
            "description": "Analyze job market trends and provide insights about specific roles or skills",
            "parameters": {
                "type": "object",
                "properties": {
                    "role_type": {"type": "string", "description": "Type of role to analyze (e.g., 'engineer', 'manager', 'designer')"},
                    "skills": {"type": "array", "items": {"type": "string"}, "description": "Specific skills to analyze demand for"}
                }
            }
        }),
        json!({
            "name": "get_job_recommendations",
            "description": "Get personalized job recommendations based on user profile and preferences",
            "parameters": {
                "type": "object",
                "properties": {
                    "experience_level": {
                        "type": "string",
                        "enum": ["entry", "mid", "senior", "executive"],
                        "description": "Experience level of the candidate"
                    },
                    "preferred_skills": {"type": "array", "items": {"type": "string"}, "description": "Skills the candidate wants to use"},
                    "location_preference": {"type": "string", "description": "Preferred work location"}
                }
            }
        }),
    ]
}
