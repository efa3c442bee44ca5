//! Task execution / 任务处理
//!
//! Tasks run to completion inside the request; the task table keeps the
//! final status for later polling.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Map, Value};

use super::card::AgentCard;
use super::intent::{extract_keyword, TaskIntent};
use super::task::{Artifact, TaskManager, TaskRequest, TaskStatus};
use crate::client::JobSource;
use crate::format::describe_error;
use crate::insights::{keyword_snapshots, most_active, recommend, total_postings, MARKET_CATEGORIES};
use crate::models::{SearchQuery, DEFAULT_LIMIT};
use crate::normalize::NOT_AVAILABLE;

const MARKET_LIMIT: u32 = 5;
const MARKET_SAMPLES: usize = 3;
const RECOMMEND_SKILLS: usize = 3;
const RECOMMEND_PER_SKILL: u32 = 3;
const RECOMMEND_MAX: usize = 10;
const GENERAL_LIMIT: u32 = 5;
const DEFAULT_EXPERIENCE: &str = "mid";
const DEFAULT_SKILLS: [&str; 2] = ["python", "AI"];

pub struct JobsAgent {
    source: Arc<dyn JobSource>,
    tasks: TaskManager,
    card: AgentCard,
}

impl JobsAgent {
    pub fn new(source: Arc<dyn JobSource>, endpoint: &str) -> Self {
        Self {
            source,
            tasks: TaskManager::new(),
            card: AgentCard::new(endpoint),
        }
    }

    /// Bound the task table / 限制任务表大小
    pub fn with_task_retention(mut self, capacity: usize) -> Self {
        self.tasks = TaskManager::with_capacity(capacity);
        self
    }

    pub fn card(&self) -> &AgentCard {
        &self.card
    }

    pub fn tasks(&self) -> &TaskManager {
        &self.tasks
    }

    /// Run a task and return its final status / 执行任务
    pub async fn process_task(&self, request: TaskRequest) -> TaskStatus {
        let task_id = request.task_id.clone();
        let started = self.tasks.start(&task_id, "Processing job search request...").await;

        let empty = Map::new();
        let context = request.context.as_ref().unwrap_or(&empty);
        let intent = TaskIntent::classify(&request.instruction);
        tracing::info!("Task {} classified as {:?}", task_id, intent);

        let result = match intent {
            TaskIntent::JobSearch => self.job_search(&request.instruction, context).await,
            TaskIntent::MarketAnalysis => Ok(self.market_analysis().await),
            TaskIntent::Recommendations => Ok(self.recommendations(context).await),
            TaskIntent::General => Ok(self.general_info().await),
        };

        let finished = match result {
            Ok(artifact) => self.tasks.complete(&task_id, artifact).await,
            Err(e) => {
                tracing::warn!("Task {} failed: {}", task_id, e);
                self.tasks.fail(&task_id, &e).await
            }
        };
        finished.unwrap_or(started)
    }

    async fn job_search(&self, instruction: &str, context: &Map<String, Value>) -> Result<Artifact, String> {
        let keyword = match context.get("keyword").and_then(Value::as_str) {
            Some(k) if !k.is_empty() => k.to_string(),
            _ => extract_keyword(instruction),
        };
        let limit = context
            .get("limit")
            .and_then(Value::as_u64)
            .map(|l| l.min(u32::MAX as u64) as u32)
            .unwrap_or(DEFAULT_LIMIT);

        let query = SearchQuery::new(keyword.as_str()).with_limit(limit);
        let set = self.source.search(&query).await.map_err(|e| describe_error(&e))?;

        Ok(Artifact::json(
            "job_search_results",
            json!({
                "query": keyword,
                "total_count": set.total_count,
                "jobs": set.records,
                "search_timestamp": Utc::now().to_rfc3339(),
            }),
        ))
    }

    async fn market_analysis(&self) -> Artifact {
        let snapshots = keyword_snapshots(self.source.as_ref(), &MARKET_CATEGORIES, MARKET_LIMIT, MARKET_SAMPLES).await;

        let most = most_active(&snapshots)
            .map(|s| s.keyword.clone())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let insights = vec![
            format!("Found {} total jobs across analyzed categories", total_postings(&snapshots)),
            format!("Most active category: {}", most),
            "Analysis based on current Xiaomi job postings".to_string(),
        ];

        let categories: BTreeMap<String, Value> = snapshots
            .into_iter()
            .map(|s| {
                let titles: Vec<String> = s.samples.into_iter().map(|j| j.title).collect();
                (s.keyword, json!({"total_jobs": s.total_count, "sample_titles": titles}))
            })
            .collect();

        Artifact::json(
            "market_analysis",
            json!({
                "analysis_date": Utc::now().to_rfc3339(),
                "job_categories": categories,
                "insights": insights,
            }),
        )
    }

    async fn recommendations(&self, context: &Map<String, Value>) -> Artifact {
        let experience_level = context
            .get("experience_level")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_EXPERIENCE)
            .to_string();
        let skills: Vec<String> = match context.get("preferred_skills").and_then(Value::as_array) {
            Some(items) => items.iter().filter_map(Value::as_str).map(String::from).collect(),
            None => DEFAULT_SKILLS.iter().map(|s| s.to_string()).collect(),
        };

        let recommendations = recommend(
            self.source.as_ref(),
            &skills,
            RECOMMEND_SKILLS,
            RECOMMEND_PER_SKILL,
            RECOMMEND_MAX,
        )
        .await;

        Artifact::json(
            "job_recommendations",
            json!({
                "user_profile": {
                    "experience_level": experience_level,
                    "preferred_skills": skills,
                },
                "recommendations": recommendations,
                "recommendation_timestamp": Utc::now().to_rfc3339(),
            }),
        )
    }

    async fn general_info(&self) -> Artifact {
        let query = SearchQuery::new("").with_limit(GENERAL_LIMIT);
        let (total_jobs, samples) = match self.source.search(&query).await {
            Ok(set) => {
                let samples: Vec<Value> = set
                    .records
                    .into_iter()
                    .take(GENERAL_LIMIT as usize)
                    .map(|j| json!({"title": j.title, "code": j.code}))
                    .collect();
                (set.total_count, samples)
            }
            Err(e) => {
                tracing::warn!("General search failed: {}", e);
                (0, Vec::new())
            }
        };

        Artifact::json(
            "general_info",
            json!({
                "message": "Here's some general information about current Xiaomi job opportunities",
                "total_jobs": total_jobs,
                "sample_jobs": samples,
                "query_timestamp": Utc::now().to_rfc3339(),
            }),
        )
    }
}
