use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::format::describe_error;
use crate::insights::{keyword_snapshots, TRENDING_KEYWORDS};
use crate::models::{string_list, ApiOutcome, NormalizedJobRecord, SearchQuery, DEFAULT_LIMIT};
use crate::state::AppState;

const TRENDING_LIMIT: u32 = 5;
const TRENDING_SAMPLES: usize = 3;

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

/// Search parameters, from the query string or a JSON body / 搜索参数
#[derive(Debug, Deserialize)]
pub struct JobSearchRequest {
    #[serde(default)]
    pub keyword: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default, deserialize_with = "string_list")]
    pub location_codes: Vec<String>,
}

impl From<JobSearchRequest> for SearchQuery {
    fn from(req: JobSearchRequest) -> Self {
        SearchQuery::new(req.keyword)
            .with_limit(req.limit)
            .with_offset(req.offset)
            .with_locations(req.location_codes)
    }
}

#[derive(Debug, Serialize)]
pub struct JobSearchResponse {
    pub success: bool,
    pub total_count: u64,
    pub jobs: Vec<NormalizedJobRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<ApiOutcome> for JobSearchResponse {
    fn from(outcome: ApiOutcome) -> Self {
        match outcome {
            Ok(set) => Self {
                success: true,
                total_count: set.total_count,
                jobs: set.records,
                message: None,
            },
            Err(err) => Self {
                success: false,
                total_count: 0,
                jobs: Vec::new(),
                message: Some(describe_error(&err)),
            },
        }
    }
}

async fn run_search(state: &AppState, req: JobSearchRequest) -> Json<JobSearchResponse> {
    let query = SearchQuery::from(req);
    tracing::debug!("REST search keyword={:?} limit={}", query.keyword, query.limit);
    let outcome = state.source.search(&query).await;
    if let Err(e) = &outcome {
        tracing::warn!("Search for {:?} failed ({}): {}", query.keyword, e.kind(), e);
    }
    Json(JobSearchResponse::from(outcome))
}

/// GET /jobs/search?keyword=&limit=&offset=&location_codes=a,b
pub async fn search_jobs_get(
    State(state): State<Arc<AppState>>,
    req: Result<Query<JobSearchRequest>, QueryRejection>,
) -> Result<Json<JobSearchResponse>, ApiError> {
    let Query(req) = req?;
    Ok(run_search(&state, req).await)
}

/// POST /jobs/search
pub async fn search_jobs_post(
    State(state): State<Arc<AppState>>,
    req: Result<Json<JobSearchRequest>, JsonRejection>,
) -> Result<Json<JobSearchResponse>, ApiError> {
    let Json(req) = req?;
    Ok(run_search(&state, req).await)
}

#[derive(Debug, Serialize)]
pub struct SampleJob {
    pub title: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct TrendingKeyword {
    pub count: u64,
    pub sample_jobs: Vec<SampleJob>,
}

#[derive(Debug, Serialize)]
pub struct TrendingResponse {
    pub success: bool,
    pub trending_keywords: BTreeMap<String, TrendingKeyword>,
    pub generated_at: String,
}

/// GET /jobs/trending - 热门职位
pub async fn trending_jobs(State(state): State<Arc<AppState>>) -> Json<TrendingResponse> {
    let snapshots = keyword_snapshots(
        state.source.as_ref(),
        &TRENDING_KEYWORDS,
        TRENDING_LIMIT,
        TRENDING_SAMPLES,
    )
    .await;

    let trending_keywords = snapshots
        .into_iter()
        .map(|s| {
            let sample_jobs = s
                .samples
                .into_iter()
                .map(|job| SampleJob { title: job.title, code: job.code })
                .collect();
            (s.keyword, TrendingKeyword { count: s.total_count, sample_jobs })
        })
        .collect();

    Json(TrendingResponse {
        success: true,
        trending_keywords,
        generated_at: Utc::now().to_rfc3339(),
    })
}
