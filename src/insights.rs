//! Multi-keyword aggregation over the search API / 多关键词聚合
//!
//! Backs the trending endpoint, the agent's market analysis and its
//! recommendations. Keywords are searched concurrently; failed searches are
//! skipped, never fatal.

use futures::future::join_all;
use serde::Serialize;

use crate::client::JobSource;
use crate::models::{NormalizedJobRecord, SearchQuery};

pub const TRENDING_KEYWORDS: [&str; 5] = ["AI", "python", "engineer", "developer", "manager"];
pub const MARKET_CATEGORIES: [&str; 5] = ["AI", "engineer", "developer", "manager", "designer"];

/// Count and a few sample postings for one keyword / 单个关键词统计
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSnapshot {
    pub keyword: String,
    pub total_count: u64,
    pub samples: Vec<NormalizedJobRecord>,
}

/// Snapshot every keyword; keywords with no postings or a failed search are dropped
pub async fn keyword_snapshots(
    source: &dyn JobSource,
    keywords: &[&str],
    limit: u32,
    max_samples: usize,
) -> Vec<KeywordSnapshot> {
    let searches = keywords.iter().map(|keyword| async move {
        let query = SearchQuery::new(*keyword).with_limit(limit);
        (keyword, source.search(&query).await)
    });

    join_all(searches)
        .await
        .into_iter()
        .filter_map(|(keyword, outcome)| match outcome {
            Ok(set) if set.total_count > 0 => Some(KeywordSnapshot {
                keyword: keyword.to_string(),
                total_count: set.total_count,
                samples: set.records.into_iter().take(max_samples).collect(),
            }),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Snapshot search for {:?} failed: {}", keyword, e);
                None
            }
        })
        .collect()
}

/// Keyword with the most postings; first one wins ties
pub fn most_active(snapshots: &[KeywordSnapshot]) -> Option<&KeywordSnapshot> {
    snapshots.iter().fold(None, |best: Option<&KeywordSnapshot>, s| match best {
        Some(b) if b.total_count >= s.total_count => Some(b),
        _ => Some(s),
    })
}

pub fn total_postings(snapshots: &[KeywordSnapshot]) -> u64 {
    snapshots.iter().map(|s| s.total_count).sum()
}

/// 推荐职位
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Recommendation {
    pub title: String,
    pub code: String,
    pub matching_skill: String,
    pub url: String,
    pub locations: Vec<String>,
}

/// Search each of the first `max_skills` skills and merge the hits, capped at `max_results`
pub async fn recommend(
    source: &dyn JobSource,
    skills: &[String],
    max_skills: usize,
    per_skill: u32,
    max_results: usize,
) -> Vec<Recommendation> {
    let searches = skills.iter().take(max_skills).map(|skill| async move {
        let query = SearchQuery::new(skill.as_str()).with_limit(per_skill);
        (skill, source.search(&query).await)
    });

    join_all(searches)
        .await
        .into_iter()
        .flat_map(|(skill, outcome)| {
            let records = outcome.map(|set| set.records).unwrap_or_default();
            records.into_iter().map(move |job| Recommendation {
                title: job.title,
                code: job.code,
                matching_skill: skill.clone(),
                url: job.detail_url,
                locations: job.locations,
            })
        })
        .take(max_results)
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::testing::{page, StubSource};
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_snapshots_skip_empty_and_failed() {
        let source = StubSource::default()
            .with("AI", page(40, &["LLM Engineer", "CV Engineer", "ASR Engineer", "NLP Engineer"]))
            .with("python", json!({"code": 500, "message": "busy"}))
            .with("engineer", page(120, &["Backend"]));

        let snapshots = keyword_snapshots(&source, &TRENDING_KEYWORDS, 5, 3).await;
        let keywords: Vec<_> = snapshots.iter().map(|s| s.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["AI", "engineer"]);
        assert_eq!(snapshots[0].samples.len(), 3);
        assert_eq!(source.call_count(), 5);
        assert!(source.queries.lock().iter().all(|q| q.limit == 5));

        assert_eq!(total_postings(&snapshots), 160);
        assert_eq!(most_active(&snapshots).unwrap().keyword, "engineer");
        assert!(most_active(&[]).is_none());
    }

    #[tokio::test]
    async fn test_recommend_caps_results() {
        let source = StubSource::default()
            .with("python", page(3, &["P1", "P2", "P3"]))
            .with("AI", page(3, &["A1", "A2", "A3"]))
            .with("rust", page(3, &["R1", "R2", "R3"]))
            .with("go", page(3, &["G1"]));
        let skills: Vec<String> = ["python", "AI", "rust", "go"].iter().map(|s| s.to_string()).collect();

        let recs = recommend(&source, &skills, 3, 3, 8).await;
        assert_eq!(recs.len(), 8);
        assert_eq!(recs[0].matching_skill, "python");
        assert_eq!(recs[3].title, "A1");
        assert_eq!(recs[0].locations, vec!["北京"]);
        assert!(recs.iter().all(|r| r.matching_skill != "go"));
        assert_eq!(source.call_count(), 3);
    }
}
