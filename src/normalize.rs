//! Result normalizer / 搜索结果规范化
//!
//! Pure transformation from a raw search response to an [`ApiOutcome`].
//! No I/O and no shared state, so it can be called from any number of
//! tasks at once and always gives the same output for the same input.

use serde_json::Value;

use crate::error::{MalformedKind, SearchError};
use crate::models::{ApiOutcome, NormalizedJobRecord, RawJobRecord, RawResponse, SearchResultSet};
use crate::utils::preview;

/// Public careers site, detail pages live under `/index/position/{id}/detail`
pub const SITE_ORIGIN: &str = "https://xiaomi.jobs.f.mioffice.cn";

pub const NOT_AVAILABLE: &str = "N/A";
pub const DEFAULT_API_ERROR: &str = "API error";

/// Preview bounds in characters / 预览长度上限（字符数）
pub const DESCRIPTION_PREVIEW_CHARS: usize = 150;
pub const REQUIREMENT_PREVIEW_CHARS: usize = 100;

/// Convert one raw response into an outcome / 规范化原始响应
pub fn normalize(raw: &RawResponse) -> ApiOutcome {
    if let Some(error) = raw.error.as_deref().filter(|e| !e.is_empty()) {
        return Err(SearchError::Transport(error.to_string()));
    }

    if let Some(code) = raw.code.filter(|c| *c != 0) {
        let message = raw
            .message
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_API_ERROR)
            .to_string();
        return Err(SearchError::Api { code, message });
    }

    let data = raw
        .data
        .as_ref()
        .ok_or(SearchError::MalformedResponse(MalformedKind::NoData))?;
    let job_posts = data
        .job_post_list
        .as_ref()
        .ok_or(SearchError::MalformedResponse(MalformedKind::NoJobList))?;

    let records: Vec<NormalizedJobRecord> = job_posts.iter().map(normalize_record).collect();
    let total_count = data.count.unwrap_or(records.len() as u64);

    Ok(SearchResultSet { total_count, records })
}

/// Same as [`normalize`] for an untyped JSON document
pub fn normalize_value(value: &Value) -> ApiOutcome {
    normalize(&RawResponse::from_value(value))
}

/// Apply the per-field default rules to one posting / 单条职位规范化
pub fn normalize_record(job: &RawJobRecord) -> NormalizedJobRecord {
    // id feeds the URL, so it defaults to "" rather than "N/A"
    let id = job.id.clone().unwrap_or_default();
    NormalizedJobRecord {
        detail_url: detail_url(&id),
        id,
        title: or_not_available(&job.title),
        code: or_not_available(&job.code),
        locations: extract_locations(job),
        recruit_type: or_not_available(&job.recruit_type),
        description_preview: preview(job.description.as_deref(), DESCRIPTION_PREVIEW_CHARS),
        requirement_preview: preview(job.requirement.as_deref(), REQUIREMENT_PREVIEW_CHARS),
    }
}

fn or_not_available(field: &Option<String>) -> String {
    field.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// `city_info` wins over `city_list`; neither gives an empty list
pub fn extract_locations(job: &RawJobRecord) -> Vec<String> {
    if let Some(city) = &job.city_info {
        return vec![city.display_name()];
    }
    match &job.city_list {
        Some(cities) => cities.iter().map(|c| c.display_name()).collect(),
        None => Vec::new(),
    }
}

/// Canonical posting page; an empty id still yields a well-formed URL
pub fn detail_url(id: &str) -> String {
    format!("{}/index/position/{}/detail", SITE_ORIGIN, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UNREADABLE_CODE;
    use serde_json::json;

    #[test]
    fn test_transport_error_short_circuits() {
        let raw = RawResponse::transport_error("Request Error: connection refused");
        assert_eq!(
            normalize(&raw),
            Err(SearchError::Transport("Request Error: connection refused".into()))
        );
    }

    #[test]
    fn test_api_error_uses_message() {
        let outcome = normalize_value(&json!({"code": 1001, "message": "portal closed", "data": {}}));
        assert_eq!(outcome, Err(SearchError::Api { code: 1001, message: "portal closed".into() }));

        let outcome = normalize_value(&json!({"code": 5}));
        assert_eq!(outcome.unwrap_err().to_string(), "API error");
    }

    #[test]
    fn test_non_integer_code_is_api_error() {
        for code in [json!("E1001"), json!(0.5), json!(true)] {
            let outcome = normalize_value(&json!({"code": code, "message": "bad", "data": {"job_post_list": []}}));
            assert_eq!(outcome, Err(SearchError::Api { code: UNREADABLE_CODE, message: "bad".into() }));
        }

        let set = normalize_value(&json!({"code": "0", "data": {"job_post_list": []}})).unwrap();
        assert!(set.records.is_empty());
        let set = normalize_value(&json!({"code": null, "data": {"job_post_list": []}})).unwrap();
        assert!(set.records.is_empty());
    }

    #[test]
    fn test_empty_error_and_message_count_as_absent() {
        let set = normalize_value(&json!({"error": "", "code": 0, "data": {"job_post_list": []}})).unwrap();
        assert_eq!(set.total_count, 0);

        let outcome = normalize_value(&json!({"code": 7, "message": ""}));
        assert_eq!(outcome, Err(SearchError::Api { code: 7, message: DEFAULT_API_ERROR.into() }));
    }

    #[test]
    fn test_missing_sections_are_distinct() {
        assert_eq!(
            normalize_value(&json!({"code": 0})),
            Err(SearchError::MalformedResponse(MalformedKind::NoData))
        );
        assert_eq!(
            normalize_value(&json!({"code": 0, "data": {"count": 3}})),
            Err(SearchError::MalformedResponse(MalformedKind::NoJobList))
        );
        assert_eq!(
            normalize_value(&json!("not even an object")),
            Err(SearchError::MalformedResponse(MalformedKind::NoData))
        );
    }

    #[test]
    fn test_end_to_end_record() {
        let doc = json!({
            "code": 0,
            "data": {
                "count": 1,
                "job_post_list": [{
                    "id": "9",
                    "title": "Engineer",
                    "city_info": {"name": "Shenzhen"},
                    "description": "A".repeat(200)
                }]
            }
        });
        let set = normalize_value(&doc).unwrap();
        assert_eq!(set.total_count, 1);
        assert_eq!(set.records.len(), 1);
        let job = &set.records[0];
        assert_eq!(job.description_preview.chars().count(), 153);
        assert!(job.description_preview.ends_with("..."));
        assert_eq!(job.locations, vec!["Shenzhen"]);
        assert_eq!(job.code, NOT_AVAILABLE);
        assert_eq!(job.recruit_type, NOT_AVAILABLE);
        assert_eq!(job.requirement_preview, "");
        assert_eq!(job.detail_url, "https://xiaomi.jobs.f.mioffice.cn/index/position/9/detail");
    }

    #[test]
    fn test_empty_list_is_success() {
        let set = normalize_value(&json!({"code": 0, "data": {"job_post_list": []}})).unwrap();
        assert_eq!(set.total_count, 0);
        assert!(set.records.is_empty());

        let set = normalize_value(&json!({"code": 0, "data": {"count": 57, "job_post_list": []}})).unwrap();
        assert_eq!(set.total_count, 57);
    }

    #[test]
    fn test_count_falls_back_to_records() {
        let set = normalize_value(&json!({
            "code": 0,
            "data": {"job_post_list": [{"id": "1"}, {"id": "2"}]}
        }))
        .unwrap();
        assert_eq!(set.total_count, 2);
        assert_eq!(set.records[1].id, "2");
    }

    #[test]
    fn test_unusable_count_falls_back_to_records() {
        let doc = |count: Value| json!({"code": 0, "data": {"count": count, "job_post_list": [{"id": "1"}]}});
        assert_eq!(normalize_value(&doc(json!(-5))).unwrap().total_count, 1);
        assert_eq!(normalize_value(&doc(json!(1.5))).unwrap().total_count, 1);
        assert_eq!(normalize_value(&doc(json!(12.0))).unwrap().total_count, 12);
    }

    #[test]
    fn test_location_extraction() {
        let job: RawJobRecord = serde_json::from_value(json!({"city_info": {"name": "Beijing"}})).unwrap();
        assert_eq!(extract_locations(&job), vec!["Beijing"]);

        let job: RawJobRecord =
            serde_json::from_value(json!({"city_list": [{"name": "A"}, {"name": "B"}]})).unwrap();
        assert_eq!(extract_locations(&job), vec!["A", "B"]);

        let job: RawJobRecord = serde_json::from_value(json!({"city_list": ["Wuhan", {"name": "Nanjing"}]})).unwrap();
        assert_eq!(extract_locations(&job), vec!["Wuhan", "Nanjing"]);

        let job: RawJobRecord = serde_json::from_value(json!({
            "city_info": "Shanghai",
            "city_list": [{"name": "ignored"}]
        }))
        .unwrap();
        assert_eq!(extract_locations(&job), vec!["Shanghai"]);

        // Empty city_info falls through to city_list
        let job: RawJobRecord = serde_json::from_value(json!({
            "city_info": {},
            "city_list": [{"name": "Chengdu"}]
        }))
        .unwrap();
        assert_eq!(extract_locations(&job), vec!["Chengdu"]);

        let job = RawJobRecord::default();
        assert!(extract_locations(&job).is_empty());
    }

    #[test]
    fn test_missing_id_keeps_url_shape() {
        let record = normalize_record(&RawJobRecord::default());
        assert_eq!(record.id, "");
        assert_eq!(record.title, NOT_AVAILABLE);
        assert_eq!(record.detail_url, "https://xiaomi.jobs.f.mioffice.cn/index/position//detail");
        assert_eq!(detail_url("12345"), "https://xiaomi.jobs.f.mioffice.cn/index/position/12345/detail");
    }

    #[test]
    fn test_requirement_preview_collapses_newlines() {
        let job: RawJobRecord = serde_json::from_value(json!({
            "requirement": format!("1. Rust\r\n2. {}", "B".repeat(120))
        }))
        .unwrap();
        let record = normalize_record(&job);
        assert!(!record.requirement_preview.contains('\n'));
        assert!(!record.requirement_preview.contains('\r'));
        assert!(record.requirement_preview.starts_with("1. Rust  2. "));
        assert_eq!(record.requirement_preview.chars().count(), 103);
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let doc = json!({
            "code": 0,
            "data": {"count": 2, "job_post_list": [
                {"id": "1", "title": "软件工程师", "city_list": [{"name": "北京"}], "requirement": "熟悉\nRust"},
                {"title": "Designer"}
            ]}
        });
        assert_eq!(normalize_value(&doc), normalize_value(&doc));
    }
}
