//! Plain-text rendering of search outcomes / 搜索结果文本格式化
//!
//! Used by the console `search` command and by the tool-protocol server.

use crate::error::SearchError;
use crate::models::{ApiOutcome, NormalizedJobRecord, SearchResultSet};
use crate::normalize::NOT_AVAILABLE;

const RULE_WIDTH: usize = 80;

pub fn render_outcome(outcome: &ApiOutcome) -> String {
    match outcome {
        Ok(set) => render_result_set(set),
        Err(err) => render_error(err),
    }
}

pub fn render_error(err: &SearchError) -> String {
    match err {
        SearchError::Transport(msg) => format!("❌ Error: {}", msg),
        SearchError::Api { message, .. } => format!("❌ API Error: {}", message),
        SearchError::MalformedResponse(kind) => {
            format!("❌ No job data found in response ({})", kind.reason())
        }
    }
}

/// Emoji-free failure text for JSON consumers
pub fn describe_error(err: &SearchError) -> String {
    match err {
        SearchError::MalformedResponse(kind) => {
            format!("No job data found in response ({})", kind.reason())
        }
        other => other.to_string(),
    }
}

pub fn render_result_set(set: &SearchResultSet) -> String {
    if set.records.is_empty() {
        return format!("📭 No job postings found (Total: {})", set.total_count);
    }

    let mut blocks = Vec::with_capacity(set.records.len() + 1);
    blocks.push(format!(
        "📋 Found {} job(s), showing {} results\n{}",
        set.total_count,
        set.records.len(),
        "=".repeat(RULE_WIDTH)
    ));
    for (i, job) in set.records.iter().enumerate() {
        blocks.push(render_record(i + 1, job));
    }
    blocks.join("\n\n")
}

/// One numbered posting block / 单个职位
pub fn render_record(index: usize, job: &NormalizedJobRecord) -> String {
    let locations = if job.locations.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        job.locations.join(", ")
    };

    let mut lines = vec![
        format!("{}. {}", index, job.title),
        format!("   🆔 Job Code: {}", job.code),
        format!("   📍 Location: {}", locations),
        format!("   💼 Type: {}", job.recruit_type),
        format!("   🔗 URL: {}", job.detail_url),
    ];
    if !job.description_preview.is_empty() {
        lines.push(format!("   📝 Description: {}", job.description_preview));
    }
    if !job.requirement_preview.is_empty() {
        lines.push(format!("   📋 Requirements: {}", job.requirement_preview));
    }
    lines.join("\n")
}
