//! Search error taxonomy / 搜索错误分类
//!
//! Every failure of one search is reported as a value, never as a panic.
//! The three classes stay distinct so callers can react differently:
//! retry on transport errors, show the API message to users, log
//! malformed responses as contract violations.

use thiserror::Error;

/// Which part of the response envelope was missing / 响应缺失的部分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedKind {
    /// No `data` object / 缺少 data
    NoData,
    /// `data` present without `job_post_list` / 缺少 job_post_list
    NoJobList,
}

impl MalformedKind {
    pub fn reason(&self) -> &'static str {
        match self {
            MalformedKind::NoData => "no data",
            MalformedKind::NoJobList => "no job list",
        }
    }
}

/// Failure side of an `ApiOutcome` / 搜索失败原因
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// Network, timeout, HTTP status or body decoding failure, surfaced verbatim
    #[error("{0}")]
    Transport(String),
    /// Upstream returned a non-zero `code`
    #[error("{message}")]
    Api { code: i64, message: String },
    /// Envelope present but missing the expected sections
    #[error("{}", .0.reason())]
    MalformedResponse(MalformedKind),
}

impl SearchError {
    /// Short machine-friendly class name / 错误类别名
    pub fn kind(&self) -> &'static str {
        match self {
            SearchError::Transport(_) => "transport_error",
            SearchError::Api { .. } => "api_error",
            SearchError::MalformedResponse(_) => "malformed_response",
        }
    }

    /// Only transport failures are worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, SearchError::Transport(_))
    }
}
