//! Instruction classification / 指令意图识别

/// What a task instruction asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskIntent {
    JobSearch,
    MarketAnalysis,
    Recommendations,
    General,
}

impl TaskIntent {
    /// Case-insensitive; the first matching rule wins
    pub fn classify(instruction: &str) -> Self {
        let lower = instruction.to_lowercase();
        if lower.contains("search") || lower.contains("find jobs") {
            TaskIntent::JobSearch
        } else if lower.contains("analyze") || lower.contains("market") {
            TaskIntent::MarketAnalysis
        } else if lower.contains("recommend") || lower.contains("suggest") {
            TaskIntent::Recommendations
        } else {
            TaskIntent::General
        }
    }
}

const KEYWORD_MARKERS: [&str; 3] = ["for", "about", "in"];

/// The lowercased word after the first `for`, `about` or `in`; empty if none
pub fn extract_keyword(instruction: &str) -> String {
    let lower = instruction.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();
    words
        .iter()
        .position(|w| KEYWORD_MARKERS.contains(w))
        .and_then(|i| words.get(i + 1))
        .map(|w| w.to_string())
        .unwrap_or_default()
}
