//! In-memory job source shared by adapter tests / 测试用内存数据源

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::client::JobSource;
use crate::models::{RawResponse, SearchQuery};

/// Answers by keyword; unknown keywords get an empty page
#[derive(Default)]
pub struct StubSource {
    pub responses: HashMap<String, Value>,
    pub calls: AtomicUsize,
    pub queries: Mutex<Vec<SearchQuery>>,
}

impl StubSource {
    pub fn with(mut self, keyword: &str, doc: Value) -> Self {
        self.responses.insert(keyword.to_string(), doc);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// A page with `count` total and one posting per title
pub fn page(count: u64, titles: &[&str]) -> Value {
    let list: Vec<Value> = titles
        .iter()
        .enumerate()
        .map(|(i, t)| json!({"id": format!("{}", i + 1), "title": t, "code": format!("C{}", i + 1),
                             "city_info": {"name": "北京"}}))
        .collect();
    json!({"code": 0, "data": {"count": count, "job_post_list": list}})
}

#[async_trait]
impl JobSource for StubSource {
    async fn search_raw(&self, query: &SearchQuery) -> RawResponse {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().push(query.clone());
        let doc = self
            .responses
            .get(&query.keyword)
            .cloned()
            .unwrap_or_else(|| json!({"code": 0, "data": {"count": 0, "job_post_list": []}}));
        RawResponse::from_value(&doc)
    }
}
