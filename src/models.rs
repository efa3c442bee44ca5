//! Search request and response data model / 搜索请求与响应数据模型
//!
//! Raw types mirror the upstream JSON with every field optional. Their
//! deserializers never fail on an unexpected shape: a field of the wrong
//! type degrades to "absent" so that one odd record cannot sink a whole page.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::SearchError;

/// Constant discriminators sent with every search / 每次搜索附带的固定参数
pub const PORTAL_TYPE: i64 = 6;
pub const PORTAL_ENTRANCE: i64 = 1;

pub const DEFAULT_LIMIT: u32 = 10;

/// Stand-in for a present `code` that is not an integer
pub const UNREADABLE_CODE: i64 = -1;

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

/// One search request / 搜索条件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub keyword: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub job_category_id_list: Vec<String>,
    #[serde(default)]
    pub tag_id_list: Vec<String>,
    #[serde(default)]
    pub location_code_list: Vec<String>,
    #[serde(default)]
    pub subject_id_list: Vec<String>,
    #[serde(default)]
    pub recruitment_id_list: Vec<String>,
    #[serde(default)]
    pub job_function_id_list: Vec<String>,
    #[serde(default)]
    pub storefront_id_list: Vec<String>,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            keyword: String::new(),
            limit: DEFAULT_LIMIT,
            offset: 0,
            job_category_id_list: Vec::new(),
            tag_id_list: Vec::new(),
            location_code_list: Vec::new(),
            subject_id_list: Vec::new(),
            recruitment_id_list: Vec::new(),
            job_function_id_list: Vec::new(),
            storefront_id_list: Vec::new(),
        }
    }
}

impl SearchQuery {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            ..Self::default()
        }
    }

    /// Limit is clamped to at least 1 / 至少返回1条
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Location codes such as `CN_110000` (Beijing) / 地点编码
    pub fn with_locations<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.location_code_list = codes.into_iter().map(Into::into).collect();
        self
    }
}

/// JSON body of the upstream POST / 上游请求体
#[derive(Debug, Serialize)]
pub struct SearchPayload<'a> {
    pub keyword: &'a str,
    pub limit: u32,
    pub offset: u32,
    pub job_category_id_list: &'a [String],
    pub tag_id_list: &'a [String],
    pub location_code_list: &'a [String],
    pub subject_id_list: &'a [String],
    pub recruitment_id_list: &'a [String],
    pub portal_type: i64,
    pub job_function_id_list: &'a [String],
    pub storefront_id_list: &'a [String],
    pub portal_entrance: i64,
}

impl<'a> From<&'a SearchQuery> for SearchPayload<'a> {
    fn from(query: &'a SearchQuery) -> Self {
        Self {
            keyword: &query.keyword,
            limit: query.limit,
            offset: query.offset,
            job_category_id_list: &query.job_category_id_list,
            tag_id_list: &query.tag_id_list,
            location_code_list: &query.location_code_list,
            subject_id_list: &query.subject_id_list,
            recruitment_id_list: &query.recruitment_id_list,
            portal_type: PORTAL_TYPE,
            job_function_id_list: &query.job_function_id_list,
            storefront_id_list: &query.storefront_id_list,
            portal_entrance: PORTAL_ENTRANCE,
        }
    }
}

// ============ Raw response ============

/// Response envelope as handed over by the transport / 原始响应
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawResponse {
    /// Set by the transport caller when the request itself failed
    #[serde(default, deserialize_with = "lenient::text")]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "lenient::status_code")]
    pub code: Option<i64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient::object")]
    pub data: Option<RawData>,
}

impl RawResponse {
    /// Wrap a transport failure / 传输层错误
    pub fn transport_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Read any JSON document; non-object roots carry nothing usable
    pub fn from_value(value: &Value) -> Self {
        RawResponse::deserialize(value).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawData {
    #[serde(default, deserialize_with = "lenient::count")]
    pub count: Option<u64>,
    #[serde(default, deserialize_with = "lenient::records")]
    pub job_post_list: Option<Vec<RawJobRecord>>,
}

/// One posting exactly as upstream sent it / 原始职位
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJobRecord {
    #[serde(default, deserialize_with = "lenient::text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub requirement: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub recruit_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::location")]
    pub city_info: Option<RawLocation>,
    #[serde(default, deserialize_with = "lenient::locations")]
    pub city_list: Option<Vec<RawLocation>>,
}

/// A location is either a bare name or an object with a `name` / 地点
#[derive(Debug, Clone, PartialEq)]
pub enum RawLocation {
    Text(String),
    Structured(Map<String, Value>),
    Other(Value),
}

impl RawLocation {
    /// `None` for null and empty values, which count as absent
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(RawLocation::Text(s)),
            Value::Object(map) if map.is_empty() => None,
            Value::Object(map) => Some(RawLocation::Structured(map)),
            other => Some(RawLocation::Other(other)),
        }
    }

    /// The `name` field, else the compact JSON form of the value
    pub fn display_name(&self) -> String {
        match self {
            RawLocation::Text(s) => s.clone(),
            RawLocation::Structured(map) => match map.get("name") {
                Some(Value::String(name)) => name.clone(),
                Some(other) if !other.is_null() => other.to_string(),
                _ => Value::Object(map.clone()).to_string(),
            },
            RawLocation::Other(value) => value.to_string(),
        }
    }
}

// ============ Normalized output ============

/// Display-ready posting / 规范化后的职位
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedJobRecord {
    pub id: String,
    pub title: String,
    pub code: String,
    pub locations: Vec<String>,
    pub recruit_type: String,
    #[serde(rename = "url")]
    pub detail_url: String,
    #[serde(rename = "description")]
    pub description_preview: String,
    #[serde(rename = "requirements")]
    pub requirement_preview: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResultSet {
    pub total_count: u64,
    pub records: Vec<NormalizedJobRecord>,
}

/// Result of one search / 单次搜索结果
pub type ApiOutcome = Result<SearchResultSet, SearchError>;

mod lenient {
    //! Field decoders that map unexpected shapes to `None`.

    use super::{RawData, RawJobRecord, RawLocation, UNREADABLE_CODE};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Strings pass through, scalars are stringified, objects use their `name`
    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(value_text(Value::deserialize(d)?))
    }

    pub(super) fn value_text(value: Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Object(map) => match map.get("name") {
                Some(Value::String(name)) => Some(name.clone()),
                _ => Some(Value::Object(map).to_string()),
            },
            other @ Value::Array(_) => Some(other.to_string()),
        }
    }

    /// Whole-valued floats such as `12.0` within `i64` range
    fn integral(f: f64) -> Option<i64> {
        if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e18 {
            Some(f as i64)
        } else {
            None
        }
    }

    /// Only `null` is absent; any other value that is not an integer
    /// becomes [`UNREADABLE_CODE`] so it can never pass as success
    pub fn status_code<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Null => None,
            Value::Number(n) => Some(n.as_i64().or_else(|| n.as_f64().and_then(integral)).unwrap_or(UNREADABLE_CODE)),
            Value::String(s) => Some(s.trim().parse().unwrap_or(UNREADABLE_CODE)),
            _ => Some(UNREADABLE_CODE),
        })
    }

    /// Negative or fractional counts are unusable
    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().and_then(integral).and_then(|i| u64::try_from(i).ok())),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn object<'de, D: Deserializer<'de>>(d: D) -> Result<Option<RawData>, D::Error> {
        Ok(match Value::deserialize(d)? {
            value @ Value::Object(_) => RawData::deserialize(value).ok(),
            _ => None,
        })
    }

    /// Non-object entries keep their slot as an all-absent record
    pub fn records<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<RawJobRecord>>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => Some(
                items
                    .into_iter()
                    .map(|item| RawJobRecord::deserialize(item).unwrap_or_default())
                    .collect(),
            ),
            _ => None,
        })
    }

    pub fn location<'de, D: Deserializer<'de>>(d: D) -> Result<Option<RawLocation>, D::Error> {
        Ok(RawLocation::from_value(Value::deserialize(d)?))
    }

    /// Empty or non-array lists count as absent
    pub fn locations<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<RawLocation>>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) if !items.is_empty() => {
                Some(items.into_iter().filter_map(RawLocation::from_value).collect())
            }
            _ => None,
        })
    }
}

/// Deserialize helper for adapters receiving loosely typed string lists
pub fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items.into_iter().filter_map(lenient::value_text).collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_carries_discriminators() {
        let query = SearchQuery::new("软件").with_locations(["CN_440300"]).with_limit(0);
        let body = serde_json::to_value(SearchPayload::from(&query)).unwrap();
        assert_eq!(body["keyword"], "软件");
        assert_eq!(body["limit"], 1);
        assert_eq!(body["offset"], 0);
        assert_eq!(body["location_code_list"], json!(["CN_440300"]));
        assert_eq!(body["tag_id_list"], json!([]));
        assert_eq!(body["portal_type"], 6);
        assert_eq!(body["portal_entrance"], 1);
    }

    #[test]
    fn test_query_defaults_from_json() {
        let query: SearchQuery = serde_json::from_value(json!({"keyword": "AI"})).unwrap();
        assert_eq!(query.limit, DEFAULT_LIMIT);
        assert_eq!(query.offset, 0);
        assert!(query.storefront_id_list.is_empty());
    }

    #[test]
    fn test_wrong_shapes_degrade_to_absent() {
        let raw = RawResponse::from_value(&json!({
            "code": "0",
            "data": {
                "count": "not a number",
                "job_post_list": [
                    {"id": 42, "title": null, "recruit_type": {"name": "社招"}, "city_list": "Beijing"},
                    "garbage"
                ]
            }
        }));
        assert_eq!(raw.code, Some(0));
        let data = raw.data.unwrap();
        assert_eq!(data.count, None);
        let list = data.job_post_list.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id.as_deref(), Some("42"));
        assert_eq!(list[0].title, None);
        assert_eq!(list[0].recruit_type.as_deref(), Some("社招"));
        assert!(list[0].city_list.is_none());
        assert!(list[1].id.is_none());
    }

    #[test]
    fn test_status_code_decoding() {
        let code = |v: Value| RawResponse::from_value(&json!({"code": v})).code;
        assert_eq!(code(json!(0)), Some(0));
        assert_eq!(code(json!(" 0 ")), Some(0));
        assert_eq!(code(json!(0.0)), Some(0));
        assert_eq!(code(json!(1001)), Some(1001));
        assert_eq!(code(json!("E1001")), Some(UNREADABLE_CODE));
        assert_eq!(code(json!(0.5)), Some(UNREADABLE_CODE));
        assert_eq!(code(json!(true)), Some(UNREADABLE_CODE));
        assert_eq!(code(json!({"v": 0})), Some(UNREADABLE_CODE));
        assert_eq!(code(Value::Null), None);
        assert_eq!(RawResponse::from_value(&json!({})).code, None);
    }

    #[test]
    fn test_count_decoding() {
        let count = |v: Value| RawData::deserialize(json!({"count": v})).unwrap().count;
        assert_eq!(count(json!(12)), Some(12));
        assert_eq!(count(json!(12.0)), Some(12));
        assert_eq!(count(json!("12")), Some(12));
        assert_eq!(count(json!(-3)), None);
        assert_eq!(count(json!(-3.0)), None);
        assert_eq!(count(json!(2.5)), None);
    }

    #[test]
    fn test_non_object_root_is_empty() {
        let raw = RawResponse::from_value(&json!([1, 2, 3]));
        assert!(raw.error.is_none());
        assert!(raw.data.is_none());
    }

    #[test]
    fn test_location_display_name() {
        let named = RawLocation::from_value(json!({"name": "Beijing", "code": "CN_110000"})).unwrap();
        assert_eq!(named.display_name(), "Beijing");
        let unnamed = RawLocation::from_value(json!({"code": "CN_110000"})).unwrap();
        assert_eq!(unnamed.display_name(), r#"{"code":"CN_110000"}"#);
        assert_eq!(RawLocation::from_value(json!("Wuhan")).unwrap().display_name(), "Wuhan");
        assert!(RawLocation::from_value(json!("")).is_none());
        assert!(RawLocation::from_value(json!({})).is_none());
        assert!(RawLocation::from_value(Value::Null).is_none());
    }

    #[test]
    fn test_string_list_accepts_csv_and_arrays() {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(deserialize_with = "string_list")]
            codes: Vec<String>,
        }
        let w: Wrapper = serde_json::from_value(json!({"codes": "CN_110000, CN_440300"})).unwrap();
        assert_eq!(w.codes, vec!["CN_110000", "CN_440300"]);
        let w: Wrapper = serde_json::from_value(json!({"codes": ["CN_310000"]})).unwrap();
        assert_eq!(w.codes, vec!["CN_310000"]);
        let w: Wrapper = serde_json::from_value(json!({"codes": null})).unwrap();
        assert!(w.codes.is_empty());
    }
}
