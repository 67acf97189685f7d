use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Opaque article identifier as stored by the blog backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArticleId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArticleId::Number(n) => write!(f, "{}", n),
            ArticleId::Text(s) => f.write_str(s),
        }
    }
}

/// Timestamp-like value exactly as it arrived (text or epoch millis)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Millis(i64),
    Text(String),
}

impl RawTimestamp {
    pub fn from_plain(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(RawTimestamp::Text(s.clone())),
            Value::Number(n) => n.as_i64().map(RawTimestamp::Millis),
            _ => None,
        }
    }
}

impl From<&str> for RawTimestamp {
    fn from(s: &str) -> Self {
        RawTimestamp::Text(s.to_string())
    }
}

/// Raw article as handed over by a source. Read-only input of the builder.
#[derive(Debug, Clone, Default)]
pub struct ArticleRecord {
    pub id: Option<ArticleId>,
    pub title: String,
    pub description: Option<String>,
    pub cover: Option<String>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub created_at: Option<RawTimestamp>,
    pub updated_at: Option<RawTimestamp>,
    /// Plain category values; only the first one survives normalization
    pub categories: Vec<Value>,
    /// Plain tag values
    pub tags: Vec<Value>,
    /// `None` when the association was not loaded at all
    pub comments: Option<Vec<Value>>,
}

/// Category or tag after normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Taxon {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ArticleId>,

    #[serde(default)]
    pub name: String,

    /// Any other fields of the plain object (slug, color, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Flattened article, owned plain data detached from its record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedArticle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ArticleId>,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Taxon>,
    pub tags: Vec<Taxon>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<RawTimestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<RawTimestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthBucket {
    pub month: u32,
    pub count: usize,
    pub articles: Vec<NormalizedArticle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearBucket {
    pub year: i32,
    pub count: usize,
    pub months: Vec<MonthBucket>,
}

/// Archive response body: `{ "years": [...], "total": n }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineResult {
    pub years: Vec<YearBucket>,
    /// Number of input records, including those left out of `years`
    pub total: usize,
}

impl TimelineResult {
    /// Articles that actually landed in a month bucket
    pub fn grouped_count(&self) -> usize {
        self.years.iter().map(|y| y.count).sum()
    }
}
