use serde_json::{Map, Value};
use std::borrow::Cow;

use crate::types::{ArticleId, ArticleRecord, NormalizedArticle, RawTimestamp, Taxon};

/// Anything that can hand out its plain article data.
///
/// Rich source types convert themselves; already-plain records are
/// borrowed as-is. Normalization only ever goes through this trait.
pub trait ToPlain {
    fn to_plain(&self) -> Cow<'_, ArticleRecord>;
}

impl ToPlain for ArticleRecord {
    fn to_plain(&self) -> Cow<'_, ArticleRecord> {
        Cow::Borrowed(self)
    }
}

impl<T: ToPlain + ?Sized> ToPlain for &T {
    fn to_plain(&self) -> Cow<'_, ArticleRecord> {
        (**self).to_plain()
    }
}

/// Loosely-typed plain data, e.g. one element of a database JSON export.
/// Non-object values become an all-default record.
impl ToPlain for Value {
    fn to_plain(&self) -> Cow<'_, ArticleRecord> {
        Cow::Owned(ArticleRecord::from_json(self))
    }
}

impl ArticleRecord {
    /// Lenient field-by-field conversion. Wrongly typed fields are treated
    /// as absent instead of rejecting the whole record.
    pub fn from_json(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        Self {
            id: obj.get("id").and_then(article_id),
            title: text(obj, "title").unwrap_or_default(),
            description: text(obj, "description"),
            cover: text(obj, "cover"),
            view_count: obj.get("viewCount").and_then(Value::as_u64),
            like_count: obj.get("likeCount").and_then(Value::as_u64),
            created_at: obj.get("createdAt").and_then(RawTimestamp::from_plain),
            updated_at: obj.get("updatedAt").and_then(RawTimestamp::from_plain),
            categories: array(obj, "categories").unwrap_or_default(),
            tags: array(obj, "tags").unwrap_or_default(),
            comments: array(obj, "comments"),
        }
    }
}

impl Taxon {
    /// Objects and bare strings are taxa; everything else is nothing.
    pub fn from_plain(value: &Value) -> Option<Self> {
        match value {
            Value::Object(obj) => {
                let mut extra = obj.clone();
                let id = extra.remove("id").as_ref().and_then(article_id);
                let name = match extra.remove("name") {
                    Some(Value::String(s)) => s,
                    _ => String::new(),
                };
                Some(Self { id, name, extra })
            }
            Value::String(name) => Some(Self {
                id: None,
                name: name.clone(),
                extra: Map::new(),
            }),
            _ => None,
        }
    }
}

/// Flatten one record into a detached `NormalizedArticle`
pub fn normalize_article<A: ToPlain + ?Sized>(article: &A) -> NormalizedArticle {
    let record = article.to_plain();

    NormalizedArticle {
        id: record.id.clone(),
        title: record.title.clone(),
        description: record.description.clone().unwrap_or_default(),
        cover: record.cover.clone(),
        view_count: record.view_count.unwrap_or(0),
        like_count: record.like_count.unwrap_or(0),
        comment_count: record.comments.as_ref().map_or(0, Vec::len),
        category: record.categories.first().and_then(Taxon::from_plain),
        tags: record.tags.iter().filter_map(Taxon::from_plain).collect(),
        created_at: record.created_at.clone(),
        updated_at: record.updated_at.clone(),
    }
}

fn article_id(value: &Value) -> Option<ArticleId> {
    match value {
        Value::Number(n) => n.as_i64().map(ArticleId::Number),
        Value::String(s) => Some(ArticleId::Text(s.clone())),
        _ => None,
    }
}

fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn array(obj: &Map<String, Value>, key: &str) -> Option<Vec<Value>> {
    obj.get(key).and_then(Value::as_array).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_fields_default() {
        let raw = json!({ "id": 7, "title": "Bare", "createdAt": "2024-01-02" });
        let article = normalize_article(&raw);

        assert_eq!(article.id, Some(ArticleId::Number(7)));
        assert_eq!(article.view_count, 0);
        assert_eq!(article.like_count, 0);
        assert_eq!(article.description, "");
        assert_eq!(article.comment_count, 0);
        assert!(article.cover.is_none());
        assert!(article.category.is_none());
        assert!(article.tags.is_empty());
    }

    #[test]
    fn test_null_counters_default_to_zero() {
        let raw = json!({ "viewCount": null, "likeCount": null, "description": null });
        let article = normalize_article(&raw);

        assert_eq!(article.view_count, 0);
        assert_eq!(article.like_count, 0);
        assert_eq!(article.description, "");
    }

    #[test]
    fn test_first_category_only() {
        let raw = json!({
            "categories": [
                { "id": 1, "name": "Rust", "slug": "rust" },
                { "id": 2, "name": "Go" }
            ]
        });
        let article = normalize_article(&raw);

        let category = article.category.unwrap();
        assert_eq!(category.id, Some(ArticleId::Number(1)));
        assert_eq!(category.name, "Rust");
        assert_eq!(category.extra.get("slug"), Some(&json!("rust")));
    }

    #[test]
    fn test_tags_drop_nothing_values() {
        let raw = json!({
            "tags": [{ "id": 3, "name": "async" }, null, "plain", 42, false]
        });
        let article = normalize_article(&raw);

        let names: Vec<_> = article.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["async", "plain"]);
    }

    #[test]
    fn test_comment_count() {
        let raw = json!({ "comments": [{ "id": 1 }, { "id": 2 }, { "id": 3 }] });
        assert_eq!(normalize_article(&raw).comment_count, 3);

        let not_a_list = json!({ "comments": "three" });
        assert_eq!(normalize_article(&not_a_list).comment_count, 0);
    }

    #[test]
    fn test_non_object_record() {
        let article = normalize_article(&json!("not an article"));
        assert_eq!(article.title, "");
        assert!(article.created_at.is_none());
    }

    #[test]
    fn test_plain_record_is_borrowed() {
        let record = ArticleRecord {
            title: "Typed".to_string(),
            ..Default::default()
        };
        assert!(matches!(record.to_plain(), Cow::Borrowed(_)));
        assert_eq!(normalize_article(&record).title, "Typed");
    }

    #[test]
    fn test_timestamps_pass_through() {
        let raw = json!({ "createdAt": 1714521600000i64, "updatedAt": "2024-05-02" });
        let article = normalize_article(&raw);

        assert_eq!(article.created_at, Some(RawTimestamp::Millis(1714521600000)));
        assert_eq!(article.updated_at, Some(RawTimestamp::from("2024-05-02")));
    }
}
