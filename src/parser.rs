use serde::Deserialize;
use serde_json::{json, Value};
use std::borrow::Cow;
use std::fs;
use std::path::Path;

use crate::normalize::ToPlain;
use crate::source::SourceError;
use crate::types::{ArticleId, ArticleRecord, RawTimestamp};

#[derive(Debug, Clone, Deserialize)]
pub struct Frontmatter {
    #[serde(default)]
    pub title: String,
    /// Kept raw; a bad date is the archive's problem, not the parser's
    #[serde(default)]
    pub date: Option<RawTimestamp>,
    #[serde(default)]
    pub updated: Option<RawTimestamp>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub draft: bool,
}

#[derive(Debug, Clone)]
pub struct MarkdownPost {
    pub slug: String,
    pub frontmatter: Frontmatter,
}

impl ToPlain for MarkdownPost {
    fn to_plain(&self) -> Cow<'_, ArticleRecord> {
        let fm = &self.frontmatter;

        Cow::Owned(ArticleRecord {
            id: Some(ArticleId::Text(self.slug.clone())),
            title: fm.title.clone(),
            description: fm.description.clone(),
            cover: fm.cover.clone(),
            view_count: None,
            like_count: None,
            created_at: fm.date.clone(),
            updated_at: fm.updated.clone(),
            categories: fm
                .category
                .iter()
                .map(|c| json!({ "name": c, "slug": c }))
                .collect(),
            tags: fm.tags.iter().cloned().map(Value::String).collect(),
            comments: None,
        })
    }
}

pub struct Parser;

impl Parser {
    /// Parse a markdown file's frontmatter; the body is not needed for the archive
    pub fn parse_file(path: &Path) -> Result<MarkdownPost, SourceError> {
        let content = fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let frontmatter_error = |message: String| SourceError::Frontmatter {
            path: path.to_path_buf(),
            message,
        };

        let (frontmatter_str, _body) = Self::split_frontmatter(&content).ok_or_else(|| {
            frontmatter_error("expected ---\\nfrontmatter\\n---\\ncontent".to_string())
        })?;
        let frontmatter: Frontmatter =
            serde_yaml::from_str(frontmatter_str).map_err(|e| frontmatter_error(e.to_string()))?;
        let slug = Self::path_to_slug(path)
            .ok_or_else(|| frontmatter_error("file name is not valid UTF-8".to_string()))?;

        Ok(MarkdownPost { slug, frontmatter })
    }

    /// Split content into frontmatter and markdown
    /// Expected format:
    /// ---
    /// frontmatter here
    /// ---
    /// markdown here
    fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
        let parts: Vec<&str> = content.trim_start().splitn(3, "---").collect();

        if parts.len() < 3 || !parts[0].is_empty() {
            return None;
        }

        Some((parts[1].trim(), parts[2].trim()))
    }

    /// content/posts/dev/my-post.md -> my-post
    fn path_to_slug(path: &Path) -> Option<String> {
        path.file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string())
    }
}
