use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use crate::normalize::ToPlain;
use crate::parser::{MarkdownPost, Parser};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk {}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("invalid JSON in {}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid frontmatter in {}: {message}", path.display())]
    Frontmatter { path: PathBuf, message: String },
}

/// Where published articles come from
pub trait ArticleSource {
    type Record: ToPlain;

    fn name(&self) -> &str;

    /// File or directory the records are read from
    fn location(&self) -> &Path;

    fn fetch_published(&self) -> Result<Vec<Self::Record>, SourceError>;
}

/// JSON export of the articles table, one object per article with its
/// category, tag and comment associations inlined.
pub struct JsonExportSource {
    path: PathBuf,
}

impl JsonExportSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ArticleSource for JsonExportSource {
    type Record = Value;

    fn name(&self) -> &str {
        "json"
    }

    fn location(&self) -> &Path {
        &self.path
    }

    fn fetch_published(&self) -> Result<Vec<Value>, SourceError> {
        let content = fs::read_to_string(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;

        let payload: Value = serde_json::from_str(&content).map_err(|source| SourceError::Json {
            path: self.path.clone(),
            source,
        })?;

        match payload {
            Value::Array(items) => Ok(items),
            Value::Object(mut obj) => match obj.remove("articles") {
                Some(Value::Array(items)) => Ok(items),
                _ => {
                    tracing::warn!(path = %self.path.display(), "export has no articles array");
                    Ok(Vec::new())
                }
            },
            _ => {
                tracing::warn!(path = %self.path.display(), "export is not a list of articles");
                Ok(Vec::new())
            }
        }
    }
}

/// Directory of Markdown posts with YAML frontmatter. Drafts are not
/// published and never reach the archive.
pub struct MarkdownDirSource {
    root: PathBuf,
}

impl MarkdownDirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ArticleSource for MarkdownDirSource {
    type Record = MarkdownPost;

    fn name(&self) -> &str {
        "markdown"
    }

    fn location(&self) -> &Path {
        &self.root
    }

    fn fetch_published(&self) -> Result<Vec<MarkdownPost>, SourceError> {
        let mut posts = Vec::new();

        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|source| SourceError::Walk {
                path: self.root.clone(),
                source,
            })?;

            let path = entry.path();
            let is_markdown = path
                .extension()
                .map_or(false, |ext| ext == "md" || ext == "markdown");
            if !entry.file_type().is_file() || !is_markdown {
                continue;
            }

            let post = Parser::parse_file(path)?;
            if post.frontmatter.draft {
                tracing::debug!(slug = %post.slug, "skipping draft");
                continue;
            }

            posts.push(post);
        }

        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_json_array_export() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("articles.json");
        fs::write(&path, r#"[{"id": 1}, {"id": 2}]"#).unwrap();

        let records = JsonExportSource::new(&path).fetch_published().unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_json_wrapped_export() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("articles.json");
        fs::write(&path, r#"{"articles": [{"id": 1}]}"#).unwrap();

        let records = JsonExportSource::new(&path).fetch_published().unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_json_non_list_is_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("articles.json");
        fs::write(&path, r#"{"data": 1}"#).unwrap();

        let records = JsonExportSource::new(&path).fetch_published().unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_json_errors() {
        let temp = TempDir::new().unwrap();

        let missing = JsonExportSource::new(temp.path().join("nope.json"));
        assert!(matches!(missing.fetch_published(), Err(SourceError::Io { .. })));

        let path = temp.path().join("broken.json");
        fs::write(&path, "[{").unwrap();
        let broken = JsonExportSource::new(&path);
        assert!(matches!(broken.fetch_published(), Err(SourceError::Json { .. })));
    }

    #[test]
    fn test_markdown_dir_skips_drafts_and_other_files() {
        let temp = TempDir::new().unwrap();
        let dev = temp.path().join("dev");
        fs::create_dir(&dev).unwrap();

        fs::write(
            dev.join("hello.md"),
            "---\ntitle: Hello\ndate: 2024-05-01\ntags: [rust]\n---\nBody",
        )
        .unwrap();
        fs::write(
            dev.join("wip.md"),
            "---\ntitle: WIP\ndate: 2024-05-02\ndraft: true\n---\nBody",
        )
        .unwrap();
        fs::write(dev.join("notes.txt"), "not a post").unwrap();

        let posts = MarkdownDirSource::new(temp.path()).fetch_published().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].slug, "hello");
    }

    #[test]
    fn test_markdown_bad_frontmatter() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("bad.md"), "no frontmatter at all").unwrap();

        let result = MarkdownDirSource::new(temp.path()).fetch_published();
        assert!(matches!(result, Err(SourceError::Frontmatter { .. })));
    }

    #[test]
    fn test_markdown_missing_dir() {
        let temp = TempDir::new().unwrap();
        let result = MarkdownDirSource::new(temp.path().join("absent")).fetch_published();
        assert!(matches!(result, Err(SourceError::Walk { .. })));
    }
}
