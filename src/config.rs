use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::timestamp::ArchiveZone;

pub const DEFAULT_CONFIG_PATH: &str = "archive.yaml";

/// Site identity shown on the rendered archive page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_title")]
    pub title: String,
    #[serde(default = "default_site_url")]
    pub url: String,
    #[serde(default = "default_author")]
    pub author: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// JSON export of the articles table
    Json,
    /// Directory of Markdown posts
    Markdown,
}

/// Archive build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// IANA zone that decides which year/month an article falls in
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_source")]
    pub source: SourceKind,
    #[serde(default = "default_input")]
    pub input: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Directory holding a custom `archive.html`
    #[serde(default)]
    pub template_dir: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

/// Complete archive.yaml structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn zone(&self) -> Result<ArchiveZone> {
        ArchiveZone::from_name(&self.archive.timezone)
            .context("Invalid archive.timezone in configuration")
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: default_site_title(),
            url: default_site_url(),
            author: default_author(),
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            source: default_source(),
            input: default_input(),
            output_dir: default_output_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_site_title() -> String {
    "My Blog".to_string()
}

fn default_site_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_author() -> String {
    "admin".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_source() -> SourceKind {
    SourceKind::Json
}

fn default_input() -> String {
    "articles.json".to_string()
}

fn default_output_dir() -> String {
    "dist".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Load configuration; a missing file means all defaults
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config: Config = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.archive.timezone, "UTC");
        assert_eq!(config.archive.source, SourceKind::Json);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert!(config.render.template_dir.is_none());
    }

    #[test]
    fn test_missing_file_is_default() {
        let temp = TempDir::new().unwrap();
        let config = load_config(&temp.path().join("archive.yaml")).unwrap();
        assert_eq!(config.archive.output_dir, "dist");
    }

    #[test]
    fn test_partial_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("archive.yaml");
        fs::write(
            &path,
            r#"
site:
  title: Notes
archive:
  timezone: Asia/Shanghai
  source: markdown
  input: content/posts
logging:
  format: json
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.site.title, "Notes");
        assert_eq!(config.site.author, "admin");
        assert_eq!(config.archive.source, SourceKind::Markdown);
        assert_eq!(config.archive.input, "content/posts");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.zone().unwrap().name(), "Asia/Shanghai");
    }

    #[test]
    fn test_bad_timezone() {
        let mut config = Config::default();
        config.archive.timezone = "Nowhere/City".to_string();
        assert!(config.zone().is_err());
    }
}
