use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context as TeraContext, Tera};

use crate::config::Config;
use crate::types::TimelineResult;

const ARCHIVE_TEMPLATE: &str = "archive.html";

const DEFAULT_ARCHIVE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Archive - {{ site.title }}</title>
</head>
<body>
    <header>
        <h1><a href="{{ site.url }}">{{ site.title }}</a></h1>
        <p class="archive-total">{{ timeline.total }} articles</p>
    </header>
    <main class="archive">
    {% if timeline.years | length == 0 %}
        <p class="archive-empty">Nothing here yet.</p>
    {% endif %}
    {% for year in timeline.years %}
        <section class="archive-year" id="y{{ year.year }}">
            <h2>{{ year.year }} <small>({{ year.count }})</small></h2>
            {% for month in year.months %}
            <div class="archive-month" id="y{{ year.year }}-m{{ month.month }}">
                <h3>{{ year.year }}-{% if month.month < 10 %}0{% endif %}{{ month.month }} <small>({{ month.count }})</small></h3>
                <ul>
                {% for article in month.articles %}
                    <li>
                        <a href="{{ site.url }}/article/{{ article.id | default(value='') }}">{{ article.title }}</a>
                        {% if article.category %}<span class="category">{{ article.category.name }}</span>{% endif %}
                        <span class="stats">{{ article.viewCount }} views, {{ article.commentCount }} comments</span>
                    </li>
                {% endfor %}
                </ul>
            </div>
            {% endfor %}
        </section>
    {% endfor %}
    </main>
    <footer>Generated {{ generated_at }} by {{ site.author }}</footer>
</body>
</html>
"#;

/// Flattened site info for the template context
#[derive(Debug, Clone, Serialize)]
struct TemplateSite<'a> {
    title: &'a str,
    url: &'a str,
    author: &'a str,
}

pub struct ArchiveRenderer {
    tera: Tera,
    config: Config,
}

impl ArchiveRenderer {
    /// Custom templates from `render.template_dir` win; the built-in
    /// archive template fills in when none is provided.
    pub fn new(config: Config) -> Result<Self> {
        let mut tera = match config.render.template_dir.as_deref().map(Path::new) {
            Some(dir) if dir.exists() => {
                let glob_pattern = format!("{}/**/*.html", dir.display());
                Tera::new(&glob_pattern)
                    .with_context(|| format!("Failed to load templates from {}", dir.display()))?
            }
            Some(dir) => {
                tracing::warn!(dir = %dir.display(), "template directory not found, using built-in template");
                Tera::default()
            }
            None => Tera::default(),
        };

        let mut builtin = Tera::default();
        builtin.add_raw_template(ARCHIVE_TEMPLATE, DEFAULT_ARCHIVE_TEMPLATE)?;
        tera.extend(&builtin)?;

        Ok(Self { tera, config })
    }

    pub fn render(&self, timeline: &TimelineResult) -> Result<String> {
        let site = TemplateSite {
            title: &self.config.site.title,
            url: self.config.site.url.trim_end_matches('/'),
            author: &self.config.site.author,
        };

        let mut context = TeraContext::new();
        context.insert("site", &site);
        context.insert("timeline", timeline);
        context.insert("generated_at", &chrono::Utc::now().to_rfc3339());

        self.tera
            .render(ARCHIVE_TEMPLATE, &context)
            .context("Failed to render archive page")
    }

    /// Render into `<output_dir>/archive.html`
    pub fn write(&self, timeline: &TimelineResult, output_dir: &Path) -> Result<PathBuf> {
        let html = self.render(timeline)?;
        let output_path = output_dir.join(ARCHIVE_TEMPLATE);

        fs::create_dir_all(output_dir)?;
        fs::write(&output_path, html)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::build_timeline;
    use crate::timestamp::ArchiveZone;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample() -> TimelineResult {
        let input = json!([
            {
                "id": 1,
                "title": "Ownership <explained>",
                "createdAt": "2024-03-01",
                "viewCount": 9,
                "categories": [{ "id": 2, "name": "Rust" }]
            },
            { "id": 2, "title": "Undated" }
        ]);
        build_timeline(input.as_array().unwrap(), &ArchiveZone::utc())
    }

    #[test]
    fn test_default_template() {
        let renderer = ArchiveRenderer::new(Config::default()).unwrap();
        let html = renderer.render(&sample()).unwrap();

        assert!(html.contains("2 articles"));
        assert!(html.contains("2024-03"));
        assert!(html.contains("/article/1"));
        assert!(html.contains("Rust"));
        assert!(html.contains("Ownership &lt;explained&gt;"));
    }

    #[test]
    fn test_empty_timeline() {
        let renderer = ArchiveRenderer::new(Config::default()).unwrap();
        let html = renderer
            .render(&TimelineResult {
                years: Vec::new(),
                total: 0,
            }).unwrap();
        assert!(html.contains("Nothing here yet."));
    }

    #[test]
    fn test_custom_template_dir() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("archive.html"),
            "{{ site.title }}:{{ timeline.total }}",
        )
        .unwrap();

        let mut config = Config::default();
        config.site.title = "Notes".to_string();
        config.render.template_dir = Some(temp.path().to_string_lossy().to_string());

        let renderer = ArchiveRenderer::new(config).unwrap();
        assert_eq!(renderer.render(&sample()).unwrap(), "Notes:2");
    }

    #[test]
    fn test_write() {
        let temp = TempDir::new().unwrap();
        let renderer = ArchiveRenderer::new(Config::default()).unwrap();

        let path = renderer.write(&sample(), &temp.path().join("out")).unwrap();
        assert!(path.ends_with("archive.html"));
        assert!(fs::read_to_string(path).unwrap().contains("<main class=\"archive\">"));
    }
}
