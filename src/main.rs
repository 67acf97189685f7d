mod cache;
mod config;
mod handler;
mod normalize;
mod parser;
mod render;
mod source;
mod telemetry;
mod timeline;
mod timestamp;
mod types;

use anyhow::{Context, Result};
use clap::{Args, Parser as ClapParser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cache::BuildCache;
use crate::config::{load_config, Config, SourceKind, DEFAULT_CONFIG_PATH};
use crate::handler::archive_handler;
use crate::render::ArchiveRenderer;
use crate::source::{ArticleSource, JsonExportSource, MarkdownDirSource};
use crate::timeline::build_timeline;
use crate::timestamp::ArchiveZone;
use crate::types::TimelineResult;

const ARCHIVE_JSON: &str = "archive.json";
const ARCHIVE_HTML: &str = "archive.html";

#[derive(ClapParser)]
#[command(name = "archive")]
#[command(about = "Build the year/month archive timeline of a blog")]
#[command(version)]
struct Cli {
    /// Path to archive.yaml
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Where articles come from (defaults to archive.source)
    #[arg(short, long, value_enum)]
    source: Option<SourceKind>,

    /// JSON export file or Markdown directory (defaults to archive.input)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// IANA timezone for year/month bucketing (defaults to archive.timezone)
    #[arg(long)]
    timezone: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build archive.json from the article source
    Build {
        #[command(flatten)]
        source: SourceArgs,

        /// Output directory (defaults to archive.output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,

        /// Skip the build when the source has not changed
        #[arg(long)]
        incremental: bool,

        /// Also render archive.html
        #[arg(long)]
        html: bool,
    },

    /// Render archive.html from an existing archive.json
    Render {
        /// archive.json to render (defaults to <output_dir>/archive.json)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output directory (defaults to archive.output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report totals and articles left out for unusable dates
    Check {
        #[command(flatten)]
        source: SourceArgs,
    },
}

struct BuildOptions {
    output_dir: PathBuf,
    cache_root: PathBuf,
    pretty: bool,
    incremental: bool,
    html: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    telemetry::init(&config.logging)?;

    match cli.command {
        Commands::Build {
            source,
            output,
            pretty,
            incremental,
            html,
        } => {
            let options = BuildOptions {
                output_dir: output.unwrap_or_else(|| PathBuf::from(&config.archive.output_dir)),
                cache_root: PathBuf::from("."),
                pretty,
                incremental,
                html,
            };
            let zone = resolve_zone(&config, &source)?;
            match source.kind(&config) {
                SourceKind::Json => {
                    build(&JsonExportSource::new(source.input(&config)), &config, &zone, &options)
                }
                SourceKind::Markdown => {
                    build(&MarkdownDirSource::new(source.input(&config)), &config, &zone, &options)
                }
            }
        }
        Commands::Render { input, output } => {
            let output_dir = output.unwrap_or_else(|| PathBuf::from(&config.archive.output_dir));
            let input = input.unwrap_or_else(|| output_dir.join(ARCHIVE_JSON));
            render_existing(&input, &output_dir, config)
        }
        Commands::Check { source } => {
            let zone = resolve_zone(&config, &source)?;
            match source.kind(&config) {
                SourceKind::Json => check(&JsonExportSource::new(source.input(&config)), &zone),
                SourceKind::Markdown => {
                    check(&MarkdownDirSource::new(source.input(&config)), &zone)
                }
            }
        }
    }
}

impl SourceArgs {
    fn kind(&self, config: &Config) -> SourceKind {
        self.source.unwrap_or(config.archive.source)
    }

    fn input(&self, config: &Config) -> PathBuf {
        self.input
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.archive.input))
    }
}

fn resolve_zone(config: &Config, args: &SourceArgs) -> Result<ArchiveZone> {
    match &args.timezone {
        Some(name) => ArchiveZone::from_name(name),
        None => config.zone(),
    }
}

fn build<S: ArticleSource>(
    source: &S,
    config: &Config,
    zone: &ArchiveZone,
    options: &BuildOptions,
) -> Result<()> {
    let output_path = options.output_dir.join(ARCHIVE_JSON);
    tracing::info!(source = source.name(), input = %source.location().display(), "building archive");

    let html_path = options.output_dir.join(ARCHIVE_HTML);

    let mut build_cache = if options.incremental {
        Some(BuildCache::load(&options.cache_root)?)
    } else {
        None
    };

    let fingerprint = match &build_cache {
        Some(entries) => {
            let fingerprint = build_fingerprint(source.location(), config, zone, options)?;
            let html_missing = options.html && !html_path.exists();
            if !html_missing && !entries.needs_rebuild(&output_path, &fingerprint) {
                tracing::info!(output = %output_path.display(), "source unchanged, skipping");
                return Ok(());
            }
            Some(fingerprint)
        }
        None => None,
    };

    let response = archive_handler(source, zone);
    if !response.is_success() {
        anyhow::bail!(
            "Archive build failed ({}): {}",
            response.status,
            response.body["message"]
        );
    }

    let json = if options.pretty {
        serde_json::to_string_pretty(&response.body)?
    } else {
        serde_json::to_string(&response.body)?
    };

    fs::create_dir_all(&options.output_dir)?;
    fs::write(&output_path, json)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;
    tracing::info!(output = %output_path.display(), "wrote archive");

    if options.html {
        let timeline: TimelineResult = serde_json::from_value(response.body)?;
        let renderer = ArchiveRenderer::new(config.clone())?;
        renderer.write(&timeline, &options.output_dir)?;
        tracing::info!(output = %html_path.display(), "rendered archive page");
    }

    if let (Some(entries), Some(fingerprint)) = (build_cache.as_mut(), fingerprint) {
        entries.update_entry(&output_path, fingerprint);
        entries.save()?;
    }

    Ok(())
}

/// Everything that changes the written files: source content, zone,
/// output layout, site identity and templates.
fn build_fingerprint(
    source: &Path,
    config: &Config,
    zone: &ArchiveZone,
    options: &BuildOptions,
) -> Result<String> {
    let layout = if options.pretty { "pretty" } else { "compact" };
    let mut settings = vec![zone.name().to_string(), layout.to_string()];

    if options.html {
        settings.push(serde_json::to_string(&config.site)?);
        settings.push(serde_json::to_string(&config.render)?);
        if let Some(dir) = config.render.template_dir.as_deref().map(Path::new) {
            if dir.is_dir() {
                settings.push(cache::hash_directory(dir, &["html"])?);
            }
        }
    }

    let settings: Vec<&str> = settings.iter().map(String::as_str).collect();
    cache::fingerprint(source, &settings)
}

fn render_existing(input: &Path, output_dir: &Path, config: Config) -> Result<()> {
    let content = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let timeline: TimelineResult = serde_json::from_str(&content)
        .with_context(|| format!("{} is not an archive", input.display()))?;

    let renderer = ArchiveRenderer::new(config)?;
    let html_path = renderer.write(&timeline, output_dir)?;
    tracing::info!(output = %html_path.display(), "rendered archive page");

    Ok(())
}

fn check<S: ArticleSource>(source: &S, zone: &ArchiveZone) -> Result<()> {
    let articles = source
        .fetch_published()
        .with_context(|| format!("Failed to read {} source", source.name()))?;
    let timeline = build_timeline(&articles, zone);
    let grouped = timeline.grouped_count();

    println!("Archive ({}, {})", source.location().display(), zone.name());
    println!("   Total: {}", timeline.total);
    println!("   Grouped: {}", grouped);
    println!("   Without usable date: {}", timeline.total - grouped);
    for year in &timeline.years {
        let months: Vec<_> = year
            .months
            .iter()
            .map(|m| format!("{:02}:{}", m.month, m.count))
            .collect();
        println!("   {} ({}): {}", year.year, year.count, months.join(" "));
    }

    Ok(())
}
