use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const CACHE_DIR: &str = ".build-cache";
const CACHE_FILE: &str = "archive-cache.json";
const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Remembers which source content produced each archive output
#[derive(Debug, Serialize, Deserialize)]
pub struct BuildCache {
    pub version: String,
    pub entries: HashMap<String, CacheEntry>,
    #[serde(skip)]
    dir: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: String,
    pub built_at: String,
}

impl BuildCache {
    /// Load the cache under `root`; a missing or stale cache starts empty
    pub fn load(root: &Path) -> Result<Self> {
        let dir = root.join(CACHE_DIR);
        let cache_path = dir.join(CACHE_FILE);

        if !cache_path.exists() {
            return Ok(Self::new(dir));
        }

        let content = fs::read_to_string(&cache_path)
            .with_context(|| format!("Failed to read {}", cache_path.display()))?;

        match serde_json::from_str::<BuildCache>(&content) {
            Ok(mut cache) if cache.version == env!("CARGO_PKG_VERSION") => {
                cache.dir = dir;
                Ok(cache)
            }
            Ok(_) => {
                tracing::info!("build cache written by another version, starting fresh");
                Ok(Self::new(dir))
            }
            Err(e) => {
                tracing::warn!(error = %e, "unreadable build cache, starting fresh");
                Ok(Self::new(dir))
            }
        }
    }

    pub fn new(dir: PathBuf) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            entries: HashMap::new(),
            dir,
        }
    }

    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(self)?;
        fs::write(self.dir.join(CACHE_FILE), json)?;
        Ok(())
    }

    /// True unless `output` exists and was built from the same fingerprint
    pub fn needs_rebuild(&self, output: &Path, fingerprint: &str) -> bool {
        if !output.exists() {
            return true;
        }

        match self.entries.get(output.to_string_lossy().as_ref()) {
            None => true,
            Some(entry) => entry.fingerprint != fingerprint,
        }
    }

    pub fn update_entry(&mut self, output: &Path, fingerprint: String) {
        self.entries.insert(
            output.to_string_lossy().to_string(),
            CacheEntry {
                fingerprint,
                built_at: chrono::Utc::now().to_rfc3339(),
            },
        );
    }
}

/// Fingerprint of everything that decides an archive build: the source
/// content plus the settings that change the output.
pub fn fingerprint(source: &Path, settings: &[&str]) -> Result<String> {
    let content_hash = if source.is_dir() {
        hash_directory(source, MARKDOWN_EXTENSIONS)?
    } else {
        hash_file(source)?
    };

    let mut hasher = blake3::Hasher::new();
    hasher.update(content_hash.as_bytes());
    for setting in settings {
        hasher.update(b"\0");
        hasher.update(setting.as_bytes());
    }
    Ok(hasher.finalize().to_hex().to_string())
}

pub fn hash_file(path: &Path) -> Result<String> {
    let content = fs::read(path).with_context(|| format!("Failed to hash {}", path.display()))?;
    Ok(blake3::hash(&content).to_hex().to_string())
}

/// Hash the files under `dir` whose extension is in `extensions`, keyed by
/// their path relative to `dir` so moving the tree does not change it.
pub fn hash_directory(dir: &Path, extensions: &[&str]) -> Result<String> {
    let mut hasher = blake3::Hasher::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        let path = entry.path();

        let wanted = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| extensions.contains(&ext));
        if !entry.file_type().is_file() || !wanted {
            continue;
        }

        let relative = path.strip_prefix(dir).unwrap_or(path);
        hasher.update(relative.to_string_lossy().as_bytes());
        hasher.update(b"\0");
        hasher.update(hash_file(path)?.as_bytes());
    }

    Ok(hasher.finalize().to_hex().to_string())
}
