use serde_json::{json, Value};

use crate::source::ArticleSource;
use crate::timeline::build_timeline;
use crate::timestamp::ArchiveZone;

pub const STATUS_OK: u16 = 200;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

/// Public message for a failed fetch; details only go to the log
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch archive";

#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveResponse {
    pub status: u16,
    pub body: Value,
}

impl ArchiveResponse {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// GET /articles/archive: fetch every published article and answer with
/// `{ "years": [...], "total": n }`.
pub fn archive_handler<S: ArticleSource>(source: &S, zone: &ArchiveZone) -> ArchiveResponse {
    let articles = match source.fetch_published() {
        Ok(articles) => articles,
        Err(e) => {
            tracing::error!(source = source.name(), error = %e, "Error fetching archive articles");
            return ArchiveResponse {
                status: STATUS_INTERNAL_ERROR,
                body: json!({ "message": FETCH_FAILED_MESSAGE }),
            };
        }
    };

    let timeline = build_timeline(&articles, zone);
    tracing::info!(
        source = source.name(),
        total = timeline.total,
        years = timeline.years.len(),
        "archive built"
    );

    match serde_json::to_value(&timeline) {
        Ok(body) => ArchiveResponse {
            status: STATUS_OK,
            body,
        },
        Err(e) => {
            tracing::error!(error = %e, "Error encoding archive");
            ArchiveResponse {
                status: STATUS_INTERNAL_ERROR,
                body: json!({ "message": FETCH_FAILED_MESSAGE }),
            }
        }
    }
}
