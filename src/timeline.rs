use chrono::{DateTime, Datelike};
use chrono_tz::Tz;
use std::collections::BTreeMap;

use crate::normalize::{normalize_article, ToPlain};
use crate::timestamp::ArchiveZone;
use crate::types::{MonthBucket, NormalizedArticle, TimelineResult, YearBucket};

#[derive(Default)]
struct YearAccumulator {
    count: usize,
    months: BTreeMap<u32, Vec<(DateTime<Tz>, NormalizedArticle)>>,
}

/// Group articles into year -> month buckets, newest first at every level.
///
/// Records without a usable `createdAt` are left out of the buckets but
/// still counted in `total`. Never fails.
pub fn build_timeline<A: ToPlain>(articles: &[A], zone: &ArchiveZone) -> TimelineResult {
    let mut years: BTreeMap<i32, YearAccumulator> = BTreeMap::new();
    let mut dropped = 0usize;

    for raw in articles {
        let article = normalize_article(raw);

        let Some(created) = article.created_at.as_ref().and_then(|t| zone.parse(t)) else {
            dropped += 1;
            continue;
        };

        let year = years.entry(created.year()).or_default();
        year.count += 1;
        year.months
            .entry(created.month())
            .or_default()
            .push((created, article));
    }

    if dropped > 0 {
        tracing::debug!(dropped, total = articles.len(), "articles without a usable createdAt");
    }

    let years = years
        .into_iter()
        .rev()
        .map(|(year, acc)| YearBucket {
            year,
            count: acc.count,
            months: acc
                .months
                .into_iter()
                .rev()
                .map(|(month, mut entries)| {
                    // stable: equal instants keep input order
                    entries.sort_by(|a, b| b.0.cmp(&a.0));
                    let articles: Vec<_> = entries.into_iter().map(|(_, a)| a).collect();
                    MonthBucket {
                        month,
                        count: articles.len(),
                        articles,
                    }
                })
                .collect(),
        })
        .collect();

    TimelineResult {
        years,
        total: articles.len(),
    }
}
