use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::types::RawTimestamp;

/// Offsets written without a colon (`+0800`), which RFC 3339 rejects
const OFFSET_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Calendar zone used to read year/month out of an instant.
///
/// Values carrying an explicit offset are converted into this zone; naive
/// values are taken to be local time in it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArchiveZone(Tz);

impl ArchiveZone {
    pub fn utc() -> Self {
        Self(Tz::UTC)
    }

    /// Parse an IANA zone name such as `Asia/Shanghai`
    pub fn from_name(name: &str) -> Result<Self> {
        name.trim()
            .parse::<Tz>()
            .map(Self)
            .map_err(|e| anyhow::anyhow!("Unknown timezone '{}': {}", name, e))
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// `None` for anything that is not a valid instant
    pub fn parse(&self, raw: &RawTimestamp) -> Option<DateTime<Tz>> {
        match raw {
            RawTimestamp::Millis(ms) => {
                DateTime::<Utc>::from_timestamp_millis(*ms).map(|t| t.with_timezone(&self.0))
            }
            RawTimestamp::Text(text) => self.parse_text(text.trim()),
        }
    }

    fn parse_text(&self, text: &str) -> Option<DateTime<Tz>> {
        if text.is_empty() {
            return None;
        }

        if let Ok(t) = DateTime::parse_from_rfc3339(text) {
            return Some(t.with_timezone(&self.0));
        }

        if let Some(t) = OFFSET_DATETIME_FORMATS
            .iter()
            .find_map(|fmt| DateTime::parse_from_str(text, fmt).ok())
        {
            return Some(t.with_timezone(&self.0));
        }

        let naive = NAIVE_DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })?;

        // DST folds resolve to the earlier instant, gaps do not exist
        self.0.from_local_datetime(&naive).earliest()
    }
}

impl Default for ArchiveZone {
    fn default() -> Self {
        Self::utc()
    }
}
