//! Time selection for time-filtered layers.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{MapError, MapResult};

/// Longest accepted time window, ten years.
pub const MAX_WINDOW_HOURS: i64 = 24 * 366 * 10;

/// A closed-open time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// ISO 8601 interval notation: `start/end`.
    pub fn to_interval_string(&self) -> String {
        format!(
            "{}/{}",
            self.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.end.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}

/// How a selected timestamp becomes a filter predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeWindow {
    /// Feature attribute holding the observation time
    pub attribute: String,
    /// Width of the window starting at the selected timestamp
    pub hours: i64,
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self {
            attribute: "phenomenontime".to_string(),
            hours: 24,
        }
    }
}

impl TimeWindow {
    /// Window starting at `selected`; fails when the end is not representable.
    pub fn range_from(&self, selected: DateTime<Utc>) -> MapResult<TimeRange> {
        let end = Duration::try_hours(self.hours)
            .and_then(|width| selected.checked_add_signed(width))
            .ok_or_else(|| {
                MapError::InvalidTime(format!(
                    "{} hour window from {} is out of range",
                    self.hours, selected
                ))
            })?;
        Ok(TimeRange::new(selected, end))
    }

    /// CQL `DURING` predicate for the window that starts at `selected`.
    pub fn predicate(&self, selected: DateTime<Utc>) -> MapResult<String> {
        Ok(format!(
            "{} DURING {}",
            self.attribute,
            self.range_from(selected)?.to_interval_string()
        ))
    }
}
