//! Groups a user's records into "days" that start at a fixed hour rather
//! than at midnight, so a late supper still counts towards the day it ends.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::models::record::StructuredRecord;
use crate::store::{RecordId, RecordKey};

/// What to do when a window holds both an original and its corrections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionPolicy {
    /// Emit only the highest revision of each record.
    #[default]
    PreferLatest,
    /// Emit originals and every revision.
    IncludeAll,
}

/// Half-open interval `[start, end)` of local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DayWindow {
    pub fn for_date(date: NaiveDate, day_start_offset_hours: u32) -> Self {
        let start =
            date.and_time(NaiveTime::MIN) + Duration::hours(day_start_offset_hours.into());
        Self {
            start,
            end: start + Duration::hours(24),
        }
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at < self.end
    }
}

/// Entries whose key stamp falls inside the date's window, in input order.
/// Entries with unparsable keys are skipped.
pub fn select_window<'a>(
    records: &'a [(String, StructuredRecord)],
    target_date: NaiveDate,
    day_start_offset_hours: u32,
    policy: RevisionPolicy,
) -> Vec<&'a (String, StructuredRecord)> {
    let window = DayWindow::for_date(target_date, day_start_offset_hours);

    let in_window: Vec<(RecordKey, &(String, StructuredRecord))> = records
        .iter()
        .filter_map(|entry| {
            let key = entry.0.parse::<RecordKey>().ok()?;
            window.contains(key.at).then_some((key, entry))
        })
        .collect();

    match policy {
        RevisionPolicy::IncludeAll => in_window.into_iter().map(|(_, entry)| entry).collect(),
        RevisionPolicy::PreferLatest => {
            let mut latest: HashMap<RecordId, u8> = HashMap::new();
            for (key, _) in &in_window {
                let rev = latest.entry(key.id()).or_insert(key.revision);
                *rev = (*rev).max(key.revision);
            }
            in_window
                .into_iter()
                .filter(|(key, _)| latest.get(&key.id()) == Some(&key.revision))
                .map(|(_, entry)| entry)
                .collect()
        }
    }
}

pub fn summarize(
    records: &[(String, StructuredRecord)],
    target_date: NaiveDate,
    day_start_offset_hours: u32,
    policy: RevisionPolicy,
) -> Vec<StructuredRecord> {
    select_window(records, target_date, day_start_offset_hours, policy)
        .into_iter()
        .map(|(_, record)| record.clone())
        .collect()
}
