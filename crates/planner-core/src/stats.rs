//! Time-by-category statistics over a display window.
//!
//! Occurrences are counted in closed form per repeat rule instead of walking
//! every day, so `occurrence_count` and [`crate::occurrence::occurs`] must
//! agree for every window.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::calendar::{DayWindow, add_days, days_between, inclusive_day_count};
use crate::task::{PREFERRED_CATEGORIES, RepeatRule, TaskRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStat {
    pub name: String,
    pub seconds: i64,
    /// Color tag of the first task seen in this category.
    pub color_tag: String,
    pub percent: f64,
}

impl CategoryStat {
    pub fn hours(&self) -> f64 {
        self.seconds as f64 / 3600.0
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MonthStats {
    pub total_seconds: i64,
    pub categories: Vec<CategoryStat>,
}

/// Days inside `window` on which `task` occurs.
pub fn occurrence_count(task: &TaskRecord, window: DayWindow) -> u32 {
    let anchor = task.anchor_day;
    if anchor > window.end {
        return 0;
    }

    match task.repeat_rule {
        RepeatRule::None => u32::from(window.contains(anchor)),
        RepeatRule::Daily => inclusive_day_count(anchor.max(window.start), window.end),
        RepeatRule::Weekly => weekly_count(anchor, anchor.max(window.start), window.end),
        RepeatRule::Monthly => monthly_count(anchor, window),
    }
}

fn weekly_count(anchor: NaiveDate, from: NaiveDate, to: NaiveDate) -> u32 {
    if from > to {
        return 0;
    }

    let target = i64::from(anchor.weekday().num_days_from_monday());
    let current = i64::from(from.weekday().num_days_from_monday());
    let first = add_days(from, (target - current + 7) % 7);
    if first > to {
        return 0;
    }

    1 + u32::try_from(days_between(first, to) / 7).unwrap_or(0)
}

fn monthly_count(anchor: NaiveDate, window: DayWindow) -> u32 {
    // No clamping: a month without the anchor's day has no occurrence.
    let Some(candidate) =
        NaiveDate::from_ymd_opt(window.start.year(), window.start.month(), anchor.day())
    else {
        return 0;
    };

    u32::from(window.contains(candidate) && candidate >= anchor)
}

/// Seconds between start and end, or 0 for empty and inverted spans.
pub fn valid_duration(task: &TaskRecord) -> i64 {
    task.end_time
        .signed_duration_since(task.start_time)
        .num_seconds()
        .max(0)
}

pub fn aggregate(tasks: &[TaskRecord], window: DayWindow) -> MonthStats {
    let mut buckets: BTreeMap<&str, (i64, &str)> = BTreeMap::new();
    let mut total: i64 = 0;

    for task in tasks {
        let duration = valid_duration(task);
        if duration == 0 {
            continue;
        }
        let occurrences = occurrence_count(task, window);
        if occurrences == 0 {
            continue;
        }

        let contribution = duration.saturating_mul(i64::from(occurrences));
        total = total.saturating_add(contribution);
        let bucket = buckets
            .entry(task.category.as_str())
            .or_insert((0, task.color_tag.as_str()));
        bucket.0 = bucket.0.saturating_add(contribution);
    }

    let mut categories: Vec<CategoryStat> = buckets
        .into_iter()
        .map(|(name, (seconds, color_tag))| CategoryStat {
            name: name.to_string(),
            seconds,
            color_tag: color_tag.to_string(),
            percent: percent_of(seconds, total),
        })
        .collect();
    categories.sort_by(compare_rows);

    debug!(
        start = %window.start,
        end = %window.end,
        total_seconds = total,
        categories = categories.len(),
        "aggregated category durations"
    );

    MonthStats {
        total_seconds: total,
        categories,
    }
}

fn percent_of(seconds: i64, total: i64) -> f64 {
    if total <= 0 {
        0.0
    } else {
        seconds as f64 / total as f64
    }
}

fn preference_rank(name: &str) -> usize {
    PREFERRED_CATEGORIES
        .iter()
        .position(|preferred| *preferred == name)
        .unwrap_or(PREFERRED_CATEGORIES.len())
}

fn compare_rows(left: &CategoryStat, right: &CategoryStat) -> Ordering {
    preference_rank(&left.name)
        .cmp(&preference_rank(&right.name))
        .then_with(|| right.seconds.cmp(&left.seconds))
        .then_with(|| left.name.cmp(&right.name))
}
