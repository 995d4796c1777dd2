use std::fmt;

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::datetime::compact_utc_serde;

/// Display ordering for statistics rows; other categories sort after these.
pub const PREFERRED_CATEGORIES: [&str; 3] = ["Work", "Study", "Hobby"];

pub const COLOR_TAGS: [&str; 6] = ["blue", "purple", "pink", "red", "yellow", "green"];

pub const DEFAULT_CATEGORY: &str = "Work";
pub const DEFAULT_COLOR_TAG: &str = "purple";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RepeatRule {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl RepeatRule {
    pub const ALL: [RepeatRule; 4] = [
        RepeatRule::None,
        RepeatRule::Daily,
        RepeatRule::Weekly,
        RepeatRule::Monthly,
    ];

    /// Case-insensitive; anything unrecognized is `None`.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "daily" => Self::Daily,
            "weekly" => Self::Weekly,
            "monthly" => Self::Monthly,
            "none" | "" => Self::None,
            other => {
                tracing::debug!(rule = %other, "unrecognized repeat rule treated as none");
                Self::None
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    pub fn is_repeating(self) -> bool {
        self != Self::None
    }
}

impl From<String> for RepeatRule {
    fn from(raw: String) -> Self {
        Self::normalize(&raw)
    }
}

impl From<RepeatRule> for String {
    fn from(rule: RepeatRule) -> Self {
        rule.as_str().to_string()
    }
}

impl fmt::Display for RepeatRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: Uuid,

    pub title: String,

    #[serde(default)]
    pub details: Option<String>,

    #[serde(default = "default_category")]
    pub category: String,

    #[serde(default = "default_color_tag")]
    pub color_tag: String,

    #[serde(default)]
    pub repeat_rule: RepeatRule,

    pub anchor_day: NaiveDate,

    pub start_time: NaiveDateTime,

    pub end_time: NaiveDateTime,

    #[serde(default)]
    pub is_done: bool,

    #[serde(with = "compact_utc_serde")]
    pub created_at: DateTime<Utc>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_color_tag() -> String {
    DEFAULT_COLOR_TAG.to_string()
}

impl TaskRecord {
    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }

    pub fn toggle_done(&mut self) {
        self.is_done = !self.is_done;
    }
}

/// Editable fields of a task before it becomes a record.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub details: Option<String>,
    pub category: String,
    pub color_tag: String,
    pub repeat_rule: RepeatRule,
    pub day: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TaskDraft {
    /// Editor defaults: a one hour `Work` block from 09:00 on `day`.
    pub fn new(title: impl Into<String>, day: NaiveDate) -> Self {
        Self {
            title: title.into(),
            details: None,
            category: default_category(),
            color_tag: default_color_tag(),
            repeat_rule: RepeatRule::None,
            day,
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }

    pub fn from_record(record: &TaskRecord) -> Self {
        Self {
            title: record.title.clone(),
            details: record.details.clone(),
            category: record.category.clone(),
            color_tag: record.color_tag.clone(),
            repeat_rule: record.repeat_rule,
            day: record.anchor_day,
            start: record.start_time.time(),
            end: record.end_time.time(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.title.trim().is_empty() {
            return Err(anyhow!("task name can't be empty"));
        }
        if self.end <= self.start {
            return Err(anyhow!(
                "end time must be after start time ({} <= {})",
                self.end.format("%H:%M"),
                self.start.format("%H:%M")
            ));
        }
        Ok(())
    }

    pub fn into_record(self, now: DateTime<Utc>) -> anyhow::Result<TaskRecord> {
        self.validate()?;
        Ok(TaskRecord {
            id: Uuid::new_v4(),
            title: self.title.trim().to_string(),
            details: self.details,
            category: self.category,
            color_tag: self.color_tag,
            repeat_rule: self.repeat_rule,
            anchor_day: self.day,
            start_time: self.day.and_time(self.start),
            end_time: self.day.and_time(self.end),
            is_done: false,
            created_at: now,
        })
    }

    /// Writes the draft back onto an existing record, keeping its identity,
    /// completion state and creation time.
    pub fn apply_to(self, record: &mut TaskRecord) -> anyhow::Result<()> {
        self.validate()?;
        record.title = self.title.trim().to_string();
        record.details = self.details;
        record.category = self.category;
        record.color_tag = self.color_tag;
        record.repeat_rule = self.repeat_rule;
        record.anchor_day = self.day;
        record.start_time = self.day.and_time(self.start);
        record.end_time = self.day.and_time(self.end);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};

    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

    #[test]
    fn repeat_rule_normalizes_unknown_values_to_none() {
        assert_eq!(RepeatRule::normalize("Daily"), RepeatRule::Daily);
        assert_eq!(RepeatRule::normalize(" WEEKLY "), RepeatRule::Weekly);
        assert_eq!(RepeatRule::normalize("monthly"), RepeatRule::Monthly);
        assert_eq!(RepeatRule::normalize("yearly"), RepeatRule::None);
        assert_eq!(RepeatRule::normalize(""), RepeatRule::None);
    }

    #[test]
    fn record_deserializes_legacy_rule_strings() {
        let raw = r#"{
            "id": "6f9619ff-8b86-d011-b42d-00c04fc964ff",
            "title": "Gym",
            "repeat_rule": "fortnightly",
            "anchor_day": "2024-02-03",
            "start_time": "2024-02-03T19:30:00",
            "end_time": "2024-02-03T20:30:00",
            "created_at": "20240201T080000Z"
        }"#;
        let record: TaskRecord = serde_json::from_str(raw).expect("parse record");
        assert_eq!(record.repeat_rule, RepeatRule::None);
        assert_eq!(record.category, "Work");
        assert_eq!(record.color_tag, "purple");
        assert!(!record.is_done);

        let encoded = serde_json::to_string(&record).expect("encode record");
        assert!(encoded.contains(r#""repeat_rule":"none""#));
    }

    #[test]
    fn draft_rejects_empty_title_and_inverted_times() {
        let mut draft = TaskDraft::new("   ", day(2024, 2, 1));
        let err = draft.validate().expect_err("empty title");
        assert!(err.to_string().contains("can't be empty"));

        draft.title = "Read".to_string();
        draft.start = time(10, 0);
        draft.end = time(10, 0);
        let err = draft.validate().expect_err("zero length");
        assert!(err.to_string().contains("end time must be after start time"));
    }

    #[test]
    fn draft_aligns_times_onto_anchor_day() {
        let now = Utc
            .with_ymd_and_hms(2024, 1, 20, 8, 0, 0)
            .single()
            .expect("valid now");
        let mut draft = TaskDraft::new(" Standup ", day(2024, 2, 1));
        draft.start = time(9, 30);
        draft.end = time(10, 0);
        let mut record = draft.into_record(now).expect("valid draft");

        assert_eq!(record.title, "Standup");
        assert_eq!(record.anchor_day, record.start_time.date());
        assert_eq!(record.end_time.date(), record.anchor_day);
        assert_eq!(record.created_at, now);

        let mut edit = TaskDraft::from_record(&record);
        edit.day = day(2024, 3, 5);
        edit.apply_to(&mut record).expect("valid edit");
        assert_eq!(record.anchor_day, day(2024, 3, 5));
        assert_eq!(record.start_time, day(2024, 3, 5).and_time(time(9, 30)));
        assert_eq!(record.end_time, day(2024, 3, 5).and_time(time(10, 0)));
    }
}
