use chrono::{NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use crate::task::{RepeatRule, TaskRecord};

pub(crate) fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(crate) fn record(
    title: &str,
    rule: RepeatRule,
    anchor: NaiveDate,
    start: (u32, u32),
    end: (u32, u32),
) -> TaskRecord {
    TaskRecord {
        id: Uuid::new_v4(),
        title: title.to_string(),
        details: None,
        category: "Work".to_string(),
        color_tag: "purple".to_string(),
        repeat_rule: rule,
        anchor_day: anchor,
        start_time: anchor.and_hms_opt(start.0, start.1, 0).expect("valid start"),
        end_time: anchor.and_hms_opt(end.0, end.1, 0).expect("valid end"),
        is_done: false,
        created_at: Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .expect("valid created_at"),
    }
}

pub(crate) fn in_category(mut task: TaskRecord, category: &str, color: &str) -> TaskRecord {
    task.category = category.to_string();
    task.color_tag = color.to_string();
    task
}
