use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::calendar::add_days;
use crate::task::{RepeatRule, TaskDraft, TaskRecord};

struct Sample {
    title: &'static str,
    rule: RepeatRule,
    day_offset: i64,
    start: (u32, u32),
    end: (u32, u32),
    category: &'static str,
    color_tag: &'static str,
}

const SAMPLES: [Sample; 8] = [
    Sample {
        title: "Team standup",
        rule: RepeatRule::Daily,
        day_offset: 0,
        start: (9, 30),
        end: (10, 0),
        category: "Work",
        color_tag: "purple",
    },
    Sample {
        title: "Deep work session",
        rule: RepeatRule::None,
        day_offset: 1,
        start: (11, 0),
        end: (13, 0),
        category: "Work",
        color_tag: "blue",
    },
    Sample {
        title: "Study SwiftUI",
        rule: RepeatRule::Weekly,
        day_offset: 2,
        start: (18, 0),
        end: (19, 15),
        category: "Study",
        color_tag: "green",
    },
    Sample {
        title: "Gym",
        rule: RepeatRule::None,
        day_offset: 3,
        start: (19, 30),
        end: (20, 30),
        category: "Hobby",
        color_tag: "red",
    },
    Sample {
        title: "Read a book",
        rule: RepeatRule::Daily,
        day_offset: 4,
        start: (21, 0),
        end: (21, 30),
        category: "Hobby",
        color_tag: "pink",
    },
    Sample {
        title: "Review notes",
        rule: RepeatRule::None,
        day_offset: 6,
        start: (8, 15),
        end: (8, 45),
        category: "Study",
        color_tag: "yellow",
    },
    Sample {
        title: "Design tasks for the week",
        rule: RepeatRule::Weekly,
        day_offset: 7,
        start: (10, 0),
        end: (11, 0),
        category: "Work",
        color_tag: "purple",
    },
    Sample {
        title: "Language practice",
        rule: RepeatRule::Daily,
        day_offset: 9,
        start: (7, 30),
        end: (8, 0),
        category: "Study",
        color_tag: "blue",
    },
];

fn clock(hm: (u32, u32)) -> anyhow::Result<NaiveTime> {
    NaiveTime::from_hms_opt(hm.0, hm.1, 0)
        .ok_or_else(|| anyhow::anyhow!("invalid sample time {}:{}", hm.0, hm.1))
}

/// Sample tasks spread over the first days of the month starting at
/// `month_start`.
#[tracing::instrument(skip(now))]
pub fn sample_tasks(month_start: NaiveDate, now: DateTime<Utc>) -> anyhow::Result<Vec<TaskRecord>> {
    SAMPLES
        .iter()
        .map(|sample| {
            let mut draft = TaskDraft::new(sample.title, add_days(month_start, sample.day_offset));
            draft.repeat_rule = sample.rule;
            draft.start = clock(sample.start)?;
            draft.end = clock(sample.end)?;
            draft.category = sample.category.to_string();
            draft.color_tag = sample.color_tag.to_string();
            draft.into_record(now)
        })
        .collect()
}
