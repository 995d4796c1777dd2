use chrono::{Datelike, Timelike};

use crate::calendar::{DayOnly, day_only};
use crate::task::{RepeatRule, TaskRecord};

/// Whether `task` is active on `day`. Tasks never occur before their anchor
/// day, and a monthly task anchored on a day a month lacks skips that month.
pub fn occurs(task: &TaskRecord, day: impl DayOnly) -> bool {
    let target = day.day_only();
    let anchor = day_only(task.anchor_day);

    if target < anchor {
        return false;
    }

    match task.repeat_rule {
        RepeatRule::None => target == anchor,
        RepeatRule::Daily => true,
        RepeatRule::Weekly => target.weekday() == anchor.weekday(),
        RepeatRule::Monthly => target.day() == anchor.day(),
    }
}

/// Tasks occurring on `day`, ordered by start time of day.
pub fn tasks_on_day(tasks: &[TaskRecord], day: impl DayOnly) -> Vec<&TaskRecord> {
    let target = day.day_only();
    let mut out: Vec<&TaskRecord> = tasks.iter().filter(|task| occurs(task, target)).collect();
    // Repeating tasks keep their anchor date in start_time, so only hour
    // and minute take part in the ordering.
    out.sort_by_key(|task| minute_of_day(task));
    out
}

fn minute_of_day(task: &TaskRecord) -> u32 {
    task.start_time.hour() * 60 + task.start_time.minute()
}
