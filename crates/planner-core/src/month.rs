use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::calendar::DayWindow;
use crate::occurrence::occurs;
use crate::task::TaskRecord;

/// Occurrence count for every day of `window` that has at least one task.
/// Days with nothing scheduled are absent rather than zero.
pub fn counts_by_day(tasks: &[TaskRecord], window: DayWindow) -> BTreeMap<NaiveDate, usize> {
    let mut out = BTreeMap::new();
    for day in window.days() {
        let count = tasks.iter().filter(|task| occurs(task, day)).count();
        if count > 0 {
            out.insert(day, count);
        }
    }

    debug!(
        start = %window.start,
        end = %window.end,
        tasks = tasks.len(),
        busy_days = out.len(),
        "indexed month occurrences"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::RepeatRule;
    use crate::test_support::{day, record};

    #[test]
    fn counts_mix_of_rules_across_february() {
        let window = DayWindow::month_of(day(2024, 2, 1));
        let tasks = vec![
            // Daily from mid-month.
            record("read", RepeatRule::Daily, day(2024, 2, 20), (21, 0), (21, 30)),
            // Thursday weekly from January.
            record("plan", RepeatRule::Weekly, day(2024, 1, 4), (10, 0), (11, 0)),
            // Anchored on the 30th, so February has no match.
            record("rent", RepeatRule::Monthly, day(2024, 1, 30), (8, 0), (8, 15)),
            record("gym", RepeatRule::None, day(2024, 2, 22), (19, 30), (20, 30)),
            // Outside the window; harmless.
            record("old", RepeatRule::None, day(2024, 1, 22), (9, 0), (10, 0)),
        ];

        let counts = counts_by_day(&tasks, window);

        assert_eq!(counts.get(&day(2024, 2, 1)), Some(&1));
        assert_eq!(counts.get(&day(2024, 2, 2)), None);
        assert_eq!(counts.get(&day(2024, 2, 19)), None);
        assert_eq!(counts.get(&day(2024, 2, 20)), Some(&1));
        // Thursday + daily + one-off
        assert_eq!(counts.get(&day(2024, 2, 22)), Some(&3));
        assert_eq!(counts.get(&day(2024, 2, 29)), Some(&2));
        assert!(counts.values().all(|count| *count > 0));
        assert!(counts.keys().all(|d| window.contains(*d)));
    }

    #[test]
    fn empty_task_list_yields_empty_map() {
        let window = DayWindow::month_of(day(2024, 4, 1));
        assert!(counts_by_day(&[], window).is_empty());
    }

    #[test]
    fn counts_match_closed_form_occurrence_counts() {
        let window = DayWindow::month_of(day(2024, 3, 1));
        let tasks = vec![
            record("a", RepeatRule::Daily, day(2024, 3, 10), (9, 0), (10, 0)),
            record("b", RepeatRule::Weekly, day(2023, 12, 5), (9, 0), (10, 0)),
            record("c", RepeatRule::Monthly, day(2023, 10, 31), (9, 0), (10, 0)),
        ];
        let indexed: usize = counts_by_day(&tasks, window).values().sum();
        let closed_form: u32 = tasks
            .iter()
            .map(|task| crate::stats::occurrence_count(task, window))
            .sum();
        assert_eq!(indexed, closed_form as usize);
    }
}
