use std::ffi::OsString;
use std::fs;
use std::path::Path;

use chrono::{NaiveDate, Utc};
use planner_core::calendar::DayWindow;
use planner_core::datastore::{DataStore, TaskStore};
use planner_core::month::counts_by_day;
use planner_core::stats::aggregate;
use planner_core::task::{RepeatRule, TaskDraft};
use tempfile::tempdir;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn run_planner(data_dir: &Path, rc: &Path, args: &[&str]) -> anyhow::Result<()> {
    let mut argv: Vec<OsString> = vec![
        "planner".into(),
        "--plannerrc".into(),
        rc.into(),
        "--data".into(),
        data_dir.into(),
    ];
    argv.extend(args.iter().map(OsString::from));
    planner_core::run(argv)
}

#[test]
fn datastore_roundtrip_and_window_statistics() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    let now = Utc::now();

    let mut standup = TaskDraft::new("Team standup", day(2024, 2, 1));
    standup.repeat_rule = RepeatRule::Daily;
    store
        .add_task(standup.into_record(now).expect("valid standup"))
        .expect("add standup");

    let mut gym = TaskDraft::new("Gym", day(2024, 1, 20));
    gym.category = "Hobby".to_string();
    gym.color_tag = "red".to_string();
    store
        .add_task(gym.into_record(now).expect("valid gym"))
        .expect("add gym");

    let reopened = DataStore::open(temp.path()).expect("reopen datastore");
    assert_eq!(reopened.load_all().expect("load all").len(), 2);

    let window = DayWindow::month_of(day(2024, 2, 1));
    let candidates = reopened.tasks_for_window(window).expect("window query");
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].title, "Team standup");

    let stats = aggregate(&candidates, window);
    assert_eq!(stats.total_seconds, 29 * 3600);
    assert_eq!(stats.categories.len(), 1);
    assert_eq!(stats.categories[0].name, "Work");

    let counts = counts_by_day(&candidates, window);
    assert_eq!(counts.len(), 29);
    assert!(counts.values().all(|count| *count == 1));
}

#[test]
fn corrupt_line_reports_file_and_line() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    fs::write(&store.tasks_path, "\nnot json\n").expect("write corrupt data");

    let err = store.load_all().expect_err("corrupt line");
    assert!(format!("{err:#}").contains("line 2"));
}

#[test]
fn cli_add_modify_done_delete_flow() {
    let temp = tempdir().expect("tempdir");
    let data_dir = temp.path().join("data");
    let rc = temp.path().join("plannerrc");
    fs::write(&rc, "color = off\nweek.start = monday\n").expect("write rc");

    run_planner(
        &data_dir,
        &rc,
        &[
            "add",
            "Study",
            "SwiftUI",
            "day:2024-02-03",
            "start:18:00",
            "end:19:15",
            "category:Study",
            "color:green",
            "repeat:weekly",
        ],
    )
    .expect("add task");

    let store = DataStore::open(&data_dir).expect("open datastore");
    let tasks = store.load_all().expect("load after add");
    assert_eq!(tasks.len(), 1);
    let task = &tasks[0];
    assert_eq!(task.title, "Study SwiftUI");
    assert_eq!(task.repeat_rule, RepeatRule::Weekly);
    assert_eq!(task.anchor_day, day(2024, 2, 3));
    assert_eq!(task.start_time, day(2024, 2, 3).and_hms_opt(18, 0, 0).expect("time"));

    let short_id = task.short_id();
    run_planner(&data_dir, &rc, &["modify", &short_id, "day:2024-02-05", "start:7:30pm"])
        .expect("modify task");
    let task = store.load_all().expect("load after modify").remove(0);
    assert_eq!(task.anchor_day, day(2024, 2, 5));
    assert_eq!(task.start_time, day(2024, 2, 5).and_hms_opt(19, 30, 0).expect("time"));
    assert_eq!(task.end_time, day(2024, 2, 5).and_hms_opt(20, 45, 0).expect("time"));

    run_planner(&data_dir, &rc, &["done", &short_id]).expect("toggle done");
    assert!(store.load_all().expect("load after done")[0].is_done);

    run_planner(&data_dir, &rc, &["month", "2024-02"]).expect("month view");
    run_planner(&data_dir, &rc, &["stats", "2024-02"]).expect("stats view");
    run_planner(&data_dir, &rc, &["day", "2024-02-12"]).expect("day view");

    let err = run_planner(&data_dir, &rc, &["modify", &short_id, "end:06:00"])
        .expect_err("end before start");
    assert!(err.to_string().contains("end time must be after start time"));

    run_planner(&data_dir, &rc, &["delete", &short_id]).expect("delete task");
    assert!(store.load_all().expect("load after delete").is_empty());

    let err = run_planner(&data_dir, &rc, &["info", &short_id]).expect_err("deleted task");
    assert!(err.to_string().contains("no task matches"));
}

#[test]
fn seed_only_fills_an_empty_store() {
    let temp = tempdir().expect("tempdir");
    let data_dir = temp.path().join("data");
    let rc = temp.path().join("plannerrc");
    fs::write(&rc, "color = off\n").expect("write rc");

    run_planner(&data_dir, &rc, &["seed"]).expect("seed");
    let store = DataStore::open(&data_dir).expect("open datastore");
    assert_eq!(store.load_all().expect("load seeded").len(), 8);

    run_planner(&data_dir, &rc, &["seed"]).expect("seed again");
    assert_eq!(store.load_all().expect("load reseeded").len(), 8);
}
