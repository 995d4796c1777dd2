mod modifiers;

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, instrument};

use crate::calendar::{DayWindow, start_of_month};
use crate::cli::Invocation;
use crate::config::Config;
use crate::datastore::{DataStore, TaskStore, find_task_index, sort_by_schedule};
use crate::datetime::{local_day, parse_day_expr, parse_month_expr};
use crate::month::counts_by_day;
use crate::occurrence::tasks_on_day;
use crate::render::Renderer;
use crate::seed::sample_tasks;
use crate::stats::aggregate;
use crate::task::{TaskDraft, TaskRecord};

use modifiers::{apply_mods, parse_title_and_mods};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add",
        "modify",
        "done",
        "delete",
        "info",
        "list",
        "day",
        "month",
        "stats",
        "seed",
        "export",
        "_commands",
        "_show",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(store, cfg, renderer, inv))]
pub fn dispatch(
    store: &DataStore,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let today = local_day(now);
    let command = inv.command.as_str();
    let args = inv.args.as_slice();

    debug!(command, args = ?inv.args, %today, "dispatching command");

    match command {
        "add" => cmd_add(store, args, today, now),
        "modify" => cmd_modify(store, args, today),
        "done" => cmd_done(store, args),
        "delete" => cmd_delete(store, args),
        "info" => cmd_info(store, renderer, args),
        "list" => cmd_list(store, renderer),
        "day" => cmd_day(store, renderer, args, today),
        "month" => cmd_month(store, cfg, renderer, args, today),
        "stats" => cmd_stats(store, renderer, args, today),
        "seed" => cmd_seed(store, today, now),
        "export" => cmd_export(store),
        "_commands" => cmd_commands(),
        "_show" => cmd_show(cfg),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[instrument(skip(store, args, now))]
fn cmd_add(
    store: &DataStore,
    args: &[String],
    today: NaiveDate,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command add");

    let (title, mods) = parse_title_and_mods(args, today)?;
    let title = title.ok_or_else(|| anyhow!("add: task name is required"))?;

    let mut draft = TaskDraft::new(title, today);
    apply_mods(&mut draft, &mods)?;
    let task = draft.into_record(now)?;
    let short_id = task.short_id();

    let tasks = store.add_task(task)?;
    debug!(task_count = tasks.len(), "task added");
    println!("Created task {short_id}.");
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_modify(store: &DataStore, args: &[String], today: NaiveDate) -> anyhow::Result<()> {
    info!("command modify");

    let (selector, rest) = split_selector(args, "modify")?;
    let mut task = select_task(store, selector)?;

    let (title, mods) = parse_title_and_mods(rest, today)?;
    if title.is_none() && mods.is_empty() {
        return Err(anyhow!("modify: nothing to change"));
    }

    let mut draft = TaskDraft::from_record(&task);
    if let Some(title) = title {
        draft.title = title;
    }
    apply_mods(&mut draft, &mods)?;
    draft.apply_to(&mut task)?;

    store.update_task(task.clone())?;
    println!("Modified task {}.", task.short_id());
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_done(store: &DataStore, args: &[String]) -> anyhow::Result<()> {
    info!("command done");

    let (selector, _) = split_selector(args, "done")?;
    let mut task = select_task(store, selector)?;
    task.toggle_done();
    store.update_task(task.clone())?;

    if task.is_done {
        println!("Completed task {} '{}'.", task.short_id(), task.title);
    } else {
        println!("Reopened task {} '{}'.", task.short_id(), task.title);
    }
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_delete(store: &DataStore, args: &[String]) -> anyhow::Result<()> {
    info!("command delete");

    let (selector, _) = split_selector(args, "delete")?;
    let task = select_task(store, selector)?;
    let removed = store.delete_task(task.id)?;
    println!("Deleted task {} '{}'.", removed.short_id(), removed.title);
    Ok(())
}

#[instrument(skip(store, renderer, args))]
fn cmd_info(store: &DataStore, renderer: &mut Renderer, args: &[String]) -> anyhow::Result<()> {
    info!("command info");

    let (selector, _) = split_selector(args, "info")?;
    let task = select_task(store, selector)?;
    renderer.print_task_info(&task)
}

#[instrument(skip(store, renderer))]
fn cmd_list(store: &DataStore, renderer: &mut Renderer) -> anyhow::Result<()> {
    info!("command list");

    let mut tasks = store.load_all()?;
    if tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }
    sort_by_schedule(&mut tasks);
    renderer.print_task_table(&tasks)
}

#[instrument(skip(store, renderer, args))]
fn cmd_day(
    store: &DataStore,
    renderer: &mut Renderer,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command day");

    let day = match args.first() {
        Some(expr) => parse_day_expr(expr, today)?,
        None => today,
    };
    let candidates = store.tasks_for_window(DayWindow::new(day, day))?;
    let occurring = tasks_on_day(&candidates, day);
    renderer.print_day(day, &occurring)
}

#[instrument(skip(store, cfg, renderer, args))]
fn cmd_month(
    store: &DataStore,
    cfg: &Config,
    renderer: &mut Renderer,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command month");

    let window = month_window(args, today)?;
    let candidates = store.tasks_for_window(window)?;
    let counts = counts_by_day(&candidates, window);
    renderer.print_month(window, &counts, cfg.week_start(), today)
}

#[instrument(skip(store, renderer, args))]
fn cmd_stats(
    store: &DataStore,
    renderer: &mut Renderer,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command stats");

    let window = month_window(args, today)?;
    let candidates = store.tasks_for_window(window)?;
    let stats = aggregate(&candidates, window);
    renderer.print_stats(window, &stats)
}

#[instrument(skip(store, now))]
fn cmd_seed(store: &DataStore, today: NaiveDate, now: DateTime<Utc>) -> anyhow::Result<()> {
    info!("command seed");

    let existing = store.load_all()?;
    if !existing.is_empty() {
        println!("Store already holds {} tasks; nothing seeded.", existing.len());
        return Ok(());
    }

    let mut tasks = sample_tasks(start_of_month(today), now)?;
    sort_by_schedule(&mut tasks);
    store.save_all(&tasks)?;
    println!("Seeded {} sample tasks.", tasks.len());
    Ok(())
}

#[instrument(skip(store))]
fn cmd_export(store: &DataStore) -> anyhow::Result<()> {
    info!("command export");

    let mut tasks = store.load_all()?;
    sort_by_schedule(&mut tasks);
    let out = serde_json::to_string(&tasks)?;
    println!("{out}");
    Ok(())
}

fn cmd_commands() -> anyhow::Result<()> {
    for command in known_command_names() {
        println!("{command}");
    }
    Ok(())
}

fn cmd_show(cfg: &Config) -> anyhow::Result<()> {
    let mut entries: Vec<_> = cfg.iter().collect();
    entries.sort();
    for (k, v) in entries {
        println!("{k}={v}");
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!("Usage: planner [-v|-q] [--rc KEY=VALUE] [--plannerrc PATH] [--data DIR] <command> [args]");
    println!();
    println!("  add <title> [day:EXPR] [start:HH:MM] [end:HH:MM] [category:X] [color:X] [repeat:RULE] [details:TEXT]");
    println!("  modify <id> [title] [mods]   done <id>   delete <id>   info <id>");
    println!("  list   day [EXPR]   month [MONTH]   stats [MONTH]");
    println!("  seed   export   _show   _commands   help   version");
    Ok(())
}

fn split_selector<'a>(
    args: &'a [String],
    command: &str,
) -> anyhow::Result<(&'a str, &'a [String])> {
    let (first, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("{command}: task id is required"))?;
    Ok((first.as_str(), rest))
}

fn select_task(store: &DataStore, selector: &str) -> anyhow::Result<TaskRecord> {
    let mut tasks = store.load_all()?;
    let idx = find_task_index(&tasks, selector)?;
    Ok(tasks.swap_remove(idx))
}

fn month_window(args: &[String], today: NaiveDate) -> anyhow::Result<DayWindow> {
    let month_start = match args.first() {
        Some(expr) => parse_month_expr(expr, today)?,
        None => start_of_month(today),
    };
    Ok(DayWindow::month_of(month_start))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_prefixes_resolve_only_when_unique() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("mo", &known), None);
        assert_eq!(expand_command_abbrev("mon", &known), Some("month"));
        assert_eq!(expand_command_abbrev("mod", &known), Some("modify"));
        assert_eq!(expand_command_abbrev("d", &known), None);
        assert_eq!(expand_command_abbrev("de", &known), Some("delete"));
        assert_eq!(expand_command_abbrev("st", &known), Some("stats"));
        assert_eq!(expand_command_abbrev("bogus", &known), None);
    }

    #[test]
    fn month_window_defaults_to_current_month() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 14).expect("date");
        let window = month_window(&[], today).expect("window");
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2024, 2, 1).expect("date"));
        assert_eq!(window.end, NaiveDate::from_ymd_opt(2024, 2, 29).expect("date"));

        let window = month_window(&["next".to_string()], today).expect("window");
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2024, 3, 1).expect("date"));
    }
}
