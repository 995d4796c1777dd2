use std::collections::BTreeMap;
use std::io::{self, IsTerminal, Write};

use chrono::{Datelike, NaiveDate, Weekday};
use unicode_width::UnicodeWidthStr;

use crate::calendar::{DayWindow, add_days, start_of_week};
use crate::config::Config;
use crate::stats::MonthStats;
use crate::task::TaskRecord;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            color: cfg.color_enabled()?,
        })
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn print_task_table(&mut self, tasks: &[TaskRecord]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "ID".to_string(),
            "Day".to_string(),
            "Time".to_string(),
            "Repeat".to_string(),
            "Category".to_string(),
            "Title".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());
        for task in tasks {
            rows.push(vec![
                self.paint(&task.short_id(), "33"),
                task.anchor_day.format("%Y-%m-%d").to_string(),
                time_range(task),
                task.repeat_rule.to_string(),
                task.category.clone(),
                self.title_cell(task),
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn print_day(&mut self, day: NaiveDate, tasks: &[&TaskRecord]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", day_title(day))?;

        if tasks.is_empty() {
            writeln!(out, "No tasks.")?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "Time".to_string(),
            "Category".to_string(),
            "Color".to_string(),
            "Title".to_string(),
        ];
        let rows = tasks
            .iter()
            .map(|task| {
                vec![
                    self.paint(&task.short_id(), "33"),
                    time_range(task),
                    task.category.clone(),
                    task.color_tag.clone(),
                    self.title_cell(task),
                ]
            })
            .collect();
        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, counts))]
    pub fn print_month(
        &mut self,
        window: DayWindow,
        counts: &BTreeMap<NaiveDate, usize>,
        week_start: Weekday,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let highlight = self.color && io::stdout().is_terminal();
        write_month(&mut out, window, counts, week_start, highlight.then_some(today))
    }

    #[tracing::instrument(skip(self, stats))]
    pub fn print_stats(&mut self, window: DayWindow, stats: &MonthStats) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        write_stats(&mut out, window, stats)
    }

    #[tracing::instrument(skip(self, task))]
    pub fn print_task_info(&mut self, task: &TaskRecord) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id        {}", task.id)?;
        writeln!(out, "title     {}", task.title)?;
        writeln!(out, "done      {}", if task.is_done { "yes" } else { "no" })?;
        writeln!(out, "day       {}", task.anchor_day.format("%Y-%m-%d"))?;
        writeln!(out, "time      {}", time_range(task))?;
        writeln!(out, "repeat    {}", task.repeat_rule)?;
        writeln!(out, "category  {}", task.category)?;
        writeln!(out, "color     {}", task.color_tag)?;
        if let Some(details) = &task.details {
            writeln!(out, "details   {details}")?;
        }
        writeln!(out, "created   {}", task.created_at.format("%Y%m%dT%H%M%SZ"))?;

        Ok(())
    }

    fn title_cell(&self, task: &TaskRecord) -> String {
        if task.is_done {
            self.paint(&format!("{} (done)", task.title), "2")
        } else {
            task.title.clone()
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

/// `"3h 15m"`, minutes rounded down.
pub fn format_hours_minutes(seconds: i64) -> String {
    let total_minutes = seconds.max(0) / 60;
    format!("{}h {}m", total_minutes / 60, total_minutes % 60)
}

pub fn format_percent(fraction: f64) -> String {
    format!("{:.0}%", fraction * 100.0)
}

/// `"February 2024"`
pub fn month_title(day: NaiveDate) -> String {
    day.format("%B %Y").to_string()
}

/// `"Thu 1"`
pub fn day_title(day: NaiveDate) -> String {
    day.format("%a %-d").to_string()
}

fn time_range(task: &TaskRecord) -> String {
    format!(
        "{}-{}",
        task.start_time.format("%H:%M"),
        task.end_time.format("%H:%M")
    )
}

/// Weeks of the month grid, each starting on `week_start`; cells outside
/// the window are `None`.
pub fn month_grid(window: DayWindow, week_start: Weekday) -> Vec<[Option<NaiveDate>; 7]> {
    let mut weeks = Vec::new();
    let mut cursor = start_of_week(window.start, week_start);
    while cursor <= window.end {
        let mut week = [None; 7];
        for (offset, cell) in week.iter_mut().enumerate() {
            let day = add_days(cursor, offset as i64);
            if window.contains(day) {
                *cell = Some(day);
            }
        }
        weeks.push(week);
        cursor = add_days(cursor, 7);
    }
    weeks
}

pub fn write_month<W: Write>(
    mut writer: W,
    window: DayWindow,
    counts: &BTreeMap<NaiveDate, usize>,
    week_start: Weekday,
    today: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let weeks: Vec<[Option<(NaiveDate, String)>; 7]> = month_grid(window, week_start)
        .into_iter()
        .map(|week| week.map(|cell| cell.map(|day| (day, day_label(day, counts)))))
        .collect();
    // Seven columns minimum, and never less than one space between cells.
    let widest = weeks
        .iter()
        .flatten()
        .flatten()
        .map(|(_, label)| label.len())
        .max()
        .unwrap_or(0);
    let width = widest.max(6) + 1;

    writeln!(writer, "{}", month_title(window.start))?;

    let mut weekday = week_start;
    for _ in 0..7 {
        write!(writer, "{:<width$}", weekday_label(weekday))?;
        weekday = weekday.succ();
    }
    writeln!(writer)?;

    for week in &weeks {
        let line = week
            .iter()
            .map(|cell| match cell {
                Some((day, label)) => {
                    let padded = format!("{label:<width$}");
                    if today == Some(*day) {
                        format!("\x1b[7m{}\x1b[0m{}", label, &padded[label.len()..])
                    } else {
                        padded
                    }
                }
                None => " ".repeat(width),
            })
            .collect::<String>();
        writeln!(writer, "{}", line.trim_end())?;
    }

    Ok(())
}

fn day_label(day: NaiveDate, counts: &BTreeMap<NaiveDate, usize>) -> String {
    match counts.get(&day) {
        Some(count) => format!("{:>2}({count})", day.day()),
        None => format!("{:>2}", day.day()),
    }
}

pub fn write_stats<W: Write>(
    mut writer: W,
    window: DayWindow,
    stats: &MonthStats,
) -> anyhow::Result<()> {
    writeln!(writer, "{}", month_title(window.start))?;
    writeln!(writer, "Total {}", format_hours_minutes(stats.total_seconds))?;

    if stats.categories.is_empty() {
        writeln!(writer, "No tracked time.")?;
        return Ok(());
    }

    let headers = vec![
        "Category".to_string(),
        "Time".to_string(),
        "Hours".to_string(),
        "Share".to_string(),
        "Color".to_string(),
    ];
    let rows = stats
        .categories
        .iter()
        .map(|row| {
            vec![
                row.name.clone(),
                format_hours_minutes(row.seconds),
                format!("{:.1}", row.hours()),
                format_percent(row.percent),
                row.color_tag.clone(),
            ]
        })
        .collect();
    write_table(writer, headers, rows)
}

fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
