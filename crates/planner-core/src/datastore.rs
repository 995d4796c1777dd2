use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use uuid::Uuid;

use crate::calendar::DayWindow;
use crate::task::TaskRecord;

/// Query surface the engine reads from.
pub trait TaskStore {
    fn load_all(&self) -> anyhow::Result<Vec<TaskRecord>>;

    /// Records that can occur inside `window`: one-off tasks anchored in it
    /// and repeating tasks anchored on or before its end, ordered by
    /// `(anchor_day, start_time)`.
    fn tasks_for_window(&self, window: DayWindow) -> anyhow::Result<Vec<TaskRecord>> {
        let mut tasks: Vec<TaskRecord> = self
            .load_all()?
            .into_iter()
            .filter(|task| is_window_candidate(task, window))
            .collect();
        sort_by_schedule(&mut tasks);
        debug!(
            start = %window.start,
            end = %window.end,
            count = tasks.len(),
            "selected window candidates"
        );
        Ok(tasks)
    }
}

pub fn is_window_candidate(task: &TaskRecord, window: DayWindow) -> bool {
    window.contains(task.anchor_day)
        || (task.repeat_rule.is_repeating() && task.anchor_day <= window.end)
}

pub fn sort_by_schedule(tasks: &mut [TaskRecord]) {
    tasks.sort_by_key(|task| (task.anchor_day, task.start_time));
}

/// Index of the single task whose id starts with `selector`.
pub fn find_task_index(tasks: &[TaskRecord], selector: &str) -> anyhow::Result<usize> {
    let needle = selector.trim().to_ascii_lowercase().replace('-', "");
    if needle.is_empty() {
        return Err(anyhow!("task id is required"));
    }

    let mut matches = tasks
        .iter()
        .enumerate()
        .filter(|(_, task)| task.id.simple().to_string().starts_with(&needle))
        .map(|(idx, _)| idx);

    let first = matches
        .next()
        .ok_or_else(|| anyhow!("no task matches id {selector}"))?;
    if matches.next().is_some() {
        return Err(anyhow!("task id {selector} is ambiguous; use more characters"));
    }
    Ok(first)
}

/// Tasks held in memory by the caller.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub tasks: Vec<TaskRecord>,
}

impl MemoryStore {
    pub fn new(tasks: Vec<TaskRecord>) -> Self {
        Self { tasks }
    }
}

impl TaskStore for MemoryStore {
    fn load_all(&self) -> anyhow::Result<Vec<TaskRecord>> {
        Ok(self.tasks.clone())
    }
}

#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub tasks_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let tasks_path = data_dir.join("tasks.data");
        if !tasks_path.exists() {
            fs::write(&tasks_path, "")
                .with_context(|| format!("failed to create {}", tasks_path.display()))?;
        }

        info!(
            data_dir = %data_dir.display(),
            tasks = %tasks_path.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            tasks_path,
        })
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn save_all(&self, tasks: &[TaskRecord]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.tasks_path, tasks).context("failed to save tasks.data")
    }

    #[tracing::instrument(skip(self, task), fields(id = %task.id))]
    pub fn add_task(&self, task: TaskRecord) -> anyhow::Result<Vec<TaskRecord>> {
        let mut tasks = self.load_all()?;
        tasks.push(task);
        sort_by_schedule(&mut tasks);
        self.save_all(&tasks)?;
        Ok(tasks)
    }

    /// Replaces the stored record with the same id.
    #[tracing::instrument(skip(self, task), fields(id = %task.id))]
    pub fn update_task(&self, task: TaskRecord) -> anyhow::Result<()> {
        let mut tasks = self.load_all()?;
        let slot = tasks
            .iter_mut()
            .find(|existing| existing.id == task.id)
            .ok_or_else(|| anyhow!("task not found: {}", task.id))?;
        *slot = task;
        sort_by_schedule(&mut tasks);
        self.save_all(&tasks)
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn delete_task(&self, id: Uuid) -> anyhow::Result<TaskRecord> {
        let mut tasks = self.load_all()?;
        let idx = tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| anyhow!("task not found: {id}"))?;
        let removed = tasks.remove(idx);
        self.save_all(&tasks)?;
        Ok(removed)
    }
}

impl TaskStore for DataStore {
    #[tracing::instrument(skip(self))]
    fn load_all(&self) -> anyhow::Result<Vec<TaskRecord>> {
        load_jsonl(&self.tasks_path).context("failed to load tasks.data")
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl(path: &Path) -> anyhow::Result<Vec<TaskRecord>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let task: TaskRecord = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(task);
    }

    debug!(count = out.len(), "loaded tasks from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, tasks))]
fn save_jsonl_atomic(path: &Path, tasks: &[TaskRecord]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = tasks.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for task in tasks {
        let serialized = serde_json::to_string(task)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
