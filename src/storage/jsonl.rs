//! JSONL storage for tasks
//!
//! Tasks are stored in `.ganttiek/tasks.jsonl` with one JSON object per line.
//! Later lines replace earlier lines with the same ID, so appends double as
//! updates until the next full rewrite. Uses file locking for concurrent
//! access safety.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use crate::domain::{Task, TaskId};

/// Store for task data in JSONL format
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    /// Creates a new task store at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates the default store for a project
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(".ganttiek").join("tasks.jsonl"))
    }

    /// Returns the path to the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all tasks from the store
    pub fn read_all(&self) -> Result<HashMap<TaskId, Task>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open task store: {}", self.path.display()))?;

        // Acquire shared lock for reading
        file.lock_shared()
            .context("Failed to acquire read lock on task store")?;

        let reader = BufReader::new(&file);
        let mut tasks = HashMap::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;

            if line.trim().is_empty() {
                continue;
            }

            let task: Task = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse task at line {}", line_num + 1))?;

            tasks.insert(task.id.clone(), task);
        }

        // Lock is released when file is dropped
        Ok(tasks)
    }

    /// Reads all tasks sorted by ID
    pub fn list(&self) -> Result<Vec<Task>> {
        let mut tasks: Vec<_> = self.read_all()?.into_values().collect();
        tasks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tasks)
    }

    /// Looks up a single task
    pub fn get(&self, task_id: &TaskId) -> Result<Option<Task>> {
        Ok(self.read_all()?.remove(task_id))
    }

    /// Writes all tasks to the store (full rewrite)
    pub fn write_all(&self, tasks: &HashMap<TaskId, Task>) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        // Write to temp file first
        let temp_path = self.path.with_extension("jsonl.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            // Acquire exclusive lock
            file.lock_exclusive()
                .context("Failed to acquire write lock on task store")?;

            let mut writer = BufWriter::new(&file);

            // Sort by ID for consistent output
            let mut sorted: Vec<_> = tasks.values().collect();
            sorted.sort_by(|a, b| a.id.cmp(&b.id));

            for task in sorted {
                let line = serde_json::to_string(task).context("Failed to serialize task")?;
                writeln!(writer, "{}", line).context("Failed to write task")?;
            }

            writer.flush().context("Failed to flush task store")?;
        }

        // Atomic rename
        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        Ok(())
    }

    /// Appends a single task (used for quick adds without full rewrite)
    pub fn append(&self, task: &Task) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open task store: {}", self.path.display()))?;

        // Acquire exclusive lock
        file.lock_exclusive()
            .context("Failed to acquire write lock on task store")?;

        let mut writer = BufWriter::new(&file);
        let line = serde_json::to_string(task).context("Failed to serialize task")?;
        writeln!(writer, "{}", line).context("Failed to write task")?;

        writer.flush().context("Failed to flush task store")?;

        Ok(())
    }

    /// Updates a single task (reads all, updates, writes all)
    pub fn update(&self, task: &Task) -> Result<()> {
        let mut tasks = self.read_all()?;
        tasks.insert(task.id.clone(), task.clone());
        self.write_all(&tasks)
    }

    /// Removes a task by ID and detaches its successors
    ///
    /// Successors lose their predecessor and lag so no link is left dangling.
    /// Returns the IDs of the detached successors, or `None` if the task did
    /// not exist.
    pub fn remove(&self, task_id: &TaskId) -> Result<Option<Vec<TaskId>>> {
        let mut tasks = self.read_all()?;
        if tasks.remove(task_id).is_none() {
            return Ok(None);
        }

        let mut detached = Vec::new();
        for task in tasks.values_mut() {
            if task.predecessor.id() == Some(task_id) {
                task.clear_predecessor();
                detached.push(task.id.clone());
            }
        }
        detached.sort();

        self.write_all(&tasks)?;
        Ok(Some(detached))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    fn make_task(key: &str) -> Task {
        let start = Utc.with_ymd_and_hms(2025, 2, 3, 0, 0, 0).unwrap();
        Task::new(key.parse().unwrap(), format!("Task {}", key), start, start + Duration::days(2))
    }

    #[test]
    fn read_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.jsonl"));

        let tasks = store.read_all().unwrap();
        assert!(tasks.is_empty());
    }

    #[test]
    fn write_and_read_tasks() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.jsonl"));

        let task1 = make_task("t-1");
        let task2 = make_task("t-2").after(task1.id.clone(), 1);

        let mut tasks = HashMap::new();
        tasks.insert(task1.id.clone(), task1.clone());
        tasks.insert(task2.id.clone(), task2.clone());

        store.write_all(&tasks).unwrap();

        let loaded = store.read_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get(&task1.id), Some(&task1));
        assert_eq!(loaded.get(&task2.id), Some(&task2));
    }

    #[test]
    fn list_is_sorted_by_id() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.jsonl"));

        store.append(&make_task("t-b")).unwrap();
        store.append(&make_task("t-a")).unwrap();

        let ids: Vec<_> = store.list().unwrap().into_iter().map(|t| t.id.to_string()).collect();
        assert_eq!(ids, vec!["t-a", "t-b"]);
    }

    #[test]
    fn later_lines_replace_earlier_ones() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.jsonl"));

        let mut task = make_task("t-1");
        store.append(&task).unwrap();
        task.name = "Renamed".to_string();
        store.append(&task).unwrap();

        let loaded = store.get(&task.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Renamed");
    }

    #[test]
    fn update_task() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.jsonl"));

        let mut task = make_task("t-1");
        store.append(&task).unwrap();

        task.lag = 3;
        store.update(&task).unwrap();

        let loaded = store.read_all().unwrap();
        assert_eq!(loaded.get(&task.id).unwrap().lag, 3);
    }

    #[test]
    fn remove_task_detaches_successors() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.jsonl"));

        let first = make_task("t-1");
        let second = make_task("t-2").after(first.id.clone(), 2);
        let other = make_task("t-3");
        store.append(&first).unwrap();
        store.append(&second).unwrap();
        store.append(&other).unwrap();

        let detached = store.remove(&first.id).unwrap();
        assert_eq!(detached, Some(vec![second.id.clone()]));

        let loaded = store.read_all().unwrap();
        assert_eq!(loaded.len(), 2);
        let second = loaded.get(&second.id).unwrap();
        assert!(second.predecessor.is_none());
        assert_eq!(second.lag, 0);
    }

    #[test]
    fn remove_missing_task() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.jsonl"));

        assert_eq!(store.remove(&"t-9".parse().unwrap()).unwrap(), None);
    }

    #[test]
    fn creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("nested").join("dir").join("tasks.jsonl"));

        store.append(&make_task("t-1")).unwrap();

        assert!(store.path().exists());
    }

    #[test]
    fn atomic_write() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.jsonl"));

        let task = make_task("t-1");
        let mut tasks = HashMap::new();
        tasks.insert(task.id.clone(), task.clone());
        store.write_all(&tasks).unwrap();

        // Temp file should not exist after write
        let temp_path = store.path().with_extension("jsonl.tmp");
        assert!(!temp_path.exists());
    }

    #[test]
    fn malformed_line_reports_position() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.jsonl");
        fs::write(&path, "\n{not json}\n").unwrap();

        let err = TaskStore::new(&path).read_all().unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }
}
