#![forbid(unsafe_code)]

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::TaskboardError;
use crate::task::model::{Project, Task, TaskStatus, now_rfc3339};

/// A record persisted as one JSON file named `<PREFIX>-<id>.json`.
pub trait Record: Serialize + DeserializeOwned {
    const PREFIX: &'static str;

    fn id(&self) -> &str;

    /// Listing order. Defaults to id order.
    fn sort_records(records: &mut [Self]) {
        records.sort_by(|a, b| a.id().cmp(b.id()));
    }
}

impl Record for Task {
    const PREFIX: &'static str = "task";

    fn id(&self) -> &str {
        &self.id
    }

    fn sort_records(records: &mut [Self]) {
        records.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
    }
}

impl Record for Project {
    const PREFIX: &'static str = "project";

    fn id(&self) -> &str {
        &self.id
    }

    fn sort_records(records: &mut [Self]) {
        records.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    }
}

#[derive(Debug)]
pub struct RecordStore<R> {
    dir: PathBuf,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for RecordStore<R> {
    fn clone(&self) -> Self {
        Self::new(self.dir.clone())
    }
}

pub type TaskStorage = RecordStore<Task>;
pub type ProjectStorage = RecordStore<Project>;

impl<R> RecordStore<R> {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            _record: PhantomData,
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl<R: Record> RecordStore<R> {
    pub fn ensure_dir(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {} dir {}", R::PREFIX, self.dir.display()))
    }

    pub fn save(&self, record: &R) -> anyhow::Result<()> {
        self.ensure_dir()?;
        let path = self.record_path(record.id())?;
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(record)?;
        std::fs::write(&tmp, &data)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("failed to rename {} -> {}", tmp.display(), path.display()))?;
        Ok(())
    }

    pub fn load(&self, id: &str) -> anyhow::Result<R> {
        let path = self.record_path(id)?;
        let data =
            std::fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        let record: R = serde_json::from_slice(&data)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(record)
    }

    pub fn list(&self) -> anyhow::Result<Vec<R>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let prefix = format!("{}-", R::PREFIX);
        let mut records: Vec<R> = Vec::new();
        for entry in std::fs::read_dir(&self.dir)
            .with_context(|| format!("failed to read {}", self.dir.display()))?
        {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let is_ours = path
                .file_name()
                .and_then(|s| s.to_str())
                .is_some_and(|n| n.starts_with(&prefix));
            if !is_ours {
                continue;
            }
            let Ok(data) = std::fs::read(&path) else {
                tracing::warn!(path = %path.display(), "skipping unreadable record");
                continue;
            };
            let Ok(record) = serde_json::from_slice(&data) else {
                tracing::warn!(path = %path.display(), "skipping malformed record");
                continue;
            };
            records.push(record);
        }
        R::sort_records(&mut records);
        Ok(records)
    }

    pub fn delete(&self, id: &str) -> anyhow::Result<()> {
        if !self.dir.exists() {
            return Ok(());
        }
        let path = self.record_path(id)?;
        let _ = std::fs::remove_file(path);
        Ok(())
    }

    fn record_path(&self, id: &str) -> anyhow::Result<PathBuf> {
        validate_id(id)?;
        Ok(self.dir.join(format!("{}-{id}.json", R::PREFIX)))
    }
}

impl RecordStore<Task> {
    /// Persists a new status for a task and returns the updated record.
    pub fn update_status(&self, id: &str, status: TaskStatus) -> anyhow::Result<Task> {
        let mut task = self.load(id)?;
        task.status = status;
        task.updated_at = now_rfc3339();
        self.save(&task)?;
        Ok(task)
    }
}

fn validate_id(id: &str) -> Result<(), TaskboardError> {
    if id.trim().is_empty() {
        return Err(TaskboardError::InvalidId {
            id: id.to_owned(),
            reason: "ID is required",
        });
    }
    if id.contains('/') || id.contains('\\') {
        return Err(TaskboardError::InvalidId {
            id: id.to_owned(),
            reason: "must not contain path separators",
        });
    }
    if id.contains("..") {
        return Err(TaskboardError::InvalidId {
            id: id.to_owned(),
            reason: "must not contain '..'",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::model::TaskPriority;

    fn task(id: &str, priority: TaskPriority, created_at: &str) -> Task {
        let mut t = Task::new(format!("task {id}"), TaskStatus::Todo, priority);
        t.id = id.to_owned();
        t.created_at = created_at.to_owned();
        t
    }

    #[test]
    fn save_list_and_delete() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = TaskStorage::new(dir.path().join("tasks"));

        assert!(storage.list().unwrap().is_empty());

        storage
            .save(&task("a", TaskPriority::Low, "2025-01-01T00:00:00Z"))
            .unwrap();
        storage
            .save(&task("b", TaskPriority::Urgent, "2025-01-03T00:00:00Z"))
            .unwrap();
        storage
            .save(&task("c", TaskPriority::Urgent, "2025-01-02T00:00:00Z"))
            .unwrap();

        let ids: Vec<String> = storage.list().unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, ["c", "b", "a"]);

        storage.delete("b").unwrap();
        assert_eq!(storage.list().unwrap().len(), 2);
        assert!(storage.load("b").is_err());
    }

    #[test]
    fn update_status_persists_and_stamps() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = TaskStorage::new(dir.path().to_path_buf());
        let mut t = task("x1", TaskPriority::Medium, "2025-01-01T00:00:00Z");
        t.updated_at = "2000-01-01T00:00:00Z".to_owned();
        storage.save(&t).unwrap();

        let updated = storage.update_status("x1", TaskStatus::Completed).unwrap();
        assert_eq!(updated.status, TaskStatus::Completed);
        assert_ne!(updated.updated_at, "2000-01-01T00:00:00Z");
        assert_eq!(storage.load("x1").unwrap().status, TaskStatus::Completed);

        assert!(storage.update_status("missing", TaskStatus::Todo).is_err());
    }

    #[test]
    fn list_skips_foreign_and_malformed_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tasks = TaskStorage::new(dir.path().to_path_buf());
        let projects = ProjectStorage::new(dir.path().to_path_buf());

        tasks
            .save(&task("ok", TaskPriority::Low, "2025-01-01T00:00:00Z"))
            .unwrap();
        projects.save(&Project::new("Website", "")).unwrap();
        std::fs::write(dir.path().join("task-broken.json"), b"{nope").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hi").unwrap();

        assert_eq!(tasks.list().unwrap().len(), 1);
        assert_eq!(projects.list().unwrap().len(), 1);
    }

    #[test]
    fn rejects_path_like_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = TaskStorage::new(dir.path().to_path_buf());
        assert!(storage.load("../etc").is_err());
        assert!(storage.load("a/b").is_err());
        assert!(storage.delete(" ").is_err());
    }
}
