#![forbid(unsafe_code)]

use crate::task::model::{Task, TaskPriority, TaskStatus};

/// Narrowing criteria for task listings. Empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilters {
    pub project_id: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    /// Matches the assignee's id, name or email (case-insensitive).
    pub assignee: Option<String>,
    pub search: Option<String>,
}

impl TaskFilters {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.project_id.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.assignee.is_none()
            && self.search.as_deref().is_none_or(|s| s.trim().is_empty())
    }

    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(project) = self.project_id.as_deref()
            && task.project_id.as_deref() != Some(project)
        {
            return false;
        }
        if self.status.is_some_and(|s| s != task.status) {
            return false;
        }
        if self.priority.is_some_and(|p| p != task.priority) {
            return false;
        }
        if let Some(who) = self.assignee.as_deref() {
            let who = who.trim().to_lowercase();
            let Some(user) = &task.assignee else {
                return false;
            };
            let hit = user.id.to_lowercase() == who
                || user.name.to_lowercase().contains(&who)
                || user.email.to_lowercase() == who;
            if !hit {
                return false;
            }
        }
        if let Some(needle) = self.search.as_deref() {
            let needle = needle.trim().to_lowercase();
            if !needle.is_empty() && !task_matches_query(task, &needle) {
                return false;
            }
        }
        true
    }

    #[must_use]
    pub fn apply(&self, tasks: Vec<Task>) -> Vec<Task> {
        if self.is_empty() {
            return tasks;
        }
        tasks.into_iter().filter(|t| self.matches(t)).collect()
    }
}

/// `needle` must already be lowercased.
#[must_use]
pub fn task_matches_query(t: &Task, needle: &str) -> bool {
    if needle.trim().is_empty() {
        return true;
    }
    let description = t.description.as_deref().unwrap_or("");

    t.id.to_lowercase().contains(needle)
        || t.title.to_lowercase().contains(needle)
        || description.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::model::User;

    fn sample() -> Vec<Task> {
        let mut a = Task::new("Fix login redirect", TaskStatus::Todo, TaskPriority::High);
        a.id = "a1".to_owned();
        a.project_id = Some("web".to_owned());
        a.assignee = Some(User {
            id: "u1".to_owned(),
            name: "Ana Ruiz".to_owned(),
            email: "ana@example.com".to_owned(),
        });

        let mut b = Task::new("Write release notes", TaskStatus::Completed, TaskPriority::Low);
        b.id = "b2".to_owned();
        b.description = Some("Summarize the LOGIN changes".to_owned());

        vec![a, b]
    }

    #[test]
    fn empty_filters_keep_everything() {
        let f = TaskFilters::default();
        assert!(f.is_empty());
        assert_eq!(f.apply(sample()).len(), 2);
    }

    #[test]
    fn search_covers_title_and_description() {
        let f = TaskFilters {
            search: Some("login".to_owned()),
            ..TaskFilters::default()
        };
        assert_eq!(f.apply(sample()).len(), 2);

        let f = TaskFilters {
            search: Some("release".to_owned()),
            ..TaskFilters::default()
        };
        let ids: Vec<String> = f.apply(sample()).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, ["b2"]);
    }

    #[test]
    fn structured_filters_combine() {
        let f = TaskFilters {
            status: Some(TaskStatus::Todo),
            priority: Some(TaskPriority::High),
            project_id: Some("web".to_owned()),
            assignee: Some("ana".to_owned()),
            search: None,
        };
        let ids: Vec<String> = f.apply(sample()).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, ["a1"]);

        let f = TaskFilters {
            assignee: Some("bob".to_owned()),
            ..TaskFilters::default()
        };
        assert!(f.apply(sample()).is_empty());
    }
}
