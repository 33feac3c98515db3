#![forbid(unsafe_code)]

use serde::Serialize;

use crate::task::model::{Project, ProjectStatus, Task, TaskStatus};

/// Aggregate counters shown on the dashboard.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    /// Everything not yet completed.
    pub pending_tasks: usize,
    pub overdue_tasks: usize,
    pub todo_tasks: usize,
    pub in_progress_tasks: usize,
    pub total_projects: usize,
    pub active_projects: usize,
}

impl DashboardStats {
    #[must_use]
    pub fn collect(tasks: &[Task], projects: &[Project], today: time::Date) -> Self {
        let mut stats = Self {
            total_tasks: tasks.len(),
            total_projects: projects.len(),
            ..Self::default()
        };
        for t in tasks {
            match t.status {
                TaskStatus::Todo => stats.todo_tasks += 1,
                TaskStatus::InProgress => stats.in_progress_tasks += 1,
                TaskStatus::Completed => stats.completed_tasks += 1,
            }
            if t.is_overdue(today) {
                stats.overdue_tasks += 1;
            }
        }
        stats.pending_tasks = stats.total_tasks - stats.completed_tasks;
        stats.active_projects = projects
            .iter()
            .filter(|p| p.status == ProjectStatus::Active)
            .count();
        stats
    }

    /// Completed share in whole percent; 0 for an empty board.
    #[must_use]
    pub fn completion_percent(&self) -> u16 {
        if self.total_tasks == 0 {
            return 0;
        }
        let pct = self.completed_tasks * 100 / self.total_tasks;
        u16::try_from(pct).unwrap_or(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::model::{TaskPriority, parse_date};

    #[test]
    fn counts_statuses_overdue_and_projects() {
        let today = parse_date("2025-03-15").unwrap();

        let mut late = Task::new("late", TaskStatus::InProgress, TaskPriority::High);
        late.due_date = Some("2025-03-01".to_owned());
        let mut late_but_done = Task::new("done", TaskStatus::Completed, TaskPriority::Low);
        late_but_done.due_date = Some("2025-03-01".to_owned());
        let fresh = Task::new("fresh", TaskStatus::Todo, TaskPriority::Medium);

        let mut paused = Project::new("Mobile", "");
        paused.status = ProjectStatus::OnHold;
        let projects = vec![Project::new("Web", ""), paused];

        let stats = DashboardStats::collect(&[late, late_but_done, fresh], &projects, today);
        assert_eq!(stats.total_tasks, 3);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.pending_tasks, 2);
        assert_eq!(stats.overdue_tasks, 1);
        assert_eq!(stats.todo_tasks, 1);
        assert_eq!(stats.in_progress_tasks, 1);
        assert_eq!(stats.total_projects, 2);
        assert_eq!(stats.active_projects, 1);
        assert_eq!(stats.completion_percent(), 33);
    }

    #[test]
    fn empty_inputs_are_all_zero() {
        let stats = DashboardStats::collect(&[], &[], parse_date("2025-01-01").unwrap());
        assert_eq!(stats, DashboardStats::default());
        assert_eq!(stats.completion_percent(), 0);
    }
}
