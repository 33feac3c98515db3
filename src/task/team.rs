#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use crate::task::model::{Task, TeamMember};

/// Distinct assignees across `tasks`, with how many tasks each holds. Sorted by name, then id.
#[must_use]
pub fn team_members(tasks: &[Task]) -> Vec<TeamMember> {
    let mut by_id: BTreeMap<&str, TeamMember> = BTreeMap::new();
    for user in tasks.iter().filter_map(|t| t.assignee.as_ref()) {
        by_id
            .entry(user.id.as_str())
            .and_modify(|m| m.tasks_count += 1)
            .or_insert_with(|| TeamMember {
                id: user.id.clone(),
                name: user.name.clone(),
                email: user.email.clone(),
                tasks_count: 1,
            });
    }
    let mut members: Vec<TeamMember> = by_id.into_values().collect();
    members.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });
    members
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::model::{TaskPriority, TaskStatus, User};

    fn assigned(name: &str, id: &str) -> Task {
        let mut t = Task::new("t", TaskStatus::Todo, TaskPriority::Low);
        t.assignee = Some(User {
            id: id.to_owned(),
            name: name.to_owned(),
            email: format!("{id}@example.com"),
        });
        t
    }

    #[test]
    fn groups_by_assignee_and_counts() {
        let tasks = vec![
            assigned("zoe", "u2"),
            assigned("Ana", "u1"),
            Task::new("unassigned", TaskStatus::Todo, TaskPriority::Low),
            assigned("zoe", "u2"),
        ];
        let members = team_members(&tasks);
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].name, "Ana");
        assert_eq!(members[0].tasks_count, 1);
        assert_eq!(members[1].id, "u2");
        assert_eq!(members[1].tasks_count, 2);
    }
}
