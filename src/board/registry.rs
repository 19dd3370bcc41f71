//! Derivation of container membership from the flat task collection.
//!
//! Nothing here is stored: a [`ContainerRegistry`] borrows one snapshot of
//! tasks and projects and answers membership queries against it.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::models::*;

use super::container::ContainerId;

#[derive(Debug, Clone, Copy)]
pub struct ContainerRegistry<'a> {
    tasks: &'a [Task],
    projects: &'a [Project],
    viewed_date: NaiveDate,
}

impl<'a> ContainerRegistry<'a> {
    pub fn new(tasks: &'a [Task], projects: &'a [Project], viewed_date: NaiveDate) -> Self {
        Self {
            tasks,
            projects,
            viewed_date,
        }
    }

    pub fn viewed_date(&self) -> NaiveDate {
        self.viewed_date
    }

    pub fn tasks(&self) -> &'a [Task] {
        self.tasks
    }

    pub fn projects(&self) -> &'a [Project] {
        self.projects
    }

    pub fn task(&self, id: TaskId) -> Option<&'a Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn project(&self, id: ProjectId) -> Option<&'a Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// Tasks dated the viewed day.
    pub fn today(&self) -> Vec<&'a Task> {
        let date = self.viewed_date;
        self.select(|t| t.task_date == Some(date))
    }

    /// Undated tasks without a project.
    pub fn unassigned(&self) -> Vec<&'a Task> {
        self.select(|t| t.task_date.is_none() && t.project_id.is_none())
    }

    /// Undated tasks of `project_id`.
    pub fn project_backlog(&self, project_id: ProjectId) -> Vec<&'a Task> {
        self.select(|t| t.task_date.is_none() && t.project_id == Some(project_id))
    }

    pub fn members(&self, container: ContainerId) -> Vec<&'a Task> {
        match container {
            ContainerId::Today => self.today(),
            ContainerId::Unassigned => self.unassigned(),
            ContainerId::Project(id) => self.project_backlog(id),
            ContainerId::AiContext => Vec::new(),
        }
    }

    /// Whether `container` is a drop target in this snapshot.
    pub fn contains(&self, container: ContainerId) -> bool {
        match container {
            ContainerId::Project(id) => self.project(id).is_some(),
            ContainerId::Today | ContainerId::Unassigned | ContainerId::AiContext => true,
        }
    }

    /// The visible container holding `task`, if any. Tasks dated another day
    /// belong to that day's list and are not visible here.
    pub fn container_of(&self, task: &Task) -> Option<ContainerId> {
        match task.home() {
            Home::Dated(date) if date == self.viewed_date => Some(ContainerId::Today),
            Home::Dated(_) => None,
            Home::Backlog(project_id) => Some(ContainerId::backlog(project_id)),
        }
    }

    /// Every drop target, in display order: today, the unassigned backlog,
    /// one backlog per project, then the AI context target.
    pub fn drop_targets(&self) -> Vec<ContainerId> {
        let mut targets = vec![ContainerId::Today, ContainerId::Unassigned];
        targets.extend(self.projects.iter().map(|p| ContainerId::Project(p.id)));
        targets.push(ContainerId::AiContext);
        targets
    }

    /// Task containers with their members, ready for display.
    pub fn containers(&self, collapse: &CollapseState) -> Vec<ContainerView<'a>> {
        let mut views = vec![
            ContainerView {
                id: ContainerId::Today,
                label: self.viewed_date.format("%Y-%m-%d").to_string(),
                tasks: self.today(),
                expanded: true,
                project: None,
            },
            ContainerView {
                id: ContainerId::Unassigned,
                label: "Unassigned".to_string(),
                tasks: self.unassigned(),
                expanded: collapse.is_expanded(ContainerId::Unassigned),
                project: None,
            },
        ];

        views.extend(self.projects.iter().map(|project| {
            let id = ContainerId::Project(project.id);
            ContainerView {
                id,
                label: project.name.clone(),
                tasks: self.project_backlog(project.id),
                expanded: collapse.is_expanded(id),
                project: Some(project),
            }
        }));

        views
    }

    fn select(&self, keep: impl Fn(&Task) -> bool) -> Vec<&'a Task> {
        self.tasks.iter().filter(|t| keep(t)).collect()
    }
}

/// One container as shown on the board.
#[derive(Debug, Clone)]
pub struct ContainerView<'a> {
    pub id: ContainerId,
    pub label: String,
    pub tasks: Vec<&'a Task>,
    pub expanded: bool,
    /// Present for project backlogs; carries colour and stats for labelling.
    pub project: Option<&'a Project>,
}

/// Collapsed/expanded toggles of backlog sections. Containers start expanded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollapseState {
    collapsed: HashSet<ContainerId>,
}

impl CollapseState {
    pub fn is_expanded(&self, container: ContainerId) -> bool {
        !self.collapsed.contains(&container)
    }

    /// Flip the toggle and return the new expanded state.
    pub fn toggle(&mut self, container: ContainerId) -> bool {
        if !self.collapsed.remove(&container) {
            self.collapsed.insert(container);
        }
        self.is_expanded(container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn task(id: i64, task_date: Option<&str>, project_id: Option<i64>) -> Task {
        Task {
            id: TaskId(id),
            content: format!("task {id}"),
            task_date: task_date.map(date),
            project_id: project_id.map(ProjectId),
            is_completed: false,
            priority: Priority::Medium,
            completed_at: None,
        }
    }

    fn project(id: i64, name: &str) -> Project {
        Project {
            id: ProjectId(id),
            name: name.to_string(),
            color: DEFAULT_PROJECT_COLOR.to_string(),
            default_duration_minutes: DEFAULT_DURATION_MINUTES,
            stats: ProjectStats::default(),
        }
    }

    fn ids(tasks: Vec<&Task>) -> Vec<i64> {
        tasks.iter().map(|t| t.id.0).collect()
    }

    #[test]
    fn membership_follows_placement() {
        let tasks = vec![
            task(1, Some("2024-05-01"), None),
            task(2, Some("2024-05-01"), Some(7)),
            task(3, None, None),
            task(4, None, Some(7)),
            task(5, None, Some(8)),
            task(6, Some("2024-05-02"), None),
        ];
        let projects = vec![project(7, "Garden"), project(8, "Thesis")];
        let registry = ContainerRegistry::new(&tasks, &projects, date("2024-05-01"));

        assert_eq!(ids(registry.today()), vec![1, 2]);
        assert_eq!(ids(registry.unassigned()), vec![3]);
        assert_eq!(ids(registry.project_backlog(ProjectId(7))), vec![4]);
        assert_eq!(ids(registry.project_backlog(ProjectId(8))), vec![5]);
    }

    #[test]
    fn every_visible_task_has_exactly_one_container() {
        let tasks = vec![
            task(1, Some("2024-05-01"), Some(7)),
            task(2, None, None),
            task(3, None, Some(7)),
        ];
        let projects = vec![project(7, "Garden")];
        let registry = ContainerRegistry::new(&tasks, &projects, date("2024-05-01"));

        for t in &tasks {
            let holders: Vec<_> = registry
                .drop_targets()
                .into_iter()
                .filter(|c| registry.members(*c).iter().any(|m| m.id == t.id))
                .collect();
            assert_eq!(holders, vec![registry.container_of(t).unwrap()]);
        }
    }

    #[test]
    fn other_days_are_not_visible() {
        let tasks = vec![task(6, Some("2024-05-02"), None)];
        let registry = ContainerRegistry::new(&tasks, &[], date("2024-05-01"));
        assert_eq!(registry.container_of(&tasks[0]), None);
        assert!(registry.today().is_empty());
    }

    #[test]
    fn drop_targets_list_projects_in_order() {
        let projects = vec![project(2, "A"), project(1, "B")];
        let registry = ContainerRegistry::new(&[], &projects, date("2024-05-01"));
        assert_eq!(
            registry.drop_targets(),
            vec![
                ContainerId::Today,
                ContainerId::Unassigned,
                ContainerId::Project(ProjectId(2)),
                ContainerId::Project(ProjectId(1)),
                ContainerId::AiContext,
            ]
        );
        assert!(registry.contains(ContainerId::Project(ProjectId(1))));
        assert!(!registry.contains(ContainerId::Project(ProjectId(9))));
    }

    #[test]
    fn collapse_defaults_to_expanded_and_toggles() {
        let mut collapse = CollapseState::default();
        let garden = ContainerId::Project(ProjectId(7));
        assert!(collapse.is_expanded(garden));
        assert!(!collapse.toggle(garden));
        assert!(collapse.is_expanded(ContainerId::Unassigned));
        assert!(collapse.toggle(garden));
    }

    #[test]
    fn container_views_carry_collapse_state() {
        let tasks = vec![task(4, None, Some(7))];
        let projects = vec![project(7, "Garden")];
        let registry = ContainerRegistry::new(&tasks, &projects, date("2024-05-01"));
        let mut collapse = CollapseState::default();
        collapse.toggle(ContainerId::Project(ProjectId(7)));

        let views = registry.containers(&collapse);
        assert_eq!(views.len(), 3);
        let garden = &views[2];
        assert_eq!(garden.label, "Garden");
        assert!(!garden.expanded);
        assert_eq!(ids(garden.tasks.clone()), vec![4]);
        assert!(views[0].expanded);
    }
}
