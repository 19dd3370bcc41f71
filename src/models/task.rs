use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ProjectId;

/// Store-assigned task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single to-do item.
///
/// Where a task lives on the board is decided entirely by its [`Placement`]
/// (`task_date`, `project_id`); see [`Home`] for the exclusive mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub content: String,
    #[serde(default)]
    pub task_date: Option<NaiveDate>,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub priority: Priority,
    /// Set by the store when the task is completed, cleared when reopened.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn placement(&self) -> Placement {
        Placement {
            task_date: self.task_date,
            project_id: self.project_id,
        }
    }

    pub fn home(&self) -> Home {
        self.placement().home()
    }

    /// Overwrite the placement fields, leaving everything else intact.
    pub fn place(&mut self, placement: Placement) {
        self.task_date = placement.task_date;
        self.project_id = placement.project_id;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown priority: {}", other)),
        }
    }
}

/// The pair of fields that decides which container a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub task_date: Option<NaiveDate>,
    pub project_id: Option<ProjectId>,
}

impl Placement {
    pub fn dated(date: NaiveDate, project_id: Option<ProjectId>) -> Self {
        Self {
            task_date: Some(date),
            project_id,
        }
    }

    pub fn backlog(project_id: Option<ProjectId>) -> Self {
        Self {
            task_date: None,
            project_id,
        }
    }

    pub fn home(&self) -> Home {
        match self.task_date {
            Some(date) => Home::Dated(date),
            None => Home::Backlog(self.project_id),
        }
    }
}

/// Exclusive classification of a placement.
///
/// A dated task lives in that day's list regardless of its project; an
/// undated task lives in its project's backlog, or the unassigned backlog
/// when it has no project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Home {
    Dated(NaiveDate),
    Backlog(Option<ProjectId>),
}

/// Input for creating a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskInput {
    pub content: String,
    #[serde(default)]
    pub task_date: Option<NaiveDate>,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

/// Input for `PUT /tasks/{id}`.
///
/// Placement is replaced wholesale: a missing `task_date` or `project_id`
/// clears it. `content` is always required by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTaskInput {
    pub content: String,
    #[serde(default)]
    pub task_date: Option<NaiveDate>,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl UpdateTaskInput {
    /// Request that moves `task` to `placement`, resending its content.
    pub fn relocate(task: &Task, placement: Placement) -> Self {
        Self {
            content: task.content.clone(),
            task_date: placement.task_date,
            project_id: placement.project_id,
            priority: None,
        }
    }

    pub fn placement(&self) -> Placement {
        Placement {
            task_date: self.task_date,
            project_id: self.project_id,
        }
    }
}
