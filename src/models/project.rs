use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned project identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub i64);

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub const DEFAULT_PROJECT_COLOR: &str = "#4a90d9";
pub const DEFAULT_DURATION_MINUTES: u32 = 25;

/// How long a project may go without a completed task before it is flagged.
pub const RUST_AFTER_DAYS: i64 = 5;

/// A project owning a backlog of undated tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub color: String,
    pub default_duration_minutes: u32,
    /// Computed by the store; read-only on the client.
    #[serde(default)]
    pub stats: ProjectStats,
}

/// Momentum figures derived from a project's task completion history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStats {
    pub progress_percent: u8,
    pub is_rusting: bool,
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
}

impl ProjectStats {
    /// A project rusts when nothing was completed within [`RUST_AFTER_DAYS`],
    /// or when it has tasks but none was ever completed.
    pub fn compute(
        total: u32,
        completed: u32,
        last_activity: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        let progress_percent = if total == 0 {
            0
        } else {
            (completed.min(total) * 100 / total) as u8
        };

        let is_rusting = match last_activity {
            Some(at) => at < now - Duration::days(RUST_AFTER_DAYS),
            None => total > 0,
        };

        Self {
            progress_percent,
            is_rusting,
            last_activity,
        }
    }
}

/// Input for creating a new project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectInput {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub default_duration_minutes: Option<u32>,
}
