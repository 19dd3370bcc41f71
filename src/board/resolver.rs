//! Translation of a finished drag into a placement change.

use thiserror::Error;

use crate::models::*;

use super::container::ContainerId;
use super::registry::ContainerRegistry;

/// A completed drag, already parsed at the interface boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragEvent {
    pub source: ContainerId,
    pub destination: ContainerId,
    pub task_id: TaskId,
}

impl DragEvent {
    pub fn new(source: ContainerId, destination: ContainerId, task_id: TaskId) -> Self {
        Self {
            source,
            destination,
            task_id,
        }
    }

    /// Build from raw drag-and-drop identifiers.
    pub fn parse(source: &str, destination: &str, task_id: TaskId) -> Result<Self, ResolveError> {
        Ok(Self::new(source.parse()?, destination.parse()?, task_id))
    }
}

/// The task a chat conversation is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveContext {
    pub task_id: TaskId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Nothing to persist.
    NoOp,
    /// Dropped on the AI target; the task itself is untouched.
    RouteToAi(ActiveContext),
    /// New placement to persist.
    Mutation(Placement),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("invalid container: {0}")]
    InvalidContainer(String),

    #[error("task {0} is not on the board")]
    UnknownTask(TaskId),
}

/// Decide what a drop means. Rules apply in order:
///
/// 1. AI target: route the task to the chat context.
/// 2. Same container: nothing to do. Reordering is not persisted.
/// 3. Today: date it the viewed day and keep its project.
/// 4. A backlog: clear the date and take the backlog's project (none for unassigned).
pub fn resolve(
    event: &DragEvent,
    registry: &ContainerRegistry<'_>,
) -> Result<Resolution, ResolveError> {
    if event.destination == ContainerId::AiContext {
        let task = lookup(event.task_id, registry)?;
        return Ok(Resolution::RouteToAi(ActiveContext {
            task_id: task.id,
            title: task.content.clone(),
        }));
    }

    if event.source == ContainerId::AiContext {
        return Err(ResolveError::InvalidContainer(event.source.to_string()));
    }

    if event.source == event.destination {
        return Ok(Resolution::NoOp);
    }

    match event.destination {
        ContainerId::Today => {
            let task = lookup(event.task_id, registry)?;
            Ok(Resolution::Mutation(Placement::dated(
                registry.viewed_date(),
                task.project_id,
            )))
        }
        ContainerId::Unassigned => {
            lookup(event.task_id, registry)?;
            Ok(Resolution::Mutation(Placement::backlog(None)))
        }
        ContainerId::Project(project_id) if registry.contains(event.destination) => {
            lookup(event.task_id, registry)?;
            Ok(Resolution::Mutation(Placement::backlog(Some(project_id))))
        }
        other => Err(ResolveError::InvalidContainer(other.to_string())),
    }
}

fn lookup<'a>(id: TaskId, registry: &ContainerRegistry<'a>) -> Result<&'a Task, ResolveError> {
    registry.task(id).ok_or(ResolveError::UnknownTask(id))
}
