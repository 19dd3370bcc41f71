//! Task placement engine.
//!
//! [`Board`] drives a [`BoardState`] against a [`TaskStore`]: each action is
//! applied locally first, sent to the store, and followed by a full reload so
//! container membership (and project stats) come from the store. Failed
//! changes are reconciled by the same reload.

mod braindump;
mod container;
mod registry;
mod resolver;
mod state;

pub use braindump::*;
pub use container::*;
pub use registry::*;
pub use resolver::*;
pub use state::*;

use chrono::{NaiveDate, TimeDelta};
use thiserror::Error;

use crate::client::{RemoteError, TaskStore};
use crate::models::*;

/// Errors surfaced to the caller. Remote failures other than session expiry
/// are absorbed into an [`Outcome`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} is already in progress")]
    Busy(&'static str),

    #[error("task {0} is not on the board")]
    UnknownTask(TaskId),

    #[error("session expired")]
    SessionExpired,
}

/// Result of a board action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing was sent to the store.
    Unchanged,
    /// The chat context now points at a task.
    ContextSet(ActiveContext),
    /// The store accepted the change and the board was reloaded.
    Applied,
    /// The store rejected the change and the board was reloaded.
    Reconciled,
    /// The store rejected the change and the reload failed too. The task
    /// shows its last confirmed copy, but the rest of the board may be stale.
    Diverged,
    /// The store rejected a creation; nothing local to undo.
    Failed,
    /// A newer change to the same task made this one irrelevant.
    Superseded,
    /// The user declined the confirmation.
    Cancelled,
}

pub struct Board<S> {
    store: S,
    state: BoardState,
}

impl<S: TaskStore> Board<S> {
    pub fn new(store: S, viewed_date: NaiveDate) -> Self {
        Self {
            store,
            state: BoardState::new(viewed_date),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut BoardState {
        &mut self.state
    }

    /// Fetch the viewed day, the undated tasks and the projects.
    /// Returns whether the result was applied.
    pub async fn reload(&mut self) -> Result<bool, BoardError> {
        let ticket = self.state.begin_reload();
        let result = self.fetch(ticket.date).await;
        self.state.finish_reload(ticket, result)
    }

    async fn fetch(&self, date: NaiveDate) -> Result<Snapshot, RemoteError> {
        let (dated, inbox, projects) = tokio::try_join!(
            self.store.tasks_for_date(date),
            self.store.inbox_tasks(),
            self.store.projects(),
        )?;
        Ok(Snapshot {
            dated,
            inbox,
            projects,
        })
    }

    pub async fn set_viewed_date(&mut self, date: NaiveDate) -> Result<bool, BoardError> {
        self.state.set_viewed_date(date);
        self.reload().await
    }

    pub async fn shift_viewed_date(&mut self, days: i64) -> Result<bool, BoardError> {
        let date = TimeDelta::try_days(days)
            .and_then(|delta| self.state.viewed_date().checked_add_signed(delta))
            .ok_or_else(|| BoardError::Validation("date out of range".to_string()))?;
        self.set_viewed_date(date).await
    }

    /// Handle a drop given raw drag-and-drop identifiers.
    pub async fn drop_raw(
        &mut self,
        source: &str,
        destination: &str,
        task_id: TaskId,
    ) -> Result<Outcome, BoardError> {
        match DragEvent::parse(source, destination, task_id) {
            Ok(event) => self.drop_task(event).await,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring drop");
                Ok(Outcome::Unchanged)
            }
        }
    }

    pub async fn drop_task(&mut self, event: DragEvent) -> Result<Outcome, BoardError> {
        let plan = match self.state.begin_drop(&event) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(error = %e, ?event, "ignoring drop");
                return Ok(Outcome::Unchanged);
            }
        };

        match plan {
            DropPlan::Unchanged => Ok(Outcome::Unchanged),
            DropPlan::ContextSet(context) => Ok(Outcome::ContextSet(context)),
            DropPlan::Update { ticket, input } => {
                tracing::info!(
                    task_id = %ticket.task_id,
                    to = %event.destination,
                    "moving task"
                );
                let result = self.store.update_task(ticket.task_id, &input).await;
                let settled = self.state.settle(ticket, result)?;
                self.follow_up(settled).await
            }
        }
    }

    pub async fn toggle_task(&mut self, id: TaskId) -> Result<Outcome, BoardError> {
        let ticket = self.state.begin_toggle(id)?;
        let result = self.store.toggle_task(id).await;
        let settled = self.state.settle(ticket, result)?;
        self.follow_up(settled).await
    }

    /// Delete a task once `confirm` approves it.
    pub async fn delete_task(
        &mut self,
        id: TaskId,
        confirm: impl FnOnce(&Task) -> bool,
    ) -> Result<Outcome, BoardError> {
        let task = self.state.task(id).ok_or(BoardError::UnknownTask(id))?;
        if !confirm(task) {
            return Ok(Outcome::Cancelled);
        }

        let ticket = self.state.begin_delete(id)?;
        let result = self.store.delete_task(id).await;
        let settled = self.state.settle(ticket, result)?;
        self.follow_up(settled).await
    }

    pub async fn add_task(&mut self, new_task: NewTask) -> Result<Outcome, BoardError> {
        let input = self.state.begin_add(new_task)?;
        let result = self.store.create_task(&input).await;
        match self.state.finish_add(result)? {
            Settled::Applied => {
                self.reload().await?;
                Ok(Outcome::Applied)
            }
            _ => Ok(Outcome::Failed),
        }
    }

    pub async fn create_project(
        &mut self,
        input: &CreateProjectInput,
    ) -> Result<Outcome, BoardError> {
        let input = validate_project(input)?;
        match self.store.create_project(&input).await {
            Ok(project) => {
                tracing::info!(project_id = %project.id, name = %project.name, "project created");
                self.reload().await?;
                Ok(Outcome::Applied)
            }
            Err(RemoteError::SessionExpired) => Err(BoardError::SessionExpired),
            Err(e) => {
                tracing::warn!(error = %e, "failed to create project");
                Ok(Outcome::Failed)
            }
        }
    }

    pub fn set_brain_dump_text(&mut self, text: impl Into<String>) {
        self.state.brain_dump_mut().set_text(text);
    }

    /// Submit the brain-dump text for the viewed day. On failure the text is
    /// kept and an inline error is recorded on the draft.
    pub async fn submit_brain_dump(&mut self) -> Result<Outcome, BoardError> {
        let request = self.state.begin_brain_dump()?;
        let result = self.store.process_brain_dump(&request).await;
        match self.state.finish_brain_dump(result)? {
            Settled::Applied => {
                self.reload().await?;
                Ok(Outcome::Applied)
            }
            _ => Ok(Outcome::Failed),
        }
    }

    async fn follow_up(&mut self, settled: Settled) -> Result<Outcome, BoardError> {
        let reloaded = settled.needs_reload() && self.reload().await?;
        Ok(match settled {
            Settled::Applied => Outcome::Applied,
            Settled::Failed if reloaded => Outcome::Reconciled,
            Settled::Failed => {
                tracing::warn!("reconciling reload failed, board may be stale");
                Outcome::Diverged
            }
            Settled::Superseded => Outcome::Superseded,
        })
    }
}
