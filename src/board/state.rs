//! The board's client-side state and its optimistic update rules.
//!
//! Every remote call is split in two: a `begin_*` method applies the change
//! locally and hands back what to send, and a settle method consumes the
//! response. Changes to a task carry a per-task sequence number; only the
//! response to the latest one issued is acted on. Reloads are fenced the same
//! way with a generation counter.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::client::RemoteError;
use crate::models::*;

use super::braindump::BrainDumpDraft;
use super::container::ContainerId;
use super::registry::{CollapseState, ContainerRegistry, ContainerView};
use super::resolver::{self, ActiveContext, DragEvent, Resolution, ResolveError};
use super::BoardError;

/// Handle for an in-flight change to one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub task_id: TaskId,
    pub seq: u64,
}

/// Handle for an in-flight reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadTicket {
    pub generation: u64,
    pub date: NaiveDate,
}

/// An authoritative copy of the board as returned by the store.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Tasks dated the reloaded day.
    pub dated: Vec<Task>,
    /// Every undated task.
    pub inbox: Vec<Task>,
    pub projects: Vec<Project>,
}

/// What a drop turned into locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropPlan {
    Unchanged,
    ContextSet(ActiveContext),
    Update {
        ticket: Ticket,
        input: UpdateTaskInput,
    },
}

/// How a settled response should be followed up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    /// Store accepted the change; reload to pick up its view.
    Applied,
    /// Store rejected the change; the prior copy is back, reload to confirm.
    Failed,
    /// A newer change to the same task was issued; ignore this response.
    Superseded,
}

impl Settled {
    pub fn needs_reload(&self) -> bool {
        matches!(self, Self::Applied | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Clean,
    Pending,
}

/// Where a manually added task goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddTarget {
    /// Dated the viewed day.
    Today,
    /// Undated.
    Backlog,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub content: String,
    pub target: AddTarget,
    pub priority: Priority,
    pub project_id: Option<ProjectId>,
}

impl NewTask {
    pub fn new(content: impl Into<String>, target: AddTarget) -> Self {
        Self {
            content: content.into(),
            target,
            priority: Priority::default(),
            project_id: None,
        }
    }
}

/// Local edits not yet confirmed by the store, reapplied over every reload.
#[derive(Debug, Clone, Default)]
struct Pending {
    seq: u64,
    /// The task as last confirmed, restored if the store rejects the change.
    prior: Option<Task>,
    placement: Option<Placement>,
    completed: Option<bool>,
    removed: bool,
}

impl Pending {
    fn apply(&self, tasks: &mut Vec<Task>, id: TaskId) {
        if self.removed {
            tasks.retain(|t| t.id != id);
            return;
        }
        if let Some(task) = tasks.iter_mut().find(|t| t.id == id) {
            if let Some(placement) = self.placement {
                task.place(placement);
            }
            if let Some(completed) = self.completed {
                task.is_completed = completed;
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct BoardState {
    viewed_date: NaiveDate,
    tasks: Vec<Task>,
    projects: Vec<Project>,
    collapse: CollapseState,
    active_context: Option<ActiveContext>,
    pending: HashMap<TaskId, Pending>,
    next_seq: u64,
    reload_generation: u64,
    adding: bool,
    brain_dump: BrainDumpDraft,
}

impl BoardState {
    pub fn new(viewed_date: NaiveDate) -> Self {
        Self {
            viewed_date,
            tasks: Vec::new(),
            projects: Vec::new(),
            collapse: CollapseState::default(),
            active_context: None,
            pending: HashMap::new(),
            next_seq: 0,
            reload_generation: 0,
            adding: false,
            brain_dump: BrainDumpDraft::default(),
        }
    }

    pub fn viewed_date(&self) -> NaiveDate {
        self.viewed_date
    }

    /// Change the viewed day. The caller reloads afterwards.
    pub fn set_viewed_date(&mut self, date: NaiveDate) {
        self.viewed_date = date;
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn registry(&self) -> ContainerRegistry<'_> {
        ContainerRegistry::new(&self.tasks, &self.projects, self.viewed_date)
    }

    pub fn containers(&self) -> Vec<ContainerView<'_>> {
        self.registry().containers(&self.collapse)
    }

    pub fn collapse(&self) -> &CollapseState {
        &self.collapse
    }

    pub fn toggle_collapsed(&mut self, container: ContainerId) -> bool {
        self.collapse.toggle(container)
    }

    pub fn active_context(&self) -> Option<&ActiveContext> {
        self.active_context.as_ref()
    }

    pub fn clear_context(&mut self) {
        self.active_context = None;
    }

    pub fn sync_state(&self, id: TaskId) -> SyncState {
        if self.pending.contains_key(&id) {
            SyncState::Pending
        } else {
            SyncState::Clean
        }
    }

    /// True while a manual add is awaiting the store.
    pub fn is_adding(&self) -> bool {
        self.adding
    }

    pub fn brain_dump(&self) -> &BrainDumpDraft {
        &self.brain_dump
    }

    pub fn brain_dump_mut(&mut self) -> &mut BrainDumpDraft {
        &mut self.brain_dump
    }

    // ============================================================
    // Task changes
    // ============================================================

    /// Resolve a drop and, for a placement change, apply it locally.
    pub fn begin_drop(&mut self, event: &DragEvent) -> Result<DropPlan, ResolveError> {
        match resolver::resolve(event, &self.registry())? {
            Resolution::NoOp => Ok(DropPlan::Unchanged),
            Resolution::RouteToAi(context) => {
                self.active_context = Some(context.clone());
                Ok(DropPlan::ContextSet(context))
            }
            Resolution::Mutation(placement) => {
                let task = self
                    .tasks
                    .iter_mut()
                    .find(|t| t.id == event.task_id)
                    .ok_or(ResolveError::UnknownTask(event.task_id))?;
                let prior = task.clone();
                let input = UpdateTaskInput::relocate(task, placement);
                task.place(placement);

                let ticket = self.issue(prior, |p| p.placement = Some(placement));
                Ok(DropPlan::Update { ticket, input })
            }
        }
    }

    /// Flip completion locally.
    pub fn begin_toggle(&mut self, id: TaskId) -> Result<Ticket, BoardError> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(BoardError::UnknownTask(id))?;
        let prior = task.clone();
        task.is_completed = !task.is_completed;
        let completed = task.is_completed;
        Ok(self.issue(prior, |p| p.completed = Some(completed)))
    }

    /// Remove a task locally. Confirmation happens before this is called.
    pub fn begin_delete(&mut self, id: TaskId) -> Result<Ticket, BoardError> {
        let prior = self.task(id).cloned().ok_or(BoardError::UnknownTask(id))?;
        self.tasks.retain(|t| t.id != id);
        if self.active_context.as_ref().is_some_and(|c| c.task_id == id) {
            self.active_context = None;
        }
        Ok(self.issue(prior, |p| p.removed = true))
    }

    /// Consume the store's answer to a task change.
    pub fn settle<T>(
        &mut self,
        ticket: Ticket,
        result: Result<T, RemoteError>,
    ) -> Result<Settled, BoardError> {
        let latest = self
            .pending
            .get(&ticket.task_id)
            .is_some_and(|p| p.seq == ticket.seq);

        if !latest {
            if matches!(result, Err(RemoteError::SessionExpired)) {
                return Err(BoardError::SessionExpired);
            }
            tracing::debug!(
                task_id = %ticket.task_id,
                seq = ticket.seq,
                "discarding response superseded by a newer change"
            );
            return Ok(Settled::Superseded);
        }

        let pending = self.pending.remove(&ticket.task_id);
        if result.is_err() {
            if let Some(prior) = pending.and_then(|p| p.prior) {
                self.restore(prior);
            }
        }
        match result {
            Ok(_) => Ok(Settled::Applied),
            Err(RemoteError::SessionExpired) => Err(BoardError::SessionExpired),
            Err(e) => {
                tracing::warn!(
                    task_id = %ticket.task_id,
                    error = %e,
                    "task change rejected by store, reconciling"
                );
                Ok(Settled::Failed)
            }
        }
    }

    /// Record a change to `prior.id`. The first unconfirmed change keeps its
    /// prior copy; later ones stack on top of it.
    fn issue(&mut self, prior: Task, edit: impl FnOnce(&mut Pending)) -> Ticket {
        self.next_seq += 1;
        let id = prior.id;
        let pending = self.pending.entry(id).or_insert_with(|| Pending {
            prior: Some(prior),
            ..Pending::default()
        });
        pending.seq = self.next_seq;
        edit(pending);
        Ticket {
            task_id: id,
            seq: self.next_seq,
        }
    }

    fn restore(&mut self, prior: Task) {
        match self.tasks.iter_mut().find(|t| t.id == prior.id) {
            Some(task) => *task = prior,
            None => self.tasks.push(prior),
        }
    }

    // ============================================================
    // Reload
    // ============================================================

    pub fn begin_reload(&mut self) -> ReloadTicket {
        self.reload_generation += 1;
        ReloadTicket {
            generation: self.reload_generation,
            date: self.viewed_date,
        }
    }

    /// Replace local state with a fresh snapshot, keeping unconfirmed edits
    /// on top. Returns whether the snapshot was applied.
    pub fn finish_reload(
        &mut self,
        ticket: ReloadTicket,
        result: Result<Snapshot, RemoteError>,
    ) -> Result<bool, BoardError> {
        let current = ticket.generation == self.reload_generation && ticket.date == self.viewed_date;

        let snapshot = match result {
            Err(RemoteError::SessionExpired) => return Err(BoardError::SessionExpired),
            Err(e) => {
                tracing::warn!(error = %e, "reload failed, keeping local state");
                return Ok(false);
            }
            Ok(_) if !current => {
                tracing::debug!(generation = ticket.generation, "discarding stale reload");
                return Ok(false);
            }
            Ok(snapshot) => snapshot,
        };

        let mut tasks = snapshot.dated;
        tasks.extend(snapshot.inbox);
        for (id, pending) in &self.pending {
            pending.apply(&mut tasks, *id);
        }

        self.tasks = tasks;
        self.projects = snapshot.projects;
        if let Some(context) = &self.active_context {
            if self.task(context.task_id).is_none() {
                self.active_context = None;
            }
        }

        tracing::debug!(
            tasks = self.tasks.len(),
            projects = self.projects.len(),
            pending = self.pending.len(),
            "board reloaded"
        );
        Ok(true)
    }

    // ============================================================
    // Creation
    // ============================================================

    pub fn begin_add(&mut self, new_task: NewTask) -> Result<CreateTaskInput, BoardError> {
        if self.adding {
            return Err(BoardError::Busy("add task"));
        }
        let content = new_task.content.trim();
        if content.is_empty() {
            return Err(BoardError::Validation(
                "task content must not be empty".to_string(),
            ));
        }
        self.adding = true;
        Ok(CreateTaskInput {
            content: content.to_string(),
            task_date: match new_task.target {
                AddTarget::Today => Some(self.viewed_date),
                AddTarget::Backlog => None,
            },
            project_id: new_task.project_id,
            priority: Some(new_task.priority),
        })
    }

    pub fn finish_add(&mut self, result: Result<Task, RemoteError>) -> Result<Settled, BoardError> {
        self.adding = false;
        match result {
            Ok(task) => {
                tracing::debug!(task_id = %task.id, "task created");
                Ok(Settled::Applied)
            }
            Err(RemoteError::SessionExpired) => Err(BoardError::SessionExpired),
            Err(e) => {
                tracing::warn!(error = %e, "failed to create task");
                Ok(Settled::Failed)
            }
        }
    }

    pub fn begin_brain_dump(&mut self) -> Result<BrainDumpRequest, BoardError> {
        let date = self.viewed_date;
        self.brain_dump.begin(date)
    }

    pub fn finish_brain_dump(&mut self, result: Result<(), RemoteError>) -> Result<Settled, BoardError> {
        if self.brain_dump.finish(result)? {
            Ok(Settled::Applied)
        } else {
            Ok(Settled::Failed)
        }
    }
}

/// Reject a project without a name before it reaches the store.
pub fn validate_project(input: &CreateProjectInput) -> Result<CreateProjectInput, BoardError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(BoardError::Validation(
            "project name must not be empty".to_string(),
        ));
    }
    Ok(CreateProjectInput {
        name: name.to_string(),
        ..input.clone()
    })
}
