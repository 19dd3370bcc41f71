//! Domain models for the task board.
//!
//! - [`Task`]: a to-do item. Its [`Placement`] (`task_date`, `project_id`)
//!   decides which container it shows up in.
//! - [`Project`]: a named backlog with store-computed [`ProjectStats`].
//! - [`BrainDumpRequest`]: freeform text handed to the decomposition service.

mod braindump;
mod project;
mod task;

pub use braindump::*;
pub use project::*;
pub use task::*;
