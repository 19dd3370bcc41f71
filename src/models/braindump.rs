use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Freeform text to be split into tasks dated `task_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrainDumpRequest {
    pub text: String,
    pub task_date: NaiveDate,
}
