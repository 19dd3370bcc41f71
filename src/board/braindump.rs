//! Brain-dump input and its submission lifecycle.
//!
//! The text is kept until the decomposition service accepts it, so a failed
//! submission can be retried as-is.

use chrono::NaiveDate;

use crate::client::RemoteError;
use crate::models::BrainDumpRequest;

use super::BoardError;

pub const BRAIN_DUMP_FAILED: &str = "Brain dump failed, try again.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrainDumpDraft {
    text: String,
    in_flight: bool,
    error: Option<String>,
}

impl BrainDumpDraft {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// True while a submission is awaiting the service; the submit action is disabled.
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Inline error from the last failed submission.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub(crate) fn begin(&mut self, task_date: NaiveDate) -> Result<BrainDumpRequest, BoardError> {
        if self.in_flight {
            return Err(BoardError::Busy("brain dump"));
        }
        if self.text.trim().is_empty() {
            return Err(BoardError::Validation(
                "brain dump text must not be empty".to_string(),
            ));
        }
        self.in_flight = true;
        self.error = None;
        Ok(BrainDumpRequest {
            text: self.text.clone(),
            task_date,
        })
    }

    /// Returns whether the service accepted the text.
    pub(crate) fn finish(&mut self, result: Result<(), RemoteError>) -> Result<bool, BoardError> {
        self.in_flight = false;
        match result {
            Ok(()) => {
                self.text.clear();
                Ok(true)
            }
            Err(RemoteError::SessionExpired) => Err(BoardError::SessionExpired),
            Err(e) => {
                tracing::warn!(error = %e, "brain dump submission failed");
                self.error = Some(BRAIN_DUMP_FAILED.to_string());
                Ok(false)
            }
        }
    }
}
