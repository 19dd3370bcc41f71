use std::fmt;
use std::str::FromStr;

use crate::models::ProjectId;

use super::resolver::ResolveError;

pub const TODAY_ID: &str = "today";
pub const AI_CONTEXT_ID: &str = "ai-chat-zone";
const INBOX_PREFIX: &str = "inbox-";
const UNASSIGNED_SUFFIX: &str = "null";

/// A drop target on the board.
///
/// The string form (`today`, `inbox-null`, `inbox-<id>`, `ai-chat-zone`) is
/// only used at the interface boundary. Everything past [`FromStr`] works on
/// the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerId {
    /// Tasks dated the currently viewed day.
    Today,
    /// Undated tasks with no project.
    Unassigned,
    /// Undated tasks of one project.
    Project(ProjectId),
    /// Not a task container: dropping here sets the chat context.
    AiContext,
}

impl ContainerId {
    /// Backlog container for an optional project.
    pub fn backlog(project_id: Option<ProjectId>) -> Self {
        match project_id {
            Some(id) => Self::Project(id),
            None => Self::Unassigned,
        }
    }

    pub fn is_backlog(&self) -> bool {
        matches!(self, Self::Unassigned | Self::Project(_))
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Today => f.write_str(TODAY_ID),
            Self::Unassigned => write!(f, "{}{}", INBOX_PREFIX, UNASSIGNED_SUFFIX),
            Self::Project(id) => write!(f, "{}{}", INBOX_PREFIX, id),
            Self::AiContext => f.write_str(AI_CONTEXT_ID),
        }
    }
}

impl FromStr for ContainerId {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            TODAY_ID => Ok(Self::Today),
            AI_CONTEXT_ID => Ok(Self::AiContext),
            _ => {
                let rest = s
                    .strip_prefix(INBOX_PREFIX)
                    .ok_or_else(|| ResolveError::InvalidContainer(s.to_string()))?;
                if rest == UNASSIGNED_SUFFIX {
                    return Ok(Self::Unassigned);
                }
                rest.parse::<i64>()
                    .map(|id| Self::Project(ProjectId(id)))
                    .map_err(|_| ResolveError::InvalidContainer(s.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_known_form() {
        assert_eq!("today".parse::<ContainerId>().unwrap(), ContainerId::Today);
        assert_eq!(
            "inbox-null".parse::<ContainerId>().unwrap(),
            ContainerId::Unassigned
        );
        assert_eq!(
            "inbox-12".parse::<ContainerId>().unwrap(),
            ContainerId::Project(ProjectId(12))
        );
        assert_eq!(
            "ai-chat-zone".parse::<ContainerId>().unwrap(),
            ContainerId::AiContext
        );
    }

    #[test]
    fn display_is_the_inverse_of_parse() {
        for id in [
            ContainerId::Today,
            ContainerId::Unassigned,
            ContainerId::Project(ProjectId(3)),
            ContainerId::AiContext,
        ] {
            assert_eq!(id.to_string().parse::<ContainerId>().unwrap(), id);
        }
    }

    #[test]
    fn rejects_unknown_ids() {
        for raw in ["", "tomorrow", "inbox-", "inbox-undefined", "inbox-3x", "Today"] {
            assert!(
                matches!(raw.parse::<ContainerId>(), Err(ResolveError::InvalidContainer(_))),
                "{raw:?} should be rejected"
            );
        }
    }
}
