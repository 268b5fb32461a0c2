use std::fmt;

use crate::model::access::AccessLevel;
use crate::model::container::ContainerId;
use crate::model::issue::IssueId;

/// Machine-readable error codes for callers that branch on failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    ContainerNotFound,
    IssueNotFound,
    InvalidPath,
    AlreadyMoved,
    Unauthorized,
    InvalidDestination,
    PersistenceFailure,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::ContainerNotFound => "E2001",
            Self::IssueNotFound => "E2002",
            Self::InvalidPath => "E2003",
            Self::AlreadyMoved => "E3001",
            Self::Unauthorized => "E3002",
            Self::InvalidDestination => "E3003",
            Self::PersistenceFailure => "E5001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Project not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::ContainerNotFound => "Container not found",
            Self::IssueNotFound => "Issue not found",
            Self::InvalidPath => "Invalid container path",
            Self::AlreadyMoved => "Issue already moved",
            Self::Unauthorized => "Insufficient access",
            Self::InvalidDestination => "Invalid destination",
            Self::PersistenceFailure => "Storage failure",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `ferry init` to initialize this project."),
            Self::ConfigParseError => Some("Fix syntax in .ferry/config.toml and retry."),
            Self::ContainerNotFound | Self::IssueNotFound => None,
            Self::InvalidPath => Some("Address containers as namespace/path."),
            Self::AlreadyMoved => Some("Follow the moved-to pointer and act on the new issue."),
            Self::Unauthorized => {
                Some("Ask for the required access in both the source and destination containers.")
            }
            Self::InvalidDestination => Some("Pick a different, existing container."),
            Self::PersistenceFailure => Some("Nothing was changed; retry the move."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Which end of a move an authorization check applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Destination,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Source => "source",
            Self::Destination => "destination",
        })
    }
}

/// Why a destination was rejected.
///
/// A container the actor cannot view is reported exactly like a missing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationProblem {
    /// The "no project" sentinel was submitted.
    NotSelected,
    /// No visible container has this id.
    NotFound(ContainerId),
    /// No visible container lives at this full path.
    UnknownPath(String),
    /// The destination is the issue's own container.
    SameAsSource,
}

impl fmt::Display for DestinationProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSelected => f.write_str("no destination selected"),
            Self::NotFound(id) => write!(f, "container {id} does not exist"),
            Self::UnknownPath(path) => write!(f, "no container at {path}"),
            Self::SameAsSource => f.write_str("destination is the issue's own container"),
        }
    }
}

/// Failure of a relocation attempt. Nothing is committed when one is returned.
#[derive(Debug, thiserror::Error)]
pub enum MoveError {
    /// The issue is a tombstone. Permanent.
    #[error("issue {issue} has already been moved")]
    AlreadyMoved { issue: IssueId },

    /// The actor lacks the required level on one side of the move.
    #[error("{actor} needs {required} access in the {side} container")]
    Unauthorized {
        actor: String,
        side: Side,
        required: AccessLevel,
    },

    /// The destination is missing, unresolvable, or the source itself.
    #[error("invalid destination: {0}")]
    InvalidDestination(DestinationProblem),

    /// The issue to move does not exist.
    #[error("issue {0} not found")]
    IssueNotFound(IssueId),

    /// The store failed. Storage details stay in the error source and out of
    /// the message.
    #[error("persistence failure")]
    PersistenceFailure(#[from] rusqlite::Error),
}

impl MoveError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::AlreadyMoved { .. } => ErrorCode::AlreadyMoved,
            Self::Unauthorized { .. } => ErrorCode::Unauthorized,
            Self::InvalidDestination(_) => ErrorCode::InvalidDestination,
            Self::IssueNotFound(_) => ErrorCode::IssueNotFound,
            Self::PersistenceFailure(_) => ErrorCode::PersistenceFailure,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }

    /// Only storage failures are worth retrying; the move is atomic, so a
    /// retry starts from a clean slate.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::PersistenceFailure(_))
    }
}
