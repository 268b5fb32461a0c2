use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::container::ContainerId;
use super::{ParseEnumError, normalize};

/// Store identity of an issue. Unique across all containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueId(pub i64);

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Open/closed lifecycle of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Opened,
    Closed,
}

impl IssueState {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueState {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        match normalized.as_str() {
            "opened" | "open" => Ok(Self::Opened),
            "closed" => Ok(Self::Closed),
            _ => Err(ParseEnumError {
                expected: "issue state",
                got: s.to_string(),
            }),
        }
    }
}

/// A tracked issue as stored in the `issues` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub container_id: ContainerId,
    /// Per-container sequence number, the `N` in `#N`.
    pub number: u64,
    pub author: String,
    pub title: String,
    pub description: String,
    pub state: IssueState,
    /// Forward pointer to the issue this one was relocated to.
    ///
    /// Set at most once and never cleared; an issue carrying it is a
    /// tombstone.
    pub moved_to: Option<IssueId>,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

impl Issue {
    /// True once the issue has been relocated elsewhere.
    #[must_use]
    pub const fn is_moved(&self) -> bool {
        self.moved_to.is_some()
    }

    /// Short in-container reference (`#N`).
    #[must_use]
    pub fn short_reference(&self) -> String {
        format!("#{}", self.number)
    }
}
