use serde::{Deserialize, Serialize};

use super::issue::IssueId;

/// A comment on an issue.
///
/// System notes are written by the store itself (for example when an issue is
/// relocated) and are never copied to a relocated issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub issue_id: IssueId,
    pub author: String,
    pub body: String,
    pub system: bool,
    pub created_at_us: i64,
}
