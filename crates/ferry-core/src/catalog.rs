//! Destination candidates for moving an issue.

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;

use crate::access::AccessEvaluator;
use crate::db::store;
use crate::model::access::AccessLevel;
use crate::model::container::{Container, ContainerId};

/// Label of the "no destination chosen" entry.
pub const UNSELECTED_LABEL: &str = "No project";

/// One entry of the destination picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MoveDestination {
    /// Sentinel meaning no destination was picked. Always listed first.
    Unselected,
    Container(Container),
}

impl MoveDestination {
    /// Text shown for this option.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Unselected => UNSELECTED_LABEL.to_string(),
            Self::Container(c) => c.display_name(),
        }
    }

    /// The id submitted when this option is chosen; `None` for the sentinel.
    #[must_use]
    pub const fn container_id(&self) -> Option<ContainerId> {
        match self {
            Self::Unselected => None,
            Self::Container(c) => Some(c.id),
        }
    }
}

/// List the containers `user` may move an issue from `source` into.
///
/// Candidates are the containers the user can view, narrowed to those where
/// they hold at least `minimum`, minus `source`, sorted by display name. The
/// [`MoveDestination::Unselected`] sentinel is always the first entry, so an
/// empty candidate set still yields one option.
///
/// # Errors
///
/// Returns an error if the container list cannot be read. Per-container
/// privilege lookups fail closed instead of erroring.
pub fn list_move_destinations(
    conn: &Connection,
    access: &impl AccessEvaluator,
    user: &str,
    source: ContainerId,
    minimum: AccessLevel,
) -> Result<Vec<MoveDestination>> {
    let visible = store::list_visible_containers(conn, user)
        .with_context(|| format!("list containers visible to {user}"))?;

    let mut candidates: Vec<Container> = visible
        .into_iter()
        .filter(|c| c.id != source)
        .filter(|c| access.has_privilege(user, c.id, minimum))
        .filter(|c| access.can_view(user, c.id))
        .collect();

    candidates.sort_by_cached_key(|c| (c.display_name().to_lowercase(), c.id));

    tracing::debug!(
        user,
        source = %source,
        candidates = candidates.len(),
        "listed move destinations"
    );

    let mut options = Vec::with_capacity(candidates.len() + 1);
    options.push(MoveDestination::Unselected);
    options.extend(candidates.into_iter().map(MoveDestination::Container));
    Ok(options)
}
