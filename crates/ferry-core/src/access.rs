//! Privilege checks against container membership.
//!
//! [`AccessEvaluator`] is the seam every authorization decision goes
//! through. Implementations report raw facts (`access_level`, `visibility`)
//! and may fail; the provided predicates [`AccessEvaluator::has_privilege`]
//! and [`AccessEvaluator::can_view`] fail closed, turning any lookup error
//! into `false` after logging it.

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::db::store;
use crate::model::access::AccessLevel;
use crate::model::container::{ContainerId, Visibility};

/// Answers membership questions about a user in a container.
pub trait AccessEvaluator {
    /// The user's membership level, or `None` for non-members and unknown
    /// containers.
    ///
    /// # Errors
    ///
    /// Returns an error if the membership source cannot be read.
    fn access_level(&self, user: &str, container: ContainerId) -> Result<Option<AccessLevel>>;

    /// The container's visibility, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the container source cannot be read.
    fn visibility(&self, container: ContainerId) -> Result<Option<Visibility>>;

    /// Whether `user` holds at least `minimum` in `container`.
    ///
    /// Never propagates errors: a failed lookup denies.
    fn has_privilege(&self, user: &str, container: ContainerId, minimum: AccessLevel) -> bool {
        match self.access_level(user, container) {
            Ok(Some(level)) => level >= minimum,
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(
                    user,
                    container = %container,
                    minimum = %minimum,
                    error = %err,
                    "access lookup failed; denying"
                );
                false
            }
        }
    }

    /// Whether `user` can see `container` at all.
    ///
    /// Public and internal containers are visible to every signed-in user;
    /// private ones need a membership row of any level.
    fn can_view(&self, user: &str, container: ContainerId) -> bool {
        match self.visibility(container) {
            Ok(Some(Visibility::Public | Visibility::Internal)) => true,
            Ok(Some(Visibility::Private)) => self.has_privilege(user, container, AccessLevel::Guest),
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(
                    user,
                    container = %container,
                    error = %err,
                    "visibility lookup failed; denying"
                );
                false
            }
        }
    }
}

/// [`AccessEvaluator`] backed by the `members` and `containers` tables.
///
/// Borrowing a `Transaction` works too, which lets the relocation service
/// evaluate privileges inside its own write transaction.
pub struct MembershipAccess<'conn> {
    conn: &'conn Connection,
}

impl<'conn> MembershipAccess<'conn> {
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AccessEvaluator for MembershipAccess<'_> {
    fn access_level(&self, user: &str, container: ContainerId) -> Result<Option<AccessLevel>> {
        let value = store::member_access_value(self.conn, container, user)
            .with_context(|| format!("read membership of {user} in container {container}"))?;
        match value {
            None => Ok(None),
            Some(raw) => AccessLevel::from_value(raw)
                .map(Some)
                .with_context(|| format!("unknown access level {raw} for {user}")),
        }
    }

    fn visibility(&self, container: ContainerId) -> Result<Option<Visibility>> {
        let found = store::get_container(self.conn, container)
            .with_context(|| format!("read container {container}"))?;
        Ok(found.map(|c| c.visibility))
    }
}
