//! Moving an issue into another container.
//!
//! A relocation never edits the original issue's content or container.
//! Instead it creates a fresh issue in the destination and turns the
//! original into a tombstone whose `moved_to` points at the new issue, so
//! every existing link to the original keeps resolving.
//!
//! # Atomicity
//!
//! All reads and writes of one relocation run inside a single
//! `BEGIN IMMEDIATE` transaction. The write lock is taken before the
//! preconditions are read, so two concurrent relocations of the same issue
//! serialize and the second one observes the tombstone. The final
//! tombstone write is additionally conditional on `moved_to_id IS NULL`,
//! and the schema forbids clearing or re-pointing it.
//!
//! Any error drops the transaction, which rolls back every write made so
//! far; a failed relocation leaves the store exactly as it was.
//!
//! # Preconditions
//!
//! Evaluated in order, first failure wins:
//!
//! 1. the issue is not already moved (`AlreadyMoved`)
//! 2. the actor holds the minimum level in the source (`Unauthorized`)
//! 3. a destination was chosen, exists, and is visible to the actor
//!    (`InvalidDestination`; a hidden container reads as a missing one)
//! 4. the actor holds the minimum level in the destination (`Unauthorized`)
//! 5. the destination differs from the source (`InvalidDestination`)

use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;

use crate::access::{AccessEvaluator, MembershipAccess};
use crate::config::{AuthorPolicy, MoveConfig};
use crate::db::store::{self, NewIssue};
use crate::error::{DestinationProblem, MoveError, Side};
use crate::model::container::{self, Container, ContainerId};
use crate::model::issue::{Issue, IssueId, IssueState};
use crate::reference;

/// Outcome of a successful relocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relocation {
    /// The original issue, now a tombstone.
    pub original: Issue,
    /// The issue created in the destination.
    pub moved: Issue,
    pub source: Container,
    pub destination: Container,
    /// Number of user notes carried over to the new issue.
    pub copied_notes: usize,
}

/// How a caller names the destination container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveTarget<'a> {
    Id(ContainerId),
    /// A `namespace/path` full path, resolved inside the transaction.
    Path(&'a str),
}

/// Validated inputs of a relocation.
struct Checked {
    issue: Issue,
    source: Container,
    destination: Container,
}

/// Runs relocations under a [`MoveConfig`] policy.
#[derive(Debug, Clone, Default)]
pub struct Relocator {
    config: MoveConfig,
}

impl Relocator {
    #[must_use]
    pub const fn new(config: MoveConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &MoveConfig {
        &self.config
    }

    /// Move `issue_id` into `destination` on behalf of `actor`.
    ///
    /// `destination` is `None` when the caller submitted the "no project"
    /// sentinel.
    ///
    /// # Errors
    ///
    /// - [`MoveError::IssueNotFound`] if the issue does not exist
    /// - [`MoveError::AlreadyMoved`] if the issue is a tombstone, including
    ///   when a concurrent relocation won the race
    /// - [`MoveError::Unauthorized`] if the actor lacks the configured level
    ///   in the source or the destination
    /// - [`MoveError::InvalidDestination`] if no destination was chosen, it
    ///   does not exist or is hidden from the actor, or it is the issue's own
    ///   container
    /// - [`MoveError::PersistenceFailure`] for any storage error
    pub fn relocate(
        &self,
        conn: &mut Connection,
        actor: &str,
        issue_id: IssueId,
        destination: Option<ContainerId>,
    ) -> Result<Relocation, MoveError> {
        self.relocate_to(conn, actor, issue_id, destination.map(MoveTarget::Id))
    }

    /// Like [`Relocator::relocate`], with the destination named by id or by
    /// full path.
    ///
    /// # Errors
    ///
    /// Same as [`Relocator::relocate`]. An unknown or hidden path is
    /// [`DestinationProblem::UnknownPath`].
    pub fn relocate_to(
        &self,
        conn: &mut Connection,
        actor: &str,
        issue_id: IssueId,
        destination: Option<MoveTarget<'_>>,
    ) -> Result<Relocation, MoveError> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let checked = match self.check(&tx, actor, issue_id, destination) {
            Ok(checked) => checked,
            Err(err) => {
                tracing::info!(
                    actor,
                    issue = %issue_id,
                    code = %err.code(),
                    error = %err,
                    "relocation rejected"
                );
                return Err(err);
            }
        };

        let relocation = self.apply(&tx, actor, checked)?;
        tx.commit()?;

        tracing::info!(
            actor,
            from = %relocation.source.issue_reference(relocation.original.number),
            to = %relocation.destination.issue_reference(relocation.moved.number),
            copied_notes = relocation.copied_notes,
            "issue relocated"
        );

        Ok(relocation)
    }

    fn check(
        &self,
        conn: &Connection,
        actor: &str,
        issue_id: IssueId,
        destination: Option<MoveTarget<'_>>,
    ) -> Result<Checked, MoveError> {
        let minimum = self.config.required_access();
        let access = MembershipAccess::new(conn);

        let issue = store::get_issue(conn, issue_id)?.ok_or(MoveError::IssueNotFound(issue_id))?;

        if issue.is_moved() {
            return Err(MoveError::AlreadyMoved { issue: issue.id });
        }

        if !access.has_privilege(actor, issue.container_id, minimum) {
            return Err(MoveError::Unauthorized {
                actor: actor.to_string(),
                side: Side::Source,
                required: minimum,
            });
        }
        tracing::debug!(actor, issue = %issue.id, "source access ok");

        let Some(target) = destination else {
            return Err(MoveError::InvalidDestination(DestinationProblem::NotSelected));
        };
        let destination = resolve_destination(conn, &access, actor, target)?;

        if !access.has_privilege(actor, destination.id, minimum) {
            return Err(MoveError::Unauthorized {
                actor: actor.to_string(),
                side: Side::Destination,
                required: minimum,
            });
        }
        tracing::debug!(actor, destination = %destination.id, "destination access ok");

        if destination.id == issue.container_id {
            return Err(MoveError::InvalidDestination(
                DestinationProblem::SameAsSource,
            ));
        }

        // The foreign key guarantees the owning container exists.
        let source = store::get_container(conn, issue.container_id)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)?;

        Ok(Checked {
            issue,
            source,
            destination,
        })
    }

    fn apply(&self, conn: &Connection, actor: &str, checked: Checked) -> Result<Relocation, MoveError> {
        let Checked {
            issue,
            source,
            destination,
        } = checked;

        let rewritten = reference::rewrite(&issue.description, &source);
        let description = with_provenance(&rewritten, &source, issue.number);
        let author = match self.config.author {
            AuthorPolicy::Original => issue.author.as_str(),
            AuthorPolicy::Actor => actor,
        };

        let moved = store::create_issue(
            conn,
            &NewIssue {
                container_id: destination.id,
                author,
                title: &issue.title,
                description: &description,
            },
        )?;

        let mut copied_notes = 0;
        if self.config.copy_notes {
            for note in store::list_notes(conn, issue.id)? {
                if note.system {
                    continue;
                }
                let body = reference::rewrite(&note.body, &source);
                store::add_note(conn, moved.id, &note.author, &body, false, note.created_at_us)?;
                copied_notes += 1;
            }
        }

        let now = store::now_us();
        store::add_note(
            conn,
            moved.id,
            actor,
            &provenance_line(&source, issue.number),
            true,
            now,
        )?;
        store::add_note(
            conn,
            issue.id,
            actor,
            &format!("Moved to {}", destination.issue_reference(moved.number)),
            true,
            now,
        )?;

        if self.config.close_original && issue.state == IssueState::Opened {
            store::close_issue(conn, issue.id)?;
        }

        if !store::mark_moved(conn, issue.id, moved.id)? {
            return Err(MoveError::AlreadyMoved { issue: issue.id });
        }

        let original =
            store::get_issue(conn, issue.id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;

        Ok(Relocation {
            original,
            moved,
            source,
            destination,
            copied_notes,
        })
    }
}

/// Look up `target`, treating containers `actor` cannot view as missing.
fn resolve_destination(
    conn: &Connection,
    access: &impl AccessEvaluator,
    actor: &str,
    target: MoveTarget<'_>,
) -> Result<Container, MoveError> {
    let (found, problem) = match target {
        MoveTarget::Id(id) => (
            store::get_container(conn, id)?,
            DestinationProblem::NotFound(id),
        ),
        MoveTarget::Path(full_path) => {
            let found = match container::split_full_path(full_path) {
                Ok((namespace, path)) => store::get_container_at(conn, namespace, path)?,
                Err(_) => None,
            };
            (found, DestinationProblem::UnknownPath(full_path.trim().to_string()))
        }
    };

    match found {
        Some(destination) if access.can_view(actor, destination.id) => Ok(destination),
        _ => Err(MoveError::InvalidDestination(problem)),
    }
}

/// The provenance line appended to a relocated issue.
#[must_use]
pub fn provenance_line(source: &Container, number: u64) -> String {
    format!("Moved from {}", source.issue_reference(number))
}

/// Append the provenance line to already rewritten content.
///
/// The content is kept byte for byte; only enough newlines to leave one
/// blank line before the provenance line are added.
#[must_use]
pub fn with_provenance(rewritten: &str, source: &Container, number: u64) -> String {
    let line = provenance_line(source, number);
    let separator = if rewritten.is_empty() || rewritten.ends_with("\n\n") {
        ""
    } else if rewritten.ends_with('\n') {
        "\n"
    } else {
        "\n\n"
    };
    format!("{rewritten}{separator}{line}")
}
