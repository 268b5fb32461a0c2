//! Whether to offer the move affordance at all.
//!
//! This is a display decision only. [`crate::relocate::Relocator`] re-checks
//! everything inside its transaction and never consults these predicates.

use anyhow::Result;
use rusqlite::Connection;

use crate::access::AccessEvaluator;
use crate::catalog::{MoveDestination, list_move_destinations};
use crate::config::MOVE_ACCESS_FLOOR;
use crate::model::access::AccessLevel;
use crate::model::issue::Issue;

/// True when `issue` has not been moved and `user` holds at least `minimum`
/// in the issue's container. `minimum` is raised to [`MOVE_ACCESS_FLOOR`].
#[must_use]
pub fn can_offer_move(
    access: &impl AccessEvaluator,
    user: &str,
    issue: &Issue,
    minimum: AccessLevel,
) -> bool {
    !issue.is_moved()
        && access.has_privilege(user, issue.container_id, minimum.max(MOVE_ACCESS_FLOOR))
}

/// Destination options for the move picker, or `None` when the picker must
/// be hidden.
///
/// # Errors
///
/// Returns an error if the destination catalog cannot be read.
pub fn move_options(
    conn: &Connection,
    access: &impl AccessEvaluator,
    user: &str,
    issue: &Issue,
    minimum: AccessLevel,
) -> Result<Option<Vec<MoveDestination>>> {
    if !can_offer_move(access, user, issue, minimum) {
        return Ok(None);
    }
    let minimum = minimum.max(MOVE_ACCESS_FLOOR);
    list_move_destinations(conn, access, user, issue.container_id, minimum).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::MembershipAccess;
    use crate::db::open_in_memory;
    use crate::db::store::{
        NewContainer, NewIssue, create_issue, get_issue, insert_container, mark_moved, set_member,
    };
    use crate::model::container::{Container, Visibility};

    fn add(conn: &Connection, path: &str) -> Container {
        insert_container(
            conn,
            &NewContainer {
                namespace: "acme",
                path,
                name: path,
                visibility: Visibility::Private,
            },
        )
        .expect("insert container")
    }

    fn issue_in(conn: &Connection, container: &Container) -> Issue {
        create_issue(
            conn,
            &NewIssue {
                container_id: container.id,
                author: "rita",
                title: "Broken build",
                description: "",
            },
        )
        .expect("create issue")
    }

    #[test]
    fn guest_is_not_offered_the_move() {
        let conn = open_in_memory().expect("store");
        let source = add(&conn, "old");
        set_member(&conn, source.id, "gus", AccessLevel::Guest).expect("grant");
        let issue = issue_in(&conn, &source);

        let access = MembershipAccess::new(&conn);
        assert!(!can_offer_move(&access, "gus", &issue, AccessLevel::Reporter));
        assert_eq!(
            move_options(&conn, &access, "gus", &issue, AccessLevel::Reporter).expect("options"),
            None
        );
    }

    #[test]
    fn reporter_is_offered_the_move() {
        let conn = open_in_memory().expect("store");
        let source = add(&conn, "old");
        let target = add(&conn, "new");
        set_member(&conn, source.id, "rita", AccessLevel::Reporter).expect("grant");
        set_member(&conn, target.id, "rita", AccessLevel::Reporter).expect("grant");
        let issue = issue_in(&conn, &source);

        let access = MembershipAccess::new(&conn);
        assert!(can_offer_move(&access, "rita", &issue, AccessLevel::Reporter));
        let options = move_options(&conn, &access, "rita", &issue, AccessLevel::Reporter)
            .expect("options")
            .expect("picker shown");
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn moved_issue_hides_the_move_for_everyone() {
        let conn = open_in_memory().expect("store");
        let source = add(&conn, "old");
        let target = add(&conn, "new");
        set_member(&conn, source.id, "owner", AccessLevel::Owner).expect("grant");
        let issue = issue_in(&conn, &source);
        let new_issue = issue_in(&conn, &target);
        assert!(mark_moved(&conn, issue.id, new_issue.id).expect("tombstone"));
        let issue = get_issue(&conn, issue.id).expect("query").expect("exists");

        let access = MembershipAccess::new(&conn);
        assert!(!can_offer_move(&access, "owner", &issue, AccessLevel::Guest));
    }

    #[test]
    fn guest_minimum_is_raised_to_reporter() {
        let conn = open_in_memory().expect("store");
        let source = add(&conn, "old");
        let target = add(&conn, "new");
        set_member(&conn, source.id, "gus", AccessLevel::Guest).expect("grant");
        set_member(&conn, target.id, "gus", AccessLevel::Guest).expect("grant");
        let issue = issue_in(&conn, &source);

        let access = MembershipAccess::new(&conn);
        assert!(!can_offer_move(&access, "gus", &issue, AccessLevel::Guest));
        assert_eq!(
            move_options(&conn, &access, "gus", &issue, AccessLevel::Guest).expect("options"),
            None
        );
    }
}
