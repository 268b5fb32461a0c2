//! Typed read/write primitives over the issue store.
//!
//! All functions take a shared `&Connection` so they compose inside a caller
//! owned transaction (`Transaction` derefs to `Connection`). They return
//! `rusqlite::Result` so the relocation service can classify storage
//! failures; callers outside the move contract wrap them with `anyhow`
//! context.

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row, params, types::Type};

use crate::model::access::AccessLevel;
use crate::model::container::{self, Container, ContainerId, Visibility};
use crate::model::issue::{Issue, IssueId, IssueState};
use crate::model::note::Note;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Fields needed to create a container.
#[derive(Debug, Clone, Copy)]
pub struct NewContainer<'a> {
    pub namespace: &'a str,
    pub path: &'a str,
    pub name: &'a str,
    pub visibility: Visibility,
}

/// Fields needed to create an issue. The number is assigned by the store.
#[derive(Debug, Clone, Copy)]
pub struct NewIssue<'a> {
    pub container_id: ContainerId,
    pub author: &'a str,
    pub title: &'a str,
    pub description: &'a str,
}

/// Current wall-clock time in microseconds since the Unix epoch.
#[must_use]
pub fn now_us() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

const CONTAINER_COLUMNS: &str = "container_id, namespace, path, name, visibility";

const ISSUE_COLUMNS: &str = "issue_id, container_id, number, author, title, description, \
     state, moved_to_id, created_at_us, updated_at_us";

fn conversion_error(
    column: usize,
    ty: Type,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, ty, Box::new(err))
}

fn container_from_row(row: &Row<'_>) -> rusqlite::Result<Container> {
    let visibility: String = row.get(4)?;
    Ok(Container {
        id: ContainerId(row.get(0)?),
        namespace: row.get(1)?,
        path: row.get(2)?,
        name: row.get(3)?,
        visibility: visibility
            .parse()
            .map_err(|e| conversion_error(4, Type::Text, e))?,
    })
}

fn issue_from_row(row: &Row<'_>) -> rusqlite::Result<Issue> {
    let number: i64 = row.get(2)?;
    let state: String = row.get(6)?;
    Ok(Issue {
        id: IssueId(row.get(0)?),
        container_id: ContainerId(row.get(1)?),
        number: u64::try_from(number).map_err(|e| conversion_error(2, Type::Integer, e))?,
        author: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        state: state
            .parse::<IssueState>()
            .map_err(|e| conversion_error(6, Type::Text, e))?,
        moved_to: row.get::<_, Option<i64>>(7)?.map(IssueId),
        created_at_us: row.get(8)?,
        updated_at_us: row.get(9)?,
    })
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        issue_id: IssueId(row.get(1)?),
        author: row.get(2)?,
        body: row.get(3)?,
        system: row.get(4)?,
        created_at_us: row.get(5)?,
    })
}

// ---------------------------------------------------------------------------
// Containers and membership
// ---------------------------------------------------------------------------

/// Create a container after validating its namespace and path.
///
/// # Errors
///
/// Returns an error if a segment is malformed, the `namespace/path` pair is
/// already taken, or the insert fails.
pub fn insert_container(conn: &Connection, new: &NewContainer<'_>) -> Result<Container> {
    container::validate_namespace(new.namespace)?;
    container::validate_path(new.path)?;
    let name = if new.name.trim().is_empty() {
        new.path
    } else {
        new.name.trim()
    };

    conn.execute(
        "INSERT INTO containers (namespace, path, name, visibility, created_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            new.namespace,
            new.path,
            name,
            new.visibility.as_str(),
            now_us()
        ],
    )
    .with_context(|| format!("insert container {}/{}", new.namespace, new.path))?;

    Ok(Container {
        id: ContainerId(conn.last_insert_rowid()),
        namespace: new.namespace.to_string(),
        path: new.path.to_string(),
        name: name.to_string(),
        visibility: new.visibility,
    })
}

/// Fetch a container by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_container(conn: &Connection, id: ContainerId) -> rusqlite::Result<Option<Container>> {
    conn.query_row(
        &format!("SELECT {CONTAINER_COLUMNS} FROM containers WHERE container_id = ?1"),
        params![id.0],
        container_from_row,
    )
    .optional()
}

/// Fetch a container by its `namespace/path` full path.
///
/// # Errors
///
/// Returns an error if the path is malformed or the query fails.
pub fn find_container_by_path(conn: &Connection, full_path: &str) -> Result<Option<Container>> {
    let (namespace, path) = container::split_full_path(full_path)?;
    get_container_at(conn, namespace, path).with_context(|| format!("look up container {full_path}"))
}

/// Fetch a container by an already split `namespace` and `path`.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_container_at(
    conn: &Connection,
    namespace: &str,
    path: &str,
) -> rusqlite::Result<Option<Container>> {
    conn.query_row(
        &format!("SELECT {CONTAINER_COLUMNS} FROM containers WHERE namespace = ?1 AND path = ?2"),
        params![namespace, path],
        container_from_row,
    )
    .optional()
}

/// All containers ordered by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_containers(conn: &Connection) -> rusqlite::Result<Vec<Container>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CONTAINER_COLUMNS} FROM containers ORDER BY container_id"
    ))?;
    let rows = stmt.query_map([], container_from_row)?;
    rows.collect()
}

/// Containers `user` can at least view: public and internal ones, plus any
/// container where the user holds a membership row.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_visible_containers(conn: &Connection, user: &str) -> rusqlite::Result<Vec<Container>> {
    let mut stmt = conn.prepare(
        "SELECT c.container_id, c.namespace, c.path, c.name, c.visibility
         FROM containers c
         WHERE c.visibility IN ('public', 'internal')
            OR EXISTS (
                SELECT 1 FROM members m
                WHERE m.container_id = c.container_id AND m.username = ?1
            )
         ORDER BY c.container_id",
    )?;
    let rows = stmt.query_map(params![user], container_from_row)?;
    rows.collect()
}

/// Grant (or change) `user`'s access level in a container.
///
/// # Errors
///
/// Returns an error if the container does not exist or the write fails.
pub fn set_member(
    conn: &Connection,
    container_id: ContainerId,
    user: &str,
    level: AccessLevel,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO members (container_id, username, access_level, created_at_us)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (container_id, username)
         DO UPDATE SET access_level = excluded.access_level",
        params![container_id.0, user, level.value(), now_us()],
    )?;
    Ok(())
}

/// Raw stored access level for `user` in a container, if any.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn member_access_value(
    conn: &Connection,
    container_id: ContainerId,
    user: &str,
) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT access_level FROM members WHERE container_id = ?1 AND username = ?2",
        params![container_id.0, user],
        |row| row.get(0),
    )
    .optional()
}

/// Members of a container, highest access first.
///
/// # Errors
///
/// Returns an error if the query fails or a row holds an unknown level.
pub fn list_members(
    conn: &Connection,
    container_id: ContainerId,
) -> rusqlite::Result<Vec<(String, AccessLevel)>> {
    let mut stmt = conn.prepare(
        "SELECT username, access_level FROM members
         WHERE container_id = ?1
         ORDER BY access_level DESC, username ASC",
    )?;
    let rows = stmt.query_map(params![container_id.0], |row| {
        let value: i64 = row.get(1)?;
        let level = AccessLevel::from_value(value).ok_or_else(|| {
            rusqlite::Error::IntegralValueOutOfRange(1, value)
        })?;
        Ok((row.get(0)?, level))
    })?;
    rows.collect()
}

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

/// Create an issue with the next free number in its container.
///
/// # Errors
///
/// Returns an error if the container does not exist or the insert fails.
pub fn create_issue(conn: &Connection, new: &NewIssue<'_>) -> rusqlite::Result<Issue> {
    let now = now_us();
    conn.execute(
        "INSERT INTO issues (
            container_id, number, author, title, description, state,
            created_at_us, updated_at_us
         )
         SELECT ?1, COALESCE(MAX(number), 0) + 1, ?2, ?3, ?4, 'opened', ?5, ?5
         FROM issues WHERE container_id = ?1",
        params![new.container_id.0, new.author, new.title, new.description, now],
    )?;
    let id = IssueId(conn.last_insert_rowid());
    get_issue(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

/// Fetch an issue by store id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_issue(conn: &Connection, id: IssueId) -> rusqlite::Result<Option<Issue>> {
    conn.query_row(
        &format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE issue_id = ?1"),
        params![id.0],
        issue_from_row,
    )
    .optional()
}

/// Fetch an issue by container and per-container number.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn find_issue(
    conn: &Connection,
    container_id: ContainerId,
    number: u64,
) -> rusqlite::Result<Option<Issue>> {
    let Ok(number) = i64::try_from(number) else {
        return Ok(None);
    };
    conn.query_row(
        &format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE container_id = ?1 AND number = ?2"),
        params![container_id.0, number],
        issue_from_row,
    )
    .optional()
}

/// Issues of a container ordered by number.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_issues(conn: &Connection, container_id: ContainerId) -> rusqlite::Result<Vec<Issue>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ISSUE_COLUMNS} FROM issues WHERE container_id = ?1 ORDER BY number"
    ))?;
    let rows = stmt.query_map(params![container_id.0], issue_from_row)?;
    rows.collect()
}

/// Close an issue.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn close_issue(conn: &Connection, id: IssueId) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE issues SET state = 'closed', updated_at_us = ?2 WHERE issue_id = ?1",
        params![id.0, now_us()],
    )?;
    Ok(())
}

/// Point `id` at `target`, but only if `id` has not been moved yet.
///
/// Returns `false` when the conditional update matched no row, meaning
/// another writer tombstoned the issue first.
///
/// # Errors
///
/// Returns an error if the update fails, including when a storage trigger
/// rejects the pointer.
pub fn mark_moved(conn: &Connection, id: IssueId, target: IssueId) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE issues SET moved_to_id = ?2, updated_at_us = ?3
         WHERE issue_id = ?1 AND moved_to_id IS NULL",
        params![id.0, target.0, now_us()],
    )?;
    Ok(changed == 1)
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

/// Append a note to an issue, returning its id.
///
/// # Errors
///
/// Returns an error if the issue does not exist or the insert fails.
pub fn add_note(
    conn: &Connection,
    issue_id: IssueId,
    author: &str,
    body: &str,
    system: bool,
    created_at_us: i64,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO notes (issue_id, author, body, is_system, created_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![issue_id.0, author, body, system, created_at_us],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Notes of an issue in chronological order.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_notes(conn: &Connection, issue_id: IssueId) -> rusqlite::Result<Vec<Note>> {
    let mut stmt = conn.prepare(
        "SELECT note_id, issue_id, author, body, is_system, created_at_us
         FROM notes WHERE issue_id = ?1
         ORDER BY created_at_us ASC, note_id ASC",
    )?;
    let rows = stmt.query_map(params![issue_id.0], note_from_row)?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn container(conn: &Connection, namespace: &str, path: &str) -> Container {
        insert_container(
            conn,
            &NewContainer {
                namespace,
                path,
                name: path,
                visibility: Visibility::Private,
            },
        )
        .expect("insert container")
    }

    fn issue(conn: &Connection, container_id: ContainerId, title: &str) -> Issue {
        create_issue(
            conn,
            &NewIssue {
                container_id,
                author: "alice",
                title,
                description: "",
            },
        )
        .expect("create issue")
    }

    #[test]
    fn issue_numbers_are_per_container() {
        let conn = open_in_memory().expect("store");
        let a = container(&conn, "acme", "api");
        let b = container(&conn, "acme", "web");

        assert_eq!(issue(&conn, a.id, "one").number, 1);
        assert_eq!(issue(&conn, a.id, "two").number, 2);
        assert_eq!(issue(&conn, b.id, "first in b").number, 1);

        let found = find_issue(&conn, a.id, 2).expect("query").expect("exists");
        assert_eq!(found.title, "two");
        assert!(find_issue(&conn, b.id, 2).expect("query").is_none());
    }

    #[test]
    fn duplicate_full_path_is_rejected() {
        let conn = open_in_memory().expect("store");
        container(&conn, "acme", "api");
        let dup = insert_container(
            &conn,
            &NewContainer {
                namespace: "acme",
                path: "api",
                name: "Again",
                visibility: Visibility::Public,
            },
        );
        assert!(dup.is_err());
    }

    #[test]
    fn blank_name_falls_back_to_path() {
        let conn = open_in_memory().expect("store");
        let c = insert_container(
            &conn,
            &NewContainer {
                namespace: "acme",
                path: "api",
                name: "  ",
                visibility: Visibility::Public,
            },
        )
        .expect("insert");
        assert_eq!(c.name, "api");
    }

    #[test]
    fn find_container_by_full_path() {
        let conn = open_in_memory().expect("store");
        let c = container(&conn, "acme/platform", "api");
        let found = find_container_by_path(&conn, "acme/platform/api")
            .expect("query")
            .expect("exists");
        assert_eq!(found, c);
        assert!(
            find_container_by_path(&conn, "acme/api")
                .expect("query")
                .is_none()
        );
    }

    #[test]
    fn set_member_upserts_level() {
        let conn = open_in_memory().expect("store");
        let c = container(&conn, "acme", "api");
        set_member(&conn, c.id, "bob", AccessLevel::Guest).expect("grant");
        set_member(&conn, c.id, "bob", AccessLevel::Developer).expect("regrant");

        assert_eq!(
            member_access_value(&conn, c.id, "bob").expect("query"),
            Some(AccessLevel::Developer.value())
        );
        assert_eq!(
            list_members(&conn, c.id).expect("members"),
            vec![("bob".to_string(), AccessLevel::Developer)]
        );
    }

    #[test]
    fn visible_containers_include_public_internal_and_memberships() {
        let conn = open_in_memory().expect("store");
        let private_member = container(&conn, "acme", "secret");
        let _private_other = container(&conn, "acme", "hidden");
        let public = insert_container(
            &conn,
            &NewContainer {
                namespace: "acme",
                path: "docs",
                name: "Docs",
                visibility: Visibility::Public,
            },
        )
        .expect("insert");
        set_member(&conn, private_member.id, "bob", AccessLevel::Guest).expect("grant");

        let ids: Vec<ContainerId> = list_visible_containers(&conn, "bob")
            .expect("query")
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![private_member.id, public.id]);
    }

    #[test]
    fn mark_moved_is_conditional_and_write_once() {
        let conn = open_in_memory().expect("store");
        let c = container(&conn, "acme", "api");
        let original = issue(&conn, c.id, "original");
        let first = issue(&conn, c.id, "first target");
        let second = issue(&conn, c.id, "second target");

        assert!(mark_moved(&conn, original.id, first.id).expect("first move"));
        assert!(!mark_moved(&conn, original.id, second.id).expect("second move"));

        let reloaded = get_issue(&conn, original.id).expect("query").expect("exists");
        assert_eq!(reloaded.moved_to, Some(first.id));
    }

    #[test]
    fn storage_rejects_clearing_or_repointing_moved_to() {
        let conn = open_in_memory().expect("store");
        let c = container(&conn, "acme", "api");
        let original = issue(&conn, c.id, "original");
        let target = issue(&conn, c.id, "target");
        let other = issue(&conn, c.id, "other");
        assert!(mark_moved(&conn, original.id, target.id).expect("move"));

        let cleared = conn.execute(
            "UPDATE issues SET moved_to_id = NULL WHERE issue_id = ?1",
            params![original.id.0],
        );
        assert!(cleared.is_err(), "clearing moved_to must be rejected");

        let repointed = conn.execute(
            "UPDATE issues SET moved_to_id = ?2 WHERE issue_id = ?1",
            params![original.id.0, other.id.0],
        );
        assert!(repointed.is_err(), "re-pointing moved_to must be rejected");

        let reloaded = get_issue(&conn, original.id).expect("query").expect("exists");
        assert_eq!(reloaded.moved_to, Some(target.id));
    }

    #[test]
    fn storage_rejects_self_and_tombstone_targets() {
        let conn = open_in_memory().expect("store");
        let c = container(&conn, "acme", "api");
        let a = issue(&conn, c.id, "a");
        let b = issue(&conn, c.id, "b");
        let d = issue(&conn, c.id, "d");

        assert!(mark_moved(&conn, a.id, a.id).is_err(), "self pointer");

        assert!(mark_moved(&conn, b.id, d.id).expect("move b"));
        assert!(
            mark_moved(&conn, a.id, b.id).is_err(),
            "pointer to a tombstone"
        );
    }

    #[test]
    fn notes_are_listed_chronologically() {
        let conn = open_in_memory().expect("store");
        let c = container(&conn, "acme", "api");
        let i = issue(&conn, c.id, "with notes");

        add_note(&conn, i.id, "bob", "second", false, 20).expect("note");
        add_note(&conn, i.id, "carol", "first", false, 10).expect("note");
        add_note(&conn, i.id, "system", "third", true, 30).expect("note");

        let bodies: Vec<(String, bool)> = list_notes(&conn, i.id)
            .expect("notes")
            .into_iter()
            .map(|n| (n.body, n.system))
            .collect();
        assert_eq!(
            bodies,
            vec![
                ("first".to_string(), false),
                ("second".to_string(), false),
                ("third".to_string(), true),
            ]
        );
    }

    #[test]
    fn close_issue_sets_state() {
        let conn = open_in_memory().expect("store");
        let c = container(&conn, "acme", "api");
        let i = issue(&conn, c.id, "to close");
        close_issue(&conn, i.id).expect("close");
        let reloaded = get_issue(&conn, i.id).expect("query").expect("exists");
        assert_eq!(reloaded.state, IssueState::Closed);
    }
}
