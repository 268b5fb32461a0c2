//! Canonical SQLite schema for the ferry issue store.
//!
//! - `containers` holds projects, addressed by `namespace/path`
//! - `members` maps `(container, user)` to a numeric access level
//! - `issues` carries per-container numbering and the `moved_to_id` forward
//!   pointer that turns an issue into a tombstone
//! - `notes` stores user comments and system notes
//! - `store_meta` tracks the schema version alongside `PRAGMA user_version`

/// Migration v1: core tables plus store metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS containers (
    container_id INTEGER PRIMARY KEY AUTOINCREMENT,
    namespace TEXT NOT NULL CHECK (length(trim(namespace)) > 0),
    path TEXT NOT NULL CHECK (length(trim(path)) > 0),
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    visibility TEXT NOT NULL DEFAULT 'private'
        CHECK (visibility IN ('private', 'internal', 'public')),
    created_at_us INTEGER NOT NULL,
    UNIQUE (namespace, path)
);

CREATE TABLE IF NOT EXISTS members (
    container_id INTEGER NOT NULL REFERENCES containers(container_id) ON DELETE CASCADE,
    username TEXT NOT NULL CHECK (length(trim(username)) > 0),
    access_level INTEGER NOT NULL CHECK (access_level IN (10, 20, 30, 40, 50)),
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (container_id, username)
);

CREATE TABLE IF NOT EXISTS issues (
    issue_id INTEGER PRIMARY KEY AUTOINCREMENT,
    container_id INTEGER NOT NULL REFERENCES containers(container_id),
    number INTEGER NOT NULL CHECK (number > 0),
    author TEXT NOT NULL CHECK (length(trim(author)) > 0),
    title TEXT NOT NULL CHECK (length(trim(title)) > 0),
    description TEXT NOT NULL DEFAULT '',
    state TEXT NOT NULL DEFAULT 'opened' CHECK (state IN ('opened', 'closed')),
    moved_to_id INTEGER REFERENCES issues(issue_id),
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    UNIQUE (container_id, number),
    CHECK (moved_to_id IS NULL OR moved_to_id <> issue_id)
);

CREATE TABLE IF NOT EXISTS notes (
    note_id INTEGER PRIMARY KEY AUTOINCREMENT,
    issue_id INTEGER NOT NULL REFERENCES issues(issue_id) ON DELETE CASCADE,
    author TEXT NOT NULL,
    body TEXT NOT NULL,
    is_system INTEGER NOT NULL DEFAULT 0 CHECK (is_system IN (0, 1)),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);

INSERT OR IGNORE INTO store_meta (id, schema_version) VALUES (1, 1);
";

/// Migration v2: read-path indexes and the tombstone triggers.
///
/// `moved_to_id` is write-once: once non-null it can be neither cleared nor
/// re-pointed, and it may never target an issue that is itself a tombstone.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_members_user_level
    ON members(username, access_level);

CREATE INDEX IF NOT EXISTS idx_containers_visibility
    ON containers(visibility);

CREATE INDEX IF NOT EXISTS idx_issues_moved_to
    ON issues(moved_to_id);

CREATE INDEX IF NOT EXISTS idx_notes_issue_created
    ON notes(issue_id, created_at_us);

CREATE TRIGGER IF NOT EXISTS issues_moved_to_write_once
BEFORE UPDATE OF moved_to_id ON issues
WHEN old.moved_to_id IS NOT NULL
    AND (new.moved_to_id IS NULL OR new.moved_to_id <> old.moved_to_id)
BEGIN
    SELECT RAISE(ABORT, 'moved_to_id is immutable once set');
END;

CREATE TRIGGER IF NOT EXISTS issues_moved_to_live_target
BEFORE UPDATE OF moved_to_id ON issues
WHEN new.moved_to_id IS NOT NULL
    AND EXISTS (
        SELECT 1 FROM issues
        WHERE issue_id = new.moved_to_id AND moved_to_id IS NOT NULL
    )
BEGIN
    SELECT RAISE(ABORT, 'moved_to_id cannot target a moved issue');
END;

UPDATE store_meta
SET schema_version = 2
WHERE id = 1;
";

/// Indexes expected by the catalog and relocation query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_members_user_level",
    "idx_containers_visibility",
    "idx_issues_moved_to",
    "idx_notes_issue_created",
];

/// Triggers that guard the tombstone pointer.
pub const REQUIRED_TRIGGERS: &[&str] = &[
    "issues_moved_to_write_once",
    "issues_moved_to_live_target",
];
