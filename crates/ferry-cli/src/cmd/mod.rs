pub mod container;
pub mod destinations;
pub mod init;
pub mod issue;
pub mod member;
pub mod move_cmd;

use std::path::Path;

use ferry_core::db::{self, store};
use ferry_core::error::ErrorCode;
use ferry_core::model::container::split_full_path;
use ferry_core::{Container, Issue};
use rusqlite::Connection;

use crate::output::{CliError, OutputMode, fail};

/// An issue addressed as `namespace/path#N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssueRef<'a> {
    pub container: &'a str,
    pub number: u64,
}

/// Parse `namespace/path#N`. Returns `None` for anything else.
pub fn parse_issue_ref(input: &str) -> Option<IssueRef<'_>> {
    let (container, number) = input.rsplit_once('#')?;
    split_full_path(container).ok()?;
    let number = number.parse().ok()?;
    Some(IssueRef { container, number })
}

/// Open the project store, failing with `E1001` when `ferry init` has not
/// been run.
pub fn open_project_store(project_root: &Path, output: OutputMode) -> anyhow::Result<Connection> {
    let path = db::store_path(project_root);
    match db::try_open_store(&path) {
        Ok(Some(conn)) => Ok(conn),
        Ok(None) => Err(fail(
            output,
            &CliError::coded(
                ErrorCode::NotInitialized,
                format!("no ferry store at {}", path.display()),
            ),
        )),
        Err(e) => {
            tracing::error!(error = format!("{e:#}"), "failed to open store");
            Err(fail(
                output,
                &CliError::coded(ErrorCode::PersistenceFailure, "could not open the ferry store"),
            ))
        }
    }
}

/// Look up a container by `namespace/path`.
pub fn resolve_container(
    conn: &Connection,
    full_path: &str,
    output: OutputMode,
) -> anyhow::Result<Container> {
    if split_full_path(full_path).is_err() {
        return Err(fail(
            output,
            &CliError::coded(
                ErrorCode::InvalidPath,
                format!("invalid container path '{full_path}'"),
            ),
        ));
    }
    match store::find_container_by_path(conn, full_path)? {
        Some(container) => Ok(container),
        None => Err(fail(
            output,
            &CliError::coded(
                ErrorCode::ContainerNotFound,
                format!("container not found: {full_path}"),
            ),
        )),
    }
}

/// Look up an issue by `namespace/path#N`, returning it with its container.
pub fn resolve_issue(
    conn: &Connection,
    reference: &str,
    output: OutputMode,
) -> anyhow::Result<(Container, Issue)> {
    let Some(parsed) = parse_issue_ref(reference) else {
        return Err(fail(
            output,
            &CliError::coded(
                ErrorCode::InvalidPath,
                format!("invalid issue reference '{reference}', expected namespace/path#N"),
            ),
        ));
    };

    let container = resolve_container(conn, parsed.container, output)?;
    match store::find_issue(conn, container.id, parsed.number)? {
        Some(issue) => Ok((container, issue)),
        None => Err(fail(
            output,
            &CliError::coded(
                ErrorCode::IssueNotFound,
                format!("issue not found: {reference}"),
            ),
        )),
    }
}

/// Load `.ferry/config.toml`, rendering parse failures as `E1002`.
pub fn load_project_config(
    project_root: &Path,
    output: OutputMode,
) -> anyhow::Result<ferry_core::config::ProjectConfig> {
    ferry_core::config::load_project_config(project_root)
        .map_err(|e| fail(output, &CliError::coded(ErrorCode::ConfigParseError, format!("{e:#}"))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_qualified_issue_refs() {
        assert_eq!(
            parse_issue_ref("acme/web#12"),
            Some(IssueRef {
                container: "acme/web",
                number: 12
            })
        );
        assert_eq!(
            parse_issue_ref("acme/group/web#3").map(|r| r.container),
            Some("acme/group/web")
        );
    }

    #[test]
    fn rejects_malformed_issue_refs() {
        for input in ["#12", "acme#12", "acme/web", "acme/web#", "acme/web#x", "acme/web#-1"] {
            assert_eq!(parse_issue_ref(input), None, "{input} should not parse");
        }
    }
}
