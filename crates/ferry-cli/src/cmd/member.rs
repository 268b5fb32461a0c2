//! `ferry member`: grant and list container memberships.

use anyhow::Result;
use clap::{Args, Subcommand};
use ferry_core::AccessLevel;
use ferry_core::db::store;
use serde::Serialize;
use std::path::Path;

use crate::cmd::{open_project_store, resolve_container};
use crate::output::{OutputMode, render};

#[derive(Subcommand, Debug)]
pub enum MemberCommand {
    /// Grant (or change) a user's level in a container.
    Add(AddArgs),
    /// List the members of a container.
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Container full path (`namespace/path`).
    pub container: String,

    /// User name.
    pub user: String,

    /// guest, reporter, developer, maintainer, or owner.
    pub level: AccessLevel,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Container full path (`namespace/path`).
    pub container: String,
}

#[derive(Debug, Serialize)]
struct MemberView {
    container: String,
    user: String,
    level: AccessLevel,
}

pub fn run_member(command: &MemberCommand, output: OutputMode, project_root: &Path) -> Result<()> {
    match command {
        MemberCommand::Add(args) => run_add(args, output, project_root),
        MemberCommand::List(args) => run_list(args, output, project_root),
    }
}

fn run_add(args: &AddArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let conn = open_project_store(project_root, output)?;
    let container = resolve_container(&conn, &args.container, output)?;
    store::set_member(&conn, container.id, &args.user, args.level)?;

    tracing::info!(
        container = %container.full_path(),
        user = %args.user,
        level = %args.level,
        "granted membership"
    );

    let view = MemberView {
        container: container.full_path(),
        user: args.user.clone(),
        level: args.level,
    };
    render(output, &view, |v, w| {
        writeln!(w, "✓ {} is {} in {}", v.user, v.level, v.container)
    })
}

fn run_list(args: &ListArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let conn = open_project_store(project_root, output)?;
    let container = resolve_container(&conn, &args.container, output)?;
    let views: Vec<MemberView> = store::list_members(&conn, container.id)?
        .into_iter()
        .map(|(user, level)| MemberView {
            container: container.full_path(),
            user,
            level,
        })
        .collect();

    render(output, &views, |views, w| {
        for v in views {
            writeln!(w, "{}\t{}", v.user, v.level)?;
        }
        Ok(())
    })
}
