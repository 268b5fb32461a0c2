//! `ferry move`: relocate an issue into another container.

use anyhow::Result;
use clap::Args;
use ferry_core::{MoveTarget, Relocator};
use ferry_core::error::MoveError;
use serde::Serialize;
use std::path::Path;

use crate::actor;
use crate::cmd::issue::{IssueView, issue_view};
use crate::cmd::{load_project_config, open_project_store, resolve_issue};
use crate::output::{CliError, OutputMode, fail, render};

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Issue reference (`namespace/path#N`).
    pub issue: String,

    /// Destination container (`namespace/path`). "none" submits the empty
    /// picker selection.
    #[arg(long)]
    pub to: String,
}

impl MoveArgs {
    /// The destination path, or `None` for the empty selection.
    ///
    /// The path is resolved by the relocation itself, so unknown and hidden
    /// containers both surface as an invalid destination.
    fn destination(&self) -> Option<&str> {
        let to = self.to.trim();
        if to.is_empty() || to.eq_ignore_ascii_case("none") {
            None
        } else {
            Some(to)
        }
    }
}

#[derive(Debug, Serialize)]
struct MoveReport {
    ok: bool,
    from: String,
    to: String,
    copied_notes: usize,
    original: IssueView,
    moved: IssueView,
}

pub fn run_move(
    args: &MoveArgs,
    actor_flag: Option<&str>,
    config_actor: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let actor = actor::require_actor(actor_flag, config_actor).map_err(|e| {
        fail(
            output,
            &CliError::with_details(&e.message, "Set --actor or FERRY_ACTOR", e.code),
        )
    })?;
    let config = load_project_config(project_root, output)?;
    let mut conn = open_project_store(project_root, output)?;

    let (_, issue) = resolve_issue(&conn, &args.issue, output)?;
    let destination = args.destination().map(MoveTarget::Path);

    let relocator = Relocator::new(config.relocation);
    let relocation = match relocator.relocate_to(&mut conn, &actor, issue.id, destination) {
        Ok(relocation) => relocation,
        Err(err) => {
            if let MoveError::PersistenceFailure(ref source) = err {
                tracing::error!(error = %source, issue = %args.issue, "relocation storage failure");
            }
            return Err(fail(output, &CliError::from(&err)));
        }
    };

    let from = relocation.source.issue_reference(relocation.original.number);
    let to = relocation.destination.issue_reference(relocation.moved.number);
    let report = MoveReport {
        ok: true,
        copied_notes: relocation.copied_notes,
        original: issue_view(&conn, from.clone(), relocation.original)?,
        moved: issue_view(&conn, to.clone(), relocation.moved)?,
        from,
        to,
    };

    render(output, &report, |r, w| {
        writeln!(w, "✓ {} moved to {}", r.from, r.to)?;
        if r.copied_notes > 0 {
            writeln!(w, "  {} note(s) copied", r.copied_notes)?;
        }
        Ok(())
    })
}
