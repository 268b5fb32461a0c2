//! `ferry destinations`: what the move picker would offer for an issue.

use anyhow::Result;
use clap::Args;
use ferry_core::catalog::MoveDestination;
use ferry_core::{MembershipAccess, move_options};
use serde::Serialize;
use std::path::Path;

use crate::actor;
use crate::cmd::{load_project_config, open_project_store, resolve_issue};
use crate::output::{CliError, OutputMode, fail, pretty_section, render};

#[derive(Args, Debug)]
pub struct DestinationsArgs {
    /// Issue reference (`namespace/path#N`).
    pub issue: String,
}

#[derive(Debug, Serialize)]
struct PickerOption {
    label: String,
    /// Value to pass to `ferry move --to`.
    value: String,
    container_id: Option<i64>,
}

#[derive(Debug, Serialize)]
struct DestinationsReport {
    issue: String,
    actor: String,
    offered: bool,
    destinations: Vec<PickerOption>,
}

fn option_from(destination: &MoveDestination) -> PickerOption {
    PickerOption {
        label: destination.label(),
        value: match destination {
            MoveDestination::Unselected => "none".to_string(),
            MoveDestination::Container(c) => c.full_path(),
        },
        container_id: destination.container_id().map(|id| id.0),
    }
}

pub fn run_destinations(
    args: &DestinationsArgs,
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
    let conn = open_project_store(project_root, output)?;
    let (_, issue) = resolve_issue(&conn, &args.issue, output)?;

    let access = MembershipAccess::new(&conn);
    let options = move_options(&conn, &access, &actor, &issue, config.relocation.required_access())?;

    let report = DestinationsReport {
        issue: args.issue.clone(),
        actor,
        offered: options.is_some(),
        destinations: options
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(option_from)
            .collect(),
    };

    render(output, &report, |r, w| {
        if !r.offered {
            return writeln!(w, "move not offered for {} to {}", r.issue, r.actor);
        }
        if output.is_pretty() {
            pretty_section(w, &format!("Move {} to", r.issue))?;
        }
        for option in &r.destinations {
            writeln!(w, "{}\t{}", option.value, option.label)?;
        }
        Ok(())
    })
}
