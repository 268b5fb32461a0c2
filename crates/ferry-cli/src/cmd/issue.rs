//! `ferry issue`: create, show, and comment on issues.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use ferry_core::db::store::{self, NewIssue};
use ferry_core::model::note::Note;
use ferry_core::{Issue, IssueState};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

use crate::actor;
use crate::cmd::{open_project_store, resolve_container, resolve_issue};
use crate::output::{CliError, OutputMode, fail, pretty_kv, pretty_rule, pretty_section, render};

#[derive(Subcommand, Debug)]
pub enum IssueCommand {
    /// Open a new issue in a container.
    Create(CreateArgs),
    /// Show one issue with its notes.
    Show(ShowArgs),
    /// Add a comment to an issue.
    Note(NoteArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Container full path (`namespace/path`).
    pub container: String,

    #[arg(long)]
    pub title: String,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Author of the issue. Defaults to the resolved actor.
    #[arg(long)]
    pub author: Option<String>,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Issue reference (`namespace/path#N`).
    pub issue: String,
}

#[derive(Args, Debug)]
pub struct NoteArgs {
    /// Issue reference (`namespace/path#N`).
    pub issue: String,

    #[arg(long)]
    pub body: String,

    /// Author of the note. Defaults to the resolved actor.
    #[arg(long)]
    pub author: Option<String>,
}

/// An issue together with its resolved references.
#[derive(Debug, Serialize)]
pub struct IssueView {
    #[serde(flatten)]
    pub issue: Issue,
    pub reference: String,
    /// Reference of the issue this one moved to, when it is a tombstone.
    pub moved_to_reference: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
}

/// Build the view for `issue`, following its `moved_to` pointer.
pub fn issue_view(conn: &Connection, reference: String, issue: Issue) -> Result<IssueView> {
    let moved_to_reference = match issue.moved_to {
        Some(target) => target_reference(conn, target)?,
        None => None,
    };
    Ok(IssueView {
        issue,
        reference,
        moved_to_reference,
        notes: Vec::new(),
    })
}

fn target_reference(conn: &Connection, target: ferry_core::IssueId) -> Result<Option<String>> {
    let Some(issue) = store::get_issue(conn, target)? else {
        return Ok(None);
    };
    let container = store::get_container(conn, issue.container_id)?;
    Ok(container.map(|c| c.issue_reference(issue.number)))
}

pub fn run_issue(
    command: &IssueCommand,
    actor_flag: Option<&str>,
    config_actor: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    match command {
        IssueCommand::Create(args) => {
            run_create(args, actor_flag, config_actor, output, project_root)
        }
        IssueCommand::Show(args) => run_show(args, output, project_root),
        IssueCommand::Note(args) => run_note(args, actor_flag, config_actor, output, project_root),
    }
}

fn author_or_actor(
    explicit: Option<&str>,
    actor_flag: Option<&str>,
    config_actor: Option<&str>,
    output: OutputMode,
) -> Result<String> {
    if let Some(author) = explicit.filter(|a| !a.is_empty()) {
        return Ok(author.to_string());
    }
    actor::require_actor(actor_flag, config_actor).map_err(|e| {
        fail(
            output,
            &CliError::with_details(&e.message, "Pass --author or set --actor/FERRY_ACTOR", e.code),
        )
    })
}

fn run_create(
    args: &CreateArgs,
    actor_flag: Option<&str>,
    config_actor: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let author = author_or_actor(args.author.as_deref(), actor_flag, config_actor, output)?;
    if args.title.trim().is_empty() {
        return Err(fail(output, &CliError::new("issue title must not be empty")));
    }

    let conn = open_project_store(project_root, output)?;
    let container = resolve_container(&conn, &args.container, output)?;
    let issue = store::create_issue(
        &conn,
        &NewIssue {
            container_id: container.id,
            author: &author,
            title: args.title.trim(),
            description: &args.description,
        },
    )?;

    let reference = container.issue_reference(issue.number);
    tracing::info!(issue = %reference, author = %author, "created issue");

    let view = issue_view(&conn, reference, issue)?;
    render(output, &view, |v, w| {
        writeln!(w, "✓ {} created: {}", v.reference, v.issue.title)
    })
}

fn run_show(args: &ShowArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let conn = open_project_store(project_root, output)?;
    let (container, issue) = resolve_issue(&conn, &args.issue, output)?;
    let notes = store::list_notes(&conn, issue.id)?;

    let mut view = issue_view(&conn, container.issue_reference(issue.number), issue)?;
    view.notes = notes;

    render(output, &view, |v, w| {
        if output.is_pretty() {
            pretty_section(w, &format!("{} {}", v.reference, v.issue.title))?;
            pretty_kv(w, "State", state_label(v))?;
            pretty_kv(w, "Author", &v.issue.author)?;
            pretty_kv(w, "Created", format_us(v.issue.created_at_us))?;
            if let Some(ref target) = v.moved_to_reference {
                pretty_kv(w, "Moved to", target)?;
            }
            if !v.issue.description.is_empty() {
                writeln!(w)?;
                writeln!(w, "{}", v.issue.description)?;
            }
            if !v.notes.is_empty() {
                writeln!(w)?;
                pretty_section(w, &format!("Notes ({})", v.notes.len()))?;
                for note in &v.notes {
                    let marker = if note.system { "*" } else { "-" };
                    writeln!(
                        w,
                        "{marker} {} ({}): {}",
                        note.author,
                        format_us(note.created_at_us),
                        note.body
                    )?;
                }
                pretty_rule(w)?;
            }
            Ok(())
        } else {
            writeln!(
                w,
                "{}\t{}\t{}\t{}",
                v.reference,
                state_label(v),
                v.issue.author,
                v.issue.title
            )?;
            if let Some(ref target) = v.moved_to_reference {
                writeln!(w, "moved_to\t{target}")?;
            }
            for note in &v.notes {
                writeln!(w, "note\t{}\t{}", note.author, note.body)?;
            }
            Ok(())
        }
    })
}

fn run_note(
    args: &NoteArgs,
    actor_flag: Option<&str>,
    config_actor: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let author = author_or_actor(args.author.as_deref(), actor_flag, config_actor, output)?;
    let conn = open_project_store(project_root, output)?;
    let (container, issue) = resolve_issue(&conn, &args.issue, output)?;
    let id = store::add_note(&conn, issue.id, &author, &args.body, false, store::now_us())?;

    let reference = container.issue_reference(issue.number);
    tracing::info!(issue = %reference, note = id, "added note");

    let value = serde_json::json!({
        "ok": true,
        "issue": reference,
        "note_id": id,
        "author": author,
    });
    render(output, &value, |v, w| {
        writeln!(
            w,
            "✓ note added to {}",
            v["issue"].as_str().unwrap_or_default()
        )
    })
}

fn state_label(view: &IssueView) -> String {
    match (view.issue.state, view.issue.is_moved()) {
        (IssueState::Closed, true) => "closed (moved)".to_string(),
        (IssueState::Opened, true) => "opened (moved)".to_string(),
        (state, false) => state.to_string(),
    }
}

fn format_us(us: i64) -> String {
    DateTime::<Utc>::from_timestamp_micros(us)
        .map_or_else(|| us.to_string(), |t| t.format("%Y-%m-%d %H:%M UTC").to_string())
}
