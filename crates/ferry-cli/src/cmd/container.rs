//! `ferry container`: create and list containers.

use anyhow::Result;
use clap::{Args, Subcommand};
use ferry_core::db::store::{self, NewContainer};
use ferry_core::error::ErrorCode;
use ferry_core::{Container, Visibility};
use serde::Serialize;
use std::path::Path;

use crate::cmd::open_project_store;
use crate::output::{CliError, OutputMode, fail, pretty_section, render};

#[derive(Subcommand, Debug)]
pub enum ContainerCommand {
    /// Create a container.
    Add(AddArgs),
    /// List every container.
    List,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Namespace (group or user), e.g. `acme` or `acme/platform`.
    pub namespace: String,

    /// URL slug, unique within the namespace.
    pub path: String,

    /// Human-readable name. Defaults to the path.
    #[arg(long)]
    pub name: Option<String>,

    /// Who can see the container.
    #[arg(long, default_value = "private")]
    pub visibility: Visibility,
}

#[derive(Debug, Serialize)]
struct ContainerView<'a> {
    #[serde(flatten)]
    container: &'a Container,
    full_path: String,
    display_name: String,
}

impl<'a> From<&'a Container> for ContainerView<'a> {
    fn from(container: &'a Container) -> Self {
        Self {
            container,
            full_path: container.full_path(),
            display_name: container.display_name(),
        }
    }
}

pub fn run_container(
    command: &ContainerCommand,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    match command {
        ContainerCommand::Add(args) => run_add(args, output, project_root),
        ContainerCommand::List => run_list(output, project_root),
    }
}

fn run_add(args: &AddArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let conn = open_project_store(project_root, output)?;
    let full_path = format!("{}/{}", args.namespace, args.path);
    if store::find_container_by_path(&conn, &full_path)?.is_some() {
        return Err(fail(
            output,
            &CliError::new(format!("container {full_path} already exists")),
        ));
    }

    let container = store::insert_container(
        &conn,
        &NewContainer {
            namespace: &args.namespace,
            path: &args.path,
            name: args.name.as_deref().unwrap_or(""),
            visibility: args.visibility,
        },
    )
    .map_err(|e| fail(output, &CliError::coded(ErrorCode::InvalidPath, format!("{e:#}"))))?;

    tracing::info!(container = %container.full_path(), "created container");

    render(output, &ContainerView::from(&container), |v, w| {
        writeln!(
            w,
            "✓ {} created ({}, {})",
            v.full_path, v.display_name, v.container.visibility
        )
    })
}

fn run_list(output: OutputMode, project_root: &Path) -> Result<()> {
    let conn = open_project_store(project_root, output)?;
    let containers = store::list_containers(&conn)?;
    let views: Vec<ContainerView<'_>> = containers.iter().map(ContainerView::from).collect();

    render(output, &views, |views, w| {
        if output.is_pretty() {
            pretty_section(w, &format!("Containers ({})", views.len()))?;
        }
        for v in views {
            writeln!(
                w,
                "{}\t{}\t{}",
                v.full_path, v.display_name, v.container.visibility
            )?;
        }
        Ok(())
    })
}
