use anyhow::{Context as _, Result};
use clap::Args;
use ferry_core::db::{self, FERRY_DIR, migrations};
use serde::Serialize;
use std::path::Path;

use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Rewrite the default config even if `.ferry/config.toml` exists.
    #[arg(long)]
    pub force: bool,
}

const CONFIG_TOML: &str = "[move]\n\
    # \"original\" keeps the original author, \"actor\" credits whoever moves the issue\n\
    author = \"original\"\n\
    close_original = true\n\
    copy_notes = true\n\
    min_access = \"reporter\"\n";

const GITIGNORE: &str = "ferry.db\nferry.db-wal\nferry.db-shm\n";

#[derive(Debug, Serialize)]
struct InitReport {
    store: String,
    config: String,
    schema_version: u32,
    config_written: bool,
}

/// Execute `ferry init`. Creates the project skeleton:
///
/// ```text
/// .ferry/
///   ferry.db      (migrated store)
///   config.toml   (default project config, kept unless --force)
///   .gitignore    (ferry.db and its WAL files)
/// ```
///
/// Re-running is safe: the store is migrated in place and existing data is
/// kept.
pub fn run_init(args: &InitArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let ferry_dir = project_root.join(FERRY_DIR);
    std::fs::create_dir_all(&ferry_dir)
        .with_context(|| format!("Failed to create {}", ferry_dir.display()))?;

    let store_path = db::store_path(project_root);
    let conn = db::open_store(&store_path)?;
    let schema_version = migrations::current_schema_version(&conn)?;

    let config_path = ferry_dir.join("config.toml");
    let config_written = args.force || !config_path.exists();
    if config_written {
        std::fs::write(&config_path, CONFIG_TOML)
            .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
    }

    let gitignore_path = ferry_dir.join(".gitignore");
    std::fs::write(&gitignore_path, GITIGNORE)
        .with_context(|| format!("Failed to write .gitignore: {}", gitignore_path.display()))?;

    tracing::info!(store = %store_path.display(), schema_version, "initialized project");

    let report = InitReport {
        store: store_path.display().to_string(),
        config: config_path.display().to_string(),
        schema_version,
        config_written,
    };

    render(output, &report, |r, w| {
        writeln!(w, "✓ Initialized {FERRY_DIR}/ (schema v{})", r.schema_version)?;
        writeln!(w)?;
        writeln!(w, "  Store:  {}", r.store)?;
        writeln!(w, "  Config: {}", r.config)?;
        writeln!(w)?;
        writeln!(w, "Next steps:")?;
        writeln!(w, "  ferry container add acme web --visibility private")?;
        writeln!(w, "  ferry member add acme/web \"$USER\" reporter")?;
        writeln!(w, "  export FERRY_ACTOR=\"$USER\"")
    })
}
