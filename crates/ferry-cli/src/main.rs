#![forbid(unsafe_code)]

mod actor;
mod cmd;
mod output;

use clap::{Parser, Subcommand};
use ferry_core::config::{UserConfig, load_user_config};
use output::OutputMode;
use std::env;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "ferry: move issues between projects without breaking references",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output (shorthand for `--format json`).
    #[arg(long, global = true)]
    json: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Act as this user (skips env and config resolution).
    #[arg(long, global = true)]
    actor: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn actor_flag(&self) -> Option<&str> {
        self.actor.as_deref()
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a ferry project",
        long_about = "Create .ferry/ with a migrated store and a default config.",
        after_help = "EXAMPLES:\n    ferry init\n    ferry init --json"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Manage containers",
        after_help = "EXAMPLES:\n    ferry container add acme web --name \"Web App\" --visibility internal\n    ferry container list --json"
    )]
    Container {
        #[command(subcommand)]
        command: cmd::container::ContainerCommand,
    },

    #[command(
        next_help_heading = "Setup",
        about = "Manage container memberships",
        after_help = "EXAMPLES:\n    ferry member add acme/web rita reporter\n    ferry member list acme/web"
    )]
    Member {
        #[command(subcommand)]
        command: cmd::member::MemberCommand,
    },

    #[command(
        next_help_heading = "Issues",
        about = "Create, show, and comment on issues",
        after_help = "EXAMPLES:\n    ferry issue create acme/web --title \"Crash on save\"\n    ferry issue show acme/web#1\n    ferry issue note acme/web#1 --body \"Same as #4\""
    )]
    Issue {
        #[command(subcommand)]
        command: cmd::issue::IssueCommand,
    },

    #[command(
        next_help_heading = "Move",
        about = "List where an issue could be moved",
        long_about = "Show the destination picker for an issue as the acting user would see it. \
                      Reports that the move is not offered when the actor lacks access or the \
                      issue was already moved.",
        after_help = "EXAMPLES:\n    ferry --actor rita destinations acme/web#1"
    )]
    Destinations(cmd::destinations::DestinationsArgs),

    #[command(
        next_help_heading = "Move",
        about = "Move an issue to another container",
        long_about = "Create a copy of the issue in the destination with rewritten references \
                      and turn the original into a tombstone pointing at it.",
        after_help = "EXAMPLES:\n    ferry --actor rita move acme/web#1 --to acme/api\n    ferry move acme/web#1 --to acme/api --json"
    )]
    Move(cmd::move_cmd::MoveArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("FERRY_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "ferry=debug,ferry_core=debug,info"
        } else {
            "ferry=info,ferry_core=info,warn"
        })
    });

    let format = env::var("FERRY_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    // Logs go to stderr so stdout stays parseable.
    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let user_config = load_user_config().unwrap_or_else(|e| {
        tracing::warn!(error = format!("{e:#}"), "ignoring unreadable user config");
        UserConfig::default()
    });

    let project_root = std::env::current_dir()?;
    let output = output::resolve_output_mode(cli.format, cli.json, user_config.output.as_deref());
    let actor_flag = cli.actor_flag();
    let config_actor = user_config.actor.as_deref();

    match cli.command {
        Commands::Init(ref args) => cmd::init::run_init(args, output, &project_root),
        Commands::Container { ref command } => {
            cmd::container::run_container(command, output, &project_root)
        }
        Commands::Member { ref command } => cmd::member::run_member(command, output, &project_root),
        Commands::Issue { ref command } => {
            cmd::issue::run_issue(command, actor_flag, config_actor, output, &project_root)
        }
        Commands::Destinations(ref args) => cmd::destinations::run_destinations(
            args,
            actor_flag,
            config_actor,
            output,
            &project_root,
        ),
        Commands::Move(ref args) => {
            cmd::move_cmd::run_move(args, actor_flag, config_actor, output, &project_root)
        }
    }
}
