//! Actor identity resolution for CLI commands.
//!
//! The resolution chain: `--actor` flag > `FERRY_ACTOR` env > user config
//! `actor` > `USER` env (TTY only). Commands that act on behalf of someone
//! (moves, destination listings) require an actor; seeding commands do not.

use std::env;

/// Errors from actor resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorResolutionError {
    /// Human-readable description.
    pub message: String,
    /// Machine error code.
    pub code: &'static str,
}

impl std::fmt::Display for ActorResolutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ActorResolutionError {}

/// Environment reader trait for dependency injection in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
    fn is_tty(&self) -> bool;
}

struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.is_empty())
    }

    fn is_tty(&self) -> bool {
        use std::io::IsTerminal;
        std::io::stdin().is_terminal()
    }
}

fn resolve_actor_with(
    cli_flag: Option<&str>,
    config_actor: Option<&str>,
    env: &dyn EnvReader,
) -> Option<String> {
    if let Some(actor) = cli_flag.filter(|a| !a.is_empty()) {
        return Some(actor.to_string());
    }

    if let Some(val) = env.get("FERRY_ACTOR") {
        return Some(val);
    }

    if let Some(actor) = config_actor.filter(|a| !a.is_empty()) {
        return Some(actor.to_string());
    }

    // USER only counts for interactive sessions
    if env.is_tty() {
        return env.get("USER");
    }

    None
}

/// Resolve the actor identity, or `None` if no source provides one.
pub fn resolve_actor(cli_flag: Option<&str>, config_actor: Option<&str>) -> Option<String> {
    resolve_actor_with(cli_flag, config_actor, &RealEnv)
}

/// Resolve the actor identity, returning an error if not found.
pub fn require_actor(
    cli_flag: Option<&str>,
    config_actor: Option<&str>,
) -> Result<String, ActorResolutionError> {
    resolve_actor(cli_flag, config_actor).ok_or_else(|| ActorResolutionError {
        message: "Actor identity required for this command. \
                  Set --actor or the FERRY_ACTOR environment variable."
            .to_string(),
        code: "missing_actor",
    })
}
