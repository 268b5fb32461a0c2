use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::db::FERRY_DIR;
use crate::model::access::AccessLevel;

/// Lowest level that may ever move an issue, whatever the config says.
pub const MOVE_ACCESS_FLOOR: AccessLevel = AccessLevel::Reporter;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default, rename = "move")]
    pub relocation: MoveConfig,
}

/// Who becomes the author of the issue created in the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorPolicy {
    /// Keep the original issue's author.
    #[default]
    Original,
    /// Attribute the new issue to the user performing the move.
    Actor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveConfig {
    #[serde(default)]
    pub author: AuthorPolicy,
    #[serde(default = "default_true")]
    pub close_original: bool,
    #[serde(default = "default_true")]
    pub copy_notes: bool,
    /// Level required in both the source and the destination container.
    /// Never below [`MOVE_ACCESS_FLOOR`]; see [`MoveConfig::required_access`].
    #[serde(default = "default_min_access")]
    pub min_access: AccessLevel,
}

impl Default for MoveConfig {
    fn default() -> Self {
        Self {
            author: AuthorPolicy::default(),
            close_original: default_true(),
            copy_notes: default_true(),
            min_access: default_min_access(),
        }
    }
}

impl MoveConfig {
    /// The level actually enforced: `min_access`, raised to the floor.
    #[must_use]
    pub fn required_access(&self) -> AccessLevel {
        self.min_access.max(MOVE_ACCESS_FLOOR)
    }

    /// Reject settings that would let a lower level move issues.
    ///
    /// # Errors
    ///
    /// Returns an error if `min_access` is below [`MOVE_ACCESS_FLOOR`].
    pub fn validate(&self) -> Result<()> {
        if self.min_access < MOVE_ACCESS_FLOOR {
            anyhow::bail!(
                "move.min_access = \"{}\" is below the minimum \"{MOVE_ACCESS_FLOOR}\"",
                self.min_access
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    /// Default actor identity when `--actor` and `FERRY_ACTOR` are unset.
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
}

/// Load `.ferry/config.toml`, falling back to defaults when it is absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(FERRY_DIR).join("config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config = toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config
        .relocation
        .validate()
        .with_context(|| format!("Invalid {}", path.display()))?;
    Ok(config)
}

/// Load `<config dir>/ferry/config.toml`, falling back to defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("ferry/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

const fn default_true() -> bool {
    true
}

const fn default_min_access() -> AccessLevel {
    AccessLevel::Reporter
}
