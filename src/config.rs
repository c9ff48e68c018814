use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ExportError, Result};

/// Config file looked up in the working directory when no explicit path is given.
pub const LOCAL_CONFIG_FILE: &str = "client_export.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub rules: RulesConfig,
}

impl Config {
    /// Load configuration: defaults, then the first config file found, then
    /// `CLIENT_EXPORT_*` environment overrides.
    ///
    /// An explicit path must exist; the implicit locations are optional.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = explicit_path {
            if !path.exists() {
                return Err(ExportError::MissingConfig(format!(
                    "config file {} not found",
                    path.display()
                )));
            }
            if let Some(patch) = Self::load_patch(path)? {
                config.merge_patch(patch);
            }
        } else if let Some(patch) = Self::load_implicit()? {
            config.merge_patch(patch);
        }

        config.apply_overrides(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    /// Parse a config document without touching the filesystem or environment.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let patch: ConfigPatch = toml::from_str(raw)
            .map_err(|err| ExportError::Config(format!("parse config: {err}")))?;
        let mut config = Self::default();
        config.merge_patch(patch);
        Ok(config)
    }

    fn load_implicit() -> Result<Option<ConfigPatch>> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if let Some(patch) = Self::load_patch(&local)? {
            return Ok(Some(patch));
        }
        match dirs::config_dir() {
            Some(dir) => Self::load_patch(&dir.join("client-export/config.toml")),
            None => Ok(None),
        }
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        debug!(path = %path.display(), "loading config");
        let raw = std::fs::read_to_string(path)
            .map_err(|err| ExportError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| ExportError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.database {
            self.database.merge(patch);
        }
        if let Some(patch) = patch.paths {
            self.paths.merge(patch);
        }
        if let Some(patch) = patch.rules {
            self.rules.merge(patch);
        }
    }

    /// Apply `CLIENT_EXPORT_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("CLIENT_EXPORT_DATABASE_PATH") {
            self.database.path = PathBuf::from(value);
        }
        if let Some(value) = lookup("CLIENT_EXPORT_CONTENT_DATABASE_PATH") {
            self.database.content_path = non_empty(value).map(PathBuf::from);
        }
        if let Some(value) = lookup("CLIENT_EXPORT_SERVER_PATH") {
            self.paths.server = PathBuf::from(value);
        }
        if let Some(value) = lookup("CLIENT_EXPORT_RULESET_ID") {
            self.rules.ruleset_id = match non_empty(value) {
                Some(value) => Some(value.trim().parse::<i64>().map_err(|err| {
                    ExportError::Config(format!(
                        "invalid CLIENT_EXPORT_RULESET_ID value {value}: {err}"
                    ))
                })?),
                None => None,
            };
        }
        Ok(())
    }

    /// Directory the export files are written to.
    pub fn export_dir(&self) -> PathBuf {
        self.paths.server.join("export")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Primary database holding rules and db strings.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
    /// Separate content database; the primary is reused when unset.
    #[serde(default)]
    pub content_path: Option<PathBuf>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            content_path: None,
        }
    }
}

impl DatabaseConfig {
    fn merge(&mut self, patch: DatabasePatch) {
        if let Some(value) = patch.path {
            self.path = value;
        }
        if let Some(value) = patch.content_path {
            self.content_path = Some(value);
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("eqemu.db")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_server_path")]
    pub server: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            server: default_server_path(),
        }
    }
}

impl PathsConfig {
    fn merge(&mut self, patch: PathsPatch) {
        if let Some(value) = patch.server {
            self.server = value;
        }
    }
}

fn default_server_path() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default)]
    pub ruleset_id: Option<i64>,
}

impl RulesConfig {
    fn merge(&mut self, patch: RulesPatch) {
        if let Some(value) = patch.ruleset_id {
            self.ruleset_id = Some(value);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub database: Option<DatabasePatch>,
    pub paths: Option<PathsPatch>,
    pub rules: Option<RulesPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DatabasePatch {
    pub path: Option<PathBuf>,
    pub content_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PathsPatch {
    pub server: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RulesPatch {
    pub ruleset_id: Option<i64>,
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
