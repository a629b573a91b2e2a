//! Configuration loading and root folder resolution
//!
//! Every value is resolved in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::relationships::ActiveRelationshipPolicy;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ENV_ROOT: &str = "FITCOACH_ROOT";
/// Environment variable overriding the listen address
pub const ENV_BIND: &str = "FITCOACH_BIND";
/// Environment variable overriding the active relationship policy
pub const ENV_ACTIVE_POLICY: &str = "FITCOACH_ACTIVE_POLICY";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "fitcoach.db";

const DEFAULT_BIND: &str = "127.0.0.1:5780";
const DEFAULT_EVENT_BUS_CAPACITY: usize = 1000;

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind: Option<String>,
    pub active_relationship_policy: Option<ActiveRelationshipPolicy>,
    pub event_bus_capacity: Option<usize>,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root_folder: Option<PathBuf>,
    pub bind: Option<String>,
    pub active_relationship_policy: Option<ActiveRelationshipPolicy>,
    /// Explicit config file; replaces the platform search path
    pub config_file: Option<PathBuf>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CoachConfig {
    pub root_folder: PathBuf,
    pub bind: String,
    pub active_relationship_policy: ActiveRelationshipPolicy,
    pub event_bus_capacity: usize,
}

impl CoachConfig {
    /// Resolve configuration from CLI, environment, TOML and defaults
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let toml = match cli.config_file.clone().or_else(default_config_file) {
            Some(path) => load_toml_config(&path),
            None => {
                info!("No config file found, using defaults");
                TomlConfig::default()
            }
        };
        Self::resolve_with(cli, &toml)
    }

    /// Resolve against an already-loaded TOML config
    pub fn resolve_with(cli: &CliOverrides, toml: &TomlConfig) -> Result<Self> {
        let root_folder = cli
            .root_folder
            .clone()
            .or_else(|| std::env::var(ENV_ROOT).ok().map(PathBuf::from))
            .or_else(|| toml.root_folder.clone())
            .unwrap_or_else(default_root_folder);

        let bind = cli
            .bind
            .clone()
            .or_else(|| std::env::var(ENV_BIND).ok())
            .or_else(|| toml.bind.clone())
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        let env_policy = match std::env::var(ENV_ACTIVE_POLICY) {
            Ok(raw) => Some(raw.parse::<ActiveRelationshipPolicy>().map_err(|e| {
                Error::Config(format!("{}: {}", ENV_ACTIVE_POLICY, e))
            })?),
            Err(_) => None,
        };
        let active_relationship_policy = cli
            .active_relationship_policy
            .or(env_policy)
            .or(toml.active_relationship_policy)
            .unwrap_or_default();

        let event_bus_capacity = toml
            .event_bus_capacity
            .unwrap_or(DEFAULT_EVENT_BUS_CAPACITY);
        if event_bus_capacity == 0 {
            return Err(Error::Config(
                "event_bus_capacity must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            root_folder,
            bind,
            active_relationship_policy,
            event_bus_capacity,
        })
    }

    /// Location of the SQLite database
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }
}

/// Load a TOML config file
///
/// A missing or malformed file is not fatal: a warning is logged and the
/// defaults are used instead.
pub fn load_toml_config(path: &Path) -> TomlConfig {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Config file {} not readable ({}), using defaults", path.display(), e);
            return TomlConfig::default();
        }
    };

    match toml::from_str::<TomlConfig>(&content) {
        Ok(config) => {
            info!("Loaded config file {}", path.display());
            config
        }
        Err(e) => {
            warn!("Config file {} is malformed ({}), using defaults", path.display(), e);
            TomlConfig::default()
        }
    }
}

/// First existing config file: ~/.config/fitcoach/config.toml, then /etc/fitcoach/config.toml
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("fitcoach").join("config.toml"));
    let system_config = PathBuf::from("/etc/fitcoach/config.toml");

    user_config
        .into_iter()
        .chain(std::iter::once(system_config))
        .find(|path| path.exists())
}

/// OS-dependent default root folder
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("fitcoach"))
        .unwrap_or_else(|| PathBuf::from("./fitcoach_data"))
}
