use anyhow::{Context, Result};
use clap::Parser;
use std::{collections::HashMap, env};
use thiserror::Error;

pub const DEFAULT_TRASH_PREFIX: &str = ".trash-";
/// 90 days.
pub const DEFAULT_TRASH_LIFETIME: u64 = 86_400 * 90;

const TRUE_VALUES: [&str; 6] = ["true", "1", "yes", "on", "t", "y"];
const FALSE_VALUES: [&str; 6] = ["false", "0", "no", "off", "f", "n"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("trash_prefix must not be empty")]
    EmptyTrashPrefix,
    #[error("trash_prefix `{0}` must contain only unreserved URL characters and no `/`")]
    InvalidTrashPrefix(String),
    #[error("trash_lifetime `{0}` is not a non-negative number of seconds")]
    InvalidTrashLifetime(String),
    #[error("`{key}` expects a boolean, got `{value}`")]
    InvalidBool { key: String, value: String },
}

/// Settings of the undelete layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndeleteConfig {
    /// Prepended to a container name to name its trash container.
    pub trash_prefix: String,
    /// `X-Delete-After` for trashed copies, in seconds; `0` keeps them forever.
    pub trash_lifetime: u64,
    /// Refuse deletes inside trash containers with `405 Method Not Allowed`.
    pub block_trash_deletes: bool,
}

impl Default for UndeleteConfig {
    fn default() -> Self {
        Self {
            trash_prefix: DEFAULT_TRASH_PREFIX.into(),
            trash_lifetime: DEFAULT_TRASH_LIFETIME,
            block_trash_deletes: false,
        }
    }
}

impl UndeleteConfig {
    /// Build from `trash_prefix` / `trash_lifetime` / `block_trash_deletes`
    /// string settings. Missing keys take their defaults; unknown keys are
    /// ignored.
    pub fn from_settings(settings: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(prefix) = settings.get("trash_prefix") {
            cfg.trash_prefix = prefix.clone();
        }
        if let Some(lifetime) = settings.get("trash_lifetime") {
            cfg.trash_lifetime = lifetime
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTrashLifetime(lifetime.clone()))?;
        }
        if let Some(block) = settings.get("block_trash_deletes") {
            cfg.block_trash_deletes = parse_bool("block_trash_deletes", block)?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// The trash container name is spliced into COPY destinations and
    /// container paths, so the prefix must stay inside one path segment.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trash_prefix.is_empty() {
            return Err(ConfigError::EmptyTrashPrefix);
        }
        if !self
            .trash_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~'))
        {
            return Err(ConfigError::InvalidTrashPrefix(self.trash_prefix.clone()));
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    let lowered = value.trim().to_ascii_lowercase();
    if TRUE_VALUES.contains(&lowered.as_str()) {
        Ok(true)
    } else if FALSE_VALUES.contains(&lowered.as_str()) {
        Ok(false)
    } else {
        Err(ConfigError::InvalidBool {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub upstream_url: String,
    pub undelete: UndeleteConfig,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Undelete proxy for Swift object storage")]
pub struct Args {
    /// Host to bind to (overrides UNDELETE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides UNDELETE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Base URL of the storage proxy (overrides UNDELETE_UPSTREAM_URL)
    #[arg(long)]
    pub upstream_url: Option<String>,

    /// Prefix naming trash containers (overrides UNDELETE_TRASH_PREFIX)
    #[arg(long)]
    pub trash_prefix: Option<String>,

    /// Seconds before trashed copies expire, 0 = never (overrides UNDELETE_TRASH_LIFETIME)
    #[arg(long)]
    pub trash_lifetime: Option<String>,

    /// Refuse deletes inside trash containers (overrides UNDELETE_BLOCK_TRASH_DELETES)
    #[arg(long)]
    pub block_trash_deletes: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();
        Self::merge(args, |key| env::var(key).ok())
    }

    /// Merge CLI args over values looked up with `env`.
    pub fn merge(args: Args, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env("UNDELETE_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let env_port = match env("UNDELETE_PORT") {
            Some(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing UNDELETE_PORT value `{}`", value))?,
            None => 8080,
        };
        let env_upstream =
            env("UNDELETE_UPSTREAM_URL").unwrap_or_else(|| "http://127.0.0.1:8081".into());

        // --- Undelete settings, CLI first ---
        let mut settings = HashMap::new();
        for (key, arg, var) in [
            ("trash_prefix", args.trash_prefix, "UNDELETE_TRASH_PREFIX"),
            ("trash_lifetime", args.trash_lifetime, "UNDELETE_TRASH_LIFETIME"),
            (
                "block_trash_deletes",
                args.block_trash_deletes,
                "UNDELETE_BLOCK_TRASH_DELETES",
            ),
        ] {
            if let Some(value) = arg.or_else(|| env(var)) {
                settings.insert(key.to_string(), value);
            }
        }
        let undelete =
            UndeleteConfig::from_settings(&settings).context("invalid undelete settings")?;

        // --- Merge ---
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            upstream_url: args.upstream_url.unwrap_or(env_upstream),
            undelete,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
