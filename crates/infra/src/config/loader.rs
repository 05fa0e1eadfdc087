//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the API key is absent, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `TIMEWISE_OPENAI_API_KEY`: completion service API key (required)
//! - `TIMEWISE_OPENAI_MODEL`: completion model name
//! - `TIMEWISE_DB_PATH`: database file path
//! - `TIMEWISE_DB_POOL_SIZE`: connection pool size
//! - `TIMEWISE_BIND_ADDR`: HTTP bind address
//!
//! ## File Locations
//! The loader probes `config.{toml,json}` and `timewise.{toml,json}` in the
//! working directory and up to two parent directories.

use std::path::{Path, PathBuf};

use timewise_domain::{Config, Result, TimewiseError};

/// Load configuration with automatic fallback strategy.
///
/// Environment variables win when the API key is set there; otherwise a
/// config file is required.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "environment incomplete, trying config file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables, filling unset optional
/// values from [`Config::default`].
///
/// # Errors
/// Returns `TimewiseError::Config` if `TIMEWISE_OPENAI_API_KEY` is missing
/// or a numeric variable fails to parse.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.openai.api_key = env_var("TIMEWISE_OPENAI_API_KEY")?;
    if let Ok(model) = std::env::var("TIMEWISE_OPENAI_MODEL") {
        config.openai.model = model;
    }
    if let Ok(path) = std::env::var("TIMEWISE_DB_PATH") {
        config.database.path = path;
    }
    if let Ok(pool_size) = std::env::var("TIMEWISE_DB_POOL_SIZE") {
        config.database.pool_size = pool_size
            .parse()
            .map_err(|e| TimewiseError::Config(format!("Invalid pool size: {e}")))?;
    }
    if let Ok(bind_addr) = std::env::var("TIMEWISE_BIND_ADDR") {
        config.server.bind_addr = bind_addr;
    }

    Ok(config)
}

/// Load configuration from a file.
///
/// If `path` is `None`, probes the standard locations. Format is detected
/// by file extension.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(TimewiseError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            TimewiseError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| TimewiseError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| TimewiseError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| TimewiseError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(TimewiseError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file among the standard locations, or `None`.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        for base in ["", "../", "../../"] {
            for name in ["config.toml", "config.json", "timewise.toml", "timewise.json"] {
                candidates.push(cwd.join(format!("{base}{name}")));
            }
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        TimewiseError::Config(format!("Missing required environment variable: {key}"))
    })
}
