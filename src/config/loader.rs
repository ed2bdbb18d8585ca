//! Configuration loading and discovery for `cardsort.toml`

use super::schema::{CardsortConfig, OutputFormat};
use crate::study::DiagonalMode;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file.
pub const CONFIG_FILE: &str = "cardsort.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// TOML parsing error
    #[error("Failed to parse cardsort.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub top_k: Option<usize>,
    pub format: Option<OutputFormat>,
    pub strict: Option<bool>,
    pub delimiter: Option<String>,
    pub diagonal: Option<DiagonalMode>,
    pub output: Option<PathBuf>,
    pub collect_errors: Option<bool>,
}

/// Find cardsort.toml by walking up from the current working directory,
/// falling back to the XDG config directory.
pub fn find_config() -> Option<PathBuf> {
    if let Ok(cwd) = env::current_dir() {
        if let Some(path) = find_config_from(cwd) {
            return Some(path);
        }
    }
    find_xdg_config()
}

/// `$XDG_CONFIG_HOME/cardsort/cardsort.toml`, or `~/.config/cardsort/cardsort.toml`.
pub fn find_xdg_config() -> Option<PathBuf> {
    let config_home = env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;

    let path = config_home.join("cardsort").join(CONFIG_FILE);
    path.is_file().then_some(path)
}

/// Walk up from `start` looking for cardsort.toml.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;
    loop {
        let candidate = current.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration.
///
/// An explicit path must exist. Without one, the discovered file is used,
/// or [`default_config`] when none is found.
pub fn load_config(path: Option<&Path>) -> Result<CardsortConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(default_config()),
    }
}

fn load_config_file(path: &Path) -> Result<CardsortConfig, ConfigError> {
    let contents = fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    let config: CardsortConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Configuration used when no cardsort.toml is found.
pub fn default_config() -> CardsortConfig {
    CardsortConfig::default()
}

/// Apply CLI overrides. CLI values win over file values.
pub fn merge_cli_overrides(config: &mut CardsortConfig, overrides: &CliOverrides) {
    if let Some(top_k) = overrides.top_k {
        config.analysis.top_k = top_k;
    }
    if let Some(format) = overrides.format {
        config.analysis.format = format;
    }
    if let Some(strict) = overrides.strict {
        config.analysis.strict = strict;
    }
    if let Some(ref delimiter) = overrides.delimiter {
        config.loader.delimiter = delimiter.clone();
    }
    if let Some(diagonal) = overrides.diagonal {
        config.build.diagonal = diagonal;
    }
    if let Some(ref output) = overrides.output {
        config.build.output = output.clone();
    }
    if let Some(collect_errors) = overrides.collect_errors {
        config.telemetry.collect_errors = collect_errors;
    }
}

/// Resolve `path` against `root` unless it is already absolute.
pub fn resolve_path(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
