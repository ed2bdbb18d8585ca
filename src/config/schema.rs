//! Configuration schema types for `cardsort.toml`
//!
//! Every section is optional; missing values fall back to the defaults below.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::study::DiagonalMode;

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

/// `[analysis]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Number of top relationships to report
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub format: OutputFormat,
    /// Treat loader warnings as failures
    #[serde(default)]
    pub strict: bool,
}

fn default_top_k() -> usize {
    5
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self { top_k: default_top_k(), format: OutputFormat::default(), strict: false }
    }
}

/// `[loader]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Field delimiter; a single ASCII character, or `tab`
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

fn default_delimiter() -> String {
    ",".to_string()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { delimiter: default_delimiter() }
    }
}

impl LoaderConfig {
    /// The delimiter as a byte, if it is usable.
    pub fn delimiter_byte(&self) -> Option<u8> {
        parse_delimiter(&self.delimiter)
    }
}

/// Parse a delimiter setting: one ASCII character, `tab` or `\t`.
pub fn parse_delimiter(value: &str) -> Option<u8> {
    match value {
        "tab" | "\\t" | "\t" => Some(b'\t'),
        s if s.len() == 1 && s.is_ascii() && s != "\"" && s != "\n" && s != "\r" => {
            s.bytes().next()
        }
        _ => None,
    }
}

/// `[build]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default)]
    pub diagonal: DiagonalMode,
    /// Output directory for built matrices
    #[serde(default = "default_build_output")]
    pub output: PathBuf,
}

fn default_build_output() -> PathBuf {
    PathBuf::from("matrices")
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self { diagonal: DiagonalMode::default(), output: default_build_output() }
    }
}

/// `[telemetry]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Append failures to `error_file`
    #[serde(default)]
    pub collect_errors: bool,
    #[serde(default = "default_error_file")]
    pub error_file: PathBuf,
}

fn default_error_file() -> PathBuf {
    PathBuf::from(".cardsort/errors.jsonl")
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { collect_errors: false, error_file: default_error_file() }
    }
}

/// `[watch]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
    /// Clear terminal between reloads
    #[serde(default = "default_true")]
    pub clear_screen: bool,
}

fn default_debounce_ms() -> u32 {
    200
}

fn default_true() -> bool {
    true
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms(), clear_screen: true }
    }
}

/// Complete `cardsort.toml` configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CardsortConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Dotted path to the invalid field, e.g. `analysis.top_k`
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cardsort.toml: '{}' {}", self.field, self.message)
    }
}

impl CardsortConfig {
    /// Validate the configuration and return every problem found.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: &str| {
            errors.push(ConfigValidationError {
                field: field.to_string(),
                message: message.to_string(),
            })
        };

        if self.analysis.top_k == 0 {
            push("analysis.top_k", "must be a positive integer");
        }
        if self.loader.delimiter_byte().is_none() {
            push("loader.delimiter", "must be a single ASCII character or \"tab\"");
        }
        if self.build.output.as_os_str().is_empty() {
            push("build.output", "must not be empty");
        }
        if self.telemetry.error_file.as_os_str().is_empty() {
            push("telemetry.error_file", "must not be empty");
        }
        if self.watch.debounce_ms == 0 {
            push("watch.debounce_ms", "must be a positive integer");
        }

        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}
