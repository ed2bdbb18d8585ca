//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod analyze;
mod build;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use glob::glob;

use crate::config::{
    find_config, load_config, merge_cli_overrides, CardsortConfig, CliOverrides, OutputFormat,
};
use crate::study::DiagonalMode;

/// Process exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Check if a path looks like a matrix file (.csv or .tsv).
pub fn is_matrix_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref(),
        Some("csv") | Some("tsv")
    )
}

/// Find all matrix files under a directory, sorted by path.
pub fn find_matrix_files(dir: &Path, recursive: bool) -> Vec<PathBuf> {
    let pattern = if recursive {
        format!("{}/**/*", dir.display())
    } else {
        format!("{}/*", dir.display())
    };

    let mut files: Vec<PathBuf> = match glob(&pattern) {
        Ok(paths) => {
            paths.filter_map(Result::ok).filter(|p| p.is_file() && is_matrix_file(p)).collect()
        }
        Err(_) => Vec::new(),
    };
    files.sort();
    files
}

/// cardsort - Card-sort co-occurrence matrices: statistics, rankings and reports
#[derive(Parser)]
#[command(name = "cardsort")]
#[command(about = "Analyze card-sort co-occurrence matrices and build them from study data")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load co-occurrence matrices and report statistics and top relationships
    Analyze {
        /// Matrix files (.csv, .tsv); use - for stdin
        files: Vec<PathBuf>,

        /// Also analyze every .csv/.tsv file in this directory
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Search --dir recursively
        #[arg(short, long, requires = "dir")]
        recursive: bool,

        /// Number of top relationships to report (default: 5)
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        top: Option<u32>,

        /// Output format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Card-sort study (JSON5) used to list participants per relationship
        #[arg(long)]
        study: Option<PathBuf>,

        /// Field delimiter: one character, or "tab"
        #[arg(short, long)]
        delimiter: Option<String>,

        /// Strict mode: exit with an error if any cell had to be coerced
        #[arg(long)]
        strict: bool,

        /// Re-run the analysis whenever an input file changes
        #[arg(short, long)]
        watch: bool,

        /// Append failures to the telemetry error log
        #[arg(long)]
        collect_errors: bool,

        /// Path to cardsort.toml (default: discovered from the current directory)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Build co-occurrence matrices from a card-sort study
    Build {
        /// Study file (JSON5)
        study: PathBuf,

        /// Output file (.csv/.tsv) or directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only include participants in this segment; "all" writes one matrix per segment
        #[arg(short, long)]
        segment: Option<String>,

        /// How to fill the diagonal
        #[arg(long, value_enum)]
        diagonal: Option<DiagonalMode>,

        /// Append failures to the telemetry error log
        #[arg(long)]
        collect_errors: bool,

        /// Path to cardsort.toml (default: discovered from the current directory)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            files,
            dir,
            recursive,
            top,
            format,
            output,
            study,
            delimiter,
            strict,
            watch,
            collect_errors,
            config,
        } => {
            let overrides = CliOverrides {
                top_k: top.map(|k| k as usize),
                format,
                strict: strict.then_some(true),
                delimiter: delimiter.clone(),
                collect_errors: collect_errors.then_some(true),
                ..Default::default()
            };
            analyze::run_analyze(
                &files,
                dir.as_deref(),
                recursive,
                output.as_deref(),
                study.as_deref(),
                delimiter.is_some(),
                watch,
                config.as_deref(),
                &overrides,
            )
        }
        Commands::Build { study, output, segment, diagonal, collect_errors, config } => {
            let overrides = CliOverrides {
                diagonal,
                collect_errors: collect_errors.then_some(true),
                ..Default::default()
            };
            build::run_build(
                &study,
                output.as_deref(),
                segment.as_deref(),
                config.as_deref(),
                &overrides,
            )
        }
    }
}

/// Load config (explicit path or discovered), apply overrides and validate.
///
/// Returns the config and the directory relative paths in it resolve against.
pub(crate) fn resolve_config(
    path: Option<&Path>,
    overrides: &CliOverrides,
) -> Result<(CardsortConfig, PathBuf), ExitCode> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config_path = path.map(Path::to_path_buf).or_else(find_config);

    let mut config = match load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return Err(ExitCode::from(EXIT_ERROR));
        }
    };
    let root = config_path
        .as_deref()
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or(cwd);

    merge_cli_overrides(&mut config, overrides);
    let errors = config.validate();
    if !errors.is_empty() {
        for error in &errors {
            eprintln!("Error: {}", error);
        }
        return Err(ExitCode::from(EXIT_INVALID_ARGS));
    }

    Ok((config, root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_is_matrix_file() {
        assert!(is_matrix_file(Path::new("matrix.csv")));
        assert!(is_matrix_file(Path::new("data/business.TSV")));
        assert!(!is_matrix_file(Path::new("study.json5")));
        assert!(!is_matrix_file(Path::new("csv")));
        assert!(!is_matrix_file(Path::new(".csv")));
    }

    #[test]
    fn test_find_matrix_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("b.csv"), ",A\nA,0\n").unwrap();
        fs::write(temp.path().join("a.tsv"), "\tA\nA\t0\n").unwrap();
        fs::write(temp.path().join("notes.txt"), "ignored").unwrap();
        let nested = temp.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("c.csv"), ",A\nA,0\n").unwrap();

        let flat = find_matrix_files(temp.path(), false);
        assert_eq!(flat, vec![temp.path().join("a.tsv"), temp.path().join("b.csv")]);

        let deep = find_matrix_files(temp.path(), true);
        assert_eq!(deep.len(), 3);
    }

    #[test]
    fn test_cli_parses_analyze() {
        let cli = Cli::try_parse_from([
            "cardsort", "analyze", "m.csv", "--top", "3", "--format", "json", "--strict",
        ])
        .unwrap();
        match cli.command {
            Commands::Analyze { files, top, format, strict, .. } => {
                assert_eq!(files, vec![PathBuf::from("m.csv")]);
                assert_eq!(top, Some(3));
                assert_eq!(format, Some(OutputFormat::Json));
                assert!(strict);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_cli_rejects_zero_top() {
        assert!(Cli::try_parse_from(["cardsort", "analyze", "m.csv", "--top", "0"]).is_err());
    }

    #[test]
    fn test_cli_parses_build() {
        let cli = Cli::try_parse_from([
            "cardsort", "build", "study.json5", "--segment", "all", "--diagonal", "appearances",
        ])
        .unwrap();
        match cli.command {
            Commands::Build { segment, diagonal, .. } => {
                assert_eq!(segment.as_deref(), Some("all"));
                assert_eq!(diagonal, Some(DiagonalMode::Appearances));
            }
            _ => panic!("expected build"),
        }
    }
}
