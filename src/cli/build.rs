//! Build command implementation

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use super::{is_matrix_file, resolve_config, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::config::{resolve_path, CliOverrides};
use crate::export::save_matrix;
use crate::study::{build_matrix, BuildOptions, CardSortStudy};
use crate::telemetry::{ErrorCollector, ErrorEntry};

/// Segment value that selects every segment.
const ALL_SEGMENTS: &str = "all";

/// One matrix to write: the segment filter and its destination.
#[derive(Debug, Clone, PartialEq)]
struct Target {
    segment: Option<String>,
    path: PathBuf,
}

/// Run the build command
pub fn run_build(
    study_path: &Path,
    output: Option<&Path>,
    segment: Option<&str>,
    config_path: Option<&Path>,
    overrides: &CliOverrides,
) -> ExitCode {
    let overrides = CliOverrides { output: output.map(Path::to_path_buf), ..overrides.clone() };
    let (config, root) = match resolve_config(config_path, &overrides) {
        Ok(resolved) => resolved,
        Err(code) => return code,
    };
    let collector = ErrorCollector::new(
        resolve_path(&root, &config.telemetry.error_file),
        config.telemetry.collect_errors,
    );

    let study = match CardSortStudy::load(study_path) {
        Ok(study) => study,
        Err(e) => {
            eprintln!("Error: {}", e);
            let _ = collector.log(&ErrorEntry::from_study_error(
                "build",
                &study_path.display().to_string(),
                &e,
            ));
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let segments = match select_segments(&study, segment) {
        Ok(segments) => segments,
        Err(message) => {
            eprintln!("Error: {}", message);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    // CLI paths are relative to the cwd, config paths to the config file.
    let destination = match output {
        Some(path) => path.to_path_buf(),
        None => resolve_path(&root, &config.build.output),
    };
    let stem = study_path.file_stem().map(|s| s.to_string_lossy().into_owned());
    let targets = plan_targets(stem.as_deref().unwrap_or("matrix"), &destination, segments);

    for target in &targets {
        let options =
            BuildOptions { diagonal: config.build.diagonal, segment: target.segment.clone() };
        let matrix = build_matrix(&study, &options);
        if let Err(e) = save_matrix(&matrix, &target.path) {
            eprintln!("Error: {}", e);
            let _ = collector.log(
                &ErrorEntry::new("build", "export_error", e.to_string())
                    .with_file(target.path.display().to_string()),
            );
            return ExitCode::from(EXIT_ERROR);
        }

        let participants = study.participants_in(target.segment.as_deref()).count();
        println!(
            "Wrote {} ({} cards, {} participant{}{})",
            target.path.display(),
            matrix.len(),
            participants,
            if participants == 1 { "" } else { "s" },
            target.segment.as_deref().map(|s| format!(", segment '{}'", s)).unwrap_or_default()
        );
    }

    ExitCode::from(EXIT_SUCCESS)
}

/// Segment filters to build: `None` is everyone.
fn select_segments(
    study: &CardSortStudy,
    segment: Option<&str>,
) -> Result<Vec<Option<String>>, String> {
    let known = study.segments();
    match segment {
        None => Ok(vec![None]),
        Some(ALL_SEGMENTS) => {
            Ok(std::iter::once(None).chain(known.into_iter().map(Some)).collect())
        }
        Some(name) if known.iter().any(|s| s == name) => Ok(vec![Some(name.to_string())]),
        Some(name) => {
            let available =
                if known.is_empty() { "none".to_string() } else { known.join(", ") };
            Err(format!("Unknown segment '{}'. Available segments: {}", name, available))
        }
    }
}

/// Work out where each matrix goes.
///
/// A destination ending in `.csv`/`.tsv` is a file: the unfiltered matrix is
/// written there and segment matrices next to it as `<stem>-<segment>.<ext>`.
/// Anything else is a directory holding `<study>.csv` and
/// `<study>-<segment>.csv`.
fn plan_targets(
    study_stem: &str,
    destination: &Path,
    segments: Vec<Option<String>>,
) -> Vec<Target> {
    let (dir, stem, ext) = if is_matrix_file(destination) {
        let dir = destination.parent().map(Path::to_path_buf).unwrap_or_default();
        let stem = destination
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| study_stem.to_string());
        let ext = destination
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "csv".to_string());
        (dir, stem, ext)
    } else {
        (destination.to_path_buf(), study_stem.to_string(), "csv".to_string())
    };

    let single = segments.len() == 1;
    segments
        .into_iter()
        .map(|segment| {
            let path = match &segment {
                None => dir.join(format!("{}.{}", stem, ext)),
                Some(_) if single && is_matrix_file(destination) => destination.to_path_buf(),
                Some(name) => dir.join(format!("{}-{}.{}", stem, file_slug(name), ext)),
            };
            Target { segment, path }
        })
        .collect()
}

/// Lowercase a segment name for use in a file name.
fn file_slug(name: &str) -> String {
    let slug: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    if slug.is_empty() {
        "segment".to_string()
    } else {
        slug
    }
}
