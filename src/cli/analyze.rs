//! Analyze command implementation

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use super::{find_matrix_files, resolve_config, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::config::{resolve_path, CardsortConfig, CliOverrides, OutputFormat};
use crate::loader::{LoaderOptions, MatrixSource};
use crate::participants::{NoParticipants, ParticipantDirectory, StudyDirectory};
use crate::report::{format_report_json, format_report_text, MatrixReport};
use crate::session::{analyze, Analysis};
use crate::study::CardSortStudy;
use crate::telemetry::{ErrorCollector, ErrorEntry};
use crate::watch::{watch_and_analyze, WatchOptions};

/// Run the analyze command
pub fn run_analyze(
    files: &[PathBuf],
    dir: Option<&Path>,
    recursive: bool,
    output: Option<&Path>,
    study: Option<&Path>,
    explicit_delimiter: bool,
    watch: bool,
    config_path: Option<&Path>,
    overrides: &CliOverrides,
) -> ExitCode {
    let (config, root) = match resolve_config(config_path, overrides) {
        Ok(resolved) => resolved,
        Err(code) => return code,
    };

    let mut inputs: Vec<PathBuf> = files.to_vec();
    if let Some(dir) = dir {
        if !dir.is_dir() {
            eprintln!("Error: Directory not found: {}", dir.display());
            return ExitCode::from(EXIT_ERROR);
        }
        inputs.extend(find_matrix_files(dir, recursive));
    }
    if inputs.is_empty() {
        eprintln!("Error: No input files");
        eprintln!("Pass matrix files, - for stdin, or --dir <DIR>");
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let collector = ErrorCollector::new(
        resolve_path(&root, &config.telemetry.error_file),
        config.telemetry.collect_errors,
    );

    let directory: Box<dyn ParticipantDirectory> = match study {
        Some(path) => match CardSortStudy::load(path) {
            Ok(study) => Box::new(StudyDirectory::new(&study)),
            Err(e) => {
                eprintln!("Error: {}", e);
                let _ = collector.log(&ErrorEntry::from_study_error(
                    "analyze",
                    &path.display().to_string(),
                    &e,
                ));
                return ExitCode::from(EXIT_ERROR);
            }
        },
        None => Box::new(NoParticipants),
    };

    // Config validation guarantees a usable delimiter.
    let delimiter = config.loader.delimiter_byte().unwrap_or(b',');
    let fixed_options = (explicit_delimiter || delimiter != b',')
        .then(|| LoaderOptions::with_delimiter(delimiter));

    if watch {
        let options =
            WatchOptions { files: inputs, loader: fixed_options, config: config.watch.clone() };
        let result = watch_and_analyze(options, &collector, |analyses| {
            let reports: Vec<MatrixReport> = analyses
                .iter()
                .map(|a| MatrixReport::new(a, config.analysis.top_k, directory.as_ref()))
                .collect();
            if let Err(e) = emit(&reports, &config, output) {
                eprintln!("Error: {}", e);
            }
        });
        return match result {
            Ok(()) => ExitCode::from(EXIT_SUCCESS),
            Err(e) => {
                eprintln!("Watch error: {}", e);
                ExitCode::from(EXIT_ERROR)
            }
        };
    }

    let mut analyses: Vec<Analysis> = Vec::new();
    let mut failed = 0usize;
    for input in &inputs {
        let source = MatrixSource::from_arg(input);
        let options = fixed_options.unwrap_or_else(|| LoaderOptions::for_path(input));
        match analyze(&source, options) {
            Ok(analysis) => {
                for warning in analysis.warnings() {
                    eprintln!("Warning: {}: {}", analysis.label, warning);
                }
                analyses.push(analysis);
            }
            Err(e) => {
                failed += 1;
                let label = source.label();
                eprintln!("Error: {}: {}", label, e);
                if let Some(hint) = e.suggestion() {
                    eprintln!("  Hint: {}", hint);
                }
                let _ = collector.log(&ErrorEntry::from_load_error("analyze", &label, &e));
            }
        }
    }

    if !analyses.is_empty() {
        let reports: Vec<MatrixReport> = analyses
            .iter()
            .map(|a| MatrixReport::new(a, config.analysis.top_k, directory.as_ref()))
            .collect();
        if let Err(e) = emit(&reports, &config, output) {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    }

    let warning_count: usize = analyses.iter().map(|a| a.warnings().len()).sum();
    if failed > 0 {
        return ExitCode::from(EXIT_ERROR);
    }
    if config.analysis.strict && warning_count > 0 {
        eprintln!(
            "Error: {} warning{} (strict mode)",
            warning_count,
            if warning_count == 1 { "" } else { "s" }
        );
        return ExitCode::from(EXIT_ERROR);
    }
    ExitCode::from(EXIT_SUCCESS)
}

/// Render reports in the configured format and write them out.
fn emit(
    reports: &[MatrixReport],
    config: &CardsortConfig,
    output: Option<&Path>,
) -> Result<(), String> {
    let rendered = match config.analysis.format {
        OutputFormat::Text => format_report_text(reports),
        OutputFormat::Json => {
            let mut json = format_report_json(reports).map_err(|e| e.to_string())?;
            json.push('\n');
            json
        }
    };

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .map_err(|e| format!("cannot create '{}': {}", parent.display(), e))?;
            }
            fs::write(path, rendered)
                .map_err(|e| format!("cannot write '{}': {}", path.display(), e))
        }
        None => {
            print!("{}", rendered);
            Ok(())
        }
    }
}
