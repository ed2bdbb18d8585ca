//! Watch mode for `cardsort analyze --watch`
//!
//! Each watched file has its own [`AnalysisSession`], so a file saved
//! half-written keeps showing its last good analysis until it loads again.

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::schema::WatchConfig;
use crate::loader::{LoadError, LoaderOptions, MatrixSource};
use crate::session::{Analysis, AnalysisSession};
use crate::telemetry::{utc_clock, ErrorCollector, ErrorEntry};

/// Error during watch mode
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WatchError {
    #[error("Failed to initialize file watcher: {0}")]
    WatcherInit(#[source] notify::Error),
    #[error("Failed to watch '{}': {source}", .path.display())]
    WatchPath {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    #[error("Watch channel error: {0}")]
    Channel(String),
    #[error("File not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    #[error("Standard input cannot be watched")]
    Stdin,
}

/// Options for watch mode
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    pub files: Vec<PathBuf>,
    /// Explicit loader options; `None` picks per file by extension
    pub loader: Option<LoaderOptions>,
    pub config: WatchConfig,
}

/// Result of one reload pass
#[derive(Debug, Default)]
pub struct ReloadOutcome {
    pub reloaded: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, LoadError)>,
    /// Files that failed last time and loaded this time
    pub fixed: Vec<PathBuf>,
    pub duration: Duration,
}

impl ReloadOutcome {
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Per-file sessions plus the set of files currently failing.
#[derive(Debug, Default)]
pub struct WatchState {
    sessions: Vec<(PathBuf, AnalysisSession)>,
    failing: HashSet<PathBuf>,
}

impl WatchState {
    pub fn new(files: &[PathBuf]) -> Self {
        Self {
            sessions: files.iter().map(|f| (f.clone(), AnalysisSession::new())).collect(),
            failing: HashSet::new(),
        }
    }

    /// Reload the given files, or every file when `changed` is `None`.
    pub fn reload(
        &mut self,
        changed: Option<&[PathBuf]>,
        options: Option<LoaderOptions>,
    ) -> ReloadOutcome {
        let start = Instant::now();
        let mut outcome = ReloadOutcome::default();

        for (path, session) in &mut self.sessions {
            if let Some(changed) = changed {
                if !changed.iter().any(|c| same_file(c, path)) {
                    continue;
                }
            }
            let options = options.unwrap_or_else(|| LoaderOptions::for_path(path));
            match session.reload(&MatrixSource::Path(path.clone()), options) {
                Ok(_) => {
                    if self.failing.remove(path.as_path()) {
                        outcome.fixed.push(path.clone());
                    }
                    outcome.reloaded.push(path.clone());
                }
                Err(e) => {
                    self.failing.insert(path.clone());
                    outcome.failed.push((path.clone(), e));
                }
            }
        }

        outcome.duration = start.elapsed();
        outcome
    }

    /// Latest good analysis of each file that has loaded at least once.
    pub fn analyses(&self) -> Vec<&Analysis> {
        self.sessions.iter().filter_map(|(_, s)| s.current()).collect()
    }

    pub fn failing_count(&self) -> usize {
        self.failing.len()
    }

    fn is_watched(&self, path: &Path) -> bool {
        self.sessions.iter().any(|(p, _)| same_file(p, path))
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn clear_screen() {
    print!("\x1B[2J\x1B[1;1H");
}

fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

fn print_outcome(outcome: &ReloadOutcome, collector: &ErrorCollector) {
    for fixed in &outcome.fixed {
        println!("[{}] Fixed: {}", utc_clock(), fixed.display());
    }
    for (path, error) in &outcome.failed {
        let file = path.display().to_string();
        eprintln!("[{}] Error in {}: {}", utc_clock(), file, error);
        eprintln!("[{}] Keeping previous analysis", utc_clock());
        let _ = collector.log(&ErrorEntry::from_load_error("watch", &file, error));
    }
    if outcome.success() {
        println!(
            "[{}] Reloaded {} file{} ({})",
            utc_clock(),
            outcome.reloaded.len(),
            if outcome.reloaded.len() == 1 { "" } else { "s" },
            format_duration(outcome.duration)
        );
    }
}

/// Watch the input files and re-run `render` after every change.
///
/// Blocks until the watcher channel closes.
pub fn watch_and_analyze<F>(
    options: WatchOptions,
    collector: &ErrorCollector,
    mut render: F,
) -> Result<(), WatchError>
where
    F: FnMut(&[&Analysis]),
{
    for file in &options.files {
        if file.as_os_str() == "-" {
            return Err(WatchError::Stdin);
        }
        if !file.is_file() {
            return Err(WatchError::SourceNotFound(file.clone()));
        }
    }

    let (tx, rx) = channel();
    let debounce = Duration::from_millis(u64::from(options.config.debounce_ms));
    let mut debouncer = new_debouncer(debounce, tx).map_err(WatchError::WatcherInit)?;

    // Watch parent directories: editors often replace files on save.
    let mut dirs: Vec<PathBuf> = options
        .files
        .iter()
        .map(|f| match f.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(p) => p.to_path_buf(),
            None => PathBuf::from("."),
        })
        .collect();
    dirs.sort();
    dirs.dedup();
    for dir in &dirs {
        debouncer
            .watcher()
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::WatchPath { path: dir.clone(), source })?;
    }

    let clear = options.config.clear_screen && atty::is(atty::Stream::Stdout);
    let mut state = WatchState::new(&options.files);

    if clear {
        clear_screen();
    }
    println!("[{}] Loading...", utc_clock());
    let outcome = state.reload(None, options.loader);
    render(&state.analyses());
    print_outcome(&outcome, collector);
    println!("[{}] Watching {} file(s) for changes...", utc_clock(), options.files.len());

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let changed: Vec<PathBuf> = events
                    .iter()
                    .filter(|e| {
                        matches!(e.kind, DebouncedEventKind::Any) && state.is_watched(&e.path)
                    })
                    .map(|e| e.path.clone())
                    .collect();
                if changed.is_empty() {
                    continue;
                }

                if clear {
                    clear_screen();
                }
                for path in &changed {
                    if let Some(name) = path.file_name() {
                        println!("[{}] Changed: {}", utc_clock(), name.to_string_lossy());
                    }
                }
                let outcome = state.reload(Some(changed.as_slice()), options.loader);
                render(&state.analyses());
                print_outcome(&outcome, collector);
                println!(
                    "[{}] Watching {} file(s) for changes...",
                    utc_clock(),
                    options.files.len()
                );
            }
            Ok(Err(error)) => {
                eprintln!("[{}] Watch error: {:?}", utc_clock(), error);
            }
            Err(e) => return Err(WatchError::Channel(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const GOOD: &str = ",A,B\nA,0,2\nB,2,0\n";

    #[test]
    fn test_reload_tracks_failures_and_fixes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("m.csv");
        fs::write(&path, GOOD).unwrap();

        let mut state = WatchState::new(&[path.clone()]);
        let first = state.reload(None, None);
        assert!(first.success());
        assert_eq!(first.reloaded, vec![path.clone()]);

        fs::write(&path, "").unwrap();
        let second = state.reload(None, None);
        assert_eq!(second.failed.len(), 1);
        assert!(matches!(second.failed[0].1, LoadError::Empty));
        assert_eq!(state.failing_count(), 1);
        // Previous analysis survives
        assert_eq!(state.analyses()[0].statistics.max, 2);

        fs::write(&path, ",A,B\nA,0,9\nB,9,0\n").unwrap();
        let third = state.reload(None, None);
        assert_eq!(third.fixed, vec![path.clone()]);
        assert_eq!(state.failing_count(), 0);
        assert_eq!(state.analyses()[0].statistics.max, 9);
    }

    #[test]
    fn test_reload_only_changed_files() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.csv");
        let b = temp.path().join("b.csv");
        fs::write(&a, GOOD).unwrap();
        fs::write(&b, GOOD).unwrap();

        let mut state = WatchState::new(&[a.clone(), b.clone()]);
        state.reload(None, None);

        let outcome = state.reload(Some(std::slice::from_ref(&b)), None);
        assert_eq!(outcome.reloaded, vec![b]);
        assert_eq!(state.analyses().len(), 2);
    }

    #[test]
    fn test_is_watched_matches_canonical_paths() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("m.csv");
        fs::write(&path, GOOD).unwrap();

        let state = WatchState::new(&[path.clone()]);
        assert!(state.is_watched(&path));
        assert!(state.is_watched(&temp.path().join(".").join("m.csv")));
        assert!(!state.is_watched(&temp.path().join("other.csv")));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }

    #[test]
    fn test_watch_missing_file() {
        let options = WatchOptions {
            files: vec![PathBuf::from("/nonexistent/matrix.csv")],
            ..Default::default()
        };
        let collector = ErrorCollector::new("unused.jsonl", false);
        let result = watch_and_analyze(options, &collector, |_| {});
        assert!(matches!(result, Err(WatchError::SourceNotFound(_))));
    }

    #[test]
    fn test_watch_rejects_stdin() {
        let options = WatchOptions { files: vec![PathBuf::from("-")], ..Default::default() };
        let collector = ErrorCollector::new("unused.jsonl", false);
        let result = watch_and_analyze(options, &collector, |_| {});
        assert!(matches!(result, Err(WatchError::Stdin)));
    }
}
