//! Most-recent analysis state
//!
//! A session keeps the last successful analysis. A reload replaces it
//! wholesale when it succeeds and leaves it alone when it fails.

use crate::loader::{load, LoadError, LoadedMatrix, LoaderOptions, MatrixSource};
use crate::models::{CoOccurrenceMatrix, Pair, SummaryStatistics, Warning};
use crate::summary::{compute_statistics, rank_pairs};

/// A loaded matrix with everything derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// Where the matrix came from
    pub label: String,
    pub loaded: LoadedMatrix,
    pub statistics: SummaryStatistics,
    /// All positive pairs, strongest first
    pub ranked: Vec<Pair>,
}

impl Analysis {
    /// Derive statistics and rankings for a loaded matrix.
    pub fn new(label: impl Into<String>, loaded: LoadedMatrix) -> Self {
        let statistics = compute_statistics(&loaded.matrix);
        let ranked = rank_pairs(&loaded.matrix);
        Self { label: label.into(), loaded, statistics, ranked }
    }

    pub fn matrix(&self) -> &CoOccurrenceMatrix {
        &self.loaded.matrix
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.loaded.warnings
    }

    /// The first `k` ranked pairs.
    pub fn top(&self, k: usize) -> &[Pair] {
        &self.ranked[..k.min(self.ranked.len())]
    }
}

/// Fetch, parse and summarise a source in one step.
pub fn analyze(source: &MatrixSource, options: LoaderOptions) -> Result<Analysis, LoadError> {
    let loaded = load(source, options)?;
    Ok(Analysis::new(source.label(), loaded))
}

/// Holder for the most recent analysis.
#[derive(Debug, Default)]
pub struct AnalysisSession {
    current: Option<Analysis>,
    loads: usize,
    failures: usize,
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a source and make it current if it succeeds.
    ///
    /// On failure the previous analysis (if any) is kept and the error is
    /// returned to the caller.
    pub fn reload(
        &mut self,
        source: &MatrixSource,
        options: LoaderOptions,
    ) -> Result<&Analysis, LoadError> {
        match analyze(source, options) {
            Ok(analysis) => {
                self.loads += 1;
                let current = self.current.insert(analysis);
                Ok(&*current)
            }
            Err(e) => {
                self.failures += 1;
                Err(e)
            }
        }
    }

    /// The current analysis, if any load has succeeded.
    pub fn current(&self) -> Option<&Analysis> {
        self.current.as_ref()
    }

    /// Number of successful loads.
    pub fn loads(&self) -> usize {
        self.loads
    }

    /// Number of failed loads.
    pub fn failures(&self) -> usize {
        self.failures
    }
}
