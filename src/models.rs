//! Data models for co-occurrence matrices, pairs and statistics

use serde::{Deserialize, Serialize};

/// A warning message from loading or building a matrix.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Warning {
    pub message: String,
    pub line: usize,
}

impl Warning {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self { message: message.into(), line }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.line > 0 {
            write!(f, "line {}: {}", self.line, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

/// Square matrix of co-occurrence counts indexed by named categories (cards).
///
/// Cells are stored row-major; every one of the `N²` cells holds a value.
/// Symmetry is not assumed: `get(i, j)` and `get(j, i)` may differ.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoOccurrenceMatrix {
    categories: Vec<String>,
    cells: Vec<u64>,
}

impl CoOccurrenceMatrix {
    /// Create an all-zero matrix over the given categories.
    pub fn new(categories: Vec<String>) -> Self {
        let n = categories.len();
        Self { categories, cells: vec![0; n * n] }
    }

    /// Create a matrix from explicit rows.
    ///
    /// Rows shorter than the category count are zero-padded, longer rows are
    /// truncated and missing rows are zero.
    pub fn from_rows(categories: Vec<String>, rows: Vec<Vec<u64>>) -> Self {
        let mut matrix = Self::new(categories);
        let n = matrix.len();
        for (i, row) in rows.into_iter().take(n).enumerate() {
            for (j, value) in row.into_iter().take(n).enumerate() {
                matrix.set(i, j, value);
            }
        }
        matrix
    }

    /// Number of categories (the dimension `N`).
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Category names in source order.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Position of a category by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.categories.iter().position(|c| c == name)
    }

    /// Value at row `i`, column `j`.
    ///
    /// # Panics
    /// Panics if either index is out of bounds.
    pub fn get(&self, i: usize, j: usize) -> u64 {
        self.cells[i * self.len() + j]
    }

    /// Value for a pair of category names, or `None` if either is unknown.
    pub fn value(&self, row: &str, col: &str) -> Option<u64> {
        let i = self.index_of(row)?;
        let j = self.index_of(col)?;
        Some(self.get(i, j))
    }

    pub fn set(&mut self, i: usize, j: usize, value: u64) {
        let n = self.len();
        self.cells[i * n + j] = value;
    }

    pub fn increment(&mut self, i: usize, j: usize) {
        let n = self.len();
        self.cells[i * n + j] += 1;
    }

    /// Iterate rows as slices, in category order.
    pub fn rows(&self) -> impl Iterator<Item = &[u64]> + '_ {
        // chunks(0) panics, and an empty matrix has no rows anyway
        self.cells.chunks(self.len().max(1))
    }

    /// Whether `get(i, j) == get(j, i)` for every cell.
    pub fn is_symmetric(&self) -> bool {
        let n = self.len();
        (0..n).all(|i| ((i + 1)..n).all(|j| self.get(i, j) == self.get(j, i)))
    }

    /// Largest value over all cells, diagonal included.
    ///
    /// This is the colour-scale domain a heatmap would use; statistics use
    /// [`crate::summary::compute_statistics`] instead.
    pub fn max_value(&self) -> u64 {
        self.cells.iter().copied().max().unwrap_or(0)
    }
}

/// An unordered combination of two distinct categories with a count.
///
/// `row < col` always; they are the source positions of `card_a` and `card_b`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pair {
    pub card_a: String,
    pub card_b: String,
    pub value: u64,
    pub row: usize,
    pub col: usize,
}

impl Pair {
    /// Build a pair from matrix coordinates.
    pub fn at(matrix: &CoOccurrenceMatrix, row: usize, col: usize) -> Self {
        let categories = matrix.categories();
        Self {
            card_a: categories[row].clone(),
            card_b: categories[col].clone(),
            value: matrix.get(row, col),
            row,
            col,
        }
    }
}

impl std::fmt::Display for Pair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <-> {}: {}", self.card_a, self.card_b, self.value)
    }
}

/// Derived, read-only snapshot of a matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    /// Number of categories
    pub category_count: usize,
    /// Sum over counted (upper-triangle) cells
    pub total: u64,
    /// Largest single pair value
    pub max: u64,
    /// Mean value per unordered pair
    pub average: f64,
    /// Pairs with a value above zero
    pub non_zero_pairs: usize,
    /// Every pair reaching `max`, in source order
    pub strongest_pairs: Vec<Pair>,
}
