//! Summary statistics and relationship ranking
//!
//! Counting convention: only the upper triangle (`row < col`) is read, so
//! every unordered pair is counted exactly once and the diagonal is ignored.
//! Asymmetric sources are flagged by the loader rather than merged here.

use crate::models::{CoOccurrenceMatrix, Pair, SummaryStatistics};

/// Compute aggregate statistics in one pass over the upper triangle.
///
/// Every pair that reaches the maximum is kept in `strongest_pairs`, in
/// source (row, then column) order. A matrix with no positive pair reports
/// `max == 0` and no strongest pairs. The total saturates at `u64::MAX`.
pub fn compute_statistics(matrix: &CoOccurrenceMatrix) -> SummaryStatistics {
    let n = matrix.len();
    let mut total = 0u64;
    let mut max = 0u64;
    let mut non_zero_pairs = 0usize;
    let mut strongest_pairs = Vec::new();

    for i in 0..n {
        for j in (i + 1)..n {
            let value = matrix.get(i, j);
            if value == 0 {
                continue;
            }
            total = total.saturating_add(value);
            non_zero_pairs += 1;
            if value > max {
                max = value;
                strongest_pairs.clear();
                strongest_pairs.push(Pair::at(matrix, i, j));
            } else if value == max {
                strongest_pairs.push(Pair::at(matrix, i, j));
            }
        }
    }

    SummaryStatistics {
        category_count: n,
        total,
        max,
        average: average_per_pair(total, n),
        non_zero_pairs,
        strongest_pairs,
    }
}

/// Mean value per unordered pair: `total / (n·(n−1)/2)`.
fn average_per_pair(total: u64, n: usize) -> f64 {
    if n < 2 {
        return 0.0;
    }
    let pairs = n * (n - 1) / 2;
    total as f64 / pairs as f64
}

/// Collect every unordered pair with a positive value, strongest first.
///
/// The sort is stable, so equal values keep source order.
pub fn rank_pairs(matrix: &CoOccurrenceMatrix) -> Vec<Pair> {
    let n = matrix.len();
    let mut pairs = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            if matrix.get(i, j) > 0 {
                pairs.push(Pair::at(matrix, i, j));
            }
        }
    }
    pairs.sort_by(|a, b| b.value.cmp(&a.value));
    pairs
}

/// The first `k` entries of [`rank_pairs`].
pub fn top_pairs(matrix: &CoOccurrenceMatrix, k: usize) -> Vec<Pair> {
    let mut pairs = rank_pairs(matrix);
    pairs.truncate(k);
    pairs
}
