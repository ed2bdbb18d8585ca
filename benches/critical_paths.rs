//! Criterion benchmarks for cardsort critical paths
//!
//! - Loader: delimited text to matrix
//! - Summary: statistics and pair ranking
//! - Study: building a matrix from participant groups

use cardsort::export::matrix_to_string;
use cardsort::loader::{parse_matrix, LoaderOptions};
use cardsort::models::CoOccurrenceMatrix;
use cardsort::study::{build_matrix, BuildOptions, CardGroup, CardSortStudy, Participant};
use cardsort::summary::{compute_statistics, rank_pairs};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

// =============================================================================
// Test Data Generators
// =============================================================================

/// Symmetric n x n matrix with a spread of values.
fn make_matrix(n: usize) -> CoOccurrenceMatrix {
    let categories = (0..n).map(|i| format!("Card {}", i)).collect();
    let mut matrix = CoOccurrenceMatrix::new(categories);
    for i in 0..n {
        for j in (i + 1)..n {
            let value = ((i * 31 + j * 17) % 13) as u64;
            matrix.set(i, j, value);
            matrix.set(j, i, value);
        }
    }
    matrix
}

/// Study with `participants` sorts of `cards` cards into groups of five.
fn make_study(participants: usize, cards: usize) -> CardSortStudy {
    let names: Vec<String> = (0..cards).map(|i| format!("Card {}", i)).collect();
    let participants = (0..participants)
        .map(|p| {
            let mut shuffled = names.clone();
            shuffled.rotate_left(p % cards.max(1));
            Participant {
                name: format!("P{}", p),
                segment: Some(if p % 2 == 0 { "business" } else { "personal" }.to_string()),
                groups: shuffled
                    .chunks(5)
                    .map(|chunk| CardGroup { name: None, cards: chunk.to_vec() })
                    .collect(),
            }
        })
        .collect();
    CardSortStudy { name: None, cards: names, participants }
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_loader(c: &mut Criterion) {
    let mut group = c.benchmark_group("loader");

    for size in [10usize, 50, 200].iter() {
        let text = matrix_to_string(&make_matrix(*size), b',').expect("export should succeed");
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("parse_matrix", size), &text, |b, text| {
            b.iter(|| parse_matrix(black_box(text), LoaderOptions::default()))
        });
    }

    group.finish();
}

fn bench_summary(c: &mut Criterion) {
    let mut group = c.benchmark_group("summary");

    for size in [10usize, 50, 200].iter() {
        let matrix = make_matrix(*size);
        group.throughput(Throughput::Elements((*size * *size) as u64));
        group.bench_with_input(
            BenchmarkId::new("compute_statistics", size),
            &matrix,
            |b, matrix| b.iter(|| compute_statistics(black_box(matrix))),
        );
        group.bench_with_input(BenchmarkId::new("rank_pairs", size), &matrix, |b, matrix| {
            b.iter(|| rank_pairs(black_box(matrix)))
        });
    }

    group.finish();
}

fn bench_study(c: &mut Criterion) {
    let mut group = c.benchmark_group("study");

    for participants in [10usize, 100].iter() {
        let study = make_study(*participants, 40);
        group.throughput(Throughput::Elements(*participants as u64));
        group.bench_with_input(
            BenchmarkId::new("build_matrix", participants),
            &study,
            |b, study| b.iter(|| build_matrix(black_box(study), &BuildOptions::default())),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_loader, bench_summary, bench_study);
criterion_main!(benches);
