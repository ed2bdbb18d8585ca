//! CLI integration tests for the `cardsort build` command.

use std::fs;
use std::path::Path;
use std::process::Command;

use cardsort::loader::load_path;
use tempfile::TempDir;

fn fixture(name: &str) -> String {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
        .display()
        .to_string()
}

/// Run cardsort with the given arguments and return (stdout, stderr, exit code).
fn run_cardsort(dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_cardsort"))
        .current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join("xdg"))
        .args(args)
        .output()
        .expect("Failed to execute cardsort");
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.code().unwrap_or(-1))
}

#[test]
fn test_build_default_output() {
    let temp = TempDir::new().unwrap();
    let (stdout, stderr, code) = run_cardsort(temp.path(), &["build", &fixture("study.json5")]);
    assert_eq!(code, 0, "stderr: {}", stderr);
    assert!(stdout.contains("4 cards, 3 participants"));

    let loaded = load_path(&temp.path().join("matrices").join("study.csv")).unwrap();
    assert!(loaded.warnings.is_empty());
    let matrix = &loaded.matrix;
    assert_eq!(matrix.categories(), &["Savings", "FAQs", "Blog", "Loans"]);
    assert_eq!(matrix.value("Savings", "Loans"), Some(3));
    assert_eq!(matrix.value("FAQs", "Blog"), Some(2));
    assert_eq!(matrix.value("Savings", "FAQs"), Some(1));
    assert_eq!(matrix.value("Blog", "Loans"), Some(0));
    assert_eq!(matrix.value("Savings", "Savings"), Some(0));
}

#[test]
fn test_build_output_file_tsv() {
    let temp = TempDir::new().unwrap();
    let (_, _, code) =
        run_cardsort(temp.path(), &["build", &fixture("study.json5"), "--output", "m.tsv"]);
    assert_eq!(code, 0);

    let contents = fs::read_to_string(temp.path().join("m.tsv")).unwrap();
    assert!(contents.starts_with("\tSavings\tFAQs\tBlog\tLoans"));
}

#[test]
fn test_build_single_segment() {
    let temp = TempDir::new().unwrap();
    let (stdout, _, code) = run_cardsort(
        temp.path(),
        &["build", &fixture("study.json5"), "--segment", "business", "-o", "out"],
    );
    assert_eq!(code, 0);
    assert!(stdout.contains("segment 'business'"));

    let matrix = load_path(&temp.path().join("out").join("study-business.csv")).unwrap().matrix;
    assert_eq!(matrix.value("Savings", "Loans"), Some(1));
    assert_eq!(matrix.value("Savings", "FAQs"), Some(0));
}

#[test]
fn test_build_all_segments() {
    let temp = TempDir::new().unwrap();
    let (_, _, code) = run_cardsort(
        temp.path(),
        &["build", &fixture("study.json5"), "--segment", "all", "-o", "out"],
    );
    assert_eq!(code, 0);

    let out = temp.path().join("out");
    assert!(out.join("study.csv").exists());
    let personal = load_path(&out.join("study-personal.csv")).unwrap().matrix;
    assert_eq!(personal.value("Savings", "Loans"), Some(2));
    assert_eq!(personal.value("FAQs", "Loans"), Some(1));
    assert!(out.join("study-business.csv").exists());
}

#[test]
fn test_build_unknown_segment() {
    let temp = TempDir::new().unwrap();
    let (_, stderr, code) =
        run_cardsort(temp.path(), &["build", &fixture("study.json5"), "--segment", "retail"]);
    assert_eq!(code, 2);
    assert!(stderr.contains("Unknown segment 'retail'"));
    assert!(stderr.contains("business, personal"));
}

#[test]
fn test_build_appearance_diagonal() {
    let temp = TempDir::new().unwrap();
    let (_, _, code) = run_cardsort(
        temp.path(),
        &["build", &fixture("study.json5"), "--diagonal", "appearances", "-o", "m.csv"],
    );
    assert_eq!(code, 0);

    let loaded = load_path(&temp.path().join("m.csv")).unwrap();
    assert_eq!(loaded.matrix.value("Savings", "Savings"), Some(3));
    assert_eq!(loaded.matrix.value("Blog", "Blog"), Some(3));
}

#[test]
fn test_build_config_diagonal_and_output() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("cardsort.toml"),
        "[build]\ndiagonal = \"appearances\"\noutput = \"built\"\n",
    )
    .unwrap();

    let (_, _, code) = run_cardsort(temp.path(), &["build", &fixture("study.json5")]);
    assert_eq!(code, 0);
    let matrix = load_path(&temp.path().join("built").join("study.csv")).unwrap().matrix;
    assert_eq!(matrix.value("Loans", "Loans"), Some(3));
}

#[test]
fn test_build_invalid_study() {
    let temp = TempDir::new().unwrap();
    let study = temp.path().join("broken.json5");
    fs::write(&study, "{ participants: [").unwrap();

    let (_, stderr, code) = run_cardsort(temp.path(), &["build", study.to_str().unwrap()]);
    assert_eq!(code, 1);
    assert!(stderr.contains("failed to parse study"));
}

#[test]
fn test_build_then_analyze() {
    let temp = TempDir::new().unwrap();
    let (_, _, code) =
        run_cardsort(temp.path(), &["build", &fixture("study.json5"), "-o", "m.csv"]);
    assert_eq!(code, 0);

    let (stdout, stderr, code) = run_cardsort(temp.path(), &["analyze", "m.csv"]);
    assert_eq!(code, 0, "stderr: {}", stderr);
    assert!(stdout.contains("Total co-occurrences: 7"));
    assert!(stdout.contains("Strongest relationship: 3 co-occurrences"));
    assert!(stdout.contains("Savings <-> Loans"));
}
