//! Card-sort study data and matrix building
//!
//! A study lists participants, each of whom sorted cards into groups. Two
//! cards co-occur once for every group that contains both of them.
//!
//! Studies are JSON5, so comments and trailing commas are fine. Groups may be
//! named objects or bare card lists:
//!
//! ```text
//! {
//!   name: "Website refresh",
//!   cards: ["Savings", "FAQs", "Blog"],
//!   participants: [
//!     { name: "P1", segment: "personal", groups: [
//!         { name: "Money", cards: ["Savings"] },
//!         ["FAQs", "Blog"],
//!     ] },
//!   ],
//! }
//! ```

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::CoOccurrenceMatrix;

/// Error type for study loading.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StudyError {
    /// File I/O error
    #[error("cannot read study '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// JSON5 parsing error
    #[error("failed to parse study: {0}")]
    Parse(#[from] json5::Error),
    /// Structurally valid but unusable data
    #[error("study validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

impl StudyError {
    /// Short machine-readable kind, used for telemetry entries.
    pub fn kind(&self) -> &'static str {
        match self {
            StudyError::Io { .. } => "io_error",
            StudyError::Parse(_) => "study_parse_error",
            StudyError::Validation(_) => "study_validation_error",
        }
    }
}

/// How the diagonal of a built matrix is filled.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DiagonalMode {
    /// Self-pairs are 0
    #[default]
    Zero,
    /// Self-pairs count the groups that contained the card
    Appearances,
}

/// One group in one participant's sort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawGroup")]
pub struct CardGroup {
    pub name: Option<String>,
    pub cards: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawGroup {
    Named {
        #[serde(default)]
        name: Option<String>,
        cards: Vec<String>,
    },
    Cards(Vec<String>),
}

impl From<RawGroup> for CardGroup {
    fn from(raw: RawGroup) -> Self {
        match raw {
            RawGroup::Named { name, cards } => CardGroup { name, cards },
            RawGroup::Cards(cards) => CardGroup { name: None, cards },
        }
    }
}

/// A participant and their groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    #[serde(default)]
    pub groups: Vec<CardGroup>,
}

impl Participant {
    /// Display name for the group at `index` (its own name or `Group N`).
    pub fn group_label(&self, index: usize) -> String {
        self.groups
            .get(index)
            .and_then(|g| g.name.clone())
            .unwrap_or_else(|| format!("Group {}", index + 1))
    }
}

/// A complete card-sort study.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardSortStudy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Declared card order; cards found only in groups are appended sorted
    #[serde(default)]
    pub cards: Vec<String>,
    #[serde(default)]
    pub participants: Vec<Participant>,
}

/// Options for [`build_matrix`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    pub diagonal: DiagonalMode,
    /// Only include participants in this segment
    pub segment: Option<String>,
}

impl CardSortStudy {
    /// Parse study text and validate it.
    pub fn parse(text: &str) -> Result<Self, StudyError> {
        let study: CardSortStudy = json5::from_str(text)?;
        let errors = study.validate();
        if !errors.is_empty() {
            return Err(StudyError::Validation(errors));
        }
        Ok(study)
    }

    /// Read and parse a study file.
    pub fn load(path: &Path) -> Result<Self, StudyError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| StudyError::Io { path: path.to_path_buf(), source })?;
        Self::parse(&text)
    }

    /// Validate the study and return any problems.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let mut declared = HashSet::new();
        for card in &self.cards {
            if !declared.insert(card.as_str()) {
                errors.push(format!("card '{}' is declared more than once", card));
            }
        }

        // Matrix files trim their cells, so padded names would not survive a reload.
        let mut padded = BTreeSet::new();
        let grouped =
            self.participants.iter().flat_map(|p| p.groups.iter()).flat_map(|g| g.cards.iter());
        for card in self.cards.iter().chain(grouped) {
            if card.trim() != card || card.is_empty() {
                padded.insert(card.as_str());
            }
        }
        for card in padded {
            errors.push(format!(
                "card '{}' must be non-empty without leading or trailing whitespace",
                card
            ));
        }

        let mut names = HashSet::new();
        for (i, participant) in self.participants.iter().enumerate() {
            if participant.name.trim().is_empty() {
                errors.push(format!("participants[{}].name must be a non-empty string", i));
            } else if !names.insert(participant.name.as_str()) {
                errors.push(format!("participant '{}' appears more than once", participant.name));
            }
        }

        errors
    }

    /// Card order for built matrices.
    pub fn card_order(&self) -> Vec<String> {
        let declared: HashSet<&str> = self.cards.iter().map(String::as_str).collect();
        let extras: BTreeSet<&str> = self
            .participants
            .iter()
            .flat_map(|p| p.groups.iter())
            .flat_map(|g| g.cards.iter())
            .map(String::as_str)
            .filter(|c| !declared.contains(c))
            .collect();

        self.cards.iter().cloned().chain(extras.into_iter().map(str::to_string)).collect()
    }

    /// Distinct participant segments, in order of first appearance.
    pub fn segments(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for segment in self.participants.iter().filter_map(|p| p.segment.as_ref()) {
            if !seen.contains(segment) {
                seen.push(segment.clone());
            }
        }
        seen
    }

    /// Participants selected by a segment filter (`None` means everyone).
    pub fn participants_in<'a>(
        &'a self,
        segment: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Participant> + 'a {
        self.participants
            .iter()
            .filter(move |p| segment.is_none() || p.segment.as_deref() == segment)
    }
}

/// Build a co-occurrence matrix from a study.
///
/// Each group adds one to both `[i][j]` and `[j][i]` for every unordered
/// pair of distinct cards in it, so the result is symmetric. A card listed
/// twice in the same group counts once.
pub fn build_matrix(study: &CardSortStudy, options: &BuildOptions) -> CoOccurrenceMatrix {
    let mut matrix = CoOccurrenceMatrix::new(study.card_order());

    for participant in study.participants_in(options.segment.as_deref()) {
        for group in &participant.groups {
            let mut indices: Vec<usize> =
                group.cards.iter().filter_map(|c| matrix.index_of(c)).collect();
            indices.sort_unstable();
            indices.dedup();

            for (k, &i) in indices.iter().enumerate() {
                for &j in &indices[k + 1..] {
                    matrix.increment(i, j);
                    matrix.increment(j, i);
                }
                if options.diagonal == DiagonalMode::Appearances {
                    matrix.increment(i, i);
                }
            }
        }
    }

    matrix
}

#[cfg(test)]
mod tests {
    use super::*;

    const STUDY: &str = r#"{
        // comments are allowed
        name: "Website refresh",
        cards: ["A", "B", "C"],
        participants: [
            { name: "P1", segment: "business", groups: [
                { name: "Core", cards: ["A", "B", "C"] },
            ] },
            { name: "P2", segment: "personal", groups: [
                ["A", "B"],
                ["D"],
            ] },
        ],
    }"#;

    #[test]
    fn test_parse_named_and_bare_groups() {
        let study = CardSortStudy::parse(STUDY).unwrap();
        assert_eq!(study.name.as_deref(), Some("Website refresh"));
        assert_eq!(study.participants.len(), 2);
        assert_eq!(study.participants[0].groups[0].name.as_deref(), Some("Core"));
        assert_eq!(study.participants[1].groups[0].name, None);
        assert_eq!(study.participants[1].group_label(0), "Group 1");
        assert_eq!(study.participants[0].group_label(0), "Core");
    }

    #[test]
    fn test_card_order_appends_undeclared_sorted() {
        let study = CardSortStudy::parse(STUDY).unwrap();
        assert_eq!(study.card_order(), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_card_order_without_declaration_is_sorted() {
        let study = CardSortStudy::parse(
            r#"{ participants: [{ name: "P", groups: [["Zeta", "Alpha"], ["Mid"]] }] }"#,
        )
        .unwrap();
        assert_eq!(study.card_order(), vec!["Alpha", "Mid", "Zeta"]);
    }

    #[test]
    fn test_build_counts_pairs() {
        let study = CardSortStudy::parse(STUDY).unwrap();
        let matrix = build_matrix(&study, &BuildOptions::default());
        assert_eq!(matrix.value("A", "B"), Some(2));
        assert_eq!(matrix.value("B", "A"), Some(2));
        assert_eq!(matrix.value("A", "C"), Some(1));
        assert_eq!(matrix.value("B", "C"), Some(1));
        assert_eq!(matrix.value("C", "D"), Some(0));
        assert_eq!(matrix.value("A", "A"), Some(0));
        assert!(matrix.is_symmetric());
    }

    #[test]
    fn test_build_with_appearance_diagonal() {
        let study = CardSortStudy::parse(STUDY).unwrap();
        let options = BuildOptions { diagonal: DiagonalMode::Appearances, segment: None };
        let matrix = build_matrix(&study, &options);
        assert_eq!(matrix.value("A", "A"), Some(2));
        assert_eq!(matrix.value("C", "C"), Some(1));
        assert_eq!(matrix.value("D", "D"), Some(1));
    }

    #[test]
    fn test_build_filters_by_segment() {
        let study = CardSortStudy::parse(STUDY).unwrap();
        let options = BuildOptions { segment: Some("business".to_string()), ..Default::default() };
        let matrix = build_matrix(&study, &options);
        assert_eq!(matrix.value("A", "B"), Some(1));
        assert_eq!(matrix.value("B", "C"), Some(1));
        // Card order is study-wide so segment matrices line up
        assert_eq!(matrix.len(), 4);
    }

    #[test]
    fn test_duplicate_card_in_group_counts_once() {
        let study =
            CardSortStudy::parse(r#"{ participants: [{ name: "P", groups: [["A", "B", "A"]] }] }"#)
                .unwrap();
        let matrix = build_matrix(&study, &BuildOptions::default());
        assert_eq!(matrix.value("A", "B"), Some(1));
        assert_eq!(matrix.value("A", "A"), Some(0));
    }

    #[test]
    fn test_segments_in_first_appearance_order() {
        let study = CardSortStudy::parse(STUDY).unwrap();
        assert_eq!(study.segments(), vec!["business", "personal"]);
    }

    #[test]
    fn test_validation_errors() {
        let result = CardSortStudy::parse(
            r#"{ cards: ["A", "A"], participants: [{ name: "", groups: [] }, { name: "P", groups: [] }, { name: "P", groups: [] }] }"#,
        );
        match result {
            Err(StudyError::Validation(errors)) => {
                assert_eq!(errors.len(), 3, "{:?}", errors);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_padded_card_names_rejected() {
        let result = CardSortStudy::parse(
            r#"{ cards: [" Blog"], participants: [{ name: "P", groups: [["Savings ", "FAQs"], ["Savings "]] }] }"#,
        );
        match result {
            Err(StudyError::Validation(errors)) => {
                assert_eq!(errors.len(), 2, "{:?}", errors);
                assert!(errors[0].contains("' Blog'"));
                assert!(errors[1].contains("'Savings '"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_error() {
        let result = CardSortStudy::parse("{ participants: [");
        assert!(matches!(result, Err(StudyError::Parse(_))));
        assert_eq!(result.unwrap_err().kind(), "study_parse_error");
    }

    #[test]
    fn test_empty_study_builds_empty_matrix() {
        let study = CardSortStudy::parse("{}").unwrap();
        let matrix = build_matrix(&study, &BuildOptions::default());
        assert!(matrix.is_empty());
    }
}
