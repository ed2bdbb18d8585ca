//! Report generation for analysed matrices

use serde::Serialize;

use crate::models::{Pair, SummaryStatistics, Warning};
use crate::participants::{ParticipantDirectory, ParticipantGroup};
use crate::session::Analysis;

/// A ranked pair with the participant groups that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relationship {
    #[serde(flatten)]
    pub pair: Pair,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub participants: Vec<ParticipantGroup>,
}

/// Everything printed for one matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixReport {
    pub label: String,
    pub symmetric: bool,
    pub statistics: SummaryStatistics,
    pub relationships: Vec<Relationship>,
    pub warnings: Vec<Warning>,
}

impl MatrixReport {
    /// Build a report with the `top_k` strongest relationships.
    pub fn new(analysis: &Analysis, top_k: usize, directory: &dyn ParticipantDirectory) -> Self {
        let relationships = analysis
            .top(top_k)
            .iter()
            .map(|pair| Relationship {
                participants: directory.lookup_participants(&pair.card_a, &pair.card_b),
                pair: pair.clone(),
            })
            .collect();

        Self {
            label: analysis.label.clone(),
            symmetric: analysis.matrix().is_symmetric(),
            statistics: analysis.statistics.clone(),
            relationships,
            warnings: analysis.warnings().to_vec(),
        }
    }
}

#[derive(Serialize)]
struct ReportSet<'a> {
    matrices: &'a [MatrixReport],
}

/// Format reports as pretty JSON: `{ "matrices": [...] }`.
pub fn format_report_json(reports: &[MatrixReport]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&ReportSet { matrices: reports })
}

/// Format reports as text, one section per matrix.
pub fn format_report_text(reports: &[MatrixReport]) -> String {
    let mut output = String::new();
    for (i, report) in reports.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        push_report_text(&mut output, report);
    }
    output
}

fn push_report_text(output: &mut String, report: &MatrixReport) {
    let stats = &report.statistics;

    let title = format!("Card Co-occurrence Report: {}", report.label);
    output.push_str(&title);
    output.push('\n');
    output.push_str(&"=".repeat(title.chars().count()));
    output.push('\n');
    output.push_str(&format!("Total cards: {}\n", stats.category_count));
    output.push_str(&format!("Total co-occurrences: {}\n", stats.total));
    output.push_str(&format!("Strongest relationship: {} co-occurrences\n", stats.max));
    output.push_str(&format!("Average per pair: {:.2}\n", stats.average));
    output.push_str(&format!("Non-zero pairs: {}\n", stats.non_zero_pairs));
    output.push('\n');

    if !stats.strongest_pairs.is_empty() {
        push_heading(output, "STRONGEST PAIRS");
        for pair in &stats.strongest_pairs {
            output.push_str(&format!("  {} <-> {}\n", pair.card_a, pair.card_b));
        }
        output.push('\n');
    }

    if !report.relationships.is_empty() {
        push_heading(output, &format!("TOP RELATIONSHIPS (top {})", report.relationships.len()));
        let width = report
            .relationships
            .iter()
            .map(|r| r.pair.card_a.chars().count() + r.pair.card_b.chars().count() + 5)
            .max()
            .unwrap_or(0);
        for rel in &report.relationships {
            let names = format!("{} <-> {}", rel.pair.card_a, rel.pair.card_b);
            output.push_str(&format!(
                "  {:<width$} {:>4} co-occurrences\n",
                names,
                rel.pair.value,
                width = width
            ));
            for group in &rel.participants {
                match &group.segment {
                    Some(segment) => output.push_str(&format!(
                        "      {}: {} ({})\n",
                        group.participant, group.group, segment
                    )),
                    None => {
                        output.push_str(&format!("      {}: {}\n", group.participant, group.group))
                    }
                }
            }
        }
        output.push('\n');
    }

    if !report.warnings.is_empty() {
        push_heading(output, "WARNINGS");
        for warning in &report.warnings {
            output.push_str(&format!("  {}\n", warning));
        }
        output.push('\n');
    }
}

fn push_heading(output: &mut String, heading: &str) {
    output.push_str(heading);
    output.push('\n');
    output.push_str(&"─".repeat(heading.chars().count()));
    output.push('\n');
}
