//! Participant lookup for card pairs
//!
//! Reports pair a relationship with the participant groups behind it. The
//! data comes from whatever implements [`ParticipantDirectory`]; nothing is
//! hard-coded here.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::study::CardSortStudy;

/// One named group in one participant's sort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantGroup {
    pub participant: String,
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
}

/// Source of participant details for a pair of cards.
pub trait ParticipantDirectory {
    /// Every participant group that placed both cards together.
    ///
    /// A card paired with itself has no groups.
    fn lookup_participants(&self, card_a: &str, card_b: &str) -> Vec<ParticipantGroup>;
}

/// A directory with no data.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoParticipants;

impl ParticipantDirectory for NoParticipants {
    fn lookup_participants(&self, _card_a: &str, _card_b: &str) -> Vec<ParticipantGroup> {
        Vec::new()
    }
}

/// Directory backed by a card-sort study.
#[derive(Debug, Clone, Default)]
pub struct StudyDirectory {
    entries: Vec<(ParticipantGroup, HashSet<String>)>,
}

impl StudyDirectory {
    /// Index every group of every participant, in study order.
    pub fn new(study: &CardSortStudy) -> Self {
        let mut entries = Vec::new();
        for participant in &study.participants {
            for (i, group) in participant.groups.iter().enumerate() {
                let info = ParticipantGroup {
                    participant: participant.name.clone(),
                    group: participant.group_label(i),
                    segment: participant.segment.clone(),
                };
                entries.push((info, group.cards.iter().cloned().collect()));
            }
        }
        Self { entries }
    }

    /// Number of indexed groups.
    pub fn group_count(&self) -> usize {
        self.entries.len()
    }
}

impl ParticipantDirectory for StudyDirectory {
    fn lookup_participants(&self, card_a: &str, card_b: &str) -> Vec<ParticipantGroup> {
        if card_a == card_b {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|(_, cards)| cards.contains(card_a) && cards.contains(card_b))
            .map(|(info, _)| info.clone())
            .collect()
    }
}
