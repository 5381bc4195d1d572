//! Deduplication and reconciliation of the two extraction results.
//!
//! Matching is a greedy single pass: each incoming observation is compared
//! against the canonical list built so far and folds into the first entry
//! it resembles. Earlier decisions are never revisited.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use ddr_common::text::{dedup_first_seen, truncate_chars, word_set};
use ddr_common::{
    Conflict, DocumentExtraction, DocumentKind, FusionConfig, Observation, TemperatureReading,
};

pub const CONFLICT_MESSAGE: &str = "Conflicting descriptions for same area — both recorded.";

/// Comparison stand-in for an empty area. Never written back.
const AREA_NOT_SPECIFIED: &str = "Area not specified";
const PREFIX_CHARS: usize = 50;
const SIMILARITY_THRESHOLD: f64 = 0.3;
/// Descriptions sharing fewer words than this are treated as disagreeing.
const CONFLICT_SHARED_WORDS: usize = 3;

/// Both documents folded together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedExtraction {
    pub observations: Vec<Observation>,
    pub temperatures: Vec<TemperatureReading>,
    pub severity_mentions: Vec<String>,
    pub ambiguous: Vec<String>,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    pub merged: MergedExtraction,
    pub conflicts: Vec<Conflict>,
    /// `ambiguous` followed by `missing`.
    pub missing_list: Vec<String>,
}

pub fn normalize_area(area: &str) -> String {
    let trimmed = area.trim();
    if trimmed.is_empty() {
        AREA_NOT_SPECIFIED.to_string()
    } else {
        trimmed.to_lowercase()
    }
}

/// Issue type when present, otherwise the description, cut to 50 chars and lowercased.
fn topic_prefix(obs: &Observation) -> String {
    let topic = obs.issue_type().unwrap_or(&obs.description);
    truncate_chars(topic, PREFIX_CHARS).to_lowercase()
}

/// Shared words over the larger word count; 0 when either side has none.
fn word_overlap(a: &str, b: &str) -> f64 {
    let words_a = word_set(a);
    let words_b = word_set(b);
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }
    let shared = words_a.intersection(&words_b).count();
    shared as f64 / words_a.len().max(words_b.len()) as f64
}

/// Same normalized area and a resembling issue type / description prefix.
pub fn observations_similar(a: &Observation, b: &Observation) -> bool {
    if normalize_area(&a.area) != normalize_area(&b.area) {
        return false;
    }
    let prefix_a = topic_prefix(a);
    let prefix_b = topic_prefix(b);
    if prefix_a.is_empty() || prefix_b.is_empty() {
        return true;
    }
    word_overlap(&prefix_a, &prefix_b) > SIMILARITY_THRESHOLD
        || prefix_b.contains(&prefix_a)
        || prefix_a.contains(&prefix_b)
}

/// Both descriptions present, not identical, and sharing fewer than three words.
pub fn has_conflict(a: &Observation, b: &Observation) -> bool {
    let desc_a = a.description.trim();
    let desc_b = b.description.trim();
    if desc_a.is_empty() || desc_b.is_empty() {
        return false;
    }
    let shared = word_set(desc_a).intersection(&word_set(desc_b)).count();
    desc_a != desc_b && shared < CONFLICT_SHARED_WORDS
}

/// Fold the incoming description, issue type and source into `seen`.
fn combine_fields(seen: &mut Observation, incoming: &Observation) {
    let desc_seen = seen.description.trim().to_string();
    let desc_new = incoming.description.trim();
    if !desc_new.is_empty() && desc_new != desc_seen {
        seen.description = if desc_seen.is_empty() {
            desc_new.to_string()
        } else {
            format!("{desc_seen}. Thermal/Inspection: {desc_new}")
        };
    }

    let it_seen = seen.issue_type.as_deref().unwrap_or("").trim().to_string();
    let it_new = incoming.issue_type.as_deref().unwrap_or("").trim();
    if !it_new.is_empty() {
        if it_seen.is_empty() {
            seen.issue_type = Some(it_new.to_string());
        } else if it_new.to_lowercase() != it_seen.to_lowercase() {
            seen.issue_type = Some(format!("{it_seen}; {it_new}"));
        }
    }

    let src_seen = seen.source.trim().to_string();
    let src_new = incoming.source.trim();
    if !src_new.is_empty() && !seen.source_labels().contains(&src_new) {
        seen.source = if src_seen.is_empty() {
            src_new.to_string()
        } else {
            format!("{src_seen}; {src_new}")
        };
    }
}

/// Greedy dedup of inspection then thermal observations.
///
/// Every incoming observation is stamped with its document's source label.
/// A conflict is recorded against the existing entry's pre-merge snapshot,
/// and the fields are combined regardless.
pub fn merge_observations(
    inspection: &[Observation],
    thermal: &[Observation],
    config: &FusionConfig,
) -> (Vec<Observation>, Vec<Conflict>) {
    let mut seen: Vec<Observation> = Vec::new();
    let mut conflicts = Vec::new();

    let batches = [
        (inspection, config.source_label(DocumentKind::Inspection)),
        (thermal, config.source_label(DocumentKind::Thermal)),
    ];
    for (batch, label) in batches {
        for raw in batch {
            let incoming = Observation {
                source: label.to_string(),
                ..raw.clone()
            };
            match seen.iter_mut().find(|s| observations_similar(&incoming, s)) {
                Some(existing) => {
                    if has_conflict(&incoming, existing) {
                        debug!(area = existing.area.as_str(), "Conflicting observation");
                        conflicts.push(Conflict::observation(
                            existing.clone(),
                            incoming.clone(),
                            CONFLICT_MESSAGE,
                        ));
                    }
                    combine_fields(existing, &incoming);
                }
                None => seen.push(incoming),
            }
        }
    }

    (seen, conflicts)
}

/// Merge both documents. Absent documents contribute nothing.
pub fn merge_extractions(
    inspection: Option<&DocumentExtraction>,
    thermal: Option<&DocumentExtraction>,
    config: &FusionConfig,
) -> MergeOutcome {
    let documents: Vec<&DocumentExtraction> = [inspection, thermal].into_iter().flatten().collect();

    let (observations, conflicts) = merge_observations(
        inspection.map(|d| d.observations.as_slice()).unwrap_or_default(),
        thermal.map(|d| d.observations.as_slice()).unwrap_or_default(),
        config,
    );

    let temperatures: Vec<TemperatureReading> = documents
        .iter()
        .flat_map(|d| d.temperatures.iter().cloned())
        .collect();

    let severity_mentions = dedup_first_seen(
        documents
            .iter()
            .flat_map(|d| d.severity_mentions.iter())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
    );

    let ambiguous = dedup_first_seen(
        documents
            .iter()
            .flat_map(|d| d.ambiguous.iter())
            .filter(|s| !s.is_empty())
            .cloned(),
    );
    let missing = dedup_first_seen(
        documents
            .iter()
            .flat_map(|d| d.missing.iter())
            .filter(|s| !s.is_empty())
            .cloned(),
    );
    let missing_list = ambiguous.iter().chain(missing.iter()).cloned().collect();

    info!(
        observations = observations.len(),
        conflicts = conflicts.len(),
        temperatures = temperatures.len(),
        "Merged extractions"
    );

    MergeOutcome {
        merged: MergedExtraction {
            observations,
            temperatures,
            severity_mentions,
            ambiguous,
            missing,
        },
        conflicts,
        missing_list,
    }
}
