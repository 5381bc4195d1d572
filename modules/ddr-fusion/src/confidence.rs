//! Confidence scoring (0–1) from content cues, conflicts and source agreement.

use std::collections::HashSet;

use tracing::info;

use ddr_common::text::{round2, truncate_chars};
use ddr_common::{Conflict, Observation};

const CONFLICT_DESC_CHARS: usize = 80;

const CONFLICTED: f64 = 0.5;
const MULTI_SOURCE: f64 = 0.9;
const SINGLE_SOURCE: f64 = 0.7;

const REASON_CONFLICTED: &str = "Conflicting reports for this finding";
const REASON_MULTI_SOURCE: &str = "Multiple sources agree (inspection and thermal)";
const REASON_SINGLE_SOURCE: &str = "Single source";

/// A content cue that fixes confidence outright.
///
/// Matches when every group has at least one word present and none of the
/// `excludes` words are.
struct ContentRule {
    groups: &'static [&'static [&'static str]],
    excludes: &'static [&'static str],
    confidence: f64,
    reason: &'static str,
}

impl ContentRule {
    fn matches(&self, text: &str) -> bool {
        self.groups
            .iter()
            .all(|group| group.iter().any(|word| text.contains(word)))
            && !self.excludes.iter().any(|word| text.contains(word))
    }
}

/// Checked in order; the first match wins.
const CONTENT_RULES: &[ContentRule] = &[
    ContentRule {
        groups: &[&["visible", "repeated"], &["damp", "moisture", "leak", "damage"]],
        excludes: &[],
        confidence: 0.85,
        reason: "Clear visible or repeated finding",
    },
    ContentRule {
        groups: &[&["skirting"], &["damp", "dampness", "moisture"]],
        excludes: &[],
        confidence: 0.85,
        reason: "Skirting-level dampness clearly reported",
    },
    ContentRule {
        groups: &[&["parking"], &["ceiling"], &["leak", "leakage", "water"]],
        excludes: &[],
        confidence: 0.85,
        reason: "Parking ceiling leakage clearly reported",
    },
    ContentRule {
        groups: &[&["moderate"], &["evidence", "sign", "damage"]],
        excludes: &[],
        confidence: 0.65,
        reason: "Moderate evidence",
    },
    ContentRule {
        groups: &[&["tile"], &["hollow", "hollowness"]],
        excludes: &[],
        confidence: 0.65,
        reason: "Tile hollowness noted",
    },
    ContentRule {
        groups: &[&["unclear", "vague"]],
        excludes: &[],
        confidence: 0.45,
        reason: "Unclear or vague finding",
    },
    ContentRule {
        groups: &[&["damage"], &["bedroom", "bathroom", "room", "ceiling", "wall"]],
        excludes: &["moisture", "leak", "crack", "structural", "water"],
        confidence: 0.45,
        reason: "Insufficient diagnostic detail for generic damage",
    },
];

/// `(area, first 80 chars of description)`, both trimmed.
type FindingKey = (String, String);

fn finding_key(obs: &Observation) -> FindingKey {
    (
        obs.area.trim().to_string(),
        truncate_chars(obs.description.trim(), CONFLICT_DESC_CHARS).to_string(),
    )
}

/// Keys of every observation snapshot that appears in a conflict.
pub fn conflicted_findings(conflicts: &[Conflict]) -> HashSet<FindingKey> {
    conflicts
        .iter()
        .flat_map(|c| c.snapshots())
        .map(finding_key)
        .collect()
}

/// Confidence fixed by wording in the area, description or issue type.
pub fn content_override(obs: &Observation) -> Option<(f64, &'static str)> {
    let text = format!(
        "{} {} {}",
        obs.area.trim().to_lowercase(),
        obs.description.trim().to_lowercase(),
        obs.issue_type.as_deref().unwrap_or("").trim().to_lowercase()
    );
    CONTENT_RULES
        .iter()
        .find(|rule| rule.matches(&text))
        .map(|rule| (rule.confidence, rule.reason))
}

pub fn assess(obs: &Observation, conflicted: &HashSet<FindingKey>) -> (f64, &'static str) {
    if let Some(found) = content_override(obs) {
        return found;
    }
    if conflicted.contains(&finding_key(obs)) {
        return (CONFLICTED, REASON_CONFLICTED);
    }
    if obs.source_labels().len() >= 2 {
        (MULTI_SOURCE, REASON_MULTI_SOURCE)
    } else {
        (SINGLE_SOURCE, REASON_SINGLE_SOURCE)
    }
}

/// Annotate each observation with `confidence` and `confidence_reason`.
pub fn score_confidence(observations: &[Observation], conflicts: &[Conflict]) -> Vec<Observation> {
    let conflicted = conflicted_findings(conflicts);
    let scored: Vec<Observation> = observations
        .iter()
        .map(|obs| {
            let (confidence, reason) = assess(obs, &conflicted);
            obs.clone().with_confidence(round2(confidence), reason)
        })
        .collect();

    info!(
        observations = scored.len(),
        conflicted = scored
            .iter()
            .filter(|o| o.confidence_reason.as_deref() == Some(REASON_CONFLICTED))
            .count(),
        "Confidence scoring complete"
    );
    scored
}
