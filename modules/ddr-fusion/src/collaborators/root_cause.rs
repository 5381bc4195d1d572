//! Root-cause collaborator boundary.
//!
//! The collaborator sees observations by position (`[i]` in the summary)
//! and answers per index. The join below relies on observation order being
//! unchanged between clustering and confidence scoring.

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use ddr_common::lenient::{lenient_index, lenient_opt_string, lenient_seq, lenient_string_list};
use ddr_common::{Observation, TemperatureAnalysis};

use super::strip_code_blocks;

pub const ROOT_CAUSE_PLACEHOLDER: &str = "Insufficient diagnostic detail available to determine root cause. Further inspection recommended.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RootCauseInference {
    /// Position in the observation list; falls back to position in the response.
    #[serde(default, deserialize_with = "lenient_index")]
    pub index: Option<usize>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub root_cause: Option<String>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RootCauseResponse {
    #[serde(default, deserialize_with = "lenient_seq")]
    pub inferences: Vec<RootCauseInference>,
}

/// Indexed prompt summary of the scored observations and temperature deltas.
pub fn build_root_cause_summary(
    observations: &[Observation],
    analysis: Option<&TemperatureAnalysis>,
) -> String {
    let mut lines: Vec<String> = observations
        .iter()
        .enumerate()
        .map(|(i, obs)| {
            format!(
                "[{i}] Area: {}. Issue type: {}. Description: {}. Cluster: {}. Urgency: {}.",
                obs.area,
                obs.issue_type.as_deref().unwrap_or(""),
                obs.description,
                obs.cluster_id.as_deref().unwrap_or(""),
                obs.urgency_score.map(|s| s.to_string()).unwrap_or_default(),
            )
        })
        .collect();

    if let Some(analysis) = analysis.filter(|a| !a.readings.is_empty()) {
        let unit = analysis.reference_unit.as_deref().unwrap_or("");
        lines.push("Temperature deltas (vs reference):".to_string());
        let reference = analysis
            .reference_value
            .map(|v| format!("{v:?}"))
            .unwrap_or_default();
        lines.push(format!("  Reference: {reference} {unit}"));
        for reading in &analysis.readings {
            let marker = if reading.anomaly { " (ANOMALY)" } else { "" };
            lines.push(format!(
                "  - {}: delta {:?} {unit}{marker}",
                reading.location, reading.delta
            ));
        }
    }

    lines.join("\n")
}

/// Decode the collaborator's answer; anything undecodable yields no inferences.
pub fn parse_root_cause_response(response: &str) -> Vec<RootCauseInference> {
    match serde_json::from_str::<RootCauseResponse>(strip_code_blocks(response)) {
        Ok(parsed) => parsed.inferences,
        Err(e) => {
            warn!(error = %e, "Root-cause response was not valid JSON");
            Vec::new()
        }
    }
}

fn usable_root_cause(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(rc) if !rc.is_empty() && !rc.to_lowercase().contains("not determinable") => {
            rc.to_string()
        }
        _ => ROOT_CAUSE_PLACEHOLDER.to_string(),
    }
}

/// Attach `root_cause` and `evidence` to every observation by index.
///
/// Observations without an inference get the placeholder root cause and no
/// evidence. When two inferences claim the same index the later one wins.
pub fn attach_root_causes(
    observations: &[Observation],
    inferences: &[RootCauseInference],
) -> Vec<Observation> {
    let by_index: HashMap<usize, &RootCauseInference> = inferences
        .iter()
        .enumerate()
        .map(|(position, inference)| (inference.index.unwrap_or(position), inference))
        .collect();

    let joined: Vec<Observation> = observations
        .iter()
        .enumerate()
        .map(|(i, obs)| {
            let inference = by_index.get(&i);
            let root_cause = usable_root_cause(inference.and_then(|inf| inf.root_cause.as_deref()));
            let evidence = inference.map(|inf| inf.evidence.clone()).unwrap_or_default();
            obs.clone().with_root_cause(root_cause, evidence)
        })
        .collect();

    info!(
        observations = joined.len(),
        inferences = inferences.len(),
        matched = (0..observations.len()).filter(|i| by_index.contains_key(i)).count(),
        "Root causes attached"
    );
    joined
}
