//! Renders a fused report into the text blocks the report-generation
//! collaborator fills into its prompt.

use serde::{Deserialize, Serialize};

use ddr_common::{Conflict, Observation};

use crate::pipeline::FusionReport;

const EMPTY_BUNDLE: &str = "No data extracted.";
const NONE: &str = "None";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportContext {
    pub merged_data: String,
    pub conflicts: String,
    pub missing: String,
}

pub fn render(report: &FusionReport) -> ReportContext {
    ReportContext {
        merged_data: render_merged_data(report),
        conflicts: render_conflicts(&report.conflicts),
        missing: render_missing(&report.missing_list),
    }
}

fn observation_line(obs: &Observation) -> String {
    let mut line = format!("  - [{}] ({}): {}", obs.area, obs.source, obs.description);

    if let Some(id) = obs.cluster_id.as_deref().filter(|id| !id.is_empty()) {
        let label = obs.cluster_label.as_deref().filter(|l| !l.is_empty()).unwrap_or(id);
        line.push_str(&format!(" | Cluster: {label}"));
    }
    if let Some(score) = obs.urgency_score {
        line.push_str(&format!(" | Urgency: {score}/5"));
    }
    if let Some(reason) = obs.urgency_reason.as_deref().filter(|r| !r.is_empty()) {
        line.push_str(&format!(" ({reason})"));
    }
    if let Some(root_cause) = obs.root_cause.as_deref().filter(|r| !r.is_empty()) {
        line.push_str(&format!(" | Root cause: {root_cause}"));
    }
    if let Some(evidence) = obs.evidence.as_ref().filter(|e| !e.is_empty()) {
        line.push_str(&format!(" | Evidence: {}", evidence.join("; ")));
    }
    if let Some(confidence) = obs.confidence {
        line.push_str(&format!(" | Confidence: {confidence}"));
    }
    if let Some(reason) = obs.confidence_reason.as_deref().filter(|r| !r.is_empty()) {
        line.push_str(&format!(" ({reason})"));
    }
    line
}

fn render_merged_data(report: &FusionReport) -> String {
    let mut parts: Vec<String> = Vec::new();

    if !report.observations.is_empty() {
        parts.push("Observations (with cluster, urgency, root cause, confidence):".to_string());
        parts.extend(report.observations.iter().map(observation_line));
    }

    if !report.temperatures.is_empty() {
        parts.push("Temperature readings (raw):".to_string());
        for reading in &report.temperatures {
            let value = reading.value.as_ref().map(|v| v.to_string()).unwrap_or_default();
            parts.push(format!("  - {}: {value} {}", reading.location, reading.unit));
        }
    }

    let analysis = &report.temperature_analysis;
    if !analysis.readings.is_empty() {
        let unit = analysis.reference_unit.as_deref().unwrap_or("");
        let reference = analysis
            .reference_value
            .map(|v| format!("{v:?}"))
            .unwrap_or_default();
        parts.push(format!("Temperature deltas (reference: {reference} {unit}):"));
        for reading in &analysis.readings {
            let marker = if reading.anomaly { " [ANOMALY]" } else { "" };
            parts.push(format!(
                "  - {}: delta {:?} {unit}{marker}",
                reading.location, reading.delta
            ));
        }
    }

    if !report.clusters.is_empty() {
        parts.push("Issue clusters:".to_string());
        for cluster in &report.clusters {
            parts.push(format!("  - {}: {}", cluster.cluster_id, cluster.label));
        }
    }

    if !report.severity_mentions.is_empty() {
        parts.push(format!(
            "Severity mentions: {}",
            report.severity_mentions.join(", ")
        ));
    }

    if parts.is_empty() {
        EMPTY_BUNDLE.to_string()
    } else {
        parts.join("\n")
    }
}

fn render_conflicts(conflicts: &[Conflict]) -> String {
    if conflicts.is_empty() {
        return NONE.to_string();
    }
    let mut parts = Vec::new();
    for conflict in conflicts {
        parts.push(format!("- {}", conflict.message));
        for (key, snapshot) in ["observation_1", "observation_2"]
            .into_iter()
            .zip(conflict.snapshots())
        {
            // Observation serialization cannot fail: plain strings and numbers only.
            let json = serde_json::to_string(snapshot).unwrap_or_default();
            parts.push(format!("  {key}: {json}"));
        }
    }
    parts.join("\n")
}

fn render_missing(missing: &[String]) -> String {
    if missing.is_empty() {
        return NONE.to_string();
    }
    missing
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}
