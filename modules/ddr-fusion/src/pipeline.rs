//! Runs the fusion stages in order over the two extraction results.
//!
//! merge → temperature analysis → clustering → urgency → root-cause join →
//! confidence. Every stage hands a fresh collection to the next, and the
//! observation order fixed by clustering is kept through to the end.

use serde::{Deserialize, Serialize};
use tracing::info;

use ddr_common::{
    Cluster, Conflict, DdrError, DdrResult, DocumentExtraction, FusionConfig, Observation,
    TemperatureAnalysis, TemperatureReading,
};

use crate::clustering::cluster_observations;
use crate::collaborators::root_cause::{attach_root_causes, RootCauseInference};
use crate::confidence::score_confidence;
use crate::merger::merge_extractions;
use crate::temperature::compute_temperature_analysis;
use crate::urgency::score_urgency;

/// Everything the report-generation collaborator consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FusionReport {
    pub observations: Vec<Observation>,
    pub temperatures: Vec<TemperatureReading>,
    pub temperature_analysis: TemperatureAnalysis,
    pub clusters: Vec<Cluster>,
    pub conflicts: Vec<Conflict>,
    pub severity_mentions: Vec<String>,
    pub ambiguous: Vec<String>,
    pub missing: Vec<String>,
    pub missing_list: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub observations: usize,
    pub clusters: usize,
    pub conflicts: usize,
    pub anomalies: usize,
    pub high_urgency: usize,
    pub missing_items: usize,
}

impl FusionReport {
    pub fn stats(&self) -> RunStats {
        RunStats {
            observations: self.observations.len(),
            clusters: self.clusters.len(),
            conflicts: self.conflicts.len(),
            anomalies: self.temperature_analysis.anomalies().count(),
            high_urgency: self
                .observations
                .iter()
                .filter(|o| o.urgency_score.is_some_and(|s| s >= 4))
                .count(),
            missing_items: self.missing_list.len(),
        }
    }
}

pub struct FusionPipeline {
    config: FusionConfig,
}

impl FusionPipeline {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Fuse the two documents into one scored report.
    ///
    /// Fails only when neither document is present. Root causes are joined
    /// by observation index when the collaborator's inferences are supplied.
    pub fn run(
        &self,
        inspection: Option<&DocumentExtraction>,
        thermal: Option<&DocumentExtraction>,
        root_causes: Option<&[RootCauseInference]>,
    ) -> DdrResult<FusionReport> {
        if inspection.is_none() && thermal.is_none() {
            return Err(DdrError::NoUsableInput);
        }

        let outcome = merge_extractions(inspection, thermal, &self.config);
        let merged = outcome.merged;

        let temperature_analysis =
            compute_temperature_analysis(&merged.temperatures, self.config.anomaly_threshold_c);

        let (observations, clusters) = cluster_observations(&merged.observations);
        let observations = score_urgency(
            &observations,
            &merged.severity_mentions,
            Some(&temperature_analysis),
        );
        let observations = match root_causes {
            Some(inferences) => attach_root_causes(&observations, inferences),
            None => observations,
        };
        let observations = score_confidence(&observations, &outcome.conflicts);

        let report = FusionReport {
            observations,
            temperatures: merged.temperatures,
            temperature_analysis,
            clusters,
            conflicts: outcome.conflicts,
            severity_mentions: merged.severity_mentions,
            ambiguous: merged.ambiguous,
            missing: merged.missing,
            missing_list: outcome.missing_list,
        };

        let stats = report.stats();
        info!(
            observations = stats.observations,
            clusters = stats.clusters,
            conflicts = stats.conflicts,
            anomalies = stats.anomalies,
            high_urgency = stats.high_urgency,
            missing_items = stats.missing_items,
            "Fusion run complete"
        );
        Ok(report)
    }
}

impl Default for FusionPipeline {
    fn default() -> Self {
        Self::new(FusionConfig::default())
    }
}
