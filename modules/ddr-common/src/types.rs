use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::lenient::{
    lenient_opt_string, lenient_seq, lenient_string, lenient_string_list, lenient_temperature,
};

// --- Source documents ---

/// The two kinds of document a finding can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Inspection,
    Thermal,
}

impl DocumentKind {
    /// Label stamped into `Observation::source` unless configured otherwise.
    pub fn default_label(&self) -> &'static str {
        match self {
            DocumentKind::Inspection => "Inspection Report",
            DocumentKind::Thermal => "Thermal Report",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::Inspection => write!(f, "inspection"),
            DocumentKind::Thermal => write!(f, "thermal"),
        }
    }
}

// --- Observation ---

/// A single finding tied to a building area.
///
/// The extraction collaborator supplies `area`, `description`, `issue_type`
/// and `source`; every later field is an annotation added by one pipeline
/// stage. Stages never edit an observation they were handed: they clone it
/// and attach their annotation through the `with_*` methods.
#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema, TypedBuilder,
)]
pub struct Observation {
    #[serde(default, deserialize_with = "lenient_string")]
    #[builder(setter(into))]
    pub area: String,
    #[serde(default, deserialize_with = "lenient_string")]
    #[builder(setter(into))]
    pub description: String,
    #[serde(
        default,
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    #[builder(default, setter(strip_option, into))]
    pub issue_type: Option<String>,
    /// One or more source labels joined by "; ".
    #[serde(default, deserialize_with = "lenient_string")]
    #[builder(default, setter(into))]
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(skip))]
    pub cluster_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(skip))]
    pub cluster_label: Option<String>,
    /// 1..=5
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(skip))]
    pub urgency_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(skip))]
    pub urgency_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(skip))]
    pub root_cause: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(skip))]
    pub evidence: Option<Vec<String>>,
    /// 0.0..=1.0, two decimals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(skip))]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(skip))]
    pub confidence_reason: Option<String>,
}

impl Observation {
    /// The issue type when present and non-empty.
    pub fn issue_type(&self) -> Option<&str> {
        self.issue_type.as_deref().filter(|it| !it.is_empty())
    }

    /// Distinct source labels in first-seen order.
    pub fn source_labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        for label in self.source.split(';').map(str::trim) {
            if !label.is_empty() && !labels.contains(&label) {
                labels.push(label);
            }
        }
        labels
    }

    pub fn with_cluster(mut self, cluster_id: impl Into<String>, label: impl Into<String>) -> Self {
        self.cluster_id = Some(cluster_id.into());
        self.cluster_label = Some(label.into());
        self
    }

    pub fn with_urgency(mut self, score: u8, reason: impl Into<String>) -> Self {
        self.urgency_score = Some(score);
        self.urgency_reason = Some(reason.into());
        self
    }

    pub fn with_root_cause(mut self, root_cause: impl Into<String>, evidence: Vec<String>) -> Self {
        self.root_cause = Some(root_cause.into());
        self.evidence = Some(evidence);
        self
    }

    pub fn with_confidence(mut self, confidence: f64, reason: impl Into<String>) -> Self {
        self.confidence = Some(confidence);
        self.confidence_reason = Some(reason.into());
        self
    }
}

// --- Temperatures ---

/// Raw reading value as the extractor reported it: a bare number or free
/// text such as "23.5°C" or "22–24".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum TemperatureValue {
    Number(f64),
    Text(String),
}

impl std::fmt::Display for TemperatureValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemperatureValue::Number(n) => write!(f, "{n}"),
            TemperatureValue::Text(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TemperatureReading {
    #[serde(default, deserialize_with = "lenient_string")]
    pub location: String,
    #[serde(default, deserialize_with = "lenient_temperature")]
    pub value: Option<TemperatureValue>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub unit: String,
}

impl TemperatureReading {
    pub fn new(
        location: impl Into<String>,
        value: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            location: location.into(),
            value: Some(TemperatureValue::Text(value.into())),
            unit: unit.into(),
        }
    }
}

/// A parsed reading compared against the reference temperature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedReading {
    pub location: String,
    /// Parsed value in the reading's own unit.
    pub value: f64,
    pub unit: String,
    /// Deviation from the reference, in the reading's own unit.
    pub delta: f64,
    pub delta_c: f64,
    pub anomaly: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemperatureAnalysis {
    pub reference_value: Option<f64>,
    pub reference_unit: Option<String>,
    pub readings: Vec<AnalyzedReading>,
}

impl TemperatureAnalysis {
    /// Analysis with no usable readings: no reference, nothing flagged.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn anomalies(&self) -> impl Iterator<Item = &AnalyzedReading> {
        self.readings.iter().filter(|r| r.anomaly)
    }
}

// --- Conflicts and clusters ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    Observation,
}

/// Two findings for the same area whose descriptions disagree.
/// Informational only: recording one never blocks a merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    #[serde(rename = "type")]
    pub kind: ConflictKind,
    pub observation_1: Observation,
    pub observation_2: Observation,
    pub message: String,
}

impl Conflict {
    pub fn observation(
        existing: Observation,
        incoming: Observation,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: ConflictKind::Observation,
            observation_1: existing,
            observation_2: incoming,
            message: message.into(),
        }
    }

    pub fn snapshots(&self) -> [&Observation; 2] {
        [&self.observation_1, &self.observation_2]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub cluster_id: String,
    pub label: String,
    /// Indices into the clustered observation list, ascending.
    pub observation_indices: Vec<usize>,
}

// --- Extraction collaborator contract ---

/// Structured findings the extraction collaborator returns for one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DocumentExtraction {
    #[serde(default, deserialize_with = "lenient_seq")]
    pub observations: Vec<Observation>,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub temperatures: Vec<TemperatureReading>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub severity_mentions: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub ambiguous: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub missing: Vec<String>,
}

impl DocumentExtraction {
    /// Stand-in for a response that could not be decoded at all.
    pub fn placeholder(note: impl Into<String>) -> Self {
        Self {
            ambiguous: vec![note.into()],
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
            && self.temperatures.is_empty()
            && self.severity_mentions.is_empty()
            && self.ambiguous.is_empty()
            && self.missing.is_empty()
    }
}
