use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;
use typed_builder::TypedBuilder;

use crate::error::{DdrError, DdrResult};
use crate::types::DocumentKind;

/// |Δ| in °C above which a reading is flagged as an anomaly.
pub const DEFAULT_ANOMALY_THRESHOLD_C: f64 = 5.0;

const ENV_ANOMALY_THRESHOLD: &str = "DDR_ANOMALY_THRESHOLD_C";

/// Settings for one fusion run.
///
/// Resolution order: defaults, then the optional TOML file, then
/// environment overrides. CLI flags are applied last by the binary.
#[derive(Debug, Clone, PartialEq, Serialize, TypedBuilder)]
pub struct FusionConfig {
    #[builder(default = DEFAULT_ANOMALY_THRESHOLD_C)]
    pub anomaly_threshold_c: f64,
    #[builder(default = DocumentKind::Inspection.default_label().to_string(), setter(into))]
    pub inspection_source_label: String,
    #[builder(default = DocumentKind::Thermal.default_label().to_string(), setter(into))]
    pub thermal_source_label: String,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// TOML-backed configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub fusion: FusionSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FusionSection {
    pub anomaly_threshold_c: Option<f64>,
    pub inspection_source_label: Option<String>,
    pub thermal_source_label: Option<String>,
}

impl FusionConfig {
    /// Load from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> DdrResult<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()
    }

    pub fn from_file(path: &Path) -> DdrResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| DdrError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| DdrError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml_str(content: &str) -> DdrResult<Self> {
        let file: FileConfig =
            toml::from_str(content).map_err(|e| DdrError::Config(e.to_string()))?;
        let defaults = Self::default();
        let section = file.fusion;
        Self {
            anomaly_threshold_c: section
                .anomaly_threshold_c
                .unwrap_or(defaults.anomaly_threshold_c),
            inspection_source_label: section
                .inspection_source_label
                .unwrap_or(defaults.inspection_source_label),
            thermal_source_label: section
                .thermal_source_label
                .unwrap_or(defaults.thermal_source_label),
        }
        .validated()
    }

    pub fn apply_env_overrides(self) -> DdrResult<Self> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the environment in production).
    pub fn apply_overrides<F>(mut self, lookup: F) -> DdrResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_ANOMALY_THRESHOLD) {
            self.anomaly_threshold_c = raw.trim().parse().map_err(|_| {
                DdrError::Config(format!("{ENV_ANOMALY_THRESHOLD} must be a number, got {raw:?}"))
            })?;
        }
        self.validated()
    }

    pub fn with_anomaly_threshold(mut self, threshold_c: f64) -> DdrResult<Self> {
        self.anomaly_threshold_c = threshold_c;
        self.validated()
    }

    pub fn source_label(&self, kind: DocumentKind) -> &str {
        match kind {
            DocumentKind::Inspection => &self.inspection_source_label,
            DocumentKind::Thermal => &self.thermal_source_label,
        }
    }

    pub fn log_summary(&self) {
        info!(
            anomaly_threshold_c = self.anomaly_threshold_c,
            inspection_label = self.inspection_source_label.as_str(),
            thermal_label = self.thermal_source_label.as_str(),
            "Fusion config loaded"
        );
    }

    fn validated(self) -> DdrResult<Self> {
        if !self.anomaly_threshold_c.is_finite() || self.anomaly_threshold_c < 0.0 {
            return Err(DdrError::Config(format!(
                "anomaly_threshold_c must be a non-negative number, got {}",
                self.anomaly_threshold_c
            )));
        }
        let inspection = self.inspection_source_label.trim();
        let thermal = self.thermal_source_label.trim();
        if inspection.is_empty() || thermal.is_empty() {
            return Err(DdrError::Config("source labels must not be empty".to_string()));
        }
        if inspection.contains(';') || thermal.contains(';') {
            return Err(DdrError::Config(
                "source labels must not contain ';'".to_string(),
            ));
        }
        if inspection.contains(thermal) || thermal.contains(inspection) {
            return Err(DdrError::Config(format!(
                "source labels must be distinct, got {inspection:?} and {thermal:?}"
            )));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let config = FusionConfig::default();
        assert_eq!(config.anomaly_threshold_c, 5.0);
        assert_eq!(config.source_label(DocumentKind::Inspection), "Inspection Report");
        assert_eq!(config.source_label(DocumentKind::Thermal), "Thermal Report");
    }

    #[test]
    fn overlapping_source_labels_are_rejected() {
        for (inspection, thermal) in [
            ("Thermal Report Inspection", "Thermal Report"),
            ("Survey", "Survey"),
            ("Inspection; Visual", "Thermal Report"),
        ] {
            let err = FusionConfig::from_toml_str(&format!(
                "[fusion]\ninspection_source_label = {inspection:?}\nthermal_source_label = {thermal:?}"
            ))
            .unwrap_err();
            assert!(matches!(err, DdrError::Config(_)), "{inspection} / {thermal}");
        }
    }

    #[test]
    fn toml_overrides_only_given_fields() {
        let config = FusionConfig::from_toml_str(
            r#"
            [fusion]
            anomaly_threshold_c = 3.5
            "#,
        )
        .unwrap();
        assert_eq!(config.anomaly_threshold_c, 3.5);
        assert_eq!(config.thermal_source_label, "Thermal Report");
    }

    #[test]
    fn empty_toml_is_all_defaults() {
        assert_eq!(FusionConfig::from_toml_str("").unwrap(), FusionConfig::default());
    }

    #[test]
    fn unknown_toml_keys_are_rejected() {
        let err = FusionConfig::from_toml_str("[fusion]\nthreshold = 3").unwrap_err();
        assert!(matches!(err, DdrError::Config(_)));
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let err = FusionConfig::default().with_anomaly_threshold(-1.0).unwrap_err();
        assert!(matches!(err, DdrError::Config(_)));
    }

    #[test]
    fn env_override_replaces_threshold() {
        let config = FusionConfig::default()
            .apply_overrides(|key| (key == ENV_ANOMALY_THRESHOLD).then(|| "7.25".to_string()))
            .unwrap();
        assert_eq!(config.anomaly_threshold_c, 7.25);
    }

    #[test]
    fn unparseable_env_override_is_a_config_error() {
        let err = FusionConfig::default()
            .apply_overrides(|_| Some("warm".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_ANOMALY_THRESHOLD));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[fusion]\nthermal_source_label = \"IR Survey\"").unwrap();
        let config = FusionConfig::from_file(file.path()).unwrap();
        assert_eq!(config.source_label(DocumentKind::Thermal), "IR Survey");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = FusionConfig::from_file(Path::new("/nonexistent/ddr.toml")).unwrap_err();
        assert!(matches!(err, DdrError::Io { .. }));
    }
}
