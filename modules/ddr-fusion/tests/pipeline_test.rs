//! End-to-end runs of the fusion pipeline over extraction-shaped JSON.

use serde_json::json;

use ddr_common::{DdrError, DocumentExtraction, FusionConfig};
use ddr_fusion::collaborators::root_cause::{parse_root_cause_response, ROOT_CAUSE_PLACEHOLDER};
use ddr_fusion::{report_context, FusionPipeline};

fn extraction(value: serde_json::Value) -> DocumentExtraction {
    serde_json::from_value(value).unwrap()
}

fn bathroom_inspection() -> DocumentExtraction {
    extraction(json!({
        "observations": [
            {"area": "Bathroom ceiling", "description": "Visible damp staining on ceiling", "issue_type": "Moisture"},
            {"area": "Hall", "description": "Hairline crack above door", "issue_type": "crack"}
        ],
        "severity_mentions": ["moderate"],
        "ambiguous": ["A", "B"],
        "missing": ["Roof void not accessed"]
    }))
}

fn bathroom_thermal() -> DocumentExtraction {
    extraction(json!({
        "observations": [
            {"area": "bathroom ceiling", "description": "moderate moisture evidence", "issue_type": "Moisture"}
        ],
        "temperatures": [
            {"location": "Kitchen", "value": "22", "unit": "°C"},
            {"location": "Bathroom ceiling", "value": "33", "unit": "°C"}
        ],
        "ambiguous": ["B", "C"]
    }))
}

// --- merge and scoring ---

#[test]
fn bathroom_findings_merge_into_one_scored_observation() {
    let inspection = bathroom_inspection();
    let thermal = DocumentExtraction {
        temperatures: vec![],
        ..bathroom_thermal()
    };
    let report = FusionPipeline::default()
        .run(Some(&inspection), Some(&thermal), None)
        .unwrap();

    assert_eq!(report.observations.len(), 2);
    let bathroom = &report.observations[0];
    assert_eq!(bathroom.area, "Bathroom ceiling");
    assert_eq!(bathroom.source, "Inspection Report; Thermal Report");
    assert_eq!(
        bathroom.description,
        "Visible damp staining on ceiling. Thermal/Inspection: moderate moisture evidence"
    );
    assert_eq!(bathroom.issue_type.as_deref(), Some("Moisture"));

    assert_eq!(bathroom.cluster_id.as_deref(), Some("cluster_1"));
    assert_eq!(bathroom.cluster_label.as_deref(), Some("Bathroom ceiling – Moisture"));
    assert_eq!(bathroom.urgency_score, Some(4));
    assert_eq!(bathroom.urgency_reason.as_deref(), Some("high-impact issue type"));
    assert_eq!(bathroom.confidence, Some(0.85));

    // The two descriptions share no words, so the fold is also a conflict.
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].observation_1.source, "Inspection Report");
    assert_eq!(report.conflicts[0].observation_2.source, "Thermal Report");
}

#[test]
fn thermal_anomaly_raises_urgency_in_matching_area() {
    let report = FusionPipeline::default()
        .run(Some(&bathroom_inspection()), Some(&bathroom_thermal()), None)
        .unwrap();

    let analysis = &report.temperature_analysis;
    assert_eq!(analysis.reference_value, Some(27.5));
    assert_eq!(analysis.reference_unit.as_deref(), Some("°C"));
    assert!(analysis.readings.iter().all(|r| r.anomaly));

    assert_eq!(report.observations[0].urgency_score, Some(5));
    assert_eq!(
        report.observations[0].urgency_reason.as_deref(),
        Some("thermal anomaly in area; high-impact issue type")
    );
    // Hall has no anomalous reading.
    assert_eq!(report.observations[1].urgency_score, Some(2));
    assert_eq!(report.stats().anomalies, 2);
}

#[test]
fn ambiguous_and_missing_lists_are_deduped_in_order() {
    let report = FusionPipeline::default()
        .run(Some(&bathroom_inspection()), Some(&bathroom_thermal()), None)
        .unwrap();

    assert_eq!(report.ambiguous, vec!["A", "B", "C"]);
    assert_eq!(report.missing, vec!["Roof void not accessed"]);
    assert_eq!(report.missing_list, vec!["A", "B", "C", "Roof void not accessed"]);
}

// --- temperatures ---

fn thermal_only(temperatures: serde_json::Value) -> DocumentExtraction {
    extraction(json!({ "temperatures": temperatures }))
}

#[test]
fn kitchen_bedroom_deltas_and_boundary() {
    let pipeline = FusionPipeline::default();

    let doc = thermal_only(json!([
        {"location": "Kitchen", "value": "22", "unit": "°C"},
        {"location": "Bedroom", "value": "30", "unit": "°C"}
    ]));
    let report = pipeline.run(None, Some(&doc), None).unwrap();
    let analysis = &report.temperature_analysis;
    assert_eq!(analysis.reference_value, Some(26.0));
    assert_eq!(analysis.readings[0].delta, -4.0);
    assert_eq!(analysis.readings[1].delta, 4.0);
    assert!(analysis.readings.iter().all(|r| !r.anomaly));

    let doc = thermal_only(json!([
        {"location": "Kitchen", "value": "22", "unit": "°C"},
        {"location": "Bedroom", "value": "32", "unit": "°C"}
    ]));
    let report = pipeline.run(None, Some(&doc), None).unwrap();
    assert_eq!(report.temperature_analysis.reference_value, Some(27.0));
    assert_eq!(report.temperature_analysis.readings[1].delta, 5.0);
    assert!(!report.temperature_analysis.readings[1].anomaly);
}

#[test]
fn configured_threshold_is_used() {
    let config = FusionConfig::builder().anomaly_threshold_c(3.0).build();
    let doc = thermal_only(json!([
        {"location": "Kitchen", "value": 22, "unit": "°C"},
        {"location": "Bedroom", "value": 30, "unit": "°C"}
    ]));
    let report = FusionPipeline::new(config).run(None, Some(&doc), None).unwrap();
    assert!(report.temperature_analysis.readings.iter().all(|r| r.anomaly));
}

#[test]
fn unparseable_readings_are_dropped() {
    let doc = thermal_only(json!([
        {"location": "Loft", "value": "not measured", "unit": "°C"},
        {"location": "Hall", "value": "21.5°C"}
    ]));
    let report = FusionPipeline::default().run(None, Some(&doc), None).unwrap();
    assert_eq!(report.temperatures.len(), 2);
    assert_eq!(report.temperature_analysis.readings.len(), 1);
    assert_eq!(report.temperature_analysis.readings[0].location, "Hall");
}

// --- root causes ---

#[test]
fn root_causes_join_by_post_cluster_index() {
    let response = r#"{"inferences": [
        {"index": 1, "root_cause": "Settlement", "evidence": ["Crack widens at lintel"]},
        {"index": 0, "root_cause": "Failed shower seal"}
    ]}"#;
    let inferences = parse_root_cause_response(response);
    let report = FusionPipeline::default()
        .run(Some(&bathroom_inspection()), Some(&bathroom_thermal()), Some(inferences.as_slice()))
        .unwrap();

    assert_eq!(report.observations[0].root_cause.as_deref(), Some("Failed shower seal"));
    assert_eq!(report.observations[0].evidence, Some(vec![]));
    assert_eq!(report.observations[1].root_cause.as_deref(), Some("Settlement"));
}

#[test]
fn empty_root_cause_response_fills_placeholders() {
    let inferences = parse_root_cause_response("no inferences here");
    assert!(inferences.is_empty());
    let report = FusionPipeline::default()
        .run(Some(&bathroom_inspection()), None, Some(inferences.as_slice()))
        .unwrap();
    assert!(report
        .observations
        .iter()
        .all(|o| o.root_cause.as_deref() == Some(ROOT_CAUSE_PLACEHOLDER)));
}

// --- whole-run properties ---

#[test]
fn runs_are_deterministic() {
    let pipeline = FusionPipeline::default();
    let first = pipeline
        .run(Some(&bathroom_inspection()), Some(&bathroom_thermal()), None)
        .unwrap();
    let second = pipeline
        .run(Some(&bathroom_inspection()), Some(&bathroom_thermal()), None)
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn no_documents_is_a_distinct_error() {
    let err = FusionPipeline::default().run(None, None, None).unwrap_err();
    assert!(matches!(err, DdrError::NoUsableInput));
    assert_eq!(
        err.to_string(),
        "At least one valid document (inspection or thermal) is required"
    );
}

#[test]
fn report_serializes_contract_field_names() {
    let report = FusionPipeline::default()
        .run(Some(&bathroom_inspection()), Some(&bathroom_thermal()), None)
        .unwrap();
    let json = serde_json::to_value(&report).unwrap();

    for key in [
        "observations",
        "temperatures",
        "temperature_analysis",
        "clusters",
        "conflicts",
        "severity_mentions",
        "ambiguous",
        "missing",
        "missing_list",
    ] {
        assert!(json.get(key).is_some(), "report missing {key}");
    }
    let obs = &json["observations"][0];
    for key in [
        "area",
        "description",
        "source",
        "cluster_id",
        "cluster_label",
        "urgency_score",
        "urgency_reason",
        "confidence",
        "confidence_reason",
    ] {
        assert!(obs.get(key).is_some(), "observation missing {key}");
    }
    assert_eq!(json["conflicts"][0]["type"], "observation");
}

#[test]
fn report_context_renders_full_run() {
    let report = FusionPipeline::default()
        .run(Some(&bathroom_inspection()), Some(&bathroom_thermal()), None)
        .unwrap();
    let ctx = report_context::render(&report);

    assert!(ctx.merged_data.starts_with("Observations (with cluster, urgency, root cause, confidence):"));
    assert!(ctx
        .merged_data
        .contains("  - Bathroom ceiling: delta 5.5 °C [ANOMALY]"));
    assert!(ctx.merged_data.contains("Severity mentions: moderate"));
    assert!(ctx
        .conflicts
        .starts_with("- Conflicting descriptions for same area — both recorded."));
    assert_eq!(ctx.missing, "- A\n- B\n- C\n- Roof void not accessed");
}
