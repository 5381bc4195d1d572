//! Urgency scoring (1–5) from issue type, severity wording and thermal evidence.

use tracing::info;

use ddr_common::text::truncate_chars;
use ddr_common::{Observation, TemperatureAnalysis};

/// Issue keywords and their base urgency. Scanned in order, first hit wins,
/// so the order is the tie-break policy.
const ISSUE_TYPE_SCORES: &[(&str, i32)] = &[
    ("moisture", 4),
    ("water", 4),
    ("mold", 4),
    ("plumbing", 4),
    ("electrical", 4),
    ("structural", 4),
    ("safety", 5),
    ("heat loss", 3),
    ("insulation", 3),
    ("anomaly", 3),
    ("thermal", 3),
    ("damage", 3),
    ("crack", 2),
    ("leak", 4),
    ("defect", 2),
    ("cosmetic", 1),
    ("staining", 2),
    ("wear", 2),
];

/// Severity wording and the boost it carries. The strongest hit counts.
const SEVERITY_BOOSTS: &[(&str, i32)] = &[
    ("critical", 2),
    ("severe", 2),
    ("immediate", 2),
    ("urgent", 1),
    ("high", 1),
    ("significant", 1),
    ("moderate", 0),
    ("low", -1),
    ("minor", -1),
    ("cosmetic", -1),
];

const DEFAULT_BASE: i32 = 2;
const HIGH_IMPACT_BASE: i32 = 4;
const DESCRIPTION_SCAN_CHARS: usize = 100;
const MAX_SEVERITY_BOOST: i32 = 2;
const MIN_SCORE: i32 = 1;
const MAX_SCORE: i32 = 5;

const REASON_SEVERITY: &str = "severity keywords in report";
const REASON_THERMAL: &str = "thermal anomaly in area";
const REASON_HIGH_IMPACT: &str = "high-impact issue type";
const REASON_ROUTINE: &str = "routine finding";

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Breakdown of one observation's urgency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrgencyAssessment {
    pub base: i32,
    pub severity: i32,
    pub thermal: i32,
    pub score: u8,
    pub reason: String,
}

/// 1–5 from the first matching issue keyword; 2 when nothing matches.
pub fn issue_type_base(obs: &Observation) -> i32 {
    let issue_type = normalize(obs.issue_type.as_deref().unwrap_or(""));
    let description = normalize(&obs.description);
    let text = format!(
        "{issue_type} {}",
        truncate_chars(&description, DESCRIPTION_SCAN_CHARS)
    );
    ISSUE_TYPE_SCORES
        .iter()
        .find(|(keyword, _)| text.contains(keyword))
        .map(|&(_, base)| base)
        .unwrap_or(DEFAULT_BASE)
}

fn strongest_boost(text: &str) -> Option<i32> {
    SEVERITY_BOOSTS
        .iter()
        .filter(|(keyword, _)| text.contains(keyword))
        .map(|&(_, boost)| boost)
        .max()
}

/// 0–2 from severity wording in the description or any report-wide mention.
pub fn severity_boost(obs: &Observation, severity_mentions: &[String]) -> i32 {
    let description = normalize(&obs.description);
    std::iter::once(description)
        .chain(severity_mentions.iter().map(|s| normalize(s)))
        .filter_map(|text| strongest_boost(&text))
        .fold(0, i32::max)
        .clamp(0, MAX_SEVERITY_BOOST)
}

fn location_matches_area(location: &str, area: &str) -> bool {
    let location = normalize(location);
    let area = normalize(area);
    if location.is_empty() || area.is_empty() {
        return false;
    }
    area.contains(&location) || location.contains(&area)
}

/// 1 when an anomalous reading's location overlaps the observation's area.
pub fn thermal_boost(obs: &Observation, analysis: Option<&TemperatureAnalysis>) -> i32 {
    let Some(analysis) = analysis else {
        return 0;
    };
    let hit = analysis
        .anomalies()
        .any(|reading| location_matches_area(&reading.location, &obs.area));
    i32::from(hit)
}

pub fn assess(
    obs: &Observation,
    severity_mentions: &[String],
    analysis: Option<&TemperatureAnalysis>,
) -> UrgencyAssessment {
    let base = issue_type_base(obs);
    let severity = severity_boost(obs, severity_mentions);
    let thermal = thermal_boost(obs, analysis);
    let score = (base + severity + thermal).clamp(MIN_SCORE, MAX_SCORE);

    let mut reasons = Vec::new();
    if severity > 0 {
        reasons.push(REASON_SEVERITY);
    }
    if thermal > 0 {
        reasons.push(REASON_THERMAL);
    }
    if base >= HIGH_IMPACT_BASE {
        reasons.push(REASON_HIGH_IMPACT);
    }
    let reason = if reasons.is_empty() {
        REASON_ROUTINE.to_string()
    } else {
        reasons.join("; ")
    };

    UrgencyAssessment {
        base,
        severity,
        thermal,
        // Clamped to 1..=5 above.
        score: score as u8,
        reason,
    }
}

/// Annotate each observation with `urgency_score` and `urgency_reason`.
pub fn score_urgency(
    observations: &[Observation],
    severity_mentions: &[String],
    analysis: Option<&TemperatureAnalysis>,
) -> Vec<Observation> {
    let scored: Vec<Observation> = observations
        .iter()
        .map(|obs| {
            let assessment = assess(obs, severity_mentions, analysis);
            obs.clone().with_urgency(assessment.score, assessment.reason)
        })
        .collect();

    info!(
        observations = scored.len(),
        high_urgency = scored
            .iter()
            .filter(|o| o.urgency_score.is_some_and(|s| s >= 4))
            .count(),
        "Urgency scoring complete"
    );
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddr_common::AnalyzedReading;

    fn typed(area: &str, description: &str, issue_type: &str) -> Observation {
        Observation::builder()
            .area(area)
            .description(description)
            .issue_type(issue_type)
            .build()
    }

    fn untyped(area: &str, description: &str) -> Observation {
        Observation::builder().area(area).description(description).build()
    }

    fn analysis_with(location: &str, anomaly: bool) -> TemperatureAnalysis {
        TemperatureAnalysis {
            reference_value: Some(20.0),
            reference_unit: Some("°C".to_string()),
            readings: vec![AnalyzedReading {
                location: location.to_string(),
                value: 28.0,
                unit: "°C".to_string(),
                delta: 8.0,
                delta_c: 8.0,
                anomaly,
            }],
        }
    }

    // --- issue_type_base ---

    #[test]
    fn first_keyword_in_priority_order_wins() {
        // "leak" would give 4 as well, but "crack" is earlier in the list.
        assert_eq!(issue_type_base(&typed("Hall", "", "crack with leak")), 2);
        // "water" precedes "safety" even though safety scores higher.
        assert_eq!(issue_type_base(&typed("Hall", "", "water safety")), 4);
        assert_eq!(issue_type_base(&typed("Hall", "", "Safety hazard")), 5);
    }

    #[test]
    fn description_is_scanned_too() {
        assert_eq!(issue_type_base(&untyped("Hall", "Signs of MOLD behind unit")), 4);
    }

    #[test]
    fn only_first_hundred_description_chars_are_scanned() {
        let description = format!("{} moisture", "x".repeat(100));
        assert_eq!(issue_type_base(&untyped("Hall", &description)), DEFAULT_BASE);
    }

    #[test]
    fn no_keyword_defaults_to_two() {
        assert_eq!(issue_type_base(&untyped("Hall", "Door sticks")), 2);
    }

    // --- severity_boost ---

    #[test]
    fn strongest_severity_keyword_counts() {
        let obs = untyped("Hall", "minor but urgent repair");
        assert_eq!(severity_boost(&obs, &[]), 1);
    }

    #[test]
    fn report_mentions_raise_every_observation() {
        let obs = untyped("Hall", "Door sticks");
        assert_eq!(severity_boost(&obs, &["Severe damp throughout".to_string()]), 2);
    }

    #[test]
    fn negative_boosts_floor_at_zero() {
        let obs = untyped("Hall", "minor cosmetic scuff, low priority");
        assert_eq!(severity_boost(&obs, &[]), 0);
    }

    // --- thermal_boost ---

    #[test]
    fn anomaly_in_matching_area_boosts() {
        let obs = untyped("Master Bedroom", "Cold wall");
        assert_eq!(thermal_boost(&obs, Some(&analysis_with("bedroom", true))), 1);
        assert_eq!(
            thermal_boost(&obs, Some(&analysis_with("Master bedroom north wall", true))),
            1
        );
    }

    #[test]
    fn non_anomalous_or_unrelated_readings_do_not_boost() {
        let obs = untyped("Kitchen", "Cold wall");
        assert_eq!(thermal_boost(&obs, Some(&analysis_with("Kitchen", false))), 0);
        assert_eq!(thermal_boost(&obs, Some(&analysis_with("Loft", true))), 0);
        assert_eq!(thermal_boost(&obs, None), 0);
    }

    #[test]
    fn empty_area_never_matches() {
        let obs = untyped("", "Cold wall");
        assert_eq!(thermal_boost(&obs, Some(&analysis_with("Kitchen", true))), 0);
    }

    // --- score_urgency ---

    #[test]
    fn score_is_clamped_to_five() {
        let obs = typed("Kitchen", "Critical electrical fault", "safety");
        let scored = score_urgency(&[obs], &[], Some(&analysis_with("kitchen", true)));
        assert_eq!(scored[0].urgency_score, Some(5));
        assert_eq!(
            scored[0].urgency_reason.as_deref(),
            Some("severity keywords in report; thermal anomaly in area; high-impact issue type")
        );
    }

    #[test]
    fn routine_finding_reason() {
        let scored = score_urgency(&[untyped("Hall", "Door sticks")], &[], None);
        assert_eq!(scored[0].urgency_score, Some(2));
        assert_eq!(scored[0].urgency_reason.as_deref(), Some("routine finding"));
    }

    #[test]
    fn cosmetic_issue_scores_one() {
        let scored = score_urgency(&[typed("Hall", "Scuffed paint", "cosmetic")], &[], None);
        assert_eq!(scored[0].urgency_score, Some(1));
    }

    #[test]
    fn score_stays_in_range_for_degenerate_input() {
        let inputs = [
            untyped("", ""),
            typed("", "", ""),
            typed("   ", "critical severe immediate", "safety"),
        ];
        for obs in &inputs {
            let scored = score_urgency(
                std::slice::from_ref(obs),
                &["critical".to_string(), "minor".to_string()],
                Some(&analysis_with("", true)),
            );
            let score = scored[0].urgency_score.unwrap();
            assert!((1..=5).contains(&score), "{obs:?} scored {score}");
        }
    }
}
