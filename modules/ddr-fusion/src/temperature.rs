//! Reference temperature and per-reading anomaly detection.
//!
//! The reference is the median of all parsed readings in °C.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use ddr_common::text::round2;
use ddr_common::{AnalyzedReading, TemperatureAnalysis, TemperatureReading, TemperatureValue};

const DEFAULT_UNIT: &str = "°C";

static UNIT_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"°[CFcf]?\s*$").expect("valid regex"));
static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-?[0-9]*\.?[0-9]+)\s*[–\-]\s*(-?[0-9]*\.?[0-9]+)$").expect("valid regex")
});
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?[0-9]+\.?[0-9]*").expect("valid regex"));

/// Parse "23.5", "23.5°C" or a "22–24" range (midpoint).
pub fn parse_value(value: &TemperatureValue) -> Option<f64> {
    match value {
        TemperatureValue::Number(n) => n.is_finite().then_some(*n),
        TemperatureValue::Text(text) => parse_text(text),
    }
}

fn parse_text(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let stripped = UNIT_SUFFIX_RE.replace(trimmed, "");
    let s = stripped.trim();

    if let Some(caps) = RANGE_RE.captures(s) {
        let lo: f64 = caps[1].parse().ok()?;
        let hi: f64 = caps[2].parse().ok()?;
        return Some((lo + hi) / 2.0);
    }
    NUMBER_RE
        .find(s)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

pub fn is_fahrenheit(unit: &str) -> bool {
    let u = unit.trim().to_uppercase().replace('°', "");
    u.contains('F')
}

fn to_celsius(value: f64, unit: &str) -> f64 {
    if is_fahrenheit(unit) {
        (value - 32.0) * 5.0 / 9.0
    } else {
        value
    }
}

fn from_celsius(value_c: f64, unit: &str) -> f64 {
    if is_fahrenheit(unit) {
        value_c * 9.0 / 5.0 + 32.0
    } else {
        value_c
    }
}

/// Median; the mean of the two middle values for an even count.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    Some(if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    })
}

struct ParsedReading<'a> {
    location: &'a str,
    value: f64,
    unit: &'a str,
    value_c: f64,
}

/// Compare every parseable reading against the median reference.
///
/// A reading is an anomaly when |Δ°C| is strictly greater than
/// `anomaly_threshold_c`. Unparseable readings are dropped. With no
/// parseable reading the analysis has no reference and no readings.
pub fn compute_temperature_analysis(
    readings: &[TemperatureReading],
    anomaly_threshold_c: f64,
) -> TemperatureAnalysis {
    let parsed: Vec<ParsedReading<'_>> = readings
        .iter()
        .filter_map(|reading| {
            let value = reading.value.as_ref().and_then(parse_value)?;
            let unit = match reading.unit.trim() {
                "" => DEFAULT_UNIT,
                unit => unit,
            };
            Some(ParsedReading {
                location: &reading.location,
                value,
                unit,
                value_c: to_celsius(value, unit),
            })
        })
        .collect();

    if parsed.len() < readings.len() {
        debug!(
            dropped = readings.len() - parsed.len(),
            "Dropped unparseable temperature readings"
        );
    }

    let values_c: Vec<f64> = parsed.iter().map(|p| p.value_c).collect();
    let (Some(reference_c), Some(first)) = (median(&values_c), parsed.first()) else {
        return TemperatureAnalysis::empty();
    };
    let reference_unit = first.unit;

    let analyzed: Vec<AnalyzedReading> = parsed
        .iter()
        .map(|p| {
            let delta_c = p.value_c - reference_c;
            let delta = from_celsius(reference_c + delta_c, p.unit) - from_celsius(reference_c, p.unit);
            AnalyzedReading {
                location: p.location.to_string(),
                value: p.value,
                unit: p.unit.to_string(),
                delta: round2(delta),
                delta_c: round2(delta_c),
                anomaly: delta_c.abs() > anomaly_threshold_c,
            }
        })
        .collect();

    let analysis = TemperatureAnalysis {
        reference_value: Some(round2(from_celsius(reference_c, reference_unit))),
        reference_unit: Some(reference_unit.to_string()),
        readings: analyzed,
    };
    info!(
        readings = analysis.readings.len(),
        anomalies = analysis.anomalies().count(),
        reference_c = round2(reference_c),
        "Temperature analysis complete"
    );
    analysis
}
