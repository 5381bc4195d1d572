//! Topic clustering: group observations by normalized area + issue type.

use std::collections::HashMap;

use tracing::info;

use ddr_common::text::truncate_chars;
use ddr_common::{Cluster, Observation};

const PREFIX_CHARS: usize = 50;
const UNSPECIFIED: &str = "unspecified";
const DEFAULT_ISSUE_LABEL: &str = "finding";

fn normalize(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        UNSPECIFIED.to_string()
    } else {
        trimmed.to_lowercase()
    }
}

/// `"{area}|{issue type, or first 50 chars of description}"`, both normalized.
pub fn cluster_key(obs: &Observation) -> String {
    let topic = obs
        .issue_type()
        .unwrap_or_else(|| truncate_chars(&obs.description, PREFIX_CHARS));
    format!("{}|{}", normalize(&obs.area), normalize(topic))
}

/// Display label built from the first member's raw values.
fn cluster_label(first: &Observation) -> String {
    format!(
        "{} – {}",
        first.area,
        first.issue_type().unwrap_or(DEFAULT_ISSUE_LABEL)
    )
}

/// Assign every observation to a cluster.
///
/// Clusters are numbered `cluster_1`, `cluster_2`, … in the order their key
/// first appears. The returned observations keep their input order, so
/// `observation_indices` index straight into them.
pub fn cluster_observations(observations: &[Observation]) -> (Vec<Observation>, Vec<Cluster>) {
    let mut position_by_key: HashMap<String, usize> = HashMap::new();
    let mut clusters: Vec<Cluster> = Vec::new();
    let mut assignment: Vec<usize> = Vec::with_capacity(observations.len());

    for (i, obs) in observations.iter().enumerate() {
        let key = cluster_key(obs);
        let position = *position_by_key.entry(key).or_insert_with(|| {
            clusters.push(Cluster {
                cluster_id: format!("cluster_{}", clusters.len() + 1),
                label: cluster_label(obs),
                observation_indices: Vec::new(),
            });
            clusters.len() - 1
        });
        clusters[position].observation_indices.push(i);
        assignment.push(position);
    }

    let clustered: Vec<Observation> = observations
        .iter()
        .zip(assignment)
        .map(|(obs, position)| {
            let cluster = &clusters[position];
            obs.clone()
                .with_cluster(cluster.cluster_id.clone(), cluster.label.clone())
        })
        .collect();

    info!(
        observations = clustered.len(),
        clusters = clusters.len(),
        "Clustered observations"
    );
    (clustered, clusters)
}
