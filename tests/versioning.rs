//! Scenario tests for the versioning cache and the batch machinery.
//!
//! These drive the public library API through the rollout scenarios the
//! tool is built around: first rollouts, same-version increments,
//! cross-version updates, rollbacks, and scale-downs.

use std::collections::{BTreeMap, HashSet};

use rooster::batch::{define_batch, match_batch, validate_batch_size};
use rooster::cache::{
    compose_config_map_data, extract_config_map_data, CmData, ProjectInfo, VersionEntry,
    STREAMFILE_KEY,
};
use rooster::nodes::{extract_uncommon, from_names, node_names};
use rooster::reconcile::{check_previous_versions, single_current_entry};
use rooster::{Action, Error};

fn cache(project: &str, entries: &[(&str, &str, &[&str])]) -> CmData {
    CmData {
        data: ProjectInfo {
            project: project.to_string(),
            info: entries
                .iter()
                .map(|(version, current, nodes)| VersionEntry {
                    version: version.to_string(),
                    current: current.to_string(),
                    nodes: nodes.iter().map(|n| n.to_string()).collect(),
                })
                .collect(),
        },
    }
}

fn decode(data: &BTreeMap<String, String>) -> CmData {
    serde_yaml::from_str(data.get(STREAMFILE_KEY).unwrap()).unwrap()
}

fn entry<'a>(data: &'a CmData, version: &str) -> &'a VersionEntry {
    data.data.info.iter().find(|e| e.version == version).unwrap()
}

/// No node may be listed under two versions, and at most one entry may be
/// current.
fn assert_invariants(data: &CmData) {
    let current = data.data.info.iter().filter(|e| e.is_current()).count();
    assert!(current <= 1, "{current} current entries");
    let mut seen: HashSet<&str> = HashSet::new();
    for info in &data.data.info {
        for node in info.active_nodes() {
            assert!(seen.insert(node.as_str()), "{node} listed under two versions");
        }
    }
}

// First rollout, canary 50% on two target nodes: the batch is one node, the
// completion pass covers the other, and the cache is created with both
// under the new version.
#[test]
fn first_canary_rollout_records_both_nodes() {
    let targets = from_names(["n1", "n2"]);
    let (batch, size) = define_batch(&targets, 50);
    assert_eq!(size, 1);
    assert_eq!(node_names(&batch), vec!["n1"]);
    match_batch(&targets, &batch).unwrap();

    // After completion, both nodes carry the version label.
    let assigned = from_names(["n1", "n2"]);
    let data =
        compose_config_map_data(Action::Rollout, "demo", "v1", &assigned, &CmData::default())
            .unwrap();
    let decoded = decode(&data);
    assert_invariants(&decoded);
    assert_eq!(decoded.data.info.len(), 1);
    assert!(decoded.data.info[0].is_current());
    assert_eq!(decoded.data.info[0].nodes, vec!["n1", "n2"]);
}

// Same-version linear rollout at 50% over four nodes, two already done:
// the fresh targets are the other two, the batch is one of them, and the
// cache entry grows to three nodes.
#[test]
fn linear_increment_extends_the_current_entry() {
    let previous = cache("demo", &[("v1", "true", &["n1", "n2"])]);
    let targets = from_names(["n1", "n2", "n3", "n4"]);
    let done = from_names(["n1", "n2"]);

    let fresh = extract_uncommon(&targets, &done);
    assert_eq!(node_names(&fresh), vec!["n3", "n4"]);

    let (batch, size) = define_batch(&fresh, 50);
    validate_batch_size(size).unwrap();
    assert_eq!(node_names(&batch), vec!["n3"]);
    match_batch(&targets, &batch).unwrap();

    let assigned = from_names(["n1", "n2", "n3"]);
    let data = compose_config_map_data(Action::Rollout, "demo", "v1", &assigned, &previous).unwrap();
    let decoded = decode(&data);
    assert_invariants(&decoded);
    assert_eq!(decoded.data.info.len(), 1);
    assert!(decoded.data.info[0].is_current());
    assert_eq!(decoded.data.info[0].nodes, vec!["n1", "n2", "n3"]);
}

// Update v1 -> v2 at 50%: the updated batch moves to v2 and v1 keeps the
// remainder, demoted from current.
#[test]
fn update_moves_batch_to_new_version() {
    let previous = cache("demo", &[("v1", "true", &["n1", "n2"])]);
    check_previous_versions(&previous).unwrap();

    let update_targets = from_names(["n1", "n2"]);
    let (batch, size) = define_batch(&update_targets, 50);
    validate_batch_size(size).unwrap();
    assert_eq!(node_names(&batch), vec!["n1"]);

    let data = compose_config_map_data(Action::Update, "demo", "v2", &batch, &previous).unwrap();
    let decoded = decode(&data);
    assert_invariants(&decoded);
    assert_eq!(entry(&decoded, "v1").nodes, vec!["n2"]);
    assert!(!entry(&decoded, "v1").is_current());
    assert_eq!(entry(&decoded, "v2").nodes, vec!["n1"]);
    assert!(entry(&decoded, "v2").is_current());
}

// Rollback to v1 with v2 current: v1 reclaims the rolled-back nodes plus
// the node it still recorded, and v2 empties out.
#[test]
fn rollback_restores_previous_version() {
    let previous = cache("demo", &[("v1", "false", &["n3"]), ("v2", "true", &["n1", "n2"])]);
    // The rollback patches the nodes currently on v2, then appends the
    // nodes the cache still lists under v1.
    let final_nodes = from_names(["n1", "n2", "n3"]);
    let data =
        compose_config_map_data(Action::Rollback, "demo", "v1", &final_nodes, &previous).unwrap();
    let decoded = decode(&data);
    assert_invariants(&decoded);
    assert_eq!(entry(&decoded, "v1").nodes, vec!["n1", "n2", "n3"]);
    assert!(entry(&decoded, "v1").is_current());
    assert!(entry(&decoded, "v2").nodes.is_empty());
    assert!(!entry(&decoded, "v2").is_current());
}

// Clean rollback: every control-labeled node is stripped and the current
// entry's node list empties.
#[test]
fn clean_rollback_empties_the_current_entry() {
    let previous = cache("demo", &[("v1", "true", &["n1", "n2"])]);
    let stripped = from_names(["n1", "n2"]);
    let data =
        compose_config_map_data(Action::Rollback, "demo", "", &stripped, &previous).unwrap();
    let decoded = decode(&data);
    assert_invariants(&decoded);
    assert_eq!(decoded.data.info.len(), 1);
    assert!(entry(&decoded, "v1").nodes.is_empty());
    assert!(!entry(&decoded, "v1").is_current());
}

// A scale-down that leaves survivors keeps the version current; draining it
// demotes it.
#[test]
fn scale_down_demotes_only_when_empty() {
    let previous = cache("demo", &[("v1", "true", &["n1", "n2", "n3"])]);
    let data = compose_config_map_data(Action::ScaleDown, "demo", "", &from_names(["n3"]), &previous)
        .unwrap();
    let decoded = decode(&data);
    assert_invariants(&decoded);
    assert!(entry(&decoded, "v1").is_current());
    assert_eq!(entry(&decoded, "v1").nodes, vec!["n1", "n2"]);

    let rest = compose_config_map_data(
        Action::ScaleDown,
        "demo",
        "",
        &from_names(["n1", "n2"]),
        &decode(&data),
    )
    .unwrap();
    let drained = decode(&rest);
    assert!(!entry(&drained, "v1").is_current());
    assert!(entry(&drained, "v1").nodes.is_empty());
}

// Scale-down with an explicit version: the decrement-sized batch leaves,
// and the cache keeps the surviving nodes under the version, still
// current — the recorded node set stays equal to the labeled fleet.
#[test]
fn explicit_version_scale_down_keeps_survivors_in_cache() {
    let previous = cache("demo", &[("v1", "true", &["n1", "n2", "n3", "n4"])]);
    let control_nodes = from_names(["n1", "n2", "n3", "n4"]);
    let (departing, size) = define_batch(&control_nodes, 50);
    validate_batch_size(size).unwrap();
    assert_eq!(node_names(&departing), vec!["n1", "n2"]);

    let data =
        compose_config_map_data(Action::ScaleDown, "demo", "v1", &departing, &previous).unwrap();
    let decoded = decode(&data);
    assert_invariants(&decoded);
    assert_eq!(entry(&decoded, "v1").nodes, vec!["n3", "n4"]);
    assert!(entry(&decoded, "v1").is_current());
}

// A cache claiming two current versions is rejected before any mutation.
#[test]
fn two_current_versions_are_fatal() {
    let corrupted = cache("demo", &[("v1", "true", &["n1"]), ("v2", "true", &["n2"])]);
    assert!(matches!(single_current_entry(&corrupted), Err(Error::MultipleCurrentVersions)));
}

// An unfinished previous version blocks updates.
#[test]
fn active_previous_version_blocks() {
    let previous = cache("demo", &[("v1", "false", &["n3"]), ("v2", "true", &["n1"])]);
    assert!(matches!(
        check_previous_versions(&previous),
        Err(Error::PreviousVersionActive(v)) if v == "v1"
    ));
}

// Extraction and composition round-trip through the ConfigMap shape.
#[test]
fn cache_round_trips_through_config_map() {
    let original = cache("demo", &[("v1", "false", &[]), ("v2", "true", &["n1", "n2"])]);
    let blob = serde_yaml::to_string(&original).unwrap();
    let mut cm = k8s_openapi::api::core::v1::ConfigMap::default();
    cm.data = Some([(STREAMFILE_KEY.to_string(), blob)].into_iter().collect());
    assert_eq!(extract_config_map_data(&cm).unwrap(), original);
}

// Composition keeps the invariants over a long action sequence.
#[test]
fn invariants_hold_across_action_sequences() {
    let mut data = CmData::default();
    let steps: &[(Action, &str, &[&str])] = &[
        (Action::Rollout, "v1", &["n1"]),
        (Action::Rollout, "v1", &["n1", "n2", "n3"]),
        (Action::Update, "v2", &["n1", "n2"]),
        (Action::Rollback, "v1", &["n1", "n2", "n3"]),
        (Action::ScaleDown, "", &["n3"]),
    ];
    for (action, version, nodes) in steps {
        let composed =
            compose_config_map_data(*action, "demo", version, &from_names(nodes.iter().copied()), &data)
                .unwrap();
        data = decode(&composed);
        assert_invariants(&data);
    }
    assert_eq!(entry(&data, "v1").nodes, vec!["n1", "n2"]);
    assert!(entry(&data, "v1").is_current());
}
