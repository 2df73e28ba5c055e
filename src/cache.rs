// Copyright 2025 The Rooster Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The versioning cache codec.
//!
//! A project's rollout state is persisted in a ConfigMap under the data key
//! `Streamfile`, as the YAML form of [`CmData`]:
//!
//! ```yaml
//! data:
//!   project: demo
//!   info:
//!   - version: v1
//!     current: 'true'
//!     nodes: [worker-0, worker-1]
//! ```
//!
//! Invariants maintained by composition: at most one entry is current, and a
//! node name appears under at most one version at a time.

use std::collections::BTreeMap;
use std::collections::HashSet;

use k8s_openapi::api::core::v1::ConfigMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::nodes::{node_names, NodeRef};
use crate::options::Action;

/// Data key under which the cache body is stored.
pub const STREAMFILE_KEY: &str = "Streamfile";

/// Top-level shape of the Streamfile blob.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CmData {
    /// The single project record.
    #[serde(default)]
    pub data: ProjectInfo,
}

/// A project and its per-version node repartition.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Project name.
    #[serde(default)]
    pub project: String,

    /// One entry per version ever rolled out.
    #[serde(default)]
    pub info: Vec<VersionEntry>,
}

/// One version's record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    /// Version name.
    #[serde(default)]
    pub version: String,

    /// `"true"` when this version is the current one.
    #[serde(default)]
    pub current: String,

    /// Names of the nodes carrying this version. Non-current entries hold an
    /// empty list, or the lone empty-string sentinel.
    #[serde(default)]
    pub nodes: Vec<String>,
}

impl VersionEntry {
    /// True when this entry is flagged current.
    pub fn is_current(&self) -> bool {
        self.current == "true"
    }

    /// Node names, with the empty-string sentinel filtered out.
    pub fn active_nodes(&self) -> impl Iterator<Item = &String> {
        self.nodes.iter().filter(|n| !n.is_empty())
    }
}

impl CmData {
    /// True when no project data has ever been recorded.
    pub fn is_empty(&self) -> bool {
        self.data == ProjectInfo::default()
    }
}

/// Decodes the Streamfile blob out of a cache ConfigMap.
///
/// A ConfigMap without data, or without the Streamfile key, is a legal empty
/// cache; ConfigMap absence itself is signalled at the query layer.
pub fn extract_config_map_data(cm: &ConfigMap) -> Result<CmData> {
    let Some(data) = &cm.data else {
        return Ok(CmData::default());
    };
    let Some(streamfile) = data.get(STREAMFILE_KEY) else {
        return Ok(CmData::default());
    };
    Ok(serde_yaml::from_str(streamfile)?)
}

/// Composes the ConfigMap data for a finished action.
///
/// With no previous data this is a fresh record of the single rolled-out
/// version; otherwise the previous record is rewritten around the action's
/// node set.
pub fn compose_config_map_data(
    action: Action,
    project: &str,
    version: &str,
    nodes: &[NodeRef],
    previous: &CmData,
) -> Result<BTreeMap<String, String>> {
    let names = node_names(nodes);
    let info = if previous.is_empty() {
        ProjectInfo {
            project: project.to_string(),
            info: vec![VersionEntry {
                version: version.to_string(),
                current: "true".to_string(),
                nodes: names,
            }],
        }
    } else {
        rewrite_cm_data(action, project, version, &names, previous)
    };
    let blob = serde_yaml::to_string(&CmData { data: info })?;
    let mut data = BTreeMap::new();
    data.insert(STREAMFILE_KEY.to_string(), blob);
    Ok(data)
}

/// Rewrites the previous record around the action's node set.
///
/// An entry matching the target version has its node list replaced — the
/// caller supplies the full node set there — except on scale-down, where
/// the supplied nodes are the ones leaving the scope and the entry keeps
/// the survivors. Every other entry loses the nodes now claimed by the
/// target version, so a node is listed under one version at most.
fn rewrite_cm_data(
    action: Action,
    project: &str,
    version: &str,
    new_nodes: &[String],
    previous: &CmData,
) -> ProjectInfo {
    let mut candidates = Vec::new();
    for entry in &previous.data.info {
        if entry.version == version {
            if action == Action::ScaleDown {
                candidates.push(distribute_nodes_through_versions(new_nodes, entry));
            } else {
                candidates.push(VersionEntry {
                    version: entry.version.clone(),
                    current: entry.current.clone(),
                    nodes: new_nodes.to_vec(),
                });
            }
        } else {
            candidates.push(distribute_nodes_through_versions(new_nodes, entry));
        }
    }
    // The target version's own entry. Deduplication keeps the first
    // occurrence, so an existing entry rewritten above wins over this one.
    candidates.push(VersionEntry {
        version: version.to_string(),
        current: "true".to_string(),
        nodes: new_nodes.to_vec(),
    });
    make_data_from_project_details(candidates, action, project, version)
}

/// Removes the nodes claimed by the incoming version from another version's
/// entry. A node can be listed for one version at a time.
fn distribute_nodes_through_versions(next_nodes: &[String], entry: &VersionEntry) -> VersionEntry {
    let claimed: HashSet<&str> = next_nodes.iter().map(String::as_str).collect();
    let survivors =
        entry.nodes.iter().filter(|n| !claimed.contains(n.as_str())).cloned().collect();
    VersionEntry { version: entry.version.clone(), current: entry.current.clone(), nodes: survivors }
}

/// Whether a version is the current one, as the stored string flag.
fn set_status(version: &str, target_version: &str) -> String {
    (version == target_version).to_string()
}

/// Assembles the final entry list from the rewrite candidates.
///
/// Versions are emitted once each (set-membership check; nameless candidates
/// are dropped). Scaling a version down does not demote it while it still
/// holds nodes; emptying it does.
fn make_data_from_project_details(
    candidates: Vec<VersionEntry>,
    action: Action,
    project: &str,
    target_version: &str,
) -> ProjectInfo {
    let mut seen: HashSet<String> = HashSet::new();
    let mut info = Vec::new();
    for candidate in candidates {
        if candidate.version.is_empty() || !seen.insert(candidate.version.clone()) {
            continue;
        }
        let current = if action == Action::ScaleDown {
            if candidate.nodes.is_empty() {
                "false".to_string()
            } else {
                candidate.current
            }
        } else {
            set_status(&candidate.version, target_version)
        };
        info.push(VersionEntry { version: candidate.version, current, nodes: candidate.nodes });
    }
    ProjectInfo { project: project.to_string(), info }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::from_names;

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

    #[test]
    fn test_first_rollout_creates_single_current_entry() {
        let nodes = from_names(["n1", "n2"]);
        let data =
            compose_config_map_data(Action::Rollout, "demo", "v1", &nodes, &CmData::default())
                .unwrap();
        let decoded = decode(&data);
        assert_eq!(decoded.data.project, "demo");
        assert_eq!(decoded.data.info.len(), 1);
        assert_eq!(decoded.data.info[0].version, "v1");
        assert!(decoded.data.info[0].is_current());
        assert_eq!(decoded.data.info[0].nodes, vec!["n1", "n2"]);
    }

    #[test]
    fn test_same_version_increment_replaces_nodes() {
        let previous = cache("demo", &[("v1", "true", &["n1", "n2"])]);
        let nodes = from_names(["n1", "n2", "n3"]);
        let data =
            compose_config_map_data(Action::Rollout, "demo", "v1", &nodes, &previous).unwrap();
        let decoded = decode(&data);
        assert_eq!(decoded.data.info.len(), 1);
        assert!(decoded.data.info[0].is_current());
        assert_eq!(decoded.data.info[0].nodes, vec!["n1", "n2", "n3"]);
    }

    #[test]
    fn test_update_redistributes_nodes() {
        let previous = cache("demo", &[("v1", "true", &["n1", "n2"])]);
        let nodes = from_names(["n1"]);
        let data =
            compose_config_map_data(Action::Update, "demo", "v2", &nodes, &previous).unwrap();
        let decoded = decode(&data);
        assert_eq!(decoded.data.info.len(), 2);

        let v1 = decoded.data.info.iter().find(|e| e.version == "v1").unwrap();
        assert!(!v1.is_current());
        assert_eq!(v1.nodes, vec!["n2"]);

        let v2 = decoded.data.info.iter().find(|e| e.version == "v2").unwrap();
        assert!(v2.is_current());
        assert_eq!(v2.nodes, vec!["n1"]);
    }

    #[test]
    fn test_rollback_claims_nodes_and_flips_current() {
        let previous = cache("demo", &[("v1", "false", &["n3"]), ("v2", "true", &["n1", "n2"])]);
        let nodes = from_names(["n1", "n2", "n3"]);
        let data =
            compose_config_map_data(Action::Rollback, "demo", "v1", &nodes, &previous).unwrap();
        let decoded = decode(&data);

        let v1 = decoded.data.info.iter().find(|e| e.version == "v1").unwrap();
        assert!(v1.is_current());
        assert_eq!(v1.nodes, vec!["n1", "n2", "n3"]);

        let v2 = decoded.data.info.iter().find(|e| e.version == "v2").unwrap();
        assert!(!v2.is_current());
        assert!(v2.nodes.is_empty());
    }

    #[test]
    fn test_scale_down_preserves_current_while_nodes_remain() {
        let previous = cache("demo", &[("v1", "true", &["n1", "n2", "n3"])]);
        // n3 was unlabeled; the survivors keep the version current.
        let stripped = from_names(["n3"]);
        let data =
            compose_config_map_data(Action::ScaleDown, "demo", "", &stripped, &previous).unwrap();
        let decoded = decode(&data);
        assert_eq!(decoded.data.info.len(), 1);
        assert!(decoded.data.info[0].is_current());
        assert_eq!(decoded.data.info[0].nodes, vec!["n1", "n2"]);
    }

    #[test]
    fn test_scale_down_with_explicit_version_keeps_survivors() {
        let previous = cache("demo", &[("v1", "true", &["n1", "n2", "n3", "n4"])]);
        // The departing batch is n1 and n2; the entry must keep the rest.
        let stripped = from_names(["n1", "n2"]);
        let data =
            compose_config_map_data(Action::ScaleDown, "demo", "v1", &stripped, &previous)
                .unwrap();
        let decoded = decode(&data);
        assert_eq!(decoded.data.info.len(), 1);
        assert!(decoded.data.info[0].is_current());
        assert_eq!(decoded.data.info[0].nodes, vec!["n3", "n4"]);
    }

    #[test]
    fn test_scale_down_with_explicit_version_demotes_when_drained() {
        let previous = cache("demo", &[("v1", "true", &["n1", "n2"])]);
        let stripped = from_names(["n1", "n2"]);
        let data =
            compose_config_map_data(Action::ScaleDown, "demo", "v1", &stripped, &previous)
                .unwrap();
        let decoded = decode(&data);
        assert_eq!(decoded.data.info.len(), 1);
        assert!(!decoded.data.info[0].is_current());
        assert!(decoded.data.info[0].nodes.is_empty());
    }

    #[test]
    fn test_scale_down_to_zero_demotes() {
        let previous = cache("demo", &[("v1", "true", &["n1"])]);
        let stripped = from_names(["n1"]);
        let data =
            compose_config_map_data(Action::ScaleDown, "demo", "", &stripped, &previous).unwrap();
        let decoded = decode(&data);
        assert!(!decoded.data.info[0].is_current());
        assert!(decoded.data.info[0].nodes.is_empty());
    }

    #[test]
    fn test_clean_rollback_clears_current_entry() {
        let previous = cache("demo", &[("v1", "true", &["n1", "n2"])]);
        let stripped = from_names(["n1", "n2"]);
        let data =
            compose_config_map_data(Action::Rollback, "demo", "", &stripped, &previous).unwrap();
        let decoded = decode(&data);
        assert_eq!(decoded.data.info.len(), 1);
        assert!(!decoded.data.info[0].is_current());
        assert!(decoded.data.info[0].nodes.is_empty());
    }

    #[test]
    fn test_at_most_one_current_entry() {
        let previous = cache(
            "demo",
            &[("v1", "false", &["n4"]), ("v2", "true", &["n1", "n2"]), ("v3", "false", &[])],
        );
        let data =
            compose_config_map_data(Action::Update, "demo", "v3", &from_names(["n1"]), &previous)
                .unwrap();
        let decoded = decode(&data);
        let current: Vec<_> = decoded.data.info.iter().filter(|e| e.is_current()).collect();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].version, "v3");
    }

    #[test]
    fn test_node_listed_under_one_version_only() {
        let previous = cache("demo", &[("v1", "false", &["n1", "n3"]), ("v2", "true", &["n2"])]);
        let data =
            compose_config_map_data(Action::Update, "demo", "v4", &from_names(["n1", "n2"]), &previous)
                .unwrap();
        let decoded = decode(&data);
        let mut seen: HashSet<&str> = HashSet::new();
        for entry in &decoded.data.info {
            for node in entry.active_nodes() {
                assert!(seen.insert(node.as_str()), "{node} listed twice");
            }
        }
    }

    #[test]
    fn test_prefix_version_names_are_not_deduplicated() {
        // "v1" is a prefix of "v1.2"; both entries must survive a rewrite.
        let previous = cache("demo", &[("v1.2", "true", &["n1"]), ("v1", "false", &["n2"])]);
        let data =
            compose_config_map_data(Action::Rollout, "demo", "v1.2", &from_names(["n1"]), &previous)
                .unwrap();
        let decoded = decode(&data);
        let versions: Vec<&str> =
            decoded.data.info.iter().map(|e| e.version.as_str()).collect();
        assert_eq!(versions, vec!["v1.2", "v1"]);
    }

    #[test]
    fn test_round_trip_through_config_map() {
        let previous = cache("demo", &[("v1", "false", &["n3"]), ("v2", "true", &["n1", "n2"])]);
        let blob = serde_yaml::to_string(&previous).unwrap();
        let mut cm = ConfigMap::default();
        cm.data = Some([(STREAMFILE_KEY.to_string(), blob)].into_iter().collect());
        let extracted = extract_config_map_data(&cm).unwrap();
        assert_eq!(extracted, previous);
    }

    #[test]
    fn test_extract_tolerates_missing_data() {
        let cm = ConfigMap::default();
        assert!(extract_config_map_data(&cm).unwrap().is_empty());

        let mut cm = ConfigMap::default();
        cm.data = Some([("unrelated".to_string(), "x".to_string())].into_iter().collect());
        assert!(extract_config_map_data(&cm).unwrap().is_empty());
    }

    #[test]
    fn test_sentinel_nodes_count_as_inactive() {
        let entry = VersionEntry {
            version: "v1".to_string(),
            current: "false".to_string(),
            nodes: vec![String::new()],
        };
        assert_eq!(entry.active_nodes().count(), 0);
    }
}
