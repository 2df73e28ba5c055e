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

//! Cache-versus-cluster reconciliation checks.
//!
//! The cache claims a node repartition; the cluster's version labels are the
//! ground truth. Any disagreement aborts before mutation.

use tracing::info;

use crate::cache::{CmData, VersionEntry};
use crate::error::{Error, Result};
use crate::manager::Manager;
use crate::nodes::node_names;

/// Returns the single current entry of a cache, if any.
///
/// More than one current entry violates the cache's core invariant and is
/// fatal.
pub fn single_current_entry(data: &CmData) -> Result<Option<&VersionEntry>> {
    let current: Vec<&VersionEntry> = data.data.info.iter().filter(|e| e.is_current()).collect();
    match current.len() {
        0 => Ok(None),
        1 => Ok(Some(current[0])),
        _ => Err(Error::MultipleCurrentVersions),
    }
}

/// Rejects a cache recording any non-current version that still holds
/// nodes: a previous action never finished.
pub fn check_previous_versions(data: &CmData) -> Result<()> {
    for entry in &data.data.info {
        if !entry.is_current() && entry.active_nodes().next().is_some() {
            return Err(Error::PreviousVersionActive(entry.version.clone()));
        }
    }
    Ok(())
}

impl Manager {
    /// Resolves the project's current version and verifies the cache against
    /// the cluster's version labels.
    ///
    /// An empty cache yields an empty version. A populated cache whose
    /// current entry disagrees with the nodes actually carrying the version
    /// label is cache drift, and fatal.
    pub async fn get_current_version(&self, project: &str, data: &CmData) -> Result<String> {
        let Some(entry) = single_current_entry(data)? else {
            return Ok(String::new());
        };
        let mut cache_nodes: Vec<String> = entry.active_nodes().cloned().collect();
        cache_nodes.sort();
        let marked = self.get_marked_nodes(project, &entry.version).await?;
        let mut label_nodes = node_names(&marked);
        label_nodes.sort();
        if cache_nodes != label_nodes {
            return Err(Error::CacheDrift);
        }
        info!(project = %project, version = %entry.version, "current version resolved");
        Ok(entry.version.clone())
    }

    /// Rejects an update while the current version has not reached the whole
    /// target fleet: every node carrying the target label must be listed
    /// under the current entry.
    pub async fn check_current_version(&self, data: &CmData, target_label: &str) -> Result<()> {
        let mut current_nodes: Vec<String> = single_current_entry(data)?
            .map(|entry| entry.active_nodes().cloned().collect())
            .unwrap_or_default();
        current_nodes.sort();
        let targets = self.kcm.get_nodes(target_label).await?;
        let mut target_nodes = node_names(&targets);
        target_nodes.sort();
        if current_nodes != target_nodes {
            return Err(Error::IncompleteRollout);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ProjectInfo;

    fn entry(version: &str, current: &str, nodes: &[&str]) -> VersionEntry {
        VersionEntry {
            version: version.to_string(),
            current: current.to_string(),
            nodes: nodes.iter().map(|n| n.to_string()).collect(),
        }
    }

    fn data(entries: Vec<VersionEntry>) -> CmData {
        CmData { data: ProjectInfo { project: "demo".to_string(), info: entries } }
    }

    #[test]
    fn test_single_current_entry() {
        let cache = data(vec![entry("v1", "false", &[]), entry("v2", "true", &["n1"])]);
        let current = single_current_entry(&cache).unwrap().unwrap();
        assert_eq!(current.version, "v2");
    }

    #[test]
    fn test_no_current_entry_is_legal() {
        let cache = data(vec![entry("v1", "false", &[])]);
        assert!(single_current_entry(&cache).unwrap().is_none());
    }

    #[test]
    fn test_multiple_current_entries_are_fatal() {
        let cache = data(vec![entry("v1", "true", &["n1"]), entry("v2", "true", &["n2"])]);
        assert!(matches!(single_current_entry(&cache), Err(Error::MultipleCurrentVersions)));
    }

    #[test]
    fn test_previous_version_with_nodes_blocks() {
        let cache = data(vec![entry("v1", "false", &["n3"]), entry("v2", "true", &["n1"])]);
        let err = check_previous_versions(&cache).unwrap_err();
        assert!(matches!(err, Error::PreviousVersionActive(version) if version == "v1"));
    }

    #[test]
    fn test_previous_version_sentinel_is_inactive() {
        let cache = data(vec![entry("v1", "false", &[""]), entry("v2", "true", &["n1"])]);
        assert!(check_previous_versions(&cache).is_ok());
    }
}
