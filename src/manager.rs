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

//! The action manager.
//!
//! [`Manager`] owns the API client and the frozen configuration; the action
//! modules implement their flows as methods on it. This module holds the
//! pieces every action shares: resource queries over manifest-derived
//! records and the versioning-cache ConfigMap read/write path.

use std::collections::BTreeMap;
use std::sync::Arc;

use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tracing::info;

use crate::cache::{self, CmData, STREAMFILE_KEY};
use crate::client::KubeClientManager;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::labels;
use crate::manifest::Resource;
use crate::nodes::NodeRef;

/// Owns the cluster client and configuration for the duration of an action.
pub struct Manager {
    pub(crate) kcm: KubeClientManager,
    pub(crate) config: Arc<Config>,
}

impl Manager {
    /// Creates a manager around a ready client.
    pub fn new(kcm: KubeClientManager, config: Arc<Config>) -> Self {
        Self { kcm, config }
    }

    /// Name of a project's versioning cache ConfigMap.
    pub fn cache_name(&self, project: &str) -> String {
        format!("{}-{}", self.config.cm_name, project.to_lowercase())
    }

    /// The per-project version label: `(key, key=version)`.
    pub fn version_label(&self, project: &str, version: &str) -> (String, String) {
        labels::make_version_label(&self.config.label_prefix, project, version)
    }

    /// Ownership labels stamped on cache ConfigMaps.
    fn cache_labels(&self) -> Result<BTreeMap<String, String>> {
        let (key, value) = labels::split_label(&self.config.cm_owner_tag)?;
        Ok([(key, value)].into_iter().collect())
    }

    /// Reads and decodes a project's versioning cache.
    ///
    /// NotFound propagates; on a first rollout the caller treats it as an
    /// empty cache.
    pub async fn retrieve_cache(&self, project: &str) -> Result<CmData> {
        let name = self.cache_name(project);
        let cm = self.kcm.get_config_map(&self.config.default_namespace, &name).await?;
        cache::extract_config_map_data(&cm)
    }

    /// Creates the versioning cache ConfigMap on a first rollout.
    pub async fn create_cache(
        &self,
        project: &str,
        data: BTreeMap<String, String>,
        dry_run: bool,
    ) -> Result<()> {
        let name = self.cache_name(project);
        info!(project = %project, cache = %name, "creating versioning cache");
        let cm = ConfigMap {
            metadata: ObjectMeta {
                name: Some(name),
                namespace: Some(self.config.default_namespace.clone()),
                labels: Some(self.cache_labels()?),
                ..Default::default()
            },
            data: Some(data),
            ..Default::default()
        };
        self.kcm.create_config_map(&self.config.default_namespace, &cm, dry_run).await
    }

    /// Replaces the Streamfile blob of an existing versioning cache.
    pub async fn patch_cache(
        &self,
        project: &str,
        data: &BTreeMap<String, String>,
        dry_run: bool,
    ) -> Result<()> {
        let name = self.cache_name(project);
        info!(project = %project, cache = %name, "patching versioning cache");
        let blob = data
            .get(STREAMFILE_KEY)
            .ok_or_else(|| Error::InvalidOptions("cache data is missing the Streamfile key".to_string()))?;
        let patch = labels::cm_data_patch(STREAMFILE_KEY, blob)?;
        self.kcm
            .patch_config_map(&self.config.default_namespace, &name, patch, dry_run)
            .await
    }

    /// Nodes carrying a project's version label.
    pub async fn get_marked_nodes(&self, project: &str, version: &str) -> Result<Vec<NodeRef>> {
        let (_, selector) = self.version_label(project, version);
        self.kcm.get_nodes(&selector).await
    }

    /// Splits the target resources into those present on the cluster and
    /// those missing from it. Any error other than NotFound aborts.
    pub async fn split_missing_resources(
        &self,
        resources: &[Resource],
    ) -> Result<(Vec<Resource>, Vec<Resource>)> {
        let mut present = Vec::new();
        let mut missing = Vec::new();
        for resource in resources {
            match self.kcm.get_resource(resource).await {
                Ok(_) => present.push(resource.clone()),
                Err(err) if err.is_not_found() => missing.push(resource.clone()),
                Err(err) => return Err(err),
            }
        }
        Ok((present, missing))
    }

    /// Deletes every target resource. Absence is tolerated.
    pub async fn delete_resources(&self, resources: &[Resource], dry_run: bool) -> Result<()> {
        for resource in resources {
            self.kcm.delete_resource(resource, dry_run).await?;
        }
        info!("Resources deletion is now complete.");
        Ok(())
    }
}
