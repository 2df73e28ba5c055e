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

//! Kubernetes API access.
//!
//! Nodes and ConfigMaps go through typed APIs; everything named by a
//! manifest goes through the dynamic API with its group-version-resource
//! guessed from `apiVersion` + `kind` (lowercased, pluralized kind).

use k8s_openapi::api::core::v1::{ConfigMap, Node};
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::Client;
use tracing::debug;

use crate::error::Result;
use crate::manifest::Resource;
use crate::nodes::NodeRef;

fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}

/// Thin wrapper around the kube client with the query surface Rooster uses.
#[derive(Clone)]
pub struct KubeClientManager {
    client: Client,
}

impl KubeClientManager {
    /// Wraps an already-constructed client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Guesses the API resource for an arbitrary `apiVersion` + `kind`.
    pub fn guess_resource(api_version: &str, kind: &str) -> ApiResource {
        let (group, version) = match api_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", api_version),
        };
        ApiResource::from_gvk(&GroupVersionKind::gvk(group, version, kind))
    }

    fn dynamic_api(&self, api_version: &str, kind: &str, namespace: &str) -> Api<DynamicObject> {
        let ar = Self::guess_resource(api_version, kind);
        if namespace.is_empty() {
            Api::all_with(self.client.clone(), &ar)
        } else {
            Api::namespaced_with(self.client.clone(), namespace, &ar)
        }
    }

    /// Fetches one resource dynamically.
    pub async fn get_resource(&self, resource: &Resource) -> Result<DynamicObject> {
        debug!(kind = %resource.kind, name = %resource.name, namespace = %resource.namespace, "getting resource");
        let api = self.dynamic_api(&resource.api_version, &resource.kind, &resource.namespace);
        Ok(api.get(&resource.name).await?)
    }

    /// Deletes one resource dynamically. Absence is not an error.
    pub async fn delete_resource(&self, resource: &Resource, dry_run: bool) -> Result<()> {
        debug!(kind = %resource.kind, name = %resource.name, namespace = %resource.namespace, "deleting resource");
        let api = self.dynamic_api(&resource.api_version, &resource.kind, &resource.namespace);
        let params = DeleteParams { dry_run, ..Default::default() };
        match api.delete(&resource.name, &params).await {
            Ok(_) => Ok(()),
            Err(err) if is_not_found(&err) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Applies a JSON patch to one resource dynamically.
    pub async fn patch_resource(
        &self,
        resource: &Resource,
        patch: json_patch::Patch,
        dry_run: bool,
    ) -> Result<()> {
        let api = self.dynamic_api(&resource.api_version, &resource.kind, &resource.namespace);
        let params = PatchParams { dry_run, ..Default::default() };
        api.patch(&resource.name, &params, &Patch::Json::<()>(patch)).await?;
        Ok(())
    }

    /// Lists nodes by label selector, projected to [`NodeRef`].
    pub async fn get_nodes(&self, selector: &str) -> Result<Vec<NodeRef>> {
        let api: Api<Node> = Api::all(self.client.clone());
        let params = ListParams::default().labels(selector);
        let list = api.list(&params).await?;
        Ok(list.items.iter().map(NodeRef::from).collect())
    }

    /// Applies a JSON patch to one node.
    pub async fn patch_node(
        &self,
        name: &str,
        patch: json_patch::Patch,
        dry_run: bool,
    ) -> Result<()> {
        let api: Api<Node> = Api::all(self.client.clone());
        let params = PatchParams { dry_run, ..Default::default() };
        api.patch(name, &params, &Patch::Json::<()>(patch)).await?;
        Ok(())
    }

    /// Fetches a ConfigMap. NotFound propagates to the caller, which treats
    /// it as "no cache yet" on a first rollout.
    pub async fn get_config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get(name).await?)
    }

    /// Creates a ConfigMap.
    pub async fn create_config_map(
        &self,
        namespace: &str,
        cm: &ConfigMap,
        dry_run: bool,
    ) -> Result<()> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        let params = PostParams { dry_run, field_manager: None };
        api.create(&params, cm).await?;
        Ok(())
    }

    /// Applies a JSON patch to a ConfigMap.
    pub async fn patch_config_map(
        &self,
        namespace: &str,
        name: &str,
        patch: json_patch::Patch,
        dry_run: bool,
    ) -> Result<()> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        let params = PatchParams { dry_run, ..Default::default() };
        api.patch(name, &params, &Patch::Json::<()>(patch)).await?;
        Ok(())
    }
}
