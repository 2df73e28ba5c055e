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

//! Rollback.
//!
//! With a target version, resources are restored from that version's backup
//! and the fleet is re-labeled onto it. Without one, the fleet is cleaned:
//! control and version labels come off, and the resources go away unless
//! they are ignored.

use tracing::info;

use crate::backup;
use crate::batch::{define_batch, validate_batch_size};
use crate::cache;
use crate::error::{Error, Result};
use crate::labels;
use crate::manager::Manager;
use crate::manifest;
use crate::nodes::NodeRef;
use crate::options::{Action, RolloutOptions};

impl Manager {
    /// Entry point of the rollback action.
    pub async fn revert_deployment(&self, opts: &RolloutOptions) -> Result<()> {
        if !opts.project.desired_version.is_empty() {
            self.revert_to_version(opts).await?;
        } else {
            self.clean_resources(opts).await?;
            if !opts.ignore_resources {
                self.delete_resources(&opts.resources, opts.dry_run).await?;
            }
        }
        info!("Rollback complete.");
        Ok(())
    }

    /// Restores the project to a previously backed-up version.
    async fn revert_to_version(&self, opts: &RolloutOptions) -> Result<()> {
        let project = &opts.project.project;
        let desired = &opts.project.desired_version;
        let cmdata = self.retrieve_cache(project).await?;
        let current = self.get_current_version(project, &cmdata).await?;
        if current == *desired {
            return Err(Error::RollbackToCurrent);
        }
        // Rolling back is allowed while previous versions are still active,
        // or while the current one never finished rolling out.
        let mut project_opts = opts.project.clone();
        project_opts.current_version = current.clone();

        let backup_dir = backup::version_backup_path(&self.config, &opts.cluster_id, &project_opts)?;
        let nodes = self.get_marked_nodes(project, &current).await?;
        if nodes.is_empty() {
            return Err(Error::NoControlNodes);
        }

        let resources = manifest::read_manifest_files(&backup_dir, &opts.namespace).await?;
        let namespace = resources
            .first()
            .map(|r| r.namespace.clone())
            .unwrap_or_else(|| "default".to_string());

        info!("----Rolling back to the previous settings------");
        self.delete_resources(&resources, opts.dry_run).await?;
        backup::deploy_resources(
            &backup_dir.display().to_string(),
            &namespace,
            opts.dry_run,
        )
        .await?;

        // Restart pods slowly under the restored spec.
        self.incremental_node_patch(&nodes, &opts.control_label, opts.dry_run, false).await?;
        self.verify_resources_status(opts.ignore_resources, &resources).await?;
        self.apply_version_patch(&nodes, &project_opts, opts.dry_run).await?;

        // The restored version also reclaims any nodes the cache still
        // recorded under it.
        let mut final_nodes = nodes;
        for entry in &cmdata.data.info {
            if entry.version != *desired {
                continue;
            }
            for name in entry.active_nodes() {
                if !final_nodes.iter().any(|n| n.name == *name) {
                    final_nodes.push(NodeRef::named(name.clone()));
                }
            }
        }
        let data =
            cache::compose_config_map_data(opts.action, project, desired, &final_nodes, &cmdata)?;
        self.patch_cache(project, &data, opts.dry_run).await
    }

    /// Takes nodes out of the rollout scope: strips the control and version
    /// labels and updates the cache. Scale-down limits the node set to a
    /// decrement-sized batch; rollback takes every control-labeled node.
    pub(crate) async fn clean_resources(&self, opts: &RolloutOptions) -> Result<()> {
        let project = &opts.project.project;
        let desired = &opts.project.desired_version;
        let cmdata = self.retrieve_cache(project).await?;

        let mut nodes = self.kcm.get_nodes(&opts.control_label).await?;
        if nodes.is_empty() {
            return Err(Error::NoControlNodes);
        }
        if opts.action == Action::ScaleDown {
            let (batch, size) = define_batch(&nodes, opts.decrement);
            validate_batch_size(size)?;
            nodes = batch;
        }

        let (control_key, _) = labels::split_label(&opts.control_label)?;
        let (version_key, _) = self.version_label(project, desired);
        self.remove_node_labels(&nodes, &[control_key, version_key], opts.dry_run).await?;

        let data = cache::compose_config_map_data(opts.action, project, desired, &nodes, &cmdata)?;
        self.patch_cache(project, &data, opts.dry_run).await
    }
}
