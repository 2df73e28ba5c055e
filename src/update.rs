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

//! Update: move the fleet from the current version to a different one.

use tracing::info;

use crate::backup;
use crate::batch::{define_batch, validate_batch_size};
use crate::cache;
use crate::error::{Error, Result};
use crate::labels;
use crate::manager::Manager;
use crate::manifest::Resource;
use crate::options::RolloutOptions;
use crate::reconcile;
use crate::rollout::apply_namespace;

impl Manager {
    /// Entry point of the update action.
    ///
    /// Updates require a clean starting point: no previous version may still
    /// hold nodes, and the current version must cover the whole target
    /// fleet.
    pub async fn update_rollout(&self, opts: &RolloutOptions) -> Result<()> {
        let project = &opts.project.project;
        let desired = &opts.project.desired_version;
        let cmdata = self.retrieve_cache(project).await?;
        let current = self.get_current_version(project, &cmdata).await?;
        if current == *desired {
            return Err(Error::VersionUnchanged { current, desired: desired.clone() });
        }
        reconcile::check_previous_versions(&cmdata)?;
        self.check_current_version(&cmdata, &opts.target_label).await?;

        // A node is ready for an update once it was deployed on and carries
        // the control label.
        let update_targets = self.kcm.get_nodes(&opts.control_label).await?;
        if update_targets.is_empty() {
            return Err(Error::NoUpdatableNodes);
        }
        let (batch, size) = define_batch(&update_targets, opts.increment);
        validate_batch_size(size)?;

        let mut project_opts = opts.project.clone();
        project_opts.current_version = current;
        info!("Backing up current version before updating...");
        backup::backup_resources(
            &self.config,
            &opts.resources,
            &opts.cluster_id,
            &project_opts,
            opts.ignore_resources,
        )
        .await?;

        self.remove_last_applied_annotation(&opts.resources, opts.dry_run).await?;
        if !opts.ignore_resources {
            backup::deploy_resources(&opts.manifest_path, &apply_namespace(opts), opts.dry_run)
                .await?;
        }

        self.incremental_node_patch(&batch, &opts.control_label, opts.dry_run, false).await?;
        self.apply_version_patch(&batch, &project_opts, opts.dry_run).await?;

        let data = cache::compose_config_map_data(opts.action, project, desired, &batch, &cmdata)?;
        self.patch_cache(project, &data, opts.dry_run).await
    }

    /// Strips kubectl's last-applied-configuration annotation so the next
    /// apply reflects only the spec Rooster ships.
    pub(crate) async fn remove_last_applied_annotation(
        &self,
        resources: &[Resource],
        dry_run: bool,
    ) -> Result<()> {
        for resource in resources {
            info!(kind = %resource.kind, name = %resource.name, "removing last-applied-configuration");
            let patch = labels::last_applied_removal_patch()?;
            self.kcm.patch_resource(resource, patch, dry_run).await?;
        }
        Ok(())
    }
}
