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

//! The rollout engine.
//!
//! `proceed_to_deployment` validates labels and the cache, hands the batch
//! work to the selected strategy, then records the new node repartition in
//! the versioning cache.

use std::io::BufRead;

use tracing::{info, warn};

use crate::backup;
use crate::cache::{self, CmData};
use crate::error::{Error, Result};
use crate::manager::Manager;
use crate::manifest::Resource;
use crate::nodes::{extract_uncommon, NodeRef};
use crate::options::RolloutOptions;
use crate::reconcile;
use crate::shell;
use crate::strategy;

/// How `perform_rollout` deploys resources this round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DeployAction {
    /// Delete everything first, then re-apply the whole manifest path.
    ApplyAll,
    /// Create only the resources missing from the cluster, per manifest.
    ApplySelective,
    /// Everything is already in place.
    Nothing,
}

/// Asks the operator whether to proceed although the control label already
/// selects nodes. A negative answer or closed stdin aborts.
fn confirm_control_label_reuse() -> bool {
    println!("At least one node was found carrying the indicated canary label.");
    println!("Would you like to continue? (y/n)");
    let mut response = String::new();
    match std::io::stdin().lock().read_line(&mut response) {
        Ok(_) => response.trim().eq_ignore_ascii_case("y"),
        Err(_) => false,
    }
}

/// Namespace used for a whole-path apply: the flag namespace when given,
/// else the first resource's resolved namespace.
pub(crate) fn apply_namespace(opts: &RolloutOptions) -> String {
    if !opts.namespace.is_empty() {
        return opts.namespace.clone();
    }
    opts.resources
        .first()
        .map(|r| r.namespace.clone())
        .unwrap_or_else(|| "default".to_string())
}

impl Manager {
    /// Entry point of the rollout action.
    pub async fn proceed_to_deployment(&self, opts: &mut RolloutOptions) -> Result<()> {
        let project = opts.project.project.clone();
        let version = opts.project.desired_version.clone();

        // The fleet must exist; the control label should not select anyone
        // yet. If it does, the operator decides.
        info!("Verifying label {}", opts.target_label);
        let target_nodes = self.kcm.get_nodes(&opts.target_label).await?;
        if target_nodes.is_empty() {
            return Err(Error::NoTargetNodes);
        }
        info!("Verifying label {}", opts.control_label);
        let control_nodes = self.kcm.get_nodes(&opts.control_label).await?;
        if !control_nodes.is_empty() && !confirm_control_label_reuse() {
            return Err(Error::UserCancelled);
        }

        // Cache absence signals a first deployment.
        let (cmdata, cache_missing) = match self.retrieve_cache(&project).await {
            Ok(data) => (data, false),
            Err(err) if err.is_not_found() => (CmData::default(), true),
            Err(err) => return Err(err),
        };
        let current = match self.get_current_version(&project, &cmdata).await {
            Ok(current) => current,
            // A drifted cache can only be repaired by rolling the recorded
            // version out again; every other action stays blocked.
            Err(Error::CacheDrift) => {
                let recorded = reconcile::single_current_entry(&cmdata)?
                    .map(|entry| entry.version.clone())
                    .unwrap_or_default();
                if recorded != version {
                    return Err(Error::CacheDrift);
                }
                warn!(project = %project, version = %version, "cache drift detected, repairing via rollout");
                recorded
            }
            Err(err) => return Err(err),
        };
        if !current.is_empty() && current != version {
            return Err(Error::VersionMismatch { current, desired: version });
        }
        opts.project.current_version = current;

        strategy::for_strategy(opts.strategy).execute(self, opts, &target_nodes).await?;

        // The strategy marked the nodes it reached with the version label;
        // those nodes are the cache's new node set.
        let assigned = self.get_marked_nodes(&project, &version).await?;
        let data =
            cache::compose_config_map_data(opts.action, &project, &version, &assigned, &cmdata)?;
        if cache_missing {
            self.create_cache(&project, data, opts.dry_run).await
        } else {
            self.patch_cache(&project, &data, opts.dry_run).await
        }
    }

    /// Targets still to reach: target-labeled nodes minus those already
    /// carrying both the control label and the desired version label.
    pub(crate) async fn define_target_nodes(
        &self,
        opts: &RolloutOptions,
        target_nodes: &[NodeRef],
    ) -> Result<Vec<NodeRef>> {
        let control_nodes = self.kcm.get_nodes(&opts.control_label).await?;
        let (version_key, _) =
            self.version_label(&opts.project.project, &opts.project.desired_version);
        let done: Vec<NodeRef> = control_nodes
            .into_iter()
            .filter(|node| {
                node.labels.get(&version_key) == Some(&opts.project.desired_version)
            })
            .collect();
        let fresh = extract_uncommon(target_nodes, &done);
        if fresh.is_empty() {
            info!("All nodes already carry the control label");
            return Ok(target_nodes.to_vec());
        }
        Ok(fresh)
    }

    pub(crate) fn determine_deploy_action(
        &self,
        opts: &RolloutOptions,
        missing: &[Resource],
    ) -> DeployAction {
        if opts.update_if_exists {
            DeployAction::ApplyAll
        } else if !missing.is_empty() {
            DeployAction::ApplySelective
        } else {
            DeployAction::Nothing
        }
    }

    /// Rolls one batch out: deploy resources, patch the batch nodes, verify,
    /// test. Shared by both strategies.
    pub(crate) async fn perform_rollout(
        &self,
        opts: &RolloutOptions,
        batch: &[NodeRef],
    ) -> Result<()> {
        let (present, missing) = if opts.ignore_resources {
            (Vec::new(), Vec::new())
        } else {
            self.split_missing_resources(&opts.resources).await?
        };
        info!("Missing resources: {}", !missing.is_empty());
        let deploy_action = self.determine_deploy_action(opts, &missing);

        if !present.is_empty() {
            info!("Backing up resources...");
            backup::backup_resources(
                &self.config,
                &opts.resources,
                &opts.cluster_id,
                &opts.project,
                opts.ignore_resources,
            )
            .await?;
        }

        if !opts.ignore_resources {
            match deploy_action {
                DeployAction::ApplyAll => {
                    info!("ACTION: apply-all");
                    self.delete_resources(&opts.resources, opts.dry_run).await?;
                    backup::deploy_resources(
                        &opts.manifest_path,
                        &apply_namespace(opts),
                        opts.dry_run,
                    )
                    .await?;
                }
                DeployAction::ApplySelective => {
                    info!("ACTION: apply-selective");
                    for resource in &missing {
                        info!(
                            "Creating missing {} {}, in namespace: {}",
                            resource.kind, resource.name, resource.namespace
                        );
                        let manifest = resource
                            .manifest_path
                            .as_ref()
                            .map(|p| p.display().to_string())
                            .ok_or(Error::MissingManifestPath)?;
                        backup::deploy_resources(&manifest, &resource.namespace, opts.dry_run)
                            .await?;
                    }
                }
                DeployAction::Nothing => {}
            }
        }

        info!("Patching nodes...");
        self.incremental_node_patch(batch, &opts.control_label, opts.dry_run, true).await?;

        if opts.dry_run {
            info!("Dry run operation. No errors encountered");
            return Ok(());
        }

        self.verify_resources_status(opts.ignore_resources, &opts.resources).await?;

        if let Err(err) = shell::run_tests(&opts.test_suite, &opts.test_binary).await {
            warn!("Tests have failed.");
            return Err(err);
        }
        Ok(())
    }
}
