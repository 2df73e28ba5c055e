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

//! Node label patching.
//!
//! The DaemonSets Rooster manages use the OnDelete update strategy: a pod
//! only respawns under a new spec once its node falls out of, and back into,
//! the DaemonSet's node affinity. The two-phase remove/replace of the
//! control label is what drives that. The phases must not be collapsed.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info};

use crate::error::Result;
use crate::labels::{self, PatchOp, LABEL_PATH_PREFIX};
use crate::manager::Manager;
use crate::nodes::NodeRef;
use crate::options::ProjectOptions;

/// Wait between the control label's removal and its replacement, giving the
/// DaemonSet controller time to tear the pod down.
const INTER_PHASE_WAIT: Duration = Duration::from_secs(10);

impl Manager {
    /// Restarts workloads node by node via the control label.
    ///
    /// For each node: remove the control label, wait, put it back. The
    /// removal may fail on a first rollout where the label was never set;
    /// `ignore_missing_label` swallows that phase's errors. Replacement
    /// errors always surface.
    pub async fn incremental_node_patch(
        &self,
        nodes: &[NodeRef],
        control_label: &str,
        dry_run: bool,
        ignore_missing_label: bool,
    ) -> Result<()> {
        let (key, value) = labels::split_label(control_label)?;
        for node in nodes {
            info!(node = %node.name, "Node to patch");
            let removal = labels::label_patch(PatchOp::Remove, &key, "")?;
            match self.kcm.patch_node(&node.name, removal, dry_run).await {
                Ok(()) => {}
                Err(err) if ignore_missing_label => {
                    debug!(node = %node.name, error = %err, "control label was not present, continuing");
                }
                Err(err) => return Err(err),
            }
            sleep(INTER_PHASE_WAIT).await;
            let replacement = labels::label_patch(PatchOp::Replace, &key, &value)?;
            self.kcm.patch_node(&node.name, replacement, dry_run).await?;
        }
        info!("Patching complete");
        Ok(())
    }

    /// Records the installed version on each node,
    /// `<prefix>.<project>=<version>`.
    pub async fn apply_version_patch(
        &self,
        nodes: &[NodeRef],
        project: &ProjectOptions,
        dry_run: bool,
    ) -> Result<()> {
        let (key, _) = self.version_label(&project.project, &project.desired_version);
        let patch = labels::label_patch(PatchOp::Replace, &key, &project.desired_version)?;
        for node in nodes {
            info!(node = %node.name, version = %project.desired_version, "marking node version");
            self.kcm.patch_node(&node.name, patch.clone(), dry_run).await?;
        }
        Ok(())
    }

    /// Strips the given label keys from each node. Used by the clean
    /// rollback and scale-down paths to take nodes out of scope.
    pub async fn remove_node_labels(
        &self,
        nodes: &[NodeRef],
        keys: &[String],
        dry_run: bool,
    ) -> Result<()> {
        let entries: BTreeMap<String, String> =
            keys.iter().map(|key| (key.clone(), String::new())).collect();
        let patch = labels::patch_payload(LABEL_PATH_PREFIX, PatchOp::Remove, &entries)?;
        for node in nodes {
            info!(node = %node.name, "removing rollout labels");
            self.kcm.patch_node(&node.name, patch.clone(), dry_run).await?;
        }
        Ok(())
    }
}
