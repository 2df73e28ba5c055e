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

//! Rollout strategies.
//!
//! A strategy decides which nodes a rollout reaches this invocation: linear
//! takes the next increment-sized slice of untouched targets; canary proves
//! the release on a first batch, then completes the fleet in the same run.

use async_trait::async_trait;
use tracing::info;

use crate::batch::{define_batch, match_batch, validate_batch_size};
use crate::error::Result;
use crate::manager::Manager;
use crate::nodes::{rest_of_nodes, NodeRef};
use crate::options::{RolloutOptions, Strategy};

/// A batch-selection and completion policy for the rollout engine.
#[async_trait]
pub trait RolloutStrategy: Send + Sync {
    /// Strategy name, as given on the command line.
    fn name(&self) -> &'static str;

    /// Runs the strategy over the target fleet.
    async fn execute(
        &self,
        manager: &Manager,
        opts: &RolloutOptions,
        target_nodes: &[NodeRef],
    ) -> Result<()>;
}

/// Resolves the strategy implementation for the parsed option.
pub fn for_strategy(strategy: Strategy) -> &'static dyn RolloutStrategy {
    match strategy {
        Strategy::Linear => &LinearStrategy,
        Strategy::Canary => &CanaryStrategy,
    }
}

/// One increment-sized batch of fresh targets per invocation.
pub struct LinearStrategy;

#[async_trait]
impl RolloutStrategy for LinearStrategy {
    fn name(&self) -> &'static str {
        "linear"
    }

    async fn execute(
        &self,
        manager: &Manager,
        opts: &RolloutOptions,
        target_nodes: &[NodeRef],
    ) -> Result<()> {
        let new_targets = manager.define_target_nodes(opts, target_nodes).await?;
        info!("Potential target nodes: {}", new_targets.len());
        info!("increment: {}", opts.increment);
        let (batch, size) = define_batch(&new_targets, opts.increment);
        validate_batch_size(size)?;
        match_batch(target_nodes, &batch)?;

        manager.perform_rollout(opts, &batch).await?;
        if opts.dry_run {
            return Ok(());
        }
        manager.apply_version_patch(&batch, &opts.project, opts.dry_run).await?;
        info!("The linear release is now complete.");
        Ok(())
    }
}

/// A canary batch first; once it verifies, the rest of the fleet follows in
/// the same invocation.
pub struct CanaryStrategy;

#[async_trait]
impl RolloutStrategy for CanaryStrategy {
    fn name(&self) -> &'static str {
        "canary"
    }

    async fn execute(
        &self,
        manager: &Manager,
        opts: &RolloutOptions,
        target_nodes: &[NodeRef],
    ) -> Result<()> {
        let new_targets = manager.define_target_nodes(opts, target_nodes).await?;
        info!("Potential target nodes: {}", new_targets.len());
        let (batch, size) = define_batch(&new_targets, opts.canary);
        validate_batch_size(size)?;
        match_batch(target_nodes, &batch)?;

        manager.perform_rollout(opts, &batch).await?;
        if opts.dry_run {
            return Ok(());
        }

        // The canary held; complete the fleet.
        let others = rest_of_nodes(&new_targets, batch.len());
        info!("Patching remaining nodes...");
        manager
            .incremental_node_patch(&others, &opts.control_label, opts.dry_run, true)
            .await?;
        manager.verify_resources_status(opts.ignore_resources, &opts.resources).await?;

        let mut reached = batch;
        reached.extend(others);
        manager.apply_version_patch(&reached, &opts.project, opts.dry_run).await?;
        info!("The canary release is now complete.");
        Ok(())
    }
}
