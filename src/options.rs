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

//! Action inputs.
//!
//! [`RolloutOptions`] is the superset of everything an action can consume;
//! each action reads the fields it cares about.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;

use crate::error::{Error, Result};
use crate::manifest::Resource;

/// Top-level action to perform. One per invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Action {
    /// Deploy a version onto more of the fleet.
    Rollout,
    /// Return to a previous version, or clean the fleet entirely.
    Rollback,
    /// Move the fleet from the current version to a different one.
    Update,
    /// Shrink the node scope of the current version.
    ScaleDown,
}

impl Action {
    /// The action name as it appears on the command line and in the cache.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Rollout => "rollout",
            Action::Rollback => "rollback",
            Action::Update => "update",
            Action::ScaleDown => "scale-down",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rollout strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// A canary batch first, then the rest of the fleet in one go.
    Canary,
    /// One increment-sized batch per invocation.
    Linear,
}

impl Strategy {
    /// The strategy name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Canary => "canary",
            Strategy::Linear => "linear",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "canary" => Ok(Strategy::Canary),
            "linear" => Ok(Strategy::Linear),
            other => Err(Error::InvalidOptions(format!("unsupported rollout strategy: {other}"))),
        }
    }
}

/// Project name and the versions an action moves between.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProjectOptions {
    /// Project name. The invariant key of the versioning cache.
    pub project: String,

    /// Version currently recorded as rolled out, filled in from the cache.
    pub current_version: String,

    /// Version the action targets. May be empty for rollback and
    /// scale-down, which operate on the current version.
    pub desired_version: String,
}

/// The full set of action inputs.
#[derive(Clone, Debug)]
pub struct RolloutOptions {
    /// Action to perform.
    pub action: Action,

    /// Rollout strategy, defaulting to linear.
    pub strategy: Strategy,

    /// Pre-existing cluster label selecting the fleet, `key=value`.
    pub target_label: String,

    /// Rooster-managed label placing a node in the rollout scope,
    /// `key=value`. Also called the canary label.
    pub control_label: String,

    /// Identifier of the cluster this invocation may touch.
    pub cluster_id: String,

    /// Directory of manifests to act on. Empty means resources are ignored.
    pub manifest_path: String,

    /// Namespace indicated on the command line, possibly empty.
    pub namespace: String,

    /// Canary batch size, in percent.
    pub canary: u32,

    /// Linear rollout increment, in percent.
    pub increment: u32,

    /// Scale-down decrement, in percent.
    pub decrement: u32,

    /// Delete-then-redeploy resources that already exist.
    pub update_if_exists: bool,

    /// Propagate server-side dry run to every mutation.
    pub dry_run: bool,

    /// Skip every resource create/verify/delete step. Derived: true when no
    /// manifest path was given.
    pub ignore_resources: bool,

    /// Test suite filter handed to the external test binary.
    pub test_suite: String,

    /// External test binary, resolved on PATH.
    pub test_binary: String,

    /// Project and version details.
    pub project: ProjectOptions,

    /// Resources decoded from the manifest path.
    pub resources: Vec<Resource>,
}

impl RolloutOptions {
    /// The sampler percentage matching the strategy: canary size for the
    /// canary strategy, increment for linear.
    pub fn sampler(&self) -> u32 {
        match self.strategy {
            Strategy::Canary => self.canary,
            Strategy::Linear => self.increment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names() {
        assert_eq!(Action::Rollout.as_str(), "rollout");
        assert_eq!(Action::ScaleDown.as_str(), "scale-down");
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("linear".parse::<Strategy>().unwrap(), Strategy::Linear);
        assert_eq!("Canary".parse::<Strategy>().unwrap(), Strategy::Canary);
        assert!("blue-green".parse::<Strategy>().is_err());
    }
}
