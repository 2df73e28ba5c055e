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

//! rooster - staged rollouts of node-scoped Kubernetes workloads
//!
//! This library provides the pieces behind the `rooster` binary:
//! - The action dispatcher and the rollout/rollback/update/scale-down flows
//! - The versioning-cache ConfigMap codec and its reconciliation checks
//! - Batch sizing and node-set operations
//! - The two-phase node label patcher and the resource readiness prober
//! - Preflight validation and the kubectl-backed backup/deploy boundary

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backup;
pub mod batch;
pub mod cache;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod labels;
pub mod manager;
pub mod manifest;
pub mod nodes;
pub mod options;
pub mod patcher;
pub mod preflight;
pub mod probe;
pub mod reconcile;
pub mod rollback;
pub mod rollout;
pub mod scaledown;
pub mod shell;
pub mod strategy;
pub mod update;

// Re-export commonly used types
pub use cache::{CmData, ProjectInfo, VersionEntry};
pub use client::KubeClientManager;
pub use config::Config;
pub use error::{Error, Result};
pub use manager::Manager;
pub use manifest::Resource;
pub use nodes::NodeRef;
pub use options::{Action, ProjectOptions, RolloutOptions, Strategy};

/// Semantic version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default name for the deployer.
pub const DEPLOYER_NAME: &str = "rooster";
