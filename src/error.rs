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

//! Error types shared across the crate.
//!
//! Validation and reconciliation errors are raised before any cluster
//! mutation; cluster errors are propagated verbatim from the API client.

use thiserror::Error;

/// Errors raised by any Rooster operation.
#[derive(Error, Debug)]
pub enum Error {
    #[error("cluster id mismatch. Expected {expected}, indicated {indicated}")]
    ClusterIdMismatch { expected: String, indicated: String },

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("invalid label format: {0}")]
    InvalidLabel(String),

    #[error("invalid version format: {0}")]
    InvalidVersion(String),

    #[error("version disparity detected. Current: {current} - Desired: {desired}")]
    VersionMismatch { current: String, desired: String },

    #[error("version disparity required. Current: {current} - Desired: {desired}")]
    VersionUnchanged { current: String, desired: String },

    #[error("no more than one version can be current")]
    MultipleCurrentVersions,

    #[error("versions from cache and labels do not match. Cache drift detected")]
    CacheDrift,

    #[error("previous version {0} is registered as currently being rolled out")]
    PreviousVersionActive(String),

    #[error("current version is not fully rolled out")]
    IncompleteRollout,

    #[error("no node carrying the target label was found")]
    NoTargetNodes,

    #[error("no node carrying the control/canary label was found")]
    NoControlNodes,

    #[error("no nodes ready for an update was found")]
    NoUpdatableNodes,

    #[error("user cancelled action")]
    UserCancelled,

    #[error("you may want to review the canary/increment")]
    EmptyBatch,

    #[error("the batch size cannot be equal to the total number of nodes to consider for the rollout. It must be inferior to the latter")]
    BatchCoversFleet,

    #[error("cannot rollback to a version that is current")]
    RollbackToCurrent,

    #[error("cannot scale down a version that is not current")]
    ScaleDownNotCurrent,

    #[error("wrong decrement indicated")]
    InvalidDecrement,

    #[error("missing manifest path")]
    MissingManifestPath,

    #[error("{0}: No such file or directory")]
    PathNotFound(String),

    #[error("could not find backup directory {0}")]
    BackupNotFound(String),

    #[error("backup directory not found")]
    BackupRootUnset,

    #[error("no resources to back up")]
    NothingToBackUp,

    #[error("namespace conflict detected: {0} vs {1}")]
    NamespaceConflict(String, String),

    #[error("{kind} {name} must declare the OnDelete update strategy")]
    UnsupportedUpdateStrategy { kind: String, name: String },

    #[error("daemonSet status was not retrieved")]
    MissingDaemonSetStatus,

    #[error("resources readiness could not be defined")]
    UndefinedReadiness,

    #[error("issues encountered with the {kind} {name}")]
    ResourceNotReady { kind: String, name: String },

    #[error("command failed: {command}: {output}")]
    Shell { command: String, output: String },

    #[error("tests have failed: {0}")]
    TestsFailed(String),

    #[error(transparent)]
    Kube(#[from] kube::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True when the underlying cause is a Kubernetes 404.
    ///
    /// NotFound is tolerated in exactly two places: the versioning cache on a
    /// first rollout, and resource deletion during cleanup.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Kube(kube::Error::Api(ae)) if ae.code == 404)
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
