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

//! Static validation, run before any cluster mutation.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::manifest::Resource;
use crate::options::{Action, RolloutOptions};
use crate::shell;

/// Version names follow the Kubernetes label-value grammar.
const VERSION_PATTERN: &str = "^(([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9])?$";

/// The only DaemonSet update strategy Rooster drives.
pub const ON_DELETE: &str = "OnDelete";

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(VERSION_PATTERN).expect("version pattern is valid"))
}

/// True when the version string is well formed. The empty version is legal;
/// rollback and scale-down target the current version.
pub fn verify_version(version: &str) -> bool {
    version_regex().is_match(version)
}

/// Reduces a kubeconfig context name to its cluster id: the first three
/// dash-separated segments.
pub fn short_cluster_id(context: &str) -> String {
    context.split('-').take(3).collect::<Vec<_>>().join("-")
}

/// Checks the indicated cluster id against the kubeconfig's current context.
pub async fn validate_cluster_id(indicated: &str) -> Result<()> {
    if indicated.is_empty() {
        return Err(Error::InvalidOptions("cluster id is not indicated".to_string()));
    }
    let context = shell::current_context().await?;
    let expected = short_cluster_id(&context);
    if indicated != expected {
        return Err(Error::ClusterIdMismatch {
            expected,
            indicated: indicated.to_string(),
        });
    }
    Ok(())
}

/// Test suite and binary come as a pair; one without the other is fatal.
pub fn validate_test_options(test_suite: &str, test_binary: &str) -> Result<()> {
    if test_suite.is_empty() && test_binary.is_empty() {
        return Ok(());
    }
    if test_suite.is_empty() {
        return Err(Error::InvalidOptions("test suite not defined".to_string()));
    }
    if test_binary.is_empty() {
        return Err(Error::InvalidOptions("test binary not defined".to_string()));
    }
    Ok(())
}

/// Validates everything that can be checked without touching the cluster.
pub fn validate_options(opts: &RolloutOptions) -> Result<()> {
    if opts.target_label.is_empty() {
        return Err(Error::InvalidOptions("target label is not indicated".to_string()));
    }
    if opts.control_label.is_empty() {
        return Err(Error::InvalidOptions("control/canary label is not indicated".to_string()));
    }
    if opts.project.project.is_empty() {
        return Err(Error::InvalidOptions("project is not indicated".to_string()));
    }
    if !verify_version(&opts.project.desired_version) {
        return Err(Error::InvalidVersion(opts.project.desired_version.clone()));
    }
    validate_test_options(&opts.test_suite, &opts.test_binary)?;
    match opts.action {
        Action::Rollout => {
            let sampler = opts.sampler();
            if sampler == 0 || sampler >= 100 {
                return Err(Error::InvalidOptions(format!(
                    "the {} must be between 1 and 99",
                    match opts.strategy {
                        crate::options::Strategy::Canary => "canary batch size",
                        crate::options::Strategy::Linear => "increment",
                    }
                )));
            }
        }
        Action::Update => {
            if !opts.manifest_path.is_empty() && !opts.update_if_exists {
                return Err(Error::InvalidOptions(
                    "an update over existing resources requires --update-if-exists".to_string(),
                ));
            }
        }
        Action::Rollback => {
            if opts.decrement > 0 {
                return Err(Error::InvalidOptions(
                    "a rollback does not take a decrement".to_string(),
                ));
            }
        }
        Action::ScaleDown => {
            if opts.decrement < 1 {
                return Err(Error::InvalidDecrement);
            }
        }
    }
    Ok(())
}

/// Rejects manifests Rooster cannot drive: every declared DaemonSet must use
/// the OnDelete update strategy.
pub fn validate_manifests(resources: &[Resource]) -> Result<()> {
    for resource in resources {
        if resource.kind != "DaemonSet" {
            continue;
        }
        if resource.update_strategy.as_deref() != Some(ON_DELETE) {
            return Err(Error::UnsupportedUpdateStrategy {
                kind: resource.kind.clone(),
                name: resource.name.clone(),
            });
        }
    }
    Ok(())
}
