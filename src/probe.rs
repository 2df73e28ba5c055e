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

//! Resource readiness probing.

use std::time::Duration;

use serde_json::Value;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::manager::Manager;
use crate::manifest::Resource;

/// Coarse wait for admission and scheduling to propagate before the first
/// status read.
const SETTLE_WAIT: Duration = Duration::from_secs(20);

/// Evaluates a DaemonSet's status block.
///
/// Ready means every desired pod is ready:
/// `desiredNumberScheduled == numberReady`.
pub fn check_daemon_set_status(status: Option<&Value>) -> Result<bool> {
    let status = match status {
        Some(status) if !status.is_null() => status,
        _ => return Err(Error::MissingDaemonSetStatus),
    };
    let desired = status.get("desiredNumberScheduled").and_then(Value::as_i64);
    let ready = status.get("numberReady").and_then(Value::as_i64);
    Ok(desired == ready)
}

impl Manager {
    /// Queries each target resource and reports its readiness.
    ///
    /// DaemonSets are checked against their status; any other kind is deemed
    /// ready by the fact it could be fetched.
    pub async fn are_resources_ready(&self, resources: &[Resource]) -> Result<Vec<Resource>> {
        info!("Waiting for resources to be ready...");
        sleep(SETTLE_WAIT).await;
        let mut report = Vec::new();
        for resource in resources {
            let object = self.kcm.get_resource(resource).await?;
            info!("Found {} {}", resource.kind, resource.name);
            let ready = if resource.kind == "DaemonSet" {
                check_daemon_set_status(object.data.get("status"))?
            } else {
                true
            };
            let mut resource = resource.clone();
            resource.ready = ready;
            report.push(resource);
        }
        Ok(report)
    }

    /// Fails the running action on the first non-ready resource.
    pub async fn verify_resources_status(
        &self,
        ignore_resources: bool,
        resources: &[Resource],
    ) -> Result<()> {
        if ignore_resources {
            warn!("Resources are ignored. Skipping readiness verification.");
            return Ok(());
        }
        let report = self.are_resources_ready(resources).await?;
        if report.is_empty() {
            return Err(Error::UndefinedReadiness);
        }
        for resource in report {
            if !resource.ready {
                return Err(Error::ResourceNotReady {
                    kind: resource.kind,
                    name: resource.name,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_daemon_set_ready_when_counts_match() {
        let status = json!({ "desiredNumberScheduled": 3, "numberReady": 3 });
        assert!(check_daemon_set_status(Some(&status)).unwrap());
    }

    #[test]
    fn test_daemon_set_not_ready_when_counts_differ() {
        let status = json!({ "desiredNumberScheduled": 3, "numberReady": 1 });
        assert!(!check_daemon_set_status(Some(&status)).unwrap());
    }

    #[test]
    fn test_missing_status_is_an_error() {
        assert!(matches!(
            check_daemon_set_status(None),
            Err(Error::MissingDaemonSetStatus)
        ));
        let null = Value::Null;
        assert!(matches!(
            check_daemon_set_status(Some(&null)),
            Err(Error::MissingDaemonSetStatus)
        ));
    }

    #[test]
    fn test_absent_counts_compare_equal() {
        // A status block with neither counter present reads as ready,
        // matching the loose comparison the readiness check has always done.
        let status = json!({});
        assert!(check_daemon_set_status(Some(&status)).unwrap());
    }
}
