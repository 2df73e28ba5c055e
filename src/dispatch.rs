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

//! Top-level action dispatch.
//!
//! Preflight runs first and rejects before any cluster mutation; manifests
//! are read once and shared by whichever action runs.

use tracing::info;

use crate::error::Result;
use crate::manager::Manager;
use crate::manifest;
use crate::options::{Action, RolloutOptions};
use crate::preflight;

/// Fills in the target version: rollback and scale-down work against the
/// current version, every other action gets a generated timestamp version
/// when none was indicated.
pub fn define_version(indicated: &str, action: Action) -> String {
    if !indicated.is_empty() || matches!(action, Action::Rollback | Action::ScaleDown) {
        return indicated.to_string();
    }
    chrono::Local::now().format("%Y.%m.%d_%H-%M-%S").to_string()
}

/// Validates the invocation and runs the requested action.
pub async fn run(manager: &Manager, mut opts: RolloutOptions) -> Result<()> {
    opts.project.desired_version = define_version(&opts.project.desired_version, opts.action);
    opts.ignore_resources = opts.manifest_path.is_empty();

    preflight::validate_cluster_id(&opts.cluster_id).await?;
    preflight::validate_options(&opts)?;

    if !opts.manifest_path.is_empty() {
        opts.resources =
            manifest::read_manifest_files(&opts.manifest_path, &opts.namespace).await?;
        preflight::validate_manifests(&opts.resources)?;
    }

    info!(
        action = %opts.action,
        project = %opts.project.project,
        version = %opts.project.desired_version,
        "dispatching"
    );
    match opts.action {
        Action::Rollout => manager.proceed_to_deployment(&mut opts).await,
        Action::Rollback => manager.revert_deployment(&opts).await,
        Action::Update => manager.update_rollout(&opts).await,
        Action::ScaleDown => manager.scale_down(&opts).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preflight::verify_version;

    #[test]
    fn test_define_version_exemptions() {
        // Rollback and scale-down target the current version.
        assert_eq!(define_version("", Action::Rollback), "");
        assert_eq!(define_version("", Action::ScaleDown), "");
        assert_eq!(define_version("v3", Action::Rollback), "v3");
    }

    #[test]
    fn test_define_version_generates_valid_timestamp() {
        let version = define_version("", Action::Rollout);
        assert!(!version.is_empty());
        assert!(verify_version(&version), "generated version {version} fails the format check");
    }

    #[test]
    fn test_define_version_keeps_indicated_value() {
        assert_eq!(define_version("v7", Action::Rollout), "v7");
        assert_eq!(define_version("v7", Action::Update), "v7");
    }
}
