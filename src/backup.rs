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

//! Resource backup and deployment, delegated to kubectl.
//!
//! Backups are byte-faithful YAML exports laid out as
//! `<root>/<cluster>/<project>/<version>/<kind>_<name>.yaml`; a rollback to
//! a version re-applies that directory.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::manifest::Resource;
use crate::options::ProjectOptions;
use crate::shell;

/// True when the path exists, file or directory.
pub fn path_exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().exists()
}

/// Locates the backup directory for a project version, rejecting absence.
pub fn version_backup_path(
    config: &Config,
    cluster: &str,
    project: &ProjectOptions,
) -> Result<PathBuf> {
    let dir = Path::new(&config.backup_directory)
        .join(cluster)
        .join(&project.project)
        .join(&project.desired_version);
    if !path_exists(&dir) {
        return Err(Error::BackupNotFound(dir.display().to_string()));
    }
    Ok(dir)
}

/// Exports every target resource to the backup tree.
///
/// Skipped with a warning when resources are ignored. Uses
/// `kubectl get -oyaml` so the stored manifest is exactly what the cluster
/// holds, including fields Rooster never decodes.
pub async fn backup_resources(
    config: &Config,
    resources: &[Resource],
    cluster: &str,
    project: &ProjectOptions,
    ignore_resources: bool,
) -> Result<Option<PathBuf>> {
    if ignore_resources {
        warn!("Resources are ignored. Skipping backup operation.");
        return Ok(None);
    }
    if config.backup_directory.is_empty() {
        return Err(Error::BackupRootUnset);
    }
    if resources.is_empty() {
        return Err(Error::NothingToBackUp);
    }
    let dir = Path::new(&config.backup_directory)
        .join(cluster)
        .join(&project.project)
        .join(&project.current_version);
    tokio::fs::create_dir_all(&dir).await?;
    info!("Created backup directory at {}", dir.display());
    for resource in resources {
        let file = dir.join(format!("{}_{}.yaml", resource.kind, resource.name));
        let redirect = format!("-oyaml > {}", file.display());
        shell::kubectl(
            &resource.namespace,
            "get",
            &[&resource.kind, &resource.name, "--ignore-not-found=true", &redirect],
        )
        .await?;
    }
    info!("Resource backup complete.");
    Ok(Some(dir))
}

/// Applies the manifests at a path through kubectl.
pub async fn deploy_resources(manifest_path: &str, namespace: &str, dry_run: bool) -> Result<()> {
    if manifest_path.is_empty() {
        return Err(Error::MissingManifestPath);
    }
    if !path_exists(manifest_path) {
        return Err(Error::PathNotFound(manifest_path.to_string()));
    }
    info!("Deploying resources...");
    info!("Resource path: {}", manifest_path);
    let strategy = if dry_run { "client" } else { "none" };
    let dry_run_flag = format!("--dry-run={strategy}");
    shell::kubectl(namespace, "apply", &["-f", manifest_path, &dry_run_flag]).await?;
    info!("Resources were deployed");
    Ok(())
}
