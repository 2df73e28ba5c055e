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

//! Manifest decoding.
//!
//! Manifest files are YAML, one or more documents per file. Only the fields
//! Rooster acts on are decoded: `apiVersion`, `kind`, `metadata.name`,
//! `metadata.namespace`, and `spec.updateStrategy.type` for DaemonSets.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// One Kubernetes object Rooster will act on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Resource {
    /// apiVersion, e.g. `apps/v1`.
    pub api_version: String,

    /// Object kind.
    pub kind: String,

    /// Object name.
    pub name: String,

    /// Resolved namespace.
    pub namespace: String,

    /// Manifest file this resource was read from, if any.
    pub manifest_path: Option<PathBuf>,

    /// `spec.updateStrategy.type`, when the manifest declares one.
    pub update_strategy: Option<String>,

    /// Readiness, set by the resource prober.
    pub ready: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ManifestDoc {
    #[serde(default, rename = "apiVersion")]
    api_version: String,
    #[serde(default)]
    kind: String,
    #[serde(default)]
    metadata: ManifestMetadata,
    #[serde(default)]
    spec: ManifestSpec,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ManifestMetadata {
    name: String,
    namespace: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ManifestSpec {
    #[serde(rename = "updateStrategy")]
    update_strategy: ManifestUpdateStrategy,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ManifestUpdateStrategy {
    #[serde(rename = "type")]
    strategy_type: String,
}

/// Resolves the namespace for one resource.
///
/// Both empty means `default`; exactly one set wins; both set and equal is
/// that value; both set and different is a conflict.
pub fn determine_namespace(manifest_namespace: &str, flag_namespace: &str) -> Result<String> {
    match (manifest_namespace.is_empty(), flag_namespace.is_empty()) {
        (true, true) => Ok("default".to_string()),
        (true, false) => Ok(flag_namespace.to_string()),
        (false, true) => Ok(manifest_namespace.to_string()),
        (false, false) => {
            if manifest_namespace == flag_namespace {
                Ok(manifest_namespace.to_string())
            } else {
                Err(Error::NamespaceConflict(
                    manifest_namespace.to_string(),
                    flag_namespace.to_string(),
                ))
            }
        }
    }
}

/// Reads every manifest file in a directory into [`Resource`] records.
///
/// Empty files are skipped with a warning; documents without a
/// `metadata.name` are skipped silently.
pub async fn read_manifest_files(
    manifest_path: impl AsRef<Path>,
    flag_namespace: &str,
) -> Result<Vec<Resource>> {
    let dir = manifest_path.as_ref();
    info!("Reading from {}", dir.display());
    let mut resources = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    // Directory iteration order is unspecified; keep it stable.
    files.sort();
    for file in files {
        let content = tokio::fs::read_to_string(&file).await?;
        if content.is_empty() {
            warn!("{} is empty", file.display());
            continue;
        }
        resources.extend(parse_manifest_documents(&content, &file, flag_namespace)?);
    }
    Ok(resources)
}

/// Parses every YAML document in one file's content.
pub fn parse_manifest_documents(
    content: &str,
    file: &Path,
    flag_namespace: &str,
) -> Result<Vec<Resource>> {
    let mut resources = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let doc = match Option::<ManifestDoc>::deserialize(document)? {
            Some(doc) => doc,
            None => continue,
        };
        if doc.metadata.name.is_empty() {
            continue;
        }
        let namespace = determine_namespace(&doc.metadata.namespace, flag_namespace)?;
        let strategy_type = doc.spec.update_strategy.strategy_type;
        resources.push(Resource {
            api_version: doc.api_version,
            kind: doc.kind,
            name: doc.metadata.name,
            namespace,
            manifest_path: Some(file.to_path_buf()),
            update_strategy: (!strategy_type.is_empty()).then_some(strategy_type),
            ready: false,
        });
    }
    Ok(resources)
}
