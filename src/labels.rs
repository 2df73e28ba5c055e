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

//! Label strings and JSON-patch payloads.
//!
//! All node and resource mutations go through RFC 6902 patches whose paths
//! live under `/metadata/labels/`, `/metadata/annotations/`, or `/data/`.
//! Slashes inside keys are escaped per RFC 6901.

use std::collections::BTreeMap;

use serde_json::json;

use crate::error::{Error, Result};

/// JSON-pointer prefix for label operations.
pub const LABEL_PATH_PREFIX: &str = "/metadata/labels/";

/// JSON-pointer prefix for annotation operations.
pub const ANNOTATION_PATH_PREFIX: &str = "/metadata/annotations/";

/// JSON-pointer prefix for ConfigMap data operations.
pub const CM_DATA_PATH_PREFIX: &str = "/data/";

/// Annotation kubectl leaves behind on applied objects.
pub const LAST_APPLIED_CONFIG_ANNOTATION: &str = "kubectl.kubernetes.io/last-applied-configuration";

/// JSON-patch operations used by the node and cache patch paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatchOp {
    /// `op: replace` — also used to introduce a label on a node.
    Replace,
    /// `op: remove`.
    Remove,
}

impl PatchOp {
    fn as_str(&self) -> &'static str {
        match self {
            PatchOp::Replace => "replace",
            PatchOp::Remove => "remove",
        }
    }
}

/// Splits a `key=value` label string.
pub fn split_label(label: &str) -> Result<(String, String)> {
    match label.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(Error::InvalidLabel(label.to_string())),
    }
}

/// Splits several `key=value` labels into a map. A trailing `=` yields an
/// empty value, which the patch builders turn into a value-less operation.
pub fn split_labels(labels: &[String]) -> Result<BTreeMap<String, String>> {
    let mut structured = BTreeMap::new();
    for label in labels {
        let (key, value) = split_label(label)?;
        structured.insert(key, value);
    }
    Ok(structured)
}

/// Builds the per-project version label.
///
/// Returns `(key, key=version)`, with the key shaped as `<prefix>.<project>`.
pub fn make_version_label(prefix: &str, project: &str, version: &str) -> (String, String) {
    let key = format!("{prefix}.{project}");
    let selector = format!("{key}={version}");
    (key, selector)
}

/// Escapes a map key for use inside a JSON pointer (RFC 6901).
pub fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

/// Builds a JSON-patch payload of one operation per entry, rooted at the
/// given path prefix. Empty values produce value-less operations (removes).
pub fn patch_payload(
    prefix: &str,
    op: PatchOp,
    entries: &BTreeMap<String, String>,
) -> Result<json_patch::Patch> {
    let ops: Vec<serde_json::Value> = entries
        .iter()
        .map(|(key, value)| {
            let path = format!("{prefix}{}", escape_pointer(key));
            if value.is_empty() {
                json!({ "op": op.as_str(), "path": path })
            } else {
                json!({ "op": op.as_str(), "path": path, "value": value })
            }
        })
        .collect();
    Ok(serde_json::from_value(serde_json::Value::Array(ops))?)
}

/// Payload mutating a single label.
pub fn label_patch(op: PatchOp, key: &str, value: &str) -> Result<json_patch::Patch> {
    let mut entries = BTreeMap::new();
    entries.insert(key.to_string(), value.to_string());
    patch_payload(LABEL_PATH_PREFIX, op, &entries)
}

/// Payload removing the kubectl last-applied-configuration annotation.
pub fn last_applied_removal_patch() -> Result<json_patch::Patch> {
    let mut entries = BTreeMap::new();
    entries.insert(LAST_APPLIED_CONFIG_ANNOTATION.to_string(), String::new());
    patch_payload(ANNOTATION_PATH_PREFIX, PatchOp::Remove, &entries)
}

/// Payload replacing one ConfigMap data key.
pub fn cm_data_patch(key: &str, value: &str) -> Result<json_patch::Patch> {
    let mut entries = BTreeMap::new();
    entries.insert(key.to_string(), value.to_string());
    patch_payload(CM_DATA_PATH_PREFIX, PatchOp::Replace, &entries)
}
