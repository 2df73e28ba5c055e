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

//! Process-wide configuration.
//!
//! Every knob is an environment variable with a default. The struct is built
//! once in `main` and passed through constructors; it is immutable after
//! that.

use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Environment-backed configuration defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// apiVersion used for core/v1 objects (Nodes, ConfigMaps).
    pub api_version_core_v1: String,

    /// Root of the on-disk resource backup tree.
    pub backup_directory: String,

    /// Namespace holding the versioning cache ConfigMaps.
    pub default_namespace: String,

    /// Name prefix of the versioning cache ConfigMap.
    pub cm_name: String,

    /// Kind of the versioning cache object.
    pub cm_kind: String,

    /// `key=value` ownership label stamped on cache ConfigMaps.
    pub cm_owner_tag: String,

    /// Strategy used when none is given on the command line.
    pub default_rollout_strategy: String,

    /// Prefix of the per-project version label, `<prefix>.<project>`.
    pub label_prefix: String,

    /// Kind string used when synthesizing node queries.
    pub node_kind: String,

    /// Version of the deployer itself, for startup logging.
    pub deployer_version: String,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string())
}

impl Config {
    /// Reads the configuration from the environment, falling back to the
    /// built-in defaults for unset variables.
    pub fn from_env() -> Self {
        Self {
            api_version_core_v1: env_or("APIVERSIONCOREV1", "v1"),
            backup_directory: env_or("BACKUPDIRECTORY", "/tmp/streamliner_backup"),
            default_namespace: env_or("DEFAULTNAMESPACE", "default"),
            cm_name: env_or("CMNAME", "str-versioning-cache"),
            cm_kind: env_or("CMKIND", "ConfigMap"),
            cm_owner_tag: env_or("CMOWNERTAG", "responsible.unit=streamliner"),
            default_rollout_strategy: env_or("DEFAULTROLLOUTSTRATEGY", "linear"),
            label_prefix: env_or("LABELPREFIX", "deploy.streamliner"),
            node_kind: env_or("NODEKIND", "Node"),
            deployer_version: env_or("DEPLOYERVERSION", "1.0.0"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rooster configuration:")?;
        writeln!(f, "    Backup directory: {}", self.backup_directory)?;
        writeln!(f, "    Cache namespace: {}", self.default_namespace)?;
        writeln!(f, "    Cache name prefix: {}", self.cm_name)?;
        writeln!(f, "    Label prefix: {}", self.label_prefix)?;
        write!(f, "    Default strategy: {}", self.default_rollout_strategy)
    }
}
