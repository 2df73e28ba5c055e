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

//! Scale-down: shrink the node scope of the deployed version.

use crate::error::{Error, Result};
use crate::manager::Manager;
use crate::options::RolloutOptions;

impl Manager {
    /// Entry point of the scale-down action.
    ///
    /// Only the current version can be scaled; the decrement percentage
    /// bounds how many nodes leave the scope per invocation. The node work
    /// itself is the clean-resources path with a batch limit.
    pub async fn scale_down(&self, opts: &RolloutOptions) -> Result<()> {
        if opts.decrement < 1 {
            return Err(Error::InvalidDecrement);
        }
        let desired = &opts.project.desired_version;
        if !desired.is_empty() {
            let project = &opts.project.project;
            let cmdata = self.retrieve_cache(project).await?;
            let current = self.get_current_version(project, &cmdata).await?;
            if current != *desired {
                return Err(Error::ScaleDownNotCurrent);
            }
        }
        self.clean_resources(opts).await
    }
}
