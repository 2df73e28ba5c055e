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

//! Rollout batch sizing.

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::nodes::NodeRef;

/// Computes the rollout batch from a node list and a percentage.
///
/// A single-node fleet always yields a batch of one; otherwise the size is
/// `round(n * percentage / 100)` and the batch is the list prefix of that
/// length. A percentage above 100 yields an empty batch, rejected downstream
/// by [`validate_batch_size`].
pub fn define_batch(nodes: &[NodeRef], percentage: u32) -> (Vec<NodeRef>, usize) {
    info!("Defining batch size...");
    if percentage > 100 {
        warn!("Batch size cannot be defined. Invalid canary/increment");
        return (Vec::new(), 0);
    }
    match nodes.len() {
        0 => (Vec::new(), 0),
        1 => (nodes.to_vec(), 1),
        n => {
            let size = ((n as f64) * (percentage as f64) / 100.0).round() as usize;
            info!("Targeted nodes count: {}/{}", size, n);
            (nodes[..size].to_vec(), size)
        }
    }
}

/// Rejects a batch covering the whole fleet.
///
/// The batch must be a strict subset of the nodes under consideration, which
/// denies canary or increment values of 100% on fleets larger than one node.
pub fn match_batch(all: &[NodeRef], batch: &[NodeRef]) -> Result<()> {
    if all.len() == batch.len() && all.len() > 1 {
        return Err(Error::BatchCoversFleet);
    }
    Ok(())
}

/// Rejects an empty batch.
pub fn validate_batch_size(size: usize) -> Result<()> {
    if size == 0 {
        return Err(Error::EmptyBatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{from_names, node_names};

    fn refs(count: usize) -> Vec<NodeRef> {
        from_names((0..count).map(|i| format!("test-node-{i}")))
    }

    #[test]
    fn test_empty_fleet() {
        let (batch, size) = define_batch(&[], 50);
        assert_eq!(size, 0);
        assert!(batch.is_empty());
        assert!(validate_batch_size(size).is_err());
    }

    #[test]
    fn test_single_node_always_selected() {
        let (batch, size) = define_batch(&refs(1), 10);
        assert_eq!(size, 1);
        assert_eq!(node_names(&batch), vec!["test-node-0"]);
    }

    #[test]
    fn test_rounding() {
        // 9 nodes at 10% rounds to 1.
        let (batch, size) = define_batch(&refs(9), 10);
        assert_eq!(size, 1);
        assert_eq!(batch.len(), 1);

        // 4 nodes at 50% is exactly 2.
        let (_, size) = define_batch(&refs(4), 50);
        assert_eq!(size, 2);

        // 3 nodes at 50% rounds up to 2.
        let (_, size) = define_batch(&refs(3), 50);
        assert_eq!(size, 2);
    }

    #[test]
    fn test_full_percentage_selects_everything() {
        let (batch, size) = define_batch(&refs(5), 100);
        assert_eq!(size, 5);
        // ...and is then rejected as a non-strict subset.
        assert!(match_batch(&refs(5), &batch).is_err());
    }

    #[test]
    fn test_zero_percentage() {
        let (_, size) = define_batch(&refs(5), 0);
        assert_eq!(size, 0);
    }

    #[test]
    fn test_over_hundred_percentage_rejected() {
        let (batch, size) = define_batch(&refs(5), 150);
        assert_eq!(size, 0);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_match_batch_allows_strict_subset_and_single_node() {
        assert!(match_batch(&refs(4), &refs(2)).is_ok());
        // A one-node fleet legitimately matches its own batch.
        assert!(match_batch(&refs(1), &refs(1)).is_ok());
    }

    #[test]
    fn test_match_batch_is_idempotent() {
        let all = refs(4);
        let batch = refs(4);
        let first = match_batch(&all, &batch).is_err();
        let second = match_batch(&all, &batch).is_err();
        assert_eq!(first, second);
        assert!(first);
    }
}
