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

//! Node references and set operations over them.
//!
//! Nodes are identified by name throughout the crate; full Kubernetes
//! objects are projected down to [`NodeRef`] as soon as they are fetched.

use std::collections::BTreeMap;
use std::collections::HashSet;

use k8s_openapi::api::core::v1::Node;

/// A node, reduced to its name and labels.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeRef {
    /// Node name.
    pub name: String,

    /// Labels present on the node at fetch time.
    pub labels: BTreeMap<String, String>,
}

impl NodeRef {
    /// A reference carrying only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), labels: BTreeMap::new() }
    }
}

impl From<&Node> for NodeRef {
    fn from(node: &Node) -> Self {
        Self {
            name: node.metadata.name.clone().unwrap_or_default(),
            labels: node.metadata.labels.clone().unwrap_or_default(),
        }
    }
}

/// Projects a node list to its names, preserving order.
pub fn node_names(nodes: &[NodeRef]) -> Vec<String> {
    nodes.iter().map(|n| n.name.clone()).collect()
}

/// Builds name-only references from a list of names.
pub fn from_names<I, S>(names: I) -> Vec<NodeRef>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(NodeRef::named).collect()
}

/// Returns the members of `a` whose names do not appear in `b`.
///
/// Used to find fresh rollout targets: target-labeled nodes that do not yet
/// carry the control or version label.
pub fn extract_uncommon(a: &[NodeRef], b: &[NodeRef]) -> Vec<NodeRef> {
    let marked: HashSet<&str> = b.iter().map(|n| n.name.as_str()).collect();
    a.iter().filter(|n| !marked.contains(n.name.as_str())).cloned().collect()
}

/// Returns the tail of the list after the first `count` entries.
pub fn rest_of_nodes(nodes: &[NodeRef], count: usize) -> Vec<NodeRef> {
    nodes.get(count..).unwrap_or_default().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(names: &[&str]) -> Vec<NodeRef> {
        from_names(names.iter().copied())
    }

    #[test]
    fn test_extract_uncommon() {
        let a = refs(&["n1", "n2", "n3", "n4"]);
        let b = refs(&["n2", "n4"]);
        let uncommon = extract_uncommon(&a, &b);
        assert_eq!(node_names(&uncommon), vec!["n1", "n3"]);
    }

    #[test]
    fn test_extract_uncommon_is_disjoint_from_b() {
        let a = refs(&["n1", "n2", "n3"]);
        let b = refs(&["n1", "n3", "n5"]);
        let uncommon = extract_uncommon(&a, &b);
        let b_names: Vec<String> = node_names(&b);
        assert!(node_names(&uncommon).iter().all(|n| !b_names.contains(n)));
    }

    #[test]
    fn test_extract_uncommon_with_empty_sides() {
        let a = refs(&["n1"]);
        assert_eq!(extract_uncommon(&a, &[]), a);
        assert!(extract_uncommon(&[], &a).is_empty());
    }

    #[test]
    fn test_rest_of_nodes() {
        let nodes = refs(&["n1", "n2", "n3"]);
        assert_eq!(node_names(&rest_of_nodes(&nodes, 1)), vec!["n2", "n3"]);
        assert!(rest_of_nodes(&nodes, 3).is_empty());
        assert!(rest_of_nodes(&nodes, 7).is_empty());
    }

    #[test]
    fn test_node_projection() {
        let mut node = Node::default();
        node.metadata.name = Some("worker-0".to_string());
        node.metadata.labels =
            Some([("noderole".to_string(), "worker".to_string())].into_iter().collect());
        let node_ref = NodeRef::from(&node);
        assert_eq!(node_ref.name, "worker-0");
        assert_eq!(node_ref.labels.get("noderole"), Some(&"worker".to_string()));
    }
}
