//! Skeleton data model: the named keypoints an instance can carry.

use serde::{Deserialize, Serialize};

/// A named node (body part) of a skeleton.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Node {
    /// Display name of the node (e.g. "head", "left_wing").
    pub name: String,
}

impl Node {
    /// Create a new node with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

/// An ordered set of uniquely-named nodes.
///
/// Node order is significant: instances report their points in skeleton
/// order, and exports iterate points in that order. Edge topology is not
/// modeled here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Skeleton {
    /// Nodes in their canonical order.
    pub nodes: Vec<Node>,
}

impl Skeleton {
    /// Create a skeleton from a list of node names.
    pub fn new(node_names: &[&str]) -> Self {
        Self {
            nodes: node_names.iter().map(|n| Node::new(n)).collect(),
        }
    }

    /// Number of nodes in the skeleton.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check whether the skeleton has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Position of a node in the skeleton, by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }

    /// Check whether a node with the given name exists.
    pub fn has_node(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Iterate over node names in skeleton order.
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.name.as_str())
    }
}
