//! Instance data model: one annotated subject within a frame.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::Skeleton;

/// A single 2D keypoint location.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    /// X coordinate in image pixels.
    pub x: f64,
    /// Y coordinate in image pixels.
    pub y: f64,
    /// Visibility flag. `None` means the annotation source did not state
    /// visibility either way; grouped points imported from external tools
    /// keep it unset while ungrouped leftovers are explicitly visible.
    pub visible: Option<bool>,
}

impl Point {
    /// Create a point with unset visibility.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            visible: None,
        }
    }

    /// Set the visibility flag.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    /// Check whether either coordinate is NaN ("not annotated").
    pub fn is_nan(&self) -> bool {
        self.x.is_nan() || self.y.is_nan()
    }
}

/// One annotated subject: a mapping from node names to points.
///
/// Point order is deterministic: nodes known to the skeleton come first, in
/// skeleton order, followed by any unknown node names in the order they were
/// inserted. Exports iterate points in exactly this order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Instance {
    /// Points keyed by node name.
    pub points: IndexMap<String, Point>,
}

impl Instance {
    /// Create an instance, ordering `points` by the skeleton's node order.
    ///
    /// Node names absent from the skeleton are kept, after the known nodes,
    /// in their original insertion order.
    pub fn new(points: IndexMap<String, Point>, skeleton: &Skeleton) -> Self {
        let mut ordered = IndexMap::with_capacity(points.len());
        for name in skeleton.node_names() {
            if let Some(point) = points.get(name) {
                ordered.insert(name.to_string(), *point);
            }
        }
        for (name, point) in points {
            if !ordered.contains_key(&name) {
                ordered.insert(name, point);
            }
        }
        Self { points: ordered }
    }

    /// Number of points in this instance.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check whether the instance has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Look up a point by node name.
    pub fn point(&self, name: &str) -> Option<&Point> {
        self.points.get(name)
    }
}
