//! Domain entities: core data structures

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

/// Identifier of a single node, stable for the node's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the mindmap owning a set of nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MindmapId(pub i64);

impl fmt::Display for MindmapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical coordinates of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Point at `radius` and `angle` (radians) from `self`.
    pub fn offset_polar(&self, radius: f64, angle: f64) -> Self {
        Self {
            x: self.x + radius * angle.cos(),
            y: self.y + radius * angle.sin(),
        }
    }

    /// Angle of `other` as seen from `self`, in `(-π, π]`.
    pub fn angle_to(&self, other: &Position) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// Node id to position. Ordered so output and batch writes are deterministic.
pub type LayoutMap = BTreeMap<NodeId, Position>;

/// A persisted mindmap element.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub mindmap_id: MindmapId,
    /// `None` marks the root
    pub parent_id: Option<NodeId>,
    pub title: String,
    pub content: Option<String>,
    /// Sibling order; only the relative order matters
    pub order_index: i64,
    pub x_position: f64,
    pub y_position: f64,
    pub created_at: DateTime<Utc>,
}

impl Node {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn position(&self) -> Position {
        Position::new(self.x_position, self.y_position)
    }

    /// Sort key for siblings: `order_index`, ties broken by id.
    pub fn sibling_key(&self) -> (i64, NodeId) {
        (self.order_index, self.id)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.id, self.title)
    }
}

/// Values for a node that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNode {
    pub mindmap_id: MindmapId,
    pub parent_id: Option<NodeId>,
    pub title: String,
    pub content: Option<String>,
    pub order_index: i64,
}

/// Edits to a stored node; `None` leaves the field as it is.
///
/// Positions are not editable: they always come from the layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub order_index: Option<i64>,
}

impl NodeChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.order_index.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn given_origin_when_offset_polar_then_lands_on_circle() {
        let p = Position::ORIGIN.offset_polar(10.0, FRAC_PI_2);
        assert!(p.x.abs() < 1e-9);
        assert!((p.y - 10.0).abs() < 1e-9);
        assert!((Position::ORIGIN.distance_to(&p) - 10.0).abs() < 1e-9);
        assert!((Position::ORIGIN.angle_to(&p) - FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn given_equal_order_index_when_comparing_sibling_keys_then_id_breaks_tie() {
        let mk = |id, order_index| Node {
            id: NodeId(id),
            mindmap_id: MindmapId(1),
            parent_id: Some(NodeId(1)),
            title: "n".into(),
            content: None,
            order_index,
            x_position: 0.0,
            y_position: 0.0,
            created_at: Utc::now(),
        };
        assert!(mk(3, 0).sibling_key() < mk(5, 0).sibling_key());
        assert!(mk(9, 0).sibling_key() < mk(2, 1).sibling_key());
    }
}
