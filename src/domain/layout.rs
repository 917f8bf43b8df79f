//! Radial, subtree-weighted layout.
//!
//! The root sits at the origin. Every node places its children on a circle
//! around itself whose radius grows with depth. Children share the node's
//! angular wedge in proportion to their subtree sizes, with a minimum angle
//! per child derived from `min_node_spacing`.
//!
//! The computation is pure: identical trees and configs give identical maps.

use std::collections::{BTreeMap, VecDeque};
use std::f64::consts::{PI, TAU};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::domain::error::DomainError;
use crate::domain::tree::{LoadedTree, MindmapTree};
use crate::domain::{LayoutMap, NodeId, Position};

/// Geometry constants of the radial layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Radius at which the root places its children
    pub base_radius: f64,
    /// Added to the child radius per level of depth
    pub radius_increment: f64,
    /// Minimum arc length between sibling centres
    pub min_node_spacing: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            base_radius: 250.0,
            radius_increment: 180.0,
            min_node_spacing: 80.0,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        let fields = [
            ("base_radius", self.base_radius),
            ("radius_increment", self.radius_increment),
            ("min_node_spacing", self.min_node_spacing),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(DomainError::InvalidLayoutConfig(format!(
                "{name} must be finite"
            )));
        }
        if self.base_radius <= 0.0 {
            return Err(DomainError::InvalidLayoutConfig(
                "base_radius must be positive".into(),
            ));
        }
        if self.radius_increment <= 0.0 {
            return Err(DomainError::InvalidLayoutConfig(
                "radius_increment must be positive".into(),
            ));
        }
        if self.min_node_spacing < 0.0 {
            return Err(DomainError::InvalidLayoutConfig(
                "min_node_spacing must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// Radius at which a node of the given depth places its children.
    pub fn child_radius(&self, depth: usize) -> f64 {
        self.base_radius + depth as f64 * self.radius_increment
    }

    /// Minimum angle (radians) reserved per child at `radius`.
    pub fn min_angle(&self, radius: f64) -> f64 {
        self.min_node_spacing / radius
    }
}

/// Angular interval `[start, end)` in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wedge {
    pub start: f64,
    pub end: f64,
}

impl Wedge {
    pub const FULL_CIRCLE: Wedge = Wedge { start: 0.0, end: TAU };

    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Wedge of `width` centred on `angle`.
    pub fn centered(angle: f64, width: f64) -> Self {
        Self {
            start: angle - width / 2.0,
            end: angle + width / 2.0,
        }
    }

    pub fn width(&self) -> f64 {
        self.end - self.start
    }

    pub fn mid(&self) -> f64 {
        self.start + self.width() / 2.0
    }
}

/// Subtree size (node plus all descendants) for every node of the tree.
///
/// Iterative post-order walk so that very deep trees cannot exhaust the stack.
pub fn subtree_sizes(tree: &MindmapTree) -> BTreeMap<NodeId, usize> {
    let mut sizes = BTreeMap::new();
    let mut stack = vec![(tree.root(), false)];

    while let Some((id, visited)) = stack.pop() {
        if visited {
            let size = 1 + tree
                .children_of(id)
                .iter()
                .map(|child| sizes.get(child).copied().unwrap_or(0))
                .sum::<usize>();
            sizes.insert(id, size);
        } else {
            stack.push((id, true));
            for &child in tree.children_of(id).iter().rev() {
                stack.push((child, false));
            }
        }
    }
    sizes
}

/// A node whose own position and wedge are final.
///
/// Only placed nodes enter the queue, so children are always computed from
/// their parent's finished placement.
#[derive(Debug, Clone, Copy)]
struct Placement {
    id: NodeId,
    position: Position,
    wedge: Wedge,
    /// Direction from the parent; `None` for the root
    heading: Option<f64>,
}

impl Placement {
    /// Angular range in which this node's children are placed.
    fn child_range(&self) -> Wedge {
        match self.heading {
            None => self.wedge,
            Some(heading) => Wedge::centered(heading, self.wedge.width().min(PI)),
        }
    }
}

/// Compute canonical positions for every node of `tree`.
///
/// The key set of the result equals the node set of the tree.
#[instrument(level = "debug", skip(tree, config), fields(nodes = tree.len()))]
pub fn compute_layout(tree: &LoadedTree, config: &LayoutConfig) -> LayoutMap {
    let Some(tree) = tree.as_rooted() else {
        return LayoutMap::new();
    };

    let sizes = subtree_sizes(tree);
    let mut positions = LayoutMap::new();
    let mut queue = VecDeque::from([Placement {
        id: tree.root(),
        position: Position::ORIGIN,
        wedge: Wedge::FULL_CIRCLE,
        heading: None,
    }]);

    while let Some(placed) = queue.pop_front() {
        positions.insert(placed.id, placed.position);

        let children = tree.children_of(placed.id);
        if children.is_empty() {
            continue;
        }

        let depth = tree.depth_of(placed.id).unwrap_or(0);
        let radius = config.child_radius(depth);
        let weights: Vec<f64> = children
            .iter()
            .map(|child| sizes.get(child).copied().unwrap_or(1) as f64)
            .collect();
        let ranges = allocate(placed.child_range(), &weights, config.min_angle(radius));
        trace!(
            "node {} depth {}: {} children at radius {:.1}",
            placed.id,
            depth,
            children.len(),
            radius
        );

        for (&child, range) in children.iter().zip(ranges) {
            let heading = range.mid();
            queue.push_back(Placement {
                id: child,
                position: placed.position.offset_polar(radius, heading),
                wedge: range,
                heading: Some(heading),
            });
        }
    }

    debug!("computed {} positions", positions.len());
    positions
}

/// Split `range` into consecutive sub-ranges, one per weight.
///
/// Each sub-range is at least `min_angle` wide. If the minimums do not fit,
/// `range` grows by the same amount on both ends. Starts are chained from
/// the previous end and the last end is pinned to the range end, so the
/// sub-ranges tile the range without gaps or overlaps.
fn allocate(range: Wedge, weights: &[f64], min_angle: f64) -> Vec<Wedge> {
    let required = weights.len() as f64 * min_angle;
    let range = if required > range.width() {
        Wedge::centered(range.mid(), required)
    } else {
        range
    };
    let widths = proportional_widths(range.width(), weights, min_angle);

    let mut result = Vec::with_capacity(widths.len());
    let mut start = range.start;
    for (i, width) in widths.iter().enumerate() {
        let end = if i + 1 == widths.len() {
            range.end
        } else {
            start + width
        };
        result.push(Wedge::new(start, end));
        start = end;
    }
    result
}

/// Widths proportional to `weights`, summing to `total`, none below `min_angle`.
///
/// Shares that would fall below the minimum are pinned to it and the rest is
/// redistributed among the remaining weights until no share changes.
fn proportional_widths(total: f64, weights: &[f64], min_angle: f64) -> Vec<f64> {
    let n = weights.len();
    if n as f64 * min_angle >= total {
        return vec![min_angle; n];
    }

    let mut pinned = vec![false; n];
    loop {
        let pinned_count = pinned.iter().filter(|&&p| p).count();
        let free_total = total - pinned_count as f64 * min_angle;
        let free_weight: f64 = weights
            .iter()
            .zip(&pinned)
            .filter(|(_, &p)| !p)
            .map(|(w, _)| w)
            .sum();

        let mut changed = false;
        for (i, weight) in weights.iter().enumerate() {
            if !pinned[i] && free_total * weight / free_weight < min_angle {
                pinned[i] = true;
                changed = true;
            }
        }

        if !changed {
            return weights
                .iter()
                .zip(&pinned)
                .map(|(w, &p)| {
                    if p {
                        min_angle
                    } else {
                        free_total * w / free_weight
                    }
                })
                .collect();
        }
    }
}
