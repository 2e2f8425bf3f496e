//! # Body Quadtree
//!
//! A dynamic 2D index over body centres. Nodes live in a flat arena and refer
//! to each other by index; items carry a copy of the body's position and
//! radius taken at insertion so queries never touch the world.
//!
//! ```text
//!   child index bits: 1 = upper X half, 2 = upper Y half
//!   ┌─────┬─────┐
//!   │  2  │  3  │
//!   ├─────┼─────┤
//!   │  0  │  1  │
//!   └─────┴─────┘
//! ```
//!
//! Each node tracks `max_radius`, the largest body radius anywhere below it,
//! so range queries can expand their bounds by it and still find bodies whose
//! centre is outside the queried region but whose sphere reaches into it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use portalis_core::{component_base, Base, Component, ComponentFlags, Entity};
use portalis_shared::constants::{QUADTREE_INIT_DIM, QUADTREE_LEAF_CAPACITY, QUADTREE_MAX_DEPTH};
use portalis_shared::{Vec2, Vec3};

/// A body as seen by the tree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadItem {
    /// The body's entity.
    pub entity: Entity,
    /// Centre at insertion time.
    pub pos: Vec3,
    /// Half the body's diameter.
    pub radius: f64,
    /// Half the body's height.
    pub half_height: f64,
    /// The body carries a light.
    pub is_light: bool,
}

#[derive(Clone, Debug, Default)]
struct QuadNode {
    min: Vec2,
    max: Vec2,
    max_radius: f64,
    items: Vec<QuadItem>,
    parent: Option<usize>,
    children: Option<[usize; 4]>,
}

impl QuadNode {
    #[inline]
    fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y
    }

    fn circle_overlaps(&self, center: Vec2, r: f64) -> bool {
        let r = r + self.max_radius;
        !(center.x + r < self.min.x
            || center.y + r < self.min.y
            || center.x - r >= self.max.x
            || center.y - r >= self.max.y)
    }

    fn aabb_overlaps(&self, min: Vec2, max: Vec2) -> bool {
        let r = self.max_radius;
        !(max.x + r < self.min.x || max.y + r < self.min.y || min.x - r >= self.max.x || min.y - r >= self.max.y)
    }

    fn plane_overlaps(&self, center: Vec2, normal: Vec2) -> bool {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            Vec2::new(self.min.x, self.max.y),
            self.max,
        ]
        .into_iter()
        .any(|corner| (corner - center).dot(normal) >= -self.max_radius)
    }
}

/// The body index. One per world, never saved.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Quadtree {
    #[serde(flatten)]
    base: Base,
    #[serde(skip)]
    nodes: Vec<QuadNode>,
    #[serde(skip)]
    free: Vec<usize>,
    #[serde(skip)]
    root: usize,
    #[serde(skip)]
    leaf_of: HashMap<Entity, usize>,
    /// Lowest body extent seen.
    #[serde(skip)]
    pub min_z: f64,
    /// Highest body extent seen.
    #[serde(skip)]
    pub max_z: f64,
}

impl Default for Quadtree {
    fn default() -> Self {
        Self::new(QUADTREE_INIT_DIM)
    }
}

impl Component for Quadtree {
    const NAME: &'static str = "core.Quadtree";
    const DEFAULT_FLAGS: ComponentFlags = ComponentFlags::INTERNAL;
    component_base!();
}

impl Quadtree {
    /// An empty tree whose root spans `init_dim` units, offset slightly from
    /// the origin so that grid-aligned maps do not straddle the first split.
    #[must_use]
    pub fn new(init_dim: f64) -> Self {
        let offset = init_dim / 16.0;
        Self::with_bounds(Vec2::new(offset, offset), Vec2::new(offset + init_dim, offset + init_dim))
    }

    /// An empty tree with the given root bounds.
    #[must_use]
    pub fn with_bounds(min: Vec2, max: Vec2) -> Self {
        Self {
            base: Base::with_flags(ComponentFlags::INTERNAL),
            nodes: vec![QuadNode {
                min,
                max,
                ..QuadNode::default()
            }],
            free: Vec::new(),
            root: 0,
            leaf_of: HashMap::new(),
            min_z: 0.0,
            max_z: 0.0,
        }
    }

    /// Removes every body, keeping the root bounds.
    pub fn clear(&mut self) {
        let (min, max) = self.bounds();
        *self = Self {
            base: std::mem::take(&mut self.base),
            ..Self::with_bounds(min, max)
        };
    }

    /// Number of indexed bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.leaf_of.len()
    }

    /// Whether the tree is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leaf_of.is_empty()
    }

    /// Whether `entity` is indexed.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.leaf_of.contains_key(&entity)
    }

    /// Root bounds.
    #[must_use]
    pub fn bounds(&self) -> (Vec2, Vec2) {
        let root = &self.nodes[self.root];
        (root.min, root.max)
    }

    /// Number of live nodes, leaves included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// The stored copy of `entity`.
    #[must_use]
    pub fn item(&self, entity: Entity) -> Option<&QuadItem> {
        let leaf = *self.leaf_of.get(&entity)?;
        self.nodes[leaf].items.iter().find(|i| i.entity == entity)
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Indexes a body. A body already present is moved.
    pub fn insert(&mut self, item: QuadItem) {
        let p = item.pos.to_2d();
        if !p.is_finite() {
            warn!(entity = %item.entity, "Not indexing a body with a non-finite position");
            return;
        }
        if self.leaf_of.contains_key(&item.entity) {
            self.remove(item.entity);
        }
        while !self.nodes[self.root].contains(p) {
            self.expand_root(p);
        }
        self.descend(self.root, item, 0);
    }

    /// Re-indexes a body whose position or size changed.
    pub fn update(&mut self, item: QuadItem) {
        if let Some(&leaf) = self.leaf_of.get(&item.entity) {
            if self.nodes[leaf].contains(item.pos.to_2d()) {
                if let Some(stored) = self.nodes[leaf].items.iter_mut().find(|i| i.entity == item.entity) {
                    let radius_changed = (stored.radius - item.radius).abs() > f64::EPSILON;
                    *stored = item;
                    if radius_changed {
                        self.recalc_leaf_radius(leaf);
                        self.recalc_radii_from(self.nodes[leaf].parent);
                    }
                    self.track_z(&item);
                    return;
                }
            }
        }
        self.insert(item);
    }

    /// Removes a body. Returns the stored copy, if it was indexed.
    pub fn remove(&mut self, entity: Entity) -> Option<QuadItem> {
        let leaf = self.leaf_of.remove(&entity)?;
        let node = &mut self.nodes[leaf];
        let Some(at) = node.items.iter().position(|i| i.entity == entity) else {
            warn!(%entity, "Quadtree leaf does not hold the body it was mapped to");
            return None;
        };
        let item = node.items.swap_remove(at);
        self.recalc_leaf_radius(leaf);

        let Some(parent) = self.nodes[leaf].parent else {
            return Some(item);
        };
        self.recalc_radii_from(Some(parent));
        self.try_collapse(parent);
        Some(item)
    }

    fn descend(&mut self, mut node: usize, item: QuadItem, mut depth: u32) {
        let p = item.pos.to_2d();
        loop {
            let Some(children) = self.nodes[node].children else {
                if depth >= QUADTREE_MAX_DEPTH || self.nodes[node].items.len() < QUADTREE_LEAF_CAPACITY {
                    self.add_to_leaf(node, item);
                    return;
                }
                self.subdivide_and_redistribute(node, depth);
                continue;
            };
            match children.into_iter().find(|&c| self.nodes[c].contains(p)) {
                Some(child) => {
                    node = child;
                    depth += 1;
                }
                None => {
                    // Stale positions end up outside every child.
                    node = children[0];
                    depth += 1;
                }
            }
        }
    }

    fn add_to_leaf(&mut self, leaf: usize, item: QuadItem) {
        self.track_z(&item);
        self.increase_radii(leaf, item.radius);
        self.nodes[leaf].items.push(item);
        self.leaf_of.insert(item.entity, leaf);
    }

    fn track_z(&mut self, item: &QuadItem) {
        self.min_z = self.min_z.min(item.pos.z - item.half_height);
        self.max_z = self.max_z.max(item.pos.z + item.half_height);
    }

    fn alloc(&mut self, node: QuadNode) -> usize {
        match self.free.pop() {
            Some(i) => {
                self.nodes[i] = node;
                i
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn subdivide(&mut self, node: usize) -> [usize; 4] {
        let (min, max) = (self.nodes[node].min, self.nodes[node].max);
        let half = (min + max) * 0.5;
        let quadrant = |i: usize| {
            let (x0, x1) = if i & 1 == 0 { (min.x, half.x) } else { (half.x, max.x) };
            let (y0, y1) = if i & 2 == 0 { (min.y, half.y) } else { (half.y, max.y) };
            QuadNode {
                min: Vec2::new(x0, y0),
                max: Vec2::new(x1, y1),
                parent: Some(node),
                ..QuadNode::default()
            }
        };
        let children = [
            self.alloc(quadrant(0)),
            self.alloc(quadrant(1)),
            self.alloc(quadrant(2)),
            self.alloc(quadrant(3)),
        ];
        self.nodes[node].children = Some(children);
        children
    }

    fn subdivide_and_redistribute(&mut self, node: usize, depth: u32) {
        let items = std::mem::take(&mut self.nodes[node].items);
        let children = self.subdivide(node);
        for item in items {
            let p = item.pos.to_2d();
            let child = children
                .into_iter()
                .find(|&c| self.nodes[c].contains(p))
                .unwrap_or(children[0]);
            self.descend(child, item, depth + 1);
        }
    }

    fn expand_root(&mut self, p: Vec2) {
        let old = self.root;
        let (min, max) = (self.nodes[old].min, self.nodes[old].max);
        let size = max - min;
        let center = (min + max) * 0.5;
        let mut index = 0;
        let mut new_min = min;
        let mut new_max = max;
        if p.x < center.x {
            index |= 1;
            new_min.x = min.x - size.x;
        } else {
            new_max.x = max.x + size.x;
        }
        if p.y < center.y {
            index |= 2;
            new_min.y = min.y - size.y;
        } else {
            new_max.y = max.y + size.y;
        }
        let root = self.alloc(QuadNode {
            min: new_min,
            max: new_max,
            max_radius: self.nodes[old].max_radius,
            ..QuadNode::default()
        });
        let mut children = self.subdivide(root);
        self.free.push(children[index]);
        children[index] = old;
        self.nodes[root].children = Some(children);
        self.nodes[old].parent = Some(root);
        self.root = root;
    }

    fn increase_radii(&mut self, mut node: usize, r: f64) {
        loop {
            if r <= self.nodes[node].max_radius {
                return;
            }
            self.nodes[node].max_radius = r;
            match self.nodes[node].parent {
                Some(p) => node = p,
                None => return,
            }
        }
    }

    fn recalc_leaf_radius(&mut self, leaf: usize) {
        let node = &mut self.nodes[leaf];
        node.max_radius = node.items.iter().map(|i| i.radius).fold(0.0, f64::max);
    }

    fn recalc_radii_from(&mut self, mut node: Option<usize>) {
        while let Some(n) = node {
            if let Some(children) = self.nodes[n].children {
                self.nodes[n].max_radius = children
                    .iter()
                    .map(|&c| self.nodes[c].max_radius)
                    .fold(0.0, f64::max);
            }
            node = self.nodes[n].parent;
        }
    }

    fn try_collapse(&mut self, parent: usize) {
        let Some(children) = self.nodes[parent].children else {
            return;
        };
        if children.iter().any(|&c| self.nodes[c].children.is_some()) {
            return;
        }
        let total: usize = children.iter().map(|&c| self.nodes[c].items.len()).sum();
        if total >= QUADTREE_LEAF_CAPACITY {
            return;
        }
        let mut items = Vec::with_capacity(total);
        for c in children {
            items.append(&mut self.nodes[c].items);
            self.nodes[c] = QuadNode::default();
            self.free.push(c);
        }
        for item in &items {
            self.leaf_of.insert(item.entity, parent);
        }
        let node = &mut self.nodes[parent];
        node.children = None;
        node.items = items;
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Visits every body whose sphere reaches within `r` of `center`. The
    /// callback returns `false` to stop.
    pub fn range_circle<F: FnMut(&QuadItem) -> bool>(&self, center: Vec2, r: f64, mut f: F) {
        self.circle_at(self.root, center, r, &mut f);
    }

    fn circle_at<F: FnMut(&QuadItem) -> bool>(&self, node: usize, center: Vec2, r: f64, f: &mut F) -> bool {
        let n = &self.nodes[node];
        if !n.circle_overlaps(center, r) {
            return true;
        }
        match n.children {
            None => {
                for item in &n.items {
                    let reach = r + item.radius;
                    if item.pos.to_2d().distance_squared(center) > reach * reach {
                        continue;
                    }
                    if !f(item) {
                        return false;
                    }
                }
                true
            }
            Some(children) => children.into_iter().all(|c| self.circle_at(c, center, r, f)),
        }
    }

    /// Visits bodies starting with the leaf nearest `center`. The callback
    /// returns `false` to stop.
    ///
    /// # Returns
    ///
    /// `false` if the callback stopped the walk.
    pub fn range_closest<F: FnMut(&QuadItem) -> bool>(&self, center: Vec3, lights_only: bool, mut f: F) -> bool {
        self.closest_at(self.root, center.to_2d(), lights_only, &mut f)
    }

    fn closest_at<F: FnMut(&QuadItem) -> bool>(&self, node: usize, center: Vec2, lights_only: bool, f: &mut F) -> bool {
        let n = &self.nodes[node];
        let Some(children) = n.children else {
            return n
                .items
                .iter()
                .filter(|i| !lights_only || i.is_light)
                .all(|i| f(i));
        };
        let mid = (n.min + n.max) * 0.5;
        let mut first = 0;
        if center.x > mid.x {
            first |= 1;
        }
        if center.y > mid.y {
            first |= 2;
        }
        if !self.closest_at(children[first], center, lights_only, f) {
            return false;
        }
        (0..4)
            .filter(|&i| i != first)
            .all(|i| self.closest_at(children[i], center, lights_only, f))
    }

    /// Visits every body whose sphere overlaps the box.
    pub fn range_aabb<F: FnMut(&QuadItem) -> bool>(&self, min: Vec2, max: Vec2, mut f: F) {
        self.aabb_at(self.root, min, max, &mut f);
    }

    fn aabb_at<F: FnMut(&QuadItem) -> bool>(&self, node: usize, min: Vec2, max: Vec2, f: &mut F) -> bool {
        let n = &self.nodes[node];
        if !n.aabb_overlaps(min, max) {
            return true;
        }
        match n.children {
            None => {
                for item in &n.items {
                    let (p, r) = (item.pos, item.radius);
                    if p.x + r < min.x || p.y + r < min.y || p.x - r >= max.x || p.y - r >= max.y {
                        continue;
                    }
                    if !f(item) {
                        return false;
                    }
                }
                true
            }
            Some(children) => children.into_iter().all(|c| self.aabb_at(c, min, max, f)),
        }
    }

    /// Visits every body whose sphere reaches the half-plane through
    /// `center` that `normal` faces into.
    pub fn range_plane<F: FnMut(&QuadItem) -> bool>(&self, center: Vec2, normal: Vec2, lights_only: bool, mut f: F) {
        self.plane_at(self.root, center, normal, lights_only, &mut f);
    }

    fn plane_at<F: FnMut(&QuadItem) -> bool>(
        &self,
        node: usize,
        center: Vec2,
        normal: Vec2,
        lights_only: bool,
        f: &mut F,
    ) -> bool {
        let n = &self.nodes[node];
        if !n.plane_overlaps(center, normal) {
            return true;
        }
        match n.children {
            None => {
                for item in n.items.iter().filter(|i| !lights_only || i.is_light) {
                    if (item.pos.to_2d() - center).dot(normal) < -item.radius {
                        continue;
                    }
                    if !f(item) {
                        return false;
                    }
                }
                true
            }
            Some(children) => children
                .into_iter()
                .all(|c| self.plane_at(c, center, normal, lights_only, f)),
        }
    }
}
