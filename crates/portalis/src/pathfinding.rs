//! # Pathfinding
//!
//! A* over a virtual grid anchored at the start point. Grid nodes are
//! integer offsets; node `(x, y)` sits at `start + (x, y) * step`. Moves are
//! 8-directional and a move is valid when the next point fits inside the
//! current sector or one reachable through at most two portals.
//!
//! The grid is never materialized, so the search cost depends only on the
//! number of nodes expanded, which is capped by `max_nodes`.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use tracing::{debug, warn};

use portalis_core::{Entity, World};
use portalis_shared::constants::PLAYER_MOUNT_HEIGHT;
use portalis_shared::{Vec2, Vec3};

use crate::config::settings;
use crate::geometry::{InternalSegment, Sector};
use crate::physics::locate_sector;

const DIRECTIONS: [(i32, i32); 8] = [(1, 0), (-1, 0), (0, 1), (0, -1), (1, 1), (1, -1), (-1, 1), (-1, -1)];

/// Portals crossed in one grid move.
const MAX_PORTAL_DEPTH: usize = 2;

/// Ends the search when the current node is this many steps from the end.
const FINISH_STEPS: f64 = 1.5;

type NodeKey = (i32, i32);

/// A path query.
#[derive(Clone, Debug)]
pub struct Finder {
    /// Start point.
    pub start: Vec3,
    /// Goal point.
    pub end: Vec3,
    /// Grid spacing.
    pub step: f64,
    /// Required clearance from solid walls.
    pub radius: f64,
    /// Highest floor rise crossed through a portal.
    pub mount_height: f64,
    /// Sector containing `start`. Located when null.
    pub start_sector: Entity,
    /// Nodes expanded before giving up.
    pub max_nodes: usize,
}

/// Result of a search.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    /// Waypoints from the start to the end, or to the node closest to it.
    pub points: Vec<Vec3>,
    /// Whether the last point is the requested end.
    pub complete: bool,
}

impl Path {
    /// Sum of distances between consecutive points.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }
}

#[derive(Clone, Copy, Debug)]
struct Open {
    key: NodeKey,
    sector: Entity,
    total: f64,
    from_start: f64,
}

impl PartialEq for Open {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Open {}

impl PartialOrd for Open {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Open {
    // Reversed so BinaryHeap pops the lowest total cost.
    fn cmp(&self, other: &Self) -> Ordering {
        other.total.total_cmp(&self.total).then_with(|| other.key.cmp(&self.key))
    }
}

impl Finder {
    /// A query from `start` to `end` with the world's node budget.
    #[must_use]
    pub fn new(world: &World, start: Vec3, end: Vec3, step: f64, radius: f64) -> Self {
        Self {
            start,
            end,
            step,
            radius,
            mount_height: PLAYER_MOUNT_HEIGHT,
            start_sector: Entity::NULL,
            max_nodes: settings(world).path_max_nodes,
        }
    }

    fn key_to_point(&self, key: NodeKey) -> Vec3 {
        Vec3::new(
            self.start.x + f64::from(key.0) * self.step,
            self.start.y + f64::from(key.1) * self.step,
            self.start.z,
        )
    }

    /// Whether `p` lies inside `sector` and at least `radius` away from
    /// every wall a body cannot pass.
    fn fits(&self, world: &World, sector: &Sector, p: Vec2) -> bool {
        if !sector.is_point_inside_2d(p) {
            return false;
        }
        let r2 = self.radius * self.radius;
        let walls_clear = sector
            .segments
            .iter()
            .filter(|s| !s.is_passable_portal())
            .all(|s| s.segment.distance_to_point_squared(p) >= r2);
        walls_clear
            && sector
                .internal_segments
                .iter()
                .filter_map(|&e| world.get::<InternalSegment>(e))
                .filter(|w| w.is_solid())
                .all(|w| w.segment.distance_to_point_squared(p) >= r2)
    }

    /// The sector a move by `delta` to `next` lands in, or `None` if the
    /// move is blocked.
    fn sector_for_next_point(&self, world: &World, from: Entity, delta: Vec2, next: Vec2, depth: usize) -> Option<Entity> {
        let sector = world.get::<Sector>(from)?;
        if self.fits(world, sector, next) {
            return Some(from);
        }
        if depth >= MAX_PORTAL_DEPTH {
            return None;
        }
        let floor = sector.floor_z_at(next);
        for seg in sector.segments.iter().filter(|s| s.is_passable_portal()) {
            if seg.segment.normal.dot(delta) > 0.0 {
                continue;
            }
            let Some(adj) = world.get::<Sector>(seg.adjacent_sector) else {
                continue;
            };
            if adj.floor_z_at(next) - floor > self.mount_height {
                continue;
            }
            if let Some(found) = self.sector_for_next_point(world, seg.adjacent_sector, delta, next, depth + 1) {
                return Some(found);
            }
        }
        None
    }

    /// Runs the search.
    ///
    /// # Returns
    ///
    /// `None` for a non-positive step or a start outside every sector.
    /// Otherwise a [`Path`], incomplete if the end was not reached within
    /// the node budget.
    #[must_use]
    pub fn shortest_path(&self, world: &World) -> Option<Path> {
        if self.step <= 0.0 {
            return None;
        }
        let start_sector = if world.get::<Sector>(self.start_sector).is_some() {
            self.start_sector
        } else {
            let placement = locate_sector(world, self.start, 0.0)?;
            if placement.snapped {
                warn!(x = self.start.x, y = self.start.y, "Path start outside every sector");
                return None;
            }
            placement.sector
        };

        let start_key = (0, 0);
        let mut came_from: HashMap<NodeKey, NodeKey> = HashMap::new();
        let mut cost_so_far: HashMap<NodeKey, f64> = HashMap::from([(start_key, 0.0)]);
        let mut open = BinaryHeap::from([Open {
            key: start_key,
            sector: start_sector,
            total: self.start.distance(self.end),
            from_start: 0.0,
        }]);

        let finish = self.step * FINISH_STEPS;
        let diagonal = self.step * std::f64::consts::SQRT_2;
        let mut closest = (start_key, f64::INFINITY);
        let mut reached = None;
        let mut expanded = 0;

        while let Some(current) = open.pop() {
            if cost_so_far.get(&current.key).is_some_and(|&c| current.from_start > c) {
                continue;
            }
            let point = self.key_to_point(current.key);
            let to_end = point.to_2d().distance(self.end.to_2d());
            if to_end <= finish {
                reached = Some(current.key);
                break;
            }
            if to_end < closest.1 {
                closest = (current.key, to_end);
            }
            expanded += 1;
            if expanded > self.max_nodes {
                debug!(expanded, "Path search hit its node budget");
                break;
            }

            for (dx, dy) in DIRECTIONS {
                let next_key = (current.key.0 + dx, current.key.1 + dy);
                let next = self.key_to_point(next_key);
                let delta = (next - point).to_2d();
                let Some(next_sector) = self.sector_for_next_point(world, current.sector, delta, next.to_2d(), 0) else {
                    continue;
                };
                let cost = current.from_start + if dx != 0 && dy != 0 { diagonal } else { self.step };
                if cost_so_far.get(&next_key).is_some_and(|&c| cost >= c) {
                    continue;
                }
                cost_so_far.insert(next_key, cost);
                came_from.insert(next_key, current.key);
                open.push(Open {
                    key: next_key,
                    sector: next_sector,
                    total: cost + next.to_2d().distance(self.end.to_2d()),
                    from_start: cost,
                });
            }
        }

        let (last, complete) = match reached {
            Some(key) => (key, true),
            None => (closest.0, false),
        };
        let mut points = vec![self.key_to_point(last)];
        let mut key = last;
        while let Some(&prev) = came_from.get(&key) {
            points.push(self.key_to_point(prev));
            key = prev;
        }
        points.reverse();
        if complete {
            points.push(self.end);
        }
        debug!(points = points.len(), complete, expanded, "Path search finished");
        Some(Path { points, complete })
    }
}
