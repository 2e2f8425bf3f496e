//! Cutting a sector along a line.
//!
//! Vertices are classified against the splitter line, crossings become new
//! on-line vertices, and pairs of on-line vertices are bridged with two
//! opposite edges. Each resulting cycle of the edge list is a new polygon.
//!
//! See "Splitting an arbitrary polygon by a line" (D. Geier, 2015) for the
//! source and destination pairing rules.

use tracing::{info, warn};

use portalis_core::{Entity, Named, World};
use portalis_shared::intersect::segment_parameters;
use portalis_shared::Vec2;

use super::auto_portal;
use crate::components::Body;
use crate::config::settings;
use crate::geometry::{Sector, SectorSegment};

const SIDE_EPSILON: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left,
    On,
    Right,
}

#[derive(Clone, Copy, Debug)]
struct SplitEdge {
    /// Segment of the original sector this edge copies.
    source: usize,
    start: Vec2,
    side: Side,
    next: usize,
    prev: usize,
    dist_on_line: f64,
    visited: bool,
}

fn which_side(l1: Vec2, l2: Vec2, p: Vec2) -> Side {
    let ld = l2 - l1;
    let pd = p - l1;
    let d = pd.x * ld.y - pd.y * ld.x;
    if d > SIDE_EPSILON {
        Side::Right
    } else if d < -SIDE_EPSILON {
        Side::Left
    } else {
        Side::On
    }
}

struct Splitter {
    l1: Vec2,
    l2: Vec2,
    edges: Vec<SplitEdge>,
    on_line: Vec<usize>,
}

impl Splitter {
    /// Builds the edge ring, walking the polygon counter-clockwise.
    ///
    /// # Returns
    ///
    /// `false` if the line crosses an edge beyond one of its endpoints.
    fn build(&mut self, sector: &Sector) -> bool {
        let n = sector.segments.len();
        let order: Vec<usize> = if sector.winding < 0 {
            (0..n).rev().collect()
        } else {
            (0..n).collect()
        };
        for (k, &i) in order.iter().enumerate() {
            let j = order[(k + 1) % n];
            let p = sector.segments[i].p.now;
            let next = sector.segments[j].p.now;
            let start_side = which_side(self.l1, self.l2, p);
            let end_side = which_side(self.l1, self.l2, next);
            self.push(i, p, start_side);
            if start_side == Side::On {
                self.on_line.push(self.edges.len() - 1);
            } else if start_side != end_side && end_side != Side::On {
                let Some((s, t)) = segment_parameters(p, next, self.l1, self.l2) else {
                    continue;
                };
                if !(0.0..=1.0).contains(&t) {
                    return false;
                }
                self.push(i, p + (next - p) * s, Side::On);
                self.on_line.push(self.edges.len() - 1);
            }
        }
        let count = self.edges.len();
        for i in 0..count {
            let next = (i + 1) % count;
            self.edges[i].next = next;
            self.edges[next].prev = i;
        }
        true
    }

    fn push(&mut self, source: usize, start: Vec2, side: Side) {
        self.edges.push(SplitEdge {
            source,
            start,
            side,
            next: 0,
            prev: 0,
            dist_on_line: 0.0,
            visited: false,
        });
    }

    fn sort(&mut self) {
        let dir = self.l2 - self.l1;
        let l1 = self.l1;
        let edges = &self.edges;
        self.on_line
            .sort_by(|&a, &b| dir.dot(edges[a].start - l1).total_cmp(&dir.dot(edges[b].start - l1)));
        let Some(&first) = self.on_line.first() else {
            return;
        };
        let origin = self.edges[first].start;
        for &e in &self.on_line {
            self.edges[e].dist_on_line = self.edges[e].start.distance(origin);
        }
    }

    fn is_source(&self, e: usize) -> bool {
        let edge = &self.edges[e];
        let prev = &self.edges[edge.prev];
        let next = &self.edges[edge.next];
        (prev.side == Side::Left && next.side == Side::Right)
            || (prev.side == Side::Left && next.side == Side::On && next.dist_on_line < edge.dist_on_line)
            || (prev.side == Side::On && next.side == Side::Right && prev.dist_on_line < edge.dist_on_line)
    }

    fn is_destination(&self, e: usize) -> bool {
        let edge = &self.edges[e];
        let (prev, next) = (self.edges[edge.prev].side, self.edges[edge.next].side);
        matches!(
            (prev, next),
            (Side::Right, Side::Left)
                | (Side::On, Side::Left)
                | (Side::Right, Side::On)
                | (Side::Right, Side::Right)
                | (Side::Left, Side::Left)
        )
    }

    /// Bridges source and destination pairs.
    ///
    /// # Returns
    ///
    /// `false` if the bridging broke the edge ring.
    fn split(&mut self) -> bool {
        let n = self.on_line.len();
        let mut use_src: Option<usize> = None;
        let mut i = 0;
        while i < n {
            let mut src = use_src.take();
            while src.is_none() && i < n {
                let e = self.on_line[i];
                if self.is_source(e) {
                    src = Some(e);
                }
                i += 1;
            }
            let mut dst = None;
            while dst.is_none() && i < n {
                let e = self.on_line[i];
                if self.is_destination(e) {
                    dst = Some(e);
                } else {
                    i += 1;
                }
            }
            if let (Some(src), Some(dst)) = (src, dst) {
                self.bridge(src, dst);
                if !self.verify_cycles() {
                    return false;
                }
                let src_prev = self.edges[src].prev;
                if self.edges[self.edges[src_prev].prev].side == Side::Left {
                    use_src = Some(src_prev);
                } else if self.edges[self.edges[dst].next].side == Side::Right {
                    use_src = Some(dst);
                }
            }
            i += 1;
        }
        true
    }

    fn bridge(&mut self, src: usize, dst: usize) {
        let src2 = self.edges.len();
        let dst2 = src2 + 1;
        let mut src_copy = self.edges[src];
        let mut dst_copy = self.edges[dst];
        src_copy.next = dst;
        dst_copy.next = src;
        self.edges.push(src_copy);
        self.edges.push(dst_copy);

        let src_prev = self.edges[src].prev;
        self.edges[src_prev].next = src2;
        self.edges[src].prev = dst2;
        let dst_prev = self.edges[dst].prev;
        self.edges[dst_prev].next = dst2;
        self.edges[dst].prev = src2;
    }

    /// Whether every edge lies on a cycle no longer than the edge list.
    fn verify_cycles(&self) -> bool {
        for start in 0..self.edges.len() {
            let mut visitor = start;
            let mut count = 0;
            loop {
                if count > self.edges.len() {
                    return false;
                }
                visitor = self.edges[visitor].next;
                count += 1;
                if visitor == start {
                    break;
                }
            }
        }
        true
    }

    /// The polygons, as `(source segment, start)` lists.
    fn cycles(&mut self) -> Vec<Vec<(usize, Vec2)>> {
        let mut cycles = Vec::new();
        for start in 0..self.edges.len() {
            if self.edges[start].visited {
                continue;
            }
            let mut cycle = Vec::new();
            let mut visitor = start;
            loop {
                self.edges[visitor].visited = true;
                cycle.push((self.edges[visitor].source, self.edges[visitor].start));
                visitor = self.edges[visitor].next;
                if visitor == start {
                    break;
                }
            }
            cycles.push(cycle);
        }
        cycles
    }
}

/// Splits `sector` along the line through `l1` and `l2`.
///
/// Every component of the original is cloned onto each new sector entity
/// (shareable components are shared instead). Bodies inside the original
/// move to the new sector containing them. The original is deleted and the
/// world is auto-portalled.
///
/// # Returns
///
/// The new sector entities, or `None` if the line does not cut the sector
/// or cuts it only partly. Nothing changes in that case.
pub fn split_sector(world: &mut World, sector: Entity, l1: Vec2, l2: Vec2) -> Option<Vec<Entity>> {
    let original = world.get::<Sector>(sector)?;
    let mut splitter = Splitter {
        l1,
        l2,
        edges: Vec::new(),
        on_line: Vec::new(),
    };
    if !splitter.build(original) {
        warn!(%sector, "Splitter does not fully cross the sector");
        return None;
    }
    if splitter.on_line.is_empty() {
        return None;
    }
    splitter.sort();
    if !splitter.split() {
        warn!(%sector, "Sector split produced a broken edge cycle");
        return None;
    }
    let cycles = splitter.cycles();
    if cycles.len() == 1 && cycles[0].len() == original.segments.len() {
        return None;
    }

    let template = original.segments.clone();
    let grid = settings(world).light_grid;
    let base_name = world.get::<Named>(sector).map(|n| n.name.clone());
    let components = world.components_of(sector);

    let mut created = Vec::with_capacity(cycles.len());
    for (n, cycle) in cycles.iter().enumerate() {
        let entity = world.new_entity();
        for &(cid, index) in &components {
            let shareable = world.arena_dyn(cid).is_some_and(|a| a.shareable());
            let slot = if shareable {
                Some(index)
            } else {
                world.clone_component(cid, index)
            };
            if let Some(slot) = slot {
                world.attach_existing(cid, entity, slot);
            }
        }
        if let (Some(name), Some(named)) = (&base_name, world.get_mut::<Named>(entity)) {
            named.name = format!("Split {name} ({})", n + 1);
        }
        if let Some(new_sector) = world.get_mut::<Sector>(entity) {
            new_sector.bodies.clear();
            new_sector.segments = cycle
                .iter()
                .map(|&(source, start)| {
                    let mut segment = template.get(source).cloned().unwrap_or_default();
                    segment.p.set_all(start);
                    if !segment.portal_teleports {
                        segment.disconnect();
                    }
                    segment
                })
                .collect::<Vec<SectorSegment>>();
            new_sector.recalculate_with_grid(grid);
        }
        created.push(entity);
    }

    for body_e in world.owners::<Body>() {
        let Some(body) = world.get::<Body>(body_e) else {
            continue;
        };
        if body.sector_entity != sector {
            continue;
        }
        let p = body.pos.now.to_2d();
        let Some(&target) = created
            .iter()
            .find(|&&e| world.get::<Sector>(e).is_some_and(|s| s.is_point_inside_2d(p)))
        else {
            continue;
        };
        if let Some(body) = world.get_mut::<Body>(body_e) {
            body.sector_entity = target;
        }
        if let Some(s) = world.get_mut::<Sector>(target) {
            s.bodies.insert(body_e);
        }
    }

    world.delete(sector);
    auto_portal(world);
    info!(%sector, pieces = created.len(), "Split sector");
    Some(created)
}
