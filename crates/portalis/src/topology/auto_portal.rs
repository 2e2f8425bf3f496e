//! Automatic portal coupling.
//!
//! Two segments from different sectors become a portal pair when they
//! coincide. Collinear segments that only partly overlap are split at each
//! other's endpoints until the overlapping pieces coincide.

use tracing::{debug, info};

use portalis_core::{Entity, World};
use portalis_shared::constants::INTERSECT_EPSILON;
use portalis_shared::Vec2;

use super::{put_sector, realize_adjacency, sector_entities, take_sector};
use crate::config::settings;
use crate::geometry::Sector;

fn along(p: Vec2, axis: usize) -> f64 {
    if axis == 0 {
        p.x
    } else {
        p.y
    }
}

/// Compares one segment of each sector. Coincident segments are coupled;
/// collinear overlapping ones are split.
///
/// # Returns
///
/// `true` if either sector was split, so segment indices have shifted.
fn check_segment_pair(
    a_e: Entity,
    a: &mut Sector,
    ia: usize,
    b_e: Entity,
    b: &mut Sector,
    ib: usize,
    grid: f64,
) -> bool {
    let sa = a.segments[ia].segment;
    let sb = b.segments[ib].segment;

    if sa.matches(&sb) {
        a.segments[ia].adjacent_sector = b_e;
        a.segments[ia].adjacent_segment = Some(ib);
        b.segments[ib].adjacent_sector = a_e;
        b.segments[ib].adjacent_segment = Some(ia);
        return false;
    }

    let a_delta = sa.a - sa.b;
    let c1 = a_delta.cross(sa.a - sb.b);
    let c2 = a_delta.cross(sa.a - sb.a);
    if c1.abs() > INTERSECT_EPSILON || c2.abs() > INTERSECT_EPSILON {
        return false;
    }

    let x_range = (sa.a.x - sa.b.x).abs().max((sb.a.x - sb.b.x).abs());
    let y_range = (sa.a.y - sa.b.y).abs().max((sb.a.y - sb.b.y).abs());
    let axis = usize::from(y_range > x_range);

    let (mut a1, mut a2) = (sa.a, sa.b);
    let a_swap = along(a2, axis) < along(a1, axis);
    if a_swap {
        std::mem::swap(&mut a1, &mut a2);
    }
    let (mut b1, mut b2) = (sb.a, sb.b);
    let b_swap = along(b2, axis) < along(b1, axis);
    if b_swap {
        std::mem::swap(&mut b1, &mut b2);
    }
    let (a1v, a2v, b1v, b2v) = (along(a1, axis), along(a2, axis), along(b1, axis), along(b2, axis));

    let mut split = false;

    // a1──b1──a2
    if b1v > a1v && b1v < a2v {
        split = true;
        let second = a.split_segment(ia, b1, grid);
        // a1──b1──b2──a2
        if b2v < a2v {
            let piece = if a_swap { Some(ia) } else { second };
            if let Some(piece) = piece {
                a.split_segment(piece, b2, grid);
            }
        }
    } else if b2v > a1v && b2v < a2v {
        // b1──a1──b2──a2
        split = true;
        a.split_segment(ia, b2, grid);
    }

    // b1──a1──b2
    if a1v > b1v && a1v < b2v {
        split = true;
        let second = b.split_segment(ib, a1, grid);
        // b1──a1──a2──b2
        if a2v < b2v {
            let piece = if b_swap { Some(ib) } else { second };
            if let Some(piece) = piece {
                b.split_segment(piece, a2, grid);
            }
        }
    } else if a2v > b1v && a2v < b2v {
        // a1──b1──a2──b2
        split = true;
        b.split_segment(ib, a2, grid);
    }

    if split {
        debug!(a = %a_e, b = %b_e, "Split collinear segments");
    }
    split
}

fn auto_portal_pair(a_e: Entity, a: &mut Sector, b_e: Entity, b: &mut Sector, grid: f64) -> usize {
    let mut splits = 0;
    'restart: loop {
        for ia in 0..a.segments.len() {
            for ib in 0..b.segments.len() {
                if a.segments[ia].portal_teleports || b.segments[ib].portal_teleports {
                    continue;
                }
                if check_segment_pair(a_e, a, ia, b_e, b, ib, grid) {
                    splits += 1;
                    continue 'restart;
                }
            }
        }
        return splits;
    }
}

/// Couples every pair of coincident segments in the world, splitting
/// partially overlapping collinear segments first. Teleporting portals are
/// left as authored.
///
/// Running it twice makes no further change.
pub fn auto_portal(world: &mut World) {
    let grid = settings(world).light_grid;
    let entities = sector_entities(world);
    for &entity in &entities {
        if let Some(sector) = world.get_mut::<Sector>(entity) {
            for seg in sector.segments.iter_mut().filter(|s| !s.portal_teleports) {
                seg.disconnect();
            }
        }
    }

    let mut splits = 0;
    for (i, &a_e) in entities.iter().enumerate() {
        for &b_e in &entities[i + 1..] {
            let overlap = match (world.get::<Sector>(a_e), world.get::<Sector>(b_e)) {
                (Some(a), Some(b)) => a.aabb_intersect(b.min, b.max, true),
                _ => false,
            };
            if !overlap {
                continue;
            }
            let (Some(mut a), Some(mut b)) = (take_sector(world, a_e), take_sector(world, b_e)) else {
                continue;
            };
            splits += auto_portal_pair(a_e, &mut a, b_e, &mut b, grid);
            put_sector(world, a_e, a);
            put_sector(world, b_e, b);
        }
    }

    realize_adjacency(world);
    info!(sectors = entities.len(), splits, "Auto-portalled sectors");
}
