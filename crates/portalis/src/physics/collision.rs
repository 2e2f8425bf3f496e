//! # Body/Mobile Collision
//!
//! One call to [`Motion::collide`] resolves a mobile against its sector's
//! walls, nested sectors, teleports, floor and ceiling planes and nearby
//! bodies, for up to `collision_iterations` passes.
//!
//! The body and mobile are copied into a [`Motion`] so the world can be read
//! freely while resolving. Everything the pass changes (sector transitions,
//! other bodies, scripts) is recorded and applied by [`Motion::apply`].

use std::collections::BTreeSet;

use tracing::{debug, warn};

use portalis_core::dynamic::{event_class, EventPayload};
use portalis_core::{Component, ComponentFlags, Entity, World};
use portalis_shared::constants::INTERSECT_EPSILON;
use portalis_shared::math::{normalize_angle, RAD_TO_DEG};
use portalis_shared::{Vec2, Vec3};

use super::body_sector::{locate_sector, move_between_sectors};
use crate::components::{queue_scripts, Body, CollisionResponse, Mobile, Player, ScriptTrigger};
use crate::config::settings;
use crate::geometry::{InternalSegment, Sector, Segment};
use crate::spatial::{quadtree, update_body};

/// Something the mobile was pushed off.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Contact {
    /// A segment of a sector.
    Segment {
        /// Owning sector.
        sector: Entity,
        /// Segment index.
        index: usize,
    },
    /// A free-standing wall.
    Internal(Entity),
}

/// Which side of a segment the body is kept on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Keep {
    /// The sector interior, along the inward normal.
    Inside,
    /// The outside of a nested sector.
    Outside,
    /// Whichever side the body is already on.
    Nearest,
}

/// Changes to a body touched by the moving one.
#[derive(Clone, Copy, Debug, Default)]
struct OtherUpdate {
    entity: Entity,
    shift: Vec2,
    impulse: Vec3,
    stop: bool,
    deactivate: bool,
    remove: bool,
}

#[derive(Clone, Copy, Debug)]
struct Transition {
    from: Entity,
    to: Entity,
    teleport: bool,
}

/// A mobile body being resolved.
#[derive(Clone, Debug)]
pub struct Motion {
    /// The body entity.
    pub entity: Entity,
    /// Centre.
    pub pos: Vec3,
    /// Velocity in metres per second.
    pub vel: Vec3,
    /// Facing in degrees.
    pub angle: f64,
    /// Current sector, null while unplaced.
    pub sector: Entity,
    /// Resting on a floor.
    pub on_ground: bool,
    radius: f64,
    half_height: f64,
    mass: f64,
    elasticity: f64,
    mount_height: f64,
    cr_body: CollisionResponse,
    cr_player: CollisionResponse,
    cr_wall: CollisionResponse,
    contact_scripts: Vec<String>,
    is_player: bool,
    iterations: usize,
    max_portals: usize,
    collided: Vec<Contact>,
    transitions: Vec<Transition>,
    scripts: Vec<(Vec<String>, ScriptTrigger, Entity, Entity)>,
    others: Vec<OtherUpdate>,
    resolved: BTreeSet<Entity>,
    teleported: bool,
    deactivated: bool,
    removed: bool,
}

impl Motion {
    /// Copies the body and mobile of `entity`.
    ///
    /// # Returns
    ///
    /// `None` unless the entity has both.
    #[must_use]
    pub fn load(world: &World, entity: Entity) -> Option<Self> {
        let body = world.get::<Body>(entity)?;
        let mobile = world.get::<Mobile>(entity)?;
        let config = settings(world);
        Some(Self {
            entity,
            pos: body.pos.now,
            vel: mobile.vel.now,
            angle: body.angle.now,
            sector: body.sector_entity,
            on_ground: body.on_ground,
            radius: body.radius(),
            half_height: body.half_height(),
            mass: mobile.mass,
            elasticity: mobile.elasticity,
            mount_height: mobile.mount_height,
            cr_body: mobile.cr_body,
            cr_player: mobile.cr_player,
            cr_wall: mobile.cr_wall,
            contact_scripts: mobile.contact_scripts.clone(),
            is_player: world.has::<Player>(entity),
            iterations: config.collision_iterations,
            max_portals: config.max_portals,
            collided: Vec::new(),
            transitions: Vec::new(),
            scripts: Vec::new(),
            others: Vec::new(),
            resolved: BTreeSet::new(),
            teleported: false,
            deactivated: false,
            removed: false,
        })
    }

    /// Whether a collision response removed the body.
    #[must_use]
    pub const fn removed(&self) -> bool {
        self.removed
    }

    // =========================================================================
    // Sector transitions
    // =========================================================================

    fn switch_to(&mut self, world: &World, to: Entity, teleport: bool) {
        if to == self.sector {
            return;
        }
        self.transitions.push(Transition {
            from: self.sector,
            to,
            teleport,
        });
        self.sector = to;
        let Some(sector) = world.get::<Sector>(to) else {
            return;
        };
        if self.on_ground && sector.bottom.target.is_null() {
            let floor = sector.floor_z_at(self.pos.to_2d());
            if self.pos.z - self.half_height < floor {
                self.pos.z = floor + self.half_height;
            }
        }
    }

    /// `-1` if the body cannot step up onto `sector`'s floor here, `1` if
    /// it does not fit under its ceiling, `0` if it can enter.
    fn enterable(&self, sector: &Sector) -> i8 {
        let (floor, ceil) = sector.z_at(self.pos.to_2d());
        if self.pos.z - self.half_height + self.mount_height < floor {
            -1
        } else if self.pos.z + self.half_height >= ceil {
            1
        } else {
            0
        }
    }

    // =========================================================================
    // Walls
    // =========================================================================

    /// Pushes the body off `segment` until it is a radius away, sliding
    /// along the wall.
    fn push_back(&mut self, segment: &Segment, contact: Contact, keep: Keep) -> bool {
        let p = self.pos.to_2d();
        if segment.distance_to_point_squared(p) > self.radius * self.radius {
            return false;
        }
        let closest = segment.closest_to_point(p);
        let mut dir = p - closest;
        let mut d = dir.length();
        let mut on_keep_side = match keep {
            Keep::Inside => segment.which_side(p) > 0.0,
            Keep::Outside => segment.which_side(p) < 0.0,
            Keep::Nearest => true,
        };
        if d > INTERSECT_EPSILON {
            dir = dir * (1.0 / d);
        } else {
            dir = match keep {
                Keep::Outside => -segment.normal,
                _ => segment.normal,
            };
            d = 0.0;
            on_keep_side = true;
        }
        let shift = if on_keep_side {
            dir * (self.radius - d)
        } else {
            debug!(body = %self.entity, depth = d, "Body crossed a wall, pushing it back");
            dir * (-d - self.radius)
        };
        self.pos.x += shift.x;
        self.pos.y += shift.y;
        if d > 0.0 {
            self.vel.x += shift.x;
            self.vel.y += shift.y;
        }
        self.collided.push(contact);
        true
    }

    fn check_segments(&mut self, world: &World) {
        let Some(sector) = world.get::<Sector>(self.sector) else {
            return;
        };
        let outer = world.get::<Sector>(sector.outer);
        for seg in &sector.segments {
            let adj = if seg.is_passable_portal() {
                world.get::<Sector>(seg.adjacent_sector)
            } else {
                outer
            };
            if adj.is_some_and(|adj| self.enterable(adj) == 0) {
                continue;
            }
            let contact = Contact::Segment {
                sector: self.sector,
                index: seg.index,
            };
            self.push_back(&seg.segment, contact, Keep::Inside);
        }

        let (low, high) = (self.pos.z - self.half_height, self.pos.z + self.half_height);
        for &wall_e in &sector.internal_segments {
            let Some(wall) = world.get::<InternalSegment>(wall_e) else {
                continue;
            };
            if !wall.is_solid() || high < wall.bottom || low > wall.top {
                continue;
            }
            self.push_back(&wall.segment, Contact::Internal(wall_e), Keep::Nearest);
        }
    }

    /// Moves into nested sectors the body fits in and pushes it off the ones
    /// it does not.
    fn check_inner(&mut self, world: &World, sector_e: Entity, depth: usize) -> Entity {
        let Some(sector) = world.get::<Sector>(sector_e) else {
            return sector_e;
        };
        if depth > self.max_portals {
            return sector_e;
        }
        for &inner_e in &sector.inner {
            let Some(inner) = world.get::<Sector>(inner_e) else {
                continue;
            };
            let fits = self.enterable(inner) == 0;
            for seg in &inner.segments {
                if fits && seg.portal_is_passable {
                    continue;
                }
                let contact = Contact::Segment {
                    sector: inner_e,
                    index: seg.index,
                };
                self.push_back(&seg.segment, contact, Keep::Outside);
            }
            if fits && inner.is_point_inside_2d(self.pos.to_2d()) {
                return self.check_inner(world, inner_e, depth + 1);
            }
        }
        sector_e
    }

    fn teleport(&mut self, world: &World) -> bool {
        let Some(sector) = world.get::<Sector>(self.sector) else {
            return false;
        };
        let p = self.pos.to_2d();
        for seg in sector.segments.iter().filter(|s| s.portal_teleports && s.is_portal()) {
            if seg.segment.distance_to_point_squared(p) > self.radius * self.radius
                || seg.segment.which_side(p) >= 0.0
            {
                continue;
            }
            let Some(adj_seg) = world
                .get::<Sector>(seg.adjacent_sector)
                .and_then(|adj| seg.adjacent_segment.and_then(|i| adj.segments.get(i)))
            else {
                continue;
            };
            let (Some(local_p), Some(local_v)) = (
                seg.portal_matrix.unproject(p),
                seg.portal_matrix.unproject_vector(self.vel.to_2d()),
            ) else {
                warn!(body = %self.entity, segment = seg.index, "Degenerate teleport portal");
                continue;
            };
            let out_p = adj_seg.mirror_portal_matrix.project(local_p);
            let out_v = adj_seg.mirror_portal_matrix.project_vector(local_v);
            self.pos.x = out_p.x;
            self.pos.y = out_p.y;
            self.vel.x = out_v.x;
            self.vel.y = out_v.y;
            let n_in = seg.segment.normal;
            let n_out = adj_seg.segment.normal;
            self.angle = normalize_angle(
                self.angle - n_in.y.atan2(n_in.x) * RAD_TO_DEG + n_out.y.atan2(n_out.x) * RAD_TO_DEG + 180.0,
            );
            self.teleported = true;
            self.switch_to(world, seg.adjacent_sector, true);
            return true;
        }
        false
    }

    /// The centre left the current sector: teleport, cross a portal, fall
    /// back to the enclosing sector, or push back into whatever sector fits.
    fn exit_sector(&mut self, world: &World) {
        if self.teleport(world) {
            return;
        }
        let Some(sector) = world.get::<Sector>(self.sector) else {
            return;
        };
        let p = self.pos.to_2d();
        for seg in sector.segments.iter().filter(|s| s.is_portal()) {
            if world
                .get::<Sector>(seg.adjacent_sector)
                .is_some_and(|adj| self.enterable(adj) == 0 && adj.is_point_inside_2d(p))
            {
                self.switch_to(world, seg.adjacent_sector, false);
                return;
            }
        }

        let mut outer_e = sector.outer;
        for _ in 0..self.max_portals {
            let Some(outer) = world.get::<Sector>(outer_e) else {
                break;
            };
            if outer.is_point_inside_2d(p) {
                if self.enterable(outer) == 0 {
                    self.switch_to(world, outer_e, false);
                    return;
                }
                break;
            }
            outer_e = outer.outer;
        }

        let (low, high) = (self.pos.z - self.half_height + self.mount_height, self.pos.z + self.half_height);
        for (sector_e, candidate) in world.iter::<Sector>() {
            let (floor, ceil) = candidate.z_at(p);
            if low < floor || high >= ceil {
                continue;
            }
            for seg in &candidate.segments {
                let contact = Contact::Segment {
                    sector: sector_e,
                    index: seg.index,
                };
                self.push_back(&seg.segment, contact, Keep::Inside);
            }
        }
    }

    // =========================================================================
    // Floor and ceiling
    // =========================================================================

    fn plane_impulse(&mut self, normal: Vec3) {
        let approach = self.vel.dot(normal);
        if approach >= 0.0 || self.mass <= 0.0 {
            return;
        }
        self.vel += normal * (-(1.0 + self.elasticity) * approach);
    }

    /// Resolves the floor and ceiling, following plane portals up to the
    /// portal hop limit.
    fn collide_z(&mut self, world: &World) {
        self.on_ground = false;
        let mut hops = 0;
        loop {
            let Some(sector) = world.get::<Sector>(self.sector) else {
                return;
            };
            let p = self.pos.to_2d();
            let (floor, ceil) = sector.z_at(p);
            let bottom_target = sector.bottom.target;
            let top_target = sector.top.target;

            let crossing = if !bottom_target.is_null() && self.pos.z < floor {
                Some((bottom_target, true))
            } else if !top_target.is_null() && self.pos.z > ceil {
                Some((top_target, false))
            } else {
                None
            };

            if let Some((target_e, downward)) = crossing {
                hops += 1;
                if hops > self.max_portals {
                    warn!(body = %self.entity, sector = %self.sector, hops, "Sector plane targets form a chain too long to follow");
                    return;
                }
                let Some(target) = world.get::<Sector>(target_e) else {
                    warn!(body = %self.entity, sector = %self.sector, target = %target_e, "Sector plane targets a missing sector");
                    return;
                };
                let offset = self.pos - sector.center;
                let xy = target.center.to_2d() + offset.to_2d();
                self.pos.x = xy.x;
                self.pos.y = xy.y;
                self.pos.z = if downward {
                    target.ceil_z_at(xy) - self.half_height - 1.0
                } else {
                    target.floor_z_at(xy) + self.half_height + 1.0
                };
                self.switch_to(world, target_e, false);
                continue;
            }

            if bottom_target.is_null() && self.pos.z - self.half_height <= floor {
                let n = sector.bottom.normal;
                let depth = n.z * (floor - (self.pos.z - self.half_height));
                self.plane_impulse(n);
                self.pos += n * depth;
                self.on_ground = true;
                self.scripts
                    .push((sector.bottom.scripts.clone(), ScriptTrigger::Floor, self.sector, Entity::NULL));
            }
            if top_target.is_null() && self.pos.z + self.half_height >= ceil {
                let n = sector.top.normal;
                let depth = -n.z * (self.pos.z + self.half_height - ceil + 1.0);
                self.plane_impulse(n);
                self.pos += n * depth;
                self.scripts
                    .push((sector.top.scripts.clone(), ScriptTrigger::Ceiling, self.sector, Entity::NULL));
            }
            return;
        }
    }

    // =========================================================================
    // Bodies
    // =========================================================================

    fn body_contacts(&mut self, world: &World) {
        let Some(tree) = quadtree(world) else {
            return;
        };
        let mut candidates = Vec::new();
        tree.range_circle(self.pos.to_2d(), self.radius, |item| {
            if item.entity != self.entity {
                candidates.push(item.entity);
            }
            true
        });
        for other in candidates {
            if self.removed {
                return;
            }
            if self.resolved.contains(&other) {
                continue;
            }
            let (Some(body), Some(mobile)) = (world.get::<Body>(other), world.get::<Mobile>(other)) else {
                continue;
            };
            if !body.base().is_active() || !mobile.base().is_active() {
                continue;
            }
            let reach = self.radius + body.radius();
            if self.pos.distance_squared(body.pos.now) >= reach * reach {
                continue;
            }
            self.resolved.insert(other);
            self.scripts
                .push((self.contact_scripts.clone(), ScriptTrigger::Contact, self.sector, other));
            let other_is_player = world.has::<Player>(other);
            self.resolve_body(body, mobile, other_is_player);
        }
    }

    /// Separates two overlapping spheres in proportion to mass and applies
    /// the two-body elastic impulse.
    fn resolve_body(&mut self, body: &Body, mobile: &Mobile, other_is_player: bool) {
        let a_response = if other_is_player { self.cr_player } else { self.cr_body };
        let b_response = if self.is_player { mobile.cr_player } else { mobile.cr_body };
        let moves = |r: CollisionResponse| r.contains(CollisionResponse::BOUNCE) || r.contains(CollisionResponse::SEPARATE);
        let mut a_mass = if moves(a_response) { self.mass } else { 0.0 };
        let mut b_mass = if moves(b_response) { mobile.mass } else { 0.0 };

        let a_radius = self.radius;
        let b_radius = body.radius();
        let between = self.pos - body.pos.now;
        let distance = between.length();
        let unit = if distance > INTERSECT_EPSILON {
            between * (1.0 / distance)
        } else {
            Vec3::new(1.0, 0.0, 0.0)
        };

        let mut update = OtherUpdate {
            entity: body.base().entity,
            ..OtherUpdate::default()
        };
        let overlap = a_radius + b_radius - distance;
        if a_mass > 0.0 || b_mass > 0.0 {
            let a_weight = a_mass / (a_mass + b_mass);
            let b_weight = b_mass / (a_mass + b_mass);
            self.pos.x += unit.x * overlap * a_weight;
            self.pos.y += unit.y * overlap * a_weight;
            update.shift = unit.to_2d() * (-overlap * b_weight);
        }

        if a_response.contains(CollisionResponse::DEACTIVATE) {
            self.deactivated = true;
        }
        if a_response.contains(CollisionResponse::STOP) {
            self.vel = Vec3::ZERO;
        }
        if a_response.contains(CollisionResponse::REMOVE) {
            self.removed = true;
        }
        update.deactivate = b_response.contains(CollisionResponse::DEACTIVATE);
        update.stop = b_response.contains(CollisionResponse::STOP);
        update.remove = b_response.contains(CollisionResponse::REMOVE);

        let bounces = a_response.contains(CollisionResponse::BOUNCE) || b_response.contains(CollisionResponse::BOUNCE);
        if bounces {
            if a_response.contains(CollisionResponse::SEPARATE) {
                a_mass = 0.0;
            }
            if b_response.contains(CollisionResponse::SEPARATE) {
                b_mass = 0.0;
            }
            let approach = (self.vel - mobile.vel.now).dot(unit);
            let (a_e, b_e) = elasticities(self.elasticity, mobile.elasticity);
            if approach < 0.0 {
                if a_mass > 0.0 && b_mass > 0.0 {
                    let j = approach / (1.0 / a_mass + 1.0 / b_mass);
                    self.vel += unit * (-(1.0 + a_e) * j / a_mass);
                    update.impulse = unit * ((1.0 + b_e) * j / b_mass);
                } else if a_mass > 0.0 {
                    self.vel += unit * (-(1.0 + a_e) * approach);
                } else if b_mass > 0.0 {
                    update.impulse = unit * ((1.0 + b_e) * approach);
                }
            }
        }
        self.others.push(update);
    }

    // =========================================================================
    // Main routine
    // =========================================================================

    /// Resolves every collision of the body at its current position.
    pub fn collide(&mut self, world: &World) {
        for _ in 0..self.iterations {
            self.collided.clear();
            if world.get::<Sector>(self.sector).is_none() {
                match locate_sector(world, self.pos, self.half_height) {
                    Some(placement) => {
                        self.pos = placement.pos;
                        self.switch_to(world, placement.sector, false);
                    }
                    None => return,
                }
            }

            if !self.cr_wall.is_none() {
                self.check_segments(world);
            }

            let nested = self.check_inner(world, self.sector, 0);
            self.switch_to(world, nested, false);
            let inside = world
                .get::<Sector>(self.sector)
                .is_some_and(|s| s.is_point_inside_2d(self.pos.to_2d()));
            if !inside {
                self.exit_sector(world);
            }
            self.collide_z(world);

            self.body_contacts(world);
            if self.removed {
                return;
            }

            if self.collided.is_empty() {
                return;
            }

            let touched = std::mem::take(&mut self.collided);
            for contact in &touched {
                if let Contact::Segment { sector, index } = *contact {
                    if let Some(seg) = world.get::<Sector>(sector).and_then(|s| s.segments.get(index)) {
                        self.scripts
                            .push((seg.contact_scripts.clone(), ScriptTrigger::Wall, sector, Entity::NULL));
                    }
                }
                self.scripts
                    .push((self.contact_scripts.clone(), ScriptTrigger::Wall, self.sector, Entity::NULL));
            }

            if self.cr_wall.contains(CollisionResponse::STOP) {
                self.vel.x = 0.0;
                self.vel.y = 0.0;
            }
            if self.cr_wall.contains(CollisionResponse::BOUNCE) {
                for contact in &touched {
                    let Some(segment) = contact_segment(world, *contact) else {
                        continue;
                    };
                    let n = segment.normal.to_3d(0.0);
                    self.vel -= n * (2.0 * self.vel.dot(n));
                }
            }
            if self.cr_wall.contains(CollisionResponse::REMOVE) {
                self.removed = true;
                return;
            }
            self.collided = touched;
        }
    }

    /// Writes the resolved state back and applies every recorded side
    /// effect. A removed body is deleted.
    pub fn apply(self, world: &mut World) {
        let entity = self.entity;
        for t in &self.transitions {
            move_between_sectors(world, entity, t.from, t.to);
            if t.teleport {
                world.emit(event_class::BODY_TELEPORTED, EventPayload::Pair(entity, t.to));
            }
        }
        for (scripts, trigger, sector, other) in &self.scripts {
            queue_scripts(world, scripts, *trigger, entity, *sector, *other);
        }
        for update in &self.others {
            apply_other(world, update);
        }

        if self.removed {
            remove_body(world, entity, self.sector);
            return;
        }
        if let Some(body) = world.get_mut::<Body>(entity) {
            body.pos.now = self.pos;
            body.angle.now = self.angle;
            body.on_ground = self.on_ground;
            body.sector_entity = self.sector;
            if self.teleported {
                body.pos.prev = self.pos;
                body.angle.prev = self.angle;
            }
            if self.deactivated {
                body.base_mut().flags.remove(ComponentFlags::ACTIVE);
            }
        }
        if let Some(mobile) = world.get_mut::<Mobile>(entity) {
            mobile.vel.now = self.vel;
        }
    }
}

fn elasticities(a: f64, b: f64) -> (f64, f64) {
    if a > 0.0 || b > 0.0 {
        (a * a / (a + b), b * b / (a + b))
    } else {
        (0.0, 0.0)
    }
}

fn contact_segment(world: &World, contact: Contact) -> Option<Segment> {
    match contact {
        Contact::Segment { sector, index } => world
            .get::<Sector>(sector)
            .and_then(|s| s.segments.get(index))
            .map(|s| s.segment),
        Contact::Internal(e) => world.get::<InternalSegment>(e).map(|w| w.segment),
    }
}

fn apply_other(world: &mut World, update: &OtherUpdate) {
    if update.remove {
        let sector = world.get::<Body>(update.entity).map_or(Entity::NULL, |b| b.sector_entity);
        remove_body(world, update.entity, sector);
        return;
    }
    if let Some(body) = world.get_mut::<Body>(update.entity) {
        body.pos.now.x += update.shift.x;
        body.pos.now.y += update.shift.y;
    }
    if let Some(mobile) = world.get_mut::<Mobile>(update.entity) {
        if update.stop {
            mobile.vel.now = Vec3::ZERO;
        } else {
            mobile.vel.now += update.impulse;
        }
        if update.deactivate {
            mobile.base_mut().flags.remove(ComponentFlags::ACTIVE);
        }
    }
    update_body(world, update.entity);
}

/// Deletes a body, taking it out of its sector and the quadtree.
pub fn remove_body(world: &mut World, entity: Entity, sector: Entity) {
    if let Some(s) = world.get_mut::<Sector>(sector) {
        s.bodies.remove(&entity);
    }
    crate::spatial::remove_body(world, entity);
    world.emit(event_class::BODY_REMOVED, EventPayload::Entity(entity));
    world.delete(entity);
    debug!(body = %entity, "Removed body on collision");
}

/// Resolves every collision of the mobile body `entity` and applies the
/// result.
pub fn collide(world: &mut World, entity: Entity) {
    let Some(mut motion) = Motion::load(world, entity) else {
        return;
    };
    motion.collide(world);
    motion.apply(world);
}
