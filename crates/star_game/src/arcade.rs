//! Arcade physics: axis-aligned boxes, gravity, world bounds and static
//! separation.
//!
//! Bodies live in a flat `Vec` and are addressed by `BodyId`. A step runs in
//! fixed phases so results never depend on registration order across phases:
//!
//!   1. clear contact flags, integrate gravity and velocity for movers
//!   2. clamp movers against the world bounds (`blocked` flags)
//!   3. colliders: push movers out of static bodies, Y first then X
//!      (`touching` flags, bounce)
//!   4. overlaps: report intersecting pairs, no motion change
//!
//! Separation is axis-separable like a tile move-and-slide: the vertical
//! overlap is resolved first because gravity is vertical, then the horizontal
//! overlap with the corrected Y position. An overlap deeper than the distance
//! the mover travelled this step (plus a small bias) is not treated as a hit
//! on that axis, which is what lets a body walking into a ledge resolve
//! sideways instead of being popped on top of it.

use glam::Vec2;

/// Extra depth tolerated on top of the per-step travel before an overlap is
/// considered "already embedded" on that axis.
const OVERLAP_BIAS: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColliderId(usize);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Contacts {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl Contacts {
    #[cfg(test)]
    pub fn any(&self) -> bool {
        self.up || self.down || self.left || self.right
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Dynamic,
    /// Never moves, ignores gravity and velocity.
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }
}

#[derive(Debug, Clone)]
pub struct Body {
    pub kind: BodyKind,
    /// Top-left corner.
    pub position: Vec2,
    pub size: Vec2,
    pub velocity: Vec2,
    pub bounce: Vec2,
    pub allow_gravity: bool,
    pub collide_world_bounds: bool,
    /// Disabled bodies are skipped by every phase of a step.
    pub enabled: bool,
    /// Contacts with other bodies during the last step.
    pub touching: Contacts,
    /// Contacts with the world bounds during the last step.
    pub blocked: Contacts,
    prev_position: Vec2,
}

impl Body {
    fn new(kind: BodyKind, center: Vec2, size: Vec2) -> Self {
        let position = center - size * 0.5;
        Self {
            kind,
            position,
            size,
            velocity: Vec2::ZERO,
            bounce: Vec2::ZERO,
            allow_gravity: kind == BodyKind::Dynamic,
            collide_world_bounds: false,
            enabled: true,
            touching: Contacts::default(),
            blocked: Contacts::default(),
            prev_position: position,
        }
    }

    pub fn is_static(&self) -> bool {
        self.kind == BodyKind::Static
    }

    pub fn center(&self) -> Vec2 {
        self.position + self.size * 0.5
    }

    pub fn left(&self) -> f32 {
        self.position.x
    }

    pub fn right(&self) -> f32 {
        self.position.x + self.size.x
    }

    pub fn top(&self) -> f32 {
        self.position.y
    }

    pub fn bottom(&self) -> f32 {
        self.position.y + self.size.y
    }

    /// Movement applied during the last step.
    pub fn delta(&self) -> Vec2 {
        self.position - self.prev_position
    }

    pub fn on_floor(&self) -> bool {
        self.touching.down || self.blocked.down
    }

    /// Strict AABB test: boxes that only share an edge do not intersect.
    pub fn intersects(&self, other: &Body) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairKind {
    /// Resolve interpenetration.
    Collide,
    /// Only report intersection.
    Overlap,
}

#[derive(Debug, Clone)]
struct Pair {
    kind: PairKind,
    a: Vec<BodyId>,
    b: Vec<BodyId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapEvent {
    pub collider: ColliderId,
    pub a: BodyId,
    pub b: BodyId,
}

/// Set of static bodies created together, e.g. the platforms.
#[derive(Debug, Clone, Default)]
pub struct StaticGroup {
    members: Vec<BodyId>,
}

impl StaticGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, world: &mut World, center: Vec2, size: Vec2) -> BodyId {
        let id = world.add_static(center, size);
        self.members.push(id);
        id
    }

    pub fn ids(&self) -> &[BodyId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct World {
    pub bounds: Rect,
    pub gravity: Vec2,
    bodies: Vec<Body>,
    pairs: Vec<Pair>,
}

impl World {
    pub fn new(bounds: Rect, gravity: Vec2) -> Self {
        Self {
            bounds,
            gravity,
            bodies: Vec::new(),
            pairs: Vec::new(),
        }
    }

    pub fn add_dynamic(&mut self, center: Vec2, size: Vec2) -> BodyId {
        self.push(Body::new(BodyKind::Dynamic, center, size))
    }

    pub fn add_static(&mut self, center: Vec2, size: Vec2) -> BodyId {
        self.push(Body::new(BodyKind::Static, center, size))
    }

    fn push(&mut self, body: Body) -> BodyId {
        self.bodies.push(body);
        BodyId(self.bodies.len() - 1)
    }

    pub fn body(&self, id: BodyId) -> &Body {
        &self.bodies[id.0]
    }

    pub fn body_mut(&mut self, id: BodyId) -> &mut Body {
        &mut self.bodies[id.0]
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyId, &Body)> {
        self.bodies.iter().enumerate().map(|(i, b)| (BodyId(i), b))
    }

    pub fn active_body_count(&self) -> usize {
        self.bodies.iter().filter(|b| b.enabled).count()
    }

    /// Re-derive a static body's extents after its sprite was moved or scaled.
    pub fn refresh_body(&mut self, id: BodyId, center: Vec2, size: Vec2) {
        let body = &mut self.bodies[id.0];
        body.size = size;
        body.position = center - size * 0.5;
        body.prev_position = body.position;
    }

    /// Take a body out of the simulation for good, e.g. a collected item.
    pub fn disable(&mut self, id: BodyId) {
        let body = &mut self.bodies[id.0];
        body.enabled = false;
        body.velocity = Vec2::ZERO;
        body.touching = Contacts::default();
        body.blocked = Contacts::default();
    }

    /// Separate the bodies of `a` from the bodies of `b`. Every pair must
    /// include at least one static body.
    pub fn add_collider(&mut self, a: &[BodyId], b: &[BodyId]) -> Result<ColliderId, String> {
        for &ia in a {
            for &ib in b {
                if !self.body(ia).is_static() && !self.body(ib).is_static() {
                    return Err(format!(
                        "Collider rejected: bodies {} and {} are both dynamic",
                        ia.0, ib.0
                    ));
                }
            }
        }
        Ok(self.push_pair(PairKind::Collide, a, b))
    }

    /// Report intersections between `a` and `b` without resolving them.
    pub fn add_overlap(&mut self, a: &[BodyId], b: &[BodyId]) -> ColliderId {
        self.push_pair(PairKind::Overlap, a, b)
    }

    fn push_pair(&mut self, kind: PairKind, a: &[BodyId], b: &[BodyId]) -> ColliderId {
        self.pairs.push(Pair {
            kind,
            a: a.to_vec(),
            b: b.to_vec(),
        });
        ColliderId(self.pairs.len() - 1)
    }

    /// Advance the simulation by `dt` seconds and return the overlaps found.
    pub fn step(&mut self, dt: f32) -> Vec<OverlapEvent> {
        let gravity = self.gravity;
        let bounds = self.bounds;
        for body in self.bodies.iter_mut() {
            if !body.enabled || body.is_static() {
                continue;
            }
            body.touching = Contacts::default();
            body.blocked = Contacts::default();
            body.prev_position = body.position;

            if body.allow_gravity {
                body.velocity += gravity * dt;
            }
            body.position += body.velocity * dt;

            if body.collide_world_bounds {
                clamp_to_bounds(body, bounds);
            }
        }

        let rest_speed = gravity.length() * dt * 4.0;
        for pair_index in 0..self.pairs.len() {
            if self.pairs[pair_index].kind != PairKind::Collide {
                continue;
            }
            let (a, b) = {
                let pair = &self.pairs[pair_index];
                (pair.a.clone(), pair.b.clone())
            };
            for &ia in &a {
                for &ib in &b {
                    self.separate(ia, ib, rest_speed);
                }
            }
        }

        let mut events = Vec::new();
        for (pair_index, pair) in self.pairs.iter().enumerate() {
            if pair.kind != PairKind::Overlap {
                continue;
            }
            for &ia in &pair.a {
                for &ib in &pair.b {
                    if ia == ib {
                        continue;
                    }
                    let (body_a, body_b) = (&self.bodies[ia.0], &self.bodies[ib.0]);
                    if body_a.enabled && body_b.enabled && body_a.intersects(body_b) {
                        events.push(OverlapEvent {
                            collider: ColliderId(pair_index),
                            a: ia,
                            b: ib,
                        });
                    }
                }
            }
        }
        events
    }

    fn separate(&mut self, ia: BodyId, ib: BodyId, rest_speed: f32) -> bool {
        if ia == ib {
            return false;
        }
        let (mover_id, solid_id) = match (self.body(ia).is_static(), self.body(ib).is_static()) {
            (false, true) => (ia, ib),
            (true, false) => (ib, ia),
            _ => return false,
        };
        let solid = self.bodies[solid_id.0].clone();
        let mover = &mut self.bodies[mover_id.0];
        if !mover.enabled || !solid.enabled || !mover.intersects(&solid) {
            return false;
        }

        let resolved_y = separate_y(mover, &solid, rest_speed);
        let resolved_x = mover.intersects(&solid) && separate_x(mover, &solid);
        resolved_y || resolved_x
    }
}

fn separate_y(mover: &mut Body, solid: &Body, rest_speed: f32) -> bool {
    let dy = mover.delta().y;
    let overlap = if dy > 0.0 {
        mover.bottom() - solid.top()
    } else if dy < 0.0 {
        mover.top() - solid.bottom()
    } else {
        return false;
    };
    if overlap == 0.0 || overlap.abs() > dy.abs() + OVERLAP_BIAS {
        return false;
    }

    mover.position.y -= overlap;
    if overlap > 0.0 {
        mover.touching.down = true;
    } else {
        mover.touching.up = true;
    }

    let moving_into = (overlap > 0.0 && mover.velocity.y > 0.0)
        || (overlap < 0.0 && mover.velocity.y < 0.0);
    if moving_into {
        let rebound = -mover.velocity.y * mover.bounce.y;
        mover.velocity.y = if rebound.abs() < rest_speed { 0.0 } else { rebound };
    }
    true
}

fn separate_x(mover: &mut Body, solid: &Body) -> bool {
    let dx = mover.delta().x;
    let overlap = if dx > 0.0 {
        mover.right() - solid.left()
    } else if dx < 0.0 {
        mover.left() - solid.right()
    } else {
        return false;
    };
    if overlap == 0.0 || overlap.abs() > dx.abs() + OVERLAP_BIAS {
        return false;
    }

    mover.position.x -= overlap;
    if overlap > 0.0 {
        mover.touching.right = true;
    } else {
        mover.touching.left = true;
    }

    let moving_into = (overlap > 0.0 && mover.velocity.x > 0.0)
        || (overlap < 0.0 && mover.velocity.x < 0.0);
    if moving_into {
        mover.velocity.x = -mover.velocity.x * mover.bounce.x;
    }
    true
}

fn clamp_to_bounds(body: &mut Body, bounds: Rect) {
    if body.left() < bounds.x {
        body.position.x = bounds.x;
        body.velocity.x = -body.velocity.x * body.bounce.x;
        body.blocked.left = true;
    } else if body.right() > bounds.right() {
        body.position.x = bounds.right() - body.size.x;
        body.velocity.x = -body.velocity.x * body.bounce.x;
        body.blocked.right = true;
    }

    if body.top() < bounds.y {
        body.position.y = bounds.y;
        body.velocity.y = -body.velocity.y * body.bounce.y;
        body.blocked.up = true;
    } else if body.bottom() > bounds.bottom() {
        body.position.y = bounds.bottom() - body.size.y;
        body.velocity.y = -body.velocity.y * body.bounce.y;
        body.blocked.down = true;
    }
}
