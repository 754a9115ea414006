//! In-memory world: spherical actors and infinite plane walls.

use super::{Contact, Damageable, EntityId, HitCategory, World};
use crate::config::{ScenarioConfig, TargetConfig, WallConfig};
use crate::dot::{tick_dot, DotEvent, DotTracker};
use glam::Vec3;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct Actor {
    pub id: EntityId,
    pub position: Vec3,
    pub radius: f32,
    pub health: f32,
    pub max_health: f32,
    pub faction: String,
    pub velocity: Vec3,
    /// Non-damageable actors are solid blockers.
    pub damageable: bool,
    pub speed_multiplier: f32,
    pub damage_taken: f32,
    pub dots: DotTracker,
}

impl Actor {
    pub fn new(id: EntityId, position: Vec3, faction: impl Into<String>) -> Self {
        Self {
            id,
            position,
            radius: 0.5,
            health: 100.0,
            max_health: 100.0,
            faction: faction.into(),
            velocity: Vec3::ZERO,
            damageable: true,
            speed_multiplier: 1.0,
            damage_taken: 0.0,
            dots: DotTracker::default(),
        }
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius.max(0.0);
        self
    }

    pub fn with_health(mut self, health: f32) -> Self {
        self.health = health;
        self.max_health = health;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn solid(mut self) -> Self {
        self.damageable = false;
        self
    }

    fn from_config(cfg: &TargetConfig) -> Self {
        let mut a = Actor::new(cfg.id, cfg.position, cfg.faction.clone())
            .with_radius(cfg.radius)
            .with_health(cfg.health.max(0.0))
            .with_velocity(cfg.velocity);
        a.damageable = cfg.damageable;
        a
    }
}

impl Damageable for Actor {
    fn apply_damage(&mut self, amount: f32) {
        if !self.damageable || !self.is_alive() {
            return;
        }
        let amount = amount.max(0.0);
        // Overkill lowers health below zero but only counts what was left.
        self.damage_taken += amount.min(self.health);
        self.health -= amount;
    }

    /// Blockers never die.
    fn is_alive(&self) -> bool {
        !self.damageable || self.health > 0.0
    }

    fn speed_multiplier(&self) -> f32 {
        self.speed_multiplier
    }

    fn set_speed_multiplier(&mut self, value: f32) {
        self.speed_multiplier = value;
    }

    fn dots(&mut self) -> &mut DotTracker {
        &mut self.dots
    }
}

/// Plane through `point`; only the side `normal` faces is open.
#[derive(Debug, Clone, Copy)]
pub struct Wall {
    pub point: Vec3,
    pub normal: Vec3,
}

impl Wall {
    pub fn new(point: Vec3, normal: Vec3) -> Self {
        Self {
            point,
            normal: normal.normalize_or_zero(),
        }
    }

    fn from_config(cfg: &WallConfig) -> Self {
        Wall::new(cfg.point, cfg.normal)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Arena {
    actors: BTreeMap<EntityId, Actor>,
    walls: Vec<Wall>,
    friendly_pass_through: bool,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_scenario(cfg: &ScenarioConfig) -> Self {
        let mut arena = Arena::new().with_friendly_pass_through(cfg.simulation.friendly_pass_through);
        for t in &cfg.targets {
            if arena.actors.contains_key(&t.id) {
                tracing::warn!(id = %t.id, "duplicate actor id; keeping the last definition");
            }
            arena.insert(Actor::from_config(t));
        }
        for w in &cfg.walls {
            let wall = Wall::from_config(w);
            if wall.normal == Vec3::ZERO {
                tracing::warn!("wall with zero normal ignored");
                continue;
            }
            arena.add_wall(wall);
        }
        arena
    }

    pub fn with_friendly_pass_through(mut self, on: bool) -> Self {
        self.friendly_pass_through = on;
        self
    }

    pub fn insert(&mut self, actor: Actor) {
        self.actors.insert(actor.id, actor);
    }

    pub fn add_wall(&mut self, wall: Wall) {
        self.walls.push(wall);
    }

    pub fn actor(&self, id: EntityId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    pub fn actor_mut(&mut self, id: EntityId) -> Option<&mut Actor> {
        self.actors.get_mut(&id)
    }

    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values()
    }

    /// Remove an actor outright (e.g. the host despawns it).
    pub fn despawn(&mut self, id: EntityId) -> Option<Actor> {
        self.actors.remove(&id)
    }

    /// Move every live actor along its velocity, scaled by its speed multiplier.
    pub fn move_actors(&mut self, dt: f32) {
        for a in self.actors.values_mut() {
            if a.is_alive() {
                a.position += a.velocity * a.speed_multiplier * dt;
            }
        }
    }

    /// Advance every actor's DoT trackers.
    pub fn tick_dots(&mut self, dt: f32) -> Vec<(EntityId, DotEvent)> {
        let mut out = Vec::new();
        for a in self.actors.values_mut() {
            if a.dots.is_empty() {
                continue;
            }
            for ev in tick_dot(a, dt) {
                out.push((a.id, ev));
            }
        }
        out
    }

    fn live(&self, id: EntityId) -> Option<&Actor> {
        self.actors.get(&id).filter(|a| a.is_alive())
    }
}

impl World for Arena {
    fn entities_within(&self, point: Vec3, radius: f32) -> Vec<EntityId> {
        let r2 = radius.max(0.0).powi(2);
        self.actors
            .values()
            .filter(|a| a.is_alive() && a.position.distance_squared(point) <= r2)
            .map(|a| a.id)
            .collect()
    }

    fn position(&self, id: EntityId) -> Option<Vec3> {
        self.live(id).map(|a| a.position)
    }

    fn classify(&self, id: EntityId, owner: EntityId) -> HitCategory {
        let Some(actor) = self.live(id) else {
            return HitCategory::PassThrough;
        };
        if !actor.damageable {
            return HitCategory::Blocker;
        }
        if self.friendly_pass_through {
            if let Some(o) = self.actors.get(&owner) {
                if o.faction == actor.faction {
                    return HitCategory::PassThrough;
                }
            }
        }
        HitCategory::Damageable
    }

    fn sweep(&self, from: Vec3, to: Vec3) -> Vec<Contact> {
        let delta = to - from;
        let len = delta.length();
        if len <= f32::EPSILON {
            return Vec::new();
        }
        let dir = delta / len;
        let mut contacts = Vec::new();

        for a in self.actors.values().filter(|a| a.is_alive()) {
            if let Some(c) = sweep_sphere(from, dir, len, a) {
                contacts.push(c);
            }
        }
        for w in &self.walls {
            let denom = dir.dot(w.normal);
            if denom >= 0.0 {
                continue;
            }
            let s0 = (from - w.point).dot(w.normal);
            let s1 = (to - w.point).dot(w.normal);
            if s0 >= 0.0 && s1 < 0.0 {
                let t = s0 / (s0 - s1) * len;
                contacts.push(Contact {
                    entity: None,
                    point: from + dir * t,
                    normal: w.normal,
                    distance: t,
                });
            }
        }

        contacts.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.entity.cmp(&b.entity))
        });
        contacts
    }

    fn damageable_mut(&mut self, id: EntityId) -> Option<&mut dyn Damageable> {
        self.actors.get_mut(&id).map(|a| a as &mut dyn Damageable)
    }
}

/// Ray/sphere entry along `dir` within `len`. A segment starting inside a
/// damageable sphere touches it at distance 0; solid spheres only count on entry.
fn sweep_sphere(from: Vec3, dir: Vec3, len: f32, a: &Actor) -> Option<Contact> {
    let m = from - a.position;
    let b = m.dot(dir);
    let c = m.length_squared() - a.radius * a.radius;
    if c > 0.0 && b > 0.0 {
        return None;
    }
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = -b - disc.sqrt();
    if t > len {
        return None;
    }
    let (t, normal) = if t < 0.0 {
        if !a.damageable {
            return None;
        }
        (0.0, -dir)
    } else {
        let p = from + dir * t;
        let n = (p - a.position).normalize_or_zero();
        if !a.damageable && n.dot(dir) >= 0.0 {
            return None;
        }
        (t, n)
    };
    Some(Contact {
        entity: Some(a.id),
        point: from + dir * t,
        normal,
        distance: t,
    })
}
