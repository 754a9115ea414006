//! Host capabilities the resolver consumes: spatial queries, hit
//! classification, swept collision, and damage delivery.
//!
//! The core never knows concrete target types. Every target variant
//! implements [`Damageable`]; the host exposes them through [`World`].

mod arena;

pub use arena::{Actor, Arena, Wall};

use crate::dot::DotTracker;
use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a projectile treats an entity it touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitCategory {
    /// Takes damage and consumes a pierce charge.
    Damageable,
    /// Ignored entirely: no hit record, no pierce charge, no termination.
    PassThrough,
    /// Solid and non-damageable: bounce or terminate.
    Blocker,
}

/// One swept-collision contact along a motion segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// `None` for level geometry.
    pub entity: Option<EntityId>,
    pub point: Vec3,
    /// Unit surface normal facing the incoming projectile.
    pub normal: Vec3,
    /// Distance from the segment start.
    pub distance: f32,
}

/// Capability interface implemented by every target variant.
pub trait Damageable {
    fn apply_damage(&mut self, amount: f32);
    fn is_alive(&self) -> bool;
    fn speed_multiplier(&self) -> f32;
    fn set_speed_multiplier(&mut self, value: f32);
    /// Damage-over-time state owned by this target.
    fn dots(&mut self) -> &mut DotTracker;
}

pub trait World {
    /// Live entities whose position lies within `radius` of `point`.
    fn entities_within(&self, point: Vec3, radius: f32) -> Vec<EntityId>;

    /// `None` once the entity is destroyed.
    fn position(&self, id: EntityId) -> Option<Vec3>;

    fn is_alive(&self, id: EntityId) -> bool {
        self.position(id).is_some()
    }

    /// Classify `id` for a projectile fired by `owner`.
    fn classify(&self, id: EntityId, owner: EntityId) -> HitCategory;

    /// Contacts along the segment `from -> to`, nearest first.
    fn sweep(&self, from: Vec3, to: Vec3) -> Vec<Contact>;

    fn damageable_mut(&mut self, id: EntityId) -> Option<&mut dyn Damageable>;

    /// Returns false when the target is gone.
    fn apply_damage(&mut self, id: EntityId, amount: f32) -> bool {
        match self.damageable_mut(id) {
            Some(t) if t.is_alive() => {
                t.apply_damage(amount);
                true
            }
            _ => false,
        }
    }
}

/// Reflect `heading` about a surface `normal`: `h - 2 (h . n) n`.
pub fn reflect(heading: Vec3, normal: Vec3) -> Vec3 {
    let n = normal.normalize_or_zero();
    heading - 2.0 * heading.dot(n) * n
}
