//! Projectile resolution state machine.
//!
//! `Flying -> Hit -> {pierce-continue, terminate}`,
//! `Flying -> Blocker -> {bounce, terminate}`,
//! `Flying -> lifetime/owner gone -> terminate`.
//!
//! A hit applies base damage, then side effects in a fixed order:
//! elemental DoT on the struck target, explosion AoE, shock chain.
//! Chain selection excludes the struck target, and AoE never applies DoT.

mod events;

pub use events::{CombatEvent, CombatEventKind, DestroyReason};

use crate::chain::resolve_chain;
use crate::config::{HOMING_ACQUIRE_RANGE, MAX_CONTACTS_PER_STEP};
use crate::dot::{apply_burn, apply_freeze, apply_poison, Element};
use crate::projectile::ProjectileState;
use crate::util::finite_or;
use crate::world::{reflect, Contact, EntityId, HitCategory, World};
use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileOutcome {
    Continue,
    Destroyed,
}

/// What the hit handler decided for the projectile.
enum HitResult {
    Pierced,
    Terminated,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct ProjectileResolver {
    acquire_range: f32,
    events: Vec<CombatEvent>,
}

impl Default for ProjectileResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectileResolver {
    pub fn new() -> Self {
        Self {
            acquire_range: HOMING_ACQUIRE_RANGE,
            events: Vec::new(),
        }
    }

    pub fn with_acquire_range(mut self, range: f32) -> Self {
        self.acquire_range = finite_or(range, HOMING_ACQUIRE_RANGE).max(0.0);
        self
    }

    /// Events recorded since the last drain, in resolution order.
    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[CombatEvent] {
        &self.events
    }

    fn record(&mut self, p: &ProjectileState, kind: CombatEventKind) {
        self.events.push(CombatEvent {
            projectile: p.id,
            kind,
        });
    }

    fn finish(&mut self, p: &mut ProjectileState, reason: DestroyReason) -> ProjectileOutcome {
        p.destroy();
        tracing::debug!(projectile = p.id, ?reason, "projectile destroyed");
        self.record(
            p,
            CombatEventKind::Destroyed {
                reason,
                position: p.position,
            },
        );
        ProjectileOutcome::Destroyed
    }

    /// Advance one projectile by `dt`, resolving every contact along the way.
    pub fn advance<W: World + ?Sized>(
        &mut self,
        p: &mut ProjectileState,
        world: &mut W,
        dt: f32,
    ) -> ProjectileOutcome {
        if p.is_destroyed() {
            return ProjectileOutcome::Destroyed;
        }
        if !world.is_alive(p.owner) {
            return self.finish(p, DestroyReason::OwnerGone);
        }
        if p.lifetime_remaining <= 0.0 {
            return self.finish(p, DestroyReason::Expired);
        }
        let dt = finite_or(dt, 0.0).max(0.0);
        // The last step only flies what is left of the lifetime.
        let flight = dt.min(p.lifetime_remaining);
        p.lifetime_remaining -= dt;

        self.steer(p, &*world, dt);

        let mut travel = p.speed * flight;
        let mut handled = 0usize;
        'motion: while travel > 0.0 {
            let from = p.position;
            let to = from + p.heading * travel;
            // Where the projectile rests if the contact limit cuts this sweep short.
            let mut rest = from;
            for c in world.sweep(from, to) {
                if handled >= MAX_CONTACTS_PER_STEP {
                    tracing::warn!(projectile = p.id, "contact limit reached in one step");
                    p.position = rest;
                    break 'motion;
                }
                let category = match c.entity {
                    Some(id) if id == p.owner || p.hit_set.contains(&id) => continue,
                    Some(id) => world.classify(id, p.owner),
                    None => HitCategory::Blocker,
                };
                match category {
                    HitCategory::PassThrough => continue,
                    HitCategory::Damageable => {
                        handled += 1;
                        let Some(id) = c.entity else { continue };
                        match self.on_hit(p, world, id, c.point) {
                            HitResult::Pierced => {
                                rest = c.point;
                                continue;
                            }
                            HitResult::Terminated => {
                                p.position = c.point;
                                return self.finish(p, DestroyReason::Impact);
                            }
                            HitResult::Cancelled => {
                                p.position = c.point;
                                return self.finish(p, DestroyReason::OwnerGone);
                            }
                        }
                    }
                    HitCategory::Blocker => {
                        handled += 1;
                        if self.on_blocker(p, &*world, &c) {
                            travel -= c.distance;
                            continue 'motion;
                        }
                        return self.finish(p, DestroyReason::BounceExhausted);
                    }
                }
            }
            p.position = to;
            break;
        }
        tracing::trace!(projectile = p.id, position = ?p.position, "moved");
        if p.lifetime_remaining <= 0.0 {
            return self.finish(p, DestroyReason::Expired);
        }
        ProjectileOutcome::Continue
    }

    /// Rotate heading toward the homing target by a lerp factor of `strength * dt`.
    fn steer<W: World + ?Sized>(&mut self, p: &mut ProjectileState, world: &W, dt: f32) {
        let Some(h) = p.homing else {
            return;
        };
        if h.needs_acquire {
            self.acquire(p, world);
        }
        let Some(h) = p.homing.as_mut() else {
            return;
        };
        let Some(target) = h.target else {
            return;
        };
        let Some(target_pos) = world.position(target) else {
            // Target gone between frames: fly straight.
            h.target = None;
            return;
        };
        let desired = (target_pos - p.position).normalize_or_zero();
        if desired == Vec3::ZERO {
            return;
        }
        let t = (h.strength * dt).clamp(0.0, 1.0);
        let steered = p.heading.lerp(desired, t).normalize_or_zero();
        if steered != Vec3::ZERO {
            p.heading = steered;
        }
    }

    /// Pick the nearest valid target not yet hit by this projectile.
    fn acquire<W: World + ?Sized>(&mut self, p: &mut ProjectileState, world: &W) {
        let pos = p.position;
        let owner = p.owner;
        let target = world
            .entities_within(pos, self.acquire_range)
            .into_iter()
            .filter(|&id| id != owner && !p.hit_set.contains(&id))
            .filter(|&id| world.classify(id, owner) == HitCategory::Damageable)
            .filter_map(|id| world.position(id).map(|q| (id, q.distance_squared(pos))))
            .min_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
            .map(|(id, _)| id);
        if let Some(h) = p.homing.as_mut() {
            h.target = target;
            h.needs_acquire = false;
        }
        if let Some(t) = target {
            tracing::debug!(projectile = p.id, target = %t, "homing target acquired");
            self.record(p, CombatEventKind::HomingAcquired { target: t });
        }
    }

    fn on_hit<W: World + ?Sized>(
        &mut self,
        p: &mut ProjectileState,
        world: &mut W,
        id: EntityId,
        point: Vec3,
    ) -> HitResult {
        p.hit_set.insert(id);
        // Position before damage; the seed of a chain may die from this hit.
        let seed_position = world.position(id).unwrap_or(point);
        world.apply_damage(id, p.damage);
        tracing::debug!(projectile = p.id, target = %id, damage = p.damage, critical = p.critical, "hit");
        self.record(
            p,
            CombatEventKind::Hit {
                target: id,
                damage: p.damage,
                critical: p.critical,
            },
        );

        // (a) elemental DoT on the struck target only
        self.apply_elements(p, world, id);

        // (b) explosion
        if let Some(ex) = p.explosive {
            if !world.is_alive(p.owner) {
                return HitResult::Cancelled;
            }
            let victims: Vec<EntityId> = world
                .entities_within(point, ex.radius)
                .into_iter()
                .filter(|&e| e != p.owner)
                .filter(|&e| world.classify(e, p.owner) == HitCategory::Damageable)
                .collect();
            for &v in &victims {
                world.apply_damage(v, ex.damage);
            }
            self.record(
                p,
                CombatEventKind::Explosion {
                    center: point,
                    radius: ex.radius,
                    damage: ex.damage,
                    targets: victims,
                },
            );
        }

        // (c) shock chain seeded at the struck target
        if let Some(shock) = p.shock {
            if !world.is_alive(p.owner) {
                return HitResult::Cancelled;
            }
            let hops = resolve_chain(world, id, seed_position, p.owner, &shock);
            for hop in hops {
                self.record(p, CombatEventKind::Chain(hop));
            }
        }

        if p.piercing_remaining > 0 {
            p.piercing_remaining -= 1;
            self.record(
                p,
                CombatEventKind::Pierce {
                    target: id,
                    remaining: p.piercing_remaining,
                },
            );
            if let Some(h) = p.homing.as_mut() {
                if h.target == Some(id) {
                    h.needs_acquire = true;
                }
            }
            HitResult::Pierced
        } else {
            HitResult::Terminated
        }
    }

    fn apply_elements<W: World + ?Sized>(&mut self, p: &ProjectileState, world: &mut W, id: EntityId) {
        let owner = p.owner;
        let mut applied = Vec::new();
        if let Some(target) = world.damageable_mut(id) {
            if let Some(b) = p.burn {
                apply_burn(&mut *target, b.dps, b.duration, owner);
                applied.push(Element::Burn);
            }
            if let Some(q) = p.poison {
                apply_poison(&mut *target, q.dps, q.duration, owner);
                applied.push(Element::Poison);
            }
            if let Some(f) = p.freeze {
                apply_freeze(&mut *target, f.slow_percent, f.duration, owner);
                applied.push(Element::Freeze);
            }
        }
        for element in applied {
            self.record(p, CombatEventKind::DotApplied { target: id, element });
        }
    }

    /// Returns true when the projectile bounced and keeps flying.
    fn on_blocker<W: World + ?Sized>(&mut self, p: &mut ProjectileState, world: &W, c: &Contact) -> bool {
        p.position = c.point;
        if p.bounces_remaining == 0 {
            return false;
        }
        p.bounces_remaining -= 1;
        let reflected = reflect(p.heading, c.normal).normalize_or_zero();
        if reflected != Vec3::ZERO {
            p.heading = reflected;
        }
        self.record(
            p,
            CombatEventKind::Bounce {
                point: c.point,
                heading: p.heading,
                remaining: p.bounces_remaining,
            },
        );
        if p.homing.is_some() {
            // Never keep the pre-bounce target.
            self.acquire(p, world);
        }
        true
    }
}

#[cfg(test)]
mod tests;
