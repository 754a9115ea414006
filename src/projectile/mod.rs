//! Per-shot runtime state, built from a stat snapshot at fire time.

use crate::config::MAX_CHAIN_COUNT;
use crate::stats::StatBlock;
use crate::util::finite_or;
use crate::world::EntityId;
use glam::Vec3;
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Explosion {
    pub radius: f32,
    pub damage: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DotPayload {
    pub dps: f32,
    pub duration: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FreezePayload {
    pub slow_percent: f32,
    pub duration: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShockPayload {
    pub range: f32,
    pub count: u32,
    pub damage: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homing {
    pub strength: f32,
    /// Current pursuit target; `None` flies straight.
    pub target: Option<EntityId>,
    /// Set when the target must be (re)selected on the next motion step.
    pub needs_acquire: bool,
}

/// Values captured at fire time so [`ProjectileState::reset`] can rewind.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Spawn {
    origin: Vec3,
    heading: Vec3,
    lifetime: f32,
    piercing: u32,
    bounces: u32,
}

#[derive(Debug, Clone)]
pub struct ProjectileState {
    pub id: u64,
    pub owner: EntityId,
    pub position: Vec3,
    /// Unit direction of travel.
    pub heading: Vec3,
    pub speed: f32,
    pub lifetime_remaining: f32,
    pub damage: f32,
    pub critical: bool,
    pub piercing_remaining: u32,
    pub bounces_remaining: u32,
    pub homing: Option<Homing>,
    pub explosive: Option<Explosion>,
    pub burn: Option<DotPayload>,
    pub poison: Option<DotPayload>,
    pub freeze: Option<FreezePayload>,
    pub shock: Option<ShockPayload>,
    /// Targets already damaged directly by this projectile.
    pub hit_set: BTreeSet<EntityId>,
    destroyed: bool,
    spawn: Spawn,
}

impl ProjectileState {
    /// Build from a stat snapshot. `critical` is the already-rolled crit result.
    pub fn from_stats(
        stats: &StatBlock,
        origin: Vec3,
        heading: Vec3,
        owner: EntityId,
        critical: bool,
    ) -> Self {
        let origin = if origin.is_finite() { origin } else { Vec3::ZERO };
        let heading = sanitize_heading(heading);
        let base = stats.total_damage().max(0.0);
        let damage = if critical {
            base * stats.crit_damage_multiplier.max(1.0)
        } else {
            base
        };
        let lifetime = stats.total_lifetime();

        let explosive = (stats.is_explosive && stats.explosion_radius > 0.0).then(|| Explosion {
            radius: stats.explosion_radius,
            damage: stats.explosion_damage.max(0.0),
        });
        let homing = (stats.is_homing && stats.homing_strength > 0.0).then(|| Homing {
            strength: stats.homing_strength,
            target: None,
            needs_acquire: true,
        });
        let burn = (stats.burn.unlocked && stats.burn.duration > 0.0).then(|| DotPayload {
            dps: stats.burn.dps.max(0.0),
            duration: stats.burn.duration,
        });
        let poison = (stats.poison.unlocked && stats.poison.duration > 0.0).then(|| DotPayload {
            dps: stats.poison.dps.max(0.0),
            duration: stats.poison.duration,
        });
        let freeze = (stats.freeze.unlocked && stats.freeze.duration > 0.0).then(|| FreezePayload {
            slow_percent: stats.freeze.slow_percent,
            duration: stats.freeze.duration,
        });
        let shock = (stats.shock.unlocked
            && stats.shock.chain_count > 0
            && stats.shock.chain_range > 0.0)
            .then(|| ShockPayload {
                range: stats.shock.chain_range,
                count: stats.shock.chain_count.min(MAX_CHAIN_COUNT),
                damage: stats.shock.chain_damage.max(0.0),
            });

        Self {
            id: 0,
            owner,
            position: origin,
            heading,
            speed: stats.total_velocity(),
            lifetime_remaining: lifetime,
            damage,
            critical,
            piercing_remaining: stats.piercing_count,
            bounces_remaining: stats.bounce_count,
            homing,
            explosive,
            burn,
            poison,
            freeze,
            shock,
            hit_set: BTreeSet::new(),
            destroyed: false,
            spawn: Spawn {
                origin,
                heading,
                lifetime,
                piercing: stats.piercing_count,
                bounces: stats.bounce_count,
            },
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub(crate) fn destroy(&mut self) {
        self.destroyed = true;
    }

    /// Rewind to the moment it was fired: position, heading, lifetime,
    /// charges, homing target and hit set. Payloads are immutable.
    pub fn reset(&mut self) {
        self.position = self.spawn.origin;
        self.heading = self.spawn.heading;
        self.lifetime_remaining = self.spawn.lifetime;
        self.piercing_remaining = self.spawn.piercing;
        self.bounces_remaining = self.spawn.bounces;
        if let Some(h) = self.homing.as_mut() {
            h.target = None;
            h.needs_acquire = true;
        }
        self.hit_set.clear();
        self.destroyed = false;
    }
}

fn sanitize_heading(heading: Vec3) -> Vec3 {
    let h = heading.normalize_or_zero();
    if h == Vec3::ZERO {
        tracing::warn!(?heading, "degenerate heading; firing along +Z");
        Vec3::Z
    } else {
        h
    }
}

/// Fire one pellet: snapshot `stats` and roll for a critical hit.
pub fn fire_projectile<R: Rng>(
    stats: &StatBlock,
    origin: Vec3,
    heading: Vec3,
    owner: EntityId,
    rng: &mut R,
) -> ProjectileState {
    let critical = rng.gen::<f32>() < stats.crit_chance;
    ProjectileState::from_stats(stats, origin, heading, owner, critical)
}

/// One trigger pull: `bullets_per_shot` pellets, each jittered uniformly
/// inside the spread cone and rolling its own crit.
pub fn fire_volley<R: Rng>(
    stats: &StatBlock,
    origin: Vec3,
    aim: Vec3,
    owner: EntityId,
    rng: &mut R,
) -> Vec<ProjectileState> {
    let aim = sanitize_heading(aim);
    let half = (finite_or(stats.bullet_spread, 0.0).max(0.0) * 0.5).to_radians();
    (0..stats.bullets_per_shot.max(1))
        .map(|_| {
            let heading = if half > 0.0 {
                jitter(aim, half, rng)
            } else {
                aim
            };
            fire_projectile(stats, origin, heading, owner, rng)
        })
        .collect()
}

/// Uniform direction within `half_angle` radians of `aim`.
fn jitter<R: Rng>(aim: Vec3, half_angle: f32, rng: &mut R) -> Vec3 {
    let (u, v) = aim.any_orthonormal_pair();
    // Uniform over the spherical cap: cos(theta) uniform in [cos(half), 1].
    let cos_min = half_angle.cos();
    let cos_t = cos_min + (1.0 - cos_min) * rng.gen::<f32>();
    let sin_t = (1.0 - cos_t * cos_t).max(0.0).sqrt();
    let phi = rng.gen::<f32>() * std::f32::consts::TAU;
    (aim * cos_t + (u * phi.cos() + v * phi.sin()) * sin_t).normalize_or_zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{apply, EffectKind};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn crit_multiplies_damage() {
        let mut s = StatBlock::default();
        s.crit_damage_multiplier = 3.0;
        let p = ProjectileState::from_stats(&s, Vec3::ZERO, Vec3::X, EntityId(1), true);
        assert!((p.damage - 30.0).abs() < 1e-5);
        assert!(p.critical);
    }

    #[test]
    fn negative_damage_clamps_to_zero() {
        let mut s = StatBlock::default();
        s.damage_bonus = -50.0;
        let p = ProjectileState::from_stats(&s, Vec3::ZERO, Vec3::X, EntityId(1), false);
        assert_eq!(p.damage, 0.0);
    }

    #[test]
    fn payloads_follow_unlocks() {
        let mut s = StatBlock::default();
        let p = ProjectileState::from_stats(&s, Vec3::ZERO, Vec3::X, EntityId(1), false);
        assert!(p.burn.is_none() && p.shock.is_none() && p.explosive.is_none());
        apply(EffectKind::BurnUnlock, 1.0, &mut s);
        apply(EffectKind::ShockUnlock, 1.0, &mut s);
        apply(EffectKind::ExplosiveUnlock, 1.0, &mut s);
        apply(EffectKind::HomingUnlock, 1.0, &mut s);
        let p = ProjectileState::from_stats(&s, Vec3::ZERO, Vec3::X, EntityId(1), false);
        assert!(p.burn.is_some());
        assert_eq!(p.shock.map(|c| c.count), Some(2));
        assert!(p.explosive.is_some());
        assert!(p.homing.map(|h| h.needs_acquire).unwrap_or(false));
    }

    #[test]
    fn certain_crit_always_rolls() {
        let mut s = StatBlock::default();
        s.crit_chance = 1.0;
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            assert!(fire_projectile(&s, Vec3::ZERO, Vec3::X, EntityId(1), &mut rng).critical);
        }
        s.crit_chance = 0.0;
        for _ in 0..20 {
            assert!(!fire_projectile(&s, Vec3::ZERO, Vec3::X, EntityId(1), &mut rng).critical);
        }
    }

    #[test]
    fn volley_respects_pellets_and_cone() {
        let mut s = StatBlock::default();
        s.bullets_per_shot = 6;
        s.bullet_spread = 20.0;
        let mut rng = StdRng::seed_from_u64(11);
        let pellets = fire_volley(&s, Vec3::ZERO, Vec3::X, EntityId(1), &mut rng);
        assert_eq!(pellets.len(), 6);
        let min_cos = 10.0f32.to_radians().cos() - 1e-5;
        for p in &pellets {
            assert!((p.heading.length() - 1.0).abs() < 1e-4);
            assert!(p.heading.dot(Vec3::X) >= min_cos);
        }
    }

    #[test]
    fn zero_spread_keeps_aim() {
        let s = StatBlock::default();
        let mut rng = StdRng::seed_from_u64(0);
        let pellets = fire_volley(&s, Vec3::ZERO, Vec3::new(0.0, 0.0, 2.0), EntityId(1), &mut rng);
        assert_eq!(pellets.len(), 1);
        assert_eq!(pellets[0].heading, Vec3::Z);
    }

    #[test]
    fn reset_rewinds_runtime_state() {
        let mut s = StatBlock::default();
        s.piercing_count = 2;
        s.bounce_count = 1;
        let mut p = ProjectileState::from_stats(&s, Vec3::ONE, Vec3::X, EntityId(1), false);
        p.position = Vec3::splat(9.0);
        p.piercing_remaining = 0;
        p.bounces_remaining = 0;
        p.hit_set.insert(EntityId(4));
        p.destroy();
        p.reset();
        assert_eq!(p.position, Vec3::ONE);
        assert_eq!(p.piercing_remaining, 2);
        assert_eq!(p.bounces_remaining, 1);
        assert!(p.hit_set.is_empty());
        assert!(!p.is_destroyed());
    }

    #[test]
    fn zero_heading_falls_back() {
        let s = StatBlock::default();
        let p = ProjectileState::from_stats(&s, Vec3::ZERO, Vec3::ZERO, EntityId(1), false);
        assert_eq!(p.heading, Vec3::Z);
    }
}
