//! Weapon stat composition: base values, flat bonuses, and multipliers.
//!
//! Totals are `base * multiplier + bonus`, clamped to a per-stat floor.
//! Secondary stats (pellets, crit, pierce, elemental payloads) have no
//! multiplier split and accumulate directly.

use crate::config::{
    MAX_BULLETS_PER_SHOT, MIN_BULLET_VELOCITY, MIN_FIRE_RATE, MIN_MAGAZINE_SIZE,
    MIN_PROJECTILE_LIFETIME, MIN_RELOAD_TIME,
};
use crate::util::finite_or;
use serde::{Deserialize, Serialize};

/// Un-upgraded weapon values as authored in a weapon file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponBase {
    pub damage: f32,
    pub fire_rate: f32,
    pub magazine_size: u32,
    pub reload_time: f32,
    pub bullet_velocity: f32,
    pub projectile_lifetime: f32,
    pub bullets_per_shot: u32,
    /// Full cone angle in degrees.
    pub bullet_spread: f32,
    pub crit_chance: f32,
    pub crit_damage_multiplier: f32,
}

impl Default for WeaponBase {
    fn default() -> Self {
        Self {
            damage: 10.0,
            fire_rate: 5.0,
            magazine_size: 12,
            reload_time: 1.5,
            bullet_velocity: 40.0,
            projectile_lifetime: 3.0,
            bullets_per_shot: 1,
            bullet_spread: 0.0,
            crit_chance: 0.05,
            crit_damage_multiplier: 2.0,
        }
    }
}

impl WeaponBase {
    /// Clamp authored values into the ranges the resolver relies on.
    pub fn sanitized(&self) -> Self {
        let d = Self::default();
        Self {
            damage: finite_or(self.damage, d.damage).max(0.0),
            fire_rate: finite_or(self.fire_rate, d.fire_rate).max(MIN_FIRE_RATE),
            magazine_size: self.magazine_size.max(MIN_MAGAZINE_SIZE as u32),
            reload_time: finite_or(self.reload_time, d.reload_time).max(MIN_RELOAD_TIME),
            bullet_velocity: finite_or(self.bullet_velocity, d.bullet_velocity)
                .max(MIN_BULLET_VELOCITY),
            projectile_lifetime: finite_or(self.projectile_lifetime, d.projectile_lifetime)
                .max(MIN_PROJECTILE_LIFETIME),
            bullets_per_shot: self.bullets_per_shot.clamp(1, MAX_BULLETS_PER_SHOT),
            bullet_spread: finite_or(self.bullet_spread, 0.0).clamp(0.0, 180.0),
            crit_chance: finite_or(self.crit_chance, 0.0).clamp(0.0, 1.0),
            crit_damage_multiplier: finite_or(self.crit_damage_multiplier, 1.0).max(1.0),
        }
    }
}

/// Damage-over-time element (burn or poison).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementStats {
    pub unlocked: bool,
    pub dps: f32,
    pub duration: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreezeStats {
    pub unlocked: bool,
    /// Fraction of movement speed removed, 0..=0.95.
    pub slow_percent: f32,
    pub duration: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShockStats {
    pub unlocked: bool,
    pub chain_count: u32,
    pub chain_range: f32,
    pub chain_damage: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatBlock {
    pub base: WeaponBase,

    pub damage_multiplier: f32,
    pub damage_bonus: f32,
    pub fire_rate_multiplier: f32,
    pub fire_rate_bonus: f32,
    pub magazine_multiplier: f32,
    pub magazine_bonus: i32,
    pub reload_multiplier: f32,
    pub reload_bonus: f32,
    pub velocity_multiplier: f32,
    pub velocity_bonus: f32,
    pub lifetime_multiplier: f32,
    pub lifetime_bonus: f32,

    pub bullets_per_shot: u32,
    pub bullet_spread: f32,
    pub crit_chance: f32,
    pub crit_damage_multiplier: f32,
    pub piercing_count: u32,
    pub bounce_count: u32,

    pub is_explosive: bool,
    pub explosion_radius: f32,
    pub explosion_damage: f32,

    pub is_homing: bool,
    pub homing_strength: f32,

    pub burn: ElementStats,
    pub poison: ElementStats,
    pub freeze: FreezeStats,
    pub shock: ShockStats,
}

impl Default for StatBlock {
    fn default() -> Self {
        Self::new(WeaponBase::default())
    }
}

impl StatBlock {
    /// Fresh block with no upgrades. Elemental magnitudes start at their
    /// unlock defaults so an unlock alone produces a usable payload.
    pub fn new(base: WeaponBase) -> Self {
        let base = base.sanitized();
        Self {
            damage_multiplier: 1.0,
            damage_bonus: 0.0,
            fire_rate_multiplier: 1.0,
            fire_rate_bonus: 0.0,
            magazine_multiplier: 1.0,
            magazine_bonus: 0,
            reload_multiplier: 1.0,
            reload_bonus: 0.0,
            velocity_multiplier: 1.0,
            velocity_bonus: 0.0,
            lifetime_multiplier: 1.0,
            lifetime_bonus: 0.0,

            bullets_per_shot: base.bullets_per_shot,
            bullet_spread: base.bullet_spread,
            crit_chance: base.crit_chance,
            crit_damage_multiplier: base.crit_damage_multiplier,
            piercing_count: 0,
            bounce_count: 0,

            is_explosive: false,
            explosion_radius: 3.0,
            explosion_damage: 10.0,

            is_homing: false,
            homing_strength: 2.0,

            burn: ElementStats {
                unlocked: false,
                dps: 5.0,
                duration: 3.0,
            },
            poison: ElementStats {
                unlocked: false,
                dps: 3.0,
                duration: 5.0,
            },
            freeze: FreezeStats {
                unlocked: false,
                slow_percent: 0.3,
                duration: 2.0,
            },
            shock: ShockStats {
                unlocked: false,
                chain_count: 2,
                chain_range: 5.0,
                chain_damage: 5.0,
            },
            base,
        }
    }

    /// Drop every upgrade and return to the base weapon.
    pub fn reset(&mut self) {
        *self = Self::new(self.base.clone());
    }

    /// Damage has no floor here; projectiles clamp negative damage to zero at fire time.
    pub fn total_damage(&self) -> f32 {
        self.base.damage * self.damage_multiplier + self.damage_bonus
    }

    pub fn total_fire_rate(&self) -> f32 {
        floored(
            self.base.fire_rate * self.fire_rate_multiplier + self.fire_rate_bonus,
            MIN_FIRE_RATE,
        )
    }

    pub fn total_magazine(&self) -> i32 {
        let scaled = (self.base.magazine_size as f32 * self.magazine_multiplier).floor();
        let scaled = if scaled.is_finite() { scaled as i32 } else { 0 };
        scaled.saturating_add(self.magazine_bonus).max(MIN_MAGAZINE_SIZE)
    }

    pub fn total_reload(&self) -> f32 {
        floored(
            self.base.reload_time * self.reload_multiplier + self.reload_bonus,
            MIN_RELOAD_TIME,
        )
    }

    pub fn total_velocity(&self) -> f32 {
        floored(
            self.base.bullet_velocity * self.velocity_multiplier + self.velocity_bonus,
            MIN_BULLET_VELOCITY,
        )
    }

    pub fn total_lifetime(&self) -> f32 {
        floored(
            self.base.projectile_lifetime * self.lifetime_multiplier + self.lifetime_bonus,
            MIN_PROJECTILE_LIFETIME,
        )
    }

    /// Seconds between trigger pulls at the current fire rate.
    pub fn shot_interval(&self) -> f32 {
        1.0 / self.total_fire_rate()
    }

    /// Expected damage per pellet including crits, excluding side effects.
    pub fn expected_hit_damage(&self) -> f32 {
        let base = self.total_damage().max(0.0);
        base * (1.0 + self.crit_chance * (self.crit_damage_multiplier - 1.0))
    }
}

/// NaN collapses to the floor rather than propagating.
fn floored(value: f32, floor: f32) -> f32 {
    if value.is_nan() {
        floor
    } else {
        value.max(floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_combine_base_multiplier_and_bonus() {
        let mut s = StatBlock::default();
        s.damage_multiplier = 1.5;
        s.damage_bonus = 2.0;
        assert!((s.total_damage() - 17.0).abs() < 1e-6);
    }

    #[test]
    fn floors_hold_for_degenerate_modifiers() {
        let mut s = StatBlock::default();
        s.fire_rate_multiplier = -3.0;
        s.reload_bonus = -100.0;
        s.velocity_multiplier = 0.0;
        s.lifetime_bonus = -50.0;
        s.magazine_bonus = -1000;
        assert!((s.total_fire_rate() - MIN_FIRE_RATE).abs() < 1e-6);
        assert!((s.total_reload() - MIN_RELOAD_TIME).abs() < 1e-6);
        assert!((s.total_velocity() - MIN_BULLET_VELOCITY).abs() < 1e-6);
        assert!((s.total_lifetime() - MIN_PROJECTILE_LIFETIME).abs() < 1e-6);
        assert_eq!(s.total_magazine(), MIN_MAGAZINE_SIZE);
    }

    #[test]
    fn damage_has_no_floor() {
        let mut s = StatBlock::default();
        s.damage_bonus = -25.0;
        assert!(s.total_damage() < 0.0);
    }

    #[test]
    fn reset_restores_base() {
        let mut s = StatBlock::default();
        s.piercing_count = 4;
        s.burn.unlocked = true;
        s.damage_bonus = 9.0;
        s.reset();
        assert_eq!(s, StatBlock::default());
    }

    #[test]
    fn sanitized_base_clamps_bad_input() {
        let b = WeaponBase {
            damage: -4.0,
            fire_rate: 0.0,
            magazine_size: 0,
            bullet_velocity: f32::NAN,
            crit_chance: 3.0,
            bullets_per_shot: 0,
            ..WeaponBase::default()
        }
        .sanitized();
        assert_eq!(b.damage, 0.0);
        assert!((b.fire_rate - MIN_FIRE_RATE).abs() < 1e-6);
        assert_eq!(b.magazine_size, 1);
        assert!((b.bullet_velocity - 40.0).abs() < 1e-6);
        assert_eq!(b.crit_chance, 1.0);
        assert_eq!(b.bullets_per_shot, 1);
    }
}
