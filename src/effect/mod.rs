//! Upgrade effect catalog and the fold of effects into a [`StatBlock`].
//!
//! Each [`EffectKind`] mutates exactly one field. Entries never read each
//! other's results, so a bundle is an ordered sequence of independent
//! accumulations. Applying a bundle twice stacks: the result equals one
//! application of the same bundle with every value doubled.

mod bundle;

pub use bundle::{UpgradeBundle, UpgradeTable};

use crate::config::{MAX_BULLETS_PER_SHOT, MAX_CHAIN_COUNT, MAX_FREEZE_SLOW};
use crate::stats::StatBlock;
use crate::util::{add_count, finite_or};
use serde::{Deserialize, Serialize};

/// Ceiling for pierce and bounce charges.
const MAX_CHARGES: u32 = u16::MAX as u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    DamageFlat,
    DamagePercent,
    FireRateFlat,
    FireRatePercent,
    MagazineFlat,
    MagazinePercent,
    /// Seconds removed from reload.
    ReloadTimeFlat,
    /// Fraction removed from the reload multiplier.
    ReloadTimePercent,
    BulletVelocityFlat,
    BulletVelocityPercent,
    LifetimeFlat,
    LifetimePercent,
    BulletsPerShot,
    BulletSpread,
    CritChance,
    CritDamage,
    Piercing,
    Bounce,
    ExplosiveUnlock,
    ExplosionRadius,
    ExplosionDamage,
    HomingUnlock,
    HomingStrength,
    BurnUnlock,
    BurnDps,
    BurnDuration,
    PoisonUnlock,
    PoisonDps,
    PoisonDuration,
    FreezeUnlock,
    FreezeSlow,
    FreezeDuration,
    ShockUnlock,
    ShockChainCount,
    ShockChainRange,
    ShockChainDamage,
}

impl EffectKind {
    pub const ALL: [EffectKind; 36] = [
        EffectKind::DamageFlat,
        EffectKind::DamagePercent,
        EffectKind::FireRateFlat,
        EffectKind::FireRatePercent,
        EffectKind::MagazineFlat,
        EffectKind::MagazinePercent,
        EffectKind::ReloadTimeFlat,
        EffectKind::ReloadTimePercent,
        EffectKind::BulletVelocityFlat,
        EffectKind::BulletVelocityPercent,
        EffectKind::LifetimeFlat,
        EffectKind::LifetimePercent,
        EffectKind::BulletsPerShot,
        EffectKind::BulletSpread,
        EffectKind::CritChance,
        EffectKind::CritDamage,
        EffectKind::Piercing,
        EffectKind::Bounce,
        EffectKind::ExplosiveUnlock,
        EffectKind::ExplosionRadius,
        EffectKind::ExplosionDamage,
        EffectKind::HomingUnlock,
        EffectKind::HomingStrength,
        EffectKind::BurnUnlock,
        EffectKind::BurnDps,
        EffectKind::BurnDuration,
        EffectKind::PoisonUnlock,
        EffectKind::PoisonDps,
        EffectKind::PoisonDuration,
        EffectKind::FreezeUnlock,
        EffectKind::FreezeSlow,
        EffectKind::FreezeDuration,
        EffectKind::ShockUnlock,
        EffectKind::ShockChainCount,
        EffectKind::ShockChainRange,
        EffectKind::ShockChainDamage,
    ];

    /// Unlock kinds ignore their value and only ever set a flag.
    pub fn is_unlock(self) -> bool {
        matches!(
            self,
            EffectKind::ExplosiveUnlock
                | EffectKind::HomingUnlock
                | EffectKind::BurnUnlock
                | EffectKind::PoisonUnlock
                | EffectKind::FreezeUnlock
                | EffectKind::ShockUnlock
        )
    }

    pub fn describe(self) -> &'static str {
        match self {
            EffectKind::DamageFlat => "flat damage added to every pellet",
            EffectKind::DamagePercent => "fraction added to the damage multiplier",
            EffectKind::FireRateFlat => "shots per second added",
            EffectKind::FireRatePercent => "fraction added to the fire-rate multiplier",
            EffectKind::MagazineFlat => "rounds added to the magazine",
            EffectKind::MagazinePercent => "fraction added to the magazine multiplier",
            EffectKind::ReloadTimeFlat => "seconds removed from reload",
            EffectKind::ReloadTimePercent => "fraction removed from the reload multiplier",
            EffectKind::BulletVelocityFlat => "units per second added to bullet speed",
            EffectKind::BulletVelocityPercent => "fraction added to the velocity multiplier",
            EffectKind::LifetimeFlat => "seconds added to projectile lifetime",
            EffectKind::LifetimePercent => "fraction added to the lifetime multiplier",
            EffectKind::BulletsPerShot => "pellets added per trigger pull",
            EffectKind::BulletSpread => "degrees added to the spread cone",
            EffectKind::CritChance => "critical chance added (clamped to 0..1)",
            EffectKind::CritDamage => "added to the critical damage multiplier",
            EffectKind::Piercing => "extra targets a projectile passes through",
            EffectKind::Bounce => "extra wall bounces",
            EffectKind::ExplosiveUnlock => "projectiles explode on hit",
            EffectKind::ExplosionRadius => "explosion radius added",
            EffectKind::ExplosionDamage => "explosion damage added",
            EffectKind::HomingUnlock => "projectiles steer toward a target",
            EffectKind::HomingStrength => "homing turn rate added",
            EffectKind::BurnUnlock => "hits apply burn",
            EffectKind::BurnDps => "burn damage per second added",
            EffectKind::BurnDuration => "burn seconds added",
            EffectKind::PoisonUnlock => "hits apply poison",
            EffectKind::PoisonDps => "poison damage per second added",
            EffectKind::PoisonDuration => "poison seconds added",
            EffectKind::FreezeUnlock => "hits apply freeze",
            EffectKind::FreezeSlow => "slow fraction added (clamped to 0..0.95)",
            EffectKind::FreezeDuration => "freeze seconds added",
            EffectKind::ShockUnlock => "hits chain lightning to nearby targets",
            EffectKind::ShockChainCount => "chain hops added",
            EffectKind::ShockChainRange => "chain search range added",
            EffectKind::ShockChainDamage => "damage per chain hop added",
        }
    }
}

/// One `(kind, value)` pair from an upgrade definition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectEntry {
    pub kind: EffectKind,
    #[serde(default)]
    pub value: f32,
}

impl EffectEntry {
    pub fn new(kind: EffectKind, value: f32) -> Self {
        Self { kind, value }
    }
}

/// Fold one effect into `stats`. Non-finite values are treated as zero; results are clamped, never rejected.
pub fn apply(kind: EffectKind, value: f32, stats: &mut StatBlock) {
    let v = finite_or(value, 0.0);
    match kind {
        EffectKind::DamageFlat => stats.damage_bonus += v,
        EffectKind::DamagePercent => stats.damage_multiplier += v,
        EffectKind::FireRateFlat => stats.fire_rate_bonus += v,
        EffectKind::FireRatePercent => stats.fire_rate_multiplier += v,
        EffectKind::MagazineFlat => {
            stats.magazine_bonus = stats.magazine_bonus.saturating_add(v.trunc() as i32)
        }
        EffectKind::MagazinePercent => stats.magazine_multiplier += v,
        // Lower is better: reload deltas subtract. The total keeps its floor.
        EffectKind::ReloadTimeFlat => stats.reload_bonus -= v,
        EffectKind::ReloadTimePercent => stats.reload_multiplier -= v,
        EffectKind::BulletVelocityFlat => stats.velocity_bonus += v,
        EffectKind::BulletVelocityPercent => stats.velocity_multiplier += v,
        EffectKind::LifetimeFlat => stats.lifetime_bonus += v,
        EffectKind::LifetimePercent => stats.lifetime_multiplier += v,
        EffectKind::BulletsPerShot => {
            stats.bullets_per_shot = add_count(stats.bullets_per_shot, v, MAX_BULLETS_PER_SHOT).max(1)
        }
        EffectKind::BulletSpread => stats.bullet_spread = (stats.bullet_spread + v).clamp(0.0, 180.0),
        EffectKind::CritChance => stats.crit_chance = (stats.crit_chance + v).clamp(0.0, 1.0),
        EffectKind::CritDamage => stats.crit_damage_multiplier += v,
        EffectKind::Piercing => stats.piercing_count = add_count(stats.piercing_count, v, MAX_CHARGES),
        EffectKind::Bounce => stats.bounce_count = add_count(stats.bounce_count, v, MAX_CHARGES),
        EffectKind::ExplosiveUnlock => stats.is_explosive = true,
        EffectKind::ExplosionRadius => stats.explosion_radius += v,
        EffectKind::ExplosionDamage => stats.explosion_damage += v,
        EffectKind::HomingUnlock => stats.is_homing = true,
        EffectKind::HomingStrength => stats.homing_strength += v,
        EffectKind::BurnUnlock => stats.burn.unlocked = true,
        EffectKind::BurnDps => stats.burn.dps += v,
        EffectKind::BurnDuration => stats.burn.duration += v,
        EffectKind::PoisonUnlock => stats.poison.unlocked = true,
        EffectKind::PoisonDps => stats.poison.dps += v,
        EffectKind::PoisonDuration => stats.poison.duration += v,
        EffectKind::FreezeUnlock => stats.freeze.unlocked = true,
        EffectKind::FreezeSlow => {
            stats.freeze.slow_percent = (stats.freeze.slow_percent + v).clamp(0.0, MAX_FREEZE_SLOW)
        }
        EffectKind::FreezeDuration => stats.freeze.duration += v,
        EffectKind::ShockUnlock => stats.shock.unlocked = true,
        EffectKind::ShockChainCount => {
            stats.shock.chain_count = add_count(stats.shock.chain_count, v, MAX_CHAIN_COUNT)
        }
        EffectKind::ShockChainRange => stats.shock.chain_range += v,
        EffectKind::ShockChainDamage => stats.shock.chain_damage += v,
    }
    tracing::trace!(?kind, value = v, "applied effect");
}

/// Apply entries in list order.
pub fn apply_bundle(bundle: &[EffectEntry], stats: &mut StatBlock) {
    for e in bundle {
        apply(e.kind, e.value, stats);
    }
}

/// Apply one acquired pickup. Called once at acquisition, never per shot.
pub fn apply_upgrade_bundle(bundle: &UpgradeBundle, stats: &mut StatBlock) {
    tracing::debug!(bundle = %bundle.name, effects = bundle.effects.len(), "applying upgrade bundle");
    apply_bundle(&bundle.effects, stats);
}
