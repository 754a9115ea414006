//! Combat journal entries emitted by the resolver.

use crate::chain::ChainHop;
use crate::dot::Element;
use crate::world::EntityId;
use glam::Vec3;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DestroyReason {
    /// Struck a damage target with no pierce charges left.
    Impact,
    /// Struck a blocker with no bounces left.
    BounceExhausted,
    Expired,
    OwnerGone,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CombatEventKind {
    HomingAcquired {
        target: EntityId,
    },
    Hit {
        target: EntityId,
        damage: f32,
        critical: bool,
    },
    DotApplied {
        target: EntityId,
        element: Element,
    },
    Explosion {
        center: Vec3,
        radius: f32,
        damage: f32,
        targets: Vec<EntityId>,
    },
    Chain(ChainHop),
    Pierce {
        target: EntityId,
        remaining: u32,
    },
    Bounce {
        point: Vec3,
        heading: Vec3,
        remaining: u32,
    },
    Destroyed {
        reason: DestroyReason,
        position: Vec3,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombatEvent {
    pub projectile: u64,
    #[serde(flatten)]
    pub kind: CombatEventKind,
}

impl CombatEvent {
    /// Damage this event dealt directly, summed over all victims.
    pub fn damage_dealt(&self) -> f32 {
        match &self.kind {
            CombatEventKind::Hit { damage, .. } => *damage,
            CombatEventKind::Explosion {
                damage, targets, ..
            } => *damage * targets.len() as f32,
            CombatEventKind::Chain(hop) => hop.damage,
            _ => 0.0,
        }
    }
}
