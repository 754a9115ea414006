//! Damage-over-time trackers: burn, poison and freeze.
//!
//! One entry per element per target. Re-application takes the larger dps
//! and the larger remaining duration independently; it never adds. Entries
//! tick on a fixed one-second cadence regardless of frame rate. Freeze
//! scales movement speed instead of dealing damage and restores the
//! pre-freeze multiplier exactly once when it expires.

use crate::config::{DOT_TICK_SECONDS, MAX_FREEZE_SLOW};
use crate::util::finite_or;
use crate::world::{Damageable, EntityId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    Burn,
    Poison,
    Freeze,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DotEntry {
    pub dps: f32,
    pub remaining_seconds: f32,
    pub source: EntityId,
    since_tick: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FreezeEntry {
    pub slow_percent: f32,
    pub remaining_seconds: f32,
    pub source: EntityId,
    /// Speed multiplier the target had before the freeze landed.
    pub restore_speed: f32,
    since_tick: f32,
}

/// Something a tracker did during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DotEvent {
    Damage {
        element: Element,
        amount: f32,
        source: EntityId,
    },
    FreezeTick {
        slow_percent: f32,
    },
    Expired {
        element: Element,
    },
    SpeedRestored {
        speed_multiplier: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DotTracker {
    burn: Option<DotEntry>,
    poison: Option<DotEntry>,
    freeze: Option<FreezeEntry>,
}

impl DotTracker {
    pub fn burn(&self) -> Option<&DotEntry> {
        self.burn.as_ref()
    }

    pub fn poison(&self) -> Option<&DotEntry> {
        self.poison.as_ref()
    }

    pub fn freeze(&self) -> Option<&FreezeEntry> {
        self.freeze.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.burn.is_none() && self.poison.is_none() && self.freeze.is_none()
    }

    /// Slot for a damaging element; `None` for freeze, which has its own entry type.
    fn slot(&mut self, element: Element) -> Option<&mut Option<DotEntry>> {
        match element {
            Element::Burn => Some(&mut self.burn),
            Element::Poison => Some(&mut self.poison),
            Element::Freeze => None,
        }
    }

    /// Returns true when a new entry was created.
    fn stack(&mut self, element: Element, dps: f32, duration: f32, source: EntityId) -> bool {
        let Some(slot) = self.slot(element) else {
            return false;
        };
        match slot {
            Some(e) => {
                e.dps = e.dps.max(dps);
                e.remaining_seconds = e.remaining_seconds.max(duration);
                false
            }
            None => {
                *slot = Some(DotEntry {
                    dps,
                    remaining_seconds: duration,
                    source,
                    since_tick: 0.0,
                });
                true
            }
        }
    }
}

fn valid(dps: f32, duration: f32) -> Option<(f32, f32)> {
    let dps = finite_or(dps, 0.0).max(0.0);
    let duration = finite_or(duration, 0.0);
    if duration <= 0.0 {
        None
    } else {
        Some((dps, duration))
    }
}

fn apply_damage_dot<T: Damageable + ?Sized>(
    target: &mut T,
    element: Element,
    dps: f32,
    duration: f32,
    source: EntityId,
) {
    let Some((dps, duration)) = valid(dps, duration) else {
        return;
    };
    if target.dots().stack(element, dps, duration, source) {
        tracing::debug!(?element, dps, duration, %source, "dot started");
    }
}

pub fn apply_burn<T: Damageable + ?Sized>(target: &mut T, dps: f32, duration: f32, source: EntityId) {
    apply_damage_dot(target, Element::Burn, dps, duration, source);
}

pub fn apply_poison<T: Damageable + ?Sized>(
    target: &mut T,
    dps: f32,
    duration: f32,
    source: EntityId,
) {
    apply_damage_dot(target, Element::Poison, dps, duration, source);
}

pub fn apply_freeze<T: Damageable + ?Sized>(
    target: &mut T,
    slow_percent: f32,
    duration: f32,
    source: EntityId,
) {
    let Some((slow, duration)) = valid(slow_percent, duration) else {
        return;
    };
    let slow = slow.min(MAX_FREEZE_SLOW);
    let current_speed = target.speed_multiplier();
    let restore = match target.dots().freeze.as_mut() {
        Some(f) => {
            f.slow_percent = f.slow_percent.max(slow);
            f.remaining_seconds = f.remaining_seconds.max(duration);
            f.restore_speed * (1.0 - f.slow_percent)
        }
        None => {
            target.dots().freeze = Some(FreezeEntry {
                slow_percent: slow,
                remaining_seconds: duration,
                source,
                restore_speed: current_speed,
                since_tick: 0.0,
            });
            tracing::debug!(slow, duration, %source, "freeze started");
            current_speed * (1.0 - slow)
        }
    };
    target.set_speed_multiplier(restore);
}

/// Advance `target`'s trackers by `dt`, applying due ticks. Trackers on a
/// dead target are dropped (freeze still restores speed), including when a
/// tick in this same call is what killed it.
pub fn tick_dot<T: Damageable + ?Sized>(target: &mut T, dt: f32) -> Vec<DotEvent> {
    let dt = finite_or(dt, 0.0).max(0.0);
    let mut events = Vec::new();

    for element in [Element::Burn, Element::Poison] {
        let mut pending = dt;
        loop {
            let alive = target.is_alive();
            let Some(slot) = target.dots().slot(element) else {
                break;
            };
            if !alive {
                if slot.take().is_some() {
                    events.push(DotEvent::Expired { element });
                }
                break;
            }
            let Some(entry) = slot.as_mut() else {
                break;
            };
            entry.since_tick += std::mem::take(&mut pending);
            if entry.since_tick < DOT_TICK_SECONDS {
                break;
            }
            entry.since_tick -= DOT_TICK_SECONDS;
            entry.remaining_seconds -= DOT_TICK_SECONDS;
            let amount = entry.dps;
            let source = entry.source;
            let expired = entry.remaining_seconds <= 0.0;
            if expired {
                *slot = None;
            }
            target.apply_damage(amount);
            events.push(DotEvent::Damage {
                element,
                amount,
                source,
            });
            if expired {
                events.push(DotEvent::Expired { element });
                break;
            }
        }
    }

    let alive = target.is_alive();
    tick_freeze(target, dt, alive, &mut events);
    events
}

fn tick_freeze<T: Damageable + ?Sized>(target: &mut T, dt: f32, alive: bool, events: &mut Vec<DotEvent>) {
    let Some(f) = target.dots().freeze.as_mut() else {
        return;
    };
    let mut expired = !alive;
    if alive {
        f.since_tick += dt;
        while f.since_tick >= DOT_TICK_SECONDS {
            f.since_tick -= DOT_TICK_SECONDS;
            f.remaining_seconds -= DOT_TICK_SECONDS;
            events.push(DotEvent::FreezeTick {
                slow_percent: f.slow_percent,
            });
            if f.remaining_seconds <= 0.0 {
                expired = true;
                break;
            }
        }
    }
    if expired {
        if let Some(f) = target.dots().freeze.take() {
            target.set_speed_multiplier(f.restore_speed);
            events.push(DotEvent::Expired {
                element: Element::Freeze,
            });
            events.push(DotEvent::SpeedRestored {
                speed_multiplier: f.restore_speed,
            });
        }
    }
}
