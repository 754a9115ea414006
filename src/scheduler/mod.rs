//! Frame-stepped simulation: replays scripted shots against an arena.
//!
//! Each step runs, in order: spawn due shots, advance every live projectile
//! once, tick DoT trackers, move actors. Projectiles never interleave within
//! a step; their relative order inside the step is not load-bearing.

use crate::config::{ScenarioConfig, ShotConfig, SimulationSettings, DEFAULT_STEP_SECONDS};
use crate::dot::DotEvent;
use crate::projectile::{fire_volley, ProjectileState};
use crate::report::{RunInfo, SimulationReport};
use crate::resolver::{CombatEvent, ProjectileOutcome, ProjectileResolver};
use crate::stats::StatBlock;
use crate::util::finite_or;
use crate::world::{Arena, EntityId, World};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::VecDeque;

/// Shortest and longest accepted step, in seconds.
const STEP_RANGE: (f32, f32) = (1e-4, 1.0);

/// DoT event attributed to the afflicted target.
#[derive(Debug, Clone, Serialize)]
pub struct DotRecord {
    pub target: EntityId,
    #[serde(flatten)]
    pub event: DotEvent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventRecord {
    Fired {
        projectile: u64,
        owner: EntityId,
        critical: bool,
    },
    /// A scripted shot whose owner was already gone.
    ShotSkipped { owner: EntityId },
    Combat(CombatEvent),
    Dot(DotRecord),
}

#[derive(Debug, Clone, Serialize)]
pub struct TimedEvent {
    pub time: f32,
    #[serde(flatten)]
    pub record: EventRecord,
}

pub struct Simulation {
    weapon: String,
    arena: Arena,
    stats: StatBlock,
    resolver: ProjectileResolver,
    rng: StdRng,
    seed: u64,
    pending: VecDeque<ShotConfig>,
    projectiles: Vec<ProjectileState>,
    next_id: u64,
    step_seconds: f32,
    steps_done: u64,
    total_steps: u64,
    shots_fired: u64,
    log: Vec<TimedEvent>,
}

impl Simulation {
    pub fn new(
        weapon: impl Into<String>,
        arena: Arena,
        stats: StatBlock,
        settings: &SimulationSettings,
        mut shots: Vec<ShotConfig>,
    ) -> Self {
        let step = finite_or(settings.step_seconds, DEFAULT_STEP_SECONDS);
        let step = if step <= 0.0 {
            tracing::warn!(step, "non-positive step; using default");
            DEFAULT_STEP_SECONDS
        } else {
            step.clamp(STEP_RANGE.0, STEP_RANGE.1)
        };
        let duration = finite_or(settings.duration_seconds, 0.0).max(0.0);
        let total_steps = (duration / step).ceil() as u64;

        shots.retain(|s| s.time.is_finite());
        shots.sort_by(|a, b| a.time.total_cmp(&b.time));

        Self {
            weapon: weapon.into(),
            arena,
            stats,
            resolver: ProjectileResolver::new(),
            rng: StdRng::seed_from_u64(settings.seed),
            seed: settings.seed,
            pending: shots.into(),
            projectiles: Vec::new(),
            next_id: 1,
            step_seconds: step,
            steps_done: 0,
            total_steps,
            shots_fired: 0,
            log: Vec::new(),
        }
    }

    pub fn from_scenario(cfg: &ScenarioConfig, stats: StatBlock) -> Self {
        Self::new(
            cfg.weapon.name.clone(),
            Arena::from_scenario(cfg),
            stats,
            &cfg.simulation,
            cfg.shots.clone(),
        )
    }

    /// Simulated time at the start of the next step.
    pub fn time(&self) -> f32 {
        self.steps_done as f32 * self.step_seconds
    }

    pub fn is_finished(&self) -> bool {
        self.steps_done >= self.total_steps
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    pub fn projectiles(&self) -> &[ProjectileState] {
        &self.projectiles
    }

    pub fn events(&self) -> &[TimedEvent] {
        &self.log
    }

    /// Run one step. Returns false once the configured duration is covered.
    pub fn step(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        let now = self.time();
        let dt = self.step_seconds;

        self.spawn_due(now);

        let resolver = &mut self.resolver;
        let arena = &mut self.arena;
        self.projectiles
            .retain_mut(|p| resolver.advance(p, arena, dt) == ProjectileOutcome::Continue);
        for ev in self.resolver.drain_events() {
            self.log.push(TimedEvent {
                time: now,
                record: EventRecord::Combat(ev),
            });
        }

        for (target, event) in self.arena.tick_dots(dt) {
            self.log.push(TimedEvent {
                time: now + dt,
                record: EventRecord::Dot(DotRecord { target, event }),
            });
        }

        self.arena.move_actors(dt);
        self.steps_done += 1;
        tracing::trace!(time = now, live = self.projectiles.len(), "step");
        true
    }

    fn spawn_due(&mut self, now: f32) {
        // Due when the shot time falls before the end of this step.
        let horizon = now + self.step_seconds * 0.5;
        while self.pending.front().map_or(false, |s| s.time <= horizon) {
            let Some(shot) = self.pending.pop_front() else {
                break;
            };
            if !self.arena.is_alive(shot.owner) {
                tracing::warn!(owner = %shot.owner, time = shot.time, "shot owner is gone; skipping");
                self.log.push(TimedEvent {
                    time: now,
                    record: EventRecord::ShotSkipped { owner: shot.owner },
                });
                continue;
            }
            self.shots_fired += 1;
            let pellets = fire_volley(&self.stats, shot.origin, shot.heading, shot.owner, &mut self.rng);
            for p in pellets {
                let p = p.with_id(self.next_id);
                self.next_id += 1;
                tracing::debug!(projectile = p.id, owner = %p.owner, critical = p.critical, "fired");
                self.log.push(TimedEvent {
                    time: now,
                    record: EventRecord::Fired {
                        projectile: p.id,
                        owner: p.owner,
                        critical: p.critical,
                    },
                });
                self.projectiles.push(p);
            }
        }
    }

    /// Step until the duration is covered, then summarize.
    pub fn run(mut self) -> SimulationReport {
        while self.step() {}
        self.finish()
    }

    pub fn finish(self) -> SimulationReport {
        let live = self.projectiles.len();
        tracing::info!(
            weapon = %self.weapon,
            shots = self.shots_fired,
            events = self.log.len(),
            in_flight = live,
            "simulation finished"
        );
        let run = RunInfo {
            weapon: self.weapon,
            seed: self.seed,
            elapsed_seconds: self.steps_done as f32 * self.step_seconds,
            step_seconds: self.step_seconds,
            shots_fired: self.shots_fired,
            in_flight: live,
        };
        SimulationReport::new(run, &self.stats, &self.arena, self.log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::CombatEventKind;
    use crate::world::Actor;
    use glam::Vec3;

    fn settings(duration: f32) -> SimulationSettings {
        SimulationSettings {
            duration_seconds: duration,
            step_seconds: 0.1,
            seed: 5,
            friendly_pass_through: false,
        }
    }

    fn shot(time: f32, owner: u64) -> ShotConfig {
        ShotConfig {
            time,
            owner: EntityId(owner),
            origin: Vec3::ZERO,
            heading: Vec3::X,
        }
    }

    fn arena() -> Arena {
        let mut a = Arena::new();
        a.insert(Actor::new(EntityId(1), Vec3::new(-2.0, 0.0, 0.0), "player"));
        a.insert(Actor::new(EntityId(2), Vec3::new(8.0, 0.0, 0.0), "enemy"));
        a
    }

    fn stats() -> StatBlock {
        let mut s = StatBlock::default();
        s.base.bullet_velocity = 20.0;
        s.crit_chance = 0.0;
        s
    }

    #[test]
    fn scripted_shots_hit_and_are_logged() {
        let sim = Simulation::new("rifle", arena(), stats(), &settings(2.0), vec![shot(0.0, 1), shot(0.5, 1)]);
        let report = sim.run();
        assert_eq!(report.totals.shots_fired, 2);
        assert_eq!(report.totals.hits, 2);
        let target = report.targets.iter().find(|t| t.id == EntityId(2)).expect("target");
        assert!((target.damage_taken - 20.0).abs() < 1e-4);
        assert!(target.alive);
    }

    #[test]
    fn dead_owner_skips_shot() {
        let mut a = arena();
        a.despawn(EntityId(1));
        let sim = Simulation::new("rifle", a, stats(), &settings(1.0), vec![shot(0.0, 1)]);
        let report = sim.run();
        assert_eq!(report.totals.shots_fired, 0);
        assert!(report
            .events
            .iter()
            .any(|e| matches!(e.record, EventRecord::ShotSkipped { .. })));
    }

    #[test]
    fn owner_death_cancels_in_flight_projectile() {
        let mut sim = Simulation::new("rifle", arena(), stats(), &settings(1.0), vec![shot(0.0, 1)]);
        sim.step();
        assert_eq!(sim.projectiles().len(), 1);
        sim.arena_mut().despawn(EntityId(1));
        sim.step();
        assert!(sim.projectiles().is_empty());
        let report = sim.run();
        assert_eq!(report.totals.hits, 0);
        assert!(report.events.iter().any(|e| matches!(
            &e.record,
            EventRecord::Combat(c) if matches!(c.kind, CombatEventKind::Destroyed { .. })
        )));
    }

    #[test]
    fn burn_ticks_on_whole_seconds() {
        let mut s = stats();
        s.burn.unlocked = true;
        s.burn.dps = 4.0;
        s.burn.duration = 2.0;
        let sim = Simulation::new("torch", arena(), s, &settings(4.0), vec![shot(0.0, 1)]);
        let report = sim.run();
        let ticks = report
            .events
            .iter()
            .filter(|e| matches!(&e.record, EventRecord::Dot(d) if matches!(d.event, DotEvent::Damage { .. })))
            .count();
        assert_eq!(ticks, 2);
        let target = report.targets.iter().find(|t| t.id == EntityId(2)).expect("target");
        assert!((target.damage_taken - 18.0).abs() < 1e-3);
    }

    #[test]
    fn same_seed_same_report() {
        let mut s = stats();
        s.bullets_per_shot = 5;
        s.bullet_spread = 30.0;
        s.crit_chance = 0.5;
        let shots = vec![shot(0.0, 1), shot(0.3, 1), shot(0.6, 1)];
        let a = Simulation::new("shotgun", arena(), s.clone(), &settings(2.0), shots.clone()).run();
        let b = Simulation::new("shotgun", arena(), s, &settings(2.0), shots).run();
        let ja = serde_json::to_string(&a).expect("json");
        let jb = serde_json::to_string(&b).expect("json");
        assert_eq!(ja, jb);
    }

    #[test]
    fn duration_sets_step_count() {
        let mut sim = Simulation::new("rifle", arena(), stats(), &settings(1.0), Vec::new());
        let mut n = 0;
        while sim.step() {
            n += 1;
        }
        assert_eq!(n, 10);
        assert!(sim.is_finished());
    }
}
