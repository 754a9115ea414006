//! Simulation summaries and JSON/HTML report generation.

use crate::dot::DotEvent;
use crate::resolver::CombatEventKind;
use crate::scheduler::{EventRecord, TimedEvent};
use crate::stats::StatBlock;
use crate::world::{Arena, EntityId};
use glam::Vec3;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Resolved weapon totals, as printed by `stats` and embedded in reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatSummary {
    pub damage: f32,
    pub fire_rate: f32,
    pub shot_interval: f32,
    pub magazine: i32,
    pub reload_time: f32,
    pub bullet_velocity: f32,
    pub projectile_lifetime: f32,
    pub bullets_per_shot: u32,
    pub bullet_spread: f32,
    pub crit_chance: f32,
    pub crit_damage_multiplier: f32,
    pub expected_hit_damage: f32,
    pub piercing: u32,
    pub bounces: u32,
    pub explosive: bool,
    pub homing: bool,
    pub burn: bool,
    pub poison: bool,
    pub freeze: bool,
    pub shock: bool,
}

impl StatSummary {
    pub fn from_stats(s: &StatBlock) -> Self {
        Self {
            damage: s.total_damage(),
            fire_rate: s.total_fire_rate(),
            shot_interval: s.shot_interval(),
            magazine: s.total_magazine(),
            reload_time: s.total_reload(),
            bullet_velocity: s.total_velocity(),
            projectile_lifetime: s.total_lifetime(),
            bullets_per_shot: s.bullets_per_shot,
            bullet_spread: s.bullet_spread,
            crit_chance: s.crit_chance,
            crit_damage_multiplier: s.crit_damage_multiplier,
            expected_hit_damage: s.expected_hit_damage(),
            piercing: s.piercing_count,
            bounces: s.bounce_count,
            explosive: s.is_explosive,
            homing: s.is_homing,
            burn: s.burn.unlocked,
            poison: s.poison.unlocked,
            freeze: s.freeze.unlocked,
            shock: s.shock.unlocked,
        }
    }
}

/// Run metadata handed over by the simulation when it finishes.
#[derive(Debug, Clone, Serialize)]
pub struct RunInfo {
    pub weapon: String,
    pub seed: u64,
    pub elapsed_seconds: f32,
    pub step_seconds: f32,
    pub shots_fired: u64,
    /// Projectiles still flying when the run ended.
    pub in_flight: usize,
}

/// `damage_taken` is health actually removed; overkill is not counted.
#[derive(Debug, Clone, Serialize)]
pub struct TargetOutcome {
    pub id: EntityId,
    pub faction: String,
    pub position: Vec3,
    pub health: f32,
    pub max_health: f32,
    pub damage_taken: f32,
    pub alive: bool,
}

/// Damage totals are nominal: each event's full amount, overkill included.
/// Sum `TargetOutcome::damage_taken` for health actually removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    pub shots_fired: u64,
    pub projectiles_fired: u64,
    pub hits: u64,
    pub critical_hits: u64,
    pub hit_damage: f32,
    pub explosion_damage: f32,
    pub chain_damage: f32,
    pub dot_damage: f32,
    pub kills: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub run: RunInfo,
    pub stats: StatSummary,
    pub totals: Totals,
    pub targets: Vec<TargetOutcome>,
    pub events: Vec<TimedEvent>,
}

impl SimulationReport {
    pub fn new(run: RunInfo, stats: &StatBlock, arena: &Arena, events: Vec<TimedEvent>) -> Self {
        let targets: Vec<TargetOutcome> = arena
            .actors()
            .filter(|a| a.damageable)
            .map(|a| TargetOutcome {
                id: a.id,
                faction: a.faction.clone(),
                position: a.position,
                health: a.health,
                max_health: a.max_health,
                damage_taken: a.damage_taken,
                alive: a.health > 0.0,
            })
            .collect();

        let mut totals = Totals {
            shots_fired: run.shots_fired,
            kills: targets.iter().filter(|t| !t.alive).count() as u64,
            ..Totals::default()
        };
        for e in &events {
            match &e.record {
                EventRecord::Fired { .. } => totals.projectiles_fired += 1,
                EventRecord::Combat(c) => match &c.kind {
                    CombatEventKind::Hit { critical, .. } => {
                        totals.hits += 1;
                        if *critical {
                            totals.critical_hits += 1;
                        }
                        totals.hit_damage += c.damage_dealt();
                    }
                    CombatEventKind::Explosion { .. } => totals.explosion_damage += c.damage_dealt(),
                    CombatEventKind::Chain(_) => totals.chain_damage += c.damage_dealt(),
                    _ => {}
                },
                EventRecord::Dot(d) => {
                    if let DotEvent::Damage { amount, .. } = d.event {
                        totals.dot_damage += amount;
                    }
                }
                EventRecord::ShotSkipped { .. } => {}
            }
        }

        Self {
            run,
            stats: StatSummary::from_stats(stats),
            totals,
            targets,
            events,
        }
    }
}

pub fn write_json_report(report: &SimulationReport, path: &Path) -> Result<(), String> {
    let json = serde_json::to_string_pretty(report).map_err(|e| e.to_string())?;
    fs::write(path, json).map_err(|e| e.to_string())?;
    Ok(())
}

pub fn write_html_report(report: &SimulationReport, path: &Path) -> Result<(), String> {
    fs::write(path, render_html(report)).map_err(|e| e.to_string())
}

fn render_html(r: &SimulationReport) -> String {
    let rows: String = r
        .targets
        .iter()
        .map(|t| {
            format!(
                r#"<tr class="{}"><td>{}</td><td>{}</td><td>{:.1} / {:.1}</td><td>{:.1}</td></tr>"#,
                if t.alive { "alive" } else { "dead" },
                t.id,
                html_escape(&t.faction),
                t.health.max(0.0),
                t.max_health,
                t.damage_taken
            )
        })
        .collect();
    let t = &r.totals;
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{} – Ballistics Lab</title>
<style>body{{font-family:system-ui,sans-serif;margin:1rem;}} table{{border-collapse:collapse;}} th,td{{border:1px solid #ccc;padding:6px;}} .dead{{color:#c00;}}</style>
</head>
<body>
<h1>{}</h1>
<p>seed {} · {:.2}s simulated · {} shot(s), {} projectile(s), {} still in flight</p>
<h2>Totals</h2>
<table><tbody>
<tr><th>Hits</th><td>{} ({} critical)</td></tr>
<tr><th>Hit damage</th><td>{:.1}</td></tr>
<tr><th>Explosion damage</th><td>{:.1}</td></tr>
<tr><th>Chain damage</th><td>{:.1}</td></tr>
<tr><th>DoT damage</th><td>{:.1}</td></tr>
<tr><th>Kills</th><td>{}</td></tr>
</tbody></table>
<h2>Targets</h2>
<table><thead><tr><th>Id</th><th>Faction</th><th>Health</th><th>Damage taken</th></tr></thead>
<tbody>{}</tbody></table>
</body>
</html>"#,
        html_escape(&r.run.weapon),
        html_escape(&r.run.weapon),
        r.run.seed,
        r.run.elapsed_seconds,
        r.run.shots_fired,
        t.projectiles_fired,
        r.run.in_flight,
        t.hits,
        t.critical_hits,
        t.hit_damage,
        t.explosion_damage,
        t.chain_damage,
        t.dot_damage,
        t.kills,
        rows
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
