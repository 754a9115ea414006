//! Scenario files: the arena, the weapon, and the scripted shots to replay.

use super::{WeaponConfig, DEFAULT_SIMULATION_SECONDS, DEFAULT_STEP_SECONDS};
use crate::world::EntityId;
use glam::Vec3;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub simulation: SimulationSettings,
    #[serde(default)]
    pub weapon: WeaponConfig,
    /// Upgrade table used to resolve `weapon.bundles`; relative paths are resolved
    /// against the scenario file's directory.
    #[serde(default)]
    pub upgrade_table: Option<PathBuf>,
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
    #[serde(default)]
    pub walls: Vec<WallConfig>,
    #[serde(default)]
    pub shots: Vec<ShotConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationSettings {
    #[serde(default = "default_duration")]
    pub duration_seconds: f32,
    #[serde(default = "default_step")]
    pub step_seconds: f32,
    /// Seed for crit and spread rolls.
    #[serde(default)]
    pub seed: u64,
    /// When set, projectiles pass through actors of the shooter's faction.
    #[serde(default)]
    pub friendly_pass_through: bool,
}

fn default_duration() -> f32 {
    DEFAULT_SIMULATION_SECONDS
}

fn default_step() -> f32 {
    DEFAULT_STEP_SECONDS
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            duration_seconds: DEFAULT_SIMULATION_SECONDS,
            step_seconds: DEFAULT_STEP_SECONDS,
            seed: 0,
            friendly_pass_through: false,
        }
    }
}

/// A spherical actor in the arena. The shooter is an actor too.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    pub id: EntityId,
    pub position: Vec3,
    #[serde(default = "default_radius")]
    pub radius: f32,
    #[serde(default = "default_health")]
    pub health: f32,
    #[serde(default = "default_faction")]
    pub faction: String,
    #[serde(default)]
    pub velocity: Vec3,
    /// Non-damageable actors block projectiles like walls but have a position.
    #[serde(default = "default_true")]
    pub damageable: bool,
}

fn default_radius() -> f32 {
    0.5
}

fn default_health() -> f32 {
    100.0
}

fn default_faction() -> String {
    "enemy".to_string()
}

fn default_true() -> bool {
    true
}

/// An infinite plane; projectiles collide when crossing it against its normal.
#[derive(Debug, Clone, Deserialize)]
pub struct WallConfig {
    pub point: Vec3,
    pub normal: Vec3,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShotConfig {
    #[serde(default)]
    pub time: f32,
    pub owner: EntityId,
    pub origin: Vec3,
    pub heading: Vec3,
}
