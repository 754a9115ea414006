//! Configuration loading and validation.

mod scenario;

pub use scenario::{
    ScenarioConfig, ShotConfig, SimulationSettings, TargetConfig, WallConfig,
};

use crate::effect::{apply_upgrade_bundle, EffectEntry, UpgradeBundle, UpgradeTable};
use crate::stats::{StatBlock, WeaponBase};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Lower bound for total fire rate (shots per second).
pub const MIN_FIRE_RATE: f32 = 0.1;

/// Lower bound for total reload time in seconds.
pub const MIN_RELOAD_TIME: f32 = 0.1;

/// Lower bound for total bullet velocity (units per second).
pub const MIN_BULLET_VELOCITY: f32 = 1.0;

/// Lower bound for total projectile lifetime in seconds.
pub const MIN_PROJECTILE_LIFETIME: f32 = 0.1;

/// Lower bound for total magazine size.
pub const MIN_MAGAZINE_SIZE: i32 = 1;

/// Ceiling for freeze slow; a frozen target always keeps 5% of its speed.
pub const MAX_FREEZE_SLOW: f32 = 0.95;

/// Hard ceiling for shock chain hops per hit.
pub const MAX_CHAIN_COUNT: u32 = 32;

/// Hard ceiling for pellets spawned by one trigger pull.
pub const MAX_BULLETS_PER_SHOT: u32 = 64;

/// DoT trackers tick on this fixed period, independent of frame rate.
pub const DOT_TICK_SECONDS: f32 = 1.0;

/// Radius searched when a homing projectile (re)acquires a target.
pub const HOMING_ACQUIRE_RANGE: f32 = 30.0;

/// Upper bound on collision contacts processed in one motion step.
pub const MAX_CONTACTS_PER_STEP: usize = 64;

/// Default simulation step in seconds (60 Hz).
pub const DEFAULT_STEP_SECONDS: f32 = 1.0 / 60.0;

/// Default simulation window in seconds.
pub const DEFAULT_SIMULATION_SECONDS: f32 = 10.0;

/// Default tier weights for upgrade rolls: common, uncommon, rare, epic.
pub const DEFAULT_TIER_WEIGHTS: [u32; 4] = [60, 25, 12, 3];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported file extension for {0} (expected .toml or .json)")]
    UnsupportedFormat(PathBuf),
    #[error("unknown upgrade bundle: {0}")]
    UnknownBundle(String),
    #[error("weapon {0} lists bundles but no upgrade table was given")]
    MissingUpgradeTable(String),
}

/// Weapon definition file: base stats plus bundles already collected.
#[derive(Debug, Clone, Deserialize)]
pub struct WeaponConfig {
    #[serde(default = "default_weapon_name")]
    pub name: String,
    #[serde(default)]
    pub base: WeaponBase,
    /// Names of bundles (looked up in an upgrade table) acquired so far, in pickup order.
    #[serde(default)]
    pub bundles: Vec<String>,
}

fn default_weapon_name() -> String {
    "weapon".to_string()
}

impl Default for WeaponConfig {
    fn default() -> Self {
        Self {
            name: default_weapon_name(),
            base: WeaponBase::default(),
            bundles: Vec::new(),
        }
    }
}

impl WeaponConfig {
    /// Fresh stat block from the sanitized base, with every listed bundle folded in pickup order.
    pub fn build_stats(&self, table: Option<&UpgradeTable>) -> Result<StatBlock, ConfigError> {
        self.build_stats_with(table, &[] as &[&str])
    }

    /// Like [`build_stats`](Self::build_stats), then `extra` bundles on top.
    pub fn build_stats_with<S: AsRef<str>>(
        &self,
        table: Option<&UpgradeTable>,
        extra: &[S],
    ) -> Result<StatBlock, ConfigError> {
        let mut stats = StatBlock::new(self.base.sanitized());
        if self.bundles.is_empty() && extra.is_empty() {
            return Ok(stats);
        }
        let table = table.ok_or_else(|| ConfigError::MissingUpgradeTable(self.name.clone()))?;
        let listed = table.resolve(self.bundles.as_slice())?;
        let extra = table.resolve(extra)?;
        for bundle in listed.into_iter().chain(extra) {
            tracing::debug!(weapon = %self.name, bundle = %bundle.name, "applying bundle");
            apply_upgrade_bundle(bundle, &mut stats);
        }
        Ok(stats)
    }
}

/// One upgrade pickup as written in a table file.
#[derive(Debug, Clone, Deserialize)]
pub struct BundleConfig {
    pub name: String,
    #[serde(default)]
    pub tier: usize,
    #[serde(default)]
    pub effects: Vec<EffectEntry>,
}

/// Upgrade table file: bundles and the tier weights used to roll them.
#[derive(Debug, Clone, Deserialize)]
pub struct UpgradeTableConfig {
    #[serde(default = "default_tier_weights")]
    pub tier_weights: Vec<u32>,
    #[serde(default)]
    pub bundles: Vec<BundleConfig>,
}

fn default_tier_weights() -> Vec<u32> {
    DEFAULT_TIER_WEIGHTS.to_vec()
}

impl UpgradeTableConfig {
    pub fn into_table(self) -> UpgradeTable {
        let bundles = self
            .bundles
            .into_iter()
            .map(|b| UpgradeBundle::new(b.name, b.tier, b.effects))
            .collect();
        UpgradeTable::new(self.tier_weights, bundles)
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_toml<T: serde::de::DeserializeOwned>(path: &Path, s: &str) -> Result<T, ConfigError> {
    toml::from_str(s).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_weapon(path: &Path) -> Result<WeaponConfig, ConfigError> {
    parse_toml(path, &read(path)?)
}

pub fn load_scenario(path: &Path) -> Result<ScenarioConfig, ConfigError> {
    parse_toml(path, &read(path)?)
}

/// Load an upgrade table from `.toml` or `.json`; the schema is the same for both.
pub fn load_upgrade_table(path: &Path) -> Result<UpgradeTable, ConfigError> {
    let s = read(path)?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let cfg: UpgradeTableConfig = match ext.as_deref() {
        Some("toml") => parse_toml(path, &s)?,
        Some("json") => serde_json::from_str(&s).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?,
        _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    };
    Ok(cfg.into_table())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::EffectKind;

    #[test]
    fn upgrade_table_from_toml() {
        let cfg: UpgradeTableConfig = toml::from_str(
            r#"
            tier_weights = [10, 1]

            [[bundles]]
            name = "Hot Rounds"
            tier = 1
            effects = [
                { kind = "burn_unlock", value = 1.0 },
                { kind = "burn_dps", value = 4.0 },
            ]
            "#,
        )
        .expect("parse");
        let table = cfg.into_table();
        let b = table.get("hot rounds").expect("bundle by normalized name");
        assert_eq!(b.tier, 1);
        assert_eq!(b.effects[1].kind, EffectKind::BurnDps);
    }

    #[test]
    fn weapon_defaults_when_fields_missing() {
        let w: WeaponConfig = toml::from_str("name = \"pistol\"").expect("parse");
        assert_eq!(w.name, "pistol");
        assert!(w.bundles.is_empty());
        assert!(w.base.damage > 0.0);
    }

    #[test]
    fn build_stats_folds_bundles_in_order() {
        let table = UpgradeTable::new(
            vec![1],
            vec![
                UpgradeBundle::new("Heavy", 0, vec![EffectEntry::new(EffectKind::DamageFlat, 5.0)]),
                UpgradeBundle::new("Pierce", 0, vec![EffectEntry::new(EffectKind::Piercing, 1.0)]),
            ],
        );
        let mut w = WeaponConfig::default();
        w.bundles = vec!["heavy".into(), "Heavy".into()];
        let stats = w.build_stats_with(Some(&table), &["pierce"]).expect("stats");
        assert!((stats.total_damage() - (w.base.damage + 10.0)).abs() < 1e-5);
        assert_eq!(stats.piercing_count, 1);

        assert!(matches!(
            w.build_stats(None),
            Err(ConfigError::MissingUpgradeTable(_))
        ));
        w.bundles = vec!["nope".into()];
        assert!(matches!(
            w.build_stats(Some(&table)),
            Err(ConfigError::UnknownBundle(n)) if n == "nope"
        ));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("table.yaml");
        fs::write(&path, "bundles: []").expect("write");
        assert!(matches!(
            load_upgrade_table(&path),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }
}
