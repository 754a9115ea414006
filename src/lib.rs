//! Weapon upgrade composer and projectile effect resolver: library entry point.
//!
//! Exposes stats, effect, projectile, resolver, dot, chain, world, scheduler
//! and report for use by the CLI and tests.

pub mod chain;
pub mod config;
pub mod dot;
pub mod effect;
pub mod projectile;
pub mod report;
pub mod resolver;
pub mod scheduler;
pub mod stats;
pub mod util;
pub mod world;

pub use effect::{apply_upgrade_bundle, EffectEntry, EffectKind, UpgradeBundle};
pub use projectile::{fire_projectile, ProjectileState};
pub use resolver::{ProjectileOutcome, ProjectileResolver};
pub use stats::StatBlock;
