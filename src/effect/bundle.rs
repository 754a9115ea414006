//! Upgrade pickups and the tier-weighted table they are rolled from.

use super::EffectEntry;
use crate::config::ConfigError;
use crate::util::normalize_id;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One pickup: an ordered list of effects applied together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeBundle {
    pub name: String,
    pub tier: usize,
    pub effects: Vec<EffectEntry>,
}

impl UpgradeBundle {
    pub fn new(name: impl Into<String>, tier: usize, effects: Vec<EffectEntry>) -> Self {
        Self {
            name: name.into(),
            tier,
            effects,
        }
    }
}

/// Owned table of bundles plus the weights used to pick a tier.
/// Passed by reference to whoever rolls; there is no process-wide pool.
#[derive(Debug, Clone, Default)]
pub struct UpgradeTable {
    tier_weights: Vec<u32>,
    bundles: Vec<UpgradeBundle>,
}

impl UpgradeTable {
    /// Bundles whose tier has no weight entry are folded into the last tier.
    pub fn new(tier_weights: Vec<u32>, bundles: Vec<UpgradeBundle>) -> Self {
        let tier_weights = if tier_weights.is_empty() {
            vec![1]
        } else {
            tier_weights
        };
        let last = tier_weights.len() - 1;
        let bundles = bundles
            .into_iter()
            .map(|mut b| {
                if b.tier > last {
                    tracing::warn!(bundle = %b.name, tier = b.tier, "tier has no weight; using tier {}", last);
                    b.tier = last;
                }
                b
            })
            .collect();
        Self {
            tier_weights,
            bundles,
        }
    }

    pub fn bundles(&self) -> &[UpgradeBundle] {
        &self.bundles
    }

    pub fn tier_weights(&self) -> &[u32] {
        &self.tier_weights
    }

    pub fn get(&self, name: &str) -> Option<&UpgradeBundle> {
        let key = normalize_id(name);
        self.bundles.iter().find(|b| normalize_id(&b.name) == key)
    }

    /// Look up bundles by name, preserving the given order.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<&UpgradeBundle>, ConfigError> {
        names
            .iter()
            .map(|n| {
                self.get(n.as_ref())
                    .ok_or_else(|| ConfigError::UnknownBundle(n.as_ref().to_string()))
            })
            .collect()
    }

    /// Pick a tier by weight (tiers with no bundles are skipped), then a bundle uniformly within it.
    pub fn roll<R: Rng>(&self, rng: &mut R) -> Option<&UpgradeBundle> {
        let weights: Vec<u32> = self
            .tier_weights
            .iter()
            .enumerate()
            .map(|(tier, &w)| {
                if self.bundles.iter().any(|b| b.tier == tier) {
                    w
                } else {
                    0
                }
            })
            .collect();
        let total: u64 = weights.iter().map(|&w| w as u64).sum();
        if total == 0 {
            return None;
        }
        let mut pick = rng.gen_range(0..total);
        let mut tier = 0;
        for (i, &w) in weights.iter().enumerate() {
            if pick < w as u64 {
                tier = i;
                break;
            }
            pick -= w as u64;
        }
        let candidates: Vec<&UpgradeBundle> =
            self.bundles.iter().filter(|b| b.tier == tier).collect();
        let idx = rng.gen_range(0..candidates.len());
        Some(candidates[idx])
    }
}
