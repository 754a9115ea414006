//! Shock chains: greedy nearest-unvisited hops from the struck target.
//!
//! Not a spanning tree. Each hop searches around the current chain head
//! only, so the path can wander away from the seed. The seed is visited
//! from the start and never chained to.

use crate::projectile::ShockPayload;
use crate::world::{EntityId, HitCategory, World};
use glam::Vec3;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChainHop {
    pub from: EntityId,
    pub to: EntityId,
    pub distance: f32,
    pub damage: f32,
}

/// Pick up to `count` hops. `seed_position` is passed explicitly because
/// the seed may already be dead from the hit that triggered the chain.
pub fn select_chain<W: World + ?Sized>(
    world: &W,
    seed: EntityId,
    seed_position: Vec3,
    owner: EntityId,
    range: f32,
    count: u32,
) -> Vec<(EntityId, EntityId, f32)> {
    let mut visited = BTreeSet::from([seed]);
    let mut head = seed;
    let mut head_pos = seed_position;
    let mut hops = Vec::new();

    for _ in 0..count {
        let next = world
            .entities_within(head_pos, range)
            .into_iter()
            .filter(|&id| id != owner && !visited.contains(&id))
            .filter(|&id| world.classify(id, owner) == HitCategory::Damageable)
            .filter_map(|id| world.position(id).map(|p| (id, p, p.distance(head_pos))))
            .filter(|&(_, _, d)| d <= range)
            .min_by(|a, b| a.2.total_cmp(&b.2).then_with(|| a.0.cmp(&b.0)));
        let Some((id, pos, dist)) = next else {
            break;
        };
        visited.insert(id);
        hops.push((head, id, dist));
        head = id;
        head_pos = pos;
    }
    hops
}

/// Select the chain, then damage each hop in order.
pub fn resolve_chain<W: World + ?Sized>(
    world: &mut W,
    seed: EntityId,
    seed_position: Vec3,
    owner: EntityId,
    payload: &ShockPayload,
) -> Vec<ChainHop> {
    let hops = select_chain(
        world,
        seed,
        seed_position,
        owner,
        payload.range,
        payload.count,
    );
    hops.into_iter()
        .map(|(from, to, distance)| {
            world.apply_damage(to, payload.damage);
            tracing::debug!(%from, %to, distance, damage = payload.damage, "chain hop");
            ChainHop {
                from,
                to,
                distance,
                damage: payload.damage,
            }
        })
        .collect()
}
