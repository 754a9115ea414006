use super::*;
use crate::config::MAX_CONTACTS_PER_STEP;
use crate::stats::StatBlock;
use crate::world::{Actor, Arena, Wall};

const OWNER: EntityId = EntityId(1);
const DT: f32 = 0.1;

/// 10 damage, 10 units/s, no crit.
fn stats() -> StatBlock {
    let mut s = StatBlock::default();
    s.base.bullet_velocity = 10.0;
    s.crit_chance = 0.0;
    s
}

fn enemy(id: u64, pos: Vec3) -> Actor {
    Actor::new(EntityId(id), pos, "enemy")
}

fn arena_with_owner(owner_pos: Vec3) -> Arena {
    let mut a = Arena::new();
    a.insert(Actor::new(OWNER, owner_pos, "player"));
    a
}

fn shoot(s: &StatBlock, origin: Vec3, heading: Vec3) -> ProjectileState {
    ProjectileState::from_stats(s, origin, heading, OWNER, false).with_id(7)
}

fn run(
    r: &mut ProjectileResolver,
    p: &mut ProjectileState,
    a: &mut Arena,
    max_steps: usize,
) -> (ProjectileOutcome, usize) {
    for step in 1..=max_steps {
        if r.advance(p, a, DT) == ProjectileOutcome::Destroyed {
            return (ProjectileOutcome::Destroyed, step);
        }
    }
    (ProjectileOutcome::Continue, max_steps)
}

fn damage_taken(a: &Arena, id: u64) -> f32 {
    a.actor(EntityId(id)).map(|x| x.damage_taken).unwrap_or(-1.0)
}

fn destroy_reason(r: &ProjectileResolver) -> Option<DestroyReason> {
    r.events().iter().rev().find_map(|e| match e.kind {
        CombatEventKind::Destroyed { reason, .. } => Some(reason),
        _ => None,
    })
}

#[test]
fn two_pierces_hit_three_targets_then_terminate() {
    let mut a = arena_with_owner(Vec3::new(-5.0, 0.0, 0.0));
    for (id, x) in [(2, 2.0), (3, 4.0), (4, 6.0), (5, 8.0)] {
        a.insert(enemy(id, Vec3::new(x, 0.0, 0.0)));
    }
    let mut s = stats();
    s.piercing_count = 2;
    let mut p = shoot(&s, Vec3::ZERO, Vec3::X);
    let mut r = ProjectileResolver::new();

    let (outcome, _) = run(&mut r, &mut p, &mut a, 100);

    assert_eq!(outcome, ProjectileOutcome::Destroyed);
    assert_eq!(damage_taken(&a, 2), 10.0);
    assert_eq!(damage_taken(&a, 3), 10.0);
    assert_eq!(damage_taken(&a, 4), 10.0);
    assert_eq!(damage_taken(&a, 5), 0.0);
    assert_eq!(p.piercing_remaining, 0);
    assert_eq!(destroy_reason(&r), Some(DestroyReason::Impact));
    assert!((p.position.x - 5.5).abs() < 1e-4);
    assert!(p.is_destroyed());
    assert_eq!(r.advance(&mut p, &mut a, DT), ProjectileOutcome::Destroyed);
}

#[test]
fn bounce_reflects_then_next_blocker_destroys() {
    let mut a = arena_with_owner(Vec3::new(-3.0, 0.0, 0.0));
    a.add_wall(Wall::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0)));
    a.add_wall(Wall::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0)));
    let mut s = stats();
    s.bounce_count = 1;
    let mut p = shoot(&s, Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0));
    let mut r = ProjectileResolver::new();

    let (outcome, _) = run(&mut r, &mut p, &mut a, 100);

    assert_eq!(outcome, ProjectileOutcome::Destroyed);
    let bounce = r
        .events()
        .iter()
        .find_map(|e| match e.kind {
            CombatEventKind::Bounce { point, heading, .. } => Some((point, heading)),
            _ => None,
        })
        .expect("bounce event");
    let expected = Vec3::new(1.0, 0.0, -1.0).normalize();
    assert!(bounce.1.abs_diff_eq(expected, 1e-5), "{:?}", bounce.1);
    assert!((bounce.0.z - 5.0).abs() < 1e-4);
    assert_eq!(destroy_reason(&r), Some(DestroyReason::BounceExhausted));
    assert!((p.position.z + 5.0).abs() < 1e-4);
}

#[test]
fn blocker_without_bounces_terminates() {
    let mut a = arena_with_owner(Vec3::new(-3.0, 0.0, 0.0));
    a.insert(Actor::new(EntityId(9), Vec3::new(3.0, 0.0, 0.0), "prop").solid());
    let mut p = shoot(&stats(), Vec3::ZERO, Vec3::X);
    let mut r = ProjectileResolver::new();
    let (outcome, _) = run(&mut r, &mut p, &mut a, 100);
    assert_eq!(outcome, ProjectileOutcome::Destroyed);
    assert_eq!(destroy_reason(&r), Some(DestroyReason::BounceExhausted));
    assert!((p.position.x - 2.5).abs() < 1e-4);
}

#[test]
fn pass_through_costs_nothing() {
    let mut a = arena_with_owner(Vec3::new(-3.0, 0.0, 0.0)).with_friendly_pass_through(true);
    a.insert(Actor::new(EntityId(3), Vec3::new(2.0, 0.0, 0.0), "player"));
    a.insert(enemy(2, Vec3::new(4.0, 0.0, 0.0)));
    let mut s = stats();
    s.piercing_count = 1;
    let mut p = shoot(&s, Vec3::ZERO, Vec3::X);
    let mut r = ProjectileResolver::new();

    for _ in 0..10 {
        r.advance(&mut p, &mut a, DT);
    }
    assert_eq!(damage_taken(&a, 3), 0.0);
    assert!(!p.hit_set.contains(&EntityId(3)));
    assert_eq!(damage_taken(&a, 2), 10.0);
    assert_eq!(p.piercing_remaining, 0);
    assert!(!p.is_destroyed());
}

#[test]
fn hit_set_prevents_double_hit_inside_a_target() {
    let mut a = arena_with_owner(Vec3::new(-3.0, 0.0, 0.0));
    // Large target: a piercing shot spends several steps inside it.
    a.insert(enemy(2, Vec3::new(3.0, 0.0, 0.0)).with_radius(2.0));
    let mut s = stats();
    s.piercing_count = 3;
    let mut p = shoot(&s, Vec3::ZERO, Vec3::X);
    let mut r = ProjectileResolver::new();
    for _ in 0..80 {
        r.advance(&mut p, &mut a, DT);
    }
    assert_eq!(damage_taken(&a, 2), 10.0);
    assert_eq!(p.piercing_remaining, 2);
}

#[test]
fn side_effects_run_in_fixed_order() {
    let mut a = arena_with_owner(Vec3::ZERO);
    a.insert(enemy(2, Vec3::new(3.0, 0.0, 0.0)));
    a.insert(enemy(3, Vec3::new(4.0, 0.0, 0.0)));
    a.insert(enemy(4, Vec3::new(7.0, 0.0, 0.0)));
    let mut s = stats();
    s.burn.unlocked = true;
    s.is_explosive = true;
    s.shock.unlocked = true;
    let mut p = shoot(&s, Vec3::ZERO, Vec3::X);
    let mut r = ProjectileResolver::new();
    run(&mut r, &mut p, &mut a, 100);

    let kinds: Vec<&str> = r
        .events()
        .iter()
        .map(|e| match e.kind {
            CombatEventKind::Hit { .. } => "hit",
            CombatEventKind::DotApplied { .. } => "dot",
            CombatEventKind::Explosion { .. } => "explosion",
            CombatEventKind::Chain(_) => "chain",
            CombatEventKind::Destroyed { .. } => "destroyed",
            _ => "other",
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["hit", "dot", "explosion", "chain", "chain", "destroyed"]
    );

    let chain: Vec<(u64, u64)> = r
        .events()
        .iter()
        .filter_map(|e| match e.kind {
            CombatEventKind::Chain(h) => Some((h.from.0, h.to.0)),
            _ => None,
        })
        .collect();
    assert_eq!(chain, vec![(2, 3), (3, 4)]);

    // Hit + explosion on the struck target; explosion + chain on its neighbour.
    assert_eq!(damage_taken(&a, 2), 20.0);
    assert_eq!(damage_taken(&a, 3), 15.0);
    assert_eq!(damage_taken(&a, 4), 5.0);
    assert_eq!(damage_taken(&a, 1), 0.0);

    // DoT only on the struck target.
    assert!(a.actor(EntityId(2)).map(|x| x.dots.burn().is_some()).unwrap_or(false));
    assert!(a.actor(EntityId(3)).map(|x| x.dots.is_empty()).unwrap_or(false));
}

#[test]
fn explosion_spares_owner_and_non_damageables() {
    let mut a = arena_with_owner(Vec3::new(1.0, 0.0, 1.0));
    a.insert(enemy(2, Vec3::new(3.0, 0.0, 0.0)));
    a.insert(Actor::new(EntityId(9), Vec3::new(3.0, 0.0, 2.0), "prop").solid());
    let mut s = stats();
    s.is_explosive = true;
    s.explosion_radius = 5.0;
    let mut p = shoot(&s, Vec3::ZERO, Vec3::X);
    let mut r = ProjectileResolver::new();
    run(&mut r, &mut p, &mut a, 100);
    let targets = r
        .events()
        .iter()
        .find_map(|e| match &e.kind {
            CombatEventKind::Explosion { targets, .. } => Some(targets.clone()),
            _ => None,
        })
        .expect("explosion");
    assert_eq!(targets, vec![EntityId(2)]);
    assert_eq!(damage_taken(&a, 1), 0.0);
}

#[test]
fn lifetime_expiry_destroys_without_side_effects() {
    let mut a = arena_with_owner(Vec3::new(-3.0, 0.0, 0.0));
    let mut s = stats();
    s.base.projectile_lifetime = 0.25;
    let mut p = shoot(&s, Vec3::ZERO, Vec3::X);
    let mut r = ProjectileResolver::new();
    let (outcome, steps) = run(&mut r, &mut p, &mut a, 100);
    assert_eq!(outcome, ProjectileOutcome::Destroyed);
    assert_eq!(steps, 3);
    // Two full steps, then the 0.05 s left of the lifetime.
    assert!((p.position.x - 2.5).abs() < 1e-4);
    assert_eq!(destroy_reason(&r), Some(DestroyReason::Expired));
    assert_eq!(r.events().len(), 1);
}

#[test]
fn reach_is_velocity_times_lifetime_at_any_step() {
    for dt in [0.5, 0.3, 0.1] {
        let mut a = arena_with_owner(Vec3::new(-3.0, 0.0, 0.0));
        let mut s = stats();
        s.base.projectile_lifetime = 1.0;
        let mut p = shoot(&s, Vec3::ZERO, Vec3::X);
        let mut r = ProjectileResolver::new();
        let mut steps = 0;
        while r.advance(&mut p, &mut a, dt) == ProjectileOutcome::Continue {
            steps += 1;
            assert!(steps < 100);
        }
        assert_eq!(destroy_reason(&r), Some(DestroyReason::Expired), "dt {dt}");
        assert!((p.position.x - 10.0).abs() < 1e-3, "dt {dt}: {}", p.position.x);
    }
}

#[test]
fn coarse_step_still_hits_target_inside_reach() {
    let mut a = arena_with_owner(Vec3::new(-3.0, 0.0, 0.0));
    a.insert(enemy(2, Vec3::new(8.0, 0.0, 0.0)));
    let mut s = stats();
    s.base.projectile_lifetime = 1.0;
    let mut p = shoot(&s, Vec3::ZERO, Vec3::X);
    let mut r = ProjectileResolver::new();
    assert_eq!(r.advance(&mut p, &mut a, 0.5), ProjectileOutcome::Continue);
    assert_eq!(r.advance(&mut p, &mut a, 0.5), ProjectileOutcome::Destroyed);
    assert_eq!(destroy_reason(&r), Some(DestroyReason::Impact));
    assert_eq!(damage_taken(&a, 2), 10.0);
}

#[test]
fn contact_limit_stops_at_last_handled_contact() {
    let mut a = arena_with_owner(Vec3::new(-5.0, 0.0, 0.0));
    let crowd = MAX_CONTACTS_PER_STEP as u64 + 6;
    for i in 0..crowd {
        let x = 1.0 + i as f32 * 0.1;
        a.insert(enemy(100 + i, Vec3::new(x, 0.0, 0.0)).with_radius(0.01));
    }
    a.add_wall(Wall::new(Vec3::new(9.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0)));
    let mut s = stats();
    s.piercing_count = 1000;
    let mut p = shoot(&s, Vec3::ZERO, Vec3::X);
    let mut r = ProjectileResolver::new();

    assert_eq!(r.advance(&mut p, &mut a, 1.0), ProjectileOutcome::Continue);
    assert_eq!(p.hit_set.len(), MAX_CONTACTS_PER_STEP);
    assert!(p.position.x < 9.0, "tunnelled to {}", p.position.x);

    assert_eq!(r.advance(&mut p, &mut a, 1.0), ProjectileOutcome::Destroyed);
    assert_eq!(destroy_reason(&r), Some(DestroyReason::BounceExhausted));
    assert_eq!(p.hit_set.len(), crowd as usize);
    assert!((p.position.x - 9.0).abs() < 1e-4);
}

#[test]
fn owner_gone_cancels_before_any_hit() {
    let mut a = arena_with_owner(Vec3::new(-3.0, 0.0, 0.0));
    a.insert(enemy(2, Vec3::new(3.0, 0.0, 0.0)));
    let mut s = stats();
    s.shock.unlocked = true;
    let mut p = shoot(&s, Vec3::ZERO, Vec3::X);
    let mut r = ProjectileResolver::new();
    r.advance(&mut p, &mut a, DT);
    a.despawn(OWNER);
    assert_eq!(r.advance(&mut p, &mut a, DT), ProjectileOutcome::Destroyed);
    assert_eq!(destroy_reason(&r), Some(DestroyReason::OwnerGone));
    assert_eq!(damage_taken(&a, 2), 0.0);
}

#[test]
fn homing_curves_gradually_toward_target() {
    let mut a = arena_with_owner(Vec3::new(-3.0, 0.0, 0.0));
    a.insert(enemy(2, Vec3::new(10.0, 5.0, 0.0)));
    let mut s = stats();
    s.is_homing = true;
    s.homing_strength = 5.0;
    let mut p = shoot(&s, Vec3::ZERO, Vec3::X);
    let mut r = ProjectileResolver::new();

    r.advance(&mut p, &mut a, DT);
    let desired = (Vec3::new(10.0, 5.0, 0.0) - Vec3::ZERO).normalize();
    assert!(p.heading.y > 0.0, "turned toward target");
    assert!(p.heading.dot(desired) < 0.999, "no instant snap");
    assert_eq!(p.homing.and_then(|h| h.target), Some(EntityId(2)));

    let (outcome, _) = run(&mut r, &mut p, &mut a, 100);
    assert_eq!(outcome, ProjectileOutcome::Destroyed);
    assert_eq!(damage_taken(&a, 2), 10.0);
}

#[test]
fn homing_falls_back_to_straight_flight_when_target_dies() {
    let mut a = arena_with_owner(Vec3::new(-3.0, 0.0, 0.0));
    a.insert(enemy(2, Vec3::new(10.0, 5.0, 0.0)));
    let mut s = stats();
    s.is_homing = true;
    let mut p = shoot(&s, Vec3::ZERO, Vec3::X);
    let mut r = ProjectileResolver::new();
    r.advance(&mut p, &mut a, DT);
    a.apply_damage(EntityId(2), 1000.0);
    let before = p.heading;
    assert_eq!(r.advance(&mut p, &mut a, DT), ProjectileOutcome::Continue);
    assert_eq!(p.heading, before);
    assert_eq!(p.homing.and_then(|h| h.target), None);
}

#[test]
fn homing_reacquires_after_bounce() {
    let mut a = arena_with_owner(Vec3::new(0.0, 0.0, -10.0));
    a.insert(enemy(2, Vec3::new(-3.0, 0.0, 3.0)));
    a.insert(enemy(3, Vec3::new(4.0, 0.0, 4.0)));
    a.add_wall(Wall::new(Vec3::new(5.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0)));
    let mut s = stats();
    s.is_homing = true;
    s.homing_strength = 0.01;
    s.bounce_count = 1;
    let mut p = shoot(&s, Vec3::ZERO, Vec3::X);
    let mut r = ProjectileResolver::new();
    for _ in 0..8 {
        r.advance(&mut p, &mut a, DT);
    }
    let acquired: Vec<EntityId> = r
        .events()
        .iter()
        .filter_map(|e| match e.kind {
            CombatEventKind::HomingAcquired { target } => Some(target),
            _ => None,
        })
        .collect();
    assert_eq!(acquired, vec![EntityId(2), EntityId(3)]);
}

#[test]
fn resolution_order_across_projectiles_does_not_matter() {
    fn world() -> Arena {
        let mut a = arena_with_owner(Vec3::new(0.0, 0.0, -10.0));
        a.insert(enemy(2, Vec3::new(3.0, 0.0, 0.0)).with_health(1000.0));
        a.insert(enemy(3, Vec3::new(-3.0, 0.0, 0.0)).with_health(1000.0));
        a.insert(enemy(4, Vec3::new(0.0, 0.0, 4.0)).with_health(1000.0));
        a
    }
    let mut s = stats();
    s.is_explosive = true;
    s.burn.unlocked = true;
    let shots = [
        (Vec3::ZERO, Vec3::X),
        (Vec3::ZERO, Vec3::NEG_X),
        (Vec3::new(0.0, 0.0, 1.0), Vec3::Z),
        (Vec3::new(0.1, 0.0, 1.0), Vec3::Z),
    ];

    let simulate = |order: &[usize]| {
        let mut a = world();
        let mut r = ProjectileResolver::new();
        let mut ps: Vec<ProjectileState> = shots
            .iter()
            .enumerate()
            .map(|(i, (o, h))| shoot(&s, *o, *h).with_id(i as u64))
            .collect();
        for _ in 0..60 {
            for &i in order {
                r.advance(&mut ps[i], &mut a, DT);
            }
            for act in [2u64, 3, 4] {
                if let Some(x) = a.actor_mut(EntityId(act)) {
                    crate::dot::tick_dot(x, DT);
                }
            }
        }
        let health: Vec<f32> = a.actors().map(|x| x.health).collect();
        let destroyed: Vec<bool> = ps.iter().map(|p| p.is_destroyed()).collect();
        (health, destroyed)
    };

    let forward = simulate(&[0, 1, 2, 3]);
    let reverse = simulate(&[3, 2, 1, 0]);
    let shuffled = simulate(&[2, 0, 3, 1]);
    assert_eq!(forward, reverse);
    assert_eq!(forward, shuffled);
}
