//! End-to-end combat scenarios through the resolver.
//!
//! Each test builds an attacker and a defender face to face, puts the swing
//! inside its hit window and resolves the pair once.

use glam::{Vec2, Vec3};
use shadow_duel_shared::archetype::{Archetype, SpecialMove};
use shadow_duel_shared::arena::Arena;
use shadow_duel_shared::combatant::Combatant;
use shadow_duel_shared::resolver::{CombatEvent, HitProbe, Outcome, Ownership, resolve_pair};
use shadow_duel_shared::{AttackKind, Simulation};

/// Probe that always reports contact at the defender's chest.
struct Touching;

impl HitProbe for Touching {
    fn weapon_points(&self, _: &Combatant) -> Vec<Vec3> {
        vec![Vec3::new(0.0, 1.2, 1.5)]
    }
}

/// Attacker at the origin facing +Z, defender 1.5 ahead facing back.
fn duel() -> (Combatant, Combatant) {
    let attacker = Combatant::player("p_attacker", Vec3::ZERO);
    let mut defender = Combatant::player("p_defender", Vec3::new(0.0, 0.0, 1.5));
    defender.yaw = std::f32::consts::PI;
    (attacker, defender)
}

/// Start a swing and fast-forward it into the middle of its hit window.
fn mid_swing(attacker: &mut Combatant, kind: AttackKind) {
    attacker.attacking = true;
    attacker.attack_kind = kind;
    attacker.has_hit = false;
    attacker.timers.attack = kind.duration() * 0.45;
}

fn resolve(attacker: &mut Combatant, defender: &mut Combatant) -> (Option<Outcome>, Vec<CombatEvent>) {
    let mut events = Vec::new();
    let outcome = resolve_pair(attacker, defender, Ownership::BOTH, &Touching, &mut events);
    (outcome, events)
}

// =============================================================================
// Unblocked hits
// =============================================================================

#[test]
fn test_light_hit_on_fresh_target() {
    let (mut attacker, mut defender) = duel();
    mid_swing(&mut attacker, AttackKind::Light);

    let (outcome, events) = resolve(&mut attacker, &mut defender);

    assert!(matches!(outcome, Some(Outcome::Hit(_))));
    assert_eq!(defender.health, 85.0);
    assert_eq!(defender.posture, 25.0);
    assert!(attacker.has_hit);
    assert!(events.iter().any(|e| matches!(e, CombatEvent::Hit { damage, .. } if *damage == 15.0)));
}

#[test]
fn test_heavy_hit_on_stunned_target() {
    let (mut attacker, mut defender) = duel();
    defender.timers.stun = 0.5;
    defender.posture = defender.max_posture;
    mid_swing(&mut attacker, AttackKind::Heavy);

    let (outcome, _) = resolve(&mut attacker, &mut defender);

    let Some(Outcome::Hit(damage)) = outcome else {
        panic!("expected a clean hit, got {outcome:?}");
    };
    assert_eq!(damage.damage, 60.0);
    assert_eq!(damage.posture_damage, 60.0);
    assert_eq!(defender.health, 40.0);
    // posture stays pinned for the rest of the stun
    assert_eq!(defender.posture, defender.max_posture);
}

#[test]
fn test_heavy_hit_locks_out_attacker() {
    let (mut attacker, mut defender) = duel();
    mid_swing(&mut attacker, AttackKind::Heavy);
    resolve(&mut attacker, &mut defender);
    assert!(attacker.is_locked_out());
}

#[test]
fn test_one_hit_per_swing() {
    let (mut attacker, mut defender) = duel();
    mid_swing(&mut attacker, AttackKind::Light);
    resolve(&mut attacker, &mut defender);
    let (again, _) = resolve(&mut attacker, &mut defender);
    assert_eq!(again, None);
    assert_eq!(defender.health, 85.0);
}

#[test]
fn test_outside_hit_window_nothing_lands() {
    let (mut attacker, mut defender) = duel();
    mid_swing(&mut attacker, AttackKind::Light);
    attacker.timers.attack = AttackKind::Light.duration() * 0.9;
    let (outcome, _) = resolve(&mut attacker, &mut defender);
    assert_eq!(outcome, None);
    assert!(!attacker.has_hit);
}

#[test]
fn test_invulnerable_defender_dodges() {
    let (mut attacker, mut defender) = duel();
    defender.timers.invuln = 0.1;
    mid_swing(&mut attacker, AttackKind::Heavy);

    let (outcome, events) = resolve(&mut attacker, &mut defender);

    assert_eq!(outcome, Some(Outcome::Dodged));
    assert_eq!(defender.health, 100.0);
    assert_eq!(defender.posture, 0.0);
    assert!(matches!(events.as_slice(), [CombatEvent::Dodged { .. }]));
}

// =============================================================================
// Guarded hits
// =============================================================================

#[test]
fn test_plain_block_of_light_attack() {
    let (mut attacker, mut defender) = duel();
    defender.blocking = true;
    defender.timers.parry = 0.0;
    mid_swing(&mut attacker, AttackKind::Light);

    let (outcome, _) = resolve(&mut attacker, &mut defender);

    assert!(matches!(outcome, Some(Outcome::Blocked(_))));
    assert_eq!(defender.health, 97.0);
    assert_eq!(defender.posture, 30.0);
    assert_eq!(defender.stamina, 90.0);
    assert_eq!(attacker.posture, 0.0);
}

#[test]
fn test_parry_of_heavy_attack() {
    let (mut attacker, mut defender) = duel();
    defender.blocking = true;
    defender.timers.parry = 0.1;
    mid_swing(&mut attacker, AttackKind::Heavy);

    let (outcome, events) = resolve(&mut attacker, &mut defender);

    assert!(matches!(outcome, Some(Outcome::Parried(_))));
    assert_eq!(defender.health, 100.0);
    assert_eq!(defender.posture, 5.0);
    assert_eq!(attacker.posture, 80.0);
    assert_eq!(attacker.timers.attack, 0.0);
    assert_eq!(attacker.timers.action_lockout, 0.15);
    assert!(events.iter().any(|e| matches!(e, CombatEvent::Parried { .. })));
}

#[test]
fn test_guard_break_takes_unblocked_damage() {
    let (mut attacker, mut defender) = duel();
    defender.blocking = true;
    defender.timers.parry = 0.1;
    defender.stamina = 5.0;
    mid_swing(&mut attacker, AttackKind::Light);

    let (outcome, events) = resolve(&mut attacker, &mut defender);

    assert!(matches!(outcome, Some(Outcome::GuardBreak(_))));
    assert_eq!(defender.stamina, 0.0);
    assert_eq!(defender.health, 85.0);
    assert_eq!(defender.posture, 25.0);
    assert!(events.iter().any(|e| matches!(e, CombatEvent::GuardBreak { .. })));
}

#[test]
fn test_guard_facing_away_is_ignored() {
    let (mut attacker, mut defender) = duel();
    defender.blocking = true;
    defender.yaw = 0.0;
    mid_swing(&mut attacker, AttackKind::Light);

    let (outcome, _) = resolve(&mut attacker, &mut defender);

    assert!(matches!(outcome, Some(Outcome::Hit(_))));
    assert_eq!(defender.health, 85.0);
}

#[test]
fn test_posture_break_interrupts_heal() {
    let (mut attacker, mut defender) = duel();
    defender.health = 60.0;
    assert!(defender.heal());
    defender.posture = 90.0;
    mid_swing(&mut attacker, AttackKind::Light);

    let (_, events) = resolve(&mut attacker, &mut defender);

    assert!(defender.is_stunned());
    assert!(!defender.healing);
    assert!(events.iter().any(|e| matches!(e, CombatEvent::PostureBroken { .. })));
}

// =============================================================================
// Ownership
// =============================================================================

#[test]
fn test_unowned_defender_is_untouched() {
    let (mut attacker, mut defender) = duel();
    mid_swing(&mut attacker, AttackKind::Light);
    let mut events = Vec::new();
    let own = Ownership { attacker: true, defender: false };

    let outcome = resolve_pair(&mut attacker, &mut defender, own, &Touching, &mut events);

    assert!(matches!(outcome, Some(Outcome::Hit(_))));
    assert_eq!(defender.health, 100.0);
    assert!(attacker.has_hit);
}

// =============================================================================
// Specials
// =============================================================================

fn boss_with(special: SpecialMove, archetype: Archetype) -> Combatant {
    let mut boss = Combatant::boss(archetype, Vec3::ZERO);
    boss.start_special(special);
    boss
}

#[test]
fn test_blockable_special_chips_a_guard() {
    let mut boss = boss_with(SpecialMove::Whirlwind, Archetype::Aggressive);
    let (_, mut defender) = duel();
    defender.blocking = true;

    let (outcome, _) = resolve(&mut boss, &mut defender);

    assert_eq!(outcome, Some(Outcome::SpecialChip));
    assert_eq!(defender.health, 95.0);
    assert_eq!(defender.posture, 40.0);
}

#[test]
fn test_unblockable_special_ignores_guard() {
    let mut boss = boss_with(SpecialMove::Earthshaker, Archetype::Tank);
    boss.timers.attack = 0.2;
    let (_, mut defender) = duel();
    defender.blocking = true;

    let (outcome, events) = resolve(&mut boss, &mut defender);

    assert!(matches!(outcome, Some(Outcome::SpecialHit { .. })));
    assert_eq!(defender.health, 75.0);
    assert_eq!(defender.posture, 40.0);
    assert!(events.iter().any(|e| matches!(
        e,
        CombatEvent::SpecialHit { special: SpecialMove::Earthshaker, .. }
    )));
}

#[test]
fn test_death_lunge_needs_facing() {
    let mut boss = boss_with(SpecialMove::DeathLunge, Archetype::Duelist);
    boss.timers.attack = 0.1;
    let (_, mut defender) = duel();

    boss.yaw = std::f32::consts::PI;
    assert_eq!(resolve(&mut boss, &mut defender).0, None);

    boss.yaw = 0.0;
    assert!(matches!(resolve(&mut boss, &mut defender).0, Some(Outcome::SpecialHit { .. })));
}

// =============================================================================
// Boss scaling
// =============================================================================

#[test]
fn test_boss_rescale_three_players() {
    // "a" hashes to the aggressive archetype: 400 health, 200 posture
    let mut sim = Simulation::new("p_local", "a", Arena::default());
    assert_eq!(sim.archetype, Archetype::Aggressive);
    sim.boss.health = 200.0;
    sim.boss.posture = 0.0;

    sim.rescale_boss(3);

    assert_eq!(sim.boss.max_health, 880.0);
    assert_eq!(sim.boss.max_posture, 360.0);
    assert_eq!(sim.boss.health, 440.0);
    assert_eq!(sim.boss.posture, 0.0);
}

#[test]
fn test_facing_helpers_agree() {
    let (attacker, defender) = duel();
    let to_attacker = attacker.planar() - defender.planar();
    assert!(defender.forward().dot(to_attacker.normalize()) > 0.99);
    assert_eq!(attacker.forward(), Vec2::new(0.0, 1.0));
}
