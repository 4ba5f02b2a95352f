//! Per-pair hit resolution.
//!
//! Called once per ordered attacker/defender pair per frame, after both
//! fighters ticked. Decides hit / block / parry / guard break, applies the
//! Arbiter's numbers to whichever side the caller owns, and reports what
//! happened as [`CombatEvent`]s.

use std::f32::consts::FRAC_PI_2;

use glam::{Vec2, Vec3};

use crate::archetype::{
    SPECIAL_CHIP_DAMAGE, SPECIAL_CHIP_POSTURE, SPECIAL_DAMAGE, SPECIAL_POSTURE, SpecialMove,
};
use crate::combat::{
    self, AttackKind, BlockedDamage, HitDamage, StaminaAction, defaults, stamina,
};
use crate::combatant::{Combatant, HitReport, PeerId, Swing};

/// Everything the core reports to the UI and audio collaborators.
#[derive(Clone, Debug, PartialEq)]
pub enum CombatEvent {
    Dodged { id: PeerId },
    Hit { attacker: PeerId, defender: PeerId, kind: AttackKind, damage: f32 },
    Blocked { attacker: PeerId, defender: PeerId },
    Parried { attacker: PeerId, defender: PeerId },
    GuardBreak { defender: PeerId },
    PostureBroken { id: PeerId },
    SpecialHit { attacker: PeerId, defender: PeerId, special: SpecialMove },
    SpecialChip { defender: PeerId, special: SpecialMove },
    Healed { id: PeerId, amount: f32 },
    Defeated { id: PeerId },
    /// Earthshaker slam reached the ground.
    Shockwave { at: Vec2 },
}

/// Outcome of one pair resolution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Outcome {
    Dodged,
    Hit(HitDamage),
    GuardBreak(HitDamage),
    Blocked(BlockedDamage),
    Parried(BlockedDamage),
    SpecialHit { damage: f32, posture_damage: f32 },
    SpecialChip,
}

/// Which side of a pair this participant is allowed to mutate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ownership {
    pub attacker: bool,
    pub defender: bool,
}

impl Ownership {
    pub const BOTH: Self = Self { attacker: true, defender: true };
}

// ============================================================================
// WEAPON GEOMETRY
// ============================================================================

/// Source of world-space weapon sample points for an attacker.
pub trait HitProbe {
    fn weapon_points(&self, attacker: &Combatant) -> Vec<Vec3>;
}

/// Straight blade held at mid-body height, swept across the front arc on
/// light swings and driven straight ahead on heavy ones.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BladeProbe {
    pub samples: usize,
    pub blade_len: f32,
    /// Shoulder pivot distance in front of the body centre.
    pub pivot_reach: f32,
    pub height: f32,
}

impl Default for BladeProbe {
    fn default() -> Self {
        Self {
            samples: 13,
            blade_len: 3.5,
            pivot_reach: 0.8,
            height: 1.2,
        }
    }
}

impl BladeProbe {
    /// Blade direction relative to facing for the current swing phase.
    fn sweep_angle(&self, attacker: &Combatant) -> f32 {
        let t = ((attacker.swing_progress() - 0.3) / 0.4).clamp(0.0, 1.0);
        match attacker.swing {
            Swing::Overhead => 0.0,
            Swing::Left => -FRAC_PI_2 + t * 2.0 * FRAC_PI_2,
            Swing::Right => FRAC_PI_2 - t * 2.0 * FRAC_PI_2,
        }
    }
}

impl HitProbe for BladeProbe {
    fn weapon_points(&self, attacker: &Combatant) -> Vec<Vec3> {
        let forward = attacker.forward();
        let dir = Vec2::from_angle(self.sweep_angle(attacker)).rotate(forward);
        let pivot = attacker.planar() + forward * self.pivot_reach * attacker.scale;
        let len = self.blade_len * attacker.scale;
        let steps = self.samples.max(2) - 1;

        (0..=steps)
            .map(|i| {
                let p = pivot + dir * (len * i as f32 / steps as f32);
                Vec3::new(p.x, self.height, p.y)
            })
            .collect()
    }
}

// ============================================================================
// RESOLUTION
// ============================================================================

/// Resolve whatever the attacker's current swing or special does to the
/// defender this frame. Returns `None` when nothing connected.
pub fn resolve_pair(
    attacker: &mut Combatant,
    defender: &mut Combatant,
    own: Ownership,
    probe: &dyn HitProbe,
    events: &mut Vec<CombatEvent>,
) -> Option<Outcome> {
    if defender.is_defeated() {
        return None;
    }
    if let Some(special) = attacker.special {
        return resolve_special(attacker, defender, special, own, events);
    }
    if !attacker.attacking || attacker.has_hit {
        return None;
    }
    let kind = attacker.attack_kind;
    if !combat::is_in_hit_window(attacker.timers.attack, kind) {
        return None;
    }
    let points = probe.weapon_points(attacker);
    if !combat::weapon_contact(&points, defender.position, defender.body_radius) {
        return None;
    }

    attacker.has_hit = true;
    tracing::trace!(attacker = %attacker.id, defender = %defender.id, ?kind, "weapon contact");

    if defender.is_invulnerable() {
        events.push(CombatEvent::Dodged { id: defender.id.clone() });
        return Some(Outcome::Dodged);
    }

    let damage = combat::compute_damage(kind, defender.is_stunned());
    let guarded = defender.blocking
        && combat::is_facing(defender.planar(), defender.forward(), attacker.planar());

    if !guarded {
        if own.defender {
            strike(defender, damage.damage, damage.posture_damage, events);
        }
        if kind == AttackKind::Heavy && own.attacker {
            attacker.timers.action_lockout = defaults::ACTION_LOCKOUT_SECS;
        }
        events.push(CombatEvent::Hit {
            attacker: attacker.id.clone(),
            defender: defender.id.clone(),
            kind,
            damage: damage.damage,
        });
        return Some(Outcome::Hit(damage));
    }

    if !combat::can_afford(defender.stamina, StaminaAction::BlockHit) {
        if own.defender {
            defender.stamina = 0.0;
            strike(defender, damage.damage, damage.posture_damage, events);
        }
        events.push(CombatEvent::GuardBreak { defender: defender.id.clone() });
        return Some(Outcome::GuardBreak(damage));
    }

    let is_parry = combat::is_within_parry_window(defender.timers.parry);
    let blocked = combat::compute_blocked_damage(kind, is_parry);
    if own.defender {
        defender.stamina = combat::spend(defender.stamina, StaminaAction::BlockHit);
        defender.timers.stamina_regen_delay = stamina::REGEN_DELAY_SECS;
        if defender.take_chip(blocked.health_damage, blocked.posture_damage) {
            events.push(CombatEvent::PostureBroken { id: defender.id.clone() });
        }
        if defender.is_defeated() {
            events.push(CombatEvent::Defeated { id: defender.id.clone() });
        }
    }

    if is_parry {
        if own.attacker {
            if attacker.add_posture(blocked.attacker_posture_damage) {
                events.push(CombatEvent::PostureBroken { id: attacker.id.clone() });
            }
            attacker.deflected();
        }
        events.push(CombatEvent::Parried {
            attacker: attacker.id.clone(),
            defender: defender.id.clone(),
        });
        Some(Outcome::Parried(blocked))
    } else {
        events.push(CombatEvent::Blocked {
            attacker: attacker.id.clone(),
            defender: defender.id.clone(),
        });
        Some(Outcome::Blocked(blocked))
    }
}

fn resolve_special(
    attacker: &mut Combatant,
    defender: &mut Combatant,
    special: SpecialMove,
    own: Ownership,
    events: &mut Vec<CombatEvent>,
) -> Option<Outcome> {
    if attacker.has_hit
        || !special.hits(attacker.timers.attack, attacker.planar(), attacker.yaw, defender.planar())
    {
        return None;
    }
    attacker.has_hit = true;

    if defender.is_invulnerable() {
        events.push(CombatEvent::Dodged { id: defender.id.clone() });
        return Some(Outcome::Dodged);
    }

    if defender.blocking && !special.unblockable() {
        if own.defender {
            if defender.take_chip(SPECIAL_CHIP_DAMAGE, SPECIAL_CHIP_POSTURE) {
                events.push(CombatEvent::PostureBroken { id: defender.id.clone() });
            }
            if defender.is_defeated() {
                events.push(CombatEvent::Defeated { id: defender.id.clone() });
            }
        }
        events.push(CombatEvent::SpecialChip { defender: defender.id.clone(), special });
        return Some(Outcome::SpecialChip);
    }

    let damage = combat::stun_scaled(SPECIAL_DAMAGE, defender.is_stunned());
    if own.defender {
        strike(defender, damage, SPECIAL_POSTURE, events);
    }
    events.push(CombatEvent::SpecialHit {
        attacker: attacker.id.clone(),
        defender: defender.id.clone(),
        special,
    });
    Some(Outcome::SpecialHit { damage, posture_damage: SPECIAL_POSTURE })
}

fn strike(defender: &mut Combatant, damage: f32, posture: f32, events: &mut Vec<CombatEvent>) {
    match defender.take_hit(damage, posture) {
        HitReport::Dodged => events.push(CombatEvent::Dodged { id: defender.id.clone() }),
        HitReport::Landed { posture_broken, defeated } => {
            if posture_broken {
                events.push(CombatEvent::PostureBroken { id: defender.id.clone() });
            }
            if defeated {
                events.push(CombatEvent::Defeated { id: defender.id.clone() });
            }
        }
    }
}
