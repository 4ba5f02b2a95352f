//! Shared combat rules — constants, damage tables, stamina economy, timing windows, threat.
//!
//! Every function here is pure: the same inputs always give the same outputs, and
//! nothing in this module touches a [`Combatant`](crate::combatant::Combatant).

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Default combat stats — single source of truth for every participant.
pub mod defaults {
    pub const PLAYER_HEALTH: f32 = 100.0;
    pub const PLAYER_POSTURE: f32 = 100.0;
    pub const PLAYER_SPEED: f32 = 10.0;
    pub const DASH_SPEED: f32 = 30.0;
    pub const BODY_RADIUS: f32 = 0.5;
    pub const ESTUS_CHARGES: u32 = 3;

    pub const HEAL_PERCENT: f32 = 0.4;
    pub const HEAL_CAST_SECS: f32 = 1.0;
    pub const STUN_SECS: f32 = 1.0;
    pub const ACTION_LOCKOUT_SECS: f32 = 0.15;
    pub const DASH_INVULN_SECS: f32 = 0.2;
    pub const DASH_COOLDOWN_SECS: f32 = 0.5;
    pub const PARRY_WINDOW_SECS: f32 = 0.2;
    pub const CHARGE_THRESHOLD_SECS: f32 = 0.2;
    /// Passive posture recovery per second while not committed to an action.
    pub const POSTURE_DECAY: f32 = 2.0;

    /// A blocker must face the attacker at least this much (dot product).
    pub const BLOCK_FACING_DOT: f32 = 0.4;
    /// Extra reach added to the defender's body radius for weapon contact.
    pub const HIT_RADIUS_PAD: f32 = 0.3;
    pub const HIT_BAND_LOW: f32 = 0.5;
    pub const HIT_BAND_HIGH: f32 = 2.0;

    pub const STUN_DAMAGE_MULTIPLIER: f32 = 1.5;
}

/// Stamina economy.
pub mod stamina {
    pub const MAX: f32 = 100.0;
    pub const REGEN_RATE: f32 = 30.0;
    pub const REGEN_DELAY_SECS: f32 = 0.8;

    pub const COST_DASH: f32 = 20.0;
    pub const COST_LIGHT: f32 = 15.0;
    pub const COST_HEAVY: f32 = 30.0;
    pub const COST_BLOCK_HIT: f32 = 10.0;
}

/// Swing durations (seconds).
pub mod attack_timing {
    pub const LIGHT_DURATION: f32 = 0.3;
    pub const HEAVY_DURATION: f32 = 0.8;
}

/// Where the hit window sits, as fractions of the swing duration still *remaining*.
pub mod hit_timing {
    /// The window opens once the remaining timer drops below this fraction.
    pub const OPEN_REMAINING_FRACTION: f32 = 0.7;
    /// The window closes once the remaining timer drops to this fraction.
    pub const CLOSE_REMAINING_FRACTION: f32 = 0.2;
}

/// Threat weights used by the boss when choosing whom to fight.
pub mod threat {
    pub const DISTANCE_WEIGHT: f32 = 2.0;
    pub const ATTACKING: f32 = 50.0;
    pub const LANDED_HIT: f32 = 30.0;
    pub const STUNNED: f32 = 80.0;
    pub const HEALING: f32 = 60.0;
    pub const LOW_HEALTH: f32 = 40.0;
    pub const LOW_HEALTH_RATIO: f32 = 0.3;
    pub const DAMAGE_WEIGHT: f32 = 0.5;
    pub const DAMAGE_CAP: f32 = 100.0;
    pub const STICKY: f32 = 25.0;
    /// Upper bound of the uniform jitter the director adds per candidate.
    pub const JITTER: f32 = 20.0;
}

/// Boss scaling per extra player.
pub mod scaling {
    pub const HEALTH_PER_PLAYER: f32 = 0.6;
    pub const POSTURE_PER_PLAYER: f32 = 0.4;
}

// ============================================================================
// ATTACKS
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackKind {
    #[default]
    Light,
    Heavy,
}

impl AttackKind {
    pub fn duration(self) -> f32 {
        attack_duration(self)
    }

    pub fn stamina_action(self) -> StaminaAction {
        match self {
            Self::Light => StaminaAction::Light,
            Self::Heavy => StaminaAction::Heavy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Heavy => "heavy",
        }
    }
}

/// Actions that draw from the stamina pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StaminaAction {
    Dash,
    Light,
    Heavy,
    BlockHit,
}

impl StaminaAction {
    pub const fn cost(self) -> f32 {
        match self {
            Self::Dash => stamina::COST_DASH,
            Self::Light => stamina::COST_LIGHT,
            Self::Heavy => stamina::COST_HEAVY,
            Self::BlockHit => stamina::COST_BLOCK_HIT,
        }
    }
}

/// Damage of a clean hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitDamage {
    pub damage: f32,
    pub posture_damage: f32,
}

/// Damage that leaks through a raised guard.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockedDamage {
    pub health_damage: f32,
    pub posture_damage: f32,
    pub attacker_posture_damage: f32,
}

/// Unblocked damage. A stunned target takes 1.5× health damage (floored);
/// posture damage ignores the stun.
pub fn compute_damage(kind: AttackKind, target_stunned: bool) -> HitDamage {
    let (base, posture) = match kind {
        AttackKind::Heavy => (40.0, 60.0),
        AttackKind::Light => (15.0, 25.0),
    };
    HitDamage {
        damage: stun_scaled(base, target_stunned),
        posture_damage: posture,
    }
}

/// Applies the stun multiplier to a health-damage value.
pub fn stun_scaled(damage: f32, target_stunned: bool) -> f32 {
    let multiplier = if target_stunned {
        defaults::STUN_DAMAGE_MULTIPLIER
    } else {
        1.0
    };
    (damage * multiplier).floor()
}

pub fn compute_blocked_damage(kind: AttackKind, is_parry: bool) -> BlockedDamage {
    if is_parry {
        return BlockedDamage {
            health_damage: 0.0,
            posture_damage: 5.0,
            attacker_posture_damage: match kind {
                AttackKind::Heavy => 80.0,
                AttackKind::Light => 35.0,
            },
        };
    }

    match kind {
        AttackKind::Heavy => BlockedDamage {
            health_damage: 10.0,
            posture_damage: 70.0,
            attacker_posture_damage: 0.0,
        },
        AttackKind::Light => BlockedDamage {
            health_damage: 3.0,
            posture_damage: 30.0,
            attacker_posture_damage: 0.0,
        },
    }
}

pub fn is_posture_broken(current: f32, max: f32) -> bool {
    current >= max
}

pub fn heal_amount(max_health: f32, percent: f32) -> f32 {
    (max_health * percent).floor()
}

// ============================================================================
// STAMINA
// ============================================================================

pub fn can_afford(stamina: f32, action: StaminaAction) -> bool {
    stamina >= action.cost()
}

pub fn spend(stamina: f32, action: StaminaAction) -> f32 {
    (stamina - action.cost()).max(0.0)
}

pub fn regenerate(stamina: f32, dt: f32, max: f32) -> f32 {
    (stamina + stamina::REGEN_RATE * dt.max(0.0)).min(max)
}

// ============================================================================
// TIMING WINDOWS
// ============================================================================

pub fn attack_duration(kind: AttackKind) -> f32 {
    match kind {
        AttackKind::Heavy => attack_timing::HEAVY_DURATION,
        AttackKind::Light => attack_timing::LIGHT_DURATION,
    }
}

/// True while the countdown `attack_timer` sits strictly between 20 % and 70 %
/// of the swing's duration.
/// Remaining-timer bounds `(closes, opens)` of the hit window, both exclusive.
pub fn hit_window(kind: AttackKind) -> (f32, f32) {
    let duration = attack_duration(kind);
    (
        duration * hit_timing::CLOSE_REMAINING_FRACTION,
        duration * hit_timing::OPEN_REMAINING_FRACTION,
    )
}

pub fn is_in_hit_window(attack_timer: f32, kind: AttackKind) -> bool {
    let (closes, opens) = hit_window(kind);
    attack_timer < opens && attack_timer > closes
}

pub fn is_within_parry_window(parry_timer: f32) -> bool {
    parry_timer > 0.0
}

// ============================================================================
// GEOMETRY
// ============================================================================

/// Project a world position onto the XZ ground plane.
pub fn planar(v: Vec3) -> Vec2 {
    Vec2::new(v.x, v.z)
}

/// Unit facing on the XZ plane for a yaw. Yaw 0 faces +Z.
pub fn forward_from_yaw(yaw: f32) -> Vec2 {
    Vec2::new(yaw.sin(), yaw.cos())
}

/// Yaw that makes `from` face `to` on the XZ plane.
pub fn yaw_towards(from: Vec2, to: Vec2) -> f32 {
    let delta = to - from;
    delta.x.atan2(delta.y)
}

/// Right-hand side of a planar direction, `forward × up` in a Y-up world.
pub fn right_of(dir: Vec2) -> Vec2 {
    Vec2::new(-dir.y, dir.x)
}

/// Shortest signed angle from `from` to `to`, in `(-PI, PI]`.
pub fn angle_delta(from: f32, to: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let mut diff = (to - from) % TAU;
    if diff > PI {
        diff -= TAU;
    } else if diff <= -PI {
        diff += TAU;
    }
    diff
}

/// Whether a defender facing `forward` squarely faces a point at `toward`.
pub fn is_facing(defender_pos: Vec2, forward: Vec2, toward: Vec2) -> bool {
    let to_attacker = (toward - defender_pos).normalize_or_zero();
    forward.dot(to_attacker) > defaults::BLOCK_FACING_DOT
}

/// 2D cone check on the XZ plane. Returns true if target is within range and arc.
pub fn cone_hit_check(
    origin: Vec2,
    forward: Vec2,
    target: Vec2,
    range: f32,
    half_arc_cos: f32,
) -> bool {
    let delta = target - origin;
    let dist = delta.length();

    if dist > range {
        return false;
    }

    if dist > 0.01 {
        let dir = delta / dist;
        if forward.dot(dir) < half_arc_cos {
            return false;
        }
    }

    true
}

/// Any weapon sample point inside the defender's padded body cylinder.
pub fn weapon_contact(points: &[Vec3], defender_pos: Vec3, body_radius: f32) -> bool {
    let reach = body_radius + defaults::HIT_RADIUS_PAD;
    let center = planar(defender_pos);
    points.iter().any(|p| {
        planar(*p).distance(center) < reach
            && p.y > defaults::HIT_BAND_LOW
            && p.y < defaults::HIT_BAND_HIGH
    })
}

// ============================================================================
// THREAT
// ============================================================================

/// What the boss can see of a candidate target.
#[derive(Clone, Debug, PartialEq)]
pub struct ThreatInput<'a> {
    pub id: &'a str,
    pub position: Vec2,
    pub is_attacking: bool,
    pub has_hit: bool,
    pub is_stunned: bool,
    pub is_healing: bool,
    pub health: f32,
    pub max_health: f32,
    /// Cumulative damage this target has dealt to the boss.
    pub damage_dealt: f32,
}

pub fn compute_threat(target: &ThreatInput<'_>, boss_pos: Vec2, current_target: Option<&str>) -> f32 {
    let mut score = 0.0;

    score -= boss_pos.distance(target.position) * threat::DISTANCE_WEIGHT;

    if target.is_attacking {
        score += threat::ATTACKING;
    }
    if target.has_hit {
        score += threat::LANDED_HIT;
    }
    if target.is_stunned {
        score += threat::STUNNED;
    }
    if target.is_healing {
        score += threat::HEALING;
    }
    if target.max_health > 0.0 && target.health / target.max_health < threat::LOW_HEALTH_RATIO {
        score += threat::LOW_HEALTH;
    }
    if target.damage_dealt > 0.0 {
        score += (target.damage_dealt * threat::DAMAGE_WEIGHT).min(threat::DAMAGE_CAP);
    }
    if current_target == Some(target.id) {
        score += threat::STICKY;
    }

    score
}

// ============================================================================
// BOSS SCALING
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaledStats {
    pub max_health: f32,
    pub max_posture: f32,
}

pub fn scale_boss_stats(base_health: f32, base_posture: f32, player_count: usize) -> ScaledStats {
    let extra = player_count.saturating_sub(1) as f32;
    ScaledStats {
        max_health: (base_health * (1.0 + extra * scaling::HEALTH_PER_PLAYER)).floor(),
        max_posture: (base_posture * (1.0 + extra * scaling::POSTURE_PER_PLAYER)).floor(),
    }
}
