//! Boss archetypes and their special maneuvers.
//!
//! An archetype is a closed, immutable configuration record. The boss name
//! hashes to one of them, so every client derives the same boss from the same
//! session name.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::combat::forward_from_yaw;
use crate::rng::hash_name;

/// Behavior weights consumed by the boss director. All in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AiWeights {
    pub aggro: f32,
    pub defend: f32,
    pub dodge: f32,
    pub strafe: f32,
    pub heavy_chance: f32,
    pub parry_master: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Archetype {
    Agile,
    Aggressive,
    Tank,
    Duelist,
}

impl Archetype {
    /// Hash order; changing it reassigns every named boss.
    pub const ALL: [Archetype; 4] = [
        Archetype::Agile,
        Archetype::Aggressive,
        Archetype::Tank,
        Archetype::Duelist,
    ];

    pub fn from_boss_name(name: &str) -> Self {
        let idx = (hash_name(name).unsigned_abs() % Self::ALL.len() as u64) as usize;
        Self::ALL[idx]
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Agile => "agile",
            Self::Aggressive => "aggressive",
            Self::Tank => "tank",
            Self::Duelist => "duelist",
        }
    }

    pub fn base_health(self) -> f32 {
        match self {
            Self::Agile => 250.0,
            Self::Aggressive => 400.0,
            Self::Tank => 600.0,
            Self::Duelist => 300.0,
        }
    }

    pub fn base_posture(self) -> f32 {
        match self {
            Self::Agile => 120.0,
            Self::Aggressive => 200.0,
            Self::Tank => 350.0,
            Self::Duelist => 250.0,
        }
    }

    pub fn move_speed(self) -> f32 {
        match self {
            Self::Agile => 9.0,
            Self::Aggressive => 7.5,
            Self::Tank => 4.0,
            Self::Duelist => 6.0,
        }
    }

    /// Visual scale of the boss proxy.
    pub fn scale(self) -> f32 {
        match self {
            Self::Agile => 1.1,
            Self::Aggressive => 1.4,
            Self::Tank => 1.5,
            Self::Duelist => 1.2,
        }
    }

    /// 0xRRGGBB
    pub fn color(self) -> u32 {
        match self {
            Self::Agile => 0x00bcd4,
            Self::Aggressive => 0xd32f2f,
            Self::Tank => 0x607d8b,
            Self::Duelist => 0x9c27b0,
        }
    }

    pub fn weights(self) -> AiWeights {
        match self {
            Self::Agile => AiWeights {
                aggro: 0.4,
                defend: 0.1,
                dodge: 0.8,
                strafe: 0.8,
                heavy_chance: 0.2,
                parry_master: false,
            },
            Self::Aggressive => AiWeights {
                aggro: 0.9,
                defend: 0.05,
                dodge: 0.1,
                strafe: 0.1,
                heavy_chance: 0.7,
                parry_master: false,
            },
            Self::Tank => AiWeights {
                aggro: 0.3,
                defend: 0.8,
                dodge: 0.0,
                strafe: 0.2,
                heavy_chance: 0.9,
                parry_master: false,
            },
            Self::Duelist => AiWeights {
                aggro: 0.5,
                defend: 0.6,
                dodge: 0.4,
                strafe: 0.5,
                heavy_chance: 0.4,
                parry_master: true,
            },
        }
    }

    pub fn special(self) -> SpecialMove {
        match self {
            Self::Agile => SpecialMove::PhantomFlurry,
            Self::Aggressive => SpecialMove::Whirlwind,
            Self::Tank => SpecialMove::Earthshaker,
            Self::Duelist => SpecialMove::DeathLunge,
        }
    }
}

// ============================================================================
// SPECIAL MANEUVERS
// ============================================================================

/// Special hit outcome against an open or unblockable defender.
pub const SPECIAL_DAMAGE: f32 = 25.0;
pub const SPECIAL_POSTURE: f32 = 40.0;
/// Outcome when a blockable special meets a raised guard.
pub const SPECIAL_CHIP_DAMAGE: f32 = 5.0;
pub const SPECIAL_CHIP_POSTURE: f32 = 40.0;

/// Earthshaker rises while more than this much time remains, then slams.
pub const EARTHSHAKER_SLAM_AT: f32 = 0.5;
/// Death Lunge phases, by remaining time.
pub const LUNGE_WINDUP_UNTIL: f32 = 0.35;
pub const LUNGE_THRUST_AT: f32 = 0.15;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialMove {
    #[serde(rename = "Phantom Flurry")]
    PhantomFlurry,
    #[serde(rename = "Whirlwind")]
    Whirlwind,
    #[serde(rename = "Earthshaker")]
    Earthshaker,
    #[serde(rename = "Death Lunge")]
    DeathLunge,
}

impl SpecialMove {
    pub fn name(self) -> &'static str {
        match self {
            Self::PhantomFlurry => "Phantom Flurry",
            Self::Whirlwind => "Whirlwind",
            Self::Earthshaker => "Earthshaker",
            Self::DeathLunge => "Death Lunge",
        }
    }

    /// Inverse of [`name`](Self::name); `None` for the empty or unknown strings
    /// that appear in replicated boss records.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Phantom Flurry" => Some(Self::PhantomFlurry),
            "Whirlwind" => Some(Self::Whirlwind),
            "Earthshaker" => Some(Self::Earthshaker),
            "Death Lunge" => Some(Self::DeathLunge),
            _ => None,
        }
    }

    pub fn duration(self) -> f32 {
        match self {
            Self::DeathLunge => 0.8,
            Self::Earthshaker => 1.0,
            Self::PhantomFlurry => 1.5,
            Self::Whirlwind => 3.0,
        }
    }

    pub fn unblockable(self) -> bool {
        matches!(self, Self::Earthshaker | Self::DeathLunge)
    }

    /// Single hit test of the maneuver. `timer` is the remaining special time.
    pub fn hits(self, timer: f32, attacker: Vec2, attacker_yaw: f32, defender: Vec2) -> bool {
        let dist = attacker.distance(defender);
        match self {
            Self::Whirlwind => dist < 4.0,
            Self::PhantomFlurry => dist < 3.0,
            Self::Earthshaker => timer < 0.3 && dist < 7.0,
            Self::DeathLunge => {
                if timer >= LUNGE_THRUST_AT || dist >= 5.0 {
                    return false;
                }
                let to_defender = (defender - attacker).normalize_or_zero();
                forward_from_yaw(attacker_yaw).dot(to_defender) > 0.9
            }
        }
    }
}
