//! Applying replicated records to locally simulated stand-ins.
//!
//! Replicas are owned by this layer: snapshots overwrite vitals, edges in the
//! action flags restart swing and guard timers locally so hit windows line up
//! with the owner's, and transforms are smoothed toward the last snapshot.

use glam::{Vec2, Vec3};

use crate::archetype::SpecialMove;
use crate::combat::{self, AttackKind, defaults};
use crate::combatant::{Combatant, PeerId, Swing};
use crate::director::{AiState, BossDirector};
use crate::protocol::{BossRecord, PeerRecord, PeerState, PlanarPos, WorldPos};
use crate::rng::Roll;

/// Frame-rate independent smoothing factor.
pub fn smoothing(dt: f32, speed: f32) -> f32 {
    (dt * speed).clamp(0.0, 1.0)
}

/// Another participant's fighter as seen from here.
#[derive(Clone, Debug, PartialEq)]
pub struct RemotePeer {
    pub combatant: Combatant,
    pub name: String,
    pub color: u32,
    target_pos: Vec2,
    target_yaw: f32,
    /// Flags from the previous snapshot, for edge detection.
    was_attacking: bool,
    was_healing: bool,
}

impl RemotePeer {
    pub fn spawn(id: PeerId, record: &PeerRecord, position: Vec3) -> Self {
        let combatant = Combatant::player(id, position);
        let mut peer = Self {
            target_pos: combatant.planar(),
            target_yaw: combatant.yaw,
            combatant,
            name: record.name.clone(),
            color: record.color,
            was_attacking: false,
            was_healing: false,
        };
        if record.state.is_populated() {
            peer.snap(&record.state);
        }
        peer
    }

    pub fn id(&self) -> &PeerId {
        &self.combatant.id
    }

    /// Jump straight to a snapshot's transform, used for the first one.
    fn snap(&mut self, state: &PeerState) {
        if let Some(pos) = state.pos {
            self.target_pos = pos.into();
            self.combatant.position.x = pos.x;
            self.combatant.position.z = pos.z;
        }
        if let Some(rot) = state.rot {
            self.target_yaw = rot;
            self.combatant.yaw = rot;
        }
        self.combatant.health = state.health.unwrap_or(self.combatant.health);
        self.combatant.posture = state.posture.unwrap_or(self.combatant.posture);
    }

    pub fn apply(&mut self, state: &PeerState, rng: &mut impl Roll) {
        let fighter = &mut self.combatant;
        if let Some(pos) = state.pos {
            self.target_pos = Vec2::from(pos);
        }
        if let Some(rot) = state.rot {
            self.target_yaw = rot;
        }

        if state.attacking && !self.was_attacking {
            let kind = state.attack_type.unwrap_or_default();
            fighter.attacking = true;
            fighter.attack_kind = kind;
            fighter.timers.attack = kind.duration();
            fighter.has_hit = false;
            fighter.swing = match kind {
                AttackKind::Heavy => Swing::Overhead,
                _ if rng.roll() < 0.5 => Swing::Left,
                _ => Swing::Right,
            };
        } else if !state.attacking && self.was_attacking {
            fighter.attacking = false;
            fighter.timers.attack = 0.0;
        }
        self.was_attacking = state.attacking;

        if let Some(blocking) = state.blocking {
            if blocking && !fighter.blocking {
                fighter.timers.parry = defaults::PARRY_WINDOW_SECS;
            }
            fighter.blocking = blocking;
        }

        if state.healing && !self.was_healing {
            fighter.healing = true;
            fighter.timers.heal = defaults::HEAL_CAST_SECS;
        } else if !state.healing {
            fighter.healing = false;
            fighter.timers.heal = 0.0;
        }
        self.was_healing = state.healing;

        if let Some(health) = state.health {
            fighter.health = health;
        }
        if let Some(posture) = state.posture {
            fighter.posture = posture;
        }
        match state.stunned {
            Some(true) if !fighter.is_stunned() => {
                fighter.timers.stun = defaults::STUN_SECS;
                fighter.posture = fighter.max_posture;
            }
            Some(false) => fighter.timers.stun = 0.0,
            _ => {}
        }
    }

    /// Ease the transform toward the last snapshot.
    pub fn interpolate(&mut self, dt: f32, speed: f32) {
        let alpha = smoothing(dt, speed);
        let fighter = &mut self.combatant;
        let pos = fighter.planar().lerp(self.target_pos, alpha);
        fighter.position.x = pos.x;
        fighter.position.z = pos.y;
        fighter.yaw += combat::angle_delta(fighter.yaw, self.target_yaw) * alpha;
    }
}

/// What this participant publishes about its own fighter.
pub fn peer_state(fighter: &Combatant) -> PeerState {
    PeerState {
        pos: Some(PlanarPos::from(fighter.planar())),
        rot: Some(fighter.yaw),
        attacking: fighter.attacking,
        attack_type: Some(fighter.attack_kind),
        blocking: Some(fighter.blocking),
        healing: fighter.healing,
        health: Some(fighter.health),
        posture: Some(fighter.posture),
        stunned: Some(fighter.is_stunned()),
    }
}

// ============================================================================
// BOSS
// ============================================================================

/// Host snapshot of the canonical boss.
pub fn boss_record(boss: &Combatant, director: &BossDirector) -> BossRecord {
    BossRecord {
        pos: WorldPos::from(boss.position),
        rot: boss.yaw,
        health: boss.health,
        posture: boss.posture,
        ai_state: director.state,
        attacking: boss.attacking,
        attack_type: boss.attack_kind,
        attack_timer: boss.timers.attack,
        special_attacking: boss.special.is_some(),
        special_type: boss.special.map(|s| s.name().to_string()).unwrap_or_default(),
        stunned: boss.is_stunned(),
        target_id: director
            .current_target
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_default(),
    }
}

/// Follower-side view of the host's boss.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BossMirror {
    target: Option<(Vec3, f32)>,
    was_attacking: bool,
    was_special: bool,
}

impl BossMirror {
    pub fn apply(
        &mut self,
        boss: &mut Combatant,
        director: &mut BossDirector,
        record: &BossRecord,
        rng: &mut impl Roll,
    ) {
        let pos = Vec3::from(record.pos);
        if self.target.is_none() {
            boss.position = pos;
            boss.yaw = record.rot;
        }
        self.target = Some((pos, record.rot));

        boss.health = record.health;
        boss.posture = record.posture;
        director.state = record.ai_state;
        director.current_target =
            (!record.target_id.is_empty()).then(|| PeerId::from(record.target_id.as_str()));

        if record.attacking && !self.was_attacking {
            let kind = record.attack_type;
            boss.attacking = true;
            boss.attack_kind = kind;
            boss.timers.attack = if record.attack_timer > 0.0 {
                record.attack_timer
            } else {
                kind.duration()
            };
            boss.has_hit = false;
            boss.swing = match kind {
                AttackKind::Heavy => Swing::Overhead,
                _ if rng.roll() < 0.5 => Swing::Left,
                _ => Swing::Right,
            };
        } else if !record.attacking && self.was_attacking {
            boss.attacking = false;
            boss.timers.attack = 0.0;
        }
        self.was_attacking = record.attacking;

        if record.special_attacking && !self.was_special {
            if let Some(special) = SpecialMove::from_name(&record.special_type) {
                boss.special = Some(special);
                boss.timers.attack = if record.attack_timer > 0.0 {
                    record.attack_timer
                } else {
                    special.duration()
                };
                boss.has_hit = false;
                boss.slammed = false;
            }
        } else if !record.special_attacking && self.was_special {
            boss.special = None;
        }
        self.was_special = record.special_attacking;

        if record.stunned && !boss.is_stunned() {
            boss.timers.stun = defaults::STUN_SECS;
        } else if !record.stunned {
            boss.timers.stun = 0.0;
        }

        // the guard is not on the wire; the host raises it exactly while defending
        let guarding = record.ai_state == AiState::Defend && !record.stunned;
        if guarding && !boss.blocking {
            boss.timers.parry = defaults::PARRY_WINDOW_SECS;
        } else if !guarding {
            boss.timers.parry = 0.0;
        }
        boss.blocking = guarding;
    }

    pub fn interpolate(&self, boss: &mut Combatant, dt: f32, speed: f32) {
        let Some((pos, yaw)) = self.target else {
            return;
        };
        let alpha = smoothing(dt, speed);
        boss.position = boss.position.lerp(pos, alpha);
        boss.yaw += combat::angle_delta(boss.yaw, yaw) * alpha;
    }
}
