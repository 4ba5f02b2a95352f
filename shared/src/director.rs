//! Boss behavior state machine.
//!
//! Runs only on the participant that owns the boss. Every decision becomes an
//! intent on the boss [`Combatant`], so the boss is gated by exactly the same
//! stamina, lockout and stun rules as a player.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::archetype::{
    AiWeights, EARTHSHAKER_SLAM_AT, LUNGE_THRUST_AT, LUNGE_WINDUP_UNTIL, SpecialMove,
};
use crate::arena::Arena;
use crate::combat::{self, AttackKind, ThreatInput, right_of, threat};
use crate::combatant::{Combatant, PeerId};
use crate::rng::Roll;

/// Reactive branch reach and the minimum swing time left to react to.
const REACT_RANGE: f32 = 6.0;
const REACT_MIN_SWING: f32 = 0.15;
const PUNISH_RANGE: f32 = 4.5;
const CLOSE_RANGE: f32 = 3.0;
const ENGAGE_RANGE: f32 = 3.5;
const FAR_RANGE: f32 = 8.0;
const STRAFE_FAR: f32 = 5.0;
const STRAFE_NEAR: f32 = 4.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AiState {
    #[default]
    Idle,
    Chase,
    Strafe,
    Defend,
    AttackPrep,
    PerilousPrep,
    Recover,
}

impl AiState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Chase => "CHASE",
            Self::Strafe => "STRAFE",
            Self::Defend => "DEFEND",
            Self::AttackPrep => "ATTACK_PREP",
            Self::PerilousPrep => "PERILOUS_PREP",
            Self::Recover => "RECOVER",
        }
    }

    /// Lenient parse for replicated records; unknown states read as `Idle`.
    pub fn parse(value: &str) -> Self {
        match value {
            "CHASE" => Self::Chase,
            "STRAFE" => Self::Strafe,
            "DEFEND" => Self::Defend,
            "ATTACK_PREP" => Self::AttackPrep,
            "PERILOUS_PREP" => Self::PerilousPrep,
            "RECOVER" => Self::Recover,
            _ => Self::Idle,
        }
    }
}

/// What the director did this tick that the collaborators care about.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DirectorReport {
    pub target: Option<PeerId>,
    /// The special telegraph just began.
    pub perilous_warning: bool,
    pub special_started: Option<SpecialMove>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BossDirector {
    pub state: AiState,
    pub timer: f32,
    /// `1.0` or `-1.0`.
    pub strafe_dir: f32,
    pub current_target: Option<PeerId>,
    pub weights: AiWeights,
    pub special: SpecialMove,
    /// Cumulative damage each player has dealt to the boss.
    damage_dealt: BTreeMap<PeerId, f32>,
}

impl BossDirector {
    pub fn new(weights: AiWeights, special: SpecialMove) -> Self {
        Self {
            state: AiState::Idle,
            timer: 0.0,
            strafe_dir: 1.0,
            current_target: None,
            weights,
            special,
            damage_dealt: BTreeMap::new(),
        }
    }

    pub fn record_damage(&mut self, from: &PeerId, amount: f32) {
        if amount > 0.0 {
            *self.damage_dealt.entry(from.clone()).or_default() += amount;
        }
    }

    pub fn damage_dealt(&self, from: &PeerId) -> f32 {
        self.damage_dealt.get(from).copied().unwrap_or(0.0)
    }

    /// Drop everything known about a departed player.
    pub fn forget(&mut self, id: &PeerId) {
        self.damage_dealt.remove(id);
        if self.current_target.as_ref() == Some(id) {
            self.current_target = None;
        }
    }

    fn enter(&mut self, state: AiState, timer: f32) {
        if self.state != state {
            tracing::trace!(from = self.state.as_str(), to = state.as_str(), "boss state");
        }
        self.state = state;
        self.timer = timer;
    }

    /// Highest threat among living candidates, each with a `[0, 20)` jitter.
    /// Ties keep the earlier candidate. Consumes one roll per living candidate.
    pub fn select_target(
        &mut self,
        boss: &Combatant,
        candidates: &[&Combatant],
        rng: &mut impl Roll,
    ) -> Option<usize> {
        let boss_pos = boss.planar();
        let current = self.current_target.as_ref().map(PeerId::as_str);
        let mut best: Option<(usize, f32)> = None;

        for (idx, fighter) in candidates.iter().enumerate() {
            if fighter.is_defeated() {
                continue;
            }
            let input = ThreatInput {
                id: fighter.id.as_str(),
                position: fighter.planar(),
                is_attacking: fighter.attacking,
                has_hit: fighter.has_hit,
                is_stunned: fighter.is_stunned(),
                is_healing: fighter.healing,
                health: fighter.health,
                max_health: fighter.max_health,
                damage_dealt: self.damage_dealt(&fighter.id),
            };
            let score = combat::compute_threat(&input, boss_pos, current)
                + rng.range(0.0, threat::JITTER);
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((idx, score));
            }
        }

        let (idx, _) = best?;
        self.current_target = Some(candidates[idx].id.clone());
        Some(idx)
    }

    /// One decision step for the boss. `candidates` are every player the boss
    /// may fight, local and replicated.
    pub fn tick(
        &mut self,
        dt: f32,
        boss: &mut Combatant,
        candidates: &[&Combatant],
        arena: &Arena,
        rng: &mut impl Roll,
    ) -> DirectorReport {
        let mut report = DirectorReport::default();

        if boss.is_stunned() {
            boss.blocking = false;
            return report;
        }

        let Some(idx) = self.select_target(boss, candidates, rng) else {
            return report;
        };
        let target = candidates[idx];
        report.target = Some(target.id.clone());

        let target_pos = target.planar();
        let delta = target_pos - boss.planar();
        let dist = delta.length();
        let to_target = delta.normalize_or_zero();

        if boss.special.is_some() {
            self.drive_special(dt, boss, target_pos);
        }

        // punish a stunned target
        if target.is_stunned() && !matches!(self.state, AiState::AttackPrep | AiState::Recover) {
            if dist < PUNISH_RANGE {
                self.enter(AiState::AttackPrep, 0.0);
            } else {
                self.state = AiState::Chase;
            }
        }

        self.react(boss, target, dist, to_target, rng);

        if self.state == AiState::Defend {
            boss.set_blocking(true);
            boss.face(target_pos);
            self.timer -= dt;
            if self.timer <= 0.0 || !target.attacking {
                boss.set_blocking(false);
                if dist < ENGAGE_RANGE {
                    self.enter(AiState::AttackPrep, 0.1);
                } else {
                    self.enter(AiState::Strafe, 1.0);
                }
            }
            return report;
        }
        boss.set_blocking(false);

        match self.state {
            AiState::Idle => {
                self.timer -= dt;
                if self.timer <= 0.0 {
                    let roll = rng.roll();
                    if dist < CLOSE_RANGE {
                        if roll < self.weights.aggro {
                            self.enter(AiState::AttackPrep, 0.2);
                        } else {
                            boss.dash(-to_target);
                            self.enter(AiState::Strafe, 0.5);
                        }
                    } else if dist > FAR_RANGE {
                        self.enter(AiState::Chase, 3.0);
                    } else if roll < self.weights.strafe {
                        let timer = 0.5 + rng.roll();
                        self.enter(AiState::Strafe, timer);
                        self.strafe_dir = rng.sign();
                    } else {
                        self.enter(AiState::PerilousPrep, 0.6);
                        report.perilous_warning = true;
                    }
                }
            }
            AiState::Chase => {
                let punishing = target.is_stunned() || target.healing;
                let dir = (to_target + arena.avoidance(boss.planar())).normalize_or_zero();
                boss.walk(dir, if punishing { 2.0 } else { 1.2 }, dt);
                boss.face(target_pos);
                if dist < ENGAGE_RANGE {
                    self.enter(AiState::AttackPrep, 0.1);
                }
                if !punishing {
                    self.timer -= dt;
                    if self.timer <= 0.0 {
                        self.state = AiState::Strafe;
                    }
                }
            }
            AiState::Strafe => {
                let mut dir = right_of(to_target) * self.strafe_dir;
                if dist > STRAFE_FAR {
                    dir += to_target * 0.5;
                }
                if dist < STRAFE_NEAR {
                    dir -= to_target * 0.5;
                }
                dir += arena.avoidance(boss.planar());
                boss.walk(dir.normalize_or_zero(), 1.0, dt);
                boss.face(target_pos);
                self.timer -= dt;
                if self.timer <= 0.0 {
                    self.enter(AiState::Idle, 0.0);
                }
                if dist < PUNISH_RANGE && rng.roll() < self.weights.aggro * 0.1 {
                    self.enter(AiState::AttackPrep, 0.1);
                }
            }
            AiState::AttackPrep => {
                boss.face(target_pos);
                self.timer -= dt;
                if self.timer <= 0.0 {
                    let kind = if target.is_stunned() || target.healing {
                        AttackKind::Heavy
                    } else if rng.roll() < self.weights.heavy_chance {
                        AttackKind::Heavy
                    } else {
                        AttackKind::Light
                    };
                    boss.attack(kind, rng);
                    self.enter(AiState::Recover, 0.8);
                }
            }
            AiState::PerilousPrep => {
                boss.face(target_pos);
                self.timer -= dt;
                if self.timer <= 0.0 {
                    if boss.start_special(self.special) {
                        report.special_started = Some(self.special);
                    }
                    self.enter(AiState::Recover, 2.0);
                }
            }
            AiState::Recover => {
                self.timer -= dt;
                if self.timer <= 0.0 {
                    self.enter(AiState::Strafe, 0.5);
                    self.strafe_dir = rng.sign();
                }
            }
            AiState::Defend => {}
        }

        report
    }

    /// Interrupt into a guard or a sidestep when the target is mid-swing.
    fn react(
        &mut self,
        boss: &mut Combatant,
        target: &Combatant,
        dist: f32,
        to_target: Vec2,
        rng: &mut impl Roll,
    ) {
        let busy = matches!(
            self.state,
            AiState::Defend | AiState::PerilousPrep | AiState::Recover
        );
        if busy
            || !target.attacking
            || target.timers.attack <= REACT_MIN_SWING
            || dist >= REACT_RANGE
            || target.healing
            || target.is_stunned()
        {
            return;
        }

        let mut chance = match target.attack_kind {
            AttackKind::Heavy => 0.3,
            AttackKind::Light => 0.15,
        };
        if self.weights.parry_master {
            chance += 0.2;
        }
        if self.weights.dodge > 0.7 {
            chance += 0.1;
        }
        if rng.roll() >= chance {
            return;
        }

        let defend_threshold = if self.weights.parry_master { 0.7 } else { 0.3 };
        if rng.roll() < defend_threshold {
            self.enter(AiState::Defend, 0.5);
        } else {
            let side = rng.sign();
            let dodge = -to_target * 0.8 + right_of(to_target) * side * 1.5;
            boss.dash(dodge.normalize_or_zero());
            self.enter(AiState::Recover, 0.2);
        }
    }

    /// Scripted motion of the running special maneuver.
    fn drive_special(&self, dt: f32, boss: &mut Combatant, target: Vec2) {
        let Some(special) = boss.special else {
            return;
        };
        let t = boss.timers.attack;
        let delta = target - boss.planar();
        let dist = delta.length();
        let toward = delta.normalize_or_zero();

        match special {
            SpecialMove::Whirlwind => {
                boss.yaw += 15.0 * dt;
                if dist > 2.0 {
                    shift(boss, toward * boss.move_speed * 1.5 * dt);
                }
            }
            SpecialMove::PhantomFlurry => {
                if dist > 2.5 {
                    shift(boss, toward * boss.move_speed * 2.5 * dt);
                }
                boss.face(target);
            }
            SpecialMove::Earthshaker => {
                if t > EARTHSHAKER_SLAM_AT {
                    boss.position.y += 15.0 * dt;
                    if delta.length_squared() > 0.1 {
                        shift(boss, toward * 25.0 * dt);
                    }
                } else {
                    boss.position.y = (boss.position.y - 35.0 * dt).max(0.0);
                }
            }
            SpecialMove::DeathLunge => {
                if t > LUNGE_WINDUP_UNTIL {
                    boss.face(target);
                } else if t > LUNGE_THRUST_AT {
                    boss.face(target);
                    if dist > 3.0 {
                        let forward = boss.forward();
                        shift(boss, forward * 60.0 * dt);
                    }
                } else {
                    let forward = boss.forward();
                    shift(boss, forward * 10.0 * dt);
                }
            }
        }
    }
}

fn shift(fighter: &mut Combatant, delta: Vec2) {
    fighter.position.x += delta.x;
    fighter.position.z += delta.y;
}
