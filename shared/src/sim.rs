//! The simulation context: every fighter in the encounter plus the rules that
//! move them, advanced once per frame.
//!
//! Ownership follows [`Authority`]. The local fighter is always ours. The boss
//! is ours when offline or hosting; followers only mirror it. Remote fighters
//! belong to the replication layer. Pair resolution applies effects only to
//! the sides this participant owns.

use std::collections::BTreeMap;

use glam::Vec2;
use tracing::{debug, info, trace, warn};

use crate::archetype::{Archetype, SpecialMove};
use crate::arena::{self, Arena};
use crate::combat;
use crate::combatant::{Combatant, PeerId};
use crate::director::BossDirector;
use crate::input::{AttackButton, Press};
use crate::protocol::{BossRecord, PeerState};
use crate::replication::{self, BossMirror, RemotePeer};
use crate::resolver::{self, CombatEvent, HitProbe, Ownership};
use crate::rng::Roll;
use crate::session::SyncEvent;

/// Longest frame the simulation will integrate in one step.
pub const MAX_FRAME_SECS: f32 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Authority {
    /// No session; this process owns everything.
    Offline,
    Host,
    Follower,
}

impl Authority {
    /// Whether the boss is simulated here.
    pub fn runs_boss(self) -> bool {
        !matches!(self, Self::Follower)
    }
}

/// One frame of local input. `axes` is relative to the boss: `y` walks toward
/// it, `x` strafes right.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LocalInput {
    pub axes: Vec2,
    pub attack_down: bool,
    pub block: bool,
    /// Edge-triggered.
    pub dash: bool,
    /// Edge-triggered.
    pub heal: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchOutcome {
    Victory,
    Defeat,
}

/// Fire-and-forget sound requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cue {
    Clash,
    Parry,
    Hit,
    Dash,
    Heal,
    PostureBreak,
    PerilousWarning,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SimEvent {
    Combat(CombatEvent),
    Cue(Cue),
    PeerJoined { id: PeerId, name: String },
    PeerLeft { id: PeerId, name: String },
    PerilousWarning(SpecialMove),
    SpecialStarted(SpecialMove),
    BecameHost,
    BossRescaled { player_count: usize },
    MatchOver(MatchOutcome),
}

/// Floating text for the UI, anchored over a fighter or the arena centre.
#[derive(Clone, Debug, PartialEq)]
pub struct Callout {
    pub text: String,
    pub anchor: Option<PeerId>,
    pub color: u32,
}

impl SimEvent {
    pub fn callout(&self) -> Option<Callout> {
        let (text, anchor, color) = match self {
            Self::PeerJoined { name, .. } => (format!("{name} JOINED"), None, 0x4fc3f7),
            Self::PeerLeft { name, .. } => (format!("{name} LEFT"), None, 0x888888),
            Self::PerilousWarning(_) => ("PERILOUS".to_string(), Some(PeerId::boss()), 0xff0000),
            Self::Combat(event) => match event {
                CombatEvent::Dodged { id } => ("DODGE".into(), Some(id.clone()), 0xffffff),
                CombatEvent::GuardBreak { defender } => {
                    ("GUARD BREAK".into(), Some(defender.clone()), 0xff0000)
                }
                CombatEvent::Parried { defender, .. } => {
                    ("DEFLECT".into(), Some(defender.clone()), 0xfff5a6)
                }
                CombatEvent::PostureBroken { id } => ("BROKEN".into(), Some(id.clone()), 0xe6a72e),
                CombatEvent::Healed { id, .. } => ("HEAL".into(), Some(id.clone()), 0x00ff00),
                CombatEvent::Shockwave { .. } => ("SHOCKWAVE".into(), Some(PeerId::boss()), 0xe6a72e),
                _ => return None,
            },
            _ => return None,
        };
        Some(Callout { text, anchor, color })
    }
}

fn cue_for(event: &CombatEvent) -> Option<Cue> {
    match event {
        CombatEvent::Hit { .. } | CombatEvent::SpecialHit { .. } | CombatEvent::GuardBreak { .. } => {
            Some(Cue::Hit)
        }
        CombatEvent::Blocked { .. } | CombatEvent::SpecialChip { .. } => Some(Cue::Clash),
        CombatEvent::Parried { .. } => Some(Cue::Parry),
        CombatEvent::PostureBroken { .. } => Some(Cue::PostureBreak),
        _ => None,
    }
}

/// Per-frame numbers for the HUD.
#[derive(Clone, Debug, PartialEq)]
pub struct HudSnapshot {
    pub health: f32,
    pub posture: f32,
    pub stamina: f32,
    pub boss_health: f32,
    pub boss_posture: f32,
    pub estus_charges: u32,
    pub player_count: usize,
    pub boss_archetype: &'static str,
    pub outcome: Option<MatchOutcome>,
}

#[derive(Debug)]
pub struct Simulation {
    pub local_id: PeerId,
    pub player: Combatant,
    pub boss: Combatant,
    pub boss_name: String,
    pub archetype: Archetype,
    pub director: BossDirector,
    pub remotes: BTreeMap<PeerId, RemotePeer>,
    pub arena: Arena,
    authority: Authority,
    mirror: BossMirror,
    attack_button: AttackButton,
    outcome: Option<MatchOutcome>,
    interpolation_speed: f32,
    /// Last valid scaled maxima, restored when a rescale produces garbage.
    known_good: (f32, f32),
}

impl Simulation {
    /// Solo encounter against the boss named `boss_name`.
    pub fn new(local_id: impl Into<PeerId>, boss_name: &str, arena: Arena) -> Self {
        let local_id = local_id.into();
        let archetype = Archetype::from_boss_name(boss_name);
        let boss = Combatant::boss(archetype, arena::BOSS_SPAWN);
        info!(boss = boss_name, archetype = archetype.name(), "encounter created");
        Self {
            player: Combatant::player(local_id.clone(), arena::SOLO_SPAWN),
            local_id,
            known_good: (boss.max_health, boss.max_posture),
            boss,
            boss_name: boss_name.to_string(),
            archetype,
            director: BossDirector::new(archetype.weights(), archetype.special()),
            remotes: BTreeMap::new(),
            arena,
            authority: Authority::Offline,
            mirror: BossMirror::default(),
            attack_button: AttackButton::default(),
            outcome: None,
            interpolation_speed: 12.0,
        }
    }

    /// Join a session in `authority`, spawning on the ring at `slot`.
    pub fn networked(mut self, authority: Authority, slot: usize, interpolation_speed: f32) -> Self {
        self.authority = authority;
        self.player.position = arena::spawn_slot(slot);
        self.interpolation_speed = interpolation_speed;
        self
    }

    pub fn authority(&self) -> Authority {
        self.authority
    }

    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    pub fn player_count(&self) -> usize {
        self.remotes.len() + 1
    }

    // ========================================================================
    // FRAME
    // ========================================================================

    /// Advance one frame. Local intents are taken first, then the replicated
    /// updates received since the previous frame.
    pub fn step(
        &mut self,
        dt: f32,
        input: &LocalInput,
        incoming: Vec<SyncEvent>,
        rng: &mut impl Roll,
        probe: &dyn HitProbe,
    ) -> Vec<SimEvent> {
        let dt = dt.clamp(0.0, MAX_FRAME_SECS);
        let mut out = Vec::new();
        if self.outcome.is_some() {
            return out;
        }

        self.apply_input(dt, input, rng, &mut out);
        for event in incoming {
            self.apply_sync(event, rng, &mut out);
        }
        if self.outcome.is_some() {
            return out;
        }

        if self.authority.runs_boss() {
            // every fighter the boss may target, local first
            let candidates: Vec<&Combatant> = std::iter::once(&self.player)
                .chain(self.remotes.values().map(|r| &r.combatant))
                .collect();
            let report = self.director.tick(dt, &mut self.boss, &candidates, &self.arena, rng);
            if report.perilous_warning {
                out.push(SimEvent::PerilousWarning(self.director.special));
                out.push(SimEvent::Cue(Cue::PerilousWarning));
            }
            if let Some(special) = report.special_started {
                debug!(special = special.name(), "special maneuver");
                out.push(SimEvent::SpecialStarted(special));
            }
            self.arena.resolve_collision(&mut self.boss.position, self.boss.body_radius);
        } else {
            self.mirror.interpolate(&mut self.boss, dt, self.interpolation_speed);
        }
        for remote in self.remotes.values_mut() {
            remote.interpolate(dt, self.interpolation_speed);
        }
        self.arena.resolve_collision(&mut self.player.position, self.player.body_radius);

        let mut events = Vec::new();
        self.player.tick(dt, &mut events);
        self.boss.tick(dt, &mut events);
        let mut discarded = Vec::new();
        for remote in self.remotes.values_mut() {
            remote.combatant.tick(dt, &mut discarded);
        }

        self.resolve(probe, &mut events);

        for event in events {
            if let Some(cue) = cue_for(&event) {
                out.push(SimEvent::Cue(cue));
            }
            out.push(SimEvent::Combat(event));
        }

        self.check_outcome(&mut out);
        out
    }

    fn apply_input(&mut self, dt: f32, input: &LocalInput, rng: &mut impl Roll, out: &mut Vec<SimEvent>) {
        if self.player.is_defeated() {
            return;
        }
        let boss_pos = self.boss.planar();
        let forward = (boss_pos - self.player.planar()).normalize_or_zero();
        let right = combat::right_of(forward);
        let move_dir = forward * input.axes.y + right * input.axes.x;

        self.player.track(boss_pos);

        if input.dash {
            let dir = if move_dir.length_squared() > 0.0 { move_dir } else { -forward };
            if self.player.dash(dir) {
                self.attack_button.invalidate();
                out.push(SimEvent::Cue(Cue::Dash));
            }
        }

        if input.heal && self.player.heal() {
            out.push(SimEvent::Cue(Cue::Heal));
        }

        self.player.set_blocking(input.block);

        match self.attack_button.update(input.attack_down, dt, &self.player) {
            Press::Charging => {
                self.player.set_charging(true);
            }
            Press::Release(kind) => {
                self.player.charging = false;
                if self.player.attack(kind, rng) {
                    trace!(kind = kind.as_str(), "player swing");
                }
            }
            Press::Idle => {
                if !self.attack_button.is_held() {
                    self.player.charging = false;
                }
            }
        }

        self.player.walk(move_dir, 1.0, dt);
    }

    fn apply_sync(&mut self, event: SyncEvent, rng: &mut impl Roll, out: &mut Vec<SimEvent>) {
        match event {
            SyncEvent::PeerJoined { id, record } => {
                let remote = RemotePeer::spawn(id.clone(), &record, arena::spawn_slot(record.slot));
                out.push(SimEvent::PeerJoined { id: id.clone(), name: record.name.clone() });
                self.remotes.insert(id, remote);
                self.rescale_boss(self.player_count());
                out.push(SimEvent::BossRescaled { player_count: self.player_count() });
            }
            SyncEvent::PeerUpdated { id, state } => {
                if let Some(remote) = self.remotes.get_mut(&id) {
                    remote.apply(&state, rng);
                }
            }
            SyncEvent::PeerLeft { id } => {
                if let Some(remote) = self.remotes.remove(&id) {
                    self.director.forget(&id);
                    out.push(SimEvent::PeerLeft { id, name: remote.name });
                    self.rescale_boss(self.player_count());
                    out.push(SimEvent::BossRescaled { player_count: self.player_count() });
                }
            }
            SyncEvent::BossSnapshot(record) => {
                if !self.authority.runs_boss() {
                    self.mirror.apply(&mut self.boss, &mut self.director, &record, rng);
                }
            }
            SyncEvent::BecameHost => {
                info!("promoted to host, running boss from last snapshot");
                self.authority = Authority::Host;
                self.boss.position.y = 0.0;
                out.push(SimEvent::BecameHost);
            }
            SyncEvent::SessionEnded => {
                // the host stopped simulating the boss, so the encounter is over here too
                if !self.authority.runs_boss() {
                    let outcome = if self.boss.is_defeated() {
                        MatchOutcome::Victory
                    } else {
                        MatchOutcome::Defeat
                    };
                    self.finish(outcome, out);
                }
            }
            SyncEvent::HostChanged { .. } => {}
        }
    }

    fn resolve(&mut self, probe: &dyn HitProbe, events: &mut Vec<CombatEvent>) {
        let runs_boss = self.authority.runs_boss();
        let (strike_boss, struck_by_boss) = if runs_boss {
            (Ownership::BOTH, Ownership::BOTH)
        } else {
            (
                Ownership { attacker: true, defender: false },
                Ownership { attacker: false, defender: true },
            )
        };

        let before = self.boss.health;
        resolver::resolve_pair(&mut self.player, &mut self.boss, strike_boss, probe, events);
        self.director.record_damage(&self.player.id, before - self.boss.health);
        resolver::resolve_pair(&mut self.boss, &mut self.player, struck_by_boss, probe, events);

        if !runs_boss {
            return;
        }
        for remote in self.remotes.values_mut() {
            let fighter = &mut remote.combatant;
            let before = self.boss.health;
            resolver::resolve_pair(
                fighter,
                &mut self.boss,
                Ownership { attacker: false, defender: true },
                probe,
                events,
            );
            self.director.record_damage(&fighter.id, before - self.boss.health);
            resolver::resolve_pair(
                &mut self.boss,
                fighter,
                Ownership { attacker: true, defender: false },
                probe,
                events,
            );
        }
    }

    fn check_outcome(&mut self, out: &mut Vec<SimEvent>) {
        let outcome = if self.boss.is_defeated() {
            MatchOutcome::Victory
        } else if self.player.is_defeated() {
            MatchOutcome::Defeat
        } else {
            return;
        };
        self.finish(outcome, out);
    }

    fn finish(&mut self, outcome: MatchOutcome, out: &mut Vec<SimEvent>) {
        if self.outcome.is_some() {
            return;
        }
        info!(?outcome, boss = %self.boss_name, "match over");
        self.outcome = Some(outcome);
        out.push(SimEvent::MatchOver(outcome));
    }

    // ========================================================================
    // SCALING
    // ========================================================================

    /// Rescale boss maxima for `player_count` fighters. The authority keeps
    /// current vitals at their previous ratio; followers only track maxima so
    /// HUD ratios stay right until the next snapshot.
    pub fn rescale_boss(&mut self, player_count: usize) {
        let mut stats = combat::scale_boss_stats(
            self.archetype.base_health(),
            self.archetype.base_posture(),
            player_count.max(1),
        );
        if !valid_max(stats.max_health) || !valid_max(stats.max_posture) {
            warn!(player_count, "invalid boss scaling, keeping last known good maxima");
            stats.max_health = self.known_good.0;
            stats.max_posture = self.known_good.1;
        }

        let health_ratio = sane_ratio(self.boss.health, self.boss.max_health, 1.0);
        let posture_ratio = sane_ratio(self.boss.posture, self.boss.max_posture, 0.0);

        self.boss.max_health = stats.max_health;
        self.boss.max_posture = stats.max_posture;
        self.known_good = (stats.max_health, stats.max_posture);
        if self.authority.runs_boss() {
            self.boss.health = (stats.max_health * health_ratio).floor();
            self.boss.posture = (stats.max_posture * posture_ratio).floor();
        }
        info!(
            player_count,
            max_health = stats.max_health,
            max_posture = stats.max_posture,
            "boss rescaled"
        );
    }

    // ========================================================================
    // COLLABORATOR VIEWS
    // ========================================================================

    pub fn hud(&self) -> HudSnapshot {
        HudSnapshot {
            health: self.player.health_ratio() * 100.0,
            posture: self.player.posture_ratio() * 100.0,
            stamina: self.player.stamina_ratio() * 100.0,
            boss_health: self.boss.health_ratio() * 100.0,
            boss_posture: self.boss.posture_ratio() * 100.0,
            estus_charges: self.player.estus_charges,
            player_count: self.player_count(),
            boss_archetype: self.archetype.name(),
            outcome: self.outcome,
        }
    }

    /// What this participant publishes about its own fighter.
    pub fn local_state(&self) -> PeerState {
        replication::peer_state(&self.player)
    }

    /// Canonical boss snapshot; `None` unless the boss is simulated here.
    pub fn boss_state(&self) -> Option<BossRecord> {
        self.authority
            .runs_boss()
            .then(|| replication::boss_record(&self.boss, &self.director))
    }

    /// Whether the local fighter is winding up a heavy swing.
    pub fn is_charging(&self) -> bool {
        self.player.charging && self.attack_button.is_held()
    }
}

fn valid_max(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

/// `value / max`, clamped to `[0, 1]`, or `fallback` when either is garbage.
fn sane_ratio(value: f32, max: f32, fallback: f32) -> f32 {
    let ratio = value / max;
    if ratio.is_finite() {
        ratio.clamp(0.0, 1.0)
    } else {
        warn!(value, max, fallback, "invalid boss vitals, substituting default ratio");
        fallback
    }
}
