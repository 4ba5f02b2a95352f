//! A single fighter: vitals, resource timers and action flags.
//!
//! Intent methods (`attack`, `set_blocking`, `dash`, `heal`, `start_special`)
//! return `false` and leave the fighter untouched when the request is not
//! allowed right now. A rejected intent is expected input contention, not an
//! error.

use std::fmt;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::archetype::{Archetype, EARTHSHAKER_SLAM_AT, SpecialMove};
use crate::combat::{self, AttackKind, StaminaAction, defaults, stamina};
use crate::resolver::CombatEvent;
use crate::rng::Roll;

/// Opaque participant id. Players use their session peer id; the boss uses
/// [`PeerId::boss`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub String);

impl PeerId {
    pub const BOSS: &'static str = "boss";

    pub fn boss() -> Self {
        Self(Self::BOSS.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PeerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PeerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Player,
    Boss,
}

/// Arm motion of the current swing. Heavy swings are always overhead; light
/// swings pick a side at random.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Swing {
    #[default]
    Overhead,
    Left,
    Right,
}

/// Countdown timers in seconds. Every field counts down to zero and stays there.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Timers {
    pub stamina_regen_delay: f32,
    /// Remaining swing time, shared with special maneuvers.
    pub attack: f32,
    pub stun: f32,
    pub invuln: f32,
    pub dash_cooldown: f32,
    pub heal: f32,
    pub action_lockout: f32,
    pub parry: f32,
}

fn count_down(timer: &mut f32, dt: f32) {
    *timer = (*timer - dt).max(0.0);
}

/// What happened to a defender when a strike reached it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HitReport {
    Dodged,
    Landed { posture_broken: bool, defeated: bool },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Combatant {
    pub id: PeerId,
    pub role: Role,

    /// World position; `y` only leaves the ground during Earthshaker.
    pub position: Vec3,
    /// Facing around +Y, 0 faces +Z.
    pub yaw: f32,
    /// Planar impulse (dash), decays every tick.
    pub velocity: Vec2,

    pub health: f32,
    pub max_health: f32,
    pub posture: f32,
    pub max_posture: f32,
    pub stamina: f32,

    pub timers: Timers,

    pub attacking: bool,
    pub attack_kind: AttackKind,
    pub swing: Swing,
    pub blocking: bool,
    pub charging: bool,
    pub healing: bool,
    pub special: Option<SpecialMove>,

    pub estus_charges: u32,
    /// One hit per swing or special.
    pub has_hit: bool,
    /// Earthshaker slam already reported for the current maneuver.
    pub slammed: bool,

    pub move_speed: f32,
    pub body_radius: f32,
    pub scale: f32,
}

impl Combatant {
    pub fn player(id: impl Into<PeerId>, position: Vec3) -> Self {
        Self {
            id: id.into(),
            role: Role::Player,
            position,
            yaw: 0.0,
            velocity: Vec2::ZERO,
            health: defaults::PLAYER_HEALTH,
            max_health: defaults::PLAYER_HEALTH,
            posture: 0.0,
            max_posture: defaults::PLAYER_POSTURE,
            stamina: stamina::MAX,
            timers: Timers::default(),
            attacking: false,
            attack_kind: AttackKind::Light,
            swing: Swing::Overhead,
            blocking: false,
            charging: false,
            healing: false,
            special: None,
            estus_charges: defaults::ESTUS_CHARGES,
            has_hit: false,
            slammed: false,
            move_speed: defaults::PLAYER_SPEED,
            body_radius: defaults::BODY_RADIUS,
            scale: 1.0,
        }
    }

    pub fn boss(archetype: Archetype, position: Vec3) -> Self {
        Self {
            role: Role::Boss,
            max_health: archetype.base_health(),
            health: archetype.base_health(),
            max_posture: archetype.base_posture(),
            move_speed: archetype.move_speed(),
            scale: archetype.scale(),
            ..Self::player(PeerId::boss(), position)
        }
    }

    pub fn is_boss(&self) -> bool {
        self.role == Role::Boss
    }

    pub fn is_stunned(&self) -> bool {
        self.timers.stun > 0.0
    }

    pub fn is_invulnerable(&self) -> bool {
        self.timers.invuln > 0.0
    }

    pub fn is_locked_out(&self) -> bool {
        self.timers.action_lockout > 0.0
    }

    pub fn is_defeated(&self) -> bool {
        self.health <= 0.0
    }

    pub fn is_special_attacking(&self) -> bool {
        self.special.is_some()
    }

    /// Committed to an action that suppresses stamina regen.
    pub fn is_mid_action(&self) -> bool {
        self.blocking || self.attacking || self.charging || self.special.is_some()
    }

    pub fn planar(&self) -> Vec2 {
        combat::planar(self.position)
    }

    pub fn forward(&self) -> Vec2 {
        combat::forward_from_yaw(self.yaw)
    }

    /// Fraction of the current swing already played, `0.0` when idle.
    pub fn swing_progress(&self) -> f32 {
        if !self.attacking {
            return 0.0;
        }
        1.0 - self.timers.attack / self.attack_kind.duration()
    }

    pub fn health_ratio(&self) -> f32 {
        ratio(self.health, self.max_health)
    }

    pub fn posture_ratio(&self) -> f32 {
        ratio(self.posture, self.max_posture)
    }

    pub fn stamina_ratio(&self) -> f32 {
        ratio(self.stamina, stamina::MAX)
    }

    // ========================================================================
    // INTENTS
    // ========================================================================

    pub fn attack(&mut self, kind: AttackKind, rng: &mut impl Roll) -> bool {
        if self.is_locked_out()
            || self.attacking
            || self.blocking
            || self.is_stunned()
            || self.healing
            || self.special.is_some()
        {
            return false;
        }
        let action = kind.stamina_action();
        if !combat::can_afford(self.stamina, action) {
            return false;
        }

        self.stamina = combat::spend(self.stamina, action);
        self.timers.stamina_regen_delay = stamina::REGEN_DELAY_SECS;
        self.attacking = true;
        self.charging = false;
        self.attack_kind = kind;
        self.has_hit = false;
        self.timers.attack = kind.duration();
        self.swing = match kind {
            AttackKind::Heavy => Swing::Overhead,
            AttackKind::Light if rng.roll() < 0.5 => Swing::Left,
            AttackKind::Light => Swing::Right,
        };
        true
    }

    /// Raise or lower the guard. Raising arms the parry window.
    pub fn set_blocking(&mut self, hold: bool) -> bool {
        if self.is_locked_out() || self.healing || self.special.is_some() {
            self.blocking = false;
            return false;
        }
        if self.attacking || self.is_stunned() {
            return false;
        }
        if hold && !self.blocking {
            self.timers.parry = defaults::PARRY_WINDOW_SECS;
            self.charging = false;
        }
        self.blocking = hold;
        true
    }

    pub fn set_charging(&mut self, charging: bool) -> bool {
        if charging
            && (self.attacking
                || self.blocking
                || self.healing
                || self.is_stunned()
                || self.special.is_some())
        {
            return false;
        }
        self.charging = charging;
        true
    }

    pub fn dash(&mut self, dir: Vec2) -> bool {
        if self.is_locked_out() || self.timers.dash_cooldown > 0.0 || self.is_stunned() {
            return false;
        }
        if !combat::can_afford(self.stamina, StaminaAction::Dash) {
            return false;
        }

        self.stamina = combat::spend(self.stamina, StaminaAction::Dash);
        self.timers.stamina_regen_delay = stamina::REGEN_DELAY_SECS;
        self.attacking = false;
        self.charging = false;
        self.has_hit = false;
        self.timers.attack = 0.0;
        self.healing = false;
        self.timers.heal = 0.0;
        self.velocity = dir.normalize_or_zero() * defaults::DASH_SPEED;
        self.timers.dash_cooldown = defaults::DASH_COOLDOWN_SECS;
        self.timers.invuln = defaults::DASH_INVULN_SECS;
        true
    }

    pub fn heal(&mut self) -> bool {
        if self.is_locked_out()
            || self.healing
            || self.attacking
            || self.blocking
            || self.is_stunned()
            || self.special.is_some()
        {
            return false;
        }
        if self.estus_charges == 0 || self.health >= self.max_health {
            return false;
        }

        self.healing = true;
        self.charging = false;
        self.timers.heal = defaults::HEAL_CAST_SECS;
        self.estus_charges -= 1;
        self.timers.stamina_regen_delay = stamina::REGEN_DELAY_SECS;
        true
    }

    pub fn start_special(&mut self, special: SpecialMove) -> bool {
        if self.is_stunned() || self.special.is_some() {
            return false;
        }
        self.special = Some(special);
        self.timers.attack = special.duration();
        self.attacking = false;
        self.charging = false;
        self.blocking = false;
        self.has_hit = false;
        self.slammed = false;
        true
    }

    /// Walk along a planar direction at the fighter's own speed. Healing
    /// fighters stand still.
    pub fn walk(&mut self, dir: Vec2, speed_mult: f32, dt: f32) {
        if self.healing || self.is_stunned() {
            return;
        }
        let step = dir.normalize_or_zero() * self.move_speed * speed_mult * dt;
        self.position.x += step.x;
        self.position.z += step.y;
    }

    /// Face a point unless the swing has committed the fighter's rotation.
    pub fn track(&mut self, target: Vec2) {
        if self.special.is_some() || self.is_stunned() {
            return;
        }
        let free = !self.attacking
            || (self.attack_kind == AttackKind::Heavy && self.swing_progress() < 0.3);
        if free {
            self.face(target);
        }
    }

    pub fn face(&mut self, target: Vec2) {
        let from = self.planar();
        if from.distance_squared(target) > f32::EPSILON {
            self.yaw = combat::yaw_towards(from, target);
        }
    }

    // ========================================================================
    // DAMAGE
    // ========================================================================

    /// Apply an unblocked strike. Damage values are final; stun scaling is the
    /// caller's job.
    pub fn take_hit(&mut self, damage: f32, posture_damage: f32) -> HitReport {
        if self.is_invulnerable() {
            return HitReport::Dodged;
        }
        self.health = (self.health - damage).max(0.0);
        self.healing = false;
        self.timers.heal = 0.0;
        let posture_broken = self.add_posture(posture_damage);
        HitReport::Landed { posture_broken, defeated: self.is_defeated() }
    }

    /// Chip damage that leaks through a guard. Never breaks invulnerability
    /// checks since the guard already met the blow.
    pub fn take_chip(&mut self, damage: f32, posture_damage: f32) -> bool {
        self.health = (self.health - damage).max(0.0);
        self.add_posture(posture_damage)
    }

    /// Add posture damage; returns true when this breaks the guard into a stun.
    pub fn add_posture(&mut self, amount: f32) -> bool {
        if self.is_stunned() {
            self.posture = self.max_posture;
            return false;
        }
        self.posture = (self.posture + amount).max(0.0);
        if combat::is_posture_broken(self.posture, self.max_posture) {
            self.enter_stun();
            return true;
        }
        false
    }

    fn enter_stun(&mut self) {
        self.timers.stun = defaults::STUN_SECS;
        self.posture = self.max_posture;
        self.attacking = false;
        self.timers.attack = 0.0;
        self.charging = false;
        self.blocking = false;
        self.healing = false;
        self.timers.heal = 0.0;
        if self.special.take().is_some() {
            self.position.y = 0.0;
        }
    }

    /// Cancel the current swing after it was deflected.
    pub fn deflected(&mut self) {
        self.timers.attack = 0.0;
        self.timers.action_lockout = defaults::ACTION_LOCKOUT_SECS;
    }

    // ========================================================================
    // TICK
    // ========================================================================

    /// Advance timers, regen and motion by `dt`. Special maneuver motion is
    /// driven separately by whoever owns the boss.
    pub fn tick(&mut self, dt: f32, events: &mut Vec<CombatEvent>) {
        count_down(&mut self.timers.invuln, dt);
        count_down(&mut self.timers.dash_cooldown, dt);
        count_down(&mut self.timers.parry, dt);

        if self.is_stunned() {
            count_down(&mut self.timers.stun, dt);
            if !self.is_stunned() {
                self.posture = 0.0;
            } else {
                self.posture = self.max_posture;
            }
            return;
        }

        count_down(&mut self.timers.action_lockout, dt);

        if self.stamina < stamina::MAX
            && self.timers.stamina_regen_delay <= 0.0
            && !self.is_mid_action()
        {
            self.stamina = combat::regenerate(self.stamina, dt, stamina::MAX);
        }
        count_down(&mut self.timers.stamina_regen_delay, dt);

        if !self.blocking && !self.attacking && self.special.is_none() && self.posture > 0.0 {
            self.posture = (self.posture - defaults::POSTURE_DECAY * dt).max(0.0);
        }

        if self.healing {
            count_down(&mut self.timers.heal, dt);
            if self.timers.heal <= 0.0 {
                self.healing = false;
                let amount = combat::heal_amount(self.max_health, defaults::HEAL_PERCENT);
                self.health = (self.health + amount).min(self.max_health);
                events.push(CombatEvent::Healed { id: self.id.clone(), amount });
            }
        }

        if let Some(special) = self.special {
            count_down(&mut self.timers.attack, dt);
            if special == SpecialMove::Earthshaker
                && !self.slammed
                && self.timers.attack <= EARTHSHAKER_SLAM_AT
            {
                self.slammed = true;
                events.push(CombatEvent::Shockwave { at: self.planar() });
            }
            if self.timers.attack <= 0.0 {
                self.special = None;
                self.has_hit = false;
                self.slammed = false;
                self.position.y = 0.0;
            }
        } else if self.attacking {
            count_down(&mut self.timers.attack, dt);
            if self.timers.attack <= 0.0 {
                self.attacking = false;
                self.has_hit = false;
            }
        }

        self.position.x += self.velocity.x * dt;
        self.position.z += self.velocity.y * dt;
        self.velocity *= 0.9_f32.powf(dt * 60.0);
        if self.velocity.length_squared() < 1e-4 {
            self.velocity = Vec2::ZERO;
        }
    }
}

fn ratio(value: f32, max: f32) -> f32 {
    if max > 0.0 {
        (value / max).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::tests::Scripted;

    fn fresh() -> Combatant {
        Combatant::player("p_test", Vec3::ZERO)
    }

    fn tick(c: &mut Combatant, dt: f32) -> Vec<CombatEvent> {
        let mut events = Vec::new();
        c.tick(dt, &mut events);
        events
    }

    #[test]
    fn attack_spends_stamina_and_arms_swing() {
        let mut c = fresh();
        assert!(c.attack(AttackKind::Heavy, &mut Scripted::always(0.1)));
        assert_eq!(c.stamina, 70.0);
        assert_eq!(c.timers.attack, 0.8);
        assert_eq!(c.timers.stamina_regen_delay, stamina::REGEN_DELAY_SECS);
        assert_eq!(c.swing, Swing::Overhead);
        assert!(!c.attack(AttackKind::Light, &mut Scripted::always(0.1)));
    }

    #[test]
    fn light_swing_side_follows_roll() {
        let mut c = fresh();
        c.attack(AttackKind::Light, &mut Scripted::always(0.2));
        assert_eq!(c.swing, Swing::Left);
        let mut c = fresh();
        c.attack(AttackKind::Light, &mut Scripted::always(0.8));
        assert_eq!(c.swing, Swing::Right);
    }

    #[test]
    fn attack_rejected_without_full_cost() {
        let mut c = fresh();
        c.stamina = 29.0;
        assert!(!c.attack(AttackKind::Heavy, &mut Scripted::always(0.5)));
        assert_eq!(c.stamina, 29.0);
        assert!(!c.attacking);
    }

    #[test]
    fn lockout_blocks_every_intent() {
        let mut c = fresh();
        c.health = 50.0;
        c.timers.action_lockout = 0.1;
        assert!(!c.attack(AttackKind::Light, &mut Scripted::always(0.5)));
        assert!(!c.dash(Vec2::X));
        assert!(!c.heal());
        assert!(!c.set_blocking(true));
        assert!(!c.blocking);
    }

    #[test]
    fn raising_guard_arms_parry_once() {
        let mut c = fresh();
        assert!(c.set_blocking(true));
        assert_eq!(c.timers.parry, defaults::PARRY_WINDOW_SECS);
        tick(&mut c, 0.1);
        assert!(c.set_blocking(true));
        assert!((c.timers.parry - 0.1).abs() < 1e-6);
        tick(&mut c, 0.15);
        assert_eq!(c.timers.parry, 0.0);
    }

    #[test]
    fn dash_cancels_swing_and_grants_invulnerability() {
        let mut c = fresh();
        c.attack(AttackKind::Light, &mut Scripted::always(0.5));
        assert!(c.dash(Vec2::new(0.0, -2.0)));
        assert!(!c.attacking);
        assert_eq!(c.timers.attack, 0.0);
        assert_eq!(c.velocity, Vec2::new(0.0, -defaults::DASH_SPEED));
        assert_eq!(c.timers.invuln, defaults::DASH_INVULN_SECS);
        assert_eq!(c.timers.dash_cooldown, defaults::DASH_COOLDOWN_SECS);
        assert_eq!(c.stamina, 100.0 - 15.0 - 20.0);
        assert!(!c.dash(Vec2::X));
    }

    #[test]
    fn heal_requires_missing_health_and_charges() {
        let mut c = fresh();
        assert!(!c.heal());
        c.health = 30.0;
        assert!(c.heal());
        assert_eq!(c.estus_charges, 2);
        let events = tick(&mut c, 1.0);
        assert_eq!(c.health, 70.0);
        assert!(!c.healing);
        assert!(matches!(events.as_slice(), [CombatEvent::Healed { amount, .. }] if *amount == 40.0));

        c.estus_charges = 0;
        assert!(!c.heal());
    }

    #[test]
    fn heal_caps_at_max() {
        let mut c = fresh();
        c.health = 90.0;
        c.heal();
        tick(&mut c, 1.0);
        assert_eq!(c.health, 100.0);
    }

    #[test]
    fn invulnerable_target_dodges() {
        let mut c = fresh();
        c.timers.invuln = 0.1;
        assert_eq!(c.take_hit(40.0, 60.0), HitReport::Dodged);
        assert_eq!(c.health, 100.0);
        assert_eq!(c.posture, 0.0);
    }

    #[test]
    fn posture_break_pins_then_resets() {
        let mut c = fresh();
        c.posture = 80.0;
        c.healing = true;
        let report = c.take_hit(15.0, 25.0);
        assert_eq!(report, HitReport::Landed { posture_broken: true, defeated: false });
        assert!(c.is_stunned());
        assert!(!c.healing);
        assert_eq!(c.posture, c.max_posture);

        tick(&mut c, 0.5);
        assert_eq!(c.posture, c.max_posture);
        tick(&mut c, 0.6);
        assert!(!c.is_stunned());
        assert_eq!(c.posture, 0.0);
    }

    #[test]
    fn health_floors_at_zero_and_reports_defeat() {
        let mut c = fresh();
        c.health = 10.0;
        let report = c.take_hit(40.0, 0.0);
        assert_eq!(report, HitReport::Landed { posture_broken: false, defeated: true });
        assert_eq!(c.health, 0.0);
    }

    #[test]
    fn regen_waits_for_delay_and_idle() {
        let mut c = fresh();
        c.attack(AttackKind::Light, &mut Scripted::always(0.5));
        tick(&mut c, 0.3);
        assert!(!c.attacking);
        assert_eq!(c.stamina, 85.0);
        tick(&mut c, 0.5);
        assert_eq!(c.stamina, 85.0);
        tick(&mut c, 0.1);
        assert!((c.stamina - 88.0).abs() < 1e-4);

        c.set_blocking(true);
        let before = c.stamina;
        tick(&mut c, 0.5);
        assert_eq!(c.stamina, before);
    }

    #[test]
    fn posture_decays_only_when_idle() {
        let mut c = fresh();
        c.posture = 10.0;
        tick(&mut c, 1.0);
        assert_eq!(c.posture, 8.0);
        c.set_blocking(true);
        tick(&mut c, 1.0);
        assert_eq!(c.posture, 8.0);
    }

    #[test]
    fn dash_impulse_moves_and_decays() {
        let mut c = fresh();
        c.dash(Vec2::X);
        tick(&mut c, 1.0 / 60.0);
        assert!((c.position.x - 0.5).abs() < 1e-4);
        assert!((c.velocity.x - 27.0).abs() < 1e-3);
    }

    #[test]
    fn heavy_swing_rotates_only_early() {
        let mut c = fresh();
        c.attack(AttackKind::Heavy, &mut Scripted::always(0.5));
        c.track(Vec2::new(5.0, 0.0));
        assert!((c.yaw - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
        c.timers.attack = 0.4;
        c.track(Vec2::new(0.0, -5.0));
        assert!((c.yaw - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn special_runs_its_timer_and_slams_once() {
        let mut c = Combatant::boss(Archetype::Tank, Vec3::ZERO);
        assert!(c.start_special(SpecialMove::Earthshaker));
        assert_eq!(c.timers.attack, 1.0);
        let mut shockwaves = 0;
        for _ in 0..12 {
            shockwaves += tick(&mut c, 0.1)
                .iter()
                .filter(|e| matches!(e, CombatEvent::Shockwave { .. }))
                .count();
        }
        assert_eq!(shockwaves, 1);
        assert!(c.special.is_none());
    }

    #[test]
    fn boss_takes_archetype_stats() {
        let c = Combatant::boss(Archetype::Duelist, Vec3::ZERO);
        assert_eq!(c.id, PeerId::boss());
        assert_eq!((c.max_health, c.max_posture), (300.0, 250.0));
        assert_eq!(c.move_speed, 6.0);
        assert!(c.is_boss());
    }
}
