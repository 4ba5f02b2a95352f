//! Attack button charge tracking: tap for a light swing, hold for a heavy one.

use crate::combat::{AttackKind, defaults};
use crate::combatant::Combatant;

/// What the attack button asks of the fighter this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Press {
    Idle,
    /// Held past the charge threshold; the fighter should be charging.
    Charging,
    /// Released; swing now.
    Release(AttackKind),
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AttackButton {
    held_for: Option<f32>,
    invalidated: bool,
}

impl AttackButton {
    /// A dash swallows the press in progress.
    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }

    pub fn is_held(&self) -> bool {
        self.held_for.is_some()
    }

    pub fn update(&mut self, down: bool, dt: f32, fighter: &Combatant) -> Press {
        match (down, self.held_for) {
            (true, None) => {
                self.held_for = Some(0.0);
                self.invalidated = false;
                Press::Idle
            }
            (true, Some(held)) => {
                let held = held + dt;
                self.held_for = Some(held);
                let free = !fighter.attacking && !fighter.blocking && !self.invalidated;
                if free && held > defaults::CHARGE_THRESHOLD_SECS {
                    Press::Charging
                } else {
                    Press::Idle
                }
            }
            (false, Some(held)) => {
                self.held_for = None;
                if fighter.attacking || self.invalidated {
                    return Press::Idle;
                }
                if held < defaults::CHARGE_THRESHOLD_SECS {
                    Press::Release(AttackKind::Light)
                } else if fighter.charging {
                    Press::Release(AttackKind::Heavy)
                } else {
                    Press::Idle
                }
            }
            (false, None) => Press::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn fighter() -> Combatant {
        Combatant::player("p", Vec3::ZERO)
    }

    #[test]
    fn tap_is_light() {
        let f = fighter();
        let mut button = AttackButton::default();
        assert_eq!(button.update(true, 0.016, &f), Press::Idle);
        assert_eq!(button.update(true, 0.05, &f), Press::Idle);
        assert_eq!(button.update(false, 0.016, &f), Press::Release(AttackKind::Light));
        assert!(!button.is_held());
    }

    #[test]
    fn hold_charges_then_heavy() {
        let mut f = fighter();
        let mut button = AttackButton::default();
        button.update(true, 0.016, &f);
        assert_eq!(button.update(true, 0.25, &f), Press::Charging);
        f.charging = true;
        assert_eq!(button.update(false, 0.016, &f), Press::Release(AttackKind::Heavy));
    }

    #[test]
    fn long_press_without_charge_does_nothing() {
        let mut f = fighter();
        let mut button = AttackButton::default();
        button.update(true, 0.016, &f);
        f.blocking = true;
        assert_eq!(button.update(true, 0.3, &f), Press::Idle);
        assert_eq!(button.update(false, 0.016, &f), Press::Idle);
    }

    #[test]
    fn dash_invalidates_press() {
        let f = fighter();
        let mut button = AttackButton::default();
        button.update(true, 0.016, &f);
        button.invalidate();
        assert_eq!(button.update(false, 0.016, &f), Press::Idle);
        // next press starts clean
        button.update(true, 0.016, &f);
        assert_eq!(button.update(false, 0.016, &f), Press::Release(AttackKind::Light));
    }
}
