use bevy::prelude::*;
use shadow_duel_shared::LocalInput;

use crate::models::DuelSystems;

pub fn plugin(app: &mut App) {
    app.init_resource::<FrameInput>()
        .add_systems(Update, read_input.in_set(DuelSystems::ReadInput));
}

/// Input sampled this frame, relative to the boss.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct FrameInput(pub LocalInput);

const STICK_DEADZONE: f32 = 0.15;

fn read_input(
    keys: Res<ButtonInput<KeyCode>>,
    mouse: Res<ButtonInput<MouseButton>>,
    gamepads: Query<&Gamepad>,
    mut frame: ResMut<FrameInput>,
) {
    let mut input = from_keyboard(&keys, &mouse);
    for gamepad in &gamepads {
        merge_gamepad(&mut input, gamepad);
    }
    frame.0 = input;
}

/// WASD walks relative to the boss, LMB or J swings (hold for heavy),
/// RMB or K guards, Space dashes, R drinks a heal charge.
pub fn from_keyboard(keys: &ButtonInput<KeyCode>, mouse: &ButtonInput<MouseButton>) -> LocalInput {
    let axis = |neg: KeyCode, pos: KeyCode| {
        (keys.pressed(pos) as i8 - keys.pressed(neg) as i8) as f32
    };
    let axes = Vec2::new(axis(KeyCode::KeyA, KeyCode::KeyD), axis(KeyCode::KeyS, KeyCode::KeyW));

    LocalInput {
        axes: axes.normalize_or_zero(),
        attack_down: mouse.pressed(MouseButton::Left) || keys.pressed(KeyCode::KeyJ),
        block: mouse.pressed(MouseButton::Right) || keys.pressed(KeyCode::KeyK),
        dash: keys.just_pressed(KeyCode::Space),
        heal: keys.just_pressed(KeyCode::KeyR),
    }
}

fn merge_gamepad(input: &mut LocalInput, gamepad: &Gamepad) {
    let stick = gamepad.left_stick();
    if stick.length() > STICK_DEADZONE {
        input.axes = stick.clamp_length_max(1.0);
    }
    input.attack_down |= gamepad.pressed(GamepadButton::RightTrigger2);
    input.block |= gamepad.pressed(GamepadButton::LeftTrigger2);
    input.dash |= gamepad.just_pressed(GamepadButton::South);
    input.heal |= gamepad.just_pressed(GamepadButton::West);
}
