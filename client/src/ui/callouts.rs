//! Floating call-outs: DODGE, DEFLECT, GUARD BREAK and friends over the
//! fighter they concern, join and leave notices across the top of the screen.
use bevy::prelude::*;
use bevy::transform::TransformSystems;
use shadow_duel_shared::sim::Callout;

use crate::camera::SceneCamera;
use crate::duel::{Duel, DuelEvent};
use crate::models::Screen;
use crate::ui::hex_color;

pub fn plugin(app: &mut App) {
    app.add_observer(on_callout).add_systems(
        PostUpdate,
        tick_callouts
            .after(TransformSystems::Propagate)
            .run_if(in_state(Screen::Gameplay)),
    );
}

#[derive(Component)]
struct FloatingText {
    timer: f32,
    color: Color,
    anchor: Anchor,
}

#[derive(Clone, Copy)]
enum Anchor {
    World(Vec3),
    /// Stacked notices under the boss bar.
    Banner(f32),
}

const DISPLAY_DURATION: f32 = 1.2;
const HOLD_END: f32 = 0.5;
const RISE_PIXELS: f32 = 60.0;
const OVERHEAD: f32 = 2.6;

fn on_callout(
    on: On<DuelEvent>,
    duel: Option<Res<Duel>>,
    banners: Query<&FloatingText>,
    mut commands: Commands,
) {
    let Some(Callout {
        text,
        anchor,
        color,
    }) = on.event().0.callout()
    else {
        return;
    };

    let anchor = match (&anchor, duel.as_deref()) {
        (Some(id), Some(duel)) => match duel.fighter(id) {
            Some(f) => Anchor::World(f.position + Vec3::Y * OVERHEAD * f.scale),
            None => return,
        },
        _ => {
            let stacked = banners
                .iter()
                .filter(|t| matches!(t.anchor, Anchor::Banner(_)))
                .count();
            Anchor::Banner(110.0 + stacked as f32 * 26.0)
        }
    };

    let color = hex_color(color);
    let font_size = if matches!(anchor, Anchor::Banner(_)) { 18.0 } else { 24.0 };
    commands.spawn((
        FloatingText {
            timer: 0.0,
            color,
            anchor,
        },
        Text::new(text),
        TextFont::from_font_size(font_size),
        TextColor(color),
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(-9999.0),
            top: Val::Px(-9999.0),
            ..default()
        },
        GlobalZIndex(100),
        DespawnOnEnter(Screen::Connecting),
    ));
}

fn tick_callouts(
    time: Res<Time>,
    mut commands: Commands,
    window: Query<&Window>,
    camera: Query<(&Camera, &GlobalTransform), With<SceneCamera>>,
    mut texts: Query<(Entity, &mut FloatingText, &mut Node, &mut TextColor, &ComputedNode)>,
) {
    let Ok((cam, cam_global)) = camera.single() else {
        return;
    };
    let half_width = window.single().map(|w| w.width() / 2.0).unwrap_or(640.0);

    for (entity, mut callout, mut node, mut color, computed) in texts.iter_mut() {
        callout.timer += time.delta_secs();
        let t = callout.timer / DISPLAY_DURATION;
        if t >= 1.0 {
            commands.entity(entity).despawn();
            continue;
        }

        let text_width = computed.size().x * computed.inverse_scale_factor();
        let rise = RISE_PIXELS * t.sqrt();
        let screen = match callout.anchor {
            Anchor::World(world) => match cam.world_to_viewport(cam_global, world) {
                Ok(pos) => pos - Vec2::Y * rise,
                Err(_) => {
                    node.left = Val::Px(-9999.0);
                    node.top = Val::Px(-9999.0);
                    continue;
                }
            },
            Anchor::Banner(top) => Vec2::new(half_width, top),
        };
        node.left = Val::Px(screen.x - text_width / 2.0);
        node.top = Val::Px(screen.y);

        let alpha = if t < HOLD_END {
            1.0
        } else {
            let fade_t = (t - HOLD_END) / (1.0 - HOLD_END);
            1.0 - fade_t * fade_t
        };
        color.0 = callout.color.with_alpha(alpha);
    }
}
