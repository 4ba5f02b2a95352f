//! Lock-on camera: sits behind the local fighter and keeps the boss framed.

use bevy::{
    anti_alias::fxaa::Fxaa,
    pbr::{DistanceFog, FogFalloff},
    prelude::*,
    render::view::Hdr,
};

use crate::duel::Duel;
use crate::models::{DuelSystems, Settings};

pub fn plugin(app: &mut App) {
    app.add_systems(Startup, spawn_camera)
        .add_systems(Update, apply_fov.run_if(resource_changed::<Settings>))
        .add_systems(
            Update,
            follow_lock_on
                .in_set(DuelSystems::Present)
                .run_if(resource_exists::<Duel>),
        );
}

#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct SceneCamera;

const BEHIND: f32 = 7.0;
const ABOVE: f32 = 4.5;
const FOLLOW_SPEED: f32 = 6.0;

pub fn spawn_camera(mut commands: Commands, settings: Res<Settings>) {
    commands.spawn((
        SceneCamera,
        IsDefaultUiCamera,
        Camera3d::default(),
        Camera::default(),
        Projection::from(PerspectiveProjection {
            fov: settings.fov.to_radians(),
            ..default()
        }),
        Transform::from_xyz(0.0, 12.0, 18.0).looking_at(Vec3::ZERO, Vec3::Y),
        Hdr,
        Fxaa::default(),
        // Fade the arena edge into the void
        DistanceFog {
            color: Color::srgb(0.05, 0.05, 0.06),
            falloff: FogFalloff::Linear {
                start: 40.0,
                end: 90.0,
            },
            ..default()
        },
    ));
}

fn apply_fov(settings: Res<Settings>, mut camera: Query<&mut Projection, With<SceneCamera>>) {
    let Ok(mut projection) = camera.single_mut() else {
        return;
    };
    if let Projection::Perspective(perspective) = projection.as_mut() {
        perspective.fov = settings.fov.to_radians();
    }
}

fn follow_lock_on(
    time: Res<Time>,
    duel: Res<Duel>,
    mut camera: Query<&mut Transform, With<SceneCamera>>,
) {
    let Ok(mut transform) = camera.single_mut() else {
        return;
    };
    let player = duel.sim.player.position;
    let boss = duel.sim.boss.position;

    let away = (player - boss).with_y(0.0).normalize_or(Vec3::Z);
    let goal = player + away * BEHIND + Vec3::Y * ABOVE;
    let focus = player.lerp(boss, 0.6) + Vec3::Y * 1.2;

    let t = (time.delta_secs() * FOLLOW_SPEED).min(1.0);
    transform.translation = transform.translation.lerp(goal, t);
    transform.look_at(focus, Vec3::Y);
}
