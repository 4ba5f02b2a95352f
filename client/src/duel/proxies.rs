//! Capsule stand-ins for every fighter, mirrored from the simulation.

use bevy::prelude::*;
use shadow_duel_shared::combatant::Swing;
use shadow_duel_shared::{Combatant, PeerId};

use super::Duel;
use crate::models::{DuelSystems, Screen};
use crate::ui::hex_color;

pub fn plugin(app: &mut App) {
    app.add_systems(OnEnter(Screen::Gameplay), spawn_fixed_proxies)
        .add_systems(
            Update,
            (reconcile_remote_proxies, move_proxies, tint_proxies)
                .chain()
                .in_set(DuelSystems::Present)
                .run_if(resource_exists::<Duel>),
        );
}

/// Which fighter an entity draws.
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct Proxy(pub PeerId);

/// Child mesh that follows the swing.
#[derive(Component)]
struct Blade;

#[derive(Component)]
struct BaseColor(Color);

const BODY_HEIGHT: f32 = 1.0;

fn spawn_fixed_proxies(
    duel: Res<Duel>,
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let sim = &duel.sim;
    spawn_proxy(&mut commands, &mut meshes, &mut materials, &sim.player, Color::WHITE);
    spawn_proxy(
        &mut commands,
        &mut meshes,
        &mut materials,
        &sim.boss,
        hex_color(sim.archetype.color()),
    );
    for remote in sim.remotes.values() {
        spawn_proxy(
            &mut commands,
            &mut meshes,
            &mut materials,
            &remote.combatant,
            hex_color(remote.color),
        );
    }
}

fn spawn_proxy(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    fighter: &Combatant,
    color: Color,
) {
    let body = meshes.add(Capsule3d::new(fighter.body_radius, BODY_HEIGHT));
    let blade = meshes.add(Cuboid::new(0.08, 0.08, 1.6));
    let material = materials.add(StandardMaterial {
        base_color: color,
        perceptual_roughness: 0.7,
        ..default()
    });
    let steel = materials.add(StandardMaterial {
        base_color: Color::srgb(0.8, 0.82, 0.85),
        metallic: 0.9,
        perceptual_roughness: 0.3,
        ..default()
    });

    commands
        .spawn((
            Name::new(format!("Proxy {}", fighter.id)),
            Proxy(fighter.id.clone()),
            BaseColor(color),
            DespawnOnEnter(Screen::Connecting),
            Mesh3d(body),
            MeshMaterial3d(material),
            proxy_transform(fighter),
        ))
        .with_children(|parent| {
            parent.spawn((
                Blade,
                Mesh3d(blade),
                MeshMaterial3d(steel),
                Transform::from_xyz(0.5, 0.2, 0.9),
            ));
        });
}

fn proxy_transform(fighter: &Combatant) -> Transform {
    let half = fighter.body_radius + BODY_HEIGHT / 2.0;
    Transform::from_translation(fighter.position + Vec3::Y * half * fighter.scale)
        .with_rotation(Quat::from_rotation_y(fighter.yaw))
        .with_scale(Vec3::splat(fighter.scale))
}

fn reconcile_remote_proxies(
    duel: Res<Duel>,
    proxies: Query<(Entity, &Proxy)>,
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let sim = &duel.sim;
    for (entity, proxy) in &proxies {
        if duel.fighter(&proxy.0).is_none() {
            commands.entity(entity).despawn();
        }
    }
    for (id, remote) in &sim.remotes {
        if !proxies.iter().any(|(_, proxy)| &proxy.0 == id) {
            spawn_proxy(
                &mut commands,
                &mut meshes,
                &mut materials,
                &remote.combatant,
                hex_color(remote.color),
            );
        }
    }
}

fn move_proxies(
    duel: Res<Duel>,
    mut proxies: Query<(&Proxy, &mut Transform, &Children), Without<Blade>>,
    mut blades: Query<&mut Transform, With<Blade>>,
) {
    for (proxy, mut transform, children) in &mut proxies {
        let Some(fighter) = duel.fighter(&proxy.0) else {
            continue;
        };
        *transform = proxy_transform(fighter);

        for child in children.iter() {
            if let Ok(mut blade) = blades.get_mut(child) {
                blade.rotation = blade_pose(fighter);
            }
        }
    }
}

/// Swing arc around the body, raised when guarding.
fn blade_pose(fighter: &Combatant) -> Quat {
    if fighter.attacking {
        let t = fighter.swing_progress();
        return match fighter.swing {
            Swing::Overhead => Quat::from_rotation_x(-1.2 + t * 2.0),
            Swing::Left => Quat::from_rotation_y(1.4 - t * 2.8),
            Swing::Right => Quat::from_rotation_y(-1.4 + t * 2.8),
        };
    }
    if fighter.blocking {
        return Quat::from_rotation_y(-1.2) * Quat::from_rotation_x(0.6);
    }
    if fighter.charging {
        return Quat::from_rotation_x(-1.4);
    }
    Quat::from_rotation_x(0.5)
}

fn tint_proxies(
    duel: Res<Duel>,
    proxies: Query<(&Proxy, &BaseColor, &MeshMaterial3d<StandardMaterial>)>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    for (proxy, base, material) in &proxies {
        let Some(fighter) = duel.fighter(&proxy.0) else {
            continue;
        };
        let Some(material) = materials.get_mut(&material.0) else {
            continue;
        };
        material.base_color = if fighter.is_defeated() {
            base.0.darker(0.4)
        } else {
            base.0
        };
        material.emissive = if fighter.is_stunned() {
            LinearRgba::rgb(0.9, 0.55, 0.1)
        } else if fighter.is_invulnerable() {
            LinearRgba::rgb(0.3, 0.3, 0.35)
        } else if fighter.healing {
            LinearRgba::rgb(0.1, 0.6, 0.1)
        } else {
            LinearRgba::BLACK
        };
    }
}
