//! Dark arena floor, lights, and the obstacle dressing for each map type.
use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shadow_duel_shared::arena::{ARENA_RADIUS, Obstacle, SPAWN_RING};
use shadow_duel_shared::rng::hash_name;

use crate::models::{MapType, Screen};
use crate::ui::colors;

pub fn plugin(app: &mut App) {
    app.add_systems(OnEnter(Screen::Gameplay), setup_arena_scene);
}

/// Obstacles the simulation collides against, and what to draw for them.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct ArenaLayout {
    pub map: MapType,
    pub obstacles: Vec<Obstacle>,
}

/// Keep the spawn ring and the boss's opening ground clear.
const CLEAR_RADIUS: f32 = SPAWN_RING + 6.0;
const EDGE_MARGIN: f32 = 8.0;

/// Every participant derives the same layout from the session id.
pub fn layout_for(map: MapType, session_id: &str) -> ArenaLayout {
    let (count, min_radius, max_radius) = match map {
        MapType::Arena => (0, 0.0, 0.0),
        MapType::Ruins => (10, 1.0, 2.0),
        MapType::Snow => (6, 1.5, 3.0),
    };
    let mut rng = StdRng::seed_from_u64(hash_name(session_id).unsigned_abs());

    let obstacles = (0..count)
        .map(|_| {
            let angle = rng.random_range(0.0..std::f32::consts::TAU);
            let dist = rng.random_range(CLEAR_RADIUS..ARENA_RADIUS - EDGE_MARGIN);
            Obstacle {
                center: Vec2::from_angle(angle) * dist,
                radius: rng.random_range(min_radius..max_radius),
            }
        })
        .collect();

    ArenaLayout { map, obstacles }
}

fn setup_arena_scene(
    layout: Res<ArenaLayout>,
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let floor_color = match layout.map {
        MapType::Arena => colors::NEUTRAL920,
        MapType::Ruins => colors::NEUTRAL850,
        MapType::Snow => colors::NEUTRAL300,
    };
    let floor_material = materials.add(StandardMaterial {
        base_color: floor_color,
        perceptual_roughness: 0.9,
        metallic: 0.0,
        reflectance: 0.05,
        ..default()
    });

    commands.spawn((
        Name::new("ArenaFloor"),
        DespawnOnEnter(Screen::Connecting),
        Mesh3d(meshes.add(Circle::new(ARENA_RADIUS).mesh().resolution(96))),
        MeshMaterial3d(floor_material),
        Transform::from_rotation(Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2)),
    ));

    // Faint ring marking the edge
    let edge_material = materials.add(StandardMaterial {
        base_color: colors::NEUTRAL700,
        emissive: LinearRgba::from(colors::NEUTRAL700),
        unlit: true,
        ..default()
    });
    commands.spawn((
        DespawnOnEnter(Screen::Connecting),
        Mesh3d(meshes.add(Annulus::new(ARENA_RADIUS - 0.15, ARENA_RADIUS).mesh().resolution(96))),
        MeshMaterial3d(edge_material),
        Transform::from_xyz(0.0, 0.01, 0.0)
            .with_rotation(Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2)),
    ));

    let obstacle_material = materials.add(StandardMaterial {
        base_color: colors::NEUTRAL600,
        perceptual_roughness: 0.8,
        ..default()
    });
    for obstacle in &layout.obstacles {
        let height = obstacle.radius * 2.5;
        commands.spawn((
            Name::new("Obstacle"),
            DespawnOnEnter(Screen::Connecting),
            Mesh3d(meshes.add(Cylinder::new(obstacle.radius, height))),
            MeshMaterial3d(obstacle_material.clone()),
            Transform::from_xyz(obstacle.center.x, height / 2.0, obstacle.center.y),
        ));
    }

    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 600.0,
        ..default()
    });

    commands.spawn((
        DespawnOnEnter(Screen::Connecting),
        DirectionalLight {
            color: Color::WHITE,
            illuminance: 4000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(EulerRot::XYZ, -0.9, 0.4, 0.0)),
    ));

    commands.insert_resource(ClearColor(colors::VOID));
}
