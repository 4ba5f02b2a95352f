//! Arena bounds, obstacle push-out and boss steering.

use std::f32::consts::TAU;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

pub const ARENA_RADIUS: f32 = 48.0;
/// Boss steering starts pulling back toward the centre past this radius.
pub const SOFT_EDGE: f32 = 40.0;
pub const AVOID_RANGE: f32 = 2.5;
pub const AVOID_WEIGHT: f32 = 0.6;

pub const SPAWN_RING: f32 = 6.0;
pub const SPAWN_SLOTS: usize = 6;
pub const BOSS_SPAWN: Vec3 = Vec3::new(0.0, 0.0, -5.0);
pub const SOLO_SPAWN: Vec3 = Vec3::new(0.0, 0.0, 5.0);

/// Circular blocker supplied by the environment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub center: Vec2,
    pub radius: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Arena {
    pub radius: f32,
    pub obstacles: Vec<Obstacle>,
}

impl Default for Arena {
    fn default() -> Self {
        Self { radius: ARENA_RADIUS, obstacles: Vec::new() }
    }
}

impl Arena {
    pub fn with_obstacles(obstacles: Vec<Obstacle>) -> Self {
        Self { obstacles, ..Default::default() }
    }

    /// Pull a planar point back inside the arena circle.
    pub fn clamp(&self, pos: Vec2) -> Vec2 {
        let dist = pos.length();
        if dist > self.radius {
            pos * (self.radius / dist)
        } else {
            pos
        }
    }

    /// Push a body of `radius` out of every overlapping obstacle, then clamp
    /// it to the arena.
    pub fn resolve_collision(&self, pos: &mut Vec3, radius: f32) {
        let mut planar = Vec2::new(pos.x, pos.z);
        for obstacle in &self.obstacles {
            let delta = planar - obstacle.center;
            let dist = delta.length();
            let min_dist = radius + obstacle.radius;
            if dist < min_dist {
                let dir = if dist > f32::EPSILON { delta / dist } else { Vec2::X };
                planar += dir * (min_dist - dist);
            }
        }
        planar = self.clamp(planar);
        pos.x = planar.x;
        pos.z = planar.y;
    }

    /// Steering force away from nearby obstacles and back from the edge.
    pub fn avoidance(&self, pos: Vec2) -> Vec2 {
        let mut force = Vec2::ZERO;
        for obstacle in &self.obstacles {
            let to_me = pos - obstacle.center;
            let overlap = (obstacle.radius + AVOID_RANGE) - to_me.length();
            if overlap > 0.0 {
                force += to_me.normalize_or_zero() * overlap * AVOID_WEIGHT;
            }
        }
        let from_center = pos.length();
        if from_center > SOFT_EDGE {
            force += -pos.normalize_or_zero() * (from_center - SOFT_EDGE);
        }
        force
    }
}

/// Deterministic spawn point for the `slot`-th participant on the ring
/// around the centre.
pub fn spawn_slot(slot: usize) -> Vec3 {
    let angle = (slot % SPAWN_SLOTS) as f32 * (TAU / SPAWN_SLOTS as f32);
    Vec3::new(angle.sin() * SPAWN_RING, 0.0, angle.cos() * SPAWN_RING)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_keeps_inside_points() {
        let arena = Arena::default();
        assert_eq!(arena.clamp(Vec2::new(3.0, 4.0)), Vec2::new(3.0, 4.0));
        let clamped = arena.clamp(Vec2::new(60.0, 80.0));
        assert!((clamped.length() - ARENA_RADIUS).abs() < 1e-4);
    }

    #[test]
    fn obstacles_push_bodies_out() {
        let arena = Arena::with_obstacles(vec![Obstacle { center: Vec2::ZERO, radius: 1.0 }]);
        let mut pos = Vec3::new(1.0, 0.0, 0.0);
        arena.resolve_collision(&mut pos, 0.5);
        assert!((pos.x - 1.5).abs() < 1e-5);
        assert_eq!(pos.z, 0.0);
    }

    #[test]
    fn avoidance_points_away_and_inward() {
        let arena = Arena::with_obstacles(vec![Obstacle { center: Vec2::ZERO, radius: 1.0 }]);
        let force = arena.avoidance(Vec2::new(2.0, 0.0));
        assert!(force.x > 0.0);
        assert!((force.x - 1.5 * AVOID_WEIGHT).abs() < 1e-5);

        let edge = Arena::default().avoidance(Vec2::new(45.0, 0.0));
        assert!((edge.x + 5.0).abs() < 1e-5);
        assert_eq!(Arena::default().avoidance(Vec2::new(10.0, 0.0)), Vec2::ZERO);
    }

    #[test]
    fn spawn_slots_ring_the_centre() {
        assert!((spawn_slot(0) - Vec3::new(0.0, 0.0, 6.0)).length() < 1e-5);
        for slot in 0..SPAWN_SLOTS {
            assert!((spawn_slot(slot).length() - SPAWN_RING).abs() < 1e-4);
        }
        assert_eq!(spawn_slot(7), spawn_slot(1));
    }
}
