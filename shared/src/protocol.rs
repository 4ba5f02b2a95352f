//! Wire records exchanged through the session store.
//!
//! Field names are camelCase on the wire. Every record has exactly one writer:
//! the session record belongs to the host, each peer record to its owner and
//! the boss record to the host, so last-write-wins needs no conflict handling.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::combat::AttackKind;
use crate::director::AiState;

/// Peer colours, assigned by how many live peers were present at join.
pub const PLAYER_COLORS: [u32; 6] = [0xaaaaaa, 0x4fc3f7, 0x81c784, 0xffb74d, 0xba68c8, 0xf06292];

pub fn color_for(live_peers: usize) -> u32 {
    PLAYER_COLORS[live_peers % PLAYER_COLORS.len()]
}

/// Session key derived from the boss name: lower-case, anything outside
/// `[a-z0-9]` becomes `_`.
pub fn session_id(boss_name: &str) -> String {
    boss_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '_' })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    #[serde(rename = "PLAYING")]
    Playing,
    #[serde(rename = "ENDED")]
    Ended,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub boss_name: String,
    pub map_type: String,
    pub state: SessionState,
    /// Server timestamp, milliseconds.
    #[serde(default)]
    pub created_at: i64,
    pub host_id: String,
    #[serde(default)]
    pub player_count: i64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanarPos {
    pub x: f32,
    pub z: f32,
}

impl From<Vec2> for PlanarPos {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, z: v.y }
    }
}

impl From<PlanarPos> for Vec2 {
    fn from(p: PlanarPos) -> Self {
        Vec2::new(p.x, p.z)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    pub z: f32,
}

impl From<Vec3> for WorldPos {
    fn from(v: Vec3) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

impl From<WorldPos> for Vec3 {
    fn from(p: WorldPos) -> Self {
        Vec3::new(p.x, p.y, p.z)
    }
}

/// A peer's self-reported state. Freshly registered peers carry an empty
/// object, so every field tolerates absence.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<PlanarPos>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rot: Option<f32>,
    #[serde(default)]
    pub attacking: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack_type: Option<AttackKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocking: Option<bool>,
    #[serde(default)]
    pub healing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posture: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stunned: Option<bool>,
}

impl PeerState {
    /// Whether the owner ever published anything.
    pub fn is_populated(&self) -> bool {
        self.pos.is_some() || self.health.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerRecord {
    pub name: String,
    pub color: u32,
    /// Server timestamp, milliseconds.
    #[serde(default)]
    pub joined_at: i64,
    /// Spawn ring slot, the number of live peers the owner saw at join.
    #[serde(default)]
    pub slot: usize,
    #[serde(default)]
    pub state: PeerState,
}

/// Canonical boss snapshot, written only by the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BossRecord {
    pub pos: WorldPos,
    pub rot: f32,
    pub health: f32,
    pub posture: f32,
    pub ai_state: AiState,
    pub attacking: bool,
    pub attack_type: AttackKind,
    pub attack_timer: f32,
    pub special_attacking: bool,
    /// Maneuver display name, empty when none has run yet.
    #[serde(default)]
    pub special_type: String,
    pub stunned: bool,
    #[serde(default)]
    pub target_id: String,
}
