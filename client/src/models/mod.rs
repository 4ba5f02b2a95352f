use bevy::prelude::*;
use serde::{Deserialize, Serialize};

mod settings;
mod states;

pub use settings::*;
pub use states::*;

pub fn plugin(app: &mut App) {
    app.configure_sets(
        Update,
        (
            DuelSystems::ReadInput,
            DuelSystems::Step,
            DuelSystems::Publish,
            DuelSystems::Present,
        )
            .chain()
            .run_if(in_state(Screen::Gameplay)),
    );

    app.add_plugins((settings::plugin, states::plugin));
}

/// Per-frame groupings for the duel in the [`Update`] schedule.
/// When adding a new variant, order it in the `configure_sets` call above.
#[derive(SystemSet, Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum DuelSystems {
    /// Sample keyboard and gamepad into a frame of input.
    ReadInput,
    /// Drain the session and advance the simulation.
    Step,
    /// Push local state to the session on its cadence.
    Publish,
    /// Move proxies, refresh the HUD, spawn call-outs and sounds.
    Present,
}

/// How the duel finds other players.
#[derive(Reflect, Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum NetworkMode {
    /// Solo, this process owns the boss.
    #[default]
    Offline,
    /// Full host path against a session store living in this process. Nobody
    /// else can reach it, so this exercises election and publication alone.
    #[serde(alias = "Local")]
    Loopback,
}

/// Arena dressing, chosen by the host and shared through the session record.
#[derive(Reflect, Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum MapType {
    #[default]
    Arena,
    Ruins,
    Snow,
}

impl MapType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MapType::Arena => "arena",
            MapType::Ruins => "ruins",
            MapType::Snow => "snow",
        }
    }

    /// Unknown names fall back to the plain arena.
    pub fn parse(value: &str) -> Self {
        match value {
            "ruins" => MapType::Ruins,
            "snow" => MapType::Snow,
            _ => MapType::Arena,
        }
    }
}
