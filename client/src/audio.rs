//! Sound effects for simulation cues, played through `bevy_seedling`.
//!
//! Each [`Cue`] maps to one sample under `assets/audio/sfx/`. Missing files
//! only cost a load warning from the asset server; the duel never waits on
//! audio.
use std::collections::HashMap;

use bevy::prelude::*;
use bevy_seedling::prelude::*;
use rand::Rng;
use shadow_duel_shared::SimEvent;
use shadow_duel_shared::sim::Cue;

use crate::duel::DuelEvent;

/// Utility for converting a simple `[0.0, 1.0]` range to [`Volume`].
pub const CONVERTER: PerceptualVolume = PerceptualVolume::new();

pub fn plugin(app: &mut App) {
    app.add_plugins(bevy_seedling::SeedlingPlugin::default());

    app.add_systems(Startup, (setup, load_cue_sounds))
        .add_observer(play_cue);
}

fn setup(mut master: Single<&mut VolumeNode, With<MainBus>>) {
    master.volume = CONVERTER.perceptual_to_volume(0.7);
}

#[derive(Resource, Default)]
pub struct CueSounds(HashMap<Cue, Handle<AudioSample>>);

impl CueSounds {
    const FILES: [(Cue, &'static str); 7] = [
        (Cue::Clash, "audio/sfx/sword_clash.ogg"),
        (Cue::Parry, "audio/sfx/parry.ogg"),
        (Cue::Hit, "audio/sfx/hit.ogg"),
        (Cue::Dash, "audio/sfx/dash.ogg"),
        (Cue::Heal, "audio/sfx/heal.ogg"),
        (Cue::PostureBreak, "audio/sfx/posture_break.ogg"),
        (Cue::PerilousWarning, "audio/sfx/perilous.ogg"),
    ];
}

fn load_cue_sounds(mut commands: Commands, assets: Res<AssetServer>) {
    let sounds = CueSounds::FILES
        .iter()
        .map(|(cue, path)| (*cue, assets.load(*path)))
        .collect();
    commands.insert_resource(CueSounds(sounds));
}

fn play_cue(on: On<DuelEvent>, sounds: Option<Res<CueSounds>>, mut commands: Commands) {
    let SimEvent::Cue(cue) = &on.event().0 else {
        return;
    };
    let Some(handle) = sounds.as_ref().and_then(|s| s.0.get(cue)) else {
        return;
    };

    // ±15% volume variation, none on the warning
    let volume = match cue {
        Cue::PerilousWarning => 1.0,
        _ => rand::rng().random_range(0.85..1.15),
    };

    commands.spawn((
        SamplePlayer::new(handle.clone()).with_volume(Volume::Linear(volume)),
        RandomPitch::new(0.05),
    ));
}
