// Disable console on Windows for non-dev builds.
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use bevy::{app::App, asset::AssetMetaCheck, log, prelude::*};

#[cfg(feature = "audio")]
pub mod audio;
pub mod camera;
pub mod duel;
pub mod models;
pub mod networking;
pub mod scene;
pub mod ui;

fn main() {
    let mut app = App::new();

    let window = WindowPlugin {
        primary_window: Some(Window {
            title: "Shadow Duel".to_string(),
            fit_canvas_to_parent: true,
            // Tells wasm not to override default event handling, like F5 and Ctrl+R
            prevent_default_event_handling: false,
            ..default()
        }),
        ..default()
    };
    let assets = AssetPlugin {
        meta_check: AssetMetaCheck::Never,
        ..default()
    };
    // DEBUG
    // let filter = "debug,symphonia=off,naga=off,wgpu=warn,shadow_duel_shared=trace".to_string();
    let filter = "info,cosmic_text=info,calloop=off,symphonia=off,naga=off,wgpu=warn,wgpu_core=error,bevy_core_pipeline=error,bevy_pbr=error,bevy_dev_tools=warn".to_string();
    let log_level = log::LogPlugin {
        level: log::Level::TRACE,
        filter,
        ..Default::default()
    };

    app.add_plugins(DefaultPlugins.set(window).set(assets).set(log_level));

    // custom plugins. the order is important
    // be sure you use resources/types AFTER you add plugins that insert them
    app.add_plugins((
        models::plugin,
        camera::plugin,
        scene::plugin,
        networking::plugin,
        duel::plugin,
        ui::plugin,
    ));

    #[cfg(feature = "audio")]
    app.add_plugins(audio::plugin);

    app.run();
}
