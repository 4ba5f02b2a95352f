use super::*;
use shadow_duel_shared::SessionConfig;
use std::{fs, io, path::Path};
use thiserror::Error;

pub const SETTINGS_PATH: &str = "assets/settings.ron";

pub fn plugin(app: &mut App) {
    let settings = Settings::load();
    // Leave an editable file behind on first launch
    if !Path::new(SETTINGS_PATH).exists() {
        if let Err(e) = settings.save() {
            warn!("Failed to write default settings: {e}");
        }
    }
    app.insert_resource(settings).add_systems(
        Update,
        (
            toggle_network_mode.run_if(in_state(Screen::GameOver)),
            auto_save_settings
                .run_if(resource_changed::<Settings>.and(not(resource_added::<Settings>))),
        )
            .chain(),
    );
}

fn toggle_network_mode(keys: Res<ButtonInput<KeyCode>>, mut settings: ResMut<Settings>) {
    if !keys.just_pressed(KeyCode::Tab) {
        return;
    }
    settings.network = match settings.network {
        NetworkMode::Offline => NetworkMode::Loopback,
        NetworkMode::Loopback => NetworkMode::Offline,
    };
    info!("Next match plays {:?}", settings.network);
}

fn auto_save_settings(settings: Res<Settings>) {
    if let Err(e) = settings.save() {
        error!("Failed to auto-save settings: {e}");
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not write the settings file")]
    Io(#[from] io::Error),
    #[error("could not serialize settings")]
    Ron(#[from] ron::Error),
}

#[derive(Resource, Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub player_name: String,
    /// Also the session key: everyone typing the same name meets the same boss.
    pub boss_name: String,
    pub map_type: MapType,
    pub network: NetworkMode,
    // video
    pub fov: f32,
    pub session: SessionConfig,
}

impl Settings {
    pub fn load() -> Self {
        match fs::read_to_string(SETTINGS_PATH) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    fn parse(content: &str) -> Self {
        match ron::from_str(content) {
            Ok(settings) => {
                info!("Loaded settings from '{SETTINGS_PATH}'");
                settings
            }
            Err(e) => {
                warn!("Failed to parse '{SETTINGS_PATH}', using defaults: {e}");
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        if let Some(parent) = Path::new(SETTINGS_PATH).parent() {
            fs::create_dir_all(parent)?;
        }
        let content = ron::ser::to_string_pretty(self, Default::default())?;
        fs::write(SETTINGS_PATH, content)?;
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            player_name: "Unkindled".to_string(),
            boss_name: "Gael".to_string(),
            map_type: MapType::Arena,
            network: NetworkMode::Offline,
            fov: 60.0,
            session: SessionConfig::default(),
        }
    }
}
