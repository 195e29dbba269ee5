//! Player preferences. Stored as RON under their own storage key, so they
//! survive deleting or starting a save slot.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::save::SaveBackend;

pub const SETTINGS_KEY: &str = "settings";

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub master_volume: f32,
    pub music_volume: f32,
    pub sfx_volume: f32,
    /// Dialogue characters revealed per second.
    pub text_speed: f32,
    pub show_tutorial_hints: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            master_volume: 0.8,
            music_volume: 0.7,
            sfx_volume: 0.8,
            text_speed: 40.0,
            show_tutorial_hints: true,
        }
    }
}

impl Settings {
    /// Volumes into `0..=1`; text speed must stay positive.
    pub fn sanitized(mut self) -> Self {
        let defaults = Settings::default();
        for (value, fallback) in [
            (&mut self.master_volume, defaults.master_volume),
            (&mut self.music_volume, defaults.music_volume),
            (&mut self.sfx_volume, defaults.sfx_volume),
        ] {
            *value = if value.is_finite() {
                (*value).clamp(0.0, 1.0)
            } else {
                fallback
            };
        }
        if !self.text_speed.is_finite() || self.text_speed <= 0.0 {
            self.text_speed = defaults.text_speed;
        }
        self
    }

    pub fn effective_music_volume(&self) -> f32 {
        self.master_volume * self.music_volume
    }

    pub fn effective_sfx_volume(&self) -> f32 {
        self.master_volume * self.sfx_volume
    }

    pub fn from_ron_str(source: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str::<Settings>(source).map(Settings::sanitized)
    }

    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }
}

/// Request to replace the current settings.
#[derive(Event, Debug, Clone)]
pub struct ChangeSettingsEvent(pub Settings);

#[derive(Event, Debug, Clone)]
pub struct SettingsChangedEvent(pub Settings);

pub struct SettingsPlugin;

impl Plugin for SettingsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Settings>()
            .add_event::<ChangeSettingsEvent>()
            .add_event::<SettingsChangedEvent>()
            .add_systems(Startup, load_settings)
            .add_systems(Update, handle_settings_changes);
    }
}

pub fn load_settings(backend: Option<Res<SaveBackend>>, mut settings: ResMut<Settings>) {
    let Some(backend) = backend else {
        return;
    };
    match backend.read(SETTINGS_KEY) {
        Ok(Some(contents)) => match Settings::from_ron_str(&contents) {
            Ok(loaded) => {
                info!("[Settings] Loaded preferences");
                *settings = loaded;
            }
            Err(e) => warn!("[Settings] Malformed settings, using defaults: {}", e),
        },
        Ok(None) => debug!("[Settings] No stored settings"),
        Err(e) => warn!("[Settings] Could not read settings: {}", e),
    }
}

pub fn handle_settings_changes(
    mut events: EventReader<ChangeSettingsEvent>,
    mut settings: ResMut<Settings>,
    backend: Option<ResMut<SaveBackend>>,
    mut changed: EventWriter<SettingsChangedEvent>,
) {
    let Some(ChangeSettingsEvent(requested)) = events.read().last().cloned() else {
        return;
    };
    let updated = requested.sanitized();
    if *settings == updated {
        return;
    }
    *settings = updated.clone();

    if let Some(mut backend) = backend {
        match updated.to_ron_string() {
            Ok(contents) => {
                if let Err(e) = backend.write(SETTINGS_KEY, &contents) {
                    error!("[Settings] Failed to persist settings: {}", e);
                }
            }
            Err(e) => error!("[Settings] Failed to serialize settings: {}", e),
        }
    }
    changed.send(SettingsChangedEvent(updated));
}
