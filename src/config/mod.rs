//! Runtime configuration for the gameplay core.
//!
//! `GameConfig` is read once when the plugin is built, from a RON file named by
//! `WILLOWBROOK_CONFIG` or `willowbrook.ron` in the working directory. A host
//! (or a test) may insert its own `GameConfig` before adding the plugin, in
//! which case nothing is read from disk.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::shared::*;

pub const CONFIG_ENV_VAR: &str = "WILLOWBROOK_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "willowbrook.ron";

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Number of save slots shown on the load screen.
    pub save_slots: u8,
    /// Directory for slot files. `None` = `saves/` next to the executable.
    pub saves_dir: Option<PathBuf>,
    /// Prepended to every storage key (browser localStorage needs a namespace).
    pub storage_key_prefix: String,
    pub autosave_on_day_end: bool,
    /// Periodic autosave while playing. `None` disables it.
    pub autosave_interval_secs: Option<f32>,
    pub starting_gold: u32,
    pub inventory_capacity: usize,
    pub max_toasts: usize,
    /// Lifetime for toasts that arrive without their own duration.
    pub toast_secs: f32,
    pub base_max_mana: f32,
    pub mana_regen_per_sec: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            save_slots: 3,
            saves_dir: None,
            storage_key_prefix: String::from("willowbrook_"),
            autosave_on_day_end: true,
            autosave_interval_secs: None,
            starting_gold: STARTING_GOLD,
            inventory_capacity: TOTAL_INVENTORY_SLOTS,
            max_toasts: 3,
            toast_secs: DEFAULT_TOAST_SECS,
            base_max_mana: 50.0,
            mana_regen_per_sec: 1.0,
        }
    }
}

impl GameConfig {
    pub fn from_ron_str(source: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(source)
    }

    /// Reads `path`; a missing or malformed file yields the defaults.
    pub fn load_or_default(path: &Path) -> Self {
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(_) => {
                info!("[Config] No config at {}, using defaults", path.display());
                return Self::default();
            }
        };
        match Self::from_ron_str(&source) {
            Ok(config) => {
                info!("[Config] Loaded {}", path.display());
                config
            }
            Err(e) => {
                warn!("[Config] Ignoring malformed {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn from_environment() -> Self {
        let path = std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_or_default(&path)
    }
}

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<GameConfig>() {
            app.insert_resource(GameConfig::from_environment());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_ron_fills_defaults() {
        let config = GameConfig::from_ron_str("(save_slots: 5, starting_gold: 1200)").unwrap();
        assert_eq!(config.save_slots, 5);
        assert_eq!(config.starting_gold, 1200);
        assert_eq!(config.inventory_capacity, TOTAL_INVENTORY_SLOTS);
        assert!(config.autosave_on_day_end);
    }

    #[test]
    fn test_optional_fields_parse() {
        let config = GameConfig::from_ron_str(
            r#"(saves_dir: Some("/tmp/wb"), autosave_interval_secs: Some(120.0))"#,
        )
        .unwrap();
        assert_eq!(config.saves_dir, Some(PathBuf::from("/tmp/wb")));
        assert_eq!(config.autosave_interval_secs, Some(120.0));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = GameConfig::load_or_default(Path::new("/definitely/not/here.ron"));
        assert_eq!(config, GameConfig::default());
    }

    #[test]
    fn test_malformed_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ron");
        std::fs::write(&path, "(save_slots: \"three\"").unwrap();
        assert_eq!(GameConfig::load_or_default(&path), GameConfig::default());
    }
}
