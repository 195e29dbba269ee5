//! The save coordinator: the `Saveable` contract, the section registry and the
//! versioned envelope that aggregates every manager's snapshot.

use bevy::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
#[cfg(not(target_arch = "wasm32"))]
use std::time::{SystemTime, UNIX_EPOCH};

use super::storage::SaveBackend;
use crate::config::GameConfig;

pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("i/o failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("save envelope is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("section '{key}' could not be decoded: {source}")]
    Section {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("save version {found} does not match current version {expected}")]
    VersionMismatch { found: u32, expected: u32 },
    #[error("save slot {0} is empty")]
    NoSave(u8),
    #[error("save slot {slot} is out of range (0..{slots})")]
    InvalidSlot { slot: u8, slots: u8 },
    #[error("storage backend error: {0}")]
    Backend(String),
}

// ═══════════════════════════════════════════════════════════════════════
// SAVEABLE CONTRACT
// ═══════════════════════════════════════════════════════════════════════

/// A manager resource that persists as one section of the save envelope.
pub trait Saveable: Resource + Serialize + DeserializeOwned + Default {
    /// Envelope key. Must be unique across registered managers.
    const SAVE_KEY: &'static str;

    /// State for a brand-new game.
    fn fresh(_config: &GameConfig) -> Self {
        Self::default()
    }

    /// Rebuilds anything derived after deserializing.
    fn after_load(&mut self) {}
}

type StagedRestore = Box<dyn FnOnce(&mut World) + Send>;

#[derive(Clone, Copy)]
pub struct SaveSection {
    pub key: &'static str,
    snapshot: fn(&World) -> Option<Result<Value, serde_json::Error>>,
    stage: fn(Value) -> Result<StagedRestore, serde_json::Error>,
    reset: fn(&mut World),
}

fn snapshot_section<T: Saveable>(world: &World) -> Option<Result<Value, serde_json::Error>> {
    world.get_resource::<T>().map(serde_json::to_value)
}

fn stage_section<T: Saveable>(value: Value) -> Result<StagedRestore, serde_json::Error> {
    let mut restored: T = serde_json::from_value(value)?;
    restored.after_load();
    Ok(Box::new(move |world: &mut World| {
        world.insert_resource(restored);
    }))
}

fn reset_section<T: Saveable>(world: &mut World) {
    let fresh = world
        .get_resource::<GameConfig>()
        .map(T::fresh)
        .unwrap_or_default();
    world.insert_resource(fresh);
}

/// Every manager that takes part in save/load, in registration order.
#[derive(Resource, Default, Clone)]
pub struct SaveRegistry {
    sections: Vec<SaveSection>,
}

impl SaveRegistry {
    /// Returns `false` when the key is already taken.
    pub fn register<T: Saveable>(&mut self) -> bool {
        if self.sections.iter().any(|s| s.key == T::SAVE_KEY) {
            warn!("[Save] Section '{}' registered twice; ignoring", T::SAVE_KEY);
            return false;
        }
        self.sections.push(SaveSection {
            key: T::SAVE_KEY,
            snapshot: snapshot_section::<T>,
            stage: stage_section::<T>,
            reset: reset_section::<T>,
        });
        true
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.sections.iter().map(|s| s.key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.sections.iter().any(|s| s.key == key)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

pub trait AppSaveExt {
    /// Initializes the manager resource and enrolls it in save/load.
    fn register_saveable<T: Saveable>(&mut self) -> &mut Self;
}

impl AppSaveExt for App {
    fn register_saveable<T: Saveable>(&mut self) -> &mut Self {
        self.init_resource::<T>();
        if !self.world().contains_resource::<SaveRegistry>() {
            self.init_resource::<SaveRegistry>();
        }
        self.world_mut().resource_mut::<SaveRegistry>().register::<T>();
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════
// ENVELOPE
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveEnvelope {
    pub version: u32,
    pub timestamp: u64,
    pub slot: u8,
    pub data: BTreeMap<String, Value>,
}

impl SaveEnvelope {
    pub fn parse(json: &str) -> Result<Self, SaveError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Decodes one section without touching any world.
    pub fn section<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// What a successful load did to each section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub slot: u8,
    pub timestamp: u64,
    pub restored: Vec<&'static str>,
    /// Registered managers absent from the envelope; reset to fresh state.
    pub defaulted: Vec<&'static str>,
    /// Envelope keys with no registered manager.
    pub skipped: Vec<String>,
}

pub fn slot_key(slot: u8) -> String {
    format!("slot_{}", slot)
}

#[cfg(not(target_arch = "wasm32"))]
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(target_arch = "wasm32")]
pub fn current_timestamp() -> u64 {
    0
}

/// Fails with `InvalidSlot` when `slot` is outside the configured range.
pub fn check_slot(world: &World, slot: u8) -> Result<(), SaveError> {
    if let Some(config) = world.get_resource::<GameConfig>() {
        if slot >= config.save_slots {
            return Err(SaveError::InvalidSlot {
                slot,
                slots: config.save_slots,
            });
        }
    }
    Ok(())
}

fn registered_sections(world: &World) -> Vec<SaveSection> {
    world
        .get_resource::<SaveRegistry>()
        .map(|r| r.sections.clone())
        .unwrap_or_default()
}

// ═══════════════════════════════════════════════════════════════════════
// SAVE / LOAD / RESET
// ═══════════════════════════════════════════════════════════════════════

/// Snapshots every registered manager into an envelope. Managers whose
/// resource is missing from the world are skipped.
pub fn build_envelope(world: &World, slot: u8) -> Result<SaveEnvelope, SaveError> {
    let mut data = BTreeMap::new();
    for section in registered_sections(world) {
        match (section.snapshot)(world) {
            Some(value) => {
                data.insert(section.key.to_string(), value?);
            }
            None => warn!("[Save] Manager '{}' not present; skipping", section.key),
        }
    }
    Ok(SaveEnvelope {
        version: SAVE_VERSION,
        timestamp: current_timestamp(),
        slot,
        data,
    })
}

pub fn save_world(world: &mut World, slot: u8) -> Result<(), SaveError> {
    check_slot(world, slot)?;
    let envelope = build_envelope(world, slot)?;
    let json = serde_json::to_string_pretty(&envelope)?;
    world
        .resource_mut::<SaveBackend>()
        .write(&slot_key(slot), &json)?;
    info!(
        "[Save] Wrote slot {} ({} sections, {} bytes)",
        slot,
        envelope.data.len(),
        json.len()
    );
    Ok(())
}

pub fn read_envelope(world: &World, slot: u8) -> Result<SaveEnvelope, SaveError> {
    check_slot(world, slot)?;
    let json = world
        .resource::<SaveBackend>()
        .read(&slot_key(slot))?
        .ok_or(SaveError::NoSave(slot))?;
    let envelope = SaveEnvelope::parse(&json)?;
    if envelope.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            found: envelope.version,
            expected: SAVE_VERSION,
        });
    }
    Ok(envelope)
}

/// Restores every manager from `slot`. Nothing is applied unless every
/// present section decodes.
pub fn load_world(world: &mut World, slot: u8) -> Result<LoadReport, SaveError> {
    let mut envelope = read_envelope(world, slot)?;
    let sections = registered_sections(world);

    let mut report = LoadReport {
        slot,
        timestamp: envelope.timestamp,
        ..Default::default()
    };
    let mut staged = Vec::with_capacity(sections.len());
    let mut to_reset = Vec::new();

    for section in &sections {
        match envelope.data.remove(section.key) {
            Some(value) => {
                let restore = (section.stage)(value).map_err(|source| SaveError::Section {
                    key: section.key,
                    source,
                })?;
                staged.push(restore);
                report.restored.push(section.key);
            }
            None => {
                to_reset.push(section.reset);
                report.defaulted.push(section.key);
            }
        }
    }
    for key in envelope.data.keys() {
        warn!("[Save] Slot {} has unknown section '{}'; skipping", slot, key);
        report.skipped.push(key.clone());
    }

    for restore in staged {
        restore(world);
    }
    for reset in to_reset {
        reset(world);
    }
    info!(
        "[Save] Loaded slot {} (restored {}, defaulted {}, skipped {})",
        slot,
        report.restored.len(),
        report.defaulted.len(),
        report.skipped.len()
    );
    Ok(report)
}

/// Puts every registered manager back to fresh new-game state.
pub fn reset_world(world: &mut World) {
    for section in registered_sections(world) {
        (section.reset)(world);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Resource, Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        value: u32,
        #[serde(skip)]
        doubled: u32,
    }

    impl Saveable for Counter {
        const SAVE_KEY: &'static str = "counter";

        fn fresh(config: &GameConfig) -> Self {
            Self {
                value: config.starting_gold,
                doubled: 0,
            }
        }

        fn after_load(&mut self) {
            self.doubled = self.value * 2;
        }
    }

    #[derive(Resource, Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Flags {
        names: Vec<String>,
    }

    impl Saveable for Flags {
        const SAVE_KEY: &'static str = "flags";
    }

    fn test_app() -> App {
        let mut app = App::new();
        app.insert_resource(GameConfig::default())
            .insert_resource(SaveBackend::memory())
            .register_saveable::<Counter>()
            .register_saveable::<Flags>();
        app
    }

    #[test]
    fn test_duplicate_registration_is_ignored() {
        let mut app = test_app();
        app.register_saveable::<Counter>();
        assert_eq!(app.world().resource::<SaveRegistry>().len(), 2);
    }

    #[test]
    fn test_round_trip_runs_after_load() {
        let mut app = test_app();
        let world = app.world_mut();
        world.resource_mut::<Counter>().value = 21;
        world.resource_mut::<Flags>().names.push("met_mayor".into());
        save_world(world, 0).unwrap();

        world.insert_resource(Counter::default());
        world.insert_resource(Flags::default());
        let report = load_world(world, 0).unwrap();

        assert_eq!(report.restored, vec!["counter", "flags"]);
        assert_eq!(world.resource::<Counter>().value, 21);
        assert_eq!(world.resource::<Counter>().doubled, 42);
        assert_eq!(world.resource::<Flags>().names, vec!["met_mayor".to_string()]);
    }

    #[test]
    fn test_missing_section_is_reset_and_unknown_key_skipped() {
        let mut app = test_app();
        let world = app.world_mut();
        let mut data = BTreeMap::new();
        data.insert("counter".to_string(), serde_json::json!({ "value": 7 }));
        data.insert("weather".to_string(), serde_json::json!("rainy"));
        let envelope = SaveEnvelope {
            version: SAVE_VERSION,
            timestamp: 9,
            slot: 1,
            data,
        };
        world
            .resource_mut::<SaveBackend>()
            .write(&slot_key(1), &serde_json::to_string(&envelope).unwrap())
            .unwrap();
        world.resource_mut::<Flags>().names.push("stale".into());

        let report = load_world(world, 1).unwrap();
        assert_eq!(report.defaulted, vec!["flags"]);
        assert_eq!(report.skipped, vec!["weather".to_string()]);
        assert_eq!(world.resource::<Counter>().value, 7);
        assert!(world.resource::<Flags>().names.is_empty());
    }

    #[test]
    fn test_corrupt_section_applies_nothing() {
        let mut app = test_app();
        let world = app.world_mut();
        let mut data = BTreeMap::new();
        data.insert("counter".to_string(), serde_json::json!({ "value": 3 }));
        data.insert("flags".to_string(), serde_json::json!({ "names": 12 }));
        let envelope = SaveEnvelope {
            version: SAVE_VERSION,
            timestamp: 0,
            slot: 0,
            data,
        };
        world
            .resource_mut::<SaveBackend>()
            .write(&slot_key(0), &serde_json::to_string(&envelope).unwrap())
            .unwrap();
        world.resource_mut::<Counter>().value = 99;

        let err = load_world(world, 0).unwrap_err();
        assert!(matches!(err, SaveError::Section { key: "flags", .. }));
        assert_eq!(world.resource::<Counter>().value, 99);
    }

    #[test]
    fn test_version_mismatch_is_rejected() {
        let mut app = test_app();
        let world = app.world_mut();
        let envelope = SaveEnvelope {
            version: SAVE_VERSION + 1,
            timestamp: 0,
            slot: 0,
            data: BTreeMap::new(),
        };
        world
            .resource_mut::<SaveBackend>()
            .write(&slot_key(0), &serde_json::to_string(&envelope).unwrap())
            .unwrap();
        let err = load_world(world, 0).unwrap_err();
        assert!(matches!(
            err,
            SaveError::VersionMismatch { found, expected } if found == SAVE_VERSION + 1 && expected == SAVE_VERSION
        ));
    }

    #[test]
    fn test_empty_and_invalid_slots() {
        let mut app = test_app();
        let world = app.world_mut();
        assert!(matches!(load_world(world, 2), Err(SaveError::NoSave(2))));
        assert!(matches!(
            save_world(world, 3),
            Err(SaveError::InvalidSlot { slot: 3, slots: 3 })
        ));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let mut app = test_app();
        let world = app.world_mut();
        world
            .resource_mut::<SaveBackend>()
            .write(&slot_key(0), "{ not json")
            .unwrap();
        assert!(matches!(load_world(world, 0), Err(SaveError::Json(_))));
    }

    #[test]
    fn test_reset_uses_config_fresh_state() {
        let mut app = test_app();
        let world = app.world_mut();
        world.resource_mut::<Counter>().value = 1;
        reset_world(world);
        assert_eq!(world.resource::<Counter>().value, GameConfig::default().starting_gold);
    }
}
