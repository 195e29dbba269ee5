//! Save domain — slot management, save/load requests, new game, autosave.
//!
//! The coordinator itself (envelope, section registry, `Saveable`) lives in
//! `coordinator`; storage backends live in `storage`. This module wires them
//! into the app as request events and systems.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::GameConfig;
use crate::dialogue::DialogueState;
use crate::minigames::ActiveMinigame;
use crate::shared::*;
use crate::timers::{TimerFinishedEvent, TimerHandle, TimerQueue};

pub mod coordinator;
pub mod storage;

pub use coordinator::{
    build_envelope, check_slot, load_world, read_envelope, reset_world, save_world, slot_key,
    AppSaveExt,
    LoadReport, SaveEnvelope, SaveError, SaveRegistry, Saveable, SAVE_VERSION,
};
pub use storage::{MemoryStorage, SaveBackend, SaveStorage};
#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStorage;

pub const AUTOSAVE_TIMER_TAG: &str = "autosave";

// ═══════════════════════════════════════════════════════════════════════
// PUBLIC TYPES
// ═══════════════════════════════════════════════════════════════════════

/// Info about a save slot shown on the load/save screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveSlotInfo {
    pub slot: u8,
    pub exists: bool,
    /// False when the slot holds a save from another format version.
    pub compatible: bool,
    pub day: u8,
    pub season: Season,
    pub year: u32,
    pub gold: u32,
    pub farm_name: String,
    pub play_time_seconds: u64,
    pub save_timestamp: u64,
}

impl SaveSlotInfo {
    pub fn empty(slot: u8) -> Self {
        Self {
            slot,
            exists: false,
            compatible: true,
            day: 1,
            season: Season::Spring,
            year: 1,
            gold: 0,
            farm_name: String::new(),
            play_time_seconds: 0,
            save_timestamp: 0,
        }
    }

    fn from_envelope(slot: u8, envelope: &SaveEnvelope) -> Self {
        let calendar: Calendar = envelope.section("calendar").unwrap_or_default();
        let player: PlayerState = envelope.section("player").unwrap_or_default();
        let stats: GameStatistics = envelope.section(GameStatistics::SAVE_KEY).unwrap_or_default();
        Self {
            slot,
            exists: true,
            compatible: envelope.version == SAVE_VERSION,
            day: calendar.day,
            season: calendar.season,
            year: calendar.year,
            gold: player.gold,
            farm_name: stats.farm_name,
            play_time_seconds: stats.play_time_seconds,
            save_timestamp: envelope.timestamp,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// EVENTS
// ═══════════════════════════════════════════════════════════════════════

/// Sent by UI (pause menu) to trigger a manual save.
#[derive(Event, Debug, Clone)]
pub struct SaveRequestEvent {
    pub slot: u8,
}

/// Sent by UI to trigger loading a specific slot.
#[derive(Event, Debug, Clone)]
pub struct LoadRequestEvent {
    pub slot: u8,
}

#[derive(Event, Debug, Clone)]
pub struct DeleteSaveEvent {
    pub slot: u8,
}

/// Sent by SavePlugin after a save completes (success or failure).
#[derive(Event, Debug, Clone)]
pub struct SaveCompleteEvent {
    pub slot: u8,
    pub success: bool,
    pub error_message: Option<String>,
}

/// Sent by SavePlugin after a load completes. On failure the game has been
/// reset to a fresh state.
#[derive(Event, Debug, Clone)]
pub struct LoadCompleteEvent {
    pub slot: u8,
    pub success: bool,
    pub error_message: Option<String>,
}

/// Sent to initialize a new game (clears all state to defaults).
#[derive(Event, Debug, Clone)]
pub struct NewGameEvent {
    pub farm_name: String,
    pub active_slot: u8,
}

/// A play session began, either from a save or from scratch.
#[derive(Event, Debug, Clone)]
pub struct SessionStartedEvent {
    pub slot: u8,
    pub restored: bool,
}

// ═══════════════════════════════════════════════════════════════════════
// RESOURCES
// ═══════════════════════════════════════════════════════════════════════

/// Tracks which save slot is currently active.
#[derive(Resource, Debug, Clone, Default)]
pub struct ActiveSaveSlot {
    pub slot: u8,
}

/// Cached metadata for every save slot, refreshed on the main menu.
#[derive(Resource, Debug, Clone, Default)]
pub struct SaveSlotInfoCache {
    pub slots: Vec<SaveSlotInfo>,
}

/// Statistics accumulated during gameplay. Persisted with the save.
#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameStatistics {
    pub total_gold_earned: u64,
    pub play_time_seconds: u64,
    pub farm_name: String,
}

impl GameStatistics {
    pub fn new(farm_name: impl Into<String>) -> Self {
        Self {
            total_gold_earned: 0,
            play_time_seconds: 0,
            farm_name: farm_name.into(),
        }
    }
}

impl Saveable for GameStatistics {
    const SAVE_KEY: &'static str = "statistics";
}

/// Accumulated play time from the current session start.
#[derive(Resource, Debug, Clone, Default)]
pub struct SessionTimer {
    pub elapsed: Duration,
}

#[derive(Resource, Debug, Clone, Default)]
pub struct AutosaveTimer(pub Option<TimerHandle>);

// ═══════════════════════════════════════════════════════════════════════
// PLUGIN
// ═══════════════════════════════════════════════════════════════════════

pub struct SavePlugin;

impl Plugin for SavePlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<SaveBackend>() {
            let config = app
                .world()
                .get_resource::<GameConfig>()
                .cloned()
                .unwrap_or_default();
            app.insert_resource(SaveBackend::from_config(&config));
        }

        app.init_resource::<SaveRegistry>()
            .init_resource::<ActiveSaveSlot>()
            .init_resource::<SaveSlotInfoCache>()
            .init_resource::<SessionTimer>()
            .init_resource::<AutosaveTimer>()
            .register_saveable::<GameStatistics>()
            .add_event::<SaveRequestEvent>()
            .add_event::<LoadRequestEvent>()
            .add_event::<DeleteSaveEvent>()
            .add_event::<SaveCompleteEvent>()
            .add_event::<LoadCompleteEvent>()
            .add_event::<NewGameEvent>()
            .add_event::<SessionStartedEvent>()
            // Refresh slot metadata whenever the menu is entered.
            .add_systems(OnEnter(GameState::MainMenu), scan_save_slots)
            .add_systems(OnEnter(GameState::Playing), arm_autosave_timer)
            .add_systems(
                Update,
                (
                    tick_session_timer,
                    track_gold_earned,
                    autosave_on_day_end,
                    autosave_on_timer,
                )
                    .run_if(in_state(GameState::Playing)),
            )
            // Saving is allowed from Playing and from the pause menu.
            .add_systems(
                Update,
                handle_save_requests
                    .run_if(in_state(GameState::Playing).or(in_state(GameState::Paused))),
            )
            .add_systems(
                Update,
                (handle_new_game, handle_load_requests, handle_delete_requests)
                    .chain()
                    .run_if(past_loading),
            );
    }
}

fn past_loading(state: Res<State<GameState>>) -> bool {
    *state.get() != GameState::Loading
}

// ═══════════════════════════════════════════════════════════════════════
// SLOT METADATA
// ═══════════════════════════════════════════════════════════════════════

/// Reads a slot's metadata without applying anything.
pub fn peek_slot(backend: &SaveBackend, slot: u8) -> SaveSlotInfo {
    match backend.read(&slot_key(slot)) {
        Ok(Some(json)) => match SaveEnvelope::parse(&json) {
            Ok(envelope) => SaveSlotInfo::from_envelope(slot, &envelope),
            Err(e) => {
                warn!("[Save] Slot {} is unreadable: {}", slot, e);
                SaveSlotInfo::empty(slot)
            }
        },
        Ok(None) => SaveSlotInfo::empty(slot),
        Err(e) => {
            warn!("[Save] Could not read slot {}: {}", slot, e);
            SaveSlotInfo::empty(slot)
        }
    }
}

pub fn scan_save_slots(
    backend: Res<SaveBackend>,
    config: Res<GameConfig>,
    mut cache: ResMut<SaveSlotInfoCache>,
) {
    cache.slots = (0..config.save_slots)
        .map(|slot| peek_slot(&backend, slot))
        .collect();
    let used = cache.slots.iter().filter(|s| s.exists).count();
    info!(
        "[Save] Slot scan complete: {} of {} slots in use",
        used, config.save_slots
    );
}

fn refresh_slot_info(world: &mut World, slot: u8) {
    let info = peek_slot(world.resource::<SaveBackend>(), slot);
    let mut cache = world.resource_mut::<SaveSlotInfoCache>();
    match cache.slots.get_mut(slot as usize) {
        Some(cached) => *cached = info,
        None => {
            if cache.slots.len() == slot as usize {
                cache.slots.push(info);
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// REQUEST HANDLERS (exclusive: they touch every manager)
// ═══════════════════════════════════════════════════════════════════════

pub fn handle_save_requests(world: &mut World) {
    let requests: Vec<SaveRequestEvent> = world
        .resource_mut::<Events<SaveRequestEvent>>()
        .drain()
        .collect();

    for ev in requests {
        let slot = ev.slot;
        info!("[Save] Saving to slot {}...", slot);

        match save_world(world, slot) {
            Ok(()) => {
                world.resource_mut::<ActiveSaveSlot>().slot = slot;
                refresh_slot_info(world, slot);
                world.send_event(SaveCompleteEvent {
                    slot,
                    success: true,
                    error_message: None,
                });
            }
            Err(e) => {
                warn!("[Save] Save to slot {} FAILED: {}", slot, e);
                world.send_event(ToastEvent::new("Could not save the game."));
                world.send_event(SaveCompleteEvent {
                    slot,
                    success: false,
                    error_message: Some(e.to_string()),
                });
            }
        }
    }
}

pub fn handle_load_requests(world: &mut World) {
    let requests: Vec<LoadRequestEvent> = world
        .resource_mut::<Events<LoadRequestEvent>>()
        .drain()
        .collect();

    for ev in requests {
        let slot = ev.slot;
        info!("[Save] Loading from slot {}...", slot);
        clear_session_state(world);
        // An out-of-range slot must not become the autosave target.
        if check_slot(world, slot).is_ok() {
            world.resource_mut::<ActiveSaveSlot>().slot = slot;
        }

        let (success, error_message) = match load_world(world, slot) {
            Ok(_) => (true, None),
            Err(e) => {
                // No usable save: the session starts from a fresh state.
                warn!("[Save] Load from slot {} FAILED: {}. Starting fresh.", slot, e);
                reset_world(world);
                world.send_event(ToastEvent::new("No usable save found. Starting a new game."));
                (false, Some(e.to_string()))
            }
        };

        world.insert_resource(SessionTimer::default());
        world
            .resource_mut::<NextState<GameState>>()
            .set(GameState::Playing);
        world.send_event(LoadCompleteEvent {
            slot,
            success,
            error_message,
        });
        world.send_event(SessionStartedEvent {
            slot,
            restored: success,
        });
    }
}

pub fn handle_new_game(world: &mut World) {
    let requests: Vec<NewGameEvent> = world
        .resource_mut::<Events<NewGameEvent>>()
        .drain()
        .collect();

    for ev in requests {
        info!(
            "[Save] Starting new game in slot {} with farm name '{}'",
            ev.active_slot, ev.farm_name
        );
        clear_session_state(world);
        reset_world(world);
        world.insert_resource(GameStatistics::new(ev.farm_name.clone()));
        world.insert_resource(SessionTimer::default());
        let slot = match check_slot(world, ev.active_slot) {
            Ok(()) => ev.active_slot,
            Err(e) => {
                let kept = world.resource::<ActiveSaveSlot>().slot;
                warn!("[Save] {}. Keeping slot {}", e, kept);
                kept
            }
        };
        world.resource_mut::<ActiveSaveSlot>().slot = slot;
        world
            .resource_mut::<NextState<GameState>>()
            .set(GameState::Playing);
        world.send_event(SessionStartedEvent {
            slot,
            restored: false,
        });
    }
}

/// Drops in-flight sessions that are not saved. Loading while `Playing`
/// re-enters the same state, so no `OnExit` cleanup would run.
fn clear_session_state(world: &mut World) {
    if let Some(mut dialogue) = world.get_resource_mut::<DialogueState>() {
        if let Some(npc) = dialogue.end() {
            debug!("[Save] Dropped conversation with {}", npc);
        }
    }
    if let Some(mut minigame) = world.get_resource_mut::<ActiveMinigame>() {
        if minigame.0.take().is_some() {
            debug!("[Save] Dropped running minigame");
        }
    }
}

pub fn handle_delete_requests(world: &mut World) {
    let requests: Vec<DeleteSaveEvent> = world
        .resource_mut::<Events<DeleteSaveEvent>>()
        .drain()
        .collect();

    for ev in requests {
        match world
            .resource_mut::<SaveBackend>()
            .remove(&slot_key(ev.slot))
        {
            Ok(()) => info!("[Save] Deleted slot {}", ev.slot),
            Err(e) => warn!("[Save] Could not delete slot {}: {}", ev.slot, e),
        }
        refresh_slot_info(world, ev.slot);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// PLAYING-STATE SYSTEMS
// ═══════════════════════════════════════════════════════════════════════

pub fn tick_session_timer(
    time: Res<Time>,
    mut session: ResMut<SessionTimer>,
    mut stats: ResMut<GameStatistics>,
) {
    session.elapsed += time.delta();
    // Fold whole seconds into the persisted statistics.
    let elapsed_secs = session.elapsed.as_secs();
    if elapsed_secs > 0 {
        stats.play_time_seconds = stats.play_time_seconds.saturating_add(elapsed_secs);
        session.elapsed -= Duration::from_secs(elapsed_secs);
    }
}

pub fn track_gold_earned(
    mut gold_events: EventReader<GoldChangeEvent>,
    mut stats: ResMut<GameStatistics>,
) {
    for ev in gold_events.read() {
        if ev.amount > 0 {
            stats.total_gold_earned = stats.total_gold_earned.saturating_add(ev.amount as u64);
        }
    }
}

/// Listen for DayEndEvent and autosave to the active slot.
pub fn autosave_on_day_end(
    mut day_end_events: EventReader<DayEndEvent>,
    mut save_writer: EventWriter<SaveRequestEvent>,
    active_slot: Res<ActiveSaveSlot>,
    config: Res<GameConfig>,
) {
    for ev in day_end_events.read() {
        if !config.autosave_on_day_end {
            continue;
        }
        info!(
            "[Save] Autosaving at end of day {} {:?} year {}",
            ev.day, ev.season, ev.year
        );
        save_writer.send(SaveRequestEvent {
            slot: active_slot.slot,
        });
    }
}

pub fn arm_autosave_timer(
    config: Res<GameConfig>,
    mut queue: ResMut<TimerQueue>,
    mut autosave: ResMut<AutosaveTimer>,
) {
    let Some(interval) = config.autosave_interval_secs else {
        return;
    };
    if autosave.0.is_some_and(|h| queue.is_scheduled(h)) {
        return;
    }
    autosave.0 = Some(queue.repeating(AUTOSAVE_TIMER_TAG, interval));
    info!("[Save] Periodic autosave every {}s", interval);
}

pub fn autosave_on_timer(
    mut timer_events: EventReader<TimerFinishedEvent>,
    mut save_writer: EventWriter<SaveRequestEvent>,
    active_slot: Res<ActiveSaveSlot>,
) {
    for ev in timer_events.read() {
        if ev.tag == AUTOSAVE_TIMER_TAG {
            save_writer.send(SaveRequestEvent {
                slot: active_slot.slot,
            });
        }
    }
}
