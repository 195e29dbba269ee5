//! Fishing: hit the zone enough times before the fish gets away.

use bevy::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{ActiveMinigame, Minigame, MinigameEndedEvent, ReelEvent, StartFishingEvent, TimingBar};
use crate::inventory::Inventory;
use crate::shared::*;

// ─── Tuning constants ─────────────────────────────────────────────────────────

const MISSES_ALLOWED: u32 = 3;
const MIN_BAR_SPEED: f32 = 0.6;
const MAX_BAR_SPEED: f32 = 2.0;
const EASY_ZONE_WIDTH: f32 = 0.30;
const HARD_ZONE_WIDTH: f32 = 0.12;

// ─── Definitions ─────────────────────────────────────────────────────────────

/// The fish id doubles as the item id granted on a catch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FishDef {
    pub id: ItemId,
    /// 0.0 (trivial) to 1.0 (legendary).
    pub difficulty: f32,
    pub seasons: Vec<Season>,
}

#[derive(Resource, Debug, Clone, Default)]
pub struct FishRegistry {
    pub fish: HashMap<ItemId, FishDef>,
}

/// Picks a random fish that bites in `season`.
pub fn select_fish<'a, R: Rng + ?Sized>(
    registry: &'a FishRegistry,
    season: Season,
    rng: &mut R,
) -> Option<&'a FishDef> {
    let mut eligible: Vec<&FishDef> = registry
        .fish
        .values()
        .filter(|f| f.seasons.contains(&season))
        .collect();
    // HashMap order is random; sort so a seeded rng picks reproducibly.
    eligible.sort_by(|a, b| a.id.cmp(&b.id));
    eligible.choose(rng).copied()
}

// ─── Session ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FishingOutcome {
    Continue,
    Caught,
    Escaped,
}

#[derive(Debug, Clone)]
pub struct FishingSession {
    pub fish_id: ItemId,
    pub bar: TimingBar,
    pub hits: u32,
    pub hits_needed: u32,
    pub misses_left: u32,
}

impl FishingSession {
    pub fn new<R: Rng + ?Sized>(def: &FishDef, rng: &mut R) -> Self {
        let difficulty = def.difficulty.clamp(0.0, 1.0);
        let speed = MIN_BAR_SPEED + difficulty * (MAX_BAR_SPEED - MIN_BAR_SPEED);
        let width = EASY_ZONE_WIDTH - difficulty * (EASY_ZONE_WIDTH - HARD_ZONE_WIDTH);
        let zone_start = rng.gen_range(0.0..=(1.0 - width));
        Self {
            fish_id: def.id.clone(),
            bar: TimingBar::new(speed, zone_start, width),
            hits: 0,
            hits_needed: 3 + (difficulty * 3.0).round() as u32,
            misses_left: MISSES_ALLOWED,
        }
    }

    pub fn press(&mut self) -> FishingOutcome {
        if self.bar.in_zone() {
            self.hits += 1;
            if self.hits >= self.hits_needed {
                return FishingOutcome::Caught;
            }
        } else {
            self.misses_left = self.misses_left.saturating_sub(1);
            if self.misses_left == 0 {
                return FishingOutcome::Escaped;
            }
        }
        FishingOutcome::Continue
    }
}

// ─── Systems ─────────────────────────────────────────────────────────────────

pub fn handle_start_fishing(
    mut events: EventReader<StartFishingEvent>,
    registry: Res<FishRegistry>,
    calendar: Res<Calendar>,
    mut active: ResMut<ActiveMinigame>,
    mut toasts: EventWriter<ToastEvent>,
) {
    for _ in events.read() {
        if active.is_running() {
            continue;
        }
        let mut rng = rand::thread_rng();
        let Some(def) = select_fish(&registry, calendar.season, &mut rng) else {
            toasts.send(ToastEvent::new("Nothing is biting this season."));
            continue;
        };
        info!("[Fishing] Hooked '{}' (difficulty {:.2})", def.id, def.difficulty);
        active.0 = Some(Minigame::Fishing(FishingSession::new(def, &mut rng)));
    }
}

#[allow(clippy::too_many_arguments)]
pub fn handle_reel(
    mut events: EventReader<ReelEvent>,
    item_registry: Res<ItemRegistry>,
    inventory: Res<Inventory>,
    mut active: ResMut<ActiveMinigame>,
    mut caught_writer: EventWriter<FishCaughtEvent>,
    mut grant_writer: EventWriter<GrantItemEvent>,
    mut ended_writer: EventWriter<MinigameEndedEvent>,
    mut toasts: EventWriter<ToastEvent>,
) {
    for _ in events.read() {
        let Some(Minigame::Fishing(session)) = active.0.as_mut() else {
            continue;
        };
        match session.press() {
            FishingOutcome::Continue => {}
            FishingOutcome::Caught => {
                let fish_id = session.fish_id.clone();
                active.0 = None;
                // A catch only counts if the fish can actually be kept.
                let has_room = item_registry
                    .get(&fish_id)
                    .is_some_and(|def| inventory.room_for(def) >= 1);
                if !has_room {
                    let name = item_registry
                        .get(&fish_id)
                        .map(|d| d.name.as_str())
                        .unwrap_or(fish_id.as_str());
                    info!("[Fishing] Caught '{}' but the inventory is full", fish_id);
                    toasts.send(ToastEvent::new(format!(
                        "Inventory full! The {} slipped back into the water.",
                        name
                    )));
                    ended_writer.send(MinigameEndedEvent { success: false });
                    continue;
                }
                info!("[Fishing] Caught '{}'", fish_id);
                caught_writer.send(FishCaughtEvent {
                    fish_id: fish_id.clone(),
                });
                grant_writer.send(GrantItemEvent {
                    item_id: fish_id,
                    quantity: 1,
                    source: "fishing".into(),
                });
                ended_writer.send(MinigameEndedEvent { success: true });
            }
            FishingOutcome::Escaped => {
                active.0 = None;
                toasts.send(ToastEvent::new("The fish got away..."));
                ended_writer.send(MinigameEndedEvent { success: false });
            }
        }
    }
}
