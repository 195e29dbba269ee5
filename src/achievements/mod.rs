//! Achievement system for Willowbrook.
//!
//! Every achievement is a threshold on one named progress counter. Counters
//! are bumped from gameplay events; an achievement unlocks once, the first
//! frame its counter reaches the threshold.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::farming::CropPlantedEvent;
use crate::world::WaypointDiscoveredEvent;
use crate::save::{AppSaveExt, Saveable};
use crate::shared::*;

// ═══════════════════════════════════════════════════════════════════════
// ACHIEVEMENT DEFINITIONS
// ═══════════════════════════════════════════════════════════════════════

pub mod counters {
    pub const CROPS_PLANTED: &str = "crops_planted";
    pub const CROPS_HARVESTED: &str = "crops_harvested";
    pub const FISH_CAUGHT: &str = "fish_caught";
    pub const MINERALS_MINED: &str = "minerals_mined";
    pub const ITEMS_CRAFTED: &str = "items_crafted";
    pub const GIFTS_GIVEN: &str = "gifts_given";
    pub const QUESTS_COMPLETED: &str = "quests_completed";
    pub const SPELLS_CAST: &str = "spells_cast";
    pub const GOLD_EARNED: &str = "gold_earned";
    pub const WAYPOINTS_DISCOVERED: &str = "waypoints_discovered";
}

/// Static description of a single achievement.
#[derive(Debug, PartialEq, Eq)]
pub struct AchievementDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub counter: &'static str,
    pub threshold: u64,
}

pub const ACHIEVEMENTS: &[AchievementDef] = &[
    AchievementDef {
        id: "green_acres",
        name: "Green Acres",
        description: "Plant 50 crops",
        counter: counters::CROPS_PLANTED,
        threshold: 50,
    },
    AchievementDef {
        id: "first_harvest",
        name: "First Harvest",
        description: "Harvest your first crop",
        counter: counters::CROPS_HARVESTED,
        threshold: 1,
    },
    AchievementDef {
        id: "green_thumb",
        name: "Green Thumb",
        description: "Harvest 100 crops",
        counter: counters::CROPS_HARVESTED,
        threshold: 100,
    },
    AchievementDef {
        id: "gone_fishin",
        name: "Gone Fishin'",
        description: "Catch your first fish",
        counter: counters::FISH_CAUGHT,
        threshold: 1,
    },
    AchievementDef {
        id: "angler",
        name: "Angler",
        description: "Catch 50 fish",
        counter: counters::FISH_CAUGHT,
        threshold: 50,
    },
    AchievementDef {
        id: "rock_breaker",
        name: "Rock Breaker",
        description: "Mine 100 minerals",
        counter: counters::MINERALS_MINED,
        threshold: 100,
    },
    AchievementDef {
        id: "artisan",
        name: "Artisan",
        description: "Craft 20 items",
        counter: counters::ITEMS_CRAFTED,
        threshold: 20,
    },
    AchievementDef {
        id: "generous",
        name: "Generous",
        description: "Give 50 gifts",
        counter: counters::GIFTS_GIVEN,
        threshold: 50,
    },
    AchievementDef {
        id: "helping_hand",
        name: "Helping Hand",
        description: "Complete 10 quests",
        counter: counters::QUESTS_COMPLETED,
        threshold: 10,
    },
    AchievementDef {
        id: "apprentice",
        name: "Apprentice",
        description: "Cast 25 spells",
        counter: counters::SPELLS_CAST,
        threshold: 25,
    },
    AchievementDef {
        id: "steady_income",
        name: "Steady Income",
        description: "Earn 10,000 gold total",
        counter: counters::GOLD_EARNED,
        threshold: 10_000,
    },
    AchievementDef {
        id: "wanderer",
        name: "Wanderer",
        description: "Discover 5 waypoints",
        counter: counters::WAYPOINTS_DISCOVERED,
        threshold: 5,
    },
];

pub fn achievement_def(id: &str) -> Option<&'static AchievementDef> {
    ACHIEVEMENTS.iter().find(|a| a.id == id)
}

// ═══════════════════════════════════════════════════════════════════════
// MANAGER
// ═══════════════════════════════════════════════════════════════════════

#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Achievements {
    pub unlocked: Vec<String>,
    pub counters: HashMap<String, u64>,
}

impl Achievements {
    pub fn progress(&self, counter: &str) -> u64 {
        self.counters.get(counter).copied().unwrap_or(0)
    }

    pub fn record(&mut self, counter: &str, amount: u64) {
        let entry = self.counters.entry(counter.to_string()).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked.iter().any(|u| u == id)
    }

    pub fn unlock(&mut self, id: &str) -> bool {
        if self.is_unlocked(id) || achievement_def(id).is_none() {
            return false;
        }
        self.unlocked.push(id.to_string());
        true
    }

    /// Achievements whose threshold is met but which are not unlocked yet.
    pub fn pending_unlocks(&self) -> Vec<&'static AchievementDef> {
        ACHIEVEMENTS
            .iter()
            .filter(|def| !self.is_unlocked(def.id) && self.progress(def.counter) >= def.threshold)
            .collect()
    }
}

impl Saveable for Achievements {
    const SAVE_KEY: &'static str = "achievements";
}

// ═══════════════════════════════════════════════════════════════════════
// PLUGIN & SYSTEMS
// ═══════════════════════════════════════════════════════════════════════

pub struct AchievementsPlugin;

impl Plugin for AchievementsPlugin {
    fn build(&self, app: &mut App) {
        app.register_saveable::<Achievements>()
            .add_event::<AchievementUnlockedEvent>()
            .add_systems(
                Update,
                (
                    track_achievement_progress,
                    check_achievements,
                    notify_achievement_unlocked,
                )
                    .chain()
                    .run_if(in_state(GameState::Playing)),
            );
    }
}

/// Listens to game events to increment the progress counters.
#[allow(clippy::too_many_arguments)]
pub fn track_achievement_progress(
    mut planted: EventReader<CropPlantedEvent>,
    mut harvested: EventReader<CropHarvestedEvent>,
    mut fish: EventReader<FishCaughtEvent>,
    mut minerals: EventReader<MineralMinedEvent>,
    mut crafted: EventReader<ItemCraftedEvent>,
    mut gifts: EventReader<GiftGivenEvent>,
    mut quests: EventReader<QuestCompletedEvent>,
    mut spells: EventReader<SpellCastEvent>,
    mut gold: EventReader<GoldChangeEvent>,
    mut waypoints: EventReader<WaypointDiscoveredEvent>,
    mut achievements: ResMut<Achievements>,
) {
    let planted_count = planted.read().count() as u64;
    let harvested_count: u64 = harvested.read().map(|e| e.quantity as u64).sum();
    let fish_count = fish.read().count() as u64;
    let mineral_count: u64 = minerals.read().map(|e| e.quantity as u64).sum();
    let crafted_count: u64 = crafted.read().map(|e| e.quantity as u64).sum();
    let gift_count = gifts.read().count() as u64;
    let quest_count = quests.read().count() as u64;
    let spell_count = spells.read().count() as u64;
    let gold_earned: u64 = gold
        .read()
        .filter(|e| e.amount > 0)
        .map(|e| e.amount as u64)
        .sum();
    let waypoint_count = waypoints.read().count() as u64;

    for (counter, amount) in [
        (counters::CROPS_PLANTED, planted_count),
        (counters::CROPS_HARVESTED, harvested_count),
        (counters::FISH_CAUGHT, fish_count),
        (counters::MINERALS_MINED, mineral_count),
        (counters::ITEMS_CRAFTED, crafted_count),
        (counters::GIFTS_GIVEN, gift_count),
        (counters::QUESTS_COMPLETED, quest_count),
        (counters::SPELLS_CAST, spell_count),
        (counters::GOLD_EARNED, gold_earned),
        (counters::WAYPOINTS_DISCOVERED, waypoint_count),
    ] {
        if amount > 0 {
            achievements.record(counter, amount);
        }
    }
}

pub fn check_achievements(
    mut achievements: ResMut<Achievements>,
    mut events: EventWriter<AchievementUnlockedEvent>,
) {
    let pending = achievements.pending_unlocks();
    for def in pending {
        if achievements.unlock(def.id) {
            info!("[Achievements] Unlocked: \"{}\": {}", def.name, def.description);
            events.send(AchievementUnlockedEvent {
                achievement_id: def.id.to_string(),
                name: def.name.to_string(),
            });
        }
    }
}

/// Displays a toast when an achievement is unlocked.
pub fn notify_achievement_unlocked(
    mut events: EventReader<AchievementUnlockedEvent>,
    mut toast_writer: EventWriter<ToastEvent>,
) {
    for event in events.read() {
        toast_writer.send(ToastEvent {
            message: format!("Achievement: {}!", event.name),
            duration_secs: 4.0,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_achievement_ids_are_unique() {
        let mut ids: Vec<&str> = ACHIEVEMENTS.iter().map(|a| a.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), ACHIEVEMENTS.len());
    }

    #[test]
    fn test_threshold_reached_is_pending_until_unlocked() {
        let mut ach = Achievements::default();
        assert!(ach.pending_unlocks().is_empty());

        ach.record(counters::FISH_CAUGHT, 1);
        let pending: Vec<&str> = ach.pending_unlocks().iter().map(|d| d.id).collect();
        assert_eq!(pending, vec!["gone_fishin"]);

        assert!(ach.unlock("gone_fishin"));
        assert!(!ach.unlock("gone_fishin"));
        assert!(ach.pending_unlocks().is_empty());
    }

    #[test]
    fn test_unknown_achievement_cannot_unlock() {
        let mut ach = Achievements::default();
        assert!(!ach.unlock("speedrunner"));
    }

    #[test]
    fn test_check_system_unlocks_once() {
        let mut app = App::new();
        app.add_event::<AchievementUnlockedEvent>()
            .init_resource::<Achievements>()
            .add_systems(Update, check_achievements);

        app.world_mut()
            .resource_mut::<Achievements>()
            .record(counters::CROPS_HARVESTED, 150);
        app.update();
        app.update();

        let sent: Vec<AchievementUnlockedEvent> = app
            .world_mut()
            .resource_mut::<Events<AchievementUnlockedEvent>>()
            .drain()
            .collect();
        assert_eq!(sent.len(), 2);
        assert!(app.world().resource::<Achievements>().is_unlocked("green_thumb"));
    }
}
