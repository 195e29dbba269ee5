//! Shared resources, events, states and definition records for Willowbrook.
//!
//! This is the type contract. Every domain plugin imports from here.
//! No domain reaches into another domain's manager directly; cross-domain
//! effects travel as events declared in this module.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ═══════════════════════════════════════════════════════════════════════
// GAME STATE — top-level state machine
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, States, Default)]
pub enum GameState {
    #[default]
    Loading,
    MainMenu,
    Playing,
    Paused,
}

// ═══════════════════════════════════════════════════════════════════════
// IDENTIFIERS
// ═══════════════════════════════════════════════════════════════════════

/// String ids keep every definition data-driven.
pub type ItemId = String;
pub type NpcId = String;
pub type QuestId = String;
pub type SpellId = String;
pub type RecipeId = String;
pub type WaypointId = String;

// ═══════════════════════════════════════════════════════════════════════
// CALENDAR
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    pub fn next(self) -> Self {
        match self {
            Season::Spring => Season::Summer,
            Season::Summer => Season::Fall,
            Season::Fall => Season::Winter,
            Season::Winter => Season::Spring,
        }
    }
}

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    pub year: u32,
    pub season: Season,
    pub day: u8, // 1-28
}

impl Default for Calendar {
    fn default() -> Self {
        Self {
            year: 1,
            season: Season::Spring,
            day: 1,
        }
    }
}

impl Calendar {
    /// Moves to the next day. Returns `true` when the season rolled over.
    pub fn advance_day(&mut self) -> bool {
        if self.day >= DAYS_PER_SEASON {
            self.day = 1;
            if self.season == Season::Winter {
                self.year += 1;
            }
            self.season = self.season.next();
            true
        } else {
            self.day += 1;
            false
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// PLAYER
// ═══════════════════════════════════════════════════════════════════════

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub gold: u32,
    pub stamina: f32,
    pub max_stamina: f32,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            gold: STARTING_GOLD,
            stamina: MAX_STAMINA,
            max_stamina: MAX_STAMINA,
        }
    }
}

impl PlayerState {
    pub fn earn(&mut self, amount: u32) {
        self.gold = self.gold.saturating_add(amount);
    }

    /// Deducts `amount` if affordable. Leaves gold untouched otherwise.
    pub fn spend(&mut self, amount: u32) -> bool {
        if self.gold < amount {
            return false;
        }
        self.gold -= amount;
        true
    }

    pub fn restore_stamina(&mut self, amount: f32) {
        self.stamina = (self.stamina + amount).clamp(0.0, self.max_stamina);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// ITEMS
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemCategory {
    Seed,
    Crop,
    Fish,
    Mineral,
    Material,
    Food,
    Tool,
    Gift,
    Special,
}

fn default_max_stack() -> u32 {
    DEFAULT_MAX_STACK
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDef {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: ItemCategory,
    #[serde(default)]
    pub sell_price: u32,
    #[serde(default)]
    pub buy_price: Option<u32>, // None = not buyable
    #[serde(default = "default_true")]
    pub stackable: bool,
    #[serde(default = "default_max_stack")]
    pub max_stack: u32,
    /// Sprite/icon reference; resolved by the host renderer.
    #[serde(default)]
    pub icon: String,
}

impl ItemDef {
    /// Units a single slot can hold.
    pub fn slot_capacity(&self) -> u32 {
        if self.stackable {
            self.max_stack.max(1)
        } else {
            1
        }
    }
}

#[derive(Resource, Debug, Clone, Default)]
pub struct ItemRegistry {
    pub items: HashMap<ItemId, ItemDef>,
}

impl ItemRegistry {
    pub fn get(&self, id: &str) -> Option<&ItemDef> {
        self.items.get(id)
    }

    pub fn insert(&mut self, def: ItemDef) {
        self.items.insert(def.id.clone(), def);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// RELATIONSHIPS
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GiftPreference {
    Loved,    // +80 points
    Liked,    // +45 points
    Neutral,  // +20 points
    Disliked, // -20 points
    Hated,    // -40 points
}

// ═══════════════════════════════════════════════════════════════════════
// EVENTS — cross-domain communication
// ═══════════════════════════════════════════════════════════════════════

#[derive(Event, Debug, Clone)]
pub struct DayEndEvent {
    pub day: u8,
    pub season: Season,
    pub year: u32,
}

#[derive(Event, Debug, Clone)]
pub struct SeasonChangeEvent {
    pub new_season: Season,
    pub year: u32,
}

/// Any domain asking for items to be put into the player's inventory.
#[derive(Event, Debug, Clone)]
pub struct GrantItemEvent {
    pub item_id: ItemId,
    pub quantity: u32,
    pub source: String,
}

/// Notification: items entered the inventory.
#[derive(Event, Debug, Clone)]
pub struct ItemAddedEvent {
    pub item_id: ItemId,
    pub quantity: u32,
}

/// Notification: items left the inventory.
#[derive(Event, Debug, Clone)]
pub struct ItemRemovedEvent {
    pub item_id: ItemId,
    pub quantity: u32,
}

#[derive(Event, Debug, Clone)]
pub struct GoldChangeEvent {
    pub amount: i32, // positive = gain, negative = spend
    pub reason: String,
}

/// Floating message for player feedback.
#[derive(Event, Debug, Clone)]
pub struct ToastEvent {
    pub message: String,
    pub duration_secs: f32,
}

impl ToastEvent {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            duration_secs: DEFAULT_TOAST_SECS,
        }
    }
}

#[derive(Event, Debug, Clone)]
pub struct CropHarvestedEvent {
    pub crop_id: ItemId,
    pub harvest_id: ItemId,
    pub quantity: u32,
    pub x: i32,
    pub y: i32,
}

#[derive(Event, Debug, Clone)]
pub struct GiftGivenEvent {
    pub npc_id: NpcId,
    pub item_id: ItemId,
    pub preference: GiftPreference,
}

/// Sent when a conversation with an NPC finishes.
#[derive(Event, Debug, Clone)]
pub struct NpcTalkedEvent {
    pub npc_id: NpcId,
}

#[derive(Event, Debug, Clone)]
pub struct FriendshipChangeEvent {
    pub npc_id: NpcId,
    pub amount: i32,
}

#[derive(Event, Debug, Clone)]
pub struct FishCaughtEvent {
    pub fish_id: ItemId,
}

#[derive(Event, Debug, Clone)]
pub struct MineralMinedEvent {
    pub item_id: ItemId,
    pub quantity: u32,
}

#[derive(Event, Debug, Clone)]
pub struct ItemCraftedEvent {
    pub recipe_id: RecipeId,
    pub result: ItemId,
    pub quantity: u32,
}

/// Ask the crafting domain to unlock a recipe.
#[derive(Event, Debug, Clone)]
pub struct UnlockRecipeEvent {
    pub recipe_id: RecipeId,
}

/// Ask the quest domain to start a quest.
#[derive(Event, Debug, Clone)]
pub struct StartQuestEvent {
    pub quest_id: QuestId,
}

#[derive(Event, Debug, Clone)]
pub struct QuestStartedEvent {
    pub quest_id: QuestId,
}

#[derive(Event, Debug, Clone)]
pub struct QuestCompletedEvent {
    pub quest_id: QuestId,
}

/// Ask the magic domain to teach the player a spell.
#[derive(Event, Debug, Clone)]
pub struct LearnSpellEvent {
    pub spell_id: SpellId,
}

#[derive(Event, Debug, Clone)]
pub struct SpellCastEvent {
    pub spell_id: SpellId,
}

/// Ask the farming domain to water every planted plot.
#[derive(Event, Debug, Clone)]
pub struct WaterAllCropsEvent;

/// Ask the world domain to mark a waypoint as discovered.
#[derive(Event, Debug, Clone)]
pub struct DiscoverWaypointEvent {
    pub waypoint_id: WaypointId,
}

#[derive(Event, Debug, Clone)]
pub struct AchievementUnlockedEvent {
    pub achievement_id: String,
    pub name: String,
}

// ═══════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════

pub const DAYS_PER_SEASON: u8 = 28;

pub const STARTING_GOLD: u32 = 500;
pub const MAX_STAMINA: f32 = 100.0;

pub const HOTBAR_SLOTS: usize = 12;
pub const BACKPACK_SLOTS: usize = 24;
pub const TOTAL_INVENTORY_SLOTS: usize = HOTBAR_SLOTS + BACKPACK_SLOTS;
pub const DEFAULT_MAX_STACK: u32 = 99;

pub const FRIENDSHIP_PER_HEART: u32 = 100;
pub const MAX_HEARTS: u32 = 10;
pub const MAX_FRIENDSHIP: u32 = MAX_HEARTS * FRIENDSHIP_PER_HEART;

pub const DEFAULT_TOAST_SECS: f32 = 3.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_next() {
        assert_eq!(Season::Spring.next(), Season::Summer);
        assert_eq!(Season::Summer.next(), Season::Fall);
        assert_eq!(Season::Fall.next(), Season::Winter);
        assert_eq!(Season::Winter.next(), Season::Spring);
    }

    #[test]
    fn test_advance_day_rolls_season_and_year() {
        let mut cal = Calendar {
            year: 1,
            season: Season::Winter,
            day: 28,
        };
        assert!(cal.advance_day());
        assert_eq!(cal.day, 1);
        assert_eq!(cal.season, Season::Spring);
        assert_eq!(cal.year, 2);

        assert!(!cal.advance_day());
        assert_eq!(cal.day, 2);
    }

    #[test]
    fn test_spend_refuses_overdraft() {
        let mut player = PlayerState::default();
        assert!(!player.spend(player.gold + 1));
        assert_eq!(player.gold, STARTING_GOLD);
        assert!(player.spend(200));
        assert_eq!(player.gold, STARTING_GOLD - 200);
    }

    #[test]
    fn test_non_stackable_slot_capacity_is_one() {
        let def = ItemDef {
            id: "watering_can".into(),
            name: "Watering Can".into(),
            description: String::new(),
            category: ItemCategory::Tool,
            sell_price: 0,
            buy_price: None,
            stackable: false,
            max_stack: 99,
            icon: String::new(),
        };
        assert_eq!(def.slot_capacity(), 1);
    }
}
