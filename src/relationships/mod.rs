//! Relationships domain — friendship points, gifts and daily chats.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::inventory::Inventory;
use crate::save::{AppSaveExt, Saveable};
use crate::shared::*;

/// Friendship for the first conversation of the day.
pub const DAILY_TALK_POINTS: i32 = 20;
pub const BIRTHDAY_GIFT_MULTIPLIER: i32 = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpcDef {
    pub id: NpcId,
    pub name: String,
    pub birthday_season: Season,
    pub birthday_day: u8,
    #[serde(default)]
    pub gift_preferences: HashMap<ItemId, GiftPreference>,
    #[serde(default)]
    pub dialogue_tree: Option<String>,
}

impl NpcDef {
    pub fn preference_for(&self, item_id: &str) -> GiftPreference {
        self.gift_preferences
            .get(item_id)
            .copied()
            .unwrap_or(GiftPreference::Neutral)
    }

    pub fn is_birthday(&self, calendar: &Calendar) -> bool {
        calendar.season == self.birthday_season && calendar.day == self.birthday_day
    }
}

#[derive(Resource, Debug, Clone, Default)]
pub struct NpcRegistry {
    pub npcs: HashMap<NpcId, NpcDef>,
}

/// Convert a GiftPreference to friendship point delta (positive or negative).
pub fn preference_to_points(preference: GiftPreference) -> i32 {
    match preference {
        GiftPreference::Loved => 80,
        GiftPreference::Liked => 45,
        GiftPreference::Neutral => 20,
        GiftPreference::Disliked => -20,
        GiftPreference::Hated => -40,
    }
}

// ═══════════════════════════════════════════════════════════════════════
// MANAGER
// ═══════════════════════════════════════════════════════════════════════

#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationships {
    /// NPC id → friendship points (0-1000, 100 per heart)
    pub friendship: HashMap<NpcId, u32>,
    pub gifted_today: HashSet<NpcId>,
    pub talked_today: HashSet<NpcId>,
}

impl Relationships {
    pub fn points(&self, npc_id: &str) -> u32 {
        self.friendship.get(npc_id).copied().unwrap_or(0)
    }

    pub fn hearts(&self, npc_id: &str) -> u32 {
        (self.points(npc_id) / FRIENDSHIP_PER_HEART).min(MAX_HEARTS)
    }

    /// Applies `delta`, clamped to `0..=MAX_FRIENDSHIP`. Returns the new total.
    pub fn add_friendship(&mut self, npc_id: &str, delta: i32) -> u32 {
        let entry = self.friendship.entry(npc_id.to_string()).or_insert(0);
        *entry = (*entry as i64 + delta as i64).clamp(0, MAX_FRIENDSHIP as i64) as u32;
        *entry
    }

    /// Counts a gift worth `points`. Only the first gift each day counts.
    pub fn record_gift(&mut self, npc_id: &str, points: i32) -> bool {
        if self.gifted_today.contains(npc_id) {
            warn!("[Relationships] {} already got a gift today", npc_id);
            return false;
        }
        self.gifted_today.insert(npc_id.to_string());
        self.add_friendship(npc_id, points);
        true
    }

    /// First chat of the day is worth a little friendship.
    pub fn record_talk(&mut self, npc_id: &str) -> bool {
        if !self.talked_today.insert(npc_id.to_string()) {
            return false;
        }
        self.add_friendship(npc_id, DAILY_TALK_POINTS);
        true
    }

    pub fn reset_daily(&mut self) {
        self.gifted_today.clear();
        self.talked_today.clear();
    }
}

impl Saveable for Relationships {
    const SAVE_KEY: &'static str = "relationships";
}

// ═══════════════════════════════════════════════════════════════════════
// EVENTS & PLUGIN
// ═══════════════════════════════════════════════════════════════════════

/// The player offers one of `item_id` to an NPC.
#[derive(Event, Debug, Clone)]
pub struct GiveGiftRequestEvent {
    pub npc_id: NpcId,
    pub item_id: ItemId,
}

pub struct RelationshipsPlugin;

impl Plugin for RelationshipsPlugin {
    fn build(&self, app: &mut App) {
        app.register_saveable::<Relationships>()
            .init_resource::<NpcRegistry>()
            .add_event::<GiveGiftRequestEvent>()
            .add_event::<GiftGivenEvent>()
            .add_event::<NpcTalkedEvent>()
            .add_event::<FriendshipChangeEvent>()
            .add_systems(
                Update,
                (
                    handle_gifts,
                    apply_friendship_changes,
                    handle_npc_talked,
                    reset_daily_flags,
                )
                    .run_if(in_state(GameState::Playing)),
            );
    }
}

#[allow(clippy::too_many_arguments)]
pub fn handle_gifts(
    mut requests: EventReader<GiveGiftRequestEvent>,
    npc_registry: Res<NpcRegistry>,
    item_registry: Res<ItemRegistry>,
    calendar: Res<Calendar>,
    mut relationships: ResMut<Relationships>,
    mut inventory: ResMut<Inventory>,
    mut given: EventWriter<GiftGivenEvent>,
    mut removed: EventWriter<ItemRemovedEvent>,
    mut toasts: EventWriter<ToastEvent>,
) {
    for ev in requests.read() {
        let Some(npc_def) = npc_registry.npcs.get(&ev.npc_id) else {
            warn!("[Relationships] Unknown NPC '{}'", ev.npc_id);
            continue;
        };
        if relationships.gifted_today.contains(&ev.npc_id) {
            toasts.send(ToastEvent::new(format!(
                "You've already given {} a gift today.",
                npc_def.name
            )));
            continue;
        }
        if !inventory.has(&ev.item_id, 1) {
            continue;
        }

        let preference = npc_def.preference_for(&ev.item_id);
        let multiplier = if npc_def.is_birthday(&calendar) {
            BIRTHDAY_GIFT_MULTIPLIER
        } else {
            1
        };
        let points = preference_to_points(preference) * multiplier;

        relationships.record_gift(&ev.npc_id, points);
        inventory.remove_item(&ev.item_id, 1);

        let item_name = item_registry
            .get(&ev.item_id)
            .map(|d| d.name.as_str())
            .unwrap_or(ev.item_id.as_str());
        info!(
            "[Relationships] {} received {} ({:?}, {:+} points)",
            npc_def.name, item_name, preference, points
        );

        removed.send(ItemRemovedEvent {
            item_id: ev.item_id.clone(),
            quantity: 1,
        });
        given.send(GiftGivenEvent {
            npc_id: ev.npc_id.clone(),
            item_id: ev.item_id.clone(),
            preference,
        });
    }
}

/// Friendship deltas requested by quests, dialogue and other domains.
pub fn apply_friendship_changes(
    mut events: EventReader<FriendshipChangeEvent>,
    mut relationships: ResMut<Relationships>,
) {
    for ev in events.read() {
        let total = relationships.add_friendship(&ev.npc_id, ev.amount);
        info!(
            "[Relationships] {} friendship {:+} → {}",
            ev.npc_id, ev.amount, total
        );
    }
}

pub fn handle_npc_talked(
    mut events: EventReader<NpcTalkedEvent>,
    mut relationships: ResMut<Relationships>,
) {
    for ev in events.read() {
        relationships.record_talk(&ev.npc_id);
    }
}

pub fn reset_daily_flags(
    mut day_end_events: EventReader<DayEndEvent>,
    mut relationships: ResMut<Relationships>,
) {
    if day_end_events.read().count() > 0 {
        relationships.reset_daily();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_to_points() {
        assert_eq!(preference_to_points(GiftPreference::Loved), 80);
        assert_eq!(preference_to_points(GiftPreference::Liked), 45);
        assert_eq!(preference_to_points(GiftPreference::Neutral), 20);
        assert_eq!(preference_to_points(GiftPreference::Disliked), -20);
        assert_eq!(preference_to_points(GiftPreference::Hated), -40);
    }

    #[test]
    fn test_second_gift_same_day_does_not_count() {
        let mut rel = Relationships::default();
        assert!(rel.record_gift("mira", 80));
        assert!(!rel.record_gift("mira", 80));
        assert_eq!(rel.points("mira"), 80);

        rel.reset_daily();
        assert!(rel.record_gift("mira", 80));
        assert_eq!(rel.points("mira"), 160);
    }

    #[test]
    fn test_friendship_is_clamped() {
        let mut rel = Relationships::default();
        assert_eq!(rel.add_friendship("tom", -50), 0);
        assert_eq!(rel.add_friendship("tom", 5000), MAX_FRIENDSHIP);
        assert_eq!(rel.hearts("tom"), MAX_HEARTS);
    }

    #[test]
    fn test_hearts_round_down() {
        let mut rel = Relationships::default();
        rel.add_friendship("elias", 399);
        assert_eq!(rel.hearts("elias"), 3);
        assert_eq!(rel.hearts("stranger"), 0);
    }

    #[test]
    fn test_talk_counts_once_per_day() {
        let mut rel = Relationships::default();
        assert!(rel.record_talk("mira"));
        assert!(!rel.record_talk("mira"));
        assert_eq!(rel.points("mira"), DAILY_TALK_POINTS as u32);
    }

    #[test]
    fn test_birthday_detection() {
        let npc = NpcDef {
            id: "mira".into(),
            name: "Mira".into(),
            birthday_season: Season::Summer,
            birthday_day: 12,
            gift_preferences: HashMap::new(),
            dialogue_tree: None,
        };
        let mut calendar = Calendar {
            year: 1,
            season: Season::Summer,
            day: 12,
        };
        assert!(npc.is_birthday(&calendar));
        calendar.day = 13;
        assert!(!npc.is_birthday(&calendar));
        assert_eq!(npc.preference_for("anything"), GiftPreference::Neutral);
    }
}
