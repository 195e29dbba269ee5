//! Quest domain — quest log, objective tracking, rewards.
//!
//! A quest is active until every objective has `current == target`, at which
//! point it moves to the completed list inside the same call that made the
//! last bit of progress. `QuestCompletedEvent` is sent once for that move,
//! and `grant_quest_rewards` is the only system that pays out.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::save::{AppSaveExt, Saveable};
use crate::shared::*;

// ─────────────────────────────────────────────────────────────────────────────
// Definitions
// ─────────────────────────────────────────────────────────────────────────────

/// What kind of action advances an objective.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectiveKind {
    Collect { item: ItemId },
    Harvest { crop: ItemId },
    Catch { fish: ItemId },
    Mine { item: ItemId },
    Talk { npc: NpcId },
    Craft { recipe: RecipeId },
    /// Only advanced by an explicit `QuestProgressEvent`.
    Custom { key: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectiveDef {
    pub description: String,
    pub kind: ObjectiveKind,
    pub target: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestRewards {
    pub gold: u32,
    pub items: Vec<(ItemId, u32)>,
    pub friendship: Vec<(NpcId, i32)>,
    pub spells: Vec<SpellId>,
    pub recipes: Vec<RecipeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestDef {
    pub id: QuestId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub giver: Option<NpcId>,
    pub objectives: Vec<ObjectiveDef>,
    #[serde(default)]
    pub rewards: QuestRewards,
    #[serde(default)]
    pub prerequisites: Vec<QuestId>,
    #[serde(default)]
    pub time_limit_days: Option<u32>,
}

#[derive(Resource, Debug, Clone, Default)]
pub struct QuestRegistry {
    pub quests: HashMap<QuestId, QuestDef>,
}

impl QuestRegistry {
    pub fn get(&self, id: &str) -> Option<&QuestDef> {
        self.quests.get(id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Quest log
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveProgress {
    pub kind: ObjectiveKind,
    pub current: u32,
    pub target: u32,
}

impl ObjectiveProgress {
    pub fn is_complete(&self) -> bool {
        self.current == self.target
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveQuest {
    pub id: QuestId,
    pub objectives: Vec<ObjectiveProgress>,
    pub days_remaining: Option<u32>,
}

impl ActiveQuest {
    pub fn is_complete(&self) -> bool {
        self.objectives.iter().all(ObjectiveProgress::is_complete)
    }
}

/// Returned when a quest moves from active to completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestCompletion {
    pub quest_id: QuestId,
}

#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestLog {
    pub active: Vec<ActiveQuest>,
    pub completed: Vec<QuestId>,
}

impl QuestLog {
    pub fn is_active(&self, quest_id: &str) -> bool {
        self.active.iter().any(|q| q.id == quest_id)
    }

    pub fn is_completed(&self, quest_id: &str) -> bool {
        self.completed.iter().any(|q| q == quest_id)
    }

    pub fn get(&self, quest_id: &str) -> Option<&ActiveQuest> {
        self.active.iter().find(|q| q.id == quest_id)
    }

    pub fn start_quest(&mut self, def: &QuestDef) -> bool {
        if self.is_active(&def.id) || self.is_completed(&def.id) {
            warn!("[Quests] '{}' is already active or completed", def.id);
            return false;
        }
        if let Some(missing) = def.prerequisites.iter().find(|p| !self.is_completed(p)) {
            warn!("[Quests] '{}' needs '{}' first", def.id, missing);
            return false;
        }
        if def.objectives.is_empty() {
            warn!("[Quests] '{}' has no objectives and can never finish", def.id);
            return false;
        }
        self.active.push(ActiveQuest {
            id: def.id.clone(),
            objectives: def
                .objectives
                .iter()
                .map(|o| ObjectiveProgress {
                    kind: o.kind.clone(),
                    current: 0,
                    target: o.target.max(1),
                })
                .collect(),
            days_remaining: def.time_limit_days,
        });
        true
    }

    /// Adds `amount` to one objective, clamped at its target.
    pub fn update_objective(
        &mut self,
        quest_id: &str,
        index: usize,
        amount: u32,
    ) -> Option<QuestCompletion> {
        let Some(quest) = self.active.iter_mut().find(|q| q.id == quest_id) else {
            warn!("[Quests] '{}' is not active", quest_id);
            return None;
        };
        let Some(objective) = quest.objectives.get_mut(index) else {
            warn!("[Quests] '{}' has no objective {}", quest_id, index);
            return None;
        };
        objective.current = objective.current.saturating_add(amount).min(objective.target);
        self.complete_if_done(quest_id)
    }

    /// Advances every active objective of `kind`. Returns the quests this
    /// completed.
    pub fn record_progress(&mut self, kind: &ObjectiveKind, amount: u32) -> Vec<QuestCompletion> {
        let mut touched = Vec::new();
        for quest in self.active.iter_mut() {
            for objective in quest.objectives.iter_mut().filter(|o| o.kind == *kind) {
                objective.current = objective.current.saturating_add(amount).min(objective.target);
                touched.push(quest.id.clone());
            }
        }
        touched.dedup();
        touched
            .iter()
            .filter_map(|id| self.complete_if_done(id))
            .collect()
    }

    fn complete_if_done(&mut self, quest_id: &str) -> Option<QuestCompletion> {
        let index = self
            .active
            .iter()
            .position(|q| q.id == quest_id && q.is_complete())?;
        let quest = self.active.remove(index);
        self.completed.push(quest.id.clone());
        Some(QuestCompletion { quest_id: quest.id })
    }

    pub fn abandon(&mut self, quest_id: &str) -> bool {
        let before = self.active.len();
        self.active.retain(|q| q.id != quest_id);
        self.active.len() != before
    }

    /// Counts down timed quests. Returns the ids that ran out and were dropped.
    pub fn tick_day(&mut self) -> Vec<QuestId> {
        let mut expired = Vec::new();
        self.active.retain_mut(|quest| {
            if let Some(days) = quest.days_remaining.as_mut() {
                if *days <= 1 {
                    expired.push(quest.id.clone());
                    return false;
                }
                *days -= 1;
            }
            true
        });
        expired
    }
}

impl Saveable for QuestLog {
    const SAVE_KEY: &'static str = "quests";
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// Direct progress on one objective (used for `Custom` objectives).
#[derive(Event, Debug, Clone)]
pub struct QuestProgressEvent {
    pub quest_id: QuestId,
    pub objective: usize,
    pub amount: u32,
}

#[derive(Event, Debug, Clone)]
pub struct AbandonQuestEvent {
    pub quest_id: QuestId,
}

// ─────────────────────────────────────────────────────────────────────────────
// Plugin
// ─────────────────────────────────────────────────────────────────────────────

pub struct QuestPlugin;

impl Plugin for QuestPlugin {
    fn build(&self, app: &mut App) {
        app.register_saveable::<QuestLog>()
            .init_resource::<QuestRegistry>()
            .add_event::<StartQuestEvent>()
            .add_event::<QuestStartedEvent>()
            .add_event::<QuestCompletedEvent>()
            .add_event::<QuestProgressEvent>()
            .add_event::<AbandonQuestEvent>()
            .add_systems(
                Update,
                (
                    handle_start_quest,
                    handle_quest_progress,
                    track_quest_progress,
                    handle_abandon_quest,
                    expire_quests,
                    grant_quest_rewards,
                )
                    .chain()
                    .run_if(in_state(GameState::Playing)),
            );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Systems
// ─────────────────────────────────────────────────────────────────────────────

pub fn handle_start_quest(
    mut events: EventReader<StartQuestEvent>,
    registry: Res<QuestRegistry>,
    mut quest_log: ResMut<QuestLog>,
    mut started: EventWriter<QuestStartedEvent>,
    mut toasts: EventWriter<ToastEvent>,
) {
    for ev in events.read() {
        let Some(def) = registry.get(&ev.quest_id) else {
            warn!("[Quests] Unknown quest '{}'", ev.quest_id);
            continue;
        };
        if quest_log.start_quest(def) {
            info!("[Quests] Started '{}'", def.id);
            toasts.send(ToastEvent::new(format!("New quest: {}", def.title)));
            started.send(QuestStartedEvent {
                quest_id: def.id.clone(),
            });
        }
    }
}

pub fn handle_quest_progress(
    mut events: EventReader<QuestProgressEvent>,
    mut quest_log: ResMut<QuestLog>,
    mut completed_writer: EventWriter<QuestCompletedEvent>,
) {
    for ev in events.read() {
        if let Some(done) = quest_log.update_objective(&ev.quest_id, ev.objective, ev.amount) {
            completed_writer.send(QuestCompletedEvent {
                quest_id: done.quest_id,
            });
        }
    }
}

/// Turns gameplay notifications into objective progress.
#[allow(clippy::too_many_arguments)]
pub fn track_quest_progress(
    mut item_events: EventReader<ItemAddedEvent>,
    mut crop_events: EventReader<CropHarvestedEvent>,
    mut fish_events: EventReader<FishCaughtEvent>,
    mut mineral_events: EventReader<MineralMinedEvent>,
    mut talk_events: EventReader<NpcTalkedEvent>,
    mut craft_events: EventReader<ItemCraftedEvent>,
    mut quest_log: ResMut<QuestLog>,
    mut completed_writer: EventWriter<QuestCompletedEvent>,
) {
    let mut progress: Vec<(ObjectiveKind, u32)> = Vec::new();
    progress.extend(item_events.read().map(|e| {
        (ObjectiveKind::Collect { item: e.item_id.clone() }, e.quantity)
    }));
    progress.extend(crop_events.read().map(|e| {
        (ObjectiveKind::Harvest { crop: e.crop_id.clone() }, e.quantity)
    }));
    progress.extend(fish_events.read().map(|e| {
        (ObjectiveKind::Catch { fish: e.fish_id.clone() }, 1)
    }));
    progress.extend(mineral_events.read().map(|e| {
        (ObjectiveKind::Mine { item: e.item_id.clone() }, e.quantity)
    }));
    progress.extend(talk_events.read().map(|e| {
        (ObjectiveKind::Talk { npc: e.npc_id.clone() }, 1)
    }));
    progress.extend(craft_events.read().map(|e| {
        (ObjectiveKind::Craft { recipe: e.recipe_id.clone() }, 1)
    }));

    if quest_log.active.is_empty() {
        return;
    }
    for (kind, amount) in progress {
        for done in quest_log.record_progress(&kind, amount) {
            info!("[Quests] '{}' complete", done.quest_id);
            completed_writer.send(QuestCompletedEvent {
                quest_id: done.quest_id,
            });
        }
    }
}

pub fn handle_abandon_quest(
    mut events: EventReader<AbandonQuestEvent>,
    mut quest_log: ResMut<QuestLog>,
) {
    for ev in events.read() {
        if quest_log.abandon(&ev.quest_id) {
            info!("[Quests] Abandoned '{}'", ev.quest_id);
        }
    }
}

/// On `DayEndEvent`, counts down timed quests and drops the expired ones.
pub fn expire_quests(
    mut day_end_events: EventReader<DayEndEvent>,
    registry: Res<QuestRegistry>,
    mut quest_log: ResMut<QuestLog>,
    mut toasts: EventWriter<ToastEvent>,
) {
    for _ in day_end_events.read() {
        for quest_id in quest_log.tick_day() {
            let title = registry
                .get(&quest_id)
                .map(|d| d.title.as_str())
                .unwrap_or(quest_id.as_str());
            toasts.send(ToastEvent::new(format!("Quest expired: {}", title)));
        }
    }
}

/// Pays out a quest's rewards. Runs once per `QuestCompletedEvent`.
#[allow(clippy::too_many_arguments)]
pub fn grant_quest_rewards(
    mut completed_events: EventReader<QuestCompletedEvent>,
    registry: Res<QuestRegistry>,
    mut gold_writer: EventWriter<GoldChangeEvent>,
    mut item_writer: EventWriter<GrantItemEvent>,
    mut friendship_writer: EventWriter<FriendshipChangeEvent>,
    mut spell_writer: EventWriter<LearnSpellEvent>,
    mut recipe_writer: EventWriter<UnlockRecipeEvent>,
    mut toasts: EventWriter<ToastEvent>,
) {
    for ev in completed_events.read() {
        let Some(def) = registry.get(&ev.quest_id) else {
            warn!("[Quests] Completed quest '{}' has no definition", ev.quest_id);
            continue;
        };
        let rewards = &def.rewards;

        if rewards.gold > 0 {
            gold_writer.send(GoldChangeEvent {
                amount: rewards.gold.min(i32::MAX as u32) as i32,
                reason: format!("Quest completed: {}", def.title),
            });
        }
        for (item_id, quantity) in &rewards.items {
            item_writer.send(GrantItemEvent {
                item_id: item_id.clone(),
                quantity: *quantity,
                source: format!("quest:{}", def.id),
            });
        }
        for (npc_id, amount) in &rewards.friendship {
            friendship_writer.send(FriendshipChangeEvent {
                npc_id: npc_id.clone(),
                amount: *amount,
            });
        }
        for spell_id in &rewards.spells {
            spell_writer.send(LearnSpellEvent {
                spell_id: spell_id.clone(),
            });
        }
        for recipe_id in &rewards.recipes {
            recipe_writer.send(UnlockRecipeEvent {
                recipe_id: recipe_id.clone(),
            });
        }

        toasts.send(ToastEvent {
            message: format!("Quest complete: {}! +{}g", def.title, rewards.gold),
            duration_secs: 4.0,
        });
    }
}
