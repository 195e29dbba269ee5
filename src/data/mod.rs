//! Data layer — populates all registries at game startup.
//!
//! Definitions ship as RON tables under `assets/data/` and are compiled in.
//! `load_all_data` runs on `OnEnter(GameState::Loading)`, fills every
//! registry, then moves the game on to `GameState::MainMenu`.
//!
//! A table that fails to parse is logged and leaves its registry empty; the
//! game still reaches the menu.

use bevy::prelude::*;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

use crate::crafting::{Recipe, RecipeRegistry};
use crate::dialogue::{DialogueRegistry, DialogueTree};
use crate::economy::{ShopDef, ShopRegistry};
use crate::farming::{CropDef, CropRegistry};
use crate::magic::{SpellDef, SpellRegistry};
use crate::minigames::{FishDef, FishRegistry, MineralNodeDef, MineralRegistry};
use crate::quests::{ObjectiveKind, QuestDef, QuestRegistry};
use crate::relationships::{NpcDef, NpcRegistry};
use crate::shared::*;
use crate::world::{WaypointDef, WaypointRegistry};

pub const ITEMS_RON: &str = include_str!("../../assets/data/items.ron");
pub const CROPS_RON: &str = include_str!("../../assets/data/crops.ron");
pub const RECIPES_RON: &str = include_str!("../../assets/data/recipes.ron");
pub const QUESTS_RON: &str = include_str!("../../assets/data/quests.ron");
pub const SPELLS_RON: &str = include_str!("../../assets/data/spells.ron");
pub const NPCS_RON: &str = include_str!("../../assets/data/npcs.ron");
pub const DIALOGUE_RON: &str = include_str!("../../assets/data/dialogue.ron");
pub const SHOPS_RON: &str = include_str!("../../assets/data/shops.ron");
pub const FISH_RON: &str = include_str!("../../assets/data/fish.ron");
pub const MINERALS_RON: &str = include_str!("../../assets/data/minerals.ron");
pub const WAYPOINTS_RON: &str = include_str!("../../assets/data/waypoints.ron");

pub struct DataPlugin;

impl Plugin for DataPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(GameState::Loading), load_all_data);
    }
}

// ─── Parsing ─────────────────────────────────────────────────────────────────

pub fn parse_table<T: DeserializeOwned>(source: &str) -> Result<Vec<T>, ron::error::SpannedError> {
    ron::from_str(source)
}

/// Parses one table into an id-keyed map. Errors are logged, not returned.
fn load_table<T: DeserializeOwned>(
    file: &str,
    source: &str,
    id_of: impl Fn(&T) -> &str,
) -> HashMap<String, T> {
    match parse_table::<T>(source) {
        Ok(rows) => {
            let mut table = HashMap::with_capacity(rows.len());
            for row in rows {
                let id = id_of(&row).to_string();
                if table.insert(id.clone(), row).is_some() {
                    warn!("[Data] {}: duplicate id '{}', keeping the last one", file, id);
                }
            }
            table
        }
        Err(e) => {
            error!("[Data] {}: {}", file, e);
            HashMap::new()
        }
    }
}

// ─── Loading ─────────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn load_all_data(
    mut items: ResMut<ItemRegistry>,
    mut crops: ResMut<CropRegistry>,
    mut recipes: ResMut<RecipeRegistry>,
    mut quests: ResMut<QuestRegistry>,
    mut spells: ResMut<SpellRegistry>,
    mut npcs: ResMut<NpcRegistry>,
    mut dialogue: ResMut<DialogueRegistry>,
    mut shops: ResMut<ShopRegistry>,
    mut fish: ResMut<FishRegistry>,
    mut minerals: ResMut<MineralRegistry>,
    mut waypoints: ResMut<WaypointRegistry>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    info!("[Data] Populating registries");

    items.items = load_table::<ItemDef>("items.ron", ITEMS_RON, |d| d.id.as_str());
    crops.crops = load_table::<CropDef>("crops.ron", CROPS_RON, |d| d.id.as_str());
    recipes.recipes = load_table::<Recipe>("recipes.ron", RECIPES_RON, |d| d.id.as_str());
    quests.quests = load_table::<QuestDef>("quests.ron", QUESTS_RON, |d| d.id.as_str());
    spells.spells = load_table::<SpellDef>("spells.ron", SPELLS_RON, |d| d.id.as_str());
    npcs.npcs = load_table::<NpcDef>("npcs.ron", NPCS_RON, |d| d.id.as_str());
    dialogue.trees = load_table::<DialogueTree>("dialogue.ron", DIALOGUE_RON, |d| d.id.as_str());
    shops.shops = load_table::<ShopDef>("shops.ron", SHOPS_RON, |d| d.id.as_str());
    fish.fish = load_table::<FishDef>("fish.ron", FISH_RON, |d| d.id.as_str());
    minerals.nodes = load_table::<MineralNodeDef>("minerals.ron", MINERALS_RON, |d| d.id.as_str());
    waypoints.waypoints = load_table::<WaypointDef>("waypoints.ron", WAYPOINTS_RON, |d| d.id.as_str());

    info!(
        "[Data] {} items, {} crops, {} recipes, {} quests, {} spells, {} NPCs",
        items.items.len(),
        crops.crops.len(),
        recipes.recipes.len(),
        quests.quests.len(),
        spells.spells.len(),
        npcs.npcs.len()
    );
    info!(
        "[Data] {} dialogue trees, {} shops, {} fish, {} mineral nodes, {} waypoints",
        dialogue.trees.len(),
        shops.shops.len(),
        fish.fish.len(),
        minerals.nodes.len(),
        waypoints.waypoints.len()
    );

    for problem in dangling_item_refs(&items, &crops, &recipes, &quests, &shops, &fish, &minerals) {
        warn!("[Data] {}", problem);
    }

    next_state.set(GameState::MainMenu);
}

/// Item ids referenced by other tables that the item table does not define.
pub fn dangling_item_refs(
    items: &ItemRegistry,
    crops: &CropRegistry,
    recipes: &RecipeRegistry,
    quests: &QuestRegistry,
    shops: &ShopRegistry,
    fish: &FishRegistry,
    minerals: &MineralRegistry,
) -> Vec<String> {
    let mut refs: Vec<(String, &str)> = Vec::new();
    for crop in crops.crops.values() {
        refs.push((format!("crop '{}'", crop.id), crop.seed_id.as_str()));
        refs.push((format!("crop '{}'", crop.id), crop.harvest_id.as_str()));
    }
    for recipe in recipes.recipes.values() {
        refs.push((format!("recipe '{}'", recipe.id), recipe.result.as_str()));
        for (item, _) in &recipe.ingredients {
            refs.push((format!("recipe '{}'", recipe.id), item.as_str()));
        }
    }
    for quest in quests.quests.values() {
        for (item, _) in &quest.rewards.items {
            refs.push((format!("quest '{}'", quest.id), item.as_str()));
        }
        for objective in &quest.objectives {
            if let ObjectiveKind::Collect { item } | ObjectiveKind::Mine { item } = &objective.kind {
                refs.push((format!("quest '{}'", quest.id), item.as_str()));
            }
        }
    }
    for shop in shops.shops.values() {
        for listing in &shop.listings {
            refs.push((format!("shop '{}'", shop.id), listing.item_id.as_str()));
        }
    }
    for def in fish.fish.values() {
        refs.push((format!("fish '{}'", def.id), def.id.as_str()));
    }
    for node in minerals.nodes.values() {
        refs.push((format!("mineral node '{}'", node.id), node.item.as_str()));
    }

    let mut problems: Vec<String> = refs
        .into_iter()
        .filter(|(_, item)| items.get(item).is_none())
        .map(|(owner, item)| format!("{} references unknown item '{}'", owner, item))
        .collect();
    problems.sort();
    problems
}
