use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::inventory::Inventory;
use crate::save::{AppSaveExt, Saveable};
use crate::shared::*;

// ──────────────────────────────────────────────────────────────────────────────
// RECIPES
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    pub ingredients: Vec<(ItemId, u32)>,
    pub result: ItemId,
    pub result_quantity: u32,
    #[serde(default)]
    pub unlocked_by_default: bool,
}

#[derive(Resource, Debug, Clone, Default)]
pub struct RecipeRegistry {
    pub recipes: HashMap<RecipeId, Recipe>,
}

impl RecipeRegistry {
    pub fn get(&self, id: &str) -> Option<&Recipe> {
        self.recipes.get(id)
    }
}

/// Recipes the player has learned beyond the ones everybody starts with.
#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnlockedRecipes {
    pub ids: Vec<RecipeId>,
}

impl UnlockedRecipes {
    pub fn unlock(&mut self, id: &str) -> bool {
        if self.ids.iter().any(|r| r == id) {
            return false;
        }
        self.ids.push(id.to_string());
        true
    }

    pub fn is_unlocked(&self, recipe: &Recipe) -> bool {
        recipe.unlocked_by_default || self.ids.iter().any(|r| *r == recipe.id)
    }

    pub fn can_craft(&self, recipe: &Recipe, inventory: &Inventory) -> bool {
        self.is_unlocked(recipe)
            && recipe
                .ingredients
                .iter()
                .all(|(item, qty)| inventory.has(item, *qty))
    }

    /// Consumes every ingredient and adds the result, or leaves the
    /// inventory untouched.
    pub fn craft(&self, recipe: &Recipe, inventory: &mut Inventory, items: &ItemRegistry) -> bool {
        if !self.is_unlocked(recipe) {
            warn!("[Crafting] Recipe '{}' is locked", recipe.id);
            return false;
        }
        // Dry-run on a clone; freed slots may make room for the result.
        let mut trial = inventory.clone();
        for (item, qty) in &recipe.ingredients {
            if !trial.remove_item(item, *qty) {
                return false;
            }
        }
        if !trial.add_item(items, &recipe.result, recipe.result_quantity) {
            return false;
        }
        *inventory = trial;
        true
    }
}

impl Saveable for UnlockedRecipes {
    const SAVE_KEY: &'static str = "recipes";
}

// ──────────────────────────────────────────────────────────────────────────────
// EVENTS
// ──────────────────────────────────────────────────────────────────────────────

/// Send to request crafting a recipe. UI sends this when the player confirms.
#[derive(Event, Debug, Clone)]
pub struct CraftRequestEvent {
    pub recipe_id: RecipeId,
}

// ──────────────────────────────────────────────────────────────────────────────
// PLUGIN
// ──────────────────────────────────────────────────────────────────────────────

pub struct CraftingPlugin;

impl Plugin for CraftingPlugin {
    fn build(&self, app: &mut App) {
        app.register_saveable::<UnlockedRecipes>()
            .init_resource::<RecipeRegistry>()
            .add_event::<CraftRequestEvent>()
            .add_event::<ItemCraftedEvent>()
            .add_event::<UnlockRecipeEvent>()
            .add_systems(
                Update,
                (handle_unlock_recipe, handle_craft_requests)
                    .run_if(in_state(GameState::Playing)),
            );
    }
}

pub fn handle_unlock_recipe(
    mut events: EventReader<UnlockRecipeEvent>,
    registry: Res<RecipeRegistry>,
    mut unlocked: ResMut<UnlockedRecipes>,
    mut toasts: EventWriter<ToastEvent>,
) {
    for ev in events.read() {
        let Some(recipe) = registry.get(&ev.recipe_id) else {
            warn!("[Crafting] Cannot unlock unknown recipe '{}'", ev.recipe_id);
            continue;
        };
        if unlocked.is_unlocked(recipe) {
            continue;
        }
        unlocked.unlock(&recipe.id);
        toasts.send(ToastEvent::new(format!("New recipe: {}", recipe.name)));
        info!("[Crafting] Unlocked recipe '{}'", recipe.id);
    }
}

#[allow(clippy::too_many_arguments)]
pub fn handle_craft_requests(
    mut events: EventReader<CraftRequestEvent>,
    registry: Res<RecipeRegistry>,
    items: Res<ItemRegistry>,
    unlocked: Res<UnlockedRecipes>,
    mut inventory: ResMut<Inventory>,
    mut crafted: EventWriter<ItemCraftedEvent>,
    mut removed: EventWriter<ItemRemovedEvent>,
    mut added: EventWriter<ItemAddedEvent>,
    mut toasts: EventWriter<ToastEvent>,
) {
    for ev in events.read() {
        let Some(recipe) = registry.get(&ev.recipe_id) else {
            warn!("[Crafting] Unknown recipe '{}'", ev.recipe_id);
            continue;
        };
        if !unlocked.craft(recipe, &mut inventory, &items) {
            toasts.send(ToastEvent::new(format!("Can't craft {}.", recipe.name)));
            continue;
        }
        for (item, qty) in &recipe.ingredients {
            removed.send(ItemRemovedEvent {
                item_id: item.clone(),
                quantity: *qty,
            });
        }
        added.send(ItemAddedEvent {
            item_id: recipe.result.clone(),
            quantity: recipe.result_quantity,
        });
        crafted.send(ItemCraftedEvent {
            recipe_id: recipe.id.clone(),
            result: recipe.result.clone(),
            quantity: recipe.result_quantity,
        });
        info!(
            "[Crafting] Crafted {} x{}",
            recipe.result, recipe.result_quantity
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> ItemRegistry {
        let mut registry = ItemRegistry::default();
        for id in ["wood", "stone", "torch"] {
            registry.insert(ItemDef {
                id: id.into(),
                name: id.into(),
                description: String::new(),
                category: ItemCategory::Material,
                sell_price: 1,
                buy_price: None,
                stackable: true,
                max_stack: 99,
                icon: String::new(),
            });
        }
        registry
    }

    fn torch_recipe(unlocked_by_default: bool) -> Recipe {
        Recipe {
            id: "torch".into(),
            name: "Torch".into(),
            ingredients: vec![("wood".into(), 2), ("stone".into(), 1)],
            result: "torch".into(),
            result_quantity: 3,
            unlocked_by_default,
        }
    }

    #[test]
    fn test_craft_consumes_ingredients_and_adds_result() {
        let items = items();
        let mut inv = Inventory::with_capacity(4);
        inv.add_item(&items, "wood", 5);
        inv.add_item(&items, "stone", 1);

        let unlocked = UnlockedRecipes::default();
        assert!(unlocked.craft(&torch_recipe(true), &mut inv, &items));
        assert_eq!(inv.count("wood"), 3);
        assert_eq!(inv.count("stone"), 0);
        assert_eq!(inv.count("torch"), 3);
    }

    #[test]
    fn test_missing_ingredient_changes_nothing() {
        let items = items();
        let mut inv = Inventory::with_capacity(4);
        inv.add_item(&items, "wood", 5);
        let before = inv.clone();

        let unlocked = UnlockedRecipes::default();
        assert!(!unlocked.can_craft(&torch_recipe(true), &inv));
        assert!(!unlocked.craft(&torch_recipe(true), &mut inv, &items));
        assert_eq!(inv, before);
    }

    #[test]
    fn test_result_may_use_slot_freed_by_ingredients() {
        let items = items();
        let mut inv = Inventory::with_capacity(2);
        inv.add_item(&items, "wood", 2);
        inv.add_item(&items, "stone", 1);
        assert_eq!(inv.free_slots(), 0);

        let unlocked = UnlockedRecipes::default();
        assert!(unlocked.craft(&torch_recipe(true), &mut inv, &items));
        assert_eq!(inv.count("torch"), 3);
    }

    #[test]
    fn test_craft_request_announces_removed_and_added_items() {
        let mut app = App::new();
        let mut recipes = RecipeRegistry::default();
        recipes.recipes.insert("torch".into(), torch_recipe(true));
        let items = items();
        let mut inv = Inventory::with_capacity(4);
        inv.add_item(&items, "wood", 2);
        inv.add_item(&items, "stone", 1);
        app.insert_resource(recipes)
            .insert_resource(items)
            .insert_resource(inv)
            .init_resource::<UnlockedRecipes>()
            .add_event::<CraftRequestEvent>()
            .add_event::<ItemCraftedEvent>()
            .add_event::<ItemRemovedEvent>()
            .add_event::<ItemAddedEvent>()
            .add_event::<ToastEvent>()
            .add_systems(Update, handle_craft_requests);

        app.world_mut().send_event(CraftRequestEvent {
            recipe_id: "torch".into(),
        });
        app.update();

        let removed: Vec<(ItemId, u32)> = app
            .world_mut()
            .resource_mut::<Events<ItemRemovedEvent>>()
            .drain()
            .map(|e| (e.item_id, e.quantity))
            .collect();
        assert_eq!(removed, vec![("wood".to_string(), 2), ("stone".to_string(), 1)]);
        let added: Vec<(ItemId, u32)> = app
            .world_mut()
            .resource_mut::<Events<ItemAddedEvent>>()
            .drain()
            .map(|e| (e.item_id, e.quantity))
            .collect();
        assert_eq!(added, vec![("torch".to_string(), 3)]);
        assert_eq!(app.world().resource::<Inventory>().count("torch"), 3);
    }

    #[test]
    fn test_locked_recipe_needs_unlock() {
        let items = items();
        let mut inv = Inventory::with_capacity(4);
        inv.add_item(&items, "wood", 2);
        inv.add_item(&items, "stone", 1);

        let mut unlocked = UnlockedRecipes::default();
        let recipe = torch_recipe(false);
        assert!(!unlocked.craft(&recipe, &mut inv, &items));
        assert!(unlocked.unlock("torch"));
        assert!(!unlocked.unlock("torch"));
        assert!(unlocked.craft(&recipe, &mut inv, &items));
    }
}
