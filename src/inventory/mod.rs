//! Inventory domain — the player's fixed slot array.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::save::{AppSaveExt, Saveable};
use crate::shared::*;

// ═══════════════════════════════════════════════════════════════════════
// MANAGER
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySlot {
    pub item_id: ItemId,
    pub quantity: u32,
}

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub slots: Vec<Option<InventorySlot>>,
    pub selected_slot: usize,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::with_capacity(TOTAL_INVENTORY_SLOTS)
    }
}

impl Inventory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            selected_slot: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn count(&self, item_id: &str) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|s| s.item_id == item_id)
            .map(|s| s.quantity)
            .sum()
    }

    pub fn has(&self, item_id: &str, quantity: u32) -> bool {
        self.count(item_id) >= quantity
    }

    pub fn free_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }

    /// How many more units of `def` would fit right now.
    pub fn room_for(&self, def: &ItemDef) -> u32 {
        let per_slot = def.slot_capacity();
        let topping_up: u32 = self
            .slots
            .iter()
            .flatten()
            .filter(|s| s.item_id == def.id && s.quantity < per_slot)
            .map(|s| per_slot - s.quantity)
            .sum();
        topping_up.saturating_add(per_slot.saturating_mul(self.free_slots() as u32))
    }

    /// Adds `quantity` units of a registered item. Either everything fits or
    /// nothing changes.
    pub fn add_item(&mut self, registry: &ItemRegistry, item_id: &str, quantity: u32) -> bool {
        let Some(def) = registry.get(item_id) else {
            warn!("[Inventory] Unknown item '{}'", item_id);
            return false;
        };
        self.add_def(def, quantity)
    }

    pub fn add_def(&mut self, def: &ItemDef, quantity: u32) -> bool {
        if quantity == 0 {
            return true;
        }
        if self.room_for(def) < quantity {
            warn!(
                "[Inventory] No room for {} x{} ({} free slots)",
                def.id,
                quantity,
                self.free_slots()
            );
            return false;
        }

        let per_slot = def.slot_capacity();
        let mut remaining = quantity;

        // First pass: stack onto existing slots with the same item
        for slot in self.slots.iter_mut().flatten() {
            if remaining == 0 {
                break;
            }
            if slot.item_id == def.id && slot.quantity < per_slot {
                let add = remaining.min(per_slot - slot.quantity);
                slot.quantity += add;
                remaining -= add;
            }
        }

        // Second pass: fill empty slots
        for slot in self.slots.iter_mut() {
            if remaining == 0 {
                break;
            }
            if slot.is_none() {
                let add = remaining.min(per_slot);
                *slot = Some(InventorySlot {
                    item_id: def.id.clone(),
                    quantity: add,
                });
                remaining -= add;
            }
        }
        true
    }

    /// Removes `quantity` units, emptying later slots first. Fails without
    /// mutation when fewer are held.
    pub fn remove_item(&mut self, item_id: &str, quantity: u32) -> bool {
        if !self.has(item_id, quantity) {
            warn!(
                "[Inventory] Cannot remove {} x{}: only {} held",
                item_id,
                quantity,
                self.count(item_id)
            );
            return false;
        }
        let mut remaining = quantity;
        for slot in self.slots.iter_mut().rev() {
            if remaining == 0 {
                break;
            }
            let Some(s) = slot.as_mut() else {
                continue;
            };
            if s.item_id != item_id {
                continue;
            }
            let take = remaining.min(s.quantity);
            s.quantity -= take;
            remaining -= take;
            if s.quantity == 0 {
                *slot = None;
            }
        }
        true
    }

    pub fn select_slot(&mut self, index: usize) -> bool {
        if index >= self.slots.len() {
            warn!("[Inventory] Slot {} out of range", index);
            return false;
        }
        self.selected_slot = index;
        true
    }

    pub fn swap_slots(&mut self, a: usize, b: usize) -> bool {
        if a >= self.slots.len() || b >= self.slots.len() {
            warn!("[Inventory] Cannot swap slots {} and {}", a, b);
            return false;
        }
        self.slots.swap(a, b);
        true
    }

    pub fn selected(&self) -> Option<&InventorySlot> {
        self.slots.get(self.selected_slot).and_then(|s| s.as_ref())
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.selected_slot = 0;
    }
}

impl Saveable for Inventory {
    const SAVE_KEY: &'static str = "inventory";

    fn fresh(config: &GameConfig) -> Self {
        Self::with_capacity(config.inventory_capacity)
    }

    fn after_load(&mut self) {
        if self.selected_slot >= self.slots.len() {
            self.selected_slot = 0;
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// EVENTS
// ═══════════════════════════════════════════════════════════════════════

#[derive(Event, Debug, Clone)]
pub struct DiscardItemEvent {
    pub item_id: ItemId,
    pub quantity: u32,
}

#[derive(Event, Debug, Clone)]
pub struct SelectSlotEvent {
    pub index: usize,
}

#[derive(Event, Debug, Clone)]
pub struct SwapSlotsEvent {
    pub a: usize,
    pub b: usize,
}

// ═══════════════════════════════════════════════════════════════════════
// PLUGIN
// ═══════════════════════════════════════════════════════════════════════

pub struct InventoryPlugin;

impl Plugin for InventoryPlugin {
    fn build(&self, app: &mut App) {
        app.register_saveable::<Inventory>()
            .add_event::<DiscardItemEvent>()
            .add_event::<SelectSlotEvent>()
            .add_event::<SwapSlotsEvent>()
            .add_systems(
                Update,
                (
                    handle_grant_item,
                    handle_discard_item,
                    handle_slot_requests,
                )
                    .run_if(in_state(GameState::Playing)),
            );
    }
}

pub fn handle_grant_item(
    mut grants: EventReader<GrantItemEvent>,
    registry: Res<ItemRegistry>,
    mut inventory: ResMut<Inventory>,
    mut added: EventWriter<ItemAddedEvent>,
    mut toasts: EventWriter<ToastEvent>,
) {
    for ev in grants.read() {
        if inventory.add_item(&registry, &ev.item_id, ev.quantity) {
            added.send(ItemAddedEvent {
                item_id: ev.item_id.clone(),
                quantity: ev.quantity,
            });
        } else {
            let name = registry
                .get(&ev.item_id)
                .map(|d| d.name.as_str())
                .unwrap_or(ev.item_id.as_str());
            toasts.send(ToastEvent::new(format!("Inventory full! Lost {} x{}", name, ev.quantity)));
            warn!("[Inventory] Grant from {} dropped: {} x{}", ev.source, ev.item_id, ev.quantity);
        }
    }
}

pub fn handle_discard_item(
    mut discards: EventReader<DiscardItemEvent>,
    mut inventory: ResMut<Inventory>,
    mut removed: EventWriter<ItemRemovedEvent>,
) {
    for ev in discards.read() {
        if inventory.remove_item(&ev.item_id, ev.quantity) {
            removed.send(ItemRemovedEvent {
                item_id: ev.item_id.clone(),
                quantity: ev.quantity,
            });
        }
    }
}

pub fn handle_slot_requests(
    mut selects: EventReader<SelectSlotEvent>,
    mut swaps: EventReader<SwapSlotsEvent>,
    mut inventory: ResMut<Inventory>,
) {
    for ev in selects.read() {
        inventory.select_slot(ev.index);
    }
    for ev in swaps.read() {
        inventory.swap_slots(ev.a, ev.b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(id: &str, stackable: bool, max_stack: u32) -> ItemDef {
        ItemDef {
            id: id.into(),
            name: id.into(),
            description: String::new(),
            category: ItemCategory::Material,
            sell_price: 2,
            buy_price: None,
            stackable,
            max_stack,
            icon: String::new(),
        }
    }

    fn registry() -> ItemRegistry {
        let mut registry = ItemRegistry::default();
        registry.insert(def("wood", true, 99));
        registry.insert(def("stone", true, 10));
        registry.insert(def("axe", false, 1));
        registry
    }

    #[test]
    fn test_add_stackable_increases_count_by_quantity() {
        let registry = registry();
        let mut inv = Inventory::with_capacity(4);
        assert!(inv.add_item(&registry, "wood", 3));
        assert!(inv.add_item(&registry, "wood", 40));
        assert_eq!(inv.count("wood"), 43);
        assert_eq!(inv.free_slots(), 3);
    }

    #[test]
    fn test_stacks_split_at_max_stack() {
        let registry = registry();
        let mut inv = Inventory::with_capacity(4);
        assert!(inv.add_item(&registry, "stone", 25));
        assert_eq!(inv.count("stone"), 25);
        assert_eq!(inv.free_slots(), 1);
    }

    #[test]
    fn test_non_stackable_takes_one_slot_per_unit() {
        let registry = registry();
        let mut inv = Inventory::with_capacity(3);
        assert!(inv.add_item(&registry, "axe", 2));
        assert_eq!(inv.free_slots(), 1);
        assert_eq!(inv.count("axe"), 2);
    }

    #[test]
    fn test_add_past_capacity_changes_nothing() {
        let registry = registry();
        let mut inv = Inventory::with_capacity(3);
        assert!(inv.add_item(&registry, "wood", 1));
        let before = inv.clone();
        assert!(!inv.add_item(&registry, "axe", 3));
        assert_eq!(inv, before);
        assert!(!inv.add_item(&registry, "stone", 21));
        assert_eq!(inv, before);
    }

    #[test]
    fn test_unknown_item_is_rejected() {
        let mut inv = Inventory::with_capacity(3);
        assert!(!inv.add_item(&registry(), "unobtainium", 1));
        assert_eq!(inv.free_slots(), 3);
    }

    #[test]
    fn test_remove_more_than_held_fails_without_mutation() {
        let registry = registry();
        let mut inv = Inventory::with_capacity(4);
        inv.add_item(&registry, "stone", 15);
        let before = inv.clone();
        assert!(!inv.remove_item("stone", 16));
        assert_eq!(inv, before);
        assert!(inv.remove_item("stone", 12));
        assert_eq!(inv.count("stone"), 3);
        assert_eq!(inv.free_slots(), 3);
    }

    #[test]
    fn test_select_and_swap_bounds() {
        let registry = registry();
        let mut inv = Inventory::with_capacity(2);
        inv.add_item(&registry, "wood", 5);
        assert!(!inv.select_slot(2));
        assert!(!inv.swap_slots(0, 2));
        assert!(inv.swap_slots(0, 1));
        assert!(inv.select_slot(1));
        assert_eq!(inv.selected().map(|s| s.quantity), Some(5));
    }

    #[test]
    fn test_fresh_uses_configured_capacity() {
        let config = GameConfig {
            inventory_capacity: 10,
            ..Default::default()
        };
        assert_eq!(Inventory::fresh(&config).capacity(), 10);
    }
}
