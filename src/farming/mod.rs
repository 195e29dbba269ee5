//! Farming domain — planting, watering, crop growth, harvest.
//!
//! Crop lifecycle per plot: `Planted → Watered → (Planted | Ready)`.
//! Only a watered crop grows overnight. Regrowing crops go back to
//! `Planted` after harvest and need `regrow_days` instead of `growth_days`.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::inventory::Inventory;
use crate::save::{AppSaveExt, Saveable};
use crate::shared::*;

// ═══════════════════════════════════════════════════════════════════════
// DEFINITIONS
// ═══════════════════════════════════════════════════════════════════════

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropDef {
    pub id: ItemId,
    pub name: String,
    pub seed_id: ItemId,
    pub harvest_id: ItemId,
    pub seasons: Vec<Season>,
    pub growth_days: u8,
    #[serde(default)]
    pub regrows: bool,
    #[serde(default)]
    pub regrow_days: u8, // days to regrow after harvest (if regrows)
    #[serde(default = "one")]
    pub harvest_quantity: u32,
}

#[derive(Resource, Debug, Clone, Default)]
pub struct CropRegistry {
    pub crops: HashMap<ItemId, CropDef>,
}

impl CropRegistry {
    pub fn get(&self, crop_id: &str) -> Option<&CropDef> {
        self.crops.get(crop_id)
    }

    pub fn by_seed(&self, seed_id: &str) -> Option<&CropDef> {
        self.crops.values().find(|c| c.seed_id == seed_id)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// MANAGER
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CropStage {
    Planted,
    Watered,
    Ready,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropPlot {
    pub x: i32,
    pub y: i32,
    pub crop_id: ItemId,
    pub stage: CropStage,
    pub days_grown: u8,
    /// Set once a regrowing crop has produced, so it waits `regrow_days`.
    #[serde(default)]
    pub regrowing: bool,
}

/// What a harvest yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Harvest {
    pub crop_id: ItemId,
    pub harvest_id: ItemId,
    pub quantity: u32,
}

/// Overnight growth summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrowthReport {
    pub ripened: usize,
    /// Out-of-season crops removed from the field.
    pub withered: Vec<(i32, i32)>,
}

#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FarmState {
    pub plots: Vec<CropPlot>,
}

impl FarmState {
    pub fn plot(&self, x: i32, y: i32) -> Option<&CropPlot> {
        self.plots.iter().find(|p| p.x == x && p.y == y)
    }

    fn plot_mut(&mut self, x: i32, y: i32) -> Option<&mut CropPlot> {
        self.plots.iter_mut().find(|p| p.x == x && p.y == y)
    }

    pub fn plant(&mut self, x: i32, y: i32, def: &CropDef, season: Season) -> bool {
        if self.plot(x, y).is_some() {
            warn!("[Farming] ({}, {}) is already planted", x, y);
            return false;
        }
        if !def.seasons.contains(&season) {
            warn!("[Farming] {} cannot be planted in {:?}", def.name, season);
            return false;
        }
        self.plots.push(CropPlot {
            x,
            y,
            crop_id: def.id.clone(),
            stage: CropStage::Planted,
            days_grown: 0,
            regrowing: false,
        });
        true
    }

    pub fn water(&mut self, x: i32, y: i32) -> bool {
        match self.plot_mut(x, y) {
            Some(plot) if plot.stage == CropStage::Planted => {
                plot.stage = CropStage::Watered;
                true
            }
            Some(_) => false,
            None => {
                warn!("[Farming] Nothing planted at ({}, {})", x, y);
                false
            }
        }
    }

    /// Waters every thirsty plot. Returns how many were watered.
    pub fn water_all(&mut self) -> usize {
        let mut watered = 0;
        for plot in self.plots.iter_mut() {
            if plot.stage == CropStage::Planted {
                plot.stage = CropStage::Watered;
                watered += 1;
            }
        }
        watered
    }

    /// One night of growth for every plot.
    pub fn advance_day(&mut self, registry: &CropRegistry, season: Season) -> GrowthReport {
        let mut report = GrowthReport::default();

        self.plots.retain(|plot| {
            let in_season = registry
                .get(&plot.crop_id)
                .is_some_and(|def| def.seasons.contains(&season));
            if !in_season {
                report.withered.push((plot.x, plot.y));
            }
            in_season
        });

        for plot in self.plots.iter_mut() {
            if plot.stage != CropStage::Watered {
                continue;
            }
            let Some(def) = registry.get(&plot.crop_id) else {
                continue;
            };
            plot.days_grown = plot.days_grown.saturating_add(1);
            let needed = if plot.regrowing {
                def.regrow_days
            } else {
                def.growth_days
            };
            if plot.days_grown >= needed {
                plot.stage = CropStage::Ready;
                report.ripened += 1;
            } else {
                plot.stage = CropStage::Planted;
            }
        }
        report
    }

    /// Takes the produce from a ready plot. Regrowing crops stay in the
    /// ground; everything else is cleared.
    pub fn harvest(&mut self, x: i32, y: i32, registry: &CropRegistry) -> Option<Harvest> {
        let index = self
            .plots
            .iter()
            .position(|p| p.x == x && p.y == y && p.stage == CropStage::Ready)?;
        let def = registry.get(&self.plots[index].crop_id)?;

        let harvest = Harvest {
            crop_id: def.id.clone(),
            harvest_id: def.harvest_id.clone(),
            quantity: def.harvest_quantity.max(1),
        };
        if def.regrows {
            let plot = &mut self.plots[index];
            plot.stage = CropStage::Planted;
            plot.days_grown = 0;
            plot.regrowing = true;
        } else {
            self.plots.remove(index);
        }
        Some(harvest)
    }
}

impl Saveable for FarmState {
    const SAVE_KEY: &'static str = "farm";
}

// ═══════════════════════════════════════════════════════════════════════
// EVENTS
// ═══════════════════════════════════════════════════════════════════════

/// Plant the crop grown from `seed_id` at a field position.
#[derive(Event, Debug, Clone)]
pub struct PlantRequestEvent {
    pub x: i32,
    pub y: i32,
    pub seed_id: ItemId,
}

#[derive(Event, Debug, Clone)]
pub struct WaterRequestEvent {
    pub x: i32,
    pub y: i32,
}

#[derive(Event, Debug, Clone)]
pub struct HarvestRequestEvent {
    pub x: i32,
    pub y: i32,
}

#[derive(Event, Debug, Clone)]
pub struct CropPlantedEvent {
    pub crop_id: ItemId,
    pub x: i32,
    pub y: i32,
}

// ═══════════════════════════════════════════════════════════════════════
// PLUGIN
// ═══════════════════════════════════════════════════════════════════════

pub struct FarmingPlugin;

impl Plugin for FarmingPlugin {
    fn build(&self, app: &mut App) {
        app.register_saveable::<FarmState>()
            .init_resource::<CropRegistry>()
            .add_event::<PlantRequestEvent>()
            .add_event::<WaterRequestEvent>()
            .add_event::<HarvestRequestEvent>()
            .add_event::<CropPlantedEvent>()
            .add_event::<CropHarvestedEvent>()
            .add_event::<WaterAllCropsEvent>()
            .add_systems(
                Update,
                (
                    handle_plant_requests,
                    handle_water_requests,
                    handle_harvest_requests,
                    on_day_end,
                )
                    .chain()
                    .run_if(in_state(GameState::Playing)),
            );
    }
}

#[allow(clippy::too_many_arguments)]
pub fn handle_plant_requests(
    mut requests: EventReader<PlantRequestEvent>,
    crop_registry: Res<CropRegistry>,
    calendar: Res<Calendar>,
    mut farm: ResMut<FarmState>,
    mut inventory: ResMut<Inventory>,
    mut planted: EventWriter<CropPlantedEvent>,
    mut removed: EventWriter<ItemRemovedEvent>,
    mut toasts: EventWriter<ToastEvent>,
) {
    for ev in requests.read() {
        let Some(def) = crop_registry.by_seed(&ev.seed_id) else {
            warn!("[Farming] '{}' is not a seed", ev.seed_id);
            continue;
        };
        if !inventory.has(&ev.seed_id, 1) {
            toasts.send(ToastEvent::new("You don't have any of those seeds."));
            continue;
        }
        if !farm.plant(ev.x, ev.y, def, calendar.season) {
            toasts.send(ToastEvent::new(format!("Can't plant {} here right now.", def.name)));
            continue;
        }
        inventory.remove_item(&ev.seed_id, 1);
        removed.send(ItemRemovedEvent {
            item_id: ev.seed_id.clone(),
            quantity: 1,
        });
        planted.send(CropPlantedEvent {
            crop_id: def.id.clone(),
            x: ev.x,
            y: ev.y,
        });
        info!("[Farming] Planted {} at ({}, {})", def.name, ev.x, ev.y);
    }
}

pub fn handle_water_requests(
    mut requests: EventReader<WaterRequestEvent>,
    mut water_all: EventReader<WaterAllCropsEvent>,
    mut farm: ResMut<FarmState>,
) {
    for ev in requests.read() {
        farm.water(ev.x, ev.y);
    }
    for _ in water_all.read() {
        let count = farm.water_all();
        info!("[Farming] Watered {} plots at once", count);
    }
}

#[allow(clippy::too_many_arguments)]
pub fn handle_harvest_requests(
    mut requests: EventReader<HarvestRequestEvent>,
    crop_registry: Res<CropRegistry>,
    item_registry: Res<ItemRegistry>,
    mut farm: ResMut<FarmState>,
    mut inventory: ResMut<Inventory>,
    mut harvested: EventWriter<CropHarvestedEvent>,
    mut added: EventWriter<ItemAddedEvent>,
    mut toasts: EventWriter<ToastEvent>,
) {
    for ev in requests.read() {
        let Some(plot) = farm.plot(ev.x, ev.y) else {
            continue;
        };
        if plot.stage != CropStage::Ready {
            continue;
        }
        let Some(def) = crop_registry.get(&plot.crop_id) else {
            continue;
        };
        let Some(produce) = item_registry.get(&def.harvest_id) else {
            warn!("[Farming] Harvest item '{}' is not registered", def.harvest_id);
            continue;
        };
        // Produce must fit before the crop leaves the ground.
        if inventory.room_for(produce) < def.harvest_quantity.max(1) {
            toasts.send(ToastEvent::new("Inventory full!"));
            continue;
        }
        let Some(harvest) = farm.harvest(ev.x, ev.y, &crop_registry) else {
            continue;
        };
        inventory.add_def(produce, harvest.quantity);

        added.send(ItemAddedEvent {
            item_id: harvest.harvest_id.clone(),
            quantity: harvest.quantity,
        });
        harvested.send(CropHarvestedEvent {
            crop_id: harvest.crop_id,
            harvest_id: harvest.harvest_id,
            quantity: harvest.quantity,
            x: ev.x,
            y: ev.y,
        });
    }
}

pub fn on_day_end(
    mut day_end_events: EventReader<DayEndEvent>,
    crop_registry: Res<CropRegistry>,
    calendar: Res<Calendar>,
    mut farm: ResMut<FarmState>,
) {
    for _ in day_end_events.read() {
        // The calendar has already rolled to the new day.
        let report = farm.advance_day(&crop_registry, calendar.season);
        info!(
            "[Farming] Overnight: {} crops ripened, {} withered",
            report.ripened,
            report.withered.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> CropRegistry {
        let mut registry = CropRegistry::default();
        registry.crops.insert(
            "turnip".into(),
            CropDef {
                id: "turnip".into(),
                name: "Turnip".into(),
                seed_id: "turnip_seeds".into(),
                harvest_id: "turnip".into(),
                seasons: vec![Season::Spring],
                growth_days: 2,
                regrows: false,
                regrow_days: 0,
                harvest_quantity: 1,
            },
        );
        registry.crops.insert(
            "tomato".into(),
            CropDef {
                id: "tomato".into(),
                name: "Tomato".into(),
                seed_id: "tomato_seeds".into(),
                harvest_id: "tomato".into(),
                seasons: vec![Season::Spring, Season::Summer],
                growth_days: 1,
                regrows: true,
                regrow_days: 2,
                harvest_quantity: 3,
            },
        );
        registry
    }

    #[test]
    fn test_unwatered_crop_does_not_grow() {
        let registry = registry();
        let mut farm = FarmState::default();
        assert!(farm.plant(0, 0, &registry.crops["turnip"], Season::Spring));
        farm.advance_day(&registry, Season::Spring);
        assert_eq!(farm.plot(0, 0).map(|p| p.days_grown), Some(0));
    }

    #[test]
    fn test_crop_lifecycle_to_harvest() {
        let registry = registry();
        let mut farm = FarmState::default();
        farm.plant(1, 2, &registry.crops["turnip"], Season::Spring);

        assert!(farm.water(1, 2));
        assert!(!farm.water(1, 2));
        farm.advance_day(&registry, Season::Spring);
        assert_eq!(farm.plot(1, 2).map(|p| p.stage), Some(CropStage::Planted));
        assert!(farm.harvest(1, 2, &registry).is_none());

        farm.water(1, 2);
        let report = farm.advance_day(&registry, Season::Spring);
        assert_eq!(report.ripened, 1);

        let harvest = farm.harvest(1, 2, &registry).unwrap();
        assert_eq!(harvest.harvest_id, "turnip");
        assert!(farm.plot(1, 2).is_none());
    }

    #[test]
    fn test_regrowing_crop_stays_planted() {
        let registry = registry();
        let mut farm = FarmState::default();
        farm.plant(0, 0, &registry.crops["tomato"], Season::Summer);
        farm.water_all();
        farm.advance_day(&registry, Season::Summer);
        assert_eq!(farm.harvest(0, 0, &registry).map(|h| h.quantity), Some(3));

        let plot = farm.plot(0, 0).unwrap();
        assert!(plot.regrowing);
        assert_eq!(plot.stage, CropStage::Planted);

        // Regrowth takes regrow_days, not growth_days.
        farm.water_all();
        farm.advance_day(&registry, Season::Summer);
        assert_eq!(farm.plot(0, 0).map(|p| p.stage), Some(CropStage::Planted));
    }

    #[test]
    fn test_out_of_season_rules() {
        let registry = registry();
        let mut farm = FarmState::default();
        assert!(!farm.plant(0, 0, &registry.crops["turnip"], Season::Fall));
        farm.plant(0, 0, &registry.crops["turnip"], Season::Spring);
        assert!(!farm.plant(0, 0, &registry.crops["tomato"], Season::Spring));

        let report = farm.advance_day(&registry, Season::Summer);
        assert_eq!(report.withered, vec![(0, 0)]);
        assert!(farm.plots.is_empty());
    }

    fn item(id: &str, stackable: bool) -> ItemDef {
        ItemDef {
            id: id.into(),
            name: id.into(),
            description: String::new(),
            category: ItemCategory::Crop,
            sell_price: 1,
            buy_price: None,
            stackable,
            max_stack: 99,
            icon: String::new(),
        }
    }

    #[test]
    fn test_harvest_refused_when_inventory_is_full() {
        let crops = registry();
        let mut farm = FarmState::default();
        farm.plant(0, 0, &crops.crops["turnip"], Season::Spring);
        for _ in 0..2 {
            farm.water_all();
            farm.advance_day(&crops, Season::Spring);
        }
        assert_eq!(farm.plot(0, 0).map(|p| p.stage), Some(CropStage::Ready));

        let mut items = ItemRegistry::default();
        items.insert(item("turnip", true));
        items.insert(item("lantern", false));
        let mut inventory = Inventory::with_capacity(1);
        assert!(inventory.add_item(&items, "lantern", 1));

        let mut app = App::new();
        app.insert_resource(crops)
            .insert_resource(items)
            .insert_resource(farm)
            .insert_resource(inventory)
            .add_event::<HarvestRequestEvent>()
            .add_event::<CropHarvestedEvent>()
            .add_event::<ItemAddedEvent>()
            .add_event::<ToastEvent>()
            .add_systems(Update, handle_harvest_requests);
        let farm_before = app.world().resource::<FarmState>().clone();
        let inventory_before = app.world().resource::<Inventory>().clone();

        app.world_mut().send_event(HarvestRequestEvent { x: 0, y: 0 });
        app.update();

        assert_eq!(*app.world().resource::<FarmState>(), farm_before);
        assert_eq!(*app.world().resource::<Inventory>(), inventory_before);
        assert!(app.world().resource::<Events<CropHarvestedEvent>>().is_empty());
        assert!(!app.world().resource::<Events<ToastEvent>>().is_empty());
    }

    #[test]
    fn test_water_all_counts_only_thirsty_plots() {
        let registry = registry();
        let mut farm = FarmState::default();
        farm.plant(0, 0, &registry.crops["turnip"], Season::Spring);
        farm.plant(1, 0, &registry.crops["turnip"], Season::Spring);
        farm.water(0, 0);
        assert_eq!(farm.water_all(), 1);
    }
}
