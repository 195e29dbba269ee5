//! Shops: buy from a listing, sell anything with a sell price.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::gold::format_gold;
use crate::inventory::Inventory;
use crate::shared::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopListing {
    pub item_id: ItemId,
    pub price: u32,
    #[serde(default)]
    pub season: Option<Season>, // None = always
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopDef {
    pub id: String,
    pub name: String,
    pub listings: Vec<ShopListing>,
}

impl ShopDef {
    /// The listing for `item_id` if it is on sale this season.
    pub fn listing(&self, item_id: &str, season: Season) -> Option<&ShopListing> {
        self.listings
            .iter()
            .find(|l| l.item_id == item_id && l.season.map_or(true, |s| s == season))
    }
}

#[derive(Resource, Debug, Clone, Default)]
pub struct ShopRegistry {
    pub shops: HashMap<String, ShopDef>,
}

#[derive(Event, Debug, Clone)]
pub struct BuyRequestEvent {
    pub shop_id: String,
    pub item_id: ItemId,
    pub quantity: u32,
}

#[derive(Event, Debug, Clone)]
pub struct SellRequestEvent {
    pub item_id: ItemId,
    pub quantity: u32,
}

#[derive(Event, Debug, Clone)]
pub struct ShopTransactionEvent {
    pub item_id: ItemId,
    pub quantity: u32,
    pub total: u32,
    pub is_purchase: bool,
}

/// Processes BuyRequestEvents. Gold is debited through GoldChangeEvent.
#[allow(clippy::too_many_arguments)]
pub fn handle_buy(
    mut buy_events: EventReader<BuyRequestEvent>,
    player_state: Res<PlayerState>,
    calendar: Res<Calendar>,
    shops: Res<ShopRegistry>,
    item_registry: Res<ItemRegistry>,
    mut inventory: ResMut<Inventory>,
    mut gold_writer: EventWriter<GoldChangeEvent>,
    mut added_writer: EventWriter<ItemAddedEvent>,
    mut transaction_writer: EventWriter<ShopTransactionEvent>,
    mut toasts: EventWriter<ToastEvent>,
) {
    // Purchases earlier in this frame have not hit PlayerState yet.
    let mut available = player_state.gold;

    for ev in buy_events.read() {
        let Some(shop) = shops.shops.get(&ev.shop_id) else {
            warn!("[Economy] Buy failed: unknown shop '{}'", ev.shop_id);
            continue;
        };
        let Some(item_def) = item_registry.get(&ev.item_id) else {
            warn!("[Economy] Buy failed: unknown item '{}'", ev.item_id);
            continue;
        };
        let Some(listing) = shop.listing(&ev.item_id, calendar.season) else {
            warn!(
                "[Economy] Buy failed: '{}' not sold at {} in {:?}",
                ev.item_id, shop.name, calendar.season
            );
            continue;
        };

        let quantity = ev.quantity.max(1);
        let total_cost = listing.price.saturating_mul(quantity);

        if available < total_cost {
            info!(
                "[Economy] Cannot afford {} x '{}' (need {}g, have {}g)",
                quantity, ev.item_id, total_cost, available
            );
            toasts.send(ToastEvent::new("Not enough gold."));
            continue;
        }

        if !inventory.add_def(item_def, quantity) {
            toasts.send(ToastEvent::new("Not enough inventory space."));
            continue;
        }
        available -= total_cost;

        gold_writer.send(GoldChangeEvent {
            amount: -(total_cost.min(i32::MAX as u32) as i32),
            reason: format!("Bought {} x {}", quantity, item_def.name),
        });
        added_writer.send(ItemAddedEvent {
            item_id: ev.item_id.clone(),
            quantity,
        });
        transaction_writer.send(ShopTransactionEvent {
            item_id: ev.item_id.clone(),
            quantity,
            total: total_cost,
            is_purchase: true,
        });
        info!(
            "[Economy] Bought {} x '{}' for {}",
            quantity,
            ev.item_id,
            format_gold(total_cost)
        );
    }
}

/// Processes SellRequestEvents. Items sell at their base sell_price.
pub fn handle_sell(
    mut sell_events: EventReader<SellRequestEvent>,
    item_registry: Res<ItemRegistry>,
    mut inventory: ResMut<Inventory>,
    mut gold_writer: EventWriter<GoldChangeEvent>,
    mut removed_writer: EventWriter<ItemRemovedEvent>,
    mut transaction_writer: EventWriter<ShopTransactionEvent>,
    mut toasts: EventWriter<ToastEvent>,
) {
    for ev in sell_events.read() {
        let Some(item_def) = item_registry.get(&ev.item_id) else {
            warn!("[Economy] Sell failed: unknown item '{}'", ev.item_id);
            continue;
        };
        if item_def.sell_price == 0 {
            toasts.send(ToastEvent::new(format!("{} can't be sold.", item_def.name)));
            continue;
        }

        let quantity = ev.quantity.max(1);
        if !inventory.remove_item(&ev.item_id, quantity) {
            toasts.send(ToastEvent::new(format!("You don't have {} {}.", quantity, item_def.name)));
            continue;
        }

        let total_earned = item_def.sell_price.saturating_mul(quantity);
        gold_writer.send(GoldChangeEvent {
            amount: total_earned.min(i32::MAX as u32) as i32,
            reason: format!("Sold {} x {}", quantity, item_def.name),
        });
        removed_writer.send(ItemRemovedEvent {
            item_id: ev.item_id.clone(),
            quantity,
        });
        transaction_writer.send(ShopTransactionEvent {
            item_id: ev.item_id.clone(),
            quantity,
            total: total_earned,
            is_purchase: false,
        });
        info!(
            "[Economy] Sold {} x '{}' for {}",
            quantity,
            ev.item_id,
            format_gold(total_earned)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shop() -> ShopDef {
        ShopDef {
            id: "general_store".into(),
            name: "General Store".into(),
            listings: vec![
                ShopListing {
                    item_id: "turnip_seeds".into(),
                    price: 20,
                    season: Some(Season::Spring),
                },
                ShopListing {
                    item_id: "fertilizer".into(),
                    price: 10,
                    season: None,
                },
            ],
        }
    }

    fn item(id: &str, sell_price: u32, stackable: bool) -> ItemDef {
        ItemDef {
            id: id.into(),
            name: id.into(),
            description: String::new(),
            category: ItemCategory::Material,
            sell_price,
            buy_price: None,
            stackable,
            max_stack: 99,
            icon: String::new(),
        }
    }

    /// Shop systems over a one-slot inventory already holding a keepsake.
    fn shop_app() -> App {
        let mut items = ItemRegistry::default();
        items.insert(item("turnip_seeds", 10, true));
        items.insert(item("fertilizer", 5, true));
        items.insert(item("keepsake", 0, false));
        let mut inventory = Inventory::with_capacity(1);
        assert!(inventory.add_item(&items, "keepsake", 1));
        let mut shops = ShopRegistry::default();
        shops.shops.insert("general_store".into(), shop());

        let mut app = App::new();
        app.insert_resource(items)
            .insert_resource(inventory)
            .insert_resource(shops)
            .insert_resource(PlayerState::default())
            .insert_resource(Calendar::default())
            .add_event::<BuyRequestEvent>()
            .add_event::<SellRequestEvent>()
            .add_event::<GoldChangeEvent>()
            .add_event::<ItemAddedEvent>()
            .add_event::<ItemRemovedEvent>()
            .add_event::<ShopTransactionEvent>()
            .add_event::<ToastEvent>()
            .add_systems(Update, (handle_buy, handle_sell));
        app
    }

    fn assert_untouched(app: &mut App, before: &Inventory) {
        assert_eq!(app.world().resource::<Inventory>(), before);
        let gold: Vec<GoldChangeEvent> = app
            .world_mut()
            .resource_mut::<Events<GoldChangeEvent>>()
            .drain()
            .collect();
        assert!(gold.is_empty());
        let transactions = app.world().resource::<Events<ShopTransactionEvent>>();
        assert!(transactions.is_empty());
        assert!(!app.world().resource::<Events<ToastEvent>>().is_empty());
    }

    #[test]
    fn test_buy_without_space_changes_nothing() {
        let mut app = shop_app();
        let before = app.world().resource::<Inventory>().clone();
        app.world_mut().send_event(BuyRequestEvent {
            shop_id: "general_store".into(),
            item_id: "turnip_seeds".into(),
            quantity: 1,
        });
        app.update();
        assert_untouched(&mut app, &before);
    }

    #[test]
    fn test_selling_more_than_owned_changes_nothing() {
        let mut app = shop_app();
        let before = app.world().resource::<Inventory>().clone();
        app.world_mut().send_event(SellRequestEvent {
            item_id: "fertilizer".into(),
            quantity: 3,
        });
        app.update();
        assert_untouched(&mut app, &before);
    }

    #[test]
    fn test_unsellable_item_is_kept() {
        let mut app = shop_app();
        let before = app.world().resource::<Inventory>().clone();
        app.world_mut().send_event(SellRequestEvent {
            item_id: "keepsake".into(),
            quantity: 1,
        });
        app.update();
        assert_untouched(&mut app, &before);
        assert_eq!(app.world().resource::<Inventory>().count("keepsake"), 1);
    }

    #[test]
    fn test_seasonal_listing_only_in_season() {
        let shop = shop();
        assert!(shop.listing("turnip_seeds", Season::Spring).is_some());
        assert!(shop.listing("turnip_seeds", Season::Winter).is_none());
        assert!(shop.listing("fertilizer", Season::Winter).is_some());
        assert!(shop.listing("diamond", Season::Spring).is_none());
    }
}
