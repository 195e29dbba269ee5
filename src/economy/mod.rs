//! Economy domain — gold and shops.
//!
//! Gold only moves through `GoldChangeEvent`; `apply_gold_changes` is the
//! single writer and runs after every handler that emits the event.

use bevy::prelude::*;
use crate::shared::*;

pub mod gold;
pub mod shop;

pub use gold::{apply_gold_changes, format_gold};
pub use shop::{
    BuyRequestEvent, SellRequestEvent, ShopDef, ShopListing, ShopRegistry, ShopTransactionEvent,
};

use shop::{handle_buy, handle_sell};

// ─────────────────────────────────────────────────────────────────────────────
// Plugin
// ─────────────────────────────────────────────────────────────────────────────

pub struct EconomyPlugin;

impl Plugin for EconomyPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ShopRegistry>()
            .add_event::<GoldChangeEvent>()
            .add_event::<BuyRequestEvent>()
            .add_event::<SellRequestEvent>()
            .add_event::<ShopTransactionEvent>()
            .add_systems(
                Update,
                (
                    (handle_buy, handle_sell),
                    // Gold change events can arrive from any domain at any time.
                    apply_gold_changes,
                )
                    .chain()
                    .run_if(in_state(GameState::Playing)),
            );
    }
}
