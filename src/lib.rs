//! Willowbrook gameplay core.
//!
//! Every domain is a Bevy plugin that owns one or more manager resources
//! and reacts to request events. `WillowbrookPlugin` wires them all up
//! without any rendering, windowing or audio, so the same crate drives a
//! windowed host and the headless tests in `tests/`.
//!
//! The host must provide `StatesPlugin` (included in `DefaultPlugins`) and
//! some time source (`MinimalPlugins` is enough).

pub mod shared;
pub mod config;
pub mod timers;
pub mod calendar;
pub mod inventory;
pub mod economy;
pub mod farming;
pub mod crafting;
pub mod relationships;
pub mod quests;
pub mod dialogue;
pub mod magic;
pub mod achievements;
pub mod world;
pub mod minigames;
pub mod ui;
pub mod settings;
pub mod save;
pub mod data;

use bevy::prelude::*;

use shared::*;

pub struct WillowbrookPlugin;

impl Plugin for WillowbrookPlugin {
    fn build(&self, app: &mut App) {
        app
            // Game state
            .init_state::<GameState>()
            // Shared resources
            .init_resource::<ItemRegistry>()
            // Cross-domain events
            .add_event::<GrantItemEvent>()
            .add_event::<ItemAddedEvent>()
            .add_event::<ItemRemovedEvent>()
            .add_event::<GoldChangeEvent>()
            .add_event::<ToastEvent>()
            .add_event::<DayEndEvent>()
            .add_event::<SeasonChangeEvent>()
            .add_event::<CropHarvestedEvent>()
            .add_event::<GiftGivenEvent>()
            .add_event::<NpcTalkedEvent>()
            .add_event::<FriendshipChangeEvent>()
            .add_event::<FishCaughtEvent>()
            .add_event::<MineralMinedEvent>()
            .add_event::<ItemCraftedEvent>()
            .add_event::<UnlockRecipeEvent>()
            .add_event::<StartQuestEvent>()
            .add_event::<QuestStartedEvent>()
            .add_event::<QuestCompletedEvent>()
            .add_event::<LearnSpellEvent>()
            .add_event::<SpellCastEvent>()
            .add_event::<WaterAllCropsEvent>()
            .add_event::<DiscoverWaypointEvent>()
            .add_event::<AchievementUnlockedEvent>()
            // Config first: the save plugin reads it while building.
            .add_plugins(config::ConfigPlugin)
            .add_plugins(timers::TimersPlugin)
            // Domain plugins
            .add_plugins((
                calendar::CalendarPlugin,
                inventory::InventoryPlugin,
                economy::EconomyPlugin,
                farming::FarmingPlugin,
                crafting::CraftingPlugin,
                relationships::RelationshipsPlugin,
                quests::QuestPlugin,
                dialogue::DialoguePlugin,
                magic::MagicPlugin,
                achievements::AchievementsPlugin,
                world::WorldPlugin,
                minigames::MinigamesPlugin,
            ))
            .add_plugins(ui::UiPlugin)
            .add_plugins(settings::SettingsPlugin)
            .add_plugins(save::SavePlugin)
            // Data loading
            .add_plugins(data::DataPlugin);
    }
}
