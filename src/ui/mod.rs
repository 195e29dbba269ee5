//! Headless UI state: toasts, panels and the screen fade.
//!
//! Nothing here draws. A host renderer reads `ToastQueue`, `OpenPanel` and
//! `ScreenFade` each frame and lays them out however it likes.

mod panels;
mod toast;
mod transitions;

pub use panels::{OpenPanel, Panel, TogglePanelEvent};
pub use toast::{ActiveToast, ToastQueue};
pub use transitions::ScreenFade;

use bevy::prelude::*;
use crate::shared::*;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ToastQueue>()
            .init_resource::<OpenPanel>()
            .init_resource::<ScreenFade>()
            .add_event::<ToastEvent>()
            .add_event::<TogglePanelEvent>();

        // ─── TOASTS & FADE — always running ───
        app.add_systems(
            Update,
            (
                toast::handle_toast_events,
                toast::tick_toasts,
                transitions::trigger_fade_on_session_start,
                transitions::update_fade,
            )
                .chain(),
        );

        // ─── PANELS ───
        app.add_systems(
            Update,
            panels::handle_panel_toggles
                .run_if(in_state(GameState::Playing).or(in_state(GameState::Paused))),
        );
        app.add_systems(OnEnter(GameState::MainMenu), panels::close_panels_on_menu);
        app.add_systems(OnEnter(GameState::Playing), panels::close_pause_menu_on_resume);
    }
}
