use bevy::prelude::*;

use crate::shared::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    Inventory,
    Crafting,
    Shop,
    Journal,
    Map,
    PauseMenu,
}

/// At most one panel is open at a time.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenPanel(pub Option<Panel>);

#[derive(Event, Debug, Clone, Copy)]
pub struct TogglePanelEvent(pub Panel);

impl OpenPanel {
    pub fn is_open(&self, panel: Panel) -> bool {
        self.0 == Some(panel)
    }

    /// Opens `panel`, or closes it when it is already open. Returns whether
    /// it is open afterwards.
    pub fn toggle(&mut self, panel: Panel) -> bool {
        if self.is_open(panel) {
            self.0 = None;
            false
        } else {
            self.0 = Some(panel);
            true
        }
    }
}

pub fn handle_panel_toggles(
    mut events: EventReader<TogglePanelEvent>,
    state: Res<State<GameState>>,
    mut open: ResMut<OpenPanel>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    for TogglePanelEvent(panel) in events.read().copied() {
        // The pause menu is modal.
        if *state.get() == GameState::Paused && panel != Panel::PauseMenu {
            continue;
        }
        let now_open = open.toggle(panel);
        debug!("[UI] {:?} {}", panel, if now_open { "opened" } else { "closed" });
        if panel == Panel::PauseMenu {
            next_state.set(if now_open {
                GameState::Paused
            } else {
                GameState::Playing
            });
        }
    }
}

/// Returning to the title screen closes everything.
pub fn close_panels_on_menu(mut open: ResMut<OpenPanel>) {
    open.0 = None;
}

/// A load issued from the pause menu resumes play without a toggle.
pub fn close_pause_menu_on_resume(mut open: ResMut<OpenPanel>) {
    if open.is_open(Panel::PauseMenu) {
        open.0 = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_replaces_and_closes() {
        let mut open = OpenPanel::default();
        assert!(open.toggle(Panel::Inventory));
        assert!(open.toggle(Panel::Journal));
        assert!(!open.is_open(Panel::Inventory));
        assert!(!open.toggle(Panel::Journal));
        assert_eq!(open.0, None);
    }
}
