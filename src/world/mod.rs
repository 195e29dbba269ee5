//! World domain — waypoints and fast travel.
//!
//! The player can only travel to waypoints they have already discovered.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::save::{AppSaveExt, Saveable};
use crate::shared::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaypointDef {
    pub id: WaypointId,
    pub name: String,
    pub region: String,
}

#[derive(Resource, Debug, Clone, Default)]
pub struct WaypointRegistry {
    pub waypoints: HashMap<WaypointId, WaypointDef>,
}

// ═══════════════════════════════════════════════════════════════════════
// RESOURCES
// ═══════════════════════════════════════════════════════════════════════

#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WaypointLog {
    pub discovered: Vec<WaypointId>,
    pub current: Option<WaypointId>,
}

impl WaypointLog {
    pub fn is_discovered(&self, id: &str) -> bool {
        self.discovered.iter().any(|w| w == id)
    }

    pub fn discover(&mut self, id: &str) -> bool {
        if self.is_discovered(id) {
            return false;
        }
        self.discovered.push(id.to_string());
        true
    }

    pub fn travel_to(&mut self, id: &str) -> bool {
        if !self.is_discovered(id) {
            warn!("[World] Cannot travel to undiscovered waypoint '{}'", id);
            return false;
        }
        if self.current.as_deref() == Some(id) {
            return false;
        }
        self.current = Some(id.to_string());
        true
    }
}

impl Saveable for WaypointLog {
    const SAVE_KEY: &'static str = "waypoints";
}

// ═══════════════════════════════════════════════════════════════════════
// EVENTS
// ═══════════════════════════════════════════════════════════════════════

#[derive(Event, Debug, Clone)]
pub struct WaypointDiscoveredEvent {
    pub waypoint_id: WaypointId,
}

#[derive(Event, Debug, Clone)]
pub struct FastTravelRequestEvent {
    pub waypoint_id: WaypointId,
}

/// The player arrived somewhere by fast travel. The host moves the camera.
#[derive(Event, Debug, Clone)]
pub struct FastTravelEvent {
    pub from: Option<WaypointId>,
    pub to: WaypointId,
}

// ═══════════════════════════════════════════════════════════════════════
// PLUGIN
// ═══════════════════════════════════════════════════════════════════════

pub struct WorldPlugin;

impl Plugin for WorldPlugin {
    fn build(&self, app: &mut App) {
        app.register_saveable::<WaypointLog>()
            .init_resource::<WaypointRegistry>()
            .add_event::<DiscoverWaypointEvent>()
            .add_event::<WaypointDiscoveredEvent>()
            .add_event::<FastTravelRequestEvent>()
            .add_event::<FastTravelEvent>()
            .add_systems(
                Update,
                (handle_discover_waypoint, handle_fast_travel)
                    .chain()
                    .run_if(in_state(GameState::Playing)),
            );
    }
}

pub fn handle_discover_waypoint(
    mut events: EventReader<DiscoverWaypointEvent>,
    registry: Res<WaypointRegistry>,
    mut log: ResMut<WaypointLog>,
    mut discovered: EventWriter<WaypointDiscoveredEvent>,
    mut toasts: EventWriter<ToastEvent>,
) {
    for ev in events.read() {
        let Some(def) = registry.waypoints.get(&ev.waypoint_id) else {
            warn!("[World] Unknown waypoint '{}'", ev.waypoint_id);
            continue;
        };
        if log.discover(&def.id) {
            info!("[World] Discovered {} ({})", def.name, def.region);
            toasts.send(ToastEvent::new(format!("Discovered {}!", def.name)));
            discovered.send(WaypointDiscoveredEvent {
                waypoint_id: def.id.clone(),
            });
        }
    }
}

pub fn handle_fast_travel(
    mut events: EventReader<FastTravelRequestEvent>,
    mut log: ResMut<WaypointLog>,
    mut travel: EventWriter<FastTravelEvent>,
    mut toasts: EventWriter<ToastEvent>,
) {
    for ev in events.read() {
        let from = log.current.clone();
        if log.travel_to(&ev.waypoint_id) {
            travel.send(FastTravelEvent {
                from,
                to: ev.waypoint_id.clone(),
            });
        } else if !log.is_discovered(&ev.waypoint_id) {
            toasts.send(ToastEvent::new("You haven't been there yet."));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_travel_requires_discovery() {
        let mut log = WaypointLog::default();
        assert!(!log.travel_to("lighthouse"));
        assert!(log.discover("lighthouse"));
        assert!(!log.discover("lighthouse"));
        assert!(log.travel_to("lighthouse"));
        assert_eq!(log.current.as_deref(), Some("lighthouse"));
        // Already there.
        assert!(!log.travel_to("lighthouse"));
    }
}
