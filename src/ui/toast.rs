use bevy::prelude::*;
use std::collections::VecDeque;

use crate::config::GameConfig;
use crate::shared::*;

// ═══════════════════════════════════════════════════════════════════════
// QUEUE
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveToast {
    pub message: String,
    pub remaining_secs: f32,
}

/// Floating messages currently on screen, oldest first.
#[derive(Resource, Debug, Clone, Default)]
pub struct ToastQueue {
    pub visible: VecDeque<ActiveToast>,
}

impl ToastQueue {
    /// Pushes a toast, dropping the oldest ones once `max_visible` is reached.
    pub fn push(&mut self, message: String, secs: f32, max_visible: usize) {
        let max_visible = max_visible.max(1);
        while self.visible.len() >= max_visible {
            self.visible.pop_front();
        }
        self.visible.push_back(ActiveToast {
            message,
            remaining_secs: secs,
        });
    }

    pub fn tick(&mut self, dt: f32) {
        for toast in self.visible.iter_mut() {
            toast.remaining_secs -= dt;
        }
        self.visible.retain(|t| t.remaining_secs > 0.0);
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.visible.iter().map(|t| t.message.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// SYSTEMS
// ═══════════════════════════════════════════════════════════════════════

pub fn handle_toast_events(
    mut events: EventReader<ToastEvent>,
    config: Res<GameConfig>,
    mut queue: ResMut<ToastQueue>,
) {
    for event in events.read() {
        let secs = if event.duration_secs > 0.0 {
            event.duration_secs
        } else {
            config.toast_secs
        };
        queue.push(event.message.clone(), secs, config.max_toasts);
    }
}

pub fn tick_toasts(time: Res<Time>, mut queue: ResMut<ToastQueue>) {
    if !queue.visible.is_empty() {
        queue.tick(time.delta_secs());
    }
}
