//! Timing-bar minigames: fishing and mining.
//!
//! Both games share one mechanic. A marker oscillates across a bar and the
//! player presses while it sits inside a target zone:
//!
//!  [░░░░░░░▓▓▓▓░░░░░░]
//!         ^zone   ^marker bounces between 0.0 and 1.0
//!
//! The bar is ticked every frame; each press is checked once.

pub mod fishing;
pub mod mining;

use bevy::prelude::*;

use crate::shared::*;

pub use fishing::{select_fish, FishDef, FishRegistry, FishingOutcome, FishingSession};
pub use mining::{MineralNodeDef, MineralRegistry, MiningOutcome, MiningSession};

// ═══════════════════════════════════════════════════════════════════════
// TIMING BAR
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct TimingBar {
    /// Position along the bounce cycle in `[0, 2)`. The marker sits at
    /// `phase` going right and at `2 - phase` coming back.
    phase: f32,
    /// Bar widths per second.
    pub speed: f32,
    pub zone_start: f32,
    pub zone_width: f32,
}

impl TimingBar {
    pub fn new(speed: f32, zone_start: f32, zone_width: f32) -> Self {
        let zone_width = zone_width.clamp(0.01, 1.0);
        Self {
            phase: 0.0,
            speed: speed.max(0.0),
            zone_start: zone_start.clamp(0.0, 1.0 - zone_width),
            zone_width,
        }
    }

    pub fn position(&self) -> f32 {
        let p = if self.phase <= 1.0 {
            self.phase
        } else {
            2.0 - self.phase
        };
        p.clamp(0.0, 1.0)
    }

    pub fn tick(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 || !self.speed.is_finite() {
            return;
        }
        self.phase = (self.phase + self.speed * dt).rem_euclid(2.0);
    }

    pub fn in_zone(&self) -> bool {
        let pos = self.position();
        pos >= self.zone_start && pos <= self.zone_start + self.zone_width
    }
}

// ═══════════════════════════════════════════════════════════════════════
// ACTIVE GAME
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub enum Minigame {
    Fishing(FishingSession),
    Mining(MiningSession),
}

#[derive(Resource, Debug, Default)]
pub struct ActiveMinigame(pub Option<Minigame>);

impl ActiveMinigame {
    pub fn is_running(&self) -> bool {
        self.0.is_some()
    }

    pub fn bar(&self) -> Option<&TimingBar> {
        match self.0.as_ref()? {
            Minigame::Fishing(session) => Some(&session.bar),
            Minigame::Mining(session) => Some(&session.bar),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// EVENTS
// ═══════════════════════════════════════════════════════════════════════

#[derive(Event, Debug, Clone, Default)]
pub struct StartFishingEvent;

/// One press of the reel button.
#[derive(Event, Debug, Clone, Default)]
pub struct ReelEvent;

#[derive(Event, Debug, Clone)]
pub struct StartMiningEvent {
    pub node_id: String,
}

#[derive(Event, Debug, Clone, Default)]
pub struct StrikeEvent;

#[derive(Event, Debug, Clone)]
pub struct MinigameEndedEvent {
    pub success: bool,
}

// ═══════════════════════════════════════════════════════════════════════
// PLUGIN
// ═══════════════════════════════════════════════════════════════════════

pub struct MinigamesPlugin;

impl Plugin for MinigamesPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ActiveMinigame>()
            .init_resource::<FishRegistry>()
            .init_resource::<MineralRegistry>()
            .add_event::<StartFishingEvent>()
            .add_event::<ReelEvent>()
            .add_event::<StartMiningEvent>()
            .add_event::<StrikeEvent>()
            .add_event::<MinigameEndedEvent>()
            .add_event::<FishCaughtEvent>()
            .add_event::<MineralMinedEvent>()
            .add_systems(
                Update,
                (
                    fishing::handle_start_fishing,
                    mining::handle_start_mining,
                    tick_timing_bar,
                    fishing::handle_reel,
                    mining::handle_strike,
                )
                    .chain()
                    .run_if(in_state(GameState::Playing)),
            )
            .add_systems(OnExit(GameState::Playing), abandon_on_exit);
    }
}

pub fn tick_timing_bar(time: Res<Time>, mut active: ResMut<ActiveMinigame>) {
    let dt = time.delta_secs();
    match active.0.as_mut() {
        Some(Minigame::Fishing(session)) => session.bar.tick(dt),
        Some(Minigame::Mining(session)) => session.bar.tick(dt),
        None => {}
    }
}

/// Pausing or leaving play drops whatever game was running.
fn abandon_on_exit(mut active: ResMut<ActiveMinigame>) {
    if active.0.take().is_some() {
        debug!("[Minigames] Session abandoned on state exit");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_bar_bounces_back() {
        let mut bar = TimingBar::new(1.0, 0.4, 0.2);
        bar.tick(0.75);
        assert!((bar.position() - 0.75).abs() < 1e-5);
        bar.tick(0.5);
        assert!((bar.position() - 0.75).abs() < 1e-5);
    }

    #[test]
    fn test_bar_stays_in_bounds() {
        let mut rng = rand::thread_rng();
        let mut bar = TimingBar::new(3.7, 0.3, 0.1);
        for _ in 0..10_000 {
            bar.tick(rng.gen_range(0.0..2.0));
            let pos = bar.position();
            assert!((0.0..=1.0).contains(&pos), "position {pos} out of bounds");
        }
        bar.tick(f32::NAN);
        bar.tick(-5.0);
        bar.tick(f32::INFINITY);
        assert!((0.0..=1.0).contains(&bar.position()));
    }

    #[test]
    fn test_zone_is_clamped_inside_bar() {
        let bar = TimingBar::new(1.0, 0.95, 0.2);
        assert!(bar.zone_start + bar.zone_width <= 1.0 + f32::EPSILON);
    }
}
