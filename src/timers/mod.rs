//! Timer queue and tween primitives.
//!
//! One system owns the `TimerQueue` and advances it once per frame while the
//! game is playing. Timers are cancelled by removing them from the queue, so a
//! cancelled timer can never fire. `Tween` is a plain value interpolator for
//! fades and slides; whoever holds one ticks it.

use bevy::prelude::*;
use std::time::Duration;

use crate::shared::*;

/// Shortest period a repeating timer may have.
const MIN_REPEAT_SECS: f32 = 0.001;

// ═══════════════════════════════════════════════════════════════════════
// TIMER QUEUE
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone)]
struct ScheduledTimer {
    handle: TimerHandle,
    tag: String,
    timer: Timer,
}

/// A timer that completed during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredTimer {
    pub handle: TimerHandle,
    pub tag: String,
}

#[derive(Resource, Debug, Default)]
pub struct TimerQueue {
    next_id: u64,
    timers: Vec<ScheduledTimer>,
}

impl TimerQueue {
    /// Fires once after `secs`, then leaves the queue.
    pub fn once(&mut self, tag: impl Into<String>, secs: f32) -> TimerHandle {
        self.push(tag.into(), Timer::from_seconds(secs.max(0.0), TimerMode::Once))
    }

    /// Fires every `secs` until cancelled.
    pub fn repeating(&mut self, tag: impl Into<String>, secs: f32) -> TimerHandle {
        self.push(
            tag.into(),
            Timer::from_seconds(secs.max(MIN_REPEAT_SECS), TimerMode::Repeating),
        )
    }

    fn push(&mut self, tag: String, timer: Timer) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.timers.push(ScheduledTimer { handle, tag, timer });
        handle
    }

    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.handle != handle);
        self.timers.len() != before
    }

    /// Cancels every timer carrying `tag`. Returns how many were removed.
    pub fn cancel_tag(&mut self, tag: &str) -> usize {
        let before = self.timers.len();
        self.timers.retain(|t| t.tag != tag);
        before - self.timers.len()
    }

    pub fn is_scheduled(&self, handle: TimerHandle) -> bool {
        self.timers.iter().any(|t| t.handle == handle)
    }

    pub fn remaining(&self, handle: TimerHandle) -> Option<Duration> {
        self.timers
            .iter()
            .find(|t| t.handle == handle)
            .map(|t| t.timer.remaining())
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Advances every timer by `delta` and returns the ones that fired, in
    /// scheduling order. A repeating timer appears once per elapsed period.
    pub fn tick(&mut self, delta: Duration) -> Vec<FiredTimer> {
        let mut fired = Vec::new();
        for scheduled in self.timers.iter_mut() {
            scheduled.timer.tick(delta);
            for _ in 0..scheduled.timer.times_finished_this_tick() {
                fired.push(FiredTimer {
                    handle: scheduled.handle,
                    tag: scheduled.tag.clone(),
                });
            }
        }
        self.timers
            .retain(|t| !(t.timer.mode() == TimerMode::Once && t.timer.finished()));
        fired
    }
}

#[derive(Event, Debug, Clone)]
pub struct TimerFinishedEvent {
    pub handle: TimerHandle,
    pub tag: String,
}

// ═══════════════════════════════════════════════════════════════════════
// TWEEN
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl Easing {
    /// Maps linear progress `t` in `[0, 1]` onto the curve.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => t * (2.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tween {
    pub from: f32,
    pub to: f32,
    pub duration_secs: f32,
    pub elapsed_secs: f32,
    pub easing: Easing,
}

impl Tween {
    pub fn new(from: f32, to: f32, duration_secs: f32, easing: Easing) -> Self {
        Self {
            from,
            to,
            duration_secs: duration_secs.max(0.0),
            elapsed_secs: 0.0,
            easing,
        }
    }

    pub fn progress(&self) -> f32 {
        if self.duration_secs <= 0.0 {
            1.0
        } else {
            (self.elapsed_secs / self.duration_secs).clamp(0.0, 1.0)
        }
    }

    pub fn value(&self) -> f32 {
        self.from + (self.to - self.from) * self.easing.apply(self.progress())
    }

    /// Advances by `dt` seconds and returns the new value.
    pub fn tick(&mut self, dt: f32) -> f32 {
        self.elapsed_secs = (self.elapsed_secs + dt.max(0.0)).min(self.duration_secs);
        self.value()
    }

    pub fn is_finished(&self) -> bool {
        self.progress() >= 1.0
    }
}

// ═══════════════════════════════════════════════════════════════════════
// PLUGIN
// ═══════════════════════════════════════════════════════════════════════

pub struct TimersPlugin;

impl Plugin for TimersPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TimerQueue>()
            .add_event::<TimerFinishedEvent>()
            .add_systems(
                Update,
                tick_timer_queue.run_if(in_state(GameState::Playing)),
            );
    }
}

pub fn tick_timer_queue(
    time: Res<Time>,
    mut queue: ResMut<TimerQueue>,
    mut finished: EventWriter<TimerFinishedEvent>,
) {
    for fired in queue.tick(time.delta()) {
        debug!("[Timers] '{}' fired", fired.tag);
        finished.send(TimerFinishedEvent {
            handle: fired.handle,
            tag: fired.tag,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_once_timer_fires_then_leaves_queue() {
        let mut queue = TimerQueue::default();
        let handle = queue.once("fade", 1.0);

        assert!(queue.tick(Duration::from_millis(600)).is_empty());
        let fired = queue.tick(Duration::from_millis(600));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].handle, handle);
        assert_eq!(fired[0].tag, "fade");
        assert!(!queue.is_scheduled(handle));
        assert!(queue.tick(Duration::from_secs(5)).is_empty());
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let mut queue = TimerQueue::default();
        let handle = queue.once("toast", 0.5);
        assert!(queue.cancel(handle));
        assert!(!queue.cancel(handle));
        assert!(queue.tick(Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn test_repeating_timer_fires_once_per_period() {
        let mut queue = TimerQueue::default();
        let handle = queue.repeating("autosave", 1.0);
        let fired = queue.tick(Duration::from_millis(3500));
        assert_eq!(fired.len(), 3);
        assert!(queue.is_scheduled(handle));
        assert_eq!(queue.tick(Duration::from_millis(500)).len(), 1);
    }

    #[test]
    fn test_cancel_tag_removes_only_matching() {
        let mut queue = TimerQueue::default();
        queue.once("a", 1.0);
        queue.once("a", 2.0);
        let b = queue.once("b", 1.0);
        assert_eq!(queue.cancel_tag("a"), 2);
        assert_eq!(queue.len(), 1);
        assert!(queue.is_scheduled(b));
    }

    #[test]
    fn test_tween_linear_and_clamped() {
        let mut tween = Tween::new(1.0, 0.0, 2.0, Easing::Linear);
        assert!((tween.tick(1.0) - 0.5).abs() < 1e-6);
        assert!((tween.tick(5.0) - 0.0).abs() < 1e-6);
        assert!(tween.is_finished());
    }

    #[test]
    fn test_zero_length_tween_is_finished() {
        let tween = Tween::new(0.0, 10.0, 0.0, Easing::EaseInOut);
        assert!(tween.is_finished());
        assert_eq!(tween.value(), 10.0);
    }

    #[test]
    fn test_easing_endpoints() {
        for easing in [Easing::Linear, Easing::EaseIn, Easing::EaseOut, Easing::EaseInOut] {
            assert!(easing.apply(0.0).abs() < 1e-6);
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-6);
        }
    }
}
