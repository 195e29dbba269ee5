use bevy::prelude::*;

use crate::save::SessionStartedEvent;
use crate::timers::{Easing, Tween};

const FADE_IN_SECS: f32 = 0.6;

/// Full-screen fade. The host draws a black overlay with `alpha()`.
#[derive(Resource, Debug, Clone, Default)]
pub struct ScreenFade {
    pub tween: Option<Tween>,
}

impl ScreenFade {
    /// Current opacity, 0.0 (transparent) to 1.0 (opaque black).
    pub fn alpha(&self) -> f32 {
        self.tween.as_ref().map_or(0.0, Tween::value)
    }

    pub fn is_active(&self) -> bool {
        self.tween.is_some()
    }

    pub fn fade_in(&mut self) {
        self.tween = Some(Tween::new(1.0, 0.0, FADE_IN_SECS, Easing::EaseOut));
    }
}

/// A fresh or restored session starts behind black and fades in.
pub fn trigger_fade_on_session_start(
    mut events: EventReader<SessionStartedEvent>,
    mut fade: ResMut<ScreenFade>,
) {
    if events.read().last().is_some() {
        fade.fade_in();
    }
}

pub fn update_fade(time: Res<Time>, mut fade: ResMut<ScreenFade>) {
    let Some(tween) = fade.tween.as_mut() else {
        return;
    };
    tween.tick(time.delta_secs());
    if tween.is_finished() {
        fade.tween = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fade_runs_from_black_to_clear() {
        let mut fade = ScreenFade::default();
        assert_eq!(fade.alpha(), 0.0);
        fade.fade_in();
        assert_eq!(fade.alpha(), 1.0);
        if let Some(tween) = fade.tween.as_mut() {
            tween.tick(FADE_IN_SECS);
        }
        assert_eq!(fade.alpha(), 0.0);
    }
}
