//! Calendar domain — days, seasons and years.
//!
//! The day only ends when something asks it to (the player going to bed).
//! `process_day_end` announces the day that just finished, then advances the
//! calendar and refills the player's stamina for the morning.

use bevy::prelude::*;

use crate::config::GameConfig;
use crate::save::{AppSaveExt, Saveable};
use crate::shared::*;

impl Saveable for Calendar {
    const SAVE_KEY: &'static str = "calendar";

    fn after_load(&mut self) {
        self.day = self.day.clamp(1, DAYS_PER_SEASON);
        self.year = self.year.max(1);
    }
}

impl Saveable for PlayerState {
    const SAVE_KEY: &'static str = "player";

    fn fresh(config: &GameConfig) -> Self {
        Self {
            gold: config.starting_gold,
            ..Default::default()
        }
    }

    fn after_load(&mut self) {
        self.stamina = self.stamina.clamp(0.0, self.max_stamina);
    }
}

/// Ask the calendar to end the current day (sleep).
#[derive(Event, Debug, Clone, Default)]
pub struct EndDayRequestEvent;

pub struct CalendarPlugin;

impl Plugin for CalendarPlugin {
    fn build(&self, app: &mut App) {
        app.register_saveable::<Calendar>()
            .register_saveable::<PlayerState>()
            .add_event::<EndDayRequestEvent>()
            .add_event::<DayEndEvent>()
            .add_event::<SeasonChangeEvent>()
            .add_systems(
                Update,
                process_day_end.run_if(in_state(GameState::Playing)),
            );
    }
}

pub fn process_day_end(
    mut requests: EventReader<EndDayRequestEvent>,
    mut calendar: ResMut<Calendar>,
    mut player: ResMut<PlayerState>,
    mut day_end_writer: EventWriter<DayEndEvent>,
    mut season_writer: EventWriter<SeasonChangeEvent>,
) {
    // Several requests in one frame still end only one day.
    if requests.read().count() == 0 {
        return;
    }

    day_end_writer.send(DayEndEvent {
        day: calendar.day,
        season: calendar.season,
        year: calendar.year,
    });

    let season_rolled = calendar.advance_day();
    let max = player.max_stamina;
    player.restore_stamina(max);

    info!(
        "[Calendar] New day: Day {} {:?} Year {}",
        calendar.day, calendar.season, calendar.year
    );

    if season_rolled {
        info!("[Calendar] Season changed to {:?}", calendar.season);
        season_writer.send(SeasonChangeEvent {
            new_season: calendar.season,
            year: calendar.year,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::state::app::StatesPlugin;

    fn test_app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, StatesPlugin))
            .init_state::<GameState>()
            .insert_resource(GameConfig::default())
            .add_plugins(CalendarPlugin);
        app.world_mut()
            .resource_mut::<NextState<GameState>>()
            .set(GameState::Playing);
        app.update();
        app
    }

    #[test]
    fn test_end_day_request_advances_once() {
        let mut app = test_app();
        app.world_mut().resource_mut::<PlayerState>().stamina = 5.0;
        app.world_mut().send_event(EndDayRequestEvent);
        app.world_mut().send_event(EndDayRequestEvent);
        app.update();

        assert_eq!(app.world().resource::<Calendar>().day, 2);
        assert_eq!(app.world().resource::<PlayerState>().stamina, MAX_STAMINA);
        let ended: Vec<DayEndEvent> = app
            .world_mut()
            .resource_mut::<Events<DayEndEvent>>()
            .drain()
            .collect();
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].day, 1);
    }

    #[test]
    fn test_last_day_of_season_sends_season_change() {
        let mut app = test_app();
        app.world_mut().resource_mut::<Calendar>().day = DAYS_PER_SEASON;
        app.world_mut().send_event(EndDayRequestEvent);
        app.update();

        let changes: Vec<SeasonChangeEvent> = app
            .world_mut()
            .resource_mut::<Events<SeasonChangeEvent>>()
            .drain()
            .collect();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].new_season, Season::Summer);
    }

    #[test]
    fn test_loaded_calendar_is_clamped() {
        let mut calendar = Calendar {
            year: 0,
            season: Season::Fall,
            day: 0,
        };
        calendar.after_load();
        assert_eq!((calendar.year, calendar.day), (1, 1));

        calendar.day = 40;
        calendar.after_load();
        assert_eq!(calendar.day, DAYS_PER_SEASON);
    }

    #[test]
    fn test_fresh_player_uses_configured_gold() {
        let config = GameConfig {
            starting_gold: 42,
            ..Default::default()
        };
        assert_eq!(PlayerState::fresh(&config).gold, 42);
    }
}
