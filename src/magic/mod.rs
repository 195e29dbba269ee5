//! Magic domain — the spellbook, mana and cooldowns.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::GameConfig;
use crate::save::{AppSaveExt, Saveable};
use crate::shared::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpellEffect {
    WaterCrops,
    RestoreStamina(f32),
    /// Cosmetic; the host renders it off `SpellCastEvent`.
    Illuminate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellDef {
    pub id: SpellId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub mana_cost: f32,
    pub cooldown_secs: f32,
    pub effect: SpellEffect,
}

#[derive(Resource, Debug, Clone, Default)]
pub struct SpellRegistry {
    pub spells: HashMap<SpellId, SpellDef>,
}

// ═══════════════════════════════════════════════════════════════════════
// SPELLBOOK
// ═══════════════════════════════════════════════════════════════════════

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spellbook {
    pub known: Vec<SpellId>,
    pub mana: f32,
    pub max_mana: f32,
    pub regen_per_sec: f32,
    /// Spell id → seconds until castable again.
    pub cooldowns: HashMap<SpellId, f32>,
}

impl Default for Spellbook {
    fn default() -> Self {
        Self::fresh(&GameConfig::default())
    }
}

impl Spellbook {
    pub fn knows(&self, spell_id: &str) -> bool {
        self.known.iter().any(|s| s == spell_id)
    }

    pub fn learn(&mut self, def: &SpellDef) -> bool {
        if self.knows(&def.id) {
            return false;
        }
        self.known.push(def.id.clone());
        true
    }

    pub fn cooldown(&self, spell_id: &str) -> f32 {
        self.cooldowns.get(spell_id).copied().unwrap_or(0.0)
    }

    /// Spends mana and starts the cooldown. Fails without mutation when the
    /// spell is unknown, cooling down, or too expensive.
    pub fn cast(&mut self, def: &SpellDef) -> bool {
        if !self.knows(&def.id) {
            warn!("[Magic] '{}' is not known", def.id);
            return false;
        }
        if self.cooldown(&def.id) > 0.0 {
            warn!("[Magic] '{}' is cooling down", def.id);
            return false;
        }
        if self.mana < def.mana_cost {
            warn!(
                "[Magic] Not enough mana for '{}' ({:.0}/{:.0})",
                def.id, self.mana, def.mana_cost
            );
            return false;
        }
        self.mana -= def.mana_cost;
        if def.cooldown_secs > 0.0 {
            self.cooldowns.insert(def.id.clone(), def.cooldown_secs);
        }
        true
    }

    pub fn tick(&mut self, dt: f32) {
        self.mana = (self.mana + self.regen_per_sec * dt).clamp(0.0, self.max_mana);
        self.cooldowns.retain(|_, remaining| {
            *remaining -= dt;
            *remaining > 0.0
        });
    }
}

impl Saveable for Spellbook {
    const SAVE_KEY: &'static str = "magic";

    fn fresh(config: &GameConfig) -> Self {
        Self {
            known: Vec::new(),
            mana: config.base_max_mana,
            max_mana: config.base_max_mana,
            regen_per_sec: config.mana_regen_per_sec,
            cooldowns: HashMap::new(),
        }
    }

    fn after_load(&mut self) {
        self.mana = self.mana.clamp(0.0, self.max_mana);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// EVENTS & PLUGIN
// ═══════════════════════════════════════════════════════════════════════

#[derive(Event, Debug, Clone)]
pub struct CastSpellRequestEvent {
    pub spell_id: SpellId,
}

pub struct MagicPlugin;

impl Plugin for MagicPlugin {
    fn build(&self, app: &mut App) {
        app.register_saveable::<Spellbook>()
            .init_resource::<SpellRegistry>()
            .add_event::<LearnSpellEvent>()
            .add_event::<CastSpellRequestEvent>()
            .add_event::<SpellCastEvent>()
            .add_systems(
                Update,
                (tick_spellbook, handle_learn_spell, handle_cast_requests)
                    .chain()
                    .run_if(in_state(GameState::Playing)),
            );
    }
}

pub fn tick_spellbook(time: Res<Time>, mut spellbook: ResMut<Spellbook>) {
    spellbook.tick(time.delta_secs());
}

pub fn handle_learn_spell(
    mut events: EventReader<LearnSpellEvent>,
    registry: Res<SpellRegistry>,
    mut spellbook: ResMut<Spellbook>,
    mut toasts: EventWriter<ToastEvent>,
) {
    for ev in events.read() {
        let Some(def) = registry.spells.get(&ev.spell_id) else {
            warn!("[Magic] Unknown spell '{}'", ev.spell_id);
            continue;
        };
        if spellbook.learn(def) {
            info!("[Magic] Learned '{}'", def.id);
            toasts.send(ToastEvent::new(format!("Learned {}!", def.name)));
        }
    }
}

pub fn handle_cast_requests(
    mut events: EventReader<CastSpellRequestEvent>,
    registry: Res<SpellRegistry>,
    mut spellbook: ResMut<Spellbook>,
    mut player: ResMut<PlayerState>,
    mut water_writer: EventWriter<WaterAllCropsEvent>,
    mut cast_writer: EventWriter<SpellCastEvent>,
    mut toasts: EventWriter<ToastEvent>,
) {
    for ev in events.read() {
        let Some(def) = registry.spells.get(&ev.spell_id) else {
            warn!("[Magic] Unknown spell '{}'", ev.spell_id);
            continue;
        };
        if !spellbook.cast(def) {
            toasts.send(ToastEvent::new(format!("Can't cast {} yet.", def.name)));
            continue;
        }
        match def.effect {
            SpellEffect::WaterCrops => {
                water_writer.send(WaterAllCropsEvent);
            }
            SpellEffect::RestoreStamina(amount) => player.restore_stamina(amount),
            SpellEffect::Illuminate => {}
        }
        cast_writer.send(SpellCastEvent {
            spell_id: def.id.clone(),
        });
        info!("[Magic] Cast '{}' ({:.0} mana left)", def.id, spellbook.mana);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rain() -> SpellDef {
        SpellDef {
            id: "rain_call".into(),
            name: "Rain Call".into(),
            description: String::new(),
            mana_cost: 20.0,
            cooldown_secs: 10.0,
            effect: SpellEffect::WaterCrops,
        }
    }

    #[test]
    fn test_unknown_spell_cannot_be_cast() {
        let mut book = Spellbook::default();
        assert!(!book.cast(&rain()));
        assert!(book.learn(&rain()));
        assert!(!book.learn(&rain()));
        assert!(book.cast(&rain()));
    }

    #[test]
    fn test_cooldown_blocks_recast_without_mutation() {
        let mut book = Spellbook::default();
        book.learn(&rain());
        book.cast(&rain());
        let before = book.clone();
        assert!(!book.cast(&rain()));
        assert_eq!(book, before);

        book.tick(10.0);
        assert_eq!(book.cooldown("rain_call"), 0.0);
        assert!(book.cast(&rain()));
    }

    #[test]
    fn test_not_enough_mana() {
        let mut book = Spellbook {
            mana: 5.0,
            ..Default::default()
        };
        book.learn(&rain());
        assert!(!book.cast(&rain()));
        assert_eq!(book.mana, 5.0);
    }

    #[test]
    fn test_mana_regen_is_capped() {
        let mut book = Spellbook {
            mana: 0.0,
            ..Default::default()
        };
        book.tick(1_000.0);
        assert_eq!(book.mana, book.max_mana);
    }
}
