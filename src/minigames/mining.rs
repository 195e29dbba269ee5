//! Mining: strike a node until its durability runs out.

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{ActiveMinigame, Minigame, MinigameEndedEvent, StartMiningEvent, StrikeEvent, TimingBar};
use crate::shared::*;

const ZONE_DAMAGE: u32 = 3;
const GRAZE_DAMAGE: u32 = 1;
const BAR_SPEED: f32 = 1.2;
const ZONE_WIDTH: f32 = 0.2;
const STRIKE_STAMINA: f32 = 2.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MineralNodeDef {
    pub id: String,
    /// Item granted when the node breaks.
    pub item: ItemId,
    pub durability: u32,
    pub yield_min: u32,
    pub yield_max: u32,
}

impl MineralNodeDef {
    pub fn roll_yield<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        let lo = self.yield_min.min(self.yield_max);
        let hi = self.yield_min.max(self.yield_max);
        rng.gen_range(lo..=hi).max(1)
    }
}

#[derive(Resource, Debug, Clone, Default)]
pub struct MineralRegistry {
    pub nodes: HashMap<String, MineralNodeDef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningOutcome {
    Continue { remaining: u32 },
    Broken,
}

#[derive(Debug, Clone)]
pub struct MiningSession {
    pub node_id: String,
    pub bar: TimingBar,
    pub durability: u32,
}

impl MiningSession {
    pub fn new<R: Rng + ?Sized>(def: &MineralNodeDef, rng: &mut R) -> Self {
        Self {
            node_id: def.id.clone(),
            bar: TimingBar::new(BAR_SPEED, rng.gen_range(0.0..=(1.0 - ZONE_WIDTH)), ZONE_WIDTH),
            durability: def.durability.max(1),
        }
    }

    pub fn strike(&mut self) -> MiningOutcome {
        let damage = if self.bar.in_zone() {
            ZONE_DAMAGE
        } else {
            GRAZE_DAMAGE
        };
        self.durability = self.durability.saturating_sub(damage);
        if self.durability == 0 {
            MiningOutcome::Broken
        } else {
            MiningOutcome::Continue {
                remaining: self.durability,
            }
        }
    }
}

pub fn handle_start_mining(
    mut events: EventReader<StartMiningEvent>,
    registry: Res<MineralRegistry>,
    mut active: ResMut<ActiveMinigame>,
) {
    for ev in events.read() {
        if active.is_running() {
            continue;
        }
        let Some(def) = registry.nodes.get(&ev.node_id) else {
            warn!("[Mining] Unknown mineral node '{}'", ev.node_id);
            continue;
        };
        let mut rng = rand::thread_rng();
        active.0 = Some(Minigame::Mining(MiningSession::new(def, &mut rng)));
    }
}

#[allow(clippy::too_many_arguments)]
pub fn handle_strike(
    mut events: EventReader<StrikeEvent>,
    registry: Res<MineralRegistry>,
    mut active: ResMut<ActiveMinigame>,
    mut player: ResMut<PlayerState>,
    mut mined_writer: EventWriter<MineralMinedEvent>,
    mut grant_writer: EventWriter<GrantItemEvent>,
    mut ended_writer: EventWriter<MinigameEndedEvent>,
    mut toasts: EventWriter<ToastEvent>,
) {
    for _ in events.read() {
        let Some(Minigame::Mining(session)) = active.0.as_mut() else {
            continue;
        };
        if player.stamina < STRIKE_STAMINA {
            toasts.send(ToastEvent::new("Too tired to swing."));
            continue;
        }
        player.stamina -= STRIKE_STAMINA;

        if session.strike() != MiningOutcome::Broken {
            continue;
        }
        let node_id = session.node_id.clone();
        active.0 = None;
        let Some(def) = registry.nodes.get(&node_id) else {
            warn!("[Mining] Node '{}' vanished from the registry", node_id);
            ended_writer.send(MinigameEndedEvent { success: false });
            continue;
        };
        let quantity = def.roll_yield(&mut rand::thread_rng());
        info!("[Mining] Broke '{}' for {}x {}", node_id, quantity, def.item);
        mined_writer.send(MineralMinedEvent {
            item_id: def.item.clone(),
            quantity,
        });
        grant_writer.send(GrantItemEvent {
            item_id: def.item.clone(),
            quantity,
            source: "mining".into(),
        });
        ended_writer.send(MinigameEndedEvent { success: true });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn copper_node() -> MineralNodeDef {
        MineralNodeDef {
            id: "copper_node".into(),
            item: "copper_ore".into(),
            durability: 6,
            yield_min: 1,
            yield_max: 3,
        }
    }

    #[test]
    fn test_zone_strikes_hit_harder() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut inside = MiningSession::new(&copper_node(), &mut rng);
        while !inside.bar.in_zone() {
            inside.bar.tick(0.005);
        }
        assert_eq!(inside.strike(), MiningOutcome::Continue { remaining: 3 });
        assert_eq!(inside.strike(), MiningOutcome::Broken);

        let mut outside = MiningSession::new(&copper_node(), &mut rng);
        while outside.bar.in_zone() {
            outside.bar.tick(0.005);
        }
        assert_eq!(outside.strike(), MiningOutcome::Continue { remaining: 5 });
    }

    #[test]
    fn test_yield_within_range() {
        let mut rng = StdRng::seed_from_u64(11);
        let node = MineralNodeDef {
            yield_min: 4,
            yield_max: 2,
            ..copper_node()
        };
        for _ in 0..100 {
            let n = node.roll_yield(&mut rng);
            assert!((2..=4).contains(&n));
        }
    }
}
