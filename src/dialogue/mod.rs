//! Dialogue domain — branching conversations with NPCs.
//!
//! `DialogueState` walks one tree at a time. Choice effects are not applied
//! here; they are re-sent as the owning domain's request events. Ending a
//! conversation sends `NpcTalkedEvent`.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::relationships::Relationships;
use crate::shared::*;

// ═══════════════════════════════════════════════════════════════════════
// DEFINITIONS
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DialogueEffect {
    StartQuest(QuestId),
    GiveItem { item: ItemId, quantity: u32 },
    Friendship(i32),
    LearnSpell(SpellId),
    UnlockRecipe(RecipeId),
    DiscoverWaypoint(WaypointId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueChoice {
    pub text: String,
    #[serde(default)]
    pub next: Option<String>,
    /// Hidden until the player has at least this many hearts with the NPC.
    #[serde(default)]
    pub min_hearts: Option<u32>,
    #[serde(default)]
    pub effects: Vec<DialogueEffect>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueNode {
    pub speaker: String,
    pub text: String,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub choices: Vec<DialogueChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueTree {
    pub id: String,
    pub npc: NpcId,
    pub start: String,
    pub nodes: HashMap<String, DialogueNode>,
}

#[derive(Resource, Debug, Clone, Default)]
pub struct DialogueRegistry {
    pub trees: HashMap<String, DialogueTree>,
}

// ═══════════════════════════════════════════════════════════════════════
// CONVERSATION STATE
// ═══════════════════════════════════════════════════════════════════════

/// Where a conversation is after a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueStep {
    /// Showing a node. The view reads it from the state.
    Node(String),
    Ended,
}

#[derive(Debug, Clone)]
struct Conversation {
    tree: DialogueTree,
    node: String,
}

#[derive(Resource, Debug, Clone, Default)]
pub struct DialogueState {
    current: Option<Conversation>,
}

impl DialogueState {
    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    pub fn npc(&self) -> Option<&str> {
        self.current.as_ref().map(|c| c.tree.npc.as_str())
    }

    pub fn current_node(&self) -> Option<&DialogueNode> {
        let conversation = self.current.as_ref()?;
        conversation.tree.nodes.get(&conversation.node)
    }

    pub fn start(&mut self, tree: &DialogueTree) -> bool {
        if self.is_active() {
            warn!("[Dialogue] Already in a conversation");
            return false;
        }
        if !tree.nodes.contains_key(&tree.start) {
            warn!("[Dialogue] Tree '{}' has no start node '{}'", tree.id, tree.start);
            return false;
        }
        self.current = Some(Conversation {
            tree: tree.clone(),
            node: tree.start.clone(),
        });
        true
    }

    /// Moves past a node without choices.
    pub fn advance(&mut self) -> DialogueStep {
        let next = match self.current_node() {
            Some(node) if node.choices.is_empty() => node.next.clone(),
            // Choice nodes wait for `choose`.
            Some(_) => {
                return self.step();
            }
            None => None,
        };
        self.go_to(next)
    }

    /// Choices the player may pick with `hearts` of friendship, with their
    /// original indices.
    pub fn visible_choices(&self, hearts: u32) -> Vec<(usize, &DialogueChoice)> {
        self.current_node()
            .map(|node| {
                node.choices
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.min_hearts.map_or(true, |min| hearts >= min))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn choose(
        &mut self,
        index: usize,
        hearts: u32,
    ) -> Option<(Vec<DialogueEffect>, DialogueStep)> {
        let choice = self.current_node()?.choices.get(index)?;
        if choice.min_hearts.is_some_and(|min| hearts < min) {
            warn!("[Dialogue] Choice {} needs more friendship", index);
            return None;
        }
        let effects = choice.effects.clone();
        let next = choice.next.clone();
        Some((effects, self.go_to(next)))
    }

    pub fn end(&mut self) -> Option<NpcId> {
        self.current.take().map(|c| c.tree.npc)
    }

    fn go_to(&mut self, next: Option<String>) -> DialogueStep {
        let Some(conversation) = self.current.as_mut() else {
            return DialogueStep::Ended;
        };
        match next {
            Some(id) if conversation.tree.nodes.contains_key(&id) => {
                conversation.node = id.clone();
                DialogueStep::Node(id)
            }
            _ => DialogueStep::Ended,
        }
    }

    fn step(&self) -> DialogueStep {
        match &self.current {
            Some(c) => DialogueStep::Node(c.node.clone()),
            None => DialogueStep::Ended,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// EVENTS & PLUGIN
// ═══════════════════════════════════════════════════════════════════════

/// Open the named tree, or the NPC's default tree when `tree_id` is None.
#[derive(Event, Debug, Clone)]
pub struct StartDialogueEvent {
    pub npc_id: NpcId,
    pub tree_id: Option<String>,
}

#[derive(Event, Debug, Clone)]
pub struct AdvanceDialogueEvent;

#[derive(Event, Debug, Clone)]
pub struct ChooseDialogueEvent {
    pub index: usize,
}

#[derive(Event, Debug, Clone)]
pub struct DialogueEndedEvent {
    pub npc_id: NpcId,
}

pub struct DialoguePlugin;

impl Plugin for DialoguePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DialogueRegistry>()
            .init_resource::<DialogueState>()
            .add_event::<StartDialogueEvent>()
            .add_event::<AdvanceDialogueEvent>()
            .add_event::<ChooseDialogueEvent>()
            .add_event::<DialogueEndedEvent>()
            .add_systems(
                Update,
                (handle_start_dialogue, handle_dialogue_input)
                    .chain()
                    .run_if(in_state(GameState::Playing)),
            );
    }
}

pub fn handle_start_dialogue(
    mut events: EventReader<StartDialogueEvent>,
    registry: Res<DialogueRegistry>,
    npcs: Res<crate::relationships::NpcRegistry>,
    mut state: ResMut<DialogueState>,
) {
    for ev in events.read() {
        let tree_id = ev
            .tree_id
            .clone()
            .or_else(|| npcs.npcs.get(&ev.npc_id).and_then(|n| n.dialogue_tree.clone()));
        let Some(tree) = tree_id.and_then(|id| registry.trees.get(&id)) else {
            warn!("[Dialogue] No dialogue for '{}'", ev.npc_id);
            continue;
        };
        if state.start(tree) {
            info!("[Dialogue] Talking to {}", tree.npc);
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn handle_dialogue_input(
    mut advances: EventReader<AdvanceDialogueEvent>,
    mut chooses: EventReader<ChooseDialogueEvent>,
    relationships: Res<Relationships>,
    mut state: ResMut<DialogueState>,
    mut quest_writer: EventWriter<StartQuestEvent>,
    mut item_writer: EventWriter<GrantItemEvent>,
    mut friendship_writer: EventWriter<FriendshipChangeEvent>,
    mut spell_writer: EventWriter<LearnSpellEvent>,
    mut recipe_writer: EventWriter<UnlockRecipeEvent>,
    mut waypoint_writer: EventWriter<DiscoverWaypointEvent>,
    mut talked_writer: EventWriter<NpcTalkedEvent>,
    mut ended_writer: EventWriter<DialogueEndedEvent>,
) {
    let mut steps = Vec::new();
    for _ in advances.read() {
        steps.push(state.advance());
    }
    for ev in chooses.read() {
        let Some(npc) = state.npc().map(str::to_string) else {
            continue;
        };
        let hearts = relationships.hearts(&npc);
        let Some((effects, step)) = state.choose(ev.index, hearts) else {
            continue;
        };
        for effect in effects {
            match effect {
                DialogueEffect::StartQuest(quest_id) => {
                    quest_writer.send(StartQuestEvent { quest_id });
                }
                DialogueEffect::GiveItem { item, quantity } => {
                    item_writer.send(GrantItemEvent {
                        item_id: item,
                        quantity,
                        source: format!("dialogue:{}", npc),
                    });
                }
                DialogueEffect::Friendship(amount) => {
                    friendship_writer.send(FriendshipChangeEvent {
                        npc_id: npc.clone(),
                        amount,
                    });
                }
                DialogueEffect::LearnSpell(spell_id) => {
                    spell_writer.send(LearnSpellEvent { spell_id });
                }
                DialogueEffect::UnlockRecipe(recipe_id) => {
                    recipe_writer.send(UnlockRecipeEvent { recipe_id });
                }
                DialogueEffect::DiscoverWaypoint(waypoint_id) => {
                    waypoint_writer.send(DiscoverWaypointEvent { waypoint_id });
                }
            }
        }
        steps.push(step);
    }

    if steps.contains(&DialogueStep::Ended) {
        if let Some(npc_id) = state.end() {
            info!("[Dialogue] Finished talking to {}", npc_id);
            talked_writer.send(NpcTalkedEvent {
                npc_id: npc_id.clone(),
            });
            ended_writer.send(DialogueEndedEvent { npc_id });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> DialogueTree {
        let mut nodes = HashMap::new();
        nodes.insert(
            "hello".to_string(),
            DialogueNode {
                speaker: "Mira".into(),
                text: "Morning! Busy day?".into(),
                next: Some("ask".into()),
                choices: Vec::new(),
            },
        );
        nodes.insert(
            "ask".to_string(),
            DialogueNode {
                speaker: "Mira".into(),
                text: "Could you bring me some wood?".into(),
                next: None,
                choices: vec![
                    DialogueChoice {
                        text: "Sure.".into(),
                        next: None,
                        min_hearts: None,
                        effects: vec![DialogueEffect::StartQuest("wood_for_mira".into())],
                    },
                    DialogueChoice {
                        text: "Anything for you.".into(),
                        next: Some("hello".into()),
                        min_hearts: Some(4),
                        effects: vec![DialogueEffect::Friendship(10)],
                    },
                ],
            },
        );
        DialogueTree {
            id: "mira_intro".into(),
            npc: "mira".into(),
            start: "hello".into(),
            nodes,
        }
    }

    #[test]
    fn test_walk_to_choice_and_pick() {
        let mut state = DialogueState::default();
        assert!(state.start(&tree()));
        assert!(!state.start(&tree()));

        assert_eq!(state.advance(), DialogueStep::Node("ask".into()));
        // Advancing a choice node stays put.
        assert_eq!(state.advance(), DialogueStep::Node("ask".into()));

        let (effects, step) = state.choose(0, 0).unwrap();
        assert_eq!(effects, vec![DialogueEffect::StartQuest("wood_for_mira".into())]);
        assert_eq!(step, DialogueStep::Ended);
        assert_eq!(state.end(), Some("mira".to_string()));
        assert!(!state.is_active());
    }

    #[test]
    fn test_heart_gated_choice() {
        let mut state = DialogueState::default();
        state.start(&tree());
        state.advance();

        assert_eq!(state.visible_choices(0).len(), 1);
        assert_eq!(state.visible_choices(5).len(), 2);
        assert!(state.choose(1, 3).is_none());
        let (_, step) = state.choose(1, 4).unwrap();
        assert_eq!(step, DialogueStep::Node("hello".into()));
    }

    #[test]
    fn test_missing_start_node_is_rejected() {
        let mut broken = tree();
        broken.start = "nowhere".into();
        let mut state = DialogueState::default();
        assert!(!state.start(&broken));
    }
}
