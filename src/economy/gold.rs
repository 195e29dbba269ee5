use bevy::prelude::*;
use crate::shared::*;

/// Applies GoldChangeEvents to PlayerState.gold. This is the only system that
/// writes gold; everything else sends the event.
/// Spending more than the balance clamps to 0 rather than underflowing.
pub fn apply_gold_changes(
    mut gold_events: EventReader<GoldChangeEvent>,
    mut player_state: ResMut<PlayerState>,
) {
    for ev in gold_events.read() {
        if ev.amount >= 0 {
            let gain = ev.amount as u32;
            player_state.earn(gain);
            info!(
                "[Economy] Gold +{}: {}. New balance: {}",
                gain,
                ev.reason,
                format_gold(player_state.gold)
            );
        } else {
            let cost = ev.amount.unsigned_abs();
            if !player_state.spend(cost) {
                // Callers validate before sending, so this is a logic slip upstream.
                warn!(
                    "[Economy] Tried to spend {}g but only have {}g (reason: {}). Clamping to 0.",
                    cost, player_state.gold, ev.reason
                );
                player_state.gold = 0;
            } else {
                info!(
                    "[Economy] Gold -{}: {}. New balance: {}",
                    cost,
                    ev.reason,
                    format_gold(player_state.gold)
                );
            }
        }
    }
}

/// Format a gold amount as a display string (e.g. "1,234g").
pub fn format_gold(amount: u32) -> String {
    let s = amount.to_string();
    let mut result = String::new();
    let digits: Vec<char> = s.chars().collect();
    for (i, ch) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*ch);
    }
    result.push('g');
    result
}
