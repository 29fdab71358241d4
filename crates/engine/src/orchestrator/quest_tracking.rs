//! Post-turn quest progress tracking.
//!
//! After every turn, objectives whose type matches what actually happened
//! are advanced: kills match the combat target, location objectives match
//! where the player stands, exploration matches the discovered set, and
//! system objectives match the surface the player opened.

use questweaver_domain::rules::{self, ObjectiveAdvance};
use questweaver_domain::{GameState, ItemId, LocationId, NpcId, ObjectiveType};

use super::handlers::TurnFacts;

/// Advance every matching objective by one. Returns the new state and the
/// advances that actually happened.
pub fn track_progress(state: &GameState, facts: &TurnFacts) -> (GameState, Vec<ObjectiveAdvance>) {
    let mut matches = Vec::new();
    for quest in state.active_quests.values() {
        for objective in &quest.objectives {
            if objective.is_complete() {
                continue;
            }
            if objective_matches(objective.objective_type, &objective.target_id, state, facts) {
                matches.push((quest.id.clone(), objective.id.clone()));
            }
        }
    }

    let mut next = state.clone();
    let mut advances = Vec::new();
    for (quest_id, objective_id) in matches {
        match rules::advance_objective(&next, &quest_id, &objective_id, 1) {
            Ok((state_after, advance)) => {
                next = state_after;
                advances.push(advance);
            }
            Err(e) => {
                tracing::warn!(
                    quest_id = %quest_id,
                    objective_id = %objective_id,
                    error = %e,
                    "Objective advance failed"
                );
            }
        }
    }
    (next, advances)
}

fn objective_matches(
    objective_type: ObjectiveType,
    target_id: &str,
    state: &GameState,
    facts: &TurnFacts,
) -> bool {
    match objective_type {
        ObjectiveType::Kill => facts
            .combat_target
            .as_deref()
            .is_some_and(|t| t.to_lowercase() == target_id),
        ObjectiveType::ReachLocation => state.current_location.as_str() == target_id,
        ObjectiveType::Explore => state
            .discovered_locations
            .contains(&LocationId::new(target_id)),
        ObjectiveType::TalkTo => facts.talked_to.contains(&NpcId::new(target_id)),
        ObjectiveType::UseSystem => facts.system_used.as_deref() == Some(target_id),
        ObjectiveType::Collect => state
            .character_sheet
            .inventory
            .get(&ItemId::new(target_id))
            .is_some(),
    }
}
