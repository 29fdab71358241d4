//! Quest objective progress and completion.
//!
//! Completing all objectives only marks a quest ready for turn-in; rewards
//! are applied exactly once by an explicit `complete_quest` call.

use serde::{Deserialize, Serialize};

use crate::entities::game_state::GameState;
use crate::entities::quest::QuestRewards;
use crate::error::DomainError;
use crate::ids::{ObjectiveId, QuestId};
use crate::rules::progression::{gain_xp, LevelUpReport};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveAdvance {
    pub quest_id: QuestId,
    pub quest_name: String,
    pub objective_id: ObjectiveId,
    pub current: u32,
    pub target: u32,
    pub newly_completed: bool,
    /// All objectives now complete; the quest awaits turn-in.
    pub quest_ready: bool,
}

/// Bump one objective's progress by `delta`.
pub fn advance_objective(
    state: &GameState,
    quest_id: &QuestId,
    objective_id: &ObjectiveId,
    delta: u32,
) -> Result<(GameState, ObjectiveAdvance), DomainError> {
    let quest = state
        .active_quests
        .get(quest_id)
        .ok_or_else(|| DomainError::not_found("Quest", quest_id.to_string()))?;
    let objective = quest
        .objective(objective_id)
        .ok_or_else(|| DomainError::not_found("Objective", objective_id.to_string()))?;

    let was_complete = objective.is_complete();
    let advanced = objective.advanced(delta);
    let newly_completed = !was_complete && advanced.is_complete();

    let mut next = state.clone();
    let mut quest = quest.clone();
    for slot in quest.objectives.iter_mut().filter(|o| &o.id == objective_id) {
        *slot = advanced.clone();
    }
    let quest_ready = quest.is_complete();
    let advance = ObjectiveAdvance {
        quest_id: quest_id.clone(),
        quest_name: quest.name.clone(),
        objective_id: objective_id.clone(),
        current: advanced.current_progress,
        target: advanced.target_progress,
        newly_completed,
        quest_ready,
    };
    next.active_quests.insert(quest_id.clone(), quest);
    Ok((next, advance))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestCompletion {
    pub quest_id: QuestId,
    pub quest_name: String,
    pub rewards: QuestRewards,
    pub level_up: Option<LevelUpReport>,
}

/// Turn in a fully-progressed quest: apply rewards, move it to the
/// completed set.
pub fn complete_quest(
    state: &GameState,
    quest_id: &QuestId,
) -> Result<(GameState, QuestCompletion), DomainError> {
    let quest = state
        .active_quests
        .get(quest_id)
        .ok_or_else(|| DomainError::not_found("Quest", quest_id.to_string()))?
        .clone();

    if !quest.is_complete() {
        return Err(DomainError::constraint(format!(
            "quest {} still has unfinished objectives",
            quest.name
        )));
    }

    let mut next = state.clone();
    next.active_quests.remove(quest_id);
    next.completed_quests.insert(quest_id.clone());

    let sheet = &mut next.character_sheet;
    sheet.gold += quest.rewards.gold;
    for item in &quest.rewards.items {
        sheet.inventory = sheet.inventory.with_item(item.clone(), 1)?;
    }

    let (sheet, report) = gain_xp(&next.character_sheet, quest.rewards.xp, next.difficulty);
    next.character_sheet = sheet;

    let completion = QuestCompletion {
        quest_id: quest_id.clone(),
        quest_name: quest.name.clone(),
        rewards: quest.rewards.clone(),
        level_up: report.leveled().then_some(report),
    };
    Ok((next, completion))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content;
    use crate::entities::character::CharacterSheet;
    use crate::value_objects::{Difficulty, StatBlock, SystemType};

    fn state_with_tutorial() -> GameState {
        let mut state = GameState::new(
            "Elena",
            "backstory",
            SystemType::SystemIntegration,
            Difficulty::Normal,
            CharacterSheet::new(StatBlock::uniform(10)),
        );
        let quest = content::tutorial_quest(SystemType::SystemIntegration);
        state.active_quests.insert(quest.id.clone(), quest);
        state
    }

    #[test]
    fn progress_never_exceeds_target() {
        let state = state_with_tutorial();
        let quest_id = QuestId::new("quest_survive_tutorial");
        let obj_id = ObjectiveId::new("tutorial_obj_status");
        let (state, advance) = advance_objective(&state, &quest_id, &obj_id, 10).expect("exists");
        assert_eq!(advance.current, advance.target);
        assert!(advance.newly_completed);
        assert!(state.validate().is_ok());
    }

    #[test]
    fn completion_requires_all_objectives() {
        let state = state_with_tutorial();
        let quest_id = QuestId::new("quest_survive_tutorial");
        assert!(matches!(
            complete_quest(&state, &quest_id),
            Err(DomainError::Constraint(_))
        ));
    }

    #[test]
    fn rewards_apply_exactly_once() {
        let mut state = state_with_tutorial();
        let quest_id = QuestId::new("quest_survive_tutorial");
        let quest = state.active_quests.get_mut(&quest_id).expect("present");
        quest.objectives = quest.objectives.iter().map(|o| o.advanced(10)).collect();

        let xp_before = state.character_sheet.xp;
        let (next, completion) = complete_quest(&state, &quest_id).expect("ready");
        assert_eq!(next.character_sheet.xp, xp_before + completion.rewards.xp);
        assert!(next.completed_quests.contains(&quest_id));
        assert!(!next.active_quests.contains_key(&quest_id));

        // A second turn-in attempt no longer finds the quest.
        assert!(matches!(
            complete_quest(&next, &quest_id),
            Err(DomainError::NotFound { .. })
        ));
    }
}
