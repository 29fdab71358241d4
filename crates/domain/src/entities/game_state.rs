//! The root game state aggregate.
//!
//! `GameState` is owned exclusively by the turn orchestrator; every mutation
//! goes through a rules-engine function that returns a new value.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::content;
use crate::entities::character::CharacterSheet;
use crate::entities::location::Location;
use crate::entities::npc::Npc;
use crate::entities::quest::Quest;
use crate::error::DomainError;
use crate::ids::{GameId, LocationId, NpcId, QuestId};
use crate::value_objects::{Difficulty, SystemType};

/// Player-stated style preferences, surfaced in scene and planner prompts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPreferences {
    #[serde(default)]
    pub playstyle: String,
    #[serde(default)]
    pub playstyle_description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub game_id: GameId,
    pub player_name: String,
    pub backstory: String,
    pub system_type: SystemType,
    pub difficulty: Difficulty,
    pub character_sheet: CharacterSheet,
    pub current_location: LocationId,
    pub discovered_locations: BTreeSet<LocationId>,
    /// Generated during play; append-only once created.
    pub custom_locations: BTreeMap<LocationId, Location>,
    pub npcs: BTreeMap<NpcId, Npc>,
    pub active_quests: BTreeMap<QuestId, Quest>,
    pub completed_quests: BTreeSet<QuestId>,
    pub death_count: u32,
    pub has_opening_narration_played: bool,
    pub player_preferences: PlayerPreferences,
}

impl GameState {
    /// Fresh state at the starting template location.
    pub fn new(
        player_name: impl Into<String>,
        backstory: impl Into<String>,
        system_type: SystemType,
        difficulty: Difficulty,
        character_sheet: CharacterSheet,
    ) -> Self {
        let start = content::starting_location_id();
        let mut discovered = BTreeSet::new();
        discovered.insert(start.clone());
        Self {
            game_id: GameId::new(),
            player_name: player_name.into(),
            backstory: backstory.into(),
            system_type,
            difficulty,
            character_sheet,
            current_location: start,
            discovered_locations: discovered,
            custom_locations: BTreeMap::new(),
            npcs: BTreeMap::new(),
            active_quests: BTreeMap::new(),
            completed_quests: BTreeSet::new(),
            death_count: 0,
            has_opening_narration_played: false,
            player_preferences: PlayerPreferences::default(),
        }
    }

    /// Resolve a location id against custom locations, then templates.
    pub fn location(&self, id: &LocationId) -> Option<Location> {
        self.custom_locations
            .get(id)
            .cloned()
            .or_else(|| content::template_location(id))
    }

    pub fn current_location(&self) -> Option<Location> {
        self.location(&self.current_location)
    }

    /// Danger of the current location, 1 when unresolvable.
    pub fn current_danger(&self) -> u8 {
        self.current_location().map(|l| l.danger).unwrap_or(1)
    }

    /// NPCs whose location is the player's current location.
    pub fn npcs_here(&self) -> Vec<&Npc> {
        self.npcs
            .values()
            .filter(|n| n.location_id == self.current_location)
            .collect()
    }

    pub fn npc(&self, id: &NpcId) -> Option<&Npc> {
        self.npcs.get(id)
    }

    /// Structural invariants checked after every turn in debug paths.
    pub fn validate(&self) -> Result<(), DomainError> {
        self.character_sheet.validate()?;

        for quest_id in self.active_quests.keys() {
            if self.completed_quests.contains(quest_id) {
                return Err(DomainError::validation(format!(
                    "quest {quest_id} is both active and completed"
                )));
            }
        }

        for quest in self.active_quests.values() {
            for objective in &quest.objectives {
                if objective.current_progress > objective.target_progress {
                    return Err(DomainError::validation(format!(
                        "objective {} progress exceeds target",
                        objective.id
                    )));
                }
            }
        }

        if self.location(&self.current_location).is_none() {
            return Err(DomainError::validation(format!(
                "current location {} is neither template nor custom",
                self.current_location
            )));
        }

        for npc in self.npcs.values() {
            if self.location(&npc.location_id).is_none() {
                return Err(DomainError::validation(format!(
                    "npc {} stands in unknown location {}",
                    npc.id, npc.location_id
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::StatBlock;

    fn state() -> GameState {
        GameState::new(
            "Elena",
            "A quiet librarian",
            SystemType::SystemIntegration,
            Difficulty::Normal,
            CharacterSheet::new(StatBlock::uniform(10)),
        )
    }

    #[test]
    fn fresh_state_starts_at_a_template_location() {
        let state = state();
        assert!(state.current_location().is_some());
        assert!(state.discovered_locations.contains(&state.current_location));
        assert!(state.validate().is_ok());
    }

    #[test]
    fn active_and_completed_quests_must_be_disjoint() {
        let mut state = state();
        let quest = content::tutorial_quest(SystemType::SystemIntegration);
        state.completed_quests.insert(quest.id.clone());
        state.active_quests.insert(quest.id.clone(), quest);
        assert!(state.validate().is_err());
    }

    #[test]
    fn npcs_here_filters_by_location() {
        let mut state = state();
        let guide = content::guide_npc(SystemType::SystemIntegration);
        state.npcs.insert(guide.id.clone(), guide);
        assert_eq!(state.npcs_here().len(), 1);

        let mut away = state.clone();
        let far = LocationId::new("loc_whispering_forest");
        for npc in away.npcs.values_mut() {
            npc.location_id = far.clone();
        }
        assert!(away.npcs_here().is_empty());
    }
}
