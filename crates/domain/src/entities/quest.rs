//! Quests, objectives, and rewards.

use serde::{Deserialize, Serialize};

use crate::entities::character::Item;
use crate::ids::{NpcId, ObjectiveId, QuestId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestType {
    Main,
    Side,
    Tutorial,
    Daily,
}

/// What kind of turn activity advances an objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectiveType {
    /// Defeat a named target; matched against the combat target.
    Kill,
    /// Arrive at a location; matched against the current location id.
    ReachLocation,
    /// Discover a location; matched against the discovered-location set.
    Explore,
    /// Speak with an NPC.
    TalkTo,
    /// Use a System surface (status, inventory, skills).
    UseSystem,
    /// Obtain an item.
    Collect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objective {
    pub id: ObjectiveId,
    pub objective_type: ObjectiveType,
    pub description: String,
    /// Lowercased id the tracker matches against (target name, location id,
    /// system surface keyword).
    pub target_id: String,
    pub target_progress: u32,
    pub current_progress: u32,
}

impl Objective {
    pub fn new(
        id: impl Into<ObjectiveId>,
        objective_type: ObjectiveType,
        description: impl Into<String>,
        target_id: impl Into<String>,
        target_progress: u32,
    ) -> Self {
        Self {
            id: id.into(),
            objective_type,
            description: description.into(),
            target_id: target_id.into().to_lowercase(),
            target_progress,
            current_progress: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.current_progress >= self.target_progress
    }

    /// Objective with progress advanced by `delta`, clamped at the target.
    pub fn advanced(&self, delta: u32) -> Objective {
        Objective {
            current_progress: (self.current_progress + delta).min(self.target_progress),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestRewards {
    pub xp: u64,
    pub gold: u64,
    #[serde(default)]
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    pub id: QuestId,
    pub name: String,
    pub quest_type: QuestType,
    #[serde(default)]
    pub giver: Option<NpcId>,
    pub description: String,
    /// Ordered; the first incomplete objective is the "next" one.
    pub objectives: Vec<Objective>,
    pub rewards: QuestRewards,
}

impl Quest {
    pub fn new(id: impl Into<QuestId>, name: impl Into<String>, quest_type: QuestType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            quest_type,
            giver: None,
            description: String::new(),
            objectives: Vec::new(),
            rewards: QuestRewards::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_giver(mut self, giver: impl Into<NpcId>) -> Self {
        self.giver = Some(giver.into());
        self
    }

    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objectives.push(objective);
        self
    }

    pub fn with_rewards(mut self, rewards: QuestRewards) -> Self {
        self.rewards = rewards;
        self
    }

    pub fn objective(&self, id: &ObjectiveId) -> Option<&Objective> {
        self.objectives.iter().find(|o| &o.id == id)
    }

    /// Complete iff all objectives are complete.
    pub fn is_complete(&self) -> bool {
        self.objectives.iter().all(|o| o.is_complete())
    }

    pub fn next_objective(&self) -> Option<&Objective> {
        self.objectives.iter().find(|o| !o.is_complete())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quest() -> Quest {
        Quest::new("quest_test", "Test Quest", QuestType::Side)
            .with_objective(Objective::new(
                "obj_rats",
                ObjectiveType::Kill,
                "Defeat rats",
                "Giant Rat",
                3,
            ))
            .with_objective(Objective::new(
                "obj_report",
                ObjectiveType::TalkTo,
                "Report back",
                "npc_guide",
                1,
            ))
    }

    #[test]
    fn progress_clamps_at_target() {
        let obj = quest().objectives[0].advanced(5);
        assert_eq!(obj.current_progress, 3);
        assert!(obj.is_complete());
    }

    #[test]
    fn quest_completes_when_all_objectives_do() {
        let mut q = quest();
        assert!(!q.is_complete());
        q.objectives = q.objectives.iter().map(|o| o.advanced(5)).collect();
        assert!(q.is_complete());
        assert!(q.next_objective().is_none());
    }

    #[test]
    fn target_ids_are_lowercased() {
        assert_eq!(quest().objectives[0].target_id, "giant rat");
    }
}
