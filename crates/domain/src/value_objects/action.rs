//! Agent action log entries.
//!
//! Agents record structured decisions (scene plans chosen, beats triggered,
//! consolidations performed) as append-only log entries with an opaque JSON
//! payload and a free-text reasoning string.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ActionId, AgentId, GameId, LocationId, NpcId, PlotNodeId, QuestId};

/// Game-situational context captured alongside an action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionContext {
    pub player_level: u32,
    #[serde(default)]
    pub npc_id: Option<NpcId>,
    #[serde(default)]
    pub quest_id: Option<QuestId>,
    #[serde(default)]
    pub plot_thread_id: Option<PlotNodeId>,
    #[serde(default)]
    pub location_id: Option<LocationId>,
}

impl ActionContext {
    pub fn at_level(player_level: u32) -> Self {
        Self {
            player_level,
            ..Self::default()
        }
    }

    pub fn with_npc(mut self, npc_id: NpcId) -> Self {
        self.npc_id = Some(npc_id);
        self
    }

    pub fn with_quest(mut self, quest_id: QuestId) -> Self {
        self.quest_id = Some(quest_id);
        self
    }

    pub fn with_plot_thread(mut self, node_id: PlotNodeId) -> Self {
        self.plot_thread_id = Some(node_id);
        self
    }

    pub fn with_location(mut self, location_id: LocationId) -> Self {
        self.location_id = Some(location_id);
        self
    }
}

/// One append-only log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentAction {
    pub id: ActionId,
    pub agent_id: AgentId,
    pub game_id: GameId,
    pub action_type: String,
    /// Opaque structured payload; schema is owned by the logging agent.
    pub action_data: serde_json::Value,
    pub reasoning: String,
    pub context: ActionContext,
    pub timestamp: DateTime<Utc>,
}

impl AgentAction {
    pub fn new(
        agent_id: AgentId,
        game_id: GameId,
        action_type: impl Into<String>,
        action_data: serde_json::Value,
        reasoning: impl Into<String>,
        context: ActionContext,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ActionId::new(),
            agent_id,
            game_id,
            action_type: action_type.into(),
            action_data,
            reasoning: reasoning.into(),
            context,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn action_round_trips_through_json() {
        let action = AgentAction::new(
            AgentId::new("game_master"),
            GameId::new(),
            "scene_planned",
            json!({"primaryAction": "COMBAT"}),
            "player attacked a named target",
            ActionContext::at_level(3).with_location(LocationId::new("loc_training_grounds")),
            Utc::now(),
        );
        let json = serde_json::to_string(&action).expect("serialize");
        let back: AgentAction = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, action);
    }
}
