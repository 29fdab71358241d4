//! In-memory persistence gateway.
//!
//! Backs tests and ephemeral sessions. Everything lives in maps behind a
//! single mutex; "transactions" are just the mutex critical section.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use questweaver_domain::{
    AgentAction, AgentId, AgentMemory, GameId, GameState, PlotGraph, PlotNodeId,
};

use crate::infrastructure::ports::{
    ActionLogRepo, AgentMemoryRepo, ConsolidationRepo, ConsolidationSnapshot, GameStateRepo,
    NodeStatusUpdate, PersistenceGateway, PlanningSessionRecord, PlotGraphRepo, RepoError,
};

#[derive(Default)]
struct Tables {
    games: HashMap<GameId, GameState>,
    memories: HashMap<(AgentId, GameId), AgentMemory>,
    actions: Vec<AgentAction>,
    snapshots: Vec<ConsolidationSnapshot>,
    graphs: HashMap<GameId, PlotGraph>,
    planning_sessions: Vec<PlanningSessionRecord>,
}

/// Gateway holding everything in process memory.
#[derive(Default)]
pub struct InMemoryGateway {
    tables: Mutex<Tables>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_tables<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> Result<T, RepoError> {
        let mut guard = self
            .tables
            .lock()
            .map_err(|e| RepoError::database("in_memory", e))?;
        Ok(f(&mut guard))
    }
}

#[async_trait]
impl GameStateRepo for InMemoryGateway {
    async fn save_game(&self, state: &GameState) -> Result<(), RepoError> {
        self.with_tables(|t| {
            t.games.insert(state.game_id, state.clone());
        })
    }

    async fn load_game(&self, game_id: GameId) -> Result<Option<GameState>, RepoError> {
        self.with_tables(|t| t.games.get(&game_id).cloned())
    }

    async fn delete_game(&self, game_id: GameId) -> Result<(), RepoError> {
        self.with_tables(|t| {
            t.games.remove(&game_id);
        })
    }

    async fn list_games(&self) -> Result<Vec<GameId>, RepoError> {
        self.with_tables(|t| t.games.keys().copied().collect())
    }
}

#[async_trait]
impl AgentMemoryRepo for InMemoryGateway {
    async fn save_memory(&self, memory: &AgentMemory) -> Result<(), RepoError> {
        self.with_tables(|t| {
            t.memories
                .insert((memory.agent_id.clone(), memory.game_id), memory.clone());
        })
    }

    async fn load_memory(
        &self,
        agent_id: &AgentId,
        game_id: GameId,
    ) -> Result<Option<AgentMemory>, RepoError> {
        self.with_tables(|t| t.memories.get(&(agent_id.clone(), game_id)).cloned())
    }
}

#[async_trait]
impl ActionLogRepo for InMemoryGateway {
    async fn append_action(&self, action: &AgentAction) -> Result<(), RepoError> {
        self.with_tables(|t| t.actions.push(action.clone()))
    }

    async fn actions_by_agent(
        &self,
        agent_id: &AgentId,
        game_id: GameId,
    ) -> Result<Vec<AgentAction>, RepoError> {
        self.with_tables(|t| {
            t.actions
                .iter()
                .filter(|a| &a.agent_id == agent_id && a.game_id == game_id)
                .cloned()
                .collect()
        })
    }

    async fn actions_by_type(
        &self,
        game_id: GameId,
        action_type: &str,
    ) -> Result<Vec<AgentAction>, RepoError> {
        self.with_tables(|t| {
            t.actions
                .iter()
                .filter(|a| a.game_id == game_id && a.action_type == action_type)
                .cloned()
                .collect()
        })
    }

    async fn actions_for_game(&self, game_id: GameId) -> Result<Vec<AgentAction>, RepoError> {
        self.with_tables(|t| {
            t.actions
                .iter()
                .filter(|a| a.game_id == game_id)
                .cloned()
                .collect()
        })
    }
}

#[async_trait]
impl ConsolidationRepo for InMemoryGateway {
    async fn append_snapshot(&self, snapshot: &ConsolidationSnapshot) -> Result<(), RepoError> {
        self.with_tables(|t| t.snapshots.push(snapshot.clone()))
    }

    async fn latest_snapshot(
        &self,
        agent_id: &AgentId,
        game_id: GameId,
    ) -> Result<Option<ConsolidationSnapshot>, RepoError> {
        self.with_tables(|t| {
            t.snapshots
                .iter()
                .rev()
                .find(|s| &s.agent_id == agent_id && s.game_id == game_id)
                .cloned()
        })
    }

    async fn snapshot_history(
        &self,
        agent_id: &AgentId,
        game_id: GameId,
        limit: usize,
    ) -> Result<Vec<ConsolidationSnapshot>, RepoError> {
        self.with_tables(|t| {
            t.snapshots
                .iter()
                .rev()
                .filter(|s| &s.agent_id == agent_id && s.game_id == game_id)
                .take(limit)
                .cloned()
                .collect()
        })
    }
}

#[async_trait]
impl PlotGraphRepo for InMemoryGateway {
    async fn save_graph(&self, game_id: GameId, graph: &PlotGraph) -> Result<(), RepoError> {
        self.with_tables(|t| {
            t.graphs.insert(game_id, graph.clone());
        })
    }

    async fn load_graph(&self, game_id: GameId) -> Result<Option<PlotGraph>, RepoError> {
        self.with_tables(|t| t.graphs.get(&game_id).cloned())
    }

    async fn update_node_status(
        &self,
        game_id: GameId,
        node_id: &PlotNodeId,
        status: NodeStatusUpdate,
    ) -> Result<(), RepoError> {
        let updated = self.with_tables(|t| {
            let Some(graph) = t.graphs.get_mut(&game_id) else {
                return Err(RepoError::not_found("PlotGraph", game_id.to_string()));
            };
            let Some(node) = graph.nodes.get(node_id).cloned() else {
                return Err(RepoError::not_found("PlotNode", node_id.to_string()));
            };
            let next = match status {
                NodeStatusUpdate::Triggered => Ok(node.mark_triggered()),
                NodeStatusUpdate::Completed => node.mark_completed(),
                NodeStatusUpdate::Abandoned => node.mark_abandoned(),
            }
            .map_err(|e| RepoError::database("plot_nodes", e))?;
            graph.insert_node(next);
            Ok(())
        })?;
        updated
    }

    async fn save_planning_session(
        &self,
        record: &PlanningSessionRecord,
    ) -> Result<(), RepoError> {
        self.with_tables(|t| t.planning_sessions.push(record.clone()))
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    async fn delete_all_agent_data_for_game(&self, game_id: GameId) -> Result<(), RepoError> {
        self.with_tables(|t| {
            t.memories.retain(|(_, gid), _| *gid != game_id);
            t.actions.retain(|a| a.game_id != game_id);
            t.snapshots.retain(|s| s.game_id != game_id);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use questweaver_domain::{
        ActionContext, Beat, BeatType, CharacterSheet, Difficulty, MemoryMessage, NodePosition,
        PlotNode, StatBlock, SystemType,
    };

    fn state() -> GameState {
        GameState::new(
            "Elena",
            "backstory",
            SystemType::SystemIntegration,
            Difficulty::Normal,
            CharacterSheet::new(StatBlock::uniform(10)),
        )
    }

    #[tokio::test]
    async fn game_state_round_trips() {
        let gateway = InMemoryGateway::new();
        let state = state();
        gateway.save_game(&state).await.expect("save");
        let loaded = gateway.load_game(state.game_id).await.expect("load");
        assert_eq!(loaded, Some(state));
    }

    #[tokio::test]
    async fn delete_all_agent_data_is_scoped_to_the_game() {
        let gateway = InMemoryGateway::new();
        let game_a = GameId::new();
        let game_b = GameId::new();

        for game_id in [game_a, game_b] {
            let mut memory = AgentMemory::new(AgentId::new("narrator"), game_id);
            memory.push(MemoryMessage::user("hello"));
            gateway.save_memory(&memory).await.expect("save memory");
            gateway
                .append_action(&AgentAction::new(
                    AgentId::new("narrator"),
                    game_id,
                    "narration",
                    serde_json::json!({}),
                    "test",
                    ActionContext::at_level(1),
                    Utc::now(),
                ))
                .await
                .expect("append action");
        }

        gateway
            .delete_all_agent_data_for_game(game_a)
            .await
            .expect("wipe");

        assert!(gateway
            .load_memory(&AgentId::new("narrator"), game_a)
            .await
            .expect("load")
            .is_none());
        assert!(gateway
            .load_memory(&AgentId::new("narrator"), game_b)
            .await
            .expect("load")
            .is_some());
        assert_eq!(gateway.actions_for_game(game_b).await.expect("query").len(), 1);
    }

    #[tokio::test]
    async fn node_status_updates_are_idempotent() {
        let gateway = InMemoryGateway::new();
        let game_id = GameId::new();
        let mut graph = PlotGraph::new();
        graph.insert_node(PlotNode::new(
            "node_a",
            Beat {
                beat_type: BeatType::Revelation,
                description: "beat".into(),
                trigger_level: 3,
                involved_npcs: vec![],
                involved_locations: vec![],
                foreshadowing: None,
            },
            NodePosition::new(1, 1, 0),
        ));
        gateway.save_graph(game_id, &graph).await.expect("save");

        let node_id = PlotNodeId::new("node_a");
        for _ in 0..2 {
            gateway
                .update_node_status(game_id, &node_id, NodeStatusUpdate::Triggered)
                .await
                .expect("trigger");
        }
        let graph = gateway
            .load_graph(game_id)
            .await
            .expect("load")
            .expect("present");
        let node = graph.node(&node_id).expect("node");
        assert!(node.triggered && !node.completed);
    }
}
