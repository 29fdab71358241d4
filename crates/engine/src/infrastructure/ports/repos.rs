//! Persistence gateway port traits.
//!
//! The gateway is opaque: any transactional KV+indexed store can implement
//! these. The bundled implementations are SQLite (production) and in-memory
//! (tests).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use questweaver_domain::{
    AgentAction, AgentId, AgentMemory, GameId, GameState, PlanningSessionId, PlotGraph, PlotNodeId,
};

use super::error::RepoError;

#[async_trait]
pub trait GameStateRepo: Send + Sync {
    async fn save_game(&self, state: &GameState) -> Result<(), RepoError>;
    async fn load_game(&self, game_id: GameId) -> Result<Option<GameState>, RepoError>;
    async fn delete_game(&self, game_id: GameId) -> Result<(), RepoError>;
    async fn list_games(&self) -> Result<Vec<GameId>, RepoError>;
}

#[async_trait]
pub trait AgentMemoryRepo: Send + Sync {
    async fn save_memory(&self, memory: &AgentMemory) -> Result<(), RepoError>;
    async fn load_memory(
        &self,
        agent_id: &AgentId,
        game_id: GameId,
    ) -> Result<Option<AgentMemory>, RepoError>;
}

#[async_trait]
pub trait ActionLogRepo: Send + Sync {
    /// Append-only.
    async fn append_action(&self, action: &AgentAction) -> Result<(), RepoError>;
    async fn actions_by_agent(
        &self,
        agent_id: &AgentId,
        game_id: GameId,
    ) -> Result<Vec<AgentAction>, RepoError>;
    async fn actions_by_type(
        &self,
        game_id: GameId,
        action_type: &str,
    ) -> Result<Vec<AgentAction>, RepoError>;
    async fn actions_for_game(&self, game_id: GameId) -> Result<Vec<AgentAction>, RepoError>;
}

/// A record of one consolidation pass over an agent's memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationSnapshot {
    pub agent_id: AgentId,
    pub game_id: GameId,
    pub summary: String,
    pub messages_before: u32,
    pub messages_after: u32,
    pub tokens_before: u32,
    pub tokens_after: u32,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait ConsolidationRepo: Send + Sync {
    async fn append_snapshot(&self, snapshot: &ConsolidationSnapshot) -> Result<(), RepoError>;
    async fn latest_snapshot(
        &self,
        agent_id: &AgentId,
        game_id: GameId,
    ) -> Result<Option<ConsolidationSnapshot>, RepoError>;
    async fn snapshot_history(
        &self,
        agent_id: &AgentId,
        game_id: GameId,
        limit: usize,
    ) -> Result<Vec<ConsolidationSnapshot>, RepoError>;
}

/// Status change applied to a stored plot node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatusUpdate {
    Triggered,
    Completed,
    Abandoned,
}

/// Summary row for one background planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningSessionRecord {
    pub id: PlanningSessionId,
    pub game_id: GameId,
    pub mode: String,
    pub consensus: String,
    pub accepted_nodes: u32,
    pub rejected_nodes: u32,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait PlotGraphRepo: Send + Sync {
    async fn save_graph(&self, game_id: GameId, graph: &PlotGraph) -> Result<(), RepoError>;
    async fn load_graph(&self, game_id: GameId) -> Result<Option<PlotGraph>, RepoError>;
    /// Idempotent node status transition applied directly to the store.
    async fn update_node_status(
        &self,
        game_id: GameId,
        node_id: &PlotNodeId,
        status: NodeStatusUpdate,
    ) -> Result<(), RepoError>;
    async fn save_planning_session(
        &self,
        record: &PlanningSessionRecord,
    ) -> Result<(), RepoError>;
}

/// The full gateway: every repo family plus the transactional wipe.
#[async_trait]
pub trait PersistenceGateway:
    GameStateRepo + AgentMemoryRepo + ActionLogRepo + ConsolidationRepo + PlotGraphRepo
{
    /// Remove all agent memories, actions, and consolidation snapshots for a
    /// game in one transaction.
    async fn delete_all_agent_data_for_game(&self, game_id: GameId) -> Result<(), RepoError>;
}
