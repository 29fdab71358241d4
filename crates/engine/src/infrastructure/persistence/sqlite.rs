//! SQLite persistence gateway.
//!
//! One table per aggregate with a JSON payload column; indexed lookup
//! columns are duplicated out of the payload. `delete_all_agent_data_for_game`
//! runs in a single transaction.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use questweaver_domain::{
    AgentAction, AgentId, AgentMemory, GameId, GameState, PlotGraph, PlotNodeId,
};

use crate::infrastructure::ports::{
    ActionLogRepo, AgentMemoryRepo, ConsolidationRepo, ConsolidationSnapshot, GameStateRepo,
    NodeStatusUpdate, PersistenceGateway, PlanningSessionRecord, PlotGraphRepo, RepoError,
};

/// SQLite implementation of the persistence gateway.
pub struct SqliteGateway {
    pool: SqlitePool,
}

impl SqliteGateway {
    pub async fn new(db_path: &str) -> Result<Self, RepoError> {
        let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", db_path))
            .await
            .map_err(|e| RepoError::database("connect", e))?;
        let gateway = Self { pool };
        gateway.migrate().await?;
        Ok(gateway)
    }

    /// In-process database, handy for integration tests. A single pooled
    /// connection keeps every caller on the same in-memory database.
    pub async fn in_memory() -> Result<Self, RepoError> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| RepoError::database("connect", e))?;
        let gateway = Self { pool };
        gateway.migrate().await?;
        Ok(gateway)
    }

    async fn migrate(&self) -> Result<(), RepoError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS games (
                game_id TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS agent_memories (
                agent_id TEXT NOT NULL,
                game_id TEXT NOT NULL,
                payload TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (agent_id, game_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS agent_actions (
                id TEXT PRIMARY KEY,
                agent_id TEXT NOT NULL,
                game_id TEXT NOT NULL,
                action_type TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_agent_actions_game
                ON agent_actions (game_id, action_type)
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS consolidations (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                agent_id TEXT NOT NULL,
                game_id TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS plot_graphs (
                game_id TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS planning_sessions (
                id TEXT PRIMARY KEY,
                game_id TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        ];
        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| RepoError::database("migrate", e))?;
        }
        Ok(())
    }
}

fn to_json<T: serde::Serialize>(context: &str, value: &T) -> Result<String, RepoError> {
    serde_json::to_string(value).map_err(|e| RepoError::serialization(context, e))
}

fn from_json<T: serde::de::DeserializeOwned>(context: &str, raw: &str) -> Result<T, RepoError> {
    serde_json::from_str(raw).map_err(|e| RepoError::serialization(context, e))
}

#[async_trait]
impl GameStateRepo for SqliteGateway {
    async fn save_game(&self, state: &GameState) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO games (game_id, payload, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(game_id) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(state.game_id.to_string())
        .bind(to_json("games", state)?)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("games", e))?;
        Ok(())
    }

    async fn load_game(&self, game_id: GameId) -> Result<Option<GameState>, RepoError> {
        let row = sqlx::query("SELECT payload FROM games WHERE game_id = ?")
            .bind(game_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("games", e))?;
        row.map(|r| from_json("games", &r.get::<String, _>("payload")))
            .transpose()
    }

    async fn delete_game(&self, game_id: GameId) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM games WHERE game_id = ?")
            .bind(game_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::database("games", e))?;
        Ok(())
    }

    async fn list_games(&self) -> Result<Vec<GameId>, RepoError> {
        let rows = sqlx::query("SELECT payload FROM games ORDER BY updated_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("games", e))?;
        rows.iter()
            .map(|r| {
                from_json::<GameState>("games", &r.get::<String, _>("payload"))
                    .map(|s| s.game_id)
            })
            .collect()
    }
}

#[async_trait]
impl AgentMemoryRepo for SqliteGateway {
    async fn save_memory(&self, memory: &AgentMemory) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO agent_memories (agent_id, game_id, payload, updated_at)
            VALUES (?, ?, ?, datetime('now'))
            ON CONFLICT(agent_id, game_id) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(memory.agent_id.to_string())
        .bind(memory.game_id.to_string())
        .bind(to_json("agent_memories", memory)?)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("agent_memories", e))?;
        Ok(())
    }

    async fn load_memory(
        &self,
        agent_id: &AgentId,
        game_id: GameId,
    ) -> Result<Option<AgentMemory>, RepoError> {
        let row =
            sqlx::query("SELECT payload FROM agent_memories WHERE agent_id = ? AND game_id = ?")
                .bind(agent_id.to_string())
                .bind(game_id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RepoError::database("agent_memories", e))?;
        row.map(|r| from_json("agent_memories", &r.get::<String, _>("payload")))
            .transpose()
    }
}

#[async_trait]
impl ActionLogRepo for SqliteGateway {
    async fn append_action(&self, action: &AgentAction) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO agent_actions (id, agent_id, game_id, action_type, payload, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(action.id.to_string())
        .bind(action.agent_id.to_string())
        .bind(action.game_id.to_string())
        .bind(&action.action_type)
        .bind(to_json("agent_actions", action)?)
        .bind(action.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("agent_actions", e))?;
        Ok(())
    }

    async fn actions_by_agent(
        &self,
        agent_id: &AgentId,
        game_id: GameId,
    ) -> Result<Vec<AgentAction>, RepoError> {
        let rows = sqlx::query(
            "SELECT payload FROM agent_actions WHERE agent_id = ? AND game_id = ? ORDER BY created_at",
        )
        .bind(agent_id.to_string())
        .bind(game_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("agent_actions", e))?;
        rows.iter()
            .map(|r| from_json("agent_actions", &r.get::<String, _>("payload")))
            .collect()
    }

    async fn actions_by_type(
        &self,
        game_id: GameId,
        action_type: &str,
    ) -> Result<Vec<AgentAction>, RepoError> {
        let rows = sqlx::query(
            "SELECT payload FROM agent_actions WHERE game_id = ? AND action_type = ? ORDER BY created_at",
        )
        .bind(game_id.to_string())
        .bind(action_type)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("agent_actions", e))?;
        rows.iter()
            .map(|r| from_json("agent_actions", &r.get::<String, _>("payload")))
            .collect()
    }

    async fn actions_for_game(&self, game_id: GameId) -> Result<Vec<AgentAction>, RepoError> {
        let rows =
            sqlx::query("SELECT payload FROM agent_actions WHERE game_id = ? ORDER BY created_at")
                .bind(game_id.to_string())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| RepoError::database("agent_actions", e))?;
        rows.iter()
            .map(|r| from_json("agent_actions", &r.get::<String, _>("payload")))
            .collect()
    }
}

#[async_trait]
impl ConsolidationRepo for SqliteGateway {
    async fn append_snapshot(&self, snapshot: &ConsolidationSnapshot) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO consolidations (agent_id, game_id, payload, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(snapshot.agent_id.to_string())
        .bind(snapshot.game_id.to_string())
        .bind(to_json("consolidations", snapshot)?)
        .bind(snapshot.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("consolidations", e))?;
        Ok(())
    }

    async fn latest_snapshot(
        &self,
        agent_id: &AgentId,
        game_id: GameId,
    ) -> Result<Option<ConsolidationSnapshot>, RepoError> {
        let row = sqlx::query(
            r#"
            SELECT payload FROM consolidations
            WHERE agent_id = ? AND game_id = ?
            ORDER BY seq DESC LIMIT 1
            "#,
        )
        .bind(agent_id.to_string())
        .bind(game_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::database("consolidations", e))?;
        row.map(|r| from_json("consolidations", &r.get::<String, _>("payload")))
            .transpose()
    }

    async fn snapshot_history(
        &self,
        agent_id: &AgentId,
        game_id: GameId,
        limit: usize,
    ) -> Result<Vec<ConsolidationSnapshot>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT payload FROM consolidations
            WHERE agent_id = ? AND game_id = ?
            ORDER BY seq DESC LIMIT ?
            "#,
        )
        .bind(agent_id.to_string())
        .bind(game_id.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("consolidations", e))?;
        rows.iter()
            .map(|r| from_json("consolidations", &r.get::<String, _>("payload")))
            .collect()
    }
}

#[async_trait]
impl PlotGraphRepo for SqliteGateway {
    async fn save_graph(&self, game_id: GameId, graph: &PlotGraph) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO plot_graphs (game_id, payload, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(game_id) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(game_id.to_string())
        .bind(to_json("plot_graphs", graph)?)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("plot_graphs", e))?;
        Ok(())
    }

    async fn load_graph(&self, game_id: GameId) -> Result<Option<PlotGraph>, RepoError> {
        let row = sqlx::query("SELECT payload FROM plot_graphs WHERE game_id = ?")
            .bind(game_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("plot_graphs", e))?;
        row.map(|r| from_json("plot_graphs", &r.get::<String, _>("payload")))
            .transpose()
    }

    async fn update_node_status(
        &self,
        game_id: GameId,
        node_id: &PlotNodeId,
        status: NodeStatusUpdate,
    ) -> Result<(), RepoError> {
        let mut graph = self
            .load_graph(game_id)
            .await?
            .ok_or_else(|| RepoError::not_found("PlotGraph", game_id.to_string()))?;
        let node = graph
            .node(node_id)
            .cloned()
            .ok_or_else(|| RepoError::not_found("PlotNode", node_id.to_string()))?;
        let next = match status {
            NodeStatusUpdate::Triggered => Ok(node.mark_triggered()),
            NodeStatusUpdate::Completed => node.mark_completed(),
            NodeStatusUpdate::Abandoned => node.mark_abandoned(),
        }
        .map_err(|e| RepoError::database("plot_nodes", e))?;
        graph.insert_node(next);
        self.save_graph(game_id, &graph).await
    }

    async fn save_planning_session(
        &self,
        record: &PlanningSessionRecord,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO planning_sessions (id, game_id, payload, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.game_id.to_string())
        .bind(to_json("planning_sessions", record)?)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("planning_sessions", e))?;
        Ok(())
    }
}

#[async_trait]
impl PersistenceGateway for SqliteGateway {
    async fn delete_all_agent_data_for_game(&self, game_id: GameId) -> Result<(), RepoError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::database("transaction", e))?;
        let key = game_id.to_string();
        for statement in [
            "DELETE FROM agent_memories WHERE game_id = ?",
            "DELETE FROM agent_actions WHERE game_id = ?",
            "DELETE FROM consolidations WHERE game_id = ?",
        ] {
            sqlx::query(statement)
                .bind(&key)
                .execute(&mut *tx)
                .await
                .map_err(|e| RepoError::database("delete_all_agent_data", e))?;
        }
        tx.commit()
            .await
            .map_err(|e| RepoError::database("transaction", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use questweaver_domain::{
        CharacterSheet, Difficulty, MemoryMessage, StatBlock, SystemType,
    };

    #[tokio::test]
    async fn game_state_round_trips_through_sqlite() {
        let gateway = SqliteGateway::in_memory().await.expect("connect");
        let state = GameState::new(
            "Elena",
            "backstory",
            SystemType::SystemIntegration,
            Difficulty::Normal,
            CharacterSheet::new(StatBlock::uniform(10)),
        );
        gateway.save_game(&state).await.expect("save");
        let loaded = gateway.load_game(state.game_id).await.expect("load");
        assert_eq!(loaded, Some(state));
    }

    #[tokio::test]
    async fn memory_upsert_replaces_payload() {
        let gateway = SqliteGateway::in_memory().await.expect("connect");
        let game_id = GameId::new();
        let mut memory = AgentMemory::new(AgentId::new("narrator"), game_id);
        gateway.save_memory(&memory).await.expect("save");

        memory.push(MemoryMessage::user("hello"));
        gateway.save_memory(&memory).await.expect("save again");

        let loaded = gateway
            .load_memory(&AgentId::new("narrator"), game_id)
            .await
            .expect("load")
            .expect("present");
        assert_eq!(loaded.messages.len(), 1);
    }

    #[tokio::test]
    async fn file_backed_database_survives_a_reconnect() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("questweaver.db");
        let path = path.to_str().expect("utf8 path");

        let state = GameState::new(
            "Elena",
            "backstory",
            SystemType::SystemIntegration,
            Difficulty::Normal,
            CharacterSheet::new(StatBlock::uniform(10)),
        );
        {
            let gateway = SqliteGateway::new(path).await.expect("connect");
            gateway.save_game(&state).await.expect("save");
        }

        let gateway = SqliteGateway::new(path).await.expect("reconnect");
        let loaded = gateway.load_game(state.game_id).await.expect("load");
        assert_eq!(loaded, Some(state));
    }

    #[tokio::test]
    async fn agent_wipe_runs_in_one_transaction() {
        let gateway = SqliteGateway::in_memory().await.expect("connect");
        let game_id = GameId::new();
        let memory = AgentMemory::new(AgentId::new("narrator"), game_id);
        gateway.save_memory(&memory).await.expect("save");

        gateway
            .delete_all_agent_data_for_game(game_id)
            .await
            .expect("wipe");
        assert!(gateway
            .load_memory(&AgentId::new("narrator"), game_id)
            .await
            .expect("load")
            .is_none());
    }
}
