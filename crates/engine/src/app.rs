//! Application composition root.
//!
//! Wires the LLM transport (wrapped in the retry client), the persistence
//! gateway, and the session registry. At most one live session exists per
//! game id.

use std::sync::Arc;

use dashmap::DashMap;

use questweaver_domain::GameId;
use questweaver_shared::GameConfig;

use crate::agents::AgentRuntime;
use crate::infrastructure::ollama::OllamaClient;
use crate::infrastructure::persistence::{InMemoryGateway, SqliteGateway};
use crate::infrastructure::ports::{ClockPort, LlmPort, PersistenceGateway, SystemClock};
use crate::infrastructure::resilient_llm::ResilientLlmClient;
use crate::orchestrator::{GameSession, SessionError};
use crate::settings::EngineSettings;

/// Install a default tracing subscriber honoring `RUST_LOG`. Optional:
/// hosts that install their own subscriber skip this.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

pub struct App {
    llm: Arc<dyn LlmPort>,
    gateway: Arc<dyn PersistenceGateway>,
    clock: Arc<dyn ClockPort>,
    settings: EngineSettings,
    sessions: DashMap<GameId, Arc<GameSession>>,
}

impl App {
    /// Compose an app from explicit ports. The raw LLM client is wrapped
    /// in the retry layer here; callers pass the bare transport.
    pub fn new(
        llm: Arc<dyn LlmPort>,
        gateway: Arc<dyn PersistenceGateway>,
        settings: EngineSettings,
    ) -> Self {
        let llm: Arc<dyn LlmPort> =
            Arc::new(ResilientLlmClient::new(llm, settings.retry.clone()));
        Self {
            llm,
            gateway,
            clock: Arc::new(SystemClock),
            settings,
            sessions: DashMap::new(),
        }
    }

    /// Compose from environment settings: Ollama transport plus SQLite (or
    /// in-memory when no database path is configured).
    pub async fn from_env() -> anyhow::Result<Self> {
        let settings = EngineSettings::from_env();
        let llm: Arc<dyn LlmPort> = Arc::new(OllamaClient::with_timeout(
            &settings.llm_base_url,
            &settings.llm_model,
            settings.llm_timeout_secs,
        ));
        let gateway: Arc<dyn PersistenceGateway> = match &settings.database_path {
            Some(path) => Arc::new(SqliteGateway::new(path).await?),
            None => Arc::new(InMemoryGateway::new()),
        };
        Ok(Self::new(llm, gateway, settings))
    }

    fn runtime_for(&self, config: &GameConfig) -> Arc<AgentRuntime> {
        Arc::new(AgentRuntime::new(
            Arc::clone(&self.llm),
            Arc::clone(&self.gateway),
            Arc::clone(&self.clock),
            config.memory_limits,
        ))
    }

    /// Start a new game and register its session.
    pub async fn start_game(&self, config: &GameConfig) -> Result<Arc<GameSession>, SessionError> {
        let runtime = self.runtime_for(config);
        let session = Arc::new(
            GameSession::start(
                runtime,
                Arc::clone(&self.llm),
                Arc::clone(&self.gateway),
                config,
                self.settings.rng_seed,
            )
            .await?,
        );
        self.sessions.insert(session.game_id(), Arc::clone(&session));
        tracing::info!(game_id = %session.game_id(), "Game started");
        Ok(session)
    }

    /// Resume a saved game. An already-live session is returned as-is.
    pub async fn resume_game(&self, game_id: GameId) -> Result<Arc<GameSession>, SessionError> {
        if let Some(existing) = self.sessions.get(&game_id) {
            return Ok(Arc::clone(&existing));
        }
        let runtime = Arc::new(AgentRuntime::new(
            Arc::clone(&self.llm),
            Arc::clone(&self.gateway),
            Arc::clone(&self.clock),
            questweaver_shared::MemoryLimits::default(),
        ));
        let session = Arc::new(
            GameSession::resume(
                runtime,
                Arc::clone(&self.llm),
                Arc::clone(&self.gateway),
                game_id,
                self.settings.rng_seed,
            )
            .await?,
        );
        self.sessions.insert(game_id, Arc::clone(&session));
        tracing::info!(game_id = %game_id, "Game resumed");
        Ok(session)
    }

    pub fn session(&self, game_id: GameId) -> Option<Arc<GameSession>> {
        self.sessions.get(&game_id).map(|s| Arc::clone(&s))
    }

    /// Flush and drop a live session.
    pub async fn close_game(&self, game_id: GameId) -> Result<(), SessionError> {
        if let Some((_, session)) = self.sessions.remove(&game_id) {
            session.shutdown().await?;
        }
        Ok(())
    }

    /// Delete a game and every trace of its agents.
    pub async fn delete_game(&self, game_id: GameId) -> Result<(), SessionError> {
        self.sessions.remove(&game_id);
        self.gateway.delete_all_agent_data_for_game(game_id).await?;
        self.gateway.delete_game(game_id).await?;
        tracing::info!(game_id = %game_id, "Game deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::ScriptedLlm;
    use questweaver_domain::SystemType;
    use questweaver_shared::CharacterCreation;

    fn app() -> App {
        App::new(
            Arc::new(ScriptedLlm::for_turns(vec![])),
            Arc::new(InMemoryGateway::new()),
            EngineSettings {
                rng_seed: Some(7),
                ..EngineSettings::default()
            },
        )
    }

    #[test]
    fn config_round_trip() {
        let config = GameConfig::new(
            SystemType::SystemIntegration,
            CharacterCreation::new("Elena"),
        );
        assert_eq!(config.memory_limits.token_limit, 40_000);
    }

    #[tokio::test]
    async fn start_registers_and_close_unregisters() {
        let app = app();
        let config = GameConfig::new(
            SystemType::SystemIntegration,
            CharacterCreation::new("Elena"),
        );
        let session = app.start_game(&config).await.expect("start");
        let game_id = session.game_id();
        assert!(app.session(game_id).is_some());

        app.close_game(game_id).await.expect("close");
        assert!(app.session(game_id).is_none());
    }

    #[tokio::test]
    async fn resume_returns_the_live_session() {
        let app = app();
        let config = GameConfig::new(
            SystemType::SystemIntegration,
            CharacterCreation::new("Elena"),
        );
        let session = app.start_game(&config).await.expect("start");
        let resumed = app.resume_game(session.game_id()).await.expect("resume");
        assert!(Arc::ptr_eq(&session, &resumed));
    }
}
