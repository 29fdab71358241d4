//! Agent runtime: conversation-stateful wrappers around the LLM transport.
//!
//! `AgentRuntime::start_agent` binds an agent id to its persistent memory
//! and returns an [`Agent`]. `Agent::send_message` consumes transport
//! fragments as they arrive, mirrors the exchange into memory, flags the
//! memory for consolidation past the token limit, and auto-saves every few
//! interactions. Consolidation is an explicit call by the agent's owner,
//! because it costs another LLM round trip.

use std::sync::Arc;

use futures_util::StreamExt;
use thiserror::Error;

use questweaver_domain::{
    estimate_tokens, ActionContext, AgentAction, AgentId, AgentMemory, GameId, MemoryMessage,
};
use questweaver_shared::MemoryLimits;

use crate::infrastructure::ports::{
    ChatMessage, ClockPort, ConsolidationSnapshot, LlmError, LlmPort, LlmRequest,
    PersistenceGateway, RepoError,
};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("LLM failure: {0}")]
    Llm(#[from] LlmError),
    #[error("Persistence failure: {0}")]
    Repo(#[from] RepoError),
}

/// Factory binding agents to their memory and transport.
pub struct AgentRuntime {
    llm: Arc<dyn LlmPort>,
    gateway: Arc<dyn PersistenceGateway>,
    clock: Arc<dyn ClockPort>,
    limits: MemoryLimits,
}

impl AgentRuntime {
    pub fn new(
        llm: Arc<dyn LlmPort>,
        gateway: Arc<dyn PersistenceGateway>,
        clock: Arc<dyn ClockPort>,
        limits: MemoryLimits,
    ) -> Self {
        Self {
            llm,
            gateway,
            clock,
            limits,
        }
    }

    /// Start (or resume) an agent conversation. Memory loads lazily on
    /// first use; a fresh agent starts with an empty transcript.
    pub async fn start_agent(
        &self,
        agent_id: AgentId,
        game_id: GameId,
        system_prompt: impl Into<String>,
    ) -> Result<Agent, AgentError> {
        let memory = self
            .gateway
            .load_memory(&agent_id, game_id)
            .await?
            .unwrap_or_else(|| AgentMemory::new(agent_id.clone(), game_id));

        Ok(Agent {
            id: agent_id,
            game_id,
            system_prompt: system_prompt.into(),
            memory,
            llm: Arc::clone(&self.llm),
            gateway: Arc::clone(&self.gateway),
            clock: Arc::clone(&self.clock),
            limits: self.limits,
            interactions_since_save: 0,
            needs_consolidation: false,
        })
    }
}

/// One live agent conversation.
pub struct Agent {
    id: AgentId,
    game_id: GameId,
    system_prompt: String,
    memory: AgentMemory,
    llm: Arc<dyn LlmPort>,
    gateway: Arc<dyn PersistenceGateway>,
    clock: Arc<dyn ClockPort>,
    limits: MemoryLimits,
    interactions_since_save: u32,
    needs_consolidation: bool,
}

impl Agent {
    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn memory(&self) -> &AgentMemory {
        &self.memory
    }

    pub fn needs_consolidation(&self) -> bool {
        self.needs_consolidation
    }

    /// Send one message and return the complete reply. Fragments are
    /// consumed incrementally from the transport; a mid-stream error
    /// surfaces as a failure after any collected prefix is discarded.
    pub async fn send_message(&mut self, text: &str) -> Result<String, AgentError> {
        let request = self.build_request(text);

        let mut stream = self.llm.generate_stream(request).await?;
        let mut reply = String::new();
        while let Some(fragment) = stream.next().await {
            reply.push_str(&fragment?);
        }

        self.memory.push(MemoryMessage::user(text));
        self.memory.push(MemoryMessage::assistant(reply.clone()));

        if self.memory.needs_consolidation(self.limits.token_limit) {
            if !self.needs_consolidation {
                tracing::warn!(
                    agent_id = %self.id,
                    estimated_tokens = self.memory.estimated_tokens(),
                    token_limit = self.limits.token_limit,
                    "Agent memory exceeds token limit, flagging for consolidation"
                );
            }
            self.needs_consolidation = true;
        }

        self.interactions_since_save += 1;
        if self.interactions_since_save >= self.limits.auto_save_interval {
            self.save_memory().await?;
        }

        Ok(reply)
    }

    /// Summarize everything but the most recent messages and fold it into
    /// the consolidated context. Appends a snapshot for audit.
    pub async fn consolidate(&mut self) -> Result<(), AgentError> {
        let messages_before = self.memory.messages.len() as u32;
        let tokens_before = self.memory.estimated_tokens();

        let transcript = self
            .memory
            .messages
            .iter()
            .map(|m| {
                let speaker = match m.role {
                    questweaver_domain::ChatRole::User => "USER",
                    questweaver_domain::ChatRole::Assistant => "ASSISTANT",
                    questweaver_domain::ChatRole::System => "SYSTEM",
                };
                format!("{speaker}: {}", m.content)
            })
            .collect::<Vec<_>>()
            .join("\n");

        let mut prompt = String::from(
            "Summarize the following conversation so it can replace the older messages. \
             Preserve named characters, promises made, quest states, and unresolved threads. \
             Reply with the summary only.\n\n",
        );
        if let Some(previous) = &self.memory.consolidated_context {
            prompt.push_str("Earlier summary to fold in:\n");
            prompt.push_str(previous);
            prompt.push_str("\n\n");
        }
        prompt.push_str(&transcript);

        let response = self
            .llm
            .generate(LlmRequest::new(vec![ChatMessage::user(prompt)]))
            .await?;

        let now = self.clock.now();
        self.memory
            .consolidate(response.content, self.limits.keep_recent_messages, now);
        self.needs_consolidation = false;

        let snapshot = ConsolidationSnapshot {
            agent_id: self.id.clone(),
            game_id: self.game_id,
            summary: self.memory.consolidated_context.clone().unwrap_or_default(),
            messages_before,
            messages_after: self.memory.messages.len() as u32,
            tokens_before,
            tokens_after: self.memory.estimated_tokens(),
            created_at: now,
        };
        self.gateway.append_snapshot(&snapshot).await?;
        self.save_memory().await?;

        tracing::info!(
            agent_id = %self.id,
            tokens_before,
            tokens_after = snapshot.tokens_after,
            "Consolidated agent memory"
        );
        Ok(())
    }

    /// Append a structured decision to the action log.
    pub async fn log_action(
        &self,
        action_type: &str,
        action_data: serde_json::Value,
        reasoning: &str,
        context: ActionContext,
    ) -> Result<(), AgentError> {
        if !self.limits.enable_action_logging {
            return Ok(());
        }
        let action = AgentAction::new(
            self.id.clone(),
            self.game_id,
            action_type,
            action_data,
            reasoning,
            context,
            self.clock.now(),
        );
        self.gateway.append_action(&action).await?;
        Ok(())
    }

    /// Persist memory immediately (shutdown path).
    pub async fn force_save(&mut self) -> Result<(), AgentError> {
        self.save_memory().await
    }

    async fn save_memory(&mut self) -> Result<(), AgentError> {
        self.gateway.save_memory(&self.memory).await?;
        self.interactions_since_save = 0;
        Ok(())
    }

    fn build_request(&self, text: &str) -> LlmRequest {
        let mut system = self.system_prompt.clone();
        if let Some(context) = &self.memory.consolidated_context {
            system.push_str("\n\nEarlier events, summarized:\n");
            system.push_str(context);
        }

        let mut messages: Vec<ChatMessage> = self
            .memory
            .messages
            .iter()
            .map(|m| match m.role {
                questweaver_domain::ChatRole::User => ChatMessage::user(&m.content),
                questweaver_domain::ChatRole::Assistant => ChatMessage::assistant(&m.content),
                questweaver_domain::ChatRole::System => ChatMessage::system(&m.content),
            })
            .collect();
        messages.push(ChatMessage::user(text));

        LlmRequest::new(messages).with_system_prompt(system)
    }

    /// Estimated prompt size if a message were sent now.
    pub fn estimated_tokens(&self) -> u32 {
        self.memory.estimated_tokens() + estimate_tokens(&self.system_prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::InMemoryGateway;
    use crate::infrastructure::ports::SystemClock;
    use crate::infrastructure::ports::{AgentMemoryRepo, ConsolidationRepo};
    use crate::test_fixtures::ScriptedLlm;

    fn runtime(llm: Arc<ScriptedLlm>) -> AgentRuntime {
        AgentRuntime::new(
            llm,
            Arc::new(InMemoryGateway::new()),
            Arc::new(SystemClock),
            MemoryLimits::default(),
        )
    }

    #[tokio::test]
    async fn send_message_appends_both_sides_to_memory() {
        let llm = Arc::new(ScriptedLlm::with_replies(vec!["Well met.".into()]));
        let runtime = runtime(llm);
        let mut agent = runtime
            .start_agent(AgentId::new("narrator"), GameId::new(), "You narrate.")
            .await
            .expect("start");

        let reply = agent.send_message("hello").await.expect("reply");
        assert_eq!(reply, "Well met.");
        assert_eq!(agent.memory().messages.len(), 2);
    }

    #[tokio::test]
    async fn token_overflow_flags_consolidation() {
        let llm = Arc::new(ScriptedLlm::with_replies(vec!["x".repeat(600)]));
        let gateway = Arc::new(InMemoryGateway::new());
        let limits = MemoryLimits {
            token_limit: 100,
            ..MemoryLimits::default()
        };
        let runtime = AgentRuntime::new(llm, gateway, Arc::new(SystemClock), limits);
        let mut agent = runtime
            .start_agent(AgentId::new("narrator"), GameId::new(), "You narrate.")
            .await
            .expect("start");

        agent.send_message("hello").await.expect("reply");
        assert!(agent.needs_consolidation());
    }

    #[tokio::test]
    async fn consolidation_shrinks_memory_and_snapshots() {
        let mut replies: Vec<String> = (0..30).map(|i| format!("a long reply number {i} {}", "pad ".repeat(30))).collect();
        replies.push("the story so far, in brief".to_string());
        let llm = Arc::new(ScriptedLlm::with_replies(replies));
        let gateway = Arc::new(InMemoryGateway::new());
        let limits = MemoryLimits {
            token_limit: 200,
            keep_recent_messages: 4,
            ..MemoryLimits::default()
        };
        let runtime = AgentRuntime::new(
            Arc::clone(&llm) as Arc<dyn LlmPort>,
            Arc::clone(&gateway) as Arc<dyn PersistenceGateway>,
            Arc::new(SystemClock),
            limits,
        );
        let game_id = GameId::new();
        let mut agent = runtime
            .start_agent(AgentId::new("narrator"), game_id, "You narrate.")
            .await
            .expect("start");

        for i in 0..30 {
            agent.send_message(&format!("turn {i}")).await.expect("reply");
            if agent.needs_consolidation() {
                break;
            }
        }
        assert!(agent.needs_consolidation());

        let tokens_before = agent.memory().estimated_tokens();
        agent.consolidate().await.expect("consolidate");
        assert!(agent.memory().estimated_tokens() < tokens_before);
        assert_eq!(agent.memory().messages.len(), 4);
        assert_eq!(agent.memory().consolidation_count, 1);

        let snapshot = gateway
            .latest_snapshot(&AgentId::new("narrator"), game_id)
            .await
            .expect("query")
            .expect("present");
        assert!(snapshot.tokens_after < snapshot.tokens_before);
    }

    mockall::mock! {
        Clock {}
        impl crate::infrastructure::ports::ClockPort for Clock {
            fn now(&self) -> chrono::DateTime<chrono::Utc>;
        }
    }

    #[tokio::test]
    async fn consolidation_stamps_the_injected_clock() {
        let fixed = chrono::DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .expect("valid timestamp")
            .with_timezone(&chrono::Utc);
        let mut clock = MockClock::new();
        clock.expect_now().returning(move || fixed);

        let llm = Arc::new(ScriptedLlm::with_replies(vec![
            "x".repeat(600),
            "summary".to_string(),
        ]));
        let limits = MemoryLimits {
            token_limit: 100,
            keep_recent_messages: 2,
            ..MemoryLimits::default()
        };
        let runtime = AgentRuntime::new(
            llm,
            Arc::new(InMemoryGateway::new()),
            Arc::new(clock),
            limits,
        );
        let mut agent = runtime
            .start_agent(AgentId::new("narrator"), GameId::new(), "You narrate.")
            .await
            .expect("start");

        agent.send_message("hello").await.expect("reply");
        assert!(agent.needs_consolidation());
        agent.consolidate().await.expect("consolidate");
        assert_eq!(agent.memory().last_consolidated, Some(fixed));
    }

    #[tokio::test]
    async fn auto_save_persists_every_interval() {
        let llm = Arc::new(ScriptedLlm::with_replies(
            (0..6).map(|i| format!("reply {i}")).collect(),
        ));
        let gateway = Arc::new(InMemoryGateway::new());
        let limits = MemoryLimits {
            auto_save_interval: 3,
            ..MemoryLimits::default()
        };
        let runtime = AgentRuntime::new(
            llm,
            Arc::clone(&gateway) as Arc<dyn PersistenceGateway>,
            Arc::new(SystemClock),
            limits,
        );
        let game_id = GameId::new();
        let mut agent = runtime
            .start_agent(AgentId::new("narrator"), game_id, "You narrate.")
            .await
            .expect("start");

        for i in 0..2 {
            agent.send_message(&format!("turn {i}")).await.expect("reply");
        }
        assert!(gateway
            .load_memory(&AgentId::new("narrator"), game_id)
            .await
            .expect("load")
            .is_none());

        agent.send_message("turn 2").await.expect("reply");
        let saved = gateway
            .load_memory(&AgentId::new("narrator"), game_id)
            .await
            .expect("load")
            .expect("present");
        assert_eq!(saved.messages.len(), 6);
    }
}
