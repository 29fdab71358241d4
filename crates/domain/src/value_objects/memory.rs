//! Per-agent conversation memory.
//!
//! Each agent carries an ordered message transcript plus an optional
//! consolidated summary of older messages. Token counts are estimated
//! heuristically; once the estimate crosses the configured limit the memory
//! is flagged for consolidation, which the owning agent performs with an LLM
//! summary call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AgentId, GameId};

/// Role of a remembered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One remembered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryMessage {
    pub role: ChatRole,
    pub content: String,
}

impl MemoryMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Rough token estimate: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count() as u32;
    chars.div_ceil(4)
}

/// The persistent memory bound to one agent in one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMemory {
    pub agent_id: AgentId,
    pub game_id: GameId,
    pub messages: Vec<MemoryMessage>,
    pub consolidated_context: Option<String>,
    #[serde(default)]
    pub consolidation_count: u32,
    #[serde(default)]
    pub last_consolidated: Option<DateTime<Utc>>,
}

impl AgentMemory {
    pub fn new(agent_id: AgentId, game_id: GameId) -> Self {
        Self {
            agent_id,
            game_id,
            messages: Vec::new(),
            consolidated_context: None,
            consolidation_count: 0,
            last_consolidated: None,
        }
    }

    pub fn push(&mut self, message: MemoryMessage) {
        self.messages.push(message);
    }

    /// Estimated tokens across the transcript and the consolidated summary.
    pub fn estimated_tokens(&self) -> u32 {
        let messages: u32 = self
            .messages
            .iter()
            .map(|m| estimate_tokens(&m.content))
            .sum();
        let consolidated = self
            .consolidated_context
            .as_deref()
            .map(estimate_tokens)
            .unwrap_or(0);
        messages + consolidated
    }

    pub fn needs_consolidation(&self, token_limit: u32) -> bool {
        self.estimated_tokens() > token_limit
    }

    /// Replace everything but the most recent `keep_recent` messages with
    /// `summary`. The previous consolidated context is considered folded into
    /// the new summary by the summarizing agent.
    pub fn consolidate(&mut self, summary: String, keep_recent: usize, now: DateTime<Utc>) {
        let keep_from = self.messages.len().saturating_sub(keep_recent);
        self.messages.drain(..keep_from);
        self.consolidated_context = Some(summary);
        self.consolidation_count += 1;
        self.last_consolidated = Some(now);
    }
}
