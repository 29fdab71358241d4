//! Deterministic test support: a scripted LLM and state builders.
//!
//! Exposed as a normal module so integration tests in `tests/` can use it.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream;

use questweaver_domain::{CharacterSheet, Difficulty, GameState, StatBlock, SystemType};

use crate::infrastructure::ports::{
    FinishReason, LlmError, LlmPort, LlmRequest, LlmResponse, TextStream,
};

/// Marker present in every planner proposal prompt (see `prompts`).
pub const PLANNER_MARKER: &str = "plan future story beats";
/// Marker present in every consolidation prompt (see `agents`).
pub const CONSOLIDATION_MARKER: &str = "Summarize the following conversation";

/// Reply used when every matching queue is exhausted.
const FALLBACK_REPLY: &str = "The System hums quietly, offering no further guidance.";

struct Route {
    marker: String,
    replies: VecDeque<String>,
}

/// Deterministic scripted LLM.
///
/// Requests whose system prompt or latest message contains a routed marker
/// consume from that route's queue; everything else consumes from the
/// default queue. Exhausted queues fall back to a fixed harmless reply, so
/// background work (the planner, consolidation) can never steal replies
/// scripted for the turn path.
pub struct ScriptedLlm {
    default_replies: Mutex<VecDeque<String>>,
    routes: Mutex<Vec<Route>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self {
            default_replies: Mutex::new(VecDeque::new()),
            routes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_replies(replies: Vec<String>) -> Self {
        let llm = Self::new();
        if let Ok(mut queue) = llm.default_replies.lock() {
            queue.extend(replies);
        }
        llm
    }

    /// Scripted LLM for turn-flow tests: planner and consolidation traffic
    /// is routed away from the default queue.
    pub fn for_turns(replies: Vec<String>) -> Self {
        Self::with_replies(replies)
            .with_route(PLANNER_MARKER, vec![])
            .with_route(CONSOLIDATION_MARKER, vec![])
    }

    pub fn with_route(self, marker: &str, replies: Vec<String>) -> Self {
        if let Ok(mut routes) = self.routes.lock() {
            routes.push(Route {
                marker: marker.to_string(),
                replies: replies.into(),
            });
        }
        self
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        if let Ok(mut queue) = self.default_replies.lock() {
            queue.push_back(reply.into());
        }
    }

    /// Replies left in the default queue (for asserting consumption).
    pub fn remaining(&self) -> usize {
        self.default_replies.lock().map(|q| q.len()).unwrap_or(0)
    }

    fn next_reply(&self, request: &LlmRequest) -> String {
        let mut haystack = request.system_prompt.clone().unwrap_or_default();
        if let Some(last) = request.messages.last() {
            haystack.push('\n');
            haystack.push_str(&last.content);
        }

        if let Ok(mut routes) = self.routes.lock() {
            for route in routes.iter_mut() {
                if haystack.contains(&route.marker) {
                    return route
                        .replies
                        .pop_front()
                        .unwrap_or_else(|| FALLBACK_REPLY.to_string());
                }
            }
        }

        self.default_replies
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or_else(|| FALLBACK_REPLY.to_string())
    }
}

impl Default for ScriptedLlm {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmPort for ScriptedLlm {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        Ok(LlmResponse {
            content: self.next_reply(&request),
            finish_reason: FinishReason::Stop,
            usage: None,
        })
    }

    async fn generate_stream(&self, request: LlmRequest) -> Result<TextStream, LlmError> {
        let reply = self.next_reply(&request);
        // Two fragments, to exercise concatenation at the consumer.
        let midpoint = reply
            .char_indices()
            .nth(reply.chars().count() / 2)
            .map(|(i, _)| i)
            .unwrap_or(0);
        let (head, tail) = reply.split_at(midpoint);
        let fragments: Vec<Result<String, LlmError>> = [head, tail]
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| Ok(s.to_string()))
            .collect();
        Ok(Box::pin(stream::iter(fragments)))
    }
}

/// A baseline test state: Elena, System Integration, normal difficulty.
pub fn test_state(system_type: SystemType) -> GameState {
    GameState::new(
        "Elena",
        "A quiet librarian who shelved the wrong book.",
        system_type,
        Difficulty::Normal,
        CharacterSheet::new(StatBlock::uniform(10)),
    )
}

/// A Game Master reply that plans a combat scene against `target`.
pub fn combat_plan_reply(target: &str) -> String {
    format!(
        r#"{{
        "primaryAction": {{"type": "COMBAT", "target": "{target}",
            "description": "You close the distance and strike."}},
        "suggestedActions": [
            {{"action": "Press the attack", "riskLevel": "RISKY"}},
            {{"action": "Fall back and recover", "riskLevel": "SAFE"}}
        ],
        "sceneTone": "TENSE"
    }}"#
    )
}

/// A Game Master reply that plans a quest turn-in.
pub fn quest_plan_reply() -> String {
    r#"{
        "primaryAction": {"type": "QUEST_ACTION",
            "description": "You present your completed work."},
        "suggestedActions": [{"action": "Ask about the next task", "riskLevel": "SAFE"}],
        "sceneTone": "TRIUMPHANT"
    }"#
    .to_string()
}
