//! The Game Master agent: turns a situation into a scene plan.

use serde_json::json;

use questweaver_domain::{ActionContext, AgentId, GameState};

use crate::agents::{Agent, AgentError, AgentRuntime};
use crate::prompts;
use crate::scene::plan::{parse_scene_plan, ScenePlan};

pub const GAME_MASTER_AGENT_ID: &str = "game_master";

/// Outcome of a planning call: the plan plus whether the transport failed
/// and the minimal fallback had to stand in.
#[derive(Debug)]
pub struct PlanOutcome {
    pub plan: ScenePlan,
    pub degraded: bool,
}

pub struct GameMaster {
    agent: Agent,
}

impl GameMaster {
    pub async fn start(runtime: &AgentRuntime, state: &GameState) -> Result<Self, AgentError> {
        let agent = runtime
            .start_agent(
                AgentId::new(GAME_MASTER_AGENT_ID),
                state.game_id,
                prompts::game_master_system(state),
            )
            .await?;
        Ok(Self { agent })
    }

    pub fn agent_mut(&mut self) -> &mut Agent {
        &mut self.agent
    }

    /// Plan the scene for one complex turn. Transport failures degrade to
    /// the minimal plan; parse failures are absorbed per-field.
    pub async fn plan_scene(
        &mut self,
        input: &str,
        state: &GameState,
        recent_events: &[String],
    ) -> PlanOutcome {
        let npcs_here = state.npcs_here();
        let npc_names: Vec<String> = npcs_here.iter().map(|n| n.name.clone()).collect();
        let situation = prompts::game_master_situation(state, input, recent_events, &npcs_here);

        let (plan, degraded) = match self.agent.send_message(&situation).await {
            Ok(raw) => (parse_scene_plan(&raw, &npc_names), false),
            Err(e) => {
                tracing::warn!(error = %e, "Game Master unavailable, using fallback plan");
                (ScenePlan::fallback(), true)
            }
        };

        let log_result = self
            .agent
            .log_action(
                "scene_planned",
                json!({
                    "primaryAction": plan.primary_action.action_type,
                    "tone": plan.scene_tone,
                    "degraded": degraded,
                }),
                &plan.primary_action.description,
                ActionContext::at_level(state.character_sheet.level)
                    .with_location(state.current_location.clone()),
            )
            .await;
        if let Err(e) = log_result {
            tracing::warn!(error = %e, "Failed to log scene plan action");
        }

        PlanOutcome { plan, degraded }
    }
}
