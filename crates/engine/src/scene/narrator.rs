//! The Narrator agent: renders scene plans and results into prose.

use questweaver_domain::{AgentId, GameState};

use crate::agents::{Agent, AgentError, AgentRuntime};
use crate::prompts;
use crate::scene::plan::{ReactionTiming, ScenePlan};
use crate::scene::results::SceneResults;

pub const NARRATOR_AGENT_ID: &str = "narrator";

/// Rendered prose plus whether the deterministic fallback had to stand in.
#[derive(Debug)]
pub struct Narration {
    pub prose: String,
    pub degraded: bool,
}

pub struct Narrator {
    agent: Agent,
}

impl Narrator {
    pub async fn start(runtime: &AgentRuntime, state: &GameState) -> Result<Self, AgentError> {
        let agent = runtime
            .start_agent(
                AgentId::new(NARRATOR_AGENT_ID),
                state.game_id,
                prompts::narrator_system(state.system_type),
            )
            .await?;
        Ok(Self { agent })
    }

    pub fn agent_mut(&mut self) -> &mut Agent {
        &mut self.agent
    }

    /// Opening narration for a brand-new game.
    pub async fn narrate_opening(&mut self, state: &GameState) -> Narration {
        match self.agent.send_message(&prompts::opening_narration(state)).await {
            Ok(prose) => Narration {
                prose,
                degraded: false,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Narrator unavailable for opening, using fallback");
                let location = state
                    .current_location()
                    .map(|l| l.name.clone())
                    .unwrap_or_else(|| "an unfamiliar place".to_string());
                Narration {
                    prose: format!(
                        "You come to your senses at {}. The world of {} stretches out \
                         before you, waiting.",
                        location,
                        state.system_type.display_name()
                    ),
                    degraded: true,
                }
            }
        }
    }

    /// Death narration. The respawn framing is the orchestrator's job;
    /// this only narrates the fall itself.
    pub async fn narrate_death(&mut self, state: &GameState) -> Narration {
        let request = format!(
            "Narrate {}'s death in two sentences, second person, present tense. \
             Do not narrate any revival.",
            state.player_name
        );
        match self.agent.send_message(&request).await {
            Ok(prose) => Narration {
                prose,
                degraded: false,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Narrator unavailable for death, using fallback");
                Narration {
                    prose: "Your strength gives out, and darkness closes in.".to_string(),
                    degraded: true,
                }
            }
        }
    }

    /// Render a complex turn. The prose interleaves NPC reactions at their
    /// stated timing and always ends with the suggested-action list.
    pub async fn render_scene(
        &mut self,
        plan: &ScenePlan,
        results: &SceneResults,
        state: &GameState,
        input: &str,
    ) -> Narration {
        let request = self.build_render_request(plan, results, state, input);
        match self.agent.send_message(&request).await {
            Ok(prose) => Narration {
                prose: ensure_action_list(prose, plan),
                degraded: false,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Narrator unavailable, using factual fallback");
                Narration {
                    prose: ensure_action_list(results.summary(), plan),
                    degraded: true,
                }
            }
        }
    }

    fn build_render_request(
        &self,
        plan: &ScenePlan,
        results: &SceneResults,
        state: &GameState,
        input: &str,
    ) -> String {
        let mut sections = Vec::new();
        sections.push(format!("Player input: {input}"));
        sections.push(format!(
            "Scene tone: {}. What happens: {}",
            plan.scene_tone.display_name(),
            plan.primary_action.description
        ));

        for timing in [
            ReactionTiming::Before,
            ReactionTiming::During,
            ReactionTiming::After,
        ] {
            let reactions: Vec<String> = plan
                .npc_reactions
                .iter()
                .filter(|r| r.timing == timing)
                .map(|r| match &r.dialogue {
                    Some(line) => format!("{} {} and says: \"{line}\"", r.npc_name, r.reaction),
                    None => format!("{} {}", r.npc_name, r.reaction),
                })
                .collect();
            if !reactions.is_empty() {
                sections.push(format!(
                    "NPC reactions ({:?}): {}",
                    timing,
                    reactions.join("; ")
                ));
            }
        }

        if !plan.environmental_effects.is_empty() {
            sections.push(format!(
                "Environment: {}",
                plan.environmental_effects.join("; ")
            ));
        }
        sections.push(format!("Mechanical outcome: {}", results.summary()));

        let quest_block = quest_context_block(state);
        if !quest_block.is_empty() {
            sections.push(quest_block);
        }

        let actions: Vec<String> = plan
            .suggested_actions
            .iter()
            .map(|a| a.action.clone())
            .collect();
        sections.push(format!(
            "Finish with these available actions, in order, one per line, \
             each prefixed '> ': {}",
            actions.join(" | ")
        ));

        sections.join("\n\n")
    }
}

/// Quest context block: description, completed objectives (✓), the next
/// objective (▶), and the remaining ones (○). The narrator honors this
/// block so the player is never left without a direction.
pub fn quest_context_block(state: &GameState) -> String {
    if state.active_quests.is_empty() {
        return String::new();
    }
    let mut lines = vec!["Active quests:".to_string()];
    for quest in state.active_quests.values() {
        lines.push(format!("- {}: {}", quest.name, quest.description));
        let mut next_marked = false;
        for objective in &quest.objectives {
            let marker = if objective.is_complete() {
                "✓"
            } else if !next_marked {
                next_marked = true;
                "▶"
            } else {
                "○"
            };
            lines.push(format!(
                "  {marker} {} ({}/{})",
                objective.description, objective.current_progress, objective.target_progress
            ));
        }
    }
    lines.join("\n")
}

/// Guarantee the prose ends with the enumerated action list, in plan
/// order, even when the model forgot it.
fn ensure_action_list(prose: String, plan: &ScenePlan) -> String {
    if plan.suggested_actions.is_empty() || prose.contains("\n> ") || prose.starts_with("> ") {
        return prose;
    }
    let mut out = prose.trim_end().to_string();
    out.push_str("\n\n");
    for action in &plan.suggested_actions {
        out.push_str("> ");
        out.push_str(&action.action);
        out.push('\n');
    }
    out.trim_end().to_string()
}
