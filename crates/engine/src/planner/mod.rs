//! The background plot planner.
//!
//! Three proposal agents run in parallel, a pure consensus engine resolves
//! their overlap, and the assembled graph is persisted. The planner never
//! touches `GameState`; it reads an immutable snapshot taken at trigger
//! time and writes only to the plot-graph repositories.

pub mod consensus;
pub mod deviation;
pub mod graph;
pub mod proposals;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;

use questweaver_domain::{AgentId, GameState, PlanningSessionId, PlotGraph};

use crate::agents::AgentRuntime;
use crate::infrastructure::ports::{PersistenceGateway, PlanningSessionRecord};
use crate::prompts;

pub use consensus::{ConsensusEngine, ConsensusOutcome, ConsensusType, NodeConflict};
pub use deviation::{detect_deviations, worst_severity, Deviation, DeviationSeverity};
pub use graph::{assemble_graph, next_ready_beat, node_priority, ReplanMode};
pub use proposals::{parse_proposal, AgentProposal, ProposerRole};

/// Ready-node floor below which a replan is requested.
const MIN_READY_NODES: usize = 3;
/// Completion ratio above which a replan is requested.
const COMPLETION_REPLAN_RATIO: f64 = 0.7;
/// Level gap since the last replan that forces another.
const LEVEL_REPLAN_GAP: u32 = 10;

/// Progress reported over the planner's channel.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannerProgress {
    Starting,
    Analyzing,
    Building,
    Complete(PlanningSummary),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanningSummary {
    pub mode: ReplanMode,
    pub consensus: ConsensusType,
    pub accepted: usize,
    pub rejected: usize,
    pub total_nodes: usize,
}

/// Decide whether (and how) to replan.
pub fn replan_trigger(
    state: &GameState,
    graph: &PlotGraph,
    last_replan_level: u32,
    deviations: &[Deviation],
) -> Option<ReplanMode> {
    match worst_severity(deviations) {
        Some(DeviationSeverity::Major) => return Some(ReplanMode::Full),
        Some(DeviationSeverity::Moderate) => return Some(ReplanMode::Adaptive),
        Some(DeviationSeverity::Minor) | None => {}
    }
    if graph.ready_nodes().count() < MIN_READY_NODES {
        return Some(ReplanMode::Incremental);
    }
    if graph.completion_ratio() > COMPLETION_REPLAN_RATIO {
        return Some(ReplanMode::Incremental);
    }
    if state.character_sheet.level >= last_replan_level + LEVEL_REPLAN_GAP {
        return Some(ReplanMode::Adaptive);
    }
    None
}

/// Fire-and-forget background planner bound to one game session.
pub struct PlannerService {
    runtime: Arc<AgentRuntime>,
    gateway: Arc<dyn PersistenceGateway>,
    in_flight: Arc<AtomicBool>,
}

impl PlannerService {
    pub fn new(runtime: Arc<AgentRuntime>, gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self {
            runtime,
            gateway,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Start a planning run against an immutable state snapshot. Returns
    /// the progress receiver, or `None` when a run is already in flight
    /// (drop-on-busy).
    pub fn trigger(
        &self,
        snapshot: GameState,
        mode: ReplanMode,
    ) -> Option<mpsc::Receiver<PlannerProgress>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Planner already in flight, dropping trigger");
            return None;
        }

        let (tx, rx) = mpsc::channel(8);
        let runtime = Arc::clone(&self.runtime);
        let gateway = Arc::clone(&self.gateway);
        let in_flight = Arc::clone(&self.in_flight);

        tokio::spawn(async move {
            if let Err(e) = run_planning(runtime, gateway, snapshot, mode, tx).await {
                tracing::error!(error = %e, "Planning run failed; plot graph left as-is");
            }
            in_flight.store(false, Ordering::SeqCst);
        });

        Some(rx)
    }
}

async fn run_planning(
    runtime: Arc<AgentRuntime>,
    gateway: Arc<dyn PersistenceGateway>,
    snapshot: GameState,
    mode: ReplanMode,
    progress: mpsc::Sender<PlannerProgress>,
) -> anyhow::Result<()> {
    let game_id = snapshot.game_id;
    let _ = progress.send(PlannerProgress::Starting).await;

    let existing = gateway.load_graph(game_id).await?.unwrap_or_default();
    let situation = proposals::proposal_situation(&snapshot, &existing);

    let _ = progress.send(PlannerProgress::Analyzing).await;

    // The three lenses run in parallel, each with its own memory.
    let mut story = runtime
        .start_agent(
            AgentId::new(ProposerRole::Story.agent_id()),
            game_id,
            prompts::planner_story_system(&snapshot),
        )
        .await?;
    let mut character = runtime
        .start_agent(
            AgentId::new(ProposerRole::Character.agent_id()),
            game_id,
            prompts::planner_character_system(&snapshot),
        )
        .await?;
    let mut world = runtime
        .start_agent(
            AgentId::new(ProposerRole::World.agent_id()),
            game_id,
            prompts::planner_world_system(&snapshot),
        )
        .await?;

    let (story_reply, character_reply, world_reply) = tokio::join!(
        story.send_message(&situation),
        character.send_message(&situation),
        world.send_message(&situation),
    );

    let mut agent_proposals = Vec::new();
    for (role, reply) in [
        (ProposerRole::Story, story_reply),
        (ProposerRole::Character, character_reply),
        (ProposerRole::World, world_reply),
    ] {
        match reply {
            Ok(raw) => agent_proposals.push(parse_proposal(&raw, role)),
            Err(e) => {
                tracing::warn!(role = ?role, error = %e, "Proposal agent failed, continuing without it");
                agent_proposals.push(AgentProposal::empty(role));
            }
        }
    }

    let _ = progress.send(PlannerProgress::Building).await;

    let outcome = ConsensusEngine::resolve_proposals(&agent_proposals);
    let existing_for_mode = if existing.nodes.is_empty() {
        None
    } else {
        Some(&existing)
    };
    let graph = assemble_graph(existing_for_mode, mode, &outcome);
    graph
        .validate()
        .map_err(|e| anyhow::anyhow!("assembled graph failed validation: {e}"))?;

    gateway.save_graph(game_id, &graph).await?;
    gateway
        .save_planning_session(&PlanningSessionRecord {
            id: PlanningSessionId::new(),
            game_id,
            mode: mode.display_name().to_string(),
            consensus: outcome.consensus.display_name().to_string(),
            accepted_nodes: outcome.accepted_nodes.len() as u32,
            rejected_nodes: outcome.rejected_nodes.len() as u32,
            created_at: Utc::now(),
        })
        .await?;

    for agent in [&mut story, &mut character, &mut world] {
        if let Err(e) = agent.force_save().await {
            tracing::warn!(agent_id = %agent.id(), error = %e, "Failed to save planner agent memory");
        }
    }

    let summary = PlanningSummary {
        mode,
        consensus: outcome.consensus,
        accepted: outcome.accepted_nodes.len(),
        rejected: outcome.rejected_nodes.len(),
        total_nodes: graph.nodes.len(),
    };
    tracing::info!(
        game_id = %game_id,
        mode = mode.display_name(),
        consensus = outcome.consensus.display_name(),
        accepted = summary.accepted,
        rejected = summary.rejected,
        "Planning run complete"
    );
    let _ = progress.send(PlannerProgress::Complete(summary)).await;
    Ok(())
}
