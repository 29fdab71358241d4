//! The turn orchestrator.
//!
//! One `GameSession` owns one `GameState` and is the only writer to it.
//! `process_input` runs at most one turn at a time (owned try-lock) and
//! emits ordered `GameEvent`s through a pull-based stream. A turn mutates a
//! working copy of the state; the copy is committed only after the
//! end-of-turn snapshot save succeeds.

pub mod bootstrap;
pub mod classify;
pub mod handlers;
pub mod intent;
pub mod quest_tracking;

use std::collections::VecDeque;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::OwnedMutexGuard;

use questweaver_domain::{rules, AgentId, DeathSemantics, GameId, GameState, NpcId};
use questweaver_shared::{GameConfig, GameEvent, QuestStatus};

use crate::agents::{AgentError, AgentRuntime};
use crate::infrastructure::ports::{LlmPort, NodeStatusUpdate, PersistenceGateway, RepoError};
use crate::planner::{
    detect_deviations, next_ready_beat, replan_trigger, DeviationSeverity, PlannerService,
    ReplanMode,
};
use crate::prompts;
use crate::scene::plan::{PrimaryActionType, TriggerTiming};
use crate::scene::{execute_mechanics, SceneCoordinator};

pub use classify::{classify, Complexity};
pub use handlers::TurnFacts;
pub use intent::{validate_intent, Intent, IntentAnalyzer};

/// How many event summaries feed the next complex turn's context.
const RECENT_EVENT_WINDOW: usize = 5;
/// Event channel depth; consumers pulling lazily bound memory here.
const EVENT_CHANNEL_DEPTH: usize = 32;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("agent failure: {0}")]
    Agent(#[from] AgentError),
    #[error("persistence failure: {0}")]
    Repo(#[from] RepoError),
    #[error("no saved game with id {0}")]
    NotFound(GameId),
}

/// A turn is already in flight; the host must serialize calls.
#[derive(Debug, Error)]
#[error("a turn is already in flight for this session")]
pub struct TurnBusy;

/// Ordered event output. Dropping the stream cancels further emission but
/// never interrupts state consistency.
pub struct TurnStream {
    rx: mpsc::Receiver<GameEvent>,
}

impl TurnStream {
    pub async fn next_event(&mut self) -> Option<GameEvent> {
        self.rx.recv().await
    }

    /// Drain the stream to completion (convenience for hosts and tests).
    pub async fn collect(mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }
}

/// Emission side of a turn. Records a text transcript of everything
/// emitted (for recent-event context and deviation detection) and turns
/// a dropped receiver into silent cancellation.
pub struct EventSink {
    tx: mpsc::Sender<GameEvent>,
    closed: bool,
    transcript: Vec<String>,
}

impl EventSink {
    fn new(tx: mpsc::Sender<GameEvent>) -> Self {
        Self {
            tx,
            closed: false,
            transcript: Vec::new(),
        }
    }

    pub async fn emit(&mut self, event: GameEvent) {
        self.transcript.push(summarize_event(&event));
        if self.closed {
            return;
        }
        if self.tx.send(event).await.is_err() {
            tracing::debug!("Event stream cancelled by host; completing turn silently");
            self.closed = true;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }
}

fn summarize_event(event: &GameEvent) -> String {
    fn truncated(text: &str) -> String {
        if text.chars().count() > 160 {
            let cut: String = text.chars().take(157).collect();
            format!("{cut}...")
        } else {
            text.to_string()
        }
    }
    match event {
        GameEvent::NarratorText { text } => truncated(text),
        GameEvent::NpcDialogue { npc_name, text, .. } => {
            format!("{npc_name} said: {}", truncated(text))
        }
        GameEvent::CombatLog { text } => truncated(text),
        GameEvent::StatChange {
            stat_name,
            old_value,
            new_value,
        } => format!("{stat_name}: {old_value} -> {new_value}"),
        GameEvent::ItemGained {
            item_name, quantity, ..
        } => format!("Gained {item_name} x{quantity}"),
        GameEvent::QuestUpdate {
            quest_name, status, ..
        } => format!("Quest {quest_name}: {}", status.display_name()),
        GameEvent::SystemNotification { text } => truncated(text),
    }
}

struct SessionState {
    game: GameState,
    coordinator: SceneCoordinator,
    analyzer: IntentAnalyzer,
    rng: StdRng,
    recent_events: VecDeque<String>,
    last_turn_text: String,
    last_replan_level: u32,
    runtime: Arc<AgentRuntime>,
    llm: Arc<dyn LlmPort>,
    gateway: Arc<dyn PersistenceGateway>,
    planner: Arc<PlannerService>,
}

/// One single-player game session: the exclusive writer of its state.
pub struct GameSession {
    game_id: GameId,
    inner: Arc<tokio::sync::Mutex<SessionState>>,
}

impl GameSession {
    /// Start a brand-new game from host configuration.
    pub async fn start(
        runtime: Arc<AgentRuntime>,
        llm: Arc<dyn LlmPort>,
        gateway: Arc<dyn PersistenceGateway>,
        config: &GameConfig,
        rng_seed: Option<u64>,
    ) -> Result<GameSession, SessionError> {
        let mut rng = match rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let game = bootstrap::new_game_state(config, &mut rng);
        gateway.save_game(&game).await?;
        Self::assemble(runtime, llm, gateway, game, rng).await
    }

    /// Resume a saved game.
    pub async fn resume(
        runtime: Arc<AgentRuntime>,
        llm: Arc<dyn LlmPort>,
        gateway: Arc<dyn PersistenceGateway>,
        game_id: GameId,
        rng_seed: Option<u64>,
    ) -> Result<GameSession, SessionError> {
        let game = gateway
            .load_game(game_id)
            .await?
            .ok_or(SessionError::NotFound(game_id))?;
        let rng = match rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::assemble(runtime, llm, gateway, game, rng).await
    }

    async fn assemble(
        runtime: Arc<AgentRuntime>,
        llm: Arc<dyn LlmPort>,
        gateway: Arc<dyn PersistenceGateway>,
        game: GameState,
        rng: StdRng,
    ) -> Result<GameSession, SessionError> {
        let coordinator = SceneCoordinator::start(&runtime, &game).await?;
        let planner = Arc::new(PlannerService::new(
            Arc::clone(&runtime),
            Arc::clone(&gateway),
        ));

        // The planner runs from game start; drop-on-busy makes this safe.
        let last_replan_level = game.character_sheet.level;
        planner.trigger(game.clone(), ReplanMode::Incremental);

        let game_id = game.game_id;
        let state = SessionState {
            game,
            coordinator,
            analyzer: IntentAnalyzer::new(Arc::clone(&llm)),
            rng,
            recent_events: VecDeque::new(),
            last_turn_text: String::new(),
            last_replan_level,
            runtime,
            llm,
            gateway,
            planner,
        };
        Ok(GameSession {
            game_id,
            inner: Arc::new(tokio::sync::Mutex::new(state)),
        })
    }

    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    /// Current state snapshot (waits for any in-flight turn).
    pub async fn snapshot(&self) -> GameState {
        self.inner.lock().await.game.clone()
    }

    /// Whether the background planner is currently running.
    pub async fn planner_in_flight(&self) -> bool {
        self.inner.lock().await.planner.is_in_flight()
    }

    /// Process one player input. Exactly one turn may be in flight; a
    /// second call while busy returns `TurnBusy`.
    pub fn process_input(&self, input: &str) -> Result<TurnStream, TurnBusy> {
        let guard = Arc::clone(&self.inner)
            .try_lock_owned()
            .map_err(|_| TurnBusy)?;
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_DEPTH);
        let input = input.to_string();
        tokio::spawn(run_turn(guard, input, tx));
        Ok(TurnStream { rx })
    }

    /// Flush agent memories and the state snapshot (shutdown path).
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        let mut session = self.inner.lock().await;
        let session = &mut *session;
        session
            .coordinator
            .game_master
            .agent_mut()
            .force_save()
            .await?;
        session.coordinator.narrator.agent_mut().force_save().await?;
        session.gateway.save_game(&session.game).await?;
        Ok(())
    }
}

async fn run_turn(
    mut guard: OwnedMutexGuard<SessionState>,
    input: String,
    tx: mpsc::Sender<GameEvent>,
) {
    let session = &mut *guard;
    let mut sink = EventSink::new(tx);
    let mut working = session.game.clone();

    // 1. First-turn bootstrap: content init is idempotent; the opening
    //    narration plays exactly once per game.
    bootstrap::ensure_tutorial_content(&mut working);
    if !working.has_opening_narration_played {
        let narration = session.coordinator.narrator.narrate_opening(&working).await;
        sink.emit(GameEvent::narrator(narration.prose)).await;

        for quest in working.active_quests.values() {
            sink.emit(GameEvent::QuestUpdate {
                quest_id: quest.id.to_string(),
                quest_name: quest.name.clone(),
                status: QuestStatus::New,
            })
            .await;
        }
        if let Some(guide) = working.npcs_here().first() {
            sink.emit(GameEvent::notification(format!(
                "{} materializes before you.",
                guide.name
            )))
            .await;
        }
        if narration.degraded {
            sink.emit(GameEvent::notification("narrator degraded")).await;
        }
        working.has_opening_narration_played = true;

        if input.trim().is_empty() {
            finalize_turn(session, working, &mut sink).await;
            return;
        }
    } else if input.trim().is_empty() {
        finalize_turn(session, working, &mut sink).await;
        return;
    }

    // 2. Death guard.
    if working.character_sheet.is_dead() {
        if working.character_sheet.permanently_dead {
            sink.emit(GameEvent::notification(
                "Your story has already ended. The dungeon keeps what it takes.",
            ))
            .await;
        } else {
            sink.emit(GameEvent::notification("You have fallen. Respawning..."))
                .await;
            handle_death(session, &mut working, &mut sink).await;
        }
        finalize_turn(session, working, &mut sink).await;
        return;
    }

    // Cooldowns advance once per turn, before any action resolves.
    working.character_sheet = rules::tick_cooldowns(&working.character_sheet);

    // 3. Classification, then the simple or complex path.
    let facts = match classify(&input, &working) {
        Complexity::Simple => {
            let intent = session.analyzer.analyze(&input, &working).await;
            match validate_intent(&intent, &working) {
                Err(reason) => {
                    sink.emit(GameEvent::notification(reason)).await;
                    TurnFacts::default()
                }
                Ok(()) => {
                    handlers::handle_simple_intent(
                        &intent,
                        &input,
                        &mut working,
                        &mut session.rng,
                        &session.llm,
                        &mut sink,
                    )
                    .await
                }
            }
        }
        Complexity::Complex => run_complex_turn(session, &mut working, &input, &mut sink).await,
    };

    // 6. Quest progress tracking.
    let (tracked, advances) = quest_tracking::track_progress(&working, &facts);
    working = tracked;
    for advance in advances {
        sink.emit(GameEvent::QuestUpdate {
            quest_id: advance.quest_id.to_string(),
            quest_name: advance.quest_name.clone(),
            status: QuestStatus::InProgress,
        })
        .await;
    }

    // 7. Death check.
    if working.character_sheet.resources.hp.current <= 0
        && !working.character_sheet.permanently_dead
    {
        handle_death(session, &mut working, &mut sink).await;
    }

    finalize_turn(session, working, &mut sink).await;
}

/// The complex path: plan, validate, execute, render, emit.
async fn run_complex_turn(
    session: &mut SessionState,
    working: &mut GameState,
    input: &str,
    sink: &mut EventSink,
) -> TurnFacts {
    // a. Context: the last few event summaries, plus any active story
    //    threads the planner has put in motion.
    let mut recent: Vec<String> = session.recent_events.iter().cloned().collect();
    match session.gateway.load_graph(working.game_id).await {
        Ok(Some(graph)) => {
            for node in graph.active_nodes() {
                recent.push(format!("Active story thread: {}", node.beat.description));
            }
        }
        Ok(None) => {}
        Err(e) => {
            tracing::debug!(error = %e, "Plot graph unavailable for scene context");
        }
    }

    // b. Plan.
    let plan_outcome = session.coordinator.plan(input, working, &recent).await;
    let plan = plan_outcome.plan;
    let mut degraded = plan_outcome.degraded;

    // c. Intent-validate the planned primary action.
    let intent = session.analyzer.analyze(input, working).await;
    if let Err(reason) = validate_intent(&intent, working) {
        sink.emit(GameEvent::notification(reason)).await;
        return TurnFacts::default();
    }

    // d. Execute mechanics.
    let fallback_target = intent.combat_target().map(str::to_string);
    let (next, results) = execute_mechanics(
        &plan,
        input,
        fallback_target.as_deref(),
        working,
        &mut session.rng,
    );
    *working = next;

    let mut facts = TurnFacts::default();
    if let Some(combat) = &results.combat {
        facts.combat_target = Some(combat.target.clone());
    }
    facts.discovered = results.locations_discovered.clone();

    // Dialogue actions touch the named NPC's conversation log and affinity.
    // When the scene plan left the NPC silent, the NPC's own agent speaks.
    let mut npc_spoken: Option<(String, String, String)> = None;
    if plan.primary_action.action_type == PrimaryActionType::Dialogue {
        let npc_id = match &intent {
            Intent::NpcDialogue {
                npc_id: Some(id), ..
            } => Some(id.clone()),
            _ => session.analyzer.resolve_npc(input, working).await,
        };
        if let Some(npc_id) = npc_id {
            let planned = working.npcs.get(&npc_id).and_then(|npc| {
                plan.npc_reactions
                    .iter()
                    .find(|r| r.npc_name.eq_ignore_ascii_case(&npc.name))
                    .and_then(|r| r.dialogue.clone())
            });
            let line = match planned {
                Some(line) => Some(line),
                None => {
                    let generated =
                        npc_dialogue_line(&session.runtime, working, &npc_id, input).await;
                    if let (Some(text), Some(npc)) = (&generated, working.npcs.get(&npc_id)) {
                        npc_spoken =
                            Some((npc.id.to_string(), npc.name.clone(), text.clone()));
                    }
                    generated
                }
            };
            record_dialogue(working, &npc_id, input, line.as_deref());
            facts.talked_to.push(npc_id);
        }
    }

    // e. Render.
    let narration = session.coordinator.render(&plan, &results, working, input).await;
    degraded |= narration.degraded;

    // f. Emission. Quest turn-ins lead with their completion updates;
    //    everything else leads with prose.
    let quest_turn_in = plan.primary_action.action_type == PrimaryActionType::QuestAction
        && !results.quest_completions.is_empty();

    if quest_turn_in {
        for completion in &results.quest_completions {
            sink.emit(GameEvent::QuestUpdate {
                quest_id: completion.quest_id.to_string(),
                quest_name: completion.quest_name.clone(),
                status: QuestStatus::Completed,
            })
            .await;
        }
        sink.emit(GameEvent::narrator(narration.prose)).await;
        for completion in &results.quest_completions {
            sink.emit(GameEvent::notification(format!(
                "Quest complete: {}. Rewards: {} XP, {} gold.",
                completion.quest_name, completion.rewards.xp, completion.rewards.gold
            )))
            .await;
            for item in &completion.rewards.items {
                sink.emit(GameEvent::ItemGained {
                    item_id: item.id.to_string(),
                    item_name: item.name.clone(),
                    quantity: 1,
                })
                .await;
            }
            if let Some(report) = &completion.level_up {
                sink.emit(GameEvent::notification(format!(
                    "Level up! You are now level {}.",
                    report.new_level
                )))
                .await;
            }
        }
    } else {
        sink.emit(GameEvent::narrator(narration.prose)).await;
        if let Some(xp) = &results.xp_change {
            sink.emit(GameEvent::stat_change(
                xp.name.clone(),
                xp.old_value,
                xp.new_value,
            ))
            .await;
        }
        for notification in &results.notifications {
            sink.emit(GameEvent::notification(notification.clone())).await;
        }
        for (item, quantity) in &results.items_gained {
            sink.emit(GameEvent::ItemGained {
                item_id: item.id.to_string(),
                item_name: item.name.clone(),
                quantity: *quantity,
            })
            .await;
        }
        for completion in &results.quest_completions {
            sink.emit(GameEvent::QuestUpdate {
                quest_id: completion.quest_id.to_string(),
                quest_name: completion.quest_name.clone(),
                status: QuestStatus::Completed,
            })
            .await;
        }
        for reaction in plan.npc_reactions.iter().filter(|r| r.dialogue.is_some()) {
            let Some(npc) = working
                .npcs
                .values()
                .find(|n| n.name.eq_ignore_ascii_case(&reaction.npc_name))
            else {
                continue;
            };
            sink.emit(GameEvent::NpcDialogue {
                npc_id: npc.id.to_string(),
                npc_name: npc.name.clone(),
                text: reaction.dialogue.clone().unwrap_or_default(),
            })
            .await;
        }
        if let Some((npc_id, npc_name, text)) = npc_spoken {
            sink.emit(GameEvent::NpcDialogue {
                npc_id,
                npc_name,
                text,
            })
            .await;
        }
        for event in plan
            .triggered_events
            .iter()
            .filter(|e| e.timing == TriggerTiming::Immediate)
        {
            let text = if event.description.is_empty() {
                event.event_type.clone()
            } else {
                event.description.clone()
            };
            sink.emit(GameEvent::notification(text)).await;
        }
    }

    if degraded {
        sink.emit(GameEvent::notification("narrator degraded")).await;
    }
    facts
}

fn record_dialogue(working: &mut GameState, npc_id: &NpcId, input: &str, reply: Option<&str>) {
    let Some(npc) = working.npcs.get(npc_id) else {
        return;
    };
    let mut updated = npc.with_relationship_delta(1);
    updated
        .conversation
        .push(questweaver_domain::Speaker::Player, input);
    if let Some(line) = reply {
        updated
            .conversation
            .push(questweaver_domain::Speaker::Npc, line);
    }
    working.npcs.insert(npc_id.clone(), updated);
}

/// Ask the NPC's own agent for a line. The agent is keyed by the NPC id,
/// so its memory (and therefore its conversational continuity) is loaded
/// lazily on first address and survives across sessions.
async fn npc_dialogue_line(
    runtime: &AgentRuntime,
    working: &GameState,
    npc_id: &NpcId,
    input: &str,
) -> Option<String> {
    let npc = working.npcs.get(npc_id)?;
    let mut agent = match runtime
        .start_agent(
            AgentId::new(npc_id.as_str()),
            working.game_id,
            prompts::npc_system(npc, working),
        )
        .await
    {
        Ok(agent) => agent,
        Err(e) => {
            tracing::warn!(npc_id = %npc_id, error = %e, "Could not start NPC agent");
            return None;
        }
    };
    match agent.send_message(input).await {
        Ok(line) => {
            if let Err(e) = agent.force_save().await {
                tracing::warn!(npc_id = %npc_id, error = %e, "Failed to save NPC agent memory");
            }
            Some(line)
        }
        Err(e) => {
            tracing::warn!(npc_id = %npc_id, error = %e, "NPC agent failed to reply");
            None
        }
    }
}

/// Death handling per system type (step 7 / the death guard).
async fn handle_death(session: &mut SessionState, working: &mut GameState, sink: &mut EventSink) {
    let narration = session.coordinator.narrator.narrate_death(working).await;
    sink.emit(GameEvent::narrator(narration.prose)).await;

    let (next, outcome) = rules::apply_death(working);
    *working = next;

    match outcome.semantics {
        DeathSemantics::LoopRespawn => {
            sink.emit(GameEvent::notification(format!(
                "Death has strengthened you. All stats increased by {}!",
                outcome.stat_bonus_per_stat
            )))
            .await;
            sink.emit(GameEvent::narrator(
                "The loop rewinds. You wake where it always begins, stronger than before.",
            ))
            .await;
        }
        DeathSemantics::Permadeath => {
            sink.emit(GameEvent::notification(
                "Your journey ends here. The dungeon keeps what it takes.",
            ))
            .await;
        }
        DeathSemantics::XpPenaltyRespawn => {
            if outcome.xp_penalty > 0 {
                sink.emit(GameEvent::notification(format!(
                    "Death's toll: {} XP lost.",
                    outcome.xp_penalty
                )))
                .await;
            }
            sink.emit(GameEvent::narrator(
                "You drag yourself upright, breath ragged but body whole.",
            ))
            .await;
        }
    }
    tracing::info!(
        game_id = %working.game_id,
        death_count = outcome.death_count,
        semantics = ?outcome.semantics,
        "Death handled"
    );
}

/// Persist the working state; commit on success, discard on failure. Then
/// feed the planner.
async fn finalize_turn(session: &mut SessionState, working: GameState, sink: &mut EventSink) {
    if let Err(e) = working.validate() {
        // A broken invariant is a bug. Snapshot what we can, then abort
        // the session task.
        tracing::error!(error = %e, "Fatal state invariant violation");
        let _ = session.gateway.save_game(&session.game).await;
        panic!("fatal state invariant violation: {e}");
    }

    match session.gateway.save_game(&working).await {
        Ok(()) => {
            session.game = working;
        }
        Err(e) => {
            tracing::error!(error = %e, "Snapshot save failed; discarding turn results");
            sink.emit(GameEvent::notification(
                "The System could not record your progress; this turn was not saved.",
            ))
            .await;
        }
    }

    for summary in sink.transcript() {
        session.recent_events.push_back(summary.clone());
        while session.recent_events.len() > RECENT_EVENT_WINDOW {
            session.recent_events.pop_front();
        }
    }
    session.last_turn_text = sink.transcript().join(" ");

    post_turn_maintenance(session).await;
}

/// Consolidation and planner upkeep, off the emission path.
async fn post_turn_maintenance(session: &mut SessionState) {
    if session.coordinator.game_master.agent_mut().needs_consolidation() {
        if let Err(e) = session.coordinator.game_master.agent_mut().consolidate().await {
            tracing::warn!(error = %e, "Game Master consolidation failed");
        }
    }
    if session.coordinator.narrator.agent_mut().needs_consolidation() {
        if let Err(e) = session.coordinator.narrator.agent_mut().consolidate().await {
            tracing::warn!(error = %e, "Narrator consolidation failed");
        }
    }

    let game_id = session.game.game_id;
    let mut graph = match session.gateway.load_graph(game_id).await {
        Ok(graph) => graph.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Could not load plot graph for deviation check");
            return;
        }
    };

    let deviations = detect_deviations(&graph, &session.game, &session.last_turn_text);
    for deviation in &deviations {
        // Invalidated nodes are patched out locally; replanning decides
        // whether more is needed.
        if deviation.severity >= DeviationSeverity::Minor {
            if let Err(e) = session
                .gateway
                .update_node_status(game_id, &deviation.node_id, NodeStatusUpdate::Abandoned)
                .await
            {
                tracing::warn!(node_id = %deviation.node_id, error = %e, "Failed to abandon node");
                continue;
            }
            if let Some(node) = graph.nodes.get(&deviation.node_id) {
                if let Ok(abandoned) = node.mark_abandoned() {
                    graph.insert_node(abandoned);
                }
            }
        }
    }

    // Story pacing: once the player reaches a planned beat's trigger level,
    // the highest-priority ready node becomes an active thread.
    let player_level = session.game.character_sheet.level;
    let due = next_ready_beat(&graph, &std::collections::BTreeMap::new(), &session.game)
        .filter(|n| n.beat.trigger_level <= player_level)
        .map(|n| n.id.clone());
    if let Some(node_id) = due {
        match session
            .gateway
            .update_node_status(game_id, &node_id, NodeStatusUpdate::Triggered)
            .await
        {
            Ok(()) => {
                if let Some(node) = graph.nodes.get(&node_id) {
                    let triggered = node.mark_triggered();
                    tracing::info!(
                        node_id = %node_id,
                        beat = triggered.beat.beat_type.display_name(),
                        "Plot beat triggered"
                    );
                    graph.insert_node(triggered);
                }
            }
            Err(e) => {
                tracing::warn!(node_id = %node_id, error = %e, "Failed to trigger plot beat");
            }
        }
    }

    if let Some(mode) = replan_trigger(
        &session.game,
        &graph,
        session.last_replan_level,
        &deviations,
    ) {
        if session
            .planner
            .trigger(session.game.clone(), mode)
            .is_some()
        {
            session.last_replan_level = session.game.character_sheet.level;
        }
    }
}
