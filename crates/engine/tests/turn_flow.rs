//! End-to-end turn flow against the scripted LLM and the in-memory
//! gateway: opening bootstrap, menu surfaces, complex combat, quest
//! turn-in, death handling, replay determinism, and failure paths.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use questweaver_domain::{
    AgentAction, AgentId, AgentMemory, Beat, BeatType, GameId, GameState, NodePosition, NpcId,
    ObjectiveId, PlotGraph, PlotNode, PlotNodeId, QuestId, Stat, SystemType,
};
use questweaver_engine::infrastructure::persistence::InMemoryGateway;
use questweaver_engine::infrastructure::ports::{
    ActionLogRepo, AgentMemoryRepo, ConsolidationRepo, ConsolidationSnapshot, GameStateRepo,
    NodeStatusUpdate, PersistenceGateway, PlanningSessionRecord, PlotGraphRepo, RepoError,
};
use questweaver_engine::test_fixtures::{
    combat_plan_reply, quest_plan_reply, ScriptedLlm,
};
use questweaver_engine::{App, EngineSettings};
use questweaver_shared::{CharacterCreation, GameConfig, GameEvent, QuestStatus};

fn settings(seed: u64) -> EngineSettings {
    EngineSettings {
        rng_seed: Some(seed),
        ..EngineSettings::default()
    }
}

fn config() -> GameConfig {
    GameConfig::new(
        SystemType::SystemIntegration,
        CharacterCreation::new("Elena").with_backstory("A quiet librarian who shelved the wrong book."),
    )
}

fn app_with(replies: Vec<String>, seed: u64) -> App {
    App::new(
        Arc::new(ScriptedLlm::for_turns(replies)),
        Arc::new(InMemoryGateway::new()),
        settings(seed),
    )
}

fn notifications(events: &[GameEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|e| match e {
            GameEvent::SystemNotification { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn scenario_opening_bootstrap() {
    let app = app_with(vec!["A pale blue light splits the sky above you.".into()], 42);
    let session = app.start_game(&config()).await.expect("start");

    let events = session
        .process_input("")
        .expect("not busy")
        .collect()
        .await;

    let narrations: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, GameEvent::NarratorText { .. }))
        .collect();
    assert_eq!(narrations.len(), 1);

    let quest_updates: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            GameEvent::QuestUpdate {
                quest_name, status, ..
            } => Some((quest_name.as_str(), *status)),
            _ => None,
        })
        .collect();
    assert_eq!(quest_updates, vec![("System Integration", QuestStatus::New)]);

    let notes = notifications(&events);
    assert_eq!(notes.len(), 1);
    assert!(notes[0].ends_with("materializes before you."));

    // Event order: narration first, quest second, presence last.
    assert!(matches!(events[0], GameEvent::NarratorText { .. }));
}

#[tokio::test]
async fn scenario_simple_status() {
    let app = app_with(vec!["Opening.".into()], 42);
    let session = app.start_game(&config()).await.expect("start");
    session.process_input("").expect("not busy").collect().await;

    let events = session
        .process_input("status")
        .expect("not busy")
        .collect()
        .await;

    let notes = notifications(&events);
    assert_eq!(notes.len(), 1, "exactly one SystemNotification: {events:?}");
    for needle in ["Level", "HP:", "MP:", "STR:"] {
        assert!(notes[0].contains(needle), "missing {needle}");
    }

    // The tutorial status objective completed.
    let state = session.snapshot().await;
    let quest = &state.active_quests[&QuestId::new("quest_survive_tutorial")];
    let objective = quest
        .objective(&ObjectiveId::new("tutorial_obj_status"))
        .expect("objective");
    assert!(objective.is_complete());

    // Its completion was announced as a quest progress update.
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::QuestUpdate {
            status: QuestStatus::InProgress,
            ..
        }
    )));
}

#[tokio::test]
async fn scenario_complex_combat() {
    let app = app_with(
        vec![
            "Opening.".into(),
            combat_plan_reply("training construct"),
            "Your strike lands clean and the construct staggers.".into(),
        ],
        42,
    );
    let session = app.start_game(&config()).await.expect("start");
    session.process_input("").expect("not busy").collect().await;
    let xp_before = session.snapshot().await.character_sheet.xp;

    let events = session
        .process_input("attack the training construct")
        .expect("not busy")
        .collect()
        .await;

    // First non-QuestUpdate event is narrator prose.
    let first_non_quest = events
        .iter()
        .find(|e| !e.is_quest_update())
        .expect("events emitted");
    assert!(matches!(first_non_quest, GameEvent::NarratorText { .. }));

    // XP stat change with an exact delta.
    let (old_value, new_value) = events
        .iter()
        .find_map(|e| match e {
            GameEvent::StatChange {
                stat_name,
                old_value,
                new_value,
            } if stat_name == "xp" => Some((*old_value, *new_value)),
            _ => None,
        })
        .expect("xp stat change");
    assert_eq!(old_value as u64, xp_before);

    let state = session.snapshot().await;
    assert_eq!(state.character_sheet.xp, new_value as u64);
    assert!(state.character_sheet.xp > xp_before);

    // Narration precedes the stat change.
    let narrator_index = events
        .iter()
        .position(|e| matches!(e, GameEvent::NarratorText { .. }))
        .expect("prose");
    let stat_index = events
        .iter()
        .position(|e| matches!(e, GameEvent::StatChange { .. }))
        .expect("stat change");
    assert!(narrator_index < stat_index);

    // The first-combat tutorial objective advanced.
    let quest = &state.active_quests[&QuestId::new("quest_survive_tutorial")];
    let objective = quest
        .objective(&ObjectiveId::new("tutorial_obj_first_combat"))
        .expect("objective");
    assert_eq!(objective.current_progress, 1);
}

#[tokio::test]
async fn scenario_quest_completion_flow() {
    let app = app_with(
        vec![
            "Opening.".into(),
            combat_plan_reply("training construct"),
            "The construct falls.".into(),
            quest_plan_reply(),
            "The guide smiles as the System chimes.".into(),
        ],
        42,
    );
    let session = app.start_game(&config()).await.expect("start");
    session.process_input("").expect("not busy").collect().await;
    session.process_input("status").expect("not busy").collect().await;
    session
        .process_input("attack the training construct")
        .expect("not busy")
        .collect()
        .await;

    let xp_before = session.snapshot().await.character_sheet.xp;
    let events = session
        .process_input("turn in quest")
        .expect("not busy")
        .collect()
        .await;

    let completed_index = events
        .iter()
        .position(|e| {
            matches!(
                e,
                GameEvent::QuestUpdate {
                    status: QuestStatus::Completed,
                    ..
                }
            )
        })
        .expect("completion update");
    let reward_note_index = events
        .iter()
        .position(|e| matches!(e, GameEvent::SystemNotification { text } if text.contains("XP")))
        .expect("xp reward notification");
    let item_index = events
        .iter()
        .position(|e| matches!(e, GameEvent::ItemGained { item_name, .. } if item_name == "Novice's Band"))
        .expect("reward item");
    assert!(completed_index < reward_note_index);
    assert!(reward_note_index < item_index);

    let state = session.snapshot().await;
    let quest_id = QuestId::new("quest_survive_tutorial");
    assert!(state.completed_quests.contains(&quest_id));
    assert!(!state.active_quests.contains_key(&quest_id));
    // Tutorial reward XP applied exactly once.
    assert_eq!(state.character_sheet.xp, xp_before + 50);
}

#[tokio::test]
async fn scenario_death_loop_respawn() {
    let gateway = Arc::new(InMemoryGateway::new());
    let llm = Arc::new(ScriptedLlm::for_turns(vec![
        combat_plan_reply("construct"),
        "The blow lands, but so does the counterstrike.".into(),
        "Your vision tunnels as the ground rushes up.".into(),
    ]));
    let app = App::new(
        llm,
        Arc::clone(&gateway) as Arc<dyn PersistenceGateway>,
        settings(42),
    );

    // Craft a loop character on their third death, one hit from the end.
    let mut crafted = questweaver_engine::test_fixtures::test_state(SystemType::DeathLoop);
    crafted.has_opening_narration_played = true;
    crafted.death_count = 2;
    crafted.current_location = questweaver_domain::LocationId::new("loc_whispering_forest");
    crafted
        .discovered_locations
        .insert(crafted.current_location.clone());
    crafted.character_sheet.resources.hp.current = 1;
    gateway.save_game(&crafted).await.expect("seed save");

    let session = app.resume_game(crafted.game_id).await.expect("resume");
    let events = session
        .process_input("attack the construct")
        .expect("not busy")
        .collect()
        .await;

    let strengthened_index = events
        .iter()
        .position(|e| {
            matches!(
                e,
                GameEvent::SystemNotification { text }
                    if text == "Death has strengthened you. All stats increased by 6!"
            )
        })
        .expect("death bonus notification");

    // Death narration before the bonus, respawn narration after it.
    let narrations: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| matches!(e, GameEvent::NarratorText { .. }))
        .map(|(i, _)| i)
        .collect();
    assert!(narrations.iter().any(|i| *i < strengthened_index));
    assert!(narrations.iter().any(|i| *i > strengthened_index));

    let state = session.snapshot().await;
    assert_eq!(state.death_count, 3);
    for stat in Stat::all() {
        assert_eq!(state.character_sheet.base_stats.get(stat), 16);
    }
    assert_eq!(
        state.character_sheet.resources.hp.current,
        state.character_sheet.resources.hp.max
    );
}

#[tokio::test]
async fn replay_is_deterministic_under_a_fixed_seed() {
    let script = || {
        vec![
            "Opening.".into(),
            combat_plan_reply("training construct"),
            "The construct staggers.".into(),
        ]
    };
    let inputs = ["", "status", "attack the training construct"];

    let mut runs = Vec::new();
    for _ in 0..2 {
        let app = app_with(script(), 42);
        let session = app.start_game(&config()).await.expect("start");
        let mut events = Vec::new();
        for input in inputs {
            events.extend(session.process_input(input).expect("not busy").collect().await);
        }
        runs.push((events, session.snapshot().await));
    }

    let (events_a, state_a) = &runs[0];
    let (events_b, state_b) = &runs[1];
    assert_eq!(events_a, events_b);
    assert_eq!(state_a.character_sheet, state_b.character_sheet);
    assert_eq!(state_a.active_quests, state_b.active_quests);
    assert_eq!(state_a.discovered_locations, state_b.discovered_locations);
    assert_eq!(state_a.death_count, state_b.death_count);
}

#[tokio::test]
async fn npc_dialogue_speaks_through_the_npc_agent() {
    let dialogue_plan = r#"{
        "primaryAction": {"type": "DIALOGUE", "target": "Lyra",
            "description": "You greet the guide."},
        "suggestedActions": [{"action": "Ask about the System", "riskLevel": "SAFE"}],
        "sceneTone": "PEACEFUL"
    }"#;
    let llm = ScriptedLlm::for_turns(vec![
        "Opening.".into(),
        dialogue_plan.into(),
        "The guide turns toward you, unhurried.".into(),
    ])
    .with_route(
        "Stay in character",
        vec!["Welcome, Elena. The System chose well.".into()],
    );
    let gateway = Arc::new(InMemoryGateway::new());
    let app = App::new(
        Arc::new(llm),
        Arc::clone(&gateway) as Arc<dyn PersistenceGateway>,
        settings(42),
    );
    let session = app.start_game(&config()).await.expect("start");
    session.process_input("").expect("not busy").collect().await;

    let events = session
        .process_input("talk to lyra")
        .expect("not busy")
        .collect()
        .await;

    let line = events
        .iter()
        .find_map(|e| match e {
            GameEvent::NpcDialogue { npc_name, text, .. } => Some((npc_name.as_str(), text.as_str())),
            _ => None,
        })
        .expect("npc spoke");
    assert_eq!(line.0, "Lyra");
    assert!(line.1.contains("Welcome"));

    // Both sides of the exchange landed in the NPC's conversation log,
    // and affinity moved.
    let state = session.snapshot().await;
    let npc = state.npc(&NpcId::new("npc_guide")).expect("guide");
    assert_eq!(npc.conversation.len(), 2);
    assert_eq!(npc.relationship, 1);

    // The NPC agent's memory was persisted under the NPC's id.
    let memory = gateway
        .load_memory(&AgentId::new("npc_guide"), session.game_id())
        .await
        .expect("query")
        .expect("saved");
    assert_eq!(memory.messages.len(), 2);
}

#[tokio::test]
async fn due_plot_beats_trigger_after_the_turn() {
    let gateway = Arc::new(InMemoryGateway::new());
    let app = App::new(
        Arc::new(ScriptedLlm::for_turns(vec!["Opening.".into()])),
        Arc::clone(&gateway) as Arc<dyn PersistenceGateway>,
        settings(42),
    );
    let session = app.start_game(&config()).await.expect("start");

    // Let the game-start planning run finish, then seed a beat that is
    // already due at level 1.
    while session.planner_in_flight().await {
        tokio::task::yield_now().await;
    }
    let mut graph = PlotGraph::new();
    graph.insert_node(PlotNode::new(
        "node_due",
        Beat {
            beat_type: BeatType::Revelation,
            description: "The guide knows more than she says.".into(),
            trigger_level: 1,
            involved_npcs: vec![],
            involved_locations: vec![],
            foreshadowing: None,
        },
        NodePosition::new(1, 1, 0),
    ));
    gateway
        .save_graph(session.game_id(), &graph)
        .await
        .expect("seed graph");

    session.process_input("").expect("not busy").collect().await;

    let stored = gateway
        .load_graph(session.game_id())
        .await
        .expect("query")
        .expect("present");
    let node = stored.node(&PlotNodeId::new("node_due")).expect("kept");
    assert!(node.triggered && !node.completed);
}

#[tokio::test]
async fn at_most_one_turn_in_flight() {
    let app = app_with(vec!["Opening.".into()], 42);
    let session = app.start_game(&config()).await.expect("start");

    let first = session.process_input("").expect("first turn starts");
    assert!(session.process_input("status").is_err());
    first.collect().await;

    // Once drained, the next turn starts normally.
    assert!(session.process_input("status").is_ok());
}

#[tokio::test]
async fn cancelled_stream_still_commits_the_turn() {
    let app = app_with(
        vec![
            "Opening.".into(),
            combat_plan_reply("training construct"),
            "Prose.".into(),
        ],
        42,
    );
    let session = app.start_game(&config()).await.expect("start");
    session.process_input("").expect("not busy").collect().await;

    let stream = session
        .process_input("attack the training construct")
        .expect("not busy");
    drop(stream);

    // snapshot() waits for the in-flight turn to finish.
    let state = session.snapshot().await;
    assert!(state.validate().is_ok());
    assert!(state.character_sheet.xp > 0, "combat still resolved");
}

#[tokio::test]
async fn invalid_actions_do_not_mutate_state() {
    let app = app_with(vec!["Opening.".into()], 42);
    let session = app.start_game(&config()).await.expect("start");
    session.process_input("").expect("not busy").collect().await;
    let before = session.snapshot().await;

    let events = session
        .process_input("use fireball")
        .expect("not busy")
        .collect()
        .await;

    let notes = notifications(&events);
    assert_eq!(notes.len(), 1);
    assert!(notes[0].contains("don't know a skill"));
    let after = session.snapshot().await;
    assert_eq!(before.character_sheet, after.character_sheet);
}

// =============================================================================
// Persistence failure path
// =============================================================================

/// Gateway whose game-state saves can be made to fail on demand.
struct FailingSaveGateway {
    inner: InMemoryGateway,
    fail_saves: AtomicBool,
}

impl FailingSaveGateway {
    fn new() -> Self {
        Self {
            inner: InMemoryGateway::new(),
            fail_saves: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl GameStateRepo for FailingSaveGateway {
    async fn save_game(&self, state: &GameState) -> Result<(), RepoError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(RepoError::database("games", "disk full"));
        }
        self.inner.save_game(state).await
    }
    async fn load_game(&self, game_id: GameId) -> Result<Option<GameState>, RepoError> {
        self.inner.load_game(game_id).await
    }
    async fn delete_game(&self, game_id: GameId) -> Result<(), RepoError> {
        self.inner.delete_game(game_id).await
    }
    async fn list_games(&self) -> Result<Vec<GameId>, RepoError> {
        self.inner.list_games().await
    }
}

#[async_trait]
impl AgentMemoryRepo for FailingSaveGateway {
    async fn save_memory(&self, memory: &AgentMemory) -> Result<(), RepoError> {
        self.inner.save_memory(memory).await
    }
    async fn load_memory(
        &self,
        agent_id: &AgentId,
        game_id: GameId,
    ) -> Result<Option<AgentMemory>, RepoError> {
        self.inner.load_memory(agent_id, game_id).await
    }
}

#[async_trait]
impl ActionLogRepo for FailingSaveGateway {
    async fn append_action(&self, action: &AgentAction) -> Result<(), RepoError> {
        self.inner.append_action(action).await
    }
    async fn actions_by_agent(
        &self,
        agent_id: &AgentId,
        game_id: GameId,
    ) -> Result<Vec<AgentAction>, RepoError> {
        self.inner.actions_by_agent(agent_id, game_id).await
    }
    async fn actions_by_type(
        &self,
        game_id: GameId,
        action_type: &str,
    ) -> Result<Vec<AgentAction>, RepoError> {
        self.inner.actions_by_type(game_id, action_type).await
    }
    async fn actions_for_game(&self, game_id: GameId) -> Result<Vec<AgentAction>, RepoError> {
        self.inner.actions_for_game(game_id).await
    }
}

#[async_trait]
impl ConsolidationRepo for FailingSaveGateway {
    async fn append_snapshot(&self, snapshot: &ConsolidationSnapshot) -> Result<(), RepoError> {
        self.inner.append_snapshot(snapshot).await
    }
    async fn latest_snapshot(
        &self,
        agent_id: &AgentId,
        game_id: GameId,
    ) -> Result<Option<ConsolidationSnapshot>, RepoError> {
        self.inner.latest_snapshot(agent_id, game_id).await
    }
    async fn snapshot_history(
        &self,
        agent_id: &AgentId,
        game_id: GameId,
        limit: usize,
    ) -> Result<Vec<ConsolidationSnapshot>, RepoError> {
        self.inner.snapshot_history(agent_id, game_id, limit).await
    }
}

#[async_trait]
impl PlotGraphRepo for FailingSaveGateway {
    async fn save_graph(&self, game_id: GameId, graph: &PlotGraph) -> Result<(), RepoError> {
        self.inner.save_graph(game_id, graph).await
    }
    async fn load_graph(&self, game_id: GameId) -> Result<Option<PlotGraph>, RepoError> {
        self.inner.load_graph(game_id).await
    }
    async fn update_node_status(
        &self,
        game_id: GameId,
        node_id: &PlotNodeId,
        status: NodeStatusUpdate,
    ) -> Result<(), RepoError> {
        self.inner.update_node_status(game_id, node_id, status).await
    }
    async fn save_planning_session(
        &self,
        record: &PlanningSessionRecord,
    ) -> Result<(), RepoError> {
        self.inner.save_planning_session(record).await
    }
}

#[async_trait]
impl PersistenceGateway for FailingSaveGateway {
    async fn delete_all_agent_data_for_game(&self, game_id: GameId) -> Result<(), RepoError> {
        self.inner.delete_all_agent_data_for_game(game_id).await
    }
}

#[tokio::test]
async fn failed_snapshot_discards_the_turn() {
    let gateway = Arc::new(FailingSaveGateway::new());
    let app = App::new(
        Arc::new(ScriptedLlm::for_turns(vec![
            "Opening.".into(),
            combat_plan_reply("training construct"),
            "Prose.".into(),
        ])),
        Arc::clone(&gateway) as Arc<dyn PersistenceGateway>,
        settings(42),
    );
    let session = app.start_game(&config()).await.expect("start");
    session.process_input("").expect("not busy").collect().await;
    let before = session.snapshot().await;

    gateway.fail_saves.store(true, Ordering::SeqCst);
    let events = session
        .process_input("attack the training construct")
        .expect("not busy")
        .collect()
        .await;

    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::SystemNotification { text } if text.contains("not saved"))));

    gateway.fail_saves.store(false, Ordering::SeqCst);
    let after = session.snapshot().await;
    assert_eq!(before.character_sheet.xp, after.character_sheet.xp);
}
