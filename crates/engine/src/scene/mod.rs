//! Scene coordination: the Game Master plans, the rules engine executes,
//! the Narrator renders.

pub mod coordinator;
pub mod game_master;
pub mod narrator;
pub mod plan;
pub mod results;

pub use coordinator::{execute_mechanics, SceneCoordinator};
pub use game_master::{GameMaster, PlanOutcome, GAME_MASTER_AGENT_ID};
pub use narrator::{quest_context_block, Narration, Narrator, NARRATOR_AGENT_ID};
pub use plan::{
    parse_scene_plan, BeatKind, NarrativeBeat, NpcReaction, PrimaryAction, PrimaryActionType,
    Prominence, ReactionTiming, RiskLevel, ScenePlan, SceneTone, SuggestedAction, TriggerTiming,
    TriggeredEvent,
};
pub use results::{SceneResults, StatDelta};
