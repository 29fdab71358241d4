//! The deterministic rules engine.
//!
//! Every operation is a pure function over values: it takes state plus
//! arguments (and, where randomness is involved, a caller-seeded RNG) and
//! returns a new state alongside a result record. Nothing here suspends or
//! performs I/O.

pub mod combat;
pub mod death;
pub mod progression;
pub mod quests;
pub mod skills;

pub use combat::{crit_threshold, resolve_combat, CombatOutcome};
pub use death::{apply_death, DeathOutcome};
pub use progression::{
    gain_xp, skill_capacity, xp_requirement, xp_threshold, xp_to_next_level, LevelUpReport,
};
pub use quests::{advance_objective, complete_quest, ObjectiveAdvance, QuestCompletion};
pub use skills::{
    evolve_skill, fuse_skills, process_action_insight, tick_cooldowns, use_skill, SkillUseOutcome,
};
