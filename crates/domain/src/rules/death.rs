//! Death handling, branched by system type.

use serde::{Deserialize, Serialize};

use crate::entities::character::Resources;
use crate::entities::game_state::GameState;
use crate::value_objects::DeathSemantics;

/// Permanent per-stat bonus granted per accumulated death under loop
/// semantics.
const LOOP_BONUS_PER_DEATH: i32 = 2;
/// Fraction of lifetime XP lost on a standard respawn.
const XP_PENALTY_DIVISOR: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeathOutcome {
    pub semantics: DeathSemantics,
    pub death_count: u32,
    /// Per-stat permanent bonus applied this death (loop semantics only).
    pub stat_bonus_per_stat: i32,
    pub xp_penalty: u64,
    pub permanently_dead: bool,
}

/// Apply death semantics for the game's system type. Returns the new state
/// and a record of what happened.
pub fn apply_death(state: &GameState) -> (GameState, DeathOutcome) {
    let semantics = state.system_type.death_semantics();
    let mut next = state.clone();
    next.death_count += 1;

    let outcome = match semantics {
        DeathSemantics::LoopRespawn => {
            let bonus = LOOP_BONUS_PER_DEATH * next.death_count as i32;
            let sheet = &mut next.character_sheet;
            sheet.base_stats = sheet.base_stats.raised_by(bonus);
            sheet.resources = Resources::derived(&sheet.effective_stats(), sheet.level);
            DeathOutcome {
                semantics,
                death_count: next.death_count,
                stat_bonus_per_stat: bonus,
                xp_penalty: 0,
                permanently_dead: false,
            }
        }
        DeathSemantics::Permadeath => {
            next.character_sheet.permanently_dead = true;
            DeathOutcome {
                semantics,
                death_count: next.death_count,
                stat_bonus_per_stat: 0,
                xp_penalty: 0,
                permanently_dead: true,
            }
        }
        DeathSemantics::XpPenaltyRespawn => {
            let penalty = next.character_sheet.xp / XP_PENALTY_DIVISOR;
            let sheet = &mut next.character_sheet;
            sheet.xp -= penalty;
            sheet.resources = sheet.resources.refilled();
            DeathOutcome {
                semantics,
                death_count: next.death_count,
                stat_bonus_per_stat: 0,
                xp_penalty: penalty,
                permanently_dead: false,
            }
        }
    };
    (next, outcome)
}
