//! XP and level progression.
//!
//! `xp` on the sheet is a lifetime total; levels advance when it crosses
//! cumulative thresholds. A single grant can cascade several levels.

use serde::{Deserialize, Serialize};

use crate::entities::character::{CharacterSheet, Grade, Resources};
use crate::value_objects::Difficulty;

/// Base XP required to leave level 1.
const BASE_XP: f64 = 100.0;
/// Geometric growth per level.
const GROWTH: f64 = 1.5;
/// Stat points granted per level gained.
const STAT_POINTS_PER_LEVEL: u32 = 3;
/// A new skill slot opens every this many levels.
const LEVELS_PER_SKILL_SLOT: u32 = 5;
/// Slots available before any level bonus.
const BASE_SKILL_SLOTS: u32 = 3;

/// XP needed to advance from `level` to `level + 1`.
pub fn xp_requirement(level: u32, difficulty: Difficulty) -> u64 {
    let raw = BASE_XP * GROWTH.powi(level.saturating_sub(1) as i32);
    (raw * difficulty.xp_threshold_multiplier()) as u64
}

/// Lifetime XP total at which `level` rolls over to `level + 1`.
pub fn xp_threshold(level: u32, difficulty: Difficulty) -> u64 {
    (1..=level).map(|l| xp_requirement(l, difficulty)).sum()
}

/// XP still missing before the next level.
pub fn xp_to_next_level(sheet: &CharacterSheet, difficulty: Difficulty) -> u64 {
    xp_threshold(sheet.level, difficulty).saturating_sub(sheet.xp)
}

/// How many skills a character of `level` can hold.
pub fn skill_capacity(level: u32) -> u32 {
    BASE_SKILL_SLOTS + level / LEVELS_PER_SKILL_SLOT
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelUpReport {
    pub levels_gained: u32,
    pub new_level: u32,
    pub stat_points_awarded: u32,
    /// Set when a grade boundary was crossed.
    pub new_grade: Option<Grade>,
    pub skill_slots_unlocked: u32,
}

impl LevelUpReport {
    pub fn leveled(&self) -> bool {
        self.levels_gained > 0
    }
}

/// Grant XP; cascade any level-ups. Returns the new sheet and a report.
pub fn gain_xp(
    sheet: &CharacterSheet,
    amount: u64,
    difficulty: Difficulty,
) -> (CharacterSheet, LevelUpReport) {
    let mut next = sheet.clone();
    next.xp += amount;

    let grade_before = next.grade;
    let slots_before = skill_capacity(next.level);
    let mut levels_gained = 0;
    while next.xp >= xp_threshold(next.level, difficulty) {
        next.level += 1;
        levels_gained += 1;
    }

    if levels_gained > 0 {
        next.unspent_stat_points += STAT_POINTS_PER_LEVEL * levels_gained;
        next.grade = Grade::for_level(next.level);
        // Leveling refreshes the body: maxima recomputed and pools refilled.
        next.resources = Resources::derived(&next.effective_stats(), next.level).refilled();
    }

    let report = LevelUpReport {
        levels_gained,
        new_level: next.level,
        stat_points_awarded: STAT_POINTS_PER_LEVEL * levels_gained,
        new_grade: (next.grade != grade_before).then_some(next.grade),
        skill_slots_unlocked: skill_capacity(next.level) - slots_before,
    };
    (next, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::StatBlock;

    fn sheet() -> CharacterSheet {
        CharacterSheet::new(StatBlock::uniform(10))
    }

    #[test]
    fn requirement_grows_geometrically() {
        assert_eq!(xp_requirement(1, Difficulty::Normal), 100);
        assert_eq!(xp_requirement(2, Difficulty::Normal), 150);
        assert_eq!(xp_requirement(3, Difficulty::Normal), 225);
        assert_eq!(xp_requirement(1, Difficulty::Nightmare), 200);
    }

    #[test]
    fn single_grant_cascades_levels() {
        // 100 + 150 = 250 clears two levels exactly.
        let (next, report) = gain_xp(&sheet(), 250, Difficulty::Normal);
        assert_eq!(next.level, 3);
        assert_eq!(report.levels_gained, 2);
        assert_eq!(report.stat_points_awarded, 6);
        assert_eq!(next.xp, 250);
    }

    #[test]
    fn xp_total_is_preserved() {
        let (next, _) = gain_xp(&sheet(), 120, Difficulty::Normal);
        assert_eq!(next.xp, 120);
        assert_eq!(next.level, 2);
        let (next, report) = gain_xp(&next, 5, Difficulty::Normal);
        assert_eq!(next.xp, 125);
        assert!(!report.leveled());
    }

    #[test]
    fn grade_advances_at_thresholds() {
        let mut s = sheet();
        s.level = 9;
        s.xp = xp_threshold(9, Difficulty::Normal) - 1;
        let (next, report) = gain_xp(&s, 1, Difficulty::Normal);
        assert_eq!(next.level, 10);
        assert_eq!(report.new_grade, Some(Grade::D));
    }

    #[test]
    fn level_never_decreases() {
        let (leveled, _) = gain_xp(&sheet(), 1_000, Difficulty::Normal);
        let (after_zero_grant, _) = gain_xp(&leveled, 0, Difficulty::Normal);
        assert!(after_zero_grant.level >= leveled.level);
    }

    #[test]
    fn level_up_refills_resources() {
        let mut s = sheet();
        s.resources.hp = s.resources.hp.drained(60);
        let (next, _) = gain_xp(&s, 100, Difficulty::Normal);
        assert_eq!(next.resources.hp.current, next.resources.hp.max);
    }
}
