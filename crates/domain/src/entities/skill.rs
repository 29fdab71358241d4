//! Skills and partial skills.
//!
//! A partial skill tracks repeated observations of a behavior pattern in
//! player input; once observed often enough it materializes into a full
//! skill.

use serde::{Deserialize, Serialize};

use crate::ids::SkillId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkillRarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl SkillRarity {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Common => "Common",
            Self::Uncommon => "Uncommon",
            Self::Rare => "Rare",
            Self::Epic => "Epic",
            Self::Legendary => "Legendary",
        }
    }
}

/// Resource cost of invoking a skill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCost {
    pub mp: i32,
    pub energy: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: SkillId,
    pub name: String,
    pub rarity: SkillRarity,
    pub level: u32,
    pub xp: u32,
    /// Only active skills may be invoked.
    pub is_active: bool,
    pub cost: ResourceCost,
    pub max_cooldown: u32,
    pub current_cooldown: u32,
    /// Flat power added to the skill's damage roll.
    pub base_power: i32,
    /// Healing applied on use; zero for offensive skills.
    pub healing: i32,
    /// Skill this one evolves into once max level is reached.
    pub evolves_into: Option<SkillId>,
}

impl Skill {
    pub const MAX_LEVEL: u32 = 10;
    /// Skill XP required per skill level.
    pub const XP_PER_LEVEL: u32 = 100;

    pub fn new(id: impl Into<SkillId>, name: impl Into<String>, rarity: SkillRarity) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rarity,
            level: 1,
            xp: 0,
            is_active: true,
            cost: ResourceCost::default(),
            max_cooldown: 0,
            current_cooldown: 0,
            base_power: 0,
            healing: 0,
            evolves_into: None,
        }
    }

    pub fn with_cost(mut self, mp: i32, energy: i32) -> Self {
        self.cost = ResourceCost { mp, energy };
        self
    }

    pub fn with_cooldown(mut self, turns: u32) -> Self {
        self.max_cooldown = turns;
        self
    }

    pub fn with_power(mut self, power: i32) -> Self {
        self.base_power = power;
        self
    }

    pub fn with_healing(mut self, healing: i32) -> Self {
        self.healing = healing;
        self
    }

    pub fn with_evolution(mut self, into: impl Into<SkillId>) -> Self {
        self.evolves_into = Some(into.into());
        self
    }

    pub fn is_max_level(&self) -> bool {
        self.level >= Self::MAX_LEVEL
    }

    /// Eligible for evolution: active, max level, with an evolution target.
    pub fn can_evolve(&self) -> bool {
        self.is_active && self.is_max_level() && self.evolves_into.is_some()
    }

    pub fn is_valid(&self) -> bool {
        self.current_cooldown <= self.max_cooldown
    }
}

/// Progress toward a skill not yet learned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialSkill {
    /// Lowercased keyword that advances this partial skill.
    pub pattern: String,
    pub skill_name: String,
    pub observations: u32,
    pub required: u32,
}

impl PartialSkill {
    pub fn new(pattern: impl Into<String>, skill_name: impl Into<String>, required: u32) -> Self {
        Self {
            pattern: pattern.into(),
            skill_name: skill_name.into(),
            observations: 0,
            required,
        }
    }

    pub fn observed(&self) -> PartialSkill {
        PartialSkill {
            observations: self.observations + 1,
            ..self.clone()
        }
    }

    pub fn is_ready(&self) -> bool {
        self.observations >= self.required
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evolution_requires_max_level_and_target() {
        let mut skill = Skill::new("skill_slash", "Slash", SkillRarity::Common)
            .with_evolution("skill_crescent_slash");
        assert!(!skill.can_evolve());
        skill.level = Skill::MAX_LEVEL;
        assert!(skill.can_evolve());
        skill.is_active = false;
        assert!(!skill.can_evolve());
    }

    #[test]
    fn partial_skill_readiness() {
        let partial = PartialSkill::new("dodge", "Evasion", 3);
        let partial = partial.observed().observed();
        assert!(!partial.is_ready());
        assert!(partial.observed().is_ready());
    }
}
