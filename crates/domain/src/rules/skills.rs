//! Skill invocation, cooldowns, evolution, fusion, and partial-skill
//! insight.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::entities::character::CharacterSheet;
use crate::entities::skill::{PartialSkill, Skill, SkillRarity};
use crate::error::DomainError;
use crate::ids::SkillId;
use crate::rules::progression::skill_capacity;

/// Skill XP granted per successful use.
const SKILL_XP_PER_USE: u32 = 25;
/// Observations required before a partial skill materializes.
const INSIGHT_OBSERVATIONS_REQUIRED: u32 = 3;

/// Keyword patterns the insight tracker watches for, with the skill each
/// one grows into.
const INSIGHT_PATTERNS: &[(&str, &str)] = &[
    ("dodge", "Evasion"),
    ("sneak", "Stealth"),
    ("observe", "Keen Eye"),
    ("block", "Iron Guard"),
    ("meditate", "Inner Focus"),
];

/// Fusion recipes: two known skills combine into a new one.
const FUSION_RECIPES: &[(&str, &str, &str, &str)] = &[
    (
        "skill_evasion",
        "skill_stealth",
        "skill_phantom_step",
        "Phantom Step",
    ),
    (
        "skill_keen_eye",
        "skill_inner_focus",
        "skill_true_sight",
        "True Sight",
    ),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkillUseOutcome {
    Success {
        damage: i32,
        healing: i32,
        skill_xp: u32,
        skill_leveled: bool,
    },
    OnCooldown {
        turns_remaining: u32,
    },
    InsufficientResources {
        missing: Vec<String>,
    },
}

/// Invoke a skill. Inactive skills are rejected outright; cooldown and
/// resource failures are reported as outcomes, not errors, so the turn can
/// surface them to the player without aborting.
pub fn use_skill(
    sheet: &CharacterSheet,
    skill_id: &SkillId,
    rng: &mut StdRng,
) -> Result<(CharacterSheet, SkillUseOutcome), DomainError> {
    let skill = sheet
        .skill(skill_id)
        .ok_or_else(|| DomainError::not_found("Skill", skill_id.to_string()))?
        .clone();

    if !skill.is_active {
        return Err(DomainError::constraint(format!(
            "skill {} is passive and cannot be invoked",
            skill.name
        )));
    }

    if skill.current_cooldown > 0 {
        return Ok((
            sheet.clone(),
            SkillUseOutcome::OnCooldown {
                turns_remaining: skill.current_cooldown,
            },
        ));
    }

    let mut missing = Vec::new();
    if sheet.resources.mp.current < skill.cost.mp {
        missing.push(format!(
            "MP ({} needed, {} available)",
            skill.cost.mp, sheet.resources.mp.current
        ));
    }
    if sheet.resources.energy.current < skill.cost.energy {
        missing.push(format!(
            "Energy ({} needed, {} available)",
            skill.cost.energy, sheet.resources.energy.current
        ));
    }
    if !missing.is_empty() {
        return Ok((sheet.clone(), SkillUseOutcome::InsufficientResources { missing }));
    }

    let mut next = sheet.clone();
    next.resources.mp = next.resources.mp.drained(skill.cost.mp);
    next.resources.energy = next.resources.energy.drained(skill.cost.energy);

    let damage = if skill.base_power > 0 {
        skill.base_power + skill.level as i32 * 2 + rng.gen_range(1..=4)
    } else {
        0
    };
    let healing = skill.healing;
    if healing > 0 {
        next.resources.hp.current = (next.resources.hp.current + healing).min(next.resources.hp.max);
    }

    let mut skill_leveled = false;
    for s in next.skills.iter_mut().filter(|s| &s.id == skill_id) {
        s.current_cooldown = s.max_cooldown;
        s.xp += SKILL_XP_PER_USE;
        while s.xp >= Skill::XP_PER_LEVEL && s.level < Skill::MAX_LEVEL {
            s.xp -= Skill::XP_PER_LEVEL;
            s.level += 1;
            skill_leveled = true;
        }
    }

    Ok((
        next,
        SkillUseOutcome::Success {
            damage,
            healing,
            skill_xp: SKILL_XP_PER_USE,
            skill_leveled,
        },
    ))
}

/// Advance every cooldown by one turn.
pub fn tick_cooldowns(sheet: &CharacterSheet) -> CharacterSheet {
    let mut next = sheet.clone();
    for skill in &mut next.skills {
        skill.current_cooldown = skill.current_cooldown.saturating_sub(1);
    }
    next
}

/// Evolve a max-level active skill into its successor.
pub fn evolve_skill(
    sheet: &CharacterSheet,
    skill_id: &SkillId,
) -> Result<(CharacterSheet, Skill), DomainError> {
    let skill = sheet
        .skill(skill_id)
        .ok_or_else(|| DomainError::not_found("Skill", skill_id.to_string()))?;

    if !skill.can_evolve() {
        return Err(DomainError::constraint(format!(
            "skill {} does not meet its evolution requirement",
            skill.name
        )));
    }
    let target = skill
        .evolves_into
        .clone()
        .ok_or_else(|| DomainError::constraint("skill has no evolution path"))?;

    let evolved_rarity = match skill.rarity {
        SkillRarity::Common => SkillRarity::Uncommon,
        SkillRarity::Uncommon => SkillRarity::Rare,
        SkillRarity::Rare => SkillRarity::Epic,
        _ => SkillRarity::Legendary,
    };
    let evolved = Skill::new(target.clone(), prettify_skill_id(&target), evolved_rarity)
        .with_cost(skill.cost.mp, skill.cost.energy)
        .with_cooldown(skill.max_cooldown)
        .with_power(skill.base_power + 10)
        .with_healing(skill.healing);

    let mut next = sheet.clone();
    next.skills.retain(|s| &s.id != skill_id);
    next.skills.push(evolved.clone());
    Ok((next, evolved))
}

/// Fuse two known skills if a recipe exists for the pair.
pub fn fuse_skills(
    sheet: &CharacterSheet,
    first: &SkillId,
    second: &SkillId,
) -> Result<(CharacterSheet, Skill), DomainError> {
    for id in [first, second] {
        if sheet.skill(id).is_none() {
            return Err(DomainError::not_found("Skill", id.to_string()));
        }
    }

    let recipe = FUSION_RECIPES.iter().find(|(a, b, _, _)| {
        (first.as_str() == *a && second.as_str() == *b)
            || (first.as_str() == *b && second.as_str() == *a)
    });
    let Some((_, _, fused_id, fused_name)) = recipe else {
        return Err(DomainError::constraint(
            "those skills refuse to merge".to_string(),
        ));
    };

    let fused = Skill::new(*fused_id, *fused_name, SkillRarity::Rare).with_power(15);
    let mut next = sheet.clone();
    next.skills.retain(|s| &s.id != first && &s.id != second);
    next.skills.push(fused.clone());
    next.discovered_fusions
        .insert(format!("{first}+{second}"));
    Ok((next, fused))
}

/// Watch player input for insight patterns. After enough observations the
/// partial skill materializes into a real one (capacity permitting).
pub fn process_action_insight(
    input: &str,
    sheet: &CharacterSheet,
) -> (CharacterSheet, Option<Skill>) {
    let lowered = input.to_lowercase();
    let mut next = sheet.clone();
    let mut materialized = None;

    for (pattern, skill_name) in INSIGHT_PATTERNS {
        if !lowered.contains(pattern) {
            continue;
        }
        let skill_id = skill_id_for_name(skill_name);
        if next.skill(&skill_id).is_some() {
            continue;
        }

        let partial = match next.partial_skills.iter().find(|p| p.pattern == *pattern) {
            Some(existing) => existing.observed(),
            None => PartialSkill::new(*pattern, *skill_name, INSIGHT_OBSERVATIONS_REQUIRED).observed(),
        };

        if partial.is_ready()
            && materialized.is_none()
            && (next.skills.len() as u32) < skill_capacity(next.level)
        {
            next.partial_skills.retain(|p| p.pattern != *pattern);
            let skill = Skill::new(skill_id, *skill_name, SkillRarity::Common)
                .with_cost(0, 5)
                .with_cooldown(2)
                .with_power(5);
            next.skills.push(skill.clone());
            materialized = Some(skill);
        } else {
            next.partial_skills.retain(|p| p.pattern != *pattern);
            next.partial_skills.push(partial);
        }
    }

    (next, materialized)
}

fn skill_id_for_name(name: &str) -> SkillId {
    SkillId::new(format!("skill_{}", name.to_lowercase().replace(' ', "_")))
}

fn prettify_skill_id(id: &SkillId) -> String {
    id.as_str()
        .trim_start_matches("skill_")
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
