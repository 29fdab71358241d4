//! Simple-path intent handlers.
//!
//! These run without the Game Master: menu surfaces, direct combat, quiet
//! exploration, skill bookkeeping, and class selection. Each handler emits
//! its own events in order and reports what happened via [`TurnFacts`].

use std::sync::Arc;

use rand::rngs::StdRng;
use serde::Deserialize;

use questweaver_domain::rules::{self, SkillUseOutcome};
use questweaver_domain::{
    CharacterClass, ClassArchetype, GameState, LocationId, NpcId, Stat,
};
use questweaver_shared::GameEvent;

use crate::infrastructure::ports::{ChatMessage, LlmPort, LlmRequest};
use crate::prompts;
use crate::scene::narrator::quest_context_block;
use crate::scene::plan::{extract_json_block, strip_special_tokens};

use super::intent::Intent;
use super::EventSink;

/// What actually happened this turn, for quest tracking.
#[derive(Debug, Clone, Default)]
pub struct TurnFacts {
    pub combat_target: Option<String>,
    pub discovered: Vec<LocationId>,
    pub talked_to: Vec<NpcId>,
    pub system_used: Option<String>,
}

/// Dispatch one validated simple intent.
pub async fn handle_simple_intent(
    intent: &Intent,
    input: &str,
    state: &mut GameState,
    rng: &mut StdRng,
    llm: &Arc<dyn LlmPort>,
    sink: &mut EventSink,
) -> TurnFacts {
    let mut facts = TurnFacts::default();
    match intent {
        Intent::StatusMenu => {
            sink.emit(GameEvent::notification(status_text(state))).await;
            facts.system_used = Some("status".to_string());
        }
        Intent::InventoryMenu => {
            sink.emit(GameEvent::notification(inventory_text(state)))
                .await;
            facts.system_used = Some("inventory".to_string());
        }
        Intent::SkillMenu => {
            sink.emit(GameEvent::notification(skills_text(state))).await;
            facts.system_used = Some("skills".to_string());
        }
        Intent::SystemQuery => {
            sink.emit(GameEvent::notification(
                "The System awaits a command: status, inventory, skills, or quest list.",
            ))
            .await;
            facts.system_used = Some("system".to_string());
        }
        Intent::QuestAction => {
            // On the simple path this is the quest list surface.
            let block = quest_context_block(state);
            let text = if block.is_empty() {
                "No active quests.".to_string()
            } else {
                block
            };
            sink.emit(GameEvent::notification(text)).await;
            facts.system_used = Some("quest".to_string());
        }
        Intent::Combat { target } => {
            handle_combat(target, state, rng, sink, &mut facts).await;
        }
        Intent::Exploration => {
            handle_exploration(state, sink, &mut facts).await;
        }
        Intent::UseSkill { skill } => {
            handle_use_skill(skill, state, rng, sink).await;
        }
        Intent::SkillEvolution { skill } => {
            handle_evolution(skill, state, sink).await;
        }
        Intent::SkillFusion { first, second } => {
            handle_fusion(first, second, state, sink).await;
        }
        Intent::ClassSelection { request } => {
            handle_class_selection(request, state, llm, sink).await;
        }
        Intent::NpcDialogue { .. } => {
            // Dialogue with someone present always classifies complex;
            // reaching here means validation let a ghost through.
            sink.emit(GameEvent::notification("There is nobody here to talk to."))
                .await;
        }
    }
    facts
}

async fn handle_combat(
    target: &str,
    state: &mut GameState,
    rng: &mut StdRng,
    sink: &mut EventSink,
    facts: &mut TurnFacts,
) {
    let xp_before = state.character_sheet.xp;
    let (sheet, outcome) = rules::resolve_combat(target, state, rng);
    state.character_sheet = sheet;
    facts.combat_target = Some(outcome.target.clone());

    sink.emit(GameEvent::combat_log(format!(
        "You hit {} for {} damage{}{}",
        outcome.target,
        outcome.damage_dealt,
        if outcome.critical { " - critical hit!" } else { "." },
        if outcome.damage_taken > 0 {
            format!(" It strikes back for {}.", outcome.damage_taken)
        } else {
            String::new()
        },
    )))
    .await;
    sink.emit(GameEvent::stat_change(
        "xp",
        xp_before as i64,
        state.character_sheet.xp as i64,
    ))
    .await;
    if let Some(report) = &outcome.level_up {
        sink.emit(GameEvent::notification(format!(
            "Level up! You are now level {}.",
            report.new_level
        )))
        .await;
    }
    for item in &outcome.loot {
        sink.emit(GameEvent::ItemGained {
            item_id: item.id.to_string(),
            item_name: item.name.clone(),
            quantity: 1,
        })
        .await;
    }
}

async fn handle_exploration(state: &mut GameState, sink: &mut EventSink, facts: &mut TurnFacts) {
    let Some(location) = state.current_location() else {
        return;
    };
    let undiscovered = location
        .connections
        .iter()
        .find(|id| !state.discovered_locations.contains(*id))
        .cloned();
    match undiscovered {
        Some(found) => {
            state.discovered_locations.insert(found.clone());
            facts.discovered.push(found.clone());
            let name = state
                .location(&found)
                .map(|l| l.name)
                .unwrap_or_else(|| found.to_string());
            sink.emit(GameEvent::narrator(format!(
                "You scout the edges of {} and find a path toward {}.",
                location.name, name
            )))
            .await;
        }
        None => {
            sink.emit(GameEvent::narrator(format!(
                "You sweep {} again, but its paths are already known to you.",
                location.name
            )))
            .await;
        }
    }
}

async fn handle_use_skill(
    skill_name: &str,
    state: &mut GameState,
    rng: &mut StdRng,
    sink: &mut EventSink,
) {
    let Some(skill) = state.character_sheet.skill_by_name(skill_name) else {
        sink.emit(GameEvent::notification(format!(
            "You don't know a skill called \"{skill_name}\"."
        )))
        .await;
        return;
    };
    let skill_id = skill.id.clone();
    let display = skill.name.clone();

    match rules::use_skill(&state.character_sheet, &skill_id, rng) {
        Ok((sheet, outcome)) => {
            state.character_sheet = sheet;
            match outcome {
                SkillUseOutcome::Success {
                    damage,
                    healing,
                    skill_leveled,
                    ..
                } => {
                    if damage > 0 {
                        sink.emit(GameEvent::combat_log(format!(
                            "{display} tears loose for {damage} damage."
                        )))
                        .await;
                    }
                    if healing > 0 {
                        sink.emit(GameEvent::notification(format!(
                            "{display} restores {healing} HP."
                        )))
                        .await;
                    }
                    if damage <= 0 && healing <= 0 {
                        sink.emit(GameEvent::notification(format!("You use {display}.")))
                            .await;
                    }
                    if skill_leveled {
                        sink.emit(GameEvent::notification(format!("{display} grew stronger!")))
                            .await;
                    }
                }
                SkillUseOutcome::OnCooldown { turns_remaining } => {
                    sink.emit(GameEvent::notification(format!(
                        "{display} is on cooldown for {turns_remaining} more turn(s)."
                    )))
                    .await;
                }
                SkillUseOutcome::InsufficientResources { missing } => {
                    sink.emit(GameEvent::notification(format!(
                        "Not enough resources for {display}: {}.",
                        missing.join(", ")
                    )))
                    .await;
                }
            }
        }
        Err(e) => {
            sink.emit(GameEvent::notification(e.to_string())).await;
        }
    }
}

async fn handle_evolution(skill_name: &str, state: &mut GameState, sink: &mut EventSink) {
    let Some(skill) = state.character_sheet.skill_by_name(skill_name) else {
        sink.emit(GameEvent::notification(format!(
            "You don't know a skill called \"{skill_name}\"."
        )))
        .await;
        return;
    };
    let skill_id = skill.id.clone();
    match rules::evolve_skill(&state.character_sheet, &skill_id) {
        Ok((sheet, evolved)) => {
            state.character_sheet = sheet;
            sink.emit(GameEvent::notification(format!(
                "Skill evolution! {} has become {} ({}).",
                skill_name,
                evolved.name,
                evolved.rarity.display_name()
            )))
            .await;
        }
        Err(e) => {
            sink.emit(GameEvent::notification(e.to_string())).await;
        }
    }
}

async fn handle_fusion(first: &str, second: &str, state: &mut GameState, sink: &mut EventSink) {
    let ids = [first, second].map(|name| {
        state
            .character_sheet
            .skill_by_name(name)
            .map(|s| s.id.clone())
    });
    let [Some(first_id), Some(second_id)] = ids else {
        sink.emit(GameEvent::notification(
            "Name two skills you know, e.g. \"fuse evasion and stealth\".",
        ))
        .await;
        return;
    };
    match rules::fuse_skills(&state.character_sheet, &first_id, &second_id) {
        Ok((sheet, fused)) => {
            state.character_sheet = sheet;
            sink.emit(GameEvent::notification(format!(
                "Fusion discovered! {} ({}) joins your skill list.",
                fused.name,
                fused.rarity.display_name()
            )))
            .await;
        }
        Err(e) => {
            sink.emit(GameEvent::notification(e.to_string())).await;
        }
    }
}

/// Class selection. A recognizable standard class applies directly; a
/// non-standard request goes through the custom-class protocol.
async fn handle_class_selection(
    request: &str,
    state: &mut GameState,
    llm: &Arc<dyn LlmPort>,
    sink: &mut EventSink,
) {
    let standard = request
        .split_whitespace()
        .find_map(ClassArchetype::from_keyword);

    if let Some(archetype) = standard {
        apply_class(state, archetype, None);
        sink.emit(GameEvent::notification(format!(
            "Class chosen: {}. Your body reshapes itself around the choice.",
            archetype.display_name()
        )))
        .await;
        return;
    }

    match adjudicate_custom_class(llm, request, state).await {
        Some(grant) => {
            apply_class(state, grant.base, Some(grant.name.clone()));
            sink.emit(GameEvent::notification(format!(
                "The System weighs your request... Accepted. You are now a {} ({} lineage). {}",
                grant.name,
                grant.base.display_name(),
                grant.description
            )))
            .await;
        }
        None => {
            let listing = ClassArchetype::all()
                .iter()
                .map(|a| a.display_name())
                .collect::<Vec<_>>()
                .join(", ");
            sink.emit(GameEvent::notification(format!(
                "The System denies your request. Choose from: {listing}."
            )))
            .await;
        }
    }
}

struct CustomClassGrant {
    name: String,
    description: String,
    base: ClassArchetype,
}

async fn adjudicate_custom_class(
    llm: &Arc<dyn LlmPort>,
    request: &str,
    state: &GameState,
) -> Option<CustomClassGrant> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Verdict {
        #[serde(default)]
        decision: String,
        #[serde(default)]
        custom_name: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        base_archetype: String,
    }

    let prompt = prompts::custom_class_request(request, state);
    let response = llm
        .generate(LlmRequest::new(vec![ChatMessage::user(prompt)]))
        .await
        .ok()?;

    let cleaned = strip_special_tokens(&response.content);
    let block = extract_json_block(&cleaned)?;
    let verdict: Verdict = serde_json::from_str(block).ok()?;
    if !verdict.decision.eq_ignore_ascii_case("ACCEPT") {
        return None;
    }
    let base = ClassArchetype::from_keyword(&verdict.base_archetype)?;
    Some(CustomClassGrant {
        name: if verdict.custom_name.is_empty() {
            base.display_name().to_string()
        } else {
            verdict.custom_name
        },
        description: verdict.description,
        base,
    })
}

/// Apply a class: stat bonuses onto base stats, resources rescaled to the
/// new maxima.
fn apply_class(state: &mut GameState, archetype: ClassArchetype, custom_name: Option<String>) {
    let sheet = &mut state.character_sheet;
    sheet.base_stats = sheet.base_stats.plus(&archetype.stat_bonuses()).clamped_to_base();
    sheet.class = match custom_name {
        Some(name) => CharacterClass::Custom {
            name,
            base: archetype,
        },
        None => CharacterClass::Standard { archetype },
    };
    sheet.resources = sheet
        .resources
        .rescaled(&sheet.effective_stats(), sheet.level)
        .refilled();
}

/// The status surface. Contains level, resources, and all six stats.
pub fn status_text(state: &GameState) -> String {
    let sheet = &state.character_sheet;
    let stats = sheet.effective_stats();
    let threshold = rules::xp_threshold(sheet.level, state.difficulty);
    format!(
        "[{}] Level {} {} (Grade {}) | XP: {}/{} | HP: {}/{} | MP: {}/{} | Energy: {}/{} | \
         STR: {} DEX: {} CON: {} INT: {} WIS: {} CHA: {} | Gold: {} | Unspent stat points: {}",
        state.player_name,
        sheet.level,
        sheet.class.display_name(),
        sheet.grade.display_name(),
        sheet.xp,
        threshold,
        sheet.resources.hp.current,
        sheet.resources.hp.max,
        sheet.resources.mp.current,
        sheet.resources.mp.max,
        sheet.resources.energy.current,
        sheet.resources.energy.max,
        stats.get(Stat::Str),
        stats.get(Stat::Dex),
        stats.get(Stat::Con),
        stats.get(Stat::Int),
        stats.get(Stat::Wis),
        stats.get(Stat::Cha),
        sheet.gold,
        sheet.unspent_stat_points,
    )
}

fn inventory_text(state: &GameState) -> String {
    let sheet = &state.character_sheet;
    if sheet.inventory.is_empty() {
        return format!("Your pack is empty. Gold: {}.", sheet.gold);
    }
    let items = sheet
        .inventory
        .iter()
        .map(|entry| format!("{} x{}", entry.item.name, entry.quantity))
        .collect::<Vec<_>>()
        .join(", ");
    format!("Inventory: {items}. Gold: {}.", sheet.gold)
}

fn skills_text(state: &GameState) -> String {
    let sheet = &state.character_sheet;
    if sheet.skills.is_empty() && sheet.partial_skills.is_empty() {
        return "You have learned no skills yet.".to_string();
    }
    let mut lines = Vec::new();
    if !sheet.skills.is_empty() {
        let skills = sheet
            .skills
            .iter()
            .map(|s| {
                let cooldown = if s.current_cooldown > 0 {
                    format!(", cooldown {}", s.current_cooldown)
                } else {
                    String::new()
                };
                format!("{} (Lv{} {}{})", s.name, s.level, s.rarity.display_name(), cooldown)
            })
            .collect::<Vec<_>>()
            .join("; ");
        lines.push(format!("Skills: {skills}."));
    }
    if !sheet.partial_skills.is_empty() {
        let partials = sheet
            .partial_skills
            .iter()
            .map(|p| format!("{} ({}/{})", p.skill_name, p.observations, p.required))
            .collect::<Vec<_>>()
            .join("; ");
        lines.push(format!("Taking shape: {partials}."));
    }
    lines.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use questweaver_domain::{CharacterSheet, Difficulty, StatBlock, SystemType};

    fn state() -> GameState {
        GameState::new(
            "Elena",
            "backstory",
            SystemType::SystemIntegration,
            Difficulty::Normal,
            CharacterSheet::new(StatBlock::uniform(10)),
        )
    }

    #[test]
    fn status_text_carries_required_fields() {
        let text = status_text(&state());
        for needle in ["Level", "HP:", "MP:", "STR:"] {
            assert!(text.contains(needle), "missing {needle}: {text}");
        }
    }

    #[test]
    fn apply_class_raises_stats_and_refills() {
        let mut s = state();
        s.character_sheet.resources.hp = s.character_sheet.resources.hp.drained(30);
        apply_class(&mut s, ClassArchetype::Warrior, None);
        assert_eq!(s.character_sheet.base_stats.get(Stat::Str), 13);
        assert_eq!(
            s.character_sheet.resources.hp.current,
            s.character_sheet.resources.hp.max
        );
        assert_eq!(s.character_sheet.class.display_name(), "Warrior");
    }

    #[test]
    fn custom_class_keeps_display_name() {
        let mut s = state();
        apply_class(&mut s, ClassArchetype::Mage, Some("Void Cartographer".to_string()));
        assert_eq!(s.character_sheet.class.display_name(), "Void Cartographer");
        assert_eq!(
            s.character_sheet.class.archetype(),
            Some(ClassArchetype::Mage)
        );
    }
}
