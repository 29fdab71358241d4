//! Player intent analysis: keyword heuristics first, LLM extraction for
//! free text, LLM index disambiguation for ambiguous NPC addressing.

use std::sync::Arc;

use serde::Deserialize;

use questweaver_domain::{GameState, NpcId};

use crate::infrastructure::ports::{ChatMessage, LlmPort, LlmRequest};
use crate::prompts;
use crate::scene::plan::{extract_json_block, strip_special_tokens};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Combat { target: String },
    NpcDialogue { npc_id: Option<NpcId>, message: String },
    Exploration,
    SystemQuery,
    QuestAction,
    ClassSelection { request: String },
    SkillMenu,
    UseSkill { skill: String },
    SkillEvolution { skill: String },
    SkillFusion { first: String, second: String },
    StatusMenu,
    InventoryMenu,
}

impl Intent {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Combat { .. } => "COMBAT",
            Self::NpcDialogue { .. } => "NPC_DIALOGUE",
            Self::Exploration => "EXPLORATION",
            Self::SystemQuery => "SYSTEM_QUERY",
            Self::QuestAction => "QUEST_ACTION",
            Self::ClassSelection { .. } => "CLASS_SELECTION",
            Self::SkillMenu => "SKILL_MENU",
            Self::UseSkill { .. } => "USE_SKILL",
            Self::SkillEvolution { .. } => "SKILL_EVOLUTION",
            Self::SkillFusion { .. } => "SKILL_FUSION",
            Self::StatusMenu => "STATUS_MENU",
            Self::InventoryMenu => "INVENTORY_MENU",
        }
    }

    pub fn combat_target(&self) -> Option<&str> {
        match self {
            Self::Combat { target } => Some(target),
            _ => None,
        }
    }
}

/// Strip leading articles from an extracted target phrase.
fn clean_target(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches(['.', '!', '?']);
    let without_article = trimmed
        .strip_prefix("the ")
        .or_else(|| trimmed.strip_prefix("a "))
        .or_else(|| trimmed.strip_prefix("an "))
        .unwrap_or(trimmed);
    without_article.trim().to_string()
}

/// Phrase following the first occurrence of any keyword.
fn after_keyword<'a>(input: &'a str, keywords: &[&str]) -> Option<&'a str> {
    for keyword in keywords {
        if let Some(index) = input.find(keyword) {
            return Some(input[index + keyword.len()..].trim());
        }
    }
    None
}

pub struct IntentAnalyzer {
    llm: Arc<dyn LlmPort>,
}

impl IntentAnalyzer {
    pub fn new(llm: Arc<dyn LlmPort>) -> Self {
        Self { llm }
    }

    /// Classify one input. Menu and meta commands resolve by keyword; free
    /// text falls through to LLM extraction, and from there to exploration.
    pub async fn analyze(&self, input: &str, state: &GameState) -> Intent {
        let lowered = input.to_lowercase();

        if let Some(intent) = keyword_intent(&lowered, state) {
            return intent;
        }

        match self.extract_with_llm(input, state).await {
            Some(intent) => intent,
            None => Intent::Exploration,
        }
    }

    async fn extract_with_llm(&self, input: &str, state: &GameState) -> Option<Intent> {
        let npcs: Vec<String> = state.npcs_here().iter().map(|n| n.name.clone()).collect();
        let skills: Vec<String> = state
            .character_sheet
            .skills
            .iter()
            .map(|s| s.name.clone())
            .collect();
        let prompt = prompts::intent_extraction(input, &npcs, &skills);

        let response = match self
            .llm
            .generate(LlmRequest::new(vec![ChatMessage::user(prompt)]))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Intent extraction failed, defaulting to exploration");
                return None;
            }
        };

        #[derive(Deserialize)]
        struct Extracted {
            #[serde(default)]
            intent: String,
            #[serde(default)]
            target: Option<String>,
        }

        let cleaned = strip_special_tokens(&response.content);
        let block = extract_json_block(&cleaned)?;
        let extracted: Extracted = serde_json::from_str(block).ok()?;
        let target = extracted.target.unwrap_or_default();

        Some(match extracted.intent.to_ascii_uppercase().as_str() {
            "COMBAT" => Intent::Combat {
                target: clean_target(&target),
            },
            "NPC_DIALOGUE" => Intent::NpcDialogue {
                npc_id: fuzzy_npc_match(&target.to_lowercase(), state),
                message: input.to_string(),
            },
            "SYSTEM_QUERY" => Intent::SystemQuery,
            "QUEST_ACTION" => Intent::QuestAction,
            "CLASS_SELECTION" => Intent::ClassSelection {
                request: input.to_string(),
            },
            "SKILL_MENU" => Intent::SkillMenu,
            "USE_SKILL" => Intent::UseSkill {
                skill: clean_target(&target),
            },
            "SKILL_EVOLUTION" => Intent::SkillEvolution {
                skill: clean_target(&target),
            },
            "SKILL_FUSION" => Intent::SkillFusion {
                first: clean_target(&target),
                second: String::new(),
            },
            "STATUS_MENU" => Intent::StatusMenu,
            "INVENTORY_MENU" => Intent::InventoryMenu,
            _ => Intent::Exploration,
        })
    }

    /// Resolve which present NPC the player is addressing. Fuzzy name match
    /// first; if that fails and several NPCs are present, ask the LLM for a
    /// 1-based index or NONE.
    pub async fn resolve_npc(&self, input: &str, state: &GameState) -> Option<NpcId> {
        let lowered = input.to_lowercase();
        if let Some(id) = fuzzy_npc_match(&lowered, state) {
            return Some(id);
        }

        let here = state.npcs_here();
        match here.len() {
            0 => None,
            1 => Some(here[0].id.clone()),
            _ => {
                let names: Vec<String> = here.iter().map(|n| n.name.clone()).collect();
                let prompt = prompts::npc_disambiguation(input, &names);
                let response = self
                    .llm
                    .generate(LlmRequest::new(vec![ChatMessage::user(prompt)]))
                    .await
                    .ok()?;
                let answer = response.content.trim();
                if answer.eq_ignore_ascii_case("NONE") {
                    return None;
                }
                let index: usize = answer
                    .chars()
                    .take_while(|c| c.is_ascii_digit())
                    .collect::<String>()
                    .parse()
                    .ok()?;
                here.get(index.checked_sub(1)?).map(|n| n.id.clone())
            }
        }
    }
}

/// Keyword heuristics for menu and meta commands.
fn keyword_intent(lowered: &str, state: &GameState) -> Option<Intent> {
    let has = |needle: &str| lowered.contains(needle);

    if has("status") || has("character sheet") || lowered.trim() == "stats" {
        return Some(Intent::StatusMenu);
    }
    if has("inventory") || has("my items") || has("my bag") {
        return Some(Intent::InventoryMenu);
    }
    if has("evolve") {
        let skill = after_keyword(lowered, &["evolve"]).unwrap_or_default();
        return Some(Intent::SkillEvolution {
            skill: clean_target(skill),
        });
    }
    if has("fuse") {
        let rest = after_keyword(lowered, &["fuse"]).unwrap_or_default();
        let (first, second) = rest
            .split_once(" and ")
            .or_else(|| rest.split_once(" with "))
            .unwrap_or((rest, ""));
        return Some(Intent::SkillFusion {
            first: clean_target(first),
            second: clean_target(second),
        });
    }
    if has("use ") {
        // Unknown names still resolve to UseSkill; validation rejects them
        // with a readable reason instead of guessing at interactions.
        let candidate = clean_target(after_keyword(lowered, &["use "]).unwrap_or_default());
        if !candidate.is_empty() {
            return Some(Intent::UseSkill { skill: candidate });
        }
    }
    if has("skill") {
        return Some(Intent::SkillMenu);
    }
    if has("class") || has("i want to be") || has("become a") {
        return Some(Intent::ClassSelection {
            request: lowered.to_string(),
        });
    }
    if has("quest") {
        return Some(Intent::QuestAction);
    }
    if let Some(rest) = after_keyword(lowered, &["attack", "fight", "kill", "strike"]) {
        let target = clean_target(rest);
        return Some(Intent::Combat {
            target: if target.is_empty() {
                "the enemy".to_string()
            } else {
                target
            },
        });
    }
    if has("talk") || has("greet") || has("ask ") || has("say ") || has("tell ") {
        return Some(Intent::NpcDialogue {
            npc_id: fuzzy_npc_match(lowered, state),
            message: lowered.to_string(),
        });
    }
    if has("explore") || has("look around") || has("search") {
        return Some(Intent::Exploration);
    }
    None
}

/// Case-insensitive containment match against present NPC names.
fn fuzzy_npc_match(lowered_input: &str, state: &GameState) -> Option<NpcId> {
    for npc in state.npcs_here() {
        let name = npc.name.to_lowercase();
        if lowered_input.contains(&name) {
            return Some(npc.id.clone());
        }
        // First name alone is enough ("talk to elder" for "Elder Shen").
        if let Some(first_word) = name.split_whitespace().next() {
            if first_word.len() > 2 && lowered_input.contains(first_word) {
                return Some(npc.id.clone());
            }
        }
    }
    None
}

/// Precondition check; `Err` carries the player-facing reason.
pub fn validate_intent(intent: &Intent, state: &GameState) -> Result<(), String> {
    let sheet = &state.character_sheet;
    match intent {
        Intent::Combat { .. } => {
            if sheet.is_dead() {
                return Err("You are in no state to fight.".to_string());
            }
            Ok(())
        }
        Intent::NpcDialogue { npc_id, .. } => match npc_id {
            Some(id) if state.npc(id).is_some() => Ok(()),
            Some(id) => Err(format!("There is no sign of {id} here.")),
            None => {
                let names: Vec<String> =
                    state.npcs_here().iter().map(|n| n.name.clone()).collect();
                if names.is_empty() {
                    Err("There is nobody here to talk to.".to_string())
                } else {
                    Err(format!(
                        "Who do you mean? Present: {}.",
                        names.join(", ")
                    ))
                }
            }
        },
        Intent::UseSkill { skill } => match sheet.skill_by_name(skill) {
            Some(_) => Ok(()),
            None => Err(format!("You don't know a skill called \"{skill}\".")),
        },
        Intent::SkillEvolution { skill } => match sheet.skill_by_name(skill) {
            Some(s) if s.can_evolve() => Ok(()),
            Some(s) => Err(format!("{} is not ready to evolve.", s.name)),
            None => Err(format!("You don't know a skill called \"{skill}\".")),
        },
        Intent::SkillFusion { first, second } => {
            for name in [first, second] {
                if !name.is_empty() && sheet.skill_by_name(name).is_none() {
                    return Err(format!("You don't know a skill called \"{name}\"."));
                }
            }
            Ok(())
        }
        Intent::ClassSelection { .. } => {
            if sheet.class.is_chosen() {
                Err("Your path is already chosen.".to_string())
            } else {
                Ok(())
            }
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use questweaver_domain::content;
    use questweaver_domain::{
        CharacterSheet, Difficulty, Skill, SkillRarity, StatBlock, SystemType,
    };

    fn state() -> GameState {
        let mut state = GameState::new(
            "Elena",
            "backstory",
            SystemType::SystemIntegration,
            Difficulty::Normal,
            CharacterSheet::new(StatBlock::uniform(10)),
        );
        let guide = content::guide_npc(SystemType::SystemIntegration);
        state.npcs.insert(guide.id.clone(), guide);
        state
    }

    #[test]
    fn keyword_heuristics_cover_menus() {
        let s = state();
        assert!(matches!(
            keyword_intent("status", &s),
            Some(Intent::StatusMenu)
        ));
        assert!(matches!(
            keyword_intent("open inventory", &s),
            Some(Intent::InventoryMenu)
        ));
        assert!(matches!(
            keyword_intent("show my skills", &s),
            Some(Intent::SkillMenu)
        ));
    }

    #[test]
    fn combat_target_strips_articles() {
        let s = state();
        match keyword_intent("attack the training construct", &s) {
            Some(Intent::Combat { target }) => assert_eq!(target, "training construct"),
            other => panic!("expected combat, got {other:?}"),
        }
    }

    #[test]
    fn fuse_splits_operands() {
        let s = state();
        match keyword_intent("fuse evasion and stealth", &s) {
            Some(Intent::SkillFusion { first, second }) => {
                assert_eq!(first, "evasion");
                assert_eq!(second, "stealth");
            }
            other => panic!("expected fusion, got {other:?}"),
        }
    }

    #[test]
    fn fuzzy_match_finds_the_guide_by_first_name() {
        let s = state();
        assert!(fuzzy_npc_match("talk to lyra about the system", &s).is_some());
        assert!(fuzzy_npc_match("talk to the blacksmith", &s).is_none());
    }

    #[test]
    fn validation_rejects_unknown_skills() {
        let mut s = state();
        s.character_sheet
            .skills
            .push(Skill::new("skill_fireball", "Fireball", SkillRarity::Common));
        assert!(validate_intent(
            &Intent::UseSkill {
                skill: "fireball".to_string()
            },
            &s
        )
        .is_ok());
        assert!(validate_intent(
            &Intent::UseSkill {
                skill: "meteor".to_string()
            },
            &s
        )
        .is_err());
    }

    #[test]
    fn dialogue_without_resolution_asks_who() {
        let s = state();
        let err = validate_intent(
            &Intent::NpcDialogue {
                npc_id: None,
                message: "hello there".to_string(),
            },
            &s,
        )
        .expect_err("unresolved");
        assert!(err.contains("Who do you mean?"));
    }
}
