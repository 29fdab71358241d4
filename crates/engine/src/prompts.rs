//! Prompt templates for every agent role.
//!
//! Templates are plain functions over state so prompts stay greppable.
//! Each one states the output contract the parser on the other side
//! expects.

use questweaver_domain::{GameState, Npc, SystemType};

/// System prompt for the Game Master agent.
pub fn game_master_system(state: &GameState) -> String {
    format!(
        "You are the Game Master of a LitRPG adventure. The world: {}. \
         The player is {}, a level {} {}. Player-stated playstyle: {}.\n\
         For every situation you receive, reply with a single JSON object and \
         nothing else, using the keys: primaryAction, npcReactions, \
         environmentalEffects, narrativeBeats, suggestedActions, sceneTone, \
         triggeredEvents.",
        state.system_type.genre_cue(),
        state.player_name,
        state.character_sheet.level,
        state.character_sheet.class.display_name(),
        if state.player_preferences.playstyle.is_empty() {
            "unknown"
        } else {
            &state.player_preferences.playstyle
        },
    )
}

/// Situation block handed to the Game Master each complex turn.
pub fn game_master_situation(
    state: &GameState,
    input: &str,
    recent_events: &[String],
    npcs_here: &[&Npc],
) -> String {
    let location = state
        .current_location()
        .map(|l| format!("{} (danger {})", l.name, l.danger))
        .unwrap_or_else(|| "an unknown place".to_string());
    let npcs = if npcs_here.is_empty() {
        "none".to_string()
    } else {
        npcs_here
            .iter()
            .map(|n| format!("{} ({})", n.name, n.archetype.display_name()))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let recent = if recent_events.is_empty() {
        "nothing yet".to_string()
    } else {
        recent_events.join("\n")
    };
    format!(
        "Location: {location}\nNPCs present: {npcs}\nRecent events:\n{recent}\n\n\
         Player input: {input}\n\nPlan the scene as JSON."
    )
}

/// System prompt for the Narrator agent.
pub fn narrator_system(system_type: SystemType) -> String {
    format!(
        "You are the narrator of a LitRPG adventure where {}. Write vivid \
         second-person present-tense prose, 3-5 sentences per scene. Weave \
         NPC reactions in at their stated timing. Always finish with the \
         available actions you are given, one per line, each prefixed '> '.",
        system_type.genre_cue()
    )
}

/// Opening narration request for a brand-new game.
pub fn opening_narration(state: &GameState) -> String {
    let location = state
        .current_location()
        .map(|l| l.name.clone())
        .unwrap_or_else(|| "the starting area".to_string());
    let backstory = if state.backstory.is_empty() {
        "an unremarkable past".to_string()
    } else {
        state.backstory.clone()
    };
    format!(
        "Narrate the opening moment for {} at {}. Their backstory: {}. \
         Establish the genre ({}) and end on the first choice they face.",
        state.player_name,
        location,
        backstory,
        state.system_type.genre_cue(),
    )
}

/// System prompt for an NPC conversation agent.
pub fn npc_system(npc: &Npc, state: &GameState) -> String {
    format!(
        "You are {}, a {} in a LitRPG world. Traits: {}. You speak {}. \
         Your motivations: {}. Your relationship with {} is {} on a scale of \
         -100 to 100. Stay in character; reply with spoken dialogue only.",
        npc.name,
        npc.archetype.display_name(),
        npc.personality.traits.join(", "),
        npc.personality.speech_pattern,
        npc.personality.motivations.join("; "),
        state.player_name,
        npc.relationship,
    )
}

/// Intent-extraction request; the reply must be a tiny JSON object.
pub fn intent_extraction(input: &str, npcs_here: &[String], skills: &[String]) -> String {
    format!(
        "Classify this player input for a LitRPG engine.\n\
         Input: {input}\n\
         NPCs present: [{}]\n\
         Known skills: [{}]\n\
         Reply with one JSON object: {{\"intent\": INTENT, \"target\": string or null}} \
         where INTENT is one of COMBAT, NPC_DIALOGUE, EXPLORATION, SYSTEM_QUERY, \
         QUEST_ACTION, CLASS_SELECTION, SKILL_MENU, USE_SKILL, SKILL_EVOLUTION, \
         SKILL_FUSION, STATUS_MENU, INVENTORY_MENU.",
        npcs_here.join(", "),
        skills.join(", "),
    )
}

/// NPC disambiguation: ask for a 1-based index or NONE.
pub fn npc_disambiguation(input: &str, npcs_here: &[String]) -> String {
    let listing = npcs_here
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{}. {name}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "The player said: {input}\nWhich of these NPCs are they addressing?\n{listing}\n\
         Reply with the number alone, or NONE."
    )
}

/// Custom-class adjudication request.
pub fn custom_class_request(request: &str, state: &GameState) -> String {
    format!(
        "A player of a LitRPG game ({}) asks for a custom class: \"{request}\". \
         Decide whether to allow it. Reply with one JSON object: \
         {{\"decision\": \"ACCEPT\" or \"REJECT\", \"customName\": string, \
         \"description\": string, \"baseArchetype\": one of WARRIOR, MAGE, ROGUE, \
         HEALER, RANGER}}. Reject requests that are incoherent or game-breaking.",
        state.system_type.display_name(),
    )
}

/// Shared framing for the three planner proposal agents.
fn planner_preamble(state: &GameState) -> String {
    let npcs = state
        .npcs
        .values()
        .map(|n| format!("{} ({})", n.id, n.name))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "You plan future story beats for a LitRPG adventure where {}. \
         Player: {} (level {}). Known NPCs: [{npcs}]. Player playstyle: {}.\n\
         Reply with one JSON object: {{\"proposedNodes\": [{{\"id\", \"beatType\", \
         \"description\", \"triggerLevel\", \"tier\", \"sequence\", \"involvedNpcs\", \
         \"involvedLocations\", \"foreshadowing\"}}], \"proposedEdges\": [{{\"from\", \
         \"to\", \"kind\"}}], \"nodeRatings\": {{id: confidence 0..1}}, \
         \"reasoning\": string}}. beatType is one of REVELATION, CONFRONTATION, \
         BETRAYAL, TRANSFORMATION, CHOICE, LOSS, VICTORY, REUNION, ESCALATION.",
        state.system_type.genre_cue(),
        state.player_name,
        state.character_sheet.level,
        if state.player_preferences.playstyle.is_empty() {
            "unknown"
        } else {
            &state.player_preferences.playstyle
        },
    )
}

/// Story-structure proposal agent.
pub fn planner_story_system(state: &GameState) -> String {
    format!(
        "{}\nYour lens: dramatic structure. Propose beats that escalate \
         stakes and pay off foreshadowing.",
        planner_preamble(state)
    )
}

/// Character-arc proposal agent.
pub fn planner_character_system(state: &GameState) -> String {
    format!(
        "{}\nYour lens: character arcs. Propose beats that test \
         relationships and force growth.",
        planner_preamble(state)
    )
}

/// World-consistency proposal agent.
pub fn planner_world_system(state: &GameState) -> String {
    format!(
        "{}\nYour lens: the world itself. Propose beats that reveal \
         history, factions, and places.",
        planner_preamble(state)
    )
}
