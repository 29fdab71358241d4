//! Scene plan: the structured directive the Game Master returns.
//!
//! LLM output is parsed tolerantly: the first balanced `{...}` block is
//! decoded with per-field defaults, unknown enum strings fall back to
//! documented defaults, and a decode failure yields the minimal plan.

use serde::{Deserialize, Serialize};

use regex_lite::Regex;
use std::sync::LazyLock;

// Model-specific special tokens that sometimes leak through raw output.
static SPECIAL_TOKENS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\|[^|>]+\|>|\[/?INST\]|<</?SYS>>").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrimaryActionType {
    Combat,
    Exploration,
    Dialogue,
    SystemQuery,
    QuestAction,
    Movement,
    Interaction,
    #[serde(other)]
    Unknown,
}

impl PrimaryActionType {
    fn or_default(self) -> Self {
        match self {
            Self::Unknown => Self::Exploration,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReactionTiming {
    Before,
    During,
    After,
    None,
    #[serde(other)]
    Unknown,
}

impl ReactionTiming {
    fn or_default(self) -> Self {
        match self {
            Self::Unknown => Self::After,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BeatKind {
    Foreshadowing,
    Callback,
    TensionBuild,
    Relief,
    WorldBuilding,
    CharacterMoment,
    #[serde(other)]
    Unknown,
}

impl BeatKind {
    fn or_default(self) -> Self {
        match self {
            Self::Unknown => Self::WorldBuilding,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Prominence {
    Subtle,
    Moderate,
    Prominent,
    #[serde(other)]
    Unknown,
}

impl Prominence {
    fn or_default(self) -> Self {
        match self {
            Self::Unknown => Self::Moderate,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Safe,
    Moderate,
    Risky,
    Dangerous,
    #[serde(other)]
    Unknown,
}

impl RiskLevel {
    fn or_default(self) -> Self {
        match self {
            Self::Unknown => Self::Moderate,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SceneTone {
    Tense,
    Peaceful,
    Mysterious,
    Comedic,
    Tragic,
    Triumphant,
    Foreboding,
    Frantic,
    #[serde(other)]
    Unknown,
}

impl SceneTone {
    fn or_default(self) -> Self {
        match self {
            Self::Unknown => Self::Peaceful,
            other => other,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Tense => "tense",
            Self::Peaceful => "peaceful",
            Self::Mysterious => "mysterious",
            Self::Comedic => "comedic",
            Self::Tragic => "tragic",
            Self::Triumphant => "triumphant",
            Self::Foreboding => "foreboding",
            Self::Frantic => "frantic",
            Self::Unknown => "peaceful",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerTiming {
    Immediate,
    Delayed,
    Setup,
    #[serde(other)]
    Unknown,
}

impl TriggerTiming {
    fn or_default(self) -> Self {
        match self {
            Self::Unknown => Self::Immediate,
            other => other,
        }
    }
}

fn default_action_type() -> PrimaryActionType {
    PrimaryActionType::Exploration
}

fn default_reaction_timing() -> ReactionTiming {
    ReactionTiming::After
}

fn default_beat_kind() -> BeatKind {
    BeatKind::WorldBuilding
}

fn default_prominence() -> Prominence {
    Prominence::Moderate
}

fn default_risk() -> RiskLevel {
    RiskLevel::Moderate
}

fn default_tone() -> SceneTone {
    SceneTone::Peaceful
}

fn default_trigger_timing() -> TriggerTiming {
    TriggerTiming::Immediate
}

fn default_event_type() -> String {
    "DISCOVERY".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryAction {
    #[serde(rename = "type", default = "default_action_type")]
    pub action_type: PrimaryActionType,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub narrative_context: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcReaction {
    #[serde(default)]
    pub npc_name: String,
    #[serde(default)]
    pub reaction: String,
    #[serde(default)]
    pub delivery_style: String,
    #[serde(default = "default_reaction_timing")]
    pub timing: ReactionTiming,
    #[serde(default)]
    pub dialogue: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeBeat {
    #[serde(rename = "type", default = "default_beat_kind")]
    pub kind: BeatKind,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_prominence")]
    pub prominence: Prominence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedAction {
    #[serde(default)]
    pub action: String,
    #[serde(rename = "type", default)]
    pub action_type: Option<String>,
    #[serde(default = "default_risk")]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggeredEvent {
    #[serde(default = "default_event_type")]
    pub event_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_trigger_timing")]
    pub timing: TriggerTiming,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenePlan {
    pub primary_action: PrimaryAction,
    #[serde(default)]
    pub npc_reactions: Vec<NpcReaction>,
    #[serde(default)]
    pub environmental_effects: Vec<String>,
    #[serde(default)]
    pub narrative_beats: Vec<NarrativeBeat>,
    #[serde(default)]
    pub suggested_actions: Vec<SuggestedAction>,
    #[serde(default = "default_tone")]
    pub scene_tone: SceneTone,
    #[serde(default)]
    pub triggered_events: Vec<TriggeredEvent>,
}

impl ScenePlan {
    /// Minimal plan used whenever the Game Master's reply is unusable.
    pub fn fallback() -> ScenePlan {
        ScenePlan {
            primary_action: PrimaryAction {
                action_type: PrimaryActionType::Exploration,
                target: None,
                description: "You take stock of your surroundings.".to_string(),
                narrative_context: String::new(),
            },
            npc_reactions: Vec::new(),
            environmental_effects: Vec::new(),
            narrative_beats: Vec::new(),
            suggested_actions: vec![
                SuggestedAction {
                    action: "Look around".to_string(),
                    action_type: None,
                    risk_level: RiskLevel::Safe,
                    context: None,
                },
                SuggestedAction {
                    action: "Continue carefully".to_string(),
                    action_type: None,
                    risk_level: RiskLevel::Safe,
                    context: None,
                },
            ],
            scene_tone: SceneTone::Peaceful,
            triggered_events: Vec::new(),
        }
    }

    /// Replace unknown enum values with their documented defaults and drop
    /// reactions naming NPCs that are not actually present.
    pub fn normalized(mut self, present_npc_names: &[String]) -> ScenePlan {
        self.primary_action.action_type = self.primary_action.action_type.or_default();
        self.scene_tone = self.scene_tone.or_default();
        self.npc_reactions.retain(|r| {
            let known = present_npc_names
                .iter()
                .any(|n| n.eq_ignore_ascii_case(&r.npc_name));
            if !known {
                tracing::debug!(npc_name = %r.npc_name, "Dropping reaction for absent NPC");
            }
            known
        });
        for reaction in &mut self.npc_reactions {
            reaction.timing = reaction.timing.or_default();
        }
        for beat in &mut self.narrative_beats {
            beat.kind = beat.kind.or_default();
            beat.prominence = beat.prominence.or_default();
        }
        for action in &mut self.suggested_actions {
            action.risk_level = action.risk_level.or_default();
        }
        for event in &mut self.triggered_events {
            event.timing = event.timing.or_default();
            if event.event_type.trim().is_empty() {
                event.event_type = default_event_type();
            }
        }
        self
    }
}

/// Strip model-special tokens that occasionally leak into raw output.
pub fn strip_special_tokens(raw: &str) -> String {
    SPECIAL_TOKENS_RE.replace_all(raw, "").to_string()
}

/// Extract the first balanced `{...}` block, respecting string literals.
pub fn extract_json_block(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let bytes = raw.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &b) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a Game Master reply into a normalized plan, falling back to the
/// minimal plan on any decode error.
pub fn parse_scene_plan(raw: &str, present_npc_names: &[String]) -> ScenePlan {
    let cleaned = strip_special_tokens(raw);
    let Some(block) = extract_json_block(&cleaned) else {
        tracing::warn!("Game Master reply contained no JSON object, using fallback plan");
        return ScenePlan::fallback();
    };
    match serde_json::from_str::<ScenePlan>(block) {
        Ok(plan) => plan.normalized(present_npc_names),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to decode scene plan, using fallback plan");
            ScenePlan::fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_plan() {
        let raw = r#"Here is my plan:
        {
            "primaryAction": {"type": "COMBAT", "target": "training construct", "description": "strike"},
            "npcReactions": [
                {"npcName": "Lyra", "reaction": "nods", "timing": "BEFORE"},
                {"npcName": "Nobody", "reaction": "claps", "timing": "AFTER"}
            ],
            "suggestedActions": [{"action": "Press the attack", "riskLevel": "RISKY"}],
            "sceneTone": "TENSE",
            "triggeredEvents": [{"eventType": "AMBUSH", "description": "wolves", "timing": "DELAYED"}]
        }"#;
        let plan = parse_scene_plan(raw, &["Lyra".to_string()]);
        assert_eq!(plan.primary_action.action_type, PrimaryActionType::Combat);
        assert_eq!(plan.primary_action.target.as_deref(), Some("training construct"));
        // The reaction for the absent NPC is dropped.
        assert_eq!(plan.npc_reactions.len(), 1);
        assert_eq!(plan.scene_tone, SceneTone::Tense);
        assert_eq!(plan.triggered_events[0].timing, TriggerTiming::Delayed);
    }

    #[test]
    fn unknown_enum_strings_take_documented_defaults() {
        let raw = r#"{
            "primaryAction": {"type": "DANCE_BATTLE"},
            "npcReactions": [{"npcName": "Lyra", "reaction": "hmm", "timing": "EVENTUALLY"}],
            "narrativeBeats": [{"type": "VIBES", "content": "mist", "prominence": "LOUD"}],
            "suggestedActions": [{"action": "Wait", "riskLevel": "EXTREME"}],
            "sceneTone": "SOGGY",
            "triggeredEvents": [{"description": "a find", "timing": "WHENEVER"}]
        }"#;
        let plan = parse_scene_plan(raw, &["Lyra".to_string()]);
        assert_eq!(plan.primary_action.action_type, PrimaryActionType::Exploration);
        assert_eq!(plan.npc_reactions[0].timing, ReactionTiming::After);
        assert_eq!(plan.narrative_beats[0].kind, BeatKind::WorldBuilding);
        assert_eq!(plan.narrative_beats[0].prominence, Prominence::Moderate);
        assert_eq!(plan.suggested_actions[0].risk_level, RiskLevel::Moderate);
        assert_eq!(plan.scene_tone, SceneTone::Peaceful);
        assert_eq!(plan.triggered_events[0].event_type, "DISCOVERY");
        assert_eq!(plan.triggered_events[0].timing, TriggerTiming::Immediate);
    }

    #[test]
    fn garbage_falls_back_to_minimal_plan() {
        let plan = parse_scene_plan("no json here", &[]);
        assert_eq!(plan.primary_action.action_type, PrimaryActionType::Exploration);
        assert_eq!(plan.suggested_actions.len(), 2);
        assert!(plan
            .suggested_actions
            .iter()
            .all(|a| a.risk_level == RiskLevel::Safe));
    }

    #[test]
    fn json_extraction_ignores_braces_inside_strings() {
        let raw = r#"prefix {"primaryAction": {"type": "DIALOGUE", "description": "say {hello}"}} suffix"#;
        let block = extract_json_block(raw).expect("block");
        assert!(block.ends_with("}}"));
        let plan = parse_scene_plan(raw, &[]);
        assert_eq!(plan.primary_action.action_type, PrimaryActionType::Dialogue);
    }

    #[test]
    fn special_tokens_are_scrubbed() {
        let raw = "<|channel|>final<|message|>{\"primaryAction\":{\"type\":\"MOVEMENT\"}}";
        let plan = parse_scene_plan(raw, &[]);
        assert_eq!(plan.primary_action.action_type, PrimaryActionType::Movement);
    }
}
