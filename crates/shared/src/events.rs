//! Typed game events streamed to the host UI.
//!
//! Events are the only output of a turn. They carry plain string ids at the
//! boundary so hosts need no knowledge of domain id types.
//!
//! ## Versioning Policy
//!
//! - New variants can be added at the end (forward compatible)
//! - Removing or renaming variants is a breaking change

use serde::{Deserialize, Serialize};

/// Lifecycle status reported in a quest update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestStatus {
    New,
    InProgress,
    Completed,
    Failed,
}

impl QuestStatus {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }
}

/// One event in a turn's ordered output sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// Narrative prose from the narrator
    NarratorText { text: String },
    /// A line of NPC dialogue
    NpcDialogue {
        npc_id: String,
        npc_name: String,
        text: String,
    },
    /// Blow-by-blow combat report
    CombatLog { text: String },
    /// A tracked numeric stat changed
    StatChange {
        stat_name: String,
        old_value: i64,
        new_value: i64,
    },
    /// An item entered the inventory
    ItemGained {
        item_id: String,
        item_name: String,
        quantity: u32,
    },
    /// A quest changed lifecycle status
    QuestUpdate {
        quest_id: String,
        quest_name: String,
        status: QuestStatus,
    },
    /// System-voice notification (menus, errors, respawns)
    SystemNotification { text: String },
}

impl GameEvent {
    pub fn narrator(text: impl Into<String>) -> Self {
        Self::NarratorText { text: text.into() }
    }

    pub fn notification(text: impl Into<String>) -> Self {
        Self::SystemNotification { text: text.into() }
    }

    pub fn combat_log(text: impl Into<String>) -> Self {
        Self::CombatLog { text: text.into() }
    }

    pub fn stat_change(stat_name: impl Into<String>, old_value: i64, new_value: i64) -> Self {
        Self::StatChange {
            stat_name: stat_name.into(),
            old_value,
            new_value,
        }
    }

    pub fn is_quest_update(&self) -> bool {
        matches!(self, Self::QuestUpdate { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_tag_by_type() {
        let event = GameEvent::stat_change("xp", 10, 25);
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["type"], "stat_change");
        assert_eq!(json["stat_name"], "xp");
    }

    #[test]
    fn quest_status_uses_screaming_case() {
        let json = serde_json::to_string(&QuestStatus::InProgress).expect("serialize");
        assert_eq!(json, "\"IN_PROGRESS\"");
    }
}
