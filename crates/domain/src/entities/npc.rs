//! NPCs: personality, per-game relationship, bounded conversation history.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::ids::{LocationId, NpcId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NpcArchetype {
    Mentor,
    Merchant,
    Guard,
    Villager,
    Rival,
    Mystic,
    Companion,
}

impl NpcArchetype {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Mentor => "Mentor",
            Self::Merchant => "Merchant",
            Self::Guard => "Guard",
            Self::Villager => "Villager",
            Self::Rival => "Rival",
            Self::Mystic => "Mystic",
            Self::Companion => "Companion",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Personality {
    pub traits: Vec<String>,
    pub speech_pattern: String,
    pub motivations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Player,
    Npc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub speaker: Speaker,
    pub text: String,
}

/// Fixed-capacity conversation ring buffer; oldest entries fall off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationLog {
    entries: VecDeque<ConversationEntry>,
    capacity: usize,
}

impl ConversationLog {
    pub const DEFAULT_CAPACITY: usize = 20;

    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, speaker: Speaker, text: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(ConversationEntry {
            speaker,
            text: text.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConversationEntry> {
        self.entries.iter()
    }
}

impl Default for ConversationLog {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Npc {
    pub id: NpcId,
    pub name: String,
    pub archetype: NpcArchetype,
    pub location_id: LocationId,
    pub personality: Personality,
    pub lore: String,
    /// Affinity toward the player in [-100, 100].
    pub relationship: i32,
    pub conversation: ConversationLog,
}

impl Npc {
    pub const RELATIONSHIP_MIN: i32 = -100;
    pub const RELATIONSHIP_MAX: i32 = 100;

    pub fn new(
        id: impl Into<NpcId>,
        name: impl Into<String>,
        archetype: NpcArchetype,
        location_id: impl Into<LocationId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            archetype,
            location_id: location_id.into(),
            personality: Personality::default(),
            lore: String::new(),
            relationship: 0,
            conversation: ConversationLog::default(),
        }
    }

    pub fn with_personality(mut self, personality: Personality) -> Self {
        self.personality = personality;
        self
    }

    pub fn with_lore(mut self, lore: impl Into<String>) -> Self {
        self.lore = lore.into();
        self
    }

    /// NPC with relationship shifted by `delta`, clamped to the legal range.
    pub fn with_relationship_delta(&self, delta: i32) -> Npc {
        Npc {
            relationship: (self.relationship + delta)
                .clamp(Self::RELATIONSHIP_MIN, Self::RELATIONSHIP_MAX),
            ..self.clone()
        }
    }
}
