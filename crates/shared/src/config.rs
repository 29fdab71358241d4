//! Game configuration: the recognized options a host supplies at game start.

use serde::{Deserialize, Serialize};

use questweaver_domain::{Difficulty, PlayerPreferences, StatBlock, SystemType};

/// How the six base stats are assigned at character creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatAllocation {
    Balanced,
    Warrior,
    Mage,
    Rogue,
    Tank,
    Random,
    Custom,
}

impl Default for StatAllocation {
    fn default() -> Self {
        Self::Balanced
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterCreation {
    pub name: String,
    #[serde(default)]
    pub backstory: Option<String>,
    #[serde(default)]
    pub stat_allocation: StatAllocation,
    /// Used only when `stat_allocation` is `CUSTOM`.
    #[serde(default)]
    pub custom_stats: Option<StatBlock>,
}

impl CharacterCreation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            backstory: None,
            stat_allocation: StatAllocation::default(),
            custom_stats: None,
        }
    }

    pub fn with_backstory(mut self, backstory: impl Into<String>) -> Self {
        self.backstory = Some(backstory.into());
        self
    }

    pub fn with_allocation(mut self, allocation: StatAllocation) -> Self {
        self.stat_allocation = allocation;
        self
    }
}

/// Bounds on per-agent memory and persistence cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryLimits {
    #[serde(default = "default_token_limit")]
    pub token_limit: u32,
    #[serde(default = "default_keep_recent")]
    pub keep_recent_messages: usize,
    #[serde(default = "default_auto_save_interval")]
    pub auto_save_interval: u32,
    #[serde(default = "default_true")]
    pub enable_action_logging: bool,
}

fn default_token_limit() -> u32 {
    40_000
}

fn default_keep_recent() -> usize {
    20
}

fn default_auto_save_interval() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

impl Default for MemoryLimits {
    fn default() -> Self {
        Self {
            token_limit: default_token_limit(),
            keep_recent_messages: default_keep_recent(),
            auto_save_interval: default_auto_save_interval(),
            enable_action_logging: default_true(),
        }
    }
}

/// Everything a host supplies to start a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    pub system_type: SystemType,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub character_creation: CharacterCreation,
    #[serde(default)]
    pub player_preferences: PlayerPreferences,
    #[serde(default)]
    pub memory_limits: MemoryLimits,
}

impl GameConfig {
    pub fn new(system_type: SystemType, character_creation: CharacterCreation) -> Self {
        Self {
            system_type,
            difficulty: Difficulty::default(),
            character_creation,
            player_preferences: PlayerPreferences::default(),
            memory_limits: MemoryLimits::default(),
        }
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_preferences(mut self, preferences: PlayerPreferences) -> Self {
        self.player_preferences = preferences;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_limits_default_to_documented_values() {
        let limits = MemoryLimits::default();
        assert_eq!(limits.token_limit, 40_000);
        assert_eq!(limits.keep_recent_messages, 20);
        assert_eq!(limits.auto_save_interval, 3);
        assert!(limits.enable_action_logging);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let json = r#"{
            "systemType": "SYSTEM_INTEGRATION",
            "characterCreation": { "name": "Elena" }
        }"#;
        let config: GameConfig = serde_json::from_str(json).expect("deserialize");
        assert_eq!(config.difficulty, Difficulty::Normal);
        assert_eq!(config.character_creation.stat_allocation, StatAllocation::Balanced);
        assert_eq!(config.memory_limits.token_limit, 40_000);
    }
}
