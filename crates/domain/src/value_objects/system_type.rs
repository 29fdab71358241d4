//! System type - the genre preset selected at game start.
//!
//! The system type controls death semantics, the flavor of the opening
//! narration, and the default scene tone.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Genre preset for a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemType {
    /// A game-like System overlays reality and assimilates the player
    SystemIntegration,
    /// Wuxia-style cultivation through realms of power
    CultivationPath,
    /// Death returns the player to a checkpoint, stronger each time
    DeathLoop,
    /// Delve-or-die dungeon crawling; death is final
    DungeonDelve,
    /// Magical academy with ranks, duels and exams
    ArcaneAcademy,
    /// Classic tabletop fantasy campaign
    TabletopClassic,
    /// Long-road quest across a sprawling world
    EpicJourney,
    /// An ordinary person awakens extraordinary power
    HeroAwakening,
}

/// What happens when the player character dies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathSemantics {
    /// Increment the death count, grant a permanent stat bonus, restore fully
    LoopRespawn,
    /// The character is permanently dead
    Permadeath,
    /// 10% XP penalty, then restore
    XpPenaltyRespawn,
}

impl SystemType {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SystemIntegration => "System Integration",
            Self::CultivationPath => "Cultivation Path",
            Self::DeathLoop => "Death Loop",
            Self::DungeonDelve => "Dungeon Delve",
            Self::ArcaneAcademy => "Arcane Academy",
            Self::TabletopClassic => "Tabletop Classic",
            Self::EpicJourney => "Epic Journey",
            Self::HeroAwakening => "Hero Awakening",
        }
    }

    pub fn death_semantics(&self) -> DeathSemantics {
        match self {
            Self::DeathLoop => DeathSemantics::LoopRespawn,
            Self::DungeonDelve => DeathSemantics::Permadeath,
            _ => DeathSemantics::XpPenaltyRespawn,
        }
    }

    /// One-line genre cue woven into opening and scene prompts.
    pub fn genre_cue(&self) -> &'static str {
        match self {
            Self::SystemIntegration => {
                "a game-like System has overlaid reality; status windows and quest prompts are real"
            }
            Self::CultivationPath => {
                "power is cultivated through meditation, realms and spiritual energy"
            }
            Self::DeathLoop => "death is not the end; every loop returns the player stronger",
            Self::DungeonDelve => "an ever-deeper dungeon where every floor may be the last",
            Self::ArcaneAcademy => "a prestigious academy of magic with ranks, duels and exams",
            Self::TabletopClassic => "a classic sword-and-sorcery campaign world",
            Self::EpicJourney => "a long road across a sprawling world full of wonders",
            Self::HeroAwakening => "an ordinary person awakening to extraordinary power",
        }
    }

    /// Default scene tone for the genre.
    pub fn default_tone(&self) -> &'static str {
        match self {
            Self::SystemIntegration => "mysterious",
            Self::CultivationPath => "peaceful",
            Self::DeathLoop => "foreboding",
            Self::DungeonDelve => "tense",
            Self::ArcaneAcademy => "mysterious",
            Self::TabletopClassic => "peaceful",
            Self::EpicJourney => "triumphant",
            Self::HeroAwakening => "tense",
        }
    }

    pub fn all() -> [SystemType; 8] {
        [
            Self::SystemIntegration,
            Self::CultivationPath,
            Self::DeathLoop,
            Self::DungeonDelve,
            Self::ArcaneAcademy,
            Self::TabletopClassic,
            Self::EpicJourney,
            Self::HeroAwakening,
        ]
    }
}

impl fmt::Display for SystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for SystemType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace(' ', "_").as_str() {
            "SYSTEM_INTEGRATION" => Ok(Self::SystemIntegration),
            "CULTIVATION_PATH" => Ok(Self::CultivationPath),
            "DEATH_LOOP" => Ok(Self::DeathLoop),
            "DUNGEON_DELVE" => Ok(Self::DungeonDelve),
            "ARCANE_ACADEMY" => Ok(Self::ArcaneAcademy),
            "TABLETOP_CLASSIC" => Ok(Self::TabletopClassic),
            "EPIC_JOURNEY" => Ok(Self::EpicJourney),
            "HERO_AWAKENING" => Ok(Self::HeroAwakening),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn death_semantics_branch_by_system() {
        assert_eq!(
            SystemType::DeathLoop.death_semantics(),
            DeathSemantics::LoopRespawn
        );
        assert_eq!(
            SystemType::DungeonDelve.death_semantics(),
            DeathSemantics::Permadeath
        );
        assert_eq!(
            SystemType::ArcaneAcademy.death_semantics(),
            DeathSemantics::XpPenaltyRespawn
        );
    }

    #[test]
    fn parses_screaming_snake_case() {
        assert_eq!(
            "SYSTEM_INTEGRATION".parse::<SystemType>(),
            Ok(SystemType::SystemIntegration)
        );
        assert!("COZY_FARMING".parse::<SystemType>().is_err());
    }
}
