//! Stat value objects - the six base attributes and their block.
//!
//! Provides type safety for stat references instead of magic strings like
//! "STR" or "DEX".

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The six base character attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stat {
    /// Strength - physical power
    Str,
    /// Dexterity - agility and reflexes
    Dex,
    /// Constitution - endurance and health
    Con,
    /// Intelligence - reasoning and magical aptitude
    Int,
    /// Wisdom - perception and insight
    Wis,
    /// Charisma - force of personality
    Cha,
}

impl Stat {
    /// Returns the short uppercase string representation (e.g., "STR").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Str => "STR",
            Self::Dex => "DEX",
            Self::Con => "CON",
            Self::Int => "INT",
            Self::Wis => "WIS",
            Self::Cha => "CHA",
        }
    }

    /// Returns the full name of the stat (e.g., "Strength").
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Str => "Strength",
            Self::Dex => "Dexterity",
            Self::Con => "Constitution",
            Self::Int => "Intelligence",
            Self::Wis => "Wisdom",
            Self::Cha => "Charisma",
        }
    }

    /// All six stats in canonical order.
    pub fn all() -> [Stat; 6] {
        [
            Self::Str,
            Self::Dex,
            Self::Con,
            Self::Int,
            Self::Wis,
            Self::Cha,
        ]
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Stat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STR" | "STRENGTH" => Ok(Self::Str),
            "DEX" | "DEXTERITY" => Ok(Self::Dex),
            "CON" | "CONSTITUTION" => Ok(Self::Con),
            "INT" | "INTELLIGENCE" => Ok(Self::Int),
            "WIS" | "WISDOM" => Ok(Self::Wis),
            "CHA" | "CHARISMA" => Ok(Self::Cha),
            _ => Err(()),
        }
    }
}

/// A full block of the six attribute values.
///
/// Base stats are kept within [`StatBlock::BASE_MIN`, `StatBlock::BASE_MAX`];
/// bonus blocks (equipment, class) use the same shape with unconstrained
/// values, zero meaning "no bonus".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatBlock {
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
}

impl StatBlock {
    /// Floor for base stats.
    pub const BASE_MIN: i32 = 3;
    /// Ceiling for base stats.
    pub const BASE_MAX: i32 = 30;

    /// A block with every attribute at the same value.
    pub fn uniform(value: i32) -> Self {
        Self {
            strength: value,
            dexterity: value,
            constitution: value,
            intelligence: value,
            wisdom: value,
            charisma: value,
        }
    }

    /// The all-zero block (identity for bonuses).
    pub fn zero() -> Self {
        Self::uniform(0)
    }

    pub fn get(&self, stat: Stat) -> i32 {
        match stat {
            Stat::Str => self.strength,
            Stat::Dex => self.dexterity,
            Stat::Con => self.constitution,
            Stat::Int => self.intelligence,
            Stat::Wis => self.wisdom,
            Stat::Cha => self.charisma,
        }
    }

    pub fn with_stat(mut self, stat: Stat, value: i32) -> Self {
        match stat {
            Stat::Str => self.strength = value,
            Stat::Dex => self.dexterity = value,
            Stat::Con => self.constitution = value,
            Stat::Int => self.intelligence = value,
            Stat::Wis => self.wisdom = value,
            Stat::Cha => self.charisma = value,
        }
        self
    }

    /// Component-wise sum (base + bonus).
    pub fn plus(&self, other: &StatBlock) -> StatBlock {
        StatBlock {
            strength: self.strength + other.strength,
            dexterity: self.dexterity + other.dexterity,
            constitution: self.constitution + other.constitution,
            intelligence: self.intelligence + other.intelligence,
            wisdom: self.wisdom + other.wisdom,
            charisma: self.charisma + other.charisma,
        }
    }

    /// Add `amount` to every attribute, clamped to the base range.
    pub fn raised_by(&self, amount: i32) -> StatBlock {
        self.plus(&StatBlock::uniform(amount)).clamped_to_base()
    }

    /// Clamp every attribute to the legal base range.
    pub fn clamped_to_base(&self) -> StatBlock {
        let clamp = |v: i32| v.clamp(Self::BASE_MIN, Self::BASE_MAX);
        StatBlock {
            strength: clamp(self.strength),
            dexterity: clamp(self.dexterity),
            constitution: clamp(self.constitution),
            intelligence: clamp(self.intelligence),
            wisdom: clamp(self.wisdom),
            charisma: clamp(self.charisma),
        }
    }

    /// Whether every attribute lies within the legal base range.
    pub fn is_valid_base(&self) -> bool {
        Stat::all()
            .iter()
            .all(|s| (Self::BASE_MIN..=Self::BASE_MAX).contains(&self.get(*s)))
    }
}

impl Default for StatBlock {
    fn default() -> Self {
        Self::uniform(10)
    }
}
