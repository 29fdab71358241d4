//! Difficulty preset - scales enemy danger and XP requirements.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Nightmare,
}

impl Difficulty {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Normal => "Normal",
            Self::Hard => "Hard",
            Self::Nightmare => "Nightmare",
        }
    }

    /// Multiplier applied to XP level thresholds.
    pub fn xp_threshold_multiplier(&self) -> f64 {
        match self {
            Self::Easy => 0.75,
            Self::Normal => 1.0,
            Self::Hard => 1.5,
            Self::Nightmare => 2.0,
        }
    }

    /// Flat modifier applied to effective location danger.
    pub fn danger_modifier(&self) -> i32 {
        match self {
            Self::Easy => -1,
            Self::Normal => 0,
            Self::Hard => 2,
            Self::Nightmare => 4,
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::Normal
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for Difficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EASY" => Ok(Self::Easy),
            "NORMAL" => Ok(Self::Normal),
            "HARD" => Ok(Self::Hard),
            "NIGHTMARE" => Ok(Self::Nightmare),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_scale_with_difficulty() {
        assert!(Difficulty::Easy.xp_threshold_multiplier() < 1.0);
        assert!(Difficulty::Nightmare.xp_threshold_multiplier() > 1.0);
    }
}
