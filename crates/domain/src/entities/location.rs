//! Locations. Template locations are static fixtures (see `content`);
//! custom locations are generated during play and append-only.

use serde::{Deserialize, Serialize};

use crate::ids::LocationId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Biome {
    Plains,
    Forest,
    Mountain,
    Dungeon,
    City,
    Ruins,
    Coast,
    Wasteland,
}

impl Biome {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Plains => "Plains",
            Self::Forest => "Forest",
            Self::Mountain => "Mountain",
            Self::Dungeon => "Dungeon",
            Self::City => "City",
            Self::Ruins => "Ruins",
            Self::Coast => "Coast",
            Self::Wasteland => "Wasteland",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub biome: Biome,
    /// Danger rating in [1, 20].
    pub danger: u8,
    pub features: Vec<String>,
    pub connections: Vec<LocationId>,
    pub lore: String,
}

impl Location {
    pub const DANGER_MIN: u8 = 1;
    pub const DANGER_MAX: u8 = 20;

    pub fn new(
        id: impl Into<LocationId>,
        name: impl Into<String>,
        biome: Biome,
        danger: u8,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            biome,
            danger: danger.clamp(Self::DANGER_MIN, Self::DANGER_MAX),
            features: Vec::new(),
            connections: Vec::new(),
            lore: String::new(),
        }
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.features.push(feature.into());
        self
    }

    pub fn with_connection(mut self, id: impl Into<LocationId>) -> Self {
        self.connections.push(id.into());
        self
    }

    pub fn with_lore(mut self, lore: impl Into<String>) -> Self {
        self.lore = lore.into();
        self
    }
}
