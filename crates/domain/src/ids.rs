use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            pub fn to_uuid(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

/// Content entities (quests, NPCs, locations, skills, plot nodes) are
/// addressed by stable slug keys rather than UUIDs, so that fixture content
/// and LLM output can reference them by literal name.
macro_rules! define_key {
    ($name:ident) => {
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(key: impl Into<String>) -> Self {
                Self(key.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

// Runtime identities
define_id!(GameId);
define_id!(ActionId);
define_id!(PlanningSessionId);

// Content identities
define_key!(QuestId);
define_key!(ObjectiveId);
define_key!(NpcId);
define_key!(LocationId);
define_key!(SkillId);
define_key!(ItemId);
define_key!(PlotNodeId);

// Agent identities ("game_master", "narrator", "planner_story", ...)
define_key!(AgentId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_round_trip() {
        let id = GameId::new();
        let uuid = id.to_uuid();
        assert_eq!(GameId::from_uuid(uuid), id);
    }

    #[test]
    fn key_ids_display_their_slug() {
        let id = QuestId::new("quest_survive_tutorial");
        assert_eq!(id.as_str(), "quest_survive_tutorial");
        assert_eq!(id.to_string(), "quest_survive_tutorial");
    }

    #[test]
    fn key_ids_serialize_transparently() {
        let id = NpcId::new("npc_guide");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"npc_guide\"");
    }
}
