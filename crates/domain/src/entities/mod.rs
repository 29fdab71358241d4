pub mod character;
pub mod game_state;
pub mod location;
pub mod npc;
pub mod plot;
pub mod quest;
pub mod skill;

pub use character::{
    CharacterClass, CharacterSheet, ClassArchetype, Equipment, Grade, Inventory, InventoryEntry,
    Item, ItemRarity, ResourcePool, Resources,
};
pub use game_state::{GameState, PlayerPreferences};
pub use location::{Biome, Location};
pub use npc::{ConversationEntry, ConversationLog, Npc, NpcArchetype, Personality, Speaker};
pub use plot::{Beat, BeatType, EdgeKind, NodePosition, PlotEdge, PlotGraph, PlotNode};
pub use quest::{Objective, ObjectiveType, Quest, QuestRewards, QuestType};
pub use skill::{PartialSkill, ResourceCost, Skill, SkillRarity};
