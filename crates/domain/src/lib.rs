extern crate self as questweaver_domain;

pub mod content;
pub mod entities;
pub mod error;
pub mod ids;
pub mod rules;
pub mod value_objects;

pub use entities::{
    Beat, BeatType, Biome, CharacterClass, CharacterSheet, ClassArchetype, ConversationEntry,
    ConversationLog, EdgeKind, Equipment, GameState, Grade, Inventory, InventoryEntry, Item,
    ItemRarity, Location, NodePosition, Npc, NpcArchetype, Objective, ObjectiveType, PartialSkill,
    Personality, PlayerPreferences, PlotEdge, PlotGraph, PlotNode, Quest, QuestRewards, QuestType,
    ResourceCost, ResourcePool, Resources, Skill, SkillRarity, Speaker,
};

pub use error::DomainError;

pub use ids::{
    ActionId, AgentId, GameId, ItemId, LocationId, NpcId, ObjectiveId, PlanningSessionId,
    PlotNodeId, QuestId, SkillId,
};

pub use value_objects::{
    estimate_tokens, ActionContext, AgentAction, AgentMemory, ChatRole, DeathSemantics,
    Difficulty, MemoryMessage, Stat, StatBlock, SystemType,
};
