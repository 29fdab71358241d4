//! Character sheet and its parts: class, grade, resources, equipment,
//! inventory.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::entities::skill::{PartialSkill, Skill};
use crate::error::DomainError;
use crate::ids::{ItemId, SkillId};
use crate::value_objects::{Stat, StatBlock};

/// Coarse power tier. Advances at fixed level thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    E,
    D,
    C,
    B,
    A,
    S,
}

impl Grade {
    /// Grade for a given character level: E below 10, then one step per ten
    /// levels up to S at 50.
    pub fn for_level(level: u32) -> Grade {
        match level {
            0..=9 => Grade::E,
            10..=19 => Grade::D,
            20..=29 => Grade::C,
            30..=39 => Grade::B,
            40..=49 => Grade::A,
            _ => Grade::S,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Grade::E => "E",
            Grade::D => "D",
            Grade::C => "C",
            Grade::B => "B",
            Grade::A => "A",
            Grade::S => "S",
        }
    }
}

/// The five listed base archetypes custom classes map onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassArchetype {
    Warrior,
    Mage,
    Rogue,
    Healer,
    Ranger,
}

impl ClassArchetype {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Warrior => "Warrior",
            Self::Mage => "Mage",
            Self::Rogue => "Rogue",
            Self::Healer => "Healer",
            Self::Ranger => "Ranger",
        }
    }

    /// Stat bonuses granted when the class is chosen.
    pub fn stat_bonuses(&self) -> StatBlock {
        match self {
            Self::Warrior => StatBlock::zero()
                .with_stat(Stat::Str, 3)
                .with_stat(Stat::Con, 2),
            Self::Mage => StatBlock::zero()
                .with_stat(Stat::Int, 3)
                .with_stat(Stat::Wis, 2),
            Self::Rogue => StatBlock::zero()
                .with_stat(Stat::Dex, 3)
                .with_stat(Stat::Cha, 2),
            Self::Healer => StatBlock::zero()
                .with_stat(Stat::Wis, 3)
                .with_stat(Stat::Con, 2),
            Self::Ranger => StatBlock::zero()
                .with_stat(Stat::Dex, 3)
                .with_stat(Stat::Wis, 2),
        }
    }

    pub fn from_keyword(word: &str) -> Option<ClassArchetype> {
        match word.trim().to_ascii_lowercase().as_str() {
            "warrior" | "fighter" | "knight" => Some(Self::Warrior),
            "mage" | "wizard" | "sorcerer" => Some(Self::Mage),
            "rogue" | "thief" | "assassin" => Some(Self::Rogue),
            "healer" | "cleric" | "priest" => Some(Self::Healer),
            "ranger" | "archer" | "hunter" => Some(Self::Ranger),
            _ => None,
        }
    }

    pub fn all() -> [ClassArchetype; 5] {
        [
            Self::Warrior,
            Self::Mage,
            Self::Rogue,
            Self::Healer,
            Self::Ranger,
        ]
    }
}

/// Character class. `None` until the tutorial choice is made; custom classes
/// carry their display name plus the archetype whose bonuses they use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CharacterClass {
    None,
    Standard { archetype: ClassArchetype },
    Custom { name: String, base: ClassArchetype },
}

impl CharacterClass {
    pub fn display_name(&self) -> String {
        match self {
            Self::None => "Classless".to_string(),
            Self::Standard { archetype } => archetype.display_name().to_string(),
            Self::Custom { name, .. } => name.clone(),
        }
    }

    pub fn archetype(&self) -> Option<ClassArchetype> {
        match self {
            Self::None => None,
            Self::Standard { archetype } => Some(*archetype),
            Self::Custom { base, .. } => Some(*base),
        }
    }

    pub fn is_chosen(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// One bounded resource pool (HP, MP, Energy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePool {
    pub current: i32,
    pub max: i32,
}

impl ResourcePool {
    pub fn full(max: i32) -> Self {
        Self { current: max, max }
    }

    pub fn is_valid(&self) -> bool {
        self.current <= self.max
    }

    /// Pool with `amount` removed, floored at zero.
    pub fn drained(&self, amount: i32) -> Self {
        Self {
            current: (self.current - amount).max(0),
            max: self.max,
        }
    }

    /// Pool refilled to max.
    pub fn refilled(&self) -> Self {
        Self::full(self.max)
    }

    /// Pool with a new max; current is clamped, never raised.
    pub fn with_max(&self, max: i32) -> Self {
        Self {
            current: self.current.min(max),
            max,
        }
    }
}

/// The three resource pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    pub hp: ResourcePool,
    pub mp: ResourcePool,
    pub energy: ResourcePool,
}

impl Resources {
    /// Derive maxima from effective stats and level, starting full.
    pub fn derived(stats: &StatBlock, level: u32) -> Self {
        let level = level as i32;
        Self {
            hp: ResourcePool::full(50 + stats.get(Stat::Con) * 5 + level * 10),
            mp: ResourcePool::full(20 + stats.get(Stat::Int) * 4 + level * 5),
            energy: ResourcePool::full(30 + stats.get(Stat::Dex) * 3 + level * 5),
        }
    }

    /// Recompute maxima for new stats/level, keeping current values clamped.
    pub fn rescaled(&self, stats: &StatBlock, level: u32) -> Self {
        let fresh = Self::derived(stats, level);
        Self {
            hp: self.hp.with_max(fresh.hp.max),
            mp: self.mp.with_max(fresh.mp.max),
            energy: self.energy.with_max(fresh.energy.max),
        }
    }

    pub fn refilled(&self) -> Self {
        Self {
            hp: self.hp.refilled(),
            mp: self.mp.refilled(),
            energy: self.energy.refilled(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.hp.is_valid() && self.mp.is_valid() && self.energy.is_valid()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemRarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl ItemRarity {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Common => "Common",
            Self::Uncommon => "Uncommon",
            Self::Rare => "Rare",
            Self::Epic => "Epic",
            Self::Legendary => "Legendary",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub rarity: ItemRarity,
    /// Zero block means no bonuses.
    pub stat_bonuses: StatBlock,
    pub description: String,
}

impl Item {
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>, rarity: ItemRarity) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rarity,
            stat_bonuses: StatBlock::zero(),
            description: String::new(),
        }
    }

    pub fn with_bonus(mut self, stat: Stat, value: i32) -> Self {
        self.stat_bonuses = self.stat_bonuses.with_stat(stat, value);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Equipped gear; each slot optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub weapon: Option<Item>,
    pub armor: Option<Item>,
    pub accessory: Option<Item>,
}

impl Equipment {
    /// Sum of stat bonuses across occupied slots.
    pub fn bonuses(&self) -> StatBlock {
        [&self.weapon, &self.armor, &self.accessory]
            .into_iter()
            .flatten()
            .fold(StatBlock::zero(), |acc, item| acc.plus(&item.stat_bonuses))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub item: Item,
    pub quantity: u32,
}

/// Bounded item map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    entries: BTreeMap<ItemId, InventoryEntry>,
    capacity: u32,
}

impl Inventory {
    pub const DEFAULT_CAPACITY: u32 = 30;

    pub fn new(capacity: u32) -> Self {
        Self {
            entries: BTreeMap::new(),
            capacity,
        }
    }

    pub fn len(&self) -> u32 {
        self.entries.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &ItemId) -> Option<&InventoryEntry> {
        self.entries.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InventoryEntry> {
        self.entries.values()
    }

    /// Inventory with `quantity` of `item` added. Stacks with an existing
    /// entry; a new distinct item past capacity is rejected.
    pub fn with_item(&self, item: Item, quantity: u32) -> Result<Inventory, DomainError> {
        let mut next = self.clone();
        match next.entries.get_mut(&item.id) {
            Some(entry) => entry.quantity += quantity,
            None => {
                if next.len() >= next.capacity {
                    return Err(DomainError::container_full(next.len(), next.capacity));
                }
                next.entries
                    .insert(item.id.clone(), InventoryEntry { item, quantity });
            }
        }
        Ok(next)
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

/// The player's full character sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterSheet {
    pub level: u32,
    /// Lifetime XP total; level-ups trigger on crossing cumulative
    /// thresholds and never reset this.
    pub xp: u64,
    pub class: CharacterClass,
    pub grade: Grade,
    pub base_stats: StatBlock,
    pub resources: Resources,
    pub equipment: Equipment,
    pub inventory: Inventory,
    pub gold: u64,
    pub skills: Vec<Skill>,
    pub partial_skills: Vec<PartialSkill>,
    pub discovered_fusions: BTreeSet<String>,
    pub unspent_stat_points: u32,
    /// Set once under permadeath semantics; never cleared.
    #[serde(default)]
    pub permanently_dead: bool,
}

impl CharacterSheet {
    pub fn new(base_stats: StatBlock) -> Self {
        let base_stats = base_stats.clamped_to_base();
        Self {
            level: 1,
            xp: 0,
            class: CharacterClass::None,
            grade: Grade::E,
            base_stats,
            resources: Resources::derived(&base_stats, 1),
            equipment: Equipment::default(),
            inventory: Inventory::default(),
            gold: 0,
            skills: Vec::new(),
            partial_skills: Vec::new(),
            discovered_fusions: BTreeSet::new(),
            unspent_stat_points: 0,
            permanently_dead: false,
        }
    }

    /// Effective stats: base plus equipment bonuses.
    pub fn effective_stats(&self) -> StatBlock {
        self.base_stats.plus(&self.equipment.bonuses())
    }

    pub fn is_dead(&self) -> bool {
        self.permanently_dead || self.resources.hp.current <= 0
    }

    pub fn skill(&self, id: &SkillId) -> Option<&Skill> {
        self.skills.iter().find(|s| &s.id == id)
    }

    pub fn skill_by_name(&self, name: &str) -> Option<&Skill> {
        let needle = name.trim().to_ascii_lowercase();
        self.skills
            .iter()
            .find(|s| s.name.to_ascii_lowercase() == needle)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.base_stats.is_valid_base() {
            return Err(DomainError::validation("base stats outside [3,30]"));
        }
        if !self.resources.is_valid() {
            return Err(DomainError::validation("resource pool exceeds its max"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_thresholds() {
        assert_eq!(Grade::for_level(1), Grade::E);
        assert_eq!(Grade::for_level(10), Grade::D);
        assert_eq!(Grade::for_level(49), Grade::A);
        assert_eq!(Grade::for_level(50), Grade::S);
    }

    #[test]
    fn effective_stats_include_equipment() {
        let mut sheet = CharacterSheet::new(StatBlock::uniform(10));
        sheet.equipment.weapon =
            Some(Item::new("item_sword", "Iron Sword", ItemRarity::Common).with_bonus(Stat::Str, 2));
        assert_eq!(sheet.effective_stats().get(Stat::Str), 12);
        assert_eq!(sheet.base_stats.get(Stat::Str), 10);
    }

    #[test]
    fn inventory_stacks_and_bounds() {
        let inv = Inventory::new(1);
        let potion = Item::new("item_potion", "Potion", ItemRarity::Common);
        let inv = inv.with_item(potion.clone(), 1).expect("first add");
        let inv = inv.with_item(potion, 2).expect("stacking");
        assert_eq!(inv.get(&ItemId::new("item_potion")).map(|e| e.quantity), Some(3));

        let sword = Item::new("item_sword", "Sword", ItemRarity::Common);
        assert!(matches!(
            inv.with_item(sword, 1),
            Err(DomainError::ContainerFull { .. })
        ));
    }

    #[test]
    fn resource_rescale_never_raises_current() {
        let stats = StatBlock::uniform(10);
        let mut resources = Resources::derived(&stats, 1);
        resources.hp = resources.hp.drained(40);
        let rescaled = resources.rescaled(&stats, 2);
        assert_eq!(rescaled.hp.current, resources.hp.current);
        assert!(rescaled.hp.max > resources.hp.max);
    }
}
