//! Combat resolution.
//!
//! One call resolves one combat action against an abstract target; enemy HP
//! is not tracked. All randomness comes from the caller's RNG.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::entities::character::{CharacterSheet, Item, ItemRarity};
use crate::entities::game_state::GameState;
use crate::entities::location::Biome;
use crate::rules::progression::{gain_xp, LevelUpReport};
use crate::value_objects::Stat;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatOutcome {
    pub target: String,
    pub damage_dealt: i32,
    pub critical: bool,
    pub damage_taken: i32,
    pub xp_gained: u64,
    pub gold_gained: u64,
    pub loot: Vec<Item>,
    pub level_up: Option<LevelUpReport>,
}

/// Damage above this value is a critical hit.
pub fn crit_threshold(dexterity: i32) -> i32 {
    (35 - dexterity).max(5)
}

/// Resolve one combat action. Returns the updated sheet (damage taken, XP
/// and loot applied) plus the outcome record.
pub fn resolve_combat(
    target: &str,
    state: &GameState,
    rng: &mut StdRng,
) -> (CharacterSheet, CombatOutcome) {
    let sheet = &state.character_sheet;
    let stats = sheet.effective_stats();
    let danger = (state.current_danger() as i32 + state.difficulty.danger_modifier()).clamp(1, 20);

    let strength = stats.get(Stat::Str);
    let dexterity = stats.get(Stat::Dex);
    let constitution = stats.get(Stat::Con);

    let raw = strength * 2 + rng.gen_range(1..=dexterity.max(1));
    let critical = raw > crit_threshold(dexterity);
    let damage_dealt = if critical { raw * 3 / 2 } else { raw };

    let damage_taken = (danger * 2 - constitution / 3).max(0);

    let xp_gained = danger as u64 * 15 + damage_dealt as u64 / 4;
    let gold_gained = rng.gen_range(danger as u64..=danger as u64 * 5);

    let mut loot = Vec::new();
    let loot_chance = 30 + danger * 2;
    if rng.gen_range(0..100) < loot_chance {
        let table = loot_table(state.current_location().map(|l| l.biome));
        if !table.is_empty() {
            loot.push(table[rng.gen_range(0..table.len())].clone());
        }
    }

    let mut next = sheet.clone();
    next.resources.hp = next.resources.hp.drained(damage_taken);
    next.gold += gold_gained;
    for item in &loot {
        // A full pack drops the find; the kill still counts.
        if let Ok(inv) = next.inventory.with_item(item.clone(), 1) {
            next.inventory = inv;
        }
    }

    let (next, report) = gain_xp(&next, xp_gained, state.difficulty);
    let outcome = CombatOutcome {
        target: target.to_string(),
        damage_dealt,
        critical,
        damage_taken,
        xp_gained,
        gold_gained,
        loot,
        level_up: report.leveled().then_some(report),
    };
    (next, outcome)
}

fn loot_table(biome: Option<Biome>) -> Vec<Item> {
    match biome {
        Some(Biome::Forest) => vec![
            Item::new("item_herb_bundle", "Herb Bundle", ItemRarity::Common),
            Item::new("item_barkhide_scrap", "Barkhide Scrap", ItemRarity::Uncommon),
        ],
        Some(Biome::Dungeon) => vec![
            Item::new("item_rusted_key", "Rusted Key", ItemRarity::Uncommon),
            Item::new("item_glow_shard", "Glow Shard", ItemRarity::Rare),
        ],
        Some(Biome::Mountain) => vec![
            Item::new("item_wind_crystal", "Wind Crystal", ItemRarity::Rare),
            Item::new("item_iron_ore", "Iron Ore", ItemRarity::Common),
        ],
        _ => vec![
            Item::new("item_monster_core", "Monster Core", ItemRarity::Common),
            Item::new("item_torn_pouch", "Torn Pouch", ItemRarity::Common),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::character::CharacterSheet;
    use crate::value_objects::{Difficulty, StatBlock, SystemType};
    use rand::SeedableRng;

    fn state() -> GameState {
        GameState::new(
            "Elena",
            "backstory",
            SystemType::SystemIntegration,
            Difficulty::Normal,
            CharacterSheet::new(StatBlock::uniform(10)),
        )
    }

    #[test]
    fn combat_is_deterministic_for_a_fixed_seed() {
        let state = state();
        let (_, a) = resolve_combat("training construct", &state, &mut StdRng::seed_from_u64(7));
        let (_, b) = resolve_combat("training construct", &state, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn xp_delta_matches_outcome() {
        let state = state();
        let before = state.character_sheet.xp;
        let (sheet, outcome) =
            resolve_combat("training construct", &state, &mut StdRng::seed_from_u64(3));
        assert_eq!(sheet.xp, before + outcome.xp_gained);
    }

    #[test]
    fn crit_follows_threshold() {
        let state = state();
        let dexterity = state.character_sheet.effective_stats().get(Stat::Dex);
        for seed in 0..32 {
            let (_, outcome) =
                resolve_combat("construct", &state, &mut StdRng::seed_from_u64(seed));
            // Crit only scales damage up, so the flag and the threshold agree
            // on both sides.
            if outcome.critical {
                assert!(outcome.damage_dealt > crit_threshold(dexterity));
            } else {
                assert!(outcome.damage_dealt <= crit_threshold(dexterity));
            }
        }
    }

    #[test]
    fn damage_taken_scales_with_danger() {
        let mut state = state();
        let calm = resolve_combat("a", &state, &mut StdRng::seed_from_u64(1)).1;
        state.current_location = crate::ids::LocationId::new("loc_shattered_peak");
        let deadly = resolve_combat("a", &state, &mut StdRng::seed_from_u64(1)).1;
        assert!(deadly.damage_taken > calm.damage_taken);
    }
}
