//! Game-start state construction and first-turn content bootstrap.

use rand::rngs::StdRng;
use rand::Rng;

use questweaver_domain::content;
use questweaver_domain::{CharacterSheet, GameState, Stat, StatBlock};
use questweaver_shared::{GameConfig, StatAllocation};

/// Map a stat-allocation preset to concrete base stats.
pub fn allocate_stats(
    allocation: StatAllocation,
    custom: Option<StatBlock>,
    rng: &mut StdRng,
) -> StatBlock {
    match allocation {
        StatAllocation::Balanced => StatBlock::uniform(10),
        StatAllocation::Warrior => StatBlock::uniform(8)
            .with_stat(Stat::Str, 14)
            .with_stat(Stat::Con, 12)
            .with_stat(Stat::Dex, 10),
        StatAllocation::Mage => StatBlock::uniform(8)
            .with_stat(Stat::Int, 14)
            .with_stat(Stat::Wis, 12)
            .with_stat(Stat::Cha, 10),
        StatAllocation::Rogue => StatBlock::uniform(8)
            .with_stat(Stat::Dex, 14)
            .with_stat(Stat::Cha, 12)
            .with_stat(Stat::Str, 10),
        StatAllocation::Tank => StatBlock::uniform(8)
            .with_stat(Stat::Con, 14)
            .with_stat(Stat::Str, 12)
            .with_stat(Stat::Wis, 10),
        StatAllocation::Random => {
            let mut block = StatBlock::uniform(10);
            for stat in Stat::all() {
                // 3d6, bounded away from hopeless and from superhuman.
                let roll: i32 = (0..3).map(|_| rng.gen_range(1..=6)).sum();
                block = block.with_stat(stat, roll.clamp(6, 16));
            }
            block
        }
        StatAllocation::Custom => custom
            .map(|b| b.clamped_to_base())
            .unwrap_or_else(|| StatBlock::uniform(10)),
    }
}

/// Build a fresh `GameState` from the host-supplied configuration.
pub fn new_game_state(config: &GameConfig, rng: &mut StdRng) -> GameState {
    let stats = allocate_stats(
        config.character_creation.stat_allocation,
        config.character_creation.custom_stats,
        rng,
    );
    let mut state = GameState::new(
        config.character_creation.name.clone(),
        config
            .character_creation
            .backstory
            .clone()
            .unwrap_or_default(),
        config.system_type,
        config.difficulty,
        CharacterSheet::new(stats),
    );
    state.player_preferences = config.player_preferences.clone();
    state
}

/// Synchronous first-turn content init: stand up the guide NPC and the
/// tutorial quest. Idempotent.
pub fn ensure_tutorial_content(state: &mut GameState) -> bool {
    let mut added = false;

    let guide = content::guide_npc(state.system_type);
    if !state.npcs.contains_key(&guide.id) {
        state.npcs.insert(guide.id.clone(), guide);
        added = true;
    }

    let quest = content::tutorial_quest(state.system_type);
    if !state.active_quests.contains_key(&quest.id) && !state.completed_quests.contains(&quest.id)
    {
        state.active_quests.insert(quest.id.clone(), quest);
        added = true;
    }

    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use questweaver_domain::{Difficulty, SystemType};
    use questweaver_shared::CharacterCreation;
    use rand::SeedableRng;

    fn config(allocation: StatAllocation) -> GameConfig {
        GameConfig::new(
            SystemType::SystemIntegration,
            CharacterCreation::new("Elena")
                .with_backstory("A quiet librarian")
                .with_allocation(allocation),
        )
        .with_difficulty(Difficulty::Normal)
    }

    #[test]
    fn presets_produce_valid_base_stats() {
        let mut rng = StdRng::seed_from_u64(1);
        for allocation in [
            StatAllocation::Balanced,
            StatAllocation::Warrior,
            StatAllocation::Mage,
            StatAllocation::Rogue,
            StatAllocation::Tank,
            StatAllocation::Random,
        ] {
            let stats = allocate_stats(allocation, None, &mut rng);
            assert!(stats.is_valid_base(), "{allocation:?} out of range");
        }
    }

    #[test]
    fn warrior_preset_favors_strength() {
        let mut rng = StdRng::seed_from_u64(1);
        let stats = allocate_stats(StatAllocation::Warrior, None, &mut rng);
        assert_eq!(stats.get(Stat::Str), 14);
        assert_eq!(stats.get(Stat::Con), 12);
        assert_eq!(stats.get(Stat::Int), 8);
    }

    #[test]
    fn random_allocation_is_seed_deterministic() {
        let a = allocate_stats(StatAllocation::Random, None, &mut StdRng::seed_from_u64(9));
        let b = allocate_stats(StatAllocation::Random, None, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn tutorial_bootstrap_is_idempotent() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = new_game_state(&config(StatAllocation::Balanced), &mut rng);
        assert!(ensure_tutorial_content(&mut state));
        let npcs = state.npcs.len();
        let quests = state.active_quests.len();
        assert!(!ensure_tutorial_content(&mut state));
        assert_eq!(state.npcs.len(), npcs);
        assert_eq!(state.active_quests.len(), quests);
    }

    #[test]
    fn completed_tutorial_does_not_reappear() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = new_game_state(&config(StatAllocation::Balanced), &mut rng);
        ensure_tutorial_content(&mut state);
        let quest_id = state.active_quests.keys().next().expect("quest").clone();
        state.active_quests.remove(&quest_id);
        state.completed_quests.insert(quest_id.clone());

        ensure_tutorial_content(&mut state);
        assert!(!state.active_quests.contains_key(&quest_id));
    }
}
