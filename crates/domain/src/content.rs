//! Static template content: the starting location web, the tutorial quest,
//! and the guide NPC for each genre preset.

use crate::entities::character::{Item, ItemRarity};
use crate::entities::location::{Biome, Location};
use crate::entities::npc::{Npc, NpcArchetype, Personality};
use crate::entities::quest::{Objective, ObjectiveType, Quest, QuestRewards, QuestType};
use crate::ids::LocationId;
use crate::value_objects::SystemType;

pub fn starting_location_id() -> LocationId {
    LocationId::new("loc_training_grounds")
}

/// The static location fixtures every game starts with.
pub fn template_locations() -> Vec<Location> {
    vec![
        Location::new("loc_training_grounds", "Training Grounds", Biome::Plains, 1)
            .with_feature("practice dummies")
            .with_feature("a weathered notice board")
            .with_connection("loc_village_square")
            .with_connection("loc_whispering_forest")
            .with_lore("Where newcomers take their first steps."),
        Location::new("loc_village_square", "Village Square", Biome::City, 1)
            .with_feature("a market fountain")
            .with_feature("merchant stalls")
            .with_connection("loc_training_grounds")
            .with_connection("loc_old_mine")
            .with_lore("The beating heart of the starter village."),
        Location::new("loc_whispering_forest", "Whispering Forest", Biome::Forest, 4)
            .with_feature("moss-hung oaks")
            .with_feature("half-buried standing stones")
            .with_connection("loc_training_grounds")
            .with_connection("loc_shattered_peak")
            .with_lore("The trees repeat what travelers say, a day late."),
        Location::new("loc_old_mine", "Old Mine", Biome::Dungeon, 6)
            .with_feature("collapsed shafts")
            .with_feature("an abandoned foreman's office")
            .with_connection("loc_village_square")
            .with_lore("Sealed after the third cave-in. The seal did not hold."),
        Location::new("loc_shattered_peak", "Shattered Peak", Biome::Mountain, 10)
            .with_feature("a split summit")
            .with_feature("wind-carved galleries")
            .with_connection("loc_whispering_forest")
            .with_lore("Something broke this mountain from the inside."),
    ]
}

pub fn template_location(id: &LocationId) -> Option<Location> {
    template_locations().into_iter().find(|l| &l.id == id)
}

/// Tutorial quest for a genre. Objectives: check the status surface, then
/// win a first fight against the training construct.
pub fn tutorial_quest(system_type: SystemType) -> Quest {
    let name = match system_type {
        SystemType::SystemIntegration => "System Integration",
        SystemType::CultivationPath => "First Breath",
        SystemType::DeathLoop => "First Loop",
        SystemType::DungeonDelve => "Surface Orientation",
        SystemType::ArcaneAcademy => "Entrance Trial",
        SystemType::TabletopClassic => "Session Zero",
        SystemType::EpicJourney => "The First Step",
        SystemType::HeroAwakening => "Awakening",
    };
    Quest::new("quest_survive_tutorial", name, QuestType::Tutorial)
        .with_giver("npc_guide")
        .with_description("Learn how your new reality works.")
        .with_objective(Objective::new(
            "tutorial_obj_status",
            ObjectiveType::UseSystem,
            "Open your status screen",
            "status",
            1,
        ))
        .with_objective(Objective::new(
            "tutorial_obj_first_combat",
            ObjectiveType::Kill,
            "Defeat the training construct",
            "training construct",
            1,
        ))
        .with_rewards(QuestRewards {
            xp: 50,
            gold: 25,
            items: vec![Item::new(
                "item_novice_band",
                "Novice's Band",
                ItemRarity::Common,
            )
            .with_description("A plain band given to those who finish orientation.")],
        })
}

/// The tutorial guide stationed at the starting location.
pub fn guide_npc(system_type: SystemType) -> Npc {
    let (name, lore) = match system_type {
        SystemType::SystemIntegration => (
            "Lyra",
            "An interface avatar the System wears when it wants to be liked.",
        ),
        SystemType::CultivationPath => ("Elder Shen", "Outer-sect elder assigned to new disciples."),
        SystemType::DeathLoop => ("The Recorder", "Remembers every loop, including yours."),
        SystemType::DungeonDelve => ("Marta", "A retired delver who minds the surface gate."),
        SystemType::ArcaneAcademy => ("Professor Vale", "Admissions examiner with kind eyes."),
        SystemType::TabletopClassic => ("Old Aldric", "Keeper of the village notice board."),
        SystemType::EpicJourney => ("Wren", "A mapmaker who has never finished a map."),
        SystemType::HeroAwakening => ("Captain Idris", "First responder to awakening events."),
    };
    Npc::new("npc_guide", name, NpcArchetype::Mentor, starting_location_id())
        .with_personality(Personality {
            traits: vec!["patient".to_string(), "observant".to_string()],
            speech_pattern: "measured, with deliberate pauses".to_string(),
            motivations: vec!["see newcomers survive their first week".to_string()],
        })
        .with_lore(lore)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_location_exists_in_templates() {
        assert!(template_location(&starting_location_id()).is_some());
    }

    #[test]
    fn template_connections_resolve() {
        for location in template_locations() {
            for connection in &location.connections {
                assert!(
                    template_location(connection).is_some(),
                    "dangling connection {connection} from {}",
                    location.id
                );
            }
        }
    }

    #[test]
    fn tutorial_quest_names_follow_genre() {
        assert_eq!(
            tutorial_quest(SystemType::SystemIntegration).name,
            "System Integration"
        );
        assert_eq!(tutorial_quest(SystemType::DeathLoop).name, "First Loop");
    }

    #[test]
    fn guide_stands_at_the_start() {
        let guide = guide_npc(SystemType::SystemIntegration);
        assert_eq!(guide.location_id, starting_location_id());
    }
}
