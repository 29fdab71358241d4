//! Scene coordination for complex turns: plan, execute, render.

use rand::rngs::StdRng;
use rand::Rng;

use questweaver_domain::rules;
use questweaver_domain::{Biome, GameState, Location, LocationId};

use crate::agents::AgentError;
use crate::agents::AgentRuntime;
use crate::scene::game_master::{GameMaster, PlanOutcome};
use crate::scene::narrator::{Narration, Narrator};
use crate::scene::plan::{PrimaryActionType, ScenePlan};
use crate::scene::results::{SceneResults, StatDelta};

/// Owns the Game Master and Narrator for one session.
pub struct SceneCoordinator {
    pub game_master: GameMaster,
    pub narrator: Narrator,
}

impl SceneCoordinator {
    pub async fn start(runtime: &AgentRuntime, state: &GameState) -> Result<Self, AgentError> {
        Ok(Self {
            game_master: GameMaster::start(runtime, state).await?,
            narrator: Narrator::start(runtime, state).await?,
        })
    }

    pub async fn plan(
        &mut self,
        input: &str,
        state: &GameState,
        recent_events: &[String],
    ) -> PlanOutcome {
        self.game_master.plan_scene(input, state, recent_events).await
    }

    pub async fn render(
        &mut self,
        plan: &ScenePlan,
        results: &SceneResults,
        state: &GameState,
        input: &str,
    ) -> Narration {
        self.narrator.render_scene(plan, results, state, input).await
    }
}

/// Execute the plan's mechanics against the rules engine. Pure except for
/// the caller-seeded RNG; returns the next state and the results record.
pub fn execute_mechanics(
    plan: &ScenePlan,
    input: &str,
    fallback_target: Option<&str>,
    state: &GameState,
    rng: &mut StdRng,
) -> (GameState, SceneResults) {
    let mut next = state.clone();
    let mut results = SceneResults::default();

    match plan.primary_action.action_type {
        PrimaryActionType::Combat => {
            let target = plan
                .primary_action
                .target
                .as_deref()
                .or(fallback_target)
                .unwrap_or("the enemy")
                .to_string();
            let xp_before = next.character_sheet.xp;
            let (sheet, outcome) = rules::resolve_combat(&target, &next, rng);
            next.character_sheet = sheet;

            results.xp_change = Some(StatDelta {
                name: "xp".to_string(),
                old_value: xp_before as i64,
                new_value: next.character_sheet.xp as i64,
            });
            for item in &outcome.loot {
                results.items_gained.push((item.clone(), 1));
            }
            if let Some(report) = &outcome.level_up {
                results.notifications.push(format!(
                    "Level up! You are now level {}.",
                    report.new_level
                ));
                if let Some(grade) = report.new_grade {
                    results.notifications.push(format!(
                        "Grade advancement! You are now grade {}.",
                        grade.display_name()
                    ));
                }
            }
            if outcome.damage_taken > 0 {
                results
                    .state_changes
                    .push(format!("You took {} damage.", outcome.damage_taken));
            }
            results.combat = Some(outcome);
        }
        PrimaryActionType::QuestAction => {
            let ready: Vec<_> = next
                .active_quests
                .values()
                .filter(|q| q.is_complete())
                .map(|q| q.id.clone())
                .collect();
            if ready.is_empty() {
                results
                    .state_changes
                    .push("No quest is ready to turn in.".to_string());
            }
            for quest_id in ready {
                match rules::complete_quest(&next, &quest_id) {
                    Ok((state_after, completion)) => {
                        next = state_after;
                        results.quest_completions.push(completion);
                    }
                    Err(e) => {
                        tracing::warn!(quest_id = %quest_id, error = %e, "Quest turn-in failed");
                        results
                            .state_changes
                            .push(format!("The quest could not be turned in: {e}"));
                    }
                }
            }
        }
        PrimaryActionType::Movement => {
            let Some(location) = next.current_location() else {
                return (next, results);
            };
            let wanted = plan
                .primary_action
                .target
                .as_deref()
                .or(fallback_target)
                .unwrap_or("")
                .to_lowercase();
            // Custom locations connect back to where they were found, so
            // both directions are searched.
            let mut reachable: Vec<LocationId> = location.connections.clone();
            reachable.extend(
                next.custom_locations
                    .values()
                    .filter(|l| l.connections.contains(&next.current_location))
                    .map(|l| l.id.clone()),
            );
            let destination = reachable.iter().find(|id| {
                let Some(connected) = next.location(id) else {
                    return false;
                };
                connected.name.to_lowercase().contains(&wanted)
                    || id.as_str().to_lowercase().contains(&wanted)
            });
            match destination {
                Some(id) => {
                    let id = id.clone();
                    let newly_discovered = next.discovered_locations.insert(id.clone());
                    if newly_discovered {
                        results.locations_discovered.push(id.clone());
                    }
                    next.current_location = id.clone();
                    if let Some(arrived) = next.location(&id) {
                        results
                            .state_changes
                            .push(format!("You arrive at {}.", arrived.name));
                    }
                }
                None => {
                    results
                        .state_changes
                        .push("No path leads that way from here.".to_string());
                }
            }
        }
        PrimaryActionType::Exploration => {
            if let Some(location) = next.current_location() {
                let undiscovered: Vec<_> = location
                    .connections
                    .iter()
                    .filter(|id| !next.discovered_locations.contains(*id))
                    .cloned()
                    .collect();
                if let Some(found) = undiscovered.first() {
                    next.discovered_locations.insert(found.clone());
                    results.locations_discovered.push(found.clone());
                    if let Some(spotted) = next.location(found) {
                        results
                            .state_changes
                            .push(format!("You find a path toward {}.", spotted.name));
                    }
                } else {
                    // Charted territory: exploration pushes past the map's
                    // edge and generates a new place. Append-only.
                    let generated = generate_custom_location(&next, rng);
                    next.discovered_locations.insert(generated.id.clone());
                    results.locations_discovered.push(generated.id.clone());
                    results
                        .state_changes
                        .push(format!("You chart a way into {}.", generated.name));
                    next.custom_locations
                        .insert(generated.id.clone(), generated);
                }
            }
        }
        PrimaryActionType::Dialogue
        | PrimaryActionType::SystemQuery
        | PrimaryActionType::Interaction
        | PrimaryActionType::Unknown => {
            // No direct mechanics; the narrator carries the scene.
        }
    }

    // Every turn feeds the insight tracker, whatever the primary action.
    let (sheet, discovered_skill) = rules::process_action_insight(input, &next.character_sheet);
    next.character_sheet = sheet;
    if let Some(skill) = discovered_skill {
        results.notifications.push(format!(
            "Skill acquired: {} ({}).",
            skill.name,
            skill.rarity.display_name()
        ));
    }

    (next, results)
}

/// Procedurally generate a new location branching off the current one.
fn generate_custom_location(state: &GameState, rng: &mut StdRng) -> Location {
    const NAMES: &[(&str, Biome)] = &[
        ("Sunken Hollow", Biome::Ruins),
        ("Thornveil Pass", Biome::Forest),
        ("Cindral Flats", Biome::Wasteland),
        ("Gloamwater Cove", Biome::Coast),
        ("The Hushed Gallery", Biome::Dungeon),
    ];
    let (name, biome) = NAMES[rng.gen_range(0..NAMES.len())];
    let base_danger = state.current_danger();
    let id = LocationId::new(format!("loc_custom_{}", state.custom_locations.len() + 1));
    Location::new(
        id,
        name,
        biome,
        base_danger.saturating_add(rng.gen_range(1..=3)),
    )
    .with_connection(state.current_location.clone())
    .with_lore("No map mentions this place.")
}
