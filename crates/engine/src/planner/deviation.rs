//! Player-deviation detection: when reality stops matching the plan.

use serde::{Deserialize, Serialize};

use questweaver_domain::{GameState, NpcId, PlotGraph, PlotNodeId};

/// Words in a turn that mark an involved NPC as no longer usable.
const HOSTILE_MARKERS: &[&str] = &["killed", "enemy", "hostile"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviationSeverity {
    Minor,
    Moderate,
    Major,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deviation {
    pub node_id: PlotNodeId,
    pub missing_npcs: Vec<NpcId>,
    pub hostile_npcs: Vec<NpcId>,
    pub severity: DeviationSeverity,
}

/// Check every active node against state and the most recent turn text.
pub fn detect_deviations(
    graph: &PlotGraph,
    state: &GameState,
    last_turn_text: &str,
) -> Vec<Deviation> {
    let lowered = last_turn_text.to_lowercase();
    let turn_is_hostile = HOSTILE_MARKERS.iter().any(|m| lowered.contains(m));

    let mut deviations = Vec::new();
    for node in graph.active_nodes() {
        let mut missing = Vec::new();
        let mut hostile = Vec::new();
        for npc_id in &node.beat.involved_npcs {
            match state.npcs.get(npc_id) {
                None => missing.push(npc_id.clone()),
                Some(npc) => {
                    if turn_is_hostile && lowered.contains(&npc.name.to_lowercase()) {
                        hostile.push(npc_id.clone());
                    }
                }
            }
        }
        if missing.is_empty() && hostile.is_empty() {
            continue;
        }

        let severity = if missing.len() >= 2 {
            DeviationSeverity::Major
        } else if !missing.is_empty() {
            DeviationSeverity::Moderate
        } else {
            DeviationSeverity::Minor
        };

        deviations.push(Deviation {
            node_id: node.id.clone(),
            missing_npcs: missing,
            hostile_npcs: hostile,
            severity,
        });
    }
    deviations
}

/// The worst severity across detected deviations.
pub fn worst_severity(deviations: &[Deviation]) -> Option<DeviationSeverity> {
    deviations.iter().map(|d| d.severity).max()
}
