//! Plot graph assembly and beat prioritization.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use questweaver_domain::{GameState, PlotGraph, PlotNode, PlotNodeId};

use super::consensus::ConsensusOutcome;

/// How a planning run relates to the existing graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplanMode {
    /// Discard everything not completed and rebuild.
    Full,
    /// Append new nodes to the existing graph.
    Incremental,
    /// Prune abandoned nodes, then append.
    Adaptive,
}

impl ReplanMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incremental",
            Self::Adaptive => "adaptive",
        }
    }
}

/// Fold a consensus outcome into the graph for the given mode.
///
/// Nodes whose id already exists are left untouched, which is what makes an
/// incremental re-run on unchanged state a no-op.
pub fn assemble_graph(
    existing: Option<&PlotGraph>,
    mode: ReplanMode,
    outcome: &ConsensusOutcome,
) -> PlotGraph {
    let mut graph = match (existing, mode) {
        (None, _) => PlotGraph::new(),
        (Some(existing), ReplanMode::Full) => existing.retain_completed(),
        (Some(existing), ReplanMode::Incremental) => existing.clone(),
        (Some(existing), ReplanMode::Adaptive) => existing.prune_abandoned(),
    };

    for node in outcome.accepted_nodes.iter().chain(outcome.alternatives.iter()) {
        if graph.nodes.contains_key(&node.id) {
            continue;
        }
        graph.insert_node(node.clone());
    }

    for edge in &outcome.accepted_edges {
        let duplicate = graph
            .edges
            .iter()
            .any(|e| e.from == edge.from && e.to == edge.to);
        if duplicate {
            continue;
        }
        if let Err(e) = graph.insert_edge(edge.clone()) {
            tracing::debug!(error = %e, "Skipping edge with missing endpoint");
        }
    }

    graph
}

/// Priority score for a ready node: weighted confidence, beat weight,
/// level proximity, and NPC availability.
pub fn node_priority(
    node: &PlotNode,
    confidences: &BTreeMap<PlotNodeId, f64>,
    state: &GameState,
) -> f64 {
    let confidence = confidences.get(&node.id).copied().unwrap_or(0.5);
    let beat_weight = node.beat.beat_type.priority_weight();

    let player_level = state.character_sheet.level;
    let distance = node.beat.trigger_level.abs_diff(player_level) as f64;
    let level_proximity = 1.0 - (distance / 5.0).min(1.0);

    let npc_availability = if node.beat.involved_npcs.is_empty() {
        1.0
    } else {
        let present = node
            .beat
            .involved_npcs
            .iter()
            .filter(|id| state.npcs.contains_key(*id))
            .count();
        present as f64 / node.beat.involved_npcs.len() as f64
    };

    0.4 * confidence + 0.3 * beat_weight + 0.2 * level_proximity + 0.1 * npc_availability
}

/// The ready node the story should trigger next, if any.
pub fn next_ready_beat<'a>(
    graph: &'a PlotGraph,
    confidences: &BTreeMap<PlotNodeId, f64>,
    state: &GameState,
) -> Option<&'a PlotNode> {
    graph.ready_nodes().max_by(|a, b| {
        node_priority(a, confidences, state)
            .partial_cmp(&node_priority(b, confidences, state))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.id.cmp(&a.id))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use questweaver_domain::{
        Beat, BeatType, CharacterSheet, Difficulty, NodePosition, StatBlock, SystemType,
    };

    fn node(id: &str, beat_type: BeatType, level: u32, seq: u32) -> PlotNode {
        PlotNode::new(
            id,
            Beat {
                beat_type,
                description: String::new(),
                trigger_level: level,
                involved_npcs: vec![],
                involved_locations: vec![],
                foreshadowing: None,
            },
            NodePosition::new(1, seq, 0),
        )
    }

    fn state() -> GameState {
        GameState::new(
            "Elena",
            "backstory",
            SystemType::SystemIntegration,
            Difficulty::Normal,
            CharacterSheet::new(StatBlock::uniform(10)),
        )
    }

    fn outcome_with(nodes: Vec<PlotNode>) -> ConsensusOutcome {
        ConsensusOutcome {
            accepted_nodes: nodes,
            accepted_edges: vec![],
            rejected_nodes: vec![],
            alternatives: vec![],
            conflicts: vec![],
            consensus: super::super::consensus::ConsensusType::Unanimous,
            confidences: BTreeMap::new(),
        }
    }

    #[test]
    fn incremental_rerun_adds_zero_nodes() {
        let outcome = outcome_with(vec![
            node("node_a", BeatType::Revelation, 2, 1),
            node("node_b", BeatType::Choice, 4, 2),
        ]);
        let first = assemble_graph(None, ReplanMode::Incremental, &outcome);
        assert_eq!(first.nodes.len(), 2);

        let second = assemble_graph(Some(&first), ReplanMode::Incremental, &outcome);
        assert_eq!(second.nodes.len(), first.nodes.len());
        assert_eq!(second, first);
    }

    #[test]
    fn full_replan_keeps_only_completed() {
        let mut graph = PlotGraph::new();
        graph.insert_node(
            node("node_done", BeatType::Victory, 1, 1)
                .mark_completed()
                .expect("completable"),
        );
        graph.insert_node(node("node_pending", BeatType::Loss, 3, 2));

        let outcome = outcome_with(vec![node("node_new", BeatType::Choice, 5, 3)]);
        let rebuilt = assemble_graph(Some(&graph), ReplanMode::Full, &outcome);

        assert!(rebuilt.nodes.contains_key(&PlotNodeId::new("node_done")));
        assert!(!rebuilt.nodes.contains_key(&PlotNodeId::new("node_pending")));
        assert!(rebuilt.nodes.contains_key(&PlotNodeId::new("node_new")));
    }

    #[test]
    fn priority_prefers_close_level_and_heavy_beats() {
        let state = state();
        let confidences = BTreeMap::new();
        let near_revelation = node("node_near", BeatType::Revelation, 1, 1);
        let far_reunion = node("node_far", BeatType::Reunion, 20, 2);
        assert!(
            node_priority(&near_revelation, &confidences, &state)
                > node_priority(&far_reunion, &confidences, &state)
        );
    }

    #[test]
    fn next_ready_beat_skips_triggered_nodes() {
        let mut graph = PlotGraph::new();
        graph.insert_node(node("node_a", BeatType::Revelation, 1, 1).mark_triggered());
        graph.insert_node(node("node_b", BeatType::Reunion, 1, 2));
        let state = state();
        let next = next_ready_beat(&graph, &BTreeMap::new(), &state).expect("one ready");
        assert_eq!(next.id, PlotNodeId::new("node_b"));
    }
}
