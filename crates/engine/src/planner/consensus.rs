//! Consensus resolution across proposal agents.
//!
//! Pure: conflicts are detected pairwise within a tier, each conflict is
//! won by the highest average confidence, and the outcome is classified by
//! the average winning margin.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use questweaver_domain::{PlotEdge, PlotNode, PlotNodeId};

use super::proposals::AgentProposal;

/// Confidence assumed for a node no proposal rated.
const UNRATED_CONFIDENCE: f64 = 0.5;
/// Rejected nodes at or above this confidence survive as alternatives.
const ALTERNATIVE_THRESHOLD: f64 = 0.7;
/// Trigger levels closer than this conflict for the same beat type.
const TRIGGER_LEVEL_WINDOW: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsensusType {
    Unanimous,
    StrongMajority,
    Majority,
    WeakMajority,
    Split,
}

impl ConsensusType {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Unanimous => "unanimous",
            Self::StrongMajority => "strong majority",
            Self::Majority => "majority",
            Self::WeakMajority => "weak majority",
            Self::Split => "split",
        }
    }
}

/// One resolved conflict between overlapping proposed nodes.
#[derive(Debug, Clone)]
pub struct NodeConflict {
    pub winner: PlotNodeId,
    pub losers: Vec<PlotNodeId>,
    /// Winner confidence minus the mean loser confidence.
    pub margin: f64,
}

#[derive(Debug, Clone)]
pub struct ConsensusOutcome {
    pub accepted_nodes: Vec<PlotNode>,
    pub accepted_edges: Vec<PlotEdge>,
    pub rejected_nodes: Vec<PlotNode>,
    /// High-confidence losers, repositioned onto branch 1.
    pub alternatives: Vec<PlotNode>,
    pub conflicts: Vec<NodeConflict>,
    pub consensus: ConsensusType,
    /// Average confidence per node id, for downstream priority scoring.
    pub confidences: BTreeMap<PlotNodeId, f64>,
}

pub struct ConsensusEngine;

impl ConsensusEngine {
    /// Resolve all proposals into accepted/rejected/alternative nodes.
    ///
    /// Totality: every unique proposed node lands in exactly one of
    /// `accepted_nodes` or `rejected_nodes`.
    pub fn resolve_proposals(proposals: &[AgentProposal]) -> ConsensusOutcome {
        // Collect unique nodes; the first proposer's content wins on id reuse.
        let mut nodes: BTreeMap<PlotNodeId, PlotNode> = BTreeMap::new();
        for proposal in proposals {
            for node in &proposal.proposed_nodes {
                nodes.entry(node.id.clone()).or_insert_with(|| node.clone());
            }
        }

        let confidences = average_confidences(&nodes, proposals);

        // Group by tier, then find conflict components within each tier.
        let mut tiers: BTreeMap<u32, Vec<&PlotNode>> = BTreeMap::new();
        for node in nodes.values() {
            tiers.entry(node.position.tier).or_default().push(node);
        }

        let mut conflicts = Vec::new();
        let mut rejected_ids: BTreeSet<PlotNodeId> = BTreeSet::new();
        let mut alternatives = Vec::new();

        for members in tiers.values() {
            for component in conflict_components(members) {
                if component.len() < 2 {
                    continue;
                }
                let winner = component
                    .iter()
                    .max_by(|a, b| {
                        let ca = confidences.get(&a.id).copied().unwrap_or(UNRATED_CONFIDENCE);
                        let cb = confidences.get(&b.id).copied().unwrap_or(UNRATED_CONFIDENCE);
                        ca.partial_cmp(&cb)
                            .unwrap_or(std::cmp::Ordering::Equal)
                            // Deterministic tie-break on id.
                            .then_with(|| b.id.cmp(&a.id))
                    })
                    .map(|n| n.id.clone())
                    .unwrap_or_else(|| component[0].id.clone());

                let winner_confidence = confidences
                    .get(&winner)
                    .copied()
                    .unwrap_or(UNRATED_CONFIDENCE);

                let mut losers = Vec::new();
                let mut loser_confidence_sum = 0.0;
                for node in &component {
                    if node.id == winner {
                        continue;
                    }
                    let confidence = confidences
                        .get(&node.id)
                        .copied()
                        .unwrap_or(UNRATED_CONFIDENCE);
                    loser_confidence_sum += confidence;
                    rejected_ids.insert(node.id.clone());
                    if confidence >= ALTERNATIVE_THRESHOLD {
                        let mut alt = (*node).clone();
                        alt.position.branch = 1;
                        alternatives.push(alt);
                    }
                    losers.push(node.id.clone());
                }

                let margin = winner_confidence - loser_confidence_sum / losers.len() as f64;
                conflicts.push(NodeConflict {
                    winner,
                    losers,
                    margin,
                });
            }
        }

        let accepted_nodes: Vec<PlotNode> = nodes
            .values()
            .filter(|n| !rejected_ids.contains(&n.id))
            .cloned()
            .collect();
        let rejected_nodes: Vec<PlotNode> = nodes
            .values()
            .filter(|n| rejected_ids.contains(&n.id))
            .cloned()
            .collect();

        // Edges are accepted when both endpoints survived.
        let accepted_ids: BTreeSet<&PlotNodeId> = accepted_nodes.iter().map(|n| &n.id).collect();
        let mut accepted_edges = Vec::new();
        let mut seen_edges = BTreeSet::new();
        for proposal in proposals {
            for edge in &proposal.proposed_edges {
                let key = (edge.from.clone(), edge.to.clone());
                if accepted_ids.contains(&edge.from)
                    && accepted_ids.contains(&edge.to)
                    && seen_edges.insert(key)
                {
                    accepted_edges.push(edge.clone());
                }
            }
        }

        let consensus = classify(&conflicts);
        ConsensusOutcome {
            accepted_nodes,
            accepted_edges,
            rejected_nodes,
            alternatives,
            conflicts,
            consensus,
            confidences,
        }
    }
}

fn average_confidences(
    nodes: &BTreeMap<PlotNodeId, PlotNode>,
    proposals: &[AgentProposal],
) -> BTreeMap<PlotNodeId, f64> {
    let mut out = BTreeMap::new();
    for id in nodes.keys() {
        let ratings: Vec<f64> = proposals
            .iter()
            .filter_map(|p| p.node_ratings.get(id).copied())
            .collect();
        let confidence = if ratings.is_empty() {
            UNRATED_CONFIDENCE
        } else {
            ratings.iter().sum::<f64>() / ratings.len() as f64
        };
        out.insert(id.clone(), confidence);
    }
    out
}

/// Whether two same-tier nodes overlap enough to conflict.
fn in_conflict(a: &PlotNode, b: &PlotNode) -> bool {
    if a.position == b.position {
        return true;
    }
    if a.beat.beat_type == b.beat.beat_type
        && a.beat.trigger_level.abs_diff(b.beat.trigger_level) < TRIGGER_LEVEL_WINDOW
    {
        return true;
    }
    a.beat
        .involved_npcs
        .iter()
        .any(|npc| b.beat.involved_npcs.contains(npc))
}

/// Connected components under the conflict relation.
fn conflict_components<'a>(members: &[&'a PlotNode]) -> Vec<Vec<&'a PlotNode>> {
    let mut assigned = vec![usize::MAX; members.len()];
    let mut components: Vec<Vec<&PlotNode>> = Vec::new();
    for i in 0..members.len() {
        if assigned[i] != usize::MAX {
            continue;
        }
        let component_index = components.len();
        let mut stack = vec![i];
        assigned[i] = component_index;
        let mut component = Vec::new();
        while let Some(current) = stack.pop() {
            component.push(members[current]);
            for (j, other) in members.iter().enumerate() {
                if assigned[j] == usize::MAX && in_conflict(members[current], other) {
                    assigned[j] = component_index;
                    stack.push(j);
                }
            }
        }
        components.push(component);
    }
    components
}

fn classify(conflicts: &[NodeConflict]) -> ConsensusType {
    if conflicts.is_empty() {
        return ConsensusType::Unanimous;
    }
    let average_margin =
        conflicts.iter().map(|c| c.margin).sum::<f64>() / conflicts.len() as f64;
    if average_margin > 0.5 {
        ConsensusType::StrongMajority
    } else if average_margin >= 0.3 {
        ConsensusType::Majority
    } else if average_margin > 0.1 {
        ConsensusType::WeakMajority
    } else {
        ConsensusType::Split
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::proposals::ProposerRole;
    use questweaver_domain::{Beat, BeatType, NodePosition, NpcId};

    fn node(id: &str, beat_type: BeatType, level: u32, tier: u32, seq: u32) -> PlotNode {
        PlotNode::new(
            id,
            Beat {
                beat_type,
                description: format!("beat {id}"),
                trigger_level: level,
                involved_npcs: vec![],
                involved_locations: vec![],
                foreshadowing: None,
            },
            NodePosition::new(tier, seq, 0),
        )
    }

    fn proposal(role: ProposerRole, nodes: Vec<PlotNode>, ratings: &[(&str, f64)]) -> AgentProposal {
        let mut proposal = AgentProposal::empty(role);
        proposal.proposed_nodes = nodes;
        proposal.node_ratings = ratings
            .iter()
            .map(|(id, c)| (PlotNodeId::new(*id), *c))
            .collect();
        proposal
    }

    #[test]
    fn identical_positions_conflict_and_higher_confidence_wins() {
        let a = node("node_a", BeatType::Revelation, 10, 2, 5);
        let b = node("node_b", BeatType::Victory, 30, 2, 5);
        let proposals = vec![
            proposal(ProposerRole::Story, vec![a], &[("node_a", 0.9)]),
            proposal(ProposerRole::World, vec![b], &[("node_b", 0.6)]),
        ];
        let outcome = ConsensusEngine::resolve_proposals(&proposals);

        assert_eq!(outcome.accepted_nodes.len(), 1);
        assert_eq!(outcome.accepted_nodes[0].id, PlotNodeId::new("node_a"));
        assert_eq!(outcome.rejected_nodes.len(), 1);
        // 0.6 < 0.7, so no alternative branch is stored.
        assert!(outcome.alternatives.is_empty());
        // Margin is exactly 0.3: the boundary lands in MAJORITY.
        assert_eq!(outcome.consensus, ConsensusType::Majority);
    }

    #[test]
    fn close_trigger_levels_of_same_beat_type_conflict() {
        let a = node("node_a", BeatType::Betrayal, 10, 1, 1);
        let b = node("node_b", BeatType::Betrayal, 13, 1, 2);
        let proposals = vec![
            proposal(ProposerRole::Story, vec![a], &[("node_a", 0.8)]),
            proposal(ProposerRole::Character, vec![b], &[("node_b", 0.75)]),
        ];
        let outcome = ConsensusEngine::resolve_proposals(&proposals);
        assert_eq!(outcome.conflicts.len(), 1);
        // The loser is confident enough to survive as a branch-1 alternative.
        assert_eq!(outcome.alternatives.len(), 1);
        assert_eq!(outcome.alternatives[0].position.branch, 1);
    }

    #[test]
    fn shared_npcs_conflict() {
        let mut a = node("node_a", BeatType::Loss, 5, 1, 1);
        a.beat.involved_npcs = vec![NpcId::new("npc_guide")];
        let mut b = node("node_b", BeatType::Reunion, 18, 1, 4);
        b.beat.involved_npcs = vec![NpcId::new("npc_guide")];
        let proposals = vec![
            proposal(ProposerRole::Story, vec![a, b], &[("node_a", 0.9), ("node_b", 0.2)]),
        ];
        let outcome = ConsensusEngine::resolve_proposals(&proposals);
        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(outcome.consensus, ConsensusType::StrongMajority);
    }

    #[test]
    fn totality_holds() {
        let nodes = vec![
            node("node_a", BeatType::Revelation, 5, 1, 1),
            node("node_b", BeatType::Victory, 30, 1, 1),
            node("node_c", BeatType::Choice, 12, 3, 1),
        ];
        let proposals = vec![proposal(
            ProposerRole::Story,
            nodes.clone(),
            &[("node_a", 0.9), ("node_b", 0.4), ("node_c", 0.6)],
        )];
        let outcome = ConsensusEngine::resolve_proposals(&proposals);
        let mut all: Vec<PlotNodeId> = outcome
            .accepted_nodes
            .iter()
            .chain(outcome.rejected_nodes.iter())
            .map(|n| n.id.clone())
            .collect();
        all.sort();
        let mut expected: Vec<PlotNodeId> = nodes.iter().map(|n| n.id.clone()).collect();
        expected.sort();
        assert_eq!(all, expected);
    }

    #[test]
    fn no_conflicts_is_unanimous() {
        let proposals = vec![proposal(
            ProposerRole::Story,
            vec![
                node("node_a", BeatType::Revelation, 5, 1, 1),
                node("node_b", BeatType::Victory, 30, 2, 1),
            ],
            &[("node_a", 0.9), ("node_b", 0.9)],
        )];
        let outcome = ConsensusEngine::resolve_proposals(&proposals);
        assert_eq!(outcome.consensus, ConsensusType::Unanimous);
        assert!(outcome.rejected_nodes.is_empty());
    }
}
