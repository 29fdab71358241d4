//! Proposal agents: Story, Character, and World each propose plot nodes
//! with confidence ratings.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Deserialize;

use questweaver_domain::{
    Beat, BeatType, EdgeKind, GameState, LocationId, NodePosition, NpcId, PlotEdge, PlotGraph,
    PlotNode, PlotNodeId,
};

use crate::scene::plan::{extract_json_block, strip_special_tokens};

/// Which lens produced a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposerRole {
    Story,
    Character,
    World,
}

impl ProposerRole {
    pub fn agent_id(&self) -> &'static str {
        match self {
            Self::Story => "planner_story",
            Self::Character => "planner_character",
            Self::World => "planner_world",
        }
    }
}

/// One agent's proposed contribution to the plot graph.
#[derive(Debug, Clone)]
pub struct AgentProposal {
    pub role: ProposerRole,
    pub proposed_nodes: Vec<PlotNode>,
    pub proposed_edges: Vec<PlotEdge>,
    pub node_ratings: BTreeMap<PlotNodeId, f64>,
    pub reasoning: String,
}

impl AgentProposal {
    pub fn empty(role: ProposerRole) -> Self {
        Self {
            role,
            proposed_nodes: Vec::new(),
            proposed_edges: Vec::new(),
            node_ratings: BTreeMap::new(),
            reasoning: String::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProposal {
    #[serde(default)]
    proposed_nodes: Vec<RawNode>,
    #[serde(default)]
    proposed_edges: Vec<RawEdge>,
    #[serde(default)]
    node_ratings: BTreeMap<String, f64>,
    #[serde(default)]
    reasoning: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNode {
    id: String,
    #[serde(default)]
    beat_type: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    trigger_level: u32,
    #[serde(default)]
    tier: u32,
    #[serde(default)]
    sequence: u32,
    #[serde(default)]
    involved_npcs: Vec<String>,
    #[serde(default)]
    involved_locations: Vec<String>,
    #[serde(default)]
    foreshadowing: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEdge {
    from: String,
    to: String,
    #[serde(default)]
    kind: String,
}

fn parse_beat_type(raw: &str) -> BeatType {
    match raw.trim().to_ascii_uppercase().as_str() {
        "REVELATION" => BeatType::Revelation,
        "CONFRONTATION" => BeatType::Confrontation,
        "BETRAYAL" => BeatType::Betrayal,
        "TRANSFORMATION" => BeatType::Transformation,
        "CHOICE" => BeatType::Choice,
        "LOSS" => BeatType::Loss,
        "VICTORY" => BeatType::Victory,
        "REUNION" => BeatType::Reunion,
        // Escalation doubles as the fallback for unrecognized beat names.
        _ => BeatType::Escalation,
    }
}

fn parse_edge_kind(raw: &str) -> EdgeKind {
    match raw.trim().to_ascii_uppercase().as_str() {
        "BRANCH" => EdgeKind::Branch,
        "FORESHADOW" => EdgeKind::Foreshadow,
        _ => EdgeKind::Sequence,
    }
}

/// Decode one proposal reply. Any decode failure yields an empty proposal;
/// planning proceeds with whatever the other agents produced.
pub fn parse_proposal(raw: &str, role: ProposerRole) -> AgentProposal {
    let cleaned = strip_special_tokens(raw);
    let Some(block) = extract_json_block(&cleaned) else {
        tracing::warn!(role = ?role, "Proposal reply contained no JSON, treating as empty");
        return AgentProposal::empty(role);
    };
    let raw_proposal: RawProposal = match serde_json::from_str(block) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(role = ?role, error = %e, "Failed to decode proposal, treating as empty");
            return AgentProposal::empty(role);
        }
    };

    let proposed_nodes = raw_proposal
        .proposed_nodes
        .into_iter()
        .map(|n| {
            PlotNode::new(
                n.id.as_str(),
                Beat {
                    beat_type: parse_beat_type(&n.beat_type),
                    description: n.description,
                    trigger_level: n.trigger_level,
                    involved_npcs: n.involved_npcs.into_iter().map(NpcId::new).collect(),
                    involved_locations: n
                        .involved_locations
                        .into_iter()
                        .map(LocationId::new)
                        .collect(),
                    foreshadowing: n.foreshadowing,
                },
                NodePosition::new(n.tier, n.sequence, 0),
            )
        })
        .collect();

    let proposed_edges = raw_proposal
        .proposed_edges
        .into_iter()
        .map(|e| PlotEdge {
            from: PlotNodeId::new(e.from),
            to: PlotNodeId::new(e.to),
            kind: parse_edge_kind(&e.kind),
        })
        .collect();

    let node_ratings = raw_proposal
        .node_ratings
        .into_iter()
        .map(|(id, confidence)| (PlotNodeId::new(id), confidence.clamp(0.0, 1.0)))
        .collect();

    AgentProposal {
        role,
        proposed_nodes,
        proposed_edges,
        node_ratings,
        reasoning: raw_proposal.reasoning,
    }
}

/// Situation message handed to each proposal agent.
pub fn proposal_situation(state: &GameState, graph: &PlotGraph) -> String {
    let existing = if graph.nodes.is_empty() {
        "none yet".to_string()
    } else {
        graph
            .nodes
            .values()
            .map(|n| {
                format!(
                    "{} [{}] tier {} seq {} (triggered: {}, completed: {})",
                    n.id,
                    n.beat.beat_type.display_name(),
                    n.position.tier,
                    n.position.sequence,
                    n.triggered,
                    n.completed,
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        "Player level: {}. Current location: {}. Completed quests: {}.\n\
         Existing plot nodes:\n{existing}\n\n\
         Propose 2-4 new beats as JSON.",
        state.character_sheet.level,
        state.current_location,
        state.completed_quests.len(),
    )
}

// FromStr is handy for tests and log tooling.
impl FromStr for ProposerRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planner_story" => Ok(Self::Story),
            "planner_character" => Ok(Self::Character),
            "planner_world" => Ok(Self::World),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_proposal_with_ratings() {
        let raw = r#"{
            "proposedNodes": [
                {"id": "node_betrayal", "beatType": "BETRAYAL", "description": "the guide turns",
                 "triggerLevel": 8, "tier": 2, "sequence": 1, "involvedNpcs": ["npc_guide"]}
            ],
            "proposedEdges": [{"from": "node_betrayal", "to": "node_betrayal", "kind": "FORESHADOW"}],
            "nodeRatings": {"node_betrayal": 0.85},
            "reasoning": "sets up act two"
        }"#;
        let proposal = parse_proposal(raw, ProposerRole::Story);
        assert_eq!(proposal.proposed_nodes.len(), 1);
        assert_eq!(proposal.proposed_nodes[0].beat.beat_type, BeatType::Betrayal);
        assert_eq!(
            proposal.node_ratings[&PlotNodeId::new("node_betrayal")],
            0.85
        );
    }

    #[test]
    fn unknown_beat_types_become_escalation() {
        let raw = r#"{"proposedNodes": [{"id": "n1", "beatType": "PARTY", "tier": 1, "sequence": 1}]}"#;
        let proposal = parse_proposal(raw, ProposerRole::World);
        assert_eq!(
            proposal.proposed_nodes[0].beat.beat_type,
            BeatType::Escalation
        );
    }

    #[test]
    fn garbage_becomes_an_empty_proposal() {
        let proposal = parse_proposal("not json at all", ProposerRole::Character);
        assert!(proposal.proposed_nodes.is_empty());
        assert!(proposal.node_ratings.is_empty());
    }

    #[test]
    fn ratings_clamp_to_unit_interval() {
        let raw = r#"{"nodeRatings": {"n1": 1.7, "n2": -0.3}}"#;
        let proposal = parse_proposal(raw, ProposerRole::Story);
        assert_eq!(proposal.node_ratings[&PlotNodeId::new("n1")], 1.0);
        assert_eq!(proposal.node_ratings[&PlotNodeId::new("n2")], 0.0);
    }
}
