//! Plot graph: planned story beats and the edges between them.
//!
//! Node status transitions are idempotent; a node is terminal once completed
//! or abandoned, and completion implies it was triggered.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::{LocationId, NpcId, PlotNodeId};

/// Narrative beat categories, ordered here by dramatic weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BeatType {
    Revelation,
    Confrontation,
    Betrayal,
    Transformation,
    Choice,
    Loss,
    Victory,
    Reunion,
    Escalation,
}

impl BeatType {
    /// Weight used in node priority scoring.
    pub fn priority_weight(&self) -> f64 {
        match self {
            Self::Revelation => 0.9,
            Self::Transformation => 0.85,
            Self::Confrontation => 0.8,
            Self::Choice => 0.75,
            Self::Betrayal => 0.7,
            Self::Loss => 0.65,
            Self::Victory => 0.6,
            Self::Escalation => 0.55,
            Self::Reunion => 0.5,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Revelation => "Revelation",
            Self::Confrontation => "Confrontation",
            Self::Betrayal => "Betrayal",
            Self::Transformation => "Transformation",
            Self::Choice => "Choice",
            Self::Loss => "Loss",
            Self::Victory => "Victory",
            Self::Reunion => "Reunion",
            Self::Escalation => "Escalation",
        }
    }
}

/// A planned narrative moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Beat {
    pub beat_type: BeatType,
    pub description: String,
    pub trigger_level: u32,
    #[serde(default)]
    pub involved_npcs: Vec<NpcId>,
    #[serde(default)]
    pub involved_locations: Vec<LocationId>,
    #[serde(default)]
    pub foreshadowing: Option<String>,
}

/// Unique placement of a node: story phase, order within it, branch index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct NodePosition {
    pub tier: u32,
    pub sequence: u32,
    pub branch: u32,
}

impl NodePosition {
    pub fn new(tier: u32, sequence: u32, branch: u32) -> Self {
        Self {
            tier,
            sequence,
            branch,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotNode {
    pub id: PlotNodeId,
    pub beat: Beat,
    pub position: NodePosition,
    pub triggered: bool,
    pub completed: bool,
    pub abandoned: bool,
}

impl PlotNode {
    pub fn new(id: impl Into<PlotNodeId>, beat: Beat, position: NodePosition) -> Self {
        Self {
            id: id.into(),
            beat,
            position,
            triggered: false,
            completed: false,
            abandoned: false,
        }
    }

    /// Ready to be triggered: untouched and not written off.
    pub fn is_ready(&self) -> bool {
        !self.triggered && !self.abandoned
    }

    /// Triggered but not yet resolved either way.
    pub fn is_active(&self) -> bool {
        self.triggered && !self.completed && !self.abandoned
    }

    pub fn is_terminal(&self) -> bool {
        self.completed || self.abandoned
    }

    /// Idempotent.
    pub fn mark_triggered(&self) -> PlotNode {
        PlotNode {
            triggered: true,
            ..self.clone()
        }
    }

    /// Completion implies triggered. Idempotent; rejects abandoned nodes.
    pub fn mark_completed(&self) -> Result<PlotNode, DomainError> {
        if self.abandoned {
            return Err(DomainError::invalid_state_transition(format!(
                "plot node {} is abandoned and cannot complete",
                self.id
            )));
        }
        Ok(PlotNode {
            triggered: true,
            completed: true,
            ..self.clone()
        })
    }

    /// Idempotent; rejects completed nodes.
    pub fn mark_abandoned(&self) -> Result<PlotNode, DomainError> {
        if self.completed {
            return Err(DomainError::invalid_state_transition(format!(
                "plot node {} is completed and cannot be abandoned",
                self.id
            )));
        }
        Ok(PlotNode {
            abandoned: true,
            ..self.clone()
        })
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.completed && self.abandoned {
            return Err(DomainError::validation(format!(
                "plot node {} is both completed and abandoned",
                self.id
            )));
        }
        if self.completed && !self.triggered {
            return Err(DomainError::validation(format!(
                "plot node {} completed without being triggered",
                self.id
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    /// Natural story order.
    Sequence,
    /// Alternative path split.
    Branch,
    /// Earlier beat plants a seed for the later one.
    Foreshadow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotEdge {
    pub from: PlotNodeId,
    pub to: PlotNodeId,
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotGraph {
    pub nodes: BTreeMap<PlotNodeId, PlotNode>,
    pub edges: Vec<PlotEdge>,
}

impl PlotGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &PlotNodeId) -> Option<&PlotNode> {
        self.nodes.get(id)
    }

    pub fn insert_node(&mut self, node: PlotNode) {
        self.nodes.insert(node.id.clone(), node);
    }

    /// Edges must reference existing nodes.
    pub fn insert_edge(&mut self, edge: PlotEdge) -> Result<(), DomainError> {
        if !self.nodes.contains_key(&edge.from) {
            return Err(DomainError::not_found("PlotNode", edge.from.to_string()));
        }
        if !self.nodes.contains_key(&edge.to) {
            return Err(DomainError::not_found("PlotNode", edge.to.to_string()));
        }
        self.edges.push(edge);
        Ok(())
    }

    pub fn ready_nodes(&self) -> impl Iterator<Item = &PlotNode> {
        self.nodes.values().filter(|n| n.is_ready())
    }

    pub fn active_nodes(&self) -> impl Iterator<Item = &PlotNode> {
        self.nodes.values().filter(|n| n.is_active())
    }

    /// Fraction of nodes completed; zero for an empty graph.
    pub fn completion_ratio(&self) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        let completed = self.nodes.values().filter(|n| n.completed).count();
        completed as f64 / self.nodes.len() as f64
    }

    /// Graph with every non-completed node dropped (full replan baseline).
    pub fn retain_completed(&self) -> PlotGraph {
        let nodes: BTreeMap<_, _> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.completed)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let edges = self
            .edges
            .iter()
            .filter(|e| nodes.contains_key(&e.from) && nodes.contains_key(&e.to))
            .cloned()
            .collect();
        PlotGraph { nodes, edges }
    }

    /// Graph with abandoned nodes pruned (adaptive replan baseline).
    pub fn prune_abandoned(&self) -> PlotGraph {
        let nodes: BTreeMap<_, _> = self
            .nodes
            .iter()
            .filter(|(_, n)| !n.abandoned)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let edges = self
            .edges
            .iter()
            .filter(|e| nodes.contains_key(&e.from) && nodes.contains_key(&e.to))
            .cloned()
            .collect();
        PlotGraph { nodes, edges }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        for node in self.nodes.values() {
            node.validate()?;
        }
        for edge in &self.edges {
            if !self.nodes.contains_key(&edge.from) || !self.nodes.contains_key(&edge.to) {
                return Err(DomainError::validation(format!(
                    "edge {} -> {} references a missing node",
                    edge.from, edge.to
                )));
            }
        }
        Ok(())
    }
}
