//! Scene results: the mechanical outcome of executing a scene plan.

use serde::{Deserialize, Serialize};

use questweaver_domain::rules::{CombatOutcome, QuestCompletion};
use questweaver_domain::{Item, LocationId};

/// A numeric stat transition, reported to the host as a `StatChange`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatDelta {
    pub name: String,
    pub old_value: i64,
    pub new_value: i64,
}

/// Everything the rules engine produced for one complex turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneResults {
    pub combat: Option<CombatOutcome>,
    pub xp_change: Option<StatDelta>,
    pub items_gained: Vec<(Item, u32)>,
    pub locations_discovered: Vec<LocationId>,
    pub quest_completions: Vec<QuestCompletion>,
    /// Player-facing system lines (level ups, skill discoveries).
    pub notifications: Vec<String>,
    /// Free-text state changes handed to the narrator.
    pub state_changes: Vec<String>,
}

impl SceneResults {
    pub fn is_empty(&self) -> bool {
        self.combat.is_none()
            && self.xp_change.is_none()
            && self.items_gained.is_empty()
            && self.locations_discovered.is_empty()
            && self.quest_completions.is_empty()
            && self.notifications.is_empty()
            && self.state_changes.is_empty()
    }

    /// Terse factual rendering used when the narrator is degraded.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        if let Some(combat) = &self.combat {
            lines.push(format!(
                "You strike {} for {} damage{}.",
                combat.target,
                combat.damage_dealt,
                if combat.critical { " (critical)" } else { "" }
            ));
            if combat.damage_taken > 0 {
                lines.push(format!("You take {} damage.", combat.damage_taken));
            }
        }
        if let Some(xp) = &self.xp_change {
            lines.push(format!("XP: {} -> {}.", xp.old_value, xp.new_value));
        }
        for (item, quantity) in &self.items_gained {
            lines.push(format!("Obtained {} x{}.", item.name, quantity));
        }
        for location in &self.locations_discovered {
            lines.push(format!("Discovered {location}."));
        }
        for completion in &self.quest_completions {
            lines.push(format!("Quest complete: {}.", completion.quest_name));
        }
        for change in &self.state_changes {
            lines.push(change.clone());
        }
        if lines.is_empty() {
            "Nothing of note happens.".to_string()
        } else {
            lines.join(" ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_reads_factually() {
        let results = SceneResults {
            xp_change: Some(StatDelta {
                name: "xp".into(),
                old_value: 10,
                new_value: 40,
            }),
            ..SceneResults::default()
        };
        assert_eq!(results.summary(), "XP: 10 -> 40.");
    }

    #[test]
    fn empty_results_still_summarize() {
        assert_eq!(SceneResults::default().summary(), "Nothing of note happens.");
    }
}
