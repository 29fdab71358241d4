//! Deterministic turn complexity classification.
//!
//! Pure function of the input text and state, so the same `(input, state)`
//! always routes the same way. Menu surfaces short-circuit to the simple
//! path before anything else: they never need the Game Master, even when
//! an NPC is standing next to the player.

use questweaver_domain::GameState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Complexity {
    Simple,
    Complex,
}

const COMBAT_WORDS: &[&str] = &["attack", "fight", "combat"];
const MENU_WORDS: &[&str] = &["status", "stat", "inventory"];

/// Danger at or above this makes exploration complex.
const EXPLORE_DANGER_FLOOR: u8 = 3;

pub fn classify(input: &str, state: &GameState) -> Complexity {
    let input = input.to_lowercase();
    let has = |needle: &str| input.contains(needle);

    if MENU_WORDS.iter().any(|w| has(w)) || (has("quest") && has("list")) {
        return Complexity::Simple;
    }
    if !state.npcs_here().is_empty() {
        return Complexity::Complex;
    }
    if COMBAT_WORDS.iter().any(|w| has(w)) {
        return Complexity::Complex;
    }
    if has("quest") && !has("list") {
        return Complexity::Complex;
    }
    if has("explore") && state.current_danger() >= EXPLORE_DANGER_FLOOR {
        return Complexity::Complex;
    }
    Complexity::Simple
}
