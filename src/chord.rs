//! Translates raw key/modifier events into switcher intents.
//!
//! # How a held chord becomes `Activate` / `Advance` / `Commit`
//!
//! The input layer reports three kinds of events for the bound chord
//! (e.g. `Alt` + `Tab`), each tagged with whether the modifier is held at
//! that moment:
//!
//! | Current  | Event           | Condition         | Next   | Action    | Consumed |
//! |----------|-----------------|-------------------|--------|-----------|----------|
//! | `Idle`   | `SecondaryDown` | modifier held     | Active | `Activate`| yes      |
//! | `Idle`   | `SecondaryDown` | modifier not held | Idle   | –         | no       |
//! | `Active` | `SecondaryDown` | modifier held     | Active | `Advance` | yes      |
//! | `Active` | `SecondaryDown` | modifier not held | Idle   | `Commit`  | yes      |
//! | `Active` | `SecondaryUp`   | modifier held     | Active | –         | yes      |
//! | `Active` | `SecondaryUp`   | modifier not held | Idle   | `Commit`  | yes      |
//! | `Active` | `ModifierUp`    | –                 | Idle   | `Commit`  | yes      |
//! | `Active` | `Cancel`        | –                 | Idle   | `Dismiss` | yes      |
//!
//! The two release orders ("modifier first" and "secondary first") both end
//! in exactly one `Commit`: whichever release arrives while the other is
//! already up commits, and a secondary release with the modifier still down
//! is swallowed.  Anything arriving while `Idle` that does not start a chord
//! is passed through untouched.
//!
//! A repeat press with `reverse` set (shift held) emits `Retreat` instead of
//! `Advance`.
//!
//! [`transition`] is a pure function of the current state and the event;
//! [`ChordMachine`] only stores the state between calls.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// A key event relevant to the chord, as delivered by the input layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChordInput {
    /// The secondary key (e.g. `Tab`) went down.
    SecondaryDown {
        modifier_held: bool,
        /// Shift (or another reversing key) is held as well.
        #[serde(default)]
        reverse: bool,
    },
    /// The secondary key went up.
    SecondaryUp { modifier_held: bool },
    /// The chord modifier (e.g. `Alt`) was released.
    ModifierUp,
    /// An explicit cancel key (e.g. `Escape`).
    Cancel,
}

/// Abstract intent emitted by the chord machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChordAction {
    /// The chord was engaged: show the switcher.
    Activate,
    /// Move the selection forward.
    Advance,
    /// Move the selection backward.
    Retreat,
    /// The chord was released: activate the selection.
    Commit,
    /// Close the switcher without activating anything.
    Dismiss,
}

/// Chord state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChordState {
    #[default]
    Idle,
    /// The chord is engaged.  `secondary_down` mirrors the secondary key and
    /// is kept for observability; no transition depends on it.
    Active { secondary_down: bool },
}

/// What the input layer should do with an event, plus the action it caused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordOutcome {
    pub action: Option<ChordAction>,
    /// `true` when the event belongs to the chord and default handling
    /// should be suppressed.
    pub consumed: bool,
}

impl ChordOutcome {
    fn pass() -> Self {
        Self {
            action: None,
            consumed: false,
        }
    }

    fn swallow() -> Self {
        Self {
            action: None,
            consumed: true,
        }
    }

    fn emit(action: ChordAction) -> Self {
        Self {
            action: Some(action),
            consumed: true,
        }
    }
}

/// Compute the next state and outcome for `input` in `state`.
pub fn transition(state: ChordState, input: ChordInput) -> (ChordState, ChordOutcome) {
    use ChordInput::*;
    use ChordState::*;

    match (state, input) {
        (Idle, SecondaryDown { modifier_held: true, .. }) => (
            Active {
                secondary_down: true,
            },
            ChordOutcome::emit(ChordAction::Activate),
        ),
        (Idle, _) => (Idle, ChordOutcome::pass()),

        (Active { .. }, SecondaryDown { modifier_held: true, reverse }) => {
            let action = if reverse {
                ChordAction::Retreat
            } else {
                ChordAction::Advance
            };
            (
                Active {
                    secondary_down: true,
                },
                ChordOutcome::emit(action),
            )
        }
        // The modifier release was missed; the chord is already over.
        (Active { .. }, SecondaryDown { modifier_held: false, .. }) => {
            (Idle, ChordOutcome::emit(ChordAction::Commit))
        }
        (Active { .. }, SecondaryUp { modifier_held: true }) => (
            Active {
                secondary_down: false,
            },
            ChordOutcome::swallow(),
        ),
        (Active { .. }, SecondaryUp { modifier_held: false }) | (Active { .. }, ModifierUp) => {
            (Idle, ChordOutcome::emit(ChordAction::Commit))
        }
        (Active { .. }, Cancel) => (Idle, ChordOutcome::emit(ChordAction::Dismiss)),
    }
}

/// Owns the [`ChordState`] for one binding.
///
/// Lives in the input-delivery context; it is not shared and needs no lock.
#[derive(Debug, Default)]
pub struct ChordMachine {
    state: ChordState,
    disabled: bool,
}

impl ChordMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ChordState {
        self.state
    }

    /// Permanently park the machine in `Idle`.
    ///
    /// Used when the input interception could not be installed: from then
    /// on every event passes through and nothing is emitted.
    pub fn disable(&mut self) {
        if !self.disabled {
            warn!("chord machine disabled, hotkey inactive until restart");
        }
        self.disabled = true;
        self.state = ChordState::Idle;
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Feed one event.  Every event is processed exactly once.
    pub fn handle(&mut self, input: ChordInput) -> ChordOutcome {
        if self.disabled {
            return ChordOutcome::pass();
        }
        let (next, outcome) = transition(self.state, input);
        if next != self.state || outcome.action.is_some() {
            debug!(
                "chord {:?} + {:?} -> {:?} ({:?})",
                self.state, input, next, outcome.action
            );
        }
        self.state = next;
        outcome
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn down(modifier_held: bool) -> ChordInput {
        ChordInput::SecondaryDown {
            modifier_held,
            reverse: false,
        }
    }

    fn up(modifier_held: bool) -> ChordInput {
        ChordInput::SecondaryUp { modifier_held }
    }

    /// Feed a sequence and collect the emitted actions.
    fn run(inputs: &[ChordInput]) -> (Vec<ChordAction>, ChordMachine) {
        let mut m = ChordMachine::new();
        let actions = inputs.iter().filter_map(|i| m.handle(*i).action).collect();
        (actions, m)
    }

    #[test]
    fn press_then_modifier_release_commits_once() {
        let (actions, m) = run(&[down(true), ChordInput::ModifierUp]);
        assert_eq!(actions, vec![ChordAction::Activate, ChordAction::Commit]);
        assert_eq!(m.state(), ChordState::Idle);
    }

    #[test]
    fn repeat_press_advances_and_mid_release_is_silent() {
        let (actions, _) = run(&[down(true), down(true), up(true), ChordInput::ModifierUp]);
        assert_eq!(
            actions,
            vec![
                ChordAction::Activate,
                ChordAction::Advance,
                ChordAction::Commit
            ]
        );
    }

    #[test]
    fn secondary_release_after_modifier_commits() {
        let (actions, m) = run(&[down(true), up(false)]);
        assert_eq!(actions, vec![ChordAction::Activate, ChordAction::Commit]);
        assert_eq!(m.state(), ChordState::Idle);
    }

    #[test]
    fn both_release_orders_commit_exactly_once() {
        let secondary_first = run(&[down(true), up(true), ChordInput::ModifierUp]).0;
        let modifier_first = run(&[down(true), ChordInput::ModifierUp, up(false)]).0;
        for actions in [secondary_first, modifier_first] {
            let commits = actions
                .iter()
                .filter(|a| **a == ChordAction::Commit)
                .count();
            assert_eq!(commits, 1);
        }
    }

    #[test]
    fn press_without_modifier_passes_through() {
        let mut m = ChordMachine::new();
        let out = m.handle(down(false));
        assert_eq!(out.action, None);
        assert!(!out.consumed);
        assert_eq!(m.state(), ChordState::Idle);
    }

    #[test]
    fn spurious_events_while_idle_are_ignored() {
        let mut m = ChordMachine::new();
        for input in [ChordInput::ModifierUp, up(true), up(false), ChordInput::Cancel] {
            let out = m.handle(input);
            assert_eq!(out.action, None);
            assert!(!out.consumed);
        }
        assert_eq!(m.state(), ChordState::Idle);
    }

    #[test]
    fn chord_events_are_consumed() {
        let mut m = ChordMachine::new();
        assert!(m.handle(down(true)).consumed);
        assert!(m.handle(up(true)).consumed);
        assert!(m.handle(down(true)).consumed);
        assert!(m.handle(ChordInput::ModifierUp).consumed);
    }

    #[test]
    fn secondary_flag_tracks_key() {
        let mut m = ChordMachine::new();
        m.handle(down(true));
        assert_eq!(
            m.state(),
            ChordState::Active {
                secondary_down: true
            }
        );
        m.handle(up(true));
        assert_eq!(
            m.state(),
            ChordState::Active {
                secondary_down: false
            }
        );
    }

    #[test]
    fn reverse_press_retreats() {
        let (actions, _) = run(&[
            down(true),
            ChordInput::SecondaryDown {
                modifier_held: true,
                reverse: true,
            },
            ChordInput::ModifierUp,
        ]);
        assert_eq!(
            actions,
            vec![
                ChordAction::Activate,
                ChordAction::Retreat,
                ChordAction::Commit
            ]
        );
    }

    #[test]
    fn cancel_dismisses_without_commit() {
        let (actions, m) = run(&[down(true), ChordInput::Cancel, ChordInput::ModifierUp]);
        assert_eq!(actions, vec![ChordAction::Activate, ChordAction::Dismiss]);
        assert_eq!(m.state(), ChordState::Idle);
    }

    #[test]
    fn missed_modifier_release_commits_on_next_press() {
        let (actions, m) = run(&[down(true), up(true), down(false)]);
        assert_eq!(actions, vec![ChordAction::Activate, ChordAction::Commit]);
        assert_eq!(m.state(), ChordState::Idle);
    }

    #[test]
    fn disabled_machine_passes_everything() {
        let mut m = ChordMachine::new();
        m.handle(down(true));
        m.disable();
        assert!(m.is_disabled());
        assert_eq!(m.state(), ChordState::Idle);
        let out = m.handle(down(true));
        assert_eq!(out.action, None);
        assert!(!out.consumed);
    }

    #[test]
    fn deserialize_wire_events() {
        let e: ChordInput =
            serde_json::from_str(r#"{"SecondaryDown":{"modifier_held":true}}"#).unwrap();
        assert_eq!(e, down(true));
        let e: ChordInput = serde_json::from_str(r#""ModifierUp""#).unwrap();
        assert_eq!(e, ChordInput::ModifierUp);
        let e: ChordInput =
            serde_json::from_str(r#"{"SecondaryUp":{"modifier_held":false}}"#).unwrap();
        assert_eq!(e, up(false));
    }
}
