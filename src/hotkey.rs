//! Glue between an [`InputSource`] and the [`ChordMachine`].
//!
//! [`ChordSource`] runs the chord machine inside the input-delivery context:
//! each event is decided synchronously (so the tap can be told whether to
//! swallow it) and any resulting action is forwarded to the switcher as a
//! [`Command::Chord`].

use crate::chord::{ChordInput, ChordMachine};
use crate::command::Command;
use crate::error::SwitchError;
use crate::traits::{CommandSource, InputSource, KeyDisposition};
use log::{error, info};
use std::sync::mpsc;

/// A [`CommandSource`] that decodes the chord from raw key events.
///
/// If the input tap cannot be installed the machine is disabled for good
/// and [`SwitchError::PermissionDenied`] is returned once.  Nothing retries:
/// the user has to grant access and restart.
pub struct ChordSource<S: InputSource> {
    input: S,
    machine: ChordMachine,
}

impl<S: InputSource> ChordSource<S> {
    pub fn new(input: S) -> Self {
        Self {
            input,
            machine: ChordMachine::new(),
        }
    }

    pub fn machine(&self) -> &ChordMachine {
        &self.machine
    }
}

/// Decide one event and forward its action, if any.
fn dispatch(
    machine: &mut ChordMachine,
    input: ChordInput,
    sink: &mpsc::Sender<Command>,
) -> KeyDisposition {
    let outcome = machine.handle(input);
    if let Some(action) = outcome.action {
        // A closed sink means the daemon is going away; the event is still
        // answered normally.
        let _ = sink.send(Command::Chord(action));
    }
    KeyDisposition::from_consumed(outcome.consumed)
}

impl<S: InputSource> CommandSource for ChordSource<S> {
    type Error = SwitchError;

    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), SwitchError> {
        if let Err(e) = self.input.install() {
            self.machine.disable();
            let err = SwitchError::PermissionDenied(e.to_string());
            error!("{}; grant access and restart to enable the hotkey", err);
            return Err(err);
        }
        info!("input tap installed");

        let machine = &mut self.machine;
        self.input
            .run(&mut |input: ChordInput| dispatch(machine, input, &sink))
            .map_err(|e| SwitchError::Input(e.to_string()))
    }
}
