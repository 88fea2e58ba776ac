//! Commands consumed by the switcher.
//!
//! Every producer (key-event listener, compositor event stream, poll timer)
//! reduces what it observes to a [`Command`] and sends it down one channel.
//! The [`MruSwitcher`](crate::switcher::MruSwitcher) is the only consumer.

use crate::chord::ChordAction;
use crate::window::ProcessId;
use serde::{Deserialize, Serialize};

/// Every action the switcher can perform.
///
/// Commands are produced by [`CommandSource`](crate::traits::CommandSource)
/// implementations and consumed by the [`MruSwitcher`](crate::switcher::MruSwitcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// An intent decoded by the chord machine.
    Chord(ChordAction),

    /// An application (or one of its windows) was activated.
    ///
    /// With `pid` set, the focused window of that process is recorded.
    /// Without it, the frontmost process is queried first.
    AppActivated { pid: Option<ProcessId> },

    /// The window with the given activation reference was closed.
    WindowClosed { address: String },

    /// A process went away; all its windows are dropped.
    ProcessTerminated(ProcessId),

    /// Re-query the focused window of the frontmost process.
    Poll,

    /// Prune stale history and cache entries.
    Sweep,
}

impl From<ChordAction> for Command {
    fn from(action: ChordAction) -> Self {
        Command::Chord(action)
    }
}
