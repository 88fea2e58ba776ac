//! Core traits that decouple hyprmru from any specific window manager or
//! input mechanism.
//!
//! Every concrete backend (Hyprland, a Unix-socket key listener, a test
//! harness, …) implements one of these traits.  The
//! [`MruSwitcher`](crate::switcher::MruSwitcher) only depends on these
//! abstractions.

use crate::chord::ChordInput;
use crate::command::Command;
use crate::thumbnail::Thumbnail;
use crate::window::{ProcessId, WindowHandle};
use std::sync::mpsc;

/// Abstraction over the window system: who is focused, is a window still
/// there, raise it, take a picture of it.
///
/// Implementations are called with no core lock held, so they are free to
/// block on a short IPC round trip.
pub trait WindowQuery {
    /// The error type produced by this backend.
    type Error: std::error::Error + Send + 'static;

    /// Process owning the frontmost window, or `None` when nothing is
    /// focused.
    fn frontmost_process(&self) -> Result<Option<ProcessId>, Self::Error>;

    /// The window of `pid` that currently has (or most recently had) focus.
    fn focused_window(&self, pid: ProcessId) -> Result<Option<WindowHandle>, Self::Error>;

    /// Whether `handle` still refers to a live window of a live process.
    ///
    /// Any query failure counts as "not valid".
    fn is_valid(&self, handle: &WindowHandle) -> bool;

    /// Raise and focus the window.
    fn activate(&self, handle: &WindowHandle) -> Result<(), Self::Error>;

    /// Capture a scaled preview of the window.  `None` when capture is
    /// unavailable; the caller substitutes a placeholder.
    fn capture_thumbnail(&self, handle: &WindowHandle) -> Option<Thumbnail>;

    /// Whether `pid` is still running.
    fn process_alive(&self, _pid: ProcessId) -> bool {
        true
    }
}

//  Overlay

/// Events sent from the [`MruSwitcher`](crate::switcher::MruSwitcher) to the
/// overlay over an [`mpsc`](std::sync::mpsc) channel.
///
/// The overlay owns its own rendering and visibility; the switcher only
/// tells it what to show and when the session ends.
#[derive(Debug, Clone)]
pub enum OverlayEvent {
    /// The chord was engaged.  `thumbnails[i]` belongs to `windows[i]`.
    Show {
        windows: Vec<WindowHandle>,
        thumbnails: Vec<Thumbnail>,
        selected: Option<usize>,
    },

    /// The selection moved forward to `index`.
    Advance { index: usize },

    /// The selection moved backward to `index`.
    Retreat { index: usize },

    /// The chord was released on `window`.  The overlay must hide.
    Commit { window: WindowHandle },

    /// The session was cancelled without activating anything.
    Dismiss,
}

//  Command Source

/// A source of [`Command`]s.
///
/// Implementations listen on some transport (a compositor event socket, a
/// timer, an in-memory channel) and forward commands into the provided
/// [`mpsc::Sender`].
///
/// # Contract
///
/// * [`run`](CommandSource::run) **blocks** until the source is exhausted or
///   an unrecoverable error occurs.
/// * Each produced command must be sent through `sink` exactly once.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait CommandSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start listening and forward every incoming [`Command`] into `sink`.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error>;
}

//  Input Source

/// Whether the input layer should suppress an event's default handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    Consumed,
    PassThrough,
}

impl KeyDisposition {
    pub fn from_consumed(consumed: bool) -> Self {
        if consumed {
            KeyDisposition::Consumed
        } else {
            KeyDisposition::PassThrough
        }
    }
}

/// A system-wide key event tap.
///
/// [`install`](InputSource::install) acquires the interception (this is
/// where a missing permission shows up); [`run`](InputSource::run) then
/// delivers every event to `on_key` and applies the returned
/// [`KeyDisposition`].
pub trait InputSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Acquire the interception.  Called once before `run`.
    fn install(&mut self) -> Result<(), Self::Error>;

    /// Deliver events until the source closes.  Blocks.
    fn run(
        &mut self,
        on_key: &mut dyn FnMut(ChordInput) -> KeyDisposition,
    ) -> Result<(), Self::Error>;
}
