//! Hyprland backends.
//!
//! [`wm::HyprlandWindows`] answers window queries over the command socket;
//! [`events::HyprlandEventSource`] turns the event socket into focus and
//! close commands.  The rest of the crate talks to them only through
//! [`WindowQuery`](crate::traits::WindowQuery) and
//! [`CommandSource`](crate::traits::CommandSource).

pub mod events;
pub mod wm;
