//! **hyprmru** — a most-recently-used window switcher for Hyprland.
//!
//! Holding a modifier and tapping a secondary key (Alt+Tab) shows the
//! recently focused windows with live thumbnails.  Each further tap moves
//! the selection; releasing the modifier raises the selected window.
//!
//! # Architecture
//!
//! * [`tracker::MruTracker`]: bounded, thread-safe focus history with
//!   self-healing snapshots.
//! * [`chord`]: the pure key-chord state machine deciding which key events
//!   are swallowed.
//! * [`thumbnail::ThumbnailCache`]: bounded preview cache with
//!   oldest-half eviction.
//! * [`switcher::MruSwitcher`]: ties the above together behind
//!   [`traits::WindowQuery`] and emits [`traits::OverlayEvent`]s.
//!
//! Commands reach the switcher from [`traits::CommandSource`]s: the
//! [`hotkey::ChordSource`] over the [`ipc`] key-event listener, the
//! [`hyprland::events`] stream and the [`ticker::Ticker`].

pub mod chord;
pub mod command;
pub mod config;
pub mod cursor;
pub mod error;
pub mod hotkey;
pub mod hyprland;
pub mod ipc;
pub mod switcher;
pub mod thumbnail;
pub mod ticker;
pub mod tracker;
pub mod traits;
pub mod window;
