//! Key-event listener on a Unix socket.
//!
//! Compositor key binds (or any helper that can see the keyboard) connect to
//! the socket and send newline-delimited JSON key events; each one is
//! answered with the disposition the chord machine chose.

pub mod listener;
