//! Translates Hyprland's event stream into hyprmru [`Command`]s.
//!
//! Hyprland emits events on its second IPC socket (`socket2`) at
//! `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/.socket2.sock`, one
//! per line in the `EVENT>>DATA` format.  Two of them matter here:
//!
//! | Event            | Payload     | Command                               |
//! |------------------|-------------|---------------------------------------|
//! | `activewindowv2` | `<address>` | [`Command::AppActivated`] (re-query)  |
//! | `closewindow`    | `<address>` | [`Command::WindowClosed`]             |
//!
//! Addresses arrive without the `0x` prefix that `j/clients` uses, so they
//! are normalised before being forwarded.  Activation events carry no
//! process id; the switcher asks for the frontmost process itself, exactly
//! as the poll does.

use crate::command::Command;
use crate::traits::CommandSource;
use log::{debug, error, info, warn};
use std::io::{BufRead, BufReader};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::mpsc;

/// A [`CommandSource`] that listens to Hyprland's event socket.
#[derive(Debug, Default)]
pub struct HyprlandEventSource;

impl HyprlandEventSource {
    pub fn new() -> Self {
        Self
    }
}

/// Resolve the Hyprland event socket path.
fn socket2_path() -> Result<PathBuf, HyprlandEventError> {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
        .map_err(|_| HyprlandEventError("XDG_RUNTIME_DIR not set".into()))?;
    let his = std::env::var("HYPRLAND_INSTANCE_SIGNATURE")
        .map_err(|_| HyprlandEventError("HYPRLAND_INSTANCE_SIGNATURE not set".into()))?;
    Ok(PathBuf::from(format!(
        "{}/hypr/{}/.socket2.sock",
        runtime_dir, his
    )))
}

/// Parse a single event line from socket2.
///
/// Lines have the form `EVENT>>DATA\n`.
fn parse_event_line(line: &str) -> Option<(&str, &str)> {
    let sep = line.find(">>")?;
    Some((&line[..sep], &line[sep + 2..]))
}

/// Add the `0x` prefix socket2 leaves off.
fn normalise_address(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "," {
        return None;
    }
    if raw.starts_with("0x") {
        Some(raw.to_string())
    } else {
        Some(format!("0x{}", raw))
    }
}

/// Map one event to the command it produces, if any.
fn command_for(event: &str, data: &str) -> Option<Command> {
    match event {
        "activewindowv2" => {
            // An empty payload means focus moved to nothing (e.g. an empty
            // workspace); there is no window to record.
            normalise_address(data)?;
            Some(Command::AppActivated { pid: None })
        }
        "closewindow" => normalise_address(data).map(|address| Command::WindowClosed { address }),
        _ => None,
    }
}

impl CommandSource for HyprlandEventSource {
    type Error = HyprlandEventError;

    /// Connect to Hyprland's event socket and forward window events.
    ///
    /// This method **blocks** until the socket closes.  Run it on a
    /// dedicated thread.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error> {
        let path = socket2_path()?;
        let stream = UnixStream::connect(&path)
            .map_err(|e| HyprlandEventError(format!("connect to {}: {}", path.display(), e)))?;
        info!("event source connected to {}", path.display());

        for line in BufReader::new(stream).lines() {
            match line {
                Ok(line) if line.is_empty() => continue,
                Ok(line) => {
                    let Some((event, data)) = parse_event_line(&line) else {
                        continue;
                    };
                    if let Some(cmd) = command_for(event, data) {
                        debug!("{} -> {:?}", event, cmd);
                        if sink.send(cmd).is_err() {
                            info!("sink closed, shutting down");
                            return Ok(());
                        }
                    }
                }
                Err(e) => {
                    error!("socket2 read error: {}", e);
                    return Err(HyprlandEventError(format!("read error: {}", e)));
                }
            }
        }

        warn!("socket2 stream ended");
        Ok(())
    }
}

/// Error from the Hyprland event source.
#[derive(Debug, thiserror::Error)]
#[error("hyprland event error: {0}")]
pub struct HyprlandEventError(String);

//  Tests
