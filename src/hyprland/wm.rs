//! [`WindowQuery`] implementation backed by Hyprland IPC.
//!
//! Communicates directly with Hyprland through its Unix socket at
//! `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/.socket.sock`.
//! Thumbnails are the one exception: Hyprland has no capture request on its
//! IPC socket, so they are taken with `grim` on the window's geometry.

use crate::thumbnail::Thumbnail;
use crate::traits::WindowQuery;
use crate::window::{IdentityResolver, ProcessId, WindowHandle};
use log::debug;
use serde::Deserialize;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Hyprland-backed window system.
///
/// No connection is held open; every query is a short-lived IPC request.
pub struct HyprlandWindows {
    resolver: IdentityResolver,
    thumb_width: u32,
    thumb_height: u32,
}

/// Errors that can occur when talking to Hyprland.
#[derive(Debug, thiserror::Error)]
#[error("hyprland IPC error: {0}")]
pub struct HyprlandError(String);

impl Default for HyprlandWindows {
    fn default() -> Self {
        Self::new(320, 200)
    }
}

impl HyprlandWindows {
    /// Create a backend that scales thumbnails into
    /// `thumb_width × thumb_height`.
    pub fn new(thumb_width: u32, thumb_height: u32) -> Self {
        Self {
            resolver: IdentityResolver::new(),
            thumb_width,
            thumb_height,
        }
    }

    fn clients(&self) -> Result<Vec<ClientJson>, HyprlandError> {
        let json = ipc_json("clients")?;
        serde_json::from_str(&json).map_err(|e| HyprlandError(format!("parse: {}", e)))
    }

    fn client_by_address(&self, address: &str) -> Result<Option<ClientJson>, HyprlandError> {
        Ok(self
            .clients()?
            .into_iter()
            .find(|c| c.address == address && c.mapped))
    }

    fn handle_for(&self, client: &ClientJson) -> WindowHandle {
        let pid = ProcessId(client.pid);
        let id = self.resolver.resolve(pid, &client.title, &client.address);
        WindowHandle::new(pid, client.title.clone(), id, client.address.clone())
    }
}

//  Direct Hyprland IPC helpers

/// Resolve the Hyprland command socket path.
fn socket_path() -> Result<PathBuf, HyprlandError> {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
        .map_err(|_| HyprlandError("XDG_RUNTIME_DIR not set".into()))?;
    let his = std::env::var("HYPRLAND_INSTANCE_SIGNATURE")
        .map_err(|_| HyprlandError("HYPRLAND_INSTANCE_SIGNATURE not set".into()))?;
    Ok(PathBuf::from(format!(
        "{}/hypr/{}/.socket.sock",
        runtime_dir, his
    )))
}

/// Send a raw command to the Hyprland command socket and return the
/// response as a string.
fn ipc_request(command: &str) -> Result<String, HyprlandError> {
    let path = socket_path()?;
    let mut stream = UnixStream::connect(&path)
        .map_err(|e| HyprlandError(format!("connect to {}: {}", path.display(), e)))?;

    stream
        .write_all(command.as_bytes())
        .map_err(|e| HyprlandError(format!("write: {}", e)))?;

    let mut response = Vec::new();
    stream
        .read_to_end(&mut response)
        .map_err(|e| HyprlandError(format!("read: {}", e)))?;

    String::from_utf8(response).map_err(|e| HyprlandError(format!("utf-8: {}", e)))
}

/// Send a JSON data query (`j/<command>`) and return the raw JSON string.
fn ipc_json(data_command: &str) -> Result<String, HyprlandError> {
    ipc_request(&format!("j/{}", data_command))
}

/// Send a dispatch command and check for `"ok"`.
fn ipc_dispatch(args: &str) -> Result<(), HyprlandError> {
    let response = ipc_request(&format!("/dispatch {}", args))?;
    if response.trim() == "ok" {
        Ok(())
    } else {
        Err(HyprlandError(format!("dispatch error: {}", response)))
    }
}

//  Minimal serde structs for the JSON we care about

/// Subset of a client object returned by `j/clients` and `j/activewindow`.
#[derive(Debug, Clone, Deserialize)]
struct ClientJson {
    address: String,
    #[serde(default = "default_mapped")]
    mapped: bool,
    #[serde(default)]
    at: [i32; 2],
    #[serde(default)]
    size: [i32; 2],
    pid: i32,
    #[serde(default)]
    title: String,
    /// `0` for the focused window, increasing with age; `-1` if never
    /// focused.
    #[serde(rename = "focusHistoryID", default = "never_focused")]
    focus_history_id: i64,
}

fn default_mapped() -> bool {
    true
}

fn never_focused() -> i64 {
    -1
}

/// Parse the `j/activewindow` response.  Hyprland returns an empty object
/// `{}` when no window is focused.
fn parse_active_window(json: &str) -> Result<Option<ClientJson>, HyprlandError> {
    if json.trim() == "{}" {
        return Ok(None);
    }
    serde_json::from_str(json)
        .map(Some)
        .map_err(|e| HyprlandError(format!("parse: {}", e)))
}

/// The most recently focused mapped window of `pid`.
fn most_recent_of(clients: &[ClientJson], pid: i32) -> Option<&ClientJson> {
    clients
        .iter()
        .filter(|c| c.pid == pid && c.mapped && c.focus_history_id >= 0)
        .min_by_key(|c| c.focus_history_id)
}

/// `grim -g` geometry string for a client.
fn grim_geometry(client: &ClientJson) -> Option<String> {
    let [x, y] = client.at;
    let [w, h] = client.size;
    (w > 0 && h > 0).then(|| format!("{},{} {}x{}", x, y, w, h))
}

//  WindowQuery implementation

impl WindowQuery for HyprlandWindows {
    type Error = HyprlandError;

    fn frontmost_process(&self) -> Result<Option<ProcessId>, Self::Error> {
        let active = parse_active_window(&ipc_json("activewindow")?)?;
        Ok(active.map(|c| ProcessId(c.pid)))
    }

    fn focused_window(&self, pid: ProcessId) -> Result<Option<WindowHandle>, Self::Error> {
        // The active window wins when it belongs to `pid`; otherwise fall
        // back to that process's most recently focused window.
        if let Some(active) = parse_active_window(&ipc_json("activewindow")?)? {
            if active.pid == pid.0 {
                return Ok(Some(self.handle_for(&active)));
            }
        }
        let clients = self.clients()?;
        Ok(most_recent_of(&clients, pid.0).map(|c| self.handle_for(c)))
    }

    fn is_valid(&self, handle: &WindowHandle) -> bool {
        if !self.process_alive(handle.pid) {
            return false;
        }
        match self.client_by_address(&handle.activation) {
            Ok(found) => found.is_some(),
            Err(e) => {
                debug!("validity check for {} failed: {}", handle.id, e);
                false
            }
        }
    }

    fn activate(&self, handle: &WindowHandle) -> Result<(), Self::Error> {
        ipc_dispatch(&format!("focuswindow address:{}", handle.activation))
    }

    fn capture_thumbnail(&self, handle: &WindowHandle) -> Option<Thumbnail> {
        let client = match self.client_by_address(&handle.activation) {
            Ok(Some(c)) => c,
            Ok(None) => return None,
            Err(e) => {
                debug!("capture lookup for {} failed: {}", handle.id, e);
                return None;
            }
        };
        let geometry = grim_geometry(&client)?;
        let output = match Command::new("grim").args(["-g", geometry.as_str(), "-"]).output() {
            Ok(out) if out.status.success() => out,
            Ok(out) => {
                debug!("grim exited with {} for {}", out.status, handle.id);
                return None;
            }
            Err(e) => {
                debug!("failed to run grim: {}", e);
                return None;
            }
        };
        match image::load_from_memory(&output.stdout) {
            Ok(img) => Some(Thumbnail::scaled(img, self.thumb_width, self.thumb_height)),
            Err(e) => {
                debug!("failed to decode capture of {}: {}", handle.id, e);
                None
            }
        }
    }

    fn process_alive(&self, pid: ProcessId) -> bool {
        let alive = Path::new(&format!("/proc/{}", pid.0)).exists();
        if !alive {
            self.resolver.forget_process(pid);
        }
        alive
    }
}

//  Tests
