//! Unix-socket [`InputSource`] implementation.
//!
//! Binds a Unix stream socket and accepts one connection at a time.  Each
//! line received is parsed as a JSON-encoded [`ChordInput`] and answered
//! with a single line: `consumed` or `pass`.
//!
//! # Wire format
//!
//! ```json
//! {"SecondaryDown":{"modifier_held":true}}
//! {"SecondaryDown":{"modifier_held":true,"reverse":true}}
//! {"SecondaryUp":{"modifier_held":false}}
//! "ModifierUp"
//! "Cancel"
//! ```
//!
//! A Hyprland setup binds `ALT, Tab` to send `SecondaryDown` and uses a
//! release bind on `ALT_L` to send `ModifierUp`.

use crate::chord::ChordInput;
use crate::traits::{InputSource, KeyDisposition};
use log::{debug, error, info};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

/// An [`InputSource`] that listens on a Unix stream socket for
/// JSON-encoded key events.
pub struct KeyEventListener {
    path: PathBuf,
    listener: Option<UnixListener>,
}

/// Errors produced by the key-event listener.
#[derive(Debug, thiserror::Error)]
pub enum UnixSocketError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("listener not installed")]
    NotInstalled,
}

impl KeyEventListener {
    /// Create a new listener for `path`.
    ///
    /// The socket file is created by [`install`](InputSource::install).
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            listener: None,
        }
    }

    /// The filesystem path of the socket.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn reply_for(disposition: KeyDisposition) -> &'static str {
    match disposition {
        KeyDisposition::Consumed => "consumed",
        KeyDisposition::PassThrough => "pass",
    }
}

/// Serve one client until it disconnects.
fn serve(
    stream: UnixStream,
    on_key: &mut dyn FnMut(ChordInput) -> KeyDisposition,
) -> std::io::Result<()> {
    let mut writer = stream.try_clone()?;
    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let text = line?;
        if text.trim().is_empty() {
            continue;
        }
        let disposition = match serde_json::from_str::<ChordInput>(&text) {
            Ok(input) => {
                debug!("received {:?}", input);
                on_key(input)
            }
            Err(e) => {
                error!("bad key event: {} ({})", text, e);
                KeyDisposition::PassThrough
            }
        };
        writeln!(writer, "{}", reply_for(disposition))?;
    }
    Ok(())
}

impl InputSource for KeyEventListener {
    type Error = UnixSocketError;

    /// Bind the socket.  Fails when the directory is not writable.
    fn install(&mut self) -> Result<(), Self::Error> {
        // Remove stale socket if present.
        let _ = std::fs::remove_file(&self.path);
        let listener = UnixListener::bind(&self.path)?;
        info!("listening for key events on {}", self.path.display());
        self.listener = Some(listener);
        Ok(())
    }

    /// Accept connections and deliver their events.
    ///
    /// This method **blocks** indefinitely.  Run it on a dedicated thread.
    fn run(
        &mut self,
        on_key: &mut dyn FnMut(ChordInput) -> KeyDisposition,
    ) -> Result<(), Self::Error> {
        let listener = self.listener.as_ref().ok_or(UnixSocketError::NotInstalled)?;
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    debug!("client connected");
                    if let Err(e) = serve(stream, on_key) {
                        error!("client error: {}", e);
                    }
                    debug!("client disconnected");
                }
                Err(e) => {
                    error!("accept error: {}", e);
                }
            }
        }
        Ok(())
    }
}

impl Drop for KeyEventListener {
    fn drop(&mut self) {
        if self.listener.is_some() {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

//  Tests
