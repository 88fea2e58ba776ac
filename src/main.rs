//! Entry point for the **hyprmru** daemon.
//!
//! Spawns all [`CommandSource`](hyprmru::traits::CommandSource)s on
//! background threads and processes incoming commands on the main thread.
//! Overlay events are logged by a separate thread until a renderer is
//! attached to the channel.

use hyprmru::command::Command;
use hyprmru::config::Config;
use hyprmru::error::SwitchError;
use hyprmru::hotkey::ChordSource;
use hyprmru::hyprland::events::HyprlandEventSource;
use hyprmru::hyprland::wm::HyprlandWindows;
use hyprmru::ipc::listener::KeyEventListener;
use hyprmru::switcher::MruSwitcher;
use hyprmru::ticker::Ticker;
use hyprmru::traits::{CommandSource, OverlayEvent, WindowQuery};
use log::{error, info};
use std::sync::mpsc;

/// Default socket path for the key-event listener.
fn default_socket_path() -> String {
    let runtime = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".into());
    format!("{}/hyprmru.sock", runtime)
}

/// Resolve the config directory (`$XDG_CONFIG_HOME/hyprmru`).
fn config_dir() -> std::path::PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    std::path::PathBuf::from(base).join("hyprmru")
}

/// Try to load the config from `$XDG_CONFIG_HOME/hyprmru/config.json`,
/// falling back to compiled-in defaults.
fn load_config() -> Config {
    let path = config_dir().join("config.json");
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Config::default()
        }
    }
}

//  Main

fn main() {
    env_logger::init();

    let config = load_config();

    let wm = HyprlandWindows::new(config.thumbnails.max_width, config.thumbnails.max_height);
    if let Err(e) = wm.frontmost_process() {
        error!("{}", SwitchError::PermissionDenied(e.to_string()));
        std::process::exit(1);
    }

    let mut switcher = MruSwitcher::new(wm, &config);
    let (overlay_tx, overlay_rx) = mpsc::channel::<OverlayEvent>();
    switcher.set_overlay(overlay_tx);
    spawn_overlay_logger(overlay_rx);

    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
    spawn_command_sources(cmd_tx, &config);

    info!("hyprmru running");
    for cmd in cmd_rx {
        if let Err(e) = switcher.handle(cmd) {
            error!("command error: {}", e);
        }
    }
    info!("all command sources closed, exiting");
}

//  Helpers

fn spawn_overlay_logger(rx: mpsc::Receiver<OverlayEvent>) {
    std::thread::spawn(move || {
        for event in rx {
            match event {
                OverlayEvent::Show {
                    windows, selected, ..
                } => {
                    let titles: Vec<&str> = windows.iter().map(|w| w.title.as_str()).collect();
                    info!("overlay: show {:?}, selected {:?}", titles, selected);
                }
                OverlayEvent::Advance { index } | OverlayEvent::Retreat { index } => {
                    info!("overlay: select {}", index);
                }
                OverlayEvent::Commit { window } => {
                    info!("overlay: commit {} ({})", window.title, window.id);
                }
                OverlayEvent::Dismiss => info!("overlay: dismiss"),
            }
        }
    });
}

fn spawn_command_sources(tx: mpsc::Sender<Command>, config: &Config) {
    {
        let tx = tx.clone();
        let path = default_socket_path();
        std::thread::spawn(move || {
            // A failed install disables the chord; focus tracking goes on.
            let mut source = ChordSource::new(KeyEventListener::new(&path));
            if let Err(e) = source.run(tx) {
                error!("key listener error: {}", e);
            }
        });
    }

    {
        let tx = tx.clone();
        std::thread::spawn(move || {
            let mut source = HyprlandEventSource::new();
            if let Err(e) = source.run(tx) {
                error!("hyprland event source error: {}", e);
            }
        });
    }

    {
        let mut ticker = Ticker::new(config.poll_interval(), config.sweep_interval());
        std::thread::spawn(move || {
            let _ = ticker.run(tx);
        });
    }
}
