//! Window identity.
//!
//! A [`WindowHandle`] wraps whatever the window manager hands out for a
//! window and exposes a single stable [`WindowId`] for equality and hashing.
//! The activation reference and the title ride along as payload; they are
//! never part of the identity contract.
//!
//! When the backend cannot supply a native identifier,
//! [`IdentityResolver`] derives one from the owning process and the title.
//! Two same-titled windows of one process would alias under a naive
//! `hash(pid, title)`, so the resolver adds a creation-order ordinal that
//! separates them.

use crate::error::SwitchError;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

/// Operating-system process id of the window's owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessId(pub i32);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid {}", self.0)
    }
}

/// Stable window identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowId {
    /// Identifier supplied by the window manager.
    Native(u64),
    /// Fallback derived from process, title and creation order.
    Derived(u64),
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowId::Native(id) => write!(f, "0x{:x}", id),
            WindowId::Derived(id) => write!(f, "derived:{:016x}", id),
        }
    }
}

/// A window as seen by the tracker.
///
/// Equality and hashing look at [`id`](WindowHandle::id) only: a retitled
/// window is still the same window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowHandle {
    pub pid: ProcessId,
    /// Window title.  Empty titles are legal.
    pub title: String,
    pub id: WindowId,
    /// Opaque reference the backend uses to raise the window (on Hyprland
    /// the client address, e.g. `"0x55d3c6a0b2f0"`).
    pub activation: String,
}

impl WindowHandle {
    pub fn new(
        pid: ProcessId,
        title: impl Into<String>,
        id: WindowId,
        activation: impl Into<String>,
    ) -> Self {
        Self {
            pid,
            title: title.into(),
            id,
            activation: activation.into(),
        }
    }
}

impl PartialEq for WindowHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for WindowHandle {}

impl Hash for WindowHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Parse a hexadecimal window address such as `"0x55d3c6a0b2f0"`.
pub fn parse_native_id(address: &str) -> Option<u64> {
    let trimmed = address.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

fn derived_id(pid: ProcessId, title: &str, ordinal: u32) -> u64 {
    let mut hasher = DefaultHasher::new();
    pid.hash(&mut hasher);
    title.hash(&mut hasher);
    ordinal.hash(&mut hasher);
    hasher.finish()
}

/// Assigns [`WindowId`]s to windows reported by a backend.
///
/// Native addresses are used as-is.  Anything else gets a derived id.  The
/// resolver remembers which activation references it has already seen for
/// each `(pid, title)` pair so that the second same-titled window of a
/// process receives ordinal `1` instead of colliding with the first.
#[derive(Debug, Default)]
pub struct IdentityResolver {
    seen: Mutex<HashMap<(ProcessId, String), Vec<String>>>,
}

impl IdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the identity of a window reported with `address`.
    pub fn resolve(&self, pid: ProcessId, title: &str, address: &str) -> WindowId {
        if let Some(native) = parse_native_id(address) {
            return WindowId::Native(native);
        }

        let ordinal = {
            let mut seen = match self.seen.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let refs = seen.entry((pid, title.to_string())).or_default();
            match refs.iter().position(|r| r == address) {
                Some(pos) => pos,
                None => {
                    refs.push(address.to_string());
                    refs.len() - 1
                }
            }
        };

        if ordinal > 0 {
            let err = SwitchError::AmbiguousIdentity {
                pid,
                title: title.to_string(),
                ordinal: ordinal as u32,
            };
            warn!("{}", err);
        }
        WindowId::Derived(derived_id(pid, title, ordinal as u32))
    }

    /// Drop remembered references for a terminated process.
    pub fn forget_process(&self, pid: ProcessId) {
        let mut seen = match self.seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        seen.retain(|(p, _), _| *p != pid);
    }
}

//  Tests
