//! Error taxonomy shared by the tracker, the thumbnail cache and the
//! switcher.
//!
//! Only [`SwitchError::PermissionDenied`] is ever surfaced to the caller as a
//! hard failure.  The other variants describe conditions the core absorbs:
//! they exist so that the places that absorb them can log a uniform message.

use crate::window::{ProcessId, WindowId};

/// Possible errors from the switcher core.
#[derive(Debug, thiserror::Error)]
pub enum SwitchError {
    /// Input interception or window queries are unavailable.  Fatal to the
    /// hotkey; reported once and not retried.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A handle no longer resolves to a live window.
    #[error("stale window reference {0}")]
    StaleReference(WindowId),

    /// A fallback identifier had to be disambiguated.
    #[error("ambiguous identity for {pid} titled {title:?}, assigned ordinal {ordinal}")]
    AmbiguousIdentity {
        pid: ProcessId,
        title: String,
        ordinal: u32,
    },

    /// Thumbnail capture produced nothing; a placeholder is shown instead.
    #[error("thumbnail capture failed for {0}")]
    CaptureFailure(WindowId),

    /// The input tap failed after it was installed.
    #[error("input error: {0}")]
    Input(String),

    /// The window-query backend returned an error.
    #[error("window query error: {0}")]
    WindowQuery(String),
}
