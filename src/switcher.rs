//! The orchestrator that ties the tracker, the thumbnail cache, the
//! selection cursor and the window-query backend together.
//!
//! [`MruSwitcher`] reacts to [`Command`]s.  Focus signals and polls go into
//! the [`MruTracker`]; chord actions drive an overlay session:
//!
//! * `Activate`: snapshot the history, refresh the thumbnails of the
//!   windows about to be shown, reset the cursor, emit
//!   [`OverlayEvent::Show`].
//! * `Advance` / `Retreat`: move the cursor.
//! * `Commit`: raise the selected window and end the session.
//! * `Dismiss`: end the session without raising anything.

use crate::chord::ChordAction;
use crate::command::Command;
use crate::config::Config;
use crate::cursor::SelectionCursor;
use crate::error::SwitchError;
use crate::thumbnail::{Thumbnail, ThumbnailCache};
use crate::tracker::MruTracker;
use crate::traits::{OverlayEvent, WindowQuery};
use crate::window::{ProcessId, WindowHandle, WindowId};
use log::{debug, info, warn};
use std::sync::mpsc;
use std::sync::Arc;

/// Orchestrates history, thumbnails and the overlay session.
///
/// The switcher is generic over any [`WindowQuery`] implementation, making
/// it independent of Hyprland or any other concrete backend.
///
/// # Typical usage
///
/// ```ignore
/// let mut switcher = MruSwitcher::new(HyprlandWindows::default(), &Config::default());
/// switcher.handle(Command::Poll)?;
/// switcher.handle(Command::Chord(ChordAction::Activate))?;
/// ```
pub struct MruSwitcher<W: WindowQuery> {
    wm: W,
    tracker: Arc<MruTracker>,
    thumbnails: Arc<ThumbnailCache>,
    cursor: SelectionCursor,
    /// Windows shown by the current overlay session, if one is open.
    session: Option<Vec<WindowHandle>>,
    overlay_tx: Option<mpsc::Sender<OverlayEvent>>,
    config: Config,
}

impl<W: WindowQuery> MruSwitcher<W> {
    /// Create a switcher with a fresh history and cache sized from `config`.
    pub fn new(wm: W, config: &Config) -> Self {
        Self::with_state(
            wm,
            Arc::new(MruTracker::new(config.history_capacity)),
            Arc::new(ThumbnailCache::new(config.thumbnails.capacity)),
            config,
        )
    }

    /// Create a switcher around an existing history and cache.
    pub fn with_state(
        wm: W,
        tracker: Arc<MruTracker>,
        thumbnails: Arc<ThumbnailCache>,
        config: &Config,
    ) -> Self {
        Self {
            wm,
            tracker,
            thumbnails,
            cursor: SelectionCursor::new(),
            session: None,
            overlay_tx: None,
            config: config.clone(),
        }
    }

    /// Attach an overlay event channel.
    ///
    /// The receiver end can be owned by any independent listener, such as
    /// an on-screen overlay or a debug logger.
    pub fn set_overlay(&mut self, tx: mpsc::Sender<OverlayEvent>) {
        self.overlay_tx = Some(tx);
    }

    pub fn tracker(&self) -> &Arc<MruTracker> {
        &self.tracker
    }

    pub fn thumbnails(&self) -> &Arc<ThumbnailCache> {
        &self.thumbnails
    }

    pub fn cursor(&self) -> &SelectionCursor {
        &self.cursor
    }

    /// Windows of the open overlay session.
    pub fn session(&self) -> Option<&[WindowHandle]> {
        self.session.as_deref()
    }

    /// The currently highlighted window, if a session is open.
    pub fn selected(&self) -> Option<&WindowHandle> {
        let windows = self.session.as_ref()?;
        windows.get(self.cursor.current()?)
    }

    /// Process a single [`Command`].
    ///
    /// Expected transient failures (closed windows, dead processes, failed
    /// captures) are absorbed; only window-query errors on an explicit
    /// activation signal are returned.
    pub fn handle(&mut self, cmd: Command) -> Result<(), SwitchError> {
        match cmd {
            Command::Chord(action) => self.handle_chord(action),

            Command::AppActivated { pid } => {
                debug!("app activated ({:?})", pid);
                self.record_focused(pid)?;
            }

            Command::Poll => {
                if let Err(e) = self.record_focused(None) {
                    debug!("poll: {}", e);
                }
            }

            Command::WindowClosed { address } => {
                if let Some(handle) = self.tracker.find_by_activation(&address) {
                    debug!("window {} closed", handle.id);
                    self.tracker.remove_window(handle.id);
                    self.thumbnails.invalidate(handle.id);
                }
            }

            Command::ProcessTerminated(pid) => self.forget_process(pid),

            Command::Sweep => self.sweep(),
        }
        Ok(())
    }

    //  Tracking

    /// Record the focused window of `pid` (or of the frontmost process).
    fn record_focused(&mut self, pid: Option<ProcessId>) -> Result<(), SwitchError> {
        let pid = match pid {
            Some(pid) => pid,
            None => match self
                .wm
                .frontmost_process()
                .map_err(|e| SwitchError::WindowQuery(e.to_string()))?
            {
                Some(pid) => pid,
                None => return Ok(()),
            },
        };
        let focused = self
            .wm
            .focused_window(pid)
            .map_err(|e| SwitchError::WindowQuery(e.to_string()))?;
        if let Some(handle) = focused {
            self.tracker.record_focus(handle);
        }
        Ok(())
    }

    fn forget_process(&mut self, pid: ProcessId) {
        let removed = self.tracker.remove_all_for_process(pid);
        self.thumbnails.invalidate_all(removed.iter().map(|h| &h.id));
    }

    /// Drop dead processes, stale windows and orphaned thumbnails.
    fn sweep(&mut self) {
        for pid in self.tracker.processes() {
            if !self.wm.process_alive(pid) {
                self.forget_process(pid);
            }
        }
        let wm = &self.wm;
        let pruned = self.tracker.sweep(|h| wm.is_valid(h));
        if pruned > 0 {
            debug!("sweep pruned {} stale window(s)", pruned);
        }
        let live = self.tracker.ids();
        self.thumbnails.retain(|id| live.contains(id));
    }

    //  Overlay session

    fn handle_chord(&mut self, action: ChordAction) {
        match action {
            ChordAction::Activate => self.open_session(),

            ChordAction::Advance => {
                if self.session.is_none() {
                    debug!("advance without a session, ignoring");
                    return;
                }
                self.cursor.advance();
                if let Some(index) = self.cursor.current() {
                    self.notify(OverlayEvent::Advance { index });
                }
            }

            ChordAction::Retreat => {
                if self.session.is_none() {
                    debug!("retreat without a session, ignoring");
                    return;
                }
                self.cursor.retreat();
                if let Some(index) = self.cursor.current() {
                    self.notify(OverlayEvent::Retreat { index });
                }
            }

            ChordAction::Commit => {
                let selected = self.selected().cloned();
                self.close_session();
                match selected {
                    Some(window) => {
                        info!("switching to {} ({:?})", window.id, window.title);
                        self.tracker.activate(&self.wm, &window);
                        self.notify(OverlayEvent::Commit { window });
                    }
                    None => {
                        debug!("commit with nothing selected");
                        self.notify(OverlayEvent::Dismiss);
                    }
                }
            }

            ChordAction::Dismiss => {
                debug!("dismiss");
                self.close_session();
                self.notify(OverlayEvent::Dismiss);
            }
        }
    }

    fn open_session(&mut self) {
        let wm = &self.wm;
        let windows = self
            .tracker
            .snapshot(self.config.display_count, |h| wm.is_valid(h));

        // Every window about to be shown gets a fresh capture.
        self.thumbnails.invalidate_all(windows.iter().map(|h| &h.id));
        let thumbnails: Vec<Thumbnail> = windows.iter().map(|h| self.thumbnail_for(h)).collect();

        self.cursor.reset(windows.len());
        if self.config.select_previous_on_activate && windows.len() > 1 {
            self.cursor.advance();
        }
        debug!("session opened with {} window(s)", windows.len());

        let selected = self.cursor.current();
        self.session = Some(windows.clone());
        self.notify(OverlayEvent::Show {
            windows,
            thumbnails,
            selected,
        });
    }

    fn close_session(&mut self) {
        self.session = None;
        self.cursor.reset(0);
    }

    /// The cached thumbnail for `handle`, capturing it on a miss.
    ///
    /// Failed captures are cached as placeholders so the session does not
    /// retry them.
    pub fn thumbnail_for(&self, handle: &WindowHandle) -> Thumbnail {
        if let Some(hit) = self.thumbnails.get(handle.id) {
            return hit;
        }
        let captured = if self.config.thumbnails.enabled {
            self.wm.capture_thumbnail(handle)
        } else {
            None
        };
        let thumbnail = captured.unwrap_or_else(|| {
            if self.config.thumbnails.enabled {
                debug!("{}", SwitchError::CaptureFailure(handle.id));
            }
            Thumbnail::placeholder(
                self.config.thumbnails.max_width,
                self.config.thumbnails.max_height,
            )
        });
        self.thumbnails.cap_insert(handle.id, thumbnail.clone());
        thumbnail
    }

    fn notify(&self, event: OverlayEvent) {
        if let Some(tx) = &self.overlay_tx {
            if tx.send(event).is_err() {
                warn!("overlay channel closed");
            }
        }
    }

    /// Ids of the open session, in display order.
    pub fn session_ids(&self) -> Vec<WindowId> {
        self.session
            .as_ref()
            .map(|w| w.iter().map(|h| h.id).collect())
            .unwrap_or_default()
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use std::cell::{Cell, RefCell};
    use std::collections::{HashMap, HashSet};

    /// Record-keeping mock window system.
    #[derive(Debug, Default)]
    struct RecorderWm {
        /// Focused window per process.
        focused: RefCell<HashMap<ProcessId, WindowHandle>>,
        frontmost: Cell<Option<ProcessId>>,
        closed: RefCell<HashSet<WindowId>>,
        dead: RefCell<HashSet<ProcessId>>,
        raised: RefCell<Vec<WindowId>>,
        captures: Cell<usize>,
        capture_fails: Cell<bool>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("recorder error")]
    struct RecorderErr;

    impl RecorderWm {
        /// Simulate the user focusing `handle`.
        fn focus(&self, handle: &WindowHandle) {
            self.focused.borrow_mut().insert(handle.pid, handle.clone());
            self.frontmost.set(Some(handle.pid));
        }
    }

    impl WindowQuery for RecorderWm {
        type Error = RecorderErr;

        fn frontmost_process(&self) -> Result<Option<ProcessId>, RecorderErr> {
            Ok(self.frontmost.get())
        }

        fn focused_window(&self, pid: ProcessId) -> Result<Option<WindowHandle>, RecorderErr> {
            Ok(self.focused.borrow().get(&pid).cloned())
        }

        fn is_valid(&self, handle: &WindowHandle) -> bool {
            !self.closed.borrow().contains(&handle.id) && !self.dead.borrow().contains(&handle.pid)
        }

        fn activate(&self, handle: &WindowHandle) -> Result<(), RecorderErr> {
            if !self.is_valid(handle) {
                return Err(RecorderErr);
            }
            self.raised.borrow_mut().push(handle.id);
            self.focus(handle);
            Ok(())
        }

        fn capture_thumbnail(&self, _handle: &WindowHandle) -> Option<Thumbnail> {
            self.captures.set(self.captures.get() + 1);
            if self.capture_fails.get() {
                None
            } else {
                Some(Thumbnail::new(RgbaImage::new(8, 8)))
            }
        }

        fn process_alive(&self, pid: ProcessId) -> bool {
            !self.dead.borrow().contains(&pid)
        }
    }

    fn win(pid: i32, id: u64) -> WindowHandle {
        WindowHandle::new(
            ProcessId(pid),
            format!("window {}", id),
            WindowId::Native(id),
            format!("0x{:x}", id),
        )
    }

    /// Switcher that has seen `windows` focused, in order.
    fn switcher_with(
        windows: &[WindowHandle],
    ) -> (MruSwitcher<RecorderWm>, mpsc::Receiver<OverlayEvent>) {
        let mut s = MruSwitcher::new(RecorderWm::default(), &Config::default());
        for w in windows {
            s.wm.focus(w);
            s.handle(Command::Poll).unwrap();
        }
        let (tx, rx) = mpsc::channel();
        s.set_overlay(tx);
        (s, rx)
    }

    fn chord(s: &mut MruSwitcher<RecorderWm>, action: ChordAction) {
        s.handle(Command::Chord(action)).unwrap();
    }

    #[test]
    fn poll_records_focused_window() {
        let (s, _rx) = switcher_with(&[win(1, 1), win(2, 2)]);
        assert_eq!(
            s.tracker().snapshot(10, |_| true),
            vec![win(2, 2), win(1, 1)]
        );
    }

    #[test]
    fn repeated_poll_is_idempotent() {
        let (mut s, _rx) = switcher_with(&[win(1, 1)]);
        s.handle(Command::Poll).unwrap();
        s.handle(Command::AppActivated {
            pid: Some(ProcessId(1)),
        })
        .unwrap();
        assert_eq!(s.tracker().len(), 1);
    }

    #[test]
    fn poll_with_nothing_focused_is_noop() {
        let mut s = MruSwitcher::new(RecorderWm::default(), &Config::default());
        s.handle(Command::Poll).unwrap();
        assert!(s.tracker().is_empty());
    }

    #[test]
    fn activate_shows_snapshot_with_thumbnails() {
        let (mut s, rx) = switcher_with(&[win(1, 1), win(1, 2), win(2, 3)]);
        chord(&mut s, ChordAction::Activate);

        match rx.try_recv().unwrap() {
            OverlayEvent::Show {
                windows,
                thumbnails,
                selected,
            } => {
                assert_eq!(windows, vec![win(2, 3), win(1, 2), win(1, 1)]);
                assert_eq!(thumbnails.len(), 3);
                assert!(thumbnails.iter().all(|t| !t.is_placeholder()));
                assert_eq!(selected, Some(0));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(s.wm.captures.get(), 3);
    }

    #[test]
    fn display_count_limits_snapshot() {
        let windows: Vec<_> = (0..15).map(|i| win(1, i)).collect();
        let (mut s, _rx) = switcher_with(&windows);
        chord(&mut s, ChordAction::Activate);
        assert_eq!(s.session().map(|w| w.len()), Some(10));
    }

    #[test]
    fn advance_then_commit_raises_selection() {
        let (mut s, rx) = switcher_with(&[win(1, 1), win(1, 2), win(2, 3)]);
        chord(&mut s, ChordAction::Activate);
        chord(&mut s, ChordAction::Advance);
        assert_eq!(s.selected(), Some(&win(1, 2)));
        chord(&mut s, ChordAction::Commit);

        assert_eq!(*s.wm.raised.borrow(), vec![WindowId::Native(2)]);
        assert!(s.session().is_none());

        let events: Vec<OverlayEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], OverlayEvent::Show { .. }));
        assert!(matches!(events[1], OverlayEvent::Advance { index: 1 }));
        match &events[2] {
            OverlayEvent::Commit { window } => assert_eq!(*window, win(1, 2)),
            other => panic!("unexpected event {:?}", other),
        }

        // The focus change caused by the raise comes back through the poll.
        s.handle(Command::Poll).unwrap();
        assert_eq!(s.tracker().snapshot(1, |_| true), vec![win(1, 2)]);
    }

    #[test]
    fn retreat_wraps_to_last() {
        let (mut s, rx) = switcher_with(&[win(1, 1), win(1, 2), win(2, 3)]);
        chord(&mut s, ChordAction::Activate);
        chord(&mut s, ChordAction::Retreat);
        assert_eq!(s.selected(), Some(&win(1, 1)));
        let events: Vec<OverlayEvent> = rx.try_iter().collect();
        assert!(matches!(events[1], OverlayEvent::Retreat { index: 2 }));
    }

    #[test]
    fn advance_reuses_thumbnails_within_session() {
        let (mut s, _rx) = switcher_with(&[win(1, 1), win(1, 2)]);
        chord(&mut s, ChordAction::Activate);
        assert_eq!(s.wm.captures.get(), 2);
        for _ in 0..5 {
            chord(&mut s, ChordAction::Advance);
        }
        let selected = s.selected().cloned().unwrap();
        s.thumbnail_for(&selected);
        assert_eq!(s.wm.captures.get(), 2);
    }

    #[test]
    fn each_session_recaptures() {
        let (mut s, _rx) = switcher_with(&[win(1, 1), win(1, 2)]);
        chord(&mut s, ChordAction::Activate);
        chord(&mut s, ChordAction::Dismiss);
        chord(&mut s, ChordAction::Activate);
        assert_eq!(s.wm.captures.get(), 4);
    }

    #[test]
    fn capture_failure_yields_placeholder() {
        let (mut s, rx) = switcher_with(&[win(1, 1)]);
        s.wm.capture_fails.set(true);
        chord(&mut s, ChordAction::Activate);
        match rx.try_recv().unwrap() {
            OverlayEvent::Show { thumbnails, .. } => {
                assert!(thumbnails[0].is_placeholder());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn disabled_thumbnails_skip_capture() {
        let mut config = Config::default();
        config.thumbnails.enabled = false;
        let mut s = MruSwitcher::new(RecorderWm::default(), &config);
        s.wm.focus(&win(1, 1));
        s.handle(Command::Poll).unwrap();
        chord(&mut s, ChordAction::Activate);
        assert_eq!(s.wm.captures.get(), 0);
        assert!(s.thumbnails().get(WindowId::Native(1)).unwrap().is_placeholder());
    }

    #[test]
    fn activate_skips_and_prunes_closed_windows() {
        let (mut s, _rx) = switcher_with(&[win(1, 1), win(1, 2), win(1, 3)]);
        s.wm.closed.borrow_mut().insert(WindowId::Native(2));
        chord(&mut s, ChordAction::Activate);
        assert_eq!(
            s.session_ids(),
            vec![WindowId::Native(3), WindowId::Native(1)]
        );
        assert_eq!(s.tracker().len(), 2);
    }

    #[test]
    fn dismiss_raises_nothing() {
        let (mut s, rx) = switcher_with(&[win(1, 1), win(1, 2)]);
        chord(&mut s, ChordAction::Activate);
        chord(&mut s, ChordAction::Advance);
        chord(&mut s, ChordAction::Dismiss);
        assert!(s.wm.raised.borrow().is_empty());
        assert!(s.cursor().is_empty());
        let last = rx.try_iter().last().unwrap();
        assert!(matches!(last, OverlayEvent::Dismiss));
    }

    #[test]
    fn commit_on_empty_history_dismisses() {
        let (mut s, rx) = switcher_with(&[]);
        chord(&mut s, ChordAction::Activate);
        chord(&mut s, ChordAction::Commit);
        let events: Vec<OverlayEvent> = rx.try_iter().collect();
        assert!(matches!(events.last(), Some(OverlayEvent::Dismiss)));
        assert!(s.wm.raised.borrow().is_empty());
    }

    #[test]
    fn advance_without_session_is_ignored() {
        let (mut s, rx) = switcher_with(&[win(1, 1)]);
        chord(&mut s, ChordAction::Advance);
        chord(&mut s, ChordAction::Retreat);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn commit_on_vanished_window_prunes_it() {
        let (mut s, _rx) = switcher_with(&[win(1, 1), win(1, 2)]);
        chord(&mut s, ChordAction::Activate);
        chord(&mut s, ChordAction::Advance);
        s.wm.closed.borrow_mut().insert(WindowId::Native(1));
        chord(&mut s, ChordAction::Commit);
        assert!(s.wm.raised.borrow().is_empty());
        assert_eq!(s.tracker().ids().len(), 1);
    }

    #[test]
    fn select_previous_on_activate_starts_at_second() {
        let mut config = Config::default();
        config.select_previous_on_activate = true;
        let mut s = MruSwitcher::new(RecorderWm::default(), &config);
        for w in [win(1, 1), win(1, 2)] {
            s.wm.focus(&w);
            s.handle(Command::Poll).unwrap();
        }
        chord(&mut s, ChordAction::Activate);
        chord(&mut s, ChordAction::Commit);
        assert_eq!(*s.wm.raised.borrow(), vec![WindowId::Native(1)]);
    }

    #[test]
    fn window_closed_drops_entry_and_thumbnail() {
        let (mut s, _rx) = switcher_with(&[win(1, 0x10), win(1, 0x11)]);
        chord(&mut s, ChordAction::Activate);
        chord(&mut s, ChordAction::Dismiss);
        s.handle(Command::WindowClosed {
            address: "0x10".into(),
        })
        .unwrap();
        assert_eq!(
            s.tracker().ids(),
            [WindowId::Native(0x11)].into_iter().collect::<HashSet<_>>()
        );
        assert!(s.thumbnails().get(WindowId::Native(0x10)).is_none());
    }

    #[test]
    fn process_terminated_keeps_other_windows_in_order() {
        let (mut s, _rx) = switcher_with(&[win(1, 1), win(2, 2), win(1, 3), win(3, 4)]);
        s.handle(Command::ProcessTerminated(ProcessId(1))).unwrap();
        assert_eq!(
            s.tracker().snapshot(10, |_| true),
            vec![win(3, 4), win(2, 2)]
        );
    }

    #[test]
    fn sweep_drops_dead_processes_and_orphan_thumbnails() {
        let (mut s, _rx) = switcher_with(&[win(1, 1), win(2, 2), win(3, 3)]);
        chord(&mut s, ChordAction::Activate);
        chord(&mut s, ChordAction::Dismiss);
        assert_eq!(s.thumbnails().len(), 3);

        s.wm.dead.borrow_mut().insert(ProcessId(2));
        s.wm.closed.borrow_mut().insert(WindowId::Native(3));
        s.handle(Command::Sweep).unwrap();

        assert_eq!(s.tracker().snapshot(10, |_| true), vec![win(1, 1)]);
        assert_eq!(s.thumbnails().len(), 1);
        assert!(s.thumbnails().get(WindowId::Native(1)).is_some());
    }
}
