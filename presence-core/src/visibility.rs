//! Debounced visibility tracking: spec §4.3.
//!
//! Raw `visibilitychange`/focus/blur events are noisy (a user alt-tabbing
//! through several windows fires bursts of them), so the tracker only
//! commits a state change after `DEBOUNCE_MS` of quiet. Initial state is
//! always foreground — a tab that never receives an event (embedded
//! preview, automated test) must not be silently counted as background.

const DEBOUNCE_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityState {
    Foreground,
    Background,
}

/// Raw signals a host environment feeds in as they happen. Document
/// visibility and window focus are tracked independently; a tab only counts
/// as foreground when both agree, so a visible-but-unfocused document (e.g.
/// a background window peeking through) doesn't count as present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilitySignal {
    DocumentVisible(bool),
    WindowFocused(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityEvent {
    /// Committed state changed after debounce settled.
    State(VisibilityState),
    /// The tab transitioned into foreground specifically — callers (leader
    /// election's fast path, session-mode FSM) care about this edge even
    /// when they also see the generic `State` event.
    BecameForeground,
}

pub struct VisibilityTracker {
    document_visible: bool,
    window_focused: bool,
    committed: VisibilityState,
    pending: Option<(VisibilityState, u64)>,
}

impl VisibilityTracker {
    pub fn new() -> Self {
        Self {
            document_visible: true,
            window_focused: true,
            committed: VisibilityState::Foreground,
            pending: None,
        }
    }

    pub fn state(&self) -> VisibilityState {
        self.committed
    }

    fn raw_foreground(&self) -> bool {
        self.document_visible && self.window_focused
    }

    /// Heuristic only, used for devtools-open logging noise suppression —
    /// never feeds into the committed state or any emitted event.
    pub fn looks_like_devtools_open(&self) -> bool {
        self.document_visible && !self.window_focused
    }

    /// Feed a raw signal at time `now_ms`; returns any events produced.
    /// Callers are expected to re-poll with no new signal via `tick` so a
    /// pending debounce can still commit once it settles.
    pub fn on_signal(&mut self, signal: VisibilitySignal, now_ms: u64) -> Vec<VisibilityEvent> {
        match signal {
            VisibilitySignal::DocumentVisible(v) => self.document_visible = v,
            VisibilitySignal::WindowFocused(v) => self.window_focused = v,
        }
        self.restart_debounce(now_ms);
        self.tick(now_ms)
    }

    /// Advances the debounce timer with no new signal; call this
    /// periodically so a settled pending state actually commits.
    pub fn tick(&mut self, now_ms: u64) -> Vec<VisibilityEvent> {
        let Some((candidate, deadline_ms)) = self.pending else {
            return Vec::new();
        };
        if now_ms < deadline_ms {
            return Vec::new();
        }
        self.pending = None;
        if candidate == self.committed {
            return Vec::new();
        }
        self.committed = candidate;
        let mut events = vec![VisibilityEvent::State(candidate)];
        if candidate == VisibilityState::Foreground {
            events.push(VisibilityEvent::BecameForeground);
        }
        events
    }

    fn restart_debounce(&mut self, now_ms: u64) {
        let candidate = if self.raw_foreground() {
            VisibilityState::Foreground
        } else {
            VisibilityState::Background
        };
        if candidate == self.committed {
            self.pending = None;
            return;
        }
        self.pending = Some((candidate, now_ms + DEBOUNCE_MS));
    }
}

impl Default for VisibilityTracker {
    fn default() -> Self {
        Self::new()
    }
}
