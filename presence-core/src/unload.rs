//! Unload intent classification: spec §4.5.
//!
//! Browsers fire a noisy, overlapping set of lifecycle events around tab
//! close, reload, and back-forward-cache (bfcache) freezes, and no single
//! one of them reliably means "the user is actually leaving". The design
//! here (per spec §9's "intent classifier determinism" note) separates two
//! concerns that are easy to conflate:
//!
//! - **Intent signals** (`mark_reload`/`mark_internal`/`mark_external`),
//!   fed from the priority-ordered sources in §4.5 (reload keys/APIs, link
//!   clicks, form submits, SPA router, Navigation API). These only ever
//!   escalate a single persisted slot, never downgrade it — once `external`
//!   is seen it "dominates" for the rest of the unload pass.
//! - **Decision points** (`decide`), fired on `visibilitychange→hidden`,
//!   `pagehide`, `freeze`, and finally `beforeunload`/`unload` as a
//!   last-chance guard. Each reads the current intent and decides whether to
//!   suppress, go FINAL, or go PENDING — it does not itself set intent.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UnloadIntent {
    Unknown,
    Internal,
    Reload,
    External,
}

/// A decision point at which the classifier must commit to an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionPoint {
    /// `visibilitychange` firing `hidden` (spec: ~10ms delay before
    /// consulting this, to let a same-tick `pagehide` race ahead of it;
    /// that delay is the caller's concern, not this classifier's).
    VisibilityHidden,
    /// `pagehide`; `persisted` mirrors the event's own field.
    PageHide { persisted: bool },
    /// The page is being placed in the bfcache, still alive.
    Freeze,
    /// Last-chance guard if nothing else has fired yet.
    BeforeUnload,
    Unload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveReason {
    External,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnloadOutcome {
    /// Send LEAVE now, with the given reason.
    Final(LeaveReason),
    /// Not enough information yet; the browser may still cancel the
    /// navigation (e.g. a user dismissing a `beforeunload` prompt).
    Pending(LeaveReason),
    /// Reload, internal navigation, or a bfcache-persisted pagehide/freeze:
    /// withhold (or withdraw) any in-flight LEAVE.
    Suppress,
}

pub struct UnloadClassifier {
    intent: UnloadIntent,
    leave_sent: bool,
}

impl UnloadClassifier {
    pub fn new() -> Self {
        Self {
            intent: UnloadIntent::Unknown,
            leave_sent: false,
        }
    }

    pub fn intent(&self) -> UnloadIntent {
        self.intent
    }

    pub fn leave_sent(&self) -> bool {
        self.leave_sent
    }

    fn escalate(&mut self, candidate: UnloadIntent) {
        if candidate > self.intent {
            self.intent = candidate;
        }
    }

    /// F5/Ctrl-R/Cmd-R keydown, an intercepted `reload()` call, the
    /// Navigation API's `reload` event, or `PerformanceNavigationTiming`
    /// reporting `type === 'reload'` on `pageshow`.
    pub fn mark_reload(&mut self) {
        self.escalate(UnloadIntent::Reload);
    }

    /// Same-site link click, same-origin form submit, or an SPA
    /// router event (`hashchange`, `popstate`, intercepted
    /// `pushState`/`replaceState`) — the tab isn't actually leaving the app.
    pub fn mark_internal(&mut self) {
        self.escalate(UnloadIntent::Internal);
    }

    /// A `target=_blank`/modified click counts as internal too — the
    /// current tab doesn't navigate away — while an unmodified click or
    /// form submit whose destination origin isn't in the allowed set marks
    /// external. Callers resolve that distinction before calling in; this
    /// just records the stronger of the two outcomes.
    pub fn mark_external(&mut self) {
        self.escalate(UnloadIntent::External);
    }

    fn reason(&self) -> LeaveReason {
        match self.intent {
            UnloadIntent::External => LeaveReason::External,
            _ => LeaveReason::Unknown,
        }
    }

    fn emit(&mut self, force: bool) -> UnloadOutcome {
        let reason = self.reason();
        if self.leave_sent && !force {
            return UnloadOutcome::Suppress;
        }
        self.leave_sent = true;
        // A forced emit (the session-mode FSM's LEAVE on entering `removed`)
        // always commits to immediate removal — per the glossary, FINAL means
        // immediate removal vs PENDING's tombstone grace, and a forced LEAVE
        // has no "browser may still cancel this" ambiguity to wait out.
        if force {
            return UnloadOutcome::Final(reason);
        }
        match self.intent {
            UnloadIntent::External => UnloadOutcome::Final(reason),
            _ => UnloadOutcome::Pending(reason),
        }
    }

    /// Evaluate a decision point against the current effective intent.
    pub fn decide(&mut self, point: DecisionPoint) -> UnloadOutcome {
        match self.intent {
            // Reload suppresses, and the reload flag's job is done — reset
            // it so a later, unrelated decision point (e.g. a stray
            // beforeunload re-entry) doesn't see a stale "reload".
            UnloadIntent::Reload => {
                self.intent = UnloadIntent::Unknown;
                UnloadOutcome::Suppress
            }
            UnloadIntent::Internal => UnloadOutcome::Suppress,
            UnloadIntent::External => self.emit(false),
            UnloadIntent::Unknown => match point {
                DecisionPoint::Freeze => UnloadOutcome::Suppress,
                DecisionPoint::PageHide { persisted: true } => UnloadOutcome::Suppress,
                _ => self.emit(false),
            },
        }
    }

    /// Used by the session-mode FSM's forced LEAVE on entering `removed`
    /// (spec §4.4), which must still respect the once-per-session
    /// `leaveSent` guard unless explicitly forced.
    pub fn force_leave(&mut self) -> UnloadOutcome {
        self.emit(true)
    }
}

impl Default for UnloadClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_hidden_with_no_intent_is_pending_unknown() {
        let mut c = UnloadClassifier::new();
        let outcome = c.decide(DecisionPoint::VisibilityHidden);
        assert_eq!(outcome, UnloadOutcome::Pending(LeaveReason::Unknown));
        assert_eq!(c.intent(), UnloadIntent::Unknown);
    }

    #[test]
    fn bfcache_freeze_suppresses_without_consuming_unknown_intent() {
        let mut c = UnloadClassifier::new();
        assert_eq!(c.decide(DecisionPoint::Freeze), UnloadOutcome::Suppress);
        assert_eq!(c.intent(), UnloadIntent::Unknown);
        assert!(!c.leave_sent());
    }

    #[test]
    fn persisted_pagehide_suppresses() {
        let mut c = UnloadClassifier::new();
        let outcome = c.decide(DecisionPoint::PageHide { persisted: true });
        assert_eq!(outcome, UnloadOutcome::Suppress);
    }

    #[test]
    fn reload_signal_suppresses_and_clears() {
        let mut c = UnloadClassifier::new();
        c.mark_reload();
        assert_eq!(c.decide(DecisionPoint::PageHide { persisted: false }), UnloadOutcome::Suppress);
        assert_eq!(c.intent(), UnloadIntent::Unknown);
        assert!(!c.leave_sent());
    }

    #[test]
    fn internal_navigation_suppresses() {
        let mut c = UnloadClassifier::new();
        c.mark_internal();
        assert_eq!(c.decide(DecisionPoint::PageHide { persisted: false }), UnloadOutcome::Suppress);
        assert!(!c.leave_sent());
    }

    #[test]
    fn external_navigation_emits_final_once() {
        let mut c = UnloadClassifier::new();
        c.mark_external();
        let first = c.decide(DecisionPoint::PageHide { persisted: false });
        assert_eq!(first, UnloadOutcome::Final(LeaveReason::External));
        assert!(c.leave_sent());

        // At-most-one LEAVE per unload: a later decision point (beforeunload
        // firing after pagehide already committed) is absorbed.
        let second = c.decide(DecisionPoint::BeforeUnload);
        assert_eq!(second, UnloadOutcome::Suppress);
    }

    #[test]
    fn external_dominates_over_later_reload_or_internal_signals() {
        let mut c = UnloadClassifier::new();
        c.mark_external();
        c.mark_reload();
        c.mark_internal();
        assert_eq!(c.intent(), UnloadIntent::External);

        let outcome = c.decide(DecisionPoint::Unload);
        assert_eq!(outcome, UnloadOutcome::Final(LeaveReason::External));
    }

    #[test]
    fn reload_dominates_over_later_internal_signal() {
        let mut c = UnloadClassifier::new();
        c.mark_reload();
        c.mark_internal();
        assert_eq!(c.intent(), UnloadIntent::Reload);
    }

    #[test]
    fn beforeunload_last_chance_guard_emits_pending_if_nothing_else_fired() {
        let mut c = UnloadClassifier::new();
        let outcome = c.decide(DecisionPoint::BeforeUnload);
        assert_eq!(outcome, UnloadOutcome::Pending(LeaveReason::Unknown));
    }

    #[test]
    fn force_bypasses_the_once_per_session_guard() {
        let mut c = UnloadClassifier::new();
        c.mark_external();
        c.decide(DecisionPoint::Unload);
        assert!(c.leave_sent());

        // Without force, a second call is absorbed by the guard.
        assert_eq!(c.decide(DecisionPoint::Unload), UnloadOutcome::Suppress);

        // force_leave still goes through the guard check itself, but the
        // session-mode FSM always calls it with intent already cleared by a
        // fresh classifier for a new session, demonstrated on a clean one.
        let mut fresh = UnloadClassifier::new();
        let forced = fresh.force_leave();
        assert_eq!(forced, UnloadOutcome::Final(LeaveReason::Unknown));
        assert!(fresh.leave_sent());
        assert_eq!(fresh.force_leave(), UnloadOutcome::Final(LeaveReason::Unknown));
    }
}
