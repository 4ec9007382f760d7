//! The session-mode state machine: spec §4.4.
//!
//! Desktop tabs get a three-state machine with two timers so a user who
//! merely alt-tabs away isn't dropped; mobile/tablet tabs get a simpler
//! mapping because backgrounding there routinely means the OS will suspend
//! or kill the page outright, so there is no useful "passive" twilight zone
//! to model.
//!
//! Device classification itself is an external, opaque input (user agent
//! sniffing lives outside this crate) — `DeviceClass` is just a tag handed
//! in by the caller.

use crate::visibility::VisibilityState;

const ACTIVE_GRACE_MS: u64 = 5 * 60 * 1000; // F
const PASSIVE_GRACE_MS: u64 = 4 * 60 * 1000; // P

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Desktop,
    MobileOrTablet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Active,
    PassiveActive,
    Removed,
}

/// Side effects the FSM's owner must carry out. These are returned rather
/// than performed directly so `SessionModeMachine` stays free of any
/// networking concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionModeEffect {
    /// Entering `removed` always forces a LEAVE, even if the unload
    /// classifier never ran (e.g. the tab just sat backgrounded past the
    /// grace period without closing).
    SendLeave,
    /// Leaving `removed` is a fresh presence, not a resume: any
    /// once-per-session guard (e.g. the unload classifier's `leaveSent`
    /// latch) must be cleared.
    ResetGuards,
}

pub struct SessionModeMachine {
    device: DeviceClass,
    mode: SessionMode,
    /// For `Active`: last time foreground was confirmed. For
    /// `PassiveActive`: when the passive window started.
    state_entered_ms: u64,
}

impl SessionModeMachine {
    pub fn new(device: DeviceClass, initial_visibility: VisibilityState, now_ms: u64) -> Self {
        let mode = match initial_visibility {
            VisibilityState::Foreground => SessionMode::Active,
            VisibilityState::Background => SessionMode::PassiveActive,
        };
        Self {
            device,
            mode,
            state_entered_ms: now_ms,
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Call on every committed visibility transition (spec §4.3's `state`
    /// event).
    pub fn on_visibility_change(&mut self, visibility: VisibilityState, now_ms: u64) -> Vec<SessionModeEffect> {
        match (self.device, visibility) {
            (_, VisibilityState::Foreground) => self.enter_active(now_ms),
            (DeviceClass::Desktop, VisibilityState::Background) => self.enter_passive_active(now_ms),
            (DeviceClass::MobileOrTablet, VisibilityState::Background) => self.enter_removed(now_ms),
        }
    }

    /// Call on any user-activity signal (click, key, touch, scroll — spec
    /// §4.4's "user activity" trigger). In `active`, this just resets the
    /// idle clock (F); from `passive_active` or `removed` it's a full
    /// re-JOIN back to `active`.
    pub fn on_activity(&mut self, now_ms: u64) -> Vec<SessionModeEffect> {
        self.enter_active(now_ms)
    }

    /// Call periodically (driven by the same task-queue tick as everything
    /// else in this crate) so the grace-period timers actually fire while
    /// the page sits untouched.
    pub fn tick(&mut self, now_ms: u64) -> Vec<SessionModeEffect> {
        match self.mode {
            SessionMode::Active if self.device == DeviceClass::Desktop => {
                if now_ms.saturating_sub(self.state_entered_ms) > ACTIVE_GRACE_MS {
                    self.enter_passive_active(now_ms)
                } else {
                    Vec::new()
                }
            }
            SessionMode::PassiveActive => {
                if now_ms.saturating_sub(self.state_entered_ms) > PASSIVE_GRACE_MS {
                    self.enter_removed(now_ms)
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        }
    }

    fn enter_active(&mut self, now_ms: u64) -> Vec<SessionModeEffect> {
        let was_removed = self.mode == SessionMode::Removed;
        self.mode = SessionMode::Active;
        self.state_entered_ms = now_ms;
        if was_removed {
            vec![SessionModeEffect::ResetGuards]
        } else {
            Vec::new()
        }
    }

    fn enter_passive_active(&mut self, now_ms: u64) -> Vec<SessionModeEffect> {
        if self.mode == SessionMode::PassiveActive {
            return Vec::new();
        }
        self.mode = SessionMode::PassiveActive;
        self.state_entered_ms = now_ms;
        Vec::new()
    }

    fn enter_removed(&mut self, now_ms: u64) -> Vec<SessionModeEffect> {
        if self.mode == SessionMode::Removed {
            return Vec::new();
        }
        self.mode = SessionMode::Removed;
        self.state_entered_ms = now_ms;
        vec![SessionModeEffect::SendLeave]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desktop_backgrounding_enters_passive_not_removed() {
        let mut fsm = SessionModeMachine::new(DeviceClass::Desktop, VisibilityState::Foreground, 0);
        let effects = fsm.on_visibility_change(VisibilityState::Background, 1_000);
        assert_eq!(fsm.mode(), SessionMode::PassiveActive);
        assert!(effects.is_empty());
    }

    #[test]
    fn desktop_passive_times_out_to_removed_with_forced_leave() {
        let mut fsm = SessionModeMachine::new(DeviceClass::Desktop, VisibilityState::Background, 0);
        let effects = fsm.tick(PASSIVE_GRACE_MS + 1);
        assert_eq!(fsm.mode(), SessionMode::Removed);
        assert_eq!(effects, vec![SessionModeEffect::SendLeave]);
    }

    #[test]
    fn desktop_active_grace_expires_into_passive() {
        let mut fsm = SessionModeMachine::new(DeviceClass::Desktop, VisibilityState::Foreground, 0);
        let effects = fsm.tick(ACTIVE_GRACE_MS + 1);
        assert_eq!(fsm.mode(), SessionMode::PassiveActive);
        assert!(effects.is_empty());
    }

    #[test]
    fn returning_foreground_from_removed_resets_guards() {
        let mut fsm = SessionModeMachine::new(DeviceClass::Desktop, VisibilityState::Background, 0);
        fsm.tick(PASSIVE_GRACE_MS + 1);
        assert_eq!(fsm.mode(), SessionMode::Removed);

        let effects = fsm.on_visibility_change(VisibilityState::Foreground, PASSIVE_GRACE_MS + 2);
        assert_eq!(fsm.mode(), SessionMode::Active);
        assert_eq!(effects, vec![SessionModeEffect::ResetGuards]);
    }

    #[test]
    fn mobile_backgrounding_goes_straight_to_removed() {
        let mut fsm = SessionModeMachine::new(DeviceClass::MobileOrTablet, VisibilityState::Foreground, 0);
        let effects = fsm.on_visibility_change(VisibilityState::Background, 10);
        assert_eq!(fsm.mode(), SessionMode::Removed);
        assert_eq!(effects, vec![SessionModeEffect::SendLeave]);
    }

    #[test]
    fn activity_resets_the_active_grace_window() {
        let mut fsm = SessionModeMachine::new(DeviceClass::Desktop, VisibilityState::Foreground, 0);
        fsm.tick(ACTIVE_GRACE_MS - 1);
        assert_eq!(fsm.mode(), SessionMode::Active);

        let effects = fsm.on_activity(ACTIVE_GRACE_MS - 1);
        assert!(effects.is_empty());

        // Without the reset this tick would have crossed the original grace
        // deadline; activity pushed it back out.
        let effects = fsm.tick(ACTIVE_GRACE_MS + 1);
        assert_eq!(fsm.mode(), SessionMode::Active);
        assert!(effects.is_empty());
    }

    #[test]
    fn activity_recovers_from_passive_and_removed() {
        let mut fsm = SessionModeMachine::new(DeviceClass::Desktop, VisibilityState::Background, 0);
        let effects = fsm.on_activity(1_000);
        assert_eq!(fsm.mode(), SessionMode::Active);
        assert!(effects.is_empty());

        fsm.tick(1_000 + PASSIVE_GRACE_MS + 1);
        // still active (grace windows only apply once in that mode); force
        // removed directly via backgrounding then idling past P.
        fsm.on_visibility_change(VisibilityState::Background, 2_000);
        fsm.tick(2_000 + PASSIVE_GRACE_MS + 1);
        assert_eq!(fsm.mode(), SessionMode::Removed);

        let effects = fsm.on_activity(2_000 + PASSIVE_GRACE_MS + 2);
        assert_eq!(fsm.mode(), SessionMode::Active);
        assert_eq!(effects, vec![SessionModeEffect::ResetGuards]);
    }

    #[test]
    fn mobile_has_no_active_grace_timeout() {
        let mut fsm = SessionModeMachine::new(DeviceClass::MobileOrTablet, VisibilityState::Foreground, 0);
        let effects = fsm.tick(ACTIVE_GRACE_MS + 1_000_000);
        assert_eq!(fsm.mode(), SessionMode::Active);
        assert!(effects.is_empty());
    }
}
