//! Shared mutable coordination state of the outbound sync pipeline.
//!
//! Every flag that decides whether a detected clipboard change is dispatched
//! lives in [`SyncPipelineState`], one auditable place instead of free
//! floating closure captures: the feedback-suppression window, the
//! single-flight processing flag and its cool-down, the debounce timer and
//! the last accepted fingerprint.
//!
//! All timing is expressed against caller-supplied millisecond timestamps
//! (see [`crate::ports::Clock`]), which keeps this module pure and the tests
//! deterministic.

use crate::clipboard::{ClipboardContent, Fingerprint};

/// One-shot deadline timer: arm-or-restart, cancel, query.
///
/// Arming an already armed timer replaces the deadline; timers never stack.
#[derive(Debug, Default, Clone, Copy)]
pub struct Timer {
    deadline_ms: Option<i64>,
}

impl Timer {
    pub fn arm(&mut self, now_ms: i64, duration_ms: i64) {
        self.deadline_ms = Some(now_ms + duration_ms);
    }

    pub fn cancel(&mut self) {
        self.deadline_ms = None;
    }

    /// Armed and not yet expired.
    pub fn is_armed(&self, now_ms: i64) -> bool {
        matches!(self.deadline_ms, Some(deadline) if now_ms < deadline)
    }

    /// Consume an expired deadline. Returns true exactly once per arming,
    /// when the deadline has passed.
    pub fn fire_due(&mut self, now_ms: i64) -> bool {
        match self.deadline_ms {
            Some(deadline) if now_ms >= deadline => {
                self.deadline_ms = None;
                true
            }
            _ => false,
        }
    }

    pub fn deadline(&self) -> Option<i64> {
        self.deadline_ms
    }
}

/// Why a clipboard event was not accepted for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Inside the feedback-suppression window after a programmatic write.
    Suppressed,
    /// A dispatch pipeline is running or cooling down; duplicate OS
    /// notifications for the same user action are swallowed here.
    Busy,
    /// Fingerprint equals the last accepted snapshot.
    Duplicate,
}

#[derive(Debug, Default)]
pub struct SyncPipelineState {
    suppression: Timer,
    processing: bool,
    cooldown: Timer,
    debounce: Timer,
    last_fingerprint: Option<Fingerprint>,
    pending: Option<ClipboardContent>,
}

impl SyncPipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the upcoming clipboard mutation as self-inflicted.
    ///
    /// Must be called BEFORE writing synchronized content to the OS
    /// clipboard; reversing the order lets the watcher re-upload the write
    /// and loop.
    pub fn arm_suppression(&mut self, now_ms: i64, window_ms: i64) {
        self.suppression.arm(now_ms, window_ms);
    }

    /// Clear the suppression window immediately. Called on write error so a
    /// legitimately new local copy after a failed sync write is not masked.
    pub fn disarm_suppression(&mut self) {
        self.suppression.cancel();
    }

    pub fn is_suppressed(&self, now_ms: i64) -> bool {
        self.suppression.is_armed(now_ms)
    }

    fn is_busy(&self, now_ms: i64) -> bool {
        self.processing || self.cooldown.is_armed(now_ms)
    }

    /// Dispatch decision for one detected clipboard change.
    ///
    /// On acceptance the candidate replaces any pending one and the debounce
    /// timer restarts: only the latest snapshot of a burst is ever
    /// dispatched, earlier ones are discarded rather than queued.
    pub fn offer(
        &mut self,
        content: ClipboardContent,
        now_ms: i64,
        debounce_ms: i64,
    ) -> Result<(), DropReason> {
        if self.is_suppressed(now_ms) {
            return Err(DropReason::Suppressed);
        }
        if self.is_busy(now_ms) {
            return Err(DropReason::Busy);
        }
        let fingerprint = Fingerprint::of(&content);
        if self.last_fingerprint.as_ref() == Some(&fingerprint) {
            return Err(DropReason::Duplicate);
        }
        self.last_fingerprint = Some(fingerprint);
        self.pending = Some(content);
        self.debounce.arm(now_ms, debounce_ms);
        Ok(())
    }

    /// Take the pending candidate once the debounce timer has fired
    /// uninterrupted. Acquires the single-flight processing flag.
    pub fn take_due(&mut self, now_ms: i64) -> Option<ClipboardContent> {
        if !self.debounce.fire_due(now_ms) {
            return None;
        }
        let content = self.pending.take()?;
        self.processing = true;
        Some(content)
    }

    /// Release the processing flag into its cool-down window. The flag is
    /// intentionally NOT released immediately: trailing OS notifications for
    /// the same user action must still be swallowed.
    pub fn finish_dispatch(&mut self, now_ms: i64, cooldown_ms: i64) {
        self.processing = false;
        self.cooldown.arm(now_ms, cooldown_ms);
    }

    /// Deadline the driver should sleep until, if a candidate is pending.
    pub fn debounce_deadline(&self) -> Option<i64> {
        self.debounce.deadline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> ClipboardContent {
        ClipboardContent::Text(s.into())
    }

    #[test]
    fn timer_restarts_instead_of_stacking() {
        let mut t = Timer::default();
        t.arm(0, 300);
        t.arm(200, 300);
        assert!(!t.fire_due(300));
        assert!(t.is_armed(300));
        assert!(t.fire_due(500));
        // one-shot: a consumed deadline does not fire again
        assert!(!t.fire_due(600));
    }

    #[test]
    fn timer_cancel_clears_deadline() {
        let mut t = Timer::default();
        t.arm(0, 100);
        t.cancel();
        assert!(!t.is_armed(50));
        assert!(!t.fire_due(200));
    }

    #[test]
    fn burst_of_identical_events_yields_one_dispatch() {
        let mut state = SyncPipelineState::new();

        assert!(state.offer(text("hello"), 0, 300).is_ok());
        for now in [50, 100, 150] {
            assert_eq!(
                state.offer(text("hello"), now, 300),
                Err(DropReason::Duplicate)
            );
        }

        assert_eq!(state.take_due(250), None);
        assert_eq!(state.take_due(300), Some(text("hello")));
        assert_eq!(state.take_due(350), None);
    }

    #[test]
    fn newer_content_in_a_burst_replaces_the_candidate() {
        let mut state = SyncPipelineState::new();
        assert!(state.offer(text("first"), 0, 300).is_ok());
        assert!(state.offer(text("second"), 100, 300).is_ok());

        // debounce restarted at 100; the earlier candidate is discarded
        assert_eq!(state.take_due(300), None);
        assert_eq!(state.take_due(400), Some(text("second")));
    }

    #[test]
    fn suppression_window_drops_events_until_expiry() {
        let mut state = SyncPipelineState::new();
        state.arm_suppression(0, 2000);

        assert_eq!(state.offer(text("echo"), 500, 300), Err(DropReason::Suppressed));
        assert_eq!(
            state.offer(text("echo"), 1999, 300),
            Err(DropReason::Suppressed)
        );

        // expired window: genuinely new content dispatches again
        assert!(state.offer(text("fresh"), 2000, 300).is_ok());
        assert_eq!(state.take_due(2300), Some(text("fresh")));
    }

    #[test]
    fn disarm_lifts_the_window_immediately() {
        let mut state = SyncPipelineState::new();
        state.arm_suppression(0, 2000);
        state.disarm_suppression();
        assert!(state.offer(text("after-write-error"), 100, 300).is_ok());
    }

    #[test]
    fn processing_flag_is_single_flight_with_cooldown() {
        let mut state = SyncPipelineState::new();
        assert!(state.offer(text("a"), 0, 300).is_ok());
        assert_eq!(state.take_due(300), Some(text("a")));

        // in flight: everything is Busy
        assert_eq!(state.offer(text("b"), 310, 300), Err(DropReason::Busy));

        state.finish_dispatch(400, 500);

        // cool-down still swallows trailing notifications
        assert_eq!(state.offer(text("b"), 600, 300), Err(DropReason::Busy));

        // cool-down expired
        assert!(state.offer(text("b"), 900, 300).is_ok());
    }

    #[test]
    fn suppression_outranks_duplicate_detection() {
        let mut state = SyncPipelineState::new();
        assert!(state.offer(text("x"), 0, 300).is_ok());
        assert_eq!(state.take_due(300), Some(text("x")));
        state.finish_dispatch(300, 500);

        state.arm_suppression(1000, 2000);
        assert_eq!(
            state.offer(text("x"), 1100, 300),
            Err(DropReason::Suppressed)
        );
    }
}
