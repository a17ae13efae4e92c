//! Session state machine implementation.
//!
//! The machine is a logical-tick countdown. It does not own a timer or a
//! thread - the caller schedules one `tick()` per elapsed second and is
//! handed a [`TickToken`] that goes stale on every phase change, so a
//! forgotten timer can never double-fire into the next phase.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Paused -> Running
//!                 \-> AwaitingOutcome -> Idle (next phase)
//! ```
//!
//! A FOCUS phase that counts down to zero suspends in `AwaitingOutcome`
//! until the outcome write and any reward acknowledgment finish; `start()`
//! and `pause()` are rejected in that window. A BREAK phase advances to the
//! next FOCUS immediately.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::settings::{Phase, SessionSettings};
use crate::error::ValidationError;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Running,
    Paused,
    /// Focus countdown finished; the phase transition is gated on the
    /// outcome write and reward acknowledgment.
    AwaitingOutcome,
}

/// Handle identifying the timer that is allowed to drive `tick()`.
///
/// Minted by [`SessionMachine::tick_token`]; every transition in or out of
/// `Running` invalidates previously issued tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickToken {
    generation: u64,
}

/// Report handed to the outcome dispatcher when a focus attempt is cut short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptReport {
    /// Actual elapsed focus seconds at the moment of interruption.
    pub elapsed_secs: u32,
    /// Elapsed seconds floored to whole minutes. None when under a minute,
    /// in which case no interval record is written.
    pub recorded_min: Option<u32>,
}

/// Core session state machine.
///
/// Owns the countdown for one session context. Serializable so a host can
/// park it between invocations; never treated as durable history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMachine {
    settings: SessionSettings,
    phase: Phase,
    state: SessionState,
    /// Remaining time in seconds for the current phase.
    remaining_secs: u32,
    /// Seconds actually spent running in the current phase.
    elapsed_secs: u32,
    /// Total seconds of the current phase, captured at phase entry.
    /// Settings changes while running do not touch this.
    total_secs: u32,
    /// Increments once per completed phase.
    session_counter: u32,
    #[serde(default)]
    selected_task: Option<String>,
    /// Timer generation; bumped on every Running boundary.
    #[serde(default)]
    generation: u64,
}

impl SessionMachine {
    /// Create a new machine in FOCUS/Idle at the configured focus length.
    pub fn new(settings: SessionSettings) -> Self {
        let total_secs = settings.phase_secs(Phase::Focus);
        Self {
            settings,
            phase: Phase::Focus,
            state: SessionState::Idle,
            remaining_secs: total_secs,
            elapsed_secs: 0,
            total_secs,
            session_counter: 0,
            selected_task: None,
            generation: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    pub fn total_secs(&self) -> u32 {
        self.total_secs
    }

    pub fn session_counter(&self) -> u32 {
        self.session_counter
    }

    pub fn selected_task(&self) -> Option<&str> {
        self.selected_task.as_deref()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Token for the timer currently allowed to drive `tick()`.
    pub fn tick_token(&self) -> TickToken {
        TickToken {
            generation: self.generation,
        }
    }

    /// 0.0 .. 1.0 progress within the current phase.
    pub fn phase_progress(&self) -> f64 {
        if self.total_secs == 0 {
            return 0.0;
        }
        1.0 - (self.remaining_secs as f64 / self.total_secs as f64)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            phase: self.phase,
            state: self.state,
            remaining_secs: self.remaining_secs,
            total_secs: self.total_secs,
            session_index: self.session_counter,
            selected_task: self.selected_task.clone(),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Attach or clear the task the next focus interval is booked against.
    pub fn select_task(&mut self, task_id: Option<String>) {
        self.selected_task = task_id;
    }

    /// Idle/Paused -> Running. No-op while already running, rejected while
    /// a previous interval's outcome is still in flight.
    ///
    /// # Errors
    /// Returns [`ValidationError::TaskRequired`] when entering FOCUS from
    /// Idle without a selected task and the settings demand one.
    pub fn start(&mut self) -> Result<Option<Event>, ValidationError> {
        match self.state {
            SessionState::Idle => {
                if self.phase == Phase::Focus
                    && self.settings.require_task
                    && self.selected_task.is_none()
                {
                    return Err(ValidationError::TaskRequired);
                }
                self.state = SessionState::Running;
                self.generation += 1;
                Ok(Some(Event::SessionStarted {
                    phase: self.phase,
                    duration_secs: self.total_secs,
                    session_index: self.session_counter,
                    at: Utc::now(),
                }))
            }
            SessionState::Paused => Ok(self.resume()),
            // Already running, or gated on the previous outcome.
            SessionState::Running | SessionState::AwaitingOutcome => Ok(None),
        }
    }

    /// Running -> Paused; freezes the countdown. Idempotent.
    pub fn pause(&mut self) -> Option<Event> {
        match self.state {
            SessionState::Running => {
                self.state = SessionState::Paused;
                self.generation += 1;
                Some(Event::SessionPaused {
                    phase: self.phase,
                    remaining_secs: self.remaining_secs,
                    at: Utc::now(),
                })
            }
            _ => None,
        }
    }

    /// Paused -> Running.
    pub fn resume(&mut self) -> Option<Event> {
        match self.state {
            SessionState::Paused => {
                self.state = SessionState::Running;
                self.generation += 1;
                Some(Event::SessionResumed {
                    phase: self.phase,
                    remaining_secs: self.remaining_secs,
                    at: Utc::now(),
                })
            }
            _ => None,
        }
    }

    /// Advance the countdown by exactly one second.
    ///
    /// The caller invokes this once per elapsed wall-clock second with the
    /// token it received when scheduling its timer. A stale token is a
    /// no-op, so a timer that outlived a phase change cannot double-fire.
    /// Returns `Some(Event::PhaseCompleted)` when the phase finishes.
    pub fn tick(&mut self, token: TickToken) -> Option<Event> {
        if token.generation != self.generation || self.state != SessionState::Running {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        self.elapsed_secs = self.elapsed_secs.saturating_add(1);
        if self.remaining_secs == 0 {
            return Some(self.complete_phase());
        }
        None
    }

    /// Cut a focus attempt short. Valid only while phase = FOCUS, Running
    /// or Paused. Reports the actual elapsed time and resets to FOCUS/Idle
    /// at the full configured duration; `session_counter` is not advanced.
    pub fn interrupt(&mut self) -> Option<(Event, InterruptReport)> {
        if self.phase != Phase::Focus
            || !matches!(self.state, SessionState::Running | SessionState::Paused)
        {
            return None;
        }
        let elapsed_secs = self.elapsed_secs;
        let minutes = elapsed_secs / 60;
        let report = InterruptReport {
            elapsed_secs,
            recorded_min: if minutes >= 1 { Some(minutes) } else { None },
        };
        self.enter_phase(Phase::Focus);
        let event = Event::SessionInterrupted {
            elapsed_secs,
            recorded_min: report.recorded_min,
            at: Utc::now(),
        };
        Some((event, report))
    }

    /// Release the machine out of `AwaitingOutcome` into the break phase.
    ///
    /// Called by the outcome dispatcher once the interval write has
    /// finished (or was degraded to a no-op) and any reward presentation
    /// was acknowledged.
    pub fn resolve_outcome(&mut self) -> Option<Event> {
        if self.state != SessionState::AwaitingOutcome {
            return None;
        }
        self.enter_phase(Phase::Break);
        Some(Event::OutcomeResolved {
            next_phase: Phase::Break,
            at: Utc::now(),
        })
    }

    /// Swap in new durations. Reinitializes the countdown only while Idle;
    /// an in-flight countdown keeps the total it was entered with and the
    /// new values take effect at the next phase entry.
    pub fn apply_settings(&mut self, settings: SessionSettings) {
        self.settings = settings;
        if self.state == SessionState::Idle {
            let phase = self.phase;
            self.enter_phase(phase);
        }
    }

    /// Discard the session: back to FOCUS/Idle, counter cleared.
    pub fn reset(&mut self) -> Option<Event> {
        self.session_counter = 0;
        self.enter_phase(Phase::Focus);
        Some(Event::SessionReset { at: Utc::now() })
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Terminal tick of a phase. FOCUS suspends in AwaitingOutcome; BREAK
    /// advances straight to the next focus. Either way the counter moves
    /// and the current timer token goes stale, suppressing further ticks.
    fn complete_phase(&mut self) -> Event {
        let phase = self.phase;
        let duration_min = self.elapsed_secs / 60;
        self.session_counter += 1;
        self.generation += 1;
        let session_index = self.session_counter;
        match phase {
            Phase::Focus => {
                self.state = SessionState::AwaitingOutcome;
            }
            Phase::Break => {
                self.enter_phase(Phase::Focus);
            }
        }
        Event::PhaseCompleted {
            phase,
            session_index,
            duration_min,
            at: Utc::now(),
        }
    }

    fn enter_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.state = SessionState::Idle;
        self.total_secs = self.settings.phase_secs(phase);
        self.remaining_secs = self.total_secs;
        self.elapsed_secs = 0;
        self.generation += 1;
    }
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self::new(SessionSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_machine(focus_min: u32, break_min: u32) -> SessionMachine {
        SessionMachine::new(SessionSettings {
            focus_minutes: focus_min,
            break_minutes: break_min,
            require_task: false,
        })
    }

    fn run_to_zero(machine: &mut SessionMachine) -> Event {
        let token = machine.tick_token();
        loop {
            if let Some(event) = machine.tick(token) {
                return event;
            }
        }
    }

    #[test]
    fn start_pause_resume() {
        let mut m = SessionMachine::default();
        assert_eq!(m.state(), SessionState::Idle);

        assert!(m.start().unwrap().is_some());
        assert_eq!(m.state(), SessionState::Running);

        assert!(m.pause().is_some());
        assert_eq!(m.state(), SessionState::Paused);

        assert!(m.resume().is_some());
        assert_eq!(m.state(), SessionState::Running);
    }

    #[test]
    fn pause_is_idempotent() {
        let mut m = SessionMachine::default();
        m.start().unwrap();
        assert!(m.pause().is_some());
        let remaining = m.remaining_secs();
        assert!(m.pause().is_none());
        assert_eq!(m.state(), SessionState::Paused);
        assert_eq!(m.remaining_secs(), remaining);
    }

    #[test]
    fn tick_decrements_by_one_second() {
        let mut m = SessionMachine::default();
        m.start().unwrap();
        let token = m.tick_token();
        let before = m.remaining_secs();
        assert!(m.tick(token).is_none());
        assert_eq!(m.remaining_secs(), before - 1);
        assert_eq!(m.elapsed_secs(), 1);
    }

    #[test]
    fn stale_token_does_not_tick() {
        let mut m = SessionMachine::default();
        m.start().unwrap();
        let stale = m.tick_token();
        m.pause();
        m.resume();
        let before = m.remaining_secs();
        assert!(m.tick(stale).is_none());
        assert_eq!(m.remaining_secs(), before);
    }

    #[test]
    fn tick_while_idle_is_noop() {
        let mut m = SessionMachine::default();
        let token = m.tick_token();
        assert!(m.tick(token).is_none());
        assert_eq!(m.remaining_secs(), 25 * 60);
    }

    #[test]
    fn focus_completion_suspends_awaiting_outcome() {
        let mut m = short_machine(1, 1);
        m.start().unwrap();
        let event = run_to_zero(&mut m);
        match event {
            Event::PhaseCompleted {
                phase,
                session_index,
                duration_min,
                ..
            } => {
                assert_eq!(phase, Phase::Focus);
                assert_eq!(session_index, 1);
                assert_eq!(duration_min, 1);
            }
            other => panic!("expected PhaseCompleted, got {other:?}"),
        }
        assert_eq!(m.state(), SessionState::AwaitingOutcome);

        // start/pause are rejected while the outcome is in flight.
        assert!(m.start().unwrap().is_none());
        assert!(m.pause().is_none());

        // The timer that drove the focus phase is stale now.
        assert_eq!(m.remaining_secs(), 0);
    }

    #[test]
    fn resolve_outcome_enters_break_idle() {
        let mut m = short_machine(1, 2);
        m.start().unwrap();
        run_to_zero(&mut m);
        assert!(m.resolve_outcome().is_some());
        assert_eq!(m.phase(), Phase::Break);
        assert_eq!(m.state(), SessionState::Idle);
        assert_eq!(m.remaining_secs(), 2 * 60);
        // Double resolve is a no-op.
        assert!(m.resolve_outcome().is_none());
    }

    #[test]
    fn break_completion_advances_to_focus() {
        let mut m = short_machine(1, 1);
        m.start().unwrap();
        run_to_zero(&mut m);
        m.resolve_outcome();
        m.start().unwrap();
        let event = run_to_zero(&mut m);
        match event {
            Event::PhaseCompleted { phase, session_index, .. } => {
                assert_eq!(phase, Phase::Break);
                assert_eq!(session_index, 2);
            }
            other => panic!("expected PhaseCompleted, got {other:?}"),
        }
        assert_eq!(m.phase(), Phase::Focus);
        assert_eq!(m.state(), SessionState::Idle);
        assert_eq!(m.remaining_secs(), 60);
    }

    #[test]
    fn interrupt_reports_elapsed_and_resets() {
        let mut m = short_machine(25, 5);
        m.start().unwrap();
        let token = m.tick_token();
        for _ in 0..90 {
            m.tick(token);
        }
        let (event, report) = m.interrupt().expect("interrupt while running");
        assert_eq!(report.elapsed_secs, 90);
        assert_eq!(report.recorded_min, Some(1));
        match event {
            Event::SessionInterrupted { elapsed_secs, recorded_min, .. } => {
                assert_eq!(elapsed_secs, 90);
                assert_eq!(recorded_min, Some(1));
            }
            other => panic!("expected SessionInterrupted, got {other:?}"),
        }
        // Back to a fresh focus attempt, counter untouched.
        assert_eq!(m.phase(), Phase::Focus);
        assert_eq!(m.state(), SessionState::Idle);
        assert_eq!(m.remaining_secs(), 25 * 60);
        assert_eq!(m.session_counter(), 0);
    }

    #[test]
    fn interrupt_under_a_minute_records_nothing() {
        let mut m = short_machine(25, 5);
        m.start().unwrap();
        let token = m.tick_token();
        for _ in 0..59 {
            m.tick(token);
        }
        let (_, report) = m.interrupt().unwrap();
        assert_eq!(report.recorded_min, None);
    }

    #[test]
    fn interrupt_invalid_outside_focus() {
        let mut m = short_machine(1, 1);
        assert!(m.interrupt().is_none()); // Idle
        m.start().unwrap();
        run_to_zero(&mut m);
        assert!(m.interrupt().is_none()); // AwaitingOutcome
        m.resolve_outcome();
        m.start().unwrap();
        assert!(m.interrupt().is_none()); // Break
    }

    #[test]
    fn settings_change_while_idle_reinitializes() {
        let mut m = short_machine(25, 5);
        m.apply_settings(SessionSettings {
            focus_minutes: 50,
            break_minutes: 10,
            require_task: false,
        });
        assert_eq!(m.remaining_secs(), 50 * 60);
    }

    #[test]
    fn settings_change_while_running_leaves_countdown_alone() {
        let mut m = short_machine(25, 5);
        m.start().unwrap();
        let token = m.tick_token();
        m.tick(token);
        m.apply_settings(SessionSettings {
            focus_minutes: 50,
            break_minutes: 10,
            require_task: false,
        });
        assert_eq!(m.remaining_secs(), 25 * 60 - 1);
        assert_eq!(m.total_secs(), 25 * 60);
        // New values take effect on the next phase entry.
        m.interrupt();
        assert_eq!(m.remaining_secs(), 50 * 60);
    }

    #[test]
    fn task_required_when_configured() {
        let mut m = SessionMachine::new(SessionSettings {
            focus_minutes: 25,
            break_minutes: 5,
            require_task: true,
        });
        assert!(matches!(m.start(), Err(ValidationError::TaskRequired)));
        m.select_task(Some("task-1".into()));
        assert!(m.start().unwrap().is_some());
    }

    #[test]
    fn reset_returns_to_fresh_focus() {
        let mut m = short_machine(1, 1);
        m.start().unwrap();
        run_to_zero(&mut m);
        m.resolve_outcome();
        m.reset();
        assert_eq!(m.phase(), Phase::Focus);
        assert_eq!(m.state(), SessionState::Idle);
        assert_eq!(m.session_counter(), 0);
        assert_eq!(m.remaining_secs(), 60);
    }

    #[test]
    fn snapshot_reflects_state() {
        let m = SessionMachine::default();
        match m.snapshot() {
            Event::StateSnapshot {
                phase,
                state,
                remaining_secs,
                total_secs,
                ..
            } => {
                assert_eq!(phase, Phase::Focus);
                assert_eq!(state, SessionState::Idle);
                assert_eq!(remaining_secs, 25 * 60);
                assert_eq!(total_secs, 25 * 60);
            }
            other => panic!("expected StateSnapshot, got {other:?}"),
        }
    }

    #[test]
    fn machine_roundtrips_through_serde() {
        let mut m = short_machine(25, 5);
        m.start().unwrap();
        let token = m.tick_token();
        m.tick(token);
        m.pause();
        let json = serde_json::to_string(&m).unwrap();
        let restored: SessionMachine = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.state(), SessionState::Paused);
        assert_eq!(restored.remaining_secs(), 25 * 60 - 1);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Remaining time is monotonically non-increasing under ticks
            // and never goes below zero.
            #[test]
            fn remaining_never_increases_under_ticks(ticks in 0usize..200) {
                let mut m = short_machine(1, 1);
                m.start().unwrap();
                let token = m.tick_token();
                let mut last = m.remaining_secs();
                for _ in 0..ticks {
                    m.tick(token);
                    let now = m.remaining_secs();
                    prop_assert!(now <= last);
                    last = now;
                }
            }

            // Once the phase completes, leftover timer fires are swallowed.
            #[test]
            fn extra_ticks_after_completion_are_noops(extra in 1usize..50) {
                let mut m = short_machine(1, 1);
                m.start().unwrap();
                let token = m.tick_token();
                for _ in 0..60 {
                    m.tick(token);
                }
                prop_assert_eq!(m.state(), SessionState::AwaitingOutcome);
                for _ in 0..extra {
                    prop_assert!(m.tick(token).is_none());
                }
                prop_assert_eq!(m.session_counter(), 1);
            }
        }
    }
}
